// SPDX-License-Identifier: CEPL-1.0
use std::ffi::CStr;

use ash::khr::{surface, swapchain};
use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tessel_render::RenderError;
use tracing::{debug, info, warn};

use crate::instance::InstanceBundle;
use crate::surface::SurfaceSupport;
use crate::vk_err;

#[derive(Clone, Debug)]
pub struct DeviceOptions {
    pub app_name: String,
    /// Enables `VK_LAYER_KHRONOS_validation`; its absence is then fatal.
    pub validation: bool,
    /// Rank discrete GPUs above integrated ones.
    pub prefer_discrete: bool,
}

impl Default for DeviceOptions {
    fn default() -> Self {
        Self {
            app_name: "tessel".into(),
            validation: false,
            prefer_discrete: true,
        }
    }
}

/// What device selection needs to know about one physical device.
#[derive(Clone, Debug)]
pub struct DeviceCandidate {
    pub physical: vk::PhysicalDevice,
    pub name: String,
    pub device_type: vk::PhysicalDeviceType,
    /// First family with both GRAPHICS and present support for the surface.
    pub queue_family: Option<u32>,
    pub has_swapchain: bool,
    /// At least one surface format and one present mode.
    pub presentable: bool,
}

impl DeviceCandidate {
    pub fn is_suitable(&self) -> bool {
        self.queue_family.is_some() && self.has_swapchain && self.presentable
    }
}

fn type_rank(ty: vk::PhysicalDeviceType) -> u8 {
    match ty {
        vk::PhysicalDeviceType::DISCRETE_GPU => 0,
        vk::PhysicalDeviceType::INTEGRATED_GPU => 1,
        vk::PhysicalDeviceType::VIRTUAL_GPU => 2,
        vk::PhysicalDeviceType::CPU => 3,
        _ => 4,
    }
}

/// Picks the device to render with. With `prefer_discrete` the best-ranked
/// suitable type wins (ties go to enumeration order), otherwise the first
/// suitable device.
pub fn select_device(
    candidates: &[DeviceCandidate],
    prefer_discrete: bool,
) -> Option<&DeviceCandidate> {
    let mut suitable = candidates.iter().filter(|c| c.is_suitable());
    if prefer_discrete {
        suitable.min_by_key(|c| type_rank(c.device_type))
    } else {
        suitable.next()
    }
}

/// Instance, surface, logical device, its single graphics+present queue and
/// the command pool everything records from.
pub struct DeviceContext {
    device: ash::Device,
    queue: vk::Queue,
    physical: vk::PhysicalDevice,
    device_name: String,
    memory_properties: vk::PhysicalDeviceMemoryProperties,
    command_pool: vk::CommandPool,
    swapchain_loader: swapchain::Device,
    surface_loader: surface::Instance,
    surface: vk::SurfaceKHR,
    // Dropped after `Drop::drop` has released everything above.
    instance: InstanceBundle,
}

impl DeviceContext {
    pub fn new(
        window: &dyn HasWindowHandle,
        display: &dyn HasDisplayHandle,
        options: &DeviceOptions,
    ) -> Result<Self, RenderError> {
        let dh = display
            .display_handle()
            .map_err(|e| RenderError::SurfaceCreation(format!("display handle: {e}")))?
            .as_raw();
        let wh = window
            .window_handle()
            .map_err(|e| RenderError::SurfaceCreation(format!("window handle: {e}")))?
            .as_raw();

        // STRICT ORDER: instance, surface from it, then devices judged against that surface.
        let instance = InstanceBundle::new(&options.app_name, dh, options.validation)?;
        let surface_loader = surface::Instance::new(&instance.entry, &instance.instance);
        let surface = unsafe {
            ash_window::create_surface(&instance.entry, &instance.instance, dh, wh, None)
        }
        .map_err(vk_err(RenderError::SurfaceCreation, "vkCreateSurfaceKHR"))?;

        let opened = match open_device(&instance.instance, &surface_loader, surface, options) {
            Ok(opened) => opened,
            Err(e) => {
                unsafe { surface_loader.destroy_surface(surface, None) };
                return Err(e);
            }
        };
        let swapchain_loader = swapchain::Device::new(&instance.instance, &opened.device);
        let queue = unsafe { opened.device.get_device_queue(opened.queue_family, 0) };

        info!(
            "using {} (queue family {})",
            opened.name, opened.queue_family
        );

        Ok(Self {
            device: opened.device,
            queue,
            physical: opened.physical,
            device_name: opened.name,
            memory_properties: opened.memory_properties,
            command_pool: opened.command_pool,
            swapchain_loader,
            surface_loader,
            surface,
            instance,
        })
    }

    pub fn device(&self) -> &ash::Device {
        &self.device
    }

    pub fn queue(&self) -> vk::Queue {
        self.queue
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn memory_properties(&self) -> &vk::PhysicalDeviceMemoryProperties {
        &self.memory_properties
    }

    pub fn command_pool(&self) -> vk::CommandPool {
        self.command_pool
    }

    pub fn swapchain_loader(&self) -> &swapchain::Device {
        &self.swapchain_loader
    }

    pub fn surface(&self) -> vk::SurfaceKHR {
        self.surface
    }

    /// Fresh capabilities, formats and present modes of the surface.
    pub fn surface_support(&self) -> Result<SurfaceSupport, RenderError> {
        SurfaceSupport::query(&self.surface_loader, self.physical, self.surface)
    }

    pub fn wait_idle(&self) -> Result<(), RenderError> {
        unsafe { self.device.device_wait_idle() }
            .map_err(vk_err(RenderError::DeviceIdle, "vkDeviceWaitIdle"))
    }

    /// Records a throwaway command buffer, submits it on the queue and waits
    /// for it to finish.
    pub fn one_shot<F>(&self, record: F) -> Result<(), RenderError>
    where
        F: FnOnce(&ash::Device, vk::CommandBuffer),
    {
        let ai = vk::CommandBufferAllocateInfo {
            s_type: vk::StructureType::COMMAND_BUFFER_ALLOCATE_INFO,
            command_pool: self.command_pool,
            level: vk::CommandBufferLevel::PRIMARY,
            command_buffer_count: 1,
            ..Default::default()
        };
        let cmd = unsafe { self.device.allocate_command_buffers(&ai) }
            .map_err(vk_err(RenderError::CommandRecording, "vkAllocateCommandBuffers"))?
            .first()
            .copied()
            .ok_or_else(|| RenderError::CommandRecording("no one-shot command buffer".into()))?;

        let result = self.submit_and_wait(cmd, record);
        unsafe {
            self.device
                .free_command_buffers(self.command_pool, std::slice::from_ref(&cmd))
        };
        result
    }

    fn submit_and_wait<F>(&self, cmd: vk::CommandBuffer, record: F) -> Result<(), RenderError>
    where
        F: FnOnce(&ash::Device, vk::CommandBuffer),
    {
        let bi = vk::CommandBufferBeginInfo {
            s_type: vk::StructureType::COMMAND_BUFFER_BEGIN_INFO,
            flags: vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT,
            ..Default::default()
        };
        unsafe { self.device.begin_command_buffer(cmd, &bi) }
            .map_err(vk_err(RenderError::CommandRecording, "vkBeginCommandBuffer"))?;
        record(&self.device, cmd);
        unsafe { self.device.end_command_buffer(cmd) }
            .map_err(vk_err(RenderError::CommandRecording, "vkEndCommandBuffer"))?;

        let si = vk::SubmitInfo {
            s_type: vk::StructureType::SUBMIT_INFO,
            command_buffer_count: 1,
            p_command_buffers: &cmd,
            ..Default::default()
        };
        unsafe {
            self.device
                .queue_submit(self.queue, std::slice::from_ref(&si), vk::Fence::null())
        }
        .map_err(vk_err(RenderError::Submit, "vkQueueSubmit"))?;
        unsafe { self.device.queue_wait_idle(self.queue) }
            .map_err(vk_err(RenderError::DeviceIdle, "vkQueueWaitIdle"))
    }
}

// STRICT TEARDOWN ORDER: pool, device, surface; the instance goes last with
// the `instance` field.
impl Drop for DeviceContext {
    fn drop(&mut self) {
        unsafe {
            self.device.device_wait_idle().ok();
            self.device.destroy_command_pool(self.command_pool, None);
            self.device.destroy_device(None);
            self.surface_loader.destroy_surface(self.surface, None);
        }
    }
}

struct OpenedDevice {
    physical: vk::PhysicalDevice,
    name: String,
    queue_family: u32,
    memory_properties: vk::PhysicalDeviceMemoryProperties,
    device: ash::Device,
    command_pool: vk::CommandPool,
}

fn open_device(
    instance: &ash::Instance,
    surface_loader: &surface::Instance,
    surface: vk::SurfaceKHR,
    options: &DeviceOptions,
) -> Result<OpenedDevice, RenderError> {
    let physicals = unsafe { instance.enumerate_physical_devices() }.map_err(vk_err(
        RenderError::NoSuitableDevice,
        "vkEnumeratePhysicalDevices",
    ))?;
    if physicals.is_empty() {
        return Err(RenderError::NoSuitableDevice(
            "no Vulkan devices present".into(),
        ));
    }

    let candidates: Vec<DeviceCandidate> = physicals
        .into_iter()
        .map(|p| survey(instance, surface_loader, surface, p))
        .collect();
    for c in &candidates {
        debug!(
            "device {} ({:?}): queue family {:?}, swapchain {}, presentable {}",
            c.name, c.device_type, c.queue_family, c.has_swapchain, c.presentable
        );
    }

    let chosen = select_device(&candidates, options.prefer_discrete).ok_or_else(|| {
        let names: Vec<&str> = candidates.iter().map(|c| c.name.as_str()).collect();
        RenderError::NoSuitableDevice(format!(
            "none of [{}] has a graphics+present queue, swapchain support and surface formats",
            names.join(", ")
        ))
    })?;
    if options.prefer_discrete && chosen.device_type != vk::PhysicalDeviceType::DISCRETE_GPU {
        warn!(
            "no suitable discrete GPU, falling back to {} ({:?})",
            chosen.name, chosen.device_type
        );
    }
    let Some(queue_family) = chosen.queue_family else {
        return Err(RenderError::NoSuitableDevice(format!(
            "{} lost its queue family",
            chosen.name
        )));
    };

    let priorities = [1.0_f32];
    let qinfo = vk::DeviceQueueCreateInfo {
        s_type: vk::StructureType::DEVICE_QUEUE_CREATE_INFO,
        queue_family_index: queue_family,
        queue_count: 1,
        p_queue_priorities: priorities.as_ptr(),
        ..Default::default()
    };
    let device_exts = [swapchain::NAME.as_ptr()];
    let dinfo = vk::DeviceCreateInfo {
        s_type: vk::StructureType::DEVICE_CREATE_INFO,
        queue_create_info_count: 1,
        p_queue_create_infos: &qinfo,
        enabled_extension_count: device_exts.len() as u32,
        pp_enabled_extension_names: device_exts.as_ptr(),
        ..Default::default()
    };
    let device = unsafe { instance.create_device(chosen.physical, &dinfo, None) }.map_err(
        |e| match e {
            vk::Result::ERROR_EXTENSION_NOT_PRESENT | vk::Result::ERROR_FEATURE_NOT_PRESENT => {
                RenderError::MissingCapability(format!("vkCreateDevice: {e}"))
            }
            _ => RenderError::DeviceCreation(format!("vkCreateDevice: {e}")),
        },
    )?;

    let pool_info = vk::CommandPoolCreateInfo {
        s_type: vk::StructureType::COMMAND_POOL_CREATE_INFO,
        queue_family_index: queue_family,
        flags: vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
        ..Default::default()
    };
    let command_pool = match unsafe { device.create_command_pool(&pool_info, None) } {
        Ok(pool) => pool,
        Err(e) => {
            unsafe { device.destroy_device(None) };
            return Err(RenderError::DeviceCreation(format!(
                "vkCreateCommandPool: {e}"
            )));
        }
    };

    let memory_properties =
        unsafe { instance.get_physical_device_memory_properties(chosen.physical) };

    Ok(OpenedDevice {
        physical: chosen.physical,
        name: chosen.name.clone(),
        queue_family,
        memory_properties,
        device,
        command_pool,
    })
}

fn survey(
    instance: &ash::Instance,
    surface_loader: &surface::Instance,
    surface: vk::SurfaceKHR,
    physical: vk::PhysicalDevice,
) -> DeviceCandidate {
    let props = unsafe { instance.get_physical_device_properties(physical) };
    let name = unsafe { CStr::from_ptr(props.device_name.as_ptr()) }
        .to_string_lossy()
        .into_owned();

    let families = unsafe { instance.get_physical_device_queue_family_properties(physical) };
    let queue_family = families.iter().enumerate().find_map(|(i, q)| {
        let i = i as u32;
        let present = unsafe {
            surface_loader.get_physical_device_surface_support(physical, i, surface)
        }
        .unwrap_or(false);
        (q.queue_flags.contains(vk::QueueFlags::GRAPHICS) && present).then_some(i)
    });

    let has_swapchain = unsafe { instance.enumerate_device_extension_properties(physical) }
        .unwrap_or_default()
        .iter()
        .any(|e| unsafe { CStr::from_ptr(e.extension_name.as_ptr()) } == swapchain::NAME);

    let presentable = SurfaceSupport::query(surface_loader, physical, surface)
        .map(|s| !s.formats.is_empty() && !s.present_modes.is_empty())
        .unwrap_or(false);

    DeviceCandidate {
        physical,
        name,
        device_type: props.device_type,
        queue_family,
        has_swapchain,
        presentable,
    }
}
