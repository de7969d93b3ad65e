// SPDX-License-Identifier: CEPL-1.0
use ash::vk;
use tessel_render::RenderError;

use crate::{vk_err, DeviceContext};

/// Index of the first memory type allowed by `type_bits` that has every
/// `required` property.
pub fn find_memory_type(
    props: &vk::PhysicalDeviceMemoryProperties,
    type_bits: u32,
    required: vk::MemoryPropertyFlags,
) -> Result<u32, RenderError> {
    props
        .memory_types
        .iter()
        .take(props.memory_type_count as usize)
        .enumerate()
        .find(|(i, ty)| type_bits & (1u32 << *i) != 0 && ty.property_flags.contains(required))
        .map(|(i, _)| i as u32)
        .ok_or_else(|| {
            RenderError::MemoryTypeNotFound(format!(
                "{required:?} within type bits {type_bits:#b}"
            ))
        })
}

fn allocation_error(e: vk::Result) -> RenderError {
    match e {
        vk::Result::ERROR_OUT_OF_HOST_MEMORY | vk::Result::ERROR_OUT_OF_DEVICE_MEMORY => {
            RenderError::OutOfMemory(format!("vkAllocateMemory: {e}"))
        }
        _ => RenderError::BufferCreation(format!("vkAllocateMemory: {e}")),
    }
}

/// A buffer bound to its own dedicated allocation.
pub struct GpuBuffer<'d> {
    ctx: &'d DeviceContext,
    buffer: vk::Buffer,
    memory: vk::DeviceMemory,
    size: vk::DeviceSize,
}

impl<'d> GpuBuffer<'d> {
    pub fn new(
        ctx: &'d DeviceContext,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        properties: vk::MemoryPropertyFlags,
    ) -> Result<Self, RenderError> {
        if size == 0 {
            return Err(RenderError::BufferCreation("zero-sized buffer".into()));
        }
        let device = ctx.device();

        let bci = vk::BufferCreateInfo {
            s_type: vk::StructureType::BUFFER_CREATE_INFO,
            size,
            usage,
            sharing_mode: vk::SharingMode::EXCLUSIVE,
            ..Default::default()
        };
        let buffer = unsafe { device.create_buffer(&bci, None) }
            .map_err(vk_err(RenderError::BufferCreation, "vkCreateBuffer"))?;
        // From here on an early return releases what exists so far.
        let mut this = Self {
            ctx,
            buffer,
            memory: vk::DeviceMemory::null(),
            size,
        };

        let req = unsafe { device.get_buffer_memory_requirements(buffer) };
        let mai = vk::MemoryAllocateInfo {
            s_type: vk::StructureType::MEMORY_ALLOCATE_INFO,
            allocation_size: req.size,
            memory_type_index: find_memory_type(
                ctx.memory_properties(),
                req.memory_type_bits,
                properties,
            )?,
            ..Default::default()
        };
        this.memory = unsafe { device.allocate_memory(&mai, None) }.map_err(allocation_error)?;
        unsafe { device.bind_buffer_memory(buffer, this.memory, 0) }
            .map_err(vk_err(RenderError::BufferCreation, "vkBindBufferMemory"))?;
        Ok(this)
    }

    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    /// Copies `bytes` to the start of a host-visible buffer.
    pub fn write(&self, bytes: &[u8]) -> Result<(), RenderError> {
        let len = bytes.len() as vk::DeviceSize;
        if len > self.size {
            return Err(RenderError::BufferCreation(format!(
                "{len} bytes do not fit a {} byte buffer",
                self.size
            )));
        }
        let device = self.ctx.device();
        unsafe {
            let ptr = device
                .map_memory(self.memory, 0, len, vk::MemoryMapFlags::empty())
                .map_err(vk_err(RenderError::BufferCreation, "vkMapMemory"))?;
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr.cast::<u8>(), bytes.len());
            device.unmap_memory(self.memory);
        }
        Ok(())
    }
}

impl Drop for GpuBuffer<'_> {
    fn drop(&mut self) {
        let device = self.ctx.device();
        unsafe {
            device.destroy_buffer(self.buffer, None);
            if self.memory != vk::DeviceMemory::null() {
                device.free_memory(self.memory, None);
            }
        }
    }
}
