// SPDX-License-Identifier: CEPL-1.0
use std::ffi::{c_char, c_void, CStr, CString};

use ash::ext::debug_utils;
use ash::{vk, Entry};
use raw_window_handle::RawDisplayHandle;
use tessel_render::RenderError;
use tracing::{debug, error, info, trace, warn};

use crate::vk_err;

const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Loader, instance and (with validation) the messenger feeding `tracing`.
pub(crate) struct InstanceBundle {
    pub(crate) entry: Entry,
    pub(crate) instance: ash::Instance,
    debug: Option<(debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
}

impl InstanceBundle {
    pub(crate) fn new(
        app_name: &str,
        display: RawDisplayHandle,
        validation: bool,
    ) -> Result<Self, RenderError> {
        let entry = unsafe { Entry::load() }
            .map_err(|e| RenderError::LoaderUnavailable(e.to_string()))?;

        let exts = unsafe { entry.enumerate_instance_extension_properties(None) }.map_err(
            vk_err(
                RenderError::InstanceCreation,
                "vkEnumerateInstanceExtensionProperties",
            ),
        )?;
        debug!(
            "{} instance extensions available: {}",
            exts.len(),
            extension_names(&exts).join(", ")
        );

        if validation {
            require_validation(&entry, &exts)?;
        }
        let instance = create_instance(&entry, app_name, display, validation)?;

        let mut bundle = Self {
            entry,
            instance,
            debug: None,
        };
        if validation {
            let loader = debug_utils::Instance::new(&bundle.entry, &bundle.instance);
            let messenger = create_messenger(&loader)?;
            bundle.debug = Some((loader, messenger));
            info!("validation layer enabled");
        }
        Ok(bundle)
    }
}

impl Drop for InstanceBundle {
    fn drop(&mut self) {
        unsafe {
            if let Some((loader, messenger)) = self.debug.take() {
                loader.destroy_debug_utils_messenger(messenger, None);
            }
            self.instance.destroy_instance(None);
        }
    }
}

fn require_validation(
    entry: &Entry,
    exts: &[vk::ExtensionProperties],
) -> Result<(), RenderError> {
    let layers = unsafe { entry.enumerate_instance_layer_properties() }.map_err(vk_err(
        RenderError::InstanceCreation,
        "vkEnumerateInstanceLayerProperties",
    ))?;
    let has_layer = layers
        .iter()
        .any(|l| unsafe { CStr::from_ptr(l.layer_name.as_ptr()) } == VALIDATION_LAYER);
    if !has_layer {
        return Err(RenderError::MissingCapability(format!(
            "validation requested but {} is not installed",
            VALIDATION_LAYER.to_string_lossy()
        )));
    }

    let has_debug_utils = exts
        .iter()
        .any(|e| e.extension_name_as_c_str() == Ok(debug_utils::NAME));
    if !has_debug_utils {
        return Err(RenderError::MissingCapability(format!(
            "{} is not available",
            debug_utils::NAME.to_string_lossy()
        )));
    }
    Ok(())
}

/// Names that are not nul-terminated within their array are skipped.
fn extension_names(exts: &[vk::ExtensionProperties]) -> Vec<String> {
    exts.iter()
        .filter_map(|e| e.extension_name_as_c_str().ok())
        .map(|name| name.to_string_lossy().into_owned())
        .collect()
}

fn create_instance(
    entry: &Entry,
    app_name: &str,
    display: RawDisplayHandle,
    validation: bool,
) -> Result<ash::Instance, RenderError> {
    let app_name = CString::new(app_name)
        .map_err(|e| RenderError::InstanceCreation(format!("application name: {e}")))?;

    let app_info = vk::ApplicationInfo {
        s_type: vk::StructureType::APPLICATION_INFO,
        p_application_name: app_name.as_ptr(),
        application_version: 0,
        p_engine_name: c"tessel".as_ptr(),
        engine_version: 0,
        api_version: vk::API_VERSION_1_0,
        ..Default::default()
    };

    let mut extensions: Vec<*const c_char> = ash_window::enumerate_required_extensions(display)
        .map_err(vk_err(
            RenderError::MissingCapability,
            "window system extensions",
        ))?
        .to_vec();
    let mut layers: Vec<*const c_char> = Vec::new();
    if validation {
        extensions.push(debug_utils::NAME.as_ptr());
        layers.push(VALIDATION_LAYER.as_ptr());
    }

    let create_info = vk::InstanceCreateInfo {
        s_type: vk::StructureType::INSTANCE_CREATE_INFO,
        p_application_info: &app_info,
        enabled_extension_count: extensions.len() as u32,
        pp_enabled_extension_names: extensions.as_ptr(),
        enabled_layer_count: layers.len() as u32,
        pp_enabled_layer_names: layers.as_ptr(),
        ..Default::default()
    };

    unsafe { entry.create_instance(&create_info, None) }.map_err(|e| match e {
        vk::Result::ERROR_EXTENSION_NOT_PRESENT | vk::Result::ERROR_LAYER_NOT_PRESENT => {
            RenderError::MissingCapability(format!("vkCreateInstance: {e}"))
        }
        vk::Result::ERROR_INCOMPATIBLE_DRIVER => {
            RenderError::LoaderUnavailable(format!("vkCreateInstance: {e}"))
        }
        _ => RenderError::InstanceCreation(format!("vkCreateInstance: {e}")),
    })
}

fn create_messenger(
    loader: &debug_utils::Instance,
) -> Result<vk::DebugUtilsMessengerEXT, RenderError> {
    let ci = vk::DebugUtilsMessengerCreateInfoEXT {
        s_type: vk::StructureType::DEBUG_UTILS_MESSENGER_CREATE_INFO_EXT,
        message_severity: vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
            | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
            | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
            | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        message_type: vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
            | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
            | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        pfn_user_callback: Some(forward_to_tracing),
        ..Default::default()
    };
    unsafe { loader.create_debug_utils_messenger(&ci, None) }.map_err(vk_err(
        RenderError::InstanceCreation,
        "vkCreateDebugUtilsMessengerEXT",
    ))
}

unsafe extern "system" fn forward_to_tracing(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    kind: vk::DebugUtilsMessageTypeFlagsEXT,
    data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user: *mut c_void,
) -> vk::Bool32 {
    if data.is_null() {
        return vk::FALSE;
    }
    let p_message = unsafe { (*data).p_message };
    if p_message.is_null() {
        return vk::FALSE;
    }
    let message = unsafe { CStr::from_ptr(p_message) }.to_string_lossy();

    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        error!("[vulkan {kind:?}] {message}");
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        warn!("[vulkan {kind:?}] {message}");
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        debug!("[vulkan {kind:?}] {message}");
    } else {
        trace!("[vulkan {kind:?}] {message}");
    }
    vk::FALSE
}
