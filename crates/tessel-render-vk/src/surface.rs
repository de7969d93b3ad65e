// SPDX-License-Identifier: CEPL-1.0
use ash::khr::surface;
use ash::vk;
use tessel_render::{RenderError, RenderSize, SurfaceLimits};

use crate::vk_err;

/// Present mode the user asked for; falls back to FIFO, which every surface
/// supports.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PresentPreference {
    #[default]
    Mailbox,
    Fifo,
    Immediate,
}

/// Snapshot of what the surface supports right now.
#[derive(Clone, Debug)]
pub struct SurfaceSupport {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SurfaceSupport {
    pub(crate) fn query(
        loader: &surface::Instance,
        physical: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> Result<Self, RenderError> {
        unsafe {
            let capabilities = loader
                .get_physical_device_surface_capabilities(physical, surface)
                .map_err(vk_err(
                    RenderError::ChainCreation,
                    "vkGetPhysicalDeviceSurfaceCapabilitiesKHR",
                ))?;
            let formats = loader
                .get_physical_device_surface_formats(physical, surface)
                .map_err(vk_err(
                    RenderError::ChainCreation,
                    "vkGetPhysicalDeviceSurfaceFormatsKHR",
                ))?;
            let present_modes = loader
                .get_physical_device_surface_present_modes(physical, surface)
                .map_err(vk_err(
                    RenderError::ChainCreation,
                    "vkGetPhysicalDeviceSurfacePresentModesKHR",
                ))?;
            Ok(Self {
                capabilities,
                formats,
                present_modes,
            })
        }
    }

    pub fn limits(&self) -> SurfaceLimits {
        limits_from_caps(&self.capabilities)
    }
}

fn size_of(extent: vk::Extent2D) -> RenderSize {
    RenderSize::new(extent.width, extent.height)
}

pub(crate) fn extent_of(size: RenderSize) -> vk::Extent2D {
    vk::Extent2D {
        width: size.width,
        height: size.height,
    }
}

pub fn limits_from_caps(caps: &vk::SurfaceCapabilitiesKHR) -> SurfaceLimits {
    SurfaceLimits::from_raw(
        caps.min_image_count,
        caps.max_image_count,
        size_of(caps.current_extent),
        size_of(caps.min_image_extent),
        size_of(caps.max_image_extent),
    )
}

/// BGRA8 sRGB with the standard non-linear colour space, else whatever the
/// driver lists first.
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    formats
        .iter()
        .copied()
        .find(|f| {
            f.format == vk::Format::B8G8R8A8_SRGB
                && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        })
        .or_else(|| formats.first().copied())
}

pub fn choose_present_mode(
    modes: &[vk::PresentModeKHR],
    preference: PresentPreference,
) -> vk::PresentModeKHR {
    let wanted = match preference {
        PresentPreference::Mailbox => vk::PresentModeKHR::MAILBOX,
        PresentPreference::Fifo => vk::PresentModeKHR::FIFO,
        PresentPreference::Immediate => vk::PresentModeKHR::IMMEDIATE,
    };
    if modes.contains(&wanted) {
        wanted
    } else {
        vk::PresentModeKHR::FIFO
    }
}

/// Opaque when the compositor allows it.
pub fn choose_composite_alpha(
    supported: vk::CompositeAlphaFlagsKHR,
) -> vk::CompositeAlphaFlagsKHR {
    [
        vk::CompositeAlphaFlagsKHR::OPAQUE,
        vk::CompositeAlphaFlagsKHR::PRE_MULTIPLIED,
        vk::CompositeAlphaFlagsKHR::POST_MULTIPLIED,
        vk::CompositeAlphaFlagsKHR::INHERIT,
    ]
    .into_iter()
    .find(|&a| supported.contains(a))
    .unwrap_or(vk::CompositeAlphaFlagsKHR::OPAQUE)
}

// Info only
pub(crate) fn present_mode_name(mode: vk::PresentModeKHR) -> &'static str {
    match mode {
        vk::PresentModeKHR::FIFO => "FIFO",
        vk::PresentModeKHR::MAILBOX => "MAILBOX",
        vk::PresentModeKHR::IMMEDIATE => "IMMEDIATE",
        vk::PresentModeKHR::FIFO_RELAXED => "FIFO_RELAXED",
        _ => "OTHER",
    }
}
