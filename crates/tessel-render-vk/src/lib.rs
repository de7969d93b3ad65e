// SPDX-License-Identifier: CEPL-1.0
#![deny(unsafe_op_in_unsafe_fn)]
//! Vulkan implementation of [`tessel_render::RenderBackend`] on top of `ash`.
//!
//! Everything GPU-owning borrows a [`DeviceContext`], so the device always
//! outlives the chain, geometry and per-frame objects built from it.

mod backend;
mod chain;
mod commands;
mod device;
mod geometry;
mod instance;
mod memory;
mod pipeline;
mod surface;
mod sync;
mod uniforms;

pub use backend::{BackendOptions, VkBackend};
pub use chain::{ChainConfig, SurfaceChain};
pub use commands::{clear_value, CommandSet};
pub use device::{select_device, DeviceCandidate, DeviceContext, DeviceOptions};
pub use geometry::{GeometryStore, Vertex};
pub use memory::{find_memory_type, GpuBuffer};
pub use pipeline::ShaderBlobs;
pub use surface::{
    choose_composite_alpha, choose_present_mode, choose_surface_format, limits_from_caps,
    PresentPreference, SurfaceSupport,
};
pub use sync::FrameSlots;
pub use uniforms::FrameUniforms;

use ash::vk;
use tessel_render::RenderError;

/// Tags a failed Vulkan call with the error kind it belongs to.
pub(crate) fn vk_err(
    kind: fn(String) -> RenderError,
    call: &'static str,
) -> impl Fn(vk::Result) -> RenderError {
    move |e| kind(format!("{call}: {e}"))
}
