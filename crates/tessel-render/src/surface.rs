// SPDX-License-Identifier: CEPL-1.0
use crate::RenderSize;

/// Width/height value a surface reports when its extent is decided by the
/// swapchain rather than the window.
pub const UNDEFINED_EXTENT: u32 = u32::MAX;

/// The sizing part of the surface capabilities, queried fresh for every chain
/// build.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SurfaceLimits {
    pub min_image_count: u32,
    /// 0 means the surface imposes no upper bound.
    pub max_image_count: u32,
    /// `None` when the surface reported [`UNDEFINED_EXTENT`].
    pub current_extent: Option<RenderSize>,
    pub min_extent: RenderSize,
    pub max_extent: RenderSize,
}

impl SurfaceLimits {
    /// Builds limits from raw capability values, mapping the undefined-extent
    /// sentinel to `None`.
    pub fn from_raw(
        min_image_count: u32,
        max_image_count: u32,
        current_extent: RenderSize,
        min_extent: RenderSize,
        max_extent: RenderSize,
    ) -> Self {
        let current_extent = (current_extent.width != UNDEFINED_EXTENT
            && current_extent.height != UNDEFINED_EXTENT)
            .then_some(current_extent);
        Self {
            min_image_count,
            max_image_count,
            current_extent,
            min_extent,
            max_extent,
        }
    }
}

/// One image more than the minimum so the CPU is never starved waiting for
/// the presentation engine, capped by the surface maximum.
pub fn choose_image_count(limits: &SurfaceLimits) -> u32 {
    let desired = limits.min_image_count.saturating_add(1);
    if limits.max_image_count == 0 {
        desired
    } else {
        desired.min(limits.max_image_count)
    }
}

/// The surface's own extent when it has one, otherwise the live framebuffer
/// size clamped into the supported range.
pub fn choose_extent(limits: &SurfaceLimits, framebuffer: RenderSize) -> RenderSize {
    if let Some(current) = limits.current_extent {
        return current;
    }
    RenderSize {
        width: framebuffer
            .width
            .clamp(limits.min_extent.width, limits.max_extent.width.max(limits.min_extent.width)),
        height: framebuffer.height.clamp(
            limits.min_extent.height,
            limits.max_extent.height.max(limits.min_extent.height),
        ),
    }
}
