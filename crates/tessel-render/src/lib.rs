// SPDX-License-Identifier: CEPL-1.0
//! Backend-agnostic half of the renderer: surface sizing policy, the frame
//! scheduler state machine and the seams it drives.

mod backend;
mod clock;
mod error;
mod host;
mod scheduler;
mod surface;
mod uniform;

pub use backend::{Acquire, ChainInfo, PresentStatus, RenderBackend};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::RenderError;
pub use host::{ResizeFlag, WindowHost};
pub use scheduler::{FrameOutcome, FrameScheduler, FrameState, RebuildReason};
pub use surface::{choose_extent, choose_image_count, SurfaceLimits, UNDEFINED_EXTENT};
pub use uniform::FrameUniform;

/// Pixel size of a window framebuffer or a swap image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderSize {
    pub width: u32,
    pub height: u32,
}

impl RenderSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// A minimized window reports a zero dimension; nothing can be presented.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn aspect(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

impl std::fmt::Display for RenderSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
