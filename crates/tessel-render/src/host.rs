// SPDX-License-Identifier: CEPL-1.0
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::RenderSize;

/// "The window was resized" notification.
///
/// Clones share one flag, so the event callback can hold a copy while the
/// scheduler consumes it once per present.
#[derive(Clone, Debug, Default)]
pub struct ResizeFlag(Arc<AtomicBool>);

impl ResizeFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Reads and clears the flag in one step.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}

/// What the renderer needs from the window it presents into.
pub trait WindowHost {
    /// Live framebuffer size in pixels; zero while minimized.
    fn framebuffer_size(&self) -> RenderSize;

    /// Processes pending window events without blocking.
    fn pump_events(&mut self);

    /// Blocks until at least one window event arrived, then processes it.
    fn wait_events(&mut self);

    fn close_requested(&self) -> bool;

    fn resize_flag(&self) -> &ResizeFlag;
}
