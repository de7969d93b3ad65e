// SPDX-License-Identifier: CEPL-1.0
use crate::{FrameUniform, RenderError, RenderSize};

/// Result of asking the presentation engine for the next image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Acquire {
    /// `index` is usable; `suboptimal` images are still rendered and presented.
    Image { index: usize, suboptimal: bool },
    /// The chain no longer matches the surface; nothing was signaled.
    OutOfDate,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PresentStatus {
    Optimal,
    Suboptimal,
    OutOfDate,
}

/// Shape of one chain generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChainInfo {
    pub image_count: usize,
    pub extent: RenderSize,
    /// Bumped on every successful build.
    pub generation: u64,
}

/// GPU operations the frame scheduler sequences.
///
/// Slots are addressed by index in `0..frames_in_flight` and swap images by
/// index in `0..image_count`. Each slot owns an "image acquired" semaphore, a
/// "rendering finished" semaphore and a completion fence created signaled.
pub trait RenderBackend {
    /// Creates the per-slot synchronization objects. Called once.
    fn create_frame_slots(&mut self, count: usize) -> Result<(), RenderError>;

    /// Builds a complete chain generation for `size`. Only called when no
    /// chain exists.
    fn build_chain(&mut self, size: RenderSize) -> Result<ChainInfo, RenderError>;

    /// Releases the current chain generation and everything derived from it.
    fn destroy_chain(&mut self);

    /// Records one command buffer per swap image of the current chain.
    fn record_commands(&mut self) -> Result<(), RenderError>;

    /// Blocks until the slot's fence is signaled.
    fn wait_for_slot(&mut self, slot: usize) -> Result<(), RenderError>;

    /// Returns the slot's fence to unsignaled.
    fn reset_slot(&mut self, slot: usize) -> Result<(), RenderError>;

    /// Acquires the next image, signaling the slot's "image acquired".
    fn acquire_image(&mut self, slot: usize) -> Result<Acquire, RenderError>;

    /// Writes per-frame state into the image's uniform buffer.
    fn write_uniform(&mut self, image: usize, uniform: &FrameUniform) -> Result<(), RenderError>;

    /// Submits the image's command buffer, waiting on the slot's "image
    /// acquired", signaling its "rendering finished" and its fence.
    fn submit(&mut self, slot: usize, image: usize) -> Result<(), RenderError>;

    /// Queues the image for presentation after the slot's "rendering finished".
    fn present(&mut self, slot: usize, image: usize) -> Result<PresentStatus, RenderError>;

    /// Blocks until the device has no pending work.
    fn wait_idle(&mut self) -> Result<(), RenderError>;
}
