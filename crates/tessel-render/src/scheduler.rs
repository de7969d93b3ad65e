// SPDX-License-Identifier: CEPL-1.0
use bitflags::bitflags;
use tracing::{debug, info};

use crate::{
    Acquire, ChainInfo, Clock, FrameUniform, PresentStatus, RenderBackend, RenderError,
    RenderSize, WindowHost,
};

bitflags! {
    /// Why a chain generation was thrown away.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct RebuildReason: u8 {
        const OUT_OF_DATE = 1 << 0;
        const SUBOPTIMAL = 1 << 1;
        const RESIZED = 1 << 2;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameState {
    Idle,
    AcquireImage,
    RecordOrReuse,
    Submit,
    Present,
    RebuildChain,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    Presented { image: usize },
    /// The chain was rebuilt; for `OUT_OF_DATE` at acquire time nothing was
    /// submitted this cycle.
    Rebuilt(RebuildReason),
    /// The window was closed while minimized; the chain was left untouched.
    Closing,
}

/// Drives acquire / submit / present over a bounded ring of frame slots and
/// rebuilds the surface chain when it goes stale.
pub struct FrameScheduler<B, C> {
    backend: B,
    clock: C,
    frames_in_flight: usize,
    slot: usize,
    // Swap image index -> slot whose fence guards the frame rendering into it.
    images_in_flight: Vec<Option<usize>>,
    chain: ChainInfo,
    state: FrameState,
    frames_submitted: u64,
}

impl<B: RenderBackend, C: Clock> FrameScheduler<B, C> {
    /// Creates the frame slots, builds the first chain generation and records
    /// its command buffers.
    pub fn new<H: WindowHost + ?Sized>(
        mut backend: B,
        clock: C,
        frames_in_flight: usize,
        host: &mut H,
    ) -> Result<Self, RenderError> {
        if frames_in_flight == 0 {
            return Err(RenderError::InvalidConfig(
                "frames in flight must be at least 1".into(),
            ));
        }
        backend.create_frame_slots(frames_in_flight)?;

        let size = wait_for_drawable_size(host).ok_or_else(|| {
            RenderError::ChainCreation("window closed before it had a drawable size".into())
        })?;
        let chain = backend.build_chain(size)?;
        backend.record_commands()?;
        // The chain was built against the current size already.
        host.resize_flag().take();

        info!(
            "frame scheduler ready ({} images, {} extent, {} frames in flight)",
            chain.image_count, chain.extent, frames_in_flight
        );

        Ok(Self {
            backend,
            clock,
            frames_in_flight,
            slot: 0,
            images_in_flight: vec![None; chain.image_count],
            chain,
            state: FrameState::Idle,
            frames_submitted: 0,
        })
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    pub fn chain(&self) -> ChainInfo {
        self.chain
    }

    pub fn frame_slot(&self) -> usize {
        self.slot
    }

    pub fn frames_in_flight(&self) -> usize {
        self.frames_in_flight
    }

    pub fn frames_submitted(&self) -> u64 {
        self.frames_submitted
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Runs one full cycle: throttle, acquire, guard, update, submit,
    /// present, advance. Staleness is handled here; only fatal errors escape.
    pub fn draw_frame<H: WindowHost + ?Sized>(
        &mut self,
        host: &mut H,
    ) -> Result<FrameOutcome, RenderError> {
        let slot = self.slot;

        // Bounds the CPU to `frames_in_flight` frames ahead of the GPU.
        self.state = FrameState::AcquireImage;
        self.backend.wait_for_slot(slot)?;

        // A suboptimal image is still drawn; the chain is rebuilt after present.
        let mut reason = RebuildReason::empty();
        let image = match self.backend.acquire_image(slot)? {
            Acquire::Image { index, suboptimal } => {
                if suboptimal {
                    debug!("acquired suboptimal image {index}");
                    reason |= RebuildReason::SUBOPTIMAL;
                }
                index
            }
            Acquire::OutOfDate => return self.rebuild_chain(host, RebuildReason::OUT_OF_DATE),
        };
        if image >= self.images_in_flight.len() {
            return Err(RenderError::Acquire(format!(
                "image index {image} outside a chain of {}",
                self.images_in_flight.len()
            )));
        }

        self.state = FrameState::RecordOrReuse;
        if let Some(owner) = self.images_in_flight[image] {
            self.backend.wait_for_slot(owner)?;
        }
        self.images_in_flight[image] = Some(slot);

        // Only now is the GPU guaranteed to be done reading this image's uniforms.
        let uniform = FrameUniform::at(self.clock.elapsed(), self.chain.extent);
        self.backend.write_uniform(image, &uniform)?;

        self.state = FrameState::Submit;
        self.backend.reset_slot(slot)?;
        self.backend.submit(slot, image)?;
        self.frames_submitted += 1;

        self.state = FrameState::Present;
        reason |= match self.backend.present(slot, image)? {
            PresentStatus::Optimal => RebuildReason::empty(),
            PresentStatus::Suboptimal => RebuildReason::SUBOPTIMAL,
            PresentStatus::OutOfDate => RebuildReason::OUT_OF_DATE,
        };
        if host.resize_flag().take() {
            reason |= RebuildReason::RESIZED;
        }

        self.slot = (slot + 1) % self.frames_in_flight;

        if !reason.is_empty() {
            return self.rebuild_chain(host, reason);
        }
        self.state = FrameState::Idle;
        Ok(FrameOutcome::Presented { image })
    }

    /// Waits for all submitted work so the backend can be torn down.
    pub fn finish(&mut self) -> Result<(), RenderError> {
        self.state = FrameState::Idle;
        self.backend.wait_idle()
    }

    fn rebuild_chain<H: WindowHost + ?Sized>(
        &mut self,
        host: &mut H,
        reason: RebuildReason,
    ) -> Result<FrameOutcome, RenderError> {
        self.state = FrameState::RebuildChain;
        let Some(size) = wait_for_drawable_size(host) else {
            self.state = FrameState::Idle;
            return Ok(FrameOutcome::Closing);
        };

        // Pending submissions may still reference the old generation.
        self.backend.wait_idle()?;
        self.backend.destroy_chain();
        let chain = self.backend.build_chain(size)?;
        self.backend.record_commands()?;
        // A restore seen while minimized is already covered by this build.
        host.resize_flag().take();

        self.images_in_flight = vec![None; chain.image_count];
        info!(
            "surface chain rebuilt ({reason:?}): generation {}, {} images, {}",
            chain.generation, chain.image_count, chain.extent
        );
        self.chain = chain;
        self.state = FrameState::AcquireImage;
        Ok(FrameOutcome::Rebuilt(reason))
    }
}

/// Blocks while the window is minimized. `None` if it was closed meanwhile.
fn wait_for_drawable_size<H: WindowHost + ?Sized>(host: &mut H) -> Option<RenderSize> {
    let mut size = host.framebuffer_size();
    if size.is_empty() {
        info!("window is {size}, waiting until it is restored");
    }
    while size.is_empty() {
        if host.close_requested() {
            return None;
        }
        host.wait_events();
        size = host.framebuffer_size();
    }
    Some(size)
}

#[cfg(test)]
mod tests;
