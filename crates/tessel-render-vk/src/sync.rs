// SPDX-License-Identifier: CEPL-1.0
use ash::vk;
use tessel_render::RenderError;

use crate::{vk_err, DeviceContext};

/// Synchronization owned by one frame slot.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct FrameSlot {
    pub(crate) image_acquired: vk::Semaphore,
    pub(crate) render_finished: vk::Semaphore,
    /// Created signaled so the first wait on a fresh slot returns at once.
    pub(crate) in_flight: vk::Fence,
}

/// The F slots, created once and kept across chain rebuilds.
pub struct FrameSlots<'d> {
    ctx: &'d DeviceContext,
    slots: Vec<FrameSlot>,
}

impl<'d> FrameSlots<'d> {
    pub fn new(ctx: &'d DeviceContext, count: usize) -> Result<Self, RenderError> {
        let d = ctx.device();
        let sem_ci = vk::SemaphoreCreateInfo::default();
        let fence_ci = vk::FenceCreateInfo {
            s_type: vk::StructureType::FENCE_CREATE_INFO,
            flags: vk::FenceCreateFlags::SIGNALED,
            ..Default::default()
        };

        let mut this = Self {
            ctx,
            slots: Vec::with_capacity(count),
        };
        for _ in 0..count {
            // Pushed before filling so a failure half way is still released.
            this.slots.push(FrameSlot::default());
            let slot = this
                .slots
                .last_mut()
                .ok_or_else(|| RenderError::SyncCreation("slot vanished".into()))?;
            unsafe {
                slot.image_acquired = d
                    .create_semaphore(&sem_ci, None)
                    .map_err(vk_err(RenderError::SyncCreation, "vkCreateSemaphore"))?;
                slot.render_finished = d
                    .create_semaphore(&sem_ci, None)
                    .map_err(vk_err(RenderError::SyncCreation, "vkCreateSemaphore"))?;
                slot.in_flight = d
                    .create_fence(&fence_ci, None)
                    .map_err(vk_err(RenderError::SyncCreation, "vkCreateFence"))?;
            }
        }
        Ok(this)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub(crate) fn get(&self, slot: usize) -> Option<&FrameSlot> {
        self.slots.get(slot)
    }
}

impl Drop for FrameSlots<'_> {
    fn drop(&mut self) {
        let d = self.ctx.device();
        unsafe {
            for s in &self.slots {
                if s.in_flight != vk::Fence::null() {
                    d.destroy_fence(s.in_flight, None);
                }
                if s.render_finished != vk::Semaphore::null() {
                    d.destroy_semaphore(s.render_finished, None);
                }
                if s.image_acquired != vk::Semaphore::null() {
                    d.destroy_semaphore(s.image_acquired, None);
                }
            }
        }
    }
}
