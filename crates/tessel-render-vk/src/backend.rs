// SPDX-License-Identifier: CEPL-1.0
use ash::vk;
use tessel_render::{
    Acquire, ChainInfo, FrameUniform, PresentStatus, RenderBackend, RenderError, RenderSize,
};
use tracing::{debug, warn};

use crate::sync::FrameSlot;
use crate::uniforms::create_set_layout;
use crate::{
    clear_value, vk_err, ChainConfig, CommandSet, DeviceContext, FrameSlots, FrameUniforms,
    GeometryStore, PresentPreference, ShaderBlobs, SurfaceChain,
};

#[derive(Clone, Copy, Debug)]
pub struct BackendOptions {
    pub present: PresentPreference,
    pub clear_color: [f32; 4],
}

impl Default for BackendOptions {
    fn default() -> Self {
        Self {
            present: PresentPreference::default(),
            clear_color: [0.02, 0.02, 0.04, 1.0],
        }
    }
}

/// Everything that lives and dies with one chain generation. Field order is
/// drop order: command buffers and uniforms go before the chain.
struct Generation<'d> {
    commands: CommandSet<'d>,
    uniforms: FrameUniforms<'d>,
    chain: SurfaceChain<'d>,
}

/// [`RenderBackend`] over a live Vulkan device.
///
/// Geometry, shaders and the descriptor set layout are built once; chain
/// generations come and go underneath them.
pub struct VkBackend<'d> {
    ctx: &'d DeviceContext,
    options: BackendOptions,
    shaders: ShaderBlobs,
    set_layout: vk::DescriptorSetLayout,
    slots: Option<FrameSlots<'d>>,
    current: Option<Generation<'d>>,
    generations_built: u64,
    geometry: GeometryStore<'d>,
}

impl<'d> VkBackend<'d> {
    pub fn new(
        ctx: &'d DeviceContext,
        geometry: GeometryStore<'d>,
        shaders: ShaderBlobs,
        options: BackendOptions,
    ) -> Result<Self, RenderError> {
        let set_layout = create_set_layout(ctx.device())?;
        Ok(Self {
            ctx,
            options,
            shaders,
            set_layout,
            slots: None,
            current: None,
            generations_built: 0,
            geometry,
        })
    }

    fn slot(&self, slot: usize) -> Result<FrameSlot, RenderError> {
        self.slots
            .as_ref()
            .and_then(|s| s.get(slot))
            .copied()
            .ok_or_else(|| RenderError::Submit(format!("frame slot {slot} does not exist")))
    }

    fn generation(&self) -> Result<&Generation<'d>, RenderError> {
        self.current
            .as_ref()
            .ok_or_else(|| RenderError::Submit("no surface chain is built".into()))
    }
}

impl RenderBackend for VkBackend<'_> {
    fn create_frame_slots(&mut self, count: usize) -> Result<(), RenderError> {
        self.slots = Some(FrameSlots::new(self.ctx, count)?);
        debug!("created {count} frame slots");
        Ok(())
    }

    fn build_chain(&mut self, size: RenderSize) -> Result<ChainInfo, RenderError> {
        if self.current.is_some() {
            warn!("building a chain over a live one; releasing it first");
            self.destroy_chain();
        }
        let config = ChainConfig {
            present: self.options.present,
            set_layout: self.set_layout,
            shaders: &self.shaders,
        };
        let generation = self.generations_built + 1;
        let chain = SurfaceChain::build(self.ctx, size, &config, generation)?;
        let uniforms = FrameUniforms::new(self.ctx, self.set_layout, chain.image_count())?;
        let commands = CommandSet::allocate(self.ctx, chain.image_count())?;
        let info = chain.info();

        self.generations_built = generation;
        self.current = Some(Generation {
            commands,
            uniforms,
            chain,
        });
        Ok(info)
    }

    fn destroy_chain(&mut self) {
        if let Some(old) = self.current.take() {
            debug!("releasing chain generation {}", old.chain.info().generation);
        }
    }

    fn record_commands(&mut self) -> Result<(), RenderError> {
        let g = self
            .current
            .as_ref()
            .ok_or_else(|| RenderError::CommandRecording("no surface chain is built".into()))?;
        g.commands.record(
            &g.chain,
            &self.geometry,
            &g.uniforms,
            clear_value(self.options.clear_color),
        )
    }

    fn wait_for_slot(&mut self, slot: usize) -> Result<(), RenderError> {
        let fence = self.slot(slot)?.in_flight;
        unsafe { self.ctx.device().wait_for_fences(&[fence], true, u64::MAX) }
            .map_err(vk_err(RenderError::FenceWait, "vkWaitForFences"))
    }

    fn reset_slot(&mut self, slot: usize) -> Result<(), RenderError> {
        let fence = self.slot(slot)?.in_flight;
        unsafe { self.ctx.device().reset_fences(&[fence]) }
            .map_err(vk_err(RenderError::Submit, "vkResetFences"))
    }

    fn acquire_image(&mut self, slot: usize) -> Result<Acquire, RenderError> {
        let semaphore = self.slot(slot)?.image_acquired;
        let swapchain = self.generation()?.chain.swapchain();
        let result = unsafe {
            self.ctx.swapchain_loader().acquire_next_image(
                swapchain,
                u64::MAX,
                semaphore,
                vk::Fence::null(),
            )
        };
        match result {
            Ok((index, suboptimal)) => Ok(Acquire::Image {
                index: index as usize,
                suboptimal,
            }),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(Acquire::OutOfDate),
            Err(e) => Err(RenderError::Acquire(format!("vkAcquireNextImageKHR: {e}"))),
        }
    }

    fn write_uniform(&mut self, image: usize, uniform: &FrameUniform) -> Result<(), RenderError> {
        self.generation()?.uniforms.write(image, uniform)
    }

    fn submit(&mut self, slot: usize, image: usize) -> Result<(), RenderError> {
        let s = self.slot(slot)?;
        let cmd = self.generation()?.commands.buffer(image).ok_or_else(|| {
            RenderError::Submit(format!("no command buffer for image {image}"))
        })?;
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let submit = vk::SubmitInfo {
            s_type: vk::StructureType::SUBMIT_INFO,
            wait_semaphore_count: 1,
            p_wait_semaphores: &s.image_acquired,
            p_wait_dst_stage_mask: wait_stages.as_ptr(),
            command_buffer_count: 1,
            p_command_buffers: &cmd,
            signal_semaphore_count: 1,
            p_signal_semaphores: &s.render_finished,
            ..Default::default()
        };
        unsafe {
            self.ctx
                .device()
                .queue_submit(self.ctx.queue(), std::slice::from_ref(&submit), s.in_flight)
        }
        .map_err(vk_err(RenderError::Submit, "vkQueueSubmit"))
    }

    fn present(&mut self, slot: usize, image: usize) -> Result<PresentStatus, RenderError> {
        let s = self.slot(slot)?;
        let swapchain = self.generation()?.chain.swapchain();
        let index = image as u32;
        let present = vk::PresentInfoKHR {
            s_type: vk::StructureType::PRESENT_INFO_KHR,
            wait_semaphore_count: 1,
            p_wait_semaphores: &s.render_finished,
            swapchain_count: 1,
            p_swapchains: &swapchain,
            p_image_indices: &index,
            ..Default::default()
        };
        match unsafe {
            self.ctx
                .swapchain_loader()
                .queue_present(self.ctx.queue(), &present)
        } {
            Ok(false) => Ok(PresentStatus::Optimal),
            Ok(true) => Ok(PresentStatus::Suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentStatus::OutOfDate),
            Err(e) => Err(RenderError::Present(format!("vkQueuePresentKHR: {e}"))),
        }
    }

    fn wait_idle(&mut self) -> Result<(), RenderError> {
        self.ctx.wait_idle()
    }
}

// Chain generation, then slots, then the shared layout. Geometry drops last
// as a field.
impl Drop for VkBackend<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.ctx.wait_idle() {
            warn!("teardown: {e}");
        }
        self.current = None;
        self.slots = None;
        unsafe {
            self.ctx
                .device()
                .destroy_descriptor_set_layout(self.set_layout, None)
        };
    }
}
