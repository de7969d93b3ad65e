// SPDX-License-Identifier: CEPL-1.0
use ash::vk;
use tessel_render::RenderError;

use crate::{vk_err, DeviceContext, FrameUniforms, GeometryStore, SurfaceChain};

pub fn clear_value(rgba: [f32; 4]) -> vk::ClearValue {
    vk::ClearValue {
        color: vk::ClearColorValue { float32: rgba },
    }
}

/// One primary command buffer per swap image, recorded once per chain
/// generation and replayed every frame.
pub struct CommandSet<'d> {
    ctx: &'d DeviceContext,
    buffers: Vec<vk::CommandBuffer>,
}

impl<'d> CommandSet<'d> {
    pub fn allocate(ctx: &'d DeviceContext, count: usize) -> Result<Self, RenderError> {
        let ai = vk::CommandBufferAllocateInfo {
            s_type: vk::StructureType::COMMAND_BUFFER_ALLOCATE_INFO,
            command_pool: ctx.command_pool(),
            level: vk::CommandBufferLevel::PRIMARY,
            command_buffer_count: count as u32,
            ..Default::default()
        };
        let buffers = unsafe { ctx.device().allocate_command_buffers(&ai) }
            .map_err(vk_err(RenderError::CommandRecording, "vkAllocateCommandBuffers"))?;
        Ok(Self { ctx, buffers })
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    pub fn buffer(&self, image: usize) -> Option<vk::CommandBuffer> {
        self.buffers.get(image).copied()
    }

    /// Records the full draw for every image: clear, bind, one indexed draw.
    pub fn record(
        &self,
        chain: &SurfaceChain<'_>,
        geometry: &GeometryStore<'_>,
        uniforms: &FrameUniforms<'_>,
        clear: vk::ClearValue,
    ) -> Result<(), RenderError> {
        if self.buffers.len() != chain.image_count() || uniforms.len() != chain.image_count() {
            return Err(RenderError::CommandRecording(format!(
                "{} command buffers and {} uniform sets for {} images",
                self.buffers.len(),
                uniforms.len(),
                chain.image_count()
            )));
        }
        for (image, &cmd) in self.buffers.iter().enumerate() {
            let (framebuffer, set) = chain
                .framebuffer(image)
                .zip(uniforms.set(image))
                .ok_or_else(|| {
                    RenderError::CommandRecording(format!("image {image} has no framebuffer"))
                })?;
            self.record_one(cmd, chain, framebuffer, set, geometry, clear)?;
        }
        Ok(())
    }

    fn record_one(
        &self,
        cmd: vk::CommandBuffer,
        chain: &SurfaceChain<'_>,
        framebuffer: vk::Framebuffer,
        set: vk::DescriptorSet,
        geometry: &GeometryStore<'_>,
        clear: vk::ClearValue,
    ) -> Result<(), RenderError> {
        let d = self.ctx.device();
        let begin = vk::CommandBufferBeginInfo {
            s_type: vk::StructureType::COMMAND_BUFFER_BEGIN_INFO,
            ..Default::default()
        };
        let rp_begin = vk::RenderPassBeginInfo {
            s_type: vk::StructureType::RENDER_PASS_BEGIN_INFO,
            render_pass: chain.render_pass(),
            framebuffer,
            render_area: vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: chain.extent(),
            },
            clear_value_count: 1,
            p_clear_values: &clear,
            ..Default::default()
        };
        unsafe {
            d.begin_command_buffer(cmd, &begin)
                .map_err(vk_err(RenderError::CommandRecording, "vkBeginCommandBuffer"))?;
            d.cmd_begin_render_pass(cmd, &rp_begin, vk::SubpassContents::INLINE);
            d.cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, chain.pipeline());
            d.cmd_bind_vertex_buffers(cmd, 0, &[geometry.vertex_buffer()], &[0]);
            d.cmd_bind_index_buffer(cmd, geometry.index_buffer(), 0, geometry.index_type());
            d.cmd_bind_descriptor_sets(
                cmd,
                vk::PipelineBindPoint::GRAPHICS,
                chain.pipeline_layout(),
                0,
                &[set],
                &[],
            );
            d.cmd_draw_indexed(cmd, geometry.index_count(), 1, 0, 0, 0);
            d.cmd_end_render_pass(cmd);
            d.end_command_buffer(cmd)
                .map_err(vk_err(RenderError::CommandRecording, "vkEndCommandBuffer"))?;
        }
        Ok(())
    }
}

impl Drop for CommandSet<'_> {
    fn drop(&mut self) {
        if !self.buffers.is_empty() {
            unsafe {
                self.ctx
                    .device()
                    .free_command_buffers(self.ctx.command_pool(), &self.buffers)
            };
        }
    }
}
