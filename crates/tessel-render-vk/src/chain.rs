// SPDX-License-Identifier: CEPL-1.0
use ash::vk;
use tessel_render::{choose_extent, choose_image_count, ChainInfo, RenderError, RenderSize};
use tracing::info;

use crate::pipeline::{create_pipeline, create_render_pass};
use crate::surface::{
    choose_composite_alpha, choose_present_mode, choose_surface_format, extent_of,
    present_mode_name,
};
use crate::{vk_err, DeviceContext, PresentPreference, ShaderBlobs};

/// Inputs a chain build needs besides the surface itself.
#[derive(Clone, Copy, Debug)]
pub struct ChainConfig<'a> {
    pub present: PresentPreference,
    pub set_layout: vk::DescriptorSetLayout,
    pub shaders: &'a ShaderBlobs,
}

/// One generation of the presentable chain: swapchain, views, render pass,
/// pipeline and framebuffers, all sized for one extent and format.
pub struct SurfaceChain<'d> {
    ctx: &'d DeviceContext,
    generation: u64,
    swapchain: vk::SwapchainKHR,
    extent: vk::Extent2D,
    images: Vec<vk::Image>,
    views: Vec<vk::ImageView>,
    render_pass: vk::RenderPass,
    pipeline_layout: vk::PipelineLayout,
    pipeline: vk::Pipeline,
    framebuffers: Vec<vk::Framebuffer>,
}

impl<'d> SurfaceChain<'d> {
    /// Builds a complete generation for the live framebuffer `size`. The
    /// previous generation must already be destroyed; it is never handed to
    /// the driver as `oldSwapchain`.
    pub fn build(
        ctx: &'d DeviceContext,
        size: RenderSize,
        config: &ChainConfig<'_>,
        generation: u64,
    ) -> Result<Self, RenderError> {
        let support = ctx.surface_support()?;
        let caps = support.capabilities;
        let format = choose_surface_format(&support.formats).ok_or_else(|| {
            RenderError::ChainCreation("surface reports no formats".into())
        })?;
        let present_mode = choose_present_mode(&support.present_modes, config.present);
        let limits = support.limits();
        let extent = choose_extent(&limits, size);
        let min_image_count = choose_image_count(&limits);

        let swap_info = vk::SwapchainCreateInfoKHR {
            s_type: vk::StructureType::SWAPCHAIN_CREATE_INFO_KHR,
            surface: ctx.surface(),
            min_image_count,
            image_format: format.format,
            image_color_space: format.color_space,
            image_extent: extent_of(extent),
            image_array_layers: 1,
            image_usage: vk::ImageUsageFlags::COLOR_ATTACHMENT,
            image_sharing_mode: vk::SharingMode::EXCLUSIVE,
            pre_transform: caps.current_transform,
            composite_alpha: choose_composite_alpha(caps.supported_composite_alpha),
            present_mode,
            clipped: vk::TRUE,
            old_swapchain: vk::SwapchainKHR::null(),
            ..Default::default()
        };
        let swapchain = unsafe { ctx.swapchain_loader().create_swapchain(&swap_info, None) }
            .map_err(vk_err(RenderError::ChainCreation, "vkCreateSwapchainKHR"))?;

        // Everything below fills `chain` in place so a failed step drops
        // whatever was created before it.
        let mut chain = Self {
            ctx,
            generation,
            swapchain,
            extent: extent_of(extent),
            images: Vec::new(),
            views: Vec::new(),
            render_pass: vk::RenderPass::null(),
            pipeline_layout: vk::PipelineLayout::null(),
            pipeline: vk::Pipeline::null(),
            framebuffers: Vec::new(),
        };
        let device = ctx.device();

        chain.images = unsafe { ctx.swapchain_loader().get_swapchain_images(swapchain) }
            .map_err(vk_err(RenderError::ChainCreation, "vkGetSwapchainImagesKHR"))?;

        for &image in &chain.images {
            let iv_info = vk::ImageViewCreateInfo {
                s_type: vk::StructureType::IMAGE_VIEW_CREATE_INFO,
                image,
                view_type: vk::ImageViewType::TYPE_2D,
                format: format.format,
                components: vk::ComponentMapping::default(),
                subresource_range: vk::ImageSubresourceRange {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    base_mip_level: 0,
                    level_count: 1,
                    base_array_layer: 0,
                    layer_count: 1,
                },
                ..Default::default()
            };
            let view = unsafe { device.create_image_view(&iv_info, None) }
                .map_err(vk_err(RenderError::ChainCreation, "vkCreateImageView"))?;
            chain.views.push(view);
        }

        chain.render_pass = create_render_pass(device, format.format)?;
        let (layout, pipeline) = create_pipeline(
            device,
            chain.render_pass,
            chain.extent,
            config.set_layout,
            config.shaders,
        )?;
        chain.pipeline_layout = layout;
        chain.pipeline = pipeline;

        for &view in &chain.views {
            let fb_info = vk::FramebufferCreateInfo {
                s_type: vk::StructureType::FRAMEBUFFER_CREATE_INFO,
                render_pass: chain.render_pass,
                attachment_count: 1,
                p_attachments: &view,
                width: chain.extent.width,
                height: chain.extent.height,
                layers: 1,
                ..Default::default()
            };
            let fb = unsafe { device.create_framebuffer(&fb_info, None) }
                .map_err(vk_err(RenderError::ChainCreation, "vkCreateFramebuffer"))?;
            chain.framebuffers.push(fb);
        }

        info!(
            "chain generation {generation}: {:?} / {:?}, present mode {}, extent {extent}, images (min {} -> asked {} -> got {})",
            format.format,
            format.color_space,
            present_mode_name(present_mode),
            caps.min_image_count,
            min_image_count,
            chain.images.len()
        );
        Ok(chain)
    }

    pub fn info(&self) -> ChainInfo {
        ChainInfo {
            image_count: self.images.len(),
            extent: RenderSize::new(self.extent.width, self.extent.height),
            generation: self.generation,
        }
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    pub fn swapchain(&self) -> vk::SwapchainKHR {
        self.swapchain
    }

    pub fn render_pass(&self) -> vk::RenderPass {
        self.render_pass
    }

    pub fn pipeline(&self) -> vk::Pipeline {
        self.pipeline
    }

    pub fn pipeline_layout(&self) -> vk::PipelineLayout {
        self.pipeline_layout
    }

    pub fn framebuffer(&self, image: usize) -> Option<vk::Framebuffer> {
        self.framebuffers.get(image).copied()
    }
}

// STRICT TEARDOWN ORDER: framebuffers, pipeline, layout, render pass, views,
// then the swapchain, which owns the images.
impl Drop for SurfaceChain<'_> {
    fn drop(&mut self) {
        let d = self.ctx.device();
        unsafe {
            for &fb in &self.framebuffers {
                d.destroy_framebuffer(fb, None);
            }
            if self.pipeline != vk::Pipeline::null() {
                d.destroy_pipeline(self.pipeline, None);
            }
            if self.pipeline_layout != vk::PipelineLayout::null() {
                d.destroy_pipeline_layout(self.pipeline_layout, None);
            }
            if self.render_pass != vk::RenderPass::null() {
                d.destroy_render_pass(self.render_pass, None);
            }
            for &iv in &self.views {
                d.destroy_image_view(iv, None);
            }
            self.ctx
                .swapchain_loader()
                .destroy_swapchain(self.swapchain, None);
        }
    }
}
