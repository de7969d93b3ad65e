// SPDX-License-Identifier: CEPL-1.0
use std::io::Cursor;

use ash::util::read_spv;
use ash::vk;
use tessel_render::RenderError;

use crate::{vk_err, Vertex};

const SPIRV_MAGIC: u32 = 0x0723_0203;

/// Precompiled SPIR-V for the vertex and fragment stages.
#[derive(Clone, Debug)]
pub struct ShaderBlobs {
    pub vertex: Vec<u8>,
    pub fragment: Vec<u8>,
}

/// Decodes a SPIR-V blob into words, rejecting anything without the magic
/// header.
pub(crate) fn spirv_words(stage: &str, bytes: &[u8]) -> Result<Vec<u32>, RenderError> {
    let words = read_spv(&mut Cursor::new(bytes))
        .map_err(|e| RenderError::ShaderModule(format!("{stage} shader: {e}")))?;
    match words.first() {
        Some(&SPIRV_MAGIC) => Ok(words),
        Some(&other) => Err(RenderError::ShaderModule(format!(
            "{stage} shader: bad SPIR-V magic {other:#010x}"
        ))),
        None => Err(RenderError::ShaderModule(format!(
            "{stage} shader: empty blob"
        ))),
    }
}

/// Single colour attachment: cleared on load, stored, handed to presentation.
pub(crate) fn color_attachment(format: vk::Format) -> vk::AttachmentDescription {
    vk::AttachmentDescription {
        format,
        samples: vk::SampleCountFlags::TYPE_1,
        load_op: vk::AttachmentLoadOp::CLEAR,
        store_op: vk::AttachmentStoreOp::STORE,
        stencil_load_op: vk::AttachmentLoadOp::DONT_CARE,
        stencil_store_op: vk::AttachmentStoreOp::DONT_CARE,
        initial_layout: vk::ImageLayout::UNDEFINED,
        final_layout: vk::ImageLayout::PRESENT_SRC_KHR,
        ..Default::default()
    }
}

/// The first colour write waits until the presentation engine has released
/// the image, which is what "image acquired" is waited on for.
pub(crate) fn acquire_dependency() -> vk::SubpassDependency {
    vk::SubpassDependency {
        src_subpass: vk::SUBPASS_EXTERNAL,
        dst_subpass: 0,
        src_stage_mask: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
        src_access_mask: vk::AccessFlags::empty(),
        dst_stage_mask: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
        dst_access_mask: vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
        ..Default::default()
    }
}

pub(crate) fn create_render_pass(
    device: &ash::Device,
    format: vk::Format,
) -> Result<vk::RenderPass, RenderError> {
    let color_att = color_attachment(format);
    let att_ref = vk::AttachmentReference {
        attachment: 0,
        layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
    };
    let subpass = vk::SubpassDescription {
        pipeline_bind_point: vk::PipelineBindPoint::GRAPHICS,
        color_attachment_count: 1,
        p_color_attachments: &att_ref,
        ..Default::default()
    };
    let dependency = acquire_dependency();

    let rp_info = vk::RenderPassCreateInfo {
        s_type: vk::StructureType::RENDER_PASS_CREATE_INFO,
        attachment_count: 1,
        p_attachments: &color_att,
        subpass_count: 1,
        p_subpasses: &subpass,
        dependency_count: 1,
        p_dependencies: &dependency,
        ..Default::default()
    };
    unsafe { device.create_render_pass(&rp_info, None) }
        .map_err(vk_err(RenderError::ChainCreation, "vkCreateRenderPass"))
}

fn create_shader_module(
    device: &ash::Device,
    stage: &str,
    bytes: &[u8],
) -> Result<vk::ShaderModule, RenderError> {
    let code = spirv_words(stage, bytes)?;
    let ci = vk::ShaderModuleCreateInfo {
        s_type: vk::StructureType::SHADER_MODULE_CREATE_INFO,
        p_code: code.as_ptr(),
        code_size: code.len() * 4,
        ..Default::default()
    };
    unsafe { device.create_shader_module(&ci, None) }
        .map_err(vk_err(RenderError::ShaderModule, "vkCreateShaderModule"))
}

/// Builds the fixed pipeline for one chain generation. Viewport and scissor
/// are baked in for `extent`, so the pipeline lives and dies with the chain.
pub(crate) fn create_pipeline(
    device: &ash::Device,
    render_pass: vk::RenderPass,
    extent: vk::Extent2D,
    set_layout: vk::DescriptorSetLayout,
    shaders: &ShaderBlobs,
) -> Result<(vk::PipelineLayout, vk::Pipeline), RenderError> {
    let vs = create_shader_module(device, "vertex", &shaders.vertex)?;
    let fs = match create_shader_module(device, "fragment", &shaders.fragment) {
        Ok(fs) => fs,
        Err(e) => {
            unsafe { device.destroy_shader_module(vs, None) };
            return Err(e);
        }
    };

    let result = build_with_modules(device, render_pass, extent, set_layout, vs, fs);

    // Modules are only needed while the pipeline is being created.
    unsafe {
        device.destroy_shader_module(vs, None);
        device.destroy_shader_module(fs, None);
    }
    result
}

fn build_with_modules(
    device: &ash::Device,
    render_pass: vk::RenderPass,
    extent: vk::Extent2D,
    set_layout: vk::DescriptorSetLayout,
    vs: vk::ShaderModule,
    fs: vk::ShaderModule,
) -> Result<(vk::PipelineLayout, vk::Pipeline), RenderError> {
    let entry = c"main";
    let stages = [
        vk::PipelineShaderStageCreateInfo {
            s_type: vk::StructureType::PIPELINE_SHADER_STAGE_CREATE_INFO,
            stage: vk::ShaderStageFlags::VERTEX,
            module: vs,
            p_name: entry.as_ptr(),
            ..Default::default()
        },
        vk::PipelineShaderStageCreateInfo {
            s_type: vk::StructureType::PIPELINE_SHADER_STAGE_CREATE_INFO,
            stage: vk::ShaderStageFlags::FRAGMENT,
            module: fs,
            p_name: entry.as_ptr(),
            ..Default::default()
        },
    ];

    let vb = Vertex::binding();
    let va = Vertex::attributes();
    let vertex_input = vk::PipelineVertexInputStateCreateInfo {
        s_type: vk::StructureType::PIPELINE_VERTEX_INPUT_STATE_CREATE_INFO,
        vertex_binding_description_count: 1,
        p_vertex_binding_descriptions: &vb,
        vertex_attribute_description_count: va.len() as u32,
        p_vertex_attribute_descriptions: va.as_ptr(),
        ..Default::default()
    };
    let input_assembly = vk::PipelineInputAssemblyStateCreateInfo {
        s_type: vk::StructureType::PIPELINE_INPUT_ASSEMBLY_STATE_CREATE_INFO,
        topology: vk::PrimitiveTopology::TRIANGLE_LIST,
        ..Default::default()
    };

    let viewport = vk::Viewport {
        x: 0.0,
        y: 0.0,
        width: extent.width as f32,
        height: extent.height as f32,
        min_depth: 0.0,
        max_depth: 1.0,
    };
    let scissor = vk::Rect2D {
        offset: vk::Offset2D { x: 0, y: 0 },
        extent,
    };
    let viewport_state = vk::PipelineViewportStateCreateInfo {
        s_type: vk::StructureType::PIPELINE_VIEWPORT_STATE_CREATE_INFO,
        viewport_count: 1,
        p_viewports: &viewport,
        scissor_count: 1,
        p_scissors: &scissor,
        ..Default::default()
    };

    // The mesh spins in 2D; both windings must stay visible.
    let raster = vk::PipelineRasterizationStateCreateInfo {
        s_type: vk::StructureType::PIPELINE_RASTERIZATION_STATE_CREATE_INFO,
        polygon_mode: vk::PolygonMode::FILL,
        cull_mode: vk::CullModeFlags::NONE,
        front_face: vk::FrontFace::COUNTER_CLOCKWISE,
        line_width: 1.0,
        ..Default::default()
    };
    let multisample = vk::PipelineMultisampleStateCreateInfo {
        s_type: vk::StructureType::PIPELINE_MULTISAMPLE_STATE_CREATE_INFO,
        rasterization_samples: vk::SampleCountFlags::TYPE_1,
        ..Default::default()
    };
    let color_blend_att = vk::PipelineColorBlendAttachmentState {
        color_write_mask: vk::ColorComponentFlags::R
            | vk::ColorComponentFlags::G
            | vk::ColorComponentFlags::B
            | vk::ColorComponentFlags::A,
        blend_enable: vk::FALSE,
        ..Default::default()
    };
    let color_blend = vk::PipelineColorBlendStateCreateInfo {
        s_type: vk::StructureType::PIPELINE_COLOR_BLEND_STATE_CREATE_INFO,
        attachment_count: 1,
        p_attachments: &color_blend_att,
        ..Default::default()
    };

    let layout_info = vk::PipelineLayoutCreateInfo {
        s_type: vk::StructureType::PIPELINE_LAYOUT_CREATE_INFO,
        set_layout_count: 1,
        p_set_layouts: &set_layout,
        ..Default::default()
    };
    let layout = unsafe { device.create_pipeline_layout(&layout_info, None) }
        .map_err(vk_err(RenderError::PipelineCreation, "vkCreatePipelineLayout"))?;

    let pipeline_info = vk::GraphicsPipelineCreateInfo {
        s_type: vk::StructureType::GRAPHICS_PIPELINE_CREATE_INFO,
        stage_count: stages.len() as u32,
        p_stages: stages.as_ptr(),
        p_vertex_input_state: &vertex_input,
        p_input_assembly_state: &input_assembly,
        p_viewport_state: &viewport_state,
        p_rasterization_state: &raster,
        p_multisample_state: &multisample,
        p_color_blend_state: &color_blend,
        layout,
        render_pass,
        subpass: 0,
        ..Default::default()
    };

    let created = unsafe {
        device.create_graphics_pipelines(
            vk::PipelineCache::null(),
            std::slice::from_ref(&pipeline_info),
            None,
        )
    };
    match created {
        Ok(pipelines) => match pipelines.first() {
            Some(&pipeline) => Ok((layout, pipeline)),
            None => {
                unsafe { device.destroy_pipeline_layout(layout, None) };
                Err(RenderError::PipelineCreation(
                    "vkCreateGraphicsPipelines returned no pipeline".into(),
                ))
            }
        },
        Err((partial, err)) => {
            unsafe {
                for p in partial {
                    if p != vk::Pipeline::null() {
                        device.destroy_pipeline(p, None);
                    }
                }
                device.destroy_pipeline_layout(layout, None);
            }
            Err(RenderError::PipelineCreation(format!(
                "vkCreateGraphicsPipelines: {err}"
            )))
        }
    }
}
