// SPDX-License-Identifier: CEPL-1.0
use std::mem::size_of;

use ash::vk;
use tessel_render::{FrameUniform, RenderError};

use crate::{vk_err, DeviceContext, GpuBuffer};

/// Set 0: one uniform buffer read by the vertex stage. Shared by every chain
/// generation.
pub(crate) fn create_set_layout(
    device: &ash::Device,
) -> Result<vk::DescriptorSetLayout, RenderError> {
    let binding = vk::DescriptorSetLayoutBinding {
        binding: 0,
        descriptor_type: vk::DescriptorType::UNIFORM_BUFFER,
        descriptor_count: 1,
        stage_flags: vk::ShaderStageFlags::VERTEX,
        ..Default::default()
    };
    let ci = vk::DescriptorSetLayoutCreateInfo {
        s_type: vk::StructureType::DESCRIPTOR_SET_LAYOUT_CREATE_INFO,
        binding_count: 1,
        p_bindings: &binding,
        ..Default::default()
    };
    unsafe { device.create_descriptor_set_layout(&ci, None) }.map_err(vk_err(
        RenderError::PipelineCreation,
        "vkCreateDescriptorSetLayout",
    ))
}

/// Per swap image uniform buffer plus the descriptor set pointing at it.
pub struct FrameUniforms<'d> {
    ctx: &'d DeviceContext,
    pool: vk::DescriptorPool,
    sets: Vec<vk::DescriptorSet>,
    buffers: Vec<GpuBuffer<'d>>,
}

impl<'d> FrameUniforms<'d> {
    pub fn new(
        ctx: &'d DeviceContext,
        set_layout: vk::DescriptorSetLayout,
        image_count: usize,
    ) -> Result<Self, RenderError> {
        let device = ctx.device();
        let ubo_size = size_of::<FrameUniform>() as vk::DeviceSize;

        let mut this = Self {
            ctx,
            pool: vk::DescriptorPool::null(),
            sets: Vec::new(),
            buffers: Vec::with_capacity(image_count),
        };
        for _ in 0..image_count {
            let buffer = GpuBuffer::new(
                ctx,
                ubo_size,
                vk::BufferUsageFlags::UNIFORM_BUFFER,
                vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
            )?;
            buffer.write(FrameUniform::identity().as_bytes())?;
            this.buffers.push(buffer);
        }

        let pool_sizes = [vk::DescriptorPoolSize {
            ty: vk::DescriptorType::UNIFORM_BUFFER,
            descriptor_count: image_count as u32,
        }];
        let pool_ci = vk::DescriptorPoolCreateInfo {
            s_type: vk::StructureType::DESCRIPTOR_POOL_CREATE_INFO,
            max_sets: image_count as u32,
            pool_size_count: pool_sizes.len() as u32,
            p_pool_sizes: pool_sizes.as_ptr(),
            ..Default::default()
        };
        this.pool = unsafe { device.create_descriptor_pool(&pool_ci, None) }
            .map_err(vk_err(RenderError::BufferCreation, "vkCreateDescriptorPool"))?;

        let layouts = vec![set_layout; image_count];
        let alloc = vk::DescriptorSetAllocateInfo {
            s_type: vk::StructureType::DESCRIPTOR_SET_ALLOCATE_INFO,
            descriptor_pool: this.pool,
            descriptor_set_count: image_count as u32,
            p_set_layouts: layouts.as_ptr(),
            ..Default::default()
        };
        this.sets = unsafe { device.allocate_descriptor_sets(&alloc) }
            .map_err(vk_err(RenderError::BufferCreation, "vkAllocateDescriptorSets"))?;

        let infos: Vec<vk::DescriptorBufferInfo> = this
            .buffers
            .iter()
            .map(|b| vk::DescriptorBufferInfo {
                buffer: b.handle(),
                offset: 0,
                range: ubo_size,
            })
            .collect();
        let writes: Vec<vk::WriteDescriptorSet<'_>> = this
            .sets
            .iter()
            .zip(&infos)
            .map(|(&set, info)| vk::WriteDescriptorSet {
                s_type: vk::StructureType::WRITE_DESCRIPTOR_SET,
                dst_set: set,
                dst_binding: 0,
                descriptor_count: 1,
                descriptor_type: vk::DescriptorType::UNIFORM_BUFFER,
                p_buffer_info: info,
                ..Default::default()
            })
            .collect();
        unsafe { device.update_descriptor_sets(&writes, &[]) };

        Ok(this)
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    pub fn set(&self, image: usize) -> Option<vk::DescriptorSet> {
        self.sets.get(image).copied()
    }

    /// Overwrites the image's uniform buffer. The caller guarantees no GPU
    /// work reading it is still pending.
    pub fn write(&self, image: usize, uniform: &FrameUniform) -> Result<(), RenderError> {
        let buffer = self.buffers.get(image).ok_or_else(|| {
            RenderError::Submit(format!(
                "no uniform buffer for image {image} of {}",
                self.buffers.len()
            ))
        })?;
        buffer.write(uniform.as_bytes())
    }
}

impl Drop for FrameUniforms<'_> {
    fn drop(&mut self) {
        // Destroying the pool frees its sets; buffers drop afterwards.
        if self.pool != vk::DescriptorPool::null() {
            unsafe { self.ctx.device().destroy_descriptor_pool(self.pool, None) };
        }
    }
}
