// SPDX-License-Identifier: CEPL-1.0
use std::mem::{offset_of, size_of};

use ash::vk;
use bytemuck::{Pod, Zeroable};
use tessel_render::RenderError;
use tracing::debug;

use crate::{DeviceContext, GpuBuffer};

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub pos: [f32; 2],
    pub color: [f32; 3],
}

impl Vertex {
    pub const fn new(pos: [f32; 2], color: [f32; 3]) -> Self {
        Self { pos, color }
    }

    pub fn binding() -> vk::VertexInputBindingDescription {
        vk::VertexInputBindingDescription {
            binding: 0,
            stride: size_of::<Vertex>() as u32,
            input_rate: vk::VertexInputRate::VERTEX,
        }
    }

    pub fn attributes() -> [vk::VertexInputAttributeDescription; 2] {
        [
            vk::VertexInputAttributeDescription {
                location: 0,
                binding: 0,
                format: vk::Format::R32G32_SFLOAT,
                offset: offset_of!(Vertex, pos) as u32,
            },
            vk::VertexInputAttributeDescription {
                location: 1,
                binding: 0,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: offset_of!(Vertex, color) as u32,
            },
        ]
    }
}

fn validate(vertices: &[Vertex], indices: &[u16]) -> Result<(), RenderError> {
    if vertices.is_empty() || indices.is_empty() {
        return Err(RenderError::BufferCreation(format!(
            "geometry needs vertices and indices, got {} and {}",
            vertices.len(),
            indices.len()
        )));
    }
    if let Some(&bad) = indices.iter().find(|&&i| usize::from(i) >= vertices.len()) {
        return Err(RenderError::BufferCreation(format!(
            "index {bad} is out of range for {} vertices",
            vertices.len()
        )));
    }
    Ok(())
}

/// Device-local vertex and index buffers, immutable once uploaded.
pub struct GeometryStore<'d> {
    vertices: GpuBuffer<'d>,
    indices: GpuBuffer<'d>,
    index_count: u32,
}

impl<'d> GeometryStore<'d> {
    pub fn upload(
        ctx: &'d DeviceContext,
        vertices: &[Vertex],
        indices: &[u16],
    ) -> Result<Self, RenderError> {
        validate(vertices, indices)?;

        let vertex_buf = upload_via_staging(
            ctx,
            bytemuck::cast_slice(vertices),
            vk::BufferUsageFlags::VERTEX_BUFFER,
        )?;
        let index_buf = upload_via_staging(
            ctx,
            bytemuck::cast_slice(indices),
            vk::BufferUsageFlags::INDEX_BUFFER,
        )?;
        debug!(
            "geometry uploaded: {} vertices, {} indices",
            vertices.len(),
            indices.len()
        );

        Ok(Self {
            vertices: vertex_buf,
            indices: index_buf,
            index_count: indices.len() as u32,
        })
    }

    pub fn vertex_buffer(&self) -> vk::Buffer {
        self.vertices.handle()
    }

    pub fn index_buffer(&self) -> vk::Buffer {
        self.indices.handle()
    }

    pub fn index_type(&self) -> vk::IndexType {
        vk::IndexType::UINT16
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }
}

/// One-shot staging upload: host -> staging, then staging -> device-local.
/// Blocks until the copy is done; the staging buffer is gone on return.
fn upload_via_staging<'d>(
    ctx: &'d DeviceContext,
    bytes: &[u8],
    usage: vk::BufferUsageFlags,
) -> Result<GpuBuffer<'d>, RenderError> {
    let size = bytes.len() as vk::DeviceSize;
    let staging = GpuBuffer::new(
        ctx,
        size,
        vk::BufferUsageFlags::TRANSFER_SRC,
        vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
    )?;
    staging.write(bytes)?;

    let dst = GpuBuffer::new(
        ctx,
        size,
        usage | vk::BufferUsageFlags::TRANSFER_DST,
        vk::MemoryPropertyFlags::DEVICE_LOCAL,
    )?;
    ctx.one_shot(|device, cmd| {
        let region = vk::BufferCopy {
            src_offset: 0,
            dst_offset: 0,
            size,
        };
        unsafe {
            device.cmd_copy_buffer(
                cmd,
                staging.handle(),
                dst.handle(),
                std::slice::from_ref(&region),
            )
        };
    })?;
    Ok(dst)
}
