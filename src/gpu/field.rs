//! Flow field storage on the GPU.

use wgpu::util::DeviceExt;

use crate::flow_field::FlowField;

/// The packed flow field, three `f32` per cell, read by the compute step
/// and the overlay.
pub struct FlowFieldGpu {
    buffer: wgpu::Buffer,
    size: u32,
}

impl FlowFieldGpu {
    pub fn new(device: &wgpu::Device, field: &FlowField) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Flow Field Buffer"),
            contents: bytemuck::cast_slice(&field.to_gpu_data()),
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        });
        Self {
            buffer,
            size: field.size(),
        }
    }

    /// Overwrite the cells in place. Returns `false` if the field has a
    /// different size, in which case a new [`FlowFieldGpu`] is needed.
    pub fn write(&self, queue: &wgpu::Queue, field: &FlowField) -> bool {
        if field.size() != self.size {
            return false;
        }
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&field.to_gpu_data()));
        true
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Cells per axis.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Vertices needed to draw one line per cell.
    pub fn overlay_vertex_count(&self) -> u32 {
        self.size * self.size * self.size * 2
    }
}
