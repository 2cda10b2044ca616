//! Command pool and command buffer recording.
//!
//! # Overview
//!
//! - [`CommandPool`] owns a resettable `vk::CommandPool` for the graphics
//!   family and hands out primary command buffers. Buffers are freed with the
//!   pool.
//! - [`CommandBuffer`] wraps a borrowed `vk::CommandBuffer` with the
//!   recording calls the frame recorders need. Begin/end and submission are
//!   driven through [`crate::gpu::GpuDevice`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use vkchain_rhi::command::{CommandBuffer, CommandPool};
//! use vkchain_rhi::device::Device;
//!
//! # fn example(device: Arc<Device>) -> vkchain_rhi::RhiResult<()> {
//! let pool = CommandPool::for_graphics(device.clone())?;
//! let handles = pool.allocate_command_buffers(2)?;
//! let cmd = CommandBuffer::from_handle(device, handles[0]);
//! cmd.draw(3, 1, 0, 0);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use ash::vk;
use tracing::info;

use crate::device::Device;
use crate::error::{RhiError, RhiResult, VkResultExt};
use crate::gpu::GpuDevice;

/// A command pool whose buffers can be reset individually.
///
/// Not thread-safe; record from one thread at a time.
pub struct CommandPool {
    device: Arc<Device>,
    pool: vk::CommandPool,
    queue_family_index: u32,
}

impl CommandPool {
    /// Creates a pool for `queue_family_index` with `RESET_COMMAND_BUFFER`.
    pub fn new(device: Arc<Device>, queue_family_index: u32) -> RhiResult<Self> {
        let create_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(queue_family_index)
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

        let pool = unsafe {
            device
                .handle()
                .create_command_pool(&create_info, None)
                .call("vkCreateCommandPool")?
        };

        info!(
            "Command pool created for queue family {}",
            queue_family_index
        );

        Ok(Self {
            device,
            pool,
            queue_family_index,
        })
    }

    /// Creates a pool on the device's graphics family.
    pub fn for_graphics(device: Arc<Device>) -> RhiResult<Self> {
        let family = device.queue_families().graphics_family.ok_or_else(|| {
            RhiError::ConfigurationError("Graphics queue family is not resolved".to_string())
        })?;
        Self::new(device, family)
    }

    #[inline]
    pub fn handle(&self) -> vk::CommandPool {
        self.pool
    }

    #[inline]
    pub fn queue_family_index(&self) -> u32 {
        self.queue_family_index
    }

    /// Allocates `count` primary command buffers.
    pub fn allocate_command_buffers(&self, count: u32) -> RhiResult<Vec<vk::CommandBuffer>> {
        if count == 0 {
            return Err(RhiError::InvalidArgument(
                "Command buffer count must be greater than 0".to_string(),
            ));
        }

        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count);

        unsafe {
            self.device
                .handle()
                .allocate_command_buffers(&alloc_info)
                .call("vkAllocateCommandBuffers")
        }
    }
}

impl Drop for CommandPool {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_command_pool(self.pool, None);
        }
        info!(
            "Command pool destroyed for queue family {}",
            self.queue_family_index
        );
    }
}

/// Recording view of a command buffer.
///
/// Does not own the handle; it is freed with its [`CommandPool`].
pub struct CommandBuffer {
    device: Arc<Device>,
    buffer: vk::CommandBuffer,
}

impl CommandBuffer {
    #[inline]
    pub fn from_handle(device: Arc<Device>, buffer: vk::CommandBuffer) -> Self {
        Self { device, buffer }
    }

    #[inline]
    pub fn handle(&self) -> vk::CommandBuffer {
        self.buffer
    }

    // =========================================================================
    // Render Pass
    // =========================================================================

    /// Begins `render_pass` on `framebuffer` covering the whole `extent`.
    ///
    /// `clear_values` is indexed by attachment.
    pub fn begin_render_pass(
        &self,
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        extent: vk::Extent2D,
        clear_values: &[vk::ClearValue],
    ) {
        let begin_info = vk::RenderPassBeginInfo::default()
            .render_pass(render_pass)
            .framebuffer(framebuffer)
            .render_area(full_rect(extent))
            .clear_values(clear_values);

        unsafe {
            self.device.handle().cmd_begin_render_pass(
                self.buffer,
                &begin_info,
                vk::SubpassContents::INLINE,
            );
        }
    }

    pub fn end_render_pass(&self) {
        unsafe {
            self.device.handle().cmd_end_render_pass(self.buffer);
        }
    }

    // =========================================================================
    // Pipeline Binding
    // =========================================================================

    pub fn bind_graphics_pipeline(&self, pipeline: vk::Pipeline) {
        unsafe {
            self.device.handle().cmd_bind_pipeline(
                self.buffer,
                vk::PipelineBindPoint::GRAPHICS,
                pipeline,
            );
        }
    }

    pub fn bind_vertex_buffers(
        &self,
        first_binding: u32,
        buffers: &[vk::Buffer],
        offsets: &[vk::DeviceSize],
    ) {
        unsafe {
            self.device.handle().cmd_bind_vertex_buffers(
                self.buffer,
                first_binding,
                buffers,
                offsets,
            );
        }
    }

    // =========================================================================
    // Dynamic State
    // =========================================================================

    /// Sets viewport and scissor to cover `extent`, depth range `[0, 1]`.
    pub fn set_full_viewport(&self, extent: vk::Extent2D) {
        let viewport = full_viewport(extent);
        let scissor = full_rect(extent);
        unsafe {
            let device = self.device.handle();
            device.cmd_set_viewport(self.buffer, 0, std::slice::from_ref(&viewport));
            device.cmd_set_scissor(self.buffer, 0, std::slice::from_ref(&scissor));
        }
    }

    // =========================================================================
    // Drawing
    // =========================================================================

    pub fn draw(
        &self,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) {
        unsafe {
            self.device.handle().cmd_draw(
                self.buffer,
                vertex_count,
                instance_count,
                first_vertex,
                first_instance,
            );
        }
    }
}

/// Viewport covering `extent` with the standard depth range.
pub fn full_viewport(extent: vk::Extent2D) -> vk::Viewport {
    vk::Viewport {
        x: 0.0,
        y: 0.0,
        width: extent.width as f32,
        height: extent.height as f32,
        min_depth: 0.0,
        max_depth: 1.0,
    }
}

/// Rectangle at the origin covering `extent`.
pub fn full_rect(extent: vk::Extent2D) -> vk::Rect2D {
    vk::Rect2D {
        offset: vk::Offset2D { x: 0, y: 0 },
        extent,
    }
}
