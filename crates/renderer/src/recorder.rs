//! The swapchain-independent drawing layer plugged into the frame driver.

use ash::vk;

use vkchain_rhi::{GpuDevice, RhiResult};

/// Everything a recorder needs to fill one frame's command buffer.
#[derive(Debug, Clone, Copy)]
pub struct RecordTarget {
    /// Frame slot in use.
    pub slot: usize,
    /// Acquired presentable image.
    pub image_index: u32,
    /// Command buffer already reset and in the recording state.
    pub command_buffer: vk::CommandBuffer,
    /// Framebuffer for `image_index`.
    pub framebuffer: vk::Framebuffer,
    /// Current swapchain extent.
    pub extent: vk::Extent2D,
}

/// Records the draw commands of a frame.
///
/// Implementations own the render pass and whatever the commands bind
/// (pipelines, buffers). None of it is rebuilt on swapchain recreation.
pub trait FrameRecorder<D: GpuDevice> {
    /// Render pass the swapchain framebuffers are created against.
    fn render_pass(&self) -> vk::RenderPass;

    /// Records between begin and end of `target.command_buffer`.
    fn record(&mut self, device: &D, target: &RecordTarget) -> RhiResult<()>;
}
