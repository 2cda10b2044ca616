//! Device operations consumed by the swapchain and frame machinery.
//!
//! [`GpuDevice`] is the seam between the lifecycle code in the renderer and
//! the logical device. The production implementation is
//! [`crate::device::Device`]; tests substitute a counting mock so the
//! create/destroy discipline can be verified without a GPU.
//!
//! Methods returning raw `vk::Result` (acquire and present) do so on purpose:
//! their out-of-date and suboptimal outcomes are interpreted by the caller
//! rather than turned into errors here.

use ash::vk;

use crate::error::RhiResult;
use crate::physical_device::QueueFamilyIndices;

/// One graphics-queue submission for a frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameSubmission {
    /// Command buffer to execute.
    pub command_buffer: vk::CommandBuffer,
    /// Signal waited on before `wait_stage` runs.
    pub wait_semaphore: vk::Semaphore,
    /// Pipeline stage that waits on `wait_semaphore`.
    pub wait_stage: vk::PipelineStageFlags,
    /// Signal raised when the command buffer completes.
    pub signal_semaphore: vk::Semaphore,
    /// Fence armed by this submission.
    pub fence: vk::Fence,
}

/// Logical-device operations used by the swapchain lifecycle.
///
/// Implementations own all unsafety: every handle passed in must have been
/// created by the same implementation and not yet destroyed.
pub trait GpuDevice: Send + Sync + 'static {
    /// Backing memory of a device image.
    type Memory: Send + Sync;

    /// Physical device this logical device was created from.
    fn physical_device(&self) -> vk::PhysicalDevice;

    /// Queue families the graphics and present queues belong to.
    fn queue_families(&self) -> QueueFamilyIndices;

    /// Blocks until every queue on the device is idle.
    fn wait_idle(&self) -> RhiResult<()>;

    // Synchronization

    fn create_semaphore(&self) -> RhiResult<vk::Semaphore>;
    fn destroy_semaphore(&self, semaphore: vk::Semaphore);
    fn create_fence(&self, signaled: bool) -> RhiResult<vk::Fence>;
    fn destroy_fence(&self, fence: vk::Fence);
    fn wait_for_fence(&self, fence: vk::Fence, timeout: u64) -> RhiResult<()>;
    fn reset_fence(&self, fence: vk::Fence) -> RhiResult<()>;

    // Images, views and framebuffers

    /// Format features for `format` on this device's physical device.
    fn format_properties(&self, format: vk::Format) -> vk::FormatProperties;
    fn create_image(&self, info: &vk::ImageCreateInfo<'_>) -> RhiResult<vk::Image>;
    /// Allocates device-local memory for `image` and binds it.
    fn allocate_image_memory(&self, image: vk::Image, name: &str) -> RhiResult<Self::Memory>;
    fn destroy_image(&self, image: vk::Image);
    fn free_memory(&self, memory: Self::Memory);
    /// Creates a 2D view with identity swizzle, one mip level and one layer.
    fn create_image_view(
        &self,
        image: vk::Image,
        format: vk::Format,
        aspect: vk::ImageAspectFlags,
    ) -> RhiResult<vk::ImageView>;
    fn destroy_image_view(&self, view: vk::ImageView);
    /// Records, submits and waits for a single layout transition.
    fn transition_image_layout(
        &self,
        image: vk::Image,
        aspect: vk::ImageAspectFlags,
        old_layout: vk::ImageLayout,
        new_layout: vk::ImageLayout,
    ) -> RhiResult<()>;
    fn create_framebuffer(
        &self,
        render_pass: vk::RenderPass,
        attachments: &[vk::ImageView],
        extent: vk::Extent2D,
    ) -> RhiResult<vk::Framebuffer>;
    fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer);

    // Swapchain

    fn create_swapchain(&self, info: &vk::SwapchainCreateInfoKHR<'_>) -> RhiResult<vk::SwapchainKHR>;
    fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> RhiResult<Vec<vk::Image>>;
    fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR);
    /// Returns `(image_index, suboptimal)` or the raw failure code.
    fn acquire_next_image(
        &self,
        swapchain: vk::SwapchainKHR,
        timeout: u64,
        semaphore: vk::Semaphore,
    ) -> Result<(u32, bool), vk::Result>;
    /// Presents on the present queue. Returns `true` when suboptimal.
    fn queue_present(
        &self,
        swapchain: vk::SwapchainKHR,
        image_index: u32,
        wait_semaphore: vk::Semaphore,
    ) -> Result<bool, vk::Result>;

    // Command buffers

    fn reset_command_buffer(&self, command_buffer: vk::CommandBuffer) -> RhiResult<()>;
    fn begin_command_buffer(&self, command_buffer: vk::CommandBuffer) -> RhiResult<()>;
    fn end_command_buffer(&self, command_buffer: vk::CommandBuffer) -> RhiResult<()>;
    fn submit_graphics(&self, submission: &FrameSubmission) -> RhiResult<()>;
}
