//! Swapchain-dependent state and its builder.
//!
//! [`SwapchainState`] owns the swapchain and everything derived from it: one
//! color view and one framebuffer per presentable image, plus a depth
//! attachment shared by all framebuffers. It is either fully built or fully
//! dropped.
//!
//! # Resource Destruction
//!
//! Fields are declared in teardown order, so dropping the state destroys:
//!
//! 1. Framebuffers
//! 2. Depth view, depth image, depth memory
//! 3. Color image views
//! 4. The swapchain (which releases its presentable images)

use std::sync::Arc;

use ash::vk;
use tracing::{debug, info};

use vkchain_rhi::framebuffer::Framebuffer;
use vkchain_rhi::image::ImageView;
use vkchain_rhi::physical_device::QueueFamilyIndices;
use vkchain_rhi::surface::PresentSurface;
use vkchain_rhi::swapchain::{SwapchainHandle, SwapchainParameters};
use vkchain_rhi::{GpuDevice, RhiError, RhiResult};

use crate::depth_buffer::{DepthAttachment, find_depth_format};

/// A live swapchain with its views, depth attachment and framebuffers.
pub struct SwapchainState<D: GpuDevice> {
    framebuffers: Vec<Framebuffer<D>>,
    depth: DepthAttachment<D>,
    image_views: Vec<ImageView<D>>,
    swapchain: SwapchainHandle<D>,
    params: SwapchainParameters,
}

impl<D: GpuDevice> SwapchainState<D> {
    #[inline]
    pub fn swapchain(&self) -> vk::SwapchainKHR {
        self.swapchain.handle()
    }

    #[inline]
    pub fn params(&self) -> &SwapchainParameters {
        &self.params
    }

    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.params.extent
    }

    #[inline]
    pub fn color_format(&self) -> vk::Format {
        self.params.surface_format.format
    }

    #[inline]
    pub fn depth_format(&self) -> vk::Format {
        self.depth.format()
    }

    /// Presentable images as reported by the driver.
    #[inline]
    pub fn images(&self) -> &[vk::Image] {
        self.swapchain.images()
    }

    #[inline]
    pub fn image_count(&self) -> usize {
        self.swapchain.images().len()
    }

    #[inline]
    pub fn image_view_count(&self) -> usize {
        self.image_views.len()
    }

    #[inline]
    pub fn framebuffer_count(&self) -> usize {
        self.framebuffers.len()
    }

    /// Framebuffer for the presentable image at `image_index`.
    pub fn framebuffer(&self, image_index: u32) -> RhiResult<vk::Framebuffer> {
        self.framebuffers
            .get(image_index as usize)
            .map(Framebuffer::handle)
            .ok_or_else(|| {
                RhiError::InvalidArgument(format!(
                    "Image index {} out of range ({} framebuffers)",
                    image_index,
                    self.framebuffers.len()
                ))
            })
    }
}

/// Creates and destroys [`SwapchainState`].
pub struct SwapchainBuilder;

impl SwapchainBuilder {
    /// Builds the swapchain and all per-image resources.
    ///
    /// Views and framebuffers are sized from the image list the driver
    /// returned, not from `params.image_count`.
    ///
    /// # Errors
    ///
    /// - [`RhiError::InvalidArgument`] for a zero extent
    /// - [`RhiError::ConfigurationError`] when no depth format is supported
    /// - any device error from the creation calls
    ///
    /// On error everything created so far is destroyed in reverse order.
    pub fn build<D, S>(
        device: &Arc<D>,
        surface: &S,
        params: &SwapchainParameters,
        families: &QueueFamilyIndices,
        old_swapchain: Option<vk::SwapchainKHR>,
        render_pass: vk::RenderPass,
    ) -> RhiResult<SwapchainState<D>>
    where
        D: GpuDevice,
        S: PresentSurface + ?Sized,
    {
        let extent = params.extent;
        if extent.width == 0 || extent.height == 0 {
            return Err(RhiError::InvalidArgument(format!(
                "Swapchain extent must be non-zero (got {}x{})",
                extent.width, extent.height
            )));
        }

        let swapchain = SwapchainHandle::new(
            device.clone(),
            surface.handle(),
            params,
            families,
            old_swapchain,
        )?;

        let color_format = params.surface_format.format;
        let image_views = swapchain
            .images()
            .iter()
            .map(|&image| {
                ImageView::new(
                    device.clone(),
                    image,
                    color_format,
                    vk::ImageAspectFlags::COLOR,
                )
            })
            .collect::<RhiResult<Vec<_>>>()?;
        debug!("Created {} swapchain image views", image_views.len());

        let depth_format = find_depth_format(device.as_ref())?;
        let depth = DepthAttachment::new(device.clone(), depth_format, extent)?;

        let framebuffers = image_views
            .iter()
            .map(|view| {
                Framebuffer::new(
                    device.clone(),
                    render_pass,
                    &[view.handle(), depth.view()],
                    extent,
                )
            })
            .collect::<RhiResult<Vec<_>>>()?;
        debug!("Created {} framebuffers", framebuffers.len());

        info!(
            "Swapchain state built: {}x{}, {} images",
            extent.width,
            extent.height,
            framebuffers.len()
        );

        Ok(SwapchainState {
            framebuffers,
            depth,
            image_views,
            swapchain,
            params: *params,
        })
    }

    /// Destroys `state` in reverse creation order.
    ///
    /// The caller must ensure no submitted work still references it.
    pub fn destroy<D: GpuDevice>(state: SwapchainState<D>) {
        let extent = state.extent();
        drop(state);
        debug!(
            "Swapchain state destroyed ({}x{})",
            extent.width, extent.height
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swapchain_state_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<SwapchainState<vkchain_rhi::device::Device>>();
    }
}
