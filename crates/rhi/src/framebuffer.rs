//! Owned framebuffer handle.

use std::sync::Arc;

use ash::vk;

use crate::error::{RhiError, RhiResult};
use crate::gpu::GpuDevice;

/// A framebuffer binding a fixed set of attachments to a render pass.
///
/// The attachment views must outlive the framebuffer.
pub struct Framebuffer<D: GpuDevice> {
    device: Arc<D>,
    framebuffer: vk::Framebuffer,
    extent: vk::Extent2D,
}

impl<D: GpuDevice> Framebuffer<D> {
    pub fn new(
        device: Arc<D>,
        render_pass: vk::RenderPass,
        attachments: &[vk::ImageView],
        extent: vk::Extent2D,
    ) -> RhiResult<Self> {
        if attachments.is_empty() {
            return Err(RhiError::InvalidArgument(
                "Framebuffer needs at least one attachment".to_string(),
            ));
        }
        let framebuffer = device.create_framebuffer(render_pass, attachments, extent)?;
        Ok(Self {
            device,
            framebuffer,
            extent,
        })
    }

    #[inline]
    pub fn handle(&self) -> vk::Framebuffer {
        self.framebuffer
    }

    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }
}

impl<D: GpuDevice> Drop for Framebuffer<D> {
    fn drop(&mut self) {
        self.device.destroy_framebuffer(self.framebuffer);
    }
}
