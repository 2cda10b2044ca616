//! Depth attachment shared by every framebuffer of a swapchain.
//!
//! A depth image cannot be resized in place, so one is created per swapchain
//! build at the swapchain's extent and dropped with it.
//!
//! # Resource Destruction
//!
//! [`DepthAttachment`] declares its view before its image, so dropping it
//! destroys the view, then the image, then the image's memory.

use std::sync::Arc;

use ash::vk;
use tracing::{debug, info};

use vkchain_rhi::image::{DeviceImage, ImageView};
use vkchain_rhi::{GpuDevice, RhiError, RhiResult};

/// Depth formats in order of preference, highest precision first.
pub const DEPTH_FORMAT_CANDIDATES: [vk::Format; 3] = [
    vk::Format::D32_SFLOAT,
    vk::Format::D32_SFLOAT_S8_UINT,
    vk::Format::D24_UNORM_S8_UINT,
];

/// Returns the first candidate usable as an optimally tiled depth-stencil
/// attachment.
///
/// # Errors
///
/// [`RhiError::ConfigurationError`] when no candidate qualifies.
pub fn find_depth_format<D: GpuDevice>(device: &D) -> RhiResult<vk::Format> {
    DEPTH_FORMAT_CANDIDATES
        .into_iter()
        .find(|&format| {
            device
                .format_properties(format)
                .optimal_tiling_features
                .contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT)
        })
        .inspect(|format| debug!("Selected depth format {:?}", format))
        .ok_or_else(|| {
            RhiError::ConfigurationError(
                "No supported depth format among D32_SFLOAT, D32_SFLOAT_S8_UINT, D24_UNORM_S8_UINT"
                    .to_string(),
            )
        })
}

/// Whether `format` carries a stencil component.
#[inline]
pub fn has_stencil_component(format: vk::Format) -> bool {
    matches!(
        format,
        vk::Format::D32_SFLOAT_S8_UINT | vk::Format::D24_UNORM_S8_UINT
    )
}

/// Image aspect for views of a depth `format`.
pub fn depth_aspect(format: vk::Format) -> vk::ImageAspectFlags {
    if has_stencil_component(format) {
        vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
    } else {
        vk::ImageAspectFlags::DEPTH
    }
}

/// A depth image, its memory and its view, ready for use as an attachment.
pub struct DepthAttachment<D: GpuDevice> {
    view: ImageView<D>,
    _image: DeviceImage<D>,
}

impl<D: GpuDevice> DepthAttachment<D> {
    /// Creates the image at `extent`, binds memory, creates the view and
    /// transitions the image to `DEPTH_STENCIL_ATTACHMENT_OPTIMAL`.
    ///
    /// # Errors
    ///
    /// [`RhiError::InvalidArgument`] for a zero extent; any creation,
    /// allocation or submission error otherwise. Partially created pieces are
    /// released before returning.
    pub fn new(device: Arc<D>, format: vk::Format, extent: vk::Extent2D) -> RhiResult<Self> {
        let image = DeviceImage::new(
            device.clone(),
            "depth_attachment",
            format,
            extent,
            vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
        )?;

        let aspect = depth_aspect(format);
        let view = ImageView::new(device.clone(), image.handle(), format, aspect)?;

        device.transition_image_layout(
            image.handle(),
            aspect,
            vk::ImageLayout::UNDEFINED,
            vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
        )?;

        info!(
            "Depth attachment created: {}x{} ({:?})",
            extent.width, extent.height, format
        );

        Ok(Self { view, _image: image })
    }

    #[inline]
    pub fn view(&self) -> vk::ImageView {
        self.view.handle()
    }

    #[inline]
    pub fn format(&self) -> vk::Format {
        self.view.format()
    }
}
