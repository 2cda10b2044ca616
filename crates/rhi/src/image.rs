//! Owned image and image-view handles.

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use crate::error::{RhiError, RhiResult};
use crate::gpu::GpuDevice;

/// An image view destroyed on drop.
///
/// Views of swapchain images do not own the image itself.
pub struct ImageView<D: GpuDevice> {
    device: Arc<D>,
    view: vk::ImageView,
    format: vk::Format,
}

impl<D: GpuDevice> ImageView<D> {
    /// Creates a 2D view of `image` covering the first mip level and layer.
    pub fn new(
        device: Arc<D>,
        image: vk::Image,
        format: vk::Format,
        aspect: vk::ImageAspectFlags,
    ) -> RhiResult<Self> {
        let view = device.create_image_view(image, format, aspect)?;
        Ok(Self {
            device,
            view,
            format,
        })
    }

    #[inline]
    pub fn handle(&self) -> vk::ImageView {
        self.view
    }

    #[inline]
    pub fn format(&self) -> vk::Format {
        self.format
    }
}

impl<D: GpuDevice> Drop for ImageView<D> {
    fn drop(&mut self) {
        self.device.destroy_image_view(self.view);
    }
}

/// A 2D device image together with its bound memory.
///
/// Dropping destroys the image first, then frees its memory.
pub struct DeviceImage<D: GpuDevice> {
    device: Arc<D>,
    image: vk::Image,
    memory: Option<D::Memory>,
}

impl<D: GpuDevice> DeviceImage<D> {
    /// Creates a single-sample, optimally tiled 2D image and binds
    /// device-local memory to it.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::InvalidArgument`] for a zero extent, or the
    /// creation or allocation error. Nothing leaks on failure.
    pub fn new(
        device: Arc<D>,
        name: &str,
        format: vk::Format,
        extent: vk::Extent2D,
        usage: vk::ImageUsageFlags,
    ) -> RhiResult<Self> {
        if extent.width == 0 || extent.height == 0 {
            return Err(RhiError::InvalidArgument(format!(
                "Image '{}' dimensions must be greater than 0 (got {}x{})",
                name, extent.width, extent.height
            )));
        }

        let image_info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(format)
            .extent(vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        let image = device.create_image(&image_info)?;
        let memory = match device.allocate_image_memory(image, name) {
            Ok(memory) => memory,
            Err(e) => {
                device.destroy_image(image);
                return Err(e);
            }
        };

        debug!(
            "Created image '{}': {}x{} ({:?})",
            name, extent.width, extent.height, format
        );

        Ok(Self {
            device,
            image,
            memory: Some(memory),
        })
    }

    #[inline]
    pub fn handle(&self) -> vk::Image {
        self.image
    }
}

impl<D: GpuDevice> Drop for DeviceImage<D> {
    fn drop(&mut self) {
        self.device.destroy_image(self.image);
        if let Some(memory) = self.memory.take() {
            self.device.free_memory(memory);
        }
    }
}
