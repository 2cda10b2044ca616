//! Swapchain negotiation and ownership.
//!
//! # Overview
//!
//! - [`negotiate`] turns the surface's advertised support into concrete
//!   [`SwapchainParameters`]. The individual choices ([`choose_format`],
//!   [`choose_present_mode`], [`choose_extent`], [`choose_image_count`]) are
//!   pure functions.
//! - [`SwapchainHandle`] owns a `vk::SwapchainKHR` and the presentable
//!   images it produced. The images belong to the swapchain and are never
//!   destroyed individually.

use std::sync::Arc;

use ash::vk;
use tracing::{debug, info, warn};

use crate::error::{RhiError, RhiResult};
use crate::gpu::GpuDevice;
use crate::physical_device::QueueFamilyIndices;

/// What the surface supports for swapchain creation.
#[derive(Debug, Clone)]
pub struct SwapchainSupportDetails {
    /// Surface capabilities (image counts, extents, transforms, ...)
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    /// Supported surface formats (format and color space combinations)
    pub formats: Vec<vk::SurfaceFormatKHR>,
    /// Supported present modes
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SwapchainSupportDetails {
    /// At least one format and one present mode are available.
    #[inline]
    pub fn is_adequate(&self) -> bool {
        !self.formats.is_empty() && !self.present_modes.is_empty()
    }
}

/// Negotiated swapchain configuration. Recomputed for every rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainParameters {
    pub surface_format: vk::SurfaceFormatKHR,
    pub present_mode: vk::PresentModeKHR,
    pub extent: vk::Extent2D,
    /// Requested image count. The driver may create more.
    pub image_count: u32,
    pub pre_transform: vk::SurfaceTransformFlagsKHR,
}

/// Formats accepted without falling back, in order of preference.
const PREFERRED_FORMATS: [vk::Format; 4] = [
    vk::Format::B8G8R8A8_SRGB,
    vk::Format::B8G8R8A8_UNORM,
    vk::Format::R8G8B8A8_SRGB,
    vk::Format::R8G8B8A8_UNORM,
];

/// "Match the window" marker in `current_extent`.
pub const EXTENT_FROM_WINDOW: u32 = u32::MAX;

/// Chooses the surface format.
///
/// Prefers an 8-bit BGRA/RGBA format with the sRGB non-linear color space and
/// falls back to the first advertised entry.
///
/// # Errors
///
/// [`RhiError::ConfigurationError`] when `available` is empty.
pub fn choose_format(available: &[vk::SurfaceFormatKHR]) -> RhiResult<vk::SurfaceFormatKHR> {
    let Some(&first) = available.first() else {
        return Err(RhiError::ConfigurationError(
            "Surface reports no supported formats".to_string(),
        ));
    };

    for preferred in PREFERRED_FORMATS {
        if let Some(&format) = available.iter().find(|f| {
            f.format == preferred && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        }) {
            debug!("Selected surface format {:?} with SRGB_NONLINEAR", preferred);
            return Ok(format);
        }
    }

    warn!(
        "Using first available surface format: {:?} / {:?}",
        first.format, first.color_space
    );
    Ok(first)
}

/// Chooses MAILBOX when available, otherwise FIFO, which every
/// implementation supports.
pub fn choose_present_mode(available: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    if available.contains(&vk::PresentModeKHR::MAILBOX) {
        debug!("Selected MAILBOX present mode");
        return vk::PresentModeKHR::MAILBOX;
    }

    debug!("Selected FIFO present mode");
    vk::PresentModeKHR::FIFO
}

/// Chooses the swapchain extent.
///
/// Uses `window_size` when the surface reports [`EXTENT_FROM_WINDOW`],
/// the surface's current extent otherwise. Either way each dimension is
/// clamped into the surface's `[min, max]` image extent.
pub fn choose_extent(capabilities: &vk::SurfaceCapabilitiesKHR, window_size: (u32, u32)) -> vk::Extent2D {
    let (width, height) = if capabilities.current_extent.width == EXTENT_FROM_WINDOW {
        window_size
    } else {
        (
            capabilities.current_extent.width,
            capabilities.current_extent.height,
        )
    };

    let min = capabilities.min_image_extent;
    let max = capabilities.max_image_extent;
    // not u32::clamp: a driver reporting min > max must not panic
    let extent = vk::Extent2D {
        width: width.max(min.width).min(max.width),
        height: height.max(min.height).min(max.height),
    };

    debug!(
        "Extent {}x{} (source {}x{}, min {}x{}, max {}x{})",
        extent.width, extent.height, width, height, min.width, min.height, max.width, max.height
    );

    extent
}

/// One more than the minimum, capped by a non-zero maximum.
pub fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let preferred = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 {
        preferred.min(capabilities.max_image_count)
    } else {
        preferred
    }
}

/// Derives every swapchain parameter from a fresh support query.
pub fn negotiate(support: &SwapchainSupportDetails, window_size: (u32, u32)) -> RhiResult<SwapchainParameters> {
    let params = SwapchainParameters {
        surface_format: choose_format(&support.formats)?,
        present_mode: choose_present_mode(&support.present_modes),
        extent: choose_extent(&support.capabilities, window_size),
        image_count: choose_image_count(&support.capabilities),
        pre_transform: support.capabilities.current_transform,
    };

    debug!("Negotiated swapchain parameters: {:?}", params);
    Ok(params)
}

/// Image sharing for swapchain images given the queue families in use.
///
/// Exclusive when graphics and present share a family, concurrent across
/// both families otherwise.
pub fn sharing_mode(families: &QueueFamilyIndices) -> RhiResult<(vk::SharingMode, Vec<u32>)> {
    let (Some(graphics), Some(present)) = (families.graphics_family, families.present_family) else {
        return Err(RhiError::ConfigurationError(
            "Graphics and present queue families must be resolved".to_string(),
        ));
    };

    if graphics == present {
        Ok((vk::SharingMode::EXCLUSIVE, Vec::new()))
    } else {
        Ok((vk::SharingMode::CONCURRENT, vec![graphics, present]))
    }
}

/// An owned swapchain and its presentable images.
pub struct SwapchainHandle<D: GpuDevice> {
    device: Arc<D>,
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
}

impl<D: GpuDevice> SwapchainHandle<D> {
    /// Creates a swapchain for `surface` with the negotiated parameters.
    ///
    /// The image list is read back from the driver; its length may exceed
    /// `params.image_count`.
    pub fn new(
        device: Arc<D>,
        surface: vk::SurfaceKHR,
        params: &SwapchainParameters,
        families: &QueueFamilyIndices,
        old_swapchain: Option<vk::SwapchainKHR>,
    ) -> RhiResult<Self> {
        let (sharing, family_indices) = sharing_mode(families)?;
        debug!("Swapchain image sharing: {:?}", sharing);

        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface)
            .min_image_count(params.image_count)
            .image_format(params.surface_format.format)
            .image_color_space(params.surface_format.color_space)
            .image_extent(params.extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(sharing)
            .queue_family_indices(&family_indices)
            .pre_transform(params.pre_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(params.present_mode)
            .clipped(true)
            .old_swapchain(old_swapchain.unwrap_or_default());

        let swapchain = device.create_swapchain(&create_info)?;
        let images = match device.swapchain_images(swapchain) {
            Ok(images) => images,
            Err(e) => {
                device.destroy_swapchain(swapchain);
                return Err(e);
            }
        };

        if images.len() as u32 != params.image_count {
            debug!(
                "Requested {} swapchain images, driver created {}",
                params.image_count,
                images.len()
            );
        }
        info!(
            "Swapchain created: {}x{}, {:?}, {:?}, {} images",
            params.extent.width,
            params.extent.height,
            params.surface_format.format,
            params.present_mode,
            images.len()
        );

        Ok(Self {
            device,
            swapchain,
            images,
        })
    }

    #[inline]
    pub fn handle(&self) -> vk::SwapchainKHR {
        self.swapchain
    }

    /// Presentable images in driver order.
    #[inline]
    pub fn images(&self) -> &[vk::Image] {
        &self.images
    }
}

impl<D: GpuDevice> Drop for SwapchainHandle<D> {
    fn drop(&mut self) {
        self.device.destroy_swapchain(self.swapchain);
        info!("Swapchain destroyed ({} images)", self.images.len());
    }
}
