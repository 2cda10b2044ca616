//! Presentation surface.
//!
//! [`Surface`] owns a `vk::SurfaceKHR` created for a native window and
//! answers the capability queries swapchain negotiation needs. The
//! [`PresentSurface`] trait is the part of it the swapchain code depends on.

use ash::vk;
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};
use tracing::{debug, info};

use crate::error::{RhiError, RhiResult, VkResultExt};
use crate::instance::Instance;
use crate::swapchain::SwapchainSupportDetails;

/// Surface queries consumed by swapchain negotiation.
pub trait PresentSurface {
    /// Raw surface handle.
    fn handle(&self) -> vk::SurfaceKHR;

    /// Capabilities, formats and present modes for `physical_device`.
    ///
    /// Capabilities change across resizes, so callers query again for every
    /// negotiation.
    fn query_support(&self, physical_device: vk::PhysicalDevice) -> RhiResult<SwapchainSupportDetails>;
}

/// RAII wrapper for a Vulkan surface.
///
/// # Ownership
/// The surface is destroyed when this struct is dropped. The instance it was
/// created from must outlive it.
pub struct Surface {
    handle: vk::SurfaceKHR,
    surface_loader: ash::khr::surface::Instance,
}

impl Surface {
    /// Creates a surface for a native window.
    ///
    /// # Safety
    ///
    /// The raw handles must refer to a live window that outlives the surface.
    pub unsafe fn new(
        instance: &Instance,
        display: RawDisplayHandle,
        window: RawWindowHandle,
    ) -> RhiResult<Self> {
        let handle = unsafe {
            ash_window::create_surface(instance.entry(), instance.handle(), display, window, None)
                .map_err(|e| RhiError::SurfaceError(format!("Failed to create surface: {}", e)))?
        };

        let surface_loader = ash::khr::surface::Instance::new(instance.entry(), instance.handle());

        info!("Vulkan surface created");

        Ok(Self {
            handle,
            surface_loader,
        })
    }

    /// Get a reference to the surface loader.
    #[inline]
    pub fn loader(&self) -> &ash::khr::surface::Instance {
        &self.surface_loader
    }

    /// Whether `queue_family` of `physical_device` can present to this surface.
    pub fn supports_present(
        &self,
        physical_device: vk::PhysicalDevice,
        queue_family: u32,
    ) -> RhiResult<bool> {
        unsafe {
            self.surface_loader
                .get_physical_device_surface_support(physical_device, queue_family, self.handle)
                .call("vkGetPhysicalDeviceSurfaceSupportKHR")
        }
    }
}

impl PresentSurface for Surface {
    #[inline]
    fn handle(&self) -> vk::SurfaceKHR {
        self.handle
    }

    fn query_support(&self, physical_device: vk::PhysicalDevice) -> RhiResult<SwapchainSupportDetails> {
        let capabilities = unsafe {
            self.surface_loader
                .get_physical_device_surface_capabilities(physical_device, self.handle)
                .call("vkGetPhysicalDeviceSurfaceCapabilitiesKHR")?
        };

        let formats = unsafe {
            self.surface_loader
                .get_physical_device_surface_formats(physical_device, self.handle)
                .call("vkGetPhysicalDeviceSurfaceFormatsKHR")?
        };

        let present_modes = unsafe {
            self.surface_loader
                .get_physical_device_surface_present_modes(physical_device, self.handle)
                .call("vkGetPhysicalDeviceSurfacePresentModesKHR")?
        };

        debug!(
            "Surface support: {} formats, {} present modes, image count: {}-{}",
            formats.len(),
            present_modes.len(),
            capabilities.min_image_count,
            if capabilities.max_image_count == 0 {
                "unlimited".to_string()
            } else {
                capabilities.max_image_count.to_string()
            }
        );

        Ok(SwapchainSupportDetails {
            capabilities,
            formats,
            present_modes,
        })
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        unsafe {
            self.surface_loader.destroy_surface(self.handle, None);
        }
        debug!("Vulkan surface destroyed");
    }
}
