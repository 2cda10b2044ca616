//! RHI-specific error types.

use ash::vk;
use thiserror::Error;

/// RHI-specific error type.
///
/// Out-of-date and suboptimal surface results are not represented here: the
/// frame loop treats them as status values and recovers by rebuilding the
/// swapchain.
#[derive(Error, Debug)]
pub enum RhiError {
    /// Vulkan API error without call context
    #[error("Vulkan error: {0}")]
    VulkanError(#[from] vk::Result),

    /// Vulkan API error with the name of the failing operation
    #[error("{call} failed: {result}")]
    VulkanCallError {
        call: &'static str,
        result: vk::Result,
    },

    /// Device or host memory exhausted while creating a resource
    #[error("Out of memory in {call}: {result}")]
    ResourceExhausted {
        call: &'static str,
        result: vk::Result,
    },

    /// Failed to load Vulkan
    #[error("Failed to load Vulkan: {0}")]
    LoadingError(#[from] ash::LoadingError),

    /// GPU allocator error
    #[error("Allocator error: {0}")]
    AllocatorError(#[from] gpu_allocator::AllocationError),

    /// No suitable GPU found
    #[error("No suitable GPU found")]
    NoSuitableGpu,

    /// The surface/device pair cannot satisfy a hard requirement
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Shader compilation error
    #[error("Shader error: {0}")]
    ShaderError(String),

    /// Surface creation error
    #[error("Surface error: {0}")]
    SurfaceError(String),

    /// Pipeline creation error
    #[error("Pipeline error: {0}")]
    PipelineError(String),

    /// Argument outside the accepted domain (zero extent, empty attachments, ...)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Swapchain state was requested while none is live
    #[error("No live swapchain")]
    SwapchainUnavailable,
}

impl RhiError {
    /// Classify a failed Vulkan call.
    ///
    /// Memory exhaustion maps to [`RhiError::ResourceExhausted`]; everything
    /// else keeps the call name for diagnostics.
    pub fn from_call(call: &'static str, result: vk::Result) -> Self {
        match result {
            vk::Result::ERROR_OUT_OF_DEVICE_MEMORY
            | vk::Result::ERROR_OUT_OF_HOST_MEMORY
            | vk::Result::ERROR_OUT_OF_POOL_MEMORY
            | vk::Result::ERROR_TOO_MANY_OBJECTS => RhiError::ResourceExhausted { call, result },
            _ => RhiError::VulkanCallError { call, result },
        }
    }

    /// Returns true for errors that indicate exhausted device or host resources.
    pub fn is_resource_exhaustion(&self) -> bool {
        matches!(self, RhiError::ResourceExhausted { .. })
            || matches!(
                self,
                RhiError::AllocatorError(gpu_allocator::AllocationError::OutOfMemory)
            )
    }
}

/// Extension for attaching the operation name to a raw Vulkan result.
pub trait VkResultExt<T> {
    /// Map the error through [`RhiError::from_call`].
    fn call(self, name: &'static str) -> RhiResult<T>;
}

impl<T> VkResultExt<T> for Result<T, vk::Result> {
    #[inline]
    fn call(self, name: &'static str) -> RhiResult<T> {
        self.map_err(|result| RhiError::from_call(name, result))
    }
}

/// Result type alias for RHI operations.
pub type RhiResult<T> = std::result::Result<T, RhiError>;
