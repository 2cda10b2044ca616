//! Vulkan abstraction layer (Render Hardware Interface).
//!
//! This crate provides a safe abstraction over Vulkan using the `ash` crate.
//! It handles:
//! - Instance creation with optional validation diagnostics
//! - Physical device selection and logical device creation
//! - Surface queries and swapchain negotiation
//! - RAII wrappers for images, views, framebuffers and sync objects
//! - Render pass, pipeline and command recording for the demo scene
//!
//! Swapchain-dependent wrappers are generic over [`GpuDevice`] so their
//! lifetime rules can be exercised without a GPU.

mod error;

pub mod buffer;
pub mod command;
pub mod device;
pub mod framebuffer;
pub mod gpu;
pub mod image;
pub mod instance;
pub mod physical_device;
pub mod pipeline;
pub mod render_pass;
pub mod shader;
pub mod surface;
pub mod swapchain;
pub mod sync;
pub mod vertex;

pub use error::{RhiError, RhiResult, VkResultExt};
pub use gpu::{FrameSubmission, GpuDevice};

// Re-export ash types that users might need
pub use ash::vk;
