//! Platform abstraction layer for the vkchain renderer.
//!
//! This crate provides platform-specific functionality:
//! - Window management via winit, driven in pump mode
//! - The [`PresentWindow`] interface consumed by the swapchain lifecycle
//! - Raw window handles for Vulkan surface creation

mod present;
mod window;

pub use present::PresentWindow;
pub use window::Window;
