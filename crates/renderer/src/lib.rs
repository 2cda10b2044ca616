//! Swapchain lifecycle and frame synchronization.
//!
//! This crate keeps a set of presentable images in sync with a window
//! surface and drives the GPU render loop:
//! - [`swapchain_state`]: building and tearing down swapchain-dependent state
//! - [`frame_sync`]: per-slot semaphores and fences
//! - [`frame_driver`]: the acquire, record, submit, present protocol
//! - [`recreation`]: rebuilding after resize, minimize or out-of-date results
//!
//! [`Renderer`] wires these to a real window and device.

pub mod depth_buffer;
pub mod frame_driver;
pub mod frame_sync;
pub mod recorder;
pub mod recreation;
pub mod renderer;
pub mod swapchain_state;
pub mod triangle;

pub use frame_driver::{FrameDriver, FramePhase, FrameStatus};
pub use recorder::{FrameRecorder, RecordTarget};
pub use renderer::Renderer;

/// Maximum number of frames that can be in flight simultaneously.
pub const MAX_FRAMES_IN_FLIGHT: usize = 2;
