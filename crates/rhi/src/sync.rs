//! Synchronization primitives.
//!
//! This module provides RAII wrappers for Vulkan synchronization objects:
//! - [`Semaphore`] - GPU-to-GPU synchronization (between queue operations)
//! - [`Fence`] - GPU-to-CPU synchronization (for host waiting)
//!
//! # Overview
//!
//! Semaphores order queue operations without CPU involvement, for example
//! rendering after image acquisition and presentation after rendering.
//! Fences let the CPU learn when submitted work has completed, which is what
//! makes reusing a command buffer safe.
//!
//! Both wrappers are generic over [`GpuDevice`] and destroy their handle on
//! drop.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use vkchain_rhi::device::Device;
//! use vkchain_rhi::sync::{Fence, Semaphore};
//!
//! # fn example(device: Arc<Device>) -> vkchain_rhi::RhiResult<()> {
//! let image_available = Semaphore::new(device.clone())?;
//! let in_flight = Fence::new(device, true)?;
//!
//! in_flight.wait(u64::MAX)?;
//! in_flight.reset()?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use crate::device::Device;
use crate::error::RhiResult;
use crate::gpu::GpuDevice;

/// Semaphore wrapper.
///
/// Created unsignaled. Typical uses are the image-available signal raised by
/// acquisition and the render-finished signal waited on by presentation.
pub struct Semaphore<D: GpuDevice = Device> {
    device: Arc<D>,
    semaphore: vk::Semaphore,
}

impl<D: GpuDevice> Semaphore<D> {
    /// Creates a new unsignaled semaphore.
    ///
    /// # Errors
    ///
    /// Returns an error if semaphore creation fails.
    pub fn new(device: Arc<D>) -> RhiResult<Self> {
        let semaphore = device.create_semaphore()?;
        debug!("Created semaphore");
        Ok(Self { device, semaphore })
    }

    /// Returns the Vulkan semaphore handle.
    #[inline]
    pub fn handle(&self) -> vk::Semaphore {
        self.semaphore
    }
}

impl<D: GpuDevice> Drop for Semaphore<D> {
    fn drop(&mut self) {
        self.device.destroy_semaphore(self.semaphore);
        debug!("Destroyed semaphore");
    }
}

/// Fence wrapper.
///
/// A fence must not be reset while a submission that signals it is pending;
/// wait on it first.
pub struct Fence<D: GpuDevice = Device> {
    device: Arc<D>,
    fence: vk::Fence,
}

impl<D: GpuDevice> Fence<D> {
    /// Creates a new fence.
    ///
    /// `signaled` creates the fence in the signaled state, for fences that are
    /// waited on before any submission has armed them.
    ///
    /// # Errors
    ///
    /// Returns an error if fence creation fails.
    pub fn new(device: Arc<D>, signaled: bool) -> RhiResult<Self> {
        let fence = device.create_fence(signaled)?;
        debug!(
            "Created fence ({})",
            if signaled { "signaled" } else { "unsignaled" }
        );
        Ok(Self { device, fence })
    }

    /// Returns the Vulkan fence handle.
    #[inline]
    pub fn handle(&self) -> vk::Fence {
        self.fence
    }

    /// Blocks until the fence is signaled or `timeout` nanoseconds pass.
    ///
    /// # Errors
    ///
    /// Returns an error if the wait fails or times out.
    pub fn wait(&self, timeout: u64) -> RhiResult<()> {
        self.device.wait_for_fence(self.fence, timeout)
    }

    /// Resets the fence to the unsignaled state.
    pub fn reset(&self) -> RhiResult<()> {
        self.device.reset_fence(self.fence)
    }
}

impl<D: GpuDevice> Drop for Fence<D> {
    fn drop(&mut self) {
        self.device.destroy_fence(self.fence);
        debug!("Destroyed fence");
    }
}
