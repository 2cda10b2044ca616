//! Per-slot synchronization for frames in flight.
//!
//! Each slot holds the three primitives one frame needs:
//!
//! ```text
//! 1. Wait on in_flight (CPU waits for the previous use of this slot)
//! 2. Acquire swapchain image (signals image_available)
//! 3. Submit:
//!    - wait on image_available at color-attachment output
//!    - signal render_finished
//!    - arm in_flight
//! 4. Present (waits on render_finished)
//! ```
//!
//! Slots live for the whole session and are untouched by swapchain
//! recreation. Fences start signaled so the first wait on each slot returns
//! immediately.

use std::sync::Arc;

use ash::vk;
use tracing::info;

use vkchain_rhi::sync::{Fence, Semaphore};
use vkchain_rhi::{GpuDevice, RhiError, RhiResult};

/// Synchronization primitives of one frame slot.
pub struct FrameSlot<D: GpuDevice> {
    image_available: Semaphore<D>,
    render_finished: Semaphore<D>,
    in_flight: Fence<D>,
}

impl<D: GpuDevice> FrameSlot<D> {
    fn new(device: &Arc<D>) -> RhiResult<Self> {
        Ok(Self {
            image_available: Semaphore::new(device.clone())?,
            render_finished: Semaphore::new(device.clone())?,
            in_flight: Fence::new(device.clone(), true)?,
        })
    }

    /// Signaled by acquisition when the image is ready to be rendered to.
    #[inline]
    pub fn image_available(&self) -> vk::Semaphore {
        self.image_available.handle()
    }

    /// Signaled by the submission, waited on by presentation.
    #[inline]
    pub fn render_finished(&self) -> vk::Semaphore {
        self.render_finished.handle()
    }

    /// Armed by the submission; gates reuse of the slot's command buffer.
    #[inline]
    pub fn in_flight(&self) -> vk::Fence {
        self.in_flight.handle()
    }
}

/// A fixed set of frame slots selected round-robin by frame counter.
pub struct FrameSyncRegistry<D: GpuDevice> {
    slots: Vec<FrameSlot<D>>,
}

impl<D: GpuDevice> FrameSyncRegistry<D> {
    /// Creates `count` slots.
    ///
    /// # Errors
    ///
    /// [`RhiError::InvalidArgument`] for `count == 0`, or the first creation
    /// error (slots already created are destroyed).
    pub fn new(device: &Arc<D>, count: usize) -> RhiResult<Self> {
        if count == 0 {
            return Err(RhiError::InvalidArgument(
                "Frame slot count must be greater than 0".to_string(),
            ));
        }

        let slots = (0..count)
            .map(|_| FrameSlot::new(device))
            .collect::<RhiResult<Vec<_>>>()?;

        info!("Frame sync registry created with {} slots", count);
        Ok(Self { slots })
    }

    /// Slot index used for `frame_counter`.
    #[inline]
    pub fn slot(&self, frame_counter: u64) -> usize {
        (frame_counter % self.slots.len() as u64) as usize
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&FrameSlot<D>> {
        self.slots.get(index)
    }

    /// Number of frames that can be in flight.
    #[inline]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }
}
