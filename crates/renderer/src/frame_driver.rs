//! The per-frame render loop protocol.
//!
//! [`FrameDriver::render_frame`] runs one iteration:
//!
//! ```text
//! Idle -> Waiting -> Acquiring -> Recording -> Submitting -> Presenting -> Idle
//!                        |                                       |
//!                        +------------> OutOfDate <--------------+
//!                                           |
//!                                     (recreate) -> Idle
//! ```
//!
//! 1. Wait on the slot's in-flight fence.
//! 2. Acquire an image, signaling the slot's image-available semaphore.
//!    Out-of-date abandons the frame and rebuilds the swapchain.
//! 3. Reset and re-record the slot's command buffer.
//! 4. Reset the fence, then submit: wait on image-available at color
//!    attachment output, signal render-finished, arm the fence.
//! 5. Present, waiting on render-finished. Out-of-date, suboptimal (at
//!    acquire or present) or a flagged resize rebuild the swapchain.
//! 6. Advance the frame counter.
//!
//! Fences gate CPU reuse of the command buffer; semaphores order acquire,
//! draw and present on the GPU.
//!
//! Out-of-date and suboptimal results are never returned as errors.

use std::sync::Arc;

use ash::vk;
use tracing::{debug, error, info};

use vkchain_platform::PresentWindow;
use vkchain_rhi::surface::PresentSurface;
use vkchain_rhi::{FrameSubmission, GpuDevice, RhiError, RhiResult};

use crate::MAX_FRAMES_IN_FLIGHT;
use crate::frame_sync::FrameSyncRegistry;
use crate::recorder::{FrameRecorder, RecordTarget};
use crate::recreation::RecreationController;
use crate::swapchain_state::SwapchainState;

/// Where the driver is within [`FrameDriver::render_frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePhase {
    Idle,
    Waiting,
    Acquiring,
    Recording,
    Submitting,
    Presenting,
    OutOfDate,
}

/// Outcome of one [`FrameDriver::render_frame`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// The frame was submitted and presented.
    Presented {
        slot: usize,
        image_index: u32,
        /// The swapchain was rebuilt after presenting.
        recreated: bool,
    },
    /// Acquisition reported out-of-date; the swapchain was rebuilt and
    /// nothing was submitted.
    Skipped,
}

/// Interpreted result of image acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireStatus {
    Acquired { image_index: u32, suboptimal: bool },
    OutOfDate,
}

impl AcquireStatus {
    /// Splits transient surface conditions from fatal failures.
    pub fn interpret(result: Result<(u32, bool), vk::Result>) -> RhiResult<Self> {
        match result {
            Ok((image_index, suboptimal)) => Ok(Self::Acquired {
                image_index,
                suboptimal,
            }),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(Self::OutOfDate),
            Err(result) => Err(RhiError::from_call("vkAcquireNextImageKHR", result)),
        }
    }
}

/// Interpreted result of presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentStatus {
    Presented,
    Suboptimal,
    OutOfDate,
}

impl PresentStatus {
    pub fn interpret(result: Result<bool, vk::Result>) -> RhiResult<Self> {
        match result {
            Ok(false) => Ok(Self::Presented),
            Ok(true) => Ok(Self::Suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(Self::OutOfDate),
            Err(result) => Err(RhiError::from_call("vkQueuePresentKHR", result)),
        }
    }
}

/// Drives frames against a swapchain and keeps it in sync with the window.
///
/// The driver owns the swapchain-dependent state, the frame slots, the
/// recorder and the surface. Dropping it waits for the device to go idle,
/// then releases them in that order.
pub struct FrameDriver<D, S, R>
where
    D: GpuDevice,
    S: PresentSurface,
    R: FrameRecorder<D>,
{
    state: Option<SwapchainState<D>>,
    sync: FrameSyncRegistry<D>,
    recorder: R,
    surface: S,
    command_buffers: Vec<vk::CommandBuffer>,
    controller: RecreationController,
    frame_counter: u64,
    framebuffer_resized: bool,
    phase: FramePhase,
    device: Arc<D>,
}

impl<D, S, R> FrameDriver<D, S, R>
where
    D: GpuDevice,
    S: PresentSurface,
    R: FrameRecorder<D>,
{
    /// Creates the frame slots and the initial swapchain state.
    ///
    /// `command_buffers` holds one resettable primary command buffer per
    /// frame slot; their pool is owned by the caller and must outlive the
    /// driver.
    ///
    /// # Errors
    ///
    /// [`RhiError::InvalidArgument`] if the command buffer count does not
    /// match [`MAX_FRAMES_IN_FLIGHT`]; [`RhiError::SwapchainUnavailable`] if
    /// the window closes while still minimized; any creation error.
    pub fn new<W: PresentWindow + ?Sized>(
        device: Arc<D>,
        surface: S,
        recorder: R,
        command_buffers: Vec<vk::CommandBuffer>,
        window: &mut W,
    ) -> RhiResult<Self> {
        if command_buffers.len() != MAX_FRAMES_IN_FLIGHT {
            return Err(RhiError::InvalidArgument(format!(
                "Expected {} command buffers, got {}",
                MAX_FRAMES_IN_FLIGHT,
                command_buffers.len()
            )));
        }

        let sync = FrameSyncRegistry::new(&device, MAX_FRAMES_IN_FLIGHT)?;
        let controller = RecreationController::new();
        let state = controller.create(&device, &surface, window, recorder.render_pass())?;

        info!(
            "Frame driver ready: {} frames in flight, {} swapchain images",
            sync.slot_count(),
            state.image_count()
        );

        Ok(Self {
            state: Some(state),
            sync,
            recorder,
            surface,
            command_buffers,
            controller,
            frame_counter: 0,
            framebuffer_resized: false,
            phase: FramePhase::Idle,
            device,
        })
    }

    /// Renders and presents one frame.
    ///
    /// # Errors
    ///
    /// Only fatal conditions. [`RhiError::SwapchainUnavailable`] once a
    /// previous rebuild has failed.
    pub fn render_frame<W: PresentWindow + ?Sized>(&mut self, window: &mut W) -> RhiResult<FrameStatus> {
        let result = self.run_frame(window);
        self.phase = FramePhase::Idle;
        result
    }

    fn run_frame<W: PresentWindow + ?Sized>(&mut self, window: &mut W) -> RhiResult<FrameStatus> {
        let state = self.state.as_ref().ok_or(RhiError::SwapchainUnavailable)?;

        let slot_index = self.sync.slot(self.frame_counter);
        let slot = self.sync.get(slot_index).ok_or_else(|| {
            RhiError::InvalidArgument(format!("Frame slot {} does not exist", slot_index))
        })?;
        let image_available = slot.image_available();
        let render_finished = slot.render_finished();
        let in_flight = slot.in_flight();
        let command_buffer = self.command_buffers[slot_index];
        let swapchain = state.swapchain();

        self.phase = FramePhase::Waiting;
        self.device.wait_for_fence(in_flight, u64::MAX)?;

        self.phase = FramePhase::Acquiring;
        let acquired = AcquireStatus::interpret(self.device.acquire_next_image(
            swapchain,
            u64::MAX,
            image_available,
        ))?;
        let (image_index, acquire_suboptimal) = match acquired {
            AcquireStatus::Acquired {
                image_index,
                suboptimal,
            } => (image_index, suboptimal),
            AcquireStatus::OutOfDate => {
                debug!("Acquire reported out-of-date, frame {} skipped", self.frame_counter);
                self.phase = FramePhase::OutOfDate;
                self.recreate(window)?;
                return Ok(FrameStatus::Skipped);
            }
        };
        if acquire_suboptimal {
            debug!("Acquire reported suboptimal, rebuilding after present");
        }

        self.phase = FramePhase::Recording;
        let target = RecordTarget {
            slot: slot_index,
            image_index,
            command_buffer,
            framebuffer: state.framebuffer(image_index)?,
            extent: state.extent(),
        };
        self.device.reset_command_buffer(command_buffer)?;
        self.device.begin_command_buffer(command_buffer)?;
        self.recorder.record(self.device.as_ref(), &target)?;
        self.device.end_command_buffer(command_buffer)?;

        self.phase = FramePhase::Submitting;
        self.device.reset_fence(in_flight)?;
        self.device.submit_graphics(&FrameSubmission {
            command_buffer,
            wait_semaphore: image_available,
            wait_stage: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            signal_semaphore: render_finished,
            fence: in_flight,
        })?;

        self.phase = FramePhase::Presenting;
        let presented = PresentStatus::interpret(self.device.queue_present(
            swapchain,
            image_index,
            render_finished,
        ))?;

        // the slot's fence is armed, so its next wait terminates
        self.frame_counter += 1;

        let resized = std::mem::take(&mut self.framebuffer_resized);
        let stale = acquire_suboptimal || resized || presented != PresentStatus::Presented;
        if stale {
            debug!(
                "Rebuilding swapchain (present {:?}, acquire suboptimal {}, resized {})",
                presented, acquire_suboptimal, resized
            );
            self.phase = FramePhase::OutOfDate;
            self.recreate(window)?;
        }

        Ok(FrameStatus::Presented {
            slot: slot_index,
            image_index,
            recreated: stale,
        })
    }

    /// Flags an out-of-band resize, handled after the next present.
    pub fn notify_resized(&mut self) {
        self.framebuffer_resized = true;
    }

    /// Rebuilds the swapchain-dependent state now.
    ///
    /// # Errors
    ///
    /// Any rebuild error. The driver has no swapchain afterwards and every
    /// later frame fails with [`RhiError::SwapchainUnavailable`].
    pub fn recreate<W: PresentWindow + ?Sized>(&mut self, window: &mut W) -> RhiResult<()> {
        let current = self.state.take().ok_or(RhiError::SwapchainUnavailable)?;
        let state = self.controller.recreate(
            &self.device,
            &self.surface,
            window,
            current,
            self.recorder.render_pass(),
        )?;
        self.state = Some(state);
        Ok(())
    }

    /// Blocks until all submitted work has finished.
    pub fn wait_idle(&self) -> RhiResult<()> {
        self.device.wait_idle()
    }

    #[inline]
    pub fn frame_counter(&self) -> u64 {
        self.frame_counter
    }

    /// Slot the next frame will use.
    #[inline]
    pub fn current_slot(&self) -> usize {
        self.sync.slot(self.frame_counter)
    }

    #[inline]
    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    /// Extent of the live swapchain, if there is one.
    pub fn extent(&self) -> Option<vk::Extent2D> {
        self.state.as_ref().map(SwapchainState::extent)
    }

    #[inline]
    pub fn swapchain_state(&self) -> Option<&SwapchainState<D>> {
        self.state.as_ref()
    }

    #[inline]
    pub fn recreations(&self) -> u64 {
        self.controller.recreations()
    }

    #[inline]
    pub fn recorder(&self) -> &R {
        &self.recorder
    }

    #[inline]
    pub fn surface(&self) -> &S {
        &self.surface
    }
}

impl<D, S, R> Drop for FrameDriver<D, S, R>
where
    D: GpuDevice,
    S: PresentSurface,
    R: FrameRecorder<D>,
{
    fn drop(&mut self) {
        if let Err(e) = self.device.wait_idle() {
            error!("Failed to wait for device idle before teardown: {}", e);
        }
        debug!(
            "Frame driver shutting down after {} frames, {} recreations",
            self.frame_counter,
            self.controller.recreations()
        );
    }
}
