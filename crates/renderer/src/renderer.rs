//! Main renderer orchestration.
//!
//! [`Renderer`] assembles the Vulkan objects around a [`FrameDriver`]:
//! instance, surface, device, command pool and the triangle recorder.
//!
//! # Resource Destruction Order
//!
//! Fields are declared so that drop order is:
//! 1. Frame driver: waits for device idle, then releases the swapchain
//!    state, frame slots, recorder (pipeline, buffers, render pass) and surface
//! 2. Command pool (frees the per-frame command buffers)
//! 3. Logical device
//! 4. Instance

use std::sync::Arc;

use ash::vk;
use tracing::info;

use vkchain_core::config::RenderConfig;
use vkchain_platform::{PresentWindow, Window};
use vkchain_rhi::command::CommandPool;
use vkchain_rhi::device::Device;
use vkchain_rhi::instance::{DiagnosticsConfig, Instance};
use vkchain_rhi::physical_device::select_physical_device;
use vkchain_rhi::surface::{PresentSurface, Surface};
use vkchain_rhi::swapchain::choose_format;
use vkchain_rhi::{GpuDevice, RhiError, RhiResult};

use crate::MAX_FRAMES_IN_FLIGHT;
use crate::depth_buffer::find_depth_format;
use crate::frame_driver::{FrameDriver, FrameStatus};
use crate::triangle::TriangleRecorder;

type TriangleDriver = FrameDriver<Device, Surface, TriangleRecorder>;

/// Renders the demo scene into a window.
pub struct Renderer {
    driver: TriangleDriver,
    _command_pool: CommandPool,
    device: Arc<Device>,
    instance: Instance,
}

impl Renderer {
    /// Creates every Vulkan object for `window`.
    ///
    /// # Errors
    ///
    /// Any instance, device or resource creation error. Missing Vulkan
    /// support surfaces as [`RhiError::LoadingError`] or
    /// [`RhiError::NoSuitableGpu`].
    pub fn new(
        window: &mut Window,
        diagnostics: &DiagnosticsConfig,
        render: &RenderConfig,
    ) -> RhiResult<Self> {
        let display = window
            .raw_display_handle()
            .map_err(|e| RhiError::SurfaceError(e.to_string()))?;
        let native_window = window
            .raw_window_handle()
            .map_err(|e| RhiError::SurfaceError(e.to_string()))?;

        let instance = Instance::new(diagnostics, display)?;

        // SAFETY: the handles come from `window`, which the caller keeps
        // alive for as long as the renderer.
        let surface = unsafe { Surface::new(&instance, display, native_window)? };

        let physical_device_info = select_physical_device(&instance, &surface)?;
        info!(
            "Using GPU: {} ({})",
            physical_device_info.device_name(),
            physical_device_info.device_type_name()
        );

        let device = Device::new(&instance, &physical_device_info)?;

        let support = surface.query_support(physical_device_info.device)?;
        let color_format = choose_format(&support.formats)?.format;
        let depth_format = find_depth_format(device.as_ref())?;

        let recorder =
            TriangleRecorder::new(device.clone(), color_format, depth_format, render.clear_color)?;

        let command_pool = CommandPool::for_graphics(device.clone())?;
        let command_buffers = command_pool.allocate_command_buffers(MAX_FRAMES_IN_FLIGHT as u32)?;

        let driver = FrameDriver::new(device.clone(), surface, recorder, command_buffers, window)?;

        info!("Renderer initialized");

        Ok(Self {
            driver,
            _command_pool: command_pool,
            device,
            instance,
        })
    }

    /// Renders one frame, rebuilding the swapchain when it went stale.
    pub fn render_frame<W: PresentWindow + ?Sized>(&mut self, window: &mut W) -> RhiResult<FrameStatus> {
        self.driver.render_frame(window)
    }

    /// Flags a window resize; handled after the next present.
    pub fn notify_resized(&mut self) {
        self.driver.notify_resized();
    }

    /// Rebuilds the swapchain immediately.
    pub fn recreate<W: PresentWindow + ?Sized>(&mut self, window: &mut W) -> RhiResult<()> {
        self.driver.recreate(window)
    }

    pub fn wait_idle(&self) -> RhiResult<()> {
        self.device.wait_idle()
    }

    pub fn extent(&self) -> Option<vk::Extent2D> {
        self.driver.extent()
    }

    pub fn frame_counter(&self) -> u64 {
        self.driver.frame_counter()
    }

    pub fn recreations(&self) -> u64 {
        self.driver.recreations()
    }

    pub fn validation_enabled(&self) -> bool {
        self.instance.has_validation()
    }
}
