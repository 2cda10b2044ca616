//! Rebuilding swapchain-dependent state.
//!
//! Recreation replaces exactly what [`SwapchainBuilder`] produced. The render
//! pass, pipelines and buffers are kept: the surface format is assumed not
//! to change across a resize, and a changed format is only logged.

use std::sync::Arc;

use ash::vk;
use tracing::{debug, info, warn};

use vkchain_platform::PresentWindow;
use vkchain_rhi::surface::PresentSurface;
use vkchain_rhi::swapchain::{SwapchainParameters, negotiate};
use vkchain_rhi::{GpuDevice, RhiError, RhiResult};

use crate::swapchain_state::{SwapchainBuilder, SwapchainState};

/// Blocks while the window has no area.
///
/// Returns the non-zero framebuffer size, or `None` if the window asked to
/// close while waiting.
fn wait_for_area<W: PresentWindow + ?Sized>(window: &mut W) -> Option<(u32, u32)> {
    let mut logged = false;
    loop {
        if window.has_area() {
            return Some(window.framebuffer_size());
        }
        if window.close_requested() {
            return None;
        }
        if !logged {
            let (width, height) = window.framebuffer_size();
            debug!("Window minimized ({}x{}), waiting for events", width, height);
            logged = true;
        }
        window.wait_events();
    }
}

/// Negotiates parameters once both the window and the surface have area.
///
/// A surface can report a zero extent for a moment after the window is
/// restored; that is waited out like a minimized window. Returns `None` if
/// the window asked to close first.
fn negotiate_when_ready<D, S, W>(
    device: &D,
    surface: &S,
    window: &mut W,
) -> RhiResult<Option<SwapchainParameters>>
where
    D: GpuDevice,
    S: PresentSurface + ?Sized,
    W: PresentWindow + ?Sized,
{
    let mut logged = false;
    loop {
        let Some(size) = wait_for_area(window) else {
            return Ok(None);
        };
        let support = surface.query_support(device.physical_device())?;
        let params = negotiate(&support, size)?;
        if params.extent.width > 0 && params.extent.height > 0 {
            return Ok(Some(params));
        }
        if window.close_requested() {
            return Ok(None);
        }
        if !logged {
            debug!(
                "Surface extent is {}x{}, waiting for events",
                params.extent.width, params.extent.height
            );
            logged = true;
        }
        window.wait_events();
    }
}

/// Creates the first swapchain state and rebuilds it on demand.
#[derive(Debug, Default)]
pub struct RecreationController {
    recreations: u64,
}

impl RecreationController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Completed rebuilds so far.
    #[inline]
    pub fn recreations(&self) -> u64 {
        self.recreations
    }

    /// Builds the initial state, waiting out a minimized window first.
    ///
    /// # Errors
    ///
    /// [`RhiError::SwapchainUnavailable`] if the window closes before it has
    /// any area, or any negotiation/build error.
    pub fn create<D, S, W>(
        &self,
        device: &Arc<D>,
        surface: &S,
        window: &mut W,
        render_pass: vk::RenderPass,
    ) -> RhiResult<SwapchainState<D>>
    where
        D: GpuDevice,
        S: PresentSurface + ?Sized,
        W: PresentWindow + ?Sized,
    {
        let params = negotiate_when_ready(device.as_ref(), surface, window)?
            .ok_or(RhiError::SwapchainUnavailable)?;
        Self::build(device, surface, &params, render_pass)
    }

    /// Tears down `current` and builds a replacement for the window's current
    /// size.
    ///
    /// While the window is minimized, or the surface reports a zero extent,
    /// this blocks processing window events. If the window requests close
    /// during that wait, `current` is returned untouched. Parameters are
    /// negotiated before anything is torn down, and the device is drained
    /// before anything is destroyed.
    ///
    /// # Errors
    ///
    /// Any negotiation or build error. `current` has already been destroyed
    /// by then.
    pub fn recreate<D, S, W>(
        &mut self,
        device: &Arc<D>,
        surface: &S,
        window: &mut W,
        current: SwapchainState<D>,
        render_pass: vk::RenderPass,
    ) -> RhiResult<SwapchainState<D>>
    where
        D: GpuDevice,
        S: PresentSurface + ?Sized,
        W: PresentWindow + ?Sized,
    {
        let params = match negotiate_when_ready(device.as_ref(), surface, window) {
            Ok(Some(params)) => params,
            Ok(None) => {
                info!("Close requested while minimized, keeping current swapchain");
                return Ok(current);
            }
            Err(e) => {
                device.wait_idle()?;
                SwapchainBuilder::destroy(current);
                return Err(e);
            }
        };

        // no in-flight frame may reference what is about to be destroyed
        device.wait_idle()?;

        let old_extent = current.extent();
        let old_format = current.color_format();
        SwapchainBuilder::destroy(current);

        let state = Self::build(device, surface, &params, render_pass)?;

        if state.color_format() != old_format {
            warn!(
                "Surface format changed from {:?} to {:?}; render pass was not rebuilt",
                old_format,
                state.color_format()
            );
        }

        self.recreations += 1;
        info!(
            "Swapchain recreated: {}x{} -> {}x{} (#{})",
            old_extent.width,
            old_extent.height,
            state.extent().width,
            state.extent().height,
            self.recreations
        );

        Ok(state)
    }

    fn build<D, S>(
        device: &Arc<D>,
        surface: &S,
        params: &SwapchainParameters,
        render_pass: vk::RenderPass,
    ) -> RhiResult<SwapchainState<D>>
    where
        D: GpuDevice,
        S: PresentSurface + ?Sized,
    {
        SwapchainBuilder::build(
            device,
            surface,
            params,
            &device.queue_families(),
            None,
            render_pass,
        )
    }
}
