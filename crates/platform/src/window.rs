//! Window management using winit.
//!
//! The event loop is driven in pump mode so the render loop stays in control
//! of the thread: [`Window::poll_events`] drains pending events and returns
//! immediately, [`Window::wait_events`] blocks until something happens
//! (used while the window is minimized).

use std::time::Duration;

use raw_window_handle::{HasDisplayHandle, HasWindowHandle, RawDisplayHandle, RawWindowHandle};
use tracing::{debug, info};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Window as WinitWindow, WindowAttributes, WindowId};

use vkchain_core::config::WindowConfig;
use vkchain_core::{Error, Result};

use crate::present::PresentWindow;

/// Application handler state fed by the pumped event loop.
struct WindowState {
    attributes: WindowAttributes,
    window: Option<WinitWindow>,
    close_requested: bool,
    resized: bool,
    creation_error: Option<String>,
}

impl ApplicationHandler for WindowState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        match event_loop.create_window(self.attributes.clone()) {
            Ok(window) => {
                let size = window.inner_size();
                info!("Window created: {}x{}", size.width, size.height);
                self.window = Some(window);
            }
            Err(e) => self.creation_error = Some(e.to_string()),
        }
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested");
                self.close_requested = true;
            }
            WindowEvent::Resized(size) => {
                debug!("Window resized: {}x{}", size.width, size.height);
                self.resized = true;
            }
            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Pressed
                    && event.physical_key == PhysicalKey::Code(KeyCode::Escape) =>
            {
                info!("Escape pressed, closing");
                self.close_requested = true;
            }
            _ => {}
        }
    }
}

/// A winit window owning its event loop.
pub struct Window {
    // window before event loop: the window must be dropped first
    state: WindowState,
    event_loop: EventLoop<()>,
}

impl Window {
    /// Creates the event loop and the window described by `config`.
    ///
    /// # Errors
    ///
    /// [`Error::Window`] if the event loop or the window cannot be created.
    pub fn new(config: &WindowConfig) -> Result<Self> {
        let event_loop = EventLoop::new().map_err(|e| Error::Window(e.to_string()))?;

        let attributes = WindowAttributes::default()
            .with_title(config.title.clone())
            .with_inner_size(PhysicalSize::new(config.width, config.height))
            .with_resizable(config.resizable);

        let mut window = Self {
            state: WindowState {
                attributes,
                window: None,
                close_requested: false,
                resized: false,
                creation_error: None,
            },
            event_loop,
        };

        // the window is created from `resumed`, delivered by the first pumps
        while window.state.window.is_none() {
            if let Some(message) = window.state.creation_error.take() {
                return Err(Error::Window(message));
            }
            if window.state.close_requested {
                return Err(Error::Window(
                    "Event loop exited before the window was created".to_string(),
                ));
            }
            window.pump(Some(Duration::ZERO));
        }

        Ok(window)
    }

    fn pump(&mut self, timeout: Option<Duration>) {
        if let PumpStatus::Exit(code) = self.event_loop.pump_app_events(timeout, &mut self.state) {
            debug!("Event loop exited with code {}", code);
            self.state.close_requested = true;
        }
    }

    fn inner(&self) -> Result<&WinitWindow> {
        self.state
            .window
            .as_ref()
            .ok_or_else(|| Error::Window("Window has not been created".to_string()))
    }

    /// Display handle for instance extension queries and surface creation.
    pub fn raw_display_handle(&self) -> Result<RawDisplayHandle> {
        let handle = self
            .inner()?
            .display_handle()
            .map_err(|e| Error::Window(format!("Failed to get display handle: {}", e)))?;
        Ok(handle.as_raw())
    }

    /// Window handle for surface creation.
    pub fn raw_window_handle(&self) -> Result<RawWindowHandle> {
        let handle = self
            .inner()?
            .window_handle()
            .map_err(|e| Error::Window(format!("Failed to get window handle: {}", e)))?;
        Ok(handle.as_raw())
    }
}

impl PresentWindow for Window {
    fn framebuffer_size(&self) -> (u32, u32) {
        self.state
            .window
            .as_ref()
            .map(|window| {
                let size = window.inner_size();
                (size.width, size.height)
            })
            .unwrap_or((0, 0))
    }

    fn close_requested(&self) -> bool {
        self.state.close_requested
    }

    fn wait_events(&mut self) {
        self.pump(None);
    }

    fn poll_events(&mut self) {
        self.pump(Some(Duration::ZERO));
    }

    fn take_resized(&mut self) -> bool {
        std::mem::take(&mut self.state.resized)
    }
}
