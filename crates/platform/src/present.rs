//! The window-side interface the swapchain lifecycle consumes.

/// Window queries and event pumping needed to keep a swapchain in sync with
/// its surface.
///
/// Implemented by [`crate::Window`]; tests substitute scripted windows.
pub trait PresentWindow {
    /// Current framebuffer size in pixels. Either dimension is zero while the
    /// window is minimized.
    fn framebuffer_size(&self) -> (u32, u32);

    /// The user asked to close the window.
    fn close_requested(&self) -> bool;

    /// Blocks until at least one event has been processed.
    fn wait_events(&mut self);

    /// Processes pending events without blocking.
    fn poll_events(&mut self);

    /// Returns whether a resize was observed since the last call, and clears
    /// the flag.
    fn take_resized(&mut self) -> bool;

    /// Neither dimension is zero.
    fn has_area(&self) -> bool {
        let (width, height) = self.framebuffer_size();
        width > 0 && height > 0
    }
}
