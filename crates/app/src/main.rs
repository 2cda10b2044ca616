//! vkchain - swapchain lifecycle demo
//!
//! Opens a window and renders a triangle, rebuilding the swapchain as the
//! window is resized or minimized.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, error, info, warn};

use vkchain_core::{AppConfig, FrameTimer};
use vkchain_platform::{PresentWindow, Window};
use vkchain_renderer::{FrameStatus, Renderer};
use vkchain_rhi::instance::{DebugSeverity, DebugSink, DiagnosticsConfig};

#[derive(Debug, Parser)]
#[command(name = "vkchain", version, about = "Vulkan swapchain lifecycle demo")]
struct Args {
    /// Configuration file; defaults are used when it does not exist
    #[arg(long, default_value = "vkchain.toml")]
    config: PathBuf,

    /// Disable the validation layer regardless of the configuration
    #[arg(long)]
    no_validation: bool,

    /// Override the initial window width
    #[arg(long)]
    width: Option<u32>,

    /// Override the initial window height
    #[arg(long)]
    height: Option<u32>,
}

impl Args {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(width) = self.width {
            config.window.width = width;
        }
        if let Some(height) = self.height {
            config.window.height = height;
        }
        if self.no_validation {
            config.diagnostics.validation = false;
        }
    }
}

/// Logs validation messages and counts the errors among them.
fn validation_sink(errors: Arc<AtomicUsize>) -> Arc<DebugSink> {
    Arc::new(move |severity: DebugSeverity, message: &str| match severity {
        DebugSeverity::Error => {
            errors.fetch_add(1, Ordering::Relaxed);
            error!(target: "vkchain::validation", "{}", message);
        }
        DebugSeverity::Warning => warn!(target: "vkchain::validation", "{}", message),
        DebugSeverity::Info => info!(target: "vkchain::validation", "{}", message),
        DebugSeverity::Verbose => debug!(target: "vkchain::validation", "{}", message),
    })
}

fn run(args: Args) -> Result<()> {
    let mut config = AppConfig::load_or_default(&args.config)
        .with_context(|| format!("Failed to load config {}", args.config.display()))?;
    args.apply(&mut config);
    debug!("Configuration: {:?}", config);

    let validation_errors = Arc::new(AtomicUsize::new(0));
    let diagnostics = if config.diagnostics.validation {
        DiagnosticsConfig::validation().with_sink(validation_sink(validation_errors.clone()))
    } else {
        DiagnosticsConfig::disabled()
    };

    let mut window = Window::new(&config.window).context("Failed to create window")?;
    let mut renderer = Renderer::new(&mut window, &diagnostics, &config.render)
        .context("Failed to initialize renderer")?;
    info!(
        "Initialization complete (validation {}), entering main loop",
        if renderer.validation_enabled() { "on" } else { "off" }
    );

    let mut timer = FrameTimer::default();
    loop {
        window.poll_events();
        if window.close_requested() {
            info!("Close requested, shutting down");
            break;
        }
        if window.take_resized() {
            renderer.notify_resized();
        }

        let status = renderer
            .render_frame(&mut window)
            .context("Failed to render frame")?;
        if let FrameStatus::Presented { .. } = status
            && let Some(fps) = timer.frame()
        {
            debug!(
                "{:.1} fps ({} frames, {} recreations)",
                fps,
                renderer.frame_counter(),
                renderer.recreations()
            );
        }
    }

    renderer
        .wait_idle()
        .context("Failed to wait for device idle")?;
    info!(
        "Rendered {} frames in {:.1}s",
        timer.total_frames(),
        timer.elapsed().as_secs_f64()
    );
    drop(renderer);

    let errors = validation_errors.load(Ordering::Relaxed);
    if errors > 0 {
        warn!("{} validation errors reported", errors);
    }
    Ok(())
}

fn main() -> Result<()> {
    vkchain_core::init_logging();
    info!("Starting vkchain");

    let args = Args::parse();
    run(args)
}
