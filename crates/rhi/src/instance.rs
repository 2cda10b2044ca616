//! Vulkan instance management.
//!
//! This module handles VkInstance creation, validation layers, and the debug
//! messenger.
//!
//! # Overview
//!
//! Validation is configured per instance through [`DiagnosticsConfig`]. The
//! messages the validation layer produces are delivered to an injected
//! [`DebugSink`]; when none is supplied they are logged through `tracing`.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use vkchain_rhi::instance::{DebugSeverity, DiagnosticsConfig, Instance};
//!
//! # fn example(display: raw_window_handle::RawDisplayHandle) -> vkchain_rhi::RhiResult<()> {
//! let diagnostics = DiagnosticsConfig::validation().with_sink(Arc::new(
//!     |severity: DebugSeverity, message: &str| eprintln!("[{severity:?}] {message}"),
//! ));
//! let instance = Instance::new(&diagnostics, display)?;
//! assert!(instance.has_validation());
//! # Ok(())
//! # }
//! ```

use std::borrow::Cow;
use std::ffi::{CStr, c_char, c_void};
use std::fmt;
use std::sync::Arc;

use ash::{Entry, vk};
use raw_window_handle::RawDisplayHandle;
use tracing::{debug, error, info, warn};

use crate::error::{RhiError, RhiResult, VkResultExt};

/// The Khronos validation layer name.
const VALIDATION_LAYER_NAME: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Severity of a validation message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum DebugSeverity {
    Verbose,
    Info,
    Warning,
    Error,
}

impl DebugSeverity {
    fn from_vk(severity: vk::DebugUtilsMessageSeverityFlagsEXT) -> Self {
        if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
            DebugSeverity::Error
        } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
            DebugSeverity::Warning
        } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
            DebugSeverity::Info
        } else {
            DebugSeverity::Verbose
        }
    }

    fn to_vk_mask(self) -> vk::DebugUtilsMessageSeverityFlagsEXT {
        use vk::DebugUtilsMessageSeverityFlagsEXT as S;
        match self {
            DebugSeverity::Verbose => S::VERBOSE | S::INFO | S::WARNING | S::ERROR,
            DebugSeverity::Info => S::INFO | S::WARNING | S::ERROR,
            DebugSeverity::Warning => S::WARNING | S::ERROR,
            DebugSeverity::Error => S::ERROR,
        }
    }
}

/// Receiver for validation messages.
pub type DebugSink = dyn Fn(DebugSeverity, &str) + Send + Sync;

/// Validation settings for an [`Instance`].
#[derive(Clone)]
pub struct DiagnosticsConfig {
    /// Request the Khronos validation layer.
    pub enable_validation: bool,
    /// Lowest severity forwarded to the sink.
    pub min_severity: DebugSeverity,
    /// Message receiver; `None` logs through `tracing`.
    pub sink: Option<Arc<DebugSink>>,
}

impl DiagnosticsConfig {
    /// Validation off.
    pub fn disabled() -> Self {
        Self {
            enable_validation: false,
            min_severity: DebugSeverity::Warning,
            sink: None,
        }
    }

    /// Validation on, warnings and errors logged through `tracing`.
    pub fn validation() -> Self {
        Self {
            enable_validation: true,
            ..Self::disabled()
        }
    }

    /// Replace the message receiver.
    pub fn with_sink(mut self, sink: Arc<DebugSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Set the lowest forwarded severity.
    pub fn with_min_severity(mut self, severity: DebugSeverity) -> Self {
        self.min_severity = severity;
        self
    }
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::validation()
        } else {
            Self::disabled()
        }
    }
}

impl fmt::Debug for DiagnosticsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosticsConfig")
            .field("enable_validation", &self.enable_validation)
            .field("min_severity", &self.min_severity)
            .field("sink", &self.sink.as_ref().map(|_| "custom"))
            .finish()
    }
}

/// Sink used when none is injected.
fn log_to_tracing(severity: DebugSeverity, message: &str) {
    match severity {
        DebugSeverity::Error => error!("[Vulkan] {}", message),
        DebugSeverity::Warning => warn!("[Vulkan] {}", message),
        DebugSeverity::Info => info!("[Vulkan] {}", message),
        DebugSeverity::Verbose => debug!("[Vulkan] {}", message),
    }
}

/// Vulkan instance wrapper with optional validation layer support.
pub struct Instance {
    /// Vulkan entry point loader
    entry: Entry,
    /// Vulkan instance handle
    instance: ash::Instance,
    /// Debug utils loader and messenger, present when validation is active
    debug_messenger: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
    /// Receiver handed to the messenger as user data. Must outlive the messenger.
    _sink: Box<Arc<DebugSink>>,
}

impl Instance {
    /// Creates a new Vulkan instance able to present to `display`.
    ///
    /// # Errors
    ///
    /// Returns an error if the Vulkan library cannot be loaded, the surface
    /// extensions for `display` are unavailable, or instance creation fails.
    pub fn new(diagnostics: &DiagnosticsConfig, display: RawDisplayHandle) -> RhiResult<Self> {
        let entry = unsafe { Entry::load()? };

        let validation_available =
            diagnostics.enable_validation && Self::is_validation_layer_available(&entry)?;
        if diagnostics.enable_validation && !validation_available {
            warn!("Validation layer requested but not available, proceeding without it");
        }

        let app_info = vk::ApplicationInfo::default()
            .application_name(c"vkchain")
            .application_version(vk::make_api_version(0, 0, 1, 0))
            .engine_name(c"vkchain")
            .engine_version(vk::make_api_version(0, 0, 1, 0))
            .api_version(vk::API_VERSION_1_1);

        let mut extensions = Self::required_extensions(display)?;
        if validation_available {
            extensions.push(ash::ext::debug_utils::NAME.as_ptr());
        }

        let layers = if validation_available {
            vec![VALIDATION_LAYER_NAME.as_ptr()]
        } else {
            vec![]
        };

        let create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_extension_names(&extensions)
            .enabled_layer_names(&layers);

        let instance = unsafe {
            entry
                .create_instance(&create_info, None)
                .call("vkCreateInstance")?
        };

        info!("Vulkan instance created (API version 1.1)");

        let sink: Box<Arc<DebugSink>> = Box::new(
            diagnostics
                .sink
                .clone()
                .unwrap_or_else(|| Arc::new(log_to_tracing) as Arc<DebugSink>),
        );

        let debug_messenger = if validation_available {
            let debug_utils = ash::ext::debug_utils::Instance::new(&entry, &instance);
            let user_data = &*sink as *const Arc<DebugSink> as *mut c_void;
            match Self::setup_debug_messenger(&debug_utils, diagnostics.min_severity, user_data) {
                Ok(messenger) => {
                    info!("Validation layers enabled");
                    Some((debug_utils, messenger))
                }
                Err(e) => {
                    unsafe { instance.destroy_instance(None) };
                    return Err(e);
                }
            }
        } else {
            None
        };

        Ok(Self {
            entry,
            instance,
            debug_messenger,
            _sink: sink,
        })
    }

    /// Returns the Vulkan instance handle.
    #[inline]
    pub fn handle(&self) -> &ash::Instance {
        &self.instance
    }

    /// Returns the Vulkan entry point loader.
    #[inline]
    pub fn entry(&self) -> &Entry {
        &self.entry
    }

    /// Returns whether validation layers are enabled.
    #[inline]
    pub fn has_validation(&self) -> bool {
        self.debug_messenger.is_some()
    }

    /// Instance extensions needed to create a surface for `display`.
    fn required_extensions(display: RawDisplayHandle) -> RhiResult<Vec<*const c_char>> {
        let extensions = ash_window::enumerate_required_extensions(display).map_err(|e| {
            RhiError::ConfigurationError(format!(
                "No surface extensions for this display: {}",
                e
            ))
        })?;

        debug!(
            "Required surface extensions: {:?}",
            extensions
                .iter()
                .map(|&ext| unsafe { CStr::from_ptr(ext) })
                .collect::<Vec<_>>()
        );

        Ok(extensions.to_vec())
    }

    fn is_validation_layer_available(entry: &Entry) -> RhiResult<bool> {
        let available_layers = unsafe {
            entry
                .enumerate_instance_layer_properties()
                .call("vkEnumerateInstanceLayerProperties")?
        };

        let found = available_layers.iter().any(|layer| {
            layer
                .layer_name_as_c_str()
                .is_ok_and(|name| name == VALIDATION_LAYER_NAME)
        });

        Ok(found)
    }

    fn setup_debug_messenger(
        debug_utils: &ash::ext::debug_utils::Instance,
        min_severity: DebugSeverity,
        user_data: *mut c_void,
    ) -> RhiResult<vk::DebugUtilsMessengerEXT> {
        let create_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(min_severity.to_vk_mask())
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(debug_callback))
            .user_data(user_data);

        unsafe {
            debug_utils
                .create_debug_utils_messenger(&create_info, None)
                .call("vkCreateDebugUtilsMessengerEXT")
        }
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        unsafe {
            if let Some((debug_utils, messenger)) = self.debug_messenger.take() {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }
            self.instance.destroy_instance(None);
        }
        // sink is released after the messenger that referenced it
        info!("Vulkan instance destroyed");
    }
}

fn message_type_name(message_type: vk::DebugUtilsMessageTypeFlagsEXT) -> &'static str {
    match message_type {
        vk::DebugUtilsMessageTypeFlagsEXT::GENERAL => "General",
        vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION => "Validation",
        vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE => "Performance",
        _ => "Unknown",
    }
}

/// Forwards validation messages to the instance's [`DebugSink`].
///
/// # Safety
///
/// Called by the loader. `user_data` is the address of the `Arc<DebugSink>`
/// boxed inside the owning [`Instance`].
unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    user_data: *mut c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() || user_data.is_null() {
        return vk::FALSE;
    }

    let callback_data = unsafe { &*p_callback_data };
    let message = if callback_data.p_message.is_null() {
        Cow::Borrowed("(no message)")
    } else {
        unsafe { CStr::from_ptr(callback_data.p_message).to_string_lossy() }
    };

    let sink = unsafe { &*(user_data as *const Arc<DebugSink>) };
    sink(
        DebugSeverity::from_vk(message_severity),
        &format!("[{}] {}", message_type_name(message_type), message),
    );

    vk::FALSE
}
