//! Shader module management.
//!
//! Shaders are authored in WGSL and translated to SPIR-V at startup with
//! `naga`. One [`ShaderModule`] may hold several entry points; pipeline stage
//! infos are produced per `(stage, entry point)` pair.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use vkchain_rhi::device::Device;
//! use vkchain_rhi::shader::{ShaderModule, ShaderStage};
//!
//! # fn example(device: Arc<Device>, source: &str) -> vkchain_rhi::RhiResult<()> {
//! let module = ShaderModule::from_wgsl(device, "triangle", source)?;
//! let _vertex = module.stage_create_info(ShaderStage::Vertex, c"vs_main");
//! let _fragment = module.stage_create_info(ShaderStage::Fragment, c"fs_main");
//! # Ok(())
//! # }
//! ```

use std::ffi::CStr;
use std::sync::Arc;

use ash::vk;
use naga::back::spv;
use naga::valid::{Capabilities, ValidationFlags, Validator};
use tracing::{debug, info};

use crate::device::Device;
use crate::error::{RhiError, RhiResult, VkResultExt};

/// SPIR-V magic number, first word of every module.
pub const SPIRV_MAGIC: u32 = 0x0723_0203;

/// Pipeline stage a shader entry point runs in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    #[inline]
    pub fn to_vk_stage(self) -> vk::ShaderStageFlags {
        match self {
            ShaderStage::Vertex => vk::ShaderStageFlags::VERTEX,
            ShaderStage::Fragment => vk::ShaderStageFlags::FRAGMENT,
        }
    }

    #[inline]
    pub fn name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        }
    }
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Parses, validates and translates WGSL source to SPIR-V words.
///
/// # Errors
///
/// [`RhiError::ShaderError`] with the naga diagnostic for parse, validation
/// or translation failures.
pub fn compile_wgsl(name: &str, source: &str) -> RhiResult<Vec<u32>> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| {
        RhiError::ShaderError(format!("{}: {}", name, e.emit_to_string(source)))
    })?;

    let mut validator = Validator::new(ValidationFlags::all(), Capabilities::empty());
    let module_info = validator
        .validate(&module)
        .map_err(|e| RhiError::ShaderError(format!("{}: validation failed: {:?}", name, e)))?;

    let words = spv::write_vec(&module, &module_info, &spv::Options::default(), None)
        .map_err(|e| RhiError::ShaderError(format!("{}: SPIR-V output failed: {}", name, e)))?;

    debug!(
        "Compiled WGSL '{}' to {} SPIR-V words ({} entry points)",
        name,
        words.len(),
        module.entry_points.len()
    );
    Ok(words)
}

/// A `vk::ShaderModule` destroyed on drop.
pub struct ShaderModule {
    device: Arc<Device>,
    module: vk::ShaderModule,
}

impl ShaderModule {
    /// Compiles WGSL and creates the module.
    pub fn from_wgsl(device: Arc<Device>, name: &str, source: &str) -> RhiResult<Self> {
        let code = compile_wgsl(name, source)?;
        Self::from_spirv(device, name, &code)
    }

    /// Creates a module from SPIR-V words.
    pub fn from_spirv(device: Arc<Device>, name: &str, code: &[u32]) -> RhiResult<Self> {
        if code.first() != Some(&SPIRV_MAGIC) {
            return Err(RhiError::ShaderError(format!(
                "{}: missing SPIR-V magic number",
                name
            )));
        }

        let create_info = vk::ShaderModuleCreateInfo::default().code(code);
        let module = unsafe {
            device
                .handle()
                .create_shader_module(&create_info, None)
                .call("vkCreateShaderModule")?
        };

        info!("Created shader module '{}'", name);
        Ok(Self { device, module })
    }

    #[inline]
    pub fn handle(&self) -> vk::ShaderModule {
        self.module
    }

    /// Stage info for one entry point. Borrows `entry_point` and must not
    /// outlive it.
    pub fn stage_create_info<'a>(
        &self,
        stage: ShaderStage,
        entry_point: &'a CStr,
    ) -> vk::PipelineShaderStageCreateInfo<'a> {
        vk::PipelineShaderStageCreateInfo::default()
            .stage(stage.to_vk_stage())
            .module(self.module)
            .name(entry_point)
    }
}

impl Drop for ShaderModule {
    fn drop(&mut self) {
        unsafe {
            self.device
                .handle()
                .destroy_shader_module(self.module, None);
        }
        debug!("Destroyed shader module");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        @vertex
        fn vs_main(@builtin(vertex_index) index: u32) -> @builtin(position) vec4<f32> {
            let x = f32(i32(index) - 1);
            return vec4<f32>(x, 0.0, 0.0, 1.0);
        }

        @fragment
        fn fs_main() -> @location(0) vec4<f32> {
            return vec4<f32>(1.0, 0.0, 0.0, 1.0);
        }
    "#;

    #[test]
    fn test_shader_stage_to_vk() {
        assert_eq!(
            ShaderStage::Vertex.to_vk_stage(),
            vk::ShaderStageFlags::VERTEX
        );
        assert_eq!(
            ShaderStage::Fragment.to_vk_stage(),
            vk::ShaderStageFlags::FRAGMENT
        );
        assert_eq!(ShaderStage::Fragment.to_string(), "fragment");
    }

    #[test]
    fn test_compile_wgsl_produces_spirv() {
        let words = compile_wgsl("minimal", MINIMAL).unwrap();
        assert!(words.len() > 5);
        assert_eq!(words[0], SPIRV_MAGIC);
    }

    #[test]
    fn test_compile_wgsl_reports_parse_errors() {
        let err = compile_wgsl("broken", "fn vs_main( {").unwrap_err();
        match err {
            RhiError::ShaderError(message) => assert!(message.starts_with("broken:")),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
