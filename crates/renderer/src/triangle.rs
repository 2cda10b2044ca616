//! The demo scene: one colored triangle.
//!
//! [`TriangleRecorder`] owns everything that survives swapchain recreation:
//! the render pass, the shader module, the pipeline and the vertex buffer.

use std::sync::Arc;

use ash::vk;
use glam::{Vec2, Vec3};
use tracing::info;

use vkchain_rhi::buffer::{Buffer, BufferUsage};
use vkchain_rhi::command::CommandBuffer;
use vkchain_rhi::device::Device;
use vkchain_rhi::pipeline::{CullMode, GraphicsPipelineBuilder, Pipeline, PipelineLayout};
use vkchain_rhi::render_pass::RenderPass;
use vkchain_rhi::shader::ShaderModule;
use vkchain_rhi::vertex::Vertex;
use vkchain_rhi::RhiResult;

use crate::recorder::{FrameRecorder, RecordTarget};

const SHADER_SOURCE: &str = include_str!("../shaders/triangle.wgsl");

/// Triangle vertices in clip space (red, green, blue corners).
pub const TRIANGLE_VERTICES: [Vertex; 3] = [
    Vertex::new(Vec2::new(0.0, -0.5), Vec3::new(1.0, 0.0, 0.0)),
    Vertex::new(Vec2::new(0.5, 0.5), Vec3::new(0.0, 1.0, 0.0)),
    Vertex::new(Vec2::new(-0.5, 0.5), Vec3::new(0.0, 0.0, 1.0)),
];

/// Clear values for the color and depth attachments.
pub fn clear_values(clear_color: [f32; 4]) -> [vk::ClearValue; 2] {
    [
        vk::ClearValue {
            color: vk::ClearColorValue {
                float32: clear_color,
            },
        },
        vk::ClearValue {
            depth_stencil: vk::ClearDepthStencilValue {
                depth: 1.0,
                stencil: 0,
            },
        },
    ]
}

/// Records a single triangle draw into each frame.
pub struct TriangleRecorder {
    // pipeline objects before the render pass they were built against
    pipeline: Pipeline,
    _pipeline_layout: PipelineLayout,
    _shader: ShaderModule,
    vertex_buffer: Buffer,
    render_pass: RenderPass,
    clear_values: [vk::ClearValue; 2],
    device: Arc<Device>,
}

impl TriangleRecorder {
    /// Builds the render pass for `color_format`/`depth_format` and the
    /// triangle pipeline on top of it.
    pub fn new(
        device: Arc<Device>,
        color_format: vk::Format,
        depth_format: vk::Format,
        clear_color: [f32; 4],
    ) -> RhiResult<Self> {
        let render_pass = RenderPass::new(device.clone(), color_format, depth_format)?;
        let shader = ShaderModule::from_wgsl(device.clone(), "triangle", SHADER_SOURCE)?;
        let pipeline_layout = PipelineLayout::new(device.clone(), &[], &[])?;

        let pipeline = GraphicsPipelineBuilder::new()
            .shader(&shader, c"vs_main", c"fs_main")
            .vertex_binding(Vertex::binding_description())
            .vertex_attributes(&Vertex::attribute_descriptions())
            .cull_mode(CullMode::None)
            .render_pass(render_pass.handle(), 0)
            .build(device.clone(), &pipeline_layout)?;

        let vertex_buffer = Buffer::new_with_data(
            device.clone(),
            BufferUsage::Vertex,
            bytemuck::cast_slice(&TRIANGLE_VERTICES),
        )?;

        info!("Triangle recorder ready");

        Ok(Self {
            pipeline,
            _pipeline_layout: pipeline_layout,
            _shader: shader,
            vertex_buffer,
            render_pass,
            clear_values: clear_values(clear_color),
            device,
        })
    }
}

impl FrameRecorder<Device> for TriangleRecorder {
    fn render_pass(&self) -> vk::RenderPass {
        self.render_pass.handle()
    }

    fn record(&mut self, _device: &Device, target: &RecordTarget) -> RhiResult<()> {
        let cmd = CommandBuffer::from_handle(self.device.clone(), target.command_buffer);

        cmd.begin_render_pass(
            self.render_pass.handle(),
            target.framebuffer,
            target.extent,
            &self.clear_values,
        );
        cmd.bind_graphics_pipeline(self.pipeline.handle());
        cmd.set_full_viewport(target.extent);
        cmd.bind_vertex_buffers(0, &[self.vertex_buffer.handle()], &[0]);
        cmd.draw(TRIANGLE_VERTICES.len() as u32, 1, 0, 0);
        cmd.end_render_pass();

        Ok(())
    }
}
