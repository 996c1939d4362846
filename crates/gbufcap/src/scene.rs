//! A self-contained deferred "engine" for the offline harness.
//!
//! `HarnessScene` owns the primary camera, its composite and G-buffer
//! textures, and a single raymarch pipeline that populates all of them per
//! frame. It implements the capture core's collaborator traits so the
//! controller drives it exactly as it would a real engine's camera.

use std::sync::Arc;

use anyhow::Result;
use bytemuck::{Pod, Zeroable};
use capture::engine::{DeferredCamera, EnvironmentOracle, PrimaryCameraProvider};
use glam::{Mat4, Vec3};
use wgpu::util::DeviceExt;

const SCENE_SHADER: &str = include_str!("../shaders/scene.wgsl");
const WATER_LEVEL: f32 = 0.0;
const NEAR: f32 = 0.1;
const FAR: f32 = 1000.0;

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct SceneUniforms {
    projection: [[f32; 4]; 4],
    camera_to_world: [[f32; 4]; 4],
    time: f32,
    fog_enabled: f32,
    water_level: f32,
    _pad: f32,
}

/// Copyable underwater signal, sampled once per frame before the controller
/// tick so the scene can still be borrowed mutably as the camera provider.
#[derive(Debug, Clone, Copy)]
pub struct SceneOracle {
    underwater: bool,
}

impl EnvironmentOracle for SceneOracle {
    fn is_underwater(&self) -> bool {
        self.underwater
    }
}

pub struct HarnessScene {
    width: u32,
    height: u32,
    time: f32,
    fog_enabled: bool,

    final_color: wgpu::Texture,
    final_color_view: wgpu::TextureView,
    gbuffer_albedo: wgpu::Texture,
    gbuffer_albedo_view: wgpu::TextureView,
    gbuffer_normal: wgpu::Texture,
    gbuffer_normal_view: wgpu::TextureView,
    depth: wgpu::Texture,
    depth_view: wgpu::TextureView,

    target_override: Option<Arc<wgpu::TextureView>>,

    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
}

impl HarnessScene {
    pub fn new(device: &wgpu::Device, width: u32, height: u32, fog_enabled: bool) -> Result<Self> {
        let make_target = |label: &str, format: wgpu::TextureFormat| {
            let texture = device.create_texture(&wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                    | wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::COPY_SRC,
                view_formats: &[],
            });
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            (texture, view)
        };

        let (final_color, final_color_view) =
            make_target("scene composite", wgpu::TextureFormat::Rgba8Unorm);
        let (gbuffer_albedo, gbuffer_albedo_view) =
            make_target("scene gbuffer albedo", wgpu::TextureFormat::Rgba8Unorm);
        let (gbuffer_normal, gbuffer_normal_view) =
            make_target("scene gbuffer normal", wgpu::TextureFormat::Rgba16Float);
        let (depth, depth_view) = make_target("scene depth", wgpu::TextureFormat::Depth32Float);

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("scene shader"),
            source: wgpu::ShaderSource::Wgsl(SCENE_SHADER.into()),
        });

        let bind_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("scene uniforms layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let uniforms = SceneUniforms {
            projection: Self::projection_matrix(width, height).to_cols_array_2d(),
            camera_to_world: Self::camera_matrix(0.0).to_cols_array_2d(),
            time: 0.0,
            fog_enabled: if fog_enabled { 1.0 } else { 0.0 },
            water_level: WATER_LEVEL,
            _pad: 0.0,
        };
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("scene uniforms"),
            contents: bytemuck::bytes_of(&uniforms),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("scene uniforms"),
            layout: &bind_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("scene pipeline layout"),
            bind_group_layouts: &[&bind_layout],
            push_constant_ranges: &[],
        });

        let color_target = |format: wgpu::TextureFormat| {
            Some(wgpu::ColorTargetState {
                format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })
        };

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("scene pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &module,
                entry_point: Some("vs_main"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                buffers: &[],
            },
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: Some(wgpu::DepthStencilState {
                format: wgpu::TextureFormat::Depth32Float,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Always,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &module,
                entry_point: Some("fs_main"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                targets: &[
                    color_target(wgpu::TextureFormat::Rgba8Unorm),
                    color_target(wgpu::TextureFormat::Rgba8Unorm),
                    color_target(wgpu::TextureFormat::Rgba16Float),
                ],
            }),
            multiview: None,
            cache: None,
        });

        tracing::debug!(width, height, "harness scene ready");

        Ok(Self {
            width,
            height,
            time: 0.0,
            fog_enabled,
            final_color,
            final_color_view,
            gbuffer_albedo,
            gbuffer_albedo_view,
            gbuffer_normal,
            gbuffer_normal_view,
            depth,
            depth_view,
            target_override: None,
            pipeline,
            uniform_buffer,
            uniform_bind_group,
        })
    }

    fn projection_matrix(width: u32, height: u32) -> Mat4 {
        Mat4::perspective_rh(60f32.to_radians(), width as f32 / height as f32, NEAR, FAR)
    }

    fn camera_matrix(time: f32) -> Mat4 {
        // Slow descending orbit around the origin; crosses the water surface
        // so both underwater branches get exercised.
        let angle = time * 0.2;
        let eye = Vec3::new(
            angle.cos() * 10.0,
            2.0 - (time * 0.15).sin() * 4.0,
            angle.sin() * 10.0,
        );
        Mat4::look_at_rh(eye, Vec3::new(0.0, -2.0, 0.0), Vec3::Y).inverse()
    }

    pub fn advance(&mut self, delta_seconds: f32) {
        self.time += delta_seconds;
    }

    pub fn set_fog(&mut self, enabled: bool) {
        self.fog_enabled = enabled;
    }

    pub fn oracle(&self) -> SceneOracle {
        let eye = Self::camera_matrix(self.time).w_axis.truncate();
        SceneOracle {
            underwater: eye.y < WATER_LEVEL,
        }
    }

    fn write_uniforms(&self, queue: &wgpu::Queue) {
        let uniforms = SceneUniforms {
            projection: Self::projection_matrix(self.width, self.height).to_cols_array_2d(),
            camera_to_world: Self::camera_matrix(self.time).to_cols_array_2d(),
            time: self.time,
            fog_enabled: if self.fog_enabled { 1.0 } else { 0.0 },
            water_level: WATER_LEVEL,
            _pad: 0.0,
        };
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));
    }

    fn encode_pass(&self, encoder: &mut wgpu::CommandEncoder, composite: &wgpu::TextureView) {
        let clear = |view| {
            Some(wgpu::RenderPassColorAttachment {
                view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })
        };
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("scene pass"),
            color_attachments: &[
                clear(composite),
                clear(&self.gbuffer_albedo_view),
                clear(&self.gbuffer_normal_view),
            ],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.uniform_bind_group, &[]);
        pass.draw(0..3, 0..1);
    }

    /// The engine's continuous per-frame render. Honors the capture core's
    /// target override when one is installed.
    pub fn render(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) {
        self.write_uniforms(queue);
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("scene frame"),
        });
        let composite: &wgpu::TextureView = match &self.target_override {
            Some(view) => view,
            None => &self.final_color_view,
        };
        self.encode_pass(&mut encoder, composite);
        queue.submit(std::iter::once(encoder.finish()));
    }
}

impl DeferredCamera for HarnessScene {
    fn pixel_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn projection(&self) -> Mat4 {
        Self::projection_matrix(self.width, self.height)
    }

    fn camera_to_world(&self) -> Mat4 {
        Self::camera_matrix(self.time)
    }

    fn final_color(&self) -> &wgpu::Texture {
        &self.final_color
    }

    fn gbuffer_albedo(&self) -> &wgpu::Texture {
        &self.gbuffer_albedo
    }

    fn gbuffer_normal(&self) -> &wgpu::Texture {
        &self.gbuffer_normal
    }

    fn depth(&self) -> &wgpu::Texture {
        &self.depth
    }

    fn set_target_override(&mut self, target: Option<Arc<wgpu::TextureView>>) {
        self.target_override = target;
    }

    fn render_once_into(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        target: &wgpu::TextureView,
    ) -> Result<()> {
        self.write_uniforms(queue);
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("scene forced composite"),
        });
        self.encode_pass(&mut encoder, target);
        queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }
}

impl PrimaryCameraProvider for HarnessScene {
    fn acquire(&mut self) -> Option<&mut dyn DeferredCamera> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orbit_crosses_water_surface() {
        let mut above = false;
        let mut below = false;
        for step in 0..600 {
            let eye = HarnessScene::camera_matrix(step as f32 * 0.1)
                .w_axis
                .truncate();
            if eye.y > WATER_LEVEL {
                above = true;
            } else {
                below = true;
            }
        }
        assert!(above && below, "orbit should straddle the water surface");
    }

    #[test]
    fn camera_matrix_is_rigid() {
        let m = HarnessScene::camera_matrix(3.2);
        let det = m.determinant();
        assert!((det.abs() - 1.0).abs() < 1e-4, "determinant was {det}");
    }
}
