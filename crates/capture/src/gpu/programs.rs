use anyhow::{anyhow, Result};

use crate::engine::ShaderLibrary;
use crate::types::Channel;

pub(crate) const PROGRAM_DEPTH: &str = "DepthPost";
pub(crate) const PROGRAM_GENERIC: &str = "NormalPost";
pub(crate) const PROGRAM_EMISSION: &str = "EmissionMap";
pub(crate) const PROGRAM_MATERIAL_ID: &str = "MaterialID";

const FULLSCREEN_VERTEX: &str = include_str!("../../shaders/fullscreen.wgsl");

/// Bind group layouts shared by every post program: group 0 carries the
/// depth-reconstruction uniforms, group 1 the per-blit source texture, the
/// sampler, and the engine depth texture.
pub(crate) struct ProgramLayouts {
    pub uniform_layout: wgpu::BindGroupLayout,
    pub blit_layout: wgpu::BindGroupLayout,
    pub pipeline_layout: wgpu::PipelineLayout,
    pub vertex_module: wgpu::ShaderModule,
    pub sampler: wgpu::Sampler,
}

impl ProgramLayouts {
    fn new(device: &wgpu::Device) -> Self {
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("post uniform layout"),
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

        let blit_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("post blit layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Depth,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("post pipeline layout"),
            bind_group_layouts: &[&uniform_layout, &blit_layout],
            push_constant_ranges: &[],
        });

        let vertex_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("fullscreen vertex"),
            source: wgpu::ShaderSource::Wgsl(FULLSCREEN_VERTEX.into()),
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            uniform_layout,
            blit_layout,
            pipeline_layout,
            vertex_module,
            sampler,
        }
    }
}

pub(crate) struct PostProgram {
    pub pipeline: wgpu::RenderPipeline,
    pub key: &'static str,
}

/// The four resolved post-process programs plus the shared layouts.
///
/// Cached across disarm/arm cycles alongside the channel buffers. The
/// emission and material-id pipelines are compiled so a missing program still
/// aborts the arm, but no blit references them.
pub(crate) struct PostPrograms {
    pub layouts: ProgramLayouts,
    pub depth: PostProgram,
    pub generic: PostProgram,
    pub _emission: PostProgram,
    pub _material_id: PostProgram,
}

impl PostPrograms {
    /// Looks up all four programs by logical key and builds their pipelines.
    /// Any unresolved key is fatal for the arm attempt; partially built state
    /// is dropped with this function's locals.
    pub fn resolve(device: &wgpu::Device, library: &dyn ShaderLibrary) -> Result<Self> {
        let layouts = ProgramLayouts::new(device);

        let depth = build_program(device, &layouts, library, PROGRAM_DEPTH, Channel::Depth)?;
        let generic = build_program(device, &layouts, library, PROGRAM_GENERIC, Channel::Normal)?;
        let emission =
            build_program(device, &layouts, library, PROGRAM_EMISSION, Channel::Emission)?;
        let material_id =
            build_program(device, &layouts, library, PROGRAM_MATERIAL_ID, Channel::MaterialId)?;

        tracing::debug!(
            programs = ?[depth.key, generic.key, emission.key, material_id.key],
            "post-process programs resolved"
        );

        Ok(Self {
            layouts,
            depth,
            generic,
            _emission: emission,
            _material_id: material_id,
        })
    }
}

fn build_program(
    device: &wgpu::Device,
    layouts: &ProgramLayouts,
    library: &dyn ShaderLibrary,
    key: &'static str,
    destination: Channel,
) -> Result<PostProgram> {
    let source = library
        .resolve(key)
        .ok_or_else(|| anyhow!("post-process program '{key}' is missing from the shader library"))?;

    let fragment_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(key),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });

    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(key),
        layout: Some(&layouts.pipeline_layout),
        vertex: wgpu::VertexState {
            module: &layouts.vertex_module,
            entry_point: Some("vs_main"),
            buffers: &[],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        fragment: Some(wgpu::FragmentState {
            module: &fragment_module,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: destination.format(),
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview: None,
        cache: None,
    });

    Ok(PostProgram { pipeline, key })
}
