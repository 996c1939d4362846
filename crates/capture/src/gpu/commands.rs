use std::sync::Arc;

use crate::engine::DeferredCamera;
use crate::types::Channel;

use super::programs::PostPrograms;
use super::targets::ChannelTargets;
use super::uniforms::DepthReconstructUniforms;

struct BlitCommand {
    label: &'static str,
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    target: Arc<wgpu::TextureView>,
}

/// The ordered per-frame blit batch attached to the rig camera.
///
/// Rebuilt on every arm; the source views it binds are fixed for the lifetime
/// of the session. Executes after all other rendering for the frame, so each
/// blit reads G-buffer channels the primary pass has already populated.
pub struct CommandList {
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    blits: Vec<BlitCommand>,
}

impl CommandList {
    pub(crate) fn build(
        device: &wgpu::Device,
        programs: &PostPrograms,
        camera: &dyn DeferredCamera,
        targets: &ChannelTargets,
    ) -> Self {
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("depth reconstruction uniforms"),
            size: std::mem::size_of::<DepthReconstructUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("depth reconstruction bind group"),
            layout: &programs.layouts.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let depth_view = camera
            .depth()
            .create_view(&wgpu::TextureViewDescriptor::default());
        let final_color_view = camera
            .final_color()
            .create_view(&wgpu::TextureViewDescriptor::default());
        let gbuffer_normal_view = camera
            .gbuffer_normal()
            .create_view(&wgpu::TextureViewDescriptor::default());
        let gbuffer_albedo_view = camera
            .gbuffer_albedo()
            .create_view(&wgpu::TextureViewDescriptor::default());

        let make_bind_group = |label: &str, source: &wgpu::TextureView| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &programs.layouts.blit_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(source),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&programs.layouts.sampler),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::TextureView(&depth_view),
                    },
                ],
            })
        };

        // Depth reconstruction from the final color target first, then the
        // two G-buffer channels through the generic post program. The
        // material-id and emission targets are allocated but intentionally
        // have no draw commands.
        let blits = vec![
            BlitCommand {
                label: "blit depth",
                pipeline: programs.depth.pipeline.clone(),
                bind_group: make_bind_group("blit depth sources", &final_color_view),
                target: Arc::clone(&targets.get(Channel::Depth).view),
            },
            BlitCommand {
                label: "blit normal",
                pipeline: programs.generic.pipeline.clone(),
                bind_group: make_bind_group("blit normal sources", &gbuffer_normal_view),
                target: Arc::clone(&targets.get(Channel::Normal).view),
            },
            BlitCommand {
                label: "blit albedo",
                pipeline: programs.generic.pipeline.clone(),
                bind_group: make_bind_group("blit albedo sources", &gbuffer_albedo_view),
                target: Arc::clone(&targets.get(Channel::Albedo).view),
            },
        ];

        Self {
            uniform_buffer,
            uniform_bind_group,
            blits,
        }
    }

    /// Pushes the per-frame depth-reconstruction uniforms. Must run once per
    /// frame while armed, before [`CommandList::execute`].
    pub fn set_uniforms(&self, queue: &wgpu::Queue, uniforms: &DepthReconstructUniforms) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniforms));
    }

    /// Encodes one render pass per blit onto the rig camera's encoder.
    pub fn execute(&self, encoder: &mut wgpu::CommandEncoder) {
        for blit in &self.blits {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(blit.label),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &blit.target,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            pass.set_pipeline(&blit.pipeline);
            pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            pass.set_bind_group(1, &blit.bind_group, &[]);
            pass.draw(0..3, 0..1);
        }
    }

    pub fn blit_count(&self) -> usize {
        self.blits.len()
    }
}
