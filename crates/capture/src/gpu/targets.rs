use std::sync::Arc;

use anyhow::{ensure, Result};

use crate::types::{Channel, CHANNEL_COUNT};

pub struct ChannelTarget {
    pub texture: wgpu::Texture,
    pub view: Arc<wgpu::TextureView>,
    pub channel: Channel,
}

/// The six named off-screen buffers of one capture session.
///
/// Allocated lazily on the first arm of the process and cached across
/// disarm/arm cycles; only the rig camera and command list are torn down per
/// cycle. Holding the GPU memory while disarmed is the accepted cost of
/// avoiding per-toggle reallocation.
pub struct ChannelTargets {
    width: u32,
    height: u32,
    targets: Vec<ChannelTarget>,
}

impl ChannelTargets {
    /// Allocates all six buffers at the primary camera's pixel resolution.
    pub fn allocate(device: &wgpu::Device, width: u32, height: u32) -> Result<Self> {
        ensure!(
            width > 0 && height > 0,
            "channel buffers need a non-zero resolution, got {width}x{height}"
        );

        let targets = Channel::ALL
            .iter()
            .map(|&channel| {
                // The color buffer doubles as a redirect target for the
                // primary camera and is resampled for the forced composite,
                // so it also needs TEXTURE_BINDING.
                let mut usage = wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC;
                if channel == Channel::Color {
                    usage |= wgpu::TextureUsages::TEXTURE_BINDING;
                }
                let texture = device.create_texture(&wgpu::TextureDescriptor {
                    label: Some(&format!("channel buffer '{}'", channel.suffix())),
                    size: wgpu::Extent3d {
                        width,
                        height,
                        depth_or_array_layers: 1,
                    },
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D2,
                    format: channel.format(),
                    usage,
                    view_formats: &[],
                });
                let view = Arc::new(texture.create_view(&wgpu::TextureViewDescriptor::default()));
                ChannelTarget {
                    texture,
                    view,
                    channel,
                }
            })
            .collect::<Vec<_>>();

        debug_assert_eq!(targets.len(), CHANNEL_COUNT);
        tracing::debug!(width, height, "allocated channel buffers");

        Ok(Self {
            width,
            height,
            targets,
        })
    }

    /// Reuses cached buffers when the resolution still matches; allocates on
    /// first use. A resolution change mid-process is out of scope and keeps
    /// the existing buffers.
    pub fn ensure(
        device: &wgpu::Device,
        existing: Option<ChannelTargets>,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        match existing {
            Some(targets) if targets.width == width && targets.height == height => Ok(targets),
            Some(targets) => {
                tracing::warn!(
                    have_width = targets.width,
                    have_height = targets.height,
                    want_width = width,
                    want_height = height,
                    "primary camera resolution changed; keeping original channel buffers"
                );
                Ok(targets)
            }
            None => Self::allocate(device, width, height),
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn get(&self, channel: Channel) -> &ChannelTarget {
        self.targets
            .iter()
            .find(|target| target.channel == channel)
            .expect("all channels allocated together")
    }

    pub fn color_view(&self) -> Arc<wgpu::TextureView> {
        Arc::clone(&self.get(Channel::Color).view)
    }
}
