use anyhow::{anyhow, bail, ensure, Context, Result};

/// Align to WebGPU's copy row alignment (256 bytes).
fn align_bytes_per_row(value: usize) -> usize {
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT as usize;
    ((value + align - 1) / align) * align
}

/// Synchronously downloads a single-sample texture into a tight CPU buffer,
/// stripping the row padding WebGPU requires for texture-to-buffer copies.
pub(crate) fn read_texture_tight(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    src: &wgpu::Texture,
    size: (u32, u32),
) -> Result<Vec<u8>> {
    let (width, height) = size;
    ensure!(width > 0 && height > 0, "readback size must be positive");

    let bytes_per_pixel = match src.format() {
        wgpu::TextureFormat::Rgba8Unorm | wgpu::TextureFormat::Rgba8UnormSrgb => 4,
        wgpu::TextureFormat::Rgba32Float => 16,
        other => bail!("readback does not support texture format {other:?}"),
    };

    let tight_bpr = bytes_per_pixel * width as usize;
    let padded_bpr = align_bytes_per_row(tight_bpr);
    let buffer_size = (padded_bpr * height as usize) as wgpu::BufferAddress;

    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("channel readback staging"),
        size: buffer_size,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("channel readback encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture: src,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &staging,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded_bpr as u32),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    queue.submit(std::iter::once(encoder.finish()));

    let slice = staging.slice(..);
    let (sender, receiver) = crossbeam_channel::bounded(1);
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });
    device
        .poll(wgpu::PollType::Wait)
        .context("failed to wait for readback copy")?;
    receiver
        .recv()
        .map_err(|_| anyhow!("readback map callback dropped before completing"))?
        .context("failed to map readback staging buffer")?;

    let data = slice.get_mapped_range();
    let mut tight = vec![0u8; tight_bpr * height as usize];
    for row in 0..height as usize {
        let src_offset = row * padded_bpr;
        let dst_offset = row * tight_bpr;
        tight[dst_offset..dst_offset + tight_bpr]
            .copy_from_slice(&data[src_offset..src_offset + tight_bpr]);
    }
    drop(data);
    staging.unmap();

    Ok(tight)
}

/// Tonemaps a tight RGBA32F buffer to RGBA8 by clamping each component to
/// [0, 1]. The wide-format channels go through 8-bit image encoders, so
/// anything outside the unit range saturates.
pub(crate) fn rgba32f_to_rgba8(data: &[u8]) -> Vec<u8> {
    let floats: &[f32] = bytemuck::cast_slice(data);
    floats
        .iter()
        .map(|&value| (value.clamp(0.0, 1.0) * 255.0).round() as u8)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_alignment_rounds_up_to_256() {
        assert_eq!(align_bytes_per_row(1), 256);
        assert_eq!(align_bytes_per_row(256), 256);
        assert_eq!(align_bytes_per_row(257), 512);
        // 960 px * 4 bytes is already aligned
        assert_eq!(align_bytes_per_row(3840), 3840);
    }

    #[test]
    fn float_tonemap_clamps_out_of_range() {
        let floats: [f32; 4] = [-0.5, 0.0, 0.5, 2.0];
        let bytes = rgba32f_to_rgba8(bytemuck::cast_slice(&floats));
        assert_eq!(bytes, [0, 0, 128, 255]);
    }
}
