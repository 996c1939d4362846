//! Snapshot-to-disk: readback, resample, encode, write.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use capconfig::CaptureConfig;
use chrono::Local;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::FilterType;
use image::{ExtendedColorType, ImageEncoder, RgbaImage};

use crate::engine::DeferredCamera;
use crate::gpu::readback::{read_texture_tight, rgba32f_to_rgba8};
use crate::gpu::ChannelTargets;
use crate::types::{Channel, SavingFormat};

/// Millisecond-resolution, lexicographically sortable key shared by every
/// file of one snapshot.
pub fn timestamp_key() -> String {
    Local::now().format("%Y-%m-%d_%H-%M-%S-%3f").to_string()
}

/// Derives the startup capture count by counting pre-existing base-channel
/// files in the capture directory. The total is recomputed, never persisted.
pub fn count_existing_captures(directory: &Path) -> u64 {
    let Ok(entries) = std::fs::read_dir(directory) else {
        return 0;
    };
    entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.contains("_base"))
        })
        .count() as u64
}

/// Takes one multi-channel snapshot: optionally forces a fog-free composite
/// into the color buffer, then resamples and encodes the four active channels
/// under a shared timestamp.
///
/// An unsupported codec is fatal for the call; individual file write failures
/// are logged and skipped so the scheduler keeps ticking.
pub(crate) fn snapshot(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    camera: &mut dyn DeferredCamera,
    targets: &ChannelTargets,
    config: &CaptureConfig,
    fog_enabled: bool,
    directory: &Path,
) -> Result<()> {
    // Late-bound codec check: a bad saving_format is a configuration defect
    // surfaced here, not at startup.
    let format = SavingFormat::parse(&config.saving_format)?;
    let key = timestamp_key();

    // With fog enabled the color buffer is not the camera's live target, so
    // force one synchronous composite into it; the continuous target is left
    // untouched. With fog disabled the redirect already keeps it populated.
    if fog_enabled {
        let color_view = targets.color_view();
        camera
            .render_once_into(device, queue, &color_view)
            .context("forced composite into the color buffer failed")?;
    }

    let (width, height) = targets.size();
    let mut written = 0usize;
    for channel in Channel::ACTIVE {
        let path = directory.join(format!("{key}_{}.{}", channel.suffix(), format.extension()));
        match write_channel(device, queue, targets, channel, width, height, config, format, &path) {
            Ok(()) => written += 1,
            Err(error) => {
                // Recoverable: keep capturing on subsequent frames.
                tracing::error!(
                    channel = channel.suffix(),
                    path = %path.display(),
                    error = %error,
                    "failed to write snapshot channel"
                );
            }
        }
    }

    tracing::info!(key = %key, written, "snapshot complete");
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn write_channel(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    targets: &ChannelTargets,
    channel: Channel,
    width: u32,
    height: u32,
    config: &CaptureConfig,
    format: SavingFormat,
    path: &Path,
) -> Result<()> {
    let target = targets.get(channel);
    let raw = read_texture_tight(device, queue, &target.texture, (width, height))?;
    let rgba8 = match target.texture.format() {
        wgpu::TextureFormat::Rgba32Float => rgba32f_to_rgba8(&raw),
        _ => raw,
    };

    let image = RgbaImage::from_raw(width, height, rgba8)
        .context("readback buffer did not match the channel resolution")?;
    let resampled = image::imageops::resize(
        &image,
        config.output_width,
        config.output_height,
        FilterType::Triangle,
    );

    encode_to_disk(&resampled, path, format, config.jpg_quality)
}

/// Encodes a tight RGBA8 image to disk with the selected codec.
pub(crate) fn encode_to_disk(
    image: &RgbaImage,
    path: &Path,
    format: SavingFormat,
    jpg_quality: u8,
) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create output file {}", path.display()))?;
    let writer = BufWriter::new(file);
    let (width, height) = image.dimensions();

    match format {
        SavingFormat::Png => {
            PngEncoder::new(writer)
                .write_image(image.as_raw(), width, height, ExtendedColorType::Rgba8)
                .with_context(|| format!("failed to encode PNG {}", path.display()))?;
        }
        SavingFormat::Jpg => {
            // JPEG has no alpha; drop it rather than let the encoder error.
            let rgb = image::DynamicImage::ImageRgba8(image.clone()).to_rgb8();
            JpegEncoder::new_with_quality(writer, jpg_quality)
                .write_image(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)
                .with_context(|| format!("failed to encode JPG {}", path.display()))?;
        }
    }

    Ok(())
}

/// Snapshot output paths for one timestamp key, in write order.
pub fn snapshot_paths(directory: &Path, key: &str, format: SavingFormat) -> Vec<PathBuf> {
    Channel::ACTIVE
        .iter()
        .map(|channel| directory.join(format!("{key}_{}.{}", channel.suffix(), format.extension())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_key_is_sortable_and_millisecond_precise() {
        let key = timestamp_key();
        // yyyy-mm-dd_hh-mm-ss-mmm
        assert_eq!(key.len(), "2026-08-30_12-00-00-000".len());
        let (date, time) = key.split_at(10);
        assert_eq!(date.matches('-').count(), 2);
        assert_eq!(time.matches('-').count(), 4);
    }

    #[test]
    fn counts_only_base_channel_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        for name in [
            "2026-01-01_00-00-00-000_base.jpg",
            "2026-01-01_00-00-00-000_depth.jpg",
            "2026-01-01_00-00-00-000_normal.jpg",
            "2026-01-01_00-00-01-000_base.png",
            "notes.txt",
        ] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        assert_eq!(count_existing_captures(dir.path()), 2);
    }

    #[test]
    fn missing_directory_counts_zero() {
        assert_eq!(count_existing_captures(Path::new("/definitely/not/here")), 0);
    }

    #[test]
    fn png_roundtrip_preserves_output_resolution() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("sample_base.png");
        let image = RgbaImage::from_pixel(8, 8, image::Rgba([10, 20, 30, 255]));
        let resampled = image::imageops::resize(&image, 4, 2, FilterType::Triangle);
        encode_to_disk(&resampled, &path, SavingFormat::Png, 95).expect("encode png");

        let decoded = image::open(&path).expect("decode png");
        assert_eq!(decoded.width(), 4);
        assert_eq!(decoded.height(), 2);
    }

    #[test]
    fn jpg_encoding_honours_quality_parameter() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut noisy = RgbaImage::new(64, 64);
        for (x, y, pixel) in noisy.enumerate_pixels_mut() {
            let v = ((x * 7 + y * 13) % 251) as u8;
            *pixel = image::Rgba([v, v.wrapping_mul(3), v.wrapping_add(91), 255]);
        }
        let low = dir.path().join("low.jpg");
        let high = dir.path().join("high.jpg");
        encode_to_disk(&noisy, &low, SavingFormat::Jpg, 10).expect("low quality");
        encode_to_disk(&noisy, &high, SavingFormat::Jpg, 95).expect("high quality");

        let low_len = std::fs::metadata(&low).unwrap().len();
        let high_len = std::fs::metadata(&high).unwrap().len();
        assert!(low_len < high_len, "q10 ({low_len}) should be smaller than q95 ({high_len})");
    }

    #[test]
    fn snapshot_paths_follow_the_naming_contract() {
        let paths = snapshot_paths(Path::new("captures"), "k", SavingFormat::Jpg);
        let names: Vec<_> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(
            names,
            ["k_base.jpg", "k_depth.jpg", "k_normal.jpg", "k_albedo.jpg"]
        );
    }
}
