use anyhow::bail;

pub const CHANNEL_COUNT: usize = 6;

/// Semantic tag of one off-screen channel buffer.
///
/// `MaterialId` and `Emission` are allocated alongside the active channels but
/// no command-list blit populates them; they are reserved extension slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Color,
    Depth,
    Normal,
    Albedo,
    MaterialId,
    Emission,
}

impl Channel {
    pub const ALL: [Channel; CHANNEL_COUNT] = [
        Channel::Color,
        Channel::Depth,
        Channel::Normal,
        Channel::Albedo,
        Channel::MaterialId,
        Channel::Emission,
    ];

    /// Channels the snapshot encoder persists, in write order.
    pub const ACTIVE: [Channel; 4] = [
        Channel::Color,
        Channel::Depth,
        Channel::Normal,
        Channel::Albedo,
    ];

    /// Filename suffix: `<timestamp>_<suffix>.<ext>`. The final composite is
    /// written as "base".
    pub fn suffix(self) -> &'static str {
        match self {
            Channel::Color => "base",
            Channel::Depth => "depth",
            Channel::Normal => "normal",
            Channel::Albedo => "albedo",
            Channel::MaterialId => "id",
            Channel::Emission => "emission",
        }
    }

    pub fn format(self) -> wgpu::TextureFormat {
        match self {
            Channel::Color | Channel::MaterialId | Channel::Emission => {
                wgpu::TextureFormat::Rgba8Unorm
            }
            Channel::Depth | Channel::Normal | Channel::Albedo => {
                wgpu::TextureFormat::Rgba32Float
            }
        }
    }
}

/// Output codec, parsed from the raw config string at snapshot time so that a
/// bad value fails the snapshot call rather than startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SavingFormat {
    Png,
    Jpg,
}

impl SavingFormat {
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(SavingFormat::Png),
            "jpg" | "jpeg" => Ok(SavingFormat::Jpg),
            other => bail!("unsupported saving format '{other}'; expected 'png' or 'jpg'"),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            SavingFormat::Png => "png",
            SavingFormat::Jpg => "jpg",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_channels_write_base_first() {
        let suffixes: Vec<_> = Channel::ACTIVE.iter().map(|c| c.suffix()).collect();
        assert_eq!(suffixes, ["base", "depth", "normal", "albedo"]);
    }

    #[test]
    fn reserved_channels_use_float_free_formats() {
        assert_eq!(
            Channel::MaterialId.format(),
            wgpu::TextureFormat::Rgba8Unorm
        );
        assert_eq!(Channel::Emission.format(), wgpu::TextureFormat::Rgba8Unorm);
        assert_eq!(Channel::Depth.format(), wgpu::TextureFormat::Rgba32Float);
    }

    #[test]
    fn parses_known_formats_case_insensitively() {
        assert_eq!(SavingFormat::parse("PNG").unwrap(), SavingFormat::Png);
        assert_eq!(SavingFormat::parse("jpeg").unwrap(), SavingFormat::Jpg);
        assert_eq!(SavingFormat::parse(" jpg ").unwrap(), SavingFormat::Jpg);
    }

    #[test]
    fn rejects_unknown_format() {
        let err = SavingFormat::parse("webp").unwrap_err();
        assert!(err.to_string().contains("webp"));
    }
}
