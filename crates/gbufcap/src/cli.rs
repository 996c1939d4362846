use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "gbufcap",
    author,
    version,
    about = "Headless G-buffer capture harness",
    arg_required_else_help = false
)]
pub struct Cli {
    /// Capture configuration TOML; defaults apply when omitted.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory snapshot image sets are written to (created if absent).
    #[arg(long, value_name = "DIR", default_value = "captures")]
    pub captures_dir: PathBuf,

    /// Primary camera resolution as WIDTHxHEIGHT.
    #[arg(long, value_name = "WxH", default_value = "1280x720", value_parser = parse_size)]
    pub camera_size: (u32, u32),

    /// Simulated wall-clock duration of the run, in seconds.
    #[arg(long, value_name = "SECONDS", default_value_t = 5.0)]
    pub duration: f32,

    /// Simulated frame rate driving the per-frame tick.
    #[arg(long, value_name = "FPS", default_value_t = 60.0)]
    pub fps: f32,

    /// Disable fog from the start instead of toggling it mid-run.
    #[arg(long)]
    pub no_fog: bool,

    /// Simulated time at which fog is toggled once, in seconds.
    #[arg(long, value_name = "SECONDS")]
    pub toggle_fog_at: Option<f32>,

    /// Skip arming; useful to verify the disarmed pipeline stays inert.
    #[arg(long)]
    pub no_arm: bool,
}

fn parse_size(raw: &str) -> Result<(u32, u32), String> {
    let (w, h) = raw
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{raw}'"))?;
    let width: u32 = w.parse().map_err(|_| format!("invalid width '{w}'"))?;
    let height: u32 = h.parse().map_err(|_| format!("invalid height '{h}'"))?;
    if width == 0 || height == 0 {
        return Err("camera size must be non-zero in both dimensions".into());
    }
    Ok((width, height))
}

pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_camera_size() {
        assert_eq!(parse_size("1920x1080").unwrap(), (1920, 1080));
        assert_eq!(parse_size("640X360").unwrap(), (640, 360));
        assert!(parse_size("1920").is_err());
        assert!(parse_size("0x720").is_err());
    }
}
