use std::fs;
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use capconfig::CaptureConfig;
use capture::{CaptureController, GpuContext};
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::library::WgslShaderLibrary;
use crate::scene::HarnessScene;

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

pub fn run(cli: Cli) -> Result<()> {
    ensure!(cli.fps > 0.0, "--fps must be positive");
    ensure!(cli.duration >= 0.0, "--duration must not be negative");

    let mut config = match cli.config.as_deref() {
        Some(path) => CaptureConfig::load(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => CaptureConfig::default(),
    };
    if cli.no_fog {
        config.fog_enabled = false;
    }

    fs::create_dir_all(&cli.captures_dir).with_context(|| {
        format!(
            "failed to create captures directory {}",
            cli.captures_dir.display()
        )
    })?;

    let gpu = GpuContext::new().context("failed to initialise headless GPU context")?;
    tracing::info!(adapter = %gpu.adapter_name, "GPU context ready");

    let (width, height) = cli.camera_size;
    let mut scene = HarnessScene::new(&gpu.device, width, height, config.fog_enabled)
        .context("failed to build harness scene")?;
    let library = WgslShaderLibrary;

    let mut controller = CaptureController::new(config, cli.captures_dir.clone())
        .context("failed to build capture controller")?;
    let starting_total = controller.total_captures();

    if !cli.no_arm {
        controller
            .toggle_arm(&gpu, &mut scene, &library)
            .context("failed to arm capture session")?;
        controller.toggle_capture();
    }

    let frame_delta = Duration::from_secs_f32(1.0 / cli.fps);
    let frame_count = (cli.duration * cli.fps).ceil() as u64;
    let mut fog_toggled = false;

    tracing::info!(
        frames = frame_count,
        fps = cli.fps,
        duration_seconds = cli.duration,
        "starting simulated run"
    );

    for frame in 0..frame_count {
        let simulated_time = frame as f32 / cli.fps;
        if let Some(at) = cli.toggle_fog_at {
            if !fog_toggled && simulated_time >= at {
                controller.toggle_fog();
                scene.set_fog(controller.fog_enabled());
                fog_toggled = true;
            }
        }

        scene.advance(frame_delta.as_secs_f32());
        scene.render(&gpu.device, &gpu.queue);

        let oracle = scene.oracle();
        controller.frame(&gpu, &mut scene, &oracle, frame_delta)?;
    }

    if controller.is_armed() {
        controller.disarm(&mut scene);
    }

    let written = controller.total_captures() - starting_total;
    tracing::info!(
        snapshots = written,
        total = controller.total_captures(),
        directory = %cli.captures_dir.display(),
        "run complete"
    );
    Ok(())
}
