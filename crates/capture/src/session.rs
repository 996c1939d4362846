//! The capture controller: the explicit context object owning configuration
//! and the scheduler, passed to subsystems instead of globally accessed.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use capconfig::CaptureConfig;
use capsched::{ArmRequest, CaptureScheduler, TickOutcome};

use crate::engine::{EnvironmentOracle, PrimaryCameraProvider, ShaderLibrary};
use crate::fog::{FogOverride, FogTarget};
use crate::gpu::programs::PostPrograms;
use crate::gpu::{ChannelTargets, GpuContext};
use crate::rig::{CaptureRig, RigCamera};
use crate::snapshot;
use crate::water::UnderwaterDepthAdjuster;

pub struct CaptureController {
    config: CaptureConfig,
    scheduler: CaptureScheduler,
    fog: FogOverride,
    fog_enabled: bool,
    capture_dir: PathBuf,
    // Buffers and compiled programs survive disarm/arm cycles; only `rig`
    // is torn down and recreated.
    targets: Option<ChannelTargets>,
    programs: Option<PostPrograms>,
    rig: Option<RigCamera>,
}

impl CaptureController {
    pub fn new(config: CaptureConfig, capture_dir: PathBuf) -> Result<Self> {
        config.validate().context("invalid capture configuration")?;
        let initial_total = snapshot::count_existing_captures(&capture_dir);
        if initial_total > 0 {
            tracing::info!(initial_total, "found existing captures");
        }
        let scheduler = CaptureScheduler::new(&config, initial_total)
            .context("failed to build capture scheduler")?;
        let fog_enabled = config.fog_enabled;
        Ok(Self {
            config,
            scheduler,
            fog: FogOverride::new(fog_enabled),
            fog_enabled,
            capture_dir,
            targets: None,
            programs: None,
            rig: None,
        })
    }

    pub fn is_armed(&self) -> bool {
        self.scheduler.is_armed()
    }

    pub fn is_capturing(&self) -> bool {
        self.scheduler.is_capturing()
    }

    pub fn total_captures(&self) -> u64 {
        self.scheduler.total_captures()
    }

    pub fn fog_enabled(&self) -> bool {
        self.fog_enabled
    }

    /// Arm/disarm toggle. Arming with no primary camera available is a
    /// benign no-op (expected during scene transitions); an unresolvable
    /// post program is an error and leaves the state disarmed.
    pub fn toggle_arm(
        &mut self,
        gpu: &GpuContext,
        provider: &mut dyn PrimaryCameraProvider,
        library: &dyn ShaderLibrary,
    ) -> Result<()> {
        match self.scheduler.toggle_arm() {
            ArmRequest::Disarm => {
                self.disarm(provider);
                Ok(())
            }
            ArmRequest::Arm => {
                let Some(camera) = provider.acquire() else {
                    tracing::debug!("no primary camera available; arm deferred");
                    return Ok(());
                };

                if self.programs.is_none() {
                    self.programs = Some(
                        PostPrograms::resolve(&gpu.device, library)
                            .context("failed to resolve post-process programs")?,
                    );
                }
                let programs = self.programs.as_ref().expect("resolved above");

                let (width, height) = camera.pixel_size();
                self.targets = Some(ChannelTargets::ensure(
                    &gpu.device,
                    self.targets.take(),
                    width,
                    height,
                )?);
                let targets = self.targets.as_ref().expect("ensured above");

                self.rig = Some(CaptureRig::arm(&gpu.device, programs, targets, camera));
                self.scheduler.confirm_arm();
                tracing::info!(width, height, "capture session armed");
                Ok(())
            }
        }
    }

    /// Disarm: tear down the rig and command list, restore the primary
    /// camera's render target, reset fog to enabled. Idempotent.
    pub fn disarm(&mut self, provider: &mut dyn PrimaryCameraProvider) {
        CaptureRig::disarm(&mut self.rig, provider.acquire());
        self.fog_enabled = true;
        self.scheduler.confirm_disarm();
    }

    /// Flips the capturing flag; no effect while disarmed.
    pub fn toggle_capture(&mut self) {
        let capturing = self.scheduler.toggle_capture();
        if self.scheduler.is_armed() {
            tracing::info!(capturing, "capture toggled");
        }
    }

    pub fn toggle_fog(&mut self) {
        self.fog_enabled = !self.fog_enabled;
        tracing::info!(fog_enabled = self.fog_enabled, "fog toggled");
    }

    /// One cooperative tick, called after the engine rendered the primary
    /// pass for this frame. Applies the fog redirect, feeds the depth
    /// reconstruction uniforms, executes the rig's command list, and takes a
    /// snapshot when the interval elapsed.
    pub fn frame(
        &mut self,
        gpu: &GpuContext,
        provider: &mut dyn PrimaryCameraProvider,
        oracle: &dyn EnvironmentOracle,
        delta: Duration,
    ) -> Result<()> {
        let armed = self.scheduler.is_armed();

        let Some(camera) = provider.acquire() else {
            if armed {
                // Primary camera disappeared mid-session (scene unload);
                // drop the rig rather than feed stale handles.
                tracing::warn!("primary camera lost while armed; disarming");
                CaptureRig::disarm(&mut self.rig, None);
                self.fog_enabled = true;
                self.scheduler.confirm_disarm();
            }
            // Latch side effect only; no camera to redirect.
            let _ = self.fog.apply(false, self.fog_enabled);
            return Ok(());
        };

        if let Some(redirect) = self.fog.apply(armed, self.fog_enabled) {
            let targets = self.targets.as_ref();
            match (redirect, targets) {
                (FogTarget::ColorBuffer, Some(targets)) => {
                    camera.set_target_override(Some(targets.color_view()));
                }
                _ => camera.set_target_override(None),
            }
        }

        if armed {
            let rig = self.rig.as_mut().expect("armed implies a live rig");
            rig.track(camera);
            let uniforms = UnderwaterDepthAdjuster::frame_uniforms(
                rig.projection(),
                rig.camera_to_world(),
                oracle,
                &self.config,
            );
            rig.command_list().set_uniforms(&gpu.queue, &uniforms);

            let mut encoder = gpu
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("rig camera pass"),
                });
            rig.command_list().execute(&mut encoder);
            gpu.queue.submit(std::iter::once(encoder.finish()));
        }

        if self.scheduler.tick(delta) == TickOutcome::SnapshotDue {
            let targets = self.targets.as_ref().expect("armed implies buffers");
            match snapshot::snapshot(
                &gpu.device,
                &gpu.queue,
                camera,
                targets,
                &self.config,
                self.fog_enabled,
                &self.capture_dir,
            ) {
                Ok(()) => {
                    self.scheduler.record_snapshot();
                    tracing::debug!(total = self.scheduler.total_captures(), "snapshot recorded");
                }
                Err(error) => {
                    // Codec misconfiguration or a failed forced composite;
                    // loud, but the session stays armed and capturing.
                    tracing::error!(error = %error, "snapshot failed");
                }
            }
        }

        Ok(())
    }

    /// Session invariant, readable by the overlay: armed implies exactly one
    /// live rig camera and command list, disarmed implies none.
    pub fn has_live_rig(&self) -> bool {
        self.rig.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{DeferredCamera, PrimaryCameraProvider};
    use std::path::Path;

    struct NoCamera;

    impl PrimaryCameraProvider for NoCamera {
        fn acquire(&mut self) -> Option<&mut dyn DeferredCamera> {
            None
        }
    }

    fn controller_in(dir: &Path) -> CaptureController {
        CaptureController::new(CaptureConfig::default(), dir.to_path_buf()).expect("controller")
    }

    #[test]
    fn fresh_controller_is_disarmed_with_no_rig() {
        let dir = tempfile::tempdir().expect("tempdir");
        let controller = controller_in(dir.path());
        assert!(!controller.is_armed());
        assert!(!controller.is_capturing());
        assert!(!controller.has_live_rig());
        assert_eq!(controller.total_captures(), 0);
    }

    #[test]
    fn capture_toggle_while_disarmed_is_a_noop() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut controller = controller_in(dir.path());
        controller.toggle_capture();
        assert!(!controller.is_capturing());
        assert!(!controller.has_live_rig());
    }

    #[test]
    fn disarm_while_disarmed_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut controller = controller_in(dir.path());
        controller.disarm(&mut NoCamera);
        controller.disarm(&mut NoCamera);
        assert!(!controller.is_armed());
        assert!(!controller.has_live_rig());
        assert!(controller.fog_enabled());
    }

    #[test]
    fn total_captures_seeds_from_existing_base_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        for name in [
            "2026-01-01_00-00-00-000_base.jpg",
            "2026-01-01_00-00-00-000_depth.jpg",
            "2026-01-01_00-00-01-000_base.jpg",
        ] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        let controller = controller_in(dir.path());
        assert_eq!(controller.total_captures(), 2);
    }

    #[test]
    fn fog_state_follows_the_config_and_toggle() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut controller = controller_in(dir.path());
        assert!(controller.fog_enabled());
        controller.toggle_fog();
        assert!(!controller.fog_enabled());

        let mut config = CaptureConfig::default();
        config.fog_enabled = false;
        let foggy_off = CaptureController::new(config, dir.path().to_path_buf()).expect("controller");
        assert!(!foggy_off.fog_enabled());
    }

    #[test]
    fn invalid_config_is_rejected_at_construction() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = CaptureConfig::default();
        config.output_width = 0;
        assert!(CaptureController::new(config, dir.path().to_path_buf()).is_err());
    }
}
