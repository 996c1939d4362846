//! Secondary-camera rig hosting the capture command list.

use glam::Mat4;

use crate::engine::DeferredCamera;
use crate::gpu::programs::PostPrograms;
use crate::gpu::{ChannelTargets, CommandList};

/// The live rig: a camera cloned from the primary, ordered to render after
/// the primary pass, carrying the attached command list. Exists only while
/// armed; dropped wholesale on disarm.
pub struct RigCamera {
    command_list: CommandList,
    camera_to_world: Mat4,
    projection: Mat4,
}

impl RigCamera {
    /// Re-clones the primary camera's pose each frame so the rig observes the
    /// scene from the identical viewpoint.
    pub fn track(&mut self, camera: &dyn DeferredCamera) {
        self.camera_to_world = camera.camera_to_world();
        self.projection = camera.projection();
    }

    pub fn command_list(&self) -> &CommandList {
        &self.command_list
    }

    pub fn camera_to_world(&self) -> Mat4 {
        self.camera_to_world
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }
}

pub struct CaptureRig;

impl CaptureRig {
    /// Builds the rig camera and attaches a freshly built command list.
    /// The caller has already verified the primary camera exists and that all
    /// post programs resolved; this step cannot fail.
    pub(crate) fn arm(
        device: &wgpu::Device,
        programs: &PostPrograms,
        targets: &ChannelTargets,
        camera: &dyn DeferredCamera,
    ) -> RigCamera {
        let command_list = CommandList::build(device, programs, camera, targets);
        tracing::info!(
            blits = command_list.blit_count(),
            "rig camera armed with capture command list"
        );
        RigCamera {
            command_list,
            camera_to_world: camera.camera_to_world(),
            projection: camera.projection(),
        }
    }

    /// Tears the rig down: detaches the command list, destroys the rig
    /// camera, and restores the primary camera's original render target.
    /// Safe to call when already disarmed.
    pub(crate) fn disarm(rig: &mut Option<RigCamera>, camera: Option<&mut dyn DeferredCamera>) {
        if let Some(camera) = camera {
            camera.set_target_override(None);
        }
        if rig.take().is_some() {
            tracing::info!("rig camera disarmed");
        }
    }
}
