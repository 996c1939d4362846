//! Water-plane compensation for the depth-reconstruction feed.
//!
//! The reconstruction shader estimates world positions from the depth buffer
//! and breaks down around the water surface when the camera moves vertically
//! fast; biasing the estimate toward the side of the water plane the camera
//! occupies suppresses the artifact. The sign flip is the whole mechanism.

use capconfig::CaptureConfig;
use glam::Mat4;

use crate::engine::EnvironmentOracle;
use crate::gpu::DepthReconstructUniforms;

pub struct UnderwaterDepthAdjuster;

impl UnderwaterDepthAdjuster {
    /// `+tolerance` when the camera is underwater, `-tolerance` above water.
    pub fn signed_bias(is_underwater: bool, tolerance: f32) -> f32 {
        if is_underwater {
            tolerance
        } else {
            -tolerance
        }
    }

    /// Assembles the per-frame uniform feed for the command list from the rig
    /// camera's mirrored pose. Called once per frame while armed, before the
    /// rig camera renders.
    pub fn frame_uniforms(
        projection: Mat4,
        camera_to_world: Mat4,
        oracle: &dyn EnvironmentOracle,
        config: &CaptureConfig,
    ) -> DepthReconstructUniforms {
        let bias = Self::signed_bias(oracle.is_underwater(), config.water_level_tolerance);
        DepthReconstructUniforms::new(
            projection,
            camera_to_world,
            config.max_render_distance_underwater,
            bias,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bias_flips_sign_at_the_water_boundary() {
        assert_eq!(UnderwaterDepthAdjuster::signed_bias(true, 100.0), 100.0);
        assert_eq!(UnderwaterDepthAdjuster::signed_bias(false, 100.0), -100.0);
    }

    #[test]
    fn zero_tolerance_is_neutral_on_both_sides() {
        assert_eq!(UnderwaterDepthAdjuster::signed_bias(true, 0.0), 0.0);
        assert_eq!(UnderwaterDepthAdjuster::signed_bias(false, 0.0), -0.0);
    }

    struct Submerged(bool);

    impl EnvironmentOracle for Submerged {
        fn is_underwater(&self) -> bool {
            self.0
        }
    }

    #[test]
    fn frame_uniforms_carry_the_pose_and_signed_bias() {
        let proj = Mat4::perspective_rh(1.0, 16.0 / 9.0, 0.1, 500.0);
        let pose = Mat4::from_translation(glam::Vec3::new(3.0, -8.0, 1.0));
        let config = CaptureConfig::default();

        let below =
            UnderwaterDepthAdjuster::frame_uniforms(proj, pose, &Submerged(true), &config);
        assert_eq!(below.projection, proj.to_cols_array_2d());
        assert_eq!(below.camera_to_world, pose.to_cols_array_2d());
        assert_eq!(below.depth_cutoff, config.max_render_distance_underwater);
        assert_eq!(below.water_level, config.water_level_tolerance);

        let above =
            UnderwaterDepthAdjuster::frame_uniforms(proj, pose, &Submerged(false), &config);
        assert_eq!(above.water_level, -config.water_level_tolerance);
    }
}
