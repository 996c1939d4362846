use bytemuck::{Pod, Zeroable};
use glam::Mat4;

/// Per-frame uniforms consumed by the depth-reconstruction program.
///
/// `water_level` carries the signed water-plane bias: positive below the
/// surface, negative above it. Layout is std140-compatible; the trailing pad
/// keeps the struct a multiple of 16 bytes.
#[repr(C, align(16))]
#[derive(Clone, Copy)]
pub struct DepthReconstructUniforms {
    pub projection: [[f32; 4]; 4],
    pub camera_to_world: [[f32; 4]; 4],
    pub depth_cutoff: f32,
    pub water_level: f32,
    pub _padding: [f32; 2],
}

unsafe impl Zeroable for DepthReconstructUniforms {}
unsafe impl Pod for DepthReconstructUniforms {}

impl DepthReconstructUniforms {
    pub fn new(projection: Mat4, camera_to_world: Mat4, depth_cutoff: f32, water_level: f32) -> Self {
        Self {
            projection: projection.to_cols_array_2d(),
            camera_to_world: camera_to_world.to_cols_array_2d(),
            depth_cutoff,
            water_level,
            _padding: [0.0; 2],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_tightly_sized() {
        // 2 mat4 + vec4 of scalars, no hidden padding beyond the declared one.
        assert_eq!(std::mem::size_of::<DepthReconstructUniforms>(), 144);
        assert_eq!(std::mem::align_of::<DepthReconstructUniforms>(), 16);
    }

    #[test]
    fn matrices_are_column_major() {
        let proj = Mat4::perspective_rh(1.0, 16.0 / 9.0, 0.1, 500.0);
        let uniforms = DepthReconstructUniforms::new(proj, Mat4::IDENTITY, 120.0, -100.0);
        assert_eq!(uniforms.projection, proj.to_cols_array_2d());
        assert_eq!(uniforms.camera_to_world[0][0], 1.0);
        assert_eq!(uniforms.water_level, -100.0);
    }
}
