//! Embedded WGSL post-process programs for the harness.

use capture::engine::ShaderLibrary;

const DEPTH_POST: &str = include_str!("../shaders/depth_post.wgsl");
const NORMAL_POST: &str = include_str!("../shaders/normal_post.wgsl");
const EMISSION_MAP: &str = include_str!("../shaders/emission_map.wgsl");
const MATERIAL_ID: &str = include_str!("../shaders/material_id.wgsl");

/// Shader library backed by sources compiled into the binary. A host engine
/// would normally load these from its asset bundle; the harness ships its
/// own copies.
#[derive(Debug, Default)]
pub struct WgslShaderLibrary;

impl ShaderLibrary for WgslShaderLibrary {
    fn resolve(&self, key: &str) -> Option<&str> {
        match key {
            "DepthPost" => Some(DEPTH_POST),
            "NormalPost" => Some(NORMAL_POST),
            "EmissionMap" => Some(EMISSION_MAP),
            "MaterialID" => Some(MATERIAL_ID),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_all_program_keys() {
        let library = WgslShaderLibrary;
        for key in ["DepthPost", "NormalPost", "EmissionMap", "MaterialID"] {
            let source = library.resolve(key).unwrap();
            assert!(source.contains("fs_main"), "{key} missing fragment entry");
        }
    }

    #[test]
    fn unknown_key_is_none() {
        assert!(WgslShaderLibrary.resolve("BloomPost").is_none());
    }
}
