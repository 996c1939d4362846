//! Host-engine collaborators the capture core taps into.
//!
//! The core never owns the primary camera or its G-buffer; it reads them
//! through these traits and mutates rendering configuration only through the
//! render-target override capability.

use std::sync::Arc;

use anyhow::Result;
use glam::Mat4;

/// The live primary camera of a deferred-rendering scene.
///
/// The G-buffer accessors return the textures populated by the camera's own
/// lighting pass for the current frame; the rig camera's command list blits
/// from them after that pass has completed.
pub trait DeferredCamera {
    fn pixel_size(&self) -> (u32, u32);

    fn projection(&self) -> Mat4;

    fn camera_to_world(&self) -> Mat4;

    /// Final composite target the camera presents from.
    fn final_color(&self) -> &wgpu::Texture;

    /// Albedo + occlusion G-buffer channel.
    fn gbuffer_albedo(&self) -> &wgpu::Texture;

    /// Normal + smoothness G-buffer channel.
    fn gbuffer_normal(&self) -> &wgpu::Texture;

    /// Scene depth, populated for the rig camera by the engine.
    fn depth(&self) -> &wgpu::Texture;

    /// Render-target override capability. `Some` redirects the camera's
    /// continuous composite into the given view; `None` restores the target
    /// the engine configured at startup. Invoked only by the fog override and
    /// the snapshot encoder.
    fn set_target_override(&mut self, target: Option<Arc<wgpu::TextureView>>);

    /// One synchronous render of the camera into `target`, leaving the
    /// continuous target untouched. Used to force a composite into the color
    /// buffer for a single capture.
    fn render_once_into(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        target: &wgpu::TextureView,
    ) -> Result<()>;
}

/// Locates the live primary camera. Returns `None` during scene transitions,
/// in which case an arm attempt is a deferred no-op.
pub trait PrimaryCameraProvider {
    fn acquire(&mut self) -> Option<&mut dyn DeferredCamera>;
}

/// Per-frame underwater signal; consumed, never owned.
pub trait EnvironmentOracle {
    fn is_underwater(&self) -> bool;
}

/// Resolves named post-process programs to WGSL fragment source by logical
/// key. Owned outside the core; must be available at arm time.
pub trait ShaderLibrary {
    fn resolve(&self, key: &str) -> Option<&str>;
}
