pub(crate) mod commands;
pub(crate) mod context;
pub(crate) mod programs;
pub(crate) mod readback;
pub(crate) mod targets;
pub(crate) mod uniforms;

pub use commands::CommandList;
pub use context::GpuContext;
pub use targets::ChannelTargets;
pub use uniforms::DepthReconstructUniforms;
