//! Multi-channel G-buffer capture for offline dataset generation.
//!
//! The core taps a deferred-rendering engine's per-frame G-buffer through a
//! secondary camera rig, converts the raw channels into off-screen buffers
//! with a per-frame command list, and periodically persists aligned image
//! sets (base/depth/normal/albedo) to disk under a shared timestamp.

pub mod engine;
mod fog;
mod gpu;
mod rig;
mod session;
mod snapshot;
pub mod types;
mod water;

pub use fog::{FogOverride, FogTarget};
pub use gpu::{ChannelTargets, CommandList, DepthReconstructUniforms, GpuContext};
pub use rig::{CaptureRig, RigCamera};
pub use session::CaptureController;
pub use snapshot::{count_existing_captures, snapshot_paths, timestamp_key};
pub use types::{Channel, SavingFormat, CHANNEL_COUNT};
pub use water::UnderwaterDepthAdjuster;
