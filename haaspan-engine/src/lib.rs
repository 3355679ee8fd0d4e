//! Haaspan Engine — the stereo panner-delay effect around the core primitives.
//!
//! Crate layout:
//! - [`params`] : lock-free control store shared between the UI/automation
//!                thread and the audio thread
//! - [`delay`]  : bipolar control→samples mapping and the circular delay bank
//! - [`engine`] : the `Engine` lifecycle (`prepare`/`process_block`/`release`)
//!
//! The engine deliberately avoids heap allocations and locks in the audio
//! path: storage is sized at `prepare` time, parameters are relaxed atomic
//! loads, and every per-sample loop is bounded by the block length.

pub mod delay;
pub mod engine;
pub mod params;

// Re-export some commonly used items to make downstream imports ergonomic.
pub use delay::{channel_delay_samples, DelayBank, CHANNEL_LEFT, CHANNEL_RIGHT, DELAY_CONTROL_RANGE};
pub use engine::{Engine, EngineError, DEFAULT_MAX_DELAY_MS, MAX_SUPPORTED_CHANNELS};
pub use params::{ParamSnapshot, ParamStore};
