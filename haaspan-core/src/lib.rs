#![cfg_attr(not(feature = "std"), no_std)]
//! Haaspan Core — no_std-ready DSP primitives for the stereo panner-delay.
//!
//! Features
//! - `std`      : (default) use the Rust standard library
//! - `no-std`   : build with `#![no_std]` and use `libm`/`micromath` math backends
//! - `fast-math`: enable polynomial approximations for the trig in coefficient updates
//!
//! Modules
//! - [`dsp`]    : math backend, constants, db/lin conversion, denormal kill
//! - [`smooth`] : fixed-coefficient control smoothing (anti-zipper)
//! - [`biquad`] : RBJ second-order HPF/LPF sections and the per-channel chain
//!
//! Design
//! - No heap allocations; pure sample-by-sample stateful primitives
//! - Filter state is retained across calls so blocks splice seamlessly
//! - Friendly to embedded / real-time targets

pub mod biquad;
pub mod dsp;
pub mod smooth;

/// Commonly used types/functions for convenience:
pub mod prelude {
    pub use crate::biquad::{
        BiquadStage, FilterChain, FilterKind, BUTTERWORTH_Q, MAX_CUTOFF_FRACTION, MIN_CUTOFF_HZ,
    };
    pub use crate::dsp::{db_to_lin, kill_denormals, lerp, lin_to_db, TAU};
    pub use crate::smooth::{smooth_toward, ParamSmoother, DEFAULT_SMOOTH_COEFF};
}
