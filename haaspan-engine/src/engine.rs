//! The effect engine: prepare/release lifecycle and the per-block hot path.
//!
//! Lifecycle: `Unprepared → Prepared → Unprepared`. Only `Prepared` may
//! process audio; calling [`Engine::process_block`] earlier is reported as
//! [`EngineError::NotPrepared`], never silently ignored.
//!
//! Per block, in this order:
//! 1. snapshot the raw parameter targets (relaxed atomic loads),
//! 2. advance the four smoothers one step,
//! 3. retarget both filter sections with the smoothed cutoffs,
//! 4. filter every channel in place (HPF → LPF),
//! 5. map the smoothed delay control per channel and run the delay bank,
//! 6. advance the shared write cursor by the block length.
//!
//! Filtering runs before the delay on purpose: the wet tap stores the
//! filtered signal, and the dry path carries the same voicing, so moving the
//! tone controls never splits the two paths apart.
//!
//! All validation happens at the `prepare`/`process_block` boundary; the
//! per-sample loops do no error checks, no allocation and no locking. The
//! caller is responsible for serializing `prepare`/`release` against
//! `process_block` (they normally live on different threads).

use std::sync::Arc;

use haaspan_core::biquad::{FilterChain, BUTTERWORTH_Q};
use haaspan_core::smooth::ParamSmoother;
use thiserror::Error;

use crate::delay::{channel_delay_samples, DelayBank};
use crate::params::ParamStore;

/// The polarity rule of the delay mapper is defined for stereo only.
pub const MAX_SUPPORTED_CHANNELS: usize = 2;

/// Maximum delay time used by the stock configuration, in milliseconds.
pub const DEFAULT_MAX_DELAY_MS: f32 = 35.0;

/// Configuration and usage errors. Everything here is raised at a
/// boundary — nothing in the per-sample path can fail.
#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    #[error("process_block called before prepare")]
    NotPrepared,
    #[error("sample rate must be finite and > 0, got {0}")]
    InvalidSampleRate(f32),
    #[error("channel count must be at least 1")]
    NoChannels,
    #[error("unsupported channel count {0}: the delay polarity rule is stereo-only")]
    UnsupportedChannelCount(usize),
    #[error("maximum delay must be finite, > 0 and at least one sample, got {0} ms")]
    InvalidMaxDelay(f32),
    #[error("block has {got} channels, engine is prepared for {expected}")]
    ChannelCountMismatch { expected: usize, got: usize },
    #[error("channel {channel} has {got} samples, expected {expected}")]
    RaggedBlock { channel: usize, expected: usize, got: usize },
}

/// Everything that only exists while the engine is prepared.
#[derive(Clone, Debug)]
struct Prepared {
    sample_rate: f32,
    channels: usize,
    max_delay_ms: f32,
    smooth_delay: ParamSmoother,
    smooth_mix: ParamSmoother,
    smooth_hpf: ParamSmoother,
    smooth_lpf: ParamSmoother,
    chains: Vec<FilterChain>,
    delay: DelayBank,
}

#[derive(Clone, Debug)]
enum State {
    Unprepared,
    Prepared(Prepared),
}

/// The stereo panner-delay engine.
///
/// Owns its delay storage and filter state exclusively; the only shared
/// piece is the [`ParamStore`], which is read once per block.
#[derive(Debug)]
pub struct Engine {
    params: Arc<ParamStore>,
    state: State,
}

impl Engine {
    /// A new engine in the `Unprepared` state.
    pub fn new(params: Arc<ParamStore>) -> Self {
        Self {
            params,
            state: State::Unprepared,
        }
    }

    /// Handle to the shared parameter store.
    #[inline]
    pub fn params(&self) -> &Arc<ParamStore> {
        &self.params
    }

    #[inline]
    pub fn is_prepared(&self) -> bool {
        matches!(self.state, State::Prepared(_))
    }

    /// Validate the configuration and (re)build the processing state.
    ///
    /// Delay storage is reused when the channel count and ring capacity are
    /// unchanged; any other configuration gets fresh zeroed lanes and a
    /// rewound cursor. Filter state is rebuilt either way, and the smoothers
    /// snap to the current raw targets so the first blocks do not glide in
    /// from stale values.
    pub fn prepare(
        &mut self,
        sample_rate: f32,
        channels: usize,
        max_delay_ms: f32,
    ) -> Result<(), EngineError> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(EngineError::InvalidSampleRate(sample_rate));
        }
        if channels == 0 {
            return Err(EngineError::NoChannels);
        }
        if channels > MAX_SUPPORTED_CHANNELS {
            return Err(EngineError::UnsupportedChannelCount(channels));
        }
        if !max_delay_ms.is_finite() || max_delay_ms <= 0.0 {
            return Err(EngineError::InvalidMaxDelay(max_delay_ms));
        }
        let capacity = (sample_rate * max_delay_ms / 1000.0) as usize;
        if capacity == 0 {
            // Sub-sample maximum delay: the ring cannot hold anything.
            return Err(EngineError::InvalidMaxDelay(max_delay_ms));
        }

        let snap = self.params.snapshot();
        let delay = match std::mem::replace(&mut self.state, State::Unprepared) {
            State::Prepared(prev)
                if prev.delay.channels() == channels && prev.delay.capacity() == capacity =>
            {
                prev.delay
            }
            _ => DelayBank::new(channels, capacity),
        };

        let chain = FilterChain::new(snap.hpf_hz, snap.lpf_hz, BUTTERWORTH_Q, sample_rate);
        self.state = State::Prepared(Prepared {
            sample_rate,
            channels,
            max_delay_ms,
            smooth_delay: ParamSmoother::new(snap.delay_time),
            smooth_mix: ParamSmoother::new(snap.dry_wet),
            smooth_hpf: ParamSmoother::new(snap.hpf_hz),
            smooth_lpf: ParamSmoother::new(snap.lpf_hz),
            chains: vec![chain; channels],
            delay,
        });

        log::debug!(
            "prepared: sr={} Hz, channels={}, max_delay={} ms, capacity={} samples",
            sample_rate,
            channels,
            max_delay_ms,
            capacity
        );
        Ok(())
    }

    /// Drop delay and filter state. Safe to call repeatedly; the next
    /// `process_block` reports `NotPrepared`.
    pub fn release(&mut self) {
        if self.is_prepared() {
            log::debug!("released");
        }
        self.state = State::Unprepared;
    }

    /// Clear delay lanes and filter memory without changing configuration.
    /// A no-op while unprepared.
    pub fn reset(&mut self) {
        if let State::Prepared(p) = &mut self.state {
            p.delay.clear();
            for chain in &mut p.chains {
                chain.reset();
            }
        }
    }

    /// Process one block in place. `block` holds one sample slice per
    /// configured channel, all the same length; a zero-length block is a
    /// defined no-op that advances nothing.
    pub fn process_block(&mut self, block: &mut [&mut [f32]]) -> Result<(), EngineError> {
        let snap = self.params.snapshot();
        let p = match &mut self.state {
            State::Prepared(p) => p,
            State::Unprepared => return Err(EngineError::NotPrepared),
        };

        if block.len() != p.channels {
            return Err(EngineError::ChannelCountMismatch {
                expected: p.channels,
                got: block.len(),
            });
        }
        let frames = block[0].len();
        for (channel, lane) in block.iter().enumerate().skip(1) {
            if lane.len() != frames {
                return Err(EngineError::RaggedBlock {
                    channel,
                    expected: frames,
                    got: lane.len(),
                });
            }
        }
        if frames == 0 {
            return Ok(());
        }

        // This block's effective values: one smoothing step per block.
        let delay_value = p.smooth_delay.tick(snap.delay_time);
        let mix = p.smooth_mix.tick(snap.dry_wet);
        let hpf_hz = p.smooth_hpf.tick(snap.hpf_hz);
        let lpf_hz = p.smooth_lpf.tick(snap.lpf_hz);

        for (chain, lane) in p.chains.iter_mut().zip(block.iter_mut()) {
            chain.set_cutoffs(hpf_hz, lpf_hz);
            chain.process_in_place(lane);
        }

        // The |17.5| extreme maps to exactly `capacity`; keep the tap one
        // short so it never collides with the slot being written.
        let max_delay = p.delay.capacity() - 1;
        for (channel, lane) in block.iter_mut().enumerate() {
            let d = channel_delay_samples(channel, delay_value, p.max_delay_ms, p.sample_rate)
                .min(max_delay);
            p.delay.process_in_place(channel, lane, d, mix);
        }
        p.delay.advance(frames);
        Ok(())
    }
}

// ------------------------------------ Tests --------------------------------------
