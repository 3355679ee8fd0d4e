//! Lock-free control-parameter store.
//!
//! The four controls are written by a UI / automation thread and read by the
//! audio thread once per block. Each value lives in an `AtomicF32` (an
//! `AtomicU32` holding the f32 bit pattern), so both sides touch it with
//! plain relaxed loads/stores: no locks, no allocation, nothing the audio
//! thread can block on.
//!
//! Setters clamp into the declared control ranges; the engine can therefore
//! trust a [`ParamSnapshot`] without re-validating in the hot path. The
//! engine does its own smoothing — callers store raw targets only.

use core::sync::atomic::{AtomicU32, Ordering};

/// Bipolar delay-time control range. The magnitude maps to the delay length,
/// the sign picks the delayed channel (negative = left, positive = right).
pub const DELAY_TIME_RANGE: (f32, f32) = (-17.5, 17.5);

/// Dry/wet blend range.
pub const DRY_WET_RANGE: (f32, f32) = (0.0, 1.0);

/// Cutoff range shared by both filter controls, in Hz.
pub const CUTOFF_RANGE_HZ: (f32, f32) = (20.0, 20_000.0);

pub const DEFAULT_DELAY_TIME: f32 = 0.0;
pub const DEFAULT_DRY_WET: f32 = 0.5;
pub const DEFAULT_HPF_HZ: f32 = 440.0;
pub const DEFAULT_LPF_HZ: f32 = 5000.0;

/// f32 stored as its bit pattern in an `AtomicU32`.
#[derive(Debug)]
pub struct AtomicF32(AtomicU32);

impl AtomicF32 {
    #[inline]
    pub fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    #[inline]
    pub fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// The shared store. Wrap in an `Arc`: the control side keeps one handle and
/// calls the setters, the engine keeps another and snapshots once per block.
#[derive(Debug)]
pub struct ParamStore {
    delay_time: AtomicF32,
    dry_wet: AtomicF32,
    hpf_hz: AtomicF32,
    lpf_hz: AtomicF32,
}

/// Plain copy of all four raw targets, taken at block start.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ParamSnapshot {
    pub delay_time: f32,
    pub dry_wet: f32,
    pub hpf_hz: f32,
    pub lpf_hz: f32,
}

impl Default for ParamStore {
    fn default() -> Self {
        Self {
            delay_time: AtomicF32::new(DEFAULT_DELAY_TIME),
            dry_wet: AtomicF32::new(DEFAULT_DRY_WET),
            hpf_hz: AtomicF32::new(DEFAULT_HPF_HZ),
            lpf_hz: AtomicF32::new(DEFAULT_LPF_HZ),
        }
    }
}

impl ParamStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn set_delay_time(&self, v: f32) {
        self.delay_time.store(v.clamp(DELAY_TIME_RANGE.0, DELAY_TIME_RANGE.1));
    }

    #[inline]
    pub fn set_dry_wet(&self, v: f32) {
        self.dry_wet.store(v.clamp(DRY_WET_RANGE.0, DRY_WET_RANGE.1));
    }

    #[inline]
    pub fn set_hpf_hz(&self, v: f32) {
        self.hpf_hz.store(v.clamp(CUTOFF_RANGE_HZ.0, CUTOFF_RANGE_HZ.1));
    }

    #[inline]
    pub fn set_lpf_hz(&self, v: f32) {
        self.lpf_hz.store(v.clamp(CUTOFF_RANGE_HZ.0, CUTOFF_RANGE_HZ.1));
    }

    #[inline] pub fn delay_time(&self) -> f32 { self.delay_time.load() }
    #[inline] pub fn dry_wet(&self) -> f32 { self.dry_wet.load() }
    #[inline] pub fn hpf_hz(&self) -> f32 { self.hpf_hz.load() }
    #[inline] pub fn lpf_hz(&self) -> f32 { self.lpf_hz.load() }

    /// Read all four raw targets. Four relaxed loads; per-block consistency
    /// across parameters is not required, per-value tearing cannot happen.
    #[inline]
    pub fn snapshot(&self) -> ParamSnapshot {
        ParamSnapshot {
            delay_time: self.delay_time(),
            dry_wet: self.dry_wet(),
            hpf_hz: self.hpf_hz(),
            lpf_hz: self.lpf_hz(),
        }
    }
}

// ------------------------------------ Tests --------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn defaults_match_the_declared_constants() {
        let p = ParamStore::new();
        let s = p.snapshot();
        assert_eq!(s.delay_time, DEFAULT_DELAY_TIME);
        assert_eq!(s.dry_wet, DEFAULT_DRY_WET);
        assert_eq!(s.hpf_hz, DEFAULT_HPF_HZ);
        assert_eq!(s.lpf_hz, DEFAULT_LPF_HZ);
    }

    #[test]
    fn setters_clamp_to_range() {
        let p = ParamStore::new();
        p.set_delay_time(100.0);
        assert_eq!(p.delay_time(), DELAY_TIME_RANGE.1);
        p.set_delay_time(-100.0);
        assert_eq!(p.delay_time(), DELAY_TIME_RANGE.0);
        p.set_dry_wet(1.5);
        assert_eq!(p.dry_wet(), 1.0);
        p.set_hpf_hz(5.0);
        assert_eq!(p.hpf_hz(), CUTOFF_RANGE_HZ.0);
        p.set_lpf_hz(1.0e6);
        assert_eq!(p.lpf_hz(), CUTOFF_RANGE_HZ.1);
    }

    #[test]
    fn values_round_trip_exactly() {
        let p = ParamStore::new();
        p.set_delay_time(-8.75);
        assert_eq!(p.delay_time(), -8.75);
        p.set_hpf_hz(440.0);
        assert_eq!(p.hpf_hz(), 440.0);
    }

    #[test]
    fn store_is_shared_across_threads() {
        let p = Arc::new(ParamStore::new());
        let writer = {
            let p = Arc::clone(&p);
            std::thread::spawn(move || {
                for i in 0..1000 {
                    p.set_dry_wet(i as f32 / 1000.0);
                }
            })
        };
        // Reader just has to observe sane clamped values while the writer runs.
        for _ in 0..1000 {
            let v = p.dry_wet();
            assert!((0.0..=1.0).contains(&v), "v={}", v);
        }
        writer.join().unwrap();
    }
}
