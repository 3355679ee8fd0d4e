//! Second-order (biquad) IIR sections for the tone-shaping chain.
//!
//! Contents
//! - `FilterKind`  : HighPass / LowPass tag; both kinds share one recurrence
//!                   and differ only in their coefficient formulas
//! - `BiquadStage` : a single −12 dB/octave section, Direct Form I, with
//!                   retained state so filtering continues across block edges
//! - `FilterChain` : HPF → LPF in series, one instance per audio channel
//!
//! Notes
//! - Coefficients follow the RBJ Audio EQ Cookbook. Q defaults to Butterworth
//!   (`BUTTERWORTH_Q` ≈ 0.707) for a maximally flat passband.
//! - `configure` caches its inputs and skips the trig recompute when cutoff,
//!   Q and sample rate are unchanged; a smoothed cutoff that is still moving
//!   recomputes every call, which is the intended modulation path.
//! - Out-of-range cutoffs are clamped into [`MIN_CUTOFF_HZ`, 0.49·sr] rather
//!   than fed to the trig functions; coefficients past Nyquist are unstable.

use crate::dsp::{fast_cos, fast_sin, kill_denormals, TAU};

/// Lowest permitted cutoff in Hz.
pub const MIN_CUTOFF_HZ: f32 = 20.0;

/// Highest permitted cutoff as a fraction of the sample rate.
pub const MAX_CUTOFF_FRACTION: f32 = 0.49;

/// Maximally flat (Butterworth) quality factor, 1/√2.
pub const BUTTERWORTH_Q: f32 = core::f32::consts::FRAC_1_SQRT_2;

/// Which response a stage produces.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FilterKind {
    HighPass,
    LowPass,
}

/// One biquad section with retained Direct Form I state.
#[derive(Copy, Clone, Debug)]
pub struct BiquadStage {
    kind: FilterKind,
    sr: f32,
    fc: f32,
    q: f32,
    // normalized coefficients (a0 folded in)
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    // state
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl BiquadStage {
    /// Create a stage of the given kind with cutoff `cut_hz`, quality `q`
    /// and sample rate `sr`.
    #[inline]
    pub fn new(kind: FilterKind, cut_hz: f32, q: f32, sr: f32) -> Self {
        let mut s = Self {
            kind,
            sr: sr.max(1.0),
            fc: cut_hz,
            q: q.max(1.0e-2),
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        };
        s.recalc();
        s
    }

    /// Recompute coefficients for a new (cutoff, Q, sample rate) triple.
    /// A triple identical to the current one is a no-op.
    #[inline]
    pub fn configure(&mut self, cut_hz: f32, q: f32, sr: f32) {
        if cut_hz == self.fc && q == self.q && sr == self.sr {
            return;
        }
        self.fc = cut_hz;
        self.q = q.max(1.0e-2);
        self.sr = sr.max(1.0);
        self.recalc();
    }

    /// Cutoff-only reconfigure with the current Q and sample rate.
    #[inline]
    pub fn set_cutoff_hz(&mut self, cut_hz: f32) {
        let (q, sr) = (self.q, self.sr);
        self.configure(cut_hz, q, sr);
    }

    #[inline]
    fn recalc(&mut self) {
        // Clamp the cutoff into the representable band before any trig.
        let hi = (MAX_CUTOFF_FRACTION * self.sr).max(MIN_CUTOFF_HZ);
        let fc = self.fc.clamp(MIN_CUTOFF_HZ, hi);

        let omega = TAU * fc / self.sr;
        let sn = fast_sin(omega);
        let cs = fast_cos(omega);
        let alpha = sn / (2.0 * self.q);

        // RBJ cookbook; a0 normalized away.
        let (b0, b1, b2) = match self.kind {
            FilterKind::LowPass => {
                let k = (1.0 - cs) * 0.5;
                (k, 1.0 - cs, k)
            }
            FilterKind::HighPass => {
                let k = (1.0 + cs) * 0.5;
                (k, -(1.0 + cs), k)
            }
        };
        let a0 = 1.0 + alpha;
        let inv_a0 = 1.0 / a0;

        self.b0 = b0 * inv_a0;
        self.b1 = b1 * inv_a0;
        self.b2 = b2 * inv_a0;
        self.a1 = -2.0 * cs * inv_a0;
        self.a2 = (1.0 - alpha) * inv_a0;
    }

    /// Process one sample.
    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        let y = self.b0 * x + self.b1 * self.x1 + self.b2 * self.x2
            - self.a1 * self.y1
            - self.a2 * self.y2;
        let y = kill_denormals(y);
        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }

    /// Filter a slice in place, advancing the state by `samples.len()`.
    #[inline]
    pub fn process_in_place(&mut self, samples: &mut [f32]) {
        for s in samples.iter_mut() {
            *s = self.process(*s);
        }
    }

    /// Zero the section's memory (not its coefficients).
    #[inline]
    pub fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }

    #[inline] pub fn kind(&self) -> FilterKind { self.kind }
    #[inline] pub fn cutoff_hz(&self) -> f32 { self.fc }
    #[inline] pub fn sample_rate(&self) -> f32 { self.sr }
}

/// HPF → LPF in series. One chain per audio channel; each channel keeps its
/// own section state so stereo content is filtered independently.
#[derive(Copy, Clone, Debug)]
pub struct FilterChain {
    hpf: BiquadStage,
    lpf: BiquadStage,
}

impl FilterChain {
    #[inline]
    pub fn new(hpf_hz: f32, lpf_hz: f32, q: f32, sr: f32) -> Self {
        Self {
            hpf: BiquadStage::new(FilterKind::HighPass, hpf_hz, q, sr),
            lpf: BiquadStage::new(FilterKind::LowPass, lpf_hz, q, sr),
        }
    }

    /// Retarget both cutoffs (fixed Q, fixed sample rate). Unchanged values
    /// skip the recompute via the stage cache.
    #[inline]
    pub fn set_cutoffs(&mut self, hpf_hz: f32, lpf_hz: f32) {
        self.hpf.set_cutoff_hz(hpf_hz);
        self.lpf.set_cutoff_hz(lpf_hz);
    }

    /// Run the chain over a channel's samples in place.
    #[inline]
    pub fn process_in_place(&mut self, samples: &mut [f32]) {
        self.hpf.process_in_place(samples);
        self.lpf.process_in_place(samples);
    }

    /// Zero both sections' memory.
    #[inline]
    pub fn reset(&mut self) {
        self.hpf.reset();
        self.lpf.reset();
    }

    #[inline] pub fn hpf(&self) -> &BiquadStage { &self.hpf }
    #[inline] pub fn lpf(&self) -> &BiquadStage { &self.lpf }
}

// ------------------------------------ Tests --------------------------------------
