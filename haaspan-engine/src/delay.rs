//! Panner-delay line: the bipolar control→samples mapping and the ring bank.
//!
//! Contents
//! - `channel_delay_samples` : pure mapping from the signed delay-time control
//!   to a per-channel delay length. The magnitude scales the delay, the sign
//!   picks the side: negative delays the left channel, positive the right,
//!   and the opposite channel always gets zero. This is what makes a single
//!   XY axis read as "the echo pans toward one side".
//! - `DelayBank` : per-channel circular storage with ONE write cursor shared
//!   by all channels. Channels are processed against the same starting
//!   cursor; the engine advances it once per block after every channel ran.
//!
//! Realtime rules
//! - Storage is allocated at `prepare` time only; `process_in_place` never
//!   allocates, never locks, and does bounded per-sample work.
//! - A zero delay is an exact pass-through for that channel, not a
//!   one-sample-stale read. The wet tap only exists when the delay is ≥ 1.

/// Full swing of the bipolar delay-time control (|value| at the extremes).
pub const DELAY_CONTROL_RANGE: f32 = 17.5;

/// Left channel index (delayed when the control is negative).
pub const CHANNEL_LEFT: usize = 0;

/// Right channel index (delayed when the control is positive).
pub const CHANNEL_RIGHT: usize = 1;

/// Map the signed control value to this channel's delay length in samples.
///
/// `scale = |value| / 17.5`, `ms = scale * max_delay_ms`,
/// `samples = floor(ms * sample_rate / 1000)`; the result applies to channel
/// 0 for negative values and channel 1 for positive values, zero otherwise.
/// Monotone in |value|; exactly 0 for every channel when `value == 0`.
///
/// Defined for channels 0 and 1 only; the engine rejects wider layouts at
/// `prepare`. A mono stream runs channel 0 with the same (left) rule.
#[inline]
pub fn channel_delay_samples(
    channel: usize,
    value: f32,
    max_delay_ms: f32,
    sample_rate: f32,
) -> usize {
    let delayed_side = (channel == CHANNEL_LEFT && value < 0.0)
        || (channel == CHANNEL_RIGHT && value > 0.0);
    if !delayed_side {
        return 0;
    }
    let scale = (value.abs() / DELAY_CONTROL_RANGE).min(1.0);
    let ms = scale * max_delay_ms;
    (ms * sample_rate / 1000.0) as usize
}

/// Fixed-capacity circular delay storage, one lane per channel, one shared
/// write cursor.
///
/// Capacity is fixed between configuration events; the cursor stays in
/// `[0, capacity)` and every read position is derived from it, so the bank
/// can run forever without drifting out of bounds.
#[derive(Clone, Debug)]
pub struct DelayBank {
    lanes: Vec<Vec<f32>>,
    write_pos: usize,
    capacity: usize,
}

impl DelayBank {
    /// Allocate `channels` lanes of `capacity` samples, zeroed, cursor at 0.
    /// Callers guarantee `channels >= 1` and `capacity >= 1`.
    pub fn new(channels: usize, capacity: usize) -> Self {
        debug_assert!(channels >= 1 && capacity >= 1);
        Self {
            lanes: vec![vec![0.0; capacity]; channels],
            write_pos: 0,
            capacity,
        }
    }

    #[inline] pub fn channels(&self) -> usize { self.lanes.len() }
    #[inline] pub fn capacity(&self) -> usize { self.capacity }
    #[inline] pub fn write_pos(&self) -> usize { self.write_pos }

    /// Zero all lanes and rewind the cursor.
    pub fn clear(&mut self) {
        for lane in &mut self.lanes {
            lane.fill(0.0);
        }
        self.write_pos = 0;
    }

    /// Run one channel's samples through the delay with a dry/wet blend.
    ///
    /// Per sample `i` (cursor `w = write_pos + i`, wrapped):
    /// 1. `read = (w + capacity - delay_samples) % capacity`
    /// 2. store the dry input at `w`
    /// 3. `wet = lane[read]`
    /// 4. output `dry * (1 - mix) + wet * mix`
    ///
    /// The blend keeps both endpoints exact: `mix == 0.0` reproduces the dry
    /// input bit-for-bit and `mix == 1.0` the stored wet tap.
    ///
    /// The shared cursor is NOT advanced here — every channel of the block
    /// must see the same starting cursor. Call [`advance`](Self::advance)
    /// once per block afterwards.
    ///
    /// `delay_samples == 0` returns immediately: the dry signal passes
    /// through untouched and the lane keeps its history.
    pub fn process_in_place(
        &mut self,
        channel: usize,
        samples: &mut [f32],
        delay_samples: usize,
        mix: f32,
    ) {
        if delay_samples == 0 {
            return;
        }
        debug_assert!(delay_samples < self.capacity, "delay must stay below capacity");
        let lane = &mut self.lanes[channel];
        let mut w = self.write_pos;
        for s in samples.iter_mut() {
            let read = (w + self.capacity - delay_samples) % self.capacity;
            let dry = *s;
            lane[w] = dry;
            let wet = lane[read];
            *s = dry * (1.0 - mix) + wet * mix;
            w += 1;
            if w >= self.capacity {
                w = 0;
            }
        }
    }

    /// Advance the shared cursor by one block of `frames` samples.
    #[inline]
    pub fn advance(&mut self, frames: usize) {
        self.write_pos = (self.write_pos + frames) % self.capacity;
    }
}

// ------------------------------------ Tests --------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 44_100.0;
    const MAX_MS: f32 = 35.0;

    #[test]
    fn mapper_is_bounded_and_monotone() {
        let cap = (MAX_MS * SR / 1000.0) as usize;
        let mut last = 0;
        for step in 0..=175 {
            let v = step as f32 * 0.1; // 0.0 ..= 17.5
            let d = channel_delay_samples(CHANNEL_RIGHT, v, MAX_MS, SR);
            assert!(d <= cap, "d={} cap={}", d, cap);
            assert!(d >= last, "not monotone at v={}", v);
            last = d;
        }
    }

    #[test]
    fn mapper_zero_control_means_zero_on_both_sides() {
        assert_eq!(channel_delay_samples(CHANNEL_LEFT, 0.0, MAX_MS, SR), 0);
        assert_eq!(channel_delay_samples(CHANNEL_RIGHT, 0.0, MAX_MS, SR), 0);
    }

    #[test]
    fn mapper_extremes_pick_exactly_one_side() {
        let max = (MAX_MS * SR / 1000.0) as usize;
        assert_eq!(channel_delay_samples(CHANNEL_LEFT, -17.5, MAX_MS, SR), max);
        assert_eq!(channel_delay_samples(CHANNEL_RIGHT, -17.5, MAX_MS, SR), 0);
        assert_eq!(channel_delay_samples(CHANNEL_LEFT, 17.5, MAX_MS, SR), 0);
        assert_eq!(channel_delay_samples(CHANNEL_RIGHT, 17.5, MAX_MS, SR), max);
    }

    #[test]
    fn mapper_half_magnitude_scenario() {
        // −8.75 at 44.1 kHz / 35 ms: left gets floor(0.5·35·44.1) = 771.
        assert_eq!(channel_delay_samples(CHANNEL_LEFT, -8.75, MAX_MS, SR), 771);
        assert_eq!(channel_delay_samples(CHANNEL_RIGHT, -8.75, MAX_MS, SR), 0);
    }

    #[test]
    fn dry_mix_is_identity_for_any_delay() {
        let mut bank = DelayBank::new(1, 64);
        for delay in [1, 7, 32, 63] {
            let mut buf: Vec<f32> = (0..48).map(|n| (n as f32 * 0.3).sin()).collect();
            let reference = buf.clone();
            bank.process_in_place(0, &mut buf, delay, 0.0);
            bank.advance(buf.len());
            assert_eq!(buf, reference, "delay={}", delay);
        }
    }

    #[test]
    fn zero_delay_is_exact_passthrough_even_fully_wet() {
        let mut bank = DelayBank::new(1, 64);
        let mut buf: Vec<f32> = (0..48).map(|n| (n as f32 * 0.3).cos()).collect();
        let reference = buf.clone();
        bank.process_in_place(0, &mut buf, 0, 1.0);
        bank.advance(buf.len());
        assert_eq!(buf, reference);
    }

    #[test]
    fn fully_wet_impulse_lands_delay_samples_later() {
        let d = 9;
        let mut bank = DelayBank::new(1, 32);
        let mut out = Vec::new();
        // Feed an impulse followed by silence across several blocks.
        for block in 0..8 {
            let mut buf = [0.0_f32; 8];
            if block == 0 {
                buf[0] = 1.0;
            }
            bank.process_in_place(0, &mut buf, d, 1.0);
            bank.advance(buf.len());
            out.extend_from_slice(&buf);
        }
        for (n, &y) in out.iter().enumerate() {
            let expect = if n == d { 1.0 } else { 0.0 };
            assert_eq!(y, expect, "n={}", n);
        }
    }

    #[test]
    fn shared_cursor_gives_every_channel_the_same_timeline() {
        let d = 5;
        let mut bank = DelayBank::new(2, 16);
        let mut left = [0.0_f32; 12];
        let mut right = [0.0_f32; 12];
        left[0] = 1.0;
        right[0] = -1.0;
        bank.process_in_place(0, &mut left, d, 1.0);
        bank.process_in_place(1, &mut right, d, 1.0);
        bank.advance(12);
        assert_eq!(left[d], 1.0);
        assert_eq!(right[d], -1.0);
    }

    #[test]
    fn cursor_wraps_modulo_capacity() {
        let cap = 13;
        let mut bank = DelayBank::new(1, cap);
        let mut total = 0usize;
        for frames in [4, 7, 13, 26, 5] {
            let mut buf = vec![0.25_f32; frames];
            bank.process_in_place(0, &mut buf, 3, 0.5);
            bank.advance(frames);
            total += frames;
            assert_eq!(bank.write_pos(), total % cap);
        }
    }

    #[test]
    fn long_feeds_stay_in_bounds_and_periodic() {
        // Blocks longer than capacity, repeated: nothing panics, and a
        // fully-wet constant input settles to that constant.
        let mut bank = DelayBank::new(1, 10);
        for _ in 0..5 {
            let mut buf = vec![0.5_f32; 64];
            bank.process_in_place(0, &mut buf, 9, 1.0);
            bank.advance(64);
        }
        let mut buf = vec![0.5_f32; 16];
        bank.process_in_place(0, &mut buf, 9, 1.0);
        bank.advance(16);
        assert!(buf.iter().all(|&y| y == 0.5));
    }

    #[test]
    fn zero_length_block_changes_nothing() {
        let mut bank = DelayBank::new(1, 8);
        let mut empty: [f32; 0] = [];
        bank.process_in_place(0, &mut empty, 3, 1.0);
        bank.advance(0);
        assert_eq!(bank.write_pos(), 0);
    }
}
