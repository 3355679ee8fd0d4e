//! haaspan-cli — hear the stereo panner-delay on a test source, live or to WAV.
//!
//! Examples:
//!   haaspan-cli --list-devices
//!   haaspan-cli --source=clicks --delay=-8.75 --mix=1.0
//!   haaspan-cli --render=demo.wav --duration=8 --sweep
//!
//! `--sweep` drives the delay-time control with a slow LFO from the main
//! thread while audio runs, which is exactly the cross-thread path a control
//! surface would use.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use haaspan_core::dsp::{db_to_lin, lerp, lin_to_db, TAU};
use haaspan_engine::{Engine, ParamStore, DEFAULT_MAX_DELAY_MS, DELAY_CONTROL_RANGE};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Engine block size used by both the live and render paths.
const BLOCK: usize = 512;

/// Sweep LFO rate in Hz (full left→right→left excursion every 10 s).
const SWEEP_RATE_HZ: f32 = 0.1;

#[derive(Debug, Default)]
struct Args {
    list_devices: bool,
    device_name: Option<String>,
    sample_rate: Option<u32>,
    duration_sec: Option<u64>,
    render: Option<String>,
    source: Option<String>,
    delay: Option<f32>,
    mix: Option<f32>,
    hpf: Option<f32>,
    lpf: Option<f32>,
    gain_db: Option<f32>,
    sweep: bool,
}

fn parse_args() -> Args {
    let mut a = Args::default();
    for s in std::env::args().skip(1) {
        if s == "--list-devices" { a.list_devices = true; continue; }
        if s == "--sweep"        { a.sweep = true;        continue; }
        if let Some(rest) = s.strip_prefix("--device=")      { a.device_name  = Some(rest.to_string()); continue; }
        if let Some(rest) = s.strip_prefix("--sample-rate=") { a.sample_rate  = rest.parse().ok();      continue; }
        if let Some(rest) = s.strip_prefix("--duration=")    { a.duration_sec = rest.parse().ok();      continue; }
        if let Some(rest) = s.strip_prefix("--render=")      { a.render       = Some(rest.to_string()); continue; }
        if let Some(rest) = s.strip_prefix("--source=")      { a.source       = Some(rest.to_string()); continue; }
        if let Some(rest) = s.strip_prefix("--delay=")       { a.delay        = rest.parse().ok();      continue; }
        if let Some(rest) = s.strip_prefix("--mix=")         { a.mix          = rest.parse().ok();      continue; }
        if let Some(rest) = s.strip_prefix("--hpf=")         { a.hpf          = rest.parse().ok();      continue; }
        if let Some(rest) = s.strip_prefix("--lpf=")         { a.lpf          = rest.parse().ok();      continue; }
        if let Some(rest) = s.strip_prefix("--gain-db=")     { a.gain_db      = rest.parse().ok();      continue; }
        eprintln!("[warn] unknown arg: {s}");
    }
    a
}

// --------------------------------- Test sources -----------------------------------

/// Built-in mono test sources; the same sample feeds both input channels so
/// every inter-channel difference heard at the output comes from the effect.
enum Source {
    Sine { freq: f32, phase: f32 },
    Clicks { period: usize, n: usize },
    Noise { rng: StdRng },
}

impl Source {
    fn parse(name: Option<&str>, sample_rate: f32) -> Result<Self> {
        match name.unwrap_or("clicks") {
            "sine" => Ok(Self::Sine { freq: 440.0, phase: 0.0 }),
            "clicks" => Ok(Self::Clicks { period: (sample_rate * 0.5) as usize, n: 0 }),
            "noise" => Ok(Self::Noise { rng: StdRng::seed_from_u64(0x4aa5_0a17) }),
            other => Err(anyhow!("unknown source: {other} (expected sine|clicks|noise)")),
        }
    }

    fn next(&mut self, sample_rate: f32) -> f32 {
        match self {
            Self::Sine { freq, phase } => {
                *phase = (*phase + *freq / sample_rate) % 1.0;
                (TAU * *phase).sin() * 0.5
            }
            Self::Clicks { period, n } => {
                let out = if *n == 0 { 1.0 } else { 0.0 };
                *n += 1;
                if *n >= *period { *n = 0; }
                out
            }
            Self::Noise { rng } => rng.gen_range(-0.5..0.5),
        }
    }
}

// ------------------------------ Block-based processor ------------------------------

/// Pulls the source, runs the engine block by block, and hands out frames.
/// All buffers live here, pre-allocated, so the audio callback never touches
/// the allocator.
struct Processor {
    engine: Engine,
    source: Source,
    sample_rate: f32,
    gain: f32,
    mono: bool,
    left: [f32; BLOCK],
    right: [f32; BLOCK],
    cursor: usize,
    filled: usize,
}

impl Processor {
    fn new(engine: Engine, source: Source, sample_rate: f32, gain: f32, mono: bool) -> Self {
        Self {
            engine,
            source,
            sample_rate,
            gain,
            mono,
            left: [0.0; BLOCK],
            right: [0.0; BLOCK],
            cursor: 0,
            filled: 0,
        }
    }

    fn refill(&mut self) {
        for i in 0..BLOCK {
            let s = self.source.next(self.sample_rate);
            self.left[i] = s;
            self.right[i] = s;
        }
        let ok = if self.mono {
            let mut block: [&mut [f32]; 1] = [&mut self.left[..]];
            let ok = self.engine.process_block(&mut block).is_ok();
            self.right = self.left;
            ok
        } else {
            let mut block: [&mut [f32]; 2] = [&mut self.left[..], &mut self.right[..]];
            self.engine.process_block(&mut block).is_ok()
        };
        if !ok {
            // A usage error must yield silence, not garbage.
            self.left = [0.0; BLOCK];
            self.right = [0.0; BLOCK];
        }
        for i in 0..BLOCK {
            self.left[i] *= self.gain;
            self.right[i] *= self.gain;
        }
        self.cursor = 0;
        self.filled = BLOCK;
    }

    fn next_frame(&mut self) -> (f32, f32) {
        if self.cursor >= self.filled {
            self.refill();
        }
        let out = (self.left[self.cursor], self.right[self.cursor]);
        self.cursor += 1;
        out
    }
}

// --------------------------------- Device plumbing ---------------------------------

fn list_output_devices() -> Result<()> {
    let host = cpal::default_host();
    println!("Available output devices:");
    for dev in host.output_devices()? {
        println!("- {}", dev.name()?);
    }
    Ok(())
}

fn pick_device(args: &Args) -> Result<cpal::Device> {
    let host = cpal::default_host();
    if let Some(name) = &args.device_name {
        for d in host.output_devices()? {
            if d.name()? == *name {
                return Ok(d);
            }
        }
        bail!("requested device not found: {name}");
    }
    host.default_output_device()
        .ok_or_else(|| anyhow!("no default output device"))
}

fn apply_params(params: &ParamStore, args: &Args) {
    // Default to an audible pan-left echo; the store keeps its own defaults
    // for mix and the tone controls.
    params.set_delay_time(args.delay.unwrap_or(-8.75));
    if let Some(v) = args.mix { params.set_dry_wet(v); }
    if let Some(v) = args.hpf { params.set_hpf_hz(v); }
    if let Some(v) = args.lpf { params.set_lpf_hz(v); }
}

/// Delay-time LFO position for the sweep mode at elapsed time `t` seconds.
fn sweep_position(t: f32) -> f32 {
    let x = 0.5 * (1.0 + (TAU * SWEEP_RATE_HZ * t).sin());
    lerp(-DELAY_CONTROL_RANGE, DELAY_CONTROL_RANGE, x)
}

fn build_stream<T>(
    device: &cpal::Device,
    cfg: &cpal::StreamConfig,
    mut proc_: Processor,
    err_fn: impl Fn(cpal::StreamError) + Send + 'static,
) -> Result<cpal::Stream>
where
    T: cpal::Sample + cpal::FromSample<f32> + cpal::SizedSample + Send + 'static,
{
    let channels = cfg.channels as usize;

    // ~1 second meter at the device rate
    let meter_interval = (cfg.sample_rate.0).max(1) as usize;
    let mut meter_count: usize = 0;
    let mut meter_peak: f32 = 0.0;

    let stream = device.build_output_stream(
        cfg,
        move |output: &mut [T], _| {
            for frame in output.chunks_mut(channels) {
                let (l, r) = proc_.next_frame();

                for (ch, slot) in frame.iter_mut().enumerate() {
                    let s = if ch == 0 { l } else { r };
                    *slot = T::from_sample(s);
                }

                meter_peak = meter_peak.max(l.abs()).max(r.abs());
                meter_count += 1;
                if meter_count >= meter_interval {
                    eprintln!("[meter] peak ~ {:.1} dBFS", lin_to_db(meter_peak));
                    meter_peak = 0.0;
                    meter_count = 0;
                }
            }
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}

// ------------------------------------ Modes ---------------------------------------

fn run_live(args: &Args) -> Result<()> {
    let device = pick_device(args)?;
    let sup_cfg = device
        .default_output_config()
        .context("querying default output config")?;
    let sample_format = sup_cfg.sample_format();
    let mut cfg = sup_cfg.config();
    if let Some(sr) = args.sample_rate {
        cfg.sample_rate = cpal::SampleRate(sr);
    }

    let sr = cfg.sample_rate.0 as f32;
    let engine_channels = (cfg.channels as usize).min(2).max(1);

    let params = Arc::new(ParamStore::new());
    apply_params(&params, args);
    let mut engine = Engine::new(Arc::clone(&params));
    engine.prepare(sr, engine_channels, DEFAULT_MAX_DELAY_MS)?;

    let source = Source::parse(args.source.as_deref(), sr)?;
    let gain = db_to_lin(args.gain_db.unwrap_or(0.0));
    let proc_ = Processor::new(engine, source, sr, gain, engine_channels == 1);

    println!("Using device: {}", device.name()?);
    println!("Stream config: {:?} (sample_format: {:?})", cfg, sample_format);
    println!(
        "Source: {}  | delay={:+.2}  mix={:.2}  hpf={:.0} Hz  lpf={:.0} Hz{}",
        args.source.as_deref().unwrap_or("clicks"),
        params.delay_time(),
        params.dry_wet(),
        params.hpf_hz(),
        params.lpf_hz(),
        if args.sweep { "  | sweeping delay" } else { "" },
    );
    if let Some(d) = args.duration_sec {
        println!("Auto-stop after {d} seconds");
    }
    println!("Press Ctrl+C to stop…\n");

    let err_fn = |e: cpal::StreamError| eprintln!("[cpal] stream error: {e}");
    let stream = match sample_format {
        cpal::SampleFormat::F32 => build_stream::<f32>(&device, &cfg, proc_, err_fn)?,
        cpal::SampleFormat::I16 => build_stream::<i16>(&device, &cfg, proc_, err_fn)?,
        cpal::SampleFormat::U16 => build_stream::<u16>(&device, &cfg, proc_, err_fn)?,
        other => bail!("unsupported device sample format: {other:?}"),
    };
    stream.play()?;

    let started = Instant::now();
    loop {
        if args.sweep {
            params.set_delay_time(sweep_position(started.elapsed().as_secs_f32()));
        }
        if let Some(d) = args.duration_sec {
            if started.elapsed() >= Duration::from_secs(d) {
                return Ok(());
            }
        }
        std::thread::sleep(Duration::from_millis(10));
    }
}

fn run_render(args: &Args, path: &str) -> Result<()> {
    let sr = args.sample_rate.unwrap_or(44_100);
    let seconds = args.duration_sec.unwrap_or(8);
    let total_frames = sr as usize * seconds as usize;

    let params = Arc::new(ParamStore::new());
    apply_params(&params, args);
    let mut engine = Engine::new(Arc::clone(&params));
    engine.prepare(sr as f32, 2, DEFAULT_MAX_DELAY_MS)?;

    let mut source = Source::parse(args.source.as_deref(), sr as f32)?;
    let gain = db_to_lin(args.gain_db.unwrap_or(0.0));

    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: sr,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("creating {path}"))?;

    let mut left = [0.0_f32; BLOCK];
    let mut right = [0.0_f32; BLOCK];
    let mut written = 0usize;
    while written < total_frames {
        let frames = BLOCK.min(total_frames - written);
        if args.sweep {
            params.set_delay_time(sweep_position(written as f32 / sr as f32));
        }
        for i in 0..frames {
            let s = source.next(sr as f32);
            left[i] = s;
            right[i] = s;
        }
        {
            let mut block: [&mut [f32]; 2] = [&mut left[..frames], &mut right[..frames]];
            engine.process_block(&mut block)?;
        }
        for i in 0..frames {
            writer.write_sample(left[i] * gain)?;
            writer.write_sample(right[i] * gain)?;
        }
        written += frames;
    }
    writer.finalize()?;

    println!("Rendered {seconds} s ({total_frames} frames) at {sr} Hz → {path}");
    Ok(())
}

fn main() -> Result<()> {
    let args = parse_args();

    if args.list_devices {
        return list_output_devices();
    }

    println!("haaspan-cli — stereo panner-delay demo\n");

    match args.render.clone() {
        Some(path) => run_render(&args, &path),
        None => run_live(&args),
    }
}
