//! Auralis live mixer
//!
//! Runs the mixer on the configured (or default) audio devices, prints the
//! master loudness once a second and optionally performs a soundcheck.
//!
//! ## Command line flags
//!
//! - `--channels N`: number of mixer channels (default 32)
//! - `--soundcheck [SECONDS]`: analyse every channel, then apply corrections
//! - `--test-tone`: replace channel 0 with the diagnostic sine
//! - `--duration SECONDS`: stop after this long (default: run forever)
//! - `--config PATH`: mixer config file (default `<config dir>/auralis/mixer.yaml`)

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};

use auralis_core::audio::start_audio_system;
use auralis_core::config::{default_config_path, load_config, MixerConfig};
use auralis_core::engine::{command_channel, meter_tap, EngineCommand, RoutingEngine};
use auralis_core::soundcheck::{SoundcheckEngine, SoundcheckState};
use auralis_core::NUM_CHANNELS;

struct Args {
    channels: usize,
    soundcheck: Option<Option<u32>>,
    test_tone: bool,
    duration: Option<Duration>,
    config: PathBuf,
}

fn parse_args() -> Result<Args> {
    let mut parsed = Args {
        channels: NUM_CHANNELS,
        soundcheck: None,
        test_tone: false,
        duration: None,
        config: default_config_path("mixer.yaml"),
    };
    let mut args = std::env::args().skip(1).peekable();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--channels" => {
                let value = args.next().context("--channels needs a value")?;
                parsed.channels = value.parse().with_context(|| format!("invalid channel count: {}", value))?;
            }
            "--soundcheck" => {
                let seconds = match args.peek() {
                    Some(next) if !next.starts_with("--") => {
                        let value = args.next().unwrap_or_default();
                        Some(value.parse().with_context(|| format!("invalid seconds: {}", value))?)
                    }
                    _ => None,
                };
                parsed.soundcheck = Some(seconds);
            }
            "--test-tone" => parsed.test_tone = true,
            "--duration" => {
                let value = args.next().context("--duration needs a value")?;
                let secs: u64 = value.parse().with_context(|| format!("invalid duration: {}", value))?;
                parsed.duration = Some(Duration::from_secs(secs));
            }
            "--config" => {
                parsed.config = PathBuf::from(args.next().context("--config needs a path")?);
            }
            _ => bail!("unknown argument: {}", arg),
        }
    }
    Ok(parsed)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = parse_args()?;
    let mut config: MixerConfig = load_config(&args.config);
    if args.test_tone {
        config.test_tone.enabled = true;
    }

    // Build the pool before audio starts, so the first callback doesn't pay for it
    if let Err(e) = rayon::ThreadPoolBuilder::new()
        .thread_name(|i| format!("rayon-audio-{}", i))
        .build_global()
    {
        log::warn!("Rayon thread pool already initialized: {}", e);
    }

    let (mut command_tx, command_rx) = command_channel();
    let engine = RoutingEngine::new(args.channels, command_rx);
    let mixer = engine.handle();
    engine.set_test_tone(&config.test_tone);
    config.master.apply(mixer.master());

    let mut soundcheck = SoundcheckEngine::new(mixer.clone(), config.soundcheck.clone());
    let system = start_audio_system(&config.audio, engine, Some(soundcheck.capture_tap()))
        .context("failed to start audio")?;
    soundcheck.set_sample_rate(system.sample_rate() as f32);

    let (tap, mut meter) = meter_tap();
    if command_tx.push(EngineCommand::set_meter_sink(tap)).is_err() {
        log::warn!("Command queue full, loudness meter not installed");
    }

    if let Some(seconds) = args.soundcheck {
        soundcheck.start_check(seconds.unwrap_or(config.soundcheck.seconds_per_channel))?;
    }

    println!(
        "Auralis running: {} channels, {} in / {} out, {} Hz, {:.1} ms",
        args.channels,
        system.input_channels(),
        system.output_channels(),
        system.sample_rate(),
        system.latency_ms()
    );

    let started = Instant::now();
    while args.duration.map_or(true, |d| started.elapsed() < d) {
        std::thread::sleep(Duration::from_secs(1));

        if let Some(reading) = meter.latest() {
            println!(
                "Master: {:.1} LUFS (target {:.1}), limiter {:.1} dB",
                reading.lufs,
                mixer.master().target_lufs(),
                mixer.master().limiter_reduction_db()
            );
        }
        if system.input_overruns() > 0 {
            log::debug!("Input overruns: {}", system.input_overruns());
        }

        if soundcheck.state() == SoundcheckState::Finished {
            let applied = soundcheck.apply_corrections()?;
            println!("Soundcheck applied to {} channels", applied);
        }
    }

    soundcheck.stop_check();
    Ok(())
}
