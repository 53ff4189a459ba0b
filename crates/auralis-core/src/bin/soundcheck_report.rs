//! Offline soundcheck report
//!
//! Runs the per-channel soundcheck analysis over a WAV file and prints the
//! measurements, the matched source profile and the suggested corrections.
//! Every channel of the file is analysed as one mixer channel.
//!
//! ```text
//! soundcheck-report <file.wav> [--seconds N]
//! ```

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use hound::{SampleFormat, WavReader};

use auralis_core::engine::ChannelSettings;
use auralis_core::soundcheck::{ChannelAnalysis, SpectrumAnalyzer};

struct Args {
    path: PathBuf,
    /// Analyse at most this much audio per channel
    seconds: Option<f32>,
}

fn parse_args() -> Result<Args> {
    let mut path = None;
    let mut seconds = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--seconds" => {
                let value = args.next().context("--seconds needs a value")?;
                seconds = Some(value.parse::<f32>().with_context(|| format!("invalid seconds: {}", value))?);
            }
            _ if path.is_none() => path = Some(PathBuf::from(arg)),
            _ => bail!("unexpected argument: {}", arg),
        }
    }
    let path = path.context("usage: soundcheck-report <file.wav> [--seconds N]")?;
    Ok(Args { path, seconds })
}

/// Planar `f32` lanes, one per file channel
fn read_wav(args: &Args) -> Result<(Vec<Vec<f32>>, u32)> {
    let mut reader = WavReader::open(&args.path).with_context(|| format!("cannot open {}", args.path.display()))?;
    let spec = reader.spec();
    let channels = spec.channels as usize;
    if channels == 0 {
        bail!("{} has no audio channels", args.path.display());
    }
    log::info!(
        "{}: {} channels, {} Hz, {} bit {:?}",
        args.path.display(),
        channels,
        spec.sample_rate,
        spec.bits_per_sample,
        spec.sample_format
    );

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        SampleFormat::Int => {
            let scale = 1.0 / (1u64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|s| s as f32 * scale))
                .collect::<Result<_, _>>()?
        }
    };

    let limit = args
        .seconds
        .map_or(usize::MAX, |s| (s * spec.sample_rate as f32) as usize);
    let mut lanes = vec![Vec::new(); channels];
    for frame in interleaved.chunks_exact(channels).take(limit) {
        for (lane, &sample) in lanes.iter_mut().zip(frame) {
            lane.push(sample);
        }
    }
    Ok((lanes, spec.sample_rate))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = parse_args()?;
    let (lanes, sample_rate) = read_wav(&args)?;
    let mut analyzer = SpectrumAnalyzer::new(sample_rate as f32);

    for (channel, lane) in lanes.iter().enumerate() {
        let analysis = ChannelAnalysis::from_capture(channel, lane, lane, &mut analyzer, ChannelSettings::default());
        let levels = &analysis.levels;
        let c = &analysis.corrections;

        println!("Channel {} ({:.1} s)", channel, lane.len() as f32 / sample_rate as f32);
        println!(
            "  RMS {:.1} dB, peak {:.1} dB, noise floor {:.1} dB, dynamic range {:.1} dB",
            levels.rms_db(),
            levels.peak_db(),
            levels.noise_floor_db(),
            levels.dynamic_range_db()
        );
        println!(
            "  Profile: {} (channel type {})",
            analysis.suggested_profile.name(),
            analysis.suggested_type.name()
        );
        println!(
            "  Trim {:+.1} dB, gate {:.1} dB, EQ [{:+.1} {:+.1} {:+.1} {:+.1}] dB, compressor {:.0}:1",
            c.trim_db,
            c.gate_threshold_db,
            c.eq_gains_db[0],
            c.eq_gains_db[1],
            c.eq_gains_db[2],
            c.eq_gains_db[3],
            c.comp_ratio
        );
        let bands: Vec<String> = analysis.bands_db.iter().map(|db| format!("{:.0}", db)).collect();
        println!("  Bands: {}", bands.join(" "));
    }
    Ok(())
}
