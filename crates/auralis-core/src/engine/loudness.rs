//! Master loudness measurement
//!
//! K-weighting (40 Hz high-pass followed by a +4 dB high shelf at 4 kHz),
//! then mean square over both channels of the block converted to LUFS with
//! the usual −0.691 offset. One reading per block.
//!
//! Readings can be forwarded to a [`LoudnessSink`] owned by the audio
//! thread. [`meter_tap`] gives a ready-made sink that hands readings to
//! another thread over a wait-free ring.

use crate::effect::native::{BiquadCoeffs, BiquadState};
use crate::types::{StereoBuffer, SAMPLE_RATE, SILENCE_DB};

const HIGH_PASS_HZ: f32 = 40.0;
const HIGH_PASS_Q: f32 = 0.5;
const SHELF_HZ: f32 = 4000.0;
const SHELF_GAIN_DB: f32 = 4.0;
const SHELF_Q: f32 = 0.707;

/// Offset between K-weighted mean square (dB) and LUFS
const LUFS_OFFSET: f32 = -0.691;

/// One block's measurement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoudnessReading {
    pub lufs: f32,
    /// Sample peak of the block (linear)
    pub peak: f32,
}

/// Receiver of per-block loudness readings, called on the audio thread
///
/// Implementations must not block or allocate.
pub trait LoudnessSink: Send {
    fn push(&mut self, reading: LoudnessReading, block: &StereoBuffer);
}

/// K-weighted block loudness meter
pub struct LoudnessMeter {
    high_pass: BiquadCoeffs,
    shelf: BiquadCoeffs,
    hp_state: BiquadState,
    shelf_state: BiquadState,
}

impl LoudnessMeter {
    pub fn new() -> Self {
        let mut meter = Self {
            high_pass: BiquadCoeffs::passthrough(),
            shelf: BiquadCoeffs::passthrough(),
            hp_state: BiquadState::default(),
            shelf_state: BiquadState::default(),
        };
        meter.prepare(SAMPLE_RATE as f32);
        meter
    }

    pub fn prepare(&mut self, sample_rate: f32) {
        self.high_pass = BiquadCoeffs::high_pass(HIGH_PASS_HZ, HIGH_PASS_Q, sample_rate);
        self.shelf = BiquadCoeffs::high_shelf(SHELF_HZ, SHELF_GAIN_DB, SHELF_Q, sample_rate);
        self.reset();
    }

    pub fn reset(&mut self) {
        self.hp_state.reset();
        self.shelf_state.reset();
    }

    /// Measure one block (the block itself is left untouched)
    pub fn measure(&mut self, block: &StereoBuffer) -> LoudnessReading {
        if block.is_empty() {
            return LoudnessReading {
                lufs: SILENCE_DB,
                peak: 0.0,
            };
        }

        let mut sum_sq = 0.0f64;
        let mut peak = 0.0f32;
        for s in block.iter() {
            peak = peak.max(s.peak());
            let (l, r) = self.hp_state.process(s.left, s.right, &self.high_pass);
            let (l, r) = self.shelf_state.process(l, r, &self.shelf);
            sum_sq += (l as f64) * (l as f64) + (r as f64) * (r as f64);
        }

        let mean = sum_sq / (2 * block.len()) as f64;
        let lufs = if mean > 0.0 {
            ((LUFS_OFFSET as f64 + 10.0 * mean.log10()) as f32).max(SILENCE_DB)
        } else {
            SILENCE_DB
        };
        LoudnessReading { lufs, peak }
    }
}

impl Default for LoudnessMeter {
    fn default() -> Self {
        Self::new()
    }
}

/// Readings buffered between the audio thread and a reader
pub const METER_TAP_CAPACITY: usize = 256;

/// Sink half of [`meter_tap`]; drops readings when the reader falls behind
pub struct MeterTap {
    producer: rtrb::Producer<LoudnessReading>,
}

impl LoudnessSink for MeterTap {
    fn push(&mut self, reading: LoudnessReading, _block: &StereoBuffer) {
        let _ = self.producer.push(reading);
    }
}

/// Reader half of [`meter_tap`]
pub struct MeterReader {
    consumer: rtrb::Consumer<LoudnessReading>,
}

impl MeterReader {
    /// Drain pending readings, returning the newest
    pub fn latest(&mut self) -> Option<LoudnessReading> {
        let mut last = None;
        while let Ok(reading) = self.consumer.pop() {
            last = Some(reading);
        }
        last
    }
}

/// Create a sink/reader pair connected by a wait-free ring
pub fn meter_tap() -> (MeterTap, MeterReader) {
    let (producer, consumer) = rtrb::RingBuffer::new(METER_TAP_CAPACITY);
    (MeterTap { producer }, MeterReader { consumer })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, amplitude: f32, len: usize) -> StereoBuffer {
        let mono: Vec<f32> = (0..len)
            .map(|i| amplitude * (2.0 * std::f32::consts::PI * freq * i as f32 / 48000.0).sin())
            .collect();
        StereoBuffer::from_mono(&mono)
    }

    #[test]
    fn test_full_scale_sine_near_minus_3_7() {
        let mut meter = LoudnessMeter::new();
        // Settle the filters first
        meter.measure(&sine(1000.0, 1.0, 4800));
        let reading = meter.measure(&sine(1000.0, 1.0, 4800));

        assert!((reading.lufs + 3.7).abs() < 1.0, "lufs {}", reading.lufs);
        assert!((reading.peak - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_twenty_db_down_reads_twenty_lower() {
        let mut loud = LoudnessMeter::new();
        let mut quiet = LoudnessMeter::new();
        loud.measure(&sine(1000.0, 1.0, 4800));
        quiet.measure(&sine(1000.0, 0.1, 4800));

        let a = loud.measure(&sine(1000.0, 1.0, 4800)).lufs;
        let b = quiet.measure(&sine(1000.0, 0.1, 4800)).lufs;
        assert!((a - b - 20.0).abs() < 0.05);
    }

    #[test]
    fn test_silence_is_floored() {
        let mut meter = LoudnessMeter::new();
        let reading = meter.measure(&StereoBuffer::silence(512));
        assert_eq!(reading.lufs, SILENCE_DB);
        assert_eq!(reading.peak, 0.0);
    }

    #[test]
    fn test_meter_tap_keeps_latest() {
        let (mut tap, mut reader) = meter_tap();
        assert!(reader.latest().is_none());

        let block = StereoBuffer::silence(4);
        tap.push(LoudnessReading { lufs: -20.0, peak: 0.1 }, &block);
        tap.push(LoudnessReading { lufs: -12.0, peak: 0.3 }, &block);

        assert_eq!(reader.latest().map(|r| r.lufs), Some(-12.0));
        assert!(reader.latest().is_none());
    }
}
