//! Level and spectral measurement of a captured window
//!
//! Spectrum: 2048-point Hann-windowed real FFT with 75% overlap on the
//! L+R average, magnitudes averaged over frames, then folded into the 32
//! third-octave bands of [`super::profiles`].

use std::sync::Arc;

use realfft::num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};

use super::profiles::{band_for_frequency, BAND_FLOOR_DB, NUM_BANDS};
use crate::types::gain_to_db;

/// Analysis frame length
pub const FFT_SIZE: usize = 2048;
/// Frame hop (75% overlap)
pub const HOP_SIZE: usize = FFT_SIZE / 4;

/// Stride for the noise floor sample set
const NOISE_FLOOR_STRIDE: usize = 64;
/// Order statistic used as the noise floor
const NOISE_FLOOR_PERCENTILE: f32 = 0.2;

/// Linear level statistics of a window
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LevelStats {
    pub rms: f32,
    pub peak: f32,
    pub noise_floor: f32,
}

impl LevelStats {
    pub fn rms_db(&self) -> f32 {
        gain_to_db(self.rms)
    }

    pub fn peak_db(&self) -> f32 {
        gain_to_db(self.peak)
    }

    pub fn noise_floor_db(&self) -> f32 {
        gain_to_db(self.noise_floor)
    }

    /// Peak-to-RMS ratio (dB)
    pub fn dynamic_range_db(&self) -> f32 {
        self.peak_db() - self.rms_db()
    }
}

/// RMS and peak over both lanes, plus a cheap noise floor estimate
///
/// The noise floor is the 20th percentile of `|x|` taken at every 64th
/// frame of each lane.
pub fn measure_levels(left: &[f32], right: &[f32]) -> LevelStats {
    let frames = left.len().min(right.len());
    if frames == 0 {
        return LevelStats::default();
    }
    let (left, right) = (&left[..frames], &right[..frames]);

    let mut sum_sq = 0.0f64;
    let mut peak = 0.0f32;
    for &x in left.iter().chain(right) {
        sum_sq += (x as f64) * (x as f64);
        peak = peak.max(x.abs());
    }
    let rms = (sum_sq / (2 * frames) as f64).sqrt() as f32;

    let mut magnitudes: Vec<f32> = left
        .iter()
        .step_by(NOISE_FLOOR_STRIDE)
        .chain(right.iter().step_by(NOISE_FLOOR_STRIDE))
        .map(|x| x.abs())
        .collect();
    let index = (magnitudes.len() as f32 * NOISE_FLOOR_PERCENTILE) as usize;
    let (_, noise_floor, _) = magnitudes.select_nth_unstable_by(index, f32::total_cmp);

    LevelStats {
        rms,
        peak,
        noise_floor: *noise_floor,
    }
}

/// Reusable FFT plan and scratch space
pub struct SpectrumAnalyzer {
    fft: Arc<dyn RealToComplex<f32>>,
    window: Vec<f32>,
    frame: Vec<f32>,
    spectrum: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    /// Running magnitude sum per bin
    accum: Vec<f32>,
    sample_rate: f32,
}

impl SpectrumAnalyzer {
    pub fn new(sample_rate: f32) -> Self {
        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(FFT_SIZE);
        let spectrum = fft.make_output_vec();
        let scratch = fft.make_scratch_vec();

        // Hann
        let window = (0..FFT_SIZE)
            .map(|i| 0.5 - 0.5 * (2.0 * std::f32::consts::PI * i as f32 / (FFT_SIZE - 1) as f32).cos())
            .collect();

        Self {
            fft,
            window,
            frame: vec![0.0; FFT_SIZE],
            spectrum,
            scratch,
            accum: vec![0.0; FFT_SIZE / 2],
            sample_rate,
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Average magnitude per bin (bins `0..FFT_SIZE / 2`)
    ///
    /// Windows shorter than one frame are zero-padded. An empty window
    /// yields all zeros.
    pub fn average_spectrum(&mut self, left: &[f32], right: &[f32]) -> &[f32] {
        let frames = left.len().min(right.len());
        self.accum.fill(0.0);
        if frames == 0 {
            return &self.accum;
        }

        let num_windows = if frames >= FFT_SIZE {
            (frames - FFT_SIZE) / HOP_SIZE + 1
        } else {
            1
        };

        for w in 0..num_windows {
            let start = w * HOP_SIZE;
            for (i, slot) in self.frame.iter_mut().enumerate() {
                let idx = start + i;
                *slot = if idx < frames {
                    0.5 * (left[idx] + right[idx]) * self.window[i]
                } else {
                    0.0
                };
            }

            if let Err(e) = self
                .fft
                .process_with_scratch(&mut self.frame, &mut self.spectrum, &mut self.scratch)
            {
                log::warn!("FFT failed on analysis frame {}: {}", w, e);
                continue;
            }
            for (acc, bin) in self.accum.iter_mut().zip(&self.spectrum) {
                *acc += bin.norm();
            }
        }

        let scale = 1.0 / num_windows as f32;
        for acc in &mut self.accum {
            *acc *= scale;
        }
        &self.accum
    }

    /// 32-band third-octave profile of a window (dB, floored at −60)
    pub fn band_profile(&mut self, left: &[f32], right: &[f32]) -> [f32; NUM_BANDS] {
        let bin_width = self.sample_rate / FFT_SIZE as f32;
        let spectrum = self.average_spectrum(left, right);

        let mut sums = [0.0f32; NUM_BANDS];
        let mut counts = [0usize; NUM_BANDS];
        // DC is skipped
        for (bin, &magnitude) in spectrum.iter().enumerate().skip(1) {
            if let Some(band) = band_for_frequency(bin as f32 * bin_width) {
                sums[band] += magnitude;
                counts[band] += 1;
            }
        }

        std::array::from_fn(|band| {
            if counts[band] == 0 {
                BAND_FLOOR_DB
            } else {
                gain_to_db(sums[band] / counts[band] as f32).max(BAND_FLOOR_DB)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::soundcheck::profiles::THIRD_OCTAVE_CENTERS;

    fn sine(freq: f32, amplitude: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| amplitude * (2.0 * std::f32::consts::PI * freq * i as f32 / 48000.0).sin())
            .collect()
    }

    #[test]
    fn test_levels_of_sine() {
        let wave = sine(1000.0, 0.5, 48000);
        let stats = measure_levels(&wave, &wave);
        assert!((stats.rms - 0.5 / 2f32.sqrt()).abs() < 1e-3);
        assert!((stats.peak - 0.5).abs() < 1e-3);
        // Crest factor of a sine is 3 dB
        assert!((stats.dynamic_range_db() - 3.01).abs() < 0.05);
    }

    #[test]
    fn test_noise_floor_is_low_order_statistic() {
        // Quiet bed with a loud burst in the middle
        let mut wave = vec![0.001f32; 64 * 100];
        for x in &mut wave[3000..3400] {
            *x = 0.8;
        }
        let stats = measure_levels(&wave, &wave);
        assert_eq!(stats.noise_floor, 0.001);
        assert_eq!(stats.peak, 0.8);
    }

    #[test]
    fn test_empty_window() {
        let stats = measure_levels(&[], &[]);
        assert_eq!(stats, LevelStats::default());
    }

    #[test]
    fn test_sine_lands_in_its_band() {
        let mut analyzer = SpectrumAnalyzer::new(48000.0);
        let wave = sine(1000.0, 0.5, 48000);
        let bands = analyzer.band_profile(&wave, &wave);

        let loudest = (0..NUM_BANDS)
            .max_by(|&a, &b| bands[a].total_cmp(&bands[b]))
            .unwrap_or_default();
        assert_eq!(THIRD_OCTAVE_CENTERS[loudest], 1000.0);
        // Far away bands sit near the floor
        assert!(bands[2] < bands[loudest] - 40.0);
    }

    #[test]
    fn test_silence_and_empty_bands_are_floored() {
        let mut analyzer = SpectrumAnalyzer::new(48000.0);
        let bands = analyzer.band_profile(&[0.0; 4096], &[0.0; 4096]);
        assert!(bands.iter().all(|&db| db == BAND_FLOOR_DB));

        // 23.4 Hz bin spacing leaves the 20 Hz band without bins
        let wave = sine(440.0, 0.5, 8192);
        let bands = analyzer.band_profile(&wave, &wave);
        assert_eq!(bands[0], BAND_FLOOR_DB);
    }

    #[test]
    fn test_short_window_is_zero_padded() {
        let mut analyzer = SpectrumAnalyzer::new(48000.0);
        let wave = sine(2000.0, 0.5, 1000);
        let spectrum = analyzer.average_spectrum(&wave, &wave);
        assert_eq!(spectrum.len(), FFT_SIZE / 2);
        assert!(spectrum.iter().any(|&m| m > 1.0));
    }
}
