//! Profile matching and correction suggestions

use serde::{Deserialize, Serialize};

use super::analysis::LevelStats;
use super::profiles::{eq_band_for_frequency, profiles, ToneProfile, ToneProfileKind, NUM_BANDS, THIRD_OCTAVE_CENTERS};
use crate::engine::params::CHANNEL_EQ_BANDS;

const TRIM_LIMIT_DB: f32 = 12.0;
const EQ_LIMIT_DB: f32 = 12.0;
const GATE_MARGIN_DB: f32 = 6.0;
const GATE_MIN_DB: f32 = -60.0;
const GATE_MAX_DB: f32 = -20.0;

/// Sum of squared band differences between a measurement and a reference
pub fn profile_distance(bands_db: &[f32; NUM_BANDS], profile: &ToneProfile) -> f32 {
    bands_db
        .iter()
        .zip(&profile.reference_db)
        .map(|(measured, reference)| (reference - measured).powi(2))
        .sum()
}

/// Closest reference profile
///
/// Ties go to the profile declared first in [`ToneProfileKind`].
pub fn classify(bands_db: &[f32; NUM_BANDS]) -> ToneProfileKind {
    let mut best = ToneProfileKind::Other;
    let mut best_score = f32::MAX;
    for profile in profiles() {
        let score = profile_distance(bands_db, profile);
        if score < best_score {
            best_score = score;
            best = profile.kind;
        }
    }
    best
}

/// Compressor ratio for a peak-to-RMS spread
pub fn compressor_ratio_for(dynamic_range_db: f32) -> f32 {
    if dynamic_range_db > 12.0 {
        3.0
    } else if dynamic_range_db > 6.0 {
        2.0
    } else {
        1.0
    }
}

/// Suggested channel settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Corrections {
    pub trim_db: f32,
    pub gate_threshold_db: f32,
    pub eq_gains_db: [f32; CHANNEL_EQ_BANDS],
    pub comp_ratio: f32,
}

impl Default for Corrections {
    fn default() -> Self {
        Self {
            trim_db: 0.0,
            gate_threshold_db: -50.0,
            eq_gains_db: [0.0; CHANNEL_EQ_BANDS],
            comp_ratio: 1.0,
        }
    }
}

/// Corrections that move a measured channel towards `profile`
pub fn compute_corrections(levels: &LevelStats, bands_db: &[f32; NUM_BANDS], profile: &ToneProfile) -> Corrections {
    let trim_db = (profile.target_rms_db - levels.rms_db()).clamp(-TRIM_LIMIT_DB, TRIM_LIMIT_DB);
    let gate_threshold_db = (levels.noise_floor_db() + GATE_MARGIN_DB).clamp(GATE_MIN_DB, GATE_MAX_DB);

    let mut sums = [0.0f32; CHANNEL_EQ_BANDS];
    let mut counts = [0usize; CHANNEL_EQ_BANDS];
    for (band, &centre) in THIRD_OCTAVE_CENTERS.iter().enumerate() {
        let eq = eq_band_for_frequency(centre);
        sums[eq] += profile.reference_db[band] - bands_db[band];
        counts[eq] += 1;
    }
    let eq_gains_db = std::array::from_fn(|eq| {
        if counts[eq] == 0 {
            0.0
        } else {
            (sums[eq] / counts[eq] as f32).clamp(-EQ_LIMIT_DB, EQ_LIMIT_DB)
        }
    });

    Corrections {
        trim_db,
        gate_threshold_db,
        eq_gains_db,
        comp_ratio: compressor_ratio_for(levels.dynamic_range_db()),
    }
}
