//! Reference tone profiles
//!
//! One 32-band third-octave curve per source archetype, plus the level a
//! corrected channel should sit at and a typical gate threshold. Curves are
//! relative (0 dB = nominal), so matching is about spectral shape.

use serde::{Deserialize, Serialize};

use crate::types::ChannelType;

/// Number of third-octave bands in a spectral profile
pub const NUM_BANDS: usize = 32;

/// Floor for band magnitudes (dB)
pub const BAND_FLOOR_DB: f32 = -60.0;

/// Upper edge of the last band (Hz)
const TOP_EDGE_HZ: f32 = 30000.0;

/// Standard third-octave centre frequencies, 20 Hz to 25 kHz
pub const THIRD_OCTAVE_CENTERS: [f32; NUM_BANDS] = [
    20.0, 25.0, 31.5, 40.0, 50.0, 63.0, 80.0, 100.0, 125.0, 160.0, //
    200.0, 250.0, 315.0, 400.0, 500.0, 630.0, 800.0, 1000.0, 1250.0, 1600.0, //
    2000.0, 2500.0, 3150.0, 4000.0, 5000.0, 6300.0, 8000.0, 10000.0, 12500.0, 16000.0, //
    20000.0, 25000.0,
];

/// Source archetypes a channel can be matched against
///
/// Declaration order is the tie-break order for classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToneProfileKind {
    SingingVocal,
    Instrument,
    Drums,
    Speech,
    Other,
}

impl ToneProfileKind {
    pub const ALL: [ToneProfileKind; 5] = [
        ToneProfileKind::SingingVocal,
        ToneProfileKind::Instrument,
        ToneProfileKind::Drums,
        ToneProfileKind::Speech,
        ToneProfileKind::Other,
    ];

    /// Channel type written to the live channel when this profile wins
    pub fn channel_type(&self) -> ChannelType {
        match self {
            ToneProfileKind::SingingVocal | ToneProfileKind::Speech => ChannelType::Vocal,
            ToneProfileKind::Instrument => ChannelType::Instrument,
            ToneProfileKind::Drums => ChannelType::Drums,
            ToneProfileKind::Other => ChannelType::Other,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ToneProfileKind::SingingVocal => "Singing Vocal",
            ToneProfileKind::Instrument => "Instrument",
            ToneProfileKind::Drums => "Drums",
            ToneProfileKind::Speech => "Speech",
            ToneProfileKind::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToneProfile {
    pub kind: ToneProfileKind,
    /// Reference magnitude per third-octave band (dB)
    pub reference_db: [f32; NUM_BANDS],
    /// Level a corrected channel should reach (dBFS RMS)
    pub target_rms_db: f32,
    /// Typical gate threshold for the source (dBFS)
    pub gate_threshold_db: f32,
}

#[rustfmt::skip]
static PROFILES: [ToneProfile; 5] = [
    // Presence lift around 3-5 kHz, rolled off below 80 Hz and above 12 kHz
    ToneProfile {
        kind: ToneProfileKind::SingingVocal,
        reference_db: [
            -24.0, -18.0, -12.0, -6.0, -3.0, -1.0, 0.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 2.0, 3.0,
            4.0, 4.0, 3.0, 2.0, 1.0, 0.0, -1.0, -3.0, -6.0, -9.0,
            -12.0, -18.0,
        ],
        target_rms_db: -18.0,
        gate_threshold_db: -45.0,
    },
    ToneProfile {
        kind: ToneProfileKind::Instrument,
        reference_db: [
            -18.0, -12.0, -8.0, -4.0, -2.0, -1.0, 0.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 0.0, -1.0, -2.0, -3.0, -4.0, -5.0, -6.0,
            -8.0, -12.0,
        ],
        target_rms_db: -16.0,
        gate_threshold_db: -50.0,
    },
    // Full low end, scooped low mids, attack region lifted
    ToneProfile {
        kind: ToneProfileKind::Drums,
        reference_db: [
            -6.0, -3.0, -1.0, 0.0, 0.0, 0.0, 0.0, -1.0, -2.0, -3.0,
            -4.0, -3.0, -2.0, -1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
            1.0, 2.0, 3.0, 3.0, 2.0, 1.0, 0.0, -1.0, -3.0, -6.0,
            -9.0, -12.0,
        ],
        target_rms_db: -14.0,
        gate_threshold_db: -40.0,
    },
    // Narrow band centred on the midrange
    ToneProfile {
        kind: ToneProfileKind::Speech,
        reference_db: [
            -30.0, -24.0, -18.0, -12.0, -9.0, -6.0, -3.0, -1.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 1.0, 2.0, 3.0, 3.0, 2.0, 1.0, 0.0,
            -1.0, -2.0, -4.0, -6.0, -9.0, -12.0, -15.0, -18.0, -21.0, -24.0,
            -27.0, -30.0,
        ],
        target_rms_db: -16.0,
        gate_threshold_db: -40.0,
    },
    ToneProfile {
        kind: ToneProfileKind::Other,
        reference_db: [
            -6.0, -5.0, -4.0, -3.0, -2.0, -1.0, 0.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 0.0, -1.0, -2.0, -3.0, -4.0, -5.0, -6.0,
            -7.0, -8.0,
        ],
        target_rms_db: -18.0,
        gate_threshold_db: -50.0,
    },
];

/// Every reference profile, in classification order
pub fn profiles() -> &'static [ToneProfile] {
    &PROFILES
}

pub fn profile_for(kind: ToneProfileKind) -> &'static ToneProfile {
    &PROFILES[kind as usize]
}

/// Lower and upper edge of a band (Hz)
///
/// Edges are the geometric means of neighbouring centres. The first band
/// reaches down to 0 Hz and the last one up to 30 kHz.
pub fn band_edges(band: usize) -> (f32, f32) {
    let centre = THIRD_OCTAVE_CENTERS[band];
    let lower = if band > 0 {
        (centre * THIRD_OCTAVE_CENTERS[band - 1]).sqrt()
    } else {
        0.0
    };
    let upper = if band + 1 < NUM_BANDS {
        (centre * THIRD_OCTAVE_CENTERS[band + 1]).sqrt()
    } else {
        TOP_EDGE_HZ
    };
    (lower, upper)
}

/// Band containing `freq_hz`, or `None` above the last edge
pub fn band_for_frequency(freq_hz: f32) -> Option<usize> {
    (0..NUM_BANDS).find(|&band| {
        let (lower, upper) = band_edges(band);
        freq_hz >= lower && freq_hz < upper
    })
}

/// Channel EQ band responsible for a frequency
///
/// 0 = low shelf (<200 Hz), 1 = low mid (<1 kHz), 2 = high mid (<5 kHz),
/// 3 = high shelf.
pub fn eq_band_for_frequency(freq_hz: f32) -> usize {
    if freq_hz < 200.0 {
        0
    } else if freq_hz < 1000.0 {
        1
    } else if freq_hz < 5000.0 {
        2
    } else {
        3
    }
}
