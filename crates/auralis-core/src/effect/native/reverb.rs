//! Stereo Reverb effect
//!
//! Freeverb-style algorithmic reverb: eight damped comb filters per side in
//! parallel, followed by four series all-pass diffusers.

use crate::effect::{Effect, EffectInfo, ParamRange};
use crate::types::{StereoBuffer, SAMPLE_RATE};

pub const ROOM_SIZE: ParamRange = ParamRange::new(0.0, 1.0, 0.5);
pub const DAMPING: ParamRange = ParamRange::new(0.0, 1.0, 0.4);
pub const WIDTH: ParamRange = ParamRange::new(0.0, 1.0, 1.0);
pub const WET: ParamRange = ParamRange::new(0.0, 1.0, 0.25);

/// Comb filter delay line lengths (in samples at 44.1kHz)
const COMB_LENGTHS: [usize; 8] = [1557, 1617, 1491, 1422, 1277, 1356, 1188, 1116];

/// Allpass filter delay line lengths (in samples at 44.1kHz)
const ALLPASS_LENGTHS: [usize; 4] = [225, 556, 441, 341];

/// Stereo spread offset for the right channel (in samples at 44.1kHz)
const STEREO_SPREAD: usize = 23;

const ALLPASS_FEEDBACK: f32 = 0.5;

/// Gain compensation for comb filter summing
const COMB_GAIN: f32 = 0.2;

static INFO: EffectInfo = EffectInfo::new("Reverb", "Reverb");

struct CombFilter {
    buffer: Vec<f32>,
    pos: usize,
    filter_state: f32,
}

impl CombFilter {
    fn new(length: usize, sr_scale: f32) -> Self {
        let scaled_len = ((length as f32 * sr_scale) as usize).max(1);
        Self {
            buffer: vec![0.0; scaled_len],
            pos: 0,
            filter_state: 0.0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32, feedback: f32, damp: f32) -> f32 {
        let output = self.buffer[self.pos];

        // One-pole lowpass in the feedback path
        self.filter_state = output * (1.0 - damp) + self.filter_state * damp;

        self.buffer[self.pos] = input + self.filter_state * feedback;
        self.pos = (self.pos + 1) % self.buffer.len();

        output
    }

    fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.filter_state = 0.0;
    }
}

struct AllpassFilter {
    buffer: Vec<f32>,
    pos: usize,
}

impl AllpassFilter {
    fn new(length: usize, sr_scale: f32) -> Self {
        let scaled_len = ((length as f32 * sr_scale) as usize).max(1);
        Self {
            buffer: vec![0.0; scaled_len],
            pos: 0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let buffered = self.buffer[self.pos];
        let output = -input + buffered;
        self.buffer[self.pos] = input + buffered * ALLPASS_FEEDBACK;
        self.pos = (self.pos + 1) % self.buffer.len();
        output
    }

    fn reset(&mut self) {
        self.buffer.fill(0.0);
    }
}

/// Freeverb-style stereo reverb
///
/// - Room size maps to comb feedback 0.7-0.98
/// - Damping: 0.0 = bright, 1.0 = dark
/// - Width: 0.0 = mono tail, 1.0 = full stereo
/// - Wet: dry/wet balance
pub struct ReverbEffect {
    room_size: f32,
    damping: f32,
    width: f32,
    wet: f32,
    combs_l: Vec<CombFilter>,
    combs_r: Vec<CombFilter>,
    allpass_l: Vec<AllpassFilter>,
    allpass_r: Vec<AllpassFilter>,
}

impl ReverbEffect {
    pub fn new() -> Self {
        let mut reverb = Self {
            room_size: ROOM_SIZE.default,
            damping: DAMPING.default,
            width: WIDTH.default,
            wet: WET.default,
            combs_l: Vec::new(),
            combs_r: Vec::new(),
            allpass_l: Vec::new(),
            allpass_r: Vec::new(),
        };
        reverb.build_lines(SAMPLE_RATE as f32);
        reverb
    }

    fn build_lines(&mut self, sample_rate: f32) {
        let sr_scale = sample_rate / 44100.0;
        self.combs_l = COMB_LENGTHS.iter().map(|&len| CombFilter::new(len, sr_scale)).collect();
        self.combs_r = COMB_LENGTHS
            .iter()
            .map(|&len| CombFilter::new(len + STEREO_SPREAD, sr_scale))
            .collect();
        self.allpass_l = ALLPASS_LENGTHS.iter().map(|&len| AllpassFilter::new(len, sr_scale)).collect();
        self.allpass_r = ALLPASS_LENGTHS
            .iter()
            .map(|&len| AllpassFilter::new(len + STEREO_SPREAD, sr_scale))
            .collect();
    }

    /// Push the current parameter values (called once per block)
    pub fn set_params(&mut self, room_size: f32, damping: f32, width: f32, wet: f32) {
        self.room_size = ROOM_SIZE.clamp(room_size);
        self.damping = DAMPING.clamp(damping);
        self.width = WIDTH.clamp(width);
        self.wet = WET.clamp(wet);
    }
}

impl Default for ReverbEffect {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for ReverbEffect {
    fn prepare(&mut self, sample_rate: f32) {
        self.build_lines(sample_rate);
    }

    fn process(&mut self, buffer: &mut StereoBuffer) {
        let feedback = 0.7 + self.room_size * 0.28;
        let damp = self.damping;
        let wet = self.wet;
        let dry = 1.0 - wet;

        let wet1 = wet * (self.width / 2.0 + 0.5);
        let wet2 = wet * ((1.0 - self.width) / 2.0);

        for sample in buffer.iter_mut() {
            let input = (sample.left + sample.right) * 0.5;

            let mut out_l = 0.0f32;
            let mut out_r = 0.0f32;
            for comb in &mut self.combs_l {
                out_l += comb.process(input, feedback, damp);
            }
            for comb in &mut self.combs_r {
                out_r += comb.process(input, feedback, damp);
            }
            out_l *= COMB_GAIN;
            out_r *= COMB_GAIN;

            for ap in &mut self.allpass_l {
                out_l = ap.process(out_l);
            }
            for ap in &mut self.allpass_r {
                out_r = ap.process(out_r);
            }

            let left = out_l * wet1 + out_r * wet2 + sample.left * dry;
            let right = out_r * wet1 + out_l * wet2 + sample.right * dry;
            sample.left = left;
            sample.right = right;
        }
    }

    fn reset(&mut self) {
        self.combs_l.iter_mut().for_each(CombFilter::reset);
        self.combs_r.iter_mut().for_each(CombFilter::reset);
        self.allpass_l.iter_mut().for_each(AllpassFilter::reset);
        self.allpass_r.iter_mut().for_each(AllpassFilter::reset);
    }

    fn info(&self) -> &EffectInfo {
        &INFO
    }
}
