//! Lock-free parameter blocks
//!
//! Every scalar a caller can change lives here as an atomic, shared between
//! the control side ([`super::MixerHandle`]) and the audio thread through an
//! `Arc`. Setters clamp before storing, so the audio thread only ever sees
//! in-range values. Chains read each value once at the top of a block, which
//! makes a change visible from the next block on.
//!
//! Each block can also be captured into a plain serde struct (`*Settings`)
//! and written back, which is what snapshots and soundcheck revert use.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

use serde::{Deserialize, Serialize};

use crate::effect::native::{compressor, delay, gate, limiter, pitch, reverb, BAND_GAIN_DB};
use crate::effect::ParamRange;
use crate::types::{ChannelType, FxBusType, GroupBusType};

/// Channel trim range (dB)
pub const TRIM_DB: ParamRange = ParamRange::new(-24.0, 24.0, 0.0);
/// Effect-send level range (linear)
pub const FX_SEND: ParamRange = ParamRange::new(0.0, 1.0, 0.0);
/// Group bus output gain range (linear)
pub const GROUP_OUTPUT_GAIN: ParamRange = ParamRange::new(0.0, 2.0, 1.0);
/// Loudness target range (LUFS)
pub const TARGET_LUFS: ParamRange = ParamRange::new(-40.0, 0.0, -14.0);

/// Loudness reported before the first block is measured
pub const INITIAL_LUFS: f32 = -18.0;

pub const CHANNEL_EQ_BANDS: usize = 4;
pub const GROUP_EQ_BANDS: usize = 3;

/// `f32` stored as its bit pattern in an `AtomicU32`
#[derive(Debug)]
pub struct AtomicF32(AtomicU32);

impl AtomicF32 {
    pub fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    #[inline]
    pub fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

#[inline]
fn load_flag(flag: &AtomicBool) -> bool {
    flag.load(Ordering::Relaxed)
}

#[inline]
fn store_flag(flag: &AtomicBool, value: bool) {
    flag.store(value, Ordering::Relaxed);
}

// ─────────────────────────────────────────────────────────────────────────────
// Channel
// ─────────────────────────────────────────────────────────────────────────────

/// Plain copy of every channel field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelSettings {
    pub channel_type: ChannelType,
    pub trim_db: f32,
    pub gate_threshold_db: f32,
    pub gate_ratio: f32,
    pub gate_attack_ms: f32,
    pub gate_release_ms: f32,
    pub gate_enabled: bool,
    pub eq_gains_db: [f32; CHANNEL_EQ_BANDS],
    pub eq_enabled: bool,
    pub comp_threshold_db: f32,
    pub comp_ratio: f32,
    pub comp_attack_ms: f32,
    pub comp_release_ms: f32,
    pub comp_auto_makeup: bool,
    pub comp_enabled: bool,
    pub tuner_strength: f32,
    pub tuner_enabled: bool,
    pub fx_send: f32,
    pub mute: bool,
    pub solo: bool,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            channel_type: ChannelType::Other,
            trim_db: TRIM_DB.default,
            gate_threshold_db: gate::THRESHOLD_DB.default,
            gate_ratio: gate::RATIO.default,
            gate_attack_ms: gate::ATTACK_MS.default,
            gate_release_ms: gate::RELEASE_MS.default,
            gate_enabled: true,
            eq_gains_db: [0.0; CHANNEL_EQ_BANDS],
            eq_enabled: true,
            comp_threshold_db: compressor::THRESHOLD_DB.default,
            comp_ratio: compressor::RATIO.default,
            comp_attack_ms: compressor::ATTACK_MS.default,
            comp_release_ms: compressor::RELEASE_MS.default,
            comp_auto_makeup: true,
            comp_enabled: true,
            tuner_strength: pitch::STRENGTH.default,
            tuner_enabled: false,
            fx_send: FX_SEND.default,
            mute: false,
            solo: false,
        }
    }
}

/// Live parameters of one input channel
#[derive(Debug)]
pub struct ChannelParams {
    index: usize,
    channel_type: AtomicU8,
    trim_db: AtomicF32,
    gate_threshold_db: AtomicF32,
    gate_ratio: AtomicF32,
    gate_attack_ms: AtomicF32,
    gate_release_ms: AtomicF32,
    gate_enabled: AtomicBool,
    eq_gains_db: [AtomicF32; CHANNEL_EQ_BANDS],
    eq_enabled: AtomicBool,
    comp_threshold_db: AtomicF32,
    comp_ratio: AtomicF32,
    comp_attack_ms: AtomicF32,
    comp_release_ms: AtomicF32,
    comp_auto_makeup: AtomicBool,
    comp_enabled: AtomicBool,
    tuner_strength: AtomicF32,
    tuner_enabled: AtomicBool,
    fx_send: AtomicF32,
    mute: AtomicBool,
    solo: AtomicBool,
}

impl ChannelParams {
    /// Channel with the defaults for its position on the console
    pub fn new(index: usize) -> Self {
        let settings = ChannelSettings {
            channel_type: ChannelType::default_for_channel(index),
            ..ChannelSettings::default()
        };
        let params = Self {
            index,
            channel_type: AtomicU8::new(settings.channel_type as u8),
            trim_db: AtomicF32::new(0.0),
            gate_threshold_db: AtomicF32::new(0.0),
            gate_ratio: AtomicF32::new(0.0),
            gate_attack_ms: AtomicF32::new(0.0),
            gate_release_ms: AtomicF32::new(0.0),
            gate_enabled: AtomicBool::new(false),
            eq_gains_db: std::array::from_fn(|_| AtomicF32::new(0.0)),
            eq_enabled: AtomicBool::new(false),
            comp_threshold_db: AtomicF32::new(0.0),
            comp_ratio: AtomicF32::new(0.0),
            comp_attack_ms: AtomicF32::new(0.0),
            comp_release_ms: AtomicF32::new(0.0),
            comp_auto_makeup: AtomicBool::new(false),
            comp_enabled: AtomicBool::new(false),
            tuner_strength: AtomicF32::new(0.0),
            tuner_enabled: AtomicBool::new(false),
            fx_send: AtomicF32::new(0.0),
            mute: AtomicBool::new(false),
            solo: AtomicBool::new(false),
        };
        params.apply_settings(&settings);
        params
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn channel_type(&self) -> ChannelType {
        ChannelType::from_index(self.channel_type.load(Ordering::Relaxed) as usize).unwrap_or(ChannelType::Other)
    }

    pub fn set_channel_type(&self, channel_type: ChannelType) {
        self.channel_type.store(channel_type as u8, Ordering::Relaxed);
    }

    // Trim

    pub fn trim_db(&self) -> f32 {
        self.trim_db.load()
    }

    pub fn set_trim_db(&self, db: f32) {
        self.trim_db.store(TRIM_DB.clamp(db));
    }

    // Gate

    pub fn gate_threshold_db(&self) -> f32 {
        self.gate_threshold_db.load()
    }

    pub fn set_gate_threshold_db(&self, db: f32) {
        self.gate_threshold_db.store(gate::THRESHOLD_DB.clamp(db));
    }

    pub fn gate_ratio(&self) -> f32 {
        self.gate_ratio.load()
    }

    pub fn set_gate_ratio(&self, ratio: f32) {
        self.gate_ratio.store(gate::RATIO.clamp(ratio));
    }

    pub fn gate_attack_ms(&self) -> f32 {
        self.gate_attack_ms.load()
    }

    pub fn set_gate_attack_ms(&self, ms: f32) {
        self.gate_attack_ms.store(gate::ATTACK_MS.clamp(ms));
    }

    pub fn gate_release_ms(&self) -> f32 {
        self.gate_release_ms.load()
    }

    pub fn set_gate_release_ms(&self, ms: f32) {
        self.gate_release_ms.store(gate::RELEASE_MS.clamp(ms));
    }

    pub fn gate_enabled(&self) -> bool {
        load_flag(&self.gate_enabled)
    }

    pub fn set_gate_enabled(&self, enabled: bool) {
        store_flag(&self.gate_enabled, enabled);
    }

    // EQ

    /// Gain of one EQ band (0 = low shelf .. 3 = high shelf); `None` for a bad band index
    pub fn eq_gain(&self, band: usize) -> Option<f32> {
        self.eq_gains_db.get(band).map(AtomicF32::load)
    }

    /// Set one EQ band gain; out-of-range band indices are ignored
    pub fn set_eq_gain(&self, band: usize, db: f32) {
        if let Some(gain) = self.eq_gains_db.get(band) {
            gain.store(BAND_GAIN_DB.clamp(db));
        }
    }

    pub fn eq_gains(&self) -> [f32; CHANNEL_EQ_BANDS] {
        std::array::from_fn(|band| self.eq_gains_db[band].load())
    }

    pub fn set_eq_gains(&self, gains_db: [f32; CHANNEL_EQ_BANDS]) {
        for (band, db) in gains_db.into_iter().enumerate() {
            self.set_eq_gain(band, db);
        }
    }

    pub fn eq_enabled(&self) -> bool {
        load_flag(&self.eq_enabled)
    }

    pub fn set_eq_enabled(&self, enabled: bool) {
        store_flag(&self.eq_enabled, enabled);
    }

    // Compressor

    pub fn comp_threshold_db(&self) -> f32 {
        self.comp_threshold_db.load()
    }

    pub fn set_comp_threshold_db(&self, db: f32) {
        self.comp_threshold_db.store(compressor::THRESHOLD_DB.clamp(db));
    }

    pub fn comp_ratio(&self) -> f32 {
        self.comp_ratio.load()
    }

    pub fn set_comp_ratio(&self, ratio: f32) {
        self.comp_ratio.store(compressor::RATIO.clamp(ratio));
    }

    pub fn comp_attack_ms(&self) -> f32 {
        self.comp_attack_ms.load()
    }

    pub fn set_comp_attack_ms(&self, ms: f32) {
        self.comp_attack_ms.store(compressor::ATTACK_MS.clamp(ms));
    }

    pub fn comp_release_ms(&self) -> f32 {
        self.comp_release_ms.load()
    }

    pub fn set_comp_release_ms(&self, ms: f32) {
        self.comp_release_ms.store(compressor::RELEASE_MS.clamp(ms));
    }

    pub fn comp_auto_makeup(&self) -> bool {
        load_flag(&self.comp_auto_makeup)
    }

    pub fn set_comp_auto_makeup(&self, enabled: bool) {
        store_flag(&self.comp_auto_makeup, enabled);
    }

    pub fn comp_enabled(&self) -> bool {
        load_flag(&self.comp_enabled)
    }

    pub fn set_comp_enabled(&self, enabled: bool) {
        store_flag(&self.comp_enabled, enabled);
    }

    // Pitch correction

    pub fn tuner_strength(&self) -> f32 {
        self.tuner_strength.load()
    }

    pub fn set_tuner_strength(&self, strength: f32) {
        self.tuner_strength.store(pitch::STRENGTH.clamp(strength));
    }

    pub fn tuner_enabled(&self) -> bool {
        load_flag(&self.tuner_enabled)
    }

    pub fn set_tuner_enabled(&self, enabled: bool) {
        store_flag(&self.tuner_enabled, enabled);
    }

    // Send, mute, solo

    pub fn fx_send(&self) -> f32 {
        self.fx_send.load()
    }

    pub fn set_fx_send(&self, level: f32) {
        self.fx_send.store(FX_SEND.clamp(level));
    }

    pub fn mute(&self) -> bool {
        load_flag(&self.mute)
    }

    pub fn set_mute(&self, mute: bool) {
        store_flag(&self.mute, mute);
    }

    pub fn solo(&self) -> bool {
        load_flag(&self.solo)
    }

    pub fn set_solo(&self, solo: bool) {
        store_flag(&self.solo, solo);
    }

    pub fn settings(&self) -> ChannelSettings {
        ChannelSettings {
            channel_type: self.channel_type(),
            trim_db: self.trim_db(),
            gate_threshold_db: self.gate_threshold_db(),
            gate_ratio: self.gate_ratio(),
            gate_attack_ms: self.gate_attack_ms(),
            gate_release_ms: self.gate_release_ms(),
            gate_enabled: self.gate_enabled(),
            eq_gains_db: self.eq_gains(),
            eq_enabled: self.eq_enabled(),
            comp_threshold_db: self.comp_threshold_db(),
            comp_ratio: self.comp_ratio(),
            comp_attack_ms: self.comp_attack_ms(),
            comp_release_ms: self.comp_release_ms(),
            comp_auto_makeup: self.comp_auto_makeup(),
            comp_enabled: self.comp_enabled(),
            tuner_strength: self.tuner_strength(),
            tuner_enabled: self.tuner_enabled(),
            fx_send: self.fx_send(),
            mute: self.mute(),
            solo: self.solo(),
        }
    }

    /// Write every field through its clamping setter
    pub fn apply_settings(&self, s: &ChannelSettings) {
        self.set_channel_type(s.channel_type);
        self.set_trim_db(s.trim_db);
        self.set_gate_threshold_db(s.gate_threshold_db);
        self.set_gate_ratio(s.gate_ratio);
        self.set_gate_attack_ms(s.gate_attack_ms);
        self.set_gate_release_ms(s.gate_release_ms);
        self.set_gate_enabled(s.gate_enabled);
        self.set_eq_gains(s.eq_gains_db);
        self.set_eq_enabled(s.eq_enabled);
        self.set_comp_threshold_db(s.comp_threshold_db);
        self.set_comp_ratio(s.comp_ratio);
        self.set_comp_attack_ms(s.comp_attack_ms);
        self.set_comp_release_ms(s.comp_release_ms);
        self.set_comp_auto_makeup(s.comp_auto_makeup);
        self.set_comp_enabled(s.comp_enabled);
        self.set_tuner_strength(s.tuner_strength);
        self.set_tuner_enabled(s.tuner_enabled);
        self.set_fx_send(s.fx_send);
        self.set_mute(s.mute);
        self.set_solo(s.solo);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Group bus
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupBusSettings {
    pub eq_gains_db: [f32; GROUP_EQ_BANDS],
    pub eq_enabled: bool,
    pub comp_enabled: bool,
    pub output_gain: f32,
}

impl Default for GroupBusSettings {
    fn default() -> Self {
        Self {
            eq_gains_db: [0.0; GROUP_EQ_BANDS],
            eq_enabled: true,
            comp_enabled: true,
            output_gain: GROUP_OUTPUT_GAIN.default,
        }
    }
}

/// Live parameters of one group bus
#[derive(Debug)]
pub struct GroupBusParams {
    bus_type: GroupBusType,
    eq_gains_db: [AtomicF32; GROUP_EQ_BANDS],
    eq_enabled: AtomicBool,
    comp_enabled: AtomicBool,
    output_gain: AtomicF32,
    /// Written by the audio thread
    gain_reduction_db: AtomicF32,
}

impl GroupBusParams {
    pub fn new(bus_type: GroupBusType) -> Self {
        let defaults = GroupBusSettings::default();
        Self {
            bus_type,
            eq_gains_db: std::array::from_fn(|_| AtomicF32::new(0.0)),
            eq_enabled: AtomicBool::new(defaults.eq_enabled),
            comp_enabled: AtomicBool::new(defaults.comp_enabled),
            output_gain: AtomicF32::new(defaults.output_gain),
            gain_reduction_db: AtomicF32::new(0.0),
        }
    }

    pub fn bus_type(&self) -> GroupBusType {
        self.bus_type
    }

    pub fn name(&self) -> &'static str {
        self.bus_type.name()
    }

    pub fn eq_gain(&self, band: usize) -> Option<f32> {
        self.eq_gains_db.get(band).map(AtomicF32::load)
    }

    pub fn set_eq_gain(&self, band: usize, db: f32) {
        if let Some(gain) = self.eq_gains_db.get(band) {
            gain.store(BAND_GAIN_DB.clamp(db));
        }
    }

    pub fn eq_gains(&self) -> [f32; GROUP_EQ_BANDS] {
        std::array::from_fn(|band| self.eq_gains_db[band].load())
    }

    pub fn eq_enabled(&self) -> bool {
        load_flag(&self.eq_enabled)
    }

    pub fn set_eq_enabled(&self, enabled: bool) {
        store_flag(&self.eq_enabled, enabled);
    }

    pub fn comp_enabled(&self) -> bool {
        load_flag(&self.comp_enabled)
    }

    pub fn set_comp_enabled(&self, enabled: bool) {
        store_flag(&self.comp_enabled, enabled);
    }

    pub fn output_gain(&self) -> f32 {
        self.output_gain.load()
    }

    pub fn set_output_gain(&self, gain: f32) {
        self.output_gain.store(GROUP_OUTPUT_GAIN.clamp(gain));
    }

    /// Glue compressor reduction during the last block (dB)
    pub fn gain_reduction_db(&self) -> f32 {
        self.gain_reduction_db.load()
    }

    pub(crate) fn report_gain_reduction(&self, db: f32) {
        self.gain_reduction_db.store(db);
    }

    pub fn settings(&self) -> GroupBusSettings {
        GroupBusSettings {
            eq_gains_db: self.eq_gains(),
            eq_enabled: self.eq_enabled(),
            comp_enabled: self.comp_enabled(),
            output_gain: self.output_gain(),
        }
    }

    pub fn apply_settings(&self, s: &GroupBusSettings) {
        for (band, db) in s.eq_gains_db.iter().enumerate() {
            self.set_eq_gain(band, *db);
        }
        self.set_eq_enabled(s.eq_enabled);
        self.set_comp_enabled(s.comp_enabled);
        self.set_output_gain(s.output_gain);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Effect-send bus
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FxBusSettings {
    pub reverb_room_size: f32,
    pub reverb_damping: f32,
    pub reverb_width: f32,
    pub reverb_wet: f32,
    pub reverb_enabled: bool,
    pub delay_time_ms: f32,
    pub delay_feedback: f32,
    pub delay_wet: f32,
    pub delay_enabled: bool,
    pub bypass: bool,
}

impl Default for FxBusSettings {
    fn default() -> Self {
        Self {
            reverb_room_size: reverb::ROOM_SIZE.default,
            reverb_damping: reverb::DAMPING.default,
            reverb_width: reverb::WIDTH.default,
            reverb_wet: reverb::WET.default,
            reverb_enabled: true,
            delay_time_ms: delay::TIME_MS.default,
            delay_feedback: delay::FEEDBACK.default,
            delay_wet: delay::WET.default,
            delay_enabled: true,
            bypass: false,
        }
    }
}

/// Live parameters of one effect-send bus
#[derive(Debug)]
pub struct FxBusParams {
    bus_type: FxBusType,
    reverb_room_size: AtomicF32,
    reverb_damping: AtomicF32,
    reverb_width: AtomicF32,
    reverb_wet: AtomicF32,
    reverb_enabled: AtomicBool,
    delay_time_ms: AtomicF32,
    delay_feedback: AtomicF32,
    delay_wet: AtomicF32,
    delay_enabled: AtomicBool,
    bypass: AtomicBool,
}

impl FxBusParams {
    pub fn new(bus_type: FxBusType) -> Self {
        let d = FxBusSettings::default();
        Self {
            bus_type,
            reverb_room_size: AtomicF32::new(d.reverb_room_size),
            reverb_damping: AtomicF32::new(d.reverb_damping),
            reverb_width: AtomicF32::new(d.reverb_width),
            reverb_wet: AtomicF32::new(d.reverb_wet),
            reverb_enabled: AtomicBool::new(d.reverb_enabled),
            delay_time_ms: AtomicF32::new(d.delay_time_ms),
            delay_feedback: AtomicF32::new(d.delay_feedback),
            delay_wet: AtomicF32::new(d.delay_wet),
            delay_enabled: AtomicBool::new(d.delay_enabled),
            bypass: AtomicBool::new(d.bypass),
        }
    }

    pub fn bus_type(&self) -> FxBusType {
        self.bus_type
    }

    pub fn name(&self) -> &'static str {
        self.bus_type.name()
    }

    pub fn reverb_room_size(&self) -> f32 {
        self.reverb_room_size.load()
    }

    pub fn set_reverb_room_size(&self, value: f32) {
        self.reverb_room_size.store(reverb::ROOM_SIZE.clamp(value));
    }

    pub fn reverb_damping(&self) -> f32 {
        self.reverb_damping.load()
    }

    pub fn set_reverb_damping(&self, value: f32) {
        self.reverb_damping.store(reverb::DAMPING.clamp(value));
    }

    pub fn reverb_width(&self) -> f32 {
        self.reverb_width.load()
    }

    pub fn set_reverb_width(&self, value: f32) {
        self.reverb_width.store(reverb::WIDTH.clamp(value));
    }

    pub fn reverb_wet(&self) -> f32 {
        self.reverb_wet.load()
    }

    pub fn set_reverb_wet(&self, value: f32) {
        self.reverb_wet.store(reverb::WET.clamp(value));
    }

    pub fn reverb_enabled(&self) -> bool {
        load_flag(&self.reverb_enabled)
    }

    pub fn set_reverb_enabled(&self, enabled: bool) {
        store_flag(&self.reverb_enabled, enabled);
    }

    pub fn delay_time_ms(&self) -> f32 {
        self.delay_time_ms.load()
    }

    pub fn set_delay_time_ms(&self, ms: f32) {
        self.delay_time_ms.store(delay::TIME_MS.clamp(ms));
    }

    pub fn delay_feedback(&self) -> f32 {
        self.delay_feedback.load()
    }

    pub fn set_delay_feedback(&self, value: f32) {
        self.delay_feedback.store(delay::FEEDBACK.clamp(value));
    }

    pub fn delay_wet(&self) -> f32 {
        self.delay_wet.load()
    }

    pub fn set_delay_wet(&self, value: f32) {
        self.delay_wet.store(delay::WET.clamp(value));
    }

    pub fn delay_enabled(&self) -> bool {
        load_flag(&self.delay_enabled)
    }

    pub fn set_delay_enabled(&self, enabled: bool) {
        store_flag(&self.delay_enabled, enabled);
    }

    /// Whole-bus bypass (both stages skipped)
    pub fn bypass(&self) -> bool {
        load_flag(&self.bypass)
    }

    pub fn set_bypass(&self, bypass: bool) {
        store_flag(&self.bypass, bypass);
    }

    pub fn settings(&self) -> FxBusSettings {
        FxBusSettings {
            reverb_room_size: self.reverb_room_size(),
            reverb_damping: self.reverb_damping(),
            reverb_width: self.reverb_width(),
            reverb_wet: self.reverb_wet(),
            reverb_enabled: self.reverb_enabled(),
            delay_time_ms: self.delay_time_ms(),
            delay_feedback: self.delay_feedback(),
            delay_wet: self.delay_wet(),
            delay_enabled: self.delay_enabled(),
            bypass: self.bypass(),
        }
    }

    pub fn apply_settings(&self, s: &FxBusSettings) {
        self.set_reverb_room_size(s.reverb_room_size);
        self.set_reverb_damping(s.reverb_damping);
        self.set_reverb_width(s.reverb_width);
        self.set_reverb_wet(s.reverb_wet);
        self.set_reverb_enabled(s.reverb_enabled);
        self.set_delay_time_ms(s.delay_time_ms);
        self.set_delay_feedback(s.delay_feedback);
        self.set_delay_wet(s.delay_wet);
        self.set_delay_enabled(s.delay_enabled);
        self.set_bypass(s.bypass);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Master bus
// ─────────────────────────────────────────────────────────────────────────────

/// Named loudness delivery targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum StreamTarget {
    #[default]
    YouTube = 0,
    Facebook = 1,
    Custom = 2,
}

impl StreamTarget {
    pub const ALL: [StreamTarget; 3] = [StreamTarget::YouTube, StreamTarget::Facebook, StreamTarget::Custom];

    /// Fixed loudness of a named target (`None` for Custom)
    pub fn target_lufs(&self) -> Option<f32> {
        match self {
            StreamTarget::YouTube => Some(-14.0),
            StreamTarget::Facebook => Some(-16.0),
            StreamTarget::Custom => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            StreamTarget::YouTube => "YouTube",
            StreamTarget::Facebook => "Facebook",
            StreamTarget::Custom => "Custom",
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => StreamTarget::YouTube,
            1 => StreamTarget::Facebook,
            _ => StreamTarget::Custom,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MasterSettings {
    pub stream_target: StreamTarget,
    pub target_lufs: f32,
    pub compressor_enabled: bool,
    pub limiter_enabled: bool,
    pub ceiling_db: f32,
}

impl Default for MasterSettings {
    fn default() -> Self {
        Self {
            stream_target: StreamTarget::YouTube,
            target_lufs: TARGET_LUFS.default,
            compressor_enabled: true,
            limiter_enabled: true,
            ceiling_db: limiter::CEILING_DB.default,
        }
    }
}

/// Live parameters and meters of the master bus
#[derive(Debug)]
pub struct MasterParams {
    stream_target: AtomicU8,
    target_lufs: AtomicF32,
    compressor_enabled: AtomicBool,
    limiter_enabled: AtomicBool,
    ceiling_db: AtomicF32,
    /// Written by the audio thread
    current_lufs: AtomicF32,
    limiter_reduction_db: AtomicF32,
}

impl MasterParams {
    pub fn new() -> Self {
        let d = MasterSettings::default();
        Self {
            stream_target: AtomicU8::new(d.stream_target as u8),
            target_lufs: AtomicF32::new(d.target_lufs),
            compressor_enabled: AtomicBool::new(d.compressor_enabled),
            limiter_enabled: AtomicBool::new(d.limiter_enabled),
            ceiling_db: AtomicF32::new(d.ceiling_db),
            current_lufs: AtomicF32::new(INITIAL_LUFS),
            limiter_reduction_db: AtomicF32::new(0.0),
        }
    }

    pub fn stream_target(&self) -> StreamTarget {
        StreamTarget::from_u8(self.stream_target.load(Ordering::Relaxed))
    }

    /// Select a target; named targets also set the target loudness
    pub fn set_stream_target(&self, target: StreamTarget) {
        self.stream_target.store(target as u8, Ordering::Relaxed);
        if let Some(lufs) = target.target_lufs() {
            self.target_lufs.store(lufs);
        }
    }

    pub fn target_lufs(&self) -> f32 {
        self.target_lufs.load()
    }

    /// Set the target loudness
    ///
    /// A value that differs from the selected named target switches the
    /// selection to [`StreamTarget::Custom`].
    pub fn set_target_lufs(&self, lufs: f32) {
        let lufs = TARGET_LUFS.clamp(lufs);
        if self.stream_target().target_lufs() != Some(lufs) {
            self.stream_target.store(StreamTarget::Custom as u8, Ordering::Relaxed);
        }
        self.target_lufs.store(lufs);
    }

    pub fn compressor_enabled(&self) -> bool {
        load_flag(&self.compressor_enabled)
    }

    pub fn set_compressor_enabled(&self, enabled: bool) {
        store_flag(&self.compressor_enabled, enabled);
    }

    pub fn limiter_enabled(&self) -> bool {
        load_flag(&self.limiter_enabled)
    }

    pub fn set_limiter_enabled(&self, enabled: bool) {
        store_flag(&self.limiter_enabled, enabled);
    }

    pub fn ceiling_db(&self) -> f32 {
        self.ceiling_db.load()
    }

    pub fn set_ceiling_db(&self, db: f32) {
        self.ceiling_db.store(limiter::CEILING_DB.clamp(db));
    }

    /// Loudness of the last processed block (LUFS, read-only)
    pub fn current_lufs(&self) -> f32 {
        self.current_lufs.load()
    }

    pub fn limiter_reduction_db(&self) -> f32 {
        self.limiter_reduction_db.load()
    }

    pub(crate) fn report_meters(&self, lufs: f32, limiter_reduction_db: f32) {
        self.current_lufs.store(lufs);
        self.limiter_reduction_db.store(limiter_reduction_db);
    }

    pub fn settings(&self) -> MasterSettings {
        MasterSettings {
            stream_target: self.stream_target(),
            target_lufs: self.target_lufs(),
            compressor_enabled: self.compressor_enabled(),
            limiter_enabled: self.limiter_enabled(),
            ceiling_db: self.ceiling_db(),
        }
    }

    pub fn apply_settings(&self, s: &MasterSettings) {
        self.stream_target.store(s.stream_target as u8, Ordering::Relaxed);
        self.target_lufs.store(TARGET_LUFS.clamp(s.target_lufs));
        if let Some(lufs) = s.stream_target.target_lufs() {
            self.target_lufs.store(lufs);
        }
        self.set_compressor_enabled(s.compressor_enabled);
        self.set_limiter_enabled(s.limiter_enabled);
        self.set_ceiling_db(s.ceiling_db);
    }
}

impl Default for MasterParams {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Test tone
// ─────────────────────────────────────────────────────────────────────────────

pub const TEST_TONE_FREQUENCY_HZ: ParamRange = ParamRange::new(20.0, 20000.0, 60.0);
pub const TEST_TONE_AMPLITUDE: ParamRange = ParamRange::new(0.0, 1.0, 0.5);

/// Diagnostic sine that replaces channel 0's input while enabled
#[derive(Debug)]
pub struct TestToneParams {
    enabled: AtomicBool,
    frequency_hz: AtomicF32,
    amplitude: AtomicF32,
}

impl TestToneParams {
    pub fn new() -> Self {
        Self {
            enabled: AtomicBool::new(false),
            frequency_hz: AtomicF32::new(TEST_TONE_FREQUENCY_HZ.default),
            amplitude: AtomicF32::new(TEST_TONE_AMPLITUDE.default),
        }
    }

    pub fn enabled(&self) -> bool {
        load_flag(&self.enabled)
    }

    pub fn set_enabled(&self, enabled: bool) {
        store_flag(&self.enabled, enabled);
    }

    pub fn frequency_hz(&self) -> f32 {
        self.frequency_hz.load()
    }

    pub fn set_frequency_hz(&self, hz: f32) {
        self.frequency_hz.store(TEST_TONE_FREQUENCY_HZ.clamp(hz));
    }

    pub fn amplitude(&self) -> f32 {
        self.amplitude.load()
    }

    pub fn set_amplitude(&self, amplitude: f32) {
        self.amplitude.store(TEST_TONE_AMPLITUDE.clamp(amplitude));
    }
}

impl Default for TestToneParams {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atomic_f32_roundtrip() {
        let value = AtomicF32::new(-3.25);
        assert_eq!(value.load(), -3.25);
        value.store(f32::MIN_POSITIVE);
        assert_eq!(value.load(), f32::MIN_POSITIVE);
    }

    #[test]
    fn test_channel_defaults_follow_position() {
        assert_eq!(ChannelParams::new(0).channel_type(), ChannelType::Vocal);
        assert_eq!(ChannelParams::new(12).channel_type(), ChannelType::Instrument);
        assert_eq!(ChannelParams::new(31).channel_type(), ChannelType::Drums);

        let ch = ChannelParams::new(3);
        assert_eq!(ch.gate_threshold_db(), -50.0);
        assert_eq!(ch.gate_ratio(), 2.0);
        assert_eq!(ch.comp_threshold_db(), -18.0);
        assert_eq!(ch.comp_ratio(), 3.0);
        assert!(ch.gate_enabled() && ch.eq_enabled() && ch.comp_enabled());
        assert!(ch.comp_auto_makeup());
        assert!(!ch.tuner_enabled());
        assert_eq!(ch.tuner_strength(), 0.5);
        assert_eq!(ch.fx_send(), 0.0);
    }

    #[test]
    fn test_channel_setters_clamp_to_boundaries() {
        let ch = ChannelParams::new(0);
        ch.set_trim_db(999.0);
        assert_eq!(ch.trim_db(), 24.0);
        ch.set_trim_db(-999.0);
        assert_eq!(ch.trim_db(), -24.0);

        ch.set_gate_threshold_db(10.0);
        assert_eq!(ch.gate_threshold_db(), 0.0);
        ch.set_gate_ratio(0.5);
        assert_eq!(ch.gate_ratio(), 1.0);
        ch.set_gate_attack_ms(1000.0);
        assert_eq!(ch.gate_attack_ms(), 100.0);
        ch.set_gate_release_ms(0.0);
        assert_eq!(ch.gate_release_ms(), 5.0);

        ch.set_eq_gain(2, 30.0);
        assert_eq!(ch.eq_gain(2), Some(12.0));
        ch.set_eq_gain(0, -30.0);
        assert_eq!(ch.eq_gain(0), Some(-12.0));
        ch.set_eq_gain(7, 3.0);
        assert_eq!(ch.eq_gain(7), None);

        ch.set_comp_threshold_db(-90.0);
        assert_eq!(ch.comp_threshold_db(), -60.0);
        ch.set_comp_ratio(100.0);
        assert_eq!(ch.comp_ratio(), 20.0);
        ch.set_comp_attack_ms(-1.0);
        assert_eq!(ch.comp_attack_ms(), 0.1);
        ch.set_comp_release_ms(1e6);
        assert_eq!(ch.comp_release_ms(), 2000.0);

        ch.set_tuner_strength(1.5);
        assert_eq!(ch.tuner_strength(), 1.0);
        ch.set_fx_send(-0.2);
        assert_eq!(ch.fx_send(), 0.0);
        ch.set_fx_send(3.0);
        assert_eq!(ch.fx_send(), 1.0);
    }

    #[test]
    fn test_channel_settings_restore_exactly() {
        let ch = ChannelParams::new(5);
        let before = ch.settings();

        ch.set_channel_type(ChannelType::Drums);
        ch.set_trim_db(7.5);
        ch.set_eq_gains([1.0, -2.0, 3.0, -4.0]);
        ch.set_comp_enabled(false);
        ch.set_solo(true);
        assert_ne!(ch.settings(), before);

        ch.apply_settings(&before);
        assert_eq!(ch.settings(), before);
    }

    #[test]
    fn test_bus_setters_clamp() {
        let group = GroupBusParams::new(GroupBusType::Drums);
        group.set_output_gain(5.0);
        assert_eq!(group.output_gain(), 2.0);
        group.set_eq_gain(1, -20.0);
        assert_eq!(group.eq_gain(1), Some(-12.0));
        assert_eq!(group.name(), "Drums");

        let fx = FxBusParams::new(FxBusType::VocalFx);
        fx.set_delay_time_ms(9000.0);
        assert_eq!(fx.delay_time_ms(), 2000.0);
        fx.set_delay_feedback(1.0);
        assert_eq!(fx.delay_feedback(), 0.9);
        fx.set_reverb_wet(-1.0);
        assert_eq!(fx.reverb_wet(), 0.0);
        assert_eq!(fx.reverb_room_size(), 0.5);
        assert_eq!(fx.name(), "Vocal FX");
    }

    #[test]
    fn test_stream_target_sets_loudness() {
        let master = MasterParams::new();
        assert_eq!(master.current_lufs(), -18.0);
        assert_eq!(master.target_lufs(), -14.0);

        master.set_stream_target(StreamTarget::Facebook);
        assert_eq!(master.target_lufs(), -16.0);

        // Custom keeps whatever was there and is freely settable
        master.set_stream_target(StreamTarget::Custom);
        assert_eq!(master.target_lufs(), -16.0);
        master.set_target_lufs(-23.0);
        assert_eq!(master.target_lufs(), -23.0);
        assert_eq!(master.stream_target(), StreamTarget::Custom);

        master.set_stream_target(StreamTarget::YouTube);
        master.set_target_lufs(-9.0);
        assert_eq!(master.stream_target(), StreamTarget::Custom);

        master.set_ceiling_db(4.0);
        assert_eq!(master.ceiling_db(), 0.0);
    }
}
