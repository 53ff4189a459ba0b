//! Background soundcheck run
//!
//! ```text
//!            start_check                 all channels done
//!   Idle ───────────────▶ Analysing ───────────────────▶ Finished
//!    ▲                        │ stop_check                   │
//!    │                        ▼                              │
//!    └──── apply / revert ─ Cancelled ◀─────────────────────-┘
//! ```
//!
//! A run walks the enabled channels in index order. For each one the worker
//! resets the capture ring, polls until enough samples have arrived, then
//! measures, classifies and computes corrections. Cancellation is observed
//! at the next poll.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use basedrop::Shared;
use crossbeam::channel::{bounded, RecvTimeoutError, Sender};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::analysis::{measure_levels, LevelStats, SpectrumAnalyzer};
use super::capture::{capture_slot, CaptureBuffer, CaptureSlot, CaptureTap};
use super::classify::{classify, compute_corrections, Corrections};
use super::profiles::{profile_for, ToneProfileKind, BAND_FLOOR_DB, NUM_BANDS};
use crate::config::SoundcheckConfig;
use crate::engine::{gc_handle, ChannelParams, ChannelSettings, MixerHandle};
use crate::types::{ChannelType, SAMPLE_RATE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum SoundcheckState {
    Idle = 0,
    Analysing = 1,
    Finished = 2,
    /// Stopped before every channel was analysed
    Cancelled = 3,
}

impl SoundcheckState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => SoundcheckState::Analysing,
            2 => SoundcheckState::Finished,
            3 => SoundcheckState::Cancelled,
            _ => SoundcheckState::Idle,
        }
    }

    /// Finished or cancelled: results can be applied
    pub fn is_finished(&self) -> bool {
        matches!(self, SoundcheckState::Finished | SoundcheckState::Cancelled)
    }
}

#[derive(Error, Debug)]
pub enum SoundcheckError {
    #[error("Soundcheck has no results to apply (state: {state:?})")]
    NotFinished { state: SoundcheckState },

    #[error("Failed to spawn soundcheck thread: {0}")]
    ThreadSpawn(#[from] std::io::Error),
}

/// Measurements and suggestions for one channel
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelAnalysis {
    pub channel: usize,
    /// Set once the channel has been measured in the current run
    pub analysed: bool,
    pub levels: LevelStats,
    pub bands_db: [f32; NUM_BANDS],
    pub suggested_profile: ToneProfileKind,
    pub suggested_type: ChannelType,
    pub corrections: Corrections,
    /// Live settings captured just before analysis, for revert
    pub original: ChannelSettings,
}

impl ChannelAnalysis {
    fn empty(channel: usize) -> Self {
        Self {
            channel,
            analysed: false,
            levels: LevelStats::default(),
            bands_db: [BAND_FLOOR_DB; NUM_BANDS],
            suggested_profile: ToneProfileKind::Other,
            suggested_type: ChannelType::Other,
            corrections: Corrections::default(),
            original: ChannelSettings::default(),
        }
    }

    /// Measure a captured window and derive suggestions
    ///
    /// Corrections are taken against the winning profile's reference.
    pub fn from_capture(
        channel: usize,
        left: &[f32],
        right: &[f32],
        analyzer: &mut SpectrumAnalyzer,
        original: ChannelSettings,
    ) -> Self {
        let levels = measure_levels(left, right);
        let bands_db = analyzer.band_profile(left, right);
        let suggested_profile = classify(&bands_db);
        let corrections = compute_corrections(&levels, &bands_db, profile_for(suggested_profile));
        Self {
            channel,
            analysed: true,
            levels,
            bands_db,
            suggested_profile,
            suggested_type: suggested_profile.channel_type(),
            corrections,
            original,
        }
    }
}

/// State shared between the control side and the worker thread
struct RunState {
    state: AtomicU8,
    analyses: Mutex<Vec<ChannelAnalysis>>,
}

impl RunState {
    fn state(&self) -> SoundcheckState {
        SoundcheckState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: SoundcheckState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Move `from` → `to`; false if the state had already changed
    fn transition(&self, from: SoundcheckState, to: SoundcheckState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn analyses(&self) -> MutexGuard<'_, Vec<ChannelAnalysis>> {
        // A panicking worker leaves the data itself intact
        self.analyses.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

pub struct SoundcheckEngine {
    mixer: MixerHandle,
    config: SoundcheckConfig,
    sample_rate: f32,
    capture: CaptureSlot,
    shared: Arc<RunState>,
    cancel: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl SoundcheckEngine {
    pub fn new(mixer: MixerHandle, config: SoundcheckConfig) -> Self {
        let capacity = capture_frames(&config, SAMPLE_RATE as f32);
        let analyses = (0..mixer.num_channels()).map(ChannelAnalysis::empty).collect();
        Self {
            mixer,
            config,
            sample_rate: SAMPLE_RATE as f32,
            capture: capture_slot(capacity),
            shared: Arc::new(RunState {
                state: AtomicU8::new(SoundcheckState::Idle as u8),
                analyses: Mutex::new(analyses),
            }),
            cancel: None,
            worker: None,
        }
    }

    /// Real-time tap to call from the device input callback
    pub fn capture_tap(&self) -> CaptureTap {
        CaptureTap::new(self.capture.clone(), self.mixer.routing_arc())
    }

    /// Rate of the captured input; takes effect on the next run
    ///
    /// The capture ring is resized to hold `capture_seconds` at this rate
    /// when the next run starts. Taps already handed out follow the new ring.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
    }

    /// Frames the capture ring currently holds
    pub fn capture_capacity(&self) -> usize {
        self.capture.get().capacity()
    }

    /// Reallocate the ring if it was sized for another rate
    ///
    /// Only called while no worker holds the ring.
    fn fit_capture_to_rate(&self) {
        let capacity = capture_frames(&self.config, self.sample_rate);
        if self.capture_capacity() != capacity {
            self.capture.set(Shared::new(&gc_handle(), CaptureBuffer::new(capacity)));
            log::debug!(
                "Soundcheck capture ring resized to {} frames ({} s at {} Hz)",
                capacity,
                self.config.capture_seconds.max(1),
                self.sample_rate
            );
        }
    }

    pub fn state(&self) -> SoundcheckState {
        self.shared.state()
    }

    pub fn is_running(&self) -> bool {
        self.state() == SoundcheckState::Analysing
    }

    /// Channels measured in the current (or last) run
    pub fn channels_analysed(&self) -> usize {
        self.shared.analyses().iter().filter(|a| a.analysed).count()
    }

    /// Results for a channel, `None` for an invalid index
    pub fn analysis(&self, channel: usize) -> Option<ChannelAnalysis> {
        self.shared.analyses().get(channel).cloned()
    }

    /// Start a run in the background
    ///
    /// Does nothing if a run is already active.
    pub fn start_check(&mut self, seconds_per_channel: u32) -> Result<(), SoundcheckError> {
        if self.is_running() {
            log::debug!("Soundcheck already running, start ignored");
            return Ok(());
        }
        // A cancelled worker may still be finishing its current channel
        self.join_worker();
        self.shared.set_state(SoundcheckState::Analysing);

        for (channel, analysis) in self.shared.analyses().iter_mut().enumerate() {
            *analysis = ChannelAnalysis::empty(channel);
        }

        self.fit_capture_to_rate();
        let capture = self.capture.get();
        let target = seconds_per_channel as usize * self.sample_rate as usize;
        if target > capture.capacity() {
            log::warn!(
                "Soundcheck: {} s per channel exceeds the {} frame capture buffer ({:.1} s at {} Hz), clamping",
                seconds_per_channel,
                capture.capacity(),
                capture.capacity() as f32 / self.sample_rate,
                self.sample_rate
            );
        }

        let (cancel_tx, cancel_rx) = bounded::<()>(1);
        let worker = Worker {
            mixer: self.mixer.clone(),
            capture,
            shared: self.shared.clone(),
            target,
            poll_interval: Duration::from_millis(self.config.poll_interval_ms.max(1)),
            time_budget: Duration::from_secs(self.config.time_budget_secs),
            sample_rate: self.sample_rate,
        };

        let spawned = std::thread::Builder::new()
            .name("soundcheck".into())
            .spawn(move || worker.run(cancel_rx));
        match spawned {
            Ok(handle) => {
                self.worker = Some(handle);
                self.cancel = Some(cancel_tx);
                log::info!(
                    "Soundcheck started: {} channels, {} s each",
                    self.mixer.num_channels(),
                    seconds_per_channel
                );
                Ok(())
            }
            Err(e) => {
                self.shared.set_state(SoundcheckState::Idle);
                Err(SoundcheckError::ThreadSpawn(e))
            }
        }
    }

    /// Cancel an active run
    ///
    /// The state becomes `Cancelled` immediately. The worker exits at its
    /// next capture poll.
    pub fn stop_check(&mut self) {
        if !self.shared.transition(SoundcheckState::Analysing, SoundcheckState::Cancelled) {
            return;
        }
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.try_send(());
        }
        self.capture.get().stop();
        log::info!("Soundcheck stopped after {} channels", self.channels_analysed());
    }

    /// Write every analysed channel's suggestions into the live mixer
    ///
    /// Valid after the run finished or was cancelled. Returns the number of
    /// channels changed.
    pub fn apply_corrections(&mut self) -> Result<usize, SoundcheckError> {
        let state = self.state();
        if !state.is_finished() {
            return Err(SoundcheckError::NotFinished { state });
        }

        let mut applied = 0;
        for analysis in self.shared.analyses().iter().filter(|a| a.analysed) {
            let Some(channel) = self.mixer.channel(analysis.channel) else {
                continue;
            };
            let c = &analysis.corrections;
            channel.set_channel_type(analysis.suggested_type);
            channel.set_trim_db(c.trim_db);
            channel.set_gate_threshold_db(c.gate_threshold_db);
            channel.set_gate_enabled(true);
            channel.set_eq_gains(c.eq_gains_db);
            channel.set_eq_enabled(true);
            channel.set_comp_ratio(c.comp_ratio);
            channel.set_comp_enabled(c.comp_ratio > 1.0);

            log::info!(
                "Channel {} -> {} (trim {:.1} dB, gate {:.1} dB, comp {:.1}:1)",
                analysis.channel,
                analysis.suggested_type.name(),
                c.trim_db,
                c.gate_threshold_db,
                c.comp_ratio
            );
            applied += 1;
        }

        self.shared.set_state(SoundcheckState::Idle);
        Ok(applied)
    }

    /// Restore the parameters [`Self::apply_corrections`] writes to their
    /// pre-analysis values
    ///
    /// Mute, solo, sends, tuner and dynamics timing keep whatever the
    /// operator set since. Stops an active run first. Returns the number of
    /// channels restored.
    pub fn revert_corrections(&mut self) -> usize {
        self.stop_check();

        let mut reverted = 0;
        for analysis in self.shared.analyses().iter().filter(|a| a.analysed) {
            if let Some(channel) = self.mixer.channel(analysis.channel) {
                restore_corrected(channel, &analysis.original);
                reverted += 1;
            }
        }

        self.shared.set_state(SoundcheckState::Idle);
        log::info!("Soundcheck: reverted {} channels", reverted);
        reverted
    }

    fn join_worker(&mut self) {
        self.cancel = None;
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                log::error!("Soundcheck worker panicked");
            }
        }
    }
}

/// Ring length for `capture_seconds` at `sample_rate`
fn capture_frames(config: &SoundcheckConfig, sample_rate: f32) -> usize {
    config.capture_seconds.max(1) as usize * sample_rate.max(1.0) as usize
}

/// Write back the fields apply touches, nothing else
fn restore_corrected(channel: &ChannelParams, original: &ChannelSettings) {
    channel.set_channel_type(original.channel_type);
    channel.set_trim_db(original.trim_db);
    channel.set_gate_threshold_db(original.gate_threshold_db);
    channel.set_gate_enabled(original.gate_enabled);
    channel.set_eq_gains(original.eq_gains_db);
    channel.set_eq_enabled(original.eq_enabled);
    channel.set_comp_ratio(original.comp_ratio);
    channel.set_comp_enabled(original.comp_enabled);
}

impl Drop for SoundcheckEngine {
    fn drop(&mut self) {
        self.stop_check();
        self.join_worker();
    }
}

/// Everything the worker thread owns for one run
struct Worker {
    mixer: MixerHandle,
    capture: Shared<CaptureBuffer>,
    shared: Arc<RunState>,
    target: usize,
    poll_interval: Duration,
    time_budget: Duration,
    sample_rate: f32,
}

impl Worker {
    fn run(self, cancel: crossbeam::channel::Receiver<()>) {
        let started = Instant::now();
        let mut analyzer = SpectrumAnalyzer::new(self.sample_rate);
        let routing = self.mixer.routing();

        for channel in 0..self.mixer.num_channels() {
            if !routing.is_enabled(channel) {
                continue;
            }
            self.capture.begin_channel(channel, self.target);

            // Wait for the capture target, bailing out on cancel
            let target = self.capture.target();
            while self.capture.collected() < target {
                match cancel.recv_timeout(self.poll_interval) {
                    Err(RecvTimeoutError::Timeout) => {}
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                        self.capture.stop();
                        log::debug!("Soundcheck worker cancelled on channel {}", channel);
                        return;
                    }
                }
            }
            self.capture.stop();

            let (left, right) = self.capture.read();
            let original = match self.mixer.channel(channel) {
                Some(params) => params.settings(),
                None => continue,
            };
            let analysis = ChannelAnalysis::from_capture(channel, &left, &right, &mut analyzer, original);
            log::info!(
                "Analysed channel {} - RMS: {:.1} dB, noise floor: {:.1} dB, peak: {:.1} dB, suggested: {}",
                channel,
                analysis.levels.rms_db(),
                analysis.levels.noise_floor_db(),
                analysis.levels.peak_db(),
                analysis.suggested_profile.name()
            );

            if let Some(slot) = self.shared.analyses().get_mut(channel) {
                *slot = analysis;
            }
        }

        if self.shared.transition(SoundcheckState::Analysing, SoundcheckState::Finished) {
            let elapsed = started.elapsed();
            log::info!("Soundcheck finished in {:.1} s", elapsed.as_secs_f32());
            if elapsed > self.time_budget {
                log::warn!(
                    "Soundcheck took {:.1} s, over the {} s budget",
                    elapsed.as_secs_f32(),
                    self.time_budget.as_secs()
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{command_channel, RoutingEngine};
    use crate::routing::{ChannelLimitProvider, RoutingManager};

    /// Soundcheck over a small mixer with a short poll interval
    fn setup(channels: usize) -> (SoundcheckEngine, MixerHandle) {
        let (_tx, rx) = command_channel();
        let mixer = RoutingEngine::new(channels, rx).handle();
        let config = SoundcheckConfig {
            poll_interval_ms: 5,
            capture_seconds: 1,
            ..SoundcheckConfig::default()
        };
        (SoundcheckEngine::new(mixer.clone(), config), mixer)
    }

    fn wait_for(engine: &SoundcheckEngine, state: SoundcheckState) -> bool {
        let deadline = Instant::now() + Duration::from_secs(10);
        while Instant::now() < deadline {
            if engine.state() == state {
                return true;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        false
    }

    /// Feed the tap from the test thread until the run leaves `Analysing`
    fn feed_until_done(engine: &SoundcheckEngine, signal: &[f32]) {
        let tap = engine.capture_tap();
        let deadline = Instant::now() + Duration::from_secs(20);
        while engine.is_running() && Instant::now() < deadline {
            for block in signal.chunks(4800) {
                tap.capture(&[block, block], block.len());
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    fn noise(amplitude: f32, len: usize) -> Vec<f32> {
        // xorshift, deterministic
        let mut state = 0x2545_f491_u32;
        (0..len)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                amplitude * ((state as f32 / u32::MAX as f32) * 2.0 - 1.0)
            })
            .collect()
    }

    #[test]
    fn test_full_run_and_apply() {
        let (mut engine, mixer) = setup(2);
        assert_eq!(engine.state(), SoundcheckState::Idle);

        engine.start_check(1).unwrap();
        assert!(engine.is_running());
        feed_until_done(&engine, &noise(0.05, 48000));
        assert!(wait_for(&engine, SoundcheckState::Finished));
        assert_eq!(engine.channels_analysed(), 2);

        let analysis = engine.analysis(0).unwrap();
        assert!(analysis.analysed);
        assert!(analysis.levels.rms > 0.0);
        assert!(engine.analysis(2).is_none());

        assert_eq!(engine.apply_corrections().unwrap(), 2);
        assert_eq!(engine.state(), SoundcheckState::Idle);

        let ch = mixer.channel(0).unwrap();
        assert_eq!(ch.trim_db(), analysis.corrections.trim_db);
        assert_eq!(ch.gate_threshold_db(), analysis.corrections.gate_threshold_db);
        assert_eq!(ch.channel_type(), analysis.suggested_type);
        assert!(ch.gate_enabled());
    }

    #[test]
    fn test_apply_then_revert_restores_settings() {
        let (mut engine, mixer) = setup(2);
        let ch = mixer.channel(1).unwrap();
        ch.set_trim_db(-7.5);
        ch.set_eq_gain(2, 4.0);
        ch.set_comp_enabled(false);
        let before: Vec<_> = mixer.channels().map(|c| c.settings()).collect();

        engine.start_check(1).unwrap();
        feed_until_done(&engine, &noise(0.01, 48000));
        assert!(wait_for(&engine, SoundcheckState::Finished));

        engine.apply_corrections().unwrap();
        assert_ne!(mixer.channel(1).unwrap().settings(), before[1]);

        assert_eq!(engine.revert_corrections(), 2);
        let after: Vec<_> = mixer.channels().map(|c| c.settings()).collect();
        assert_eq!(after, before);
    }

    #[test]
    fn test_revert_keeps_later_operator_changes() {
        let (mut engine, mixer) = setup(1);
        let ch = mixer.channel(0).unwrap();
        ch.set_trim_db(-3.0);
        ch.set_gate_attack_ms(2.0);
        let before = ch.settings();

        engine.start_check(1).unwrap();
        feed_until_done(&engine, &noise(0.01, 48000));
        assert!(wait_for(&engine, SoundcheckState::Finished));
        engine.apply_corrections().unwrap();

        // Operator moves things soundcheck never touches
        ch.set_mute(true);
        ch.set_solo(true);
        ch.set_fx_send(0.8);
        ch.set_tuner_enabled(true);
        ch.set_gate_release_ms(250.0);

        assert_eq!(engine.revert_corrections(), 1);
        assert!(ch.mute());
        assert!(ch.solo());
        assert_eq!(ch.fx_send(), 0.8);
        assert!(ch.tuner_enabled());
        assert_eq!(ch.gate_release_ms(), 250.0);
        assert_eq!(ch.gate_attack_ms(), before.gate_attack_ms);

        // Everything apply wrote is back
        assert_eq!(ch.channel_type(), before.channel_type);
        assert_eq!(ch.trim_db(), before.trim_db);
        assert_eq!(ch.gate_threshold_db(), before.gate_threshold_db);
        assert_eq!(ch.gate_enabled(), before.gate_enabled);
        assert_eq!(ch.eq_gains(), before.eq_gains_db);
        assert_eq!(ch.eq_enabled(), before.eq_enabled);
        assert_eq!(ch.comp_ratio(), before.comp_ratio);
        assert_eq!(ch.comp_enabled(), before.comp_enabled);
    }

    #[test]
    fn test_capture_follows_device_rate() {
        let (mut engine, _mixer) = setup(1);
        // Taken before the rate is known, as the live binary does
        let tap = engine.capture_tap();
        assert_eq!(engine.capture_capacity(), 48000);

        engine.set_sample_rate(96000.0);
        engine.start_check(1).unwrap();
        assert_eq!(engine.capture_capacity(), 96000);

        let block = noise(0.05, 4800);
        let deadline = Instant::now() + Duration::from_secs(20);
        while engine.is_running() && Instant::now() < deadline {
            tap.capture(&[&block[..], &block[..]], block.len());
            std::thread::sleep(Duration::from_millis(1));
        }
        assert!(wait_for(&engine, SoundcheckState::Finished));
        // A full second at the new rate, not half of it
        let target = engine.capture.get().target();
        assert_eq!(target, 96000);
        assert_eq!(engine.capture.get().collected(), 96000);
    }

    #[test]
    fn test_apply_requires_results() {
        let (mut engine, _mixer) = setup(1);
        assert!(matches!(
            engine.apply_corrections(),
            Err(SoundcheckError::NotFinished {
                state: SoundcheckState::Idle
            })
        ));

        engine.start_check(1).unwrap();
        assert!(matches!(
            engine.apply_corrections(),
            Err(SoundcheckError::NotFinished {
                state: SoundcheckState::Analysing
            })
        ));
        engine.stop_check();
    }

    #[test]
    fn test_double_start_is_ignored() {
        let (mut engine, _mixer) = setup(2);
        engine.start_check(1).unwrap();
        let worker_id = engine.worker.as_ref().map(|h| h.thread().id());

        engine.start_check(1).unwrap();
        assert_eq!(engine.state(), SoundcheckState::Analysing);
        assert_eq!(engine.worker.as_ref().map(|h| h.thread().id()), worker_id);
        engine.stop_check();
    }

    #[test]
    fn test_stop_cancels_within_a_poll() {
        let (mut engine, _mixer) = setup(4);
        engine.start_check(1).unwrap();

        let stopped = Instant::now();
        engine.stop_check();
        assert_eq!(engine.state(), SoundcheckState::Cancelled);
        assert!(engine.state().is_finished());

        // Worker observes the cancel at its next poll and exits; allow a
        // few intervals of scheduling slack
        let poll = Duration::from_millis(engine.config.poll_interval_ms);
        let handle = engine.worker.take().unwrap();
        handle.join().unwrap();
        let elapsed = stopped.elapsed();
        assert!(elapsed < poll * 20, "worker took {elapsed:?} to stop");
        assert_eq!(engine.channels_analysed(), 0);

        // Nothing analysed, so applying touches nothing
        assert_eq!(engine.apply_corrections().unwrap(), 0);
    }

    #[test]
    fn test_disabled_channels_are_skipped() {
        struct Two;
        impl ChannelLimitProvider for Two {
            fn max_channels(&self) -> usize {
                2
            }
        }

        let (mut engine, mixer) = setup(3);
        RoutingManager::new(mixer.clone(), Arc::new(Two)).apply_channel_limit();

        engine.start_check(1).unwrap();
        feed_until_done(&engine, &noise(0.05, 48000));
        assert!(wait_for(&engine, SoundcheckState::Finished));
        assert_eq!(engine.channels_analysed(), 2);
        assert!(!engine.analysis(2).unwrap().analysed);
    }

    #[test]
    fn test_quiet_noise_gets_maximum_trim() {
        // −40 dBFS RMS white noise: uniform noise RMS is amplitude / √3.
        // Every profile targets −14..−18 dBFS, so trim is past the clamp.
        let amplitude = crate::types::db_to_gain(-40.0) * 3f32.sqrt();
        let signal = noise(amplitude, 48000);
        let mut analyzer = SpectrumAnalyzer::new(48000.0);
        let analysis =
            ChannelAnalysis::from_capture(0, &signal, &signal, &mut analyzer, ChannelSettings::default());

        assert!((analysis.levels.rms_db() + 40.0).abs() < 0.5);
        assert_eq!(analysis.corrections.trim_db, 12.0);
    }

    #[test]
    fn test_short_capture_degrades_to_silence() {
        let mut analyzer = SpectrumAnalyzer::new(48000.0);
        let analysis = ChannelAnalysis::from_capture(0, &[], &[], &mut analyzer, ChannelSettings::default());
        assert!(analysis.analysed);
        assert!(analysis.bands_db.iter().all(|&db| db == BAND_FLOOR_DB));
        assert_eq!(analysis.corrections.gate_threshold_db, -60.0);
    }
}
