//! Soundcheck capture ring
//!
//! The tap runs inside the input callback and copies raw device input for
//! the channel under analysis into a fixed two-lane ring of atomics. It
//! never allocates, locks or blocks. The analysis thread polls the running
//! sample count and reads the ring once the target is reached.
//!
//! The frame count shares one word with a generation that every
//! [`CaptureBuffer::begin_channel`] bumps. A tap commits its block with a
//! compare-exchange against the word it saw on entry, so a block that
//! straddles a channel change is dropped instead of landing in the new
//! channel's window.
//!
//! The ring lives in a [`CaptureSlot`] so it can be reallocated when the
//! device rate changes without handing out new taps. A replaced ring is
//! freed on the audio GC thread.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use basedrop::{Shared, SharedCell};

use crate::engine::gc_handle;
use crate::routing::RoutingTable;

/// Swappable ring shared by the soundcheck engine and its taps
pub type CaptureSlot = Arc<SharedCell<CaptureBuffer>>;

/// Allocate a ring of `capacity` frames inside a fresh slot
pub fn capture_slot(capacity: usize) -> CaptureSlot {
    Arc::new(SharedCell::new(Shared::new(&gc_handle(), CaptureBuffer::new(capacity))))
}

/// Generation in the high half, frames collected in the low half
#[inline]
fn pack(generation: u32, collected: usize) -> u64 {
    ((generation as u64) << 32) | collected as u64
}

#[inline]
fn unpack(progress: u64) -> (u32, usize) {
    ((progress >> 32) as u32, (progress & u32::MAX as u64) as usize)
}

/// Shared ring between [`CaptureTap`] and the analysis thread
#[derive(Debug)]
pub struct CaptureBuffer {
    /// Left/right lanes, `f32` bit patterns
    lanes: [Vec<AtomicU32>; 2],
    progress: AtomicU64,
    target: AtomicUsize,
    /// Mixer channel currently being captured
    channel: AtomicUsize,
    active: AtomicBool,
}

impl CaptureBuffer {
    /// Capacity is capped so the frame count fits the low half of the
    /// progress word.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, u32::MAX as usize);
        Self {
            lanes: std::array::from_fn(|_| (0..capacity).map(|_| AtomicU32::new(0)).collect()),
            progress: AtomicU64::new(0),
            target: AtomicUsize::new(0),
            channel: AtomicUsize::new(0),
            active: AtomicBool::new(false),
        }
    }

    /// Frames the ring can hold
    pub fn capacity(&self) -> usize {
        self.lanes[0].len()
    }

    /// Frames captured since the last [`CaptureBuffer::begin_channel`]
    pub fn collected(&self) -> usize {
        unpack(self.progress.load(Ordering::Acquire)).1
    }

    /// Bumped by every [`CaptureBuffer::begin_channel`]
    pub fn generation(&self) -> u32 {
        unpack(self.progress.load(Ordering::Acquire)).0
    }

    pub fn target(&self) -> usize {
        self.target.load(Ordering::Relaxed)
    }

    pub fn current_channel(&self) -> usize {
        self.channel.load(Ordering::Relaxed)
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Clear the ring and start collecting `target` frames for `channel`
    ///
    /// Targets above capacity are clamped.
    pub fn begin_channel(&self, channel: usize, target: usize) {
        self.active.store(false, Ordering::Release);
        for lane in &self.lanes {
            for slot in lane {
                slot.store(0, Ordering::Relaxed);
            }
        }
        self.target.store(target.min(self.capacity()), Ordering::Relaxed);
        self.channel.store(channel, Ordering::Relaxed);
        // Publishes target and channel; any tap still holding the old word
        // fails its commit
        let (generation, _) = unpack(self.progress.load(Ordering::Relaxed));
        self.progress.store(pack(generation.wrapping_add(1), 0), Ordering::Release);
        self.active.store(true, Ordering::Release);
    }

    /// Stop accepting samples
    pub fn stop(&self) {
        self.active.store(false, Ordering::Release);
    }

    /// Append a block observed at `seen` progress
    ///
    /// The window never wraps since the target is at most the capacity.
    fn write(&self, left: &[f32], right: &[f32], seen: u64) {
        let (generation, collected) = unpack(seen);
        let remaining = self.target().saturating_sub(collected);
        let frames = left.len().min(right.len()).min(remaining);
        if frames == 0 {
            return;
        }

        let lanes = self.lanes[0][collected..collected + frames]
            .iter()
            .zip(&self.lanes[1][collected..collected + frames]);
        for ((l_slot, r_slot), (&l, &r)) in lanes.zip(left.iter().zip(right)) {
            l_slot.store(l.to_bits(), Ordering::Relaxed);
            r_slot.store(r.to_bits(), Ordering::Relaxed);
        }

        // On failure the frames are overwritten by the new generation's
        // first block
        let committed = pack(generation, collected + frames);
        let _ = self
            .progress
            .compare_exchange(seen, committed, Ordering::Release, Ordering::Relaxed);
    }

    /// Copy the captured window out as two lanes
    pub fn read(&self) -> (Vec<f32>, Vec<f32>) {
        let frames = self.collected().min(self.capacity());
        let lane = |lane: &[AtomicU32]| -> Vec<f32> {
            lane[..frames]
                .iter()
                .map(|slot| f32::from_bits(slot.load(Ordering::Relaxed)))
                .collect()
        };
        (lane(&self.lanes[0]), lane(&self.lanes[1]))
    }
}

/// Real-time half of the capture path, owned by the input callback
pub struct CaptureTap {
    slot: CaptureSlot,
    routing: Arc<RoutingTable>,
}

impl CaptureTap {
    pub fn new(slot: CaptureSlot, routing: Arc<RoutingTable>) -> Self {
        Self { slot, routing }
    }

    /// Copy one input period into the ring
    ///
    /// Takes the device input feeding the channel under analysis (its
    /// assigned input, else the input with the channel's own index),
    /// duplicated to both lanes. If neither exists the first two device
    /// inputs are taken as a stereo pair.
    pub fn capture(&self, inputs: &[&[f32]], frames: usize) {
        if inputs.is_empty() {
            return;
        }
        let buffer = self.slot.get();
        // Progress first: its Acquire makes the channel below at least as
        // new as the generation the commit is checked against
        let seen = buffer.progress.load(Ordering::Acquire);
        if !buffer.is_active() {
            return;
        }

        let channel = buffer.current_channel();
        let source = self
            .routing
            .physical_input(channel)
            .filter(|&input| input < inputs.len())
            .or_else(|| (channel < inputs.len()).then_some(channel));

        match source {
            Some(input) => {
                let mono = clip(inputs[input], frames);
                buffer.write(mono, mono, seen);
            }
            None => {
                let left = clip(inputs[0], frames);
                let right = clip(inputs.get(1).copied().unwrap_or(inputs[0]), frames);
                buffer.write(left, right, seen);
            }
        }
    }
}

#[inline]
fn clip(samples: &[f32], frames: usize) -> &[f32] {
    &samples[..frames.min(samples.len())]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tap(capacity: usize, channels: usize) -> (CaptureTap, Shared<CaptureBuffer>, Arc<RoutingTable>) {
        let slot = capture_slot(capacity);
        let buffer = slot.get();
        let routing = Arc::new(RoutingTable::new(channels));
        (CaptureTap::new(slot, routing.clone()), buffer, routing)
    }

    #[test]
    fn test_inactive_tap_ignores_input() {
        let (tap, buffer, _) = tap(64, 4);
        let input = [0.5f32; 16];
        tap.capture(&[&input[..]], 16);
        assert_eq!(buffer.collected(), 0);
    }

    #[test]
    fn test_capture_stops_at_target() {
        let (tap, buffer, _) = tap(64, 4);
        buffer.begin_channel(0, 40);
        let input = [0.25f32; 16];
        for _ in 0..5 {
            tap.capture(&[&input[..]], 16);
        }
        assert_eq!(buffer.collected(), 40);

        let (left, right) = buffer.read();
        assert_eq!(left.len(), 40);
        assert!(left.iter().chain(&right).all(|&x| x == 0.25));
    }

    #[test]
    fn test_target_clamped_to_capacity() {
        let (_, buffer, _) = tap(32, 4);
        buffer.begin_channel(0, 1000);
        assert_eq!(buffer.target(), 32);
    }

    #[test]
    fn test_follows_channel_input_assignment() {
        let (tap, buffer, routing) = tap(64, 4);
        let inputs: [&[f32]; 3] = [&[0.1; 8], &[0.2; 8], &[0.3; 8]];

        buffer.begin_channel(1, 8);
        tap.capture(&inputs, 8);
        assert_eq!(buffer.read().0[0], 0.2);

        routing.set_physical_input(1, 2);
        buffer.begin_channel(1, 8);
        tap.capture(&inputs, 8);
        let (left, right) = buffer.read();
        assert_eq!(left[0], 0.3);
        assert_eq!(right[0], 0.3);
    }

    #[test]
    fn test_falls_back_to_first_pair() {
        let (tap, buffer, _) = tap(64, 8);
        let inputs: [&[f32]; 2] = [&[0.1; 8], &[0.2; 8]];
        buffer.begin_channel(5, 8);
        tap.capture(&inputs, 8);
        let (left, right) = buffer.read();
        assert_eq!(left[3], 0.1);
        assert_eq!(right[3], 0.2);
    }

    #[test]
    fn test_begin_channel_clears_previous_capture() {
        let (tap, buffer, _) = tap(16, 1);
        buffer.begin_channel(0, 16);
        let input = [0.9f32; 16];
        tap.capture(&[&input[..]], 16);
        buffer.begin_channel(0, 16);
        assert_eq!(buffer.collected(), 0);
        assert!(buffer.read().0.is_empty());
    }

    #[test]
    fn test_block_from_previous_generation_is_dropped() {
        let (tap, buffer, _) = tap(32, 2);
        buffer.begin_channel(0, 16);
        let seen = buffer.progress.load(Ordering::Acquire);

        // Channel changes while a block for channel 0 is in flight
        buffer.begin_channel(1, 16);
        buffer.write(&[0.7; 8], &[0.7; 8], seen);
        assert_eq!(buffer.collected(), 0);
        assert_eq!(buffer.generation(), 2);

        let inputs: [&[f32]; 2] = [&[0.1; 8], &[0.2; 8]];
        tap.capture(&inputs, 8);
        assert_eq!(buffer.collected(), 8);
        assert!(buffer.read().0.iter().all(|&x| x == 0.2));
    }

    #[test]
    fn test_tap_follows_replaced_ring() {
        let slot = capture_slot(8);
        let tap = CaptureTap::new(slot.clone(), Arc::new(RoutingTable::new(1)));

        slot.set(Shared::new(&gc_handle(), CaptureBuffer::new(64)));
        let buffer = slot.get();
        buffer.begin_channel(0, 64);
        tap.capture(&[&[0.5f32; 32][..]], 32);
        assert_eq!(buffer.capacity(), 64);
        assert_eq!(buffer.collected(), 32);
    }
}
