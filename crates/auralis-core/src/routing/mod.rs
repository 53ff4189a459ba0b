//! Channel routing and plan limits
//!
//! Group and effect-send assignment follows the channel type and is not
//! stored separately. What is stored is the physical input each channel
//! reads and whether the channel is enabled under the current plan. Both
//! live in a [`RoutingTable`] of atomics that the audio thread reads once
//! per block.

use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::engine::MixerHandle;
use crate::types::{FxBusType, GroupBusType};

/// Marker for a channel with no physical input assigned
pub const UNASSIGNED: i32 = -1;

/// Per-channel input assignment and enable flags
#[derive(Debug)]
pub struct RoutingTable {
    physical_inputs: Vec<AtomicI32>,
    enabled: Vec<AtomicBool>,
}

impl RoutingTable {
    pub fn new(num_channels: usize) -> Self {
        Self {
            physical_inputs: (0..num_channels).map(|_| AtomicI32::new(UNASSIGNED)).collect(),
            enabled: (0..num_channels).map(|_| AtomicBool::new(true)).collect(),
        }
    }

    pub fn num_channels(&self) -> usize {
        self.physical_inputs.len()
    }

    /// Assigned device input of a channel, if any
    #[inline]
    pub fn physical_input(&self, channel: usize) -> Option<usize> {
        self.physical_inputs
            .get(channel)
            .map(|input| input.load(Ordering::Relaxed))
            .filter(|&input| input >= 0)
            .map(|input| input as usize)
    }

    /// Raw assignment (`UNASSIGNED` for none or an invalid channel)
    pub fn physical_input_raw(&self, channel: usize) -> i32 {
        self.physical_inputs
            .get(channel)
            .map_or(UNASSIGNED, |input| input.load(Ordering::Relaxed))
    }

    /// Store an assignment; negative inputs clear it. Returns false for an invalid channel.
    pub fn set_physical_input(&self, channel: usize, input: i32) -> bool {
        match self.physical_inputs.get(channel) {
            Some(slot) => {
                slot.store(input.max(UNASSIGNED), Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    #[inline]
    pub fn is_enabled(&self, channel: usize) -> bool {
        self.enabled
            .get(channel)
            .is_some_and(|enabled| enabled.load(Ordering::Relaxed))
    }

    pub fn set_enabled(&self, channel: usize, enabled: bool) {
        if let Some(flag) = self.enabled.get(channel) {
            flag.store(enabled, Ordering::Relaxed);
        }
    }

    pub fn physical_inputs(&self) -> Vec<i32> {
        (0..self.num_channels()).map(|ch| self.physical_input_raw(ch)).collect()
    }
}

/// Subscription tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Plan {
    #[default]
    Foundation,
    Flow,
    Pro,
}

impl Plan {
    pub fn max_channels(&self) -> usize {
        match self {
            Plan::Foundation => 32,
            Plan::Flow => 48,
            Plan::Pro => 64,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Plan::Foundation => "Foundation",
            Plan::Flow => "Flow",
            Plan::Pro => "Pro",
        }
    }
}

/// Answers how many channels the current licence allows
pub trait ChannelLimitProvider: Send + Sync {
    fn max_channels(&self) -> usize;
}

impl ChannelLimitProvider for Plan {
    fn max_channels(&self) -> usize {
        Plan::max_channels(self)
    }
}

/// Control-side routing API over a running mixer
pub struct RoutingManager {
    mixer: MixerHandle,
    limits: Arc<dyn ChannelLimitProvider>,
}

impl RoutingManager {
    pub fn new(mixer: MixerHandle, limits: Arc<dyn ChannelLimitProvider>) -> Self {
        Self { mixer, limits }
    }

    fn table(&self) -> &RoutingTable {
        self.mixer.routing()
    }

    /// Point a channel at a device input (negative clears the assignment)
    ///
    /// Returns false if the channel does not exist.
    pub fn assign_physical_input(&self, channel: usize, input: i32) -> bool {
        let applied = self.table().set_physical_input(channel, input);
        if applied {
            log::debug!("Channel {} -> physical input {}", channel, input.max(UNASSIGNED));
        }
        applied
    }

    /// Device input of a channel, `None` when unassigned or invalid
    pub fn physical_input(&self, channel: usize) -> Option<usize> {
        self.table().physical_input(channel)
    }

    pub fn group_bus_for(&self, channel: usize) -> Option<GroupBusType> {
        self.mixer.channel(channel).map(|ch| ch.channel_type().group_bus())
    }

    /// Effect-send bus of a channel; `None` for type Other or an invalid channel
    pub fn fx_bus_for(&self, channel: usize) -> Option<FxBusType> {
        self.mixer.channel(channel).and_then(|ch| ch.channel_type().fx_bus())
    }

    pub fn max_channels(&self) -> usize {
        self.limits.max_channels()
    }

    /// Enable channels below the plan limit and disable the rest
    ///
    /// Disabled channels stay addressable but are silent. Returns the number
    /// of enabled channels.
    pub fn apply_channel_limit(&self) -> usize {
        let limit = self.max_channels();
        let total = self.table().num_channels();
        for channel in 0..total {
            self.table().set_enabled(channel, channel < limit);
        }
        let enabled = limit.min(total);
        log::info!("Channel limit {}: {} of {} channels enabled", limit, enabled, total);
        enabled
    }

    pub fn is_channel_enabled(&self, channel: usize) -> bool {
        self.table().is_enabled(channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{command_channel, RoutingEngine};
    use crate::types::ChannelType;

    struct FixedLimit(usize);

    impl ChannelLimitProvider for FixedLimit {
        fn max_channels(&self) -> usize {
            self.0
        }
    }

    fn manager(channels: usize, limits: Arc<dyn ChannelLimitProvider>) -> RoutingManager {
        let (_tx, rx) = command_channel();
        let engine = RoutingEngine::new(channels, rx);
        RoutingManager::new(engine.handle(), limits)
    }

    #[test]
    fn test_plan_limits() {
        assert_eq!(Plan::Foundation.max_channels(), 32);
        assert_eq!(Plan::Flow.max_channels(), 48);
        assert_eq!(Plan::Pro.max_channels(), 64);
    }

    #[test]
    fn test_physical_input_assignment() {
        let routing = manager(8, Arc::new(Plan::Foundation));
        assert_eq!(routing.physical_input(3), None);

        assert!(routing.assign_physical_input(3, 5));
        assert_eq!(routing.physical_input(3), Some(5));

        assert!(routing.assign_physical_input(3, -7));
        assert_eq!(routing.physical_input(3), None);

        assert!(!routing.assign_physical_input(99, 0));
        assert_eq!(routing.physical_input(99), None);
    }

    #[test]
    fn test_bus_assignment_follows_type() {
        let routing = manager(20, Arc::new(Plan::Foundation));
        assert_eq!(routing.group_bus_for(0), Some(GroupBusType::Vocals));
        assert_eq!(routing.fx_bus_for(0), Some(FxBusType::VocalFx));
        assert_eq!(routing.group_bus_for(10), Some(GroupBusType::Instruments));
        assert_eq!(routing.fx_bus_for(19), Some(FxBusType::DrumFx));

        if let Some(ch) = routing.mixer.channel(2) {
            ch.set_channel_type(ChannelType::Other);
        }
        assert_eq!(routing.group_bus_for(2), Some(GroupBusType::Speech));
        assert_eq!(routing.fx_bus_for(2), None);

        assert_eq!(routing.group_bus_for(20), None);
        assert_eq!(routing.fx_bus_for(20), None);
    }

    #[test]
    fn test_channel_limit_disables_excess() {
        let routing = manager(8, Arc::new(FixedLimit(5)));
        assert_eq!(routing.apply_channel_limit(), 5);
        assert!(routing.is_channel_enabled(4));
        assert!(!routing.is_channel_enabled(5));
        assert!(!routing.is_channel_enabled(7));
        // Still addressable
        assert!(routing.mixer.channel(7).is_some());
        assert!(!routing.is_channel_enabled(8));
    }

    #[test]
    fn test_limit_above_channel_count_enables_all() {
        let routing = manager(32, Arc::new(Plan::Pro));
        assert_eq!(routing.apply_channel_limit(), 32);
        assert!(routing.is_channel_enabled(31));
    }
}
