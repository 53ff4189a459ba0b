//! Control-side view of a running mixer
//!
//! [`MixerHandle`] is cheap to clone and shares every parameter block with
//! the [`super::RoutingEngine`] it came from. All lookups by index return
//! `Option`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::params::{
    ChannelParams, ChannelSettings, FxBusParams, FxBusSettings, GroupBusParams, GroupBusSettings, MasterParams,
    MasterSettings, TestToneParams,
};
use crate::routing::RoutingTable;
use crate::types::{FxBusType, GroupBusType, NUM_FX_BUSES, NUM_GROUP_BUSES};

/// Every parameter block of one mixer
#[derive(Debug)]
pub(crate) struct MixerParams {
    pub channels: Vec<Arc<ChannelParams>>,
    pub group_buses: [Arc<GroupBusParams>; NUM_GROUP_BUSES],
    pub fx_buses: [Arc<FxBusParams>; NUM_FX_BUSES],
    pub master: Arc<MasterParams>,
    pub test_tone: Arc<TestToneParams>,
    pub routing: Arc<RoutingTable>,
}

impl MixerParams {
    pub fn new(num_channels: usize) -> Self {
        Self {
            channels: (0..num_channels).map(|i| Arc::new(ChannelParams::new(i))).collect(),
            group_buses: std::array::from_fn(|i| Arc::new(GroupBusParams::new(GroupBusType::ALL[i]))),
            fx_buses: std::array::from_fn(|i| Arc::new(FxBusParams::new(FxBusType::ALL[i]))),
            master: Arc::new(MasterParams::new()),
            test_tone: Arc::new(TestToneParams::new()),
            routing: Arc::new(RoutingTable::new(num_channels)),
        }
    }
}

/// Full mixer state as plain data, for an external serializer
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MixerSnapshot {
    pub channels: Vec<ChannelSettings>,
    pub group_buses: Vec<GroupBusSettings>,
    pub fx_buses: Vec<FxBusSettings>,
    pub master: MasterSettings,
    /// Physical input per channel (`-1` = unassigned)
    pub physical_inputs: Vec<i32>,
}

#[derive(Debug, Clone)]
pub struct MixerHandle {
    params: Arc<MixerParams>,
}

impl MixerHandle {
    pub(crate) fn new(params: Arc<MixerParams>) -> Self {
        Self { params }
    }

    pub fn num_channels(&self) -> usize {
        self.params.channels.len()
    }

    pub fn channel(&self, index: usize) -> Option<&ChannelParams> {
        self.params.channels.get(index).map(Arc::as_ref)
    }

    pub fn channels(&self) -> impl Iterator<Item = &ChannelParams> {
        self.params.channels.iter().map(Arc::as_ref)
    }

    pub fn group_bus(&self, index: usize) -> Option<&GroupBusParams> {
        self.params.group_buses.get(index).map(Arc::as_ref)
    }

    pub fn group_bus_of(&self, bus: GroupBusType) -> &GroupBusParams {
        &self.params.group_buses[bus.index()]
    }

    pub fn fx_bus(&self, index: usize) -> Option<&FxBusParams> {
        self.params.fx_buses.get(index).map(Arc::as_ref)
    }

    pub fn fx_bus_of(&self, bus: FxBusType) -> &FxBusParams {
        &self.params.fx_buses[bus.index()]
    }

    pub fn master(&self) -> &MasterParams {
        &self.params.master
    }

    pub fn test_tone(&self) -> &TestToneParams {
        &self.params.test_tone
    }

    pub fn routing(&self) -> &RoutingTable {
        &self.params.routing
    }

    pub(crate) fn routing_arc(&self) -> Arc<RoutingTable> {
        self.params.routing.clone()
    }

    /// Channels currently sending to `bus`, with their send levels
    pub fn fx_send_levels(&self, bus: FxBusType) -> Vec<(usize, f32)> {
        self.channels()
            .filter(|ch| ch.channel_type().fx_bus() == Some(bus) && ch.fx_send() > 0.0)
            .map(|ch| (ch.index(), ch.fx_send()))
            .collect()
    }

    pub fn snapshot(&self) -> MixerSnapshot {
        MixerSnapshot {
            channels: self.channels().map(ChannelParams::settings).collect(),
            group_buses: self.params.group_buses.iter().map(|b| b.settings()).collect(),
            fx_buses: self.params.fx_buses.iter().map(|b| b.settings()).collect(),
            master: self.master().settings(),
            physical_inputs: self.routing().physical_inputs(),
        }
    }

    /// Write a snapshot back; entries beyond this mixer's size are ignored
    pub fn restore(&self, snapshot: &MixerSnapshot) {
        for (ch, settings) in self.params.channels.iter().zip(&snapshot.channels) {
            ch.apply_settings(settings);
        }
        for (bus, settings) in self.params.group_buses.iter().zip(&snapshot.group_buses) {
            bus.apply_settings(settings);
        }
        for (bus, settings) in self.params.fx_buses.iter().zip(&snapshot.fx_buses) {
            bus.apply_settings(settings);
        }
        self.master().apply_settings(&snapshot.master);
        for (channel, &input) in snapshot.physical_inputs.iter().enumerate() {
            self.routing().set_physical_input(channel, input);
        }
        log::info!("Restored mixer snapshot ({} channels)", snapshot.channels.len());
    }
}
