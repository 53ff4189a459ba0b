//! Audio engine - channel strips, buses, master chain
//!
//! This module contains the real-time mixing graph:
//! - ChannelStrip: trim, gate, EQ, compressor, pitch correction per input
//! - GroupBus / FxBus: the four group buses and three effect-send buses
//! - MasterBus: multiband compressor, limiter, loudness meter
//! - RoutingEngine: owns all of the above and runs one host period at a time
//! - MixerHandle: control-side access to every parameter

mod channel;
mod command;
mod engine;
mod fx_bus;
mod gc;
mod group_bus;
mod handle;
pub mod loudness;
mod master_bus;
pub mod params;

pub use channel::ChannelStrip;
pub use command::*;
pub use engine::*;
pub use fx_bus::FxBus;
pub use gc::gc_handle;
pub use group_bus::GroupBus;
pub use handle::{MixerHandle, MixerSnapshot};
pub use loudness::{meter_tap, LoudnessMeter, LoudnessReading, LoudnessSink, MeterReader, MeterTap};
pub use master_bus::{MasterBus, MultibandCompressor};
pub use params::{
    ChannelParams, ChannelSettings, FxBusParams, FxBusSettings, GroupBusParams, GroupBusSettings, MasterParams,
    MasterSettings, StreamTarget, TestToneParams,
};
