//! Lock-free command queue into the routing engine
//!
//! Scalar parameters travel through the atomics in [`super::params`]. Only
//! changes that carry an object go through this queue: the control side
//! pushes an [`EngineCommand`] into an `rtrb` ring and the audio thread
//! drains it at the top of every block. Both ends are wait-free.
//!
//! ```ignore
//! let (mut tx, rx) = command_channel();
//! let engine = RoutingEngine::new(NUM_CHANNELS, rx);
//! let (tap, reader) = meter_tap();
//! tx.push(EngineCommand::set_meter_sink(tap))?;
//! ```

use basedrop::Owned;

use super::gc::gc_handle;
use super::loudness::LoudnessSink;

/// Boxed loudness sink whose drop is deferred to the GC thread
pub type MeterSinkBox = Owned<Box<dyn LoudnessSink>>;

/// Commands sent from the control thread to the audio thread
pub enum EngineCommand {
    /// Install (or with `None`, remove) the master loudness sink
    ///
    /// The previous sink is dropped on the audio thread; `Owned` hands the
    /// actual deallocation to the GC thread.
    SetMeterSink(Option<MeterSinkBox>),
    /// Clear every filter, envelope and delay line
    ResetState,
}

impl EngineCommand {
    /// Wrap a sink for transfer to the audio thread
    pub fn set_meter_sink(sink: impl LoudnessSink + 'static) -> Self {
        let boxed: Box<dyn LoudnessSink> = Box::new(sink);
        EngineCommand::SetMeterSink(Some(Owned::new(&gc_handle(), boxed)))
    }
}

/// Capacity of the command queue
pub const COMMAND_QUEUE_CAPACITY: usize = 64;

/// Create the producer/consumer pair
///
/// The producer stays on the control side; the consumer is handed to
/// [`super::RoutingEngine::new`].
pub fn command_channel() -> (rtrb::Producer<EngineCommand>, rtrb::Consumer<EngineCommand>) {
    rtrb::RingBuffer::new(COMMAND_QUEUE_CAPACITY)
}
