//! Deferred deallocation for objects replaced on the audio thread
//!
//! Values handed to the audio thread inside a `basedrop::Owned` are not
//! freed where they are dropped. The drop only enqueues the pointer, and a
//! background "audio-gc" thread frees it later. This keeps free() and any
//! destructor work off the real-time path when, for example, a loudness
//! sink is swapped out.

use basedrop::{Collector, Handle};
use std::sync::mpsc;
use std::sync::OnceLock;
use std::thread;
use std::time::Duration;

static GC_HANDLE: OnceLock<Handle> = OnceLock::new();

/// How often the collector thread drains deferred drops
const COLLECT_INTERVAL: Duration = Duration::from_millis(100);

fn init_gc() -> Handle {
    let (tx, rx) = mpsc::channel();

    let spawned = thread::Builder::new().name("audio-gc".to_string()).spawn(move || {
        // Collector is !Sync, so it lives on this thread only
        let mut collector = Collector::new();
        if tx.send(collector.handle()).is_err() {
            return;
        }
        log::info!("Audio GC thread started");

        loop {
            collector.collect();
            thread::sleep(COLLECT_INTERVAL);
        }
    });

    match spawned.ok().and_then(|_| rx.recv().ok()) {
        Some(handle) => handle,
        None => {
            // No collector thread: fall back to a collector that is leaked,
            // so deferred values are never freed but never dangle either.
            log::error!("Failed to start audio GC thread; deferred drops will leak");
            let collector = Box::leak(Box::new(Collector::new()));
            collector.handle()
        }
    }
}

/// Handle for wrapping values in `basedrop::Owned` / `basedrop::Shared`
pub fn gc_handle() -> Handle {
    GC_HANDLE.get_or_init(init_gc).clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use basedrop::Owned;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_deferred_drop_runs_on_gc_thread() {
        let dropped = Arc::new(AtomicBool::new(false));
        let owned = Owned::new(&gc_handle(), DropFlag(dropped.clone()));
        drop(owned);

        // Collection happens on the next pass of the GC thread
        for _ in 0..50 {
            if dropped.load(Ordering::SeqCst) {
                return;
            }
            thread::sleep(Duration::from_millis(20));
        }
        panic!("value was never collected");
    }
}
