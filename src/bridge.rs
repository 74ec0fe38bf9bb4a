//! Device-to-sequencer bridge
//!
//! Receives raw frames from the device input callback, classifies them and
//! writes patch dumps or translated CCs to the sequencer output. Runs on the
//! transport's callback thread, so it never blocks beyond one send.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

use crate::anyma::{translate, Translation};
use crate::midi::format_hex;
use crate::sink::{Delivery, OutputSlot, SharedSink};

/// Callback registered with an inbound frame source
pub type FrameHandler = Arc<dyn Fn(&[u8]) + Send + Sync>;

/// Traffic counters, readable from any thread
#[derive(Debug, Default)]
struct BridgeCounters {
    received: AtomicU64,
    dumps_forwarded: AtomicU64,
    cc_emitted: AtomicU64,
    dropped: AtomicU64,
}

/// Point-in-time copy of the bridge counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeStats {
    pub received: u64,
    pub dumps_forwarded: u64,
    pub cc_emitted: u64,
    pub dropped: u64,
}

pub struct Bridge {
    sequencer: OutputSlot,
    counters: BridgeCounters,
}

impl Bridge {
    pub fn new() -> Self {
        Self {
            sequencer: OutputSlot::new("sequencer"),
            counters: BridgeCounters::default(),
        }
    }

    pub fn bind_sequencer_output(&self, sink: Option<SharedSink>) {
        self.sequencer.bind(sink);
    }

    pub fn sequencer_output(&self) -> Option<String> {
        self.sequencer.bound_name()
    }

    /// Handle one inbound frame; `None` when nothing was due for the sequencer
    pub fn handle_frame(&self, frame: &[u8]) -> Option<Delivery> {
        self.counters.received.fetch_add(1, Ordering::Relaxed);

        match translate(frame) {
            Translation::Forward(dump) => {
                debug!("Forwarding patch dump ({} bytes)", dump.len());
                self.counters.dumps_forwarded.fetch_add(1, Ordering::Relaxed);
                Some(self.sequencer.send(dump))
            }
            Translation::Emit(event) => {
                trace!("{} <- {}", event, format_hex(frame));
                self.counters.cc_emitted.fetch_add(1, Ordering::Relaxed);
                Some(self.sequencer.send(&event.to_bytes()))
            }
            Translation::Drop => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Handler to register with the device input
    pub fn frame_handler(self: &Arc<Self>) -> FrameHandler {
        let bridge = Arc::clone(self);
        Arc::new(move |frame: &[u8]| {
            bridge.handle_frame(frame);
        })
    }

    pub fn stats(&self) -> BridgeStats {
        BridgeStats {
            received: self.counters.received.load(Ordering::Relaxed),
            dumps_forwarded: self.counters.dumps_forwarded.load(Ordering::Relaxed),
            cc_emitted: self.counters.cc_emitted.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
        }
    }
}

impl Default for Bridge {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::testing::MemorySink;

    fn make_bridge() -> (Arc<Bridge>, Arc<MemorySink>) {
        let bridge = Arc::new(Bridge::new());
        let sequencer = MemorySink::new("sequencer");
        bridge.bind_sequencer_output(Some(sequencer.clone()));
        (bridge, sequencer)
    }

    #[test]
    fn test_param_frames_become_cc() {
        let (bridge, sequencer) = make_bridge();

        bridge.handle_frame(&[0xF0, 0x71, 0x00, 0x02, 0x45, 0xF7]);
        bridge.handle_frame(&[0xF0, 0x71, 0x06, 0x07, 0x10, 0xF7]);
        bridge.handle_frame(&[0xF0, 0x71, 0x07, 0x00, 0x01, 0xF7]);

        assert_eq!(
            sequencer.messages(),
            vec![vec![0xB0, 23, 0x45], vec![0xB0, 24, 0x10], vec![0xB0, 102, 0x01]]
        );
        assert_eq!(bridge.stats().cc_emitted, 3);
    }

    #[test]
    fn test_dump_passthrough_is_byte_exact() {
        let (bridge, sequencer) = make_bridge();
        let mut dump = vec![0xF0, 0x00, 0x21, 0x33];
        dump.extend((0..300).map(|i| (i % 0x80) as u8));
        dump.push(0xF7);

        assert_eq!(bridge.handle_frame(&dump), Some(Delivery::Sent));
        assert_eq!(sequencer.messages(), vec![dump]);
        assert_eq!(bridge.stats().dumps_forwarded, 1);
    }

    #[test]
    fn test_garbage_is_counted_and_dropped() {
        let (bridge, sequencer) = make_bridge();

        assert_eq!(bridge.handle_frame(&[0x90, 60, 100]), None);
        bridge.handle_frame(&[0xF0, 0x71, 0xF7]);
        bridge.handle_frame(&[0xF0, 0x71, 0x09, 0x00, 0x10, 0xF7]);
        bridge.handle_frame(&[0xF0, 0x71, 0x06, 0x00]);

        assert_eq!(sequencer.len(), 0);
        assert_eq!(
            bridge.stats(),
            BridgeStats {
                received: 4,
                dumps_forwarded: 0,
                cc_emitted: 0,
                dropped: 4,
            }
        );
    }

    #[test]
    fn test_no_sequencer_output_is_noop() {
        let bridge = Arc::new(Bridge::new());
        assert_eq!(
            bridge.handle_frame(&[0xF0, 0x71, 0x06, 0x00, 0x10, 0xF7]),
            Some(Delivery::Unbound)
        );
        assert_eq!(bridge.stats().cc_emitted, 1);
    }

    #[test]
    fn test_frame_handler_from_another_thread() {
        let (bridge, sequencer) = make_bridge();
        let handler = bridge.frame_handler();

        std::thread::spawn(move || handler(&[0xF0, 0x71, 0x06, 0x0E, 0x7F, 0xF7]))
            .join()
            .unwrap();

        assert_eq!(sequencer.messages(), vec![vec![0xB0, 31, 0x7F]]);
    }
}
