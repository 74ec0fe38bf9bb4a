//! Output sinks
//!
//! A sink accepts raw MIDI bytes for immediate transmission. There is no
//! acknowledgement channel: callers fire and forget. Sinks are held in an
//! [`OutputSlot`], which may be empty while the user picks another device.

use anyhow::Result;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{info, trace, warn};

use crate::midi::format_hex;

/// Destination for raw MIDI bytes
pub trait MidiSink: Send + Sync {
    /// Human-readable name for logs (port name, "console", ...)
    fn name(&self) -> &str;

    /// Transmit the bytes now
    fn send(&self, data: &[u8]) -> Result<()>;
}

pub type SharedSink = Arc<dyn MidiSink>;

/// What happened to a send through an [`OutputSlot`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// No sink bound, nothing was sent
    Unbound,
    /// The bound sink reported an error (already logged)
    Failed,
}

/// Rebindable handle to the current output.
///
/// Reads for sending and writes for rebinding go through the same lock, so a
/// send never observes a half-swapped output. Cloning shares the slot.
#[derive(Clone)]
pub struct OutputSlot {
    label: Arc<str>,
    current: Arc<Mutex<Option<SharedSink>>>,
}

impl OutputSlot {
    pub fn new(label: &str) -> Self {
        Self {
            label: Arc::from(label),
            current: Arc::new(Mutex::new(None)),
        }
    }

    /// Replace the bound sink (or clear it with `None`), returning the previous one
    pub fn bind(&self, sink: Option<SharedSink>) -> Option<SharedSink> {
        match &sink {
            Some(s) => info!("{} output -> {}", self.label, s.name()),
            None => info!("{} output unbound", self.label),
        }
        std::mem::replace(&mut *self.current.lock(), sink)
    }

    pub fn is_bound(&self) -> bool {
        self.current.lock().is_some()
    }

    /// Name of the bound sink, if any
    pub fn bound_name(&self) -> Option<String> {
        self.current.lock().as_ref().map(|s| s.name().to_string())
    }

    /// Send through the bound sink. An empty slot is a no-op, not an error.
    pub fn send(&self, data: &[u8]) -> Delivery {
        let current = self.current.lock();
        let Some(sink) = current.as_ref() else {
            trace!("{} TX skipped (no output bound): {}", self.label, format_hex(data));
            return Delivery::Unbound;
        };

        match sink.send(data) {
            Ok(()) => {
                trace!("{} TX -> {}: {}", self.label, sink.name(), format_hex(data));
                Delivery::Sent
            }
            Err(e) => {
                warn!("{} send to {} failed: {}", self.label, sink.name(), e);
                Delivery::Failed
            }
        }
    }
}

/// Sink that logs every message instead of sending it.
///
/// Useful for running without a sequencer attached.
pub struct ConsoleSink {
    name: String,
    sent: AtomicU64,
}

impl ConsoleSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sent: AtomicU64::new(0),
        }
    }
}

impl MidiSink for ConsoleSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&self, data: &[u8]) -> Result<()> {
        let n = self.sent.fetch_add(1, Ordering::Relaxed) + 1;
        if data.len() > 16 {
            info!("[{}] #{} {} bytes: {} ...", self.name, n, data.len(), format_hex(&data[..16]));
        } else {
            info!("[{}] #{} {}", self.name, n, format_hex(data));
        }
        Ok(())
    }
}
