//! Periodic SysEx repeater
//!
//! Sends one fixed message on a fixed interval until stopped. Used to keep
//! the device in editor mode and to poll its parameter status.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, trace, warn};

use crate::sink::{OutputSlot, SharedSink};

/// Configuration errors for [`PeriodicSender`]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepeaterError {
    #[error("repeater '{0}': message must not be empty")]
    EmptyMessage(String),

    #[error("repeater '{0}': interval must be greater than zero")]
    ZeroInterval(String),

    #[error("repeater '{0}': already configured")]
    AlreadyConfigured(String),
}

/// Fires a fixed message into a rebindable output every `interval`.
///
/// The first message goes out one full interval after [`start`](Self::start),
/// never immediately. Ticks with no output bound are skipped silently. Failed
/// sends are logged and not retried.
pub struct PeriodicSender {
    name: String,
    message: Option<Arc<[u8]>>,
    interval: Duration,
    output: OutputSlot,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PeriodicSender {
    /// Create an unconfigured sender; call [`configure`](Self::configure) before starting
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            output: OutputSlot::new(&name),
            name,
            message: None,
            interval: Duration::ZERO,
            task: Mutex::new(None),
        }
    }

    /// Create and configure in one step
    pub fn with_message(
        name: impl Into<String>,
        message: &[u8],
        interval: Duration,
    ) -> Result<Self, RepeaterError> {
        let mut sender = Self::new(name);
        sender.configure(message, interval)?;
        Ok(sender)
    }

    /// Send through an existing slot instead of a private one.
    ///
    /// Senders built on clones of the same slot always target the same sink:
    /// one rebind moves all of them under a single lock.
    pub fn with_output(mut self, output: OutputSlot) -> Self {
        self.output = output;
        self
    }

    /// Bind the payload and cadence. The message is immutable afterwards.
    pub fn configure(&mut self, message: &[u8], interval: Duration) -> Result<(), RepeaterError> {
        if self.message.is_some() {
            return Err(RepeaterError::AlreadyConfigured(self.name.clone()));
        }
        if message.is_empty() {
            return Err(RepeaterError::EmptyMessage(self.name.clone()));
        }
        if interval.is_zero() {
            return Err(RepeaterError::ZeroInterval(self.name.clone()));
        }

        self.message = Some(Arc::from(message));
        self.interval = interval;
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn message(&self) -> Option<&[u8]> {
        self.message.as_deref()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Attach (or detach with `None`) the destination. Safe while running;
    /// the next tick uses the new sink.
    pub fn bind_output(&self, sink: Option<SharedSink>) {
        self.output.bind(sink);
    }

    /// Begin firing. No-op if already running or not configured.
    ///
    /// Must be called from within a Tokio runtime; outside one the call is
    /// logged and ignored.
    pub fn start(&self) {
        let mut task = self.task.lock();
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            trace!("Repeater '{}' already running", self.name);
            return;
        }

        let Some(message) = self.message.clone() else {
            warn!("Repeater '{}' started before being configured, ignoring", self.name);
            return;
        };

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                warn!("Repeater '{}' cannot start outside a runtime: {}", self.name, e);
                return;
            }
        };

        let period = self.interval;
        let output = self.output.clone();

        *task = Some(runtime.spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                output.send(&message);
            }
        }));

        debug!("Repeater '{}' started ({}ms)", self.name, period.as_millis());
    }

    /// Cancel future fires. No-op if not running.
    pub fn stop(&self) {
        if let Some(handle) = self.task.lock().take() {
            handle.abort();
            debug!("Repeater '{}' stopped", self.name);
        }
    }

    pub fn toggle(&self) {
        if self.is_active() {
            self.stop();
        } else {
            self.start();
        }
    }

    pub fn is_active(&self) -> bool {
        self.task.lock().as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for PeriodicSender {
    fn drop(&mut self) {
        if let Some(handle) = self.task.get_mut().take() {
            handle.abort();
        }
    }
}
