//! Editor session with the hardware
//!
//! While a session is active the device reports every parameter change as a
//! short SysEx frame. Entering the session requests a patch dump, enables
//! editor mode, then keeps the mode alive with two repeaters (keep-alive and
//! status poll). Leaving it stops the repeaters and requests a final dump so
//! the sequencer captures the resulting patch.
//!
//! Transitions are async: the settle delays are `tokio::time::sleep`, so they
//! never block a UI or MIDI callback thread, and dropping a transition future
//! cancels its remaining steps.


use std::fmt;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::anyma::{KEEP_ALIVE, MODE_ENABLE, PATCH_DUMP_REQUEST, STATUS_REQUEST};
use crate::repeater::{PeriodicSender, RepeaterError};
use crate::sink::{Delivery, OutputSlot, SharedSink};

/// Session state as seen by the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Active,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "Idle"),
            SessionState::Active => write!(f, "Active"),
        }
    }
}

/// Cadences and settle delays of the session protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTiming {
    pub keep_alive_interval: Duration,
    pub status_poll_interval: Duration,
    /// Wait between the patch dump request and enabling editor mode
    pub start_settle: Duration,
    /// Wait between stopping the repeaters and the final dump request
    pub stop_settle: Duration,
}

impl Default for SessionTiming {
    fn default() -> Self {
        Self {
            keep_alive_interval: Duration::from_millis(1000),
            status_poll_interval: Duration::from_millis(200),
            start_settle: Duration::from_millis(1000),
            stop_settle: Duration::from_millis(5000),
        }
    }
}

/// Owns the device-facing output and the two session repeaters
pub struct SessionController {
    /// Shared with both repeaters, so a rebind moves all three at once
    device: OutputSlot,
    keep_alive: PeriodicSender,
    status_poll: PeriodicSender,
    timing: SessionTiming,
    /// Serializes start/stop so a toggle during a settle delay waits its turn
    transition: Mutex<()>,
    state_tx: watch::Sender<SessionState>,
}

impl SessionController {
    pub fn new(timing: SessionTiming) -> Result<Self, RepeaterError> {
        let device = OutputSlot::new("device");
        let keep_alive =
            PeriodicSender::with_message("keep-alive", KEEP_ALIVE, timing.keep_alive_interval)?
                .with_output(device.clone());
        let status_poll =
            PeriodicSender::with_message("status-poll", STATUS_REQUEST, timing.status_poll_interval)?
                .with_output(device.clone());
        let (state_tx, _) = watch::channel(SessionState::Idle);

        Ok(Self {
            device,
            keep_alive,
            status_poll,
            timing,
            transition: Mutex::new(()),
            state_tx,
        })
    }

    pub fn timing(&self) -> &SessionTiming {
        &self.timing
    }

    /// Point the session and both repeaters at a new device output (or none)
    pub fn bind_device_output(&self, sink: Option<SharedSink>) {
        self.device.bind(sink);
    }

    /// Name of the bound device output, if any
    pub fn device_output(&self) -> Option<String> {
        self.device.bound_name()
    }

    /// True while the keep-alive repeater runs; both repeaters move in lock-step
    pub fn is_active(&self) -> bool {
        self.keep_alive.is_active()
    }

    pub fn state(&self) -> SessionState {
        if self.is_active() {
            SessionState::Active
        } else {
            SessionState::Idle
        }
    }

    /// Watch state changes.
    ///
    /// Values follow [`is_active`](Self::is_active): Active is published once
    /// the repeaters run, Idle as soon as they stop (before the final dump).
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Ask the device for a patch dump right now
    pub fn request_dump(&self) -> Delivery {
        self.device.send(PATCH_DUMP_REQUEST)
    }

    /// Enter editor mode. No-op if already active.
    pub async fn start(&self) {
        let _guard = self.transition.lock().await;
        self.start_locked().await;
    }

    /// Leave editor mode. No-op if idle.
    ///
    /// Waits for an in-flight transition first, so calling it on exit always
    /// ends with the final dump request when a session was or is becoming
    /// active.
    pub async fn stop(&self) {
        let _guard = self.transition.lock().await;
        self.stop_locked().await;
    }

    /// Stop if active, start otherwise; returns the resulting state.
    ///
    /// The choice is made after any in-flight transition completes.
    pub async fn toggle(&self) -> SessionState {
        let _guard = self.transition.lock().await;
        if self.is_active() {
            self.stop_locked().await;
        } else {
            self.start_locked().await;
        }
        self.state()
    }

    async fn start_locked(&self) {
        if self.is_active() {
            debug!("Session already active");
            return;
        }

        info!("Starting editor session");
        self.log_unbound();

        self.device.send(PATCH_DUMP_REQUEST);
        sleep(self.timing.start_settle).await;
        self.device.send(MODE_ENABLE);

        self.keep_alive.start();
        self.status_poll.start();

        self.state_tx.send_replace(SessionState::Active);
        info!("Editor session active");
    }

    async fn stop_locked(&self) {
        if !self.is_active() {
            debug!("Session already idle");
            return;
        }

        info!("Stopping editor session");
        self.keep_alive.stop();
        self.status_poll.stop();
        self.state_tx.send_replace(SessionState::Idle);

        sleep(self.timing.stop_settle).await;
        self.log_unbound();
        self.device.send(PATCH_DUMP_REQUEST);

        info!("Editor session idle");
    }

    fn log_unbound(&self) {
        if !self.device.is_bound() {
            warn!("No device output bound, session commands will not reach the hardware");
        }
    }
}
