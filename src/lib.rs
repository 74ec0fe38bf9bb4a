//! Anyma Pal - SysEx to CC bridge for the Anyma Phi synthesizer
//!
//! Keeps the device in editor mode while a session is active and translates
//! its parameter-state SysEx reports into Control Change messages a sequencer
//! can record. Large patch dumps pass through untouched.

pub mod anyma;
pub mod bridge;
pub mod config;
pub mod midi;
pub mod monitor;
pub mod paths;
pub mod repeater;
pub mod session;
pub mod sink;
pub mod transport;

pub use bridge::{Bridge, BridgeStats};
pub use config::AppConfig;
pub use session::{SessionController, SessionState, SessionTiming};
pub use sink::{ConsoleSink, Delivery, MidiSink, OutputSlot, SharedSink};
