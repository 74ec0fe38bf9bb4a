//! Inbound frame classification
//!
//! Every frame received from the device is sorted into one of four buckets
//! before anything is sent to the sequencer. Classification is pure and
//! total: malformed input is never an error, it is simply not translated.

use std::fmt;

use tracing::trace;

use super::params::{controller_for, DecodedParameter, ParamGroup};
use super::{ANYMA_ID, LARGE_DUMP_THRESHOLD};
use crate::midi::{format_hex, sysex_payload, MidiMessage};

/// MIDI channel (1-based) every translated CC is sent on
pub const CC_CHANNEL: u8 = 1;

/// How an inbound frame should be handled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification<'a> {
    /// Full patch dump, forwarded to the sequencer byte for byte
    LargeDump(&'a [u8]),
    /// Short editor frame reporting one parameter
    ParamState(DecodedParameter),
    /// Short SysEx frame this bridge does not understand
    Unrecognized,
    /// Not a complete SysEx frame
    Ignore,
}

/// Control Change emitted towards the sequencer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CcEvent {
    /// 1-based MIDI channel
    pub channel: u8,
    pub controller: u8,
    pub value: u8,
}

impl CcEvent {
    pub fn new(controller: u8, value: u8) -> Self {
        Self {
            channel: CC_CHANNEL,
            controller,
            value,
        }
    }

    pub fn to_message(self) -> MidiMessage {
        MidiMessage::ControlChange {
            channel: self.channel.saturating_sub(1),
            cc: self.controller,
            value: self.value,
        }
    }

    pub fn to_bytes(self) -> Vec<u8> {
        self.to_message().encode()
    }
}

impl fmt::Display for CcEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CC{} ch:{} v:{}", self.controller, self.channel, self.value)
    }
}

/// Result of running a frame through classification and the parameter tables
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Translation<'a> {
    /// Send these exact bytes to the sequencer
    Forward(&'a [u8]),
    /// Send this CC to the sequencer
    Emit(CcEvent),
    /// Nothing to send
    Drop,
}

/// Classify a raw inbound frame.
///
/// Short frames are laid out as `F0 71 <group> <index> <value> ... F7`.
pub fn classify(frame: &[u8]) -> Classification<'_> {
    let Some(payload) = sysex_payload(frame) else {
        return Classification::Ignore;
    };

    if payload.len() >= LARGE_DUMP_THRESHOLD {
        return Classification::LargeDump(frame);
    }

    match payload {
        [ANYMA_ID, group, index, value, ..] => match ParamGroup::from_wire(*group) {
            Some(group) => Classification::ParamState(DecodedParameter {
                group,
                index: *index,
                value: *value,
            }),
            None => Classification::Unrecognized,
        },
        _ => Classification::Unrecognized,
    }
}

/// Classify a frame and resolve what, if anything, the sequencer receives
pub fn translate(frame: &[u8]) -> Translation<'_> {
    match classify(frame) {
        Classification::LargeDump(bytes) => Translation::Forward(bytes),
        Classification::ParamState(param) => match controller_for(&param) {
            Some(controller) => Translation::Emit(CcEvent::new(controller, param.value)),
            None => {
                trace!("No controller for {}", param);
                Translation::Drop
            }
        },
        Classification::Unrecognized => {
            trace!("Unrecognized SysEx: {}", format_hex(frame));
            Translation::Drop
        }
        Classification::Ignore => Translation::Drop,
    }
}
