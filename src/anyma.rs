//! Aodyo Anyma Phi editor protocol
//!
//! Byte-exact SysEx constants understood by the hardware, plus the decoding
//! of its parameter reports into Control Change events.

pub mod classifier;
pub mod params;

pub use classifier::{classify, translate, CcEvent, Classification, Translation, CC_CHANNEL};
pub use params::{controller_for, DecodedParameter, ParamGroup};

/// Manufacturer byte the Anyma uses in its short editor frames ('q')
pub const ANYMA_ID: u8 = 0x71;

/// Keep-alive ping that holds the device in editor mode ('q')
pub const KEEP_ALIVE: &[u8] = &[0xF0, 0x71, 0xF7];

/// Request the device to report its current parameter state ('qb' 6)
pub const STATUS_REQUEST: &[u8] = &[0xF0, 0x71, 0x62, 0x06, 0xF7];

/// Enable editor mode (live parameter reporting)
pub const MODE_ENABLE: &[u8] = &[0xF0, 0x00, 0x21, 0x33, 0x71, 0x00, 0xF7];

/// Request a full patch dump
pub const PATCH_DUMP_REQUEST: &[u8] = &[0xF0, 0x00, 0x21, 0x33, 0x71, 0x11, 0xF7];

/// SysEx payloads at or above this size (framing excluded) are patch dumps
pub const LARGE_DUMP_THRESHOLD: usize = 256;
