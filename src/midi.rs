//! MIDI utilities and message types
//!
//! Provides the small slice of MIDI parsing and encoding the bridge needs:
//! channel voice messages for display, Control Change for the sequencer side,
//! and System Exclusive framing for the device side.

use std::fmt;

/// Start of a System Exclusive frame
pub const SYSEX_START: u8 = 0xF0;

/// End of a System Exclusive frame
pub const SYSEX_END: u8 = 0xF7;

/// MIDI message types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MidiMessage {
    /// Note Off: channel (0-15), note (0-127), velocity (0-127)
    NoteOff { channel: u8, note: u8, velocity: u8 },

    /// Note On: channel (0-15), note (0-127), velocity (0-127)
    NoteOn { channel: u8, note: u8, velocity: u8 },

    /// Control Change: channel (0-15), cc (0-127), value (0-127)
    ControlChange { channel: u8, cc: u8, value: u8 },

    /// Pitch Bend: channel (0-15), value (0-16383, 14-bit)
    PitchBend { channel: u8, value: u16 },

    /// System Exclusive payload, without the F0/F7 framing bytes
    SysEx { data: Vec<u8> },
}

impl MidiMessage {
    /// Parse a MIDI message from raw bytes
    pub fn parse(data: &[u8]) -> Option<Self> {
        let status = *data.first()?;

        if status == SYSEX_START {
            return sysex_payload(data).map(|payload| MidiMessage::SysEx {
                data: payload.to_vec(),
            });
        }

        // Running status and other system messages are not tracked
        if !(0x80..0xF0).contains(&status) {
            return None;
        }

        let channel = status & 0x0F;
        if data.len() < 3 {
            return None;
        }
        let d1 = data[1] & 0x7F;
        let d2 = data[2] & 0x7F;

        match status & 0xF0 {
            0x80 => Some(MidiMessage::NoteOff { channel, note: d1, velocity: d2 }),
            0x90 if d2 == 0 => Some(MidiMessage::NoteOff { channel, note: d1, velocity: 0 }),
            0x90 => Some(MidiMessage::NoteOn { channel, note: d1, velocity: d2 }),
            0xB0 => Some(MidiMessage::ControlChange { channel, cc: d1, value: d2 }),
            0xE0 => Some(MidiMessage::PitchBend {
                channel,
                value: ((d2 as u16) << 7) | d1 as u16,
            }),
            _ => None,
        }
    }

    /// Encode the message to MIDI bytes
    pub fn encode(&self) -> Vec<u8> {
        match *self {
            MidiMessage::NoteOff { channel, note, velocity } => {
                vec![0x80 | (channel & 0x0F), note & 0x7F, velocity & 0x7F]
            }
            MidiMessage::NoteOn { channel, note, velocity } => {
                vec![0x90 | (channel & 0x0F), note & 0x7F, velocity & 0x7F]
            }
            MidiMessage::ControlChange { channel, cc, value } => {
                vec![0xB0 | (channel & 0x0F), cc & 0x7F, value & 0x7F]
            }
            MidiMessage::PitchBend { channel, value } => {
                let lsb = (value & 0x7F) as u8;
                let msb = ((value >> 7) & 0x7F) as u8;
                vec![0xE0 | (channel & 0x0F), lsb, msb]
            }
            MidiMessage::SysEx { ref data } => {
                let mut result = Vec::with_capacity(data.len() + 2);
                result.push(SYSEX_START);
                result.extend_from_slice(data);
                result.push(SYSEX_END);
                result
            }
        }
    }
}

impl fmt::Display for MidiMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            MidiMessage::NoteOff { channel, note, velocity } => {
                write!(f, "NoteOff ch:{} n:{} v:{}", channel + 1, note, velocity)
            }
            MidiMessage::NoteOn { channel, note, velocity } => {
                write!(f, "NoteOn ch:{} n:{} v:{}", channel + 1, note, velocity)
            }
            MidiMessage::ControlChange { channel, cc, value } => {
                write!(f, "CC ch:{} cc:{} v:{}", channel + 1, cc, value)
            }
            MidiMessage::PitchBend { channel, value } => {
                write!(f, "PitchBend ch:{} v:{}", channel + 1, value)
            }
            MidiMessage::SysEx { ref data } => write!(f, "SysEx {} bytes", data.len()),
        }
    }
}

/// Payload of a well-formed SysEx frame (F0 ... F7), framing bytes excluded.
///
/// Returns `None` for anything that does not both start with F0 and end with F7.
pub fn sysex_payload(data: &[u8]) -> Option<&[u8]> {
    match data {
        [SYSEX_START, payload @ .., SYSEX_END] => Some(payload),
        _ => None,
    }
}

/// Format MIDI bytes as hex string for debugging
pub fn format_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_change() {
        let data = vec![0xB2, 7, 100]; // CC ch 3, volume, value 100
        let msg = MidiMessage::parse(&data).unwrap();

        assert_eq!(msg, MidiMessage::ControlChange {
            channel: 2,
            cc: 7,
            value: 100,
        });
    }

    #[test]
    fn test_note_on_velocity_zero() {
        let msg = MidiMessage::parse(&[0x90, 60, 0]).unwrap();
        assert_eq!(msg, MidiMessage::NoteOff { channel: 0, note: 60, velocity: 0 });
    }

    #[test]
    fn test_pitch_bend() {
        let msg = MidiMessage::parse(&[0xE0, 0x00, 0x40]).unwrap();
        assert_eq!(msg, MidiMessage::PitchBend { channel: 0, value: 8192 });
    }

    #[test]
    fn test_encode_control_change_masks_data_bytes() {
        let msg = MidiMessage::ControlChange { channel: 0, cc: 0x97, value: 0xFF };
        assert_eq!(msg.encode(), vec![0xB0, 0x17, 0x7F]);
    }

    #[test]
    fn test_sysex_requires_both_framing_bytes() {
        assert_eq!(sysex_payload(&[0xF0, 0x71, 0xF7]), Some(&[0x71][..]));
        assert_eq!(sysex_payload(&[0xF0, 0xF7]), Some(&[][..]));
        assert_eq!(sysex_payload(&[0xF0, 0x71, 0x00]), None);
        assert_eq!(sysex_payload(&[0x71, 0xF7]), None);
        assert_eq!(sysex_payload(&[0xF0]), None);
        assert_eq!(sysex_payload(&[]), None);
    }

    #[test]
    fn test_sysex_parse_and_encode() {
        let raw = [0xF0, 0x71, 0x62, 0x06, 0xF7];
        let msg = MidiMessage::parse(&raw).unwrap();
        assert_eq!(msg, MidiMessage::SysEx { data: vec![0x71, 0x62, 0x06] });
        assert_eq!(msg.encode(), raw.to_vec());
        assert_eq!(msg.to_string(), "SysEx 3 bytes");
    }

    #[test]
    fn test_format_hex() {
        assert_eq!(format_hex(&[0xF0, 0x00, 0x21, 0xF7]), "F0 00 21 F7");
        assert_eq!(format_hex(&[]), "");
    }
}
