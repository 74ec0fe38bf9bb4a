//! Parameter bank to Control Change tables
//!
//! The device exposes three independent parameter banks on the wire, each
//! with its own small index space. CC numbers are contiguous per bank except
//! for slots reserved for tuning and morph, so every bank is an explicit
//! table of ranges rather than a single offset.

use std::fmt;

/// Parameter bank a decoded frame belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamGroup {
    /// System parameters (group byte 0x00)
    System,
    /// Main modulation matrix (group byte 0x06)
    MainMatrix,
    /// Alternate modulation matrix (group byte 0x07)
    AltMatrix,
}

impl ParamGroup {
    /// Map the wire group byte to a bank
    pub fn from_wire(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(ParamGroup::System),
            0x06 => Some(ParamGroup::MainMatrix),
            0x07 => Some(ParamGroup::AltMatrix),
            _ => None,
        }
    }
}

impl fmt::Display for ParamGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamGroup::System => write!(f, "system"),
            ParamGroup::MainMatrix => write!(f, "main"),
            ParamGroup::AltMatrix => write!(f, "alt"),
        }
    }
}

/// A parameter change reported by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedParameter {
    pub group: ParamGroup,
    pub index: u8,
    pub value: u8,
}

impl fmt::Display for DecodedParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]={}", self.group, self.index, self.value)
    }
}

/// System parameter index carrying the main tuning
pub const TUNING_INDEX: u8 = 2;

/// Controller for the main tuning
pub const TUNING_CC: u8 = 23;

/// Controller reserved for the alt-matrix tuning.
///
/// No known frame reports it, so no table produces it. Wire a decode path to
/// this constant once the device's encoding for it is known.
pub const ALT_TUNING_CC: u8 = 109;

/// Controller reserved for the alt-matrix morph, unmapped like [`ALT_TUNING_CC`]
pub const ALT_MORPH_CC: u8 = 114;

/// One contiguous run of indices mapped onto controllers at a fixed offset
struct Span {
    first: u8,
    last: u8,
    offset: u8,
}

/// Indices 0-6 -> CC 16-22, indices 7-14 -> CC 24-31 (23 is tuning)
const MAIN_MATRIX: &[Span] = &[
    Span { first: 0, last: 6, offset: 16 },
    Span { first: 7, last: 14, offset: 17 },
];

/// Indices 0-6 -> CC 102-108, 7-10 -> 110-113, 11-13 -> 115-117
const ALT_MATRIX: &[Span] = &[
    Span { first: 0, last: 6, offset: 102 },
    Span { first: 7, last: 10, offset: 103 },
    Span { first: 11, last: 13, offset: 104 },
];

fn lookup(table: &[Span], index: u8) -> Option<u8> {
    table
        .iter()
        .find(|span| (span.first..=span.last).contains(&index))
        .map(|span| index + span.offset)
}

/// Controller for the tuning parameter, which lives in the system bank
pub fn tuning_cc(group: ParamGroup, index: u8) -> Option<u8> {
    (group == ParamGroup::System && index == TUNING_INDEX).then_some(TUNING_CC)
}

/// Controller for a main-matrix index (domain 0-14)
pub fn main_matrix_cc(index: u8) -> Option<u8> {
    lookup(MAIN_MATRIX, index)
}

/// Controller for an alt-matrix index (domain 0-13)
pub fn alt_matrix_cc(index: u8) -> Option<u8> {
    lookup(ALT_MATRIX, index)
}

/// Resolve a decoded parameter to its controller, tuning first.
///
/// Tuning is checked before the matrices; its group byte is disjoint from
/// theirs, so at most one table ever matches.
pub fn controller_for(param: &DecodedParameter) -> Option<u8> {
    tuning_cc(param.group, param.index).or_else(|| match param.group {
        ParamGroup::System => None,
        ParamGroup::MainMatrix => main_matrix_cc(param.index),
        ParamGroup::AltMatrix => alt_matrix_cc(param.index),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_tuning_only_from_system_index_2() {
        assert_eq!(tuning_cc(ParamGroup::System, 2), Some(23));
        assert_eq!(tuning_cc(ParamGroup::System, 1), None);
        assert_eq!(tuning_cc(ParamGroup::MainMatrix, 2), None);
        assert_eq!(tuning_cc(ParamGroup::AltMatrix, 2), None);
    }

    #[test]
    fn test_main_matrix_table() {
        let expected: Vec<u8> = (16..=22).chain(24..=31).collect();
        let actual: Vec<u8> = (0..=14).map(|i| main_matrix_cc(i).unwrap()).collect();
        assert_eq!(actual, expected);

        // index 7 sits right after the reserved tuning slot
        assert_eq!(main_matrix_cc(6), Some(22));
        assert_eq!(main_matrix_cc(7), Some(24));
        assert_eq!(main_matrix_cc(15), None);
        assert_eq!(main_matrix_cc(255), None);
    }

    #[test]
    fn test_alt_matrix_table() {
        assert_eq!(alt_matrix_cc(0), Some(102));
        assert_eq!(alt_matrix_cc(6), Some(108));
        assert_eq!(alt_matrix_cc(7), Some(110));
        assert_eq!(alt_matrix_cc(9), Some(112));
        assert_eq!(alt_matrix_cc(10), Some(113));
        assert_eq!(alt_matrix_cc(11), Some(115));
        assert_eq!(alt_matrix_cc(13), Some(117));
        assert_eq!(alt_matrix_cc(14), None);
    }

    #[test]
    fn test_reserved_alt_controllers_are_unreachable() {
        let produced: Vec<u8> = (0..=u8::MAX).filter_map(alt_matrix_cc).collect();
        assert!(!produced.contains(&ALT_TUNING_CC));
        assert!(!produced.contains(&ALT_MORPH_CC));
        assert_eq!(produced.len(), 14);
    }

    #[test]
    fn test_controller_for_uses_owning_bank() {
        let tuning = DecodedParameter { group: ParamGroup::System, index: 2, value: 0x45 };
        let main = DecodedParameter { group: ParamGroup::MainMatrix, index: 2, value: 0 };
        let alt = DecodedParameter { group: ParamGroup::AltMatrix, index: 2, value: 0 };
        let other_system = DecodedParameter { group: ParamGroup::System, index: 3, value: 0 };

        assert_eq!(controller_for(&tuning), Some(23));
        assert_eq!(controller_for(&main), Some(18));
        assert_eq!(controller_for(&alt), Some(104));
        assert_eq!(controller_for(&other_system), None);
    }

    #[test]
    fn test_group_wire_bytes() {
        assert_eq!(ParamGroup::from_wire(0x00), Some(ParamGroup::System));
        assert_eq!(ParamGroup::from_wire(0x06), Some(ParamGroup::MainMatrix));
        assert_eq!(ParamGroup::from_wire(0x07), Some(ParamGroup::AltMatrix));
        assert_eq!(ParamGroup::from_wire(0x05), None);
    }

    proptest! {
        #[test]
        fn main_matrix_never_emits_tuning(index in any::<u8>()) {
            prop_assert_ne!(main_matrix_cc(index), Some(TUNING_CC));
            prop_assert_eq!(main_matrix_cc(index).is_some(), index <= 14);
        }

        #[test]
        fn alt_matrix_stays_in_its_block(index in any::<u8>()) {
            match alt_matrix_cc(index) {
                Some(cc) => prop_assert!((102..=117).contains(&cc)),
                None => prop_assert!(index > 13),
            }
        }
    }
}
