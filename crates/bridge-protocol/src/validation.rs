// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Command validation
//!
//! Every field is checked before anything is encoded, so a bad value can
//! never reach the wire as part of a partial frame.

use crate::command::RawCommand;
use crate::error::{FieldViolation, OutOfRangeError};
use crate::frame::{encode, ControlField, ControlFrame, ControlValues, PAYLOAD_LEN};

/// Validate all five fields of a parsed command.
///
/// # Errors
///
/// Returns `OutOfRangeError` listing every field outside `0..=255`.
pub fn validate(raw: &RawCommand) -> Result<ControlValues, OutOfRangeError> {
    let mut violations = Vec::new();
    let mut bytes = [0u8; PAYLOAD_LEN];

    for (slot, field) in bytes.iter_mut().zip(ControlField::ALL) {
        let value = raw.get(field);
        match u8::try_from(value) {
            Ok(byte) => *slot = byte,
            Err(_) => violations.push(FieldViolation { field, value }),
        }
    }

    if !violations.is_empty() {
        return Err(OutOfRangeError { violations });
    }

    Ok(ControlValues {
        left_front: bytes[0],
        right_front: bytes[1],
        rear: bytes[2],
        turn: bytes[3],
        wind: bytes[4],
    })
}

/// Validate and encode raw integers in one step.
///
/// Front ends that already hold numbers (rather than datagram text) call
/// this instead of going through the parser.
pub fn encode_checked(
    left_front: i64,
    right_front: i64,
    rear: i64,
    turn: i64,
    wind: i64,
) -> Result<ControlFrame, OutOfRangeError> {
    let raw = RawCommand {
        left_front,
        right_front,
        rear,
        turn,
        wind,
    };
    validate(&raw).map(|values| encode(&values))
}
