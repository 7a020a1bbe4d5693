// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Command text parsing
//!
//! A command datagram is UTF-8 text holding whitespace-separated decimal
//! integers: `<left_front> <right_front> <rear>`. Tokens after the third are
//! ignored. Turn and wind are never read from the datagram.

use std::num::IntErrorKind;

use crate::error::MalformedCommandError;
use crate::frame::{ControlField, DEFAULT_TURN, DEFAULT_WIND};

/// Values filled in for fields the sender does not supply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandDefaults {
    pub turn: u8,
    pub wind: u8,
}

impl Default for CommandDefaults {
    fn default() -> Self {
        Self {
            turn: DEFAULT_TURN,
            wind: DEFAULT_WIND,
        }
    }
}

/// A parsed command before range validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawCommand {
    pub left_front: i64,
    pub right_front: i64,
    pub rear: i64,
    pub turn: i64,
    pub wind: i64,
}

impl RawCommand {
    /// Command with the standard turn and wind defaults
    pub fn new(left_front: i64, right_front: i64, rear: i64) -> Self {
        Self::with_defaults(left_front, right_front, rear, &CommandDefaults::default())
    }

    pub fn with_defaults(
        left_front: i64,
        right_front: i64,
        rear: i64,
        defaults: &CommandDefaults,
    ) -> Self {
        Self {
            left_front,
            right_front,
            rear,
            turn: i64::from(defaults.turn),
            wind: i64::from(defaults.wind),
        }
    }

    pub fn get(&self, field: ControlField) -> i64 {
        match field {
            ControlField::LeftFront => self.left_front,
            ControlField::RightFront => self.right_front,
            ControlField::Rear => self.rear,
            ControlField::Turn => self.turn,
            ControlField::Wind => self.wind,
        }
    }
}

/// Parse command text into a raw command.
///
/// # Errors
///
/// `MissingTokens` when fewer than three tokens are present,
/// `InvalidInteger` when one of the first three is not a decimal integer.
pub fn parse_command(
    text: &str,
    defaults: &CommandDefaults,
) -> Result<RawCommand, MalformedCommandError> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.len() < 3 {
        return Err(MalformedCommandError::MissingTokens {
            found: tokens.len(),
        });
    }

    let mut parsed = [0i64; 3];
    let drive_fields = [
        ControlField::LeftFront,
        ControlField::RightFront,
        ControlField::Rear,
    ];
    for ((slot, field), token) in parsed.iter_mut().zip(drive_fields).zip(&tokens) {
        *slot = parse_integer(token).ok_or_else(|| MalformedCommandError::InvalidInteger {
            field,
            token: (*token).to_string(),
        })?;
    }

    Ok(RawCommand::with_defaults(
        parsed[0], parsed[1], parsed[2], defaults,
    ))
}

/// Parse a signed decimal integer. Integers too large for `i64` saturate so
/// they still reach range validation as out-of-range values.
fn parse_integer(token: &str) -> Option<i64> {
    match token.parse::<i64>() {
        Ok(value) => Some(value),
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => Some(i64::MAX),
            IntErrorKind::NegOverflow => Some(i64::MIN),
            _ => None,
        },
    }
}

/// Decode a datagram payload as UTF-8 and parse it
pub fn parse_datagram(
    payload: &[u8],
    defaults: &CommandDefaults,
) -> Result<RawCommand, MalformedCommandError> {
    let text = std::str::from_utf8(payload).map_err(|_| MalformedCommandError::InvalidUtf8)?;
    parse_command(text, defaults)
}
