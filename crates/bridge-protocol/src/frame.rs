// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Control frame layout and encoding.
//!
//! Frame format:
//! - MARKERS (3 bytes): `0x41 0x42 0xFF`
//! - LEFT_FRONT, RIGHT_FRONT, REAR, TURN, WIND (1 byte each)

use std::fmt;

use crate::diagnostic::format_diagnostic;

/// Total frame length in bytes
pub const FRAME_LEN: usize = 8;

/// Fixed marker and type bytes that open every frame
pub const FRAME_MARKERS: [u8; 3] = [0x41, 0x42, 0xFF];

/// Number of payload fields following the markers
pub const PAYLOAD_LEN: usize = FRAME_LEN - FRAME_MARKERS.len();

/// Turn value used when the sender does not supply one
pub const DEFAULT_TURN: u8 = 100;

/// Wind value used when the sender does not supply one
pub const DEFAULT_WIND: u8 = 0;

/// The five payload fields, in wire order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlField {
    LeftFront,
    RightFront,
    Rear,
    Turn,
    Wind,
}

impl ControlField {
    /// All fields in wire order
    pub const ALL: [ControlField; PAYLOAD_LEN] = [
        ControlField::LeftFront,
        ControlField::RightFront,
        ControlField::Rear,
        ControlField::Turn,
        ControlField::Wind,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ControlField::LeftFront => "left_front",
            ControlField::RightFront => "right_front",
            ControlField::Rear => "rear",
            ControlField::Turn => "turn",
            ControlField::Wind => "wind",
        }
    }

    /// Byte offset of this field inside an encoded frame
    pub fn offset(&self) -> usize {
        FRAME_MARKERS.len()
            + match self {
                ControlField::LeftFront => 0,
                ControlField::RightFront => 1,
                ControlField::Rear => 2,
                ControlField::Turn => 3,
                ControlField::Wind => 4,
            }
    }
}

impl fmt::Display for ControlField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated control values. Each field is a byte, so an instance can only
/// ever describe an encodable frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlValues {
    pub left_front: u8,
    pub right_front: u8,
    pub rear: u8,
    pub turn: u8,
    pub wind: u8,
}

impl ControlValues {
    /// Build values for the three drive fields with the default turn and wind
    pub fn new(left_front: u8, right_front: u8, rear: u8) -> Self {
        Self {
            left_front,
            right_front,
            rear,
            turn: DEFAULT_TURN,
            wind: DEFAULT_WIND,
        }
    }

    pub fn get(&self, field: ControlField) -> u8 {
        match field {
            ControlField::LeftFront => self.left_front,
            ControlField::RightFront => self.right_front,
            ControlField::Rear => self.rear,
            ControlField::Turn => self.turn,
            ControlField::Wind => self.wind,
        }
    }
}

/// An encoded 8-byte control frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControlFrame([u8; FRAME_LEN]);

impl ControlFrame {
    pub fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.0
    }

    /// The five payload bytes after the markers
    pub fn payload(&self) -> &[u8] {
        &self.0[FRAME_MARKERS.len()..]
    }

    pub fn field(&self, field: ControlField) -> u8 {
        self.0[field.offset()]
    }

    pub fn into_bytes(self) -> [u8; FRAME_LEN] {
        self.0
    }
}

impl AsRef<[u8]> for ControlFrame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for ControlFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_diagnostic(&self.0))
    }
}

/// Encode validated values into a frame
pub fn encode(values: &ControlValues) -> ControlFrame {
    let mut bytes = [0u8; FRAME_LEN];
    bytes[..FRAME_MARKERS.len()].copy_from_slice(&FRAME_MARKERS);
    for field in ControlField::ALL {
        bytes[field.offset()] = values.get(field);
    }
    ControlFrame(bytes)
}
