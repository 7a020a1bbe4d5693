// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # bridge-protocol
//!
//! Wire format and command handling for the actuator bridge. Nothing in this
//! crate touches a socket or a serial device; it only turns command text into
//! frames and frames into text.
//!
//! ## Control frame
//!
//! ```text
//! ┌──────┬──────┬──────┬────────────┬─────────────┬──────┬──────┬──────┐
//! │ 0x41 │ 0x42 │ 0xFF │ left_front │ right_front │ rear │ turn │ wind │
//! └──────┴──────┴──────┴────────────┴─────────────┴──────┴──────┴──────┘
//! ```
//!
//! Every field is a single unsigned byte. There is no checksum, length prefix
//! or escaping.
//!
//! ## Usage
//!
//! ```rust
//! use bridge_protocol::{frame_from_datagram, CommandDefaults};
//!
//! let frame = frame_from_datagram(b"10 20 30", &CommandDefaults::default()).unwrap();
//! assert_eq!(frame.as_bytes(), &[0x41, 0x42, 0xFF, 10, 20, 30, 100, 0]);
//! ```

#![deny(unsafe_code)]

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod command;
pub mod diagnostic;
pub mod error;
pub mod frame;
pub mod validation;

pub use command::{parse_command, parse_datagram, CommandDefaults, RawCommand};
pub use diagnostic::format_diagnostic;
pub use error::{CommandError, FieldViolation, MalformedCommandError, OutOfRangeError};
pub use frame::{
    encode, ControlField, ControlFrame, ControlValues, DEFAULT_TURN, DEFAULT_WIND, FRAME_LEN,
    FRAME_MARKERS,
};
pub use validation::{encode_checked, validate};

/// Run the full inbound pipeline on one datagram payload: decode, parse,
/// apply defaults, validate and encode.
///
/// No bytes are produced unless every field passed validation.
pub fn frame_from_datagram(
    payload: &[u8],
    defaults: &CommandDefaults,
) -> Result<ControlFrame, CommandError> {
    let raw = parse_datagram(payload, defaults)?;
    let values = validate(&raw)?;
    Ok(encode(&values))
}
