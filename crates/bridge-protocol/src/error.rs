// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for command parsing and validation

use std::fmt;

use crate::frame::ControlField;

/// Inbound text could not be turned into three integer tokens
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedCommandError {
    #[error("Datagram is not valid UTF-8")]
    InvalidUtf8,

    #[error("Expected at least 3 integer tokens, found {found}")]
    MissingTokens { found: usize },

    #[error("Token '{token}' for {field} is not a valid integer")]
    InvalidInteger { field: ControlField, token: String },
}

/// One field that fell outside 0-255
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: ControlField,
    pub value: i64,
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.field, self.value)
    }
}

/// One or more control values outside the byte range.
///
/// Violations are listed in wire order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Control values out of range 0-255: {}", join_violations(.violations))]
pub struct OutOfRangeError {
    pub violations: Vec<FieldViolation>,
}

impl OutOfRangeError {
    /// Fields that violated the bound
    pub fn fields(&self) -> Vec<ControlField> {
        self.violations.iter().map(|v| v.field).collect()
    }
}

fn join_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Any reason a command was dropped before encoding
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("Malformed command: {0}")]
    Malformed(#[from] MalformedCommandError),

    #[error(transparent)]
    OutOfRange(#[from] OutOfRangeError),
}
