// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Human-readable rendering of raw frames

/// Render bytes as zero-padded decimal (minimum two digits), separated by
/// single spaces. Values of 100 and above print all three digits.
pub fn format_diagnostic(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_width_bytes() {
        assert_eq!(
            format_diagnostic(&[1, 255, 0, 16, 9, 200, 7, 128]),
            "01 255 00 16 09 200 07 128"
        );
    }

    #[test]
    fn test_empty() {
        assert_eq!(format_diagnostic(&[]), "");
    }
}
