//! # Hex Helpers for Table Payloads
//!
//! Table payloads are logged as hex when written to the device and stored as
//! hex strings in meter images. These helpers wrap the `hex` crate with the
//! error type and formatting used across the crate.

use thiserror::Error;

/// Errors that can occur while decoding a hex table payload
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HexError {
    #[error("Odd number of hex characters: {0}")]
    OddLength(usize),

    #[error("Hex decoding error: {0}")]
    DecodeError(String),
}

/// Encode a table payload as uppercase hex (meter image format)
pub fn encode_hex(data: &[u8]) -> String {
    hex::encode_upper(data)
}

/// Decode a table payload from hex, ignoring whitespace
///
/// An empty string decodes to an empty table.
pub fn decode_hex(hex_str: &str) -> Result<Vec<u8>, HexError> {
    let cleaned: String = hex_str.chars().filter(|c| !c.is_whitespace()).collect();

    if cleaned.len() % 2 != 0 {
        return Err(HexError::OddLength(cleaned.len()));
    }

    hex::decode(&cleaned).map_err(|e| HexError::DecodeError(e.to_string()))
}

/// Format bytes as "0a 1b 2c" for single-line log messages
pub fn format_hex_compact(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Multi-line dump with table offsets, starting at `base_offset`
pub fn pretty_hex(data: &[u8], base_offset: usize, bytes_per_line: usize) -> String {
    data.chunks(bytes_per_line.max(1))
        .enumerate()
        .map(|(i, chunk)| {
            format!(
                "{:06x}: {}",
                base_offset + i * bytes_per_line,
                format_hex_compact(chunk)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
