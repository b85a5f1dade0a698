use thiserror::Error;

/// Errors arising from ensemble, section, and PD0 decoding.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("ensemble header not found (expected 16 x 0x80, got 0x{got:02X})")]
    MissingHeader { got: u8 },

    #[error("PD0 header not found (expected 0x7F7F, got 0x{got:04X})")]
    MissingPd0Header { got: u16 },

    #[error("PD0 ensemble has no {0} block")]
    MissingPd0Block(&'static str),

    #[error("corrupt ensemble header: {field} 0x{value:08X} does not match inverse 0x{inverse:08X}")]
    InverseMismatch {
        field: &'static str,
        value: u32,
        inverse: u32,
    },

    #[error("checksum mismatch (expected 0x{expected:04X}, computed 0x{computed:04X})")]
    ChecksumMismatch { expected: u16, computed: u16 },

    #[error("unknown value type {code} in section {name:?}")]
    UnknownValueType { code: u32, name: String },

    #[error("invalid section name: {0}")]
    InvalidName(#[from] std::string::FromUtf8Error),

    #[error("payload too short for {what}: need {need} bytes, got {got}{}", format_raw_suffix(raw))]
    PayloadTooShort {
        what: &'static str,
        need: usize,
        got: usize,
        /// Raw bytes for debug context.
        raw: Vec<u8>,
    },

    #[error("unexpected value type for {what}: expected {expected}, got {got}")]
    ValueTypeMismatch {
        what: &'static str,
        expected: u32,
        got: u32,
    },
}

impl DecodeError {
    /// Create a `PayloadTooShort` error (raw bytes filled in later via `with_raw`).
    pub(crate) fn payload_too_short(what: &'static str, need: usize, got: usize) -> Self {
        Self::PayloadTooShort { what, need, got, raw: Vec::new() }
    }

    /// Attach raw bytes to decode-phase errors for diagnostics.
    pub fn with_raw(self, data: &[u8]) -> Self {
        match self {
            Self::PayloadTooShort { what, need, got, .. } => {
                Self::PayloadTooShort { what, need, got, raw: data.to_vec() }
            }
            other => other,
        }
    }
}

/// Format raw bytes as a suffix like " | 0A000000..." (empty if no bytes).
fn format_raw_suffix(raw: &[u8]) -> String {
    if raw.is_empty() {
        return String::new();
    }
    let limit = 16;
    let hex: String = raw.iter().take(limit).map(|b| format!("{b:02X}")).collect();
    let ellipsis = if raw.len() > limit { "..." } else { "" };
    format!(" | {hex}{ellipsis}")
}

pub type Result<T> = std::result::Result<T, DecodeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_suffix_truncates() {
        let err = DecodeError::payload_too_short("Matrix", 40, 20).with_raw(&[0xAB; 20]);
        let msg = err.to_string();
        assert!(msg.starts_with("payload too short for Matrix: need 40 bytes, got 20 | ABAB"));
        assert!(msg.ends_with("..."));
    }

    #[test]
    fn raw_suffix_is_unspaced_hex() {
        let err = DecodeError::payload_too_short("Word", 8, 4).with_raw(&[0x0A, 0, 0, 0]);
        assert_eq!(err.to_string(), "payload too short for Word: need 8 bytes, got 4 | 0A000000");
    }

    #[test]
    fn raw_suffix_empty() {
        let err = DecodeError::payload_too_short("Header", 28, 3);
        assert_eq!(err.to_string(), "payload too short for Header: need 28 bytes, got 3");
    }
}
