//! Field codecs for ensemble and PD0 payloads.
//!
//! All multi-byte values are little-endian. Floats are IEEE-754 single
//! precision; signed integers are two's complement.

use crate::error::{DecodeError, Result};

/// Size in bytes of one Int32 or Float32 element.
pub const WORD: usize = 4;

// ---------------------------------------------------------------------------
// Read helpers
// ---------------------------------------------------------------------------

/// Read a little-endian signed 16-bit integer.
pub fn read_int16(data: &[u8], offset: usize) -> Result<i16> {
    check_len(data, offset, 2, "INT16")?;
    Ok(i16::from_le_bytes([data[offset], data[offset + 1]]))
}

/// Read a little-endian unsigned 16-bit integer.
pub fn read_uint16(data: &[u8], offset: usize) -> Result<u16> {
    check_len(data, offset, 2, "UINT16")?;
    Ok(u16::from_le_bytes([data[offset], data[offset + 1]]))
}

/// Read a little-endian signed 32-bit integer.
pub fn read_int32(data: &[u8], offset: usize) -> Result<i32> {
    check_len(data, offset, WORD, "INT32")?;
    Ok(i32::from_le_bytes(word(data, offset)))
}

/// Read a little-endian unsigned 32-bit integer.
pub fn read_uint32(data: &[u8], offset: usize) -> Result<u32> {
    check_len(data, offset, WORD, "UINT32")?;
    Ok(u32::from_le_bytes(word(data, offset)))
}

/// Read a little-endian IEEE-754 single.
pub fn read_float32(data: &[u8], offset: usize) -> Result<f32> {
    check_len(data, offset, WORD, "FLOAT32")?;
    Ok(f32::from_le_bytes(word(data, offset)))
}

// ---------------------------------------------------------------------------
// Write helpers
// ---------------------------------------------------------------------------

/// Write a little-endian signed 16-bit integer.
pub fn write_int16(buf: &mut Vec<u8>, val: i16) {
    buf.extend_from_slice(&val.to_le_bytes());
}

/// Write a little-endian unsigned 16-bit integer.
pub fn write_uint16(buf: &mut Vec<u8>, val: u16) {
    buf.extend_from_slice(&val.to_le_bytes());
}

/// Write a little-endian signed 32-bit integer.
pub fn write_int32(buf: &mut Vec<u8>, val: i32) {
    buf.extend_from_slice(&val.to_le_bytes());
}

/// Write a little-endian unsigned 32-bit integer.
pub fn write_uint32(buf: &mut Vec<u8>, val: u32) {
    buf.extend_from_slice(&val.to_le_bytes());
}

/// Write a little-endian IEEE-754 single.
pub fn write_float32(buf: &mut Vec<u8>, val: f32) {
    buf.extend_from_slice(&val.to_le_bytes());
}

// ---------------------------------------------------------------------------
// Internal
// ---------------------------------------------------------------------------

fn word(data: &[u8], offset: usize) -> [u8; WORD] {
    [
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ]
}

fn check_len(data: &[u8], offset: usize, need: usize, name: &'static str) -> Result<()> {
    if data.len() < offset + need {
        Err(DecodeError::payload_too_short(name, offset + need, data.len()))
    } else {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int32_little_endian() {
        let data = [0x78, 0x56, 0x34, 0x12];
        assert_eq!(read_int32(&data, 0).unwrap(), 0x1234_5678);

        let mut buf = Vec::new();
        write_int32(&mut buf, -2);
        assert_eq!(buf, vec![0xFE, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn float32_bad_velocity_bits() {
        // 88.888 is the ensemble bad-velocity marker: 0x42B1C6A8
        let mut buf = Vec::new();
        write_float32(&mut buf, 88.888);
        assert_eq!(buf, vec![0xA8, 0xC6, 0xB1, 0x42]);
        assert_eq!(read_float32(&buf, 0).unwrap(), 88.888);
    }

    #[test]
    fn int16_pd0_bad_velocity() {
        let data = [0x00, 0x80];
        assert_eq!(read_int16(&data, 0).unwrap(), -32768);
        assert_eq!(read_uint16(&data, 0).unwrap(), 0x8000);
    }

    #[test]
    fn offset_read() {
        let data = [0xFF, 0xFF, 0x0A, 0x00, 0x00, 0x00];
        assert_eq!(read_uint32(&data, 2).unwrap(), 10);
    }

    #[test]
    fn short_read_is_error() {
        let data = [0x01, 0x02, 0x03];
        assert!(matches!(
            read_float32(&data, 0),
            Err(DecodeError::PayloadTooShort { need: 4, got: 3, .. })
        ));
        assert!(read_int16(&data, 2).is_err());
    }
}
