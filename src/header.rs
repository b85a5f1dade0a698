//! Section header codec.
//!
//! Wire layout (all words little-endian u32):
//! ```text
//! VALUE_TYPE ELEMENT_COUNT ELEMENT_MULTIPLIER IMAGE NAME_LENGTH NAME[NAME_LENGTH]
//! ```
//!
//! The name is NUL padded to `NAME_LENGTH` bytes, normally 8 (`"E000001\0"`).

use std::fmt;

use crate::codec;
use crate::error::{DecodeError, Result};

/// Number of u32 words ahead of the name.
const HEADER_WORDS: usize = 5;

/// Name length written by every instrument firmware to date.
pub const DEFAULT_NAME_LEN: u32 = 8;

/// Size of the fixed header for a section whose name is `name_len` bytes.
pub fn base_header_size(name_len: u32) -> u32 {
    ((HEADER_WORDS * codec::WORD) as u32).saturating_add(name_len)
}

/// Element value type of a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[repr(u32)]
pub enum ValueType {
    Float = 10,
    Int = 20,
    /// Text payload, one byte per element.
    Byte = 50,
}

impl ValueType {
    pub fn from_code(code: u32, name: &str) -> Result<Self> {
        match code {
            10 => Ok(Self::Float),
            20 => Ok(Self::Int),
            50 => Ok(Self::Byte),
            _ => Err(DecodeError::UnknownValueType {
                code,
                name: name.to_string(),
            }),
        }
    }

    pub fn code(self) -> u32 {
        self as u32
    }

    /// Bytes occupied by one element on the wire.
    pub fn element_size(self) -> usize {
        match self {
            Self::Float | Self::Int => codec::WORD,
            Self::Byte => 1,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Float => write!(f, "FLOAT"),
            Self::Int => write!(f, "INT"),
            Self::Byte => write!(f, "BYTE"),
        }
    }
}

/// Decoded section header.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SectionHeader {
    pub value_type: ValueType,
    /// Bins, or the flat element count for non-binned sections.
    pub element_count: u32,
    /// Beams, or items per element.
    pub element_multiplier: u32,
    pub image: u32,
    pub name_len: u32,
    /// Section id with NUL padding removed.
    pub name: String,
}

impl SectionHeader {
    /// Header with the default name length and a zero image tag.
    pub fn new(
        value_type: ValueType,
        element_count: u32,
        element_multiplier: u32,
        name: &str,
    ) -> Self {
        Self {
            value_type,
            element_count,
            element_multiplier,
            image: 0,
            name_len: DEFAULT_NAME_LEN.max(name.len() as u32),
            name: name.to_string(),
        }
    }

    /// Parse a header at the start of `data`.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let name_len = codec::read_uint32(data, 16)?;
        let size = base_header_size(name_len) as usize;
        if data.len() < size {
            return Err(DecodeError::payload_too_short("SectionHeader", size, data.len()));
        }
        let raw_name = &data[HEADER_WORDS * codec::WORD..size];
        let end = raw_name.iter().position(|&b| b == 0).unwrap_or(raw_name.len());
        let name = String::from_utf8(raw_name[..end].to_vec())?;

        Ok(Self {
            value_type: ValueType::from_code(codec::read_uint32(data, 0)?, &name)?,
            element_count: codec::read_uint32(data, 4)?,
            element_multiplier: codec::read_uint32(data, 8)?,
            image: codec::read_uint32(data, 12)?,
            name_len,
            name,
        })
    }

    /// Header size in bytes, name included.
    pub fn size(&self) -> usize {
        base_header_size(self.name_len) as usize
    }

    /// Payload size in bytes declared by this header.
    pub fn payload_len(&self) -> usize {
        (self.element_count as usize)
            .saturating_mul(self.element_multiplier as usize)
            .saturating_mul(self.value_type.element_size())
    }

    /// Header plus payload size in bytes.
    pub fn section_len(&self) -> usize {
        self.size().saturating_add(self.payload_len())
    }

    /// Copy of this header with new dimensions. Name and image tag are kept.
    pub fn with_dimensions(&self, element_count: u32, element_multiplier: u32) -> Self {
        Self {
            element_count,
            element_multiplier,
            ..self.clone()
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.size());
        self.encode_into(&mut buf);
        buf
    }

    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        codec::write_uint32(buf, self.value_type.code());
        codec::write_uint32(buf, self.element_count);
        codec::write_uint32(buf, self.element_multiplier);
        codec::write_uint32(buf, self.image);
        codec::write_uint32(buf, self.name_len);
        let mut name = self.name.as_bytes().to_vec();
        name.resize(self.name_len as usize, 0);
        buf.extend_from_slice(&name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EARTH_HEADER: [u8; 28] = [
        0x0A, 0, 0, 0, // FLOAT
        0x1E, 0, 0, 0, // 30 bins
        0x04, 0, 0, 0, // 4 beams
        0, 0, 0, 0, // image
        0x08, 0, 0, 0, // name length
        b'E', b'0', b'0', b'0', b'0', b'0', b'3', 0,
    ];

    #[test]
    fn base_size() {
        assert_eq!(base_header_size(8), 28);
        assert_eq!(base_header_size(0), 20);
    }

    #[test]
    fn decode_worked_example() {
        let h = SectionHeader::decode(&EARTH_HEADER).unwrap();
        assert_eq!(h.value_type, ValueType::Float);
        assert_eq!(h.element_count, 30);
        assert_eq!(h.element_multiplier, 4);
        assert_eq!(h.name, "E000003");
        assert_eq!(h.size(), 28);
        assert_eq!(h.payload_len(), 30 * 4 * 4);
    }

    #[test]
    fn encode_worked_example() {
        let h = SectionHeader::new(ValueType::Float, 30, 4, "E000003");
        assert_eq!(h.encode(), EARTH_HEADER.to_vec());
    }

    #[test]
    fn byte_sections_use_one_byte_elements() {
        let h = SectionHeader::new(ValueType::Byte, 17, 1, "E000011");
        assert_eq!(h.payload_len(), 17);
    }

    #[test]
    fn unknown_value_type() {
        let mut data = EARTH_HEADER;
        data[0] = 0x0B;
        assert!(matches!(
            SectionHeader::decode(&data),
            Err(DecodeError::UnknownValueType { code: 11, .. })
        ));
    }

    #[test]
    fn truncated_name() {
        assert!(matches!(
            SectionHeader::decode(&EARTH_HEADER[..24]),
            Err(DecodeError::PayloadTooShort { need: 28, got: 24, .. })
        ));
    }
}
