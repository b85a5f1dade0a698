//! Ensemble framing, checksum, and stream splitting.
//!
//! Wire format:
//! ```text
//! 80 x16 | NUMBER ~NUMBER SIZE ~SIZE | PAYLOAD[SIZE] | CHECKSUM
//! ```
//!
//! NUMBER and SIZE are little-endian u32, each followed by its bitwise
//! inverse. PAYLOAD is the concatenated sections. CHECKSUM is a 4-byte word
//! whose low 16 bits are CRC-16/CCITT (poly 0x1021, init 0) of PAYLOAD.

use crate::codec;
use crate::error::{DecodeError, Result};

const SYNC: u8 = 0x80;
const SYNC_LEN: usize = 16;

/// Sync bytes plus the four header words.
pub const HEADER_LEN: usize = SYNC_LEN + 4 * codec::WORD;

/// Trailing checksum word.
pub const CHECKSUM_LEN: usize = codec::WORD;

/// Payload sizes above this are treated as header corruption.
const MAX_PAYLOAD: u32 = 1 << 24;

/// CRC-16/CCITT with a zero seed.
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for &b in data {
        crc ^= u16::from(b) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ 0x1021
            } else {
                crc << 1
            };
        }
    }
    crc
}

/// A checksum-verified ensemble with its undecoded section payload.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEnsemble {
    pub number: u32,
    pub payload: Vec<u8>,
}

impl RawEnsemble {
    /// Parse a single complete ensemble (sync bytes through checksum).
    pub fn parse(wire: &[u8]) -> Result<Self> {
        if wire.len() < HEADER_LEN + CHECKSUM_LEN {
            return Err(DecodeError::payload_too_short(
                "Ensemble",
                HEADER_LEN + CHECKSUM_LEN,
                wire.len(),
            ));
        }
        if let Some(&got) = wire[..SYNC_LEN].iter().find(|&&b| b != SYNC) {
            return Err(DecodeError::MissingHeader { got });
        }

        let (number, size) = read_header_words(wire)?;
        let size = size as usize;
        let end = HEADER_LEN + size;
        if wire.len() < end + CHECKSUM_LEN {
            return Err(DecodeError::payload_too_short("Ensemble", end + CHECKSUM_LEN, wire.len())
                .with_raw(&wire[..HEADER_LEN]));
        }

        let payload = &wire[HEADER_LEN..end];
        let expected = (codec::read_uint32(wire, end)? & 0xFFFF) as u16;
        let computed = crc16(payload);
        if expected != computed {
            return Err(DecodeError::ChecksumMismatch { expected, computed });
        }

        Ok(RawEnsemble {
            number,
            payload: payload.to_vec(),
        })
    }

    /// Encode into a complete wire ensemble with header and checksum.
    pub fn encode(&self) -> Vec<u8> {
        let size = self.payload.len() as u32;
        let mut wire = Vec::with_capacity(HEADER_LEN + self.payload.len() + CHECKSUM_LEN);
        wire.extend_from_slice(&[SYNC; SYNC_LEN]);
        codec::write_uint32(&mut wire, self.number);
        codec::write_uint32(&mut wire, !self.number);
        codec::write_uint32(&mut wire, size);
        codec::write_uint32(&mut wire, !size);
        wire.extend_from_slice(&self.payload);
        codec::write_uint32(&mut wire, u32::from(crc16(&self.payload)));
        wire
    }
}

/// Read NUMBER and SIZE, checking each against its inverse.
fn read_header_words(wire: &[u8]) -> Result<(u32, u32)> {
    let number = codec::read_uint32(wire, SYNC_LEN)?;
    let inverse = codec::read_uint32(wire, SYNC_LEN + 4)?;
    if number != !inverse {
        return Err(DecodeError::InverseMismatch {
            field: "ensemble number",
            value: number,
            inverse,
        });
    }
    let size = codec::read_uint32(wire, SYNC_LEN + 8)?;
    let inverse = codec::read_uint32(wire, SYNC_LEN + 12)?;
    if size != !inverse || size > MAX_PAYLOAD {
        return Err(DecodeError::InverseMismatch {
            field: "payload size",
            value: size,
            inverse,
        });
    }
    Ok((number, size))
}

/// Splits a byte stream into individual ensembles. Buffers partial data
/// across calls, so it can be fed serial reads of any size.
pub struct EnsembleSplitter {
    buf: Vec<u8>,
}

impl EnsembleSplitter {
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(8192),
        }
    }

    /// Feed new data and extract any complete ensembles.
    ///
    /// Returns raw wire ensembles (sync through checksum) ready for
    /// [`RawEnsemble::parse`]. Partial ensembles are buffered for the next
    /// call; a header whose inverse words don't match is skipped.
    pub fn feed(&mut self, data: &[u8]) -> Vec<Vec<u8>> {
        self.buf.extend_from_slice(data);
        let mut ensembles = Vec::new();

        loop {
            // Find the sync run
            let start = match self
                .buf
                .windows(SYNC_LEN)
                .position(|w| w.iter().all(|&b| b == SYNC))
            {
                Some(pos) => pos,
                None => {
                    // Keep a tail that may be the beginning of a sync run
                    let keep = self.buf.len().min(SYNC_LEN - 1);
                    self.buf.drain(..self.buf.len() - keep);
                    break;
                }
            };

            // Discard any bytes before the sync run
            if start > 0 {
                self.buf.drain(..start);
            }

            if self.buf.len() < HEADER_LEN {
                break;
            }

            let size = match read_header_words(&self.buf) {
                Ok((_, size)) => size as usize,
                Err(e) => {
                    log::debug!("resynchronising: {e}");
                    self.buf.drain(..1);
                    continue;
                }
            };

            let total = HEADER_LEN + size + CHECKSUM_LEN;
            if self.buf.len() < total {
                break;
            }
            ensembles.push(self.buf.drain(..total).collect());
        }

        ensembles
    }
}

impl Default for EnsembleSplitter {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RawEnsemble {
        RawEnsemble {
            number: 42,
            payload: b"123456789".to_vec(),
        }
    }

    #[test]
    fn crc_check_value() {
        assert_eq!(crc16(b"123456789"), 0x31C3);
        assert_eq!(crc16(&[]), 0);
    }

    #[test]
    fn encode_worked_example() {
        let wire = sample().encode();
        assert_eq!(&wire[..16], &[0x80; 16]);
        assert_eq!(&wire[16..20], &[42, 0, 0, 0]);
        assert_eq!(&wire[20..24], &[0xD5, 0xFF, 0xFF, 0xFF]);
        assert_eq!(&wire[24..28], &[9, 0, 0, 0]);
        assert_eq!(&wire[28..32], &[0xF6, 0xFF, 0xFF, 0xFF]);
        assert_eq!(&wire[32..41], b"123456789");
        assert_eq!(&wire[41..], &[0xC3, 0x31, 0x00, 0x00]);
    }

    #[test]
    fn round_trip() {
        let wire = sample().encode();
        assert_eq!(RawEnsemble::parse(&wire).unwrap(), sample());
    }

    #[test]
    fn bad_checksum() {
        let mut wire = sample().encode();
        wire[41] ^= 0xFF;
        assert!(matches!(
            RawEnsemble::parse(&wire),
            Err(DecodeError::ChecksumMismatch { computed: 0x31C3, .. })
        ));
    }

    #[test]
    fn bad_inverse() {
        let mut wire = sample().encode();
        wire[20] = 0;
        assert!(matches!(
            RawEnsemble::parse(&wire),
            Err(DecodeError::InverseMismatch { field: "ensemble number", .. })
        ));
    }

    #[test]
    fn missing_sync() {
        let mut wire = sample().encode();
        wire[3] = 0x7F;
        assert!(matches!(
            RawEnsemble::parse(&wire),
            Err(DecodeError::MissingHeader { got: 0x7F })
        ));
    }

    #[test]
    fn truncated() {
        let wire = sample().encode();
        assert!(matches!(
            RawEnsemble::parse(&wire[..wire.len() - 2]),
            Err(DecodeError::PayloadTooShort { .. })
        ));
    }

    #[test]
    fn splitter_partial() {
        let wire = sample().encode();
        let mut splitter = EnsembleSplitter::new();
        assert!(splitter.feed(&wire[..10]).is_empty());
        assert!(splitter.feed(&wire[10..35]).is_empty());
        let out = splitter.feed(&wire[35..]);
        assert_eq!(out, vec![wire]);
    }

    #[test]
    fn splitter_multiple_with_garbage() {
        let a = sample().encode();
        let b = RawEnsemble { number: 43, payload: vec![1, 2, 3, 4] }.encode();
        let mut data = vec![0x00, 0x80, 0x80, 0x11];
        data.extend_from_slice(&a);
        data.extend_from_slice(&[0xFF; 7]);
        data.extend_from_slice(&b);

        let mut splitter = EnsembleSplitter::new();
        let out = splitter.feed(&data);
        assert_eq!(out.len(), 2);
        assert_eq!(RawEnsemble::parse(&out[1]).unwrap().number, 43);
    }

    #[test]
    fn splitter_skips_corrupt_header() {
        let mut bad = sample().encode();
        bad[24] = 0x55; // size no longer matches its inverse
        let good = sample().encode();
        let mut data = bad[..HEADER_LEN].to_vec();
        data.extend_from_slice(&good);

        let mut splitter = EnsembleSplitter::new();
        let out = splitter.feed(&data);
        assert_eq!(out, vec![good]);
    }
}
