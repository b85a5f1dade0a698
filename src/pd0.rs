//! PD0 ensemble reader.
//!
//! Wire format (little-endian):
//! ```text
//! 7F 7F NBYTES:u16 SPARE NTYPES OFFSET:u16[NTYPES] | blocks... | SUM:u16
//! ```
//!
//! NBYTES counts everything before SUM. SUM is the 16-bit wrapping sum of
//! those bytes. Each OFFSET points at a block that starts with a u16 id.
//! Only the fixed leader, velocity and correlation blocks are read.

use crate::codec;
use crate::error::{DecodeError, Result};
use crate::legacy::LegacyFrame;
use crate::matrix::Matrix;
use crate::section::CoordinateFrame;

const HEADER_ID: u8 = 0x7F;

/// Header id, byte count, spare, and type count.
const HEADER_FIXED: usize = 6;

const CHECKSUM_LEN: usize = 2;

const ID_FIXED_LEADER: u16 = 0x0000;
const ID_VELOCITY: u16 = 0x0100;
const ID_CORRELATION: u16 = 0x0200;

// Fixed leader field offsets
const FL_NUM_BEAMS: usize = 8;
const FL_NUM_CELLS: usize = 9;
const FL_CODE_REPEATS: usize = 18;
const FL_COORD_TRANSFORM: usize = 25;

/// 16-bit wrapping byte sum.
pub fn checksum(data: &[u8]) -> u16 {
    data.iter().fold(0u16, |acc, &b| acc.wrapping_add(u16::from(b)))
}

/// Coordinate system from the fixed leader's EX byte (bits 4:3).
fn coordinate_frame(ex: u8) -> CoordinateFrame {
    match (ex >> 3) & 0x03 {
        0 => CoordinateFrame::Beam,
        1 => CoordinateFrame::Instrument,
        2 => CoordinateFrame::Ship,
        _ => CoordinateFrame::Earth,
    }
}

/// Parse one complete PD0 ensemble (header through checksum).
pub fn parse(wire: &[u8]) -> Result<LegacyFrame> {
    if wire.len() < HEADER_FIXED {
        return Err(DecodeError::payload_too_short("Pd0Header", HEADER_FIXED, wire.len()));
    }
    if wire[0] != HEADER_ID || wire[1] != HEADER_ID {
        return Err(DecodeError::MissingPd0Header {
            got: u16::from_be_bytes([wire[0], wire[1]]),
        });
    }

    let nbytes = usize::from(codec::read_uint16(wire, 2)?);
    if nbytes < HEADER_FIXED {
        return Err(DecodeError::payload_too_short("Pd0Ensemble", HEADER_FIXED, nbytes));
    }
    if wire.len() < nbytes + CHECKSUM_LEN {
        return Err(DecodeError::payload_too_short("Pd0Ensemble", nbytes + CHECKSUM_LEN, wire.len()));
    }
    let expected = codec::read_uint16(wire, nbytes)?;
    let computed = checksum(&wire[..nbytes]);
    if expected != computed {
        return Err(DecodeError::ChecksumMismatch { expected, computed });
    }
    let data = &wire[..nbytes];

    // Locate blocks through the offset table
    let ntypes = usize::from(data[5]);
    let mut fixed = None;
    let mut velocity = None;
    let mut correlation = None;
    for i in 0..ntypes {
        let offset = usize::from(codec::read_uint16(data, HEADER_FIXED + i * 2)?);
        match codec::read_uint16(data, offset) {
            Ok(ID_FIXED_LEADER) => fixed = Some(offset),
            Ok(ID_VELOCITY) => velocity = Some(offset),
            Ok(ID_CORRELATION) => correlation = Some(offset),
            Ok(id) => log::trace!("skipping PD0 block 0x{id:04X}"),
            Err(_) => log::warn!("PD0 block offset {offset} past end of ensemble ({nbytes} bytes)"),
        }
    }

    let fixed = fixed.ok_or(DecodeError::MissingPd0Block("fixed leader"))?;
    let fl = &data[fixed..];
    if fl.len() <= FL_COORD_TRANSFORM {
        return Err(DecodeError::payload_too_short("Pd0FixedLeader", FL_COORD_TRANSFORM + 1, fl.len())
            .with_raw(fl));
    }
    let beams = usize::from(fl[FL_NUM_BEAMS]);
    let cells = usize::from(fl[FL_NUM_CELLS]);

    Ok(LegacyFrame {
        velocities: velocity.and_then(|off| read_velocity(&data[off..], cells, beams)),
        correlation: correlation.and_then(|off| read_correlation(&data[off..], cells, beams)),
        num_code_repeats: f32::from(fl[FL_CODE_REPEATS]),
        coordinate: coordinate_frame(fl[FL_COORD_TRANSFORM]),
    })
}

/// Cell-major i16 mm/s after the 2-byte id. `None` if the block is short.
fn read_velocity(block: &[u8], cells: usize, beams: usize) -> Option<Matrix<f32>> {
    let need = 2 + cells * beams * 2;
    if block.len() < need {
        log::warn!("PD0 velocity block truncated ({} of {need} bytes)", block.len());
        return None;
    }
    let mut m = Matrix::new(cells, beams, 0.0);
    for cell in 0..cells {
        for beam in 0..beams {
            let v = codec::read_int16(block, 2 + (cell * beams + beam) * 2).ok()?;
            m.set(cell, beam, f32::from(v));
        }
    }
    Some(m)
}

/// Cell-major u8 counts after the 2-byte id. `None` if the block is short.
fn read_correlation(block: &[u8], cells: usize, beams: usize) -> Option<Matrix<u8>> {
    let need = 2 + cells * beams;
    if block.len() < need {
        log::warn!("PD0 correlation block truncated ({} of {need} bytes)", block.len());
        return None;
    }
    let mut m = Matrix::new(cells, beams, 0u8);
    for cell in 0..cells {
        for beam in 0..beams {
            m.set(cell, beam, block[2 + cell * beams + beam]);
        }
    }
    Some(m)
}

/// Find and parse every PD0 ensemble in `data`, skipping anything that
/// fails to parse.
pub fn scan(data: &[u8]) -> Vec<LegacyFrame> {
    let mut frames = Vec::new();
    let mut pos = 0;

    while pos + 4 <= data.len() {
        if data[pos] != HEADER_ID || data[pos + 1] != HEADER_ID {
            pos += 1;
            continue;
        }
        let nbytes = usize::from(u16::from_le_bytes([data[pos + 2], data[pos + 3]]));
        let end = pos + nbytes + CHECKSUM_LEN;
        if end > data.len() {
            log::debug!("PD0 ensemble at {pos} runs past end of data");
            pos += 1;
            continue;
        }
        match parse(&data[pos..end]) {
            Ok(frame) => {
                frames.push(frame);
                pos = end;
            }
            Err(e) => {
                log::debug!("skipping PD0 candidate at {pos}: {e}");
                pos += 1;
            }
        }
    }

    frames
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
