//! Bin x beam matrices and flat scalar arrays shared by every data section.
//!
//! [`Matrix`] is the logical `[bin][beam]` view. Decode and encode walk the
//! payload beam-major through [`layout`], so a matrix re-encodes to exactly
//! the bytes it was read from.

use std::fmt::Debug;

use crate::codec;
use crate::error::{DecodeError, Result};
use crate::header::{SectionHeader, ValueType};
use crate::layout;

/// A one-word element type that can live in a section payload.
pub trait Word: Copy + PartialEq + Debug + Default {
    const VALUE_TYPE: ValueType;

    fn read(data: &[u8], offset: usize) -> Result<Self>;
    fn write(self, buf: &mut Vec<u8>);
}

impl Word for f32 {
    const VALUE_TYPE: ValueType = ValueType::Float;

    fn read(data: &[u8], offset: usize) -> Result<Self> {
        codec::read_float32(data, offset)
    }

    fn write(self, buf: &mut Vec<u8>) {
        codec::write_float32(buf, self);
    }
}

impl Word for i32 {
    const VALUE_TYPE: ValueType = ValueType::Int;

    fn read(data: &[u8], offset: usize) -> Result<Self> {
        codec::read_int32(data, offset)
    }

    fn write(self, buf: &mut Vec<u8>) {
        codec::write_int32(buf, self);
    }
}

/// Logical `[bin][beam]` grid of values.
///
/// Storage is beam-major to mirror the wire. Indexing past the declared
/// dimensions panics.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Matrix<T> {
    num_bins: usize,
    num_beams: usize,
    data: Vec<T>,
}

impl<T: Copy> Matrix<T> {
    /// A `num_bins` x `num_beams` matrix with every cell set to `fill`.
    pub fn new(num_bins: usize, num_beams: usize, fill: T) -> Self {
        Self {
            num_bins,
            num_beams,
            data: vec![fill; num_bins * num_beams],
        }
    }

    /// Build from rows, one `Vec` of beam values per bin.
    ///
    /// # Panics
    /// If the rows are ragged.
    pub fn from_rows(rows: &[Vec<T>]) -> Self
    where
        T: Default,
    {
        let num_bins = rows.len();
        let num_beams = rows.first().map_or(0, Vec::len);
        let mut m = Self::new(num_bins, num_beams, T::default());
        for (bin, row) in rows.iter().enumerate() {
            assert_eq!(row.len(), num_beams, "ragged row at bin {bin}");
            for (beam, &v) in row.iter().enumerate() {
                m.set(bin, beam, v);
            }
        }
        m
    }

    pub fn num_bins(&self) -> usize {
        self.num_bins
    }

    pub fn num_beams(&self) -> usize {
        self.num_beams
    }

    pub fn get(&self, bin: usize, beam: usize) -> T {
        self.data[self.index(bin, beam)]
    }

    pub fn set(&mut self, bin: usize, beam: usize, value: T) {
        let i = self.index(bin, beam);
        self.data[i] = value;
    }

    /// All beam values of one bin.
    pub fn bin(&self, bin: usize) -> Vec<T> {
        (0..self.num_beams).map(|beam| self.get(bin, beam)).collect()
    }

    /// All bin values of one beam, contiguous as on the wire.
    pub fn beam(&self, beam: usize) -> &[T] {
        assert!(beam < self.num_beams, "beam {beam} out of range ({})", self.num_beams);
        &self.data[beam * self.num_bins..(beam + 1) * self.num_bins]
    }

    /// Apply `f` to every cell, producing a matrix of the same shape.
    pub fn map<U: Copy>(&self, f: impl Fn(T) -> U) -> Matrix<U> {
        Matrix {
            num_bins: self.num_bins,
            num_beams: self.num_beams,
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }

    fn index(&self, bin: usize, beam: usize) -> usize {
        assert!(
            bin < self.num_bins && beam < self.num_beams,
            "cell ({bin}, {beam}) out of range ({} bins x {} beams)",
            self.num_bins,
            self.num_beams,
        );
        beam * self.num_bins + bin
    }
}

impl<T: Word> Matrix<T> {
    /// Decode a complete section (header included) into a matrix.
    ///
    /// Dimensions come from `num_bins`/`num_beams`, which callers take from
    /// the section's own element count and multiplier.
    pub fn decode(data: &[u8], name_len: u32, num_bins: usize, num_beams: usize) -> Result<Self> {
        let need = layout::bin_beam_offset(name_len, num_bins, num_beams, 0);
        if data.len() < need {
            return Err(DecodeError::payload_too_short("Matrix", need, data.len()).with_raw(data));
        }

        let mut values = Vec::with_capacity(num_bins * num_beams);
        for beam in 0..num_beams {
            for bin in 0..num_bins {
                values.push(T::read(data, layout::bin_beam_offset(name_len, num_bins, beam, bin))?);
            }
        }

        Ok(Self {
            num_bins,
            num_beams,
            data: values,
        })
    }

    /// Decode using the dimensions declared by `header`.
    pub fn decode_section(data: &[u8], header: &SectionHeader) -> Result<Self> {
        check_value_type::<T>(header, "Matrix")?;
        Self::decode(
            data,
            header.name_len,
            header.element_count as usize,
            header.element_multiplier as usize,
        )
    }

    /// Encode as a section named `name`.
    pub fn encode(&self, name: &str) -> Vec<u8> {
        let header = SectionHeader::new(
            T::VALUE_TYPE,
            self.num_bins as u32,
            self.num_beams as u32,
            name,
        );
        self.encode_with(&header)
    }

    /// Encode behind `header`, whose dimensions are replaced by this matrix's.
    pub fn encode_with(&self, header: &SectionHeader) -> Vec<u8> {
        let header = header.with_dimensions(self.num_bins as u32, self.num_beams as u32);
        let mut buf = Vec::with_capacity(header.section_len());
        header.encode_into(&mut buf);
        for &v in &self.data {
            v.write(&mut buf);
        }
        buf
    }
}

/// Decode `count` flat elements in declaration order.
pub fn decode_scalars<T: Word>(data: &[u8], name_len: u32, count: usize) -> Result<Vec<T>> {
    let need = layout::scalar_offset(name_len, count);
    if data.len() < need {
        return Err(DecodeError::payload_too_short("Scalars", need, data.len()).with_raw(data));
    }
    (0..count)
        .map(|i| T::read(data, layout::scalar_offset(name_len, i)))
        .collect()
}

/// Encode flat elements behind `header`.
///
/// The header's multiplier is kept when it still divides the element count;
/// otherwise the section is written as `values.len()` x 1.
pub fn encode_scalars<T: Word>(values: &[T], header: &SectionHeader) -> Vec<u8> {
    let mult = header.element_multiplier.max(1) as usize;
    let header = if values.len() % mult == 0 {
        header.with_dimensions((values.len() / mult) as u32, mult as u32)
    } else {
        header.with_dimensions(values.len() as u32, 1)
    };
    let mut buf = Vec::with_capacity(header.section_len());
    header.encode_into(&mut buf);
    for &v in values {
        v.write(&mut buf);
    }
    buf
}

pub(crate) fn check_value_type<T: Word>(header: &SectionHeader, what: &'static str) -> Result<()> {
    if header.value_type != T::VALUE_TYPE {
        return Err(DecodeError::ValueTypeMismatch {
            what,
            expected: T::VALUE_TYPE.code(),
            got: header.value_type.code(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
