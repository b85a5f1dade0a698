//! Byte offsets of elements inside a section.
//!
//! Binned payloads are beam-major: every bin of beam 0, then every bin of
//! beam 1, and so on. Both Int32 and Float32 elements occupy one word.
//!
//! No bounds checking happens here. Callers validate `beam` against the
//! section's element multiplier and `bin` against its element count.

use crate::codec::WORD;
use crate::header::base_header_size;

/// Offset of flat element `index` in a non-binned section.
pub fn scalar_offset(name_len: u32, index: usize) -> usize {
    base_header_size(name_len) as usize + index * WORD
}

/// Offset of element (`bin`, `beam`) in a section with `num_bins` bins.
pub fn bin_beam_offset(name_len: u32, num_bins: usize, beam: usize, bin: usize) -> usize {
    base_header_size(name_len) as usize + (beam * num_bins + bin) * WORD
}
