//! Little-endian fixed-width reads over byte slices.

use crate::SparseError;
use crate::types::ComponentType;

/// Which sub-buffer a read came from, for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubBuffer {
    Indices,
    Values,
}

impl std::fmt::Display for SubBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubBuffer::Indices => f.write_str("indices"),
            SubBuffer::Values => f.write_str("values"),
        }
    }
}

/// Returns `len` bytes at `offset`, or `TruncatedSubBuffer` if they run past the end.
pub fn read_slice(
    bytes: &[u8],
    offset: usize,
    len: usize,
    which: SubBuffer,
) -> Result<&[u8], SparseError> {
    let truncated = || SparseError::TruncatedSubBuffer {
        which,
        needed: offset.saturating_add(len),
        available: bytes.len(),
    };
    let end = offset.checked_add(len).ok_or_else(truncated)?;
    bytes.get(offset..end).ok_or_else(truncated)
}

/// Reads one unsigned integer of width `ct.byte_size()` at `offset`.
///
/// Signed component types are read as their unsigned counterpart.
pub fn read_index(bytes: &[u8], offset: usize, ct: ComponentType) -> Result<usize, SparseError> {
    if !ct.is_integer() {
        return Err(SparseError::InvalidIndexType(ct));
    }
    let b = read_slice(bytes, offset, ct.byte_size(), SubBuffer::Indices)?;
    let index = match b.len() {
        1 => b[0] as usize,
        2 => u16::from_le_bytes([b[0], b[1]]) as usize,
        _ => u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as usize,
    };
    Ok(index)
}

pub fn as_f32n<const N: usize>(bytes: &[u8]) -> Vec<[f32; N]> {
    bytes
        .chunks_exact(4 * N)
        .map(|c| {
            let mut v = [0f32; N];
            for (i, out) in v.iter_mut().enumerate() {
                let base = i * 4;
                *out = f32::from_le_bytes([c[base], c[base + 1], c[base + 2], c[base + 3]]);
            }
            v
        })
        .collect()
}

pub fn as_f32(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}
