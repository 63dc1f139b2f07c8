//! Sparse accessor materialization.
//!
//! A sparse accessor stores a base buffer view plus `count` overrides: an
//! index sub-view naming the elements to replace and a values sub-view
//! holding the replacement elements, packed tightly in the accessor's own
//! component layout. Materializing copies the base view and writes each
//! override in ascending order, so a repeated index keeps its last value.

use crate::SparseError;
use crate::decode::{SubBuffer, read_index, read_slice};
use crate::types::{Accessor, BufferView, Sparse};

/// Resolves buffer views and the buffers they point into.
pub trait ViewSource {
    fn view(&self, index: usize) -> Option<BufferView>;
    fn buffer(&self, index: usize) -> Option<&[u8]>;

    /// Bytes covered by view `index`.
    fn view_bytes(&self, index: usize) -> Result<(BufferView, &[u8]), SparseError> {
        let view = self
            .view(index)
            .ok_or(SparseError::MissingBufferView(index))?;
        let buffer = self
            .buffer(view.buffer)
            .ok_or(SparseError::MissingBuffer(view.buffer))?;
        let bytes = view.slice(buffer, index)?;
        Ok((view, bytes))
    }
}

/// Returns a copy of view `view_index` with `accessor`'s sparse overrides applied.
///
/// The source buffers are only read.
pub fn materialize<S: ViewSource + ?Sized>(
    source: &S,
    view_index: usize,
    accessor: &Accessor,
) -> Result<Vec<u8>, SparseError> {
    let sparse = accessor
        .sparse
        .as_ref()
        .ok_or(SparseError::MissingSparseDescriptor)?;
    if accessor.buffer_view != Some(view_index) {
        return Err(SparseError::AccessorViewMismatch {
            expected: view_index,
            found: accessor.buffer_view,
        });
    }
    let (_, base) = source.view_bytes(view_index)?;
    let (indices, values) = sub_views(source, sparse)?;
    let mut out = base.to_vec();
    apply(sparse, indices, values, accessor.element_stride(), &mut out)?;
    Ok(out)
}

/// Like [`materialize`], but writes into `out` and returns the number of bytes written.
///
/// `out` is left untouched when it is too small or when patching fails.
pub fn materialize_into<S: ViewSource + ?Sized>(
    source: &S,
    view_index: usize,
    accessor: &Accessor,
    out: &mut [u8],
) -> Result<usize, SparseError> {
    let view = source
        .view(view_index)
        .ok_or(SparseError::MissingBufferView(view_index))?;
    if out.len() < view.byte_length {
        return Err(SparseError::BufferTooSmall {
            needed: view.byte_length,
            available: out.len(),
        });
    }
    let patched = materialize(source, view_index, accessor)?;
    out[..patched.len()].copy_from_slice(&patched);
    Ok(patched.len())
}

/// Materializes a sparse accessor that has no base view: every element not
/// overridden is zero.
///
/// `accessor.count` is not backed by any buffer, so the output size is
/// checked and its allocation is fallible.
pub fn materialize_zeroed<S: ViewSource + ?Sized>(
    source: &S,
    accessor: &Accessor,
) -> Result<Vec<u8>, SparseError> {
    let sparse = accessor
        .sparse
        .as_ref()
        .ok_or(SparseError::MissingSparseDescriptor)?;
    if sparse.count > accessor.count {
        return Err(SparseError::SparseCountExceeded {
            sparse: sparse.count,
            count: accessor.count,
        });
    }
    let (indices, values) = sub_views(source, sparse)?;

    let stride = accessor.element_stride();
    let too_large = || SparseError::TooLarge {
        count: accessor.count,
        element_stride: stride,
    };
    let len = accessor.count.checked_mul(stride).ok_or_else(too_large)?;
    let mut out = Vec::new();
    out.try_reserve_exact(len).map_err(|_| too_large())?;
    out.resize(len, 0);

    apply(sparse, indices, values, stride, &mut out)?;
    Ok(out)
}

/// Resolves the indices and values sub-views, rejecting strided ones.
fn sub_views<'a, S: ViewSource + ?Sized>(
    source: &'a S,
    sparse: &Sparse,
) -> Result<(&'a [u8], &'a [u8]), SparseError> {
    let (indices_view, indices) = source.view_bytes(sparse.indices.buffer_view)?;
    let (values_view, values) = source.view_bytes(sparse.values.buffer_view)?;
    check_packed(sparse.indices.buffer_view, &indices_view)?;
    check_packed(sparse.values.buffer_view, &values_view)?;
    Ok((indices, values))
}

fn apply(
    sparse: &Sparse,
    indices: &[u8],
    values: &[u8],
    element_stride: usize,
    out: &mut [u8],
) -> Result<(), SparseError> {
    let index_type = sparse.indices.component_type;
    let index_stride = index_type.byte_size();
    let element_count = out.len() / element_stride.max(1);

    for sparse_index in 0..sparse.count {
        let index = read_index(
            indices,
            offset(sparse.indices.byte_offset, sparse_index, index_stride),
            index_type,
        )?;
        let value = read_slice(
            values,
            offset(sparse.values.byte_offset, sparse_index, element_stride),
            element_stride,
            SubBuffer::Values,
        )?;

        let start = index
            .checked_mul(element_stride)
            .filter(|start| {
                start
                    .checked_add(element_stride)
                    .is_some_and(|end| end <= out.len())
            })
            .ok_or(SparseError::OutOfRangeIndex {
                index,
                element_count,
            })?;
        log::debug!("patching sparse element {sparse_index} into index {index}");
        out[start..start + element_stride].copy_from_slice(value);
    }
    Ok(())
}

/// Saturates so that absurd offsets fail the following bounds check.
fn offset(base: usize, index: usize, stride: usize) -> usize {
    base.saturating_add(index.saturating_mul(stride))
}

fn check_packed(index: usize, view: &BufferView) -> Result<(), SparseError> {
    match view.byte_stride {
        Some(stride) if stride != 0 => Err(SparseError::UnsupportedStride {
            view: index,
            stride,
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ComponentType, ElementType, SparseIndices, SparseValues};

    /// One buffer holding every view back to back.
    struct Fixture {
        buffer: Vec<u8>,
        views: Vec<BufferView>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                buffer: Vec::new(),
                views: Vec::new(),
            }
        }

        fn push(&mut self, bytes: &[u8]) -> usize {
            let view = BufferView {
                buffer: 0,
                byte_offset: self.buffer.len(),
                byte_length: bytes.len(),
                byte_stride: None,
                target: None,
            };
            self.buffer.extend_from_slice(bytes);
            self.views.push(view);
            self.views.len() - 1
        }
    }

    impl ViewSource for Fixture {
        fn view(&self, index: usize) -> Option<BufferView> {
            self.views.get(index).cloned()
        }

        fn buffer(&self, index: usize) -> Option<&[u8]> {
            (index == 0).then_some(self.buffer.as_slice())
        }
    }

    fn floats(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn u16s(values: &[u16]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    fn vec3_accessor(view: usize, count: usize, sparse: Option<Sparse>) -> Accessor {
        Accessor {
            buffer_view: Some(view),
            byte_offset: 0,
            count,
            component_type: ComponentType::F32,
            element_type: ElementType::Vec3,
            sparse,
        }
    }

    fn sparse_u16(count: usize, indices: usize, values: usize) -> Sparse {
        Sparse {
            count,
            indices: SparseIndices {
                buffer_view: indices,
                byte_offset: 0,
                component_type: ComponentType::U16,
            },
            values: SparseValues {
                buffer_view: values,
                byte_offset: 0,
            },
        }
    }

    #[test]
    fn zero_count_keeps_base() -> Result<(), SparseError> {
        let mut fx = Fixture::new();
        let base = fx.push(&floats(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]));
        let indices = fx.push(&[]);
        let values = fx.push(&[]);
        let acc = vec3_accessor(base, 2, Some(sparse_u16(0, indices, values)));

        let out = materialize(&fx, base, &acc)?;
        assert_eq!(out, floats(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]));
        Ok(())
    }

    #[test]
    fn single_override() -> Result<(), SparseError> {
        let mut fx = Fixture::new();
        let base = fx.push(&[0u8; 48]);
        let indices = fx.push(&u16s(&[2]));
        let values = fx.push(&floats(&[1.0, 2.0, 3.0]));
        let acc = vec3_accessor(base, 4, Some(sparse_u16(1, indices, values)));

        let out = materialize(&fx, base, &acc)?;
        assert_eq!(out.len(), 48);
        let elems = crate::decode::as_f32n::<3>(&out);
        assert_eq!(elems[0], [0.0; 3]);
        assert_eq!(elems[1], [0.0; 3]);
        assert_eq!(elems[2], [1.0, 2.0, 3.0]);
        assert_eq!(elems[3], [0.0; 3]);
        Ok(())
    }

    #[test]
    fn last_write_wins() -> Result<(), SparseError> {
        let mut fx = Fixture::new();
        let base = fx.push(&[0u8; 24]);
        let indices = fx.push(&u16s(&[1, 1]));
        let values = fx.push(&floats(&[1.0, 1.0, 1.0, 7.0, 8.0, 9.0]));
        let acc = vec3_accessor(base, 2, Some(sparse_u16(2, indices, values)));

        let out = materialize(&fx, base, &acc)?;
        let elems = crate::decode::as_f32n::<3>(&out);
        assert_eq!(elems, vec![[0.0; 3], [7.0, 8.0, 9.0]]);
        Ok(())
    }

    #[test]
    fn index_past_end_is_rejected() {
        let mut fx = Fixture::new();
        let base = fx.push(&[0u8; 48]);
        let indices = fx.push(&u16s(&[4]));
        let values = fx.push(&floats(&[1.0, 2.0, 3.0]));
        let acc = vec3_accessor(base, 4, Some(sparse_u16(1, indices, values)));

        let err = materialize(&fx, base, &acc).unwrap_err();
        assert!(matches!(
            err,
            SparseError::OutOfRangeIndex {
                index: 4,
                element_count: 4,
            }
        ));
    }

    #[test]
    fn partial_element_at_end_is_rejected() {
        let mut fx = Fixture::new();
        // 3.5 vec3 elements; index 3 would write past the view.
        let base = fx.push(&[0u8; 42]);
        let indices = fx.push(&u16s(&[3]));
        let values = fx.push(&floats(&[1.0, 2.0, 3.0]));
        let acc = vec3_accessor(base, 4, Some(sparse_u16(1, indices, values)));

        assert!(matches!(
            materialize(&fx, base, &acc),
            Err(SparseError::OutOfRangeIndex { index: 3, .. })
        ));
    }

    #[test]
    fn short_index_view_is_truncated() {
        let mut fx = Fixture::new();
        let base = fx.push(&[0u8; 48]);
        let indices = fx.push(&u16s(&[0]));
        let values = fx.push(&floats(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]));
        let acc = vec3_accessor(base, 4, Some(sparse_u16(2, indices, values)));

        assert!(matches!(
            materialize(&fx, base, &acc),
            Err(SparseError::TruncatedSubBuffer {
                which: SubBuffer::Indices,
                ..
            })
        ));
    }

    #[test]
    fn short_value_view_is_truncated() {
        let mut fx = Fixture::new();
        let base = fx.push(&[0u8; 48]);
        let indices = fx.push(&u16s(&[0, 1]));
        let values = fx.push(&floats(&[1.0, 2.0, 3.0, 4.0]));
        let acc = vec3_accessor(base, 4, Some(sparse_u16(2, indices, values)));

        assert!(matches!(
            materialize(&fx, base, &acc),
            Err(SparseError::TruncatedSubBuffer {
                which: SubBuffer::Values,
                needed: 24,
                available: 16,
            })
        ));
    }

    #[test]
    fn sub_offsets_are_honoured() -> Result<(), SparseError> {
        let mut fx = Fixture::new();
        let base = fx.push(&[0u8; 4]);
        // Indices start 1 byte into their view, values 2 bytes into theirs.
        let indices = fx.push(&[0xaa, 3, 1]);
        let values = fx.push(&[0xee, 0xee, 7, 9]);
        let acc = Accessor {
            buffer_view: Some(base),
            byte_offset: 0,
            count: 4,
            component_type: ComponentType::U8,
            element_type: ElementType::Scalar,
            sparse: Some(Sparse {
                count: 2,
                indices: SparseIndices {
                    buffer_view: indices,
                    byte_offset: 1,
                    component_type: ComponentType::U8,
                },
                values: SparseValues {
                    buffer_view: values,
                    byte_offset: 2,
                },
            }),
        };

        assert_eq!(materialize(&fx, base, &acc)?, vec![0, 9, 0, 7]);
        Ok(())
    }

    #[test]
    fn u32_indices_and_doubles() -> Result<(), SparseError> {
        let mut fx = Fixture::new();
        let base = fx.push(&[0u8; 24]);
        let indices = fx.push(&2u32.to_le_bytes());
        let values = fx.push(&1.5f64.to_le_bytes());
        let acc = Accessor {
            buffer_view: Some(base),
            byte_offset: 0,
            count: 3,
            component_type: ComponentType::F64,
            element_type: ElementType::Scalar,
            sparse: Some(Sparse {
                count: 1,
                indices: SparseIndices {
                    buffer_view: indices,
                    byte_offset: 0,
                    component_type: ComponentType::U32,
                },
                values: SparseValues {
                    buffer_view: values,
                    byte_offset: 0,
                },
            }),
        };

        let out = materialize(&fx, base, &acc)?;
        assert_eq!(&out[..16], &[0u8; 16]);
        assert_eq!(&out[16..], &1.5f64.to_le_bytes());
        Ok(())
    }

    #[test]
    fn idempotent_and_source_untouched() -> Result<(), SparseError> {
        let mut fx = Fixture::new();
        let base = fx.push(&floats(&[9.0; 6]));
        let indices = fx.push(&u16s(&[0]));
        let values = fx.push(&floats(&[1.0, 2.0, 3.0]));
        let acc = vec3_accessor(base, 2, Some(sparse_u16(1, indices, values)));
        let before = fx.buffer.clone();

        let first = materialize(&fx, base, &acc)?;
        let second = materialize(&fx, base, &acc)?;
        assert_eq!(first, second);
        assert_eq!(fx.buffer, before);
        Ok(())
    }

    #[test]
    fn strided_sub_views_are_rejected() {
        let mut fx = Fixture::new();
        let base = fx.push(&[0u8; 48]);
        let indices = fx.push(&u16s(&[0]));
        let values = fx.push(&floats(&[1.0, 2.0, 3.0]));
        fx.views[values].byte_stride = Some(16);
        let acc = vec3_accessor(base, 4, Some(sparse_u16(1, indices, values)));

        assert!(matches!(
            materialize(&fx, base, &acc),
            Err(SparseError::UnsupportedStride { stride: 16, .. })
        ));

        fx.views[values].byte_stride = Some(0);
        assert!(materialize(&fx, base, &acc).is_ok());
    }

    #[test]
    fn precondition_failures() {
        let mut fx = Fixture::new();
        let base = fx.push(&[0u8; 12]);
        let other = fx.push(&[0u8; 12]);

        let dense = vec3_accessor(base, 1, None);
        assert!(matches!(
            materialize(&fx, base, &dense),
            Err(SparseError::MissingSparseDescriptor)
        ));

        let sparse = vec3_accessor(base, 1, Some(sparse_u16(1, 7, 8)));
        assert!(matches!(
            materialize(&fx, other, &sparse),
            Err(SparseError::AccessorViewMismatch {
                expected: 1,
                found: Some(0),
            })
        ));
        assert!(matches!(
            materialize(&fx, base, &sparse),
            Err(SparseError::MissingBufferView(7))
        ));

        fx.views[other].buffer = 3;
        let bad_buffer = vec3_accessor(base, 1, Some(sparse_u16(1, other, other)));
        assert!(matches!(
            materialize(&fx, base, &bad_buffer),
            Err(SparseError::MissingBuffer(3))
        ));
    }

    #[test]
    fn into_checks_size_before_writing() -> Result<(), SparseError> {
        let mut fx = Fixture::new();
        let base = fx.push(&[0u8; 24]);
        let indices = fx.push(&u16s(&[1]));
        let values = fx.push(&floats(&[1.0, 2.0, 3.0]));
        let acc = vec3_accessor(base, 2, Some(sparse_u16(1, indices, values)));

        let mut small = [0x55u8; 23];
        assert!(matches!(
            materialize_into(&fx, base, &acc, &mut small),
            Err(SparseError::BufferTooSmall {
                needed: 24,
                available: 23,
            })
        ));
        assert!(small.iter().all(|&b| b == 0x55));

        let mut big = [0x55u8; 32];
        let written = materialize_into(&fx, base, &acc, &mut big)?;
        assert_eq!(written, 24);
        assert_eq!(&big[12..24], floats(&[1.0, 2.0, 3.0]).as_slice());
        assert_eq!(&big[24..], &[0x55u8; 8]);
        Ok(())
    }

    #[test]
    fn zeroed_base() -> Result<(), SparseError> {
        let mut fx = Fixture::new();
        let indices = fx.push(&u16s(&[1]));
        let values = fx.push(&floats(&[4.0, 5.0, 6.0]));
        let mut acc = vec3_accessor(0, 3, Some(sparse_u16(1, indices, values)));
        acc.buffer_view = None;

        let out = materialize_zeroed(&fx, &acc)?;
        let elems = crate::decode::as_f32n::<3>(&out);
        assert_eq!(elems, vec![[0.0; 3], [4.0, 5.0, 6.0], [0.0; 3]]);
        Ok(())
    }

    #[test]
    fn base_view_past_buffer_end() {
        let mut fx = Fixture::new();
        let base = fx.push(&[0u8; 12]);
        let indices = fx.push(&u16s(&[0]));
        let values = fx.push(&floats(&[1.0, 2.0, 3.0]));
        fx.views[base].byte_length = fx.buffer.len() + 1;
        let acc = vec3_accessor(base, 1, Some(sparse_u16(1, indices, values)));

        assert!(matches!(
            materialize(&fx, base, &acc),
            Err(SparseError::ViewOutOfBounds { view: 0 })
        ));
    }

    #[test]
    fn zeroed_size_overflow_is_an_error() {
        let mut fx = Fixture::new();
        let indices = fx.push(&u16s(&[0]));
        let values = fx.push(&floats(&[1.0, 2.0, 3.0]));
        let mut acc = vec3_accessor(0, usize::MAX / 4, Some(sparse_u16(1, indices, values)));
        acc.buffer_view = None;

        assert!(matches!(
            materialize_zeroed(&fx, &acc),
            Err(SparseError::TooLarge { element_stride: 12, .. })
        ));
    }

    #[test]
    fn zeroed_allocation_failure_is_an_error() {
        let mut fx = Fixture::new();
        let indices = fx.push(&u16s(&[0]));
        let values = fx.push(&floats(&[1.0, 2.0, 3.0]));
        // 12 * 2^60 fits in usize but exceeds isize::MAX.
        let mut acc = vec3_accessor(0, 1 << 60, Some(sparse_u16(1, indices, values)));
        acc.buffer_view = None;

        assert!(matches!(
            materialize_zeroed(&fx, &acc),
            Err(SparseError::TooLarge { .. })
        ));
    }

    #[test]
    fn zeroed_checks_sub_views_before_allocating() {
        let fx = Fixture::new();
        let mut acc = vec3_accessor(0, usize::MAX / 4, Some(sparse_u16(1, 5, 6)));
        acc.buffer_view = None;

        assert!(matches!(
            materialize_zeroed(&fx, &acc),
            Err(SparseError::MissingBufferView(5))
        ));

        let mut short = vec3_accessor(0, 1, Some(sparse_u16(2, 5, 6)));
        short.buffer_view = None;
        assert!(matches!(
            materialize_zeroed(&fx, &short),
            Err(SparseError::SparseCountExceeded { sparse: 2, count: 1 })
        ));
    }
}
