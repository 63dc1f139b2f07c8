use decode::SubBuffer;

#[derive(Debug, thiserror::Error)]
pub enum SparseError {
    #[error("unknown component type {0}")]
    UnknownComponentType(u32),
    #[error("sparse index {index} is outside the {element_count} elements of the base view")]
    OutOfRangeIndex { index: usize, element_count: usize },
    #[error("sparse {which} sub-buffer needs {needed} bytes but has {available}")]
    TruncatedSubBuffer {
        which: SubBuffer,
        needed: usize,
        available: usize,
    },
    #[error("accessor has no sparse descriptor")]
    MissingSparseDescriptor,
    #[error("bufferView {0} not found")]
    MissingBufferView(usize),
    #[error("buffer index {0} not found")]
    MissingBuffer(usize),
    #[error("accessor {0} not found")]
    MissingAccessor(usize),
    #[error("bufferView {view} extends past the end of its buffer")]
    ViewOutOfBounds { view: usize },
    #[error("accessor belongs to bufferView {found:?}, not {expected}")]
    AccessorViewMismatch {
        expected: usize,
        found: Option<usize>,
    },
    #[error("sparse sub-view {view} declares byteStride {stride}; only tightly packed data is supported")]
    UnsupportedStride { view: usize, stride: usize },
    #[error("sparse indices must be integers, got {0:?}")]
    InvalidIndexType(ComponentType),
    #[error("output buffer holds {available} bytes but {needed} are required")]
    BufferTooSmall { needed: usize, available: usize },
    #[error("{count} elements of {element_stride} bytes cannot be allocated")]
    TooLarge { count: usize, element_stride: usize },
    #[error("sparse count {sparse} exceeds accessor count {count}")]
    SparseCountExceeded { sparse: usize, count: usize },
    #[error("accessor {accessor} has an invalid `{field}`")]
    InvalidAccessor {
        accessor: usize,
        field: &'static str,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("gltf: {0}")]
    Gltf(#[from] gltf::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub mod decode;
mod mapping;
pub mod model;
pub mod report;
pub mod sparse;
pub mod types;

pub use model::{DracoPrimitive, GlbModel};
pub use report::{PatchedView, ViewUsage, patch_views, view_usage};
pub use sparse::{ViewSource, materialize, materialize_into, materialize_zeroed};
pub use types::{Accessor, BufferView, ComponentType, ElementType, Sparse, SparseIndices, SparseValues, Target};
