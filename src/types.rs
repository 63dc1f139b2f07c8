use crate::SparseError;

/// glTF accessor component type, keyed by its GL enum value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    F32,
    F64,
}

impl ComponentType {
    pub fn byte_size(self) -> usize {
        use ComponentType::*;
        match self {
            I8 | U8 => 1,
            I16 | U16 => 2,
            I32 | U32 | F32 => 4,
            F64 => 8,
        }
    }

    pub fn gl_enum(self) -> u32 {
        use ComponentType::*;
        match self {
            I8 => 5120,
            U8 => 5121,
            I16 => 5122,
            U16 => 5123,
            I32 => 5124,
            U32 => 5125,
            F32 => 5126,
            F64 => 5130,
        }
    }

    pub fn is_integer(self) -> bool {
        !matches!(self, ComponentType::F32 | ComponentType::F64)
    }
}

impl TryFrom<u32> for ComponentType {
    type Error = SparseError;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        use ComponentType::*;
        Ok(match code {
            5120 => I8,
            5121 => U8,
            5122 => I16,
            5123 => U16,
            5124 => I32,
            5125 => U32,
            5126 => F32,
            5130 => F64,
            _ => return Err(SparseError::UnknownComponentType(code)),
        })
    }
}

/// Shape of one accessor element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    Scalar,
    Vec2,
    Vec3,
    Vec4,
    Mat2,
    Mat3,
    Mat4,
}

impl ElementType {
    pub fn component_count(self) -> usize {
        use ElementType::*;
        match self {
            Scalar => 1,
            Vec2 => 2,
            Vec3 => 3,
            Vec4 | Mat2 => 4,
            Mat3 => 9,
            Mat4 => 16,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    ArrayBuffer,
    ElementArrayBuffer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferView {
    pub buffer: usize,
    pub byte_offset: usize,
    pub byte_length: usize,
    pub byte_stride: Option<usize>,
    pub target: Option<Target>,
}

impl BufferView {
    /// Returns this view's bytes within `buffer`, checking `byte_offset + byte_length <= buffer.len()`.
    pub fn slice<'a>(&self, buffer: &'a [u8], view: usize) -> Result<&'a [u8], SparseError> {
        let end = self
            .byte_offset
            .checked_add(self.byte_length)
            .ok_or(SparseError::ViewOutOfBounds { view })?;
        buffer
            .get(self.byte_offset..end)
            .ok_or(SparseError::ViewOutOfBounds { view })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparseIndices {
    pub buffer_view: usize,
    pub byte_offset: usize,
    pub component_type: ComponentType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparseValues {
    pub buffer_view: usize,
    pub byte_offset: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sparse {
    pub count: usize,
    pub indices: SparseIndices,
    pub values: SparseValues,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accessor {
    pub buffer_view: Option<usize>,
    pub byte_offset: usize,
    pub count: usize,
    pub component_type: ComponentType,
    pub element_type: ElementType,
    pub sparse: Option<Sparse>,
}

impl Accessor {
    /// Byte size of one element, e.g. 12 for a vec3 of floats.
    pub fn element_stride(&self) -> usize {
        self.component_type.byte_size() * self.element_type.component_count()
    }
}
