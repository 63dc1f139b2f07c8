use gltf::json;
use gltf::json::validation::Checked;

use crate::SparseError;
use crate::types::*;

pub fn dracokey_to_semantic(key: &str) -> Option<gltf::Semantic> {
    if key == "POSITION" {
        return Some(gltf::Semantic::Positions);
    }
    if key == "NORMAL" {
        return Some(gltf::Semantic::Normals);
    }
    if key == "TANGENT" {
        return Some(gltf::Semantic::Tangents);
    }

    let (kind, idx_s) = key.split_once('_')?;
    let idx: u32 = idx_s.parse().ok()?;
    match kind {
        "TEXCOORD" => Some(gltf::Semantic::TexCoords(idx)),
        "COLOR" => Some(gltf::Semantic::Colors(idx)),
        "JOINTS" => Some(gltf::Semantic::Joints(idx)),
        "WEIGHTS" => Some(gltf::Semantic::Weights(idx)),
        _ => None,
    }
}

pub fn map_element_type(t: &json::accessor::Type) -> ElementType {
    use json::accessor::Type::*;
    match t {
        Scalar => ElementType::Scalar,
        Vec2 => ElementType::Vec2,
        Vec3 => ElementType::Vec3,
        Vec4 => ElementType::Vec4,
        Mat2 => ElementType::Mat2,
        Mat3 => ElementType::Mat3,
        Mat4 => ElementType::Mat4,
    }
}

pub fn map_target(t: &json::buffer::Target) -> Target {
    match t {
        json::buffer::Target::ArrayBuffer => Target::ArrayBuffer,
        json::buffer::Target::ElementArrayBuffer => Target::ElementArrayBuffer,
    }
}

pub fn map_view(v: &json::buffer::View) -> BufferView {
    BufferView {
        buffer: v.buffer.value(),
        byte_offset: v.byte_offset.as_ref().map_or(0, |o| o.0 as usize),
        byte_length: v.byte_length.0 as usize,
        byte_stride: v.byte_stride.as_ref().map(|s| s.0),
        target: match &v.target {
            Some(Checked::Valid(t)) => Some(map_target(t)),
            _ => None,
        },
    }
}

/// Converts accessor `index` from its JSON form.
///
/// Fields that failed glTF validation surface as `InvalidAccessor`.
pub fn map_accessor(index: usize, a: &json::Accessor) -> Result<Accessor, SparseError> {
    let invalid = |field| SparseError::InvalidAccessor {
        accessor: index,
        field,
    };

    let component_type = match &a.component_type {
        Checked::Valid(json::accessor::GenericComponentType(ct)) => {
            ComponentType::try_from(ct.as_gl_enum())?
        }
        Checked::Invalid => return Err(invalid("componentType")),
    };
    let element_type = match &a.type_ {
        Checked::Valid(t) => map_element_type(t),
        Checked::Invalid => return Err(invalid("type")),
    };

    let sparse = match &a.sparse {
        Some(s) => {
            let index_type = match &s.indices.component_type {
                Checked::Valid(json::accessor::IndexComponentType(ct)) => {
                    ComponentType::try_from(ct.as_gl_enum())?
                }
                Checked::Invalid => return Err(invalid("sparse.indices.componentType")),
            };
            Some(Sparse {
                count: s.count.0 as usize,
                indices: SparseIndices {
                    buffer_view: s.indices.buffer_view.value(),
                    byte_offset: s.indices.byte_offset.0 as usize,
                    component_type: index_type,
                },
                values: SparseValues {
                    buffer_view: s.values.buffer_view.value(),
                    byte_offset: s.values.byte_offset.0 as usize,
                },
            })
        }
        None => None,
    };

    Ok(Accessor {
        buffer_view: a.buffer_view.as_ref().map(|v| v.value()),
        byte_offset: a.byte_offset.as_ref().map_or(0, |o| o.0 as usize),
        count: a.count.0 as usize,
        component_type,
        element_type,
        sparse,
    })
}
