use std::path::Path;

use gltf::json;

use crate::mapping::{dracokey_to_semantic, map_accessor, map_view};
use crate::sparse::{ViewSource, materialize, materialize_zeroed};
use crate::types::{Accessor, BufferView};
use crate::{LoadError, SparseError};

#[derive(serde::Deserialize)]
struct DracoExt {
    #[serde(rename = "bufferView")]
    buffer_view: usize,
    attributes: std::collections::HashMap<String, u32>, // semantic -> draco unique id
}

/// A primitive whose geometry is stored as a `KHR_draco_mesh_compression` stream.
#[derive(Debug, Clone, PartialEq)]
pub struct DracoPrimitive {
    pub mesh: usize,
    pub primitive: usize,
    pub buffer_view: usize,
    /// Semantic and Draco attribute id, ordered by id.
    pub attributes: Vec<(gltf::Semantic, u32)>,
}

/// A loaded `.glb` asset with all of its buffers resident.
pub struct GlbModel {
    document: gltf::Document,
    root: json::Root,
    buffers: Vec<gltf::buffer::Data>,
}

impl GlbModel {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, LoadError> {
        Self::load(bytes, None)
    }

    /// Loads a file; external buffer URIs resolve relative to its directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        Self::load(&bytes, path.parent())
    }

    fn load(bytes: &[u8], base: Option<&Path>) -> Result<Self, LoadError> {
        // Draco primitives carry accessors without views, which strict validation rejects.
        let glb = gltf::Gltf::from_slice_without_validation(bytes)?;
        let document = glb.document;
        let buffers = gltf::import_buffers(&document, base, glb.blob)?;
        let root = document.clone().into_json();
        log::debug!(
            "loaded glb: {} buffers, {} views, {} accessors",
            buffers.len(),
            root.buffer_views.len(),
            root.accessors.len()
        );
        Ok(Self {
            document,
            root,
            buffers,
        })
    }

    pub fn document(&self) -> &gltf::Document {
        &self.document
    }

    pub fn view_count(&self) -> usize {
        self.root.buffer_views.len()
    }

    pub fn accessor_count(&self) -> usize {
        self.root.accessors.len()
    }

    pub fn accessor(&self, index: usize) -> Result<Accessor, SparseError> {
        let a = self
            .root
            .accessors
            .get(index)
            .ok_or(SparseError::MissingAccessor(index))?;
        map_accessor(index, a)
    }

    /// Patched bytes of a sparse accessor's base view, or of a zero base
    /// when the accessor has no view of its own.
    pub fn materialize_accessor(&self, index: usize) -> Result<Vec<u8>, SparseError> {
        let accessor = self.accessor(index)?;
        match accessor.buffer_view {
            Some(view) => materialize(self, view, &accessor),
            None => materialize_zeroed(self, &accessor),
        }
    }

    pub fn draco_primitives(&self) -> Vec<DracoPrimitive> {
        let mut out = Vec::new();
        for mesh in self.document.meshes() {
            for p in mesh.primitives() {
                let Some(value) = p.extension_value("KHR_draco_mesh_compression") else {
                    continue;
                };
                let ext: DracoExt = match serde_json::from_value(value.clone()) {
                    Ok(ext) => ext,
                    Err(e) => {
                        log::warn!(
                            "mesh {} primitive {}: malformed KHR_draco_mesh_compression: {e}",
                            mesh.index(),
                            p.index()
                        );
                        continue;
                    }
                };
                let mut attributes: Vec<(gltf::Semantic, u32)> = ext
                    .attributes
                    .iter()
                    .filter_map(|(k, id)| dracokey_to_semantic(k).map(|sem| (sem, *id)))
                    .collect();
                attributes.sort_by_key(|(_, id)| *id);
                out.push(DracoPrimitive {
                    mesh: mesh.index(),
                    primitive: p.index(),
                    buffer_view: ext.buffer_view,
                    attributes,
                });
            }
        }
        out
    }
}

impl ViewSource for GlbModel {
    fn view(&self, index: usize) -> Option<BufferView> {
        self.root.buffer_views.get(index).map(map_view)
    }

    fn buffer(&self, index: usize) -> Option<&[u8]> {
        self.buffers.get(index).map(|d| &d[..])
    }
}
