//! Buffer view usage scan.

use crate::SparseError;
use crate::model::GlbModel;
use crate::sparse::{ViewSource, materialize};
use crate::types::Target;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewUsage {
    pub view: usize,
    pub byte_length: usize,
    pub target: Option<Target>,
    /// Accessors whose base view is this one, in index order.
    pub accessors: Vec<usize>,
    /// First sparse accessor among `accessors`.
    pub sparse_accessor: Option<usize>,
    /// Holds a `KHR_draco_mesh_compression` stream.
    pub draco: bool,
}

#[derive(Debug)]
pub struct PatchedView {
    pub view: usize,
    pub accessor: usize,
    pub result: Result<Vec<u8>, SparseError>,
}

pub fn view_usage(model: &GlbModel) -> Vec<ViewUsage> {
    let accessors: Vec<_> = (0..model.accessor_count())
        .filter_map(|i| match model.accessor(i) {
            Ok(a) => Some((i, a)),
            Err(e) => {
                log::warn!("skipping accessor {i}: {e}");
                None
            }
        })
        .collect();
    let draco_views: Vec<usize> = model
        .draco_primitives()
        .iter()
        .map(|d| d.buffer_view)
        .collect();

    let mut out = Vec::with_capacity(model.view_count());
    for view_index in 0..model.view_count() {
        let Some(view) = model.view(view_index) else {
            continue;
        };
        if view.target.is_none() {
            log::warn!("bufferView {view_index} has no target");
        }

        let mut usage = ViewUsage {
            view: view_index,
            byte_length: view.byte_length,
            target: view.target,
            accessors: Vec::new(),
            sparse_accessor: None,
            draco: draco_views.contains(&view_index),
        };
        for (i, a) in accessors.iter().filter(|(_, a)| a.buffer_view == Some(view_index)) {
            log::info!("bufferView {view_index} is used by accessor {i}");
            usage.accessors.push(*i);
            if a.sparse.is_some() && usage.sparse_accessor.is_none() {
                log::warn!(
                    "bufferView {view_index} has sparse accessor {i}; \
                     its data is loaded as patched by that accessor"
                );
                usage.sparse_accessor = Some(*i);
            }
        }
        out.push(usage);
    }
    out
}

/// Materializes every view that has a sparse accessor. A failing view does
/// not stop the others.
pub fn patch_views(model: &GlbModel) -> Vec<PatchedView> {
    view_usage(model)
        .into_iter()
        .filter_map(|u| u.sparse_accessor.map(|a| (u.view, a)))
        .map(|(view, accessor)| {
            let result = model
                .accessor(accessor)
                .and_then(|a| materialize(model, view, &a));
            if let Err(e) = &result {
                log::error!("bufferView {view}: sparse accessor {accessor} failed: {e}");
            }
            PatchedView {
                view,
                accessor,
                result,
            }
        })
        .collect()
}
