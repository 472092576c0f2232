//! The ordered layer collection.
//!
//! Layers are kept in a `Vec` sorted by z-order. Creation only ever
//! appends, and removal preserves the order of the survivors, so the
//! vector order always equals creation order.

use serde::{Deserialize, Serialize};

use crate::geometry::Size;
use crate::layer::{
    ContentHandle, LayerId, LayerKind, LayerPatch, LayerPlacement, OverlayLayer, TextBanner,
};

/// Result of a successful [`LayerModel::update_layer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Applied {
    /// Content handle detached from the layer by this update. The owner of
    /// the content store should release it.
    pub replaced_content: Option<ContentHandle>,
}

/// All overlay layers of the live scene.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LayerModel {
    layers: Vec<OverlayLayer>,
    next_id: u64,
    next_z: u64,
}

impl LayerModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new layer on top of the stack and return its id.
    pub fn add_layer(&mut self, kind: LayerKind, placement: LayerPlacement) -> LayerId {
        self.next_id += 1;
        let id = LayerId(self.next_id);
        let z_order = self.next_z;
        self.next_z += 1;

        self.layers.push(OverlayLayer {
            id,
            position: placement.position,
            size: placement.size,
            z_order,
            kind,
        });
        id
    }

    /// Remove a layer. Unknown ids are ignored.
    pub fn remove_layer(&mut self, id: LayerId) -> Option<OverlayLayer> {
        let index = self.layers.iter().position(|layer| layer.id == id)?;
        Some(self.layers.remove(index))
    }

    /// Merge `patch` into the layer. Returns `None` for unknown ids.
    pub fn update_layer(&mut self, id: LayerId, patch: LayerPatch) -> Option<Applied> {
        let layer = self.layers.iter_mut().find(|layer| layer.id == id)?;
        Some(Applied {
            replaced_content: patch.apply(layer),
        })
    }

    /// Snapshot of all layers in ascending z-order.
    pub fn list_layers(&self) -> Vec<OverlayLayer> {
        self.layers.clone()
    }

    /// Borrowing iterator in ascending z-order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &OverlayLayer> {
        self.layers.iter()
    }

    pub fn get(&self, id: LayerId) -> Option<&OverlayLayer> {
        self.layers.iter().find(|layer| layer.id == id)
    }

    pub fn contains(&self, id: LayerId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Top-most layer whose box contains the point.
    pub fn hit_test(&self, x: f64, y: f64) -> Option<LayerId> {
        self.layers
            .iter()
            .rev()
            .find(|layer| layer.rect().contains(x, y))
            .map(|layer| layer.id)
    }

    /// Text banners with their box size, for the scroll animator.
    pub fn text_banners_mut(&mut self) -> impl Iterator<Item = (LayerId, Size, &mut TextBanner)> {
        self.layers.iter_mut().filter_map(|layer| match &mut layer.kind {
            LayerKind::TextBanner(banner) => Some((layer.id, layer.size, banner)),
            _ => None,
        })
    }

    /// Remove every layer, returning them in z-order.
    pub fn clear(&mut self) -> Vec<OverlayLayer> {
        std::mem::take(&mut self.layers)
    }
}
