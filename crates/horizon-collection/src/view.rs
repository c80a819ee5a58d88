//! The contract the host view fulfils.
//!
//! The tree never draws. It asks the host to register and dequeue reusable
//! views, replays change batches through the host's batch-update entry
//! points, and forwards layout invalidation.

use std::any::Any;
use std::collections::BTreeSet;

use horizon_collection_core::logging::targets;

use crate::change::{ChangeBatch, SectionDirection};
use crate::index_path::IndexPath;
use crate::layout::InvalidationContext;
use crate::metrics::ElementKind;

/// An opaque host view handed back by [`CollectionView::dequeue`].
pub type ReusableView = Box<dyn Any + Send>;

/// Runs once the host has applied (and animated) a batch. The flag reports
/// whether the animations finished.
pub type BatchCompletion = Box<dyn FnOnce(bool) + Send>;

/// Per-operation update entry points.
///
/// Section sets and index paths are in the root's global space.
pub trait BatchUpdates {
    fn insert_sections(&mut self, sections: &BTreeSet<usize>, direction: SectionDirection);
    fn delete_sections(&mut self, sections: &BTreeSet<usize>, direction: SectionDirection);
    fn move_section(&mut self, from: usize, to: usize, direction: SectionDirection);
    fn reload_sections(&mut self, sections: &BTreeSet<usize>);
    fn insert_items(&mut self, paths: &[IndexPath]);
    fn delete_items(&mut self, paths: &[IndexPath]);
    fn move_item(&mut self, from: IndexPath, to: IndexPath);
    fn reload_items(&mut self, paths: &[IndexPath]);
}

/// The host collection view.
pub trait CollectionView: BatchUpdates + Send {
    /// Register a view class for supplementary views of `kind`.
    fn register_class(&mut self, view_class_tag: &str, reuse_identifier: &str, kind: &ElementKind);

    /// Register a view class for cells.
    fn register_cell_class(&mut self, view_class_tag: &str, reuse_identifier: &str) {
        tracing::trace!(
            target: targets::DATA_SOURCE,
            view_class_tag,
            reuse_identifier,
            "cell class registration ignored by host"
        );
    }

    /// Dequeue a reusable view for the element at `path`.
    fn dequeue(&mut self, reuse_identifier: &str, kind: &ElementKind, path: IndexPath) -> ReusableView;

    /// Apply `batch` atomically, then run `completion`.
    fn perform_batch_updates(&mut self, batch: ChangeBatch, completion: Option<BatchCompletion>) {
        batch.apply_to(self);
        if let Some(completion) = completion {
            completion(true);
        }
    }

    /// Drop everything and re-query the data source.
    fn reload_data(&mut self);

    /// Invalidate (part of) the layout.
    fn invalidate_layout(&mut self, context: &InvalidationContext);
}
