//! Batched updates and change routing.
//!
//! Every mutation runs inside an update scope. Scopes nest; events are
//! translated to the root's space as they are emitted and buffered until the
//! outermost scope closes, at which point the host view receives them as one
//! batch.

use std::any::Any;
use std::collections::BTreeSet;

use horizon_collection_core::logging::{span_names, targets};
use horizon_collection_core::{CollectionError, PerfSpan, Result};

use super::{DataSourceContent, DataSourceId, DataSourceTree, NodeKind};
use crate::change::{ChangeBatch, ChangeEvent, Notifier};
use crate::index_path::{IndexPath, Section};
use crate::layout::InvalidationContext;
use crate::view::BatchCompletion;

impl DataSourceTree {
    /// Run `update` as one batch. Nested calls join the outermost batch;
    /// `complete` runs after the host has applied it.
    pub fn perform_update<F>(&mut self, update: F, complete: Option<BatchCompletion>)
    where
        F: FnOnce(&mut DataSourceTree),
    {
        self.begin_update();
        update(self);
        if let Some(complete) = complete {
            self.pending_completions.push(complete);
        }
        self.end_update();
    }

    /// Whether an update scope is open.
    pub fn is_updating(&self) -> bool {
        self.update_depth > 0
    }

    pub(crate) fn begin_update(&mut self) {
        self.affinity.debug_assert_same_thread();
        if self.update_depth == 0 {
            self.section_origins = (0..self.number_of_sections()).map(Some).collect();
            self.invalidator.suspend();
        }
        self.update_depth += 1;
    }

    pub(crate) fn end_update(&mut self) {
        debug_assert!(self.update_depth > 0, "unbalanced end_update");
        self.update_depth = self.update_depth.saturating_sub(1);
        if self.update_depth == 0 {
            self.flush();
        }
    }

    /// Mutate the content of leaf `id` as its concrete type and report the
    /// changes through the notifier. Runs as (part of) one batch.
    pub fn update_leaf<T, R, F>(&mut self, id: DataSourceId, update: F) -> Result<R>
    where
        T: DataSourceContent,
        F: FnOnce(&mut T, &mut Notifier) -> R,
    {
        self.begin_update();
        let mut notifier = Notifier::new();
        let result = self.with_leaf_content(id, |content| {
            let content: &mut dyn Any = content;
            content
                .downcast_mut::<T>()
                .map(|content| update(content, &mut notifier))
                .ok_or_else(|| {
                    CollectionError::invalid_composition(format!(
                        "data source {id:?} does not hold {}",
                        std::any::type_name::<T>()
                    ))
                })
        });
        let result = result.and_then(|inner| inner);
        if result.is_ok() {
            self.dispatch(id, notifier.take());
        }
        self.end_update();
        result
    }

    /// Mutate leaf content without reporting anything.
    ///
    /// Only valid inside [`perform_update`](Self::perform_update); the caller
    /// must follow up with [`notify`](Self::notify).
    pub fn leaf_mut<T: DataSourceContent>(&mut self, id: DataSourceId) -> Result<&mut T> {
        if self.update_depth == 0 {
            return Err(CollectionError::concurrent_mutation("leaf_mut").debug_fatal());
        }
        let content = self
            .content_mut(id)
            .ok_or_else(|| CollectionError::unknown_data_source(id))?;
        let content: &mut dyn Any = content.as_mut();
        content.downcast_mut::<T>().ok_or_else(|| {
            CollectionError::invalid_composition(format!(
                "data source {id:?} does not hold {}",
                std::any::type_name::<T>()
            ))
        })
    }

    /// Report changes of data source `id`, in its local space.
    pub fn notify<F>(&mut self, id: DataSourceId, record: F)
    where
        F: FnOnce(&mut Notifier),
    {
        let mut notifier = Notifier::new();
        record(&mut notifier);
        self.begin_update();
        self.dispatch(id, notifier.take());
        self.end_update();
    }

    /// Remove the item at a root path through its leaf's `remove_item` hook.
    pub fn remove_item(&mut self, path: IndexPath) -> bool {
        let Some((leaf, local)) = self.local_index_path(path) else {
            return false;
        };
        self.begin_update();
        let mut notifier = Notifier::new();
        let removed = self
            .with_leaf_content(leaf, |content| content.remove_item(local, &mut notifier))
            .unwrap_or(false);
        self.dispatch(leaf, notifier.take());
        self.end_update();
        removed
    }

    /// Move an item between root paths owned by the same leaf.
    pub fn move_item(&mut self, from: IndexPath, to: IndexPath) -> bool {
        let (Some((leaf, local_from)), Some((to_leaf, local_to))) =
            (self.local_index_path(from), self.local_index_path(to))
        else {
            return false;
        };
        if leaf != to_leaf {
            tracing::debug!(target: targets::DATA_SOURCE, %from, %to, "refusing move across data sources");
            return false;
        }
        self.begin_update();
        let mut notifier = Notifier::new();
        let moved = self
            .with_leaf_content(leaf, |content| content.move_item(local_from, local_to, &mut notifier))
            .unwrap_or(false);
        self.dispatch(leaf, notifier.take());
        self.end_update();
        moved
    }

    pub(crate) fn with_leaf_content<R>(
        &mut self,
        id: DataSourceId,
        f: impl FnOnce(&mut dyn DataSourceContent) -> R,
    ) -> Result<R> {
        let content = self
            .content_mut(id)
            .ok_or_else(|| CollectionError::unknown_data_source(id))?;
        Ok(f(content.as_mut()))
    }

    // =========================================================================
    // Routing
    // =========================================================================

    /// Route local events of `origin` to the root and buffer them.
    pub(crate) fn dispatch(&mut self, origin: DataSourceId, events: Vec<ChangeEvent>) {
        if events.is_empty() {
            return;
        }
        let mut events: Vec<ChangeEvent> = events
            .into_iter()
            .filter(|event| self.validate(origin, event))
            .collect();

        let mut current = origin;
        while let Some(parent) = self.parent(current) {
            let Some(base) = self.child_base(parent, current) else {
                tracing::trace!(target: targets::DATA_SOURCE, ?origin, ?parent, "dropping events of a hidden segment");
                return;
            };
            events = events.into_iter().map(|event| shift_event(event, base)).collect();
            if matches!(self.nodes.get(parent).map(|n| &n.kind), Some(NodeKind::Composed { .. }))
                && events.iter().any(ChangeEvent::is_structural)
            {
                self.rebuild_mappings(parent);
            }
            current = parent;
        }

        if Some(current) != self.root {
            let error = CollectionError::stale_notification(origin);
            tracing::warn!(target: targets::DATA_SOURCE, %error, count = events.len(), "dropping notifications");
            return;
        }

        for event in events {
            if let Some(event) = self.absorb_under_placeholder(event) {
                self.record(event);
            }
        }
        if self.update_depth == 0 {
            self.flush();
        }
    }

    /// Check a leaf notification against the leaf's current bounds.
    fn validate(&self, origin: DataSourceId, event: &ChangeEvent) -> bool {
        let Some(content) = self.content(origin) else {
            return true;
        };
        let sections = content.number_of_sections();
        let check_section = |section: Option<usize>, context: &'static str| match section {
            Some(section) if section < sections => Ok(()),
            Some(section) => Err(CollectionError::index_out_of_range(context, section, sections)),
            None => Err(CollectionError::index_out_of_range(context, usize::MAX, sections)),
        };
        let check_paths = |paths: &[IndexPath], context| {
            paths
                .iter()
                .try_for_each(|path| check_section(path.section_index(), context))
        };
        let check_items = |paths: &[IndexPath], context: &'static str| {
            paths.iter().try_for_each(|path| {
                let count = path.section_index().map_or(0, |s| content.number_of_items(s));
                if path.item < count {
                    Ok(())
                } else {
                    Err(CollectionError::index_out_of_range(context, path.item, count))
                }
            })
        };

        let result = match event {
            ChangeEvent::ItemsInserted(paths) => {
                check_paths(paths, "inserted item section").and_then(|_| check_items(paths, "inserted item"))
            }
            ChangeEvent::ItemsRemoved(paths) => check_paths(paths, "removed item section"),
            ChangeEvent::ItemsRefreshed(paths) => {
                check_paths(paths, "refreshed item section").and_then(|_| check_items(paths, "refreshed item"))
            }
            ChangeEvent::ItemMoved { from, to } => check_section(from.section_index(), "moved item section")
                .and_then(|_| check_section(to.section_index(), "moved item section"))
                .and_then(|_| check_items(std::slice::from_ref(to), "moved item")),
            ChangeEvent::SectionsInserted { sections: inserted, .. } => inserted
                .iter()
                .try_for_each(|section| check_section(Some(*section), "inserted section")),
            ChangeEvent::SectionsRefreshed(refreshed) => refreshed
                .iter()
                .try_for_each(|section| check_section(Some(*section), "refreshed section")),
            ChangeEvent::SectionMoved { to, .. } => check_section(Some(*to), "moved section"),
            ChangeEvent::SectionsRemoved { .. }
            | ChangeEvent::ReloadData
            | ChangeEvent::SupplementaryUpdated { .. } => Ok(()),
        };

        match result {
            Ok(()) => true,
            Err(error) => {
                error.debug_fatal();
                false
            }
        }
    }

    /// Drop item events aimed at sections the host currently shows behind a
    /// placeholder. Those sections are refreshed if the coverage changes by
    /// the end of the batch.
    fn absorb_under_placeholder(&self, event: ChangeEvent) -> Option<ChangeEvent> {
        let covered = |path: &IndexPath| {
            path.section_index()
                .and_then(|section| self.section_origins.get(section).copied().flatten())
                .is_some_and(|origin| self.shown_plan.covers(origin))
        };
        let keep = |paths: Vec<IndexPath>| -> Vec<IndexPath> {
            paths.into_iter().filter(|path| !covered(path)).collect()
        };

        let event = match event {
            ChangeEvent::ItemsInserted(paths) => ChangeEvent::ItemsInserted(keep(paths)),
            ChangeEvent::ItemsRemoved(paths) => ChangeEvent::ItemsRemoved(keep(paths)),
            ChangeEvent::ItemsRefreshed(paths) => ChangeEvent::ItemsRefreshed(keep(paths)),
            ChangeEvent::ItemMoved { from, to } => match (covered(&from), covered(&to)) {
                (false, false) => ChangeEvent::ItemMoved { from, to },
                (true, true) => return None,
                _ => ChangeEvent::SectionsRefreshed(
                    [from, to]
                        .iter()
                        .filter(|path| !covered(*path))
                        .filter_map(IndexPath::section_index)
                        .collect(),
                ),
            },
            other => other,
        };
        if event.is_empty() {
            tracing::trace!(target: targets::PLACEHOLDER, "item notification absorbed by placeholder");
            return None;
        }
        Some(event)
    }

    /// Buffer a root-space event and track where sections came from.
    fn record(&mut self, event: ChangeEvent) {
        match &event {
            ChangeEvent::SectionsInserted { sections, .. } => {
                for &section in sections {
                    let at = section.min(self.section_origins.len());
                    self.section_origins.insert(at, None);
                }
            }
            ChangeEvent::SectionsRemoved { sections, .. } => {
                for &section in sections.iter().rev() {
                    if section < self.section_origins.len() {
                        self.section_origins.remove(section);
                    }
                }
            }
            ChangeEvent::SectionMoved { from, to, .. } => {
                if *from < self.section_origins.len() {
                    let origin = self.section_origins.remove(*from);
                    let at = (*to).min(self.section_origins.len());
                    self.section_origins.insert(at, origin);
                }
            }
            ChangeEvent::ReloadData => self.section_origins.iter_mut().for_each(|o| *o = None),
            ChangeEvent::SupplementaryUpdated { kind, paths } => {
                let mut context = InvalidationContext::new();
                for path in paths {
                    context.invalidate_supplement(kind.clone(), *path);
                }
                self.invalidator.invalidate(context);
            }
            _ => {}
        }
        tracing::trace!(target: targets::DATA_SOURCE, ?event, "buffered change");
        self.pending.push(event);
    }

    /// Deliver the buffered batch to the host.
    fn flush(&mut self) {
        let _span = PerfSpan::new(span_names::BATCH_FLUSH);
        let mut events = std::mem::take(&mut self.pending);
        let origins = std::mem::take(&mut self.section_origins);
        let plan = self.placeholder_plan();

        if !events.iter().any(|event| matches!(event, ChangeEvent::ReloadData)) {
            let refreshed: BTreeSet<usize> = origins
                .iter()
                .enumerate()
                .filter_map(|(section, origin)| {
                    let origin = (*origin)?;
                    let before = self.shown_plan.range_for_section(origin);
                    let after = plan.range_for_section(section);
                    let changed = match (before, after) {
                        (None, None) => false,
                        (Some(before), Some(after)) => {
                            before.owner != after.owner || before.placeholder != after.placeholder
                        }
                        _ => true,
                    };
                    changed.then_some(section)
                })
                .collect();
            if !refreshed.is_empty() {
                tracing::debug!(target: targets::PLACEHOLDER, ?refreshed, "placeholder coverage changed");
                events.push(ChangeEvent::SectionsRefreshed(refreshed));
            }
        }
        self.shown_plan = plan;

        self.invalidator.resume();
        let invalidation = self.invalidator.take();
        let completions = std::mem::take(&mut self.pending_completions);
        let completion: Option<BatchCompletion> = (!completions.is_empty()).then(|| {
            Box::new(move |finished: bool| {
                for completion in completions {
                    completion(finished);
                }
            }) as BatchCompletion
        });

        let batch = ChangeBatch::new(events);
        tracing::debug!(target: targets::DATA_SOURCE, events = batch.events().len(), "flushing batch");

        match self.view.as_mut() {
            Some(view) => {
                if batch.requires_reload() {
                    view.reload_data();
                    if let Some(completion) = completion {
                        completion(true);
                    }
                } else if !batch.is_empty() || completion.is_some() {
                    view.perform_batch_updates(batch, completion);
                }
                if !invalidation.is_empty() {
                    view.invalidate_layout(&invalidation);
                }
            }
            None => {
                if let Some(completion) = completion {
                    completion(true);
                }
            }
        }
    }
}

/// Shift every section index of `event` by `base`.
pub(crate) fn shift_event(event: ChangeEvent, base: usize) -> ChangeEvent {
    if base == 0 {
        return event;
    }
    let path = |path: IndexPath| match path.section {
        Section::Index(section) => IndexPath::new(section + base, path.item),
        Section::Global => path,
    };
    let paths = |paths: Vec<IndexPath>| paths.into_iter().map(path).collect();
    let sections = |sections: BTreeSet<usize>| sections.into_iter().map(|s| s + base).collect();
    match event {
        ChangeEvent::ItemsInserted(p) => ChangeEvent::ItemsInserted(paths(p)),
        ChangeEvent::ItemsRemoved(p) => ChangeEvent::ItemsRemoved(paths(p)),
        ChangeEvent::ItemsRefreshed(p) => ChangeEvent::ItemsRefreshed(paths(p)),
        ChangeEvent::ItemMoved { from, to } => ChangeEvent::ItemMoved {
            from: path(from),
            to: path(to),
        },
        ChangeEvent::SectionsInserted {
            sections: s,
            direction,
        } => ChangeEvent::SectionsInserted {
            sections: sections(s),
            direction,
        },
        ChangeEvent::SectionsRemoved {
            sections: s,
            direction,
        } => ChangeEvent::SectionsRemoved {
            sections: sections(s),
            direction,
        },
        ChangeEvent::SectionMoved { from, to, direction } => ChangeEvent::SectionMoved {
            from: from + base,
            to: to + base,
            direction,
        },
        ChangeEvent::SectionsRefreshed(s) => ChangeEvent::SectionsRefreshed(sections(s)),
        ChangeEvent::ReloadData => ChangeEvent::ReloadData,
        ChangeEvent::SupplementaryUpdated { kind, paths: p } => {
            ChangeEvent::SupplementaryUpdated { kind, paths: paths(p) }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::SectionDirection;
    use crate::data_source::BasicDataSource;

    #[test]
    fn test_shift_event() {
        let shifted = shift_event(
            ChangeEvent::SectionsInserted {
                sections: BTreeSet::from([0, 2]),
                direction: SectionDirection::Left,
            },
            3,
        );
        assert_eq!(
            shifted,
            ChangeEvent::SectionsInserted {
                sections: BTreeSet::from([3, 5]),
                direction: SectionDirection::Left,
            }
        );
        assert_eq!(
            shift_event(ChangeEvent::ItemsRemoved(vec![IndexPath::new(1, 4)]), 2),
            ChangeEvent::ItemsRemoved(vec![IndexPath::new(3, 4)])
        );
    }

    #[test]
    fn test_leaf_mut_outside_update_is_rejected() {
        let mut tree = DataSourceTree::default();
        let leaf = tree.add_leaf(BasicDataSource::new(vec![1u8]));
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            tree.leaf_mut::<BasicDataSource<u8>>(leaf).map(|_| ())
        }));
        match result {
            // Debug builds treat this as fatal.
            Err(_) => assert!(cfg!(debug_assertions)),
            Ok(result) => assert!(matches!(result, Err(CollectionError::ConcurrentMutation { .. }))),
        }
    }

    #[test]
    fn test_leaf_mut_inside_update() {
        let mut tree = DataSourceTree::default();
        let leaf = tree.add_leaf(BasicDataSource::new(vec![1u8, 2]));
        tree.perform_update(
            |tree| {
                let content = tree.leaf_mut::<BasicDataSource<u8>>(leaf).unwrap();
                assert_eq!(content.len(), 2);
            },
            None,
        );
        assert!(!tree.is_updating());
    }

    #[test]
    fn test_update_leaf_wrong_type() {
        let mut tree = DataSourceTree::default();
        let leaf = tree.add_leaf(BasicDataSource::new(vec![1u8]));
        let result = tree.update_leaf(leaf, |_: &mut BasicDataSource<String>, _| ());
        assert!(matches!(result, Err(CollectionError::InvalidComposition(_))));
    }

    #[test]
    fn test_completion_runs_without_view() {
        let mut tree = DataSourceTree::default();
        let ran = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = ran.clone();
        tree.perform_update(
            |_| {},
            Some(Box::new(move |finished| {
                flag.store(finished, std::sync::atomic::Ordering::SeqCst)
            })),
        );
        assert!(ran.load(std::sync::atomic::Ordering::SeqCst));
    }
}
