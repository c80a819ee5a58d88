//! Helpers shared by the integration tests.

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::Arc;

use horizon_collection::layout::InvalidationContext;
use horizon_collection::view::{BatchCompletion, BatchUpdates, CollectionView, ReusableView};
use horizon_collection::{
    ChangeBatch, DataSourceContent, DataSourceTree, ElementKind, IndexPath, Item, Notifier, SectionDirection,
};
use parking_lot::Mutex;

/// What a [`RecordingView`] saw.
#[derive(Debug, Default)]
pub struct ViewLog {
    pub batches: Vec<ChangeBatch>,
    pub reloads: usize,
    pub registrations: Vec<String>,
    pub invalidations: usize,
}

impl ViewLog {
    /// Every event delivered since the log was last cleared, as one batch.
    pub fn combined(&self) -> ChangeBatch {
        ChangeBatch::new(
            self.batches
                .iter()
                .flat_map(|batch| batch.events().iter().cloned())
                .collect(),
        )
    }

    pub fn clear(&mut self) {
        self.batches.clear();
        self.reloads = 0;
        self.invalidations = 0;
    }
}

/// A host view that records batches instead of animating them.
pub struct RecordingView {
    log: Arc<Mutex<ViewLog>>,
}

impl RecordingView {
    pub fn attach(tree: &mut DataSourceTree) -> Arc<Mutex<ViewLog>> {
        let log = Arc::new(Mutex::new(ViewLog::default()));
        tree.set_view(Box::new(RecordingView { log: log.clone() }));
        log
    }
}

impl BatchUpdates for RecordingView {
    fn insert_sections(&mut self, _sections: &BTreeSet<usize>, _direction: SectionDirection) {}
    fn delete_sections(&mut self, _sections: &BTreeSet<usize>, _direction: SectionDirection) {}
    fn move_section(&mut self, _from: usize, _to: usize, _direction: SectionDirection) {}
    fn reload_sections(&mut self, _sections: &BTreeSet<usize>) {}
    fn insert_items(&mut self, _paths: &[IndexPath]) {}
    fn delete_items(&mut self, _paths: &[IndexPath]) {}
    fn move_item(&mut self, _from: IndexPath, _to: IndexPath) {}
    fn reload_items(&mut self, _paths: &[IndexPath]) {}
}

impl CollectionView for RecordingView {
    fn register_class(&mut self, view_class_tag: &str, reuse_identifier: &str, kind: &ElementKind) {
        self.log
            .lock()
            .registrations
            .push(format!("{}:{view_class_tag}:{reuse_identifier}", kind.as_str()));
    }

    fn dequeue(&mut self, _reuse_identifier: &str, _kind: &ElementKind, _path: IndexPath) -> ReusableView {
        Box::new(())
    }

    fn perform_batch_updates(&mut self, batch: ChangeBatch, completion: Option<BatchCompletion>) {
        self.log.lock().batches.push(batch);
        if let Some(completion) = completion {
            completion(true);
        }
    }

    fn reload_data(&mut self) {
        self.log.lock().reloads += 1;
    }

    fn invalidate_layout(&mut self, _context: &InvalidationContext) {
        self.log.lock().invalidations += 1;
    }
}

/// Leaf content with any number of sections of placeholder items.
#[derive(Debug, Clone, Default)]
pub struct SectionedContent {
    pub sections: Vec<usize>,
}

impl SectionedContent {
    pub fn new(sections: Vec<usize>) -> Self {
        Self { sections }
    }

    pub fn insert_section(&mut self, at: usize, items: usize, notifier: &mut Notifier) {
        let at = at.min(self.sections.len());
        self.sections.insert(at, items);
        notifier.notify_sections_inserted([at], SectionDirection::None);
    }

    pub fn remove_section(&mut self, at: usize, notifier: &mut Notifier) {
        if at < self.sections.len() {
            self.sections.remove(at);
            notifier.notify_sections_removed([at], SectionDirection::None);
        }
    }

    pub fn insert_item(&mut self, section: usize, index: usize, notifier: &mut Notifier) {
        if let Some(count) = self.sections.get_mut(section) {
            let index = index.min(*count);
            *count += 1;
            notifier.notify_items_inserted([IndexPath::new(section, index)]);
        }
    }

    pub fn remove_item_at(&mut self, section: usize, index: usize, notifier: &mut Notifier) {
        if let Some(count) = self.sections.get_mut(section) {
            if index < *count {
                *count -= 1;
                notifier.notify_items_removed([IndexPath::new(section, index)]);
            }
        }
    }

    pub fn move_item_within(&mut self, section: usize, from: usize, to: usize, notifier: &mut Notifier) {
        if self.sections.get(section).is_some_and(|count| from < *count && to < *count) {
            notifier.notify_item_moved(IndexPath::new(section, from), IndexPath::new(section, to));
        }
    }
}

impl DataSourceContent for SectionedContent {
    fn number_of_sections(&self) -> usize {
        self.sections.len()
    }

    fn number_of_items(&self, section: usize) -> usize {
        self.sections.get(section).copied().unwrap_or(0)
    }

    fn item(&self, path: IndexPath) -> Option<Item> {
        let section = path.section_index()?;
        (path.item < self.number_of_items(section)).then(|| Arc::new((section, path.item)) as Item)
    }
}

/// Item counts the host would query, section by section.
pub fn item_counts(tree: &DataSourceTree) -> Vec<usize> {
    (0..tree.number_of_sections())
        .map(|section| tree.number_of_items_in_section(section))
        .collect()
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
