//! A single-section list data source.

use std::fmt;
use std::sync::Arc;

use super::{DataSourceContent, DataSourceId, DataSourceTree, Item};
use crate::change::Notifier;
use crate::index_path::IndexPath;
use crate::loading::LoadToken;
use horizon_collection_core::Result;

type Loader = Box<dyn FnMut(LoadToken) + Send>;

/// A leaf showing one section of items.
///
/// Items are held behind `Arc` and compared by identity, so the same value
/// inserted twice is two items. [`set_items`](Self::set_items) with
/// `animated` computes removals, insertions and moves between the old and new
/// lists.
pub struct BasicDataSource<T> {
    items: Vec<Arc<T>>,
    loader: Option<Loader>,
    can_move: bool,
    can_remove: bool,
}

impl<T> fmt::Debug for BasicDataSource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicDataSource")
            .field("len", &self.items.len())
            .field("has_loader", &self.loader.is_some())
            .field("can_move", &self.can_move)
            .finish()
    }
}

impl<T: Send + Sync + 'static> BasicDataSource<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self::from_shared(items.into_iter().map(Arc::new).collect())
    }

    /// Build from items that are already shared.
    pub fn from_shared(items: Vec<Arc<T>>) -> Self {
        Self {
            items,
            loader: None,
            can_move: false,
            can_remove: false,
        }
    }

    pub fn items(&self) -> &[Arc<T>] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<T>> {
        self.items.get(index)
    }

    /// Let users reorder items by dragging.
    pub fn set_can_move(&mut self, can_move: bool) {
        self.can_move = can_move;
    }

    /// Let users delete items.
    pub fn set_can_remove(&mut self, can_remove: bool) {
        self.can_remove = can_remove;
    }

    /// Install the closure run on every load. Without one, loads finish
    /// immediately.
    pub fn set_loader<F>(&mut self, loader: F)
    where
        F: FnMut(LoadToken) + Send + 'static,
    {
        self.loader = Some(Box::new(loader));
    }

    /// Replace the items.
    ///
    /// Without animation the host reloads everything. With animation the
    /// difference is reported as removals (old indices), insertions (new
    /// indices) and moves, each applied after the ones before it.
    pub fn set_items(&mut self, items: Vec<Arc<T>>, animated: bool, notifier: &mut Notifier) {
        let old = std::mem::replace(&mut self.items, items);
        if !animated {
            notifier.notify_did_reload_data();
            return;
        }
        diff_into(&old, &self.items, notifier);
    }

    /// Append items at the end.
    pub fn append(&mut self, items: Vec<T>, notifier: &mut Notifier) {
        let start = self.items.len();
        self.items.extend(items.into_iter().map(Arc::new));
        notifier.notify_items_inserted((start..self.items.len()).map(|index| IndexPath::new(0, index)));
    }

    /// Insert one item at `index`.
    pub fn insert(&mut self, index: usize, item: T, notifier: &mut Notifier) {
        let index = index.min(self.items.len());
        self.items.insert(index, Arc::new(item));
        notifier.notify_items_inserted([IndexPath::new(0, index)]);
    }

    /// Remove the items at `indices`; out-of-range indices are ignored.
    pub fn remove_at(&mut self, indices: &[usize], notifier: &mut Notifier) {
        let mut indices: Vec<usize> = indices.iter().copied().filter(|i| *i < self.items.len()).collect();
        indices.sort_unstable();
        indices.dedup();
        for index in indices.iter().rev() {
            self.items.remove(*index);
        }
        notifier.notify_items_removed(indices.into_iter().map(|index| IndexPath::new(0, index)));
    }

    /// Report every item as changed.
    pub fn refresh_all(&self, notifier: &mut Notifier) {
        notifier.notify_items_refreshed((0..self.items.len()).map(|index| IndexPath::new(0, index)));
    }
}

/// Report the edit from `old` to `new` as sequential removals, insertions
/// and moves, matching items by identity.
fn diff_into<T>(old: &[Arc<T>], new: &[Arc<T>], notifier: &mut Notifier) {
    let mut claimed = vec![false; new.len()];
    let matches: Vec<Option<usize>> = old
        .iter()
        .map(|item| {
            let found = new
                .iter()
                .enumerate()
                .position(|(index, candidate)| !claimed[index] && Arc::ptr_eq(item, candidate));
            if let Some(index) = found {
                claimed[index] = true;
            }
            found
        })
        .collect();

    let removed: Vec<usize> = (0..old.len()).filter(|index| matches[*index].is_none()).collect();
    let inserted: Vec<usize> = (0..new.len()).filter(|index| !claimed[*index]).collect();
    notifier.notify_items_removed(removed.iter().map(|index| IndexPath::new(0, *index)));
    notifier.notify_items_inserted(inserted.iter().map(|index| IndexPath::new(0, *index)));

    // Each entry is the final index of the item now at that position.
    let mut current: Vec<usize> = matches.into_iter().flatten().collect();
    for index in inserted {
        current.insert(index, index);
    }
    for target in 0..current.len() {
        if current[target] == target {
            continue;
        }
        if let Some(from) = current.iter().skip(target).position(|v| *v == target) {
            let from = from + target;
            let value = current.remove(from);
            current.insert(target, value);
            notifier.notify_item_moved(IndexPath::new(0, from), IndexPath::new(0, target));
        }
    }
}

impl<T: Send + Sync + 'static> DataSourceContent for BasicDataSource<T> {
    fn number_of_items(&self, section: usize) -> usize {
        if section == 0 { self.items.len() } else { 0 }
    }

    fn item(&self, path: IndexPath) -> Option<Item> {
        if path.section_index() != Some(0) {
            return None;
        }
        self.items.get(path.item).map(|item| item.clone() as Item)
    }

    fn remove_item(&mut self, path: IndexPath, notifier: &mut Notifier) -> bool {
        if !self.can_remove || path.section_index() != Some(0) || path.item >= self.items.len() {
            return false;
        }
        self.items.remove(path.item);
        notifier.notify_items_removed([path]);
        true
    }

    fn move_item(&mut self, from: IndexPath, to: IndexPath, notifier: &mut Notifier) -> bool {
        if !self.can_move_item_to(from, to) || from == to {
            return false;
        }
        let item = self.items.remove(from.item);
        self.items.insert(to.item, item);
        notifier.notify_item_moved(from, to);
        true
    }

    fn can_move_item(&self, path: IndexPath) -> bool {
        self.can_move && path.section_index() == Some(0) && path.item < self.items.len()
    }

    fn can_move_item_to(&self, from: IndexPath, to: IndexPath) -> bool {
        self.can_move_item(from) && to.section_index() == Some(0) && to.item < self.items.len()
    }

    fn load_content(&mut self, token: LoadToken) {
        match self.loader.as_mut() {
            Some(loader) => loader(token),
            None => token.done(),
        }
    }

    fn reset_content(&mut self) {
        self.items.clear();
    }
}

impl DataSourceTree {
    /// Replace the items of a [`BasicDataSource`] leaf.
    pub fn set_items<T: Send + Sync + 'static>(
        &mut self,
        id: DataSourceId,
        items: Vec<Arc<T>>,
        animated: bool,
    ) -> Result<()> {
        self.update_leaf(id, |content: &mut BasicDataSource<T>, notifier| {
            content.set_items(items, animated, notifier)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::ChangeEvent;

    fn replay(old: &[Arc<u32>], events: &[ChangeEvent]) -> Vec<Arc<u32>> {
        let mut items = old.to_vec();
        let mut inserted = Vec::new();
        for event in events {
            match event {
                ChangeEvent::ItemsRemoved(paths) => {
                    let mut indices: Vec<usize> = paths.iter().map(|p| p.item).collect();
                    indices.sort_unstable();
                    for index in indices.into_iter().rev() {
                        items.remove(index);
                    }
                }
                ChangeEvent::ItemsInserted(paths) => {
                    for path in paths {
                        items.insert(path.item, Arc::new(u32::MAX));
                        inserted.push(path.item);
                    }
                }
                ChangeEvent::ItemMoved { from, to } => {
                    let item = items.remove(from.item);
                    items.insert(to.item, item);
                }
                other => panic!("unexpected event {other:?}"),
            }
        }
        items
    }

    #[test]
    fn test_animated_diff_replays_to_new_order() {
        let old: Vec<Arc<u32>> = (0..6).map(Arc::new).collect();
        let fresh = Arc::new(99);
        let new = vec![
            old[4].clone(),
            fresh.clone(),
            old[0].clone(),
            old[2].clone(),
            old[1].clone(),
        ];

        let mut source = BasicDataSource::from_shared(old.clone());
        let mut notifier = Notifier::new();
        source.set_items(new.clone(), true, &mut notifier);
        let events = notifier.take();

        let replayed = replay(&old, &events);
        assert_eq!(replayed.len(), new.len());
        for (index, item) in new.iter().enumerate() {
            if Arc::ptr_eq(item, &fresh) {
                assert_eq!(*replayed[index], u32::MAX);
            } else {
                assert!(Arc::ptr_eq(&replayed[index], item));
            }
        }
    }

    #[test]
    fn test_unanimated_set_reloads() {
        let mut source = BasicDataSource::new(vec![1, 2]);
        let mut notifier = Notifier::new();
        source.set_items(vec![Arc::new(3)], false, &mut notifier);
        assert_eq!(notifier.events(), &[ChangeEvent::ReloadData]);
        assert_eq!(source.len(), 1);
    }

    #[test]
    fn test_identical_items_produce_no_events() {
        let items: Vec<Arc<u32>> = (0..3).map(Arc::new).collect();
        let mut source = BasicDataSource::from_shared(items.clone());
        let mut notifier = Notifier::new();
        source.set_items(items, true, &mut notifier);
        assert!(notifier.is_empty());
    }

    #[test]
    fn test_item_lookup() {
        let source = BasicDataSource::new(vec!["a", "b"]);
        assert_eq!(source.number_of_items(0), 2);
        assert_eq!(source.number_of_items(1), 0);
        let item = source.item(IndexPath::new(0, 1)).unwrap();
        assert_eq!(item.downcast_ref::<&str>(), Some(&"b"));
        assert!(source.item(IndexPath::new(0, 2)).is_none());
        assert_eq!(source.index_paths_for_item(&item), vec![IndexPath::new(0, 1)]);
    }

    #[test]
    fn test_move_requires_permission() {
        let mut source = BasicDataSource::new(vec![1, 2, 3]);
        let mut notifier = Notifier::new();
        assert!(!source.move_item(IndexPath::new(0, 0), IndexPath::new(0, 2), &mut notifier));

        source.set_can_move(true);
        assert!(source.move_item(IndexPath::new(0, 0), IndexPath::new(0, 2), &mut notifier));
        let values: Vec<i32> = source.items().iter().map(|item| **item).collect();
        assert_eq!(values, vec![2, 3, 1]);
    }

    #[test]
    fn test_remove_at_reports_ascending_paths() {
        let mut source = BasicDataSource::new(vec![1, 2, 3, 4]);
        let mut notifier = Notifier::new();
        source.remove_at(&[3, 1, 9], &mut notifier);
        assert_eq!(source.len(), 2);
        assert_eq!(
            notifier.events(),
            &[ChangeEvent::ItemsRemoved(vec![IndexPath::new(0, 1), IndexPath::new(0, 3)])]
        );
    }
}
