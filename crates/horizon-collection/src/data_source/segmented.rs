//! Segment selection.
//!
//! A segmented data source shows the sections of exactly one child. It
//! carries a pinned header, keyed [`SEGMENTED_CONTROL_HEADER_KEY`], in which
//! the host draws a segmented control built from
//! [`segment_titles`](DataSourceTree::segment_titles).

use horizon_collection_core::logging::targets;
use horizon_collection_core::{CollectionError, Result};

use super::{DataSourceId, DataSourceTree, NodeKind};
use crate::change::{ChangeEvent, SectionDirection};
use crate::metrics::SupplementaryItem;

/// Header key of the segmented control of a segmented data source.
pub const SEGMENTED_CONTROL_HEADER_KEY: &str = "segmented-control";

impl DataSourceTree {
    pub(crate) fn install_segmented_control_header(&mut self, id: DataSourceId) {
        let header = SupplementaryItem::header()
            .pinned(true)
            .visible_while_showing_placeholder(true)
            .with_view_class("SegmentedControlHeader", SEGMENTED_CONTROL_HEADER_KEY);
        if let Some(node) = self.nodes.get_mut(id) {
            node.headers
                .push((SEGMENTED_CONTROL_HEADER_KEY.to_string(), header));
        }
    }

    /// The selected child of a segmented data source.
    pub fn selected_data_source(&self, id: DataSourceId) -> Option<DataSourceId> {
        match &self.nodes.get(id)?.kind {
            NodeKind::Segmented {
                children, selected, ..
            } => selected.and_then(|index| children.get(index).copied()),
            _ => None,
        }
    }

    pub fn selected_data_source_index(&self, id: DataSourceId) -> Option<usize> {
        match &self.nodes.get(id)?.kind {
            NodeKind::Segmented { selected, .. } => *selected,
            _ => None,
        }
    }

    /// Titles of the children, for the segmented control.
    pub fn segment_titles(&self, id: DataSourceId) -> Vec<String> {
        self.children_of(id)
            .into_iter()
            .map(|child| self.title(child).unwrap_or_default().to_string())
            .collect()
    }

    /// Select `child` of segmented data source `id`.
    pub fn select_data_source(&mut self, id: DataSourceId, child: DataSourceId) -> Result<()> {
        let index = self
            .children_of(id)
            .iter()
            .position(|candidate| *candidate == child)
            .ok_or_else(|| CollectionError::invalid_composition("not a segment of this data source"))?;
        self.select_data_source_at(id, index)
    }

    /// Select the child at `index`.
    ///
    /// The host sees the old child's sections removed and the new child's
    /// inserted, animated toward the side the selection moved to. The old
    /// child resigns; the new one becomes active and loads if it never has.
    pub fn select_data_source_at(&mut self, id: DataSourceId, index: usize) -> Result<()> {
        let (count, previous) = match &self.node(id)?.kind {
            NodeKind::Segmented {
                children, selected, ..
            } => (children.len(), *selected),
            _ => {
                return Err(CollectionError::invalid_composition(
                    "only segmented data sources have a selection",
                ));
            }
        };
        if index >= count {
            return Err(CollectionError::index_out_of_range("segment", index, count));
        }
        if previous == Some(index) {
            return Ok(());
        }

        self.begin_update();
        let old_child = self.selected_data_source(id);
        let old_sections = old_child.map_or(0, |child| self.number_of_sections_of(child));
        if let Some(old_child) = old_child {
            if self.is_active(old_child) {
                self.will_resign_active(old_child);
            }
        }

        if let NodeKind::Segmented { selected, .. } = &mut self.node_mut(id)?.kind {
            *selected = Some(index);
        }
        let new_child = self.selected_data_source(id);
        let new_sections = new_child.map_or(0, |child| self.number_of_sections_of(child));
        let direction = previous.map_or(SectionDirection::None, |old| SectionDirection::between(old, index));
        tracing::debug!(target: targets::DATA_SOURCE, ?id, ?previous, index, "segment selected");

        self.dispatch(
            id,
            vec![
                ChangeEvent::SectionsRemoved {
                    sections: (0..old_sections).collect(),
                    direction,
                },
                ChangeEvent::SectionsInserted {
                    sections: (0..new_sections).collect(),
                    direction,
                },
            ],
        );
        if let Some(new_child) = new_child {
            if self.is_active(id) {
                self.activate(new_child);
            }
        }
        self.refresh_aggregate(id);
        self.end_update();
        if self.update_depth == 0 {
            self.process_load_completions();
        }
        Ok(())
    }

    pub fn should_display_default_header(&self, id: DataSourceId) -> bool {
        matches!(
            self.nodes.get(id).map(|node| &node.kind),
            Some(NodeKind::Segmented {
                should_display_default_header: true,
                ..
            })
        )
    }

    /// Show or hide the segmented control header.
    pub fn set_should_display_default_header(&mut self, id: DataSourceId, display: bool) -> Result<()> {
        let node = self.node_mut(id)?;
        let NodeKind::Segmented {
            should_display_default_header,
            ..
        } = &mut node.kind
        else {
            return Err(CollectionError::invalid_composition(
                "only segmented data sources have a segmented control",
            ));
        };
        *should_display_default_header = display;
        if let Some((_, header)) = node
            .headers
            .iter_mut()
            .find(|(key, _)| key == SEGMENTED_CONTROL_HEADER_KEY)
        {
            header.hidden = !display;
        }
        self.invalidate_metrics();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_source::BasicDataSource;
    use crate::loading::LoadState;

    fn segmented() -> (DataSourceTree, DataSourceId, DataSourceId, DataSourceId) {
        let mut tree = DataSourceTree::default();
        let first = tree.add_leaf(BasicDataSource::new(vec![1, 2]));
        let second = tree.add_leaf(BasicDataSource::new(vec![3]));
        tree.set_title(first, "First").unwrap();
        tree.set_title(second, "Second").unwrap();
        let root = tree.add_segmented();
        tree.add_data_source(root, first).unwrap();
        tree.add_data_source(root, second).unwrap();
        tree.set_root(root).unwrap();
        (tree, root, first, second)
    }

    #[test]
    fn test_first_child_is_selected() {
        let (tree, root, first, _second) = segmented();
        assert_eq!(tree.selected_data_source(root), Some(first));
        assert_eq!(tree.number_of_sections(), 1);
        assert_eq!(tree.number_of_items_in_section(0), 2);
        assert_eq!(tree.segment_titles(root), vec!["First", "Second"]);
    }

    #[test]
    fn test_switching_activates_and_loads() {
        let (mut tree, root, first, second) = segmented();
        tree.did_become_active(root);
        assert!(tree.is_active(first));
        assert_eq!(tree.load_state(second), Some(LoadState::Initial));

        tree.select_data_source(root, second).unwrap();
        assert!(!tree.is_active(first));
        assert!(tree.is_active(second));
        assert_eq!(tree.load_state(second), Some(LoadState::Loaded));
        assert_eq!(tree.number_of_items_in_section(0), 1);
        assert_eq!(tree.load_state(root), Some(LoadState::Loaded));
    }

    #[test]
    fn test_selection_out_of_range() {
        let (mut tree, root, _first, _second) = segmented();
        assert!(matches!(
            tree.select_data_source_at(root, 5),
            Err(CollectionError::IndexOutOfRange { .. })
        ));
    }

    #[test]
    fn test_default_header_toggle() {
        let (mut tree, root, _first, _second) = segmented();
        assert!(tree.should_display_default_header(root));
        tree.set_should_display_default_header(root, false).unwrap();
        assert!(!tree.should_display_default_header(root));
        assert!(tree
            .header_for_key(root, SEGMENTED_CONTROL_HEADER_KEY)
            .is_some_and(|header| header.hidden));
    }
}
