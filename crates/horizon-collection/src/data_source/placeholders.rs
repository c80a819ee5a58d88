//! Placeholder state of the tree.

use std::ops::Range;

use horizon_collection_core::logging::targets;
use horizon_collection_core::{CollectionError, Result};

use super::{DataSourceId, DataSourceTree};
use crate::placeholder::{
    Placeholder, PlaceholderCoordinator, PlaceholderNodes, PlaceholderPlan, PlaceholderPolicy,
    PresentedPlaceholder,
};

impl PlaceholderNodes for DataSourceTree {
    fn node_placeholder(&self, node: DataSourceId) -> Option<PresentedPlaceholder> {
        let data = self.nodes.get(node)?;
        if let Some(presented) = &data.presented {
            return Some(presented.clone());
        }
        let mut placeholder = PlaceholderCoordinator::placeholder_for_state(PlaceholderPolicy {
            state: data.loader.state(),
            shows_activity_while_refreshing: data.shows_activity_while_refreshing,
            has_content: self.has_items(node),
            no_content: data.no_content_placeholder.as_ref(),
            error: data.error_placeholder.as_ref(),
        })?;
        if placeholder.message.is_none() && !placeholder.is_activity_indicator {
            placeholder.message = data
                .loader
                .loading_error()
                .filter(|_| data.loader.state() == crate::loading::LoadState::Error)
                .map(|error| error.message().to_string());
        }
        Some(PresentedPlaceholder {
            placeholder,
            sections: None,
        })
    }

    fn visible_children(&self, node: DataSourceId) -> Vec<(DataSourceId, usize)> {
        let mut base = 0;
        self.visible_children_of(node)
            .into_iter()
            .map(|child| {
                let entry = (child, base);
                base += self.number_of_sections_of(child);
                entry
            })
            .collect()
    }

    fn section_count(&self, node: DataSourceId) -> usize {
        self.number_of_sections_of(node)
    }
}

impl DataSourceTree {
    /// Whether any section of `id` holds at least one item.
    fn has_items(&self, id: DataSourceId) -> bool {
        (0..self.number_of_sections_of(id)).any(|section| {
            self.leaf_for_section(id, section)
                .and_then(|(leaf, local)| self.content(leaf).map(|content| content.number_of_items(local) > 0))
                .unwrap_or(false)
        })
    }

    /// Placeholders covering the root's sections right now.
    pub fn placeholder_plan(&self) -> PlaceholderPlan {
        match self.root {
            Some(root) => PlaceholderCoordinator::resolve(self, root),
            None => PlaceholderPlan::default(),
        }
    }

    /// Show an activity indicator over `sections` of `id` (all of them when
    /// `None`), independent of the load state.
    pub fn present_activity_indicator(&mut self, id: DataSourceId, sections: Option<Range<usize>>) -> Result<()> {
        self.present_placeholder(id, Placeholder::activity(), sections)
    }

    /// Show `placeholder` over the contiguous `sections` of `id` (all of them
    /// when `None`). Replaces any placeholder presented earlier.
    pub fn present_placeholder(
        &mut self,
        id: DataSourceId,
        placeholder: Placeholder,
        sections: Option<Range<usize>>,
    ) -> Result<()> {
        let count = self.number_of_sections_of(id);
        if let Some(range) = &sections {
            if range.start >= range.end || range.end > count {
                return Err(CollectionError::index_out_of_range(
                    "placeholder sections",
                    range.end,
                    count,
                ));
            }
        }
        self.begin_update();
        let result = self.node_mut(id).map(|node| {
            node.presented = Some(PresentedPlaceholder {
                placeholder,
                sections,
            });
        });
        tracing::debug!(target: targets::PLACEHOLDER, ?id, "placeholder presented");
        self.end_update();
        result
    }

    /// Dismiss a presented placeholder. With `sections`, only dismisses when
    /// the presented placeholder covers exactly those sections.
    pub fn dismiss_placeholder(&mut self, id: DataSourceId, sections: Option<Range<usize>>) -> Result<()> {
        self.begin_update();
        let result = self.node_mut(id).map(|node| {
            let matches = match (&node.presented, &sections) {
                (Some(presented), Some(sections)) => presented.sections.as_ref() == Some(sections),
                (Some(_), None) => true,
                (None, _) => false,
            };
            if matches {
                node.presented = None;
            }
        });
        tracing::debug!(target: targets::PLACEHOLDER, ?id, "placeholder dismissed");
        self.end_update();
        result
    }

    pub fn set_no_content_placeholder(&mut self, id: DataSourceId, placeholder: Option<Placeholder>) -> Result<()> {
        self.begin_update();
        let result = self.node_mut(id).map(|node| node.no_content_placeholder = placeholder);
        self.end_update();
        result
    }

    pub fn set_error_placeholder(&mut self, id: DataSourceId, placeholder: Option<Placeholder>) -> Result<()> {
        self.begin_update();
        let result = self.node_mut(id).map(|node| node.error_placeholder = placeholder);
        self.end_update();
        result
    }

    /// Show an activity placeholder while refreshing, not only on first load.
    pub fn set_shows_activity_indicator_while_refreshing_content(
        &mut self,
        id: DataSourceId,
        shows: bool,
    ) -> Result<()> {
        self.begin_update();
        let result = self
            .node_mut(id)
            .map(|node| node.shows_activity_while_refreshing = shows);
        self.end_update();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_source::BasicDataSource;

    fn composed_tree() -> (DataSourceTree, DataSourceId, DataSourceId, DataSourceId) {
        let mut tree = DataSourceTree::default();
        let a = tree.add_leaf(BasicDataSource::new(vec![1, 2]));
        let b = tree.add_leaf(BasicDataSource::new(vec![3]));
        let root = tree.add_composed();
        tree.add_data_source(root, a).unwrap();
        tree.add_data_source(root, b).unwrap();
        tree.set_root(root).unwrap();
        (tree, root, a, b)
    }

    #[test]
    fn test_presented_placeholder_hides_items() {
        let (mut tree, _root, _a, b) = composed_tree();
        tree.present_placeholder(b, Placeholder::new("Nothing", "here"), None)
            .unwrap();
        let plan = tree.placeholder_plan();
        assert_eq!(plan.ranges().len(), 1);
        assert_eq!(plan.ranges()[0].sections, 1..2);
        assert_eq!(tree.number_of_items_in_section(1), 0);
        assert_eq!(tree.content_items_in_section(1), 1);

        tree.dismiss_placeholder(b, None).unwrap();
        assert!(tree.placeholder_plan().is_empty());
        assert_eq!(tree.number_of_items_in_section(1), 1);
    }

    #[test]
    fn test_dismiss_requires_matching_sections() {
        let (mut tree, root, _a, _b) = composed_tree();
        tree.present_activity_indicator(root, Some(0..1)).unwrap();
        tree.dismiss_placeholder(root, Some(1..2)).unwrap();
        assert!(tree.placeholder_plan().covers(0));
        tree.dismiss_placeholder(root, Some(0..1)).unwrap();
        assert!(!tree.placeholder_plan().covers(0));
    }

    #[test]
    fn test_present_rejects_bad_range() {
        let (mut tree, _root, a, _b) = composed_tree();
        assert!(tree
            .present_placeholder(a, Placeholder::activity(), Some(0..3))
            .is_err());
    }

    #[test]
    fn test_error_placeholder_shows_error_message() {
        let mut tree = DataSourceTree::default();
        let leaf = tree.add_leaf(BasicDataSource::<u8>::new(Vec::new()));
        tree.set_root(leaf).unwrap();
        tree.update_leaf(leaf, |content: &mut BasicDataSource<u8>, _| {
            content.set_loader(|token| {
                token.done_with_error(horizon_collection_core::LoadError::new("offline"))
            });
        })
        .unwrap();
        tree.load_content(leaf).unwrap();

        let plan = tree.placeholder_plan();
        let placeholder = &plan.ranges()[0].placeholder;
        assert_eq!(placeholder.title.as_deref(), Some("Unable to Load"));
        assert_eq!(placeholder.message.as_deref(), Some("offline"));
    }
}
