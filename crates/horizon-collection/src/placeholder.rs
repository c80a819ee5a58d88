//! Placeholder selection and section-range resolution.
//!
//! A placeholder stands in for the cells of one or more contiguous sections
//! when a data source is loading with nothing to show, has no content, or
//! failed to load. [`PlaceholderCoordinator`] decides which placeholder each
//! node wants from its load state, then walks the composition tree top-down
//! to produce non-overlapping global section ranges. A parent's active
//! placeholder masks every placeholder below it.

use std::ops::Range;

use horizon_collection_core::logging::targets;

use crate::data_source::DataSourceId;
use crate::loading::LoadState;

/// Content shown in place of cells.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Placeholder {
    pub title: Option<String>,
    pub message: Option<String>,
    /// Opaque image name resolved by the host.
    pub image: Option<String>,
    pub is_activity_indicator: bool,
}

impl Placeholder {
    /// A text placeholder.
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            message: Some(message.into()),
            image: None,
            is_activity_indicator: false,
        }
    }

    /// A spinning activity indicator.
    pub fn activity() -> Self {
        Self {
            is_activity_indicator: true,
            ..Default::default()
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }
}

/// A placeholder explicitly presented on a node, independent of its load state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentedPlaceholder {
    pub placeholder: Placeholder,
    /// Local sections covered; `None` covers every section of the node.
    pub sections: Option<Range<usize>>,
}

/// A placeholder occupying a contiguous run of global sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderRange {
    /// Global sections covered, end exclusive. Never empty.
    pub sections: Range<usize>,
    pub placeholder: Placeholder,
    /// The node whose state produced the placeholder.
    pub owner: DataSourceId,
}

impl PlaceholderRange {
    /// Whether `section` is covered.
    #[inline]
    pub fn covers(&self, section: usize) -> bool {
        self.sections.contains(&section)
    }

    /// Whether `section` is the first covered section.
    #[inline]
    pub fn starts_at(&self, section: usize) -> bool {
        self.sections.start == section
    }

    fn overlaps(&self, other: &Range<usize>) -> bool {
        self.sections.start < other.end && other.start < self.sections.end
    }
}

/// The placeholder ranges for one view, sorted by first section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaceholderPlan {
    ranges: Vec<PlaceholderRange>,
}

impl PlaceholderPlan {
    /// All ranges in section order.
    pub fn ranges(&self) -> &[PlaceholderRange] {
        &self.ranges
    }

    /// The range covering `section`, if any.
    pub fn range_for_section(&self, section: usize) -> Option<&PlaceholderRange> {
        self.ranges.iter().find(|range| range.covers(section))
    }

    /// Whether any placeholder covers `section`.
    pub fn covers(&self, section: usize) -> bool {
        self.range_for_section(section).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

/// What the coordinator needs to know about the composition tree.
pub(crate) trait PlaceholderNodes {
    /// The placeholder the node itself wants, with the local sections it
    /// covers (`None` for all of them).
    fn node_placeholder(&self, node: DataSourceId) -> Option<PresentedPlaceholder>;

    /// Children currently contributing sections, with their global base
    /// relative to the node.
    fn visible_children(&self, node: DataSourceId) -> Vec<(DataSourceId, usize)>;

    /// Number of sections the node contributes.
    fn section_count(&self, node: DataSourceId) -> usize;
}

/// Inputs for choosing a node's state-driven placeholder.
#[derive(Debug, Clone, Copy)]
pub struct PlaceholderPolicy<'a> {
    pub state: LoadState,
    pub shows_activity_while_refreshing: bool,
    /// Whether the node has items from an earlier load.
    pub has_content: bool,
    pub no_content: Option<&'a Placeholder>,
    pub error: Option<&'a Placeholder>,
}

/// Decides which placeholders are active and where.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaceholderCoordinator;

impl PlaceholderCoordinator {
    /// The placeholder a node shows for its load state, if any.
    ///
    /// At most one of the no-content and error placeholders is ever chosen.
    pub fn placeholder_for_state(policy: PlaceholderPolicy<'_>) -> Option<Placeholder> {
        match policy.state {
            LoadState::Loading => Some(Placeholder::activity()),
            // A refresh over nothing looks like a first load.
            LoadState::Refreshing if policy.shows_activity_while_refreshing || !policy.has_content => {
                Some(Placeholder::activity())
            }
            LoadState::NoContent => policy.no_content.cloned(),
            LoadState::Error => policy.error.cloned(),
            _ => None,
        }
    }

    /// Resolve the placeholder ranges for the tree rooted at `root`.
    pub(crate) fn resolve(nodes: &dyn PlaceholderNodes, root: DataSourceId) -> PlaceholderPlan {
        let mut ranges = Vec::new();
        Self::collect(nodes, root, 0, &mut ranges);
        ranges.sort_by_key(|range| range.sections.start);
        tracing::trace!(target: targets::PLACEHOLDER, count = ranges.len(), "resolved placeholders");
        PlaceholderPlan { ranges }
    }

    fn collect(
        nodes: &dyn PlaceholderNodes,
        node: DataSourceId,
        base: usize,
        ranges: &mut Vec<PlaceholderRange>,
    ) {
        let count = nodes.section_count(node);
        if count == 0 {
            return;
        }

        let mut masked: Option<Range<usize>> = None;
        if let Some(presented) = nodes.node_placeholder(node) {
            let local = presented
                .sections
                .map(|sections| sections.start.min(count)..sections.end.min(count))
                .unwrap_or(0..count);
            if !local.is_empty() {
                let global = base + local.start..base + local.end;
                let covers_all = local == (0..count);
                ranges.push(PlaceholderRange {
                    sections: global.clone(),
                    placeholder: presented.placeholder,
                    owner: node,
                });
                if covers_all {
                    return;
                }
                masked = Some(global);
            }
        }

        for (child, child_base) in nodes.visible_children(node) {
            let mut child_ranges = Vec::new();
            Self::collect(nodes, child, base + child_base, &mut child_ranges);
            ranges.extend(
                child_ranges
                    .into_iter()
                    .filter(|range| masked.as_ref().is_none_or(|mask| !range.overlaps(mask))),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeTree {
        ids: SlotMap<DataSourceId, ()>,
        placeholders: HashMap<DataSourceId, PresentedPlaceholder>,
        children: HashMap<DataSourceId, Vec<(DataSourceId, usize)>>,
        counts: HashMap<DataSourceId, usize>,
    }

    impl FakeTree {
        fn node(&mut self, sections: usize) -> DataSourceId {
            let id = self.ids.insert(());
            self.counts.insert(id, sections);
            id
        }

        fn show(&mut self, id: DataSourceId, sections: Option<Range<usize>>) {
            self.placeholders.insert(
                id,
                PresentedPlaceholder {
                    placeholder: Placeholder::new("Empty", ""),
                    sections,
                },
            );
        }
    }

    impl PlaceholderNodes for FakeTree {
        fn node_placeholder(&self, node: DataSourceId) -> Option<PresentedPlaceholder> {
            self.placeholders.get(&node).cloned()
        }

        fn visible_children(&self, node: DataSourceId) -> Vec<(DataSourceId, usize)> {
            self.children.get(&node).cloned().unwrap_or_default()
        }

        fn section_count(&self, node: DataSourceId) -> usize {
            self.counts[&node]
        }
    }

    fn composed_of_two() -> (FakeTree, DataSourceId, DataSourceId, DataSourceId) {
        let mut tree = FakeTree::default();
        let a = tree.node(3);
        let b = tree.node(2);
        let root = tree.node(5);
        tree.children.insert(root, vec![(a, 0), (b, 3)]);
        (tree, root, a, b)
    }

    #[test]
    fn test_state_selection() {
        let empty = Placeholder::new("No Items", "");
        let failed = Placeholder::new("Failed", "");
        let policy = |state| PlaceholderPolicy {
            state,
            shows_activity_while_refreshing: false,
            has_content: true,
            no_content: Some(&empty),
            error: Some(&failed),
        };

        assert!(PlaceholderCoordinator::placeholder_for_state(policy(LoadState::Loading))
            .is_some_and(|p| p.is_activity_indicator));
        assert_eq!(
            PlaceholderCoordinator::placeholder_for_state(policy(LoadState::NoContent)),
            Some(empty.clone())
        );
        assert_eq!(
            PlaceholderCoordinator::placeholder_for_state(policy(LoadState::Error)),
            Some(failed.clone())
        );
        assert_eq!(PlaceholderCoordinator::placeholder_for_state(policy(LoadState::Refreshing)), None);
        assert_eq!(PlaceholderCoordinator::placeholder_for_state(policy(LoadState::Loaded)), None);
    }

    #[test]
    fn test_refreshing_activity_when_configured() {
        let policy = PlaceholderPolicy {
            state: LoadState::Refreshing,
            shows_activity_while_refreshing: true,
            has_content: true,
            no_content: None,
            error: None,
        };
        assert!(PlaceholderCoordinator::placeholder_for_state(policy).is_some());
    }

    #[test]
    fn test_refreshing_without_content_shows_activity() {
        let policy = |has_content| PlaceholderPolicy {
            state: LoadState::Refreshing,
            shows_activity_while_refreshing: false,
            has_content,
            no_content: None,
            error: None,
        };
        assert!(PlaceholderCoordinator::placeholder_for_state(policy(false))
            .is_some_and(|p| p.is_activity_indicator));
        assert_eq!(PlaceholderCoordinator::placeholder_for_state(policy(true)), None);
    }

    #[test]
    fn test_child_ranges_are_global() {
        let (mut tree, root, _a, b) = composed_of_two();
        tree.show(b, None);

        let plan = PlaceholderCoordinator::resolve(&tree, root);
        assert_eq!(plan.ranges().len(), 1);
        assert_eq!(plan.ranges()[0].sections, 3..5);
        assert!(plan.covers(4));
        assert!(!plan.covers(2));
    }

    #[test]
    fn test_parent_masks_children() {
        let (mut tree, root, a, b) = composed_of_two();
        tree.show(a, None);
        tree.show(b, None);
        tree.show(root, None);

        let plan = PlaceholderCoordinator::resolve(&tree, root);
        assert_eq!(plan.ranges().len(), 1);
        assert_eq!(plan.ranges()[0].owner, root);
        assert_eq!(plan.ranges()[0].sections, 0..5);
    }

    #[test]
    fn test_section_specific_placeholder_masks_overlapping_children() {
        let (mut tree, root, a, b) = composed_of_two();
        tree.show(root, Some(1..2));
        tree.show(a, None);
        tree.show(b, Some(1..2));

        let plan = PlaceholderCoordinator::resolve(&tree, root);
        let sections: Vec<_> = plan.ranges().iter().map(|r| r.sections.clone()).collect();
        assert_eq!(sections, vec![1..2, 4..5]);
    }

    #[test]
    fn test_empty_nodes_produce_nothing() {
        let mut tree = FakeTree::default();
        let leaf = tree.node(0);
        tree.show(leaf, None);
        assert!(PlaceholderCoordinator::resolve(&tree, leaf).is_empty());
    }
}
