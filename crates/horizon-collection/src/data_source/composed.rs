//! Adding and removing children of composed and segmented data sources.

use std::collections::BTreeSet;

use horizon_collection_core::logging::targets;
use horizon_collection_core::{CollectionError, Result};

use super::{DataSourceId, DataSourceTree, NodeKind};
use crate::change::{ChangeEvent, SectionDirection};
use crate::index_path::IndexPath;
use crate::mapping::SectionMapping;

impl DataSourceTree {
    /// Append `child` to a composed or segmented `parent`.
    ///
    /// The first child of a segmented data source becomes its selection.
    /// If `parent` is active, `child` is activated and loaded.
    pub fn add_data_source(&mut self, parent: DataSourceId, child: DataSourceId) -> Result<()> {
        self.add_data_source_with_direction(parent, child, SectionDirection::None)
    }

    /// [`add_data_source`](Self::add_data_source), animating the inserted
    /// sections in from `direction`.
    pub fn add_data_source_with_direction(
        &mut self,
        parent: DataSourceId,
        child: DataSourceId,
        direction: SectionDirection,
    ) -> Result<()> {
        self.check_can_adopt(parent, child)?;

        self.begin_update();
        match &mut self.node_mut(parent)?.kind {
            NodeKind::Composed { mappings } => mappings.push(SectionMapping::new(child)),
            NodeKind::Segmented {
                children, selected, ..
            } => {
                children.push(child);
                if selected.is_none() {
                    *selected = Some(0);
                }
            }
            NodeKind::Leaf(_) => {}
        }
        self.node_mut(child)?.parent = Some(parent);
        self.rebuild_mappings(parent);
        tracing::debug!(target: targets::DATA_SOURCE, ?parent, ?child, "data source added");

        if let Some(base) = self.child_base(parent, child) {
            let count = self.number_of_sections_of(child);
            self.dispatch(
                parent,
                vec![ChangeEvent::SectionsInserted {
                    sections: (base..base + count).collect(),
                    direction,
                }],
            );
        }
        if let Some(mut view) = self.view.take() {
            self.register_reusable_views(view.as_mut());
            self.view = Some(view);
        }
        if self.is_active(parent) && self.child_base(parent, child).is_some() {
            self.activate(child);
        }
        self.end_update();
        if self.update_depth == 0 {
            self.process_load_completions();
        }
        Ok(())
    }

    fn check_can_adopt(&self, parent: DataSourceId, child: DataSourceId) -> Result<()> {
        if matches!(self.node(parent)?.kind, NodeKind::Leaf(_)) {
            return Err(CollectionError::invalid_composition(
                "a leaf data source cannot have children",
            ));
        }
        if self.node(child)?.parent.is_some() {
            return Err(CollectionError::invalid_composition(
                "the data source already has a parent",
            ));
        }
        if self.root == Some(child) {
            return Err(CollectionError::invalid_composition(
                "the root data source cannot become a child",
            ));
        }
        if self.ancestors_inclusive(parent).contains(&child) {
            return Err(CollectionError::invalid_composition(
                "adding the data source would create a cycle",
            ));
        }
        Ok(())
    }

    /// Detach `child` from `parent`. The child keeps its content and can be
    /// added elsewhere.
    pub fn remove_data_source(&mut self, parent: DataSourceId, child: DataSourceId) -> Result<()> {
        if self.parent(child) != Some(parent) {
            return Err(CollectionError::invalid_composition(
                "the data source is not a child of this parent",
            ));
        }

        self.begin_update();
        let removed_range = self
            .child_base(parent, child)
            .map(|base| base..base + self.number_of_sections_of(child));
        if self.is_active(child) {
            self.will_resign_active(child);
        }

        let mut newly_selected = None;
        match &mut self.node_mut(parent)?.kind {
            NodeKind::Composed { mappings } => {
                mappings.retain(|mapping| mapping.data_source() != child);
            }
            NodeKind::Segmented {
                children, selected, ..
            } => {
                if let Some(index) = children.iter().position(|c| *c == child) {
                    children.remove(index);
                    *selected = match *selected {
                        Some(current) if current == index => {
                            let next = (!children.is_empty()).then_some(0);
                            newly_selected = next.map(|i| children[i]);
                            next
                        }
                        Some(current) if current > index => Some(current - 1),
                        other => other,
                    };
                }
            }
            NodeKind::Leaf(_) => {}
        }
        self.node_mut(child)?.parent = None;
        self.rebuild_mappings(parent);
        tracing::debug!(target: targets::DATA_SOURCE, ?parent, ?child, "data source removed");

        let mut events = Vec::new();
        if let Some(range) = removed_range {
            events.push(ChangeEvent::SectionsRemoved {
                sections: range.collect(),
                direction: SectionDirection::None,
            });
        }
        if let Some(selected) = newly_selected {
            let count = self.number_of_sections_of(selected);
            events.push(ChangeEvent::SectionsInserted {
                sections: (0..count).collect::<BTreeSet<_>>(),
                direction: SectionDirection::None,
            });
            if self.is_active(parent) {
                self.activate(selected);
            }
        }
        self.dispatch(parent, events);
        self.refresh_aggregate(parent);
        self.end_update();
        if self.update_depth == 0 {
            self.process_load_completions();
        }
        Ok(())
    }

    /// Detach every child of `parent`.
    pub fn remove_all_data_sources(&mut self, parent: DataSourceId) -> Result<()> {
        self.begin_update();
        let result = self
            .children_of(parent)
            .into_iter()
            .try_for_each(|child| self.remove_data_source(parent, child));
        self.end_update();
        result
    }

    /// Children of a composed or segmented data source, in order.
    pub fn data_sources(&self, parent: DataSourceId) -> Vec<DataSourceId> {
        self.children_of(parent)
    }

    /// Resolve a path in `parent`'s space to the child owning it and the
    /// path in that child's space.
    pub fn local_index_path_for_global(
        &self,
        parent: DataSourceId,
        path: IndexPath,
    ) -> Option<(DataSourceId, IndexPath)> {
        let section = path.section_index()?;
        match &self.nodes.get(parent)?.kind {
            NodeKind::Composed { mappings } => mappings.iter().find_map(|mapping| {
                mapping
                    .local_index_path(path)
                    .map(|local| (mapping.data_source(), local))
            }),
            NodeKind::Segmented { .. } => {
                let child = self.selected_data_source(parent)?;
                (section < self.number_of_sections_of(child)).then_some((child, path))
            }
            NodeKind::Leaf(_) => None,
        }
    }

    /// The section of `parent`'s space showing `child`'s local `section`.
    pub fn global_section_for(&self, parent: DataSourceId, child: DataSourceId, section: usize) -> Option<usize> {
        if section >= self.number_of_sections_of(child) {
            return None;
        }
        self.child_base(parent, child).map(|base| base + section)
    }

    /// The section mapping a composed parent keeps for `child`.
    pub fn mapping_for(&self, parent: DataSourceId, child: DataSourceId) -> Option<&SectionMapping> {
        match &self.nodes.get(parent)?.kind {
            NodeKind::Composed { mappings } => mappings.iter().find(|m| m.data_source() == child),
            _ => None,
        }
    }
}
