//! Translation between a child's local section space and its parent's space.
//!
//! A composed data source keeps one [`SectionMapping`] per child. The mapping
//! is a bijection between `[0, n)` in the child and `[base, base + n)` in the
//! parent, stored as a pair of lookup tables. Mappings are rebuilt whenever
//! the composition or a child's section count changes; translated paths must
//! not be cached across such a change.

use std::collections::BTreeMap;

use horizon_collection_core::logging::targets;

use crate::data_source::DataSourceId;
use crate::index_path::{IndexPath, Section};

/// Local/global section tables for one child data source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionMapping {
    data_source: DataSourceId,
    /// Global section for each local section.
    local_to_global: Vec<usize>,
    /// Local section for each global section the child owns.
    global_to_local: BTreeMap<usize, usize>,
}

impl SectionMapping {
    /// Create an empty mapping for `data_source`.
    pub fn new(data_source: DataSourceId) -> Self {
        Self {
            data_source,
            local_to_global: Vec::new(),
            global_to_local: BTreeMap::new(),
        }
    }

    /// The child this mapping translates for.
    #[inline]
    pub fn data_source(&self) -> DataSourceId {
        self.data_source
    }

    /// Number of sections covered.
    #[inline]
    pub fn number_of_sections(&self) -> usize {
        self.local_to_global.len()
    }

    /// First global section covered, or `None` when the child is empty.
    pub fn global_base(&self) -> Option<usize> {
        self.local_to_global.first().copied()
    }

    /// Whether the global `section` belongs to this child.
    #[inline]
    pub fn covers(&self, section: usize) -> bool {
        self.global_to_local.contains_key(&section)
    }

    /// Local section to global section.
    #[inline]
    pub fn global_section(&self, local: usize) -> Option<usize> {
        self.local_to_global.get(local).copied()
    }

    /// Global section to local section.
    #[inline]
    pub fn local_section(&self, global: usize) -> Option<usize> {
        self.global_to_local.get(&global).copied()
    }

    /// Translate a local index path; the item index is preserved.
    ///
    /// The global section never maps through a child.
    pub fn global_index_path(&self, local: IndexPath) -> Option<IndexPath> {
        let section = local.section_index()?;
        self.global_section(section)
            .map(|global| local.with_section(Section::Index(global)))
    }

    /// Translate a global index path into the child's space.
    pub fn local_index_path(&self, global: IndexPath) -> Option<IndexPath> {
        let section = global.section_index()?;
        self.local_section(section)
            .map(|local| global.with_section(Section::Index(local)))
    }

    /// Translate many local paths, dropping any that fall outside the mapping.
    pub fn global_index_paths(&self, local: &[IndexPath]) -> Vec<IndexPath> {
        local
            .iter()
            .filter_map(|path| self.global_index_path(*path))
            .collect()
    }

    /// Translate many global paths into local space.
    pub fn local_index_paths(&self, global: &[IndexPath]) -> Vec<IndexPath> {
        global
            .iter()
            .filter_map(|path| self.local_index_path(*path))
            .collect()
    }

    /// Assign `[global_base, global_base + number_of_sections)` to this child.
    ///
    /// `each_section` is called once per global section in ascending order.
    /// Returns the first global section after this child.
    pub fn update_mapping_starting_at<F>(
        &mut self,
        global_base: usize,
        number_of_sections: usize,
        mut each_section: F,
    ) -> usize
    where
        F: FnMut(usize),
    {
        self.local_to_global.clear();
        self.global_to_local.clear();

        for local in 0..number_of_sections {
            let global = global_base + local;
            self.local_to_global.push(global);
            self.global_to_local.insert(global, local);
            each_section(global);
        }

        tracing::trace!(
            target: targets::MAPPING,
            data_source = ?self.data_source,
            global_base,
            number_of_sections,
            "mapping updated"
        );
        global_base + number_of_sections
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn mapping_at(base: usize, count: usize) -> SectionMapping {
        let mut ids: SlotMap<DataSourceId, ()> = SlotMap::with_key();
        let mut mapping = SectionMapping::new(ids.insert(()));
        mapping.update_mapping_starting_at(base, count, |_| {});
        mapping
    }

    #[test]
    fn test_round_trip() {
        let mapping = mapping_at(3, 2);
        for local in 0..2 {
            let global = mapping.global_section(local).unwrap();
            assert_eq!(global, 3 + local);
            assert_eq!(mapping.local_section(global), Some(local));
        }
        assert_eq!(mapping.local_section(2), None);
        assert_eq!(mapping.local_section(5), None);
        assert_eq!(mapping.global_section(2), None);
    }

    #[test]
    fn test_index_paths_keep_item() {
        let mapping = mapping_at(3, 2);
        assert_eq!(
            mapping.global_index_path(IndexPath::new(1, 7)),
            Some(IndexPath::new(4, 7))
        );
        assert_eq!(
            mapping.local_index_path(IndexPath::new(3, 2)),
            Some(IndexPath::new(0, 2))
        );
        assert_eq!(mapping.global_index_path(IndexPath::global(0)), None);
        assert_eq!(
            mapping.global_index_paths(&[IndexPath::new(0, 0), IndexPath::new(9, 0)]),
            vec![IndexPath::new(3, 0)]
        );
    }

    #[test]
    fn test_update_reports_sections_and_next_base() {
        let mut ids: SlotMap<DataSourceId, ()> = SlotMap::with_key();
        let mut mapping = SectionMapping::new(ids.insert(()));
        let mut seen = Vec::new();
        let next = mapping.update_mapping_starting_at(4, 3, |section| seen.push(section));

        assert_eq!(next, 7);
        assert_eq!(seen, vec![4, 5, 6]);
        assert_eq!(mapping.global_base(), Some(4));

        let next = mapping.update_mapping_starting_at(0, 0, |_| {});
        assert_eq!(next, 0);
        assert_eq!(mapping.global_base(), None);
        assert!(!mapping.covers(4));
    }
}
