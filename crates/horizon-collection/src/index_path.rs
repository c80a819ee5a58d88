//! Section and index-path addressing.
//!
//! An [`IndexPath`] locates an item (or a supplementary element) within a
//! sectioned data source. Index paths are always relative to a coordinate
//! space: a leaf's *local* space or the root's *global* space. Translate
//! between them with a [`SectionMapping`](crate::mapping::SectionMapping);
//! never cache a translated path across a composition change.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A section address.
///
/// The global section holds cross-section headers and footers shown above
/// section 0. It is owned by the root data source and sorts before every
/// ordinary section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Section {
    /// The root's global section (index -1 in host-facing APIs).
    Global,
    /// An ordinary section.
    Index(usize),
}

impl Section {
    /// The ordinary section index, if this is not the global section.
    #[inline]
    pub fn index(self) -> Option<usize> {
        match self {
            Section::Global => None,
            Section::Index(index) => Some(index),
        }
    }

    /// Whether this is the global section.
    #[inline]
    pub fn is_global(self) -> bool {
        matches!(self, Section::Global)
    }

    /// The signed representation used by host views, where -1 is global.
    pub fn to_raw(self) -> isize {
        match self {
            Section::Global => -1,
            Section::Index(index) => index as isize,
        }
    }

    /// Parse the signed host representation. Negative values other than -1
    /// are rejected.
    pub fn from_raw(raw: isize) -> Option<Self> {
        match raw {
            -1 => Some(Section::Global),
            raw if raw >= 0 => Some(Section::Index(raw as usize)),
            _ => None,
        }
    }
}

impl From<usize> for Section {
    fn from(index: usize) -> Self {
        Section::Index(index)
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Section::Global => write!(f, "global"),
            Section::Index(index) => write!(f, "{index}"),
        }
    }
}

/// A `(section, item)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IndexPath {
    /// The section.
    pub section: Section,
    /// The item (or supplementary element) index within the section.
    pub item: usize,
}

impl IndexPath {
    /// Create an index path in an ordinary section.
    #[inline]
    pub const fn new(section: usize, item: usize) -> Self {
        Self {
            section: Section::Index(section),
            item,
        }
    }

    /// Create an index path in the global section.
    #[inline]
    pub const fn global(item: usize) -> Self {
        Self {
            section: Section::Global,
            item,
        }
    }

    /// Create an index path in any section.
    #[inline]
    pub const fn in_section(section: Section, item: usize) -> Self {
        Self { section, item }
    }

    /// The ordinary section index, or `None` for global paths.
    #[inline]
    pub fn section_index(&self) -> Option<usize> {
        self.section.index()
    }

    /// The same item position in a different section.
    #[inline]
    pub fn with_section(&self, section: Section) -> Self {
        Self {
            section,
            item: self.item,
        }
    }
}

impl fmt::Display for IndexPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.section, self.item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_sorts_first() {
        let mut sections = vec![Section::Index(1), Section::Global, Section::Index(0)];
        sections.sort();
        assert_eq!(
            sections,
            vec![Section::Global, Section::Index(0), Section::Index(1)]
        );
    }

    #[test]
    fn test_raw_round_trip() {
        assert_eq!(Section::from_raw(-1), Some(Section::Global));
        assert_eq!(Section::from_raw(3), Some(Section::Index(3)));
        assert_eq!(Section::from_raw(-2), None);
        assert_eq!(Section::Index(4).to_raw(), 4);
    }

    #[test]
    fn test_index_path_display() {
        assert_eq!(IndexPath::new(2, 5).to_string(), "[2, 5]");
        assert_eq!(IndexPath::global(0).to_string(), "[global, 0]");
        assert_eq!(IndexPath::new(1, 3).with_section(Section::Index(7)), IndexPath::new(7, 3));
    }
}
