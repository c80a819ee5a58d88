//! Grid layout engine.
//!
//! This module provides:
//!
//! - [`GridLayout`]: computes frames for every cell, header, footer,
//!   placeholder and separator from a [`LayoutSnapshot`]
//! - [`LayoutInfo`]: the per-section result of a layout pass
//! - [`LayoutAttributes`]: the flat records handed to the host view
//! - [`InvalidationContext`] / [`Invalidator`]: what must be recomputed
//!
//! # Layout Algorithm
//!
//! A pass is single-threaded and deterministic:
//!
//! 1. The global section's headers and footers go at the top.
//! 2. Each section stacks its headers, then either a placeholder or its rows
//!    of cells (padding applied), then its footers and separators.
//! 3. Pinnable headers are repositioned for the current content offset.
//!
//! Offset changes only repeat step 3. Self-sizing updates shift every later
//! record instead of re-running the pass.
//!
//! # Example
//!
//! ```
//! use horizon_collection::layout::{EstimatedSizes, GridLayout};
//! use horizon_collection::{BasicDataSource, DataSourceTree, IndexPath, LayoutConfig, Size};
//!
//! let mut tree = DataSourceTree::default();
//! let leaf = tree.add_leaf(BasicDataSource::new(vec![1, 2, 3]));
//! tree.set_root(leaf).unwrap();
//!
//! let mut layout = GridLayout::new(LayoutConfig::default());
//! layout.prepare(&tree.layout_snapshot(), Size::new(320.0, 480.0), &mut EstimatedSizes);
//!
//! let cell = layout.layout_attributes_for_item(IndexPath::new(0, 2)).unwrap();
//! assert_eq!(cell.frame.origin.y, 88.0);
//! assert_eq!(layout.content_size(), Size::new(320.0, 132.0));
//! ```

mod attributes;
mod grid;
mod info;
mod invalidation;

pub use attributes::{ElementCategory, LayoutAttributes};
pub use grid::{GridLayout, ReorderDelegate};
pub use info::{
    LayoutCell, LayoutDecoration, LayoutInfo, LayoutPlaceholder, LayoutRow, LayoutSection,
    LayoutSupplement,
};
pub use invalidation::{InvalidationContext, Invalidator, SuspendGuard};

use crate::geometry::{Rect, Size};
use crate::index_path::IndexPath;
use crate::metrics::{ElementKind, ResolvedSectionMetrics};
use crate::placeholder::PlaceholderRange;

/// Fixed z-order of layout elements.
pub mod z_index {
    /// Section backgrounds sit behind everything else.
    pub const BACKGROUND: i32 = 0;
    pub const DEFAULT: i32 = 1;
    pub const SEPARATOR: i32 = 100;
    pub const HEADER: i32 = 1000;
    pub const SECTION_SEPARATOR: i32 = 2000;
    pub const PINNED_HEADER: i32 = 10000;
}

/// One section as the layout sees it.
#[derive(Debug, Clone)]
pub struct SectionSnapshot {
    pub metrics: ResolvedSectionMetrics,
    /// Items to lay out; zero while a placeholder covers the section.
    pub number_of_items: usize,
    /// The placeholder covering this section, if any.
    pub placeholder: Option<PlaceholderRange>,
}

/// Everything a layout pass reads from the data sources.
#[derive(Debug, Clone, Default)]
pub struct LayoutSnapshot {
    /// Metrics of the global section, when it has headers or footers.
    pub global: Option<ResolvedSectionMetrics>,
    pub sections: Vec<SectionSnapshot>,
}

impl LayoutSnapshot {
    pub fn number_of_sections(&self) -> usize {
        self.sections.len()
    }
}

/// Host callbacks that measure self-sizing elements.
///
/// `fitting` carries the proposed origin and width; its height is the
/// estimate. Return a non-positive height to fall back to the estimate.
pub trait LayoutMeasurer {
    fn measure_cell(&mut self, path: IndexPath, fitting: Rect) -> Size;

    fn measure_supplement(&mut self, kind: &ElementKind, path: IndexPath, fitting: Rect) -> Size;
}

/// A measurer that accepts every estimate.
#[derive(Debug, Default, Clone, Copy)]
pub struct EstimatedSizes;

impl LayoutMeasurer for EstimatedSizes {
    fn measure_cell(&mut self, _path: IndexPath, fitting: Rect) -> Size {
        fitting.size
    }

    fn measure_supplement(&mut self, _kind: &ElementKind, _path: IndexPath, fitting: Rect) -> Size {
        fitting.size
    }
}

/// Current section and item counts of the data source, for
/// [`GridLayout::verify_item_counts`].
pub trait SectionCounts {
    fn number_of_sections(&self) -> usize;

    fn number_of_items_in_section(&self, section: usize) -> usize;
}
