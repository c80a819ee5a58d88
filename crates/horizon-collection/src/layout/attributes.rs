//! Layout attributes handed to the host view.

use super::info::{LayoutCell, LayoutDecoration, LayoutPlaceholder, LayoutSection, LayoutSupplement};
use super::z_index;
use crate::geometry::{Color, EdgeInsets, Rect};
use crate::index_path::IndexPath;
use crate::metrics::ElementKind;

/// What kind of view an attribute record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementCategory {
    Cell,
    Supplementary,
    Decoration,
}

/// Position and appearance of one element.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutAttributes {
    pub category: ElementCategory,
    /// `None` for cells.
    pub kind: Option<ElementKind>,
    pub index_path: IndexPath,
    pub frame: Rect,
    pub z_index: i32,
    pub hidden: bool,
    pub is_pinned: bool,
    /// Frame origin before pinning. Equal to `frame.origin.y` when unpinned.
    pub unpinned_y: f32,
    pub column_index: Option<usize>,
    pub background_color: Option<Color>,
    pub selected_background_color: Option<Color>,
    pub separator_color: Option<Color>,
    pub layout_margins: EdgeInsets,
    /// Set on the cell being dragged and on its floating copy.
    pub is_dragging: bool,
}

impl LayoutAttributes {
    fn new(category: ElementCategory, kind: Option<ElementKind>, index_path: IndexPath, frame: Rect) -> Self {
        Self {
            category,
            kind,
            index_path,
            frame,
            z_index: z_index::DEFAULT,
            hidden: false,
            is_pinned: false,
            unpinned_y: frame.origin.y,
            column_index: None,
            background_color: None,
            selected_background_color: None,
            separator_color: None,
            layout_margins: EdgeInsets::ZERO,
            is_dragging: false,
        }
    }

    pub(crate) fn for_cell(cell: &LayoutCell, section: &LayoutSection) -> Self {
        let metrics = &section.metrics;
        Self {
            column_index: Some(cell.column),
            background_color: metrics.background_color,
            selected_background_color: metrics.selected_background_color,
            separator_color: Some(metrics.separator_color),
            layout_margins: metrics.layout_margins,
            ..Self::new(ElementCategory::Cell, None, cell.index_path, cell.frame)
        }
    }

    pub(crate) fn for_supplement(supplement: &LayoutSupplement) -> Self {
        let item = &supplement.item;
        let (background_color, separator_color) = if supplement.is_pinned {
            (
                item.pinned_background_color.or(item.background_color),
                item.pinned_separator_color.or(item.separator_color),
            )
        } else {
            (item.background_color, item.separator_color)
        };
        Self {
            z_index: supplement.z_index,
            hidden: item.hidden,
            is_pinned: supplement.is_pinned,
            unpinned_y: supplement.unpinned_y,
            background_color,
            selected_background_color: item.selected_background_color,
            separator_color: separator_color.filter(|_| item.shows_separator),
            layout_margins: item.layout_margins,
            ..Self::new(
                ElementCategory::Supplementary,
                Some(supplement.kind.clone()),
                supplement.index_path,
                supplement.frame,
            )
        }
    }

    pub(crate) fn for_placeholder(placeholder: &LayoutPlaceholder, section: &LayoutSection) -> Self {
        Self {
            background_color: section.metrics.background_color,
            layout_margins: section.metrics.layout_margins,
            ..Self::new(
                ElementCategory::Supplementary,
                Some(ElementKind::Placeholder),
                placeholder.index_path,
                placeholder.frame,
            )
        }
    }

    pub(crate) fn for_decoration(decoration: &LayoutDecoration) -> Self {
        Self {
            z_index: decoration.z_index,
            background_color: decoration.color,
            ..Self::new(
                ElementCategory::Decoration,
                Some(decoration.kind.clone()),
                decoration.index_path,
                decoration.frame,
            )
        }
    }

    pub fn is_cell(&self) -> bool {
        self.category == ElementCategory::Cell
    }

    /// Host-facing element kind string; `"cell"` for cells.
    pub fn kind_str(&self) -> &str {
        self.kind.as_ref().map_or("cell", ElementKind::as_str)
    }
}
