//! Result of a layout pass.
//!
//! Frames are in content coordinates. Supplements remember the y they were
//! laid out at (`unpinned_y`) so pinning can be recomputed for any offset
//! without another pass.

use std::ops::Range;

use super::{z_index, InvalidationContext};
use crate::geometry::{Color, Rect, Size};
use crate::index_path::{IndexPath, Section};
use crate::metrics::{ElementKind, ResolvedSectionMetrics, SupplementaryItem};
use crate::placeholder::Placeholder;

/// A laid-out cell.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutCell {
    pub index_path: IndexPath,
    pub frame: Rect,
    pub column: usize,
    /// Height the cell asked for; the row is as tall as its tallest cell.
    pub measured_height: f32,
}

/// A row of cells sharing one height.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutRow {
    pub frame: Rect,
    pub cells: Vec<LayoutCell>,
}

/// A laid-out header or footer.
#[derive(Debug, Clone)]
pub struct LayoutSupplement {
    pub kind: ElementKind,
    /// `item` is the index among the section's supplements of this kind.
    pub index_path: IndexPath,
    pub frame: Rect,
    /// The y assigned by the layout pass, before pinning.
    pub unpinned_y: f32,
    pub is_pinned: bool,
    pub z_index: i32,
    pub item: SupplementaryItem,
}

impl LayoutSupplement {
    pub fn should_pin(&self) -> bool {
        self.item.should_pin && self.kind == ElementKind::Header
    }
}

/// A separator or background decoration.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutDecoration {
    pub kind: ElementKind,
    pub index_path: IndexPath,
    pub frame: Rect,
    pub z_index: i32,
    pub color: Option<Color>,
}

/// A placeholder region, recorded on the first section it covers.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutPlaceholder {
    pub index_path: IndexPath,
    pub frame: Rect,
    /// Global sections the placeholder stands in for.
    pub sections: Range<usize>,
    pub placeholder: Placeholder,
}

/// Everything laid out for one section.
#[derive(Debug, Clone)]
pub struct LayoutSection {
    pub section: Section,
    pub frame: Rect,
    /// Area below the headers and above the footers.
    pub background_frame: Rect,
    pub headers: Vec<LayoutSupplement>,
    pub footers: Vec<LayoutSupplement>,
    pub rows: Vec<LayoutRow>,
    pub decorations: Vec<LayoutDecoration>,
    pub placeholder: Option<LayoutPlaceholder>,
    pub metrics: ResolvedSectionMetrics,
}

impl LayoutSection {
    pub fn number_of_items(&self) -> usize {
        self.rows.iter().map(|row| row.cells.len()).sum()
    }

    pub fn cell(&self, item: usize) -> Option<&LayoutCell> {
        self.rows
            .iter()
            .flat_map(|row| row.cells.iter())
            .find(|cell| cell.index_path.item == item)
    }

    pub fn supplements(&self) -> impl Iterator<Item = &LayoutSupplement> {
        self.headers.iter().chain(self.footers.iter())
    }

    pub fn pinnable_headers(&self) -> impl Iterator<Item = &LayoutSupplement> {
        self.headers.iter().filter(|header| header.should_pin())
    }

    /// The background record of a numbered section, if it has any content
    /// area to fill.
    pub fn background(&self) -> Option<LayoutDecoration> {
        let Section::Index(index) = self.section else {
            return None;
        };
        (self.background_frame.height() > 0.0).then(|| LayoutDecoration {
            kind: ElementKind::SectionBackground,
            index_path: IndexPath::new(index, 0),
            frame: self.background_frame,
            z_index: z_index::BACKGROUND,
            color: self.metrics.background_color,
        })
    }
}

/// All sections of one layout pass.
#[derive(Debug, Clone, Default)]
pub struct LayoutInfo {
    pub content_size: Size,
    pub viewport_size: Size,
    pub global: Option<LayoutSection>,
    pub sections: Vec<LayoutSection>,
    /// Background behind the pinned global headers.
    pub global_header_background: Option<LayoutDecoration>,
}

impl LayoutInfo {
    pub fn is_empty(&self) -> bool {
        self.global.is_none() && self.sections.is_empty()
    }

    pub fn section(&self, section: Section) -> Option<&LayoutSection> {
        match section {
            Section::Global => self.global.as_ref(),
            Section::Index(index) => self.sections.get(index),
        }
    }

    pub fn all_sections(&self) -> impl Iterator<Item = &LayoutSection> {
        self.global.iter().chain(self.sections.iter())
    }

    pub(crate) fn all_sections_mut(&mut self) -> impl Iterator<Item = &mut LayoutSection> {
        self.global.iter_mut().chain(self.sections.iter_mut())
    }

    /// Move every record at or below `threshold` down by `delta`, grow the
    /// section spanning `threshold`, and record what moved in `context`.
    pub(crate) fn shift_below(&mut self, threshold: f32, delta: f32, context: &mut InvalidationContext) {
        if delta == 0.0 {
            return;
        }
        for section in self.all_sections_mut() {
            if section.frame.top() >= threshold {
                section.frame = section.frame.offset(0.0, delta);
                section.background_frame = section.background_frame.offset(0.0, delta);
            } else if section.frame.bottom() >= threshold {
                section.frame.size.height += delta;
                if section.background_frame.bottom() >= threshold {
                    section.background_frame.size.height += delta;
                }
            }

            for row in &mut section.rows {
                if row.frame.top() >= threshold {
                    row.frame = row.frame.offset(0.0, delta);
                    for cell in &mut row.cells {
                        cell.frame = cell.frame.offset(0.0, delta);
                        context.invalidate_item(cell.index_path);
                    }
                }
            }
            for supplement in section.headers.iter_mut().chain(section.footers.iter_mut()) {
                if supplement.unpinned_y >= threshold {
                    supplement.unpinned_y += delta;
                    supplement.frame = supplement.frame.offset(0.0, delta);
                    context.invalidate_supplement(supplement.kind.clone(), supplement.index_path);
                }
            }
            for decoration in &mut section.decorations {
                if decoration.frame.top() >= threshold {
                    decoration.frame = decoration.frame.offset(0.0, delta);
                    context.invalidate_decoration(decoration.kind.clone(), decoration.index_path);
                }
            }
            if let Some(placeholder) = &mut section.placeholder {
                if placeholder.frame.top() >= threshold {
                    placeholder.frame = placeholder.frame.offset(0.0, delta);
                    context.invalidate_supplement(ElementKind::Placeholder, placeholder.index_path);
                }
            }
        }
        self.content_size.height += delta;
        context.content_size_adjustment += delta;
    }
}
