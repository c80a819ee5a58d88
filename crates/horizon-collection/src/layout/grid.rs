//! The grid layout pass, pinning, self-sizing and drag-to-reorder.

use horizon_collection_core::logging::{span_names, targets};
use horizon_collection_core::{CollectionError, PerfSpan, Result};

use super::attributes::LayoutAttributes;
use super::info::{
    LayoutCell, LayoutDecoration, LayoutInfo, LayoutPlaceholder, LayoutRow, LayoutSection,
    LayoutSupplement,
};
use super::{
    z_index, InvalidationContext, LayoutMeasurer, LayoutSnapshot, SectionCounts, SectionSnapshot,
};
use crate::data_source::DataSourceTree;
use crate::environment::LayoutConfig;
use crate::geometry::{Point, Rect, Size};
use crate::index_path::{IndexPath, Section};
use crate::metrics::{
    CellLayoutOrder, ElementKind, ResolvedSectionMetrics, RowHeight, SupplementaryHeight,
    SupplementaryItem,
};
use crate::placeholder::PlaceholderRange;

/// What the layout asks of the data source while the user drags a cell.
pub trait ReorderDelegate {
    fn can_move_item(&self, path: IndexPath) -> bool;

    fn can_move_item_to(&self, from: IndexPath, to: IndexPath) -> bool;

    /// Commit the move. Returns whether the item moved.
    fn move_item(&mut self, from: IndexPath, to: IndexPath) -> bool;
}

#[derive(Debug, Clone, Copy)]
struct DragState {
    original: IndexPath,
    /// The slot reserved for the dragged item.
    phantom: IndexPath,
    frame: Rect,
    translation: Point,
}

impl DragState {
    /// The slot `item` of the dragged section occupies while the dragged
    /// item sits at the phantom slot. Items between the two shift by one.
    fn slot_of(&self, item: usize) -> usize {
        let (from, to) = (self.original.item, self.phantom.item);
        if item == from {
            to
        } else if from < to && (from + 1..=to).contains(&item) {
            item - 1
        } else if to < from && (to..from).contains(&item) {
            item + 1
        } else {
            item
        }
    }
}

/// Computes and caches the frames of every element of a sectioned grid.
///
/// Call [`prepare`](Self::prepare) whenever an [`InvalidationContext`]
/// requires a full pass; scrolling only needs
/// [`set_content_offset`](Self::set_content_offset).
#[derive(Debug, Clone)]
pub struct GridLayout {
    config: LayoutConfig,
    info: LayoutInfo,
    content_offset: f32,
    needs_full_pass: bool,
    drag: Option<DragState>,
}

impl Default for GridLayout {
    fn default() -> Self {
        Self::new(LayoutConfig::default())
    }
}

impl GridLayout {
    pub fn new(config: LayoutConfig) -> Self {
        Self {
            config,
            info: LayoutInfo::default(),
            content_offset: 0.0,
            needs_full_pass: true,
            drag: None,
        }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn info(&self) -> &LayoutInfo {
        &self.info
    }

    /// Whether [`prepare`](Self::prepare) must run before the attributes
    /// can be trusted.
    pub fn needs_full_pass(&self) -> bool {
        self.needs_full_pass
    }

    pub fn content_size(&self) -> Size {
        self.info.content_size
    }

    pub fn content_offset(&self) -> f32 {
        self.content_offset
    }

    // =========================================================================
    // Layout pass
    // =========================================================================

    /// Lay out every section of `snapshot` for a viewport of `viewport`.
    pub fn prepare(&mut self, snapshot: &LayoutSnapshot, viewport: Size, measurer: &mut dyn LayoutMeasurer) {
        let _span = PerfSpan::new(span_names::LAYOUT_PASS);
        let mut pass = Pass {
            config: &self.config,
            width: viewport.width.max(0.0),
            viewport_height: viewport.height,
            y: 0.0,
            remainder_used: false,
            measurer,
        };

        let global = snapshot.global.as_ref().map(|metrics| pass.global_section(metrics));
        let last = snapshot.sections.len().saturating_sub(1);
        let sections = snapshot
            .sections
            .iter()
            .enumerate()
            .map(|(index, section)| pass.section(index, section, index == last))
            .collect::<Vec<_>>();

        self.info = LayoutInfo {
            content_size: Size::new(pass.width, pass.y),
            viewport_size: viewport,
            global,
            sections,
            global_header_background: None,
        };
        self.needs_full_pass = false;
        self.update_pinning();
        tracing::debug!(
            target: targets::LAYOUT,
            sections = self.info.sections.len(),
            height = self.info.content_size.height,
            "layout pass complete"
        );
    }

    /// Record what the host invalidated. Metrics changes schedule a full
    /// pass; origin changes recompute pinning at once.
    pub fn invalidate_layout(&mut self, context: &InvalidationContext) {
        if context.requires_full_pass() {
            self.needs_full_pass = true;
        } else if context.invalidate_layout_origin {
            self.update_pinning();
        }
    }

    /// Scroll to vertical `offset`. Returns the headers whose position
    /// changed.
    pub fn set_content_offset(&mut self, offset: f32) -> InvalidationContext {
        self.content_offset = offset;
        self.update_pinning()
    }

    /// Check the laid-out item counts against `source`.
    ///
    /// On a mismatch the layout is discarded and the host must reload.
    pub fn verify_item_counts(&mut self, source: &dyn SectionCounts) -> Result<()> {
        let sections = source.number_of_sections();
        let mismatch = if sections != self.info.sections.len() {
            Some(format!(
                "layout has {} sections, data source has {sections}",
                self.info.sections.len()
            ))
        } else {
            self.info.sections.iter().enumerate().find_map(|(index, section)| {
                let laid_out = section.number_of_items();
                let actual = source.number_of_items_in_section(index);
                (laid_out != actual).then(|| {
                    format!("section {index}: layout has {laid_out} items, data source has {actual}")
                })
            })
        };

        match mismatch {
            None => Ok(()),
            Some(message) => {
                tracing::warn!(target: targets::LAYOUT, %message, "layout aborted");
                self.info = LayoutInfo::default();
                self.needs_full_pass = true;
                self.drag = None;
                Err(CollectionError::inconsistent_layout(message))
            }
        }
    }

    // =========================================================================
    // Pinning
    // =========================================================================

    fn update_pinning(&mut self) -> InvalidationContext {
        let _span = PerfSpan::new(span_names::PINNING);
        let mut context = InvalidationContext::origin();
        let line = self.config.top_inset + self.content_offset;
        let width = self.info.content_size.width;

        let mut section_line = line;
        let mut background = None;
        if let Some(global) = &mut self.info.global {
            let mut cursor = line;
            let mut extent: Option<Rect> = None;
            for header in global.headers.iter_mut().filter(|header| header.should_pin()) {
                let y = header.unpinned_y.max(cursor);
                cursor = y + header.frame.height();
                place_header(header, y, &mut context);
                extent = Some(extent.map_or(header.frame, |rect| rect.union(&header.frame)));
                if background.is_none() {
                    background = Some(header.item.pinned_background_color.or(header.item.background_color));
                }
            }
            section_line = cursor;
            let decoration = extent.map(|extent| LayoutDecoration {
                kind: ElementKind::GlobalHeaderBackground,
                index_path: IndexPath::global(0),
                frame: Rect::new(0.0, extent.top(), width, extent.height()),
                z_index: z_index::PINNED_HEADER - 1,
                color: background.flatten(),
            });
            if decoration != self.info.global_header_background {
                context.invalidate_decoration(ElementKind::GlobalHeaderBackground, IndexPath::global(0));
            }
            self.info.global_header_background = decoration;
        }

        for section in &mut self.info.sections {
            let pinnable_height: f32 = section
                .pinnable_headers()
                .map(|header| header.frame.height())
                .sum();
            let resident = section.frame.top() <= section_line && section_line < section.frame.bottom();
            let mut cursor = section_line.min(section.frame.bottom() - pinnable_height);
            for header in section.headers.iter_mut().filter(|header| header.should_pin()) {
                if resident {
                    let y = header.unpinned_y.max(cursor);
                    cursor = y + header.frame.height();
                    place_header(header, y, &mut context);
                } else {
                    let y = header.unpinned_y;
                    place_header(header, y, &mut context);
                }
            }
        }
        context
    }

    // =========================================================================
    // Self-sizing
    // =========================================================================

    /// Apply the measured size of a cell in a variable-height row. Every
    /// later element moves by the change in row height.
    pub fn set_size_for_item(&mut self, path: IndexPath, size: Size) -> InvalidationContext {
        let mut context = InvalidationContext::new();
        let Some(section) = path.section_index().and_then(|index| self.info.sections.get_mut(index)) else {
            return context;
        };
        if section.metrics.row_height != RowHeight::Variable {
            return context;
        }
        let Some(row) = section
            .rows
            .iter_mut()
            .find(|row| row.cells.iter().any(|cell| cell.index_path == path))
        else {
            return context;
        };
        let Some(height) = valid_height(size.height) else {
            let error = CollectionError::measurement_failure("cell", size.height, row.frame.height());
            tracing::warn!(target: targets::LAYOUT, %error, ?path, "ignoring self-sizing update");
            return context;
        };

        let old_height = row.frame.height();
        let row_top = row.frame.top();
        for cell in &mut row.cells {
            if cell.index_path == path {
                cell.measured_height = height;
            }
        }
        let new_height = row
            .cells
            .iter()
            .map(|cell| cell.measured_height)
            .fold(0.0_f32, f32::max);
        if new_height == old_height {
            context.invalidate_item(path);
            return context;
        }

        row.frame.size.height = new_height;
        for cell in &mut row.cells {
            cell.frame.size.height = new_height;
            context.invalidate_item(cell.index_path);
        }
        for decoration in &mut section.decorations {
            if decoration.kind == ElementKind::ColumnSeparator && decoration.frame.top() == row_top {
                decoration.frame.size.height = new_height;
                context.invalidate_decoration(decoration.kind.clone(), decoration.index_path);
            }
        }

        self.info
            .shift_below(row_top + old_height, new_height - old_height, &mut context);
        context.merge(self.update_pinning());
        context
    }

    /// Apply the measured height of an estimated-height header or footer.
    pub fn set_size_for_supplementary(&mut self, kind: &ElementKind, path: IndexPath, size: Size) -> InvalidationContext {
        let mut context = InvalidationContext::new();
        let Some(section) = self.info.all_sections_mut().find(|section| section.section == path.section) else {
            return context;
        };
        let Some(supplement) = section
            .headers
            .iter_mut()
            .chain(section.footers.iter_mut())
            .find(|supplement| supplement.kind == *kind && supplement.index_path == path)
        else {
            return context;
        };
        if !supplement.item.height.needs_measurement() {
            return context;
        }
        let Some(height) = valid_height(size.height) else {
            let error = CollectionError::measurement_failure(kind.as_str(), size.height, supplement.frame.height());
            tracing::warn!(target: targets::LAYOUT, %error, ?path, "ignoring self-sizing update");
            return context;
        };

        let old_height = supplement.frame.height();
        let top = supplement.unpinned_y;
        supplement.frame.size.height = height;
        context.invalidate_supplement(kind.clone(), path);
        self.info.shift_below(top + old_height, height - old_height, &mut context);
        context.merge(self.update_pinning());
        context
    }

    // =========================================================================
    // Attribute queries
    // =========================================================================

    /// Every element whose frame intersects `rect`.
    pub fn layout_attributes_in_rect(&self, rect: Rect) -> Vec<LayoutAttributes> {
        let mut attributes = Vec::new();
        for section in self.info.all_sections() {
            for supplement in section.supplements() {
                if supplement.frame.intersects(&rect) {
                    attributes.push(LayoutAttributes::for_supplement(supplement));
                }
            }
            if !section.frame.intersects(&rect) {
                continue;
            }
            if let Some(background) = section.background().filter(|b| b.frame.intersects(&rect)) {
                attributes.push(LayoutAttributes::for_decoration(&background));
            }
            if let Some(placeholder) = &section.placeholder {
                if placeholder.frame.intersects(&rect) {
                    attributes.push(LayoutAttributes::for_placeholder(placeholder, section));
                }
            }
            // Cells of the dragged section may be displayed in another row.
            let dragging_here = self.drag.is_some_and(|drag| drag.original.section == section.section);
            for row in section
                .rows
                .iter()
                .filter(|row| dragging_here || row.frame.intersects(&rect))
            {
                for cell in &row.cells {
                    let cell = self.cell_attributes(cell, section);
                    if cell.frame.intersects(&rect) {
                        attributes.push(cell);
                    }
                }
            }
            for decoration in section.decorations.iter().filter(|d| d.frame.intersects(&rect)) {
                attributes.push(LayoutAttributes::for_decoration(decoration));
            }
        }
        if let Some(background) = &self.info.global_header_background {
            if background.frame.intersects(&rect) {
                attributes.push(LayoutAttributes::for_decoration(background));
            }
        }
        attributes
    }

    pub fn layout_attributes_for_item(&self, path: IndexPath) -> Option<LayoutAttributes> {
        let section = self.info.section(path.section)?;
        let cell = section.cell(path.item)?;
        Some(self.cell_attributes(cell, section))
    }

    pub fn layout_attributes_for_supplementary(&self, kind: &ElementKind, path: IndexPath) -> Option<LayoutAttributes> {
        let section = self.info.section(path.section)?;
        if *kind == ElementKind::Placeholder {
            return section
                .placeholder
                .as_ref()
                .filter(|placeholder| placeholder.index_path == path)
                .map(|placeholder| LayoutAttributes::for_placeholder(placeholder, section));
        }
        section
            .supplements()
            .find(|supplement| supplement.kind == *kind && supplement.index_path == path)
            .map(LayoutAttributes::for_supplement)
    }

    pub fn layout_attributes_for_decoration(&self, kind: &ElementKind, path: IndexPath) -> Option<LayoutAttributes> {
        if *kind == ElementKind::SectionBackground {
            return self
                .info
                .section(path.section)?
                .background()
                .filter(|background| background.index_path == path)
                .map(|background| LayoutAttributes::for_decoration(&background));
        }
        if *kind == ElementKind::GlobalHeaderBackground {
            return self
                .info
                .global_header_background
                .as_ref()
                .filter(|decoration| decoration.index_path == path)
                .map(LayoutAttributes::for_decoration);
        }
        self.info
            .section(path.section)?
            .decorations
            .iter()
            .find(|decoration| decoration.kind == *kind && decoration.index_path == path)
            .map(LayoutAttributes::for_decoration)
    }

    /// Attributes of `cell`, displaced into its drag slot while its section
    /// is being reordered.
    fn cell_attributes(&self, cell: &LayoutCell, section: &LayoutSection) -> LayoutAttributes {
        let mut attributes = LayoutAttributes::for_cell(cell, section);
        let Some(drag) = self.drag.filter(|drag| drag.original.section == section.section) else {
            return attributes;
        };
        let slot = drag.slot_of(cell.index_path.item);
        if let Some(target) = section.cell(slot).filter(|_| slot != cell.index_path.item) {
            attributes.frame = target.frame;
            attributes.unpinned_y = target.frame.origin.y;
            attributes.column_index = Some(target.column);
        }
        if drag.original == cell.index_path {
            attributes.hidden = true;
            attributes.is_dragging = true;
        }
        attributes
    }

    // =========================================================================
    // Drag to reorder
    // =========================================================================

    /// Start dragging the cell at `path`. Returns `false` when the delegate
    /// refuses or the cell is not laid out.
    pub fn begin_dragging(&mut self, path: IndexPath, delegate: &dyn ReorderDelegate) -> bool {
        if self.drag.is_some() || !delegate.can_move_item(path) {
            return false;
        }
        let Some(cell) = self.info.section(path.section).and_then(|section| section.cell(path.item)) else {
            return false;
        };
        self.drag = Some(DragState {
            original: path,
            phantom: path,
            frame: cell.frame,
            translation: Point::new(0.0, 0.0),
        });
        tracing::debug!(target: targets::LAYOUT, ?path, "drag started");
        true
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Where the dragged item would land if dropped now.
    pub fn drag_destination(&self) -> Option<IndexPath> {
        self.drag.map(|drag| drag.phantom)
    }

    /// Move the floating copy by `translation` from where the drag began.
    /// When its centre enters another slot of the same section that the
    /// delegate accepts, the phantom moves there and the cells in between
    /// shift by one slot. Returns the new destination.
    pub fn handle_pan(&mut self, translation: Point, delegate: &dyn ReorderDelegate) -> Option<IndexPath> {
        let drag = self.drag.as_mut()?;
        drag.translation = translation;
        let center = drag.frame.offset(translation.x, translation.y).center();
        let target = self
            .info
            .section(drag.original.section)?
            .rows
            .iter()
            .flat_map(|row| row.cells.iter())
            .find(|cell| cell.frame.contains(center))?
            .index_path;
        if target == drag.phantom {
            return None;
        }
        if target != drag.original && !delegate.can_move_item_to(drag.original, target) {
            return None;
        }
        drag.phantom = target;
        tracing::trace!(target: targets::LAYOUT, ?target, "drag destination changed");
        Some(target)
    }

    /// Attributes of the floating copy of the dragged cell.
    pub fn dragged_item_attributes(&self) -> Option<LayoutAttributes> {
        let drag = self.drag?;
        let section = self.info.section(drag.original.section)?;
        let cell = section.cell(drag.original.item)?;
        let mut attributes = LayoutAttributes::for_cell(cell, section);
        attributes.frame = drag.frame.offset(drag.translation.x, drag.translation.y);
        attributes.z_index = z_index::PINNED_HEADER;
        attributes.is_dragging = true;
        Some(attributes)
    }

    /// Drop the dragged item. Commits the move through the delegate and
    /// returns it, or `None` when nothing moved.
    pub fn end_dragging(&mut self, delegate: &mut dyn ReorderDelegate) -> Option<(IndexPath, IndexPath)> {
        let drag = self.drag.take()?;
        if drag.phantom == drag.original || !delegate.move_item(drag.original, drag.phantom) {
            tracing::debug!(target: targets::LAYOUT, path = ?drag.original, "drag ended without a move");
            return None;
        }
        self.needs_full_pass = true;
        tracing::debug!(target: targets::LAYOUT, from = ?drag.original, to = ?drag.phantom, "drag committed");
        Some((drag.original, drag.phantom))
    }

    pub fn cancel_dragging(&mut self) {
        self.drag = None;
    }
}

fn valid_height(height: f32) -> Option<f32> {
    (height.is_finite() && height > 0.0).then_some(height)
}

fn place_header(header: &mut LayoutSupplement, y: f32, context: &mut InvalidationContext) {
    let pinned = y != header.unpinned_y;
    if header.frame.origin.y != y || header.is_pinned != pinned {
        context.invalidate_supplement(header.kind.clone(), header.index_path);
    }
    header.frame.origin.y = y;
    header.is_pinned = pinned;
    header.z_index = if pinned {
        z_index::PINNED_HEADER
    } else {
        header.item.z_index.unwrap_or(z_index::HEADER)
    };
}

/// State of one layout pass.
struct Pass<'a> {
    config: &'a LayoutConfig,
    width: f32,
    viewport_height: f32,
    y: f32,
    remainder_used: bool,
    measurer: &'a mut dyn LayoutMeasurer,
}

impl Pass<'_> {
    fn global_section(&mut self, metrics: &ResolvedSectionMetrics) -> LayoutSection {
        let start = self.y;
        let headers = self.supplements(Section::Global, ElementKind::Header, &metrics.headers, false);
        let content_top = self.y;
        let footers = self.supplements(Section::Global, ElementKind::Footer, &metrics.footers, false);
        LayoutSection {
            section: Section::Global,
            frame: Rect::new(0.0, start, self.width, self.y - start),
            background_frame: Rect::new(0.0, content_top, self.width, 0.0),
            headers,
            footers,
            rows: Vec::new(),
            decorations: Vec::new(),
            placeholder: None,
            metrics: metrics.clone(),
        }
    }

    fn section(&mut self, index: usize, snapshot: &SectionSnapshot, is_last: bool) -> LayoutSection {
        let metrics = &snapshot.metrics;
        let section = Section::Index(index);
        let showing_placeholder = snapshot.placeholder.is_some();
        let start = self.y;

        let headers = self.supplements(section, ElementKind::Header, &metrics.headers, showing_placeholder);
        let content_top = self.y;
        let mut rows = Vec::new();
        let mut decorations = Vec::new();
        let placeholder = match &snapshot.placeholder {
            Some(range) if range.starts_at(index) => Some(self.placeholder(index, range, metrics)),
            Some(_) => None,
            None => {
                self.rows(index, snapshot, &mut rows, &mut decorations);
                None
            }
        };
        let content_bottom = self.y;
        let footers = self.supplements(section, ElementKind::Footer, &metrics.footers, showing_placeholder);

        if metrics.shows_section_separator && (!is_last || metrics.shows_section_separator_when_last_section) {
            let insets = metrics.section_separator_insets;
            decorations.push(LayoutDecoration {
                kind: ElementKind::SectionSeparator,
                index_path: IndexPath::new(index, 0),
                frame: Rect::new(insets.left, self.y, (self.width - insets.horizontal()).max(0.0), 0.0),
                z_index: z_index::SECTION_SEPARATOR,
                color: Some(metrics.section_separator_color),
            });
        }

        LayoutSection {
            section,
            frame: Rect::new(0.0, start, self.width, self.y - start),
            background_frame: Rect::new(0.0, content_top, self.width, content_bottom - content_top),
            headers,
            footers,
            rows,
            decorations,
            placeholder,
            metrics: metrics.clone(),
        }
    }

    fn supplements(
        &mut self,
        section: Section,
        kind: ElementKind,
        items: &[SupplementaryItem],
        showing_placeholder: bool,
    ) -> Vec<LayoutSupplement> {
        let mut laid_out = Vec::new();
        for (index, item) in items.iter().enumerate() {
            let reserved = item.hidden
                && self.config.hidden_supplements_take_space
                && (!showing_placeholder || item.visible_while_showing_placeholder);
            if !item.takes_space(showing_placeholder) && !reserved {
                continue;
            }
            let index_path = IndexPath::in_section(section, index);
            let height = match item.height {
                SupplementaryHeight::Fixed(height) => height.max(0.0),
                SupplementaryHeight::Estimated(estimate) => {
                    let fitting = Rect::new(0.0, self.y, self.width, estimate);
                    let measured = self.measurer.measure_supplement(&kind, index_path, fitting).height;
                    checked_height(kind.as_str(), measured, estimate)
                }
            };
            laid_out.push(LayoutSupplement {
                kind: kind.clone(),
                index_path,
                frame: Rect::new(0.0, self.y, self.width, height),
                unpinned_y: self.y,
                is_pinned: false,
                z_index: item.z_index.unwrap_or(z_index::HEADER),
                item: item.clone(),
            });
            self.y += height;
        }
        laid_out
    }

    fn placeholder(&mut self, index: usize, range: &PlaceholderRange, metrics: &ResolvedSectionMetrics) -> LayoutPlaceholder {
        let height = metrics
            .placeholder_height
            .unwrap_or(self.viewport_height - self.y)
            .max(self.config.minimum_placeholder_height)
            .max(0.0);
        let placeholder = LayoutPlaceholder {
            index_path: IndexPath::new(index, 0),
            frame: Rect::new(0.0, self.y, self.width, height),
            sections: range.sections.clone(),
            placeholder: range.placeholder.clone(),
        };
        self.y += height;
        placeholder
    }

    fn rows(
        &mut self,
        index: usize,
        snapshot: &SectionSnapshot,
        rows: &mut Vec<LayoutRow>,
        decorations: &mut Vec<LayoutDecoration>,
    ) {
        let metrics = &snapshot.metrics;
        let count = snapshot.number_of_items;
        if count == 0 {
            return;
        }
        let padding = metrics.padding;
        let columns = metrics.number_of_columns.max(1);
        let available = (self.width - padding.horizontal()).max(0.0);
        let column_width = available / columns as f32;
        let row_count = count.div_ceil(columns);

        self.y += padding.top;
        for row_index in 0..row_count {
            let first = row_index * columns;
            let last = (first + columns).min(count);
            let column_x = |column: usize| match metrics.cell_layout_order {
                CellLayoutOrder::LeftToRight => padding.left + column as f32 * column_width,
                CellLayoutOrder::RightToLeft => self.width - padding.right - (column + 1) as f32 * column_width,
            };
            let mut cells: Vec<LayoutCell> = (first..last)
                .map(|item| {
                    let column = item - first;
                    LayoutCell {
                        index_path: IndexPath::new(index, item),
                        frame: Rect::new(column_x(column), self.y, column_width, 0.0),
                        column,
                        measured_height: 0.0,
                    }
                })
                .collect();

            let height = self.row_height(metrics, &mut cells);
            for cell in &mut cells {
                cell.frame.size.height = height;
            }

            if metrics.shows_column_separator && columns > 1 {
                for column in 1..cells.len() {
                    let x = match metrics.cell_layout_order {
                        CellLayoutOrder::LeftToRight => padding.left + column as f32 * column_width,
                        CellLayoutOrder::RightToLeft => self.width - padding.right - column as f32 * column_width,
                    };
                    decorations.push(LayoutDecoration {
                        kind: ElementKind::ColumnSeparator,
                        index_path: IndexPath::new(index, first + column),
                        frame: Rect::new(x, self.y, 0.0, height),
                        z_index: z_index::SEPARATOR,
                        color: Some(metrics.separator_color),
                    });
                }
            }
            if metrics.shows_row_separator && row_index + 1 < row_count {
                let insets = metrics.separator_insets;
                decorations.push(LayoutDecoration {
                    kind: ElementKind::RowSeparator,
                    index_path: IndexPath::new(index, row_index),
                    frame: Rect::new(
                        padding.left + insets.left,
                        self.y + height,
                        (available - insets.horizontal()).max(0.0),
                        0.0,
                    ),
                    z_index: z_index::SEPARATOR,
                    color: Some(metrics.separator_color),
                });
            }

            rows.push(LayoutRow {
                frame: Rect::new(padding.left, self.y, available, height),
                cells,
            });
            self.y += height;
        }
        self.y += padding.bottom;
    }

    fn row_height(&mut self, metrics: &ResolvedSectionMetrics, cells: &mut [LayoutCell]) -> f32 {
        let estimate = metrics.estimated_row_height;
        let height = match metrics.row_height {
            RowHeight::Fixed(height) => height.max(0.0),
            RowHeight::Variable => {
                let mut tallest = 0.0_f32;
                for cell in cells.iter_mut() {
                    let fitting = Rect::new(cell.frame.left(), self.y, cell.frame.width(), estimate);
                    let measured = self.measurer.measure_cell(cell.index_path, fitting).height;
                    cell.measured_height = checked_height("cell", measured, estimate);
                    tallest = tallest.max(cell.measured_height);
                }
                return tallest;
            }
            RowHeight::Remainder if !self.remainder_used => {
                self.remainder_used = true;
                valid_height(self.viewport_height - self.y).unwrap_or(estimate)
            }
            RowHeight::Remainder => estimate,
        };
        for cell in cells.iter_mut() {
            cell.measured_height = height;
        }
        height
    }
}

fn checked_height(element: &str, measured: f32, fallback: f32) -> f32 {
    match valid_height(measured) {
        Some(height) => height,
        None => {
            let error = CollectionError::measurement_failure(element, measured, fallback);
            tracing::warn!(target: targets::LAYOUT, %error, "using estimated height");
            fallback
        }
    }
}

impl SectionCounts for DataSourceTree {
    fn number_of_sections(&self) -> usize {
        DataSourceTree::number_of_sections(self)
    }

    fn number_of_items_in_section(&self, section: usize) -> usize {
        DataSourceTree::number_of_items_in_section(self, section)
    }
}

impl ReorderDelegate for DataSourceTree {
    fn can_move_item(&self, path: IndexPath) -> bool {
        DataSourceTree::can_move_item(self, path)
    }

    fn can_move_item_to(&self, from: IndexPath, to: IndexPath) -> bool {
        DataSourceTree::can_move_item_to(self, from, to)
    }

    fn move_item(&mut self, from: IndexPath, to: IndexPath) -> bool {
        DataSourceTree::move_item(self, from, to)
    }
}
