//! Section and supplementary-item appearance.
//!
//! [`SectionMetrics`] describe how one section lays out: row height, column
//! count, padding, separators, colours, and the headers and footers attached
//! to it. Every field is optional so metrics can be layered: the environment
//! defaults, a data source's default metrics, a composed parent's metrics and
//! a section's own customisation are applied in order, and unset fields fall
//! back per field. [`SectionMetrics::resolve`] produces the concrete
//! [`ResolvedSectionMetrics`] consumed by the layout.
//!
//! Colours, margins, reuse identifiers and the `configure` callback are opaque
//! to the core; they are carried through to the host view untouched.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::data_source::DataSourceId;
use crate::geometry::{Color, EdgeInsets};
use crate::index_path::IndexPath;

/// Default row height when a section does not specify one.
pub const DEFAULT_ROW_HEIGHT: f32 = 44.0;

/// Default estimated height for headers and footers.
pub const DEFAULT_SUPPLEMENT_HEIGHT: f32 = 44.0;

/// Reserved element kind strings the host view must accept verbatim.
pub mod element_kinds {
    pub const HEADER: &str = "header";
    pub const FOOTER: &str = "footer";
    pub const PLACEHOLDER: &str = "placeholder";
    pub const ROW_SEPARATOR: &str = "rowSeparator";
    pub const COLUMN_SEPARATOR: &str = "columnSeparator";
    pub const SECTION_SEPARATOR: &str = "sectionSeparator";
    pub const GLOBAL_HEADER_BACKGROUND: &str = "globalHeaderBackground";
    pub const SECTION_BACKGROUND: &str = "sectionBackground";
}

/// The kind of a non-cell layout element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementKind {
    Header,
    Footer,
    Placeholder,
    RowSeparator,
    ColumnSeparator,
    SectionSeparator,
    GlobalHeaderBackground,
    /// Fills the area between a section's headers and footers.
    SectionBackground,
    /// A host-defined supplementary kind.
    Custom(String),
}

impl ElementKind {
    /// The host-facing kind string.
    pub fn as_str(&self) -> &str {
        match self {
            ElementKind::Header => element_kinds::HEADER,
            ElementKind::Footer => element_kinds::FOOTER,
            ElementKind::Placeholder => element_kinds::PLACEHOLDER,
            ElementKind::RowSeparator => element_kinds::ROW_SEPARATOR,
            ElementKind::ColumnSeparator => element_kinds::COLUMN_SEPARATOR,
            ElementKind::SectionSeparator => element_kinds::SECTION_SEPARATOR,
            ElementKind::GlobalHeaderBackground => element_kinds::GLOBAL_HEADER_BACKGROUND,
            ElementKind::SectionBackground => element_kinds::SECTION_BACKGROUND,
            ElementKind::Custom(tag) => tag,
        }
    }

    /// Parse a host-facing kind string. Unknown strings become `Custom`.
    pub fn parse(kind: &str) -> Self {
        match kind {
            element_kinds::HEADER => ElementKind::Header,
            element_kinds::FOOTER => ElementKind::Footer,
            element_kinds::PLACEHOLDER => ElementKind::Placeholder,
            element_kinds::ROW_SEPARATOR => ElementKind::RowSeparator,
            element_kinds::COLUMN_SEPARATOR => ElementKind::ColumnSeparator,
            element_kinds::SECTION_SEPARATOR => ElementKind::SectionSeparator,
            element_kinds::GLOBAL_HEADER_BACKGROUND => ElementKind::GlobalHeaderBackground,
            element_kinds::SECTION_BACKGROUND => ElementKind::SectionBackground,
            other => ElementKind::Custom(other.to_string()),
        }
    }

    /// Whether elements of this kind are decorations owned by the layout
    /// rather than views configured by a data source.
    pub fn is_decoration(&self) -> bool {
        matches!(
            self,
            ElementKind::RowSeparator
                | ElementKind::ColumnSeparator
                | ElementKind::SectionSeparator
                | ElementKind::GlobalHeaderBackground
                | ElementKind::SectionBackground
        )
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How tall the rows of a section are.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RowHeight {
    /// Every row has this height.
    Fixed(f32),
    /// Each row is as tall as its tallest measured cell.
    Variable,
    /// The row fills the viewport below its origin. Only the first row in a
    /// layout pass that asks for this gets it.
    Remainder,
}

/// Horizontal ordering of cells within a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CellLayoutOrder {
    #[default]
    LeftToRight,
    RightToLeft,
}

/// Height rule for a supplementary item. Exactly one value is authoritative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SupplementaryHeight {
    /// Always this tall; never measured.
    Fixed(f32),
    /// Measured by the host, with this value as the first guess and fallback.
    Estimated(f32),
}

impl SupplementaryHeight {
    /// The fixed height or the estimate.
    pub fn value(&self) -> f32 {
        match *self {
            SupplementaryHeight::Fixed(height) | SupplementaryHeight::Estimated(height) => height,
        }
    }

    /// Whether the host must be asked for the real height.
    pub fn needs_measurement(&self) -> bool {
        matches!(self, SupplementaryHeight::Estimated(_))
    }
}

/// Where a dequeued supplementary view came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigureContext {
    /// The data source that declared the supplementary item.
    pub data_source: DataSourceId,
    /// The element's index path in that data source's local space.
    pub local_path: IndexPath,
}

/// Host callback that fills a dequeued supplementary view.
pub type ConfigureFn = Arc<dyn Fn(&mut dyn Any, &ConfigureContext) + Send + Sync>;

/// Appearance of a header, footer, placeholder or custom supplementary view.
#[derive(Clone)]
pub struct SupplementaryItem {
    pub kind: ElementKind,
    pub height: SupplementaryHeight,
    /// Headers only: sticks to the top of the viewport while its section is visible.
    pub should_pin: bool,
    pub visible_while_showing_placeholder: bool,
    pub hidden: bool,
    pub layout_margins: EdgeInsets,
    /// Overrides the layout's z-index for this element.
    pub z_index: Option<i32>,
    pub background_color: Option<Color>,
    pub selected_background_color: Option<Color>,
    pub pinned_background_color: Option<Color>,
    pub separator_color: Option<Color>,
    pub pinned_separator_color: Option<Color>,
    pub shows_separator: bool,
    pub simulates_selection: bool,
    pub reuse_identifier: String,
    pub view_class_tag: String,
    pub configure: Option<ConfigureFn>,
    /// The data source that declared the item; stamped when metrics are
    /// snapshotted.
    pub(crate) owner: Option<DataSourceId>,
}

impl fmt::Debug for SupplementaryItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupplementaryItem")
            .field("kind", &self.kind)
            .field("height", &self.height)
            .field("should_pin", &self.should_pin)
            .field("hidden", &self.hidden)
            .field("reuse_identifier", &self.reuse_identifier)
            .field("has_configure", &self.configure.is_some())
            .field("owner", &self.owner)
            .finish_non_exhaustive()
    }
}

impl SupplementaryItem {
    /// Create an item of the given kind with default appearance.
    pub fn new(kind: ElementKind) -> Self {
        let reuse_identifier = kind.as_str().to_string();
        Self {
            kind,
            height: SupplementaryHeight::Estimated(DEFAULT_SUPPLEMENT_HEIGHT),
            should_pin: false,
            visible_while_showing_placeholder: false,
            hidden: false,
            layout_margins: EdgeInsets::ZERO,
            z_index: None,
            background_color: None,
            selected_background_color: None,
            pinned_background_color: None,
            separator_color: None,
            pinned_separator_color: None,
            shows_separator: false,
            simulates_selection: false,
            view_class_tag: reuse_identifier.clone(),
            reuse_identifier,
            configure: None,
            owner: None,
        }
    }

    /// A header with default appearance.
    pub fn header() -> Self {
        Self::new(ElementKind::Header)
    }

    /// A footer with default appearance.
    pub fn footer() -> Self {
        Self::new(ElementKind::Footer)
    }

    pub fn with_fixed_height(mut self, height: f32) -> Self {
        self.height = SupplementaryHeight::Fixed(height);
        self
    }

    pub fn with_estimated_height(mut self, height: f32) -> Self {
        self.height = SupplementaryHeight::Estimated(height);
        self
    }

    pub fn pinned(mut self, should_pin: bool) -> Self {
        self.should_pin = should_pin;
        self
    }

    pub fn visible_while_showing_placeholder(mut self, visible: bool) -> Self {
        self.visible_while_showing_placeholder = visible;
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    /// Set the view class and reuse identifier the host registers.
    pub fn with_view_class(mut self, tag: impl Into<String>, reuse_identifier: impl Into<String>) -> Self {
        self.view_class_tag = tag.into();
        self.reuse_identifier = reuse_identifier.into();
        self
    }

    pub fn with_background_color(mut self, color: Color) -> Self {
        self.background_color = Some(color);
        self
    }

    pub fn with_z_index(mut self, z_index: i32) -> Self {
        self.z_index = Some(z_index);
        self
    }

    /// Set the callback run when the host dequeues a view for this item.
    pub fn with_configure<F>(mut self, configure: F) -> Self
    where
        F: Fn(&mut dyn Any, &ConfigureContext) + Send + Sync + 'static,
    {
        self.configure = Some(Arc::new(configure));
        self
    }

    /// The data source that declared this item, once snapshotted.
    pub fn owner(&self) -> Option<DataSourceId> {
        self.owner
    }

    pub(crate) fn owned_by(mut self, owner: DataSourceId) -> Self {
        self.owner.get_or_insert(owner);
        self
    }

    /// Whether the layout must reserve space for this element.
    pub fn takes_space(&self, showing_placeholder: bool) -> bool {
        !self.hidden && (!showing_placeholder || self.visible_while_showing_placeholder)
    }
}

/// Layerable appearance description for a section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionMetrics {
    pub row_height: Option<RowHeight>,
    pub estimated_row_height: Option<f32>,
    pub number_of_columns: Option<usize>,
    pub padding: Option<EdgeInsets>,
    pub layout_margins: Option<EdgeInsets>,
    pub separator_insets: Option<EdgeInsets>,
    pub section_separator_insets: Option<EdgeInsets>,
    pub shows_column_separator: Option<bool>,
    pub shows_row_separator: Option<bool>,
    pub shows_section_separator: Option<bool>,
    pub shows_section_separator_when_last_section: Option<bool>,
    pub background_color: Option<Color>,
    pub selected_background_color: Option<Color>,
    pub separator_color: Option<Color>,
    pub section_separator_color: Option<Color>,
    pub cell_layout_order: Option<CellLayoutOrder>,
    /// Minimum height of a placeholder region starting in this section.
    pub placeholder_height: Option<f32>,
    #[serde(skip)]
    pub headers: Vec<SupplementaryItem>,
    #[serde(skip)]
    pub footers: Vec<SupplementaryItem>,
}

macro_rules! override_fields {
    ($target:ident, $source:ident, $($field:ident),+ $(,)?) => {
        $(
            if $source.$field.is_some() {
                $target.$field = $source.$field.clone();
            }
        )+
    };
}

impl SectionMetrics {
    /// Metrics with every field unset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Layer `other` on top of these metrics.
    ///
    /// Fields set in `other` win; headers and footers are appended after the
    /// existing ones.
    pub fn apply(&mut self, other: &SectionMetrics) {
        override_fields!(
            self,
            other,
            row_height,
            estimated_row_height,
            number_of_columns,
            padding,
            layout_margins,
            separator_insets,
            section_separator_insets,
            shows_column_separator,
            shows_row_separator,
            shows_section_separator,
            shows_section_separator_when_last_section,
            background_color,
            selected_background_color,
            separator_color,
            section_separator_color,
            cell_layout_order,
            placeholder_height,
        );
        self.headers.extend(other.headers.iter().cloned());
        self.footers.extend(other.footers.iter().cloned());
    }

    /// A copy of `self` with `other` layered on top.
    pub fn merged(&self, other: &SectionMetrics) -> SectionMetrics {
        let mut merged = self.clone();
        merged.apply(other);
        merged
    }

    pub fn with_row_height(mut self, row_height: RowHeight) -> Self {
        self.row_height = Some(row_height);
        self
    }

    pub fn with_columns(mut self, columns: usize) -> Self {
        self.number_of_columns = Some(columns);
        self
    }

    pub fn with_padding(mut self, padding: EdgeInsets) -> Self {
        self.padding = Some(padding);
        self
    }

    pub fn with_header(mut self, header: SupplementaryItem) -> Self {
        self.headers.push(header);
        self
    }

    pub fn with_footer(mut self, footer: SupplementaryItem) -> Self {
        self.footers.push(footer);
        self
    }

    /// Fill every unset field with the built-in default.
    pub fn resolve(&self) -> ResolvedSectionMetrics {
        let estimated_row_height = self
            .estimated_row_height
            .filter(|height| *height > 0.0)
            .unwrap_or(DEFAULT_ROW_HEIGHT);
        ResolvedSectionMetrics {
            row_height: self.row_height.unwrap_or(RowHeight::Fixed(DEFAULT_ROW_HEIGHT)),
            estimated_row_height,
            number_of_columns: self.number_of_columns.unwrap_or(1).max(1),
            padding: self.padding.unwrap_or_default(),
            layout_margins: self.layout_margins.unwrap_or_default(),
            separator_insets: self.separator_insets.unwrap_or_default(),
            section_separator_insets: self.section_separator_insets.unwrap_or_default(),
            shows_column_separator: self.shows_column_separator.unwrap_or(false),
            shows_row_separator: self.shows_row_separator.unwrap_or(false),
            shows_section_separator: self.shows_section_separator.unwrap_or(false),
            shows_section_separator_when_last_section: self
                .shows_section_separator_when_last_section
                .unwrap_or(false),
            background_color: self.background_color,
            selected_background_color: self.selected_background_color,
            separator_color: self.separator_color.unwrap_or(Color::LIGHT_GRAY),
            section_separator_color: self.section_separator_color.unwrap_or(Color::LIGHT_GRAY),
            cell_layout_order: self.cell_layout_order.unwrap_or_default(),
            placeholder_height: self.placeholder_height,
            headers: self.headers.clone(),
            footers: self.footers.clone(),
        }
    }
}

/// Section metrics with every field decided.
#[derive(Debug, Clone)]
pub struct ResolvedSectionMetrics {
    pub row_height: RowHeight,
    pub estimated_row_height: f32,
    pub number_of_columns: usize,
    pub padding: EdgeInsets,
    pub layout_margins: EdgeInsets,
    pub separator_insets: EdgeInsets,
    pub section_separator_insets: EdgeInsets,
    pub shows_column_separator: bool,
    pub shows_row_separator: bool,
    pub shows_section_separator: bool,
    pub shows_section_separator_when_last_section: bool,
    pub background_color: Option<Color>,
    pub selected_background_color: Option<Color>,
    pub separator_color: Color,
    pub section_separator_color: Color,
    pub cell_layout_order: CellLayoutOrder,
    pub placeholder_height: Option<f32>,
    pub headers: Vec<SupplementaryItem>,
    pub footers: Vec<SupplementaryItem>,
}

impl Default for ResolvedSectionMetrics {
    fn default() -> Self {
        SectionMetrics::default().resolve()
    }
}

impl ResolvedSectionMetrics {
    /// The supplementary items of `kind` in declaration order.
    pub fn supplements(&self, kind: &ElementKind) -> impl Iterator<Item = &SupplementaryItem> {
        let source: &[SupplementaryItem] = match kind {
            ElementKind::Header => &self.headers,
            ElementKind::Footer => &self.footers,
            _ => &[],
        };
        source.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_kind_strings() {
        for kind in [
            ElementKind::Header,
            ElementKind::Footer,
            ElementKind::Placeholder,
            ElementKind::RowSeparator,
            ElementKind::ColumnSeparator,
            ElementKind::SectionSeparator,
            ElementKind::GlobalHeaderBackground,
            ElementKind::SectionBackground,
        ] {
            assert_eq!(ElementKind::parse(kind.as_str()), kind);
        }
        assert_eq!(
            ElementKind::parse("badge"),
            ElementKind::Custom("badge".to_string())
        );
        assert!(ElementKind::RowSeparator.is_decoration());
        assert!(!ElementKind::Header.is_decoration());
    }

    #[test]
    fn test_apply_overrides_set_fields_only() {
        let mut base = SectionMetrics::new()
            .with_row_height(RowHeight::Fixed(44.0))
            .with_columns(2)
            .with_header(SupplementaryItem::header());
        let custom = SectionMetrics {
            number_of_columns: Some(3),
            ..Default::default()
        }
        .with_header(SupplementaryItem::header().pinned(true));

        base.apply(&custom);

        assert_eq!(base.row_height, Some(RowHeight::Fixed(44.0)));
        assert_eq!(base.number_of_columns, Some(3));
        assert_eq!(base.headers.len(), 2);
        assert!(base.headers[1].should_pin);
    }

    #[test]
    fn test_resolve_defaults() {
        let resolved = SectionMetrics::new().resolve();
        assert_eq!(resolved.row_height, RowHeight::Fixed(DEFAULT_ROW_HEIGHT));
        assert_eq!(resolved.number_of_columns, 1);
        assert_eq!(resolved.padding, EdgeInsets::ZERO);
        assert_eq!(resolved.cell_layout_order, CellLayoutOrder::LeftToRight);
    }

    #[test]
    fn test_resolve_clamps_columns() {
        let resolved = SectionMetrics::new().with_columns(0).resolve();
        assert_eq!(resolved.number_of_columns, 1);
    }

    #[test]
    fn test_supplement_space_rules() {
        let header = SupplementaryItem::header();
        assert!(header.takes_space(false));
        assert!(!header.takes_space(true));
        assert!(header.clone().visible_while_showing_placeholder(true).takes_space(true));
        assert!(!header.hidden(true).takes_space(false));
    }

    #[test]
    fn test_metrics_deserialize_from_json() {
        let metrics: SectionMetrics =
            serde_json::from_str(r#"{"number_of_columns": 2, "row_height": {"Fixed": 50.0}}"#)
                .unwrap();
        assert_eq!(metrics.number_of_columns, Some(2));
        assert_eq!(metrics.row_height, Some(RowHeight::Fixed(50.0)));
        assert!(metrics.padding.is_none());
    }
}
