//! Debug dumps of the data-source tree.
//!
//! ```
//! use horizon_collection::debug::{DataSourceTreeDebug, TreeFormatOptions, TreeStyle};
//! use horizon_collection::{BasicDataSource, DataSourceTree};
//!
//! let mut tree = DataSourceTree::default();
//! let leaf = tree.add_leaf(BasicDataSource::new(vec![1, 2]));
//! let root = tree.add_composed();
//! tree.add_data_source(root, leaf).unwrap();
//! tree.set_root(root).unwrap();
//!
//! let debug = DataSourceTreeDebug::with_options(TreeFormatOptions {
//!     style: TreeStyle::Ascii,
//!     show_ids: false,
//!     ..Default::default()
//! });
//! let dump = debug.format_tree(&tree);
//! assert!(dump.contains("(composed)"));
//! assert!(dump.contains("(leaf)"));
//! ```

use std::fmt::{self, Write as FmtWrite};

use crate::data_source::{DataSourceId, DataSourceKind, DataSourceTree};

/// Style options for tree visualization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeStyle {
    /// ASCII characters for tree branches.
    Ascii,
    /// Unicode box-drawing characters.
    #[default]
    Unicode,
    /// Compact single-line representation.
    Compact,
}

/// Configuration for tree debug output.
#[derive(Debug, Clone)]
pub struct TreeFormatOptions {
    pub style: TreeStyle,
    pub show_ids: bool,
    /// Show load state and section count of each node.
    pub show_state: bool,
    /// Maximum depth to traverse (None for unlimited).
    pub max_depth: Option<usize>,
    pub indent_size: usize,
}

impl Default for TreeFormatOptions {
    fn default() -> Self {
        Self {
            style: TreeStyle::default(),
            show_ids: true,
            show_state: true,
            max_depth: None,
            indent_size: 2,
        }
    }
}

impl TreeFormatOptions {
    /// Titles and kinds only.
    pub fn minimal() -> Self {
        Self {
            show_ids: false,
            show_state: false,
            ..Default::default()
        }
    }
}

/// Renders a [`DataSourceTree`] for diagnostics.
#[derive(Debug, Clone, Default)]
pub struct DataSourceTreeDebug {
    options: TreeFormatOptions,
}

impl DataSourceTreeDebug {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: TreeFormatOptions) -> Self {
        Self { options }
    }

    /// Format the tree below the root.
    pub fn format_tree(&self, tree: &DataSourceTree) -> String {
        let mut output = String::new();
        let _ = self.write_tree(tree, &mut output);
        output
    }

    /// Format the subtree below `id`, attached or not.
    pub fn format_subtree(&self, tree: &DataSourceTree, id: DataSourceId) -> String {
        let mut output = String::new();
        let _ = self.write_node(tree, id, 0, true, &mut output);
        output
    }

    fn write_tree(&self, tree: &DataSourceTree, output: &mut String) -> fmt::Result {
        writeln!(output, "Data Source Tree ({} sections):", tree.number_of_sections())?;
        match tree.root() {
            Some(root) => self.write_node(tree, root, 0, true, output),
            None => writeln!(output, "  (no root)"),
        }
    }

    fn write_node(
        &self,
        tree: &DataSourceTree,
        id: DataSourceId,
        depth: usize,
        is_last: bool,
        output: &mut String,
    ) -> fmt::Result {
        if self.options.max_depth.is_some_and(|max| depth > max) {
            return Ok(());
        }
        let Ok(kind) = tree.kind(id) else {
            return Ok(());
        };

        output.push_str(&self.build_prefix(depth, is_last));
        output.push_str(tree.title(id).unwrap_or("(untitled)"));
        if self.options.show_ids {
            write!(output, " [{id:?}]")?;
        }
        let kind_name = match kind {
            DataSourceKind::Leaf => "leaf",
            DataSourceKind::Composed => "composed",
            DataSourceKind::Segmented => "segmented",
        };
        write!(output, " ({kind_name})")?;
        if self.options.show_state {
            if let Some(state) = tree.load_state(id) {
                write!(output, " {state:?}")?;
            }
            write!(output, " sections={}", tree.number_of_sections_of(id))?;
        }
        if tree
            .parent(id)
            .and_then(|parent| tree.selected_data_source(parent))
            == Some(id)
        {
            output.push_str(" *");
        }
        output.push('\n');

        let children = tree.data_sources(id);
        let count = children.len();
        for (index, child) in children.into_iter().enumerate() {
            self.write_node(tree, child, depth + 1, index + 1 == count, output)?;
        }
        Ok(())
    }

    fn build_prefix(&self, depth: usize, is_last: bool) -> String {
        if depth == 0 {
            return String::new();
        }
        let (branch, corner, last) = match self.options.style {
            TreeStyle::Ascii => ("|", "+-- ", "`-- "),
            TreeStyle::Unicode => ("\u{2502}", "\u{251c}\u{2500}\u{2500} ", "\u{2514}\u{2500}\u{2500} "),
            TreeStyle::Compact => ("", "- ", "- "),
        };
        let mut prefix = String::new();
        for _ in 0..depth - 1 {
            prefix.push_str(branch);
            prefix.extend(std::iter::repeat_n(' ', self.options.indent_size));
        }
        prefix.push_str(if is_last { last } else { corner });
        prefix
    }
}

impl DataSourceTree {
    /// Emit the tree at debug level.
    pub fn log_tree(&self) {
        let dump = DataSourceTreeDebug::new().format_tree(self);
        horizon_collection_core::collection_debug!(tree = %dump, "data source tree");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_source::BasicDataSource;

    fn segmented_tree() -> DataSourceTree {
        let mut tree = DataSourceTree::default();
        let first = tree.add_leaf(BasicDataSource::new(vec![1]));
        let second = tree.add_leaf(BasicDataSource::new(vec![2, 3]));
        tree.set_title(first, "Recent").unwrap();
        tree.set_title(second, "Starred").unwrap();
        let root = tree.add_segmented();
        tree.set_title(root, "Inbox").unwrap();
        tree.add_data_source(root, first).unwrap();
        tree.add_data_source(root, second).unwrap();
        tree.set_root(root).unwrap();
        tree
    }

    #[test]
    fn test_minimal_ascii_dump() {
        let tree = segmented_tree();
        let debug = DataSourceTreeDebug::with_options(TreeFormatOptions {
            style: TreeStyle::Ascii,
            ..TreeFormatOptions::minimal()
        });
        assert_eq!(
            debug.format_tree(&tree),
            "Data Source Tree (1 sections):\nInbox (segmented)\n+-- Recent (leaf) *\n`-- Starred (leaf)\n"
        );
    }

    #[test]
    fn test_state_and_depth_limit() {
        let tree = segmented_tree();
        let debug = DataSourceTreeDebug::with_options(TreeFormatOptions {
            show_ids: false,
            max_depth: Some(0),
            ..Default::default()
        });
        assert_eq!(
            debug.format_tree(&tree),
            "Data Source Tree (1 sections):\nInbox (segmented) Initial sections=1\n"
        );
    }

    #[test]
    fn test_empty_tree() {
        let tree = DataSourceTree::default();
        assert!(DataSourceTreeDebug::new().format_tree(&tree).contains("(no root)"));
        tree.log_tree();
    }
}
