//! Composable sectioned data sources and a grid layout engine.
//!
//! Horizon Collection drives a host list or grid view:
//!
//! - **Data Sources**: Leaf, composed and segmented sources in a
//!   [`DataSourceTree`], with section mapping between local and global space
//! - **Change Propagation**: Batched insert/delete/move/reload notifications
//!   translated to the root's coordinate space
//! - **Content Loading**: Per-source load state machines with cancellable
//!   [`LoadToken`]s and aggregated parent states
//! - **Placeholders**: Loading, empty and error placeholders spanning
//!   section ranges
//! - **Layout**: [`layout::GridLayout`] with columns, separators, pinned
//!   headers, self-sizing rows and drag-to-reorder
//!
//! # Data Source Example
//!
//! ```
//! use horizon_collection::{BasicDataSource, DataSourceTree, Environment, IndexPath};
//!
//! let mut tree = DataSourceTree::new(Environment::default());
//! let recent = tree.add_leaf(BasicDataSource::new(vec!["a", "b"]));
//! let starred = tree.add_leaf(BasicDataSource::new(vec!["c"]));
//! let root = tree.add_composed();
//! tree.add_data_source(root, recent).unwrap();
//! tree.add_data_source(root, starred).unwrap();
//! tree.set_root(root).unwrap();
//!
//! let (owner, local) = tree.local_index_path(IndexPath::new(1, 0)).unwrap();
//! assert_eq!(owner, starred);
//! assert_eq!(local, IndexPath::new(0, 0));
//! ```
//!
//! # Layout Example
//!
//! ```
//! use horizon_collection::layout::{EstimatedSizes, GridLayout};
//! use horizon_collection::{BasicDataSource, DataSourceTree, LayoutConfig, Size};
//!
//! let mut tree = DataSourceTree::default();
//! let root = tree.add_leaf(BasicDataSource::new(vec![1, 2, 3]));
//! tree.set_root(root).unwrap();
//!
//! let mut layout = GridLayout::new(LayoutConfig::default());
//! layout.prepare(&tree.layout_snapshot(), Size::new(320.0, 480.0), &mut EstimatedSizes);
//! assert_eq!(layout.content_size(), Size::new(320.0, 132.0));
//! ```

pub mod change;
pub mod data_source;
pub mod debug;
pub mod environment;
pub mod geometry;
pub mod index_path;
pub mod layout;
pub mod loading;
pub mod mapping;
pub mod metrics;
pub mod placeholder;
pub mod view;

pub use change::{ChangeBatch, ChangeEvent, Notifier, SectionDirection};
pub use data_source::{
    Action, BasicDataSource, DataSourceContent, DataSourceId, DataSourceKind, DataSourceTree, Item,
    KeyValueDataSource, KeyValueItem, KeyValueKind, KeyValueRow, LoadStateChange, SEGMENTED_CONTROL_HEADER_KEY,
};
pub use environment::{Environment, LayoutConfig, Theme};
pub use geometry::{Color, EdgeInsets, Point, Rect, Size};
pub use index_path::{IndexPath, Section};
pub use loading::{LoadCoordinator, LoadOutcome, LoadState, LoadToken};
pub use mapping::SectionMapping;
pub use metrics::{
    CellLayoutOrder, ConfigureContext, ElementKind, ResolvedSectionMetrics, RowHeight, SectionMetrics,
    SupplementaryHeight, SupplementaryItem,
};
pub use placeholder::{Placeholder, PlaceholderCoordinator, PlaceholderPlan, PlaceholderRange};
pub use view::{BatchCompletion, BatchUpdates, CollectionView, ReusableView};

pub use horizon_collection_core::{CollectionError, LoadError, Result, StateMachine};
