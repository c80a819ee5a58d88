//! The data-source composition tree.
//!
//! A [`DataSourceTree`] owns every data source in an arena and addresses
//! them by [`DataSourceId`]. There are three kinds of node:
//!
//! - **Leaf**: wraps user content implementing [`DataSourceContent`]
//!   ([`BasicDataSource`] is the single-section list implementation,
//!   [`KeyValueDataSource`] shows fields of one object)
//! - **Composed**: concatenates the sections of all its children
//! - **Segmented**: exposes the sections of one selected child at a time
//!
//! Parents hold their children by id; children hold only their parent's id.
//! The root is the node the host view talks to; its section space is the
//! *global* space. Every other node reasons in its own *local* space and the
//! tree translates at the boundaries.
//!
//! # Example
//!
//! ```
//! use horizon_collection::{BasicDataSource, DataSourceTree, Environment};
//!
//! let mut tree = DataSourceTree::new(Environment::default());
//! let fruit = tree.add_leaf(BasicDataSource::new(vec!["apple", "pear"]));
//! let veg = tree.add_leaf(BasicDataSource::new(vec!["leek"]));
//! let root = tree.add_composed();
//! tree.add_data_source(root, fruit).unwrap();
//! tree.add_data_source(root, veg).unwrap();
//! tree.set_root(root).unwrap();
//!
//! assert_eq!(tree.number_of_sections(), 2);
//! assert_eq!(tree.number_of_items_in_section(1), 1);
//! ```

mod appearance;
mod basic;
mod composed;
mod content_loading;
mod key_value;
mod placeholders;
mod segmented;
mod update;

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use horizon_collection_core::logging::targets;
use horizon_collection_core::{CollectionError, Result, Signal, ThreadAffinity};
use slotmap::SlotMap;

use crate::change::{ChangeEvent, Notifier};
use crate::environment::Environment;
use crate::index_path::IndexPath;
use crate::layout::Invalidator;
use crate::loading::{LoadCompletion, LoadCoordinator, LoadState, LoadToken};
use crate::mapping::SectionMapping;
use crate::metrics::{SectionMetrics, SupplementaryItem};
use crate::placeholder::{Placeholder, PlaceholderPlan, PresentedPlaceholder};
use crate::view::{BatchCompletion, CollectionView};

pub use basic::BasicDataSource;
pub use key_value::{KeyValueDataSource, KeyValueItem, KeyValueKind, KeyValueRow};
pub use segmented::SEGMENTED_CONTROL_HEADER_KEY;

slotmap::new_key_type! {
    /// Handle of a data source within a [`DataSourceTree`].
    pub struct DataSourceId;
}

/// An opaque item published by a leaf. The tree never looks inside.
pub type Item = Arc<dyn Any + Send + Sync>;

/// A swipe or context action offered for an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub title: String,
    pub identifier: String,
    pub destructive: bool,
}

impl Action {
    pub fn new(title: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            identifier: identifier.into(),
            destructive: false,
        }
    }

    pub fn destructive(title: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            destructive: true,
            ..Self::new(title, identifier)
        }
    }
}

/// Content of a leaf data source.
///
/// Only [`number_of_items`](Self::number_of_items) and [`item`](Self::item)
/// are required. Mutating hooks receive a [`Notifier`] and must report what
/// they changed, in local coordinates.
pub trait DataSourceContent: Any + Send {
    fn number_of_sections(&self) -> usize {
        1
    }

    fn number_of_items(&self, section: usize) -> usize;

    /// The item at `path`, or `None` when out of range.
    fn item(&self, path: IndexPath) -> Option<Item>;

    /// Every path at which `item` appears.
    fn index_paths_for_item(&self, item: &Item) -> Vec<IndexPath> {
        let mut paths = Vec::new();
        for section in 0..self.number_of_sections() {
            for index in 0..self.number_of_items(section) {
                let path = IndexPath::new(section, index);
                if self.item(path).is_some_and(|candidate| Arc::ptr_eq(&candidate, item)) {
                    paths.push(path);
                }
            }
        }
        paths
    }

    /// Remove the item at `path`, reporting the removal. Returns whether
    /// anything was removed.
    fn remove_item(&mut self, _path: IndexPath, _notifier: &mut Notifier) -> bool {
        false
    }

    /// Move an item, reporting the move. Returns whether it moved.
    fn move_item(&mut self, _from: IndexPath, _to: IndexPath, _notifier: &mut Notifier) -> bool {
        false
    }

    fn primary_actions(&self, _path: IndexPath) -> Vec<Action> {
        Vec::new()
    }

    fn secondary_actions(&self, _path: IndexPath) -> Vec<Action> {
        Vec::new()
    }

    fn can_edit_item(&self, _path: IndexPath) -> bool {
        true
    }

    fn can_move_item(&self, _path: IndexPath) -> bool {
        false
    }

    fn can_move_item_to(&self, _from: IndexPath, _to: IndexPath) -> bool {
        false
    }

    /// Register cell classes with the host. Supplementary views declared in
    /// metrics are registered by the tree.
    fn register_reusable_views(&self, _view: &mut dyn CollectionView) {}

    /// Start loading. Finish by calling exactly one completion on `token`,
    /// from any thread.
    fn load_content(&mut self, token: LoadToken) {
        token.done();
    }

    /// Drop loaded content before a reload from scratch.
    fn reset_content(&mut self) {}
}

/// A load-state transition of one data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadStateChange {
    pub data_source: DataSourceId,
    pub from: LoadState,
    pub to: LoadState,
}

/// What a node is made of.
pub(crate) enum NodeKind {
    Leaf(Box<dyn DataSourceContent>),
    Composed {
        mappings: Vec<SectionMapping>,
    },
    Segmented {
        children: Vec<DataSourceId>,
        selected: Option<usize>,
        should_display_default_header: bool,
    },
}

impl NodeKind {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            NodeKind::Leaf(_) => "leaf",
            NodeKind::Composed { .. } => "composed",
            NodeKind::Segmented { .. } => "segmented",
        }
    }
}

/// Which kind of node a data source is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSourceKind {
    Leaf,
    Composed,
    Segmented,
}

pub(crate) struct Node {
    pub(crate) parent: Option<DataSourceId>,
    pub(crate) title: Option<String>,
    pub(crate) kind: NodeKind,
    pub(crate) default_metrics: SectionMetrics,
    pub(crate) global_metrics: SectionMetrics,
    pub(crate) section_metrics: BTreeMap<usize, SectionMetrics>,
    /// Keyed headers in insertion order.
    pub(crate) headers: Vec<(String, SupplementaryItem)>,
    pub(crate) loader: LoadCoordinator,
    pub(crate) no_content_placeholder: Option<Placeholder>,
    pub(crate) error_placeholder: Option<Placeholder>,
    pub(crate) presented: Option<PresentedPlaceholder>,
    pub(crate) shows_activity_while_refreshing: bool,
    pub(crate) allows_selection: bool,
    pub(crate) active: bool,
    /// Resigned while a load was in flight; reload on the next activation.
    pub(crate) interrupted: bool,
}

impl Node {
    fn new(kind: NodeKind, env: &Environment) -> Self {
        Self {
            parent: None,
            title: None,
            kind,
            default_metrics: SectionMetrics::new(),
            global_metrics: SectionMetrics::new(),
            section_metrics: BTreeMap::new(),
            headers: Vec::new(),
            loader: LoadCoordinator::new(),
            no_content_placeholder: Some(env.no_content_placeholder()),
            error_placeholder: Some(env.error_placeholder()),
            presented: None,
            shows_activity_while_refreshing: env.shows_activity_indicator_while_refreshing,
            allows_selection: true,
            active: false,
            interrupted: false,
        }
    }
}

/// Arena of data sources plus the root's link to the host view.
pub struct DataSourceTree {
    pub(crate) env: Environment,
    pub(crate) nodes: SlotMap<DataSourceId, Node>,
    pub(crate) root: Option<DataSourceId>,
    pub(crate) view: Option<Box<dyn CollectionView>>,
    pub(crate) update_depth: usize,
    /// Root-space events of the open batch.
    pub(crate) pending: Vec<ChangeEvent>,
    /// For each current root section, the section it was when the open batch
    /// began (`None` for sections the batch created).
    pub(crate) section_origins: Vec<Option<usize>>,
    pub(crate) pending_completions: Vec<BatchCompletion>,
    /// Placeholders as of the last batch the host saw.
    pub(crate) shown_plan: PlaceholderPlan,
    pub(crate) invalidator: Invalidator,
    pub(crate) completion_tx: Sender<LoadCompletion>,
    pub(crate) completion_rx: Receiver<LoadCompletion>,
    pub(crate) needs_load: Vec<DataSourceId>,
    pub(crate) affinity: ThreadAffinity,
    load_state_changed: Arc<Signal<LoadStateChange>>,
}

impl fmt::Debug for DataSourceTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataSourceTree")
            .field("nodes", &self.nodes.len())
            .field("root", &self.root)
            .field("has_view", &self.view.is_some())
            .field("update_depth", &self.update_depth)
            .finish_non_exhaustive()
    }
}

impl Default for DataSourceTree {
    fn default() -> Self {
        Self::new(Environment::default())
    }
}

impl DataSourceTree {
    /// Create an empty tree bound to the current thread.
    pub fn new(env: Environment) -> Self {
        let (completion_tx, completion_rx) = crossbeam_channel::unbounded();
        Self {
            env,
            nodes: SlotMap::with_key(),
            root: None,
            view: None,
            update_depth: 0,
            pending: Vec::new(),
            section_origins: Vec::new(),
            pending_completions: Vec::new(),
            shown_plan: PlaceholderPlan::default(),
            invalidator: Invalidator::new(),
            completion_tx,
            completion_rx,
            needs_load: Vec::new(),
            affinity: ThreadAffinity::current(),
            load_state_changed: Arc::new(Signal::new()),
        }
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    /// Emitted after any data source changes load state.
    pub fn load_state_changed(&self) -> &Arc<Signal<LoadStateChange>> {
        &self.load_state_changed
    }

    // =========================================================================
    // Construction
    // =========================================================================

    /// Add a detached leaf.
    pub fn add_leaf<C: DataSourceContent>(&mut self, content: C) -> DataSourceId {
        self.insert_node(NodeKind::Leaf(Box::new(content)))
    }

    /// Add a detached, empty composed data source.
    pub fn add_composed(&mut self) -> DataSourceId {
        self.insert_node(NodeKind::Composed {
            mappings: Vec::new(),
        })
    }

    /// Add a detached, empty segmented data source.
    pub fn add_segmented(&mut self) -> DataSourceId {
        let id = self.insert_node(NodeKind::Segmented {
            children: Vec::new(),
            selected: None,
            should_display_default_header: true,
        });
        self.install_segmented_control_header(id);
        id
    }

    fn insert_node(&mut self, kind: NodeKind) -> DataSourceId {
        self.affinity.debug_assert_same_thread();
        let name = kind.name();
        let node = Node::new(kind, &self.env);
        let id = self.nodes.insert(node);
        tracing::debug!(target: targets::DATA_SOURCE, ?id, kind = name, "data source created");
        id
    }

    /// Make `id` the root the host view talks to.
    pub fn set_root(&mut self, id: DataSourceId) -> Result<()> {
        if self.node(id)?.parent.is_some() {
            return Err(CollectionError::invalid_composition(
                "the root data source cannot have a parent",
            ));
        }
        if let Some(previous) = self.root.replace(id) {
            if previous != id {
                self.will_resign_active(previous);
            }
        }
        self.shown_plan = self.placeholder_plan();
        if let Some(mut view) = self.view.take() {
            self.register_reusable_views(view.as_mut());
            view.reload_data();
            self.view = Some(view);
        }
        Ok(())
    }

    pub fn root(&self) -> Option<DataSourceId> {
        self.root
    }

    /// Attach the host view. Registers reusable views and asks the host to
    /// reload.
    pub fn set_view(&mut self, mut view: Box<dyn CollectionView>) {
        self.affinity.debug_assert_same_thread();
        self.register_reusable_views(view.as_mut());
        view.reload_data();
        self.shown_plan = self.placeholder_plan();
        self.view = Some(view);
    }

    /// Detach and return the host view.
    pub fn take_view(&mut self) -> Option<Box<dyn CollectionView>> {
        self.view.take()
    }

    /// Destroy a detached data source and its descendants.
    pub fn remove_node(&mut self, id: DataSourceId) -> Result<()> {
        let node = self.node(id)?;
        if node.parent.is_some() || self.root == Some(id) {
            return Err(CollectionError::invalid_composition(
                "only detached data sources can be destroyed",
            ));
        }
        if node.active {
            self.will_resign_active(id);
        }
        for child in self.children_of(id) {
            if let Some(child_node) = self.nodes.get_mut(child) {
                child_node.parent = None;
            }
            self.remove_node(child)?;
        }
        if let Some(mut node) = self.nodes.remove(id) {
            node.loader.cancel();
        }
        tracing::debug!(target: targets::DATA_SOURCE, ?id, "data source destroyed");
        Ok(())
    }

    /// Whether `id` is still in the tree.
    pub fn contains(&self, id: DataSourceId) -> bool {
        self.nodes.contains_key(id)
    }

    // =========================================================================
    // Node properties
    // =========================================================================

    pub(crate) fn node(&self, id: DataSourceId) -> Result<&Node> {
        self.nodes
            .get(id)
            .ok_or_else(|| CollectionError::unknown_data_source(id))
    }

    pub(crate) fn node_mut(&mut self, id: DataSourceId) -> Result<&mut Node> {
        self.nodes
            .get_mut(id)
            .ok_or_else(|| CollectionError::unknown_data_source(id))
    }

    pub fn kind(&self, id: DataSourceId) -> Result<DataSourceKind> {
        Ok(match self.node(id)?.kind {
            NodeKind::Leaf(_) => DataSourceKind::Leaf,
            NodeKind::Composed { .. } => DataSourceKind::Composed,
            NodeKind::Segmented { .. } => DataSourceKind::Segmented,
        })
    }

    pub fn parent(&self, id: DataSourceId) -> Option<DataSourceId> {
        self.nodes.get(id).and_then(|node| node.parent)
    }

    pub fn title(&self, id: DataSourceId) -> Option<&str> {
        self.nodes.get(id).and_then(|node| node.title.as_deref())
    }

    pub fn set_title(&mut self, id: DataSourceId, title: impl Into<String>) -> Result<()> {
        self.node_mut(id)?.title = Some(title.into());
        Ok(())
    }

    pub fn allows_selection(&self, id: DataSourceId) -> bool {
        self.nodes.get(id).is_some_and(|node| node.allows_selection)
    }

    pub fn set_allows_selection(&mut self, id: DataSourceId, allows: bool) -> Result<()> {
        self.node_mut(id)?.allows_selection = allows;
        Ok(())
    }

    /// Whether the host should select items in the section at `section`.
    pub fn allows_selection_in_section(&self, section: usize) -> bool {
        match self.data_source_for_section(section) {
            Some(leaf) => self
                .ancestors_inclusive(leaf)
                .into_iter()
                .all(|id| self.allows_selection(id)),
            None => false,
        }
    }

    pub fn is_active(&self, id: DataSourceId) -> bool {
        self.nodes.get(id).is_some_and(|node| node.active)
    }

    pub fn load_state(&self, id: DataSourceId) -> Option<LoadState> {
        self.nodes.get(id).map(|node| node.loader.state())
    }

    pub fn loading_error(&self, id: DataSourceId) -> Option<&horizon_collection_core::LoadError> {
        self.nodes.get(id).and_then(|node| node.loader.loading_error())
    }

    // =========================================================================
    // Structure helpers
    // =========================================================================

    /// All children of a composed or segmented node, in order.
    pub(crate) fn children_of(&self, id: DataSourceId) -> Vec<DataSourceId> {
        match self.nodes.get(id).map(|node| &node.kind) {
            Some(NodeKind::Composed { mappings }) => {
                mappings.iter().map(SectionMapping::data_source).collect()
            }
            Some(NodeKind::Segmented { children, .. }) => children.clone(),
            _ => Vec::new(),
        }
    }

    /// Children whose sections are currently visible through `id`.
    pub(crate) fn visible_children_of(&self, id: DataSourceId) -> Vec<DataSourceId> {
        match self.nodes.get(id).map(|node| &node.kind) {
            Some(NodeKind::Composed { mappings }) => {
                mappings.iter().map(SectionMapping::data_source).collect()
            }
            Some(NodeKind::Segmented {
                children, selected, ..
            }) => selected.and_then(|index| children.get(index).copied()).into_iter().collect(),
            _ => Vec::new(),
        }
    }

    /// Number of sections `id` contributes in its own space.
    pub fn number_of_sections_of(&self, id: DataSourceId) -> usize {
        match self.nodes.get(id).map(|node| &node.kind) {
            Some(NodeKind::Leaf(content)) => content.number_of_sections(),
            Some(NodeKind::Composed { .. }) | Some(NodeKind::Segmented { .. }) => self
                .visible_children_of(id)
                .into_iter()
                .map(|child| self.number_of_sections_of(child))
                .sum(),
            None => 0,
        }
    }

    /// First section of `child` in `parent`'s space, if it is visible there.
    pub(crate) fn child_base(&self, parent: DataSourceId, child: DataSourceId) -> Option<usize> {
        let mut base = 0;
        for sibling in self.visible_children_of(parent) {
            if sibling == child {
                return Some(base);
            }
            base += self.number_of_sections_of(sibling);
        }
        None
    }

    /// First section of `id` in the root's space, if it is visible there.
    pub fn global_section_base(&self, id: DataSourceId) -> Option<usize> {
        let mut base = 0;
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            base += self.child_base(parent, current)?;
            current = parent;
        }
        (Some(current) == self.root).then_some(base)
    }

    /// `id` followed by its ancestors up to the top of its tree.
    pub(crate) fn ancestors_inclusive(&self, id: DataSourceId) -> Vec<DataSourceId> {
        let mut chain = vec![id];
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            chain.push(parent);
            current = parent;
        }
        chain
    }

    /// Whether `id` can reach the root through its parents.
    pub fn is_attached(&self, id: DataSourceId) -> bool {
        self.root.is_some_and(|root| self.ancestors_inclusive(id).last() == Some(&root))
    }

    /// Recompute the section mappings of a composed node.
    pub(crate) fn rebuild_mappings(&mut self, id: DataSourceId) {
        let children = self.children_of(id);
        let counts: Vec<usize> = children
            .iter()
            .map(|child| self.number_of_sections_of(*child))
            .collect();
        if let Some(Node {
            kind: NodeKind::Composed { mappings },
            ..
        }) = self.nodes.get_mut(id)
        {
            let mut base = 0;
            for (mapping, count) in mappings.iter_mut().zip(counts) {
                base = mapping.update_mapping_starting_at(base, count, |_| {});
            }
        }
    }

    /// Resolve a section of `id` to the leaf owning it and its local section.
    pub(crate) fn leaf_for_section(&self, id: DataSourceId, section: usize) -> Option<(DataSourceId, usize)> {
        match &self.nodes.get(id)?.kind {
            NodeKind::Leaf(content) => (section < content.number_of_sections()).then_some((id, section)),
            _ => {
                let mut base = 0;
                for child in self.visible_children_of(id) {
                    let count = self.number_of_sections_of(child);
                    if section < base + count {
                        return self.leaf_for_section(child, section - base);
                    }
                    base += count;
                }
                None
            }
        }
    }

    /// Translate a section of `id` into the space of `descendant`.
    pub(crate) fn local_section_in(&self, id: DataSourceId, section: usize, descendant: DataSourceId) -> Option<usize> {
        if id == descendant {
            return Some(section);
        }
        let mut base = 0;
        for child in self.visible_children_of(id) {
            let count = self.number_of_sections_of(child);
            if section < base + count {
                return self.local_section_in(child, section - base, descendant);
            }
            base += count;
        }
        None
    }

    pub(crate) fn content(&self, id: DataSourceId) -> Option<&dyn DataSourceContent> {
        match &self.nodes.get(id)?.kind {
            NodeKind::Leaf(content) => Some(content.as_ref()),
            _ => None,
        }
    }

    pub(crate) fn content_mut(&mut self, id: DataSourceId) -> Option<&mut Box<dyn DataSourceContent>> {
        match &mut self.nodes.get_mut(id)?.kind {
            NodeKind::Leaf(content) => Some(content),
            _ => None,
        }
    }

    /// Borrow the content of a leaf as its concrete type.
    pub fn leaf<T: DataSourceContent>(&self, id: DataSourceId) -> Option<&T> {
        let content: &dyn Any = self.content(id)?;
        content.downcast_ref::<T>()
    }

    // =========================================================================
    // Root queries (global space)
    // =========================================================================

    /// Sections of the root.
    pub fn number_of_sections(&self) -> usize {
        self.root.map_or(0, |root| self.number_of_sections_of(root))
    }

    /// Items the host should show in `section`. Zero while a placeholder
    /// covers the section.
    pub fn number_of_items_in_section(&self, section: usize) -> usize {
        if self.placeholder_plan().covers(section) {
            return 0;
        }
        self.content_items_in_section(section)
    }

    /// Items in `section` regardless of placeholders.
    pub fn content_items_in_section(&self, section: usize) -> usize {
        self.data_source_and_local_section(section)
            .and_then(|(leaf, local)| self.content(leaf).map(|content| content.number_of_items(local)))
            .unwrap_or(0)
    }

    /// The leaf owning a root section.
    pub fn data_source_for_section(&self, section: usize) -> Option<DataSourceId> {
        self.data_source_and_local_section(section).map(|(leaf, _)| leaf)
    }

    fn data_source_and_local_section(&self, section: usize) -> Option<(DataSourceId, usize)> {
        self.leaf_for_section(self.root?, section)
    }

    /// Translate a root path into the owning leaf's local space.
    pub fn local_index_path(&self, path: IndexPath) -> Option<(DataSourceId, IndexPath)> {
        let (leaf, local) = self.data_source_and_local_section(path.section_index()?)?;
        Some((leaf, IndexPath::new(local, path.item)))
    }

    /// Translate a leaf-local path into the root's space.
    pub fn global_index_path(&self, id: DataSourceId, local: IndexPath) -> Option<IndexPath> {
        let base = self.global_section_base(id)?;
        let section = local.section_index()?;
        (section < self.number_of_sections_of(id)).then(|| IndexPath::new(base + section, local.item))
    }

    pub fn item_at(&self, path: IndexPath) -> Option<Item> {
        let (leaf, local) = self.local_index_path(path)?;
        self.content(leaf)?.item(local)
    }

    /// Every root path at which `item` appears.
    pub fn index_paths_for_item(&self, item: &Item) -> Vec<IndexPath> {
        let Some(root) = self.root else {
            return Vec::new();
        };
        let mut paths = Vec::new();
        self.collect_index_paths(root, 0, item, &mut paths);
        paths
    }

    fn collect_index_paths(&self, id: DataSourceId, base: usize, item: &Item, paths: &mut Vec<IndexPath>) {
        if let Some(content) = self.content(id) {
            paths.extend(
                content
                    .index_paths_for_item(item)
                    .into_iter()
                    .filter_map(|local| local.section_index().map(|s| IndexPath::new(base + s, local.item))),
            );
            return;
        }
        let mut child_base = base;
        for child in self.visible_children_of(id) {
            self.collect_index_paths(child, child_base, item, paths);
            child_base += self.number_of_sections_of(child);
        }
    }

    pub fn primary_actions(&self, path: IndexPath) -> Vec<Action> {
        self.with_local(path, |content, local| content.primary_actions(local))
            .unwrap_or_default()
    }

    pub fn secondary_actions(&self, path: IndexPath) -> Vec<Action> {
        self.with_local(path, |content, local| content.secondary_actions(local))
            .unwrap_or_default()
    }

    pub fn can_edit_item(&self, path: IndexPath) -> bool {
        self.with_local(path, |content, local| content.can_edit_item(local))
            .unwrap_or(false)
    }

    pub fn can_move_item(&self, path: IndexPath) -> bool {
        self.with_local(path, |content, local| content.can_move_item(local))
            .unwrap_or(false)
    }

    /// Whether `from` may move to `to`. Moves never cross leaves.
    pub fn can_move_item_to(&self, from: IndexPath, to: IndexPath) -> bool {
        match (self.local_index_path(from), self.local_index_path(to)) {
            (Some((leaf, local_from)), Some((to_leaf, local_to))) if leaf == to_leaf => self
                .content(leaf)
                .is_some_and(|content| content.can_move_item_to(local_from, local_to)),
            _ => false,
        }
    }

    fn with_local<R>(&self, path: IndexPath, f: impl FnOnce(&dyn DataSourceContent, IndexPath) -> R) -> Option<R> {
        let (leaf, local) = self.local_index_path(path)?;
        let content = self.content(leaf)?;
        (local.item < content.number_of_items(local.section_index()?)).then(|| f(content, local))
    }
}

static_assertions::assert_impl_all!(DataSourceTree: Send);
static_assertions::assert_impl_all!(DataSourceId: Send, Sync, Copy);

#[cfg(test)]
mod tests {
    use super::*;

    fn two_leaf_tree() -> (DataSourceTree, DataSourceId, DataSourceId, DataSourceId) {
        let mut tree = DataSourceTree::default();
        let a = tree.add_leaf(BasicDataSource::new(vec![1, 2, 3]));
        let b = tree.add_leaf(BasicDataSource::new(vec![4, 5]));
        let root = tree.add_composed();
        tree.add_data_source(root, a).unwrap();
        tree.add_data_source(root, b).unwrap();
        tree.set_root(root).unwrap();
        (tree, root, a, b)
    }

    #[test]
    fn test_root_queries() {
        let (tree, root, a, b) = two_leaf_tree();
        assert_eq!(tree.number_of_sections(), 2);
        assert_eq!(tree.number_of_items_in_section(0), 3);
        assert_eq!(tree.number_of_items_in_section(1), 2);
        assert_eq!(tree.data_source_for_section(1), Some(b));
        assert_eq!(tree.global_section_base(a), Some(0));
        assert_eq!(tree.global_section_base(b), Some(1));
        assert_eq!(tree.global_section_base(root), Some(0));
        assert_eq!(
            tree.local_index_path(IndexPath::new(1, 1)),
            Some((b, IndexPath::new(0, 1)))
        );
        assert_eq!(tree.global_index_path(b, IndexPath::new(0, 1)), Some(IndexPath::new(1, 1)));
    }

    #[test]
    fn test_items_and_identity() {
        let (tree, _root, _a, _b) = two_leaf_tree();
        let item = tree.item_at(IndexPath::new(1, 0)).unwrap();
        assert_eq!(item.downcast_ref::<i32>(), Some(&4));
        assert_eq!(tree.index_paths_for_item(&item), vec![IndexPath::new(1, 0)]);
        assert!(tree.item_at(IndexPath::new(1, 5)).is_none());
        assert!(tree.item_at(IndexPath::new(7, 0)).is_none());
    }

    #[test]
    fn test_defaults_for_hooks() {
        let (tree, _root, _a, _b) = two_leaf_tree();
        assert!(tree.can_edit_item(IndexPath::new(0, 0)));
        assert!(!tree.can_move_item(IndexPath::new(0, 0)));
        assert!(tree.primary_actions(IndexPath::new(0, 0)).is_empty());
        assert!(!tree.can_edit_item(IndexPath::new(0, 9)));
    }

    #[test]
    fn test_root_cannot_have_parent() {
        let (mut tree, _root, a, _b) = two_leaf_tree();
        assert!(matches!(
            tree.set_root(a),
            Err(CollectionError::InvalidComposition(_))
        ));
    }

    #[test]
    fn test_selection_is_inherited() {
        let (mut tree, root, _a, _b) = two_leaf_tree();
        assert!(tree.allows_selection_in_section(0));
        tree.set_allows_selection(root, false).unwrap();
        assert!(!tree.allows_selection_in_section(0));
    }

    #[test]
    fn test_remove_detached_subtree() {
        let mut tree = DataSourceTree::default();
        let leaf = tree.add_leaf(BasicDataSource::new(vec!["x"]));
        let composed = tree.add_composed();
        tree.add_data_source(composed, leaf).unwrap();

        assert!(tree.remove_node(leaf).is_err());
        tree.remove_node(composed).unwrap();
        assert!(!tree.contains(leaf));
        assert!(!tree.contains(composed));
    }
}
