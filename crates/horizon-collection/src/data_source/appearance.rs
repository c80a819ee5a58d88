//! Metrics, keyed headers and supplementary views.
//!
//! Metrics layer from the environment down to each leaf section:
//!
//! 1. `Environment::default_metrics`
//! 2. every ancestor's default metrics, then its per-section metrics
//! 3. the node's own default metrics, then its per-section metrics
//!
//! Keyed headers of the root go to the global section; keyed headers of any
//! other node are prepended to its first section.

use std::collections::BTreeSet;

use horizon_collection_core::logging::{span_names, targets};
use horizon_collection_core::{PerfSpan, Result};

use super::{DataSourceId, DataSourceTree, Node};
use crate::index_path::{IndexPath, Section};
use crate::layout::{InvalidationContext, LayoutSnapshot, SectionSnapshot};
use crate::metrics::{
    ConfigureContext, ElementKind, ResolvedSectionMetrics, SectionMetrics, SupplementaryItem,
};
use crate::view::{CollectionView, ReusableView};

/// Copy of `metrics` whose supplements record `owner` as their declarer.
fn stamped(metrics: &SectionMetrics, owner: DataSourceId) -> SectionMetrics {
    let mut metrics = metrics.clone();
    for item in metrics.headers.iter_mut().chain(metrics.footers.iter_mut()) {
        *item = item.clone().owned_by(owner);
    }
    metrics
}

fn keyed_headers(node: &Node, owner: DataSourceId) -> Vec<SupplementaryItem> {
    node.headers
        .iter()
        .map(|(_, item)| item.clone().owned_by(owner))
        .collect()
}

fn register_once(
    registered: &mut BTreeSet<(String, String, String)>,
    item: &SupplementaryItem,
    view: &mut dyn CollectionView,
) {
    let key = (
        item.view_class_tag.clone(),
        item.reuse_identifier.clone(),
        item.kind.as_str().to_string(),
    );
    if registered.insert(key) {
        view.register_class(&item.view_class_tag, &item.reuse_identifier, &item.kind);
    }
}

impl DataSourceTree {
    // =========================================================================
    // Metrics
    // =========================================================================

    pub fn default_metrics(&self, id: DataSourceId) -> Option<&SectionMetrics> {
        self.nodes.get(id).map(|node| &node.default_metrics)
    }

    /// Replace the metrics every section of `id` starts from.
    pub fn set_default_metrics(&mut self, id: DataSourceId, metrics: SectionMetrics) -> Result<()> {
        self.node_mut(id)?.default_metrics = metrics;
        self.invalidate_metrics();
        Ok(())
    }

    /// Metrics of the global section. Only the root's are used.
    pub fn global_metrics(&self, id: DataSourceId) -> Option<&SectionMetrics> {
        self.nodes.get(id).map(|node| &node.global_metrics)
    }

    pub fn set_global_metrics(&mut self, id: DataSourceId, metrics: SectionMetrics) -> Result<()> {
        self.node_mut(id)?.global_metrics = metrics;
        self.invalidate_metrics();
        Ok(())
    }

    /// Customised metrics of local `section`, if any.
    pub fn metrics_for_section(&self, id: DataSourceId, section: usize) -> Option<&SectionMetrics> {
        self.nodes.get(id)?.section_metrics.get(&section)
    }

    /// Customise local `section` of `id`. Unset fields inherit the defaults.
    pub fn set_metrics_for_section(
        &mut self,
        id: DataSourceId,
        section: usize,
        metrics: SectionMetrics,
    ) -> Result<()> {
        self.node_mut(id)?.section_metrics.insert(section, metrics);
        self.invalidate_metrics();
        Ok(())
    }

    /// Append a header shown on every section of `id`.
    pub fn new_section_header(&mut self, id: DataSourceId, header: SupplementaryItem) -> Result<()> {
        self.node_mut(id)?.default_metrics.headers.push(header);
        self.invalidate_metrics();
        Ok(())
    }

    /// Append a footer shown on every section of `id`.
    pub fn new_section_footer(&mut self, id: DataSourceId, footer: SupplementaryItem) -> Result<()> {
        self.node_mut(id)?.default_metrics.footers.push(footer);
        self.invalidate_metrics();
        Ok(())
    }

    /// Append a header to local `section` only.
    pub fn new_header_for_section(
        &mut self,
        id: DataSourceId,
        section: usize,
        header: SupplementaryItem,
    ) -> Result<()> {
        self.node_mut(id)?
            .section_metrics
            .entry(section)
            .or_default()
            .headers
            .push(header);
        self.invalidate_metrics();
        Ok(())
    }

    pub fn new_footer_for_section(
        &mut self,
        id: DataSourceId,
        section: usize,
        footer: SupplementaryItem,
    ) -> Result<()> {
        self.node_mut(id)?
            .section_metrics
            .entry(section)
            .or_default()
            .footers
            .push(footer);
        self.invalidate_metrics();
        Ok(())
    }

    // =========================================================================
    // Keyed headers
    // =========================================================================

    /// Add a header under `key`. An existing header with the same key is
    /// replaced in place, keeping its position.
    pub fn new_header(&mut self, id: DataSourceId, key: impl Into<String>, header: SupplementaryItem) -> Result<()> {
        let key = key.into();
        let node = self.node_mut(id)?;
        match node.headers.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => *slot = header,
            None => node.headers.push((key, header)),
        }
        self.invalidate_metrics();
        Ok(())
    }

    pub fn header_for_key(&self, id: DataSourceId, key: &str) -> Option<&SupplementaryItem> {
        self.nodes
            .get(id)?
            .headers
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, header)| header)
    }

    /// Replace the header under `key`. Returns the previous header, or
    /// `None` (and changes nothing) when no header has that key.
    pub fn replace_header_for_key(
        &mut self,
        id: DataSourceId,
        key: &str,
        header: SupplementaryItem,
    ) -> Result<Option<SupplementaryItem>> {
        let node = self.node_mut(id)?;
        let previous = node
            .headers
            .iter_mut()
            .find(|(existing, _)| existing == key)
            .map(|(_, slot)| std::mem::replace(slot, header));
        if previous.is_some() {
            self.invalidate_metrics();
        }
        Ok(previous)
    }

    pub fn remove_header_for_key(&mut self, id: DataSourceId, key: &str) -> Result<Option<SupplementaryItem>> {
        let node = self.node_mut(id)?;
        let removed = node
            .headers
            .iter()
            .position(|(existing, _)| existing == key)
            .map(|index| node.headers.remove(index).1);
        if removed.is_some() {
            self.invalidate_metrics();
        }
        Ok(removed)
    }

    /// Ask the layout for a full pass once the current batch is delivered.
    pub(crate) fn invalidate_metrics(&mut self) {
        self.begin_update();
        self.invalidator.invalidate(InvalidationContext::everything());
        self.end_update();
    }

    // =========================================================================
    // Snapshots
    // =========================================================================

    /// Effective metrics of every root section, plus the global section.
    ///
    /// Supplements carry the id of the data source that declared them.
    pub fn snapshot_metrics(&self) -> (Option<SectionMetrics>, Vec<SectionMetrics>) {
        let Some(root) = self.root else {
            return (None, Vec::new());
        };
        let inherited = vec![self.env.default_metrics.clone(); self.number_of_sections_of(root)];
        let mut sections = Vec::new();
        self.collect_section_metrics(root, inherited, &mut sections);

        let global = self.nodes.get(root).and_then(|node| {
            let mut global = SectionMetrics::new();
            global.headers = keyed_headers(node, root);
            global.apply(&stamped(&node.global_metrics, root));
            (!global.headers.is_empty() || !global.footers.is_empty()).then_some(global)
        });
        (global, sections)
    }

    fn collect_section_metrics(
        &self,
        id: DataSourceId,
        inherited: Vec<SectionMetrics>,
        out: &mut Vec<SectionMetrics>,
    ) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        let defaults = stamped(&node.default_metrics, id);
        let mut sections: Vec<SectionMetrics> = inherited
            .into_iter()
            .enumerate()
            .map(|(section, mut metrics)| {
                if section == 0 && self.root != Some(id) && !node.headers.is_empty() {
                    let mut headers = keyed_headers(node, id);
                    headers.append(&mut metrics.headers);
                    metrics.headers = headers;
                }
                metrics.apply(&defaults);
                if let Some(custom) = node.section_metrics.get(&section) {
                    metrics.apply(&stamped(custom, id));
                }
                metrics
            })
            .collect();

        if self.content(id).is_some() {
            out.append(&mut sections);
            return;
        }
        let mut base = 0;
        for child in self.visible_children_of(id) {
            let count = self.number_of_sections_of(child);
            let end = (base + count).min(sections.len());
            let start = base.min(end);
            self.collect_section_metrics(child, sections[start..end].to_vec(), out);
            base += count;
        }
    }

    /// Everything the grid layout needs for one pass.
    pub fn layout_snapshot(&self) -> LayoutSnapshot {
        let _span = PerfSpan::new(span_names::SNAPSHOT);
        let (global, sections) = self.snapshot_metrics();
        let plan = self.placeholder_plan();
        let sections = sections
            .into_iter()
            .enumerate()
            .map(|(section, metrics)| {
                let placeholder = plan.range_for_section(section).cloned();
                SectionSnapshot {
                    metrics: metrics.resolve(),
                    number_of_items: if placeholder.is_some() {
                        0
                    } else {
                        self.content_items_in_section(section)
                    },
                    placeholder,
                }
            })
            .collect::<Vec<_>>();
        tracing::trace!(target: targets::LAYOUT, sections = sections.len(), "layout snapshot taken");
        LayoutSnapshot {
            global: global.map(|metrics| metrics.resolve()),
            sections,
        }
    }

    /// Resolved metrics of root `section`, or of the global section.
    pub fn resolved_metrics(&self, section: Section) -> Option<ResolvedSectionMetrics> {
        let (global, sections) = self.snapshot_metrics();
        match section {
            Section::Global => global.map(|metrics| metrics.resolve()),
            Section::Index(index) => sections.get(index).map(SectionMetrics::resolve),
        }
    }

    // =========================================================================
    // Reusable views
    // =========================================================================

    /// Register every supplementary view class declared anywhere in the tree,
    /// then let each leaf register its cells.
    pub fn register_reusable_views(&self, view: &mut dyn CollectionView) {
        let mut registered = BTreeSet::new();
        let defaults = &self.env.default_metrics;
        for item in defaults.headers.iter().chain(&defaults.footers) {
            register_once(&mut registered, item, view);
        }
        for (_, node) in &self.nodes {
            let metrics = std::iter::once(&node.default_metrics)
                .chain(std::iter::once(&node.global_metrics))
                .chain(node.section_metrics.values());
            for metrics in metrics {
                for item in metrics.headers.iter().chain(&metrics.footers) {
                    register_once(&mut registered, item, view);
                }
            }
            for (_, item) in &node.headers {
                register_once(&mut registered, item, view);
            }
        }
        for (id, _) in &self.nodes {
            if let Some(content) = self.content(id) {
                content.register_reusable_views(view);
            }
        }
    }

    /// Dequeue the supplementary view of `kind` at root `path` and run its
    /// `configure` callback. `path.item` is the element's index among the
    /// section's supplements of that kind.
    pub fn dequeue_supplementary(&mut self, kind: &ElementKind, path: IndexPath) -> Option<ReusableView> {
        let metrics = self.resolved_metrics(path.section)?;
        let item = metrics.supplements(kind).nth(path.item)?.clone();
        let context = item.owner().map(|owner| ConfigureContext {
            data_source: owner,
            local_path: match path.section {
                Section::Global => path,
                Section::Index(section) => self
                    .root
                    .and_then(|root| self.local_section_in(root, section, owner))
                    .map_or(path, |local| IndexPath::new(local, path.item)),
            },
        });

        let view = self.view.as_mut()?;
        let mut reusable = view.dequeue(&item.reuse_identifier, kind, path);
        if let (Some(configure), Some(context)) = (&item.configure, context) {
            configure(reusable.as_mut(), &context);
        }
        tracing::trace!(target: targets::DATA_SOURCE, ?path, kind = kind.as_str(), "supplementary view dequeued");
        Some(reusable)
    }
}
