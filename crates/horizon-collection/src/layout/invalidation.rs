//! Layout invalidation contexts.
//!
//! An [`InvalidationContext`] tells the layout (and the host view) how much
//! of the current layout is stale:
//! - `invalidate_metrics` / `invalidate_layout_metrics` force a full pass
//! - `invalidate_layout_origin` only re-runs sticky-header positioning
//! - explicit item, supplementary and decoration lists mark single records
//!
//! Self-sizing and pinning accumulate into a context instead of
//! invalidating immediately, so the host can apply one invalidation per
//! frame.

use std::collections::BTreeSet;

use crate::index_path::IndexPath;
use crate::metrics::ElementKind;

/// What part of a layout must be recomputed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvalidationContext {
    /// Section metrics changed; re-run the full pass.
    pub invalidate_metrics: bool,
    /// Sizes or counts changed; re-run the full pass.
    pub invalidate_layout_metrics: bool,
    /// Only the content offset changed; recompute pinned headers.
    pub invalidate_layout_origin: bool,
    invalidated_items: BTreeSet<IndexPath>,
    invalidated_supplements: BTreeSet<(ElementKind, IndexPath)>,
    invalidated_decorations: BTreeSet<(ElementKind, IndexPath)>,
    /// Change in content height caused by self-sizing.
    pub content_size_adjustment: f32,
}

impl InvalidationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// A context that forces a full layout pass.
    pub fn everything() -> Self {
        Self {
            invalidate_metrics: true,
            invalidate_layout_metrics: true,
            ..Self::default()
        }
    }

    /// A context for a content offset change.
    pub fn origin() -> Self {
        Self {
            invalidate_layout_origin: true,
            ..Self::default()
        }
    }

    pub fn invalidate_item(&mut self, path: IndexPath) {
        self.invalidated_items.insert(path);
    }

    pub fn invalidate_supplement(&mut self, kind: ElementKind, path: IndexPath) {
        self.invalidated_supplements.insert((kind, path));
    }

    pub fn invalidate_decoration(&mut self, kind: ElementKind, path: IndexPath) {
        self.invalidated_decorations.insert((kind, path));
    }

    pub fn invalidated_items(&self) -> impl Iterator<Item = &IndexPath> {
        self.invalidated_items.iter()
    }

    pub fn invalidated_supplements(&self) -> impl Iterator<Item = (&ElementKind, &IndexPath)> {
        self.invalidated_supplements.iter().map(|(kind, path)| (kind, path))
    }

    pub fn invalidated_decorations(&self) -> impl Iterator<Item = (&ElementKind, &IndexPath)> {
        self.invalidated_decorations.iter().map(|(kind, path)| (kind, path))
    }

    /// Whether the item at `path` is explicitly invalidated.
    pub fn is_item_invalidated(&self, path: &IndexPath) -> bool {
        self.invalidated_items.contains(path)
    }

    /// Whether the supplementary element is explicitly invalidated.
    pub fn is_supplement_invalidated(&self, kind: &ElementKind, path: &IndexPath) -> bool {
        self.invalidated_supplements
            .iter()
            .any(|(k, p)| k == kind && p == path)
    }

    /// Whether the next layout needs a full pass.
    #[inline]
    pub fn requires_full_pass(&self) -> bool {
        self.invalidate_metrics || self.invalidate_layout_metrics
    }

    /// Whether nothing is invalidated.
    pub fn is_empty(&self) -> bool {
        !self.invalidate_metrics
            && !self.invalidate_layout_metrics
            && !self.invalidate_layout_origin
            && self.invalidated_items.is_empty()
            && self.invalidated_supplements.is_empty()
            && self.invalidated_decorations.is_empty()
            && self.content_size_adjustment == 0.0
    }

    /// Fold `other` into this context.
    pub fn merge(&mut self, other: InvalidationContext) {
        self.invalidate_metrics |= other.invalidate_metrics;
        self.invalidate_layout_metrics |= other.invalidate_layout_metrics;
        self.invalidate_layout_origin |= other.invalidate_layout_origin;
        self.invalidated_items.extend(other.invalidated_items);
        self.invalidated_supplements.extend(other.invalidated_supplements);
        self.invalidated_decorations.extend(other.invalidated_decorations);
        self.content_size_adjustment += other.content_size_adjustment;
    }

    /// Reset to an empty context.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Accumulates invalidations while suspended and releases them on resume.
///
/// Used by the tree to coalesce the supplementary-content updates of one
/// batch into a single host invalidation.
#[derive(Debug, Default)]
pub struct Invalidator {
    pending: InvalidationContext,
    suspended: bool,
    deferred: Vec<InvalidationContext>,
}

impl Invalidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an invalidation, deferring it while suspended.
    pub fn invalidate(&mut self, context: InvalidationContext) {
        if self.suspended {
            self.deferred.push(context);
        } else {
            self.pending.merge(context);
        }
    }

    /// Whether anything is waiting to be delivered.
    #[inline]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Take the accumulated context.
    pub fn take(&mut self) -> InvalidationContext {
        std::mem::take(&mut self.pending)
    }

    pub fn suspend(&mut self) {
        self.suspended = true;
    }

    /// Resume and fold deferred invalidations into the pending context.
    pub fn resume(&mut self) {
        self.suspended = false;
        for context in std::mem::take(&mut self.deferred) {
            self.pending.merge(context);
        }
    }

    #[inline]
    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// Suspend until the returned guard drops.
    pub fn suspend_guard(&mut self) -> SuspendGuard<'_> {
        SuspendGuard::new(self)
    }
}

/// RAII guard for suspending invalidation.
///
/// ```
/// use horizon_collection::layout::{InvalidationContext, Invalidator};
///
/// let mut invalidator = Invalidator::new();
/// {
///     let mut guard = invalidator.suspend_guard();
///     guard.invalidate(InvalidationContext::origin());
/// }
/// assert!(invalidator.has_pending());
/// ```
pub struct SuspendGuard<'a> {
    invalidator: &'a mut Invalidator,
}

impl<'a> SuspendGuard<'a> {
    pub fn new(invalidator: &'a mut Invalidator) -> Self {
        invalidator.suspend();
        Self { invalidator }
    }
}

impl std::ops::Deref for SuspendGuard<'_> {
    type Target = Invalidator;

    fn deref(&self) -> &Invalidator {
        self.invalidator
    }
}

impl std::ops::DerefMut for SuspendGuard<'_> {
    fn deref_mut(&mut self) -> &mut Invalidator {
        self.invalidator
    }
}

impl Drop for SuspendGuard<'_> {
    fn drop(&mut self) {
        self.invalidator.resume();
    }
}
