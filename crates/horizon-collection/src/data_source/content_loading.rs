//! Content loading, activation and load-state aggregation.

use std::any::Any;

use horizon_collection_core::logging::targets;
use horizon_collection_core::{LoadError, Result};

use super::{DataSourceId, DataSourceTree, LoadStateChange, NodeKind};
use crate::change::Notifier;
use crate::loading::{ContentUpdate, LoadCompletion, LoadOutcome, LoadState};

impl DataSourceTree {
    /// Start loading `id`. Composed nodes load every child; segmented nodes
    /// load their selected child.
    ///
    /// Completions that arrive synchronously are applied before returning.
    pub fn load_content(&mut self, id: DataSourceId) -> Result<()> {
        self.start_load(id)?;
        if self.update_depth == 0 {
            self.process_load_completions();
        }
        Ok(())
    }

    pub(crate) fn start_load(&mut self, id: DataSourceId) -> Result<()> {
        self.node(id)?;
        self.begin_update();
        let result = self.start_load_inner(id);
        self.end_update();
        result
    }

    fn start_load_inner(&mut self, id: DataSourceId) -> Result<()> {
        let sender = self.completion_tx.clone();
        let node = self.node_mut(id)?;
        node.interrupted = false;
        let (token, changed) = node.loader.begin_loading(id, &sender)?;
        self.did_change_state(id, changed);
        self.child_will_load(id);

        if let Some(content) = self.content_mut(id) {
            content.load_content(token);
            return Ok(());
        }
        let children = self.visible_children_of(id);
        if children.is_empty() {
            token.done();
        }
        for child in children {
            self.start_load(child)?;
        }
        Ok(())
    }

    /// Mark `id` for a coalesced reload on the next
    /// [`process_load_completions`](Self::process_load_completions).
    pub fn set_needs_load_content(&mut self, id: DataSourceId) {
        if !self.needs_load.contains(&id) {
            self.needs_load.push(id);
        }
    }

    /// Drop loaded content and return to `Initial`, cancelling any load.
    pub fn reset_content(&mut self, id: DataSourceId) -> Result<()> {
        self.begin_update();
        let result = self.reset_content_inner(id);
        self.end_update();
        result
    }

    fn reset_content_inner(&mut self, id: DataSourceId) -> Result<()> {
        let node = self.node_mut(id)?;
        let from = node.loader.state();
        node.loader.reset();
        node.interrupted = false;
        if let NodeKind::Leaf(content) = &mut node.kind {
            content.reset_content();
        }
        if from != LoadState::Initial {
            self.emit_state_change(id, from, LoadState::Initial);
        }
        for child in self.children_of(id) {
            self.reset_content_inner(child)?;
        }
        Ok(())
    }

    /// Run `callback` once `id` next reaches a terminal load state, or now
    /// if it already has.
    pub fn when_loaded<F>(&mut self, id: DataSourceId, callback: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let node = self.node_mut(id)?;
        if node.loader.state().is_terminal() && node.loader.current_token().is_none() {
            callback();
        } else {
            node.loader.push_when_loaded(Box::new(callback));
        }
        Ok(())
    }

    /// Apply every queued load completion and start pending reloads.
    ///
    /// Call on the main sequence whenever loaders may have finished on other
    /// threads. Returns the number of completions applied.
    pub fn process_load_completions(&mut self) -> usize {
        self.affinity.debug_assert_same_thread();
        let mut applied = 0;
        loop {
            for id in std::mem::take(&mut self.needs_load) {
                if self.contains(id) {
                    if let Err(error) = self.start_load(id) {
                        tracing::warn!(target: targets::LOAD, ?id, %error, "deferred load failed to start");
                    }
                }
            }
            let Ok(completion) = self.completion_rx.try_recv() else {
                if self.needs_load.is_empty() {
                    break;
                }
                continue;
            };
            self.apply_completion(completion);
            applied += 1;
        }
        applied
    }

    fn apply_completion(&mut self, completion: LoadCompletion) {
        let LoadCompletion {
            data_source: id,
            generation,
            outcome,
        } = completion;
        let Some(node) = self.nodes.get(id) else {
            tracing::debug!(target: targets::LOAD, ?id, "completion for a destroyed data source");
            return;
        };
        if !node.loader.is_current(generation) {
            tracing::debug!(target: targets::LOAD, ?id, generation, "ignoring superseded completion");
            return;
        }
        tracing::debug!(target: targets::LOAD, ?id, generation, ?outcome, "applying load completion");

        self.begin_update();
        let (state, error) = match outcome {
            LoadOutcome::Ignore => {
                if let Some(node) = self.nodes.get_mut(id) {
                    node.loader.end_ignored(generation);
                }
                self.end_update();
                return;
            }
            LoadOutcome::Loaded(update) => {
                self.apply_content_update(id, update);
                (LoadState::Loaded, None)
            }
            LoadOutcome::NoContent(update) => {
                self.apply_content_update(id, update);
                (LoadState::NoContent, None)
            }
            LoadOutcome::Error(error) => (LoadState::Error, Some(error)),
        };
        self.finish_loading(id, generation, state, error);
        self.end_update();
    }

    fn apply_content_update(&mut self, id: DataSourceId, update: Option<ContentUpdate>) {
        let Some(update) = update else {
            return;
        };
        let mut notifier = Notifier::new();
        let applied = self.with_leaf_content(id, |content| {
            let content: &mut dyn Any = content;
            update(content, &mut notifier)
        });
        match applied {
            Ok(()) => self.dispatch(id, notifier.take()),
            Err(_) => tracing::warn!(target: targets::LOAD, ?id, "content update for a data source without content"),
        }
    }

    /// Move `id` into a terminal state, run its callbacks and let its parent
    /// re-aggregate.
    fn finish_loading(&mut self, id: DataSourceId, generation: u64, state: LoadState, error: Option<LoadError>) {
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        match node.loader.end_loading(generation, state, error) {
            Ok(changed) => self.did_change_state(id, changed),
            Err(error) => {
                tracing::warn!(target: targets::LOAD, ?id, %error, "load finished in an unexpected state");
                return;
            }
        }
        if let Some(node) = self.nodes.get_mut(id) {
            for callback in node.loader.take_when_loaded() {
                callback();
            }
        }
        if let Some(parent) = self.parent(id) {
            self.aggregate(parent);
        }
    }

    /// Fold the children's states into a composed or segmented parent.
    fn aggregate(&mut self, id: DataSourceId) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        if !node.loader.state().is_loading() {
            return;
        }
        let Some(generation) = node.loader.current_token().map(|token| token.generation()) else {
            return;
        };
        let Some((state, error)) = self.aggregate_states(id) else {
            return;
        };
        tracing::debug!(target: targets::LOAD, ?id, %state, "children finished loading");
        self.finish_loading(id, generation, state, error);
    }

    /// The state a parent takes once every visible child is terminal: the
    /// first error wins, all-`NoContent` is `NoContent`, anything else
    /// (including no children) is `Loaded`.
    fn aggregate_states(&self, id: DataSourceId) -> Option<(LoadState, Option<LoadError>)> {
        let states: Vec<(DataSourceId, LoadState)> = self
            .visible_children_of(id)
            .into_iter()
            .filter_map(|child| self.load_state(child).map(|state| (child, state)))
            .collect();
        if states.iter().any(|(_, state)| !state.is_terminal()) {
            return None;
        }
        Some(match states.iter().find(|(_, state)| *state == LoadState::Error) {
            Some((child, _)) => (LoadState::Error, self.loading_error(*child).cloned()),
            None if !states.is_empty() && states.iter().all(|(_, s)| *s == LoadState::NoContent) => {
                (LoadState::NoContent, None)
            }
            None => (LoadState::Loaded, None),
        })
    }

    /// Bring a finished parent in line with children that changed without
    /// loading, e.g. after a segment switch to an already loaded child.
    pub(crate) fn refresh_aggregate(&mut self, id: DataSourceId) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        let current = node.loader.state();
        if !current.is_terminal() {
            return;
        }
        let Some((state, error)) = self.aggregate_states(id) else {
            return;
        };
        if state == current && error.as_ref() == self.loading_error(id) {
            return;
        }
        let sender = self.completion_tx.clone();
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        match node.loader.begin_loading(id, &sender) {
            Ok((token, changed)) => {
                self.did_change_state(id, changed);
                self.finish_loading(id, token.generation(), state, error);
                if let Some(parent) = self.parent(id) {
                    self.refresh_aggregate(parent);
                }
            }
            Err(error) => tracing::warn!(target: targets::LOAD, ?id, %error, "could not re-aggregate"),
        }
    }

    /// A descendant started loading: move finished ancestors to `Refreshing`
    /// so they re-aggregate when it completes.
    fn child_will_load(&mut self, id: DataSourceId) {
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            if self.child_base(parent, current).is_none() {
                return;
            }
            let sender = self.completion_tx.clone();
            let Some(node) = self.nodes.get_mut(parent) else {
                return;
            };
            if node.loader.state().is_terminal() {
                match node.loader.begin_loading(parent, &sender) {
                    Ok((_, changed)) => self.did_change_state(parent, changed),
                    Err(error) => {
                        tracing::warn!(target: targets::LOAD, ?parent, %error, "could not refresh parent");
                        return;
                    }
                }
            } else if node.loader.state() == LoadState::Initial {
                return;
            }
            current = parent;
        }
    }

    pub(crate) fn did_change_state(&mut self, id: DataSourceId, changed: Option<(LoadState, LoadState)>) {
        if let Some((from, to)) = changed {
            self.emit_state_change(id, from, to);
        }
    }

    fn emit_state_change(&self, id: DataSourceId, from: LoadState, to: LoadState) {
        tracing::debug!(target: targets::LOAD, ?id, %from, %to, "load state changed");
        self.load_state_changed().emit(LoadStateChange {
            data_source: id,
            from,
            to,
        });
    }

    // =========================================================================
    // Activation
    // =========================================================================

    /// Activate `id` and the children it shows. Loads anything still
    /// `Initial` or interrupted by an earlier resignation.
    pub fn did_become_active(&mut self, id: DataSourceId) {
        self.begin_update();
        self.activate(id);
        self.end_update();
        if self.update_depth == 0 {
            self.process_load_completions();
        }
    }

    pub(crate) fn activate(&mut self, id: DataSourceId) {
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        node.active = true;
        let needs_load = node.loader.state() == LoadState::Initial || node.interrupted;
        if needs_load {
            if let Err(error) = self.start_load(id) {
                tracing::warn!(target: targets::LOAD, ?id, %error, "activation load failed");
            }
        }
        for child in self.visible_children_of(id) {
            self.activate(child);
        }
    }

    /// Deactivate `id` and its active children, cancelling in-flight loads.
    pub fn will_resign_active(&mut self, id: DataSourceId) {
        for child in self.children_of(id) {
            if self.is_active(child) {
                self.will_resign_active(child);
            }
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.active = false;
            if node.loader.cancel() {
                node.interrupted = true;
                tracing::debug!(target: targets::LOAD, ?id, "resigned with a load in flight");
            }
        }
    }
}
