//! Content-loading state and load tokens.
//!
//! Every data source owns a [`LoadCoordinator`]: a [`StateMachine`] over
//! [`LoadState`] plus the bookkeeping for the load in flight. Starting a load
//! hands the data source a [`LoadToken`]. The token may travel to another
//! thread; completing it only enqueues a [`LoadCompletion`] on the tree's
//! channel, and the tree applies it later on the main sequence.
//!
//! Starting a new load supersedes the outstanding token. A superseded
//! token's completion is dropped entirely, update closure included.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::Sender;
use horizon_collection_core::logging::targets;
use horizon_collection_core::{LoadError, Result, Signal, StateMachine, StateMachineDelegate};

use crate::change::Notifier;
use crate::data_source::DataSourceId;

/// Content-loading state of a data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LoadState {
    /// Created, never loaded.
    #[default]
    Initial,
    /// First load in progress; nothing to show yet.
    Loading,
    /// Reloading while previous content stays visible.
    Refreshing,
    Loaded,
    NoContent,
    Error,
}

impl LoadState {
    /// Whether a load has finished in this state.
    pub fn is_terminal(self) -> bool {
        matches!(self, LoadState::Loaded | LoadState::NoContent | LoadState::Error)
    }

    /// Whether a load is in flight in this state.
    pub fn is_loading(self) -> bool {
        matches!(self, LoadState::Loading | LoadState::Refreshing)
    }

    /// The transition table.
    pub fn transitions() -> [(LoadState, &'static [LoadState]); 6] {
        use LoadState::*;
        [
            (Initial, &[Loading]),
            (Loading, &[Loaded, NoContent, Error]),
            (Refreshing, &[Loaded, NoContent, Error]),
            (Loaded, &[Refreshing, NoContent, Error]),
            (NoContent, &[Refreshing, Loaded, Error]),
            (Error, &[Loading, Refreshing, NoContent, Loaded]),
        ]
    }
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoadState::Initial => "Initial",
            LoadState::Loading => "Loading",
            LoadState::Refreshing => "Refreshing",
            LoadState::Loaded => "Loaded",
            LoadState::NoContent => "NoContent",
            LoadState::Error => "Error",
        };
        f.write_str(name)
    }
}

/// A closure run against leaf content when a load completes.
///
/// Receives the leaf content as `&mut dyn Any` and a notifier for the change
/// events it causes.
pub type ContentUpdate = Box<dyn FnOnce(&mut dyn Any, &mut Notifier) + Send>;

/// How a load finished.
pub enum LoadOutcome {
    /// Leave the state alone.
    Ignore,
    Loaded(Option<ContentUpdate>),
    NoContent(Option<ContentUpdate>),
    Error(LoadError),
}

impl LoadOutcome {
    /// The state this outcome drives the node into, if any.
    pub fn target_state(&self) -> Option<LoadState> {
        match self {
            LoadOutcome::Ignore => None,
            LoadOutcome::Loaded(_) => Some(LoadState::Loaded),
            LoadOutcome::NoContent(_) => Some(LoadState::NoContent),
            LoadOutcome::Error(_) => Some(LoadState::Error),
        }
    }
}

impl fmt::Debug for LoadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadOutcome::Ignore => f.write_str("Ignore"),
            LoadOutcome::Loaded(update) => write!(f, "Loaded(update: {})", update.is_some()),
            LoadOutcome::NoContent(update) => write!(f, "NoContent(update: {})", update.is_some()),
            LoadOutcome::Error(error) => write!(f, "Error({error})"),
        }
    }
}

/// A finished load waiting to be applied on the main sequence.
#[derive(Debug)]
pub struct LoadCompletion {
    pub data_source: DataSourceId,
    pub generation: u64,
    pub outcome: LoadOutcome,
}

struct TokenInner {
    data_source: DataSourceId,
    generation: u64,
    cancelled: AtomicBool,
    completed: AtomicBool,
    sender: Sender<LoadCompletion>,
}

/// Handle for one in-flight load.
///
/// Cloneable and `Send`, so a loader can finish on any thread. Exactly one
/// completion method should be called, once.
#[derive(Clone)]
pub struct LoadToken {
    inner: Arc<TokenInner>,
}

impl fmt::Debug for LoadToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadToken")
            .field("data_source", &self.inner.data_source)
            .field("generation", &self.inner.generation)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl LoadToken {
    pub(crate) fn new(
        data_source: DataSourceId,
        generation: u64,
        sender: Sender<LoadCompletion>,
    ) -> Self {
        Self {
            inner: Arc::new(TokenInner {
                data_source,
                generation,
                cancelled: AtomicBool::new(false),
                completed: AtomicBool::new(false),
                sender,
            }),
        }
    }

    /// The data source being loaded.
    pub fn data_source(&self) -> DataSourceId {
        self.inner.data_source
    }

    /// Load generation; increases with every load of the same node.
    pub fn generation(&self) -> u64 {
        self.inner.generation
    }

    /// Whether a newer load or deactivation superseded this one.
    ///
    /// Long-running loaders should poll this and stop early.
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Whether a completion method has been called.
    pub fn is_completed(&self) -> bool {
        self.inner.completed.load(Ordering::Acquire)
    }

    pub(crate) fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
    }

    /// Finish with content and no update.
    pub fn done(&self) {
        self.complete(LoadOutcome::Loaded(None));
    }

    /// Finish with an error.
    pub fn done_with_error(&self, error: LoadError) {
        self.complete(LoadOutcome::Error(error));
    }

    /// Finish with content, applying `update` to the leaf content of type `T`.
    pub fn update_with_content<T, F>(&self, update: F)
    where
        T: Any,
        F: FnOnce(&mut T, &mut Notifier) + Send + 'static,
    {
        self.complete(LoadOutcome::Loaded(Some(typed_update(update))));
    }

    /// Finish without content, applying `update` to the leaf content of type `T`.
    pub fn update_with_no_content<T, F>(&self, update: F)
    where
        T: Any,
        F: FnOnce(&mut T, &mut Notifier) + Send + 'static,
    {
        self.complete(LoadOutcome::NoContent(Some(typed_update(update))));
    }

    /// Finish without content and no update.
    pub fn done_with_no_content(&self) {
        self.complete(LoadOutcome::NoContent(None));
    }

    /// Finish without changing the load state.
    pub fn ignore(&self) {
        self.complete(LoadOutcome::Ignore);
    }

    fn complete(&self, outcome: LoadOutcome) {
        if self.inner.completed.swap(true, Ordering::AcqRel) {
            debug_assert!(false, "load token completed twice");
            tracing::warn!(target: targets::LOAD, token = ?self, "load token completed twice");
            return;
        }
        if self.is_cancelled() {
            tracing::debug!(target: targets::LOAD, token = ?self, ?outcome, "dropping completion of superseded load");
            return;
        }
        let completion = LoadCompletion {
            data_source: self.inner.data_source,
            generation: self.inner.generation,
            outcome,
        };
        if self.inner.sender.send(completion).is_err() {
            tracing::debug!(target: targets::LOAD, "load completed after its tree was dropped");
        }
    }
}

fn typed_update<T, F>(update: F) -> ContentUpdate
where
    T: Any,
    F: FnOnce(&mut T, &mut Notifier) + Send + 'static,
{
    Box::new(move |content: &mut dyn Any, notifier: &mut Notifier| {
        match content.downcast_mut::<T>() {
            Some(content) => update(content, notifier),
            None => tracing::warn!(
                target: targets::LOAD,
                expected = std::any::type_name::<T>(),
                "load update does not match the leaf content type"
            ),
        }
    })
}

/// Absorbs a refresh requested while the first load is still running.
struct LoadTransitions;

impl StateMachineDelegate<LoadState> for LoadTransitions {
    fn missing_transition(&mut self, from: LoadState, to: LoadState) -> Option<LoadState> {
        match (from, to) {
            (LoadState::Loading, LoadState::Refreshing) => Some(from),
            _ => None,
        }
    }
}

/// Load state and in-flight token of one data source.
pub struct LoadCoordinator {
    machine: StateMachine<LoadState>,
    generation: u64,
    current: Option<LoadToken>,
    loading_error: Option<LoadError>,
    when_loaded: Vec<Box<dyn FnOnce() + Send>>,
    state_changed: Signal<(LoadState, LoadState)>,
}

impl fmt::Debug for LoadCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadCoordinator")
            .field("state", &self.state())
            .field("generation", &self.generation)
            .field("in_flight", &self.current.is_some())
            .field("loading_error", &self.loading_error)
            .finish()
    }
}

impl Default for LoadCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadCoordinator {
    pub fn new() -> Self {
        Self {
            machine: StateMachine::new(LoadState::Initial, LoadState::transitions()),
            generation: 0,
            current: None,
            loading_error: None,
            when_loaded: Vec::new(),
            state_changed: Signal::new(),
        }
    }

    #[inline]
    pub fn state(&self) -> LoadState {
        self.machine.current()
    }

    /// Emitted with `(from, to)` after every state change.
    pub fn state_changed(&self) -> &Signal<(LoadState, LoadState)> {
        &self.state_changed
    }

    /// The error from the last failed load.
    pub fn loading_error(&self) -> Option<&LoadError> {
        self.loading_error.as_ref()
    }

    /// The token of the load in flight.
    pub fn current_token(&self) -> Option<&LoadToken> {
        self.current.as_ref()
    }

    /// Whether `generation` is the load in flight.
    pub fn is_current(&self, generation: u64) -> bool {
        self.current
            .as_ref()
            .is_some_and(|token| token.generation() == generation && !token.is_cancelled())
    }

    /// Start a load: supersede the previous token, move to `Loading` (from
    /// `Initial`) or `Refreshing`, and mint a new token.
    ///
    /// Returns the token and the transition taken, if the state changed.
    pub(crate) fn begin_loading(
        &mut self,
        data_source: DataSourceId,
        sender: &Sender<LoadCompletion>,
    ) -> Result<(LoadToken, Option<(LoadState, LoadState)>)> {
        self.cancel();

        let from = self.state();
        let target = if from == LoadState::Initial {
            LoadState::Loading
        } else {
            LoadState::Refreshing
        };
        let changed = self.transition(target)?;

        self.generation += 1;
        let token = LoadToken::new(data_source, self.generation, sender.clone());
        self.current = Some(token.clone());
        tracing::debug!(target: targets::LOAD, ?data_source, generation = self.generation, state = %self.state(), "load started");
        Ok((token, changed))
    }

    /// Finish the load `generation` in `state`.
    ///
    /// Returns the transition taken, if the state changed.
    pub(crate) fn end_loading(
        &mut self,
        generation: u64,
        state: LoadState,
        error: Option<LoadError>,
    ) -> Result<Option<(LoadState, LoadState)>> {
        if self
            .current
            .as_ref()
            .is_some_and(|token| token.generation() == generation)
        {
            self.current = None;
        }
        self.loading_error = error;
        self.transition(state)
    }

    /// Forget the load `generation` without changing state.
    pub(crate) fn end_ignored(&mut self, generation: u64) {
        if self
            .current
            .as_ref()
            .is_some_and(|token| token.generation() == generation)
        {
            self.current = None;
        }
    }

    /// Transition without touching the token.
    pub(crate) fn transition(&mut self, to: LoadState) -> Result<Option<(LoadState, LoadState)>> {
        let from = self.state();
        if !self.machine.apply(to, &mut LoadTransitions)? {
            return Ok(None);
        }
        let to = self.state();
        self.state_changed.emit((from, to));
        Ok(Some((from, to)))
    }

    /// Cancel the load in flight. Returns whether there was one.
    pub fn cancel(&mut self) -> bool {
        match self.current.take() {
            Some(token) => {
                token.cancel();
                tracing::debug!(target: targets::LOAD, ?token, "load cancelled");
                true
            }
            None => false,
        }
    }

    /// Cancel any load and return to `Initial`.
    pub(crate) fn reset(&mut self) {
        self.cancel();
        self.loading_error = None;
        let from = self.state();
        self.machine.reset(LoadState::Initial);
        if from != LoadState::Initial {
            self.state_changed.emit((from, LoadState::Initial));
        }
    }

    pub(crate) fn push_when_loaded(&mut self, callback: Box<dyn FnOnce() + Send>) {
        self.when_loaded.push(callback);
    }

    pub(crate) fn take_when_loaded(&mut self) -> Vec<Box<dyn FnOnce() + Send>> {
        std::mem::take(&mut self.when_loaded)
    }
}

static_assertions::assert_impl_all!(LoadToken: Send, Sync, Clone);
static_assertions::assert_impl_all!(LoadCompletion: Send);

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use slotmap::SlotMap;

    fn id() -> DataSourceId {
        let mut ids: SlotMap<DataSourceId, ()> = SlotMap::with_key();
        ids.insert(())
    }

    #[test]
    fn test_first_load_enters_loading() {
        let (tx, rx) = unbounded();
        let mut coordinator = LoadCoordinator::new();
        let (token, changed) = coordinator.begin_loading(id(), &tx).unwrap();

        assert_eq!(changed, Some((LoadState::Initial, LoadState::Loading)));
        assert!(coordinator.is_current(token.generation()));

        token.done();
        let completion = rx.try_recv().unwrap();
        assert_eq!(completion.generation, token.generation());
        assert!(matches!(completion.outcome, LoadOutcome::Loaded(None)));
    }

    #[test]
    fn test_reload_after_loaded_refreshes() {
        let (tx, _rx) = unbounded();
        let mut coordinator = LoadCoordinator::new();
        let (token, _) = coordinator.begin_loading(id(), &tx).unwrap();
        coordinator
            .end_loading(token.generation(), LoadState::Loaded, None)
            .unwrap();

        let (_, changed) = coordinator.begin_loading(id(), &tx).unwrap();
        assert_eq!(changed, Some((LoadState::Loaded, LoadState::Refreshing)));
    }

    #[test]
    fn test_reload_while_loading_stays_loading() {
        let (tx, _rx) = unbounded();
        let mut coordinator = LoadCoordinator::new();
        coordinator.begin_loading(id(), &tx).unwrap();
        let (_, changed) = coordinator.begin_loading(id(), &tx).unwrap();
        assert_eq!(changed, None);
        assert_eq!(coordinator.state(), LoadState::Loading);
    }

    #[test]
    fn test_superseded_token_is_dropped() {
        let (tx, rx) = unbounded();
        let mut coordinator = LoadCoordinator::new();
        let (first, _) = coordinator.begin_loading(id(), &tx).unwrap();
        let (second, _) = coordinator.begin_loading(id(), &tx).unwrap();

        assert!(first.is_cancelled());
        assert!(!coordinator.is_current(first.generation()));
        first.done();
        assert!(rx.try_recv().is_err());

        second.done_with_error(LoadError::new("offline"));
        let completion = rx.try_recv().unwrap();
        assert_eq!(completion.generation, second.generation());
    }

    #[test]
    fn test_end_loading_records_error() {
        let (tx, _rx) = unbounded();
        let mut coordinator = LoadCoordinator::new();
        let (token, _) = coordinator.begin_loading(id(), &tx).unwrap();
        coordinator
            .end_loading(token.generation(), LoadState::Error, Some(LoadError::new("boom")))
            .unwrap();

        assert_eq!(coordinator.state(), LoadState::Error);
        assert_eq!(coordinator.loading_error().map(|e| e.message()), Some("boom"));
        assert!(coordinator.current_token().is_none());
    }

    #[test]
    fn test_invalid_transition_is_rejected() {
        let mut coordinator = LoadCoordinator::new();
        assert!(coordinator.transition(LoadState::Loaded).is_err());
        assert_eq!(coordinator.state(), LoadState::Initial);
    }

    #[test]
    fn test_typed_update_downcasts() {
        let (tx, rx) = unbounded();
        let token = LoadToken::new(id(), 1, tx);
        token.update_with_content(|items: &mut Vec<u32>, notifier| {
            items.push(7);
            notifier.notify_did_reload_data();
        });

        let LoadOutcome::Loaded(Some(update)) = rx.try_recv().unwrap().outcome else {
            panic!("expected a content update");
        };
        let mut items: Vec<u32> = Vec::new();
        let mut notifier = Notifier::new();
        update(&mut items, &mut notifier);
        assert_eq!(items, vec![7]);
        assert_eq!(notifier.events().len(), 1);
    }

    #[test]
    fn test_reset_returns_to_initial() {
        let (tx, _rx) = unbounded();
        let mut coordinator = LoadCoordinator::new();
        let (token, _) = coordinator.begin_loading(id(), &tx).unwrap();
        coordinator.reset();
        assert!(token.is_cancelled());
        assert_eq!(coordinator.state(), LoadState::Initial);
    }

    #[test]
    fn test_state_changed_signal() {
        let (tx, _rx) = unbounded();
        let mut coordinator = LoadCoordinator::new();
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let recorder = seen.clone();
        coordinator
            .state_changed()
            .connect(move |change: &(LoadState, LoadState)| recorder.lock().push(*change));

        let (token, _) = coordinator.begin_loading(id(), &tx).unwrap();
        coordinator.begin_loading(id(), &tx).unwrap();
        coordinator
            .end_loading(token.generation() + 1, LoadState::NoContent, None)
            .unwrap();
        coordinator.reset();

        assert_eq!(
            *seen.lock(),
            vec![
                (LoadState::Initial, LoadState::Loading),
                (LoadState::Loading, LoadState::NoContent),
                (LoadState::NoContent, LoadState::Initial),
            ]
        );
    }
}
