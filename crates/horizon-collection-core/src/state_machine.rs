//! Generic state machine with validated transitions.
//!
//! A [`StateMachine`] owns a static transition table, set once at
//! construction, and the current state. Transitions are requested with
//! [`StateMachine::apply`]; the caller passes a [`StateMachineDelegate`] that
//! receives the entry/exit hooks and may rescue a transition the table does
//! not allow.
//!
//! # Hook order
//!
//! For a successful transition from `A` to `B`:
//!
//! 1. [`StateMachineDelegate::state_will_change`]
//! 2. [`StateMachineDelegate::did_exit`] with `A`
//! 3. [`StateMachineDelegate::did_enter`] with `B`
//! 4. [`StateMachineDelegate::state_did_change`]
//!
//! The current state is updated between steps 1 and 2. Hooks run on the
//! caller's thread; the machine performs no serialization beyond an atomic
//! read/write of the current state.
//!
//! # Example
//!
//! ```
//! use horizon_collection_core::state_machine::{NoDelegate, StateMachine};
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
//! enum Door { Open, Closed, Locked }
//!
//! let door = StateMachine::new(Door::Closed, [
//!     (Door::Closed, &[Door::Open, Door::Locked][..]),
//!     (Door::Open, &[Door::Closed][..]),
//!     (Door::Locked, &[Door::Closed][..]),
//! ]);
//!
//! assert!(door.apply(Door::Open, &mut NoDelegate).unwrap());
//! assert!(door.apply(Door::Locked, &mut NoDelegate).is_err());
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;

use parking_lot::RwLock;

use crate::error::{CollectionError, Result};
use crate::logging::targets;

/// Marker for types usable as machine states.
pub trait MachineState: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

impl<T> MachineState for T where T: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

/// Receives transition hooks from a [`StateMachine`].
///
/// Every method has a default, so implementors only override what they need.
pub trait StateMachineDelegate<S: MachineState> {
    /// Veto a valid transition. Returning `false` leaves the state unchanged.
    fn should_enter(&mut self, _from: S, _to: S) -> bool {
        true
    }

    /// Called before the current state changes.
    fn state_will_change(&mut self, _from: S, _to: S) {}

    /// Called after leaving `state`.
    fn did_exit(&mut self, _state: S) {}

    /// Called after entering `state`.
    fn did_enter(&mut self, _state: S) {}

    /// Called once the transition is complete.
    fn state_did_change(&mut self, _from: S, _to: S) {}

    /// Called when `from -> to` is not in the transition table.
    ///
    /// Return `None` to reject, or a substitute target. Returning `from`
    /// itself turns the request into a no-op.
    fn missing_transition(&mut self, _from: S, _to: S) -> Option<S> {
        None
    }
}

/// A delegate that implements no hooks.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDelegate;

impl<S: MachineState> StateMachineDelegate<S> for NoDelegate {}

/// A named-state machine with a fixed transition table.
pub struct StateMachine<S: MachineState> {
    current: RwLock<S>,
    transitions: HashMap<S, HashSet<S>>,
}

impl<S: MachineState> fmt::Debug for StateMachine<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMachine")
            .field("current", &self.current())
            .field("states", &self.transitions.len())
            .finish()
    }
}

impl<S: MachineState> StateMachine<S> {
    /// Create a machine in `initial` with the given transition table.
    pub fn new<'a, I>(initial: S, transitions: I) -> Self
    where
        I: IntoIterator<Item = (S, &'a [S])>,
    {
        let transitions = transitions
            .into_iter()
            .map(|(from, targets)| (from, targets.iter().copied().collect()))
            .collect();
        Self {
            current: RwLock::new(initial),
            transitions,
        }
    }

    /// The current state.
    #[inline]
    pub fn current(&self) -> S {
        *self.current.read()
    }

    /// Same as [`current`](Self::current).
    #[inline]
    pub fn current_state(&self) -> S {
        self.current()
    }

    /// Whether the table allows `from -> to`.
    pub fn is_valid_transition(&self, from: S, to: S) -> bool {
        self.transitions
            .get(&from)
            .is_some_and(|targets| targets.contains(&to))
    }

    /// States reachable in one step from `state`.
    pub fn valid_transitions(&self, state: S) -> impl Iterator<Item = S> + '_ {
        self.transitions
            .get(&state)
            .into_iter()
            .flat_map(|targets| targets.iter().copied())
    }

    /// All states reachable from `state` through any number of valid
    /// transitions, `state` included.
    pub fn reachable_from(&self, state: S) -> HashSet<S> {
        let mut seen = HashSet::from([state]);
        let mut stack = vec![state];
        while let Some(next) = stack.pop() {
            for target in self.valid_transitions(next) {
                if seen.insert(target) {
                    stack.push(target);
                }
            }
        }
        seen
    }

    /// Request a transition to `to`.
    ///
    /// Returns `Ok(true)` when the state changed, `Ok(false)` when the request
    /// was a no-op (already in `to`, vetoed, or rescued into the current
    /// state), and [`CollectionError::InvalidTransition`] when the table and
    /// the delegate both reject it.
    pub fn apply(&self, to: S, delegate: &mut dyn StateMachineDelegate<S>) -> Result<bool> {
        let from = self.current();
        if from == to {
            return Ok(false);
        }

        let target = if self.is_valid_transition(from, to) {
            to
        } else {
            match delegate.missing_transition(from, to) {
                Some(substitute) if substitute == from => {
                    tracing::trace!(target: targets::STATE, ?from, ?to, "transition absorbed by delegate");
                    return Ok(false);
                }
                Some(substitute) if self.is_valid_transition(from, substitute) => {
                    tracing::debug!(target: targets::STATE, ?from, ?to, ?substitute, "transition substituted");
                    substitute
                }
                _ => {
                    tracing::warn!(target: targets::STATE, ?from, ?to, "invalid state transition");
                    return Err(CollectionError::invalid_transition(from, to));
                }
            }
        };

        if !delegate.should_enter(from, target) {
            tracing::trace!(target: targets::STATE, ?from, to = ?target, "transition vetoed");
            return Ok(false);
        }

        delegate.state_will_change(from, target);
        *self.current.write() = target;
        delegate.did_exit(from);
        delegate.did_enter(target);
        delegate.state_did_change(from, target);

        tracing::trace!(target: targets::STATE, ?from, to = ?target, "state changed");
        Ok(true)
    }

    /// Force the current state without validation or hooks.
    ///
    /// Only for returning a machine to its initial state when its owner is
    /// reset.
    pub fn reset(&self, state: S) {
        *self.current.write() = state;
    }
}

static_assertions::assert_impl_all!(StateMachine<u8>: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Light {
        Red,
        Green,
        Yellow,
        Off,
    }

    fn traffic_light() -> StateMachine<Light> {
        StateMachine::new(
            Light::Red,
            [
                (Light::Red, &[Light::Green, Light::Off][..]),
                (Light::Green, &[Light::Yellow][..]),
                (Light::Yellow, &[Light::Red][..]),
            ],
        )
    }

    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
        rescue: Option<Light>,
        veto: bool,
    }

    impl StateMachineDelegate<Light> for Recorder {
        fn should_enter(&mut self, _from: Light, _to: Light) -> bool {
            !self.veto
        }

        fn state_will_change(&mut self, from: Light, to: Light) {
            self.calls.push(format!("will {from:?}->{to:?}"));
        }

        fn did_exit(&mut self, state: Light) {
            self.calls.push(format!("exit {state:?}"));
        }

        fn did_enter(&mut self, state: Light) {
            self.calls.push(format!("enter {state:?}"));
        }

        fn state_did_change(&mut self, from: Light, to: Light) {
            self.calls.push(format!("did {from:?}->{to:?}"));
        }

        fn missing_transition(&mut self, _from: Light, _to: Light) -> Option<Light> {
            self.rescue
        }
    }

    #[test]
    fn test_hook_order() {
        let machine = traffic_light();
        let mut recorder = Recorder::default();

        assert!(machine.apply(Light::Green, &mut recorder).unwrap());
        assert_eq!(machine.current(), Light::Green);
        assert_eq!(
            recorder.calls,
            vec!["will Red->Green", "exit Red", "enter Green", "did Red->Green"]
        );
    }

    #[test]
    fn test_invalid_transition_rejected() {
        let machine = traffic_light();
        let err = machine.apply(Light::Yellow, &mut NoDelegate).unwrap_err();
        assert!(matches!(err, CollectionError::InvalidTransition { .. }));
        assert_eq!(machine.current(), Light::Red);
    }

    #[test]
    fn test_missing_transition_substitute() {
        let machine = traffic_light();
        let mut recorder = Recorder {
            rescue: Some(Light::Green),
            ..Default::default()
        };

        assert!(machine.apply(Light::Yellow, &mut recorder).unwrap());
        assert_eq!(machine.current(), Light::Green);
    }

    #[test]
    fn test_substitute_must_be_valid() {
        let machine = traffic_light();
        let mut recorder = Recorder {
            rescue: Some(Light::Yellow),
            ..Default::default()
        };

        assert!(machine.apply(Light::Yellow, &mut recorder).is_err());
        assert!(recorder.calls.is_empty());
    }

    #[test]
    fn test_substitute_current_is_noop() {
        let machine = traffic_light();
        let mut recorder = Recorder {
            rescue: Some(Light::Red),
            ..Default::default()
        };

        assert!(!machine.apply(Light::Yellow, &mut recorder).unwrap());
        assert!(recorder.calls.is_empty());
    }

    #[test]
    fn test_veto_and_same_state() {
        let machine = traffic_light();
        let mut recorder = Recorder {
            veto: true,
            ..Default::default()
        };

        assert!(!machine.apply(Light::Green, &mut recorder).unwrap());
        assert!(!machine.apply(Light::Red, &mut NoDelegate).unwrap());
        assert_eq!(machine.current_state(), Light::Red);
    }

    #[test]
    fn test_reachable_closure() {
        let machine = traffic_light();
        let reachable = machine.reachable_from(Light::Green);
        assert!(reachable.contains(&Light::Off));
        assert_eq!(reachable.len(), 4);
        assert_eq!(machine.reachable_from(Light::Off), HashSet::from([Light::Off]));
    }
}
