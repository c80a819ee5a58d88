//! Core systems for Horizon Collection.
//!
//! This crate provides the foundational pieces shared by the data-source tree
//! and the grid layout engine:
//!
//! - **Errors**: [`CollectionError`] and the user-facing [`LoadError`]
//! - **State Machine**: Validated transitions with delegated entry/exit hooks
//! - **Signal/Slot System**: Observer notifications for state changes
//! - **Thread Checks**: Affinity assertions for tree mutation
//! - **Logging**: Tracing targets, span names and performance spans
//!
//! # State Machine Example
//!
//! ```
//! use horizon_collection_core::state_machine::{NoDelegate, StateMachine};
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
//! enum Phase { Idle, Busy }
//!
//! let machine = StateMachine::new(Phase::Idle, [
//!     (Phase::Idle, &[Phase::Busy][..]),
//!     (Phase::Busy, &[Phase::Idle][..]),
//! ]);
//! machine.apply(Phase::Busy, &mut NoDelegate).unwrap();
//! assert_eq!(machine.current(), Phase::Busy);
//! ```

mod error;
pub mod logging;
pub mod signal;
pub mod state_machine;
pub mod thread_check;

pub use error::{CollectionError, LoadError, Result};
pub use logging::PerfSpan;
pub use signal::{ConnectionId, Signal};
pub use state_machine::{MachineState, NoDelegate, StateMachine, StateMachineDelegate};
pub use thread_check::ThreadAffinity;
