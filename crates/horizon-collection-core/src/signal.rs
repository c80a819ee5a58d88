//! Observer notifications for load-state changes.
//!
//! A [`Signal`] lets code outside the data-source tree watch transitions
//! without the tree knowing who listens. Slots run synchronously on the
//! emitting thread, which for the tree is always its bound thread.
//!
//! ```
//! use horizon_collection_core::Signal;
//!
//! let loaded = Signal::<&'static str>::new();
//! let id = loaded.connect(|name| println!("{name} finished loading"));
//! loaded.emit("inbox");
//! assert!(loaded.disconnect(id));
//! ```

use std::sync::Arc;

use parking_lot::Mutex;
use slotmap::{new_key_type, SlotMap};

use crate::logging::targets;

new_key_type! {
    /// Handle returned by [`Signal::connect`].
    pub struct ConnectionId;
}

type Slot<Args> = Arc<dyn Fn(&Args) + Send + Sync>;

/// A list of slots called with `&Args` on every [`emit`](Signal::emit).
pub struct Signal<Args> {
    slots: Mutex<SlotMap<ConnectionId, Slot<Args>>>,
}

impl<Args: 'static> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args: 'static> std::fmt::Debug for Signal<Args> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("slots", &self.connection_count())
            .finish()
    }
}

impl<Args: 'static> Signal<Args> {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(SlotMap::with_key()),
        }
    }

    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        self.slots.lock().insert(Arc::new(slot))
    }

    /// Returns `false` if `id` was already disconnected.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.slots.lock().remove(id).is_some()
    }

    pub fn connection_count(&self) -> usize {
        self.slots.lock().len()
    }

    /// Call every slot in connection order.
    ///
    /// Slots run on a snapshot of the table, so a slot may connect or
    /// disconnect on the same signal.
    #[tracing::instrument(skip_all, target = "horizon_collection_core::signal", level = "trace")]
    pub fn emit(&self, args: Args) {
        let slots: Vec<Slot<Args>> = self.slots.lock().values().cloned().collect();
        tracing::trace!(target: targets::SIGNAL, slots = slots.len(), "emit");
        for slot in slots {
            slot(&args);
        }
    }
}

static_assertions::assert_impl_all!(Signal<u32>: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Phase {
        Loading,
        Loaded,
    }

    #[test]
    fn test_slots_see_every_emit_in_order() {
        let signal = Signal::<(Phase, Phase)>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = seen.clone();
        signal.connect(move |change| recorder.lock().push(*change));

        signal.emit((Phase::Loading, Phase::Loaded));
        signal.emit((Phase::Loaded, Phase::Loading));

        assert_eq!(
            *seen.lock(),
            vec![(Phase::Loading, Phase::Loaded), (Phase::Loaded, Phase::Loading)]
        );
    }

    #[test]
    fn test_disconnect() {
        let signal = Signal::<u32>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = seen.clone();
        let id = signal.connect(move |&value| recorder.lock().push(value));

        signal.emit(1);
        assert!(signal.disconnect(id));
        assert!(!signal.disconnect(id));
        signal.emit(2);

        assert_eq!(*seen.lock(), vec![1]);
    }

    #[test]
    fn test_slot_may_disconnect_itself() {
        let signal = Arc::new(Signal::<()>::new());
        let own_id = Arc::new(Mutex::new(None));

        let weak = Arc::downgrade(&signal);
        let slot_id = own_id.clone();
        let id = signal.connect(move |_| {
            if let (Some(signal), Some(id)) = (weak.upgrade(), slot_id.lock().take()) {
                signal.disconnect(id);
            }
        });
        *own_id.lock() = Some(id);

        signal.emit(());
        assert_eq!(signal.connection_count(), 0);
    }
}
