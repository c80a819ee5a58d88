//! Thread checks for tree mutation.
//!
//! A data-source tree belongs to the thread that created it. Only the body
//! of a content load may run elsewhere; its completion is queued back and
//! drained on the owning thread.
//!
//! ```
//! use horizon_collection_core::thread_check::ThreadAffinity;
//!
//! let affinity = ThreadAffinity::current();
//! assert!(affinity.is_same_thread());
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::ThreadId;

static CHECKS_ENABLED: AtomicBool = AtomicBool::new(cfg!(debug_assertions));

/// Turn runtime checks on or off. On by default in debug builds only.
pub fn set_thread_checks_enabled(enabled: bool) {
    CHECKS_ENABLED.store(enabled, Ordering::SeqCst);
}

#[inline]
pub fn are_thread_checks_enabled() -> bool {
    CHECKS_ENABLED.load(Ordering::Relaxed)
}

/// The thread an object was created on.
#[derive(Debug, Clone, Copy)]
pub struct ThreadAffinity {
    thread_id: ThreadId,
}

impl ThreadAffinity {
    #[inline]
    pub fn current() -> Self {
        Self {
            thread_id: std::thread::current().id(),
        }
    }

    #[inline]
    pub fn is_same_thread(&self) -> bool {
        std::thread::current().id() == self.thread_id
    }

    /// # Panics
    ///
    /// Panics off the bound thread while checks are enabled.
    pub fn assert_same_thread(&self, operation: &str) {
        if are_thread_checks_enabled() && !self.is_same_thread() {
            self.wrong_thread(operation);
        }
    }

    #[inline]
    pub fn debug_assert_same_thread(&self) {
        #[cfg(debug_assertions)]
        self.assert_same_thread("data source tree touched off its thread");
    }

    #[cold]
    #[inline(never)]
    fn wrong_thread(&self, operation: &str) -> ! {
        panic!(
            "{operation}: bound to {:?}, running on {:?}; complete loads through a LoadToken and \
             drain them with DataSourceTree::process_load_completions() on the bound thread",
            self.thread_id,
            std::thread::current().id(),
        )
    }
}
