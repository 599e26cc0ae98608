use std::sync::Arc;

use pf_core::feed::{FeedSnapshot, WindowState};
use tokio::sync::Mutex;

/// Shared feed context containing the window state and dispatch lock.
///
/// ## Lock Ordering
/// When acquiring both locks, acquire `dispatch_lock` first, then `state`.
/// - `dispatch_lock`: held for a whole `dispatch` so that transitions and the
///   actions they produce are applied one event at a time.
/// - `state`: used for reads (`snapshot`) and for the write at the end of a
///   dispatch.
pub struct FeedContext<T> {
    state: Mutex<WindowState<T>>,
    dispatch_lock: Mutex<()>,
}

impl<T: Clone> FeedContext<T> {
    pub fn new(initial_state: WindowState<T>) -> Self {
        Self {
            state: Mutex::new(initial_state),
            dispatch_lock: Mutex::new(()),
        }
    }

    /// Returns the context wrapped in Arc for shared ownership.
    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Copy of the current state. Does NOT acquire `dispatch_lock`.
    pub async fn get_state(&self) -> WindowState<T> {
        self.state.lock().await.clone()
    }

    pub async fn snapshot(&self) -> FeedSnapshot<T> {
        self.state.lock().await.snapshot()
    }

    pub async fn stale_discards(&self) -> u64 {
        self.state.lock().await.stale_discards()
    }

    /// Returns a guard that releases the lock when dropped.
    pub async fn acquire_dispatch_lock(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.dispatch_lock.lock().await
    }

    /// Only call while holding `dispatch_lock`.
    pub async fn set_state(&self, state: WindowState<T>) {
        let mut guard = self.state.lock().await;
        *guard = state;
    }
}
