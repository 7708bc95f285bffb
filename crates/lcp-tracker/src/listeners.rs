use std::sync::Arc;

use parking_lot::RwLock;

use crate::state::LcpChange;

pub type LcpCallback = Arc<dyn Fn(&LcpChange) + Send + Sync>;

/// Registered `on_lcp_change` callbacks, invoked in subscription order.
#[derive(Default)]
pub struct LcpListeners {
    callbacks: RwLock<Vec<LcpCallback>>,
}

impl LcpListeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, callback: F)
    where
        F: Fn(&LcpChange) + Send + Sync + 'static,
    {
        self.callbacks.write().push(Arc::new(callback));
    }

    /// Callbacks run outside the registry lock so they may subscribe further.
    pub fn notify(&self, change: &LcpChange) {
        let callbacks: Vec<LcpCallback> = self.callbacks.read().clone();
        for callback in callbacks {
            callback(change);
        }
    }

    pub fn len(&self) -> usize {
        self.callbacks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for LcpListeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LcpListeners")
            .field("callbacks", &self.len())
            .finish()
    }
}
