use super::with_store;
use crate::SlotStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct CheckHealthOperation {
    store: Arc<SlotStore>,
}

impl CheckHealthOperation {
    pub fn new(store: Arc<SlotStore>) -> Self {
        Self { store }
    }

    /// True when the slot store answers a trivial query.
    pub async fn run(&self) -> bool {
        match with_store(&self.store, "health check", |store| store.ping()).await {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!(
                    "Health check failed. db={:?} error={}",
                    self.store.db_path(),
                    error
                );
                false
            }
        }
    }
}
