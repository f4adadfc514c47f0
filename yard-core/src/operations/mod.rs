pub mod check_health;
pub mod get_slot;
pub mod list_slots;
pub mod occupancy;
pub mod register_slot;

pub use check_health::CheckHealthOperation;
pub use get_slot::{
    GetSlotByNumberOperationRequest, GetSlotOperation, GetSlotOperationOutcome,
    GetSlotOperationRequest,
};
pub use list_slots::{ListSlotsOperation, ListSlotsOperationRequest, ListSlotsOperationResult};
pub use occupancy::{
    OccupancyOperation, OccupancyOperationOutcome, OccupancyOperationRequest,
};
pub use register_slot::{RegisterSlotOperation, RegisterSlotOperationRequest};

use crate::{Result, SlotStore, YardError};
use std::sync::Arc;

/// Runs store work on the blocking pool so rusqlite never stalls the runtime.
pub(crate) async fn with_store<T, F>(store: &Arc<SlotStore>, task: &str, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&SlotStore) -> Result<T> + Send + 'static,
{
    let store = Arc::clone(store);
    tokio::task::spawn_blocking(move || f(&store))
        .await
        .map_err(|error| YardError::Internal(format!("{} task failed: {}", task, error)))?
}
