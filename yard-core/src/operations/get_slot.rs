use super::with_store;
use crate::slot::require_warehouse;
use crate::{Result, Slot, SlotStore, YardError};
use std::sync::Arc;

#[derive(Clone)]
pub struct GetSlotOperation {
    store: Arc<SlotStore>,
}

#[derive(Debug, Clone)]
pub struct GetSlotOperationRequest {
    pub id: i64,
    pub warehouse: String,
}

#[derive(Debug, Clone)]
pub struct GetSlotByNumberOperationRequest {
    pub warehouse: String,
    pub number: i64,
}

#[derive(Debug, Clone)]
pub enum GetSlotOperationOutcome {
    Found(Slot),
    NotFound,
}

impl GetSlotOperation {
    pub fn new(store: Arc<SlotStore>) -> Self {
        Self { store }
    }

    pub async fn run(&self, request: GetSlotOperationRequest) -> Result<GetSlotOperationOutcome> {
        let GetSlotOperationRequest { id, warehouse } = request;

        if id <= 0 {
            return Err(YardError::Validation(format!(
                "slot id must be positive, got {}",
                id
            )));
        }
        let warehouse = require_warehouse(warehouse)?;

        let found = with_store(&self.store, "get slot", move |store| {
            if !store.exists_by_id(id, &warehouse)? {
                return Ok(None);
            }
            // The row can still disappear between the two reads
            store.select_by_id(id, &warehouse)
        })
        .await?;

        Ok(match found {
            Some(slot) => GetSlotOperationOutcome::Found(slot),
            None => GetSlotOperationOutcome::NotFound,
        })
    }

    pub async fn run_by_number(
        &self,
        request: GetSlotByNumberOperationRequest,
    ) -> Result<GetSlotOperationOutcome> {
        let GetSlotByNumberOperationRequest { warehouse, number } = request;

        if number <= 0 {
            return Err(YardError::Validation(format!(
                "assignation number must be positive, got {}",
                number
            )));
        }
        let warehouse = require_warehouse(warehouse)?;

        let found = with_store(&self.store, "get slot by number", move |store| {
            store.select_by_number(&warehouse, number)
        })
        .await?;

        Ok(match found {
            Some(slot) => GetSlotOperationOutcome::Found(slot),
            None => GetSlotOperationOutcome::NotFound,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AllocationPolicy, RegisterSlotOperation, RegisterSlotOperationRequest};

    #[tokio::test]
    async fn test_get_slot() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SlotStore::open(temp_dir.path().join("yard.db")).unwrap());
        let register = RegisterSlotOperation::new(store.clone(), AllocationPolicy::default());
        let operation = GetSlotOperation::new(store);

        let slot = register
            .run(RegisterSlotOperationRequest {
                warehouse: "AXM".to_string(),
                color: "#0000ff".to_string(),
            })
            .await
            .unwrap();

        let found = operation
            .run(GetSlotOperationRequest {
                id: slot.id(),
                warehouse: "AXM".to_string(),
            })
            .await
            .unwrap();
        assert!(matches!(found, GetSlotOperationOutcome::Found(ref s) if s == &slot));

        // Ids are scoped to their warehouse
        let other = operation
            .run(GetSlotOperationRequest {
                id: slot.id(),
                warehouse: "BOG".to_string(),
            })
            .await
            .unwrap();
        assert!(matches!(other, GetSlotOperationOutcome::NotFound));

        let by_number = operation
            .run_by_number(GetSlotByNumberOperationRequest {
                warehouse: "AXM".to_string(),
                number: 1,
            })
            .await
            .unwrap();
        assert!(matches!(by_number, GetSlotOperationOutcome::Found(ref s) if s.id() == slot.id()));

        let missing = operation
            .run_by_number(GetSlotByNumberOperationRequest {
                warehouse: "AXM".to_string(),
                number: 2,
            })
            .await
            .unwrap();
        assert!(matches!(missing, GetSlotOperationOutcome::NotFound));
    }

    #[tokio::test]
    async fn test_get_slot_rejects_bad_input() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SlotStore::open(temp_dir.path().join("yard.db")).unwrap());
        let operation = GetSlotOperation::new(store);

        let err = operation
            .run(GetSlotOperationRequest {
                id: 0,
                warehouse: "AXM".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, YardError::Validation(_)));

        let err = operation
            .run(GetSlotOperationRequest {
                id: 1,
                warehouse: " ".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, YardError::Validation(_)));
    }
}
