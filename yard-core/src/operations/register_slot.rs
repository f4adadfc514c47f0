use super::with_store;
use crate::{
    AllocationPolicy, PartitionKey, Result, Slot, SlotStore, YardError, first_available_number,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct RegisterSlotOperation {
    store: Arc<SlotStore>,
    policy: AllocationPolicy,
}

#[derive(Debug, Clone)]
pub struct RegisterSlotOperationRequest {
    pub warehouse: String,
    pub color: String,
}

impl RegisterSlotOperation {
    pub fn new(store: Arc<SlotStore>, policy: AllocationPolicy) -> Self {
        Self { store, policy }
    }

    /// Registers a slot under the smallest number free in its partition.
    ///
    /// Lock contention is retried with a fresh scan. Once the attempts are
    /// spent the caller gets a retryable `AllocationFailed` caused by
    /// `AllocationConflict`. Any other failure is wrapped as non-retryable.
    pub async fn run(&self, request: RegisterSlotOperationRequest) -> Result<Slot> {
        let RegisterSlotOperationRequest { warehouse, color } = request;
        let partition = PartitionKey::new(warehouse, color)?;

        let mut attempt = 0;
        loop {
            attempt += 1;

            match self.allocate_once(partition.clone()).await {
                Ok(slot) => {
                    tracing::info!(
                        "Registered slot. id={} warehouse={} color={} number={} attempt={}",
                        slot.id(),
                        slot.warehouse(),
                        slot.color(),
                        slot.number(),
                        attempt
                    );
                    return Ok(slot);
                }
                Err(error) if error.is_conflict() && attempt < self.policy.max_attempts => {
                    tracing::warn!(
                        "Allocation conflict, retrying. warehouse={} color={} attempt={} error={}",
                        partition.warehouse(),
                        partition.color(),
                        attempt,
                        error
                    );
                    tokio::time::sleep(self.policy.backoff_for(attempt)).await;
                }
                Err(error) if error.is_conflict() => {
                    tracing::warn!(
                        "Allocation attempts exhausted. warehouse={} color={} attempts={} error={}",
                        partition.warehouse(),
                        partition.color(),
                        attempt,
                        error
                    );
                    return Err(YardError::AllocationFailed {
                        retryable: true,
                        source: Box::new(YardError::AllocationConflict { attempts: attempt }),
                    });
                }
                Err(error) => {
                    return Err(YardError::AllocationFailed {
                        retryable: false,
                        source: Box::new(error),
                    });
                }
            }
        }
    }

    async fn allocate_once(&self, partition: PartitionKey) -> Result<Slot> {
        with_store(&self.store, "allocation", move |store| {
            allocate_in_partition(store, &partition)
        })
        .await
    }
}

/// Scans the partition and inserts under the first gap, in one write transaction.
pub fn allocate_in_partition(store: &SlotStore, partition: &PartitionKey) -> Result<Slot> {
    store.write_txn(|txn| {
        let numbers = txn.scan_numbers(partition.warehouse(), partition.color())?;
        let number = first_available_number(&numbers);

        tracing::debug!(
            "Partition scan. warehouse={} color={} used={} next={}",
            partition.warehouse(),
            partition.color(),
            numbers.len(),
            number
        );

        txn.insert_slot(partition.warehouse(), partition.color(), number)
    })
}
