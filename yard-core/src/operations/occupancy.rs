use super::with_store;
use crate::{Result, Slot, SlotKey, SlotStore, Transition};
use std::sync::Arc;

#[derive(Clone)]
pub struct OccupancyOperation {
    store: Arc<SlotStore>,
    occupied_color: String,
}

#[derive(Debug, Clone)]
pub struct OccupancyOperationRequest {
    pub warehouse: String,
    pub color: String,
    pub number: i64,
}

#[derive(Debug, Clone)]
pub enum OccupancyOperationOutcome {
    Updated(Slot),
    NotFound,
}

impl OccupancyOperation {
    pub fn new(store: Arc<SlotStore>, occupied_color: impl Into<String>) -> Self {
        Self {
            store,
            occupied_color: occupied_color.into(),
        }
    }

    pub fn occupied_color(&self) -> &str {
        &self.occupied_color
    }

    pub async fn run_free(
        &self,
        request: OccupancyOperationRequest,
    ) -> Result<OccupancyOperationOutcome> {
        self.run(Transition::Free, request).await
    }

    pub async fn run_occupy(
        &self,
        request: OccupancyOperationRequest,
    ) -> Result<OccupancyOperationOutcome> {
        self.run(Transition::Occupy, request).await
    }

    /// Applies `transition` to the slot matched by the request.
    ///
    /// The match and the color write share one write transaction. A request
    /// that matches nothing is `NotFound` and leaves the store unchanged.
    pub async fn run(
        &self,
        transition: Transition,
        request: OccupancyOperationRequest,
    ) -> Result<OccupancyOperationOutcome> {
        let OccupancyOperationRequest {
            warehouse,
            color,
            number,
        } = request;

        let key = SlotKey::new(warehouse, color, number)?;
        let update = transition.color_update(&key, &self.occupied_color);

        let updated = with_store(&self.store, &transition.to_string(), move |store| {
            store.write_txn(|txn| txn.update_color_where(&update))
        })
        .await?;

        match updated {
            Some(slot) => {
                tracing::info!(
                    "Slot transition applied. transition={} id={} warehouse={} number={} color={}",
                    transition,
                    slot.id(),
                    slot.warehouse(),
                    slot.number(),
                    slot.color()
                );
                Ok(OccupancyOperationOutcome::Updated(slot))
            }
            None => {
                tracing::info!(
                    "Slot transition matched nothing. transition={} warehouse={} color={} number={}",
                    transition,
                    key.warehouse(),
                    key.color(),
                    key.number()
                );
                Ok(OccupancyOperationOutcome::NotFound)
            }
        }
    }
}
