use super::with_store;
use crate::slot::require_warehouse;
use crate::{Result, Slot, SlotStore};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Clone)]
pub struct ListSlotsOperation {
    store: Arc<SlotStore>,
}

/// `warehouse: None` lists every warehouse.
#[derive(Debug, Clone, Default)]
pub struct ListSlotsOperationRequest {
    pub warehouse: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ListSlotsOperationResult {
    pub slots: Vec<Slot>,
}

impl ListSlotsOperationResult {
    pub fn by_color(&self) -> BTreeMap<String, Vec<Slot>> {
        group(&self.slots, |slot| slot.color())
    }

    pub fn by_warehouse(&self) -> BTreeMap<String, Vec<Slot>> {
        group(&self.slots, |slot| slot.warehouse())
    }
}

fn group(slots: &[Slot], key: impl Fn(&Slot) -> &str) -> BTreeMap<String, Vec<Slot>> {
    let mut groups: BTreeMap<String, Vec<Slot>> = BTreeMap::new();
    for slot in slots {
        groups
            .entry(key(slot).to_string())
            .or_default()
            .push(slot.clone());
    }
    groups
}

impl ListSlotsOperation {
    pub fn new(store: Arc<SlotStore>) -> Self {
        Self { store }
    }

    pub async fn run(&self, request: ListSlotsOperationRequest) -> Result<ListSlotsOperationResult> {
        let warehouse = request.warehouse.map(require_warehouse).transpose()?;
        let slots = with_store(&self.store, "list slots", move |store| match warehouse {
            Some(warehouse) => store.select_by_warehouse(&warehouse),
            None => store.select_all(),
        })
        .await?;

        tracing::debug!("Listed {} slots", slots.len());
        Ok(ListSlotsOperationResult { slots })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AllocationPolicy, RegisterSlotOperation, RegisterSlotOperationRequest, YardError};

    #[tokio::test]
    async fn test_list_and_group() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SlotStore::open(temp_dir.path().join("yard.db")).unwrap());
        let register = RegisterSlotOperation::new(store.clone(), AllocationPolicy::default());
        let operation = ListSlotsOperation::new(store);

        for (warehouse, color) in [
            ("AXM", "#0000ff"),
            ("AXM", "#0000ff"),
            ("AXM", "#ff0000"),
            ("BOG", "#0000ff"),
        ] {
            register
                .run(RegisterSlotOperationRequest {
                    warehouse: warehouse.to_string(),
                    color: color.to_string(),
                })
                .await
                .unwrap();
        }

        let axm = operation
            .run(ListSlotsOperationRequest {
                warehouse: Some("AXM".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(axm.slots.len(), 3);

        let by_color = axm.by_color();
        assert_eq!(by_color["#0000ff"].len(), 2);
        assert_eq!(by_color["#ff0000"].len(), 1);

        let all = operation
            .run(ListSlotsOperationRequest::default())
            .await
            .unwrap();
        let by_warehouse = all.by_warehouse();
        assert_eq!(by_warehouse.len(), 2);
        assert_eq!(by_warehouse["AXM"].len(), 3);
        assert_eq!(by_warehouse["BOG"].len(), 1);

        let empty = operation
            .run(ListSlotsOperationRequest {
                warehouse: Some("MDE".to_string()),
            })
            .await
            .unwrap();
        assert!(empty.slots.is_empty());

        let err = operation
            .run(ListSlotsOperationRequest {
                warehouse: Some(String::new()),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, YardError::Validation(_)));
    }
}
