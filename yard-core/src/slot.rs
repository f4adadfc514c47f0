use crate::error::{Result, YardError};
use crate::occupancy::SlotState;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Color written to a slot while it is occupied.
pub const OCCUPIED_COLOR: &str = "#D3D3D3";

/// A persisted yard slot.
///
/// Only built through [`UnplacedSlot::place`], so `id > 0`, a non-blank
/// color and a non-blank warehouse always hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Slot {
    id: i64,
    warehouse: String,
    color: String,
    default_color: String,
    number: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Slot {
    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn warehouse(&self) -> &str {
        &self.warehouse
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn default_color(&self) -> &str {
        &self.default_color
    }

    pub fn number(&self) -> i64 {
        self.number
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Occupancy is inferred from the color, there is no stored status.
    pub fn state(&self) -> SlotState {
        if self.color == self.default_color {
            SlotState::Free
        } else {
            SlotState::Occupied
        }
    }
}

/// First phase of building a [`Slot`]: everything but the warehouse.
#[derive(Debug, Clone)]
pub struct UnplacedSlot {
    id: i64,
    color: String,
    default_color: String,
    number: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UnplacedSlot {
    pub fn new(
        id: i64,
        color: impl Into<String>,
        default_color: impl Into<String>,
        number: i64,
    ) -> Result<Self> {
        let color = color.into();
        if id <= 0 {
            return Err(YardError::Validation(format!(
                "slot id must be positive, got {}",
                id
            )));
        }
        if color.trim().is_empty() {
            return Err(YardError::Validation(
                "slot color cannot be empty".to_string(),
            ));
        }

        let now = Utc::now();
        Ok(Self {
            id,
            color,
            default_color: default_color.into(),
            number,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn with_timestamps(mut self, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self.updated_at = updated_at;
        self
    }

    /// Second phase: attach the warehouse the slot belongs to.
    pub fn place(self, warehouse: impl Into<String>) -> Result<Slot> {
        let warehouse = warehouse.into();
        if warehouse.trim().is_empty() {
            return Err(YardError::Validation(
                "warehouse cannot be empty".to_string(),
            ));
        }

        Ok(Slot {
            id: self.id,
            warehouse,
            color: self.color,
            default_color: self.default_color,
            number: self.number,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// A (warehouse, color) partition, the scope of number uniqueness.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartitionKey {
    warehouse: String,
    color: String,
}

impl PartitionKey {
    pub fn new(warehouse: impl Into<String>, color: impl Into<String>) -> Result<Self> {
        let warehouse = require_warehouse(warehouse.into())?;
        let color = require_non_blank("color", color.into())?;
        Ok(Self { warehouse, color })
    }

    pub fn warehouse(&self) -> &str {
        &self.warehouse
    }

    pub fn color(&self) -> &str {
        &self.color
    }
}

/// Identifies a stored slot the way occupancy transitions match it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotKey {
    warehouse: String,
    color: String,
    number: i64,
}

impl SlotKey {
    pub fn new(warehouse: impl Into<String>, color: impl Into<String>, number: i64) -> Result<Self> {
        let warehouse = require_warehouse(warehouse.into())?;
        let color = require_non_blank("color", color.into())?;
        if number <= 0 {
            return Err(YardError::Validation(format!(
                "assignation number must be positive, got {}",
                number
            )));
        }
        Ok(Self {
            warehouse,
            color,
            number,
        })
    }

    pub fn warehouse(&self) -> &str {
        &self.warehouse
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn number(&self) -> i64 {
        self.number
    }
}

/// Warehouse names taken by the transition endpoints under `/yms/yard/`.
pub const RESERVED_WAREHOUSES: &[&str] = &["free", "occupy"];

/// A non-blank warehouse name outside [`RESERVED_WAREHOUSES`].
pub(crate) fn require_warehouse(value: String) -> Result<String> {
    let warehouse = require_non_blank("warehouse", value)?;
    if RESERVED_WAREHOUSES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(&warehouse))
    {
        return Err(YardError::Validation(format!(
            "warehouse name '{}' is reserved",
            warehouse
        )));
    }
    Ok(warehouse)
}

pub(crate) fn require_non_blank(field: &str, value: String) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(YardError::Validation(format!(
            "{} cannot be empty",
            field
        )));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_phase_build() {
        let slot = UnplacedSlot::new(7, "#0000ff", "#0000ff", 3)
            .unwrap()
            .place("AXM")
            .unwrap();

        assert_eq!(slot.id(), 7);
        assert_eq!(slot.warehouse(), "AXM");
        assert_eq!(slot.number(), 3);
        assert_eq!(slot.state(), SlotState::Free);
    }

    #[test]
    fn test_non_positive_id_rejected() {
        for id in [0, -1, i64::MIN] {
            let err = UnplacedSlot::new(id, "#0000ff", "#0000ff", 1).unwrap_err();
            assert!(matches!(err, YardError::Validation(_)));
        }
    }

    #[test]
    fn test_blank_color_rejected() {
        for color in ["", "   ", "\t"] {
            let err = UnplacedSlot::new(1, color, "#0000ff", 1).unwrap_err();
            assert!(matches!(err, YardError::Validation(_)));
        }
    }

    #[test]
    fn test_blank_warehouse_rejected() {
        let unplaced = UnplacedSlot::new(1, "#0000ff", "#0000ff", 1).unwrap();
        assert!(matches!(
            unplaced.place(" "),
            Err(YardError::Validation(_))
        ));
    }

    #[test]
    fn test_occupied_state_inferred_from_color() {
        let slot = UnplacedSlot::new(1, OCCUPIED_COLOR, "#0000ff", 1)
            .unwrap()
            .place("BOG")
            .unwrap();
        assert_eq!(slot.state(), SlotState::Occupied);
    }

    #[test]
    fn test_slot_key_validation() {
        assert!(SlotKey::new("AXM", "#0000ff", 1).is_ok());
        assert!(SlotKey::new("", "#0000ff", 1).is_err());
        assert!(SlotKey::new("AXM", "", 1).is_err());
        assert!(SlotKey::new("AXM", "#0000ff", 0).is_err());
    }

    #[test]
    fn test_partition_key_trims_input() {
        let key = PartitionKey::new(" AXM ", "#0000ff ").unwrap();
        assert_eq!(key.warehouse(), "AXM");
        assert_eq!(key.color(), "#0000ff");
    }

    #[test]
    fn test_reserved_warehouse_names_rejected() {
        for warehouse in ["free", "occupy", " Free ", "OCCUPY"] {
            assert!(matches!(
                PartitionKey::new(warehouse, "#0000ff"),
                Err(YardError::Validation(_))
            ));
            assert!(matches!(
                SlotKey::new(warehouse, "#0000ff", 1),
                Err(YardError::Validation(_))
            ));
        }

        assert!(PartitionKey::new("freeport", "#0000ff").is_ok());
    }
}
