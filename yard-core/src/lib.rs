//! Yard Core - slot numbering and occupancy for warehouse yards
//!
//! Slots are grouped into partitions keyed by (warehouse, color):
//! - each new slot takes the smallest positive number free in its partition
//! - occupancy is a color toggle between the default color and a fixed marker
//! - SQLite holds the slots; every read-modify-write runs in one write transaction

pub mod allocator;
pub mod error;
pub mod occupancy;
pub mod operations;
pub mod slot;
pub mod storage;

pub use allocator::{AllocationPolicy, first_available_number};
pub use error::{Result, YardError};
pub use occupancy::{ColorTarget, ColorUpdate, MatchColumn, SlotState, Transition};
pub use operations::{
    CheckHealthOperation, GetSlotByNumberOperationRequest, GetSlotOperation,
    GetSlotOperationOutcome, GetSlotOperationRequest, ListSlotsOperation,
    ListSlotsOperationRequest, ListSlotsOperationResult, OccupancyOperation,
    OccupancyOperationOutcome, OccupancyOperationRequest, RegisterSlotOperation,
    RegisterSlotOperationRequest,
};
pub use slot::{OCCUPIED_COLOR, PartitionKey, RESERVED_WAREHOUSES, Slot, SlotKey, UnplacedSlot};
pub use storage::{SlotStore, SlotTxn};
