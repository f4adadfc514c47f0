//! Storage modules for Yard
//!
//! Provides the SQLite-backed slot table and its transactional handle.

pub mod slot_store;

pub use slot_store::{SlotStore, SlotTxn};
