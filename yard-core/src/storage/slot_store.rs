use crate::error::{Result, YardError};
use crate::occupancy::{ColorTarget, ColorUpdate};
use crate::slot::{Slot, UnplacedSlot};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{
    Connection, OptionalExtension, Params, Row, Transaction, TransactionBehavior, params,
};
use std::path::{Path, PathBuf};
use std::time::Duration;

const SLOT_COLUMNS: &str =
    "id, warehouse, color, default_color, assignation_number, created_at, updated_at";

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed table of yard slots.
///
/// Every call opens its own connection, so one store can be shared across
/// tasks behind an `Arc`. Writers serialize on the database write lock.
pub struct SlotStore {
    db_path: PathBuf,
    busy_timeout: Duration,
}

impl SlotStore {
    pub fn new(db_path: impl Into<PathBuf>, busy_timeout: Duration) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let store = Self {
            db_path,
            busy_timeout,
        };
        store.init_schema()?;
        Ok(store)
    }

    pub fn open(db_path: impl Into<PathBuf>) -> Result<Self> {
        Self::new(db_path, DEFAULT_BUSY_TIMEOUT)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn get_conn(&self) -> Result<Connection> {
        let conn = Connection::open(&self.db_path)?;
        conn.busy_timeout(self.busy_timeout)?;
        Ok(conn)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.get_conn()?;

        // WAL lets readers proceed while an allocation holds the write lock
        let _mode: String =
            conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS yard_slots (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                warehouse TEXT NOT NULL,
                color TEXT NOT NULL,
                default_color TEXT NOT NULL,
                assignation_number INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;

        // Partition scans during allocation
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_yard_slots_partition
             ON yard_slots(warehouse, color, assignation_number)",
            [],
        )?;

        // Occupancy lookups by (warehouse, number)
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_yard_slots_number
             ON yard_slots(warehouse, assignation_number)",
            [],
        )?;

        Ok(())
    }

    /// Runs `f` inside an immediate transaction.
    ///
    /// The write lock is taken before `f` reads anything, so a scan and the
    /// write that depends on it cannot interleave with another writer. The
    /// transaction commits only when `f` succeeds and rolls back on drop.
    pub fn write_txn<T>(&self, f: impl FnOnce(&SlotTxn<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let txn = SlotTxn { tx };

        let value = f(&txn)?;
        txn.tx.commit()?;
        Ok(value)
    }

    pub fn ping(&self) -> Result<()> {
        let conn = self.get_conn()?;
        let _one: i64 = conn.query_row("SELECT 1", [], |row| row.get(0))?;
        Ok(())
    }

    pub fn exists_by_id(&self, id: i64, warehouse: &str) -> Result<bool> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM yard_slots WHERE id = ?1 AND warehouse = ?2",
            params![id, warehouse],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn select_by_id(&self, id: i64, warehouse: &str) -> Result<Option<Slot>> {
        let conn = self.get_conn()?;
        select_one(
            &conn,
            &format!(
                "SELECT {} FROM yard_slots WHERE id = ?1 AND warehouse = ?2",
                SLOT_COLUMNS
            ),
            params![id, warehouse],
        )
    }

    /// First slot (lowest id) holding `number` in the warehouse, any color.
    pub fn select_by_number(&self, warehouse: &str, number: i64) -> Result<Option<Slot>> {
        let conn = self.get_conn()?;
        select_one(
            &conn,
            &format!(
                "SELECT {} FROM yard_slots
                 WHERE warehouse = ?1 AND assignation_number = ?2
                 ORDER BY id ASC LIMIT 1",
                SLOT_COLUMNS
            ),
            params![warehouse, number],
        )
    }

    pub fn select_by_warehouse(&self, warehouse: &str) -> Result<Vec<Slot>> {
        let conn = self.get_conn()?;
        select_many(
            &conn,
            &format!(
                "SELECT {} FROM yard_slots WHERE warehouse = ?1
                 ORDER BY assignation_number ASC, id ASC",
                SLOT_COLUMNS
            ),
            [warehouse],
        )
    }

    pub fn select_all(&self) -> Result<Vec<Slot>> {
        let conn = self.get_conn()?;
        select_many(
            &conn,
            &format!(
                "SELECT {} FROM yard_slots ORDER BY warehouse ASC, assignation_number ASC, id ASC",
                SLOT_COLUMNS
            ),
            [],
        )
    }
}

/// Handle to an open write transaction on the slot table.
pub struct SlotTxn<'conn> {
    tx: Transaction<'conn>,
}

impl SlotTxn<'_> {
    /// Numbers currently used in the (warehouse, color) partition, ascending.
    pub fn scan_numbers(&self, warehouse: &str, color: &str) -> Result<Vec<i64>> {
        let mut stmt = self.tx.prepare(
            "SELECT assignation_number FROM yard_slots
             WHERE warehouse = ?1 AND color = ?2
             ORDER BY assignation_number ASC",
        )?;

        let rows = stmt.query_map([warehouse, color], |row| row.get::<_, i64>(0))?;

        let mut numbers = Vec::new();
        for row in rows {
            numbers.push(row?);
        }

        Ok(numbers)
    }

    /// Inserts a slot whose default color is its registration color.
    pub fn insert_slot(&self, warehouse: &str, color: &str, number: i64) -> Result<Slot> {
        let now = Utc::now();

        self.tx.execute(
            "INSERT INTO yard_slots (
                warehouse, color, default_color, assignation_number, created_at, updated_at
            ) VALUES (?1, ?2, ?2, ?3, ?4, ?4)",
            params![warehouse, color, number, now.to_rfc3339()],
        )?;

        let id = self.tx.last_insert_rowid();
        UnplacedSlot::new(id, color, color, number)?
            .with_timestamps(now, now)
            .place(warehouse)
    }

    /// Applies `update` to at most one matching slot and returns it.
    ///
    /// When several rows match (duplicated numbers), rows not yet in the
    /// target state win, then the lowest id.
    pub fn update_color_where(&self, update: &ColorUpdate) -> Result<Option<Slot>> {
        let free_first = match update.target {
            ColorTarget::DefaultColor => "ASC",
            ColorTarget::Fixed(_) => "DESC",
        };

        let id: Option<i64> = self
            .tx
            .query_row(
                &format!(
                    "SELECT id FROM yard_slots
                     WHERE warehouse = ?1 AND assignation_number = ?2 AND {} = ?3
                     ORDER BY (color = default_color) {}, id ASC
                     LIMIT 1",
                    update.match_column.column(),
                    free_first
                ),
                params![update.warehouse, update.number, update.match_color],
                |row| row.get(0),
            )
            .optional()?;

        let Some(id) = id else {
            return Ok(None);
        };

        let now = Utc::now().to_rfc3339();
        match &update.target {
            ColorTarget::DefaultColor => self.tx.execute(
                "UPDATE yard_slots SET color = default_color, updated_at = ?1 WHERE id = ?2",
                params![now, id],
            )?,
            ColorTarget::Fixed(color) => self.tx.execute(
                "UPDATE yard_slots SET color = ?1, updated_at = ?2 WHERE id = ?3",
                params![color, now, id],
            )?,
        };

        let slot = select_one(
            &self.tx,
            &format!("SELECT {} FROM yard_slots WHERE id = ?1", SLOT_COLUMNS),
            [id],
        )?
        .ok_or_else(|| YardError::Internal(format!("slot {} vanished during update", id)))?;

        Ok(Some(slot))
    }
}

fn select_one<P: Params>(conn: &Connection, sql: &str, params: P) -> Result<Option<Slot>> {
    let slot = conn.query_row(sql, params, slot_from_row).optional()?;
    Ok(slot)
}

fn select_many<P: Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<Slot>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, slot_from_row)?;

    let mut slots = Vec::new();
    for row in rows {
        slots.push(row?);
    }

    Ok(slots)
}

fn slot_from_row(row: &Row<'_>) -> rusqlite::Result<Slot> {
    let id: i64 = row.get(0)?;
    let warehouse: String = row.get(1)?;
    let color: String = row.get(2)?;
    let default_color: String = row.get(3)?;
    let number: i64 = row.get(4)?;
    let created_at = parse_timestamp(5, &row.get::<_, String>(5)?)?;
    let updated_at = parse_timestamp(6, &row.get::<_, String>(6)?)?;

    UnplacedSlot::new(id, color, default_color, number)
        .map(|slot| slot.with_timestamps(created_at, updated_at))
        .and_then(|slot| slot.place(warehouse))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Integer, Box::new(e)))
}

fn parse_timestamp(index: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::occupancy::Transition;
    use crate::slot::{OCCUPIED_COLOR, SlotKey};

    fn temp_store() -> (tempfile::TempDir, SlotStore) {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = SlotStore::open(temp_dir.path().join("yard.db")).unwrap();
        (temp_dir, store)
    }

    #[test]
    fn test_insert_and_select() {
        let (_dir, store) = temp_store();

        let slot = store
            .write_txn(|txn| txn.insert_slot("AXM", "#0000ff", 1))
            .unwrap();
        assert!(slot.id() > 0);
        assert_eq!(slot.default_color(), "#0000ff");

        assert!(store.exists_by_id(slot.id(), "AXM").unwrap());
        assert!(!store.exists_by_id(slot.id(), "BOG").unwrap());

        let fetched = store.select_by_id(slot.id(), "AXM").unwrap().unwrap();
        assert_eq!(fetched.number(), 1);
        assert_eq!(fetched.color(), "#0000ff");
        assert_eq!(fetched.created_at(), slot.created_at());

        let by_number = store.select_by_number("AXM", 1).unwrap().unwrap();
        assert_eq!(by_number.id(), slot.id());
        assert!(store.select_by_number("AXM", 2).unwrap().is_none());
    }

    #[test]
    fn test_scan_numbers_is_sorted_per_partition() {
        let (_dir, store) = temp_store();

        store
            .write_txn(|txn| {
                txn.insert_slot("AXM", "#0000ff", 3)?;
                txn.insert_slot("AXM", "#0000ff", 1)?;
                txn.insert_slot("AXM", "#ff0000", 2)?;
                txn.insert_slot("BOG", "#0000ff", 2)?;
                Ok(())
            })
            .unwrap();

        let numbers = store
            .write_txn(|txn| txn.scan_numbers("AXM", "#0000ff"))
            .unwrap();
        assert_eq!(numbers, vec![1, 3]);
    }

    #[test]
    fn test_failed_transaction_rolls_back() {
        let (_dir, store) = temp_store();

        let result: Result<()> = store.write_txn(|txn| {
            txn.insert_slot("AXM", "#0000ff", 1)?;
            Err(YardError::Internal("abort".to_string()))
        });
        assert!(result.is_err());
        assert!(store.select_all().unwrap().is_empty());
    }

    #[test]
    fn test_update_color_where_touches_one_row() {
        let (_dir, store) = temp_store();

        let slot = store
            .write_txn(|txn| txn.insert_slot("AXM", "#0000ff", 1))
            .unwrap();

        let key = SlotKey::new("AXM", "#0000ff", 1).unwrap();
        let occupy = Transition::Occupy.color_update(&key, OCCUPIED_COLOR);
        let updated = store
            .write_txn(|txn| txn.update_color_where(&occupy))
            .unwrap()
            .unwrap();
        assert_eq!(updated.id(), slot.id());
        assert_eq!(updated.color(), OCCUPIED_COLOR);
        assert_eq!(updated.default_color(), "#0000ff");

        let missing = SlotKey::new("AXM", "#00ff00", 1).unwrap();
        let none = store
            .write_txn(|txn| {
                txn.update_color_where(&Transition::Free.color_update(&missing, OCCUPIED_COLOR))
            })
            .unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn test_listing_order() {
        let (_dir, store) = temp_store();

        store
            .write_txn(|txn| {
                txn.insert_slot("BOG", "#0000ff", 2)?;
                txn.insert_slot("AXM", "#0000ff", 2)?;
                txn.insert_slot("AXM", "#ff0000", 1)?;
                Ok(())
            })
            .unwrap();

        let axm: Vec<i64> = store
            .select_by_warehouse("AXM")
            .unwrap()
            .iter()
            .map(Slot::number)
            .collect();
        assert_eq!(axm, vec![1, 2]);

        let all: Vec<String> = store
            .select_all()
            .unwrap()
            .iter()
            .map(|slot| slot.warehouse().to_string())
            .collect();
        assert_eq!(all, vec!["AXM", "AXM", "BOG"]);
        store.ping().unwrap();
    }
}
