use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, SecondsFormat, Utc};
use rusqlite::{named_params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};

use crate::config::AppConfig;
use crate::error::{StoreError, StoreResult};
use crate::model::Task;

const TASK_COLUMNS: &str = "id, category, title, date";
const HIGH_WATER_KEY: &str = "task_id_high_water";

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn initialize(config: &AppConfig) -> Result<Self> {
        let conn = Connection::open(config.db_path()).with_context(|| {
            format!("Failed to open database at {}", config.db_path().display())
        })?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .context("Failed to configure SQLite WAL mode")?;

        let db = Self { conn };
        db.apply_migrations()
            .context("Failed to apply database migrations")?;
        Ok(db)
    }

    /// Open a private database that lives only as long as the returned handle.
    pub fn open_in_memory() -> StoreResult<Self> {
        let db = Self {
            conn: Connection::open_in_memory()?,
        };
        db.apply_migrations()?;
        Ok(db)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Begin a write transaction. `IMMEDIATE` takes the write lock up front so
    /// concurrent writers from other processes queue instead of failing mid-way.
    pub fn transaction(&mut self) -> StoreResult<Transaction<'_>> {
        Ok(self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?)
    }

    pub fn fetch_tasks(&self) -> StoreResult<Vec<Task>> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks ORDER BY date ASC, id ASC");
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(map_task(row)?);
        }
        Ok(tasks)
    }

    /// Tasks whose category contains `needle`, case-sensitively.
    pub fn fetch_tasks_in_category(&self, needle: &str) -> StoreResult<Vec<Task>> {
        // instr() compares bytes; LIKE would fold ASCII case.
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE instr(category, :needle) > 0 \
             ORDER BY date ASC, id ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(named_params![":needle": needle])?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(map_task(row)?);
        }
        Ok(tasks)
    }

    pub fn fetch_task(&self, id: i64) -> StoreResult<Option<Task>> {
        fetch_task(&self.conn, id)
    }

    pub fn next_id(&self) -> StoreResult<i64> {
        let max_id: Option<i64> = self
            .conn
            .query_row("SELECT MAX(id) FROM tasks", [], |row| row.get(0))?;
        let high_water = read_high_water(&self.conn)?;
        Ok(match max_id.max(high_water) {
            Some(top) => top + 1,
            None => 0,
        })
    }

    fn apply_migrations(&self) -> rusqlite::Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS meta (key TEXT PRIMARY KEY, value TEXT);
             CREATE TABLE IF NOT EXISTS tasks (
                id INTEGER PRIMARY KEY,
                category TEXT NOT NULL,
                title TEXT NOT NULL,
                date TEXT NOT NULL
             );
             CREATE TABLE IF NOT EXISTS reminders (
                task_id INTEGER PRIMARY KEY,
                identifier TEXT NOT NULL,
                category TEXT NOT NULL,
                title TEXT NOT NULL,
                fire_at TEXT NOT NULL,
                state TEXT NOT NULL
             );
             CREATE INDEX IF NOT EXISTS idx_tasks_date ON tasks(date);
             CREATE INDEX IF NOT EXISTS idx_reminders_state ON reminders(state, fire_at);
            ",
        )
    }
}

pub(crate) fn fetch_task(conn: &Connection, id: i64) -> StoreResult<Option<Task>> {
    let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ? LIMIT 1");
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([id])?;
    match rows.next()? {
        Some(row) => Ok(Some(map_task(row)?)),
        None => Ok(None),
    }
}

/// Insert the task or overwrite the row with the same id. Returns `true` when inserted.
pub(crate) fn upsert_task(conn: &Connection, task: &Task) -> StoreResult<bool> {
    let existed = conn
        .query_row("SELECT 1 FROM tasks WHERE id = ?", [task.id], |_| Ok(()))
        .optional()?
        .is_some();

    conn.execute(
        "INSERT INTO tasks (id, category, title, date)
         VALUES (:id, :category, :title, :date)
         ON CONFLICT(id) DO UPDATE SET
            category = excluded.category,
            title = excluded.title,
            date = excluded.date",
        named_params![
            ":id": task.id,
            ":category": &task.category,
            ":title": &task.title,
            ":date": encode_timestamp(task.date),
        ],
    )?;
    advance_high_water(conn, task.id)?;
    Ok(!existed)
}

pub(crate) fn delete_task(conn: &Connection, id: i64) -> StoreResult<bool> {
    let affected = conn.execute("DELETE FROM tasks WHERE id = :id", named_params![":id": id])?;
    Ok(affected > 0)
}

fn read_high_water(conn: &Connection) -> StoreResult<Option<i64>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value FROM meta WHERE key = ?",
            [HIGH_WATER_KEY],
            |row| row.get(0),
        )
        .optional()?;
    raw.map(|value| {
        value
            .parse::<i64>()
            .map_err(|e| StoreError::CorruptRecord(format!("{HIGH_WATER_KEY}='{value}': {e}")))
    })
    .transpose()
}

fn advance_high_water(conn: &Connection, id: i64) -> StoreResult<()> {
    if read_high_water(conn)?.is_some_and(|current| current >= id) {
        return Ok(());
    }
    conn.execute(
        "INSERT INTO meta (key, value) VALUES (:key, :value)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        named_params![":key": HIGH_WATER_KEY, ":value": id.to_string()],
    )?;
    Ok(())
}

fn map_task(row: &Row<'_>) -> StoreResult<Task> {
    Ok(Task {
        id: row.get(0)?,
        category: row.get(1)?,
        title: row.get(2)?,
        date: decode_timestamp(&row.get::<_, String>(3)?)?,
    })
}

/// Years representable in the fixed-width four-digit timestamp encoding.
const STORABLE_YEARS: std::ops::RangeInclusive<i32> = 0..=9999;

/// Reject dates that [`encode_timestamp`] cannot write in fixed width or read back.
pub(crate) fn check_storable(value: DateTime<Utc>) -> StoreResult<()> {
    if STORABLE_YEARS.contains(&value.year()) {
        Ok(())
    } else {
        Err(StoreError::invalid(format!(
            "date {} is outside years {}..={}",
            value,
            STORABLE_YEARS.start(),
            STORABLE_YEARS.end()
        )))
    }
}

/// Fixed-width UTC form, so text ordering in SQL matches chronological ordering.
pub(crate) fn encode_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub(crate) fn decode_timestamp(raw: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::CorruptRecord(format!("timestamp '{}': {}", raw, e)))
}
