//! Reminder registrations, one per task id.
//!
//! The scheduler records what should be delivered and when. Delivery itself
//! belongs to whatever notification runtime drives [`ReminderScheduler::fire_due`].
//! Each registration moves `Unscheduled -> Scheduled -> {Fired | Cancelled}`;
//! saving the task again puts it back into `Scheduled`.

use chrono::{DateTime, Utc};
use rusqlite::{named_params, Connection, OptionalExtension, Row};
use tracing::debug;

use crate::database::{check_storable, decode_timestamp, encode_timestamp};
use crate::error::{StoreError, StoreResult};
use crate::model::{Reminder, ReminderState, Task};

const REMINDER_COLUMNS: &str = "task_id, identifier, category, title, fire_at, state";

/// Operates on whatever connection or transaction it is given, so reminder
/// changes commit or roll back together with the task rows they belong to.
pub struct ReminderScheduler<'c> {
    conn: &'c Connection,
}

impl<'c> ReminderScheduler<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Register a reminder for `task`, replacing any earlier registration for its id.
    pub fn schedule(&self, task: &Task) -> StoreResult<Reminder> {
        check_storable(task.date)?;
        let reminder = Reminder::for_task(task);
        self.conn.execute(
            "INSERT INTO reminders (task_id, identifier, category, title, fire_at, state)
             VALUES (:task_id, :identifier, :category, :title, :fire_at, :state)
             ON CONFLICT(task_id) DO UPDATE SET
                identifier = excluded.identifier,
                category = excluded.category,
                title = excluded.title,
                fire_at = excluded.fire_at,
                state = excluded.state",
            named_params![
                ":task_id": reminder.task_id,
                ":identifier": &reminder.identifier,
                ":category": &reminder.category,
                ":title": &reminder.title,
                ":fire_at": encode_timestamp(reminder.fire_at),
                ":state": reminder.state.as_str(),
            ],
        )?;
        debug!(
            task_id = reminder.task_id,
            fire_at = %reminder.fire_at,
            "reminder scheduled"
        );
        Ok(reminder)
    }

    /// Cancel the pending registration for `task_id`. Returns `false` when nothing was pending.
    pub fn cancel(&self, task_id: i64) -> StoreResult<bool> {
        let affected = self.conn.execute(
            "UPDATE reminders SET state = :cancelled WHERE task_id = :task_id AND state = :scheduled",
            named_params![
                ":cancelled": ReminderState::Cancelled.as_str(),
                ":scheduled": ReminderState::Scheduled.as_str(),
                ":task_id": task_id,
            ],
        )?;
        if affected > 0 {
            debug!(task_id, "reminder cancelled");
        }
        Ok(affected > 0)
    }

    /// Drop the registration for `task_id` whatever its state. Returns `false` when there was none.
    pub fn forget(&self, task_id: i64) -> StoreResult<bool> {
        let removed = self.conn.execute(
            "DELETE FROM reminders WHERE task_id = :task_id",
            named_params![":task_id": task_id],
        )?;
        Ok(removed > 0)
    }

    pub fn list_pending(&self) -> StoreResult<Vec<Reminder>> {
        self.query_scheduled(None)
    }

    pub fn state(&self, task_id: i64) -> StoreResult<ReminderState> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT state FROM reminders WHERE task_id = ?",
                [task_id],
                |row| row.get(0),
            )
            .optional()?;
        match raw {
            Some(value) => parse_state(&value),
            None => Ok(ReminderState::Unscheduled),
        }
    }

    /// Move every scheduled reminder due at or before `now` to `Fired` and return them.
    pub fn fire_due(&self, now: DateTime<Utc>) -> StoreResult<Vec<Reminder>> {
        let mut due = self.query_scheduled(Some(now))?;
        for reminder in &mut due {
            self.conn.execute(
                "UPDATE reminders SET state = :fired WHERE task_id = :task_id",
                named_params![
                    ":fired": ReminderState::Fired.as_str(),
                    ":task_id": reminder.task_id,
                ],
            )?;
            reminder.state = ReminderState::Fired;
            debug!(task_id = reminder.task_id, "reminder fired");
        }
        Ok(due)
    }

    fn query_scheduled(&self, due_by: Option<DateTime<Utc>>) -> StoreResult<Vec<Reminder>> {
        let mut sql = format!("SELECT {REMINDER_COLUMNS} FROM reminders WHERE state = :scheduled");
        if due_by.is_some() {
            sql.push_str(" AND fire_at <= :due_by");
        }
        sql.push_str(" ORDER BY fire_at ASC, task_id ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let scheduled = ReminderState::Scheduled.as_str();
        let mut rows = match due_by {
            Some(limit) => stmt.query(named_params![
                ":scheduled": scheduled,
                ":due_by": encode_timestamp(limit),
            ])?,
            None => stmt.query(named_params![":scheduled": scheduled])?,
        };

        let mut reminders = Vec::new();
        while let Some(row) = rows.next()? {
            reminders.push(map_reminder(row)?);
        }
        Ok(reminders)
    }
}

fn map_reminder(row: &Row<'_>) -> StoreResult<Reminder> {
    Ok(Reminder {
        task_id: row.get(0)?,
        identifier: row.get(1)?,
        category: row.get(2)?,
        title: row.get(3)?,
        fire_at: decode_timestamp(&row.get::<_, String>(4)?)?,
        state: parse_state(&row.get::<_, String>(5)?)?,
    })
}

fn parse_state(raw: &str) -> StoreResult<ReminderState> {
    raw.parse::<ReminderState>()
        .map_err(|e| StoreError::CorruptRecord(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn schedule_replaces_existing_registration() {
        let db = Database::open_in_memory().expect("db");
        let scheduler = ReminderScheduler::new(db.connection());

        scheduler
            .schedule(&Task::new(4, "work", "Draft", at(9)))
            .unwrap();
        scheduler
            .schedule(&Task::new(4, "work", "Final", at(11)))
            .unwrap();

        let pending = scheduler.list_pending().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].title, "Final");
        assert_eq!(pending[0].fire_at, at(11));
        assert_eq!(pending[0].identifier, "4");
    }

    #[test]
    fn cancel_is_noop_without_registration() {
        let db = Database::open_in_memory().expect("db");
        let scheduler = ReminderScheduler::new(db.connection());

        assert!(!scheduler.cancel(42).unwrap());
        assert_eq!(scheduler.state(42).unwrap(), ReminderState::Unscheduled);
    }

    #[test]
    fn cancelled_and_fired_are_terminal_until_rescheduled() {
        let db = Database::open_in_memory().expect("db");
        let scheduler = ReminderScheduler::new(db.connection());
        let task = Task::new(1, "home", "Water plants", at(8));

        scheduler.schedule(&task).unwrap();
        assert!(scheduler.cancel(1).unwrap());
        assert_eq!(scheduler.state(1).unwrap(), ReminderState::Cancelled);
        assert!(!scheduler.cancel(1).unwrap());
        assert!(scheduler.fire_due(at(23)).unwrap().is_empty());

        scheduler.schedule(&task).unwrap();
        let fired = scheduler.fire_due(at(23)).unwrap();
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].state, ReminderState::Fired);
        assert_eq!(scheduler.state(1).unwrap(), ReminderState::Fired);
        assert!(!scheduler.cancel(1).unwrap());
    }

    #[test]
    fn forget_drops_registration_in_any_state() {
        let db = Database::open_in_memory().expect("db");
        let scheduler = ReminderScheduler::new(db.connection());
        scheduler.schedule(&Task::new(3, "home", "Bins", at(6))).unwrap();
        scheduler.fire_due(at(7)).unwrap();

        assert!(scheduler.forget(3).unwrap());
        assert_eq!(scheduler.state(3).unwrap(), ReminderState::Unscheduled);
        assert!(!scheduler.forget(3).unwrap());
    }

    #[test]
    fn schedule_rejects_unstorable_dates() {
        let db = Database::open_in_memory().expect("db");
        let scheduler = ReminderScheduler::new(db.connection());
        let far = Utc.with_ymd_and_hms(12000, 1, 1, 0, 0, 0).unwrap();

        let err = scheduler.schedule(&Task::new(1, "a", "Far", far)).unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput(_)));
        assert!(scheduler.list_pending().unwrap().is_empty());
    }

    #[test]
    fn fire_due_only_takes_due_reminders_in_time_order() {
        let db = Database::open_in_memory().expect("db");
        let scheduler = ReminderScheduler::new(db.connection());
        scheduler.schedule(&Task::new(0, "a", "Late", at(12))).unwrap();
        scheduler.schedule(&Task::new(1, "b", "Early", at(7))).unwrap();
        scheduler.schedule(&Task::new(2, "c", "Noon", at(10))).unwrap();

        let fired = scheduler.fire_due(at(10)).unwrap();
        let ids: Vec<i64> = fired.iter().map(|r| r.task_id).collect();
        assert_eq!(ids, vec![1, 2]);

        let pending = scheduler.list_pending().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].task_id, 0);

        let later = scheduler.fire_due(at(12) + Duration::seconds(1)).unwrap();
        assert_eq!(later.len(), 1);
        assert!(scheduler.list_pending().unwrap().is_empty());
    }
}
