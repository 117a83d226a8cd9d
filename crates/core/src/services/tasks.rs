use anyhow::Result;
use chrono::{DateTime, SubsecRound, Utc};
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::database::{self, check_storable, Database};
use crate::error::{StoreError, StoreResult};
use crate::model::{DeleteResult, Reminder, ReminderState, SaveOutcome, Task};
use crate::reminders::ReminderScheduler;

/// The task list and its reminders, backed by one [`Database`].
///
/// Reads always go to the database, so results reflect the latest commit.
/// Every mutation runs in a single transaction that also updates the task's
/// reminder; a failure rolls both back.
pub struct TaskStore {
    db: Database,
}

impl TaskStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn open(config: &AppConfig) -> Result<Self> {
        Ok(Self::new(Database::initialize(config)?))
    }

    /// All tasks, ascending by date.
    pub fn list(&self) -> StoreResult<Vec<Task>> {
        self.db.fetch_tasks()
    }

    /// Tasks whose category contains `needle`. An empty needle matches everything.
    pub fn filter(&self, needle: &str) -> StoreResult<Vec<Task>> {
        if needle.is_empty() {
            return self.list();
        }
        self.db.fetch_tasks_in_category(needle)
    }

    pub fn get(&self, id: i64) -> StoreResult<Option<Task>> {
        self.db.fetch_task(id)
    }

    pub fn require(&self, id: i64) -> StoreResult<Task> {
        self.get(id)?.ok_or(StoreError::NotFound(id))
    }

    /// Id for the next new task. Ids of deleted tasks are never handed out again.
    pub fn next_id(&self) -> StoreResult<i64> {
        self.db.next_id()
    }

    /// A fresh, unsaved task due now.
    pub fn new_task(&self) -> StoreResult<Task> {
        Ok(Task::new(
            self.next_id()?,
            String::new(),
            String::new(),
            Utc::now().trunc_subsecs(0),
        ))
    }

    /// Insert or overwrite `task` and (re)schedule its reminder.
    pub fn save(&mut self, task: &Task) -> StoreResult<SaveOutcome> {
        validate(task)?;

        let tx = self.db.transaction()?;
        let created = database::upsert_task(&tx, task)?;
        ReminderScheduler::new(&tx).schedule(task)?;
        tx.commit()?;

        info!(task_id = task.id, created, "task saved");
        Ok(SaveOutcome {
            id: task.id,
            created,
        })
    }

    /// Cancel and drop the reminder for `id`, then remove the task. Unknown ids are a no-op.
    pub fn delete(&mut self, id: i64) -> StoreResult<DeleteResult> {
        let tx = self.db.transaction()?;
        let scheduler = ReminderScheduler::new(&tx);
        scheduler.cancel(id)?;
        scheduler.forget(id)?;
        let deleted = database::delete_task(&tx, id)?;
        tx.commit()?;

        if deleted {
            info!(task_id = id, "task deleted");
        } else {
            debug!(task_id = id, "delete skipped, task not found");
        }
        self.log_pending();

        Ok(DeleteResult { id, deleted })
    }

    pub fn delete_many(&mut self, ids: &[i64]) -> StoreResult<Vec<DeleteResult>> {
        ids.iter().map(|id| self.delete(*id)).collect()
    }

    pub fn pending_reminders(&self) -> StoreResult<Vec<Reminder>> {
        self.scheduler().list_pending()
    }

    pub fn reminder_state(&self, id: i64) -> StoreResult<ReminderState> {
        self.scheduler().state(id)
    }

    /// Mark reminders due at or before `now` as fired and hand them back for delivery.
    pub fn fire_due(&mut self, now: DateTime<Utc>) -> StoreResult<Vec<Reminder>> {
        let tx = self.db.transaction()?;
        let fired = ReminderScheduler::new(&tx).fire_due(now)?;
        tx.commit()?;
        Ok(fired)
    }

    fn scheduler(&self) -> ReminderScheduler<'_> {
        ReminderScheduler::new(self.db.connection())
    }

    fn log_pending(&self) {
        match self.pending_reminders() {
            Ok(pending) => {
                for reminder in pending {
                    debug!(
                        task_id = reminder.task_id,
                        fire_at = %reminder.fire_at,
                        title = reminder.title.as_str(),
                        "pending reminder"
                    );
                }
            }
            Err(err) => debug!(error = %err, "could not list pending reminders"),
        }
    }
}

fn validate(task: &Task) -> StoreResult<()> {
    if task.id < 0 {
        return Err(StoreError::invalid(format!(
            "id must not be negative (got {})",
            task.id
        )));
    }
    if task.category.trim().is_empty() {
        return Err(StoreError::invalid("category cannot be empty"));
    }
    if task.title.trim().is_empty() {
        return Err(StoreError::invalid("title cannot be empty"));
    }
    check_storable(task.date)
}
