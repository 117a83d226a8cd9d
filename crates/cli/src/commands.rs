use std::fmt;
use std::io::Write;

use anyhow::Result;
use chrono::Utc;
use tracing::debug;

use crate::cli::{AddArgs, CliCommand, DeleteArgs, EditArgs, ListArgs, RemindersArgs};
use crate::config::AppConfig;
use crate::core::TaskStore;
use crate::model::{DeleteResult, Task};
use crate::parser::parse_date_spec;

pub fn execute<W: Write>(config: &AppConfig, command: CliCommand, mut writer: W) -> Result<()> {
    debug!(data_dir = %config.data_dir().display(), "opening task store");
    let mut store = TaskStore::open(config)?;
    match command {
        CliCommand::List(args) => handle_list(&store, &args, &mut writer),
        CliCommand::Add(args) => handle_add(&mut store, &args, &mut writer),
        CliCommand::Edit(args) => handle_edit(&mut store, &args, &mut writer),
        CliCommand::Delete(args) => handle_delete(&mut store, &args, &mut writer),
        CliCommand::NextId => {
            writeln!(writer, "{}", store.next_id()?)?;
            Ok(())
        }
        CliCommand::Reminders(args) => handle_reminders(&store, &args, &mut writer),
        CliCommand::Fire => handle_fire(&mut store, &mut writer),
    }
}

fn handle_list<W: Write>(store: &TaskStore, args: &ListArgs, mut writer: W) -> Result<()> {
    let search = args.search.as_deref().unwrap_or_default();
    let tasks = store.filter(search)?;

    if args.json {
        serde_json::to_writer_pretty(&mut writer, &tasks)?;
        writeln!(writer)?;
        return Ok(());
    }

    if tasks.is_empty() {
        if search.is_empty() {
            writeln!(writer, "No tasks")?;
        } else {
            writeln!(writer, "No tasks in categories matching '{}'", search)?;
        }
        return Ok(());
    }

    for task in &tasks {
        write!(writer, "{}", TaskCard(task))?;
    }
    Ok(())
}

fn handle_add<W: Write>(store: &mut TaskStore, args: &AddArgs, mut writer: W) -> Result<()> {
    let mut task = store.new_task()?;
    task.category = args.category.trim().to_string();
    task.title = args.title.trim().to_string();
    if let Some(spec) = &args.date {
        task.date = parse_date_spec(spec)?;
    }

    let outcome = store.save(&task)?;
    writeln!(
        writer,
        "Saved task {} (reminder at {})",
        outcome.id,
        task.formatted_date()
    )?;
    Ok(())
}

fn handle_edit<W: Write>(store: &mut TaskStore, args: &EditArgs, mut writer: W) -> Result<()> {
    let Some(mut task) = store.get(args.id)? else {
        writeln!(writer, "Task ID not found: {}", args.id)?;
        return Ok(());
    };

    if let Some(category) = &args.category {
        task.category = category.trim().to_string();
    }
    if let Some(title) = &args.title {
        task.title = title.trim().to_string();
    }
    if let Some(spec) = &args.date {
        task.date = parse_date_spec(spec)?;
    }

    store.save(&task)?;
    writeln!(writer, "Updated task {}", task.id)?;
    Ok(())
}

fn handle_delete<W: Write>(store: &mut TaskStore, args: &DeleteArgs, mut writer: W) -> Result<()> {
    let results = store.delete_many(&args.ids)?;
    let summary = DeleteSummary::from_results(&results);
    summary.write_to(&mut writer)?;
    Ok(())
}

fn handle_reminders<W: Write>(
    store: &TaskStore,
    args: &RemindersArgs,
    mut writer: W,
) -> Result<()> {
    let pending = store.pending_reminders()?;
    if args.json {
        serde_json::to_writer_pretty(&mut writer, &pending)?;
        writeln!(writer)?;
        return Ok(());
    }

    if pending.is_empty() {
        writeln!(writer, "No pending reminders")?;
    }
    for reminder in &pending {
        writeln!(writer, "{}", reminder)?;
    }
    Ok(())
}

fn handle_fire<W: Write>(store: &mut TaskStore, mut writer: W) -> Result<()> {
    let fired = store.fire_due(Utc::now())?;
    if fired.is_empty() {
        writeln!(writer, "No reminders due")?;
    }
    for reminder in &fired {
        writeln!(writer, "Reminder: {} ({})", reminder.title, reminder.body())?;
    }
    Ok(())
}

/// One task rendered the way the list shows it.
struct TaskCard<'a>(&'a Task);

impl fmt::Display for TaskCard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let task = self.0;
        writeln!(f, "#{}", task.id)?;
        writeln!(f, "  Category : {}", task.category)?;
        writeln!(f, "  Title    : {}", task.title)?;
        writeln!(f, "  Date     : {}", task.formatted_date())
    }
}

struct DeleteSummary {
    deleted: usize,
    missing: Vec<i64>,
}

impl DeleteSummary {
    fn from_results(results: &[DeleteResult]) -> Self {
        let mut deleted = 0usize;
        let mut missing = Vec::new();
        for result in results {
            if result.deleted {
                deleted += 1;
            } else {
                missing.push(result.id);
            }
        }
        Self { deleted, missing }
    }

    fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        writeln!(writer, "{}", SummaryLine::deleted(self.deleted))?;
        if !self.missing.is_empty() {
            let missing: Vec<String> = self.missing.iter().map(|id| id.to_string()).collect();
            writeln!(writer, "Not found: {}", missing.join(", "))?;
        }
        Ok(())
    }
}

enum SummaryLine {
    Deleted(usize),
    NoneDeleted,
}

impl SummaryLine {
    fn deleted(count: usize) -> Self {
        if count > 0 {
            SummaryLine::Deleted(count)
        } else {
            SummaryLine::NoneDeleted
        }
    }
}

impl fmt::Display for SummaryLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SummaryLine::Deleted(count) => {
                write!(
                    f,
                    "Deleted {} task{}",
                    count,
                    if *count == 1 { "" } else { "s" }
                )
            }
            SummaryLine::NoneDeleted => write!(f, "No tasks deleted"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ReminderState;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn temp_config() -> (AppConfig, TempDir) {
        let dir = TempDir::new().expect("temp dir");
        let config = AppConfig::from_data_dir(dir.path().to_path_buf());
        (config, dir)
    }

    fn run(config: &AppConfig, command: CliCommand) -> String {
        let mut output = Vec::new();
        execute(config, command, &mut output).expect("execute command");
        String::from_utf8(output).expect("utf8")
    }

    fn seed(config: &AppConfig, id: i64, category: &str, title: &str, days_ahead: i64) {
        let mut store = TaskStore::open(config).expect("open store");
        let date = Utc.with_ymd_and_hms(2030, 1, 1, 9, 0, 0).unwrap() + Duration::days(days_ahead);
        store
            .save(&Task::new(id, category, title, date))
            .expect("seed task");
    }

    #[test]
    fn add_assigns_sequential_ids() {
        let (config, _dir) = temp_config();
        let add = |title: &str| {
            CliCommand::Add(AddArgs {
                category: "work".into(),
                title: title.into(),
                date: Some("2030-01-01 09:00".into()),
            })
        };

        assert!(run(&config, add("First")).starts_with("Saved task 0"));
        assert!(run(&config, add("Second")).starts_with("Saved task 1"));
        assert_eq!(run(&config, CliCommand::NextId), "2\n");
    }

    #[test]
    fn add_rejects_blank_title() {
        let (config, _dir) = temp_config();
        let command = CliCommand::Add(AddArgs {
            category: "work".into(),
            title: "  ".into(),
            date: None,
        });
        let err = execute(&config, command, Vec::new()).unwrap_err();
        assert!(err.to_string().contains("title cannot be empty"));
        assert_eq!(run(&config, CliCommand::List(ListArgs::default())), "No tasks\n");
    }

    #[test]
    fn add_rejects_unusable_dates_without_saving() {
        let (config, _dir) = temp_config();
        for spec in ["+dé", "+9999999999999d", "+3000000d"] {
            let command = CliCommand::Add(AddArgs {
                category: "work".into(),
                title: "Someday".into(),
                date: Some(spec.into()),
            });
            assert!(execute(&config, command, Vec::new()).is_err(), "{spec}");
        }
        assert_eq!(run(&config, CliCommand::List(ListArgs::default())), "No tasks
");
        assert_eq!(run(&config, CliCommand::NextId), "0
");
    }

    #[test]
    fn list_renders_cards_in_date_order_and_filters() {
        let (config, _dir) = temp_config();
        seed(&config, 0, "work", "Later", 2);
        seed(&config, 1, "home", "Sooner", 1);

        let all = run(&config, CliCommand::List(ListArgs::default()));
        let sooner = all.find("Sooner").expect("sooner listed");
        let later = all.find("Later").expect("later listed");
        assert!(sooner < later);
        assert!(all.contains("  Category : home\n"));

        let filtered = run(
            &config,
            CliCommand::List(ListArgs {
                search: Some("wo".into()),
                json: false,
            }),
        );
        assert!(filtered.contains("Later"));
        assert!(!filtered.contains("Sooner"));

        let none = run(
            &config,
            CliCommand::List(ListArgs {
                search: Some("WO".into()),
                json: false,
            }),
        );
        assert_eq!(none, "No tasks in categories matching 'WO'\n");
    }

    #[test]
    fn list_json_is_machine_readable() {
        let (config, _dir) = temp_config();
        seed(&config, 4, "work", "Export", 0);

        let output = run(
            &config,
            CliCommand::List(ListArgs {
                search: None,
                json: true,
            }),
        );
        let parsed: serde_json::Value = serde_json::from_str(&output).expect("json");
        assert_eq!(parsed[0]["id"], 4);
        assert_eq!(parsed[0]["category"], "work");
    }

    #[test]
    fn edit_updates_fields_and_reports_missing() {
        let (config, _dir) = temp_config();
        seed(&config, 0, "work", "Draft", 1);

        let output = run(
            &config,
            CliCommand::Edit(EditArgs {
                id: 0,
                category: None,
                title: Some("Final".into()),
                date: None,
            }),
        );
        assert_eq!(output, "Updated task 0\n");

        let store = TaskStore::open(&config).expect("open");
        let task = store.require(0).expect("task");
        assert_eq!(task.title, "Final");
        assert_eq!(task.category, "work");
        drop(store);

        let missing = run(
            &config,
            CliCommand::Edit(EditArgs {
                id: 9,
                category: None,
                title: Some("Nope".into()),
                date: None,
            }),
        );
        assert_eq!(missing, "Task ID not found: 9\n");
    }

    #[test]
    fn delete_command_reports_deleted_and_missing() {
        let (config, _dir) = temp_config();
        seed(&config, 0, "work", "Test", 1);

        let output = run(&config, CliCommand::Delete(DeleteArgs { ids: vec![0, 7] }));
        assert!(output.contains("Deleted 1 task\n"));
        assert!(output.contains("Not found: 7"));

        let store = TaskStore::open(&config).expect("open");
        assert_eq!(store.reminder_state(0).unwrap(), ReminderState::Unscheduled);
        assert!(store.pending_reminders().unwrap().is_empty());
    }

    #[test]
    fn delete_command_handles_no_matches() {
        let (config, _dir) = temp_config();
        let output = run(&config, CliCommand::Delete(DeleteArgs { ids: vec![3] }));
        assert!(output.contains("No tasks deleted"));
    }

    #[test]
    fn reminders_and_fire_follow_task_dates() {
        let (config, _dir) = temp_config();
        seed(&config, 0, "work", "Future", 1);
        {
            let mut store = TaskStore::open(&config).expect("open");
            let past = Utc::now() - Duration::hours(1);
            store
                .save(&Task::new(1, "home", "Overdue", past))
                .expect("save overdue");
        }

        let pending = run(&config, CliCommand::Reminders(RemindersArgs::default()));
        assert!(pending.contains("Future"));
        assert!(pending.contains("Overdue"));

        let fired = run(&config, CliCommand::Fire);
        assert!(fired.starts_with("Reminder: Overdue (home · "));
        assert!(!fired.contains("Future"));
        assert_eq!(run(&config, CliCommand::Fire), "No reminders due\n");

        let pending = run(&config, CliCommand::Reminders(RemindersArgs::default()));
        assert!(!pending.contains("Overdue"));
    }
}
