use std::path::PathBuf;

use clap::{value_parser, Args, Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "taskapp",
    version,
    about = "A local task list with per-task reminders.",
    after_help = "Examples:\n  taskapp add --category work --title \"Send report\" --date \"2025-01-10 17:00\"\n  taskapp list --search wo\n  taskapp edit 3 --date tomorrow\n  taskapp delete 3 4\n  taskapp fire"
)]
pub struct Cli {
    /// Override the data directory (defaults to platform-specific app dir)
    #[arg(long, value_name = "PATH", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Tracing filter directive (e.g. "info", "taskapp_core=debug")
    #[arg(long = "log", value_name = "DIRECTIVE", global = true)]
    pub log_filter: Option<String>,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CliCommand {
    /// List tasks ordered by date (default command)
    List(ListArgs),
    /// Create a task and schedule its reminder
    Add(AddArgs),
    /// Change fields of an existing task and reschedule its reminder
    Edit(EditArgs),
    /// Delete one or more tasks by id, cancelling their reminders
    Delete(DeleteArgs),
    /// Print the id the next new task will receive
    NextId,
    /// Show pending reminder registrations
    Reminders(RemindersArgs),
    /// Fire every reminder that is due now and print it
    Fire,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// Only show tasks whose category contains TEXT (case-sensitive)
    #[arg(long, short = 's', value_name = "TEXT")]
    pub search: Option<String>,

    /// Emit JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    /// Category used for searching
    #[arg(long)]
    pub category: String,

    /// Task title
    #[arg(long)]
    pub title: String,

    /// Due date (ISO e.g. 2025-12-24, '2025-12-24 18:30', today, +3d, mon); defaults to now
    #[arg(long = "date", value_name = "DATE")]
    pub date: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    /// Id of the task to change
    #[arg(value_name = "ID", value_parser = value_parser!(i64))]
    pub id: i64,

    #[arg(long)]
    pub category: Option<String>,

    #[arg(long)]
    pub title: Option<String>,

    /// New due date (same formats as `add --date`)
    #[arg(long = "date", value_name = "DATE")]
    pub date: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    /// One or more task ids to delete
    #[arg(value_name = "ID", required = true, value_parser = value_parser!(i64))]
    pub ids: Vec<i64>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct RemindersArgs {
    /// Emit JSON instead of text
    #[arg(long)]
    pub json: bool,
}
