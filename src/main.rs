use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = taskapp::cli::Cli::parse();
    taskapp::logging::init_tracing(cli.log_filter.as_deref())?;

    let config = taskapp::config::from_cli(&cli)?;
    let command = cli
        .command
        .clone()
        .unwrap_or_else(|| taskapp::cli::CliCommand::List(Default::default()));

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    taskapp::commands::execute(&config, command, &mut handle)?;
    Ok(())
}
