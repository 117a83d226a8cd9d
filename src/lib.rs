pub use taskapp_cli::cli;
pub use taskapp_cli::commands;
pub use taskapp_cli::config;
pub use taskapp_cli::logging;

pub use taskapp_core as core;
pub use taskapp_core::database as db;
pub use taskapp_core::model;
pub use taskapp_core::parser;
pub use taskapp_core::{AppConfig, StoreError, TaskStore};
