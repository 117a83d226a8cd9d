pub mod config;
pub mod database;
pub mod error;
pub mod model;
pub mod parser;
pub mod reminders;
pub mod services;

pub use config::AppConfig;
pub use database::Database;
pub use error::{StoreError, StoreResult};
pub use model::*;
pub use reminders::ReminderScheduler;
pub use services::TaskStore;
