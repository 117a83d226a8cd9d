pub mod cli;
pub mod commands;
pub mod config;
pub mod logging;

pub use taskapp_core as core;
pub use taskapp_core::database as db;
pub use taskapp_core::model;
pub use taskapp_core::parser;

pub use taskapp_core::AppConfig;
