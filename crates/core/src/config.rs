use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use directories::{BaseDirs, ProjectDirs};
use once_cell::sync::Lazy;
use tracing::debug;

const DB_FILE_NAME: &str = "taskapp.sqlite3";
const DATA_DIR_ENV: &str = "TASKAPP_DATA_DIR";
const HOME_DIR_NAME: &str = ".taskapp";

static PROJECT_DIRS: Lazy<Option<ProjectDirs>> =
    Lazy::new(|| ProjectDirs::from("dev", "taskapp", "taskapp"));

/// Which setting supplied the data directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DataDirSource {
    Flag,
    Environment,
    Platform,
    Home,
}

/// Location of the task database.
#[derive(Debug, Clone)]
pub struct AppConfig {
    data_dir: PathBuf,
    db_path: PathBuf,
}

impl AppConfig {
    /// Resolve the data directory from `--data-dir`, then `TASKAPP_DATA_DIR`, then the
    /// platform data directory, then `~/.taskapp`. The directory is created when missing.
    pub fn discover(flag: Option<PathBuf>) -> Result<Self> {
        let env_value = env::var(DATA_DIR_ENV).ok();
        let (data_dir, source) = resolve_data_dir(flag, env_value)?;
        debug!(data_dir = %data_dir.display(), ?source, "data directory resolved");

        fs::create_dir_all(&data_dir).with_context(|| {
            format!("Failed to create data directory at {}", data_dir.display())
        })?;
        Ok(Self::from_data_dir(data_dir))
    }

    pub fn from_data_dir(data_dir: PathBuf) -> Self {
        let db_path = data_dir.join(DB_FILE_NAME);
        Self { data_dir, db_path }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

fn resolve_data_dir(
    flag: Option<PathBuf>,
    env_value: Option<String>,
) -> Result<(PathBuf, DataDirSource)> {
    if let Some(dir) = flag {
        return Ok((dir, DataDirSource::Flag));
    }
    if let Some(dir) = env_value.filter(|value| !value.trim().is_empty()) {
        return Ok((PathBuf::from(dir), DataDirSource::Environment));
    }
    if let Some(project) = PROJECT_DIRS.as_ref() {
        return Ok((project.data_dir().to_path_buf(), DataDirSource::Platform));
    }
    BaseDirs::new()
        .map(|base| (base.home_dir().join(HOME_DIR_NAME), DataDirSource::Home))
        .ok_or_else(|| {
            anyhow!("Could not determine a home directory; pass --data-dir or set {DATA_DIR_ENV}")
        })
}
