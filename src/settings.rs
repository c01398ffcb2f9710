// App settings store -- ~/.reframe-manager/app.db
// Holds the working directory, the Player directory and launcher overrides.
// Environment variables REFRAME_WORKDIR / REFRAME_EDITOR_DIR win over stored values.

use std::path::{Path, PathBuf};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use crate::constants::{
    APP_DB_DIR, APP_DB_FILENAME, ENV_EDITOR_DIR, ENV_WORKING_DIR, SETTING_EDITOR_COMMAND,
    SETTING_EDITOR_DIR, SETTING_LOG_LEVEL, SETTING_WORKING_DIR,
};
use crate::error::{IoContext, ReframeError, Result};

/// All migrations in order. Applied migrations are tracked in PRAGMA user_version.
const MIGRATIONS: &[&str] = &[
    // Migration 1: settings KV
    r#"
    CREATE TABLE IF NOT EXISTS app_settings (
        key TEXT PRIMARY KEY NOT NULL,
        value TEXT NOT NULL
    );
    "#,
    // Migration 2: default log level
    r#"
    INSERT OR IGNORE INTO app_settings (key, value) VALUES ('log_level', 'info');
    "#,
];

/// Get the path to the settings DB: ~/.reframe-manager/app.db
pub fn get_app_db_path() -> Result<PathBuf> {
    let home = directories::BaseDirs::new()
        .ok_or_else(|| ReframeError::DirectoryNotFound("home directory".to_string()))?;
    Ok(home.home_dir().join(APP_DB_DIR).join(APP_DB_FILENAME))
}

/// Open (creating if needed) the settings DB and bring its schema up to date.
pub fn open_app_db(db_path: &Path) -> Result<Connection> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).at(parent)?;
    }

    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA busy_timeout=5000;")?;
    run_migrations(&conn)?;
    Ok(conn)
}

fn get_schema_version(conn: &Connection) -> Result<u32> {
    let version: u32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    Ok(version)
}

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;
    let target_version = MIGRATIONS.len() as u32;

    if current_version > target_version {
        return Err(ReframeError::InvalidState(format!(
            "settings schema version {} is newer than this build supports (max {})",
            current_version, target_version
        )));
    }

    for (i, migration) in MIGRATIONS.iter().enumerate() {
        let migration_version = (i + 1) as u32;
        if migration_version <= current_version {
            continue;
        }

        conn.execute_batch(migration)?;
        conn.execute_batch(&format!("PRAGMA user_version = {}", migration_version))?;

        log::info!("Applied settings migration {}", migration_version);
    }

    Ok(())
}

/// Get a setting value by key.
pub fn get_setting(conn: &Connection, key: &str) -> Result<Option<String>> {
    let value = conn
        .query_row("SELECT value FROM app_settings WHERE key = ?1", [key], |row| row.get(0))
        .optional()?;
    Ok(value)
}

/// Set a setting value (upsert).
pub fn set_setting(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO app_settings (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![key, value],
    )?;
    Ok(())
}

/// Delete a setting by key.
pub fn delete_setting(conn: &Connection, key: &str) -> Result<()> {
    conn.execute("DELETE FROM app_settings WHERE key = ?1", [key])?;
    Ok(())
}

/// Resolved settings snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub working_dir: Option<PathBuf>,
    pub editor_dir: Option<PathBuf>,
    pub editor_command: Option<String>,
    pub log_level: Option<String>,
}

impl Settings {
    /// Load stored values, then apply environment overrides.
    pub fn load(conn: &Connection) -> Result<Self> {
        let mut settings = Self {
            working_dir: get_setting(conn, SETTING_WORKING_DIR)?.map(PathBuf::from),
            editor_dir: get_setting(conn, SETTING_EDITOR_DIR)?.map(PathBuf::from),
            editor_command: get_setting(conn, SETTING_EDITOR_COMMAND)?,
            log_level: get_setting(conn, SETTING_LOG_LEVEL)?,
        };

        if let Ok(dir) = std::env::var(ENV_WORKING_DIR) {
            settings.working_dir = Some(PathBuf::from(dir));
        }
        if let Ok(dir) = std::env::var(ENV_EDITOR_DIR) {
            settings.editor_dir = Some(PathBuf::from(dir));
        }

        Ok(settings)
    }

    /// The working directory, which must be set and exist.
    pub fn working_dir(&self) -> Result<&Path> {
        existing_dir(self.working_dir.as_deref(), "working directory")
    }

    /// The Player app directory, which must be set and exist.
    pub fn editor_dir(&self) -> Result<&Path> {
        existing_dir(self.editor_dir.as_deref(), "Player app directory")
    }
}

fn existing_dir<'a>(dir: Option<&'a Path>, what: &str) -> Result<&'a Path> {
    match dir {
        Some(d) if d.is_dir() => Ok(d),
        Some(d) => Err(ReframeError::DirectoryNotFound(format!("{} {}", what, d.display()))),
        None => Err(ReframeError::DirectoryNotFound(format!("{} not selected", what))),
    }
}

/// Store a directory setting after checking it exists.
pub fn set_directory(conn: &Connection, key: &str, dir: &Path) -> Result<PathBuf> {
    let dir = dir
        .canonicalize()
        .map_err(|_| ReframeError::DirectoryNotFound(dir.display().to_string()))?;
    if !dir.is_dir() {
        return Err(ReframeError::DirectoryNotFound(dir.display().to_string()));
    }
    set_setting(conn, key, &dir.to_string_lossy())?;
    Ok(dir)
}
