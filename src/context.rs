//! Data directory and caller context resolution for kbase.
//!
//! Every command works against one data directory holding the shared SQLite
//! database, the lock database, the configuration, the file lock store and
//! the audit log. The
//! directory is resolved in this order:
//!
//! 1. `--data-dir` flag
//! 2. `KBASE_HOME` environment variable
//! 3. `.kbase/` under the current working directory
//!
//! The acting user comes from `--user` or `KBASE_USER`; authentication is the
//! job of whatever sits in front of kbase.

use crate::error::{KbError, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Environment variable naming the data directory.
pub const HOME_ENV: &str = "KBASE_HOME";

/// Environment variable naming the acting user.
pub const USER_ENV: &str = "KBASE_USER";

/// Default data directory relative to the working directory.
pub const DEFAULT_DATA_DIR: &str = ".kbase";

/// Resolved paths for a kbase data directory.
///
/// All paths are absolute when resolved from an absolute directory.
#[derive(Debug, Clone)]
pub struct AppContext {
    /// The data directory.
    pub data_dir: PathBuf,

    /// SQLite database shared by every process using this directory.
    pub db_path: PathBuf,

    /// SQLite database holding the lock table of the sqlite lock backend.
    ///
    /// Kept apart from `db_path` so an open business transaction never
    /// holds up lock traffic for other keys.
    pub lock_db_path: PathBuf,

    /// Lock files for the file lock backend.
    pub locks_dir: PathBuf,
}

impl AppContext {
    /// Build the context for a specific data directory.
    pub fn at<P: AsRef<Path>>(data_dir: P) -> Self {
        let data_dir = data_dir.as_ref().to_path_buf();
        Self {
            db_path: data_dir.join("kbase.db"),
            lock_db_path: data_dir.join("locks.db"),
            locks_dir: data_dir.join("locks"),
            data_dir,
        }
    }

    /// Resolve the data directory from the flag, the environment, or the
    /// current working directory.
    pub fn resolve(data_dir: Option<&Path>) -> Result<Self> {
        if let Some(dir) = data_dir {
            return Ok(Self::at(dir));
        }

        if let Ok(dir) = env::var(HOME_ENV)
            && !dir.trim().is_empty()
        {
            return Ok(Self::at(dir));
        }

        let cwd = env::current_dir().map_err(|e| {
            KbError::UserError(format!("failed to get current working directory: {}", e))
        })?;
        Ok(Self::at(cwd.join(DEFAULT_DATA_DIR)))
    }

    /// Get the path to the config file.
    pub fn config_path(&self) -> PathBuf {
        self.data_dir.join("config.yaml")
    }

    /// Get the path to the events directory.
    pub fn events_dir(&self) -> PathBuf {
        self.data_dir.join("events")
    }

    /// Get the path to the main events log file.
    pub fn events_file(&self) -> PathBuf {
        self.events_dir().join("events.ndjson")
    }

    /// Check if the data directory has been initialized.
    pub fn is_initialized(&self) -> bool {
        self.config_path().exists()
    }

    /// Ensure the data directory is initialized, returning an error if not.
    ///
    /// This should be called by all commands except `init` to provide
    /// a helpful error message guiding users to run `kbase init`.
    pub fn ensure_initialized(&self) -> Result<()> {
        if !self.is_initialized() {
            return Err(KbError::UserError(format!(
                "kbase is not initialized.\n\
                 Expected config at: {}\n\n\
                 Run `kbase init` (or pass --data-dir) first.",
                self.config_path().display()
            )));
        }
        Ok(())
    }
}

/// Resolve the acting user from the flag or `KBASE_USER`.
pub fn resolve_user(user: Option<&str>) -> Result<String> {
    let user = match user {
        Some(user) => user.to_string(),
        None => env::var(USER_ENV).unwrap_or_default(),
    };

    let user = user.trim();
    if user.is_empty() {
        return Err(KbError::UserError(format!(
            "no acting user; pass --user or set {}",
            USER_ENV
        )));
    }
    Ok(user.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_paths_under_data_dir() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = AppContext::at(temp_dir.path());

        assert_eq!(ctx.data_dir, temp_dir.path());
        assert!(ctx.db_path.ends_with("kbase.db"));
        assert!(ctx.lock_db_path.ends_with("locks.db"));
        assert_ne!(ctx.db_path, ctx.lock_db_path);
        assert!(ctx.locks_dir.ends_with("locks"));
        assert!(ctx.config_path().ends_with("config.yaml"));
        assert!(ctx.events_file().ends_with("events/events.ndjson"));
    }

    #[test]
    #[serial]
    fn test_resolve_prefers_explicit_dir() {
        let temp_dir = TempDir::new().unwrap();
        unsafe { env::set_var(HOME_ENV, "/somewhere/else") };

        let ctx = AppContext::resolve(Some(temp_dir.path())).unwrap();
        assert_eq!(ctx.data_dir, temp_dir.path());

        unsafe { env::remove_var(HOME_ENV) };
    }

    #[test]
    #[serial]
    fn test_resolve_uses_home_env() {
        let temp_dir = TempDir::new().unwrap();
        unsafe { env::set_var(HOME_ENV, temp_dir.path()) };

        let ctx = AppContext::resolve(None).unwrap();
        assert_eq!(ctx.data_dir, temp_dir.path());

        unsafe { env::remove_var(HOME_ENV) };
    }

    #[test]
    #[serial]
    fn test_resolve_falls_back_to_cwd() {
        unsafe { env::remove_var(HOME_ENV) };

        let ctx = AppContext::resolve(None).unwrap();
        assert!(ctx.data_dir.ends_with(DEFAULT_DATA_DIR));
    }

    #[test]
    fn test_ensure_initialized() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = AppContext::at(temp_dir.path());

        let err = ctx.ensure_initialized().unwrap_err();
        assert!(err.to_string().contains("kbase init"));

        std::fs::write(ctx.config_path(), "").unwrap();
        assert!(ctx.ensure_initialized().is_ok());
    }

    #[test]
    #[serial]
    fn test_resolve_user() {
        unsafe { env::remove_var(USER_ENV) };
        assert_eq!(resolve_user(Some("alice")).unwrap(), "alice");
        assert!(resolve_user(None).is_err());
        assert!(resolve_user(Some("  ")).is_err());

        unsafe { env::set_var(USER_ENV, "bob") };
        assert_eq!(resolve_user(None).unwrap(), "bob");
        unsafe { env::remove_var(USER_ENV) };
    }
}
