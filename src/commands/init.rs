//! Implementation of the `kbase init` command.
//!
//! # What `kbase init` does
//!
//! 1. Creates the data directory
//! 2. Writes `config.yaml` with defaults (if missing), applying `--lock-backend`
//!    and `--wiki-identity`
//! 3. Creates the database and its tables
//! 4. Prepares the configured lock store (`locks.db` or `locks/`)
//! 5. Records an `init` event
//!
//! The command is idempotent: an existing config is loaded and validated,
//! never overwritten.

use crate::cli::{GlobalArgs, InitArgs};
use crate::config::{Config, LockBackend, WikiIdentity};
use crate::context::{AppContext, resolve_user};
use crate::db::Database;
use crate::error::{KbError, Result};
use crate::events::{Event, EventAction, append_event};
use crate::fs::atomic_write_file;
use crate::locks::open_lock_store;
use serde_json::json;
use std::fs;

/// Execute the `kbase init` command.
pub fn cmd_init(global: &GlobalArgs, args: InitArgs) -> Result<()> {
    let ctx = AppContext::resolve(global.data_dir.as_deref())?;

    fs::create_dir_all(&ctx.data_dir).map_err(|e| {
        KbError::UserError(format!(
            "failed to create data directory '{}': {}",
            ctx.data_dir.display(),
            e
        ))
    })?;

    let config_created = write_config_if_missing(&ctx, &args)?;
    let config = Config::load(ctx.config_path())?;

    Database::open(&ctx.db_path)?;
    open_lock_store(&ctx, &config)?;
    if config.lock.backend == LockBackend::File {
        fs::create_dir_all(&ctx.locks_dir).map_err(|e| {
            KbError::UserError(format!(
                "failed to create locks directory '{}': {}",
                ctx.locks_dir.display(),
                e
            ))
        })?;
    }

    // An init needs no acting user; fall back to user@HOST.
    let actor = resolve_user(global.user.as_deref()).unwrap_or_default();
    let event = Event::new(EventAction::Init, &actor).with_details(json!({
        "config_created": config_created,
        "lock_backend": config.lock.backend,
        "wiki_identity": config.wiki.identity,
    }));
    append_event(&ctx, &event)?;

    println!("Initialized kbase.");
    println!();
    println!("Data directory: {}", ctx.data_dir.display());
    println!("Database:       {}", ctx.db_path.display());
    println!(
        "Config:         {}{}",
        ctx.config_path().display(),
        if config_created { "" } else { " (existing)" }
    );
    match config.lock.backend {
        LockBackend::Sqlite => println!("Lock store:     {}", ctx.lock_db_path.display()),
        LockBackend::File => println!("Lock store:     {}", ctx.locks_dir.display()),
    }
    println!("Wiki identity:  {:?}", config.wiki.identity);

    Ok(())
}

/// Write a default config unless one exists. Returns whether it was written.
fn write_config_if_missing(ctx: &AppContext, args: &InitArgs) -> Result<bool> {
    if ctx.config_path().exists() {
        if args.lock_backend.is_some() || args.wiki_identity.is_some() {
            eprintln!(
                "Warning: {} already exists; --lock-backend/--wiki-identity were not applied.",
                ctx.config_path().display()
            );
        }
        return Ok(false);
    }

    let mut config = Config::default();

    if let Some(backend) = &args.lock_backend {
        config.lock.backend = LockBackend::from_str(backend).ok_or_else(|| {
            KbError::UserError(format!(
                "unknown lock backend '{}' (expected 'sqlite' or 'file')",
                backend
            ))
        })?;
    }

    if let Some(identity) = &args.wiki_identity {
        config.wiki.identity = WikiIdentity::from_str(identity).ok_or_else(|| {
            KbError::UserError(format!(
                "unknown wiki identity '{}' (expected 'path' or 'id')",
                identity
            ))
        })?;
    }

    atomic_write_file(ctx.config_path(), &config.to_yaml()?)?;
    Ok(true)
}
