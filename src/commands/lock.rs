//! Implementation of the `kbase lock` commands.
//!
//! # Commands
//!
//! - `kbase lock list` - Show all lock entries with owner, age and TTL
//! - `kbase lock clear <key> [--force]` - Clear a lock entry
//!
//! Clearing a live entry requires `--force` and is logged as a `lock_clear`
//! event, since the holder may still be mid-creation.

use super::Session;
use crate::cli::{GlobalArgs, LockAction, LockClearArgs};
use crate::context::resolve_user;
use crate::error::Result;
use crate::events::{Event, EventAction};
use crate::locks::{clear_lock, list_locks, open_lock_store};
use serde_json::json;

/// Dispatch lock subcommands.
pub(super) fn dispatch(global: &GlobalArgs, action: LockAction) -> Result<()> {
    let session = Session::open(global)?;
    match action {
        LockAction::List => cmd_list(&session),
        LockAction::Clear(args) => cmd_clear(&session, global, args),
    }
}

fn cmd_list(session: &Session) -> Result<()> {
    let store = open_lock_store(&session.ctx, &session.config)?;
    let locks = list_locks(store.as_ref())?;

    if locks.is_empty() {
        println!("No lock entries.");
        return Ok(());
    }

    println!("Lock entries ({}):", locks.len());
    println!();

    for info in &locks {
        let entry = &info.entry;
        println!("  {}", entry.key);
        println!("    Owner:   {}", entry.owner);
        if let Some(pid) = entry.pid {
            println!("    PID:     {}", pid);
        }
        println!(
            "    Created: {} ({} ago)",
            entry.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
            entry.age_string()
        );
        println!("    Action:  {}", entry.action);
        if info.is_expired {
            println!("    Status:  EXPIRED");
        } else {
            println!("    Expires: {}", entry.expires_at.format("%Y-%m-%d %H:%M:%S UTC"));
        }
        println!();
    }

    let expired = locks.iter().filter(|l| l.is_expired).count();
    if expired > 0 {
        println!(
            "{} expired entr{}; the next acquisition of the same key takes it over, or run `kbase lock clear <key>`.",
            expired,
            if expired == 1 { "y" } else { "ies" }
        );
    }

    Ok(())
}

fn cmd_clear(session: &Session, global: &GlobalArgs, args: LockClearArgs) -> Result<()> {
    let store = open_lock_store(&session.ctx, &session.config)?;
    let cleared = clear_lock(store.as_ref(), &args.key, args.force)?;

    let actor = resolve_user(global.user.as_deref()).unwrap_or_default();
    session.record(
        &Event::new(EventAction::LockClear, &actor)
            .with_resource(&args.key)
            .with_details(json!({
                "owner": cleared.entry.owner,
                "action": cleared.entry.action,
                "was_expired": cleared.is_expired,
                "force": args.force,
                "age": cleared.entry.age_string(),
            })),
    );

    println!("Cleared lock: {}", args.key);
    println!();
    println!("  Owner:   {}", cleared.entry.owner);
    println!("  Action:  {}", cleared.entry.action);
    println!("  Age:     {}", cleared.entry.age_string());
    if !cleared.is_expired {
        println!();
        println!("Warning: the entry had not expired; its holder may still be running.");
    }

    Ok(())
}
