//! Command implementations for kbase.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations, plus the session setup shared by every command that
//! works on an initialized data directory.

mod init;
mod lock;
mod model;
mod model_config;
mod provider;
mod wiki;


use crate::cli::{Cli, Command, GlobalArgs};
use crate::config::Config;
use crate::context::{AppContext, resolve_user};
use crate::error::Result;
use crate::events::{Event, append_event};

/// Dispatch a command to its implementation.
pub fn dispatch(cli: Cli) -> Result<()> {
    let Cli { global, command } = cli;
    match command {
        Command::Init(args) => init::cmd_init(&global, args),
        Command::Wiki(cmd) => wiki::dispatch(&global, cmd.action),
        Command::Provider(cmd) => provider::dispatch(&global, cmd.action),
        Command::Model(cmd) => model::dispatch(&global, cmd.action),
        Command::ModelConfig(cmd) => model_config::dispatch(&global, cmd.action),
        Command::Lock(cmd) => lock::dispatch(&global, cmd.action),
    }
}

/// An initialized data directory and its validated config.
pub(crate) struct Session {
    pub ctx: AppContext,
    pub config: Config,
}

impl Session {
    pub(crate) fn open(global: &GlobalArgs) -> Result<Self> {
        let ctx = AppContext::resolve(global.data_dir.as_deref())?;
        ctx.ensure_initialized()?;
        let config = Config::load(ctx.config_path())?;
        Ok(Self { ctx, config })
    }

    /// The acting user for commands that create or modify resources.
    pub(crate) fn user(global: &GlobalArgs) -> Result<String> {
        resolve_user(global.user.as_deref())
    }

    /// Append an audit event.
    ///
    /// The state change already happened, so a logging failure is reported
    /// as a warning instead of failing the command.
    pub(crate) fn record(&self, event: &Event) {
        if let Err(e) = append_event(&self.ctx, event) {
            eprintln!("Warning: failed to log {} event: {}", event.action, e);
        }
    }
}

/// Render an optional field for display.
pub(crate) fn or_dash(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}
