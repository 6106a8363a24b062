//! CLI argument parsing for kbase.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// kbase: knowledge-base and model-provider manager.
///
/// Wiki repositories and model providers live in a SQLite database inside
/// the data directory. Creation is serialized per resource key by a
/// TTL-bounded lock shared by every process using the same directory.
#[derive(Parser, Debug)]
#[command(name = "kbase")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Options accepted by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Data directory (default: $KBASE_HOME, then ./.kbase).
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Acting user id (default: $KBASE_USER).
    #[arg(long, global = true, value_name = "ID")]
    pub user: Option<String>,

    /// Log lock and store activity to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands for kbase.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize a data directory.
    ///
    /// Creates the directory, `config.yaml` and the database schema.
    /// Running it again keeps the existing configuration.
    Init(InitArgs),

    /// Wiki repository commands.
    Wiki(WikiCommand),

    /// Model provider commands.
    Provider(ProviderCommand),

    /// Model commands.
    ///
    /// Models belong to a provider you registered.
    Model(ModelCommand),

    /// Model config commands.
    ///
    /// A config without a provider is the global fallback.
    ModelConfig(ModelConfigCommand),

    /// Lock management commands.
    ///
    /// List or clear creation lock entries.
    Lock(LockCommand),
}

/// Arguments for the `init` command.
#[derive(Parser, Debug, Default)]
pub struct InitArgs {
    /// Lock store backend written to a new config (sqlite, file).
    #[arg(long, value_name = "BACKEND")]
    pub lock_backend: Option<String>,

    /// Wiki identity mode written to a new config (path, id).
    #[arg(long, value_name = "MODE")]
    pub wiki_identity: Option<String>,
}

// ============================================================================
// wiki
// ============================================================================

/// Wiki subcommands.
#[derive(Parser, Debug)]
pub struct WikiCommand {
    #[command(subcommand)]
    pub action: WikiAction,
}

/// Available wiki actions.
#[derive(Subcommand, Debug)]
pub enum WikiAction {
    /// Create a wiki repository.
    Create(WikiCreateArgs),

    /// List your wiki repositories.
    List,

    /// Show a wiki repository by id or path.
    Show(WikiShowArgs),

    /// Update a wiki repository you created.
    Update(WikiUpdateArgs),

    /// Delete a wiki repository you created.
    Delete(WikiDeleteArgs),
}

/// Arguments for the `wiki create` command.
#[derive(Parser, Debug)]
pub struct WikiCreateArgs {
    /// Display name.
    #[arg(long)]
    pub name: String,

    /// Access path (letters, digits, '-' and '_').
    #[arg(long)]
    pub path: Option<String>,

    /// Embedding model id.
    #[arg(long = "embedding-model", value_name = "ID")]
    pub embedding_model_id: String,

    /// Rerank model id.
    #[arg(long = "rerank-model", value_name = "ID")]
    pub rerank_model_id: String,

    #[arg(long)]
    pub description: Option<String>,

    /// Cover image URL.
    #[arg(long)]
    pub cover: Option<String>,
}

/// Arguments for the `wiki show` command.
#[derive(Parser, Debug)]
pub struct WikiShowArgs {
    /// Repository id or access path.
    pub reference: String,
}

/// Arguments for the `wiki update` command.
#[derive(Parser, Debug)]
pub struct WikiUpdateArgs {
    /// Repository id.
    pub id: String,

    #[arg(long)]
    pub name: Option<String>,

    #[arg(long, conflicts_with = "clear_description")]
    pub description: Option<String>,

    /// Remove the description.
    #[arg(long)]
    pub clear_description: bool,

    #[arg(long, conflicts_with = "clear_cover")]
    pub cover: Option<String>,

    /// Remove the cover.
    #[arg(long)]
    pub clear_cover: bool,

    #[arg(long = "embedding-model", value_name = "ID")]
    pub embedding_model_id: Option<String>,

    #[arg(long = "rerank-model", value_name = "ID")]
    pub rerank_model_id: Option<String>,
}

/// Arguments for the `wiki delete` command.
#[derive(Parser, Debug)]
pub struct WikiDeleteArgs {
    /// Repository id.
    pub id: String,
}

// ============================================================================
// provider
// ============================================================================

/// Provider subcommands.
#[derive(Parser, Debug)]
pub struct ProviderCommand {
    #[command(subcommand)]
    pub action: ProviderAction,
}

/// Available provider actions.
#[derive(Subcommand, Debug)]
pub enum ProviderAction {
    /// Register a model provider.
    Create(ProviderCreateArgs),

    /// List your model providers.
    List,

    /// Show a model provider.
    Show(ProviderIdArgs),

    /// Update a model provider you registered.
    Update(ProviderUpdateArgs),

    /// Delete a model provider you registered.
    Delete(ProviderIdArgs),
}

/// Arguments for the `provider create` command.
#[derive(Parser, Debug)]
pub struct ProviderCreateArgs {
    /// Platform (DEEPSEEK, ALIBABA_TONGYI, VOLCANO_ARK).
    #[arg(long)]
    pub platform: String,

    #[arg(long)]
    pub api_key: String,

    #[arg(long)]
    pub api_base_url: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    /// Platform settings as a JSON object.
    #[arg(long, value_name = "JSON")]
    pub config: Option<String>,
}

/// Arguments naming one provider.
#[derive(Parser, Debug)]
pub struct ProviderIdArgs {
    /// Provider id.
    pub id: String,
}

/// Arguments for the `provider update` command.
#[derive(Parser, Debug)]
pub struct ProviderUpdateArgs {
    /// Provider id.
    pub id: String,

    #[arg(long)]
    pub api_key: Option<String>,

    #[arg(long, conflicts_with = "clear_api_base_url")]
    pub api_base_url: Option<String>,

    #[arg(long)]
    pub clear_api_base_url: bool,

    #[arg(long, conflicts_with = "clear_description")]
    pub description: Option<String>,

    #[arg(long)]
    pub clear_description: bool,

    /// Platform settings as a JSON object.
    #[arg(long, value_name = "JSON", conflicts_with = "clear_config")]
    pub config: Option<String>,

    #[arg(long)]
    pub clear_config: bool,
}

// ============================================================================
// model
// ============================================================================

/// Model subcommands.
#[derive(Parser, Debug)]
pub struct ModelCommand {
    #[command(subcommand)]
    pub action: ModelAction,
}

/// Available model actions.
#[derive(Subcommand, Debug)]
pub enum ModelAction {
    /// Add a model to one of your providers.
    Create(ModelCreateArgs),

    /// List your models.
    List(ModelListArgs),

    /// Show a model.
    Show(ModelIdArgs),

    /// Update a model you added.
    Update(ModelUpdateArgs),

    /// Delete a model you added.
    Delete(ModelIdArgs),
}

/// Arguments for the `model create` command.
#[derive(Parser, Debug)]
pub struct ModelCreateArgs {
    /// Provider id.
    #[arg(long = "provider")]
    pub provider_id: String,

    #[arg(long)]
    pub name: String,

    /// Model type (LLM, TEXT_EMBEDDING, RERANK, SPEECH2TEXT, TTS).
    #[arg(long = "type")]
    pub model_type: String,

    #[arg(long)]
    pub context_length: Option<u32>,
}

/// Arguments for the `model list` command.
#[derive(Parser, Debug)]
pub struct ModelListArgs {
    /// Only list models of this provider.
    #[arg(long = "provider")]
    pub provider_id: Option<String>,
}

/// Arguments naming one model.
#[derive(Parser, Debug)]
pub struct ModelIdArgs {
    /// Model id.
    pub id: String,
}

/// Arguments for the `model update` command.
#[derive(Parser, Debug)]
pub struct ModelUpdateArgs {
    /// Model id.
    pub id: String,

    /// Move the model to another of your providers.
    #[arg(long = "provider")]
    pub provider_id: Option<String>,

    #[arg(long)]
    pub name: Option<String>,

    #[arg(long = "type")]
    pub model_type: Option<String>,

    #[arg(long, conflicts_with = "clear_context_length")]
    pub context_length: Option<u32>,

    #[arg(long)]
    pub clear_context_length: bool,
}

// ============================================================================
// model-config
// ============================================================================

/// Model config subcommands.
#[derive(Parser, Debug)]
pub struct ModelConfigCommand {
    #[command(subcommand)]
    pub action: ModelConfigAction,
}

/// Available model config actions.
#[derive(Subcommand, Debug)]
pub enum ModelConfigAction {
    /// Create a config, global unless --provider is given.
    Create(ModelConfigCreateArgs),

    /// Show the effective config.
    ///
    /// With --provider, the provider's own config wins over the global one.
    Show(ModelConfigShowArgs),

    /// Update a config you created.
    Update(ModelConfigUpdateArgs),

    /// Delete a config you created.
    Delete(ModelConfigIdArgs),
}

/// Sampling values shared by `model-config create` and `update`.
#[derive(Args, Debug)]
pub struct SamplingArgs {
    #[arg(long)]
    pub temperature: Option<f64>,

    #[arg(long)]
    pub max_tokens: Option<u32>,

    #[arg(long)]
    pub top_p: Option<f64>,

    #[arg(long, allow_hyphen_values = true)]
    pub frequency_penalty: Option<f64>,

    #[arg(long, allow_hyphen_values = true)]
    pub presence_penalty: Option<f64>,

    /// Extra platform settings as a JSON object.
    #[arg(long, value_name = "JSON")]
    pub other_config: Option<String>,
}

/// Arguments for the `model-config create` command.
#[derive(Parser, Debug)]
pub struct ModelConfigCreateArgs {
    /// Provider id; omit for a global config.
    #[arg(long = "provider")]
    pub provider_id: Option<String>,

    #[command(flatten)]
    pub values: SamplingArgs,
}

/// Arguments for the `model-config show` command.
#[derive(Parser, Debug)]
pub struct ModelConfigShowArgs {
    /// Resolve the config for this provider.
    #[arg(long = "provider", conflicts_with = "id")]
    pub provider_id: Option<String>,

    /// Show one config by id instead.
    #[arg(long)]
    pub id: Option<String>,
}

/// Arguments naming one model config.
#[derive(Parser, Debug)]
pub struct ModelConfigIdArgs {
    /// Config id.
    pub id: String,
}

/// Arguments for the `model-config update` command.
#[derive(Parser, Debug)]
pub struct ModelConfigUpdateArgs {
    /// Config id.
    pub id: String,

    /// Attach the config to one of your providers.
    #[arg(long = "provider", conflicts_with = "global")]
    pub provider_id: Option<String>,

    /// Turn the config into the global one.
    #[arg(long)]
    pub global: bool,

    #[command(flatten)]
    pub values: SamplingArgs,

    /// Clear the listed fields (e.g. temperature,top_p).
    #[arg(long, value_delimiter = ',', value_name = "FIELDS")]
    pub clear: Vec<String>,
}

// ============================================================================
// lock
// ============================================================================

/// Lock subcommands.
#[derive(Parser, Debug)]
pub struct LockCommand {
    #[command(subcommand)]
    pub action: LockAction,
}

/// Available lock actions.
#[derive(Subcommand, Debug)]
pub enum LockAction {
    /// List all lock entries.
    ///
    /// Shows held and expired entries with their owner, age and remaining TTL.
    List,

    /// Clear a specific lock entry.
    ///
    /// Expired entries are cleared directly; a live entry needs --force.
    Clear(LockClearArgs),
}

/// Arguments for the `lock clear` command.
#[derive(Parser, Debug)]
pub struct LockClearArgs {
    /// Lock key (e.g., wiki-repo:create:my-wiki).
    pub key: String,

    /// Clear the entry even if it has not expired.
    #[arg(long)]
    pub force: bool,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
