//! Implementation of the `kbase model-config` commands.

use super::{Session, or_dash};
use crate::cli::{
    GlobalArgs, ModelConfigAction, ModelConfigCreateArgs, ModelConfigIdArgs,
    ModelConfigShowArgs, ModelConfigUpdateArgs, SamplingArgs,
};
use crate::error::{KbError, Result};
use crate::events::{Event, EventAction};
use crate::model_config::{
    CreateModelConfig, ModelConfig, ModelConfigService, UpdateModelConfig,
};
use serde_json::{Value, json};

/// Fields `model-config update --clear` accepts.
const CLEARABLE: [&str; 6] = [
    "temperature",
    "max_tokens",
    "top_p",
    "frequency_penalty",
    "presence_penalty",
    "other_config",
];

/// Dispatch model config subcommands.
pub(super) fn dispatch(global: &GlobalArgs, action: ModelConfigAction) -> Result<()> {
    let session = Session::open(global)?;
    match action {
        ModelConfigAction::Create(args) => cmd_create(&session, global, args),
        ModelConfigAction::Show(args) => cmd_show(&session, args),
        ModelConfigAction::Update(args) => cmd_update(&session, global, args),
        ModelConfigAction::Delete(args) => cmd_delete(&session, global, args),
    }
}

fn cmd_create(session: &Session, global: &GlobalArgs, args: ModelConfigCreateArgs) -> Result<()> {
    let user = Session::user(global)?;
    let values = args.values;
    let payload = CreateModelConfig {
        provider_id: args.provider_id,
        temperature: values.temperature,
        max_tokens: values.max_tokens,
        top_p: values.top_p,
        frequency_penalty: values.frequency_penalty,
        presence_penalty: values.presence_penalty,
        other_config: values.other_config.as_deref().map(parse_other_config).transpose()?,
    };

    let mut service = ModelConfigService::open(&session.ctx)?;
    let config = service.create(payload, &user)?;

    session.record(
        &Event::new(EventAction::ModelConfigCreate, &user)
            .with_resource(&config.id)
            .with_details(json!({ "provider_id": config.provider_id })),
    );

    println!("Created model config: {}", config.id);
    println!();
    print_config(&config);
    Ok(())
}

fn cmd_show(session: &Session, args: ModelConfigShowArgs) -> Result<()> {
    let service = ModelConfigService::open(&session.ctx)?;

    if let Some(id) = &args.id {
        print_config(&service.get_by_id(id)?);
        return Ok(());
    }

    match service.effective_config(args.provider_id.as_deref())? {
        Some(config) => print_config(&config),
        None => println!("No model config."),
    }
    Ok(())
}

fn cmd_update(session: &Session, global: &GlobalArgs, args: ModelConfigUpdateArgs) -> Result<()> {
    let user = Session::user(global)?;
    let patch = build_patch(&args)?;
    if patch.is_empty() {
        println!("Nothing to update.");
        return Ok(());
    }

    let mut service = ModelConfigService::open(&session.ctx)?;
    let config = service.update(&args.id, patch, &user)?;
    session.record(&Event::new(EventAction::ModelConfigUpdate, &user).with_resource(&config.id));

    println!("Updated model config: {}", config.id);
    println!();
    print_config(&config);
    Ok(())
}

fn cmd_delete(session: &Session, global: &GlobalArgs, args: ModelConfigIdArgs) -> Result<()> {
    let user = Session::user(global)?;
    let mut service = ModelConfigService::open(&session.ctx)?;

    service.delete(&args.id, &user)?;
    session.record(&Event::new(EventAction::ModelConfigDelete, &user).with_resource(&args.id));

    println!("Deleted model config: {}", args.id);
    Ok(())
}

fn build_patch(args: &ModelConfigUpdateArgs) -> Result<UpdateModelConfig> {
    for field in &args.clear {
        if !CLEARABLE.contains(&field.as_str()) {
            return Err(KbError::UserError(format!(
                "cannot clear '{}' (expected one of: {})",
                field,
                CLEARABLE.join(", ")
            )));
        }
    }
    let clear = |name: &str| args.clear.iter().any(|f| f == name);
    let values: &SamplingArgs = &args.values;

    let provider_id = if args.global {
        Some(None)
    } else {
        args.provider_id.clone().map(Some)
    };
    let other_config = values
        .other_config
        .as_deref()
        .map(parse_other_config)
        .transpose()?;

    Ok(UpdateModelConfig {
        provider_id,
        temperature: field("temperature", values.temperature, clear("temperature"))?,
        max_tokens: field("max_tokens", values.max_tokens, clear("max_tokens"))?,
        top_p: field("top_p", values.top_p, clear("top_p"))?,
        frequency_penalty: field(
            "frequency_penalty",
            values.frequency_penalty,
            clear("frequency_penalty"),
        )?,
        presence_penalty: field(
            "presence_penalty",
            values.presence_penalty,
            clear("presence_penalty"),
        )?,
        other_config: field("other_config", other_config, clear("other_config"))?,
    })
}

/// Map a value / clear pair onto a nullable patch field.
fn field<T>(name: &str, value: Option<T>, clear: bool) -> Result<Option<Option<T>>> {
    match (value, clear) {
        (Some(_), true) => Err(KbError::UserError(format!(
            "--{} and --clear {} conflict",
            name.replace('_', "-"),
            name
        ))),
        (_, true) => Ok(Some(None)),
        (value, false) => Ok(value.map(Some)),
    }
}

fn print_config(config: &ModelConfig) {
    let number = |value: Option<f64>| value.map(|v| v.to_string());
    println!("  ID:                {}", config.id);
    println!(
        "  Scope:             {}",
        config.provider_id.as_deref().unwrap_or("global")
    );
    println!("  Temperature:       {}", or_dash(number(config.temperature).as_deref()));
    println!(
        "  Max tokens:        {}",
        or_dash(config.max_tokens.map(|v| v.to_string()).as_deref())
    );
    println!("  Top p:             {}", or_dash(number(config.top_p).as_deref()));
    println!(
        "  Frequency penalty: {}",
        or_dash(number(config.frequency_penalty).as_deref())
    );
    println!(
        "  Presence penalty:  {}",
        or_dash(number(config.presence_penalty).as_deref())
    );
    match &config.other_config {
        Some(other) => println!("  Other:             {}", other),
        None => println!("  Other:             -"),
    }
}

fn parse_other_config(raw: &str) -> Result<Value> {
    serde_json::from_str(raw)
        .map_err(|e| KbError::UserError(format!("invalid --other-config JSON: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Command, ModelConfigAction};
    use clap::Parser;

    fn update_args(argv: &[&str]) -> ModelConfigUpdateArgs {
        let mut full = vec!["kbase", "model-config", "update", "cfg-1"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Command::ModelConfig(cmd) => match cmd.action {
                ModelConfigAction::Update(args) => args,
                other => panic!("unexpected action {other:?}"),
            },
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_build_patch_sets_and_clears() {
        let patch = build_patch(&update_args(&[
            "--temperature",
            "0.4",
            "--frequency-penalty",
            "-1.5",
            "--clear",
            "top_p,other_config",
        ]))
        .unwrap();

        assert_eq!(patch.temperature, Some(Some(0.4)));
        assert_eq!(patch.frequency_penalty, Some(Some(-1.5)));
        assert_eq!(patch.top_p, Some(None));
        assert_eq!(patch.other_config, Some(None));
        assert_eq!(patch.max_tokens, None);
        assert_eq!(patch.provider_id, None);
    }

    #[test]
    fn test_build_patch_scope() {
        let patch = build_patch(&update_args(&["--global"])).unwrap();
        assert_eq!(patch.provider_id, Some(None));

        let patch = build_patch(&update_args(&["--provider", "p-1"])).unwrap();
        assert_eq!(patch.provider_id, Some(Some("p-1".to_string())));
    }

    #[test]
    fn test_build_patch_rejects_bad_clear() {
        let err = build_patch(&update_args(&["--clear", "name"])).unwrap_err();
        assert!(err.to_string().contains("cannot clear 'name'"));

        let err = build_patch(&update_args(&["--top-p", "0.5", "--clear", "top_p"])).unwrap_err();
        assert!(err.to_string().contains("conflict"));
    }
}
