//! Implementation of the `kbase provider` commands.

use super::wiki::nullable;
use super::{Session, or_dash};
use crate::cli::{
    GlobalArgs, ProviderAction, ProviderCreateArgs, ProviderIdArgs, ProviderUpdateArgs,
};
use crate::error::{KbError, Result};
use crate::events::{Event, EventAction};
use crate::model::ModelType;
use crate::provider::{
    CreateModelProvider, ModelProvider, ModelProviderService, Platform, UpdateModelProvider,
};
use serde_json::{Value, json};

/// Dispatch provider subcommands.
pub(super) fn dispatch(global: &GlobalArgs, action: ProviderAction) -> Result<()> {
    let session = Session::open(global)?;
    match action {
        ProviderAction::Create(args) => cmd_create(&session, global, args),
        ProviderAction::List => cmd_list(&session, global),
        ProviderAction::Show(args) => cmd_show(&session, args),
        ProviderAction::Update(args) => cmd_update(&session, global, args),
        ProviderAction::Delete(args) => cmd_delete(&session, global, args),
    }
}

fn cmd_create(session: &Session, global: &GlobalArgs, args: ProviderCreateArgs) -> Result<()> {
    let user = Session::user(global)?;
    let payload = CreateModelProvider {
        platform: parse_platform(&args.platform)?,
        api_key: args.api_key,
        api_base_url: args.api_base_url,
        description: args.description,
        config: args.config.as_deref().map(parse_config).transpose()?,
    };

    let mut service = ModelProviderService::open(&session.ctx, &session.config)?;
    let provider = service.create(payload, &user)?;

    session.record(
        &Event::new(EventAction::ProviderCreate, &user)
            .with_resource(&provider.id)
            .with_details(json!({ "platform": provider.platform })),
    );

    println!("Created model provider: {}", provider.platform);
    println!();
    println!("  ID:         {}", provider.id);
    println!("  API key:    {}", provider.masked_api_key());
    println!("  Creator:    {}", provider.creator_id);
    Ok(())
}

fn cmd_list(session: &Session, global: &GlobalArgs) -> Result<()> {
    let user = Session::user(global)?;
    let service = ModelProviderService::open(&session.ctx, &session.config)?;
    let providers = service.list(&user)?;

    if providers.is_empty() {
        println!("No model providers.");
        return Ok(());
    }

    println!("Model providers ({}):", providers.len());
    println!();
    for provider in &providers {
        println!("  {}  {}", provider.platform, provider.id);
        if !provider.model_types.is_empty() {
            println!("    Models: {}", join_types(&provider.model_types));
        }
    }
    Ok(())
}

fn cmd_show(session: &Session, args: ProviderIdArgs) -> Result<()> {
    let service = ModelProviderService::open(&session.ctx, &session.config)?;
    print_provider(&service.get_by_id(&args.id)?);
    Ok(())
}

fn cmd_update(session: &Session, global: &GlobalArgs, args: ProviderUpdateArgs) -> Result<()> {
    let user = Session::user(global)?;

    let config = if args.clear_config {
        Some(None)
    } else {
        args.config.as_deref().map(parse_config).transpose()?.map(Some)
    };
    let patch = UpdateModelProvider {
        api_key: args.api_key,
        api_base_url: nullable(args.api_base_url, args.clear_api_base_url),
        description: nullable(args.description, args.clear_description),
        config,
    };
    if patch.is_empty() {
        println!("Nothing to update.");
        return Ok(());
    }

    let mut service = ModelProviderService::open(&session.ctx, &session.config)?;
    let provider = service.update(&args.id, patch, &user)?;
    session.record(&Event::new(EventAction::ProviderUpdate, &user).with_resource(&provider.id));

    println!("Updated model provider: {}", provider.id);
    println!();
    print_provider(&provider);
    Ok(())
}

fn cmd_delete(session: &Session, global: &GlobalArgs, args: ProviderIdArgs) -> Result<()> {
    let user = Session::user(global)?;
    let mut service = ModelProviderService::open(&session.ctx, &session.config)?;

    service.delete(&args.id, &user)?;
    session.record(&Event::new(EventAction::ProviderDelete, &user).with_resource(&args.id));

    println!("Deleted model provider: {}", args.id);
    Ok(())
}

fn print_provider(provider: &ModelProvider) {
    println!("{}", provider.platform);
    println!("  ID:           {}", provider.id);
    println!("  API key:      {}", provider.masked_api_key());
    println!("  API base URL: {}", or_dash(provider.api_base_url.as_deref()));
    println!("  Description:  {}", or_dash(provider.description.as_deref()));
    if provider.model_types.is_empty() {
        println!("  Models:       -");
    } else {
        println!("  Models:       {}", join_types(&provider.model_types));
    }
    match &provider.config {
        Some(config) => println!("  Config:       {}", config),
        None => println!("  Config:       -"),
    }
}

fn join_types(types: &[ModelType]) -> String {
    types.iter().map(|t| t.as_str()).collect::<Vec<_>>().join(", ")
}

fn parse_platform(value: &str) -> Result<Platform> {
    Platform::from_str(value).ok_or_else(|| {
        let valid: Vec<&str> = Platform::ALL.iter().map(|p| p.as_str()).collect();
        KbError::UserError(format!(
            "unknown platform '{}' (expected one of: {})",
            value,
            valid.join(", ")
        ))
    })
}

fn parse_config(raw: &str) -> Result<Value> {
    serde_json::from_str(raw)
        .map_err(|e| KbError::UserError(format!("invalid --config JSON: {}", e)))
}
