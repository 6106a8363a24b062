//! Implementation of the `kbase model` commands.

use super::Session;
use crate::cli::{
    GlobalArgs, ModelAction, ModelCreateArgs, ModelIdArgs, ModelListArgs, ModelUpdateArgs,
};
use crate::error::{KbError, Result};
use crate::events::{Event, EventAction};
use crate::model::{CreateModel, Model, ModelService, ModelType, UpdateModel};
use serde_json::json;

/// Dispatch model subcommands.
pub(super) fn dispatch(global: &GlobalArgs, action: ModelAction) -> Result<()> {
    let session = Session::open(global)?;
    match action {
        ModelAction::Create(args) => cmd_create(&session, global, args),
        ModelAction::List(args) => cmd_list(&session, global, args),
        ModelAction::Show(args) => cmd_show(&session, args),
        ModelAction::Update(args) => cmd_update(&session, global, args),
        ModelAction::Delete(args) => cmd_delete(&session, global, args),
    }
}

fn cmd_create(session: &Session, global: &GlobalArgs, args: ModelCreateArgs) -> Result<()> {
    let user = Session::user(global)?;
    let payload = CreateModel {
        provider_id: args.provider_id,
        name: args.name,
        model_type: parse_model_type(&args.model_type)?,
        context_length: args.context_length,
    };

    let mut service = ModelService::open(&session.ctx)?;
    let model = service.create(payload, &user)?;

    session.record(
        &Event::new(EventAction::ModelCreate, &user)
            .with_resource(&model.id)
            .with_details(json!({
                "provider_id": model.provider_id,
                "name": model.name,
                "type": model.model_type,
            })),
    );

    println!("Created model: {}", model.name);
    println!();
    println!("  ID:       {}", model.id);
    println!("  Type:     {}", model.model_type);
    println!("  Provider: {}", model.provider_id);
    Ok(())
}

fn cmd_list(session: &Session, global: &GlobalArgs, args: ModelListArgs) -> Result<()> {
    let user = Session::user(global)?;
    let service = ModelService::open(&session.ctx)?;
    let models = service.list(&user, args.provider_id.as_deref())?;

    if models.is_empty() {
        println!("No models.");
        return Ok(());
    }

    println!("Models ({}):", models.len());
    println!();
    for model in &models {
        println!("  {}  {}  {}", model.name, model.model_type, model.id);
    }
    Ok(())
}

fn cmd_show(session: &Session, args: ModelIdArgs) -> Result<()> {
    let service = ModelService::open(&session.ctx)?;
    print_model(&service.get_by_id(&args.id)?);
    Ok(())
}

fn cmd_update(session: &Session, global: &GlobalArgs, args: ModelUpdateArgs) -> Result<()> {
    let user = Session::user(global)?;

    let context_length = if args.clear_context_length {
        Some(None)
    } else {
        args.context_length.map(Some)
    };
    let patch = UpdateModel {
        provider_id: args.provider_id,
        name: args.name,
        model_type: args.model_type.as_deref().map(parse_model_type).transpose()?,
        context_length,
    };
    if patch.is_empty() {
        println!("Nothing to update.");
        return Ok(());
    }

    let mut service = ModelService::open(&session.ctx)?;
    let model = service.update(&args.id, patch, &user)?;
    session.record(&Event::new(EventAction::ModelUpdate, &user).with_resource(&model.id));

    println!("Updated model: {}", model.id);
    println!();
    print_model(&model);
    Ok(())
}

fn cmd_delete(session: &Session, global: &GlobalArgs, args: ModelIdArgs) -> Result<()> {
    let user = Session::user(global)?;
    let mut service = ModelService::open(&session.ctx)?;

    service.delete(&args.id, &user)?;
    session.record(&Event::new(EventAction::ModelDelete, &user).with_resource(&args.id));

    println!("Deleted model: {}", args.id);
    Ok(())
}

fn print_model(model: &Model) {
    println!("{}", model.name);
    println!("  ID:             {}", model.id);
    println!("  Type:           {}", model.model_type);
    println!("  Provider:       {}", model.provider_id);
    match model.context_length {
        Some(length) => println!("  Context length: {}", length),
        None => println!("  Context length: -"),
    }
}

fn parse_model_type(value: &str) -> Result<ModelType> {
    ModelType::from_str(value).ok_or_else(|| {
        let valid: Vec<&str> = ModelType::ALL.iter().map(|t| t.as_str()).collect();
        KbError::UserError(format!(
            "unknown model type '{}' (expected one of: {})",
            value,
            valid.join(", ")
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_model_type() {
        assert_eq!(parse_model_type("rerank").unwrap(), ModelType::Rerank);
        let err = parse_model_type("IMAGE").unwrap_err();
        assert!(err.to_string().contains("LLM, TEXT_EMBEDDING, RERANK, SPEECH2TEXT, TTS"));
    }
}
