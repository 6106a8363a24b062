//! Implementation of the `kbase wiki` commands.

use super::{Session, or_dash};
use crate::cli::{
    GlobalArgs, WikiAction, WikiCreateArgs, WikiDeleteArgs, WikiShowArgs, WikiUpdateArgs,
};
use crate::error::Result;
use crate::events::{Event, EventAction};
use crate::fields::non_blank;
use crate::wiki::{CreateWikiRepo, UpdateWikiRepo, WikiRepoDetail, WikiRepoService};
use serde_json::json;

/// Dispatch wiki subcommands.
pub(super) fn dispatch(global: &GlobalArgs, action: WikiAction) -> Result<()> {
    let session = Session::open(global)?;
    match action {
        WikiAction::Create(args) => cmd_create(&session, global, args),
        WikiAction::List => cmd_list(&session, global),
        WikiAction::Show(args) => cmd_show(&session, args),
        WikiAction::Update(args) => cmd_update(&session, global, args),
        WikiAction::Delete(args) => cmd_delete(&session, global, args),
    }
}

fn cmd_create(session: &Session, global: &GlobalArgs, args: WikiCreateArgs) -> Result<()> {
    let user = Session::user(global)?;
    let mut service = WikiRepoService::open(&session.ctx, &session.config)?;

    let payload = CreateWikiRepo {
        name: args.name,
        path: non_blank(args.path),
        description: args.description,
        cover: args.cover,
        embedding_model_id: args.embedding_model_id,
        rerank_model_id: args.rerank_model_id,
    };
    let repo = service.create(payload, &user)?;

    session.record(
        &Event::new(EventAction::WikiRepoCreate, &user)
            .with_resource(&repo.id)
            .with_details(json!({ "name": repo.name, "path": repo.path })),
    );

    println!("Created wiki repository: {}", repo.name);
    println!();
    println!("  ID:         {}", repo.id);
    println!("  Path:       {}", or_dash(repo.path.as_deref()));
    println!("  Creator:    {}", repo.creator_id);
    Ok(())
}

fn cmd_list(session: &Session, global: &GlobalArgs) -> Result<()> {
    let user = Session::user(global)?;
    let service = WikiRepoService::open(&session.ctx, &session.config)?;
    let repos = service.list(&user)?;

    if repos.is_empty() {
        println!("No wiki repositories.");
        return Ok(());
    }

    println!("Wiki repositories ({}):", repos.len());
    println!();
    for repo in &repos {
        println!("  {}", repo.name);
        println!("    ID:         {}", repo.id);
        println!("    Path:       {}", or_dash(repo.path.as_deref()));
        println!(
            "    Created:    {}",
            repo.create_time.format("%Y-%m-%d %H:%M:%S UTC")
        );
        if let Some(updated) = repo.update_time {
            println!("    Updated:    {}", updated.format("%Y-%m-%d %H:%M:%S UTC"));
        }
        println!();
    }
    Ok(())
}

fn cmd_show(session: &Session, args: WikiShowArgs) -> Result<()> {
    let service = WikiRepoService::open(&session.ctx, &session.config)?;
    print_detail(&service.get(&args.reference)?);
    Ok(())
}

fn cmd_update(session: &Session, global: &GlobalArgs, args: WikiUpdateArgs) -> Result<()> {
    let user = Session::user(global)?;
    let mut service = WikiRepoService::open(&session.ctx, &session.config)?;

    let patch = UpdateWikiRepo {
        name: args.name,
        description: nullable(args.description, args.clear_description),
        cover: nullable(args.cover, args.clear_cover),
        embedding_model_id: args.embedding_model_id,
        rerank_model_id: args.rerank_model_id,
    };
    if patch.is_empty() {
        println!("Nothing to update.");
        return Ok(());
    }

    let repo = service.update(&args.id, patch, &user)?;
    session.record(&Event::new(EventAction::WikiRepoUpdate, &user).with_resource(&repo.id));

    println!("Updated wiki repository: {}", repo.id);
    println!();
    print_detail(&WikiRepoDetail::from(repo));
    Ok(())
}

fn cmd_delete(session: &Session, global: &GlobalArgs, args: WikiDeleteArgs) -> Result<()> {
    let user = Session::user(global)?;
    let mut service = WikiRepoService::open(&session.ctx, &session.config)?;

    service.delete(&args.id, &user)?;
    session.record(&Event::new(EventAction::WikiRepoDelete, &user).with_resource(&args.id));

    println!("Deleted wiki repository: {}", args.id);
    Ok(())
}

fn print_detail(detail: &WikiRepoDetail) {
    println!("{}", detail.name);
    println!("  ID:              {}", detail.id);
    println!("  Path:            {}", or_dash(detail.path.as_deref()));
    println!("  Description:     {}", or_dash(detail.description.as_deref()));
    println!("  Cover:           {}", or_dash(detail.cover.as_deref()));
    println!("  Embedding model: {}", detail.embedding_model_id);
    println!("  Rerank model:    {}", detail.rerank_model_id);
}

/// Map a `--field` / `--clear-field` pair onto a nullable patch field.
pub(super) fn nullable(value: Option<String>, clear: bool) -> Option<Option<String>> {
    if clear { Some(None) } else { value.map(Some) }
}
