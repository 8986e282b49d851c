use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use catalyst_crypto::{hash_file, SigningKey};
use catalyst_history::{HistoryEvent, HistoryQuery};
use catalyst_service::{content_entries, Deployment, DeploymentService, ServiceConfig};
use catalyst_types::{DeploymentFile, Entity, EntityFile, Timestamp};
use colored::Colorize;
use serde::Serialize;
use serde_json::json;
use walkdir::WalkDir;

use crate::cli::*;

/// Global options every service-backed command needs.
struct Globals {
    config: Option<PathBuf>,
    root: Option<PathBuf>,
    format: OutputFormat,
}

impl Globals {
    async fn service(&self) -> anyhow::Result<DeploymentService> {
        let mut config = match &self.config {
            Some(path) => ServiceConfig::load(path).await?,
            None => ServiceConfig::default(),
        };
        if let Some(root) = &self.root {
            config = config.with_storage_root(root);
        }
        if config.storage.root.is_none() {
            bail!("no storage root: pass --root or set storage.root in --config");
        }
        Ok(DeploymentService::from_config(config).await?)
    }

    fn json(&self) -> bool {
        self.format == OutputFormat::Json
    }
}

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let ctx = Globals {
        config: cli.config,
        root: cli.root,
        format: cli.format,
    };
    match cli.command {
        Command::Keygen => cmd_keygen(&ctx),
        Command::Hash(args) => cmd_hash(&ctx, args).await,
        Command::Deploy(args) => cmd_deploy(&ctx, args).await,
        Command::Entities(args) => cmd_entities(&ctx, args).await,
        Command::Pointers(args) => cmd_pointers(&ctx, args).await,
        Command::Audit(args) => cmd_audit(&ctx, args).await,
        Command::History(args) => cmd_history(&ctx, args).await,
        Command::Snapshot => cmd_snapshot(&ctx).await,
        Command::Available(args) => cmd_available(&ctx, args).await,
        Command::Content(args) => cmd_content(&ctx, args).await,
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_keygen(ctx: &Globals) -> anyhow::Result<()> {
    let key = SigningKey::generate();
    if ctx.json() {
        return print_json(&json!({
            "secret": key.to_hex(),
            "address": key.address(),
        }));
    }
    println!("{} Generated signing key", "✓".green().bold());
    println!("  Address: {}", key.address().to_string().cyan());
    println!("  Secret:  {}", key.to_hex().dimmed());
    Ok(())
}

async fn cmd_hash(ctx: &Globals, args: HashArgs) -> anyhow::Result<()> {
    let mut hashes = Vec::with_capacity(args.files.len());
    for path in &args.files {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        let file = DeploymentFile::new(path.display().to_string(), bytes);
        hashes.push((path.display().to_string(), hash_file(&file)));
    }
    if ctx.json() {
        let out: Vec<_> = hashes
            .iter()
            .map(|(file, hash)| json!({ "file": file, "hash": hash }))
            .collect();
        return print_json(&out);
    }
    for (file, hash) in hashes {
        println!("{}  {}", hash.to_string().yellow(), file);
    }
    Ok(())
}

/// Every regular file under `dir`, named by its `/`-separated path relative
/// to `dir`, in name order.
fn collect_files(dir: &Path) -> anyhow::Result<Vec<DeploymentFile>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(dir)?;
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let bytes = std::fs::read(entry.path())
            .with_context(|| format!("reading {}", entry.path().display()))?;
        files.push(DeploymentFile::new(name, bytes));
    }
    Ok(files)
}

async fn cmd_deploy(ctx: &Globals, args: DeployArgs) -> anyhow::Result<()> {
    let key = SigningKey::from_hex(&args.key).context("invalid --key")?;
    let metadata = args
        .metadata
        .as_deref()
        .map(serde_json::from_str::<serde_json::Value>)
        .transpose()
        .context("--metadata is not valid JSON")?;
    let files = collect_files(&args.dir)?;
    let entity = EntityFile {
        entity_type: args.entity_type,
        pointers: args.pointers,
        timestamp: args
            .timestamp
            .map(Timestamp::from_millis)
            .unwrap_or_else(Timestamp::now),
        content: content_entries(&files),
        metadata,
    };
    let deployment = Deployment::build(&entity, files, &key)?;
    let entity_id = deployment.entity_id;
    let file_count = deployment.files.len();
    let bytes = deployment.total_bytes();

    let service = ctx.service().await?;
    let committed = match service.deploy(deployment).await {
        Ok(ts) => ts,
        Err(err) => bail!("deployment rejected ({}): {err}", err.kind()),
    };

    if ctx.json() {
        return print_json(&json!({
            "entity_id": entity_id,
            "entity_type": entity.entity_type,
            "pointers": entity.pointers,
            "timestamp": committed,
            "files": file_count,
            "bytes": bytes,
        }));
    }
    println!("{} Deployment committed", "✓".green().bold());
    println!("  Entity: {}", entity_id.to_string().yellow());
    println!("  Type: {}", entity.entity_type.to_string().cyan());
    println!("  Pointers: {}", join(&entity.pointers));
    println!("  Files: {file_count} ({bytes} bytes)");
    println!("  Committed at: {committed}");
    Ok(())
}

fn join<T: ToString>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn print_entity(entity: &Entity) {
    println!(
        "{}  {}  {}",
        entity.id.short_hex().yellow().bold(),
        entity.entity_type.to_string().cyan(),
        entity.timestamp.to_string().dimmed()
    );
    println!("  Pointers: {}", join(&entity.pointers));
    for entry in &entity.content {
        println!("  {} {}", entry.hash.short_hex().dimmed(), entry.file);
    }
}

async fn cmd_entities(ctx: &Globals, args: EntitiesArgs) -> anyhow::Result<()> {
    if args.pointers.is_empty() && args.ids.is_empty() {
        bail!("pass at least one --pointer or --id");
    }
    let service = ctx.service().await?;
    let entities = if args.ids.is_empty() {
        service.entities_by_pointers(args.entity_type, &args.pointers)?
    } else {
        service.entities_by_ids(args.entity_type, &args.ids)?
    };
    if ctx.json() {
        return print_json(&entities);
    }
    if entities.is_empty() {
        println!("No active entities.");
    }
    for entity in &entities {
        print_entity(entity);
    }
    Ok(())
}

async fn cmd_pointers(ctx: &Globals, args: PointersArgs) -> anyhow::Result<()> {
    let service = ctx.service().await?;
    let pointers = service.active_pointers(args.entity_type)?;
    if ctx.json() {
        return print_json(&pointers);
    }
    println!(
        "{} active {} pointers",
        pointers.len().to_string().bold(),
        args.entity_type
    );
    for pointer in pointers {
        println!("  {pointer}");
    }
    Ok(())
}

async fn cmd_audit(ctx: &Globals, args: AuditArgs) -> anyhow::Result<()> {
    let service = ctx.service().await?;
    let Some(audit) = service.audit_info(args.entity_type, &args.id).await? else {
        bail!("no audit record for {} {}", args.entity_type, args.id);
    };
    if ctx.json() {
        return print_json(&audit);
    }
    println!("Entity {}", args.id.to_string().yellow().bold());
    println!("  Deployed: {}", audit.deployed_timestamp);
    println!("  Signer: {}", audit.signer.to_string().cyan());
    println!("  Signature: {}", audit.signature.to_hex().dimmed());
    Ok(())
}

fn print_event(event: &HistoryEvent) {
    match event {
        HistoryEvent::Deployment {
            timestamp,
            entity_type,
            entity_id,
        } => println!(
            "{}  {}  {} {}",
            timestamp.to_string().dimmed(),
            "deployment".green(),
            entity_type,
            entity_id.short_hex().yellow()
        ),
        HistoryEvent::Snapshot {
            timestamp,
            active_entities,
            delta_events_hash,
            ..
        } => {
            let pointers: usize = active_entities.values().map(|table| table.len()).sum();
            println!(
                "{}  {}  {} pointers, delta {}",
                timestamp.to_string().dimmed(),
                "snapshot".blue(),
                pointers,
                delta_events_hash.short_hex()
            );
        }
    }
}

async fn cmd_history(ctx: &Globals, args: HistoryArgs) -> anyhow::Result<()> {
    let mut query = HistoryQuery::all();
    if let Some(from) = args.from {
        query = query.from(Timestamp::from_millis(from));
    }
    if let Some(to) = args.to {
        query = query.to(Timestamp::from_millis(to));
    }
    if let Some(kind) = args.kind {
        query = query.kind(kind);
    }
    let service = ctx.service().await?;
    let events = service.history(&query).await?;
    if ctx.json() {
        return print_json(&events);
    }
    if events.is_empty() {
        println!("No history events.");
    }
    for event in &events {
        print_event(event);
    }
    Ok(())
}

async fn cmd_snapshot(ctx: &Globals) -> anyhow::Result<()> {
    let service = ctx.service().await?;
    let event = service.create_snapshot().await?;
    if ctx.json() {
        return print_json(&event);
    }
    print!("{} ", "✓".green().bold());
    print_event(&event);
    Ok(())
}

async fn cmd_available(ctx: &Globals, args: AvailableArgs) -> anyhow::Result<()> {
    let service = ctx.service().await?;
    let available = service.is_content_available(&args.hashes).await?;
    if ctx.json() {
        return print_json(&available);
    }
    for (hash, present) in available {
        let mark = if present { "✓".green() } else { "✗".red() };
        println!("{mark} {hash}");
    }
    Ok(())
}

async fn cmd_content(ctx: &Globals, args: ContentArgs) -> anyhow::Result<()> {
    let service = ctx.service().await?;
    let Some(bytes) = service.content(&args.hash).await? else {
        bail!("content {} not found", args.hash);
    };
    match args.output {
        Some(path) => {
            tokio::fs::write(&path, &bytes)
                .await
                .with_context(|| format!("writing {}", path.display()))?;
            if !ctx.json() {
                println!(
                    "{} Wrote {} bytes to {}",
                    "✓".green().bold(),
                    bytes.len(),
                    path.display()
                );
            }
        }
        None => std::io::stdout().write_all(&bytes)?,
    }
    Ok(())
}
