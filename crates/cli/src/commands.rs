//! # Command Handlers
//!
//! Each subcommand opens the store, does its work through the library and
//! prints a short human-readable result. Anything structured is printed as
//! pretty JSON.

use anybot::{
    config::{get_config, AppConfig},
    ingest::{ChannelReporter, IngestEvent, LogLevel},
    providers::{
        ai::AiProvider,
        factory::{create_provider, create_provider_for_model},
    },
    store::JsonFileBackend,
    taxonomy,
    types::{new_id, EscalationRule, KnowledgeBank, TaxonomyCategory},
    Action, Authoring, BatchClassifier, ChatSession, DashboardStats, IngestSource,
    IngestionPipeline, IngestionRequest, RunStatus, Store,
};
use anyhow::{anyhow, bail, Context as _, Result};
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

/// The loaded configuration and the opened store.
pub struct Context {
    pub config: AppConfig,
    pub store: Store,
}

impl Context {
    pub async fn load(config_path: Option<&str>, store_override: Option<PathBuf>) -> Result<Self> {
        let config = get_config(config_path)?;
        let store_path = store_override.unwrap_or_else(|| PathBuf::from(&config.store_path));
        info!("Opening store at '{}'.", store_path.display());
        let store = Store::open(JsonFileBackend::new(&store_path)).await?;
        Ok(Self { config, store })
    }

    /// The provider for the model selected in settings, falling back to the
    /// configured default.
    async fn provider(&self) -> Result<Box<dyn AiProvider>> {
        let active_model = self.store.read(|s| s.settings.active_model.clone()).await;
        let default = self.config.default_provider_config()?;
        if default.model_name != active_model {
            match create_provider_for_model(&self.config.providers, &active_model) {
                Ok(provider) => return Ok(provider),
                Err(e) => warn!("Cannot serve model '{active_model}' ({e}); using the default."),
            }
        }
        Ok(create_provider(default)?)
    }
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// --- Ingestion ---

pub async fn ingest(
    ctx: &Context,
    file: Option<PathBuf>,
    text: Option<String>,
    kb_id: String,
    root_category_id: Option<String>,
) -> Result<()> {
    let source = match (file, text) {
        (Some(path), None) => {
            let bytes = tokio::fs::read(&path)
                .await
                .with_context(|| format!("Cannot read '{}'", path.display()))?;
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            IngestSource::File { file_name, bytes }
        }
        (None, Some(text)) => IngestSource::Text(text),
        _ => bail!("Pass either a file or --text."),
    };

    let settings = ctx.store.read(|s| s.settings.clone()).await;
    let classifier = BatchClassifier::new(ctx.provider().await?, settings.language)
        .with_sampling(settings.temperature, settings.top_p);
    let pipeline = IngestionPipeline::new(classifier, ctx.store.clone()).with_batching(
        ctx.config.ingestion.batch_size,
        Duration::from_millis(ctx.config.ingestion.batch_delay_ms),
    );

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                IngestEvent::Log(line) => {
                    let marker = match line.level {
                        LogLevel::Info => "   ",
                        LogLevel::Success => "ok ",
                        LogLevel::Error => "!! ",
                        LogLevel::Wait => "...",
                    };
                    println!("{marker} {}", line.message);
                }
                IngestEvent::Progress { percent } => println!("    [{percent:>3}%]"),
            }
        }
    });

    let reporter = ChannelReporter::new(tx);
    let request = IngestionRequest {
        source,
        kb_id,
        root_category_id,
    };
    let report = pipeline.run(request, &reporter).await;
    drop(reporter);
    printer.await?;

    print_json(&report)?;
    if report.status == RunStatus::Failed {
        bail!(report.error.unwrap_or_else(|| "ingestion failed".to_string()));
    }
    Ok(())
}

// --- Playground ---

pub async fn chat(ctx: &Context, bot_id: Option<String>, message: Option<String>) -> Result<()> {
    let session = ChatSession::new(ctx.store.clone(), ctx.provider().await?, bot_id);

    if let Some(message) = message {
        let turn = session.send(&message).await?;
        println!("{}", turn.reply);
        for escalation in &turn.escalations {
            println!("!! escalation: {}", escalation.rule_name);
        }
        return Ok(());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }
        let turn = session.send(line).await?;
        println!("{}", turn.reply);
        if let Some(log) = &turn.log {
            println!(
                "    intent={} confidence={:.2} status={:?}",
                log.intent, log.confidence, log.status
            );
        }
    }
    Ok(())
}

// --- Knowledge banks ---

pub async fn kb_list(ctx: &Context) -> Result<()> {
    let banks = ctx.store.read(|s| s.knowledge_banks.clone()).await;
    if banks.is_empty() {
        println!("No knowledge banks.");
    }
    for bank in banks {
        println!(
            "{}  {}  ({} documents, tags: {})",
            bank.id,
            bank.name,
            bank.document_count,
            bank.tags.join(", ")
        );
    }
    Ok(())
}

pub async fn kb_create(ctx: &Context, name: &str, description: &str, tags: &str) -> Result<()> {
    if name.trim().is_empty() {
        bail!("Knowledge bank name must not be blank.");
    }
    let tags = tags.split(',').map(String::from).collect();
    let bank = KnowledgeBank::new(name, description, tags);
    ctx.store
        .dispatch(Action::AddKnowledgeBank(bank.clone()))
        .await?;
    println!("Created knowledge bank {} ({}).", bank.name, bank.id);
    Ok(())
}

pub async fn kb_delete(ctx: &Context, id: String) -> Result<()> {
    ctx.store
        .dispatch(Action::DeleteKnowledgeBank(id.clone()))
        .await?;
    println!("Deleted knowledge bank {id}.");
    Ok(())
}

// --- Taxonomy ---

fn print_tree(nodes: &[TaxonomyCategory], parent: &TaxonomyCategory, depth: usize) {
    println!(
        "{}{}  [{}] ({})",
        "  ".repeat(depth),
        parent.name,
        parent.id,
        parent.count
    );
    for child in taxonomy::children(nodes, &parent.id) {
        print_tree(nodes, child, depth + 1);
    }
}

pub async fn taxonomy_list(ctx: &Context) -> Result<()> {
    let nodes = ctx.store.read(|s| s.taxonomy.clone()).await;
    if nodes.is_empty() {
        println!("The taxonomy is empty.");
    }
    for group in taxonomy::groups(&nodes) {
        print_tree(&nodes, group, 0);
    }
    Ok(())
}

pub async fn taxonomy_add(
    ctx: &Context,
    name: &str,
    parent: Option<String>,
    kb: Option<String>,
) -> Result<()> {
    let mut category = TaxonomyCategory::new(new_id("CAT"), name, parent);
    category.kb_id = kb;
    ctx.store
        .dispatch(Action::AddCategory(category.clone()))
        .await?;
    println!("Added category {} ({}).", category.name, category.id);
    Ok(())
}

pub async fn taxonomy_import(
    ctx: &Context,
    file: &Path,
    parent: Option<String>,
    kb: Option<String>,
) -> Result<()> {
    let lines = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Cannot read '{}'", file.display()))?;
    let before: HashSet<String> = ctx
        .store
        .read(|s| s.taxonomy.iter().map(|c| c.id.clone()).collect())
        .await;
    ctx.store
        .dispatch(Action::BulkImportCategories {
            parent_id: parent,
            lines,
            kb_id: kb,
        })
        .await?;
    let created = ctx
        .store
        .read(|s| s.taxonomy.iter().filter(|c| !before.contains(&c.id)).count())
        .await;
    println!("Imported {created} categories.");
    Ok(())
}

pub async fn taxonomy_remove(ctx: &Context, id: String) -> Result<()> {
    let below = ctx
        .store
        .read(|s| taxonomy::descendants(&s.taxonomy, &id).len())
        .await;
    ctx.store.dispatch(Action::RemoveCategory(id.clone())).await?;
    println!("Removed {id} and {below} categories below it.");
    Ok(())
}

// --- Escalation rules ---

pub async fn rules_list(ctx: &Context) -> Result<()> {
    let rules = ctx.store.read(|s| s.escalation_rules.clone()).await;
    print_json(&rules)
}

/// Reads a rule in the console's JSON shape. A missing `id` gets a fresh one.
pub async fn rules_add(ctx: &Context, file: &Path) -> Result<()> {
    let raw = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Cannot read '{}'", file.display()))?;
    let mut value: Value = serde_json::from_str(&raw)?;
    let object = value
        .as_object_mut()
        .ok_or_else(|| anyhow!("A rule file must hold one JSON object."))?;
    object
        .entry("id")
        .or_insert_with(|| Value::String(new_id("RULE")));
    object.entry("isActive").or_insert(Value::Bool(true));
    let rule: EscalationRule = serde_json::from_value(value)?;

    ctx.store
        .dispatch(Action::AddEscalationRule(rule.clone()))
        .await?;
    println!("Added rule {} ({}).", rule.name, rule.id);
    Ok(())
}

pub async fn rules_toggle(ctx: &Context, id: &str) -> Result<()> {
    let mut rule = ctx
        .store
        .read(|s| s.escalation_rules.iter().find(|r| r.id == id).cloned())
        .await
        .ok_or_else(|| anyhow!("Escalation rule not found: {id}"))?;
    rule.is_active = !rule.is_active;
    let active = rule.is_active;
    ctx.store.dispatch(Action::UpdateEscalationRule(rule)).await?;
    println!("Rule {id} is now {}.", if active { "active" } else { "inactive" });
    Ok(())
}

pub async fn rules_remove(ctx: &Context, id: String) -> Result<()> {
    ctx.store
        .dispatch(Action::DeleteEscalationRule(id.clone()))
        .await?;
    println!("Deleted rule {id}.");
    Ok(())
}

// --- Dashboard and settings ---

pub async fn stats(ctx: &Context) -> Result<()> {
    let stats = ctx.store.read(DashboardStats::compute).await;
    print_json(&stats)
}

pub async fn check(ctx: &Context) -> Result<()> {
    let settings = ctx.store.read(|s| s.settings.clone()).await;
    let authoring = Authoring::new(ctx.provider().await?, settings.language);
    if authoring.verify_connection().await {
        println!("Connected to {}.", settings.active_model);
        Ok(())
    } else {
        bail!("No answer from {}.", settings.active_model)
    }
}
