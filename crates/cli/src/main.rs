//! # anybot-cli
//!
//! An operator tool over the same store the admin console uses: ingest a
//! file, chat with a bot, and manage knowledge banks, the taxonomy and
//! escalation rules from a terminal.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::fs::File;
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

// --- CLI Definition ---

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to a YAML config file. Defaults to `config.yml` when present.
    #[arg(long, global = true)]
    config: Option<String>,
    /// Overrides the state file from the config.
    #[arg(long, global = true, env = "STORE_PATH")]
    store: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ingest a CSV, TXT, XLSX, XLS or PDF file (or pasted text) into a bank
    Ingest(IngestArgs),
    /// Chat with the playground, optionally as a bot
    Chat(ChatArgs),
    /// Manage knowledge banks
    #[command(subcommand)]
    Kb(KbCommands),
    /// Browse and edit the category tree
    #[command(subcommand)]
    Taxonomy(TaxonomyCommands),
    /// Manage escalation rules
    #[command(subcommand)]
    Rules(RuleCommands),
    /// Print dashboard statistics as JSON
    Stats,
    /// Check that the active model answers
    Check,
}

#[derive(Parser, Debug)]
struct IngestArgs {
    /// The file to ingest. Omit when using --text.
    file: Option<PathBuf>,
    /// Ingest this text as a single record instead of a file.
    #[arg(long, conflicts_with = "file")]
    text: Option<String>,
    /// The target knowledge bank id.
    #[arg(long)]
    kb: String,
    /// The group new categories go under.
    #[arg(long)]
    root: Option<String>,
}

#[derive(Parser, Debug)]
struct ChatArgs {
    /// Answer as this bot.
    #[arg(long)]
    bot: Option<String>,
    /// Send one message and exit. Without it, reads messages from stdin.
    message: Option<String>,
}

#[derive(Subcommand, Debug)]
enum KbCommands {
    /// List knowledge banks
    List,
    /// Create a knowledge bank
    Create {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Comma-separated tags.
        #[arg(long, default_value = "")]
        tags: String,
    },
    /// Delete a knowledge bank (its scripts are kept)
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
enum TaxonomyCommands {
    /// Print the category tree
    List,
    /// Add one category
    Add {
        name: String,
        #[arg(long)]
        parent: Option<String>,
        #[arg(long)]
        kb: Option<String>,
    },
    /// Add one category per line of a file, skipping existing names
    Import {
        file: PathBuf,
        #[arg(long)]
        parent: Option<String>,
        #[arg(long)]
        kb: Option<String>,
    },
    /// Remove a category and everything below it
    Remove { id: String },
}

#[derive(Subcommand, Debug)]
enum RuleCommands {
    /// List escalation rules
    List,
    /// Add a rule from a JSON file in the console's rule format
    Add { file: PathBuf },
    /// Turn a rule on or off
    Toggle { id: String },
    /// Delete a rule
    Remove { id: String },
}

// --- Main Application Entry ---

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Setup logging to a file
    let log_file = File::create("anybot-cli.log")?;
    let subscriber = fmt::Subscriber::builder()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    let ctx = match commands::Context::load(cli.config.as_deref(), cli.store).await {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Startup failed: {e}");
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Ingest(args) => {
            commands::ingest(&ctx, args.file, args.text, args.kb, args.root).await
        }
        Commands::Chat(args) => commands::chat(&ctx, args.bot, args.message).await,
        Commands::Kb(KbCommands::List) => commands::kb_list(&ctx).await,
        Commands::Kb(KbCommands::Create {
            name,
            description,
            tags,
        }) => commands::kb_create(&ctx, &name, &description, &tags).await,
        Commands::Kb(KbCommands::Delete { id }) => commands::kb_delete(&ctx, id).await,
        Commands::Taxonomy(TaxonomyCommands::List) => commands::taxonomy_list(&ctx).await,
        Commands::Taxonomy(TaxonomyCommands::Add { name, parent, kb }) => {
            commands::taxonomy_add(&ctx, &name, parent, kb).await
        }
        Commands::Taxonomy(TaxonomyCommands::Import { file, parent, kb }) => {
            commands::taxonomy_import(&ctx, &file, parent, kb).await
        }
        Commands::Taxonomy(TaxonomyCommands::Remove { id }) => {
            commands::taxonomy_remove(&ctx, id).await
        }
        Commands::Rules(RuleCommands::List) => commands::rules_list(&ctx).await,
        Commands::Rules(RuleCommands::Add { file }) => commands::rules_add(&ctx, &file).await,
        Commands::Rules(RuleCommands::Toggle { id }) => commands::rules_toggle(&ctx, &id).await,
        Commands::Rules(RuleCommands::Remove { id }) => commands::rules_remove(&ctx, id).await,
        Commands::Stats => commands::stats(&ctx).await,
        Commands::Check => commands::check(&ctx).await,
    };

    if let Err(e) = result {
        eprintln!("Command failed: {e}");
        std::process::exit(1);
    }
    Ok(())
}
