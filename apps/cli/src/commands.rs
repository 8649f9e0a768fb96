//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use crmsync_core::{ContactInfo, SyncOptions, SyncRequest, map_industry_to_category, sync_to_crm};
use crmsync_shared::{
    AppConfig, Category, JourneyEntry, SourceTable, Stage, init_config, load_config,
    resolve_database_path,
};
use crmsync_storage::{CrmStore, Storage};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// crmsync: keep the CRM client registry in step with the BD pipeline.
#[derive(Parser)]
#[command(
    name = "crmsync",
    version,
    about = "Mirror business-development stage changes into the CRM client registry.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Database file (overrides `[database] path` in the config).
    #[arg(long, global = true, env = "CRMSYNC_DB")]
    pub db: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Sync one upstream stage change into the CRM.
    Sync(SyncArgs),

    /// Print the category a free-text industry maps to.
    Category {
        /// Industry description (words are joined with spaces).
        industry: Vec<String>,
    },

    /// List CRM clients.
    Clients {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Show a client's contacts and stage journey, or every journey entry
    /// recorded from one upstream record.
    Journey {
        /// Company name (case-insensitive).
        #[arg(
            long,
            required_unless_present = "source_table",
            conflicts_with = "source_table"
        )]
        company: Option<String>,

        /// Upstream table of the record (e.g. bd_leads).
        #[arg(long, requires = "source_id")]
        source_table: Option<SourceTable>,

        /// Upstream record id.
        #[arg(long, requires = "source_table")]
        source_id: Option<String>,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Arguments of `crmsync sync`.
#[derive(clap::Args)]
pub(crate) struct SyncArgs {
    /// Company name of the upstream record.
    #[arg(long)]
    pub company: String,

    /// Stage the record moved to.
    #[arg(long)]
    pub stage: Stage,

    /// Upstream table, e.g. bd_leads.
    #[arg(long)]
    pub source_table: SourceTable,

    /// Acting user id.
    #[arg(long, env = "CRMSYNC_USER")]
    pub user: String,

    /// Upstream record id.
    #[arg(long)]
    pub source_id: Option<String>,

    /// Category for a new client.
    #[arg(long, conflicts_with = "industry")]
    pub category: Option<Category>,

    /// Free-text industry, mapped to a category for a new client.
    #[arg(long)]
    pub industry: Option<String>,

    /// Primary contact name for a new client.
    #[arg(long)]
    pub contact_name: Option<String>,

    #[arg(long, requires = "contact_name")]
    pub contact_position: Option<String>,

    #[arg(long, requires = "contact_name")]
    pub contact_email: Option<String>,

    #[arg(long, requires = "contact_name")]
    pub contact_phone: Option<String>,

    /// Source label (defaults to the table name without its prefix).
    #[arg(long)]
    pub source_label: Option<String>,

    /// Notes stored on a new client.
    #[arg(long)]
    pub notes: Option<String>,

    /// Print the result as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "crmsync=info",
        1 => "crmsync=debug",
        _ => "crmsync=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let db = cli.db.as_deref();
    match cli.command {
        Command::Sync(args) => cmd_sync(db, args).await,
        Command::Category { industry } => cmd_category(&industry),
        Command::Clients { json } => cmd_clients(db, json).await,
        Command::Journey {
            company,
            source_table,
            source_id,
            json,
        } => match (company, source_table, source_id) {
            (_, Some(table), Some(id)) => cmd_journey_by_source(db, table, &id, json).await,
            (Some(company), _, _) => cmd_journey(db, &company, json).await,
            _ => Err(eyre!("pass --company, or --source-table with --source-id")),
        },
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(db),
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_sync(db: Option<&Path>, args: SyncArgs) -> Result<()> {
    let config = load_config()?;
    let db_path = resolve_database_path(&config, db)?;
    let storage = Storage::open(&db_path).await?;

    let category = args
        .category
        .or_else(|| args.industry.as_deref().map(|i| map_industry_to_category(Some(i))));

    let request = SyncRequest {
        acting_user_id: args.user,
        company_name: args.company,
        category,
        contact: args.contact_name.map(|name| ContactInfo {
            name,
            position: args.contact_position,
            email: args.contact_email,
            phone: args.contact_phone,
        }),
        stage: args.stage,
        source_table: args.source_table,
        source_id: args.source_id,
        source_label: args.source_label,
        notes: args.notes,
    };

    info!(
        company = %request.company_name,
        stage = %request.stage,
        db = %db_path.display(),
        "syncing stage change"
    );

    let options = SyncOptions::from(&config.sync);
    let result = sync_to_crm(&storage, &request, &options).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if result.success {
        println!();
        println!("  CRM sync complete.");
        if let Some(id) = &result.client_id {
            println!("  Client: {id}");
        }
        println!(
            "  Action: {}",
            if result.is_new { "created" } else { "updated" }
        );
        println!("  Stage:  {}", request.stage);
        for warning in &result.warnings {
            println!("  Warning: {warning}");
        }
        println!();
    }

    if !result.success {
        return Err(eyre!(
            "CRM sync failed: {}",
            result.error.as_deref().unwrap_or("unknown error")
        ));
    }
    Ok(())
}

fn cmd_category(industry: &[String]) -> Result<()> {
    let text = industry.join(" ");
    let category = map_industry_to_category(Some(text.as_str()));
    println!("{category}");
    Ok(())
}

async fn cmd_clients(db: Option<&Path>, json: bool) -> Result<()> {
    let storage = open_existing(db).await?;
    let clients = storage.list_clients().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&clients)?);
        return Ok(());
    }

    if clients.is_empty() {
        println!("No CRM clients yet.");
        return Ok(());
    }

    println!("{:<36}  {:<12}  {:<22}  COMPANY", "ID", "STAGE", "CATEGORY");
    for client in &clients {
        println!(
            "{:<36}  {:<12}  {:<22}  {}",
            client.id, client.current_stage, client.category, client.company_name
        );
    }
    Ok(())
}

async fn cmd_journey(db: Option<&Path>, company: &str, json: bool) -> Result<()> {
    let storage = open_existing(db).await?;
    let client = storage
        .find_client_by_name(company)
        .await?
        .ok_or_else(|| eyre!("no CRM client named '{company}'"))?;

    let contacts = storage.list_contacts(&client.id).await?;
    let journey = storage.list_journey(&client.id).await?;

    if json {
        let value = serde_json::json!({
            "client": client,
            "contacts": contacts,
            "journey": journey,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!();
    println!("  {} ({})", client.company_name, client.id);
    println!("  Stage:    {}", client.current_stage);
    println!("  Category: {}", client.category);
    println!("  Source:   {}", client.source);
    if let Some(notes) = &client.notes {
        println!("  Notes:    {notes}");
    }

    for contact in &contacts {
        let primary = if contact.is_primary { " (primary)" } else { "" };
        println!(
            "  Contact:  {}{primary}{}{}",
            contact.name,
            contact
                .email
                .as_deref()
                .map(|e| format!(" <{e}>"))
                .unwrap_or_default(),
            contact
                .position
                .as_deref()
                .map(|p| format!(", {p}"))
                .unwrap_or_default(),
        );
    }

    println!();
    print_journey(&journey);
    println!();

    Ok(())
}

async fn cmd_journey_by_source(
    db: Option<&Path>,
    source_table: SourceTable,
    source_id: &str,
    json: bool,
) -> Result<()> {
    let storage = open_existing(db).await?;
    let journey = storage
        .list_journey_by_source(source_table, source_id)
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&journey)?);
        return Ok(());
    }

    if journey.is_empty() {
        println!("No journey entries recorded from {source_table} {source_id}.");
        return Ok(());
    }

    println!();
    print_journey(&journey);
    println!();

    Ok(())
}

fn print_journey(journey: &[JourneyEntry]) {
    for entry in journey {
        let from = entry
            .from_stage
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".into());
        println!(
            "  {}  {:>12} -> {:<12}  {}  [{} {}]",
            entry.created_at.format("%Y-%m-%d %H:%M"),
            from,
            entry.to_stage,
            entry.notes,
            entry.source_table,
            entry.source_id.as_deref().unwrap_or("-"),
        );
    }
}

/// Open the configured database read-only; inspection never creates one.
async fn open_existing(db: Option<&Path>) -> Result<Storage> {
    let config = load_config()?;
    let db_path = resolve_database_path(&config, db)?;
    Ok(Storage::open_readonly(&db_path).await?)
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(db: Option<&Path>) -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    println!("# resolved database: {}", resolve_database_path(&config, db)?.display());
    Ok(())
}
