//! CLI command definitions and handlers

mod credits;
mod init;
mod reports;
mod scan;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use framescan::config::{load_engine_config, EngineConfig, UserConfig};
use framescan::engine::FrameEngine;
use framescan::persistence::{data_dir, ensure_data_dir};
use framescan::provider::{AnalysisProvider, LlmProvider, ScriptedProvider};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// framescan - Frame scoring for the people in your pipeline
#[derive(Parser, Debug)]
#[command(name = "framescan")]
#[command(
    version,
    about = "Score the frame of messages and photos, track it per contact over time",
    after_help = "\
Examples:
  framescan scan text --domain sales-email --contact acme-jo \"Following up on ...\"
  framescan scan image --domain profile-photo --contact me --tier detailed ./me.jpg
  framescan quick --contact sam \"Had fun last night, drinks Friday?\"
  framescan credits buy standard
  framescan profile acme-jo"
)]
pub struct Cli {
    /// Engine config file
    #[arg(long, global = true, default_value = "framescan.toml", env = "FRAMESCAN_CONFIG")]
    pub config: PathBuf,

    /// Directory holding reports.json and ledger.json
    #[arg(long, global = true, env = "FRAMESCAN_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write an example framescan.toml
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Run a scan with an explicit domain
    #[command(subcommand)]
    Scan(ScanCommand),

    /// Free text scan with the domain guessed from keywords
    Quick {
        /// Contact the content is about (repeatable)
        #[arg(long = "contact", short = 'c', required = true)]
        contacts: Vec<String>,

        /// Message text; reads stdin when omitted or "-"
        content: Option<String>,

        #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },

    /// Credit balance and purchases
    Credits {
        #[command(subcommand)]
        action: Option<CreditsCommand>,
    },

    /// List saved reports, most recent first
    Reports {
        /// Only reports about this contact
        #[arg(long, short = 'c')]
        contact: Option<String>,

        /// Maximum reports to show (0 = all)
        #[arg(long, default_value = "20")]
        limit: usize,

        #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },

    /// Show one report in full
    Show {
        report_id: String,

        /// Include the per-axis scoring breakdown
        #[arg(long)]
        explain: bool,

        #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },

    /// Cumulative profile and trend for a contact
    Profile {
        contact_id: String,

        #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },

    /// Add (or remove) a custom tag on a report
    Tag {
        report_id: String,
        tag: String,

        #[arg(long)]
        remove: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum ScanCommand {
    /// Free text scan
    Text {
        /// sales-email, dating-message, negotiation, social-post or general
        #[arg(long, short = 'd')]
        domain: String,

        /// Contact the content is about (repeatable)
        #[arg(long = "contact", short = 'c', required = true)]
        contacts: Vec<String>,

        /// Message text; reads stdin when omitted or "-"
        content: Option<String>,

        #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },

    /// Paid image scan
    Image {
        /// profile-photo, social-post or general
        #[arg(long, short = 'd')]
        domain: String,

        #[arg(long = "contact", short = 'c', required = true)]
        contacts: Vec<String>,

        /// Image URL, data URI or file path
        image_ref: String,

        #[arg(long, default_value = "basic", value_parser = ["basic", "detailed"])]
        tier: String,

        #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum CreditsCommand {
    /// Show the current balance (default)
    Balance,

    /// List credit transactions, most recent first
    History {
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Buy a credit package
    Buy { package: String },

    /// Grant bonus credits
    Bonus { amount: u64, reason: String },
}

/// Run the CLI
pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init { force } => init::run(&cli.config, force),

        Commands::Scan(ScanCommand::Text {
            domain,
            contacts,
            content,
            format,
        }) => {
            let engine = open_engine(&cli.config, cli.data_dir.as_deref(), true)?;
            scan::run_text(&engine, &domain, contacts, content, &format)
        }

        Commands::Scan(ScanCommand::Image {
            domain,
            contacts,
            image_ref,
            tier,
            format,
        }) => {
            let engine = open_engine(&cli.config, cli.data_dir.as_deref(), true)?;
            scan::run_image(&engine, &domain, contacts, &image_ref, &tier, &format)
        }

        Commands::Quick {
            contacts,
            content,
            format,
        } => {
            let engine = open_engine(&cli.config, cli.data_dir.as_deref(), true)?;
            scan::run_quick(&engine, contacts, content, &format)
        }

        Commands::Credits { action } => {
            let engine = open_engine(&cli.config, cli.data_dir.as_deref(), false)?;
            credits::run(&engine, action.unwrap_or(CreditsCommand::Balance))
        }

        Commands::Reports {
            contact,
            limit,
            format,
        } => {
            let engine = open_engine(&cli.config, cli.data_dir.as_deref(), false)?;
            reports::list(&engine, contact.as_deref(), limit, &format)
        }

        Commands::Show {
            report_id,
            explain,
            format,
        } => {
            let engine = open_engine(&cli.config, cli.data_dir.as_deref(), false)?;
            reports::show(&engine, &report_id, explain, &format)
        }

        Commands::Profile { contact_id, format } => {
            let engine = open_engine(&cli.config, cli.data_dir.as_deref(), false)?;
            reports::profile(&engine, &contact_id, &format)
        }

        Commands::Tag {
            report_id,
            tag,
            remove,
        } => {
            let engine = open_engine(&cli.config, cli.data_dir.as_deref(), false)?;
            reports::tag(&engine, &report_id, &tag, remove)
        }
    }
}

/// Build the engine over the data directory. Commands that never scan get
/// an offline provider so they work without API keys.
fn open_engine(config_path: &Path, data_dir_override: Option<&Path>, scanning: bool) -> Result<FrameEngine> {
    let config: EngineConfig = load_engine_config(config_path);
    let dir = data_dir(data_dir_override);
    ensure_data_dir(&dir)
        .with_context(|| format!("Failed to create data directory {}", dir.display()))?;

    let provider: Arc<dyn AnalysisProvider> = if scanning {
        let user = UserConfig::load().context("Failed to load user config")?;
        Arc::new(
            LlmProvider::from_user_config(&user)
                .context("Analysis provider is not configured")?,
        )
    } else {
        Arc::new(ScriptedProvider::new())
    };

    FrameEngine::open(config, provider, &dir)
        .with_context(|| format!("Failed to load saved state from {}", dir.display()))
}
