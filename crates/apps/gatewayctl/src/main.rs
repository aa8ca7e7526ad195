//! gatewayctl - inspect and manage a gateway's message store and webhooks
//!
//! Reads the same settings as the gateway itself, opens the configured
//! backend, and prints results as JSON.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use gateway::{
    Backend, DeliveryOutcome, GatewayConfig, MessageQuery, MessageStatus, StorageKind,
    WebhookConfig, classify, open_backend,
};
use log::{error, warn};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "gatewayctl", version, about = "Manage the mail gateway's store and webhooks")]
struct Cli {
    /// Settings file (defaults to ~/.config/gateway/gateway.json)
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Query stored messages
    #[command(subcommand)]
    Messages(MessageCommands),

    /// Manage webhook subscriptions
    #[command(subcommand)]
    Webhooks(WebhookCommands),

    /// Show the status a transport outcome maps to
    Classify {
        /// Failure text; omit for a successful delivery
        error: Option<String>,

        /// Numeric SMTP reply code, if known
        #[arg(long)]
        code: Option<u16>,
    },

    /// Write a default settings file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
enum MessageCommands {
    /// List messages, newest first
    List {
        #[arg(short, long)]
        status: Option<MessageStatus>,

        #[arg(short, long)]
        limit: Option<usize>,

        #[arg(short, long, default_value_t = 0)]
        offset: usize,
    },

    /// Show a single message
    Show { id: String },
}

#[derive(Subcommand)]
enum WebhookCommands {
    /// List subscriptions, newest first
    List,

    /// Register a subscription
    Add {
        url: String,

        /// Status to subscribe to (repeatable)
        #[arg(short, long = "event", required = true)]
        events: Vec<MessageStatus>,

        /// HMAC signing secret
        #[arg(short, long)]
        secret: Option<String>,

        /// Register without enabling
        #[arg(long)]
        disabled: bool,
    },

    /// Delete a subscription
    Remove { id: String },

    /// Enable a disabled subscription or disable an enabled one
    Toggle { id: String },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Classify { error, code } => {
            let outcome = match error {
                None => DeliveryOutcome::Delivered,
                Some(message) => DeliveryOutcome::Failed { code, message },
            };
            let result = classify(&outcome);
            print_json(&serde_json::json!({
                "status": result.status,
                "reason": result.reason(),
            }))
        }
        Commands::InitConfig { force } => init_config(force),
        Commands::Messages(cmd) => {
            let backend = open(cli.config)?;
            let result = run_messages(&backend, cmd);
            backend.close().context("Failed to close store")?;
            result
        }
        Commands::Webhooks(cmd) => {
            let settings = load_settings(cli.config)?;
            if settings.storage.kind == StorageKind::None {
                warn!("Storage kind is none; webhook changes will not outlive this command");
            }
            let backend = open_backend(&settings.storage).context("Failed to open storage")?;
            let result = run_webhooks(&backend, cmd);
            backend.close().context("Failed to close store")?;
            result
        }
    }
}

fn load_settings(path: Option<PathBuf>) -> Result<GatewayConfig> {
    if let Err(e) = config::init() {
        error!("Failed to initialize config directory: {}", e);
    }
    GatewayConfig::load(path.as_deref())
}

fn open(path: Option<PathBuf>) -> Result<Backend> {
    let settings = load_settings(path)?;
    open_backend(&settings.storage).context("Failed to open storage")
}

fn run_messages(backend: &Backend, cmd: MessageCommands) -> Result<()> {
    match cmd {
        MessageCommands::List {
            status,
            limit,
            offset,
        } => {
            let query = MessageQuery {
                status,
                limit,
                offset,
                ..MessageQuery::all()
            };
            print_json(&backend.messages.get(&query)?)
        }
        MessageCommands::Show { id } => {
            match backend.messages.find(&id.as_str().into())? {
                Some(message) => print_json(&message),
                None => bail!("Message {} not found", id),
            }
        }
    }
}

fn run_webhooks(backend: &Backend, cmd: WebhookCommands) -> Result<()> {
    let webhooks = &backend.webhooks;
    match cmd {
        WebhookCommands::List => print_json(&webhooks.list()?),
        WebhookCommands::Add {
            url,
            events,
            secret,
            disabled,
        } => {
            let mut hook = WebhookConfig::new(url, events, secret);
            hook.enabled = !disabled;
            webhooks.create(&hook)?;
            print_json(&hook)
        }
        WebhookCommands::Remove { id } => {
            webhooks.delete(&id)?;
            print_json(&serde_json::json!({ "deleted": id }))
        }
        WebhookCommands::Toggle { id } => {
            let mut hook = webhooks.get(&id)?;
            hook.toggle();
            webhooks.update(&hook)?;
            print_json(&hook)
        }
    }
}

fn init_config(force: bool) -> Result<()> {
    if config::config_exists(gateway::settings::SETTINGS_FILE) && !force {
        bail!("Settings file already exists; pass --force to overwrite");
    }
    let path = GatewayConfig::default().save_default()?;
    print_json(&serde_json::json!({ "written": path }))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
