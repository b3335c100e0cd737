//! EtherVault CLI - Command line interface for the key vault.
//!
//! This tool drives a vault session for one invocation at a time:
//! commands that need key material unlock, act, and lock again before
//! exiting. Everything lives under a single data directory.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::RngCore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;
use zeroize::Zeroizing;

use ethervault_endpoints::{format_ether, hex_to_decimal, poll_all, EndpointRegistry, RpcClient};
use ethervault_storage::{FileBackend, MethodKind};
use ethervault_vault::{LocalKeyMaterial, SoftAuthenticator, VaultSession, VaultState};

/// Relying party ID used for credentials created by this host.
const RP_ID: &str = "localhost";

#[derive(Parser)]
#[command(name = "ethervault")]
#[command(about = "EtherVault - Encrypted EVM key vault")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Data directory (default: ~/.ethervault).
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the wallet credential.
    Setup {
        /// Use the device credential instead of a password.
        #[arg(long)]
        biometric: bool,
    },

    /// Show vault state and endpoint health.
    Status,

    /// Manage stored keys.
    #[command(subcommand)]
    Keys(KeysCommand),

    /// Manage RPC endpoints.
    #[command(subcommand)]
    Endpoints(EndpointsCommand),
}

#[derive(Subcommand)]
enum KeysCommand {
    /// List stored keys (unlocks the vault).
    List {
        /// Query balances through this endpoint ID.
        #[arg(long, value_name = "ID")]
        endpoint: Option<String>,
    },

    /// Import an existing private key (prompted, never an argument).
    Import {
        /// Label for the key.
        #[arg(short, long)]
        label: Option<String>,
    },

    /// Generate a new random key.
    Generate {
        /// Label for the key.
        #[arg(short, long)]
        label: Option<String>,
    },

    /// Rename a stored key.
    Rename {
        /// Record ID of the key.
        #[arg(long)]
        id: u64,

        /// New label.
        #[arg(short, long)]
        label: String,
    },
}

#[derive(Subcommand)]
enum EndpointsCommand {
    /// List configured endpoints.
    List,

    /// Add an endpoint.
    Add {
        /// Display name; the ID is derived from it.
        #[arg(long)]
        name: String,

        /// RPC URL (http or https).
        #[arg(long)]
        url: String,

        /// Native token symbol, e.g. ETH.
        #[arg(long)]
        symbol: String,
    },

    /// Update an endpoint's fields.
    Update {
        /// Endpoint ID.
        #[arg(long)]
        id: String,

        #[arg(long)]
        name: String,

        #[arg(long)]
        url: String,

        #[arg(long)]
        symbol: String,
    },

    /// Remove an endpoint.
    Remove {
        /// Endpoint ID.
        #[arg(long)]
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging; library output stays quiet unless asked for.
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let data_dir = cli.data_dir.unwrap_or_else(default_data_dir);

    match cli.command {
        Commands::Setup { biometric } => cmd_setup(&data_dir, biometric).await,

        Commands::Status => cmd_status(&data_dir).await,

        Commands::Keys(KeysCommand::List { endpoint }) => {
            cmd_keys_list(&data_dir, endpoint.as_deref()).await
        }
        Commands::Keys(KeysCommand::Import { label }) => {
            cmd_keys_import(&data_dir, label.as_deref()).await
        }
        Commands::Keys(KeysCommand::Generate { label }) => {
            cmd_keys_generate(&data_dir, label.as_deref()).await
        }
        Commands::Keys(KeysCommand::Rename { id, label }) => {
            cmd_keys_rename(&data_dir, id, &label).await
        }

        Commands::Endpoints(EndpointsCommand::List) => cmd_endpoints_list(&data_dir),
        Commands::Endpoints(EndpointsCommand::Add { name, url, symbol }) => {
            cmd_endpoints_add(&data_dir, &name, &url, &symbol)
        }
        Commands::Endpoints(EndpointsCommand::Update {
            id,
            name,
            url,
            symbol,
        }) => cmd_endpoints_update(&data_dir, &id, &name, &url, &symbol),
        Commands::Endpoints(EndpointsCommand::Remove { id }) => {
            cmd_endpoints_remove(&data_dir, &id)
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".ethervault"))
        .unwrap_or_else(|| PathBuf::from(".ethervault"))
}

/// Prompt for a secret without echoing it.
fn prompt_secret(prompt: &str) -> Result<Zeroizing<String>> {
    let secret = rpassword::prompt_password(prompt).context("Failed to read input")?;
    Ok(Zeroizing::new(secret))
}

/// Load or create the stable secret behind the software authenticator.
///
/// Credentials registered by this host only stay usable if the secret
/// survives restarts, so it lives next to the vault data.
fn load_device_secret(data_dir: &Path) -> Result<[u8; 32]> {
    let path = data_dir.join("device.secret");
    let mut secret = [0u8; 32];

    match std::fs::read_to_string(&path) {
        Ok(text) => {
            hex::decode_to_slice(text.trim(), &mut secret)
                .context("Corrupt device secret file")?;
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            rand::thread_rng().fill_bytes(&mut secret);
            std::fs::create_dir_all(data_dir)?;
            std::fs::write(&path, hex::encode(secret))
                .context("Failed to write device secret")?;
        }
        Err(e) => return Err(e).context("Failed to read device secret"),
    }

    Ok(secret)
}

async fn open_session(data_dir: &Path) -> Result<VaultSession> {
    let backend = Arc::new(FileBackend::new(data_dir).context("Failed to open data directory")?);
    let secret = load_device_secret(data_dir)?;
    let authenticator = Arc::new(SoftAuthenticator::from_secret(secret));

    let session = VaultSession::initialize(
        backend,
        authenticator,
        Arc::new(LocalKeyMaterial::new()),
        RP_ID,
    )
    .await
    .context("Failed to open vault")?;

    Ok(session)
}

/// Unlock with whichever credential the wallet was set up with.
async fn unlock_session(session: &mut VaultSession) -> Result<()> {
    match session.credential_method() {
        Some(MethodKind::Password) => {
            let password = prompt_secret("Password: ")?;
            session
                .unlock_with_password(&password)
                .await
                .context("Failed to unlock vault")?;
        }
        Some(MethodKind::Prf) => {
            session
                .unlock_with_biometric()
                .await
                .context("Failed to unlock vault")?;
        }
        None => anyhow::bail!("No wallet is configured. Run 'ethervault setup' first."),
    }
    Ok(())
}

fn describe_state(state: VaultState) -> &'static str {
    match state {
        VaultState::NoWallet => "not configured",
        VaultState::Locked => "locked",
        VaultState::Unlocked => "unlocked",
    }
}

fn registry_path(data_dir: &Path) -> PathBuf {
    data_dir.join("endpoints.json")
}

/// Configure the wallet credential.
async fn cmd_setup(data_dir: &Path, biometric: bool) -> Result<()> {
    let mut session = open_session(data_dir).await?;

    if session.state() != VaultState::NoWallet {
        anyhow::bail!(
            "A wallet is already configured in {}",
            data_dir.display()
        );
    }

    if biometric {
        session
            .setup_with_biometric()
            .await
            .context("Biometric setup failed")?;
        println!("Wallet configured with the device credential.");
    } else {
        let password = prompt_secret("Choose a password (min 8 characters): ")?;
        let confirm = prompt_secret("Confirm password: ")?;
        session
            .setup_with_password(&password, &confirm)
            .await
            .context("Password setup failed")?;
        println!("Wallet configured with a password.");
    }

    println!("  Data directory: {}", data_dir.display());
    session.lock();

    Ok(())
}

/// Show vault state and endpoint health.
async fn cmd_status(data_dir: &Path) -> Result<()> {
    let session = open_session(data_dir).await?;

    println!("Vault:");
    println!("  State: {}", describe_state(session.state()));
    match session.credential_method() {
        Some(method) => println!("  Credential: {}", method),
        None => println!("  Credential: none"),
    }
    println!("  Stored keys: {}", session.stored_key_count());

    let registry = EndpointRegistry::load(registry_path(data_dir))?;
    let endpoints = registry.list();
    if endpoints.is_empty() {
        println!("\nNo endpoints configured.");
        return Ok(());
    }

    println!("\nEndpoints:");
    let client = RpcClient::new();
    for status in poll_all(&client, &endpoints).await {
        if status.online {
            let chain = status
                .chain_id
                .as_deref()
                .and_then(|h| hex_to_decimal(h).ok())
                .unwrap_or_else(|| "?".to_string());
            let block = status
                .block_number
                .as_deref()
                .and_then(|h| hex_to_decimal(h).ok())
                .unwrap_or_else(|| "?".to_string());
            println!(
                "  [online]  {} ({})  chain {}  block {}  {}ms",
                status.name, status.symbol, chain, block, status.latency_ms
            );
        } else {
            println!(
                "  [offline] {} ({})  {}ms",
                status.name, status.symbol, status.latency_ms
            );
        }
    }

    Ok(())
}

/// List stored keys, optionally with balances from one endpoint.
async fn cmd_keys_list(data_dir: &Path, endpoint: Option<&str>) -> Result<()> {
    let mut session = open_session(data_dir).await?;
    unlock_session(&mut session).await?;

    if session.entries().is_empty() {
        println!("No keys stored.");
        session.lock();
        return Ok(());
    }

    let balance_endpoint = match endpoint {
        Some(id) => {
            let registry = EndpointRegistry::load(registry_path(data_dir))?;
            let ep = registry
                .get(id)
                .with_context(|| format!("Endpoint '{}' not found", id))?;
            Some(ep)
        }
        None => None,
    };
    let client = RpcClient::new();

    let active = session.active_index();
    for (index, entry) in session.entries().iter().enumerate() {
        let marker = if Some(index) == active { "*" } else { " " };

        match &balance_endpoint {
            Some(ep) => {
                let balance = match client.balance_of(&ep.url, &entry.address).await {
                    Ok(wei) => {
                        let amount = format_ether(&wei).unwrap_or_else(|_| wei.clone());
                        format!("{} {}", amount, ep.symbol)
                    }
                    Err(e) => format!("balance unavailable: {}", e),
                };
                println!(
                    "{} [{}] {}  {}  {}",
                    marker, entry.id, entry.label, entry.address, balance
                );
            }
            None => {
                println!("{} [{}] {}  {}", marker, entry.id, entry.label, entry.address);
            }
        }
    }

    session.lock();
    Ok(())
}

/// Import an existing private key.
async fn cmd_keys_import(data_dir: &Path, label: Option<&str>) -> Result<()> {
    let mut session = open_session(data_dir).await?;
    unlock_session(&mut session).await?;

    let raw = prompt_secret("Private key (hex): ")?;
    let id = session
        .import_key(label.unwrap_or(""), &raw)
        .await
        .context("Import failed")?;

    if let Some(entry) = session.entries().iter().find(|e| e.id == id) {
        println!("Imported key {} ({})", entry.label, entry.address);
    }

    session.lock();
    Ok(())
}

/// Generate a new random key.
async fn cmd_keys_generate(data_dir: &Path, label: Option<&str>) -> Result<()> {
    let mut session = open_session(data_dir).await?;
    unlock_session(&mut session).await?;

    let id = session
        .generate_key(label)
        .await
        .context("Key generation failed")?;

    if let Some(entry) = session.entries().iter().find(|e| e.id == id) {
        println!("Generated key {} ({})", entry.label, entry.address);
    }

    session.lock();
    Ok(())
}

/// Rename a stored key.
async fn cmd_keys_rename(data_dir: &Path, id: u64, label: &str) -> Result<()> {
    let mut session = open_session(data_dir).await?;
    unlock_session(&mut session).await?;

    session
        .rename_key(id, label)
        .await
        .context("Rename failed")?;

    println!("Key {} renamed to '{}'", id, label.trim());

    session.lock();
    Ok(())
}

/// List configured endpoints.
fn cmd_endpoints_list(data_dir: &Path) -> Result<()> {
    let registry = EndpointRegistry::load(registry_path(data_dir))?;
    let endpoints = registry.list();

    if endpoints.is_empty() {
        println!("No endpoints configured.");
        return Ok(());
    }

    for ep in endpoints {
        println!("{}  {} ({})  {}", ep.id, ep.name, ep.symbol, ep.url);
    }

    Ok(())
}

/// Add an endpoint.
fn cmd_endpoints_add(data_dir: &Path, name: &str, url: &str, symbol: &str) -> Result<()> {
    std::fs::create_dir_all(data_dir).context("Failed to create data directory")?;
    let registry = EndpointRegistry::load(registry_path(data_dir))?;

    let endpoint = registry
        .add(name, url, symbol)
        .context("Failed to add endpoint")?;

    println!("Added endpoint '{}' ({})", endpoint.id, endpoint.url);
    Ok(())
}

/// Update an endpoint.
fn cmd_endpoints_update(
    data_dir: &Path,
    id: &str,
    name: &str,
    url: &str,
    symbol: &str,
) -> Result<()> {
    let registry = EndpointRegistry::load(registry_path(data_dir))?;

    let endpoint = registry
        .update(id, name, url, symbol)
        .context("Failed to update endpoint")?;

    println!("Updated endpoint '{}'", endpoint.id);
    Ok(())
}

/// Remove an endpoint.
fn cmd_endpoints_remove(data_dir: &Path, id: &str) -> Result<()> {
    let registry = EndpointRegistry::load(registry_path(data_dir))?;

    registry
        .remove(id)
        .context("Failed to remove endpoint")?;

    println!("Removed endpoint '{}'", id);
    Ok(())
}
