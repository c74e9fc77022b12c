use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use ssa_vault::cli::{
    ensure_unlocked, handle_config_command, handle_init, handle_report_command, ConfigCommands,
    ReportCommands,
};
use ssa_vault::config::{paths::DATA_DIR_ENV, Settings, VaultPaths};
use ssa_vault::storage::JsonFileStore;
use ssa_vault::vault::Vault;

/// Environment variable holding the `tracing` filter directive
const LOG_ENV: &str = "SSA_VAULT_LOG";

#[derive(Parser)]
#[command(
    name = "ssa-vault",
    version,
    about = "Encrypted local-first storage for disability benefit reports",
    long_about = "ssa-vault keeps disability benefit reports and AI provider credentials \
                  encrypted at rest under a passphrase-derived key. Nothing is written \
                  to disk in plaintext."
)]
struct Cli {
    /// Override the data directory
    #[arg(long, global = true, env = DATA_DIR_ENV)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Set up the vault passphrase
    Init,

    /// Show whether a passphrase is set up and what awaits sync
    Status,

    /// Show the directories in use
    Paths,

    /// Report management commands
    #[command(subcommand)]
    Report(ReportCommands),

    /// Provider configuration commands
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let paths = match cli.data_dir {
        Some(dir) => VaultPaths::with_base_dir(dir),
        None => VaultPaths::new()?,
    };
    let settings = Settings::load_or_create(&paths)?;
    init_tracing(&settings);

    let Some(command) = cli.command else {
        println!("ssa-vault - encrypted disability report storage");
        println!();
        println!("Run 'ssa-vault --help' for usage information.");
        println!("Run 'ssa-vault init' to set up a passphrase.");
        return Ok(());
    };

    if let Commands::Paths = command {
        println!("SSA Vault Paths");
        println!("===============");
        println!("Base directory: {}", paths.base_dir().display());
        println!("Data directory: {}", paths.data_dir().display());
        println!("Settings file:  {}", paths.settings_file().display());
        return Ok(());
    }

    let store = Arc::new(JsonFileStore::new(paths.clone())?);
    let vault = Vault::open(store, &settings).await?;

    let result = run(&vault, &paths, &settings, command).await;
    vault.lock().await;
    result
}

async fn run(vault: &Vault, paths: &VaultPaths, settings: &Settings, command: Commands) -> Result<()> {
    match command {
        Commands::Init => {
            handle_init(vault).await?;
            if !paths.settings_file().exists() {
                settings.save(paths)?;
            }
        }
        Commands::Status => {
            println!("SSA Vault Status");
            println!("================");
            println!("Session:           {}", vault.state());
            println!("Key derivation:    PBKDF2-SHA256, {} iterations", settings.kdf_iterations);
            println!("Default provider:  {}", settings.default_provider);
            println!(
                "Awaiting sync:     {} report(s)",
                vault.reports().pending_sync().await?.len()
            );
        }
        Commands::Paths => {}
        Commands::Report(cmd) => {
            ensure_unlocked(vault).await?;
            handle_report_command(vault.reports(), cmd).await?;
        }
        Commands::Config(cmd) => {
            ensure_unlocked(vault).await?;
            handle_config_command(vault.config(), settings, cmd).await?;
        }
    }

    Ok(())
}

fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(&settings.log_filter))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
