use anyhow::Result;
use clap::{Parser, Subcommand};

use pgbackup::cli::{
    handle_backup, handle_config, handle_list, handle_prune, handle_restore, handle_run, Services,
};
use pgbackup::config::Settings;
use pgbackup::crypto::{EncryptionGate, GpgGate};
use pgbackup::dump::PgTools;
use pgbackup::logging::{init_tracing, LogFormat};
use pgbackup::storage::create_store;

#[derive(Parser)]
#[command(
    name = "pgbackup",
    version,
    about = "Scheduled PostgreSQL backups to object storage",
    long_about = "pgbackup dumps PostgreSQL databases, optionally encrypts them with gpg, \
                  uploads them to S3 or a local directory, and prunes them with \
                  separate daily and hourly retention windows. All configuration \
                  comes from environment variables (or a .env file)."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Back up every target once, then prune
    Backup,

    /// Restore from a backup
    Restore {
        /// Backup timestamp (YYYY-MM-DDTHH:MM:SS); the latest backup when omitted
        timestamp: Option<String>,
    },

    /// List stored backups
    #[command(alias = "ls")]
    List {
        /// Show detailed information
        #[arg(short, long)]
        verbose: bool,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Delete backups that have aged out of their retention window
    Prune {
        /// Show what would be deleted without deleting
        #[arg(short = 'n', long)]
        dry_run: bool,
    },

    /// Back up on SCHEDULE, or once when SCHEDULE is unset (default)
    Run,

    /// Show the effective configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    init_tracing(LogFormat::from_env());

    // Settings are validated before anything touches the database or the store
    let settings = Settings::from_env()?;
    let store = create_store(&settings.storage)?;
    let tools = PgTools::new(settings.postgres.clone());
    let gpg = settings.passphrase.clone().map(GpgGate::new);

    let services = Services {
        settings: &settings,
        store: store.as_ref(),
        dumper: &tools,
        gate: gpg.as_ref().map(|g| g as &dyn EncryptionGate),
    };

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Backup => handle_backup(services)?,
        Commands::Restore { timestamp } => handle_restore(services, timestamp)?,
        Commands::List { verbose, json } => handle_list(services, verbose, json)?,
        Commands::Prune { dry_run } => handle_prune(services, dry_run)?,
        Commands::Run => handle_run(services)?,
        Commands::Config => handle_config(&settings, &store.location()),
    }

    Ok(())
}
