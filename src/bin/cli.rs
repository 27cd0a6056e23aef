//! purplefox CLI
//!
//! Command-line interface for purplefox operations:
//! - List tournaments and their tables
//! - Set or advance a table's status
//! - Watch realtime changes
//! - Generate config and style files

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use purplefox::backend::{BackendClient, StatusChange, TableStore};
use purplefox::config::Config;
use purplefox::status::{Status, TableNumber, TableStatus};

#[derive(Parser)]
#[command(name = "purplefox-cli")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Track tournament table status from the terminal")]
#[command(
    long_about = "purplefox-cli talks to the hosted backend directly.\nSet SUPABASE_URL and SUPABASE_KEY (or put them in .env.local)."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: ./purplefox.toml or the user config dir)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table", global = true)]
    pub format: OutputFormat,

    /// Show info-level logs
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List tournaments
    Tournaments,

    /// Show the tables of a tournament
    Tables {
        /// Tournament id
        tournament: String,
    },

    /// Set a table's status
    Set {
        /// Tournament id
        tournament: String,
        /// Table number
        table: TableNumber,
        /// unknown, playing, covered or done
        status: Status,
    },

    /// Advance a table one step (playing → covered → done → playing)
    Advance {
        /// Tournament id
        tournament: String,
        /// Table number
        table: TableNumber,
    },

    /// Register tables, creating unseen ones as unknown
    Observe {
        /// Tournament id
        tournament: String,
        /// Table numbers
        #[arg(required = true)]
        tables: Vec<TableNumber>,
    },

    /// Print realtime changes until interrupted
    Watch {
        /// Only show this tournament
        tournament: Option<String>,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Render tailwind.config.js from the configured theme
    Tailwind {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config =
        Config::load_default(cli.config.as_deref()).context("Failed to load configuration")?;
    if !cli.verbose {
        config.logging.level = "warn".to_string();
    }
    purplefox::logging::init(&config.logging);

    match cli.command {
        Commands::Config { output } => {
            write_output(output.as_deref(), &purplefox::config::generate_default_config())?;
        }

        Commands::Tailwind { output } => {
            write_output(output.as_deref(), &config.theme.render_tailwind_config())?;
        }

        Commands::Tournaments => {
            let client = connect(&config)?;
            let tournaments = client.tournaments().await?;

            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&tournaments)?),
                OutputFormat::Table if tournaments.is_empty() => {
                    println!("No tournaments yet.");
                    println!();
                    println!("Register tables with:");
                    println!("  purplefox-cli observe <tournament> 1 2 3");
                }
                OutputFormat::Table => {
                    for id in tournaments {
                        println!("{}", id);
                    }
                }
            }
        }

        Commands::Tables { tournament } => {
            let client = connect(&config)?;
            let rows = client.tables(&tournament).await?;
            print_rows(cli.format, &rows)?;
        }

        Commands::Set {
            tournament,
            table,
            status,
        } => {
            let client = connect(&config)?;
            let row = client.set_status(&tournament, table, status).await?;
            print_rows(cli.format, std::slice::from_ref(&row))?;
        }

        Commands::Advance { tournament, table } => {
            let client = connect(&config)?;
            let row = client.advance(&tournament, table).await?;
            print_rows(cli.format, std::slice::from_ref(&row))?;
        }

        Commands::Observe { tournament, tables } => {
            let client = connect(&config)?;
            let mut rows = Vec::with_capacity(tables.len());
            for table in tables {
                rows.push(client.observe(&tournament, table).await?);
            }
            print_rows(cli.format, &rows)?;
        }

        Commands::Watch { tournament } => {
            let client = connect(&config)?;
            let Some(listener) = client.realtime_listener() else {
                bail!("Realtime is disabled in the configuration");
            };

            let changes = client.subscribe();
            let handle = listener.spawn();
            eprintln!(
                "Watching {} (Ctrl+C to stop)",
                tournament.as_deref().unwrap_or("all tournaments")
            );

            watch(changes, handle, tournament.as_deref(), cli.format).await?;
        }
    }

    Ok(())
}

/// Print changes until Ctrl+C; fails once the realtime listener stops
async fn watch(
    mut changes: broadcast::Receiver<StatusChange>,
    mut listener: JoinHandle<()>,
    tournament: Option<&str>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = &mut listener => bail!("Realtime connection lost, giving up"),
            received = changes.recv() => match received {
                Ok(change) => {
                    if tournament.map_or(true, |t| t == change.record.tournament_id) {
                        print_change(format, &change)?;
                    }
                }
                Err(RecvError::Lagged(skipped)) => eprintln!("(skipped {} changes)", skipped),
                Err(RecvError::Closed) => break,
            }
        }
    }

    listener.abort();
    Ok(())
}

fn connect(config: &Config) -> anyhow::Result<BackendClient> {
    BackendClient::from_config(&config.backend).context("Cannot reach the backend")
}

fn write_output(output: Option<&Path>, content: &str) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            // Create parent directory if needed
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, content)?;
            println!("Written to {:?}", path);
        }
        None => print!("{}", content),
    }
    Ok(())
}

fn print_rows(format: OutputFormat, rows: &[TableStatus]) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(rows)?),
        OutputFormat::Table => {
            if rows.is_empty() {
                println!("No tables.");
                return Ok(());
            }
            println!("{:<14} {:<8} {:<10} {}", "Tournament", "Table", "Status", "Color");
            println!("{}", "-".repeat(44));
            for row in rows {
                println!(
                    "{:<14} {:<8} {:<10} {}",
                    row.tournament_id,
                    row.table_number,
                    row.status,
                    row.status.color()
                );
            }
        }
    }
    Ok(())
}

fn print_change(format: OutputFormat, change: &StatusChange) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(change)?),
        OutputFormat::Table => {
            let at = change
                .commit_timestamp
                .map(|t| t.format("%H:%M:%S").to_string())
                .unwrap_or_else(|| "--:--:--".to_string());
            println!(
                "{} {:<7} {} table {} -> {}",
                at,
                format!("{:?}", change.kind).to_lowercase(),
                change.record.tournament_id,
                change.record.table_number,
                change.record.status
            );
        }
    }
    Ok(())
}
