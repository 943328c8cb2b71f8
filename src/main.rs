use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ranking_engine::api::{build_router, state::AppState};
use ranking_engine::calculate::PowerOfTwoEmbedding;
use ranking_engine::config::AppConfig;
use ranking_engine::models::{EntityId, RankingType};
use ranking_engine::snapshot::{AdminCapability, SnapshotService};
use ranking_engine::storage::{JsonlStore, StorageConfig};

#[derive(Parser)]
#[command(name = "ranking-engine")]
#[command(about = "Tournament points, standings and weekly ranking snapshots")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "./config.toml")]
    config: String,

    /// Data directory path (overrides the config file)
    #[arg(long)]
    data_dir: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the REST API server
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(long)]
        port: Option<u16>,
    },

    /// Show per-player points for one tournament
    Points {
        #[arg(long)]
        tournament: String,

        /// Count results from rounds that are not fully decided
        #[arg(long)]
        include_open_rounds: bool,
    },

    /// Show a standings view
    Standings {
        #[command(subcommand)]
        view: StandingsView,
    },

    /// Build the snapshot a confirm would store
    Preview {
        /// ROLLING, SEASON or RTF
        #[arg(long = "type")]
        ranking_type: RankingType,

        /// Defaults to the current Monday
        #[arg(long)]
        monday: Option<NaiveDate>,
    },

    /// Confirm a previewed snapshot
    Confirm {
        #[arg(long = "type")]
        ranking_type: RankingType,

        #[arg(long)]
        monday: NaiveDate,

        /// Hash returned by `preview`
        #[arg(long)]
        hash: String,

        #[arg(long, default_value = "cli")]
        created_by: String,
    },

    /// Show the confirmed snapshot for a Monday
    ShowSnapshot {
        #[arg(long = "type")]
        ranking_type: RankingType,

        #[arg(long)]
        monday: NaiveDate,
    },

    /// Collapse old snapshot payloads into aliases
    RetentionGc {
        /// Most recent snapshots per type that keep their payload
        #[arg(long)]
        keep: Option<u32>,
    },

    /// Stamp a tournament's seeding Monday
    SeedBaseline {
        #[arg(long)]
        tournament: String,
    },

    /// Print the current official Monday
    CurrentMonday,
}

#[derive(Subcommand)]
enum StandingsView {
    Season {
        #[arg(long)]
        season: String,
    },
    Rolling {
        #[arg(long)]
        monday: Option<NaiveDate>,
    },
    Rtf {
        #[arg(long)]
        season: String,
    },
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let path = PathBuf::from(&cli.config);
    let mut config = if path.exists() {
        AppConfig::from_file(&path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?
    } else {
        AppConfig::default()
    };

    if let Some(data_dir) = &cli.data_dir {
        config.data_dir = PathBuf::from(data_dir);
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    Ok(config)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn operator() -> AdminCapability {
    AdminCapability::local(std::env::var("USER").unwrap_or_else(|_| "cli".to_string()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    let registry = tracing_subscriber::registry().with(filter);
    if cli.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    tracing::info!("Starting ranking-engine v{}", env!("CARGO_PKG_VERSION"));

    let store = Arc::new(JsonlStore::new(StorageConfig::new(config.data_dir.clone())));
    let service = SnapshotService::new(store, Arc::new(PowerOfTwoEmbedding), config.ranking.clone())?;

    match cli.command {
        Commands::Serve { host, port } => {
            let mut server = config.server.clone();
            if let Some(host) = host {
                server.host = host;
            }
            if let Some(port) = port {
                server.port = port;
            }
            if server.admin_token.is_none() {
                tracing::warn!("No admin token configured; mutating routes are disabled");
            }

            let addr = format!("{}:{}", server.host, server.port);
            let app = build_router(AppState::new(service, server));
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            tracing::info!("Listening on http://{}", addr);
            axum::serve(listener, app).await?;
        }
        Commands::Points {
            tournament,
            include_open_rounds,
        } => {
            let points = service
                .calculator()
                .points_for_tournament(&EntityId::from(tournament), !include_open_rounds)?;
            print_json(&points)?;
        }
        Commands::Standings { view } => {
            let calc = service.calculator();
            let rows = match view {
                StandingsView::Season { season } => {
                    calc.season_standings(&EntityId::from(season))?
                }
                StandingsView::Rolling { monday } => {
                    let monday = monday.unwrap_or_else(|| service.current_monday(Utc::now()));
                    calc.rolling_standings(monday)?
                }
                StandingsView::Rtf { season } => calc.rtf_standings(
                    &EntityId::from(season),
                    &service.settings().auto_top_categories,
                )?,
            };
            print_json(&rows)?;
        }
        Commands::Preview {
            ranking_type,
            monday,
        } => {
            let monday = monday.unwrap_or_else(|| service.current_monday(Utc::now()));
            let preview = service.build_preview(ranking_type, monday)?;
            print_json(&preview)?;
        }
        Commands::Confirm {
            ranking_type,
            monday,
            hash,
            created_by,
        } => {
            let outcome =
                service.confirm_snapshot(&operator(), ranking_type, monday, &hash, &created_by)?;
            tracing::info!("Snapshot {}", outcome.status());
            print_json(outcome.snapshot())?;
        }
        Commands::ShowSnapshot {
            ranking_type,
            monday,
        } => match service.get_official_snapshot(ranking_type, monday)? {
            Some(snapshot) => print_json(&snapshot)?,
            None => anyhow::bail!("No {} snapshot for {}", ranking_type, monday),
        },
        Commands::RetentionGc { keep } => {
            let keep = keep.unwrap_or(service.settings().retention_full_weeks);
            anyhow::ensure!(keep > 0, "--keep must be at least 1");
            let report = service.retention_gc(&operator(), keep)?;
            print_json(&report)?;
        }
        Commands::SeedBaseline { tournament } => {
            let monday = service.ensure_seeding_baseline(&operator(), &EntityId::from(tournament))?;
            println!("{}", monday);
        }
        Commands::CurrentMonday => {
            println!("{}", service.current_monday(Utc::now()));
        }
    }

    Ok(())
}
