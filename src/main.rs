use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crew_capacity::{api, config::EngineConfig, db, engine::AssignmentEngine, shortage};

#[derive(Parser)]
#[command(name = "crewcap")]
#[command(about = "Crew capacity scheduling and hanger assignment")]
struct Cli {
    /// Path to the SQLite database (defaults to the platform data directory)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve {
        /// Port for HTTP API
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },
    /// Print the capacity dashboard as JSON
    Dashboard,
    /// Apply pending database migrations and exit
    Migrate,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG")
            .unwrap_or_else(|_| "crew_capacity=debug,tower_http=debug".into()),
    );

    // Logs go to stderr so `dashboard` output stays clean on stdout
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn open_database(path: Option<PathBuf>) -> anyhow::Result<db::Database> {
    let db = match path {
        Some(path) => db::Database::open(path)?,
        None => db::Database::open_default()?,
    };
    db.migrate()?;
    Ok(db)
}

async fn serve(engine: AssignmentEngine, host: &str, port: u16) -> anyhow::Result<()> {
    let app = api::create_router(engine);

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", host, port)).await?;
    tracing::info!("crewcap listening on http://{}:{}", host, port);

    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let db = open_database(cli.db)?;
    let config = EngineConfig::from_env();
    tracing::debug!(?config, "Loaded engine configuration");
    let engine = AssignmentEngine::new(db, shortage::from_env(), config);

    match cli.command {
        Some(Commands::Serve { port, host }) => serve(engine, &host, port).await?,
        Some(Commands::Dashboard) => {
            let summary = engine.dashboard()?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Some(Commands::Migrate) => {
            tracing::info!("Database is up to date");
        }
        None => serve(engine, "127.0.0.1", 3000).await?,
    }

    Ok(())
}
