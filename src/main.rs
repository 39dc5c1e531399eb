//! Tributary service entry point.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tributary::annotation::Payload;
use tributary::{create_rest_router, Config, DataSystem, RestApiConfig, TributaryError};

/// Tributary: natural-language queries over registered data sources
#[derive(Parser, Debug)]
#[command(name = "tributary")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API server (default behavior)
    Serve {
        /// HTTP port. If not specified, uses the config file value.
        #[arg(short, long)]
        port: Option<u16>,
        /// Enable JSON logging format
        #[arg(long)]
        json_logs: bool,
    },
    /// Answer a single query and print the result
    Query {
        /// Query text
        query: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // API keys commonly live in a .env file during development.
    dotenvy::dotenv().ok();

    let args = Args::parse();

    match args.command {
        Some(Command::Query { query }) => run_query(&args.config, &query).await,
        Some(Command::Serve { port, json_logs }) => run_server(&args.config, port, json_logs).await,
        None => run_server(&args.config, None, false).await,
    }
}

fn load_config(config_path: &Option<String>) -> anyhow::Result<Config> {
    Ok(match config_path {
        Some(path) => Config::from_file(path)?,
        None => Config::load()?,
    })
}

/// Run the HTTP API server.
async fn run_server(
    config_path: &Option<String>,
    port: Option<u16>,
    json_logs: bool,
) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!("Starting Tributary v{}", env!("CARGO_PKG_VERSION"));

    let mut config = load_config(config_path)?;
    if let Some(port) = port {
        config.server.http_port = port;
    }

    let system = Arc::new(DataSystem::from_config(&config)?);
    tracing::info!(
        dataframe_retrievers = system.dataframe_retriever_count(),
        text_retrievers = system.text_retriever_count(),
        oracle_model = %config.oracle.model,
        "Data system ready"
    );

    let router = create_rest_router(system, &config.store, &RestApiConfig::default());

    let addr = format!("0.0.0.0:{}", config.server.http_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, router).await?;
    Ok(())
}

/// Answer one query from the command line.
async fn run_query(config_path: &Option<String>, query: &str) -> anyhow::Result<()> {
    // Minimal logging for one-shot CLI use.
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(config_path)?;
    let system = DataSystem::from_config(&config)?;

    match system.process_request(query).await {
        Ok(annotation) => {
            match &annotation.payload {
                Payload::Table(frame) => {
                    println!("{}", serde_json::to_string_pretty(&frame.to_records())?);
                }
                Payload::Text(answer) => println!("{}", answer.text),
            }
            eprintln!("source: {}", annotation.source);
            Ok(())
        }
        Err(TributaryError::NoData) => {
            eprintln!("no data found for the query");
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}
