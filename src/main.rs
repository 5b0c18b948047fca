use anyhow::Result;
use clap::Parser;
use quiz_generator::models::Config;
use quiz_generator::server::{self, AppState};
use quiz_generator::stream::FramingPolicy;
use std::net::SocketAddr;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "quiz-generator")]
#[command(about = "Serve streamed AI quiz questions and generated images")]
struct CliArgs {
    /// Address to listen on. Overrides BIND_ADDR.
    #[arg(long, value_name = "ADDR")]
    bind: Option<SocketAddr>,

    /// How the completion stream is split into questions: `incremental` or
    /// `line`. Overrides QUIZ_FRAMING.
    #[arg(long, value_name = "POLICY", value_parser = parse_framing_arg)]
    framing: Option<FramingPolicy>,
}

fn parse_framing_arg(input: &str) -> std::result::Result<FramingPolicy, String> {
    input.parse()
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quiz_generator=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting quiz-generator");

    let args = CliArgs::parse();

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(framing) = args.framing {
        config.framing = framing;
    }

    let state = match AppState::from_config(&config) {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    };

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    server::serve(listener, state, shutdown_signal()).await?;
    info!("Server stopped");
    Ok(())
}
