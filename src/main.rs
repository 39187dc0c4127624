//! glue-ask - natural-language questions over a Glue catalog.

use glue_ask::app::AppContext;
use glue_ask::cli::Cli;
use glue_ask::config::Config;
use glue_ask::error::{AskError, Result};
use glue_ask::handler::ApiRequest;
use glue_ask::{logging, server};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();
    logging::init_stderr_logging();

    if let Err(e) = run().await {
        error!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse_args();

    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let mut config = Config::load_from_file(&config_path)?;
    config.apply_env()?;
    cli.apply_to(&mut config)?;
    config.validate()?;

    let context = AppContext::build(&config).await?;

    let outcome = match &cli.ask {
        Some(question) => ask_once(&context, question).await,
        None => server::serve(&config.server.bind, context.handler()).await,
    };

    context.close().await?;
    outcome
}

/// Answers one question and prints the framed response to stdout.
async fn ask_once(context: &AppContext, question: &str) -> Result<()> {
    let response = context
        .handler()
        .handle(ApiRequest::for_question(question))
        .await;
    let json = serde_json::to_string_pretty(&response)
        .map_err(|e| AskError::internal(format!("Failed to encode response: {e}")))?;
    println!("{json}");
    Ok(())
}
