// Groundwork retrieval control plane
// Main entry point for the groundwork binary

use clap::Parser;
use groundwork_engine::cli::{Cli, Command, ConfigAction, MemoryAction};
use groundwork_engine::config::Config;
use groundwork_engine::handlers::{
    handle_ask, handle_assess, handle_classify, handle_config_path, handle_config_show,
    handle_execute, handle_history, handle_memory_get, handle_plan, handle_rank, OutputFormat,
};
use groundwork_engine::telemetry::init_telemetry_with_level;
use sdk::errors::{EngineError, ErrorExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Determine output format
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    // Load configuration (or use custom path if provided)
    let loaded = match &cli.config {
        Some(config_path) => Config::load_or_create_at(config_path),
        None => Config::load_or_create(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(e) => return Err(with_hint(e)),
    };

    // --log beats the config level; RUST_LOG beats both
    let level = cli.log.as_deref().unwrap_or(&config.core.log_level);
    init_telemetry_with_level(level);

    let version = env!("CARGO_PKG_VERSION");
    let commit = env!("GIT_COMMIT_HASH");
    let timestamp = env!("BUILD_TIMESTAMP");
    tracing::debug!("Groundwork v{} ({} - {})", version, commit, timestamp);

    // Handle commands
    let result = match cli.command {
        Command::Ask {
            question,
            k,
            no_policies,
            trace_out,
        } => handle_ask(question, k, no_policies, trace_out, &config, format).await,

        Command::Classify { question } => handle_classify(question, format),

        Command::Plan { question, k } => handle_plan(question, k, &config, format),

        Command::Execute { plan } => handle_execute(plan, &config, format).await,

        Command::Rank { candidates } => handle_rank(candidates, &config, format),

        Command::Assess {
            question,
            candidates,
            decision,
        } => handle_assess(question, candidates, decision, &config, format),

        Command::History { limit } => handle_history(limit, &config, format),

        Command::Memory { action } => match action {
            MemoryAction::Get { key } => handle_memory_get(key, &config, format),
        },

        Command::Config { action } => match action {
            ConfigAction::Show => handle_config_show(&config, format),
            ConfigAction::Path => handle_config_path(cli.config.as_deref(), format),
        },
    };

    result.map_err(|e| match e.downcast::<EngineError>() {
        Ok(engine_error) => with_hint(engine_error),
        Err(other) => other,
    })
}

/// Attach the error's user hint as outer context
fn with_hint(error: EngineError) -> anyhow::Error {
    let hint = error.user_hint().to_string();
    anyhow::Error::new(error).context(hint)
}
