//! Modera - content moderation service.
//!
//! Runs the HTTP API server: media uploads are classified through an
//! OpenAI-compatible vision model and queued for moderator review.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use directories::ProjectDirs;
use modera_core::{ChatClient, ChatConfig, OpenAiVisionGateway, VisionConfig};
use modera_server::{AppState, Server, ServerConfig, DEFAULT_HOST, DEFAULT_PORT};
use modera_storage::Database;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Modera - content moderation service
#[derive(Parser, Debug)]
#[command(name = "modera", version, about)]
struct Args {
    /// Host to bind the API server to
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,

    /// Port to bind the API server to
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Database path (defaults to the app data directory)
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Directory uploaded media is stored in
    #[arg(long, default_value = "media")]
    media_dir: PathBuf,

    /// API key for the OpenAI-compatible service
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Base URL of the OpenAI-compatible API
    #[arg(long)]
    base_url: Option<String>,

    /// Vision model used for classification
    #[arg(long, default_value = "gpt-4o")]
    vision_model: String,

    /// Chat model used for the /api/ask pass-through
    #[arg(long, default_value = "gpt-4")]
    chat_model: String,

    /// Seed the baseline dangerous-tag vocabulary and exit
    #[arg(long)]
    seed_tags: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Get the logs directory path.
fn logs_dir() -> Option<PathBuf> {
    ProjectDirs::from("com", "modera", "modera").map(|dirs| dirs.data_dir().join("logs"))
}

/// Initialize logging with daily file rotation plus console output.
fn init_logging(args: &Args) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_level = if args.debug { "debug" } else { &args.log_level };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("modera={},warn", log_level)));

    if let Some(log_dir) = logs_dir() {
        if std::fs::create_dir_all(&log_dir).is_ok() {
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .max_log_files(5)
                .filename_prefix("modera")
                .filename_suffix("log")
                .build(&log_dir)
                .ok();

            if let Some(appender) = file_appender {
                let (non_blocking, guard) = tracing_appender::non_blocking(appender);

                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().with_writer(std::io::stdout))
                    .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                    .init();

                tracing::info!("Logging to {:?}", log_dir);
                return Some(guard);
            }
        }
    }

    // Fallback: console logging only
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::warn!("File logging unavailable, using console only");
    None
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Keep the guard alive for the duration of the program
    let _log_guard = init_logging(&args);

    tracing::info!("Starting Modera...");

    let db = match args.db_path {
        Some(ref path) => Database::with_path(path)?,
        None => Database::new()?,
    };

    if args.seed_tags {
        let created = db.seed_tags()?;
        tracing::info!(created, "baseline tag vocabulary seeded");
        println!("Seeded {created} tags");
        return Ok(());
    }

    let mut vision_config = VisionConfig::new(&args.api_key).with_model(&args.vision_model);
    let mut chat_config = ChatConfig::new(&args.api_key);
    chat_config.model = args.chat_model.clone();
    if let Some(ref base_url) = args.base_url {
        vision_config = vision_config.with_base_url(base_url);
        chat_config = chat_config.with_base_url(base_url);
    }

    let gateway = Arc::new(
        OpenAiVisionGateway::new(vision_config)
            .map_err(|e| anyhow::anyhow!("failed to build vision gateway: {e}"))?,
    );
    let chat = Arc::new(
        ChatClient::new(chat_config)
            .map_err(|e| anyhow::anyhow!("failed to build chat client: {e}"))?,
    );

    std::fs::create_dir_all(&args.media_dir)?;
    tracing::info!(media_dir = ?args.media_dir, "media directory ready");

    let state = AppState::new(db, gateway, Some(chat), &args.media_dir);
    let config = ServerConfig::default()
        .with_host(&args.host)
        .with_port(args.port);

    let server = Server::with_state(config, state)?;
    tracing::info!("API server listening on {}", server.addr());

    server.run().await?;

    tracing::info!("Modera shutting down");
    Ok(())
}
