use api::{build_app, init_app_state};
use config::{ApiConfig, ConfigError, LoggingConfig};

/// Dotenv files read before the environment, first match wins per variable
const DOTENV_PATHS: [&str; 2] = ["configs/app.env", ".env"];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    for path in DOTENV_PATHS {
        if let Err(e) = load_dotenv(path) {
            eprintln!("Failed to read {}: {}", path, e);
            std::process::exit(1);
        }
    }

    // Load configuration first to get logging settings
    let config = load_config().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        eprintln!("Application cannot start without a valid configuration.");
        std::process::exit(1);
    });

    init_tracing(&config.logging);
    tracing::debug!("Loaded configuration: {:?}", config);

    let state = init_app_state(&config);
    let app = build_app(state);

    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Translator portal listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("Server stopped");
    Ok(())
}

/// Load one dotenv file; a missing file is fine and variables already set
/// are never overridden
fn load_dotenv(path: impl AsRef<std::path::Path>) -> Result<(), dotenvy::Error> {
    match dotenvy::from_filename(path) {
        Ok(_) => Ok(()),
        Err(dotenvy::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// A YAML file takes precedence when present, the environment otherwise
fn load_config() -> Result<ApiConfig, ConfigError> {
    match ApiConfig::load() {
        Err(ConfigError::FileNotFound { .. }) => ApiConfig::from_env(),
        other => other,
    }
}

fn init_tracing(logging_config: &LoggingConfig) {
    let filter = logging_config.filter_directive();

    match logging_config.format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .init();
        }
        "compact" => {
            tracing_subscriber::fmt()
                .compact()
                .with_env_filter(filter)
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .pretty()
                .with_env_filter(filter)
                .init();
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}
