use anyhow::Result;
use tracing::{debug, info};
use tracing_subscriber::{filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use arena_console::{config, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file if it exists
    let env_file_path = match dotenvy::dotenv() {
        Ok(path) => Some(path),
        Err(_) => None,
    };

    // Initialize the tracing subscriber for structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            // Default to info level if RUST_LOG is not set
            if cfg!(debug_assertions) {
                "arena_console=debug,warn".into()
            } else {
                "arena_console=info,warn".into()
            }
        }))
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    info!("Arena console core starting");

    match env_file_path {
        Some(path) => info!("Loaded environment variables from {}", path.display()),
        None => debug!("No .env file found. Using existing environment variables."),
    };

    let config = config::load_config()?;
    debug!(
        base_url = %config.api.base_url,
        device_id = %config.device_id,
        "Configuration loaded"
    );

    let state = AppState::new(&config)?;
    state.initialize().await;

    if state.session.is_authenticated() {
        info!("Restored an authenticated session");
    } else {
        info!("No session restored; waiting for the login surface");
    }

    // The desktop shell embeds this core; standalone, it idles until Ctrl-C
    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    state.shutdown();

    Ok(())
}
