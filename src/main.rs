use collab_session_relay::{build_app, config::Config, ws::store::{spawn_reaper, SessionStore}, AppState};
use std::panic;
use std::sync::Arc;
use tracing::{info, error, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main(flavor = "current_thread")]
async fn main() {

    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            // Default to info level, but allow debug for our app
            "collab_session_relay=debug,tower_http=debug,axum::rejection=trace,info".into()
        }))
        .init();

    info!("Starting server...");

    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        error!("Failed to load configuration: {}", e);
        warn!("Using default configuration");
        Config::default()
    });

    // Session store and its reaper live for the whole process
    let store = Arc::new(SessionStore::new(config.expiry_policy()));
    let reaper = spawn_reaper(store.clone(), config.reaper_interval());
    info!("Session reaper running every {:?}", config.reaper_interval());

    let state = AppState::new(store, config.message_policy());
    let app_routes = build_app(state, &config);

    let listener = match tokio::net::TcpListener::bind(config.server_address()).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", config.server_address(), e);
            return;
        }
    };

    info!("🚀 Server running on http://{}", config.server_address());
    info!("📡 WebSocket available at ws://{}/ws/{{session_id}}", config.server_address());
    info!("📚 Swagger UI available at http://{}/swagger", config.server_address());

    if let Err(e) = axum::serve(listener, app_routes).await {
        error!("Server error: {}", e);
    }
    reaper.abort();
}
