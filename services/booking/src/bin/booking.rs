//! services/booking/src/bin/booking.rs

use booking_lib::{
    adapters::{auth::StaticTokenAuth, http::HttpMarketplaceAdapter},
    config::Config,
    error::ClientError,
    ui::{flow, state::AppState},
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tutorboard_core::ports::AuthContext;

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting booking client...");

    // --- 2. Check the Login Precondition ---
    let auth = Arc::new(StaticTokenAuth::new(config.api_token.clone()));
    if !auth.is_authenticated() {
        return Err(ClientError::Internal(
            "MARKETPLACE_TOKEN is not set. Log in on the web app and export your token first."
                .to_string(),
        ));
    }

    // --- 3. Initialize the Marketplace Adapter ---
    let marketplace = Arc::new(HttpMarketplaceAdapter::new(
        config.api_base_url.clone(),
        auth,
    )?);
    info!("Using marketplace API at {}", config.api_base_url);

    // --- 4. Build the Shared AppState & Run the Funnel ---
    let app_state = AppState {
        marketplace,
        config: config.clone(),
    };
    flow::run(app_state).await
}
