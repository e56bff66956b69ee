use anyhow::Result;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use api::{
    AppState, create_router,
    config::{AppConfig, BootstrapAdmin},
    sweep::start_sweep,
};
use auth::{
    models::{NewUser, Role},
    repositories::user::ensure_user,
    validation::validate_new_user,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting API service");

    let config = AppConfig::from_env()?;
    let state = AppState::initialize(&config).await?;

    if let Some(admin) = &config.bootstrap_admin {
        bootstrap_admin(&state, admin).await?;
    }

    let mut scheduler = start_sweep(
        &config.revocation.sweep_schedule,
        state.auth.revocations.clone(),
        state.rate_limiters(),
    )
    .await?;

    info!("API service initialized successfully");

    // Start the web server
    let app = create_router(state, &config.server.static_dir);

    let address = config.server.bind_address();
    let listener = TcpListener::bind(&address).await?;
    info!("API service listening on {}", address);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    scheduler.shutdown().await?;
    info!("API service stopped");

    Ok(())
}

async fn bootstrap_admin(state: &AppState, admin: &BootstrapAdmin) -> Result<()> {
    let new_user = NewUser {
        username: admin.username.clone(),
        password: admin.password.clone(),
        role: Role::Admin,
    };
    validate_new_user(&new_user).map_err(anyhow::Error::msg)?;

    if ensure_user(state.auth.users.as_ref(), &new_user).await? {
        info!("Created bootstrap admin {}", new_user.username);
    } else {
        warn!("Bootstrap admin {} already exists, leaving it unchanged", new_user.username);
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
