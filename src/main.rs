#![allow(clippy::result_large_err)]

use cafeteria_backend::{
    api::{self, AppState},
    config::{AppConfig, catalog, database},
    core::{menu, user},
    errors::Result,
};
use dotenvy::dotenv;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; variables may also come from the environment
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load the application configuration
    let app_config = Arc::new(AppConfig::from_env()?);

    // 4. Initialize database
    let db = database::create_connection(&app_config.database_url)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|()| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. Seed the catalog and the first administrator
    let seed = catalog::load_catalog_if_present(&app_config.catalog_path)?;
    catalog::seed_catalog(&db, &seed)
        .await
        .inspect_err(|e| error!("Failed to seed catalog: {}", e))?;
    if let Some(admin) = &app_config.bootstrap_admin {
        user::bootstrap_admin(&db, admin, &app_config.allowed_email_domain).await?;
    }

    // 6. Make sure today's menu lists every available item
    let (daily, added) = menu::assemble_daily_menu(&db, menu::today()).await?;
    info!(menu_id = daily.id, added, "Daily menu ready for {}", daily.date);

    // 7. Serve the API until Ctrl+C
    let listener = tokio::net::TcpListener::bind(app_config.bind_addr).await?;
    info!("Listening on {}", app_config.bind_addr);
    let state = AppState::new(db, Arc::clone(&app_config));
    axum::serve(listener, api::create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received.");
}
