//! taskhub - multi-user task tracker with real-time notifications

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use taskhub::{
    auth::TokenSigner,
    config::Args,
    db::{MongoClient, TaskDoc, UserDoc},
    server,
    types::TaskhubError,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("taskhub={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Validate configuration
    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  taskhub - task tracker");
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("Listen: {}", args.listen);
    info!(
        "Mode: {}",
        if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" }
    );
    info!("MongoDB: {}", args.mongodb_uri);
    info!("Token expiry: {}s", args.jwt_expiry_seconds);
    info!("======================================");

    // Build the session token signer
    let signer = match &args.jwt_secret {
        Some(secret) => match TokenSigner::new(secret.clone(), args.jwt_expiry_seconds) {
            Ok(s) => s,
            Err(e) => {
                error!("JWT configuration error: {}", e);
                std::process::exit(1);
            }
        },
        None => {
            warn!("No JWT_SECRET configured, using dev-mode signer");
            TokenSigner::new_dev()
        }
    };

    // Connect to MongoDB (optional in dev mode)
    let mongo = match init_store(&args).await {
        Ok(client) => Some(client),
        Err(e) => {
            if args.dev_mode {
                warn!("MongoDB connection failed (dev mode, continuing without): {}", e);
                None
            } else {
                error!("MongoDB connection failed: {}", e);
                std::process::exit(1);
            }
        }
    };

    // Run the server
    let state = Arc::new(server::AppState::new(args, mongo, signer));
    if let Err(e) = server::run(state).await {
        error!("Server error: {:?}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Connect to the store and apply each schema's index declarations
async fn init_store(args: &Args) -> Result<MongoClient, TaskhubError> {
    let client = MongoClient::connect(&args.mongodb_uri, &args.mongodb_db).await?;
    client.ensure_indexes::<UserDoc>().await?;
    client.ensure_indexes::<TaskDoc>().await?;
    Ok(client)
}
