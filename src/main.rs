mod config;
mod console;
mod dashboard;
mod form;
mod models;
mod store;
mod upload;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::AdminConfig;
use dashboard::Dashboard;
use store::{AnonymousAuth, FirestoreStore, ListingStore, MemoryStore};
use upload::CloudinaryUploader;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Logs go to stderr so they don't interleave with the console output
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("🏠 To-Let Admin Panel");

    let config = AdminConfig::from_env();

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .context("Failed to create HTTP client")?;

    let store: Arc<dyn ListingStore> = match config.firebase.api_key.clone() {
        Some(api_key) => {
            let auth = Arc::new(AnonymousAuth::new(client.clone(), &config.firebase, api_key.clone()));

            let bootstrap = auth.clone();
            tokio::spawn(async move {
                if let Err(e) = bootstrap.ensure_session().await {
                    warn!("Anonymous sign-in failed: {}", e);
                }
            });

            info!("Using Firestore project {}", config.firebase.project_id);
            Arc::new(FirestoreStore::new(
                client,
                &config.firebase,
                api_key,
                auth,
                config.poll_interval,
            ))
        }
        None => {
            warn!("TOLET_FIREBASE_API_KEY not set, listings are kept in memory for this session");
            Arc::new(MemoryStore::new())
        }
    };

    let uploader = Arc::new(CloudinaryUploader::new(config.cloudinary.clone())?);

    let dashboard = Dashboard::mount(store, uploader)
        .await
        .context("Failed to load listings")?;

    console::run(dashboard).await
}
