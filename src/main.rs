//! OCR Intake - upload images or PDFs, extract their text, list the results.

mod config;
mod error;
mod intake;
mod ocr;
mod pdf_text;
mod raster;
mod routes;
mod staging;
mod store;

use anyhow::Context;
use config::{AppConfig, StoreConfig};
use intake::IntakePipeline;
use ocr::TesseractProvider;
use pdf_text::LopdfExtractor;
use raster::PdftoppmRasterizer;
use routes::AppState;
use staging::StagingArea;
use std::sync::Arc;
use store::{MemoryStore, RecordStore, SupabaseStore};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "ocr_intake=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    let store: Arc<dyn RecordStore> = match &config.store {
        StoreConfig::Memory => Arc::new(MemoryStore::new()),
        StoreConfig::Supabase {
            url,
            service_role_key,
            schema,
            table,
        } => Arc::new(SupabaseStore::new(url, service_role_key, schema, table)),
    };
    info!("Record store: {}", store.name());

    let staging = StagingArea::new(&config.upload_dir);
    staging.ensure_exists().await?;
    info!("Scratch directory: {:?}", staging.root());

    let pipeline = IntakePipeline::new(
        Arc::new(LopdfExtractor),
        Arc::new(PdftoppmRasterizer::new(&config.raster)),
        Arc::new(TesseractProvider::new(&config.ocr)),
        store,
    );

    let app = routes::router(AppState { pipeline, staging }, config.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(config.bind_addr.as_str())
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!("Server running on http://{}", config.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
