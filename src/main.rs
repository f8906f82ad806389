mod chat;
mod config;
mod error;
mod gemini;
mod models;
mod pdf;
mod routes;
mod source;
mod store;
mod template;
mod tracker;

use anyhow::Context;
use std::{net::SocketAddr, sync::Arc};
use tracing_subscriber::{fmt, EnvFilter};

use crate::{
    chat::ChatGuru,
    config::{AppConfig, Backend},
    gemini::{GeminiClient, GeminiSource},
    routes::{router, AppState},
    source::{PatternSource, TemplateSource},
    store::InMemoryPatternStore,
    template::TemplateEngine,
    tracker::SubmissionTracker,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let cfg = AppConfig::from_env().context("reading configuration")?;
    let engine = TemplateEngine::new(cfg.stitch_counts);

    let source: Arc<dyn PatternSource> = match cfg.backend {
        Backend::Template => Arc::new(TemplateSource::new(engine, cfg.latency)),
        Backend::Gemini => Arc::new(GeminiSource::new(GeminiClient::from_config(&cfg)?, engine)),
    };
    let chat_client = cfg.has_gemini_key().then(|| GeminiClient::from_config(&cfg)).transpose()?;
    let guru = ChatGuru::new(chat_client, cfg.latency);
    tracing::info!(backend = source.name(), gemini_chat = cfg.has_gemini_key(), "🧶 Pattern studio configured");

    let state = AppState {
        source,
        store: Arc::new(InMemoryPatternStore::new()),
        tracker: Arc::new(SubmissionTracker::new()),
        guru: Arc::new(guru),
        public_base_url: cfg.public_base_url.clone(),
        latency: cfg.latency,
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    tracing::info!(%addr, "Starting server");
    let listener = tokio::net::TcpListener::bind(addr).await.with_context(|| format!("binding {addr}"))?;
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("👋 Shutting down");
        })
        .await
        .context("server error")?;
    Ok(())
}
