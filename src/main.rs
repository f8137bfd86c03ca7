/// Mirador - Community Engagement & Moderation Service
///
/// The engagement core of a cultural heritage site: visitor voice
/// submissions with spam triage and a moderation queue, plus emoji
/// reactions and quiz badges on panorama items.

mod api;
mod auth;
mod config;
mod context;
mod db;
mod error;
mod identity;
mod media;
mod metrics;
mod quiz;
mod rate_limit;
mod reactions;
mod server;
mod spam;
mod voices;

use config::ServerConfig;
use context::AppContext;
use error::EngageResult;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> EngageResult<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mirador=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = ServerConfig::from_env()?;

    // Create application context
    let ctx = AppContext::new(config).await?;

    // Start server
    server::serve(ctx).await?;

    Ok(())
}
