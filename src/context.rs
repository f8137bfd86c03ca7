/// Application context and dependency injection
use crate::{
    config::ServerConfig,
    db,
    error::EngageResult,
    identity::{ProfileDirectory, ProfileDirectoryConfig, ProfileLookup},
    media::{MediaStore, MediaStoreConfig},
    quiz::QuizEngine,
    rate_limit::{RequestLimitConfig, RequestLimiter, SubmissionCooldown},
    reactions::ReactionLedger,
    voices::{moderation::ModerationQueue, VoicePipeline},
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub voice_pipeline: Arc<VoicePipeline>,
    pub moderation_queue: Arc<ModerationQueue>,
    pub reaction_ledger: Arc<ReactionLedger>,
    pub quiz_engine: Arc<QuizEngine>,
    pub media_store: Arc<MediaStore>,
    pub request_limiter: Arc<RequestLimiter>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> EngageResult<Self> {
        config.validate()?;

        Self::ensure_directories(&config).await?;

        let pool = db::create_pool(&config.storage.database, db::DatabaseOptions::default())
            .await?;
        db::run_migrations(&pool).await?;
        db::test_connection(&pool).await?;

        let media_store = Arc::new(MediaStore::new(
            MediaStoreConfig {
                directory: config.storage.media_directory.clone(),
                max_size: config.service.media_upload_limit,
            },
            pool.clone(),
        ));

        let cooldown =
            SubmissionCooldown::new(pool.clone(), config.rate_limit.submission_cooldown_secs);
        let voice_pipeline = Arc::new(VoicePipeline::new(
            pool.clone(),
            cooldown,
            (*media_store).clone(),
        ));

        let profiles: Arc<dyn ProfileLookup> = Arc::new(ProfileDirectory::new(
            pool.clone(),
            ProfileDirectoryConfig {
                profile_url: config.identity.profile_url.clone(),
                cache_ttl: config.identity.profile_cache_ttl,
                user_agent: format!("Mirador/{}", env!("CARGO_PKG_VERSION")),
            },
        )?);
        let moderation_queue = Arc::new(ModerationQueue::new(
            pool.clone(),
            (*media_store).clone(),
            profiles,
        ));

        let reaction_ledger = Arc::new(ReactionLedger::new(pool.clone()));
        let quiz_engine = Arc::new(QuizEngine::new(pool.clone()));

        let request_limiter = Arc::new(RequestLimiter::new(RequestLimitConfig {
            authenticated_rps: config.rate_limit.authenticated_rps,
            unauthenticated_rps: config.rate_limit.unauthenticated_rps,
            moderator_rps: config.rate_limit.moderator_rps,
            burst_size: config.rate_limit.burst_size,
        }));

        Ok(Self {
            config: Arc::new(config),
            db: pool,
            voice_pipeline,
            moderation_queue,
            reaction_ledger,
            quiz_engine,
            media_store,
            request_limiter,
        })
    }

    /// Ensure required directories exist
    async fn ensure_directories(config: &ServerConfig) -> EngageResult<()> {
        tokio::fs::create_dir_all(&config.storage.data_directory).await?;
        tokio::fs::create_dir_all(&config.storage.media_directory).await?;
        Ok(())
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}
