/// Rate limiting
///
/// Two layers: a per-request quota middleware for the whole API, and a
/// durable per-actor cooldown gate for voice submissions. The cooldown
/// lives server-side so clearing client state cannot bypass it.
use crate::error::{EngageError, EngageResult};
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Duration, Utc};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovernorLimiter,
};
use sqlx::{Row, SqlitePool};
use std::{num::NonZeroU32, sync::Arc};

/// Outcome of a submission cooldown check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownDecision {
    Allowed,
    Denied { seconds_remaining: u64 },
}

/// Per-actor submission cooldown gate
///
/// Stores the timestamp of each actor's last accepted submission and
/// denies anything inside the cooldown window. The timestamp is written
/// as part of the check, so the reservation is durable before the
/// submission row exists and a fast double-submit cannot pass twice.
#[derive(Clone)]
pub struct SubmissionCooldown {
    db: SqlitePool,
    window: Duration,
}

impl SubmissionCooldown {
    pub fn new(db: SqlitePool, window_secs: u64) -> Self {
        Self {
            db,
            window: Duration::seconds(window_secs as i64),
        }
    }

    /// Check the cooldown for an actor and reserve the slot if allowed
    ///
    /// Never returns an error for a denied actor; denial is a decision,
    /// not a failure.
    pub async fn check_and_reserve(&self, actor_id: &str) -> EngageResult<CooldownDecision> {
        let now = Utc::now();

        let row = sqlx::query(
            "SELECT last_submission_at FROM submission_cooldowns WHERE actor_id = ?",
        )
        .bind(actor_id)
        .fetch_optional(&self.db)
        .await?;

        if let Some(row) = row {
            let last_str: String = row.get("last_submission_at");
            let last = DateTime::parse_from_rfc3339(&last_str)
                .map_err(|e| EngageError::Internal(format!("Invalid timestamp: {}", e)))?
                .with_timezone(&Utc);

            let elapsed = now - last;
            if elapsed < self.window {
                let remaining_ms = (self.window - elapsed).num_milliseconds().max(0) as u64;
                // Whole seconds, rounded up
                let seconds_remaining = remaining_ms.div_ceil(1000).max(1);
                return Ok(CooldownDecision::Denied { seconds_remaining });
            }
        }

        sqlx::query(
            r#"
            INSERT INTO submission_cooldowns (actor_id, last_submission_at)
            VALUES (?, ?)
            ON CONFLICT (actor_id) DO UPDATE SET last_submission_at = excluded.last_submission_at
            "#,
        )
        .bind(actor_id)
        .bind(now.to_rfc3339())
        .execute(&self.db)
        .await?;

        Ok(CooldownDecision::Allowed)
    }

    /// Backdate an actor's cooldown record (test support)
    #[cfg(test)]
    pub async fn backdate(&self, actor_id: &str, secs_ago: i64) -> EngageResult<()> {
        let then = Utc::now() - Duration::seconds(secs_ago);
        sqlx::query(
            "UPDATE submission_cooldowns SET last_submission_at = ? WHERE actor_id = ?",
        )
        .bind(then.to_rfc3339())
        .bind(actor_id)
        .execute(&self.db)
        .await?;
        Ok(())
    }
}

/// Per-request rate limiter configuration
#[derive(Debug, Clone)]
pub struct RequestLimitConfig {
    pub authenticated_rps: u32,
    pub unauthenticated_rps: u32,
    pub moderator_rps: u32,
    pub burst_size: u32,
}

impl Default for RequestLimitConfig {
    fn default() -> Self {
        Self {
            authenticated_rps: 100,
            unauthenticated_rps: 10,
            moderator_rps: 1000,
            burst_size: 50,
        }
    }
}

/// Request-level rate limiter with quota tiers
#[derive(Clone)]
pub struct RequestLimiter {
    authenticated: Arc<GovernorLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    unauthenticated: Arc<GovernorLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    moderator: Arc<GovernorLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl RequestLimiter {
    pub fn new(config: RequestLimitConfig) -> Self {
        let auth_quota = Quota::per_second(
            NonZeroU32::new(config.authenticated_rps).unwrap_or(NonZeroU32::new(100).unwrap()),
        )
        .allow_burst(NonZeroU32::new(config.burst_size).unwrap_or(NonZeroU32::new(50).unwrap()));

        let unauth_quota = Quota::per_second(
            NonZeroU32::new(config.unauthenticated_rps).unwrap_or(NonZeroU32::new(10).unwrap()),
        )
        .allow_burst(
            NonZeroU32::new(config.burst_size / 5).unwrap_or(NonZeroU32::new(10).unwrap()),
        );

        let moderator_quota = Quota::per_second(
            NonZeroU32::new(config.moderator_rps).unwrap_or(NonZeroU32::new(1000).unwrap()),
        )
        .allow_burst(
            NonZeroU32::new(config.burst_size * 2).unwrap_or(NonZeroU32::new(100).unwrap()),
        );

        Self {
            authenticated: Arc::new(GovernorLimiter::direct(auth_quota)),
            unauthenticated: Arc::new(GovernorLimiter::direct(unauth_quota)),
            moderator: Arc::new(GovernorLimiter::direct(moderator_quota)),
        }
    }

    pub fn check_authenticated(&self) -> EngageResult<()> {
        match self.authenticated.check() {
            Ok(_) => Ok(()),
            Err(_) => Err(EngageError::RateLimited {
                seconds_remaining: 1,
            }),
        }
    }

    pub fn check_unauthenticated(&self) -> EngageResult<()> {
        match self.unauthenticated.check() {
            Ok(_) => Ok(()),
            Err(_) => Err(EngageError::RateLimited {
                seconds_remaining: 1,
            }),
        }
    }

    pub fn check_moderator(&self) -> EngageResult<()> {
        match self.moderator.check() {
            Ok(_) => Ok(()),
            Err(_) => Err(EngageError::RateLimited {
                seconds_remaining: 1,
            }),
        }
    }
}

/// Request rate limiting middleware
pub async fn rate_limit_middleware(
    State(ctx): State<crate::context::AppContext>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if !ctx.config.rate_limit.enabled {
        return Ok(next.run(request).await);
    }

    let is_admin = request.uri().path().starts_with("/api/admin");
    let has_auth_header = request.headers().get("authorization").is_some();

    let result = if is_admin && has_auth_header {
        ctx.request_limiter.check_moderator()
    } else if has_auth_header {
        ctx.request_limiter.check_authenticated()
    } else {
        ctx.request_limiter.check_unauthenticated()
    };

    match result {
        Ok(_) => Ok(next.run(request).await),
        Err(_) => Err(StatusCode::TOO_MANY_REQUESTS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[test]
    fn test_request_limiter_allows_first_requests() {
        let limiter = RequestLimiter::new(RequestLimitConfig::default());

        assert!(limiter.check_authenticated().is_ok());
        assert!(limiter.check_unauthenticated().is_ok());
        assert!(limiter.check_moderator().is_ok());
    }

    #[test]
    fn test_request_limiter_burst() {
        let limiter = RequestLimiter::new(RequestLimitConfig {
            authenticated_rps: 10,
            unauthenticated_rps: 5,
            moderator_rps: 100,
            burst_size: 5,
        });

        for _ in 0..5 {
            assert!(limiter.check_authenticated().is_ok());
        }
        assert!(limiter.check_authenticated().is_err());
    }

    #[tokio::test]
    async fn test_cooldown_allows_first_submission() {
        let cooldown = SubmissionCooldown::new(test_pool().await, 60);

        assert_eq!(
            cooldown.check_and_reserve("actor-1").await.unwrap(),
            CooldownDecision::Allowed
        );
    }

    #[tokio::test]
    async fn test_cooldown_denies_second_submission() {
        let cooldown = SubmissionCooldown::new(test_pool().await, 60);

        cooldown.check_and_reserve("actor-1").await.unwrap();
        match cooldown.check_and_reserve("actor-1").await.unwrap() {
            CooldownDecision::Denied { seconds_remaining } => {
                assert!(seconds_remaining >= 1 && seconds_remaining <= 60);
            }
            CooldownDecision::Allowed => panic!("second submission should be denied"),
        }
    }

    #[tokio::test]
    async fn test_cooldown_independent_actors() {
        let cooldown = SubmissionCooldown::new(test_pool().await, 60);

        cooldown.check_and_reserve("actor-1").await.unwrap();
        assert_eq!(
            cooldown.check_and_reserve("actor-2").await.unwrap(),
            CooldownDecision::Allowed
        );
    }

    #[tokio::test]
    async fn test_cooldown_expires_after_window() {
        let cooldown = SubmissionCooldown::new(test_pool().await, 60);

        cooldown.check_and_reserve("actor-1").await.unwrap();
        cooldown.backdate("actor-1", 61).await.unwrap();

        assert_eq!(
            cooldown.check_and_reserve("actor-1").await.unwrap(),
            CooldownDecision::Allowed
        );
    }

    #[tokio::test]
    async fn test_denial_does_not_extend_window() {
        let cooldown = SubmissionCooldown::new(test_pool().await, 60);

        cooldown.check_and_reserve("actor-1").await.unwrap();
        cooldown.backdate("actor-1", 30).await.unwrap();

        // A denied attempt must not reset the clock
        cooldown.check_and_reserve("actor-1").await.unwrap();
        match cooldown.check_and_reserve("actor-1").await.unwrap() {
            CooldownDecision::Denied { seconds_remaining } => {
                assert!(seconds_remaining <= 31);
            }
            CooldownDecision::Allowed => panic!("should still be inside the window"),
        }
    }
}
