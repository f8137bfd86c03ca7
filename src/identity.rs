/// Identity profile lookup
///
/// The moderation queue shows the real display name and email behind an
/// anonymous submission. Profiles live in the site's identity provider;
/// this module resolves batches of actor ids against it with a local
/// cache so the queue does not hammer the provider on every page load.
use crate::error::{EngageError, EngageResult};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;

/// A resolved actor profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorProfile {
    pub actor_id: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
}

/// Profile lookup collaborator trait
#[async_trait]
pub trait ProfileLookup: Send + Sync {
    /// Resolve a batch of actor ids to profiles
    ///
    /// Unknown ids are simply absent from the result; this is a
    /// best-effort enrichment, not an authorization check.
    async fn lookup(&self, actor_ids: &[String]) -> EngageResult<HashMap<String, ActorProfile>>;
}

/// Profile directory configuration
#[derive(Debug, Clone)]
pub struct ProfileDirectoryConfig {
    /// Base URL of the identity provider's profile endpoint
    pub profile_url: String,
    /// Seconds a cached profile stays fresh
    pub cache_ttl: u64,
    /// User-Agent header for HTTP requests
    pub user_agent: String,
}

impl Default for ProfileDirectoryConfig {
    fn default() -> Self {
        Self {
            profile_url: "http://localhost:9000/profiles".to_string(),
            cache_ttl: 3600,
            user_agent: "Mirador/0.1".to_string(),
        }
    }
}

/// HTTP-backed profile directory with a database cache
#[derive(Clone)]
pub struct ProfileDirectory {
    db: SqlitePool,
    http_client: reqwest::Client,
    config: ProfileDirectoryConfig,
}

#[derive(Debug, Deserialize)]
struct ProfileResponse {
    profiles: Vec<ActorProfile>,
}

impl ProfileDirectory {
    /// Create a new profile directory
    pub fn new(db: SqlitePool, config: ProfileDirectoryConfig) -> EngageResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| EngageError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            db,
            http_client,
            config,
        })
    }

    /// Read still-fresh cached profiles for a set of ids
    async fn cached(&self, actor_ids: &[String]) -> EngageResult<HashMap<String, ActorProfile>> {
        let cutoff = Utc::now() - Duration::seconds(self.config.cache_ttl as i64);
        let mut found = HashMap::new();

        for actor_id in actor_ids {
            let row = sqlx::query(
                "SELECT actor_id, display_name, email, cached_at FROM actor_profiles WHERE actor_id = ?",
            )
            .bind(actor_id)
            .fetch_optional(&self.db)
            .await?;

            if let Some(row) = row {
                let cached_at_str: String = row.get("cached_at");
                let fresh = DateTime::parse_from_rfc3339(&cached_at_str)
                    .map(|dt| dt.with_timezone(&Utc) > cutoff)
                    .unwrap_or(false);

                if fresh {
                    found.insert(
                        actor_id.clone(),
                        ActorProfile {
                            actor_id: row.get("actor_id"),
                            display_name: row.get("display_name"),
                            email: row.get("email"),
                        },
                    );
                }
            }
        }

        Ok(found)
    }

    /// Cache a resolved profile
    async fn cache_profile(&self, profile: &ActorProfile) -> EngageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO actor_profiles (actor_id, display_name, email, cached_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (actor_id) DO UPDATE SET
                display_name = excluded.display_name,
                email = excluded.email,
                cached_at = excluded.cached_at
            "#,
        )
        .bind(&profile.actor_id)
        .bind(&profile.display_name)
        .bind(&profile.email)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Fetch profiles from the identity provider
    async fn fetch(&self, actor_ids: &[String]) -> EngageResult<Vec<ActorProfile>> {
        let response = self
            .http_client
            .get(&self.config.profile_url)
            .query(&[("ids", actor_ids.join(","))])
            .send()
            .await
            .map_err(|e| EngageError::IdentityLookup(format!("Profile request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(EngageError::IdentityLookup(format!(
                "Profile endpoint returned {}",
                response.status()
            )));
        }

        let body: ProfileResponse = response
            .json()
            .await
            .map_err(|e| EngageError::IdentityLookup(format!("Invalid profile response: {}", e)))?;

        Ok(body.profiles)
    }
}

#[async_trait]
impl ProfileLookup for ProfileDirectory {
    async fn lookup(&self, actor_ids: &[String]) -> EngageResult<HashMap<String, ActorProfile>> {
        if actor_ids.is_empty() {
            return Ok(HashMap::new());
        }

        // Cache first
        let mut resolved = self.cached(actor_ids).await?;

        let missing: Vec<String> = actor_ids
            .iter()
            .filter(|id| !resolved.contains_key(*id))
            .cloned()
            .collect();

        if missing.is_empty() {
            return Ok(resolved);
        }

        // Cache miss - ask the identity provider, then cache
        let fetched = self.fetch(&missing).await?;
        for profile in fetched {
            self.cache_profile(&profile).await?;
            resolved.insert(profile.actor_id.clone(), profile);
        }

        Ok(resolved)
    }
}

/// Static in-memory lookup for tests
#[cfg(test)]
#[derive(Default)]
pub struct StaticProfileLookup {
    pub profiles: HashMap<String, ActorProfile>,
}

#[cfg(test)]
#[async_trait]
impl ProfileLookup for StaticProfileLookup {
    async fn lookup(&self, actor_ids: &[String]) -> EngageResult<HashMap<String, ActorProfile>> {
        Ok(actor_ids
            .iter()
            .filter_map(|id| self.profiles.get(id).map(|p| (id.clone(), p.clone())))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[tokio::test]
    async fn test_cache_round_trip() {
        let directory =
            ProfileDirectory::new(test_pool().await, ProfileDirectoryConfig::default()).unwrap();

        let profile = ActorProfile {
            actor_id: "actor-1".to_string(),
            display_name: Some("Maria K".to_string()),
            email: Some("maria@example.org".to_string()),
        };
        directory.cache_profile(&profile).await.unwrap();

        let cached = directory
            .cached(&["actor-1".to_string()])
            .await
            .unwrap();
        assert_eq!(
            cached.get("actor-1").unwrap().display_name.as_deref(),
            Some("Maria K")
        );
    }

    #[tokio::test]
    async fn test_stale_cache_entry_ignored() {
        let directory = ProfileDirectory::new(
            test_pool().await,
            ProfileDirectoryConfig {
                cache_ttl: 0,
                ..Default::default()
            },
        )
        .unwrap();

        let profile = ActorProfile {
            actor_id: "actor-1".to_string(),
            display_name: Some("Maria K".to_string()),
            email: None,
        };
        directory.cache_profile(&profile).await.unwrap();

        // TTL of zero means everything is immediately stale
        let cached = directory
            .cached(&["actor-1".to_string()])
            .await
            .unwrap();
        assert!(cached.is_empty());
    }

    #[tokio::test]
    async fn test_static_lookup() {
        let mut lookup = StaticProfileLookup::default();
        lookup.profiles.insert(
            "actor-1".to_string(),
            ActorProfile {
                actor_id: "actor-1".to_string(),
                display_name: Some("Tomas".to_string()),
                email: None,
            },
        );

        let resolved = lookup
            .lookup(&["actor-1".to_string(), "actor-2".to_string()])
            .await
            .unwrap();
        assert_eq!(resolved.len(), 1);
    }
}
