/// Moderation queue for community voice submissions
///
/// Moderators list, filter, and batch-transition submissions. All four
/// actions are idempotent per target, and a batch reports per-target
/// outcomes instead of failing as a whole.
use crate::{
    error::{EngageError, EngageResult},
    identity::ProfileLookup,
    media::MediaStore,
    metrics,
    voices::{parse_submission, Submission},
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Moderation action types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationAction {
    /// Publish the submission
    Approve,
    /// Flag as spam (overriding or confirming the heuristic)
    MarkSpam,
    /// Clear the spam flag
    UnmarkSpam,
    /// Remove the submission and, best-effort, its media
    Delete,
}

impl ModerationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationAction::Approve => "approve",
            ModerationAction::MarkSpam => "mark_spam",
            ModerationAction::UnmarkSpam => "unmark_spam",
            ModerationAction::Delete => "delete",
        }
    }

    pub fn from_str(s: &str) -> EngageResult<Self> {
        match s.to_lowercase().as_str() {
            "approve" => Ok(ModerationAction::Approve),
            "mark_spam" => Ok(ModerationAction::MarkSpam),
            "unmark_spam" => Ok(ModerationAction::UnmarkSpam),
            "delete" => Ok(ModerationAction::Delete),
            _ => Err(EngageError::InvalidInput(format!(
                "Invalid moderation action: {}",
                s
            ))),
        }
    }
}

/// Status filter for the queue listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    Pending,
    Approved,
    All,
}

/// Whitelisted sort keys
///
/// Anything outside the whitelist coerces to the default instead of
/// being passed through to SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    CreatedAt,
    Name,
}

impl SortKey {
    fn column(&self) -> &'static str {
        match self {
            SortKey::CreatedAt => "created_at",
            SortKey::Name => "display_name",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "created_at" => SortKey::CreatedAt,
            "name" => SortKey::Name,
            _ => SortKey::default(),
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    fn keyword(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "asc" => SortDirection::Asc,
            "desc" => SortDirection::Desc,
            _ => SortDirection::default(),
        }
    }
}

/// Queue listing parameters
#[derive(Debug, Clone, Default)]
pub struct QueueFilter {
    pub status: StatusFilter,
    /// Free-text search over display name and body
    pub search: Option<String>,
    /// Only rows with the spam flag set
    pub spam_only: bool,
    pub sort: SortKey,
    pub direction: SortDirection,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// A queue row enriched with the submitter's resolved profile
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionView {
    #[serde(flatten)]
    pub submission: Submission,
    pub author_display_name: Option<String>,
    pub author_email: Option<String>,
}

/// Per-target outcome of a batch action
#[derive(Debug, Clone, Serialize)]
pub struct ActionOutcome {
    pub id: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Moderation queue manager
#[derive(Clone)]
pub struct ModerationQueue {
    db: SqlitePool,
    media: MediaStore,
    profiles: Arc<dyn ProfileLookup>,
}

impl ModerationQueue {
    pub fn new(db: SqlitePool, media: MediaStore, profiles: Arc<dyn ProfileLookup>) -> Self {
        Self {
            db,
            media,
            profiles,
        }
    }

    /// List submissions for the queue
    pub async fn list(&self, filter: &QueueFilter) -> EngageResult<Vec<SubmissionView>> {
        let mut sql = String::from(
            "SELECT id, actor_id, display_name, body, image_ref, audio_ref, \
             suspected_spam, approved, created_at FROM submissions WHERE 1=1",
        );

        match filter.status {
            StatusFilter::Pending => sql.push_str(" AND approved = 0"),
            StatusFilter::Approved => sql.push_str(" AND approved = 1"),
            StatusFilter::All => {}
        }
        if filter.spam_only {
            sql.push_str(" AND suspected_spam = 1");
        }
        if filter.search.is_some() {
            sql.push_str(" AND (display_name LIKE ? OR body LIKE ?)");
        }

        // Sort column and direction come from whitelist enums, never
        // from the raw request.
        sql.push_str(&format!(
            " ORDER BY {} {} LIMIT ? OFFSET ?",
            filter.sort.column(),
            filter.direction.keyword()
        ));

        let mut query = sqlx::query(&sql);
        if let Some(search) = &filter.search {
            let pattern = format!("%{}%", search);
            query = query.bind(pattern.clone()).bind(pattern);
        }
        query = query
            .bind(filter.limit.unwrap_or(50).min(200))
            .bind(filter.offset.unwrap_or(0).max(0));

        let rows = query.fetch_all(&self.db).await?;

        let mut submissions = Vec::new();
        for row in rows {
            submissions.push(parse_submission(row)?);
        }

        self.enrich(submissions).await
    }

    /// Resolve submitter profiles for a page of submissions
    ///
    /// Lookup failures degrade to unenriched rows; the queue must stay
    /// usable when the identity provider is down.
    async fn enrich(&self, submissions: Vec<Submission>) -> EngageResult<Vec<SubmissionView>> {
        let mut actor_ids: Vec<String> =
            submissions.iter().map(|s| s.actor_id.clone()).collect();
        actor_ids.sort();
        actor_ids.dedup();

        let profiles = match self.profiles.lookup(&actor_ids).await {
            Ok(profiles) => profiles,
            Err(e) => {
                tracing::warn!("Profile enrichment failed: {}", e);
                Default::default()
            }
        };

        Ok(submissions
            .into_iter()
            .map(|submission| {
                let profile = profiles.get(&submission.actor_id);
                SubmissionView {
                    author_display_name: profile.and_then(|p| p.display_name.clone()),
                    author_email: profile.and_then(|p| p.email.clone()),
                    submission,
                }
            })
            .collect())
    }

    /// Apply a moderation action to a batch of submissions
    ///
    /// Idempotent per target: re-approving an approved row, or deleting
    /// a row that is already gone, reports success. Partial failure is
    /// reported per id, never as a batch-wide error.
    pub async fn apply_action(
        &self,
        action: ModerationAction,
        ids: &[String],
    ) -> EngageResult<Vec<ActionOutcome>> {
        let mut outcomes = Vec::with_capacity(ids.len());

        for id in ids {
            let result = self.apply_one(action, id).await;
            match result {
                Ok(()) => {
                    metrics::MODERATION_ACTIONS_TOTAL
                        .with_label_values(&[action.as_str()])
                        .inc();
                    outcomes.push(ActionOutcome {
                        id: id.clone(),
                        ok: true,
                        error: None,
                    });
                }
                Err(e) => {
                    tracing::warn!("Moderation {} failed for {}: {}", action.as_str(), id, e);
                    outcomes.push(ActionOutcome {
                        id: id.clone(),
                        ok: false,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        Ok(outcomes)
    }

    async fn apply_one(&self, action: ModerationAction, id: &str) -> EngageResult<()> {
        match action {
            ModerationAction::Approve => {
                sqlx::query("UPDATE submissions SET approved = 1 WHERE id = ?")
                    .bind(id)
                    .execute(&self.db)
                    .await?;
            }
            ModerationAction::MarkSpam => {
                sqlx::query("UPDATE submissions SET suspected_spam = 1 WHERE id = ?")
                    .bind(id)
                    .execute(&self.db)
                    .await?;
            }
            ModerationAction::UnmarkSpam => {
                sqlx::query("UPDATE submissions SET suspected_spam = 0 WHERE id = ?")
                    .bind(id)
                    .execute(&self.db)
                    .await?;
            }
            ModerationAction::Delete => {
                // Collect media refs before the row goes away
                let refs: Option<(Option<String>, Option<String>)> =
                    sqlx::query_as("SELECT image_ref, audio_ref FROM submissions WHERE id = ?")
                        .bind(id)
                        .fetch_optional(&self.db)
                        .await?;

                sqlx::query("DELETE FROM submissions WHERE id = ?")
                    .bind(id)
                    .execute(&self.db)
                    .await?;

                if let Some((image_ref, audio_ref)) = refs {
                    if let Some(media_ref) = image_ref {
                        self.media.delete_best_effort(&media_ref).await;
                    }
                    if let Some(media_ref) = audio_ref {
                        self.media.delete_best_effort(&media_ref).await;
                    }
                }
            }
        }

        // A target that affected zero rows is treated as success so the
        // batch stays idempotent (the row may have been deleted by a
        // concurrent moderator).
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::identity::StaticProfileLookup;
    use crate::media::MediaStoreConfig;
    use crate::rate_limit::SubmissionCooldown;
    use crate::voices::{NewVoice, VoicePipeline};
    use tempfile::tempdir;

    struct Fixture {
        queue: ModerationQueue,
        pipeline: VoicePipeline,
        db: SqlitePool,
        _dir: tempfile::TempDir,
    }

    async fn fixture() -> Fixture {
        fixture_with_profiles(StaticProfileLookup::default()).await
    }

    async fn fixture_with_profiles(profiles: StaticProfileLookup) -> Fixture {
        let dir = tempdir().unwrap();
        let db = test_pool().await;
        let media = MediaStore::new(
            MediaStoreConfig {
                directory: dir.path().to_path_buf(),
                max_size: 1024 * 1024,
            },
            db.clone(),
        );
        let cooldown = SubmissionCooldown::new(db.clone(), 60);
        let pipeline = VoicePipeline::new(db.clone(), cooldown.clone(), media.clone());
        let queue = ModerationQueue::new(db.clone(), media, Arc::new(profiles));

        Fixture {
            queue,
            pipeline,
            db,
            _dir: dir,
        }
    }

    async fn seed(fixture: &Fixture, actor: &str, name: &str, text: &str) -> Submission {
        fixture
            .pipeline
            .submit(
                actor,
                NewVoice {
                    display_name: Some(name.to_string()),
                    text: text.to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_pending_filter_excludes_approved() {
        let f = fixture().await;
        let a = seed(&f, "actor-1", "Ana", "A story about the cloister gardens in spring").await;
        seed(&f, "actor-2", "Ben", "The mosaics in the crypt were unforgettable today").await;

        f.queue
            .apply_action(ModerationAction::Approve, &[a.id.clone()])
            .await
            .unwrap();

        let pending = f
            .queue
            .list(&QueueFilter {
                status: StatusFilter::Pending,
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(pending.iter().all(|v| !v.submission.approved));
        assert_eq!(pending.len(), 1);

        let approved = f
            .queue
            .list(&QueueFilter {
                status: StatusFilter::Approved,
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(approved.iter().all(|v| v.submission.approved));
        assert_eq!(approved.len(), 1);
    }

    #[tokio::test]
    async fn test_search_matches_name_and_body() {
        let f = fixture().await;
        seed(&f, "actor-1", "Ana", "A story about the cloister gardens in spring").await;
        seed(&f, "actor-2", "Ben", "The mosaics in the crypt were unforgettable today").await;

        let by_body = f
            .queue
            .list(&QueueFilter {
                status: StatusFilter::All,
                search: Some("mosaics".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_body.len(), 1);
        assert_eq!(by_body[0].submission.display_name, "Ben");

        let by_name = f
            .queue
            .list(&QueueFilter {
                status: StatusFilter::All,
                search: Some("Ana".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_name.len(), 1);
    }

    #[tokio::test]
    async fn test_spam_only_filter() {
        let f = fixture().await;
        seed(&f, "actor-1", "Ana", "A story about the cloister gardens in spring").await;
        // Trips the heuristic: two URLs
        seed(&f, "actor-2", "x", "buy now http://a.co http://b.co cheap tickets here").await;

        let flagged = f
            .queue
            .list(&QueueFilter {
                status: StatusFilter::All,
                spam_only: true,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(flagged.len(), 1);
        assert!(flagged[0].submission.suspected_spam);
    }

    #[tokio::test]
    async fn test_sort_by_name() {
        let f = fixture().await;
        seed(&f, "actor-1", "Zoe", "The stonework of the northern gate amazed me").await;
        seed(&f, "actor-2", "Ana", "A story about the cloister gardens in spring").await;

        let rows = f
            .queue
            .list(&QueueFilter {
                status: StatusFilter::All,
                sort: SortKey::Name,
                direction: SortDirection::Asc,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(rows[0].submission.display_name, "Ana");
        assert_eq!(rows[1].submission.display_name, "Zoe");
    }

    #[tokio::test]
    async fn test_unknown_sort_key_coerced() {
        assert_eq!(SortKey::from_str("created_at"), SortKey::CreatedAt);
        assert_eq!(SortKey::from_str("name"), SortKey::Name);
        assert_eq!(SortKey::from_str("actor_id; DROP TABLE"), SortKey::CreatedAt);
        assert_eq!(SortDirection::from_str("sideways"), SortDirection::Desc);
    }

    #[tokio::test]
    async fn test_approve_is_idempotent() {
        let f = fixture().await;
        let s = seed(&f, "actor-1", "Ana", "A story about the cloister gardens in spring").await;

        let first = f
            .queue
            .apply_action(ModerationAction::Approve, &[s.id.clone()])
            .await
            .unwrap();
        assert!(first[0].ok);

        let second = f
            .queue
            .apply_action(ModerationAction::Approve, &[s.id.clone()])
            .await
            .unwrap();
        assert!(second[0].ok);

        let approved: bool =
            sqlx::query_scalar("SELECT approved FROM submissions WHERE id = ?")
                .bind(&s.id)
                .fetch_one(&f.db)
                .await
                .unwrap();
        assert!(approved);
    }

    #[tokio::test]
    async fn test_missing_target_reports_success() {
        let f = fixture().await;

        let outcomes = f
            .queue
            .apply_action(ModerationAction::Delete, &["no-such-id".to_string()])
            .await
            .unwrap();
        assert!(outcomes[0].ok);
    }

    #[tokio::test]
    async fn test_spam_flag_round_trip() {
        let f = fixture().await;
        let s = seed(&f, "actor-1", "Ana", "A story about the cloister gardens in spring").await;

        f.queue
            .apply_action(ModerationAction::MarkSpam, &[s.id.clone()])
            .await
            .unwrap();
        let flagged: bool =
            sqlx::query_scalar("SELECT suspected_spam FROM submissions WHERE id = ?")
                .bind(&s.id)
                .fetch_one(&f.db)
                .await
                .unwrap();
        assert!(flagged);

        f.queue
            .apply_action(ModerationAction::UnmarkSpam, &[s.id.clone()])
            .await
            .unwrap();
        let flagged: bool =
            sqlx::query_scalar("SELECT suspected_spam FROM submissions WHERE id = ?")
                .bind(&s.id)
                .fetch_one(&f.db)
                .await
                .unwrap();
        assert!(!flagged);
    }

    #[tokio::test]
    async fn test_delete_removes_row_and_media() {
        let dir = tempdir().unwrap();
        let db = test_pool().await;
        let media = MediaStore::new(
            MediaStoreConfig {
                directory: dir.path().to_path_buf(),
                max_size: 1024 * 1024,
            },
            db.clone(),
        );
        let cooldown = SubmissionCooldown::new(db.clone(), 60);
        let pipeline = VoicePipeline::new(db.clone(), cooldown, media.clone());
        let queue = ModerationQueue::new(
            db.clone(),
            media.clone(),
            Arc::new(StaticProfileLookup::default()),
        );

        let s = pipeline
            .submit(
                "actor-1",
                NewVoice {
                    text: "The sound of the bell tower carries across the valley".to_string(),
                    audio: Some(crate::voices::MediaAttachment {
                        data: b"fake audio bytes".to_vec(),
                        mime_type: "audio/ogg".to_string(),
                    }),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let audio_ref = s.audio_ref.clone().unwrap();

        queue
            .apply_action(ModerationAction::Delete, &[s.id.clone()])
            .await
            .unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM submissions")
            .fetch_one(&db)
            .await
            .unwrap();
        assert_eq!(count, 0);
        assert_eq!(media.get(&audio_ref).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_batch_mixes_outcomes_per_target() {
        let f = fixture().await;
        let s = seed(&f, "actor-1", "Ana", "A story about the cloister gardens in spring").await;

        let outcomes = f
            .queue
            .apply_action(
                ModerationAction::Approve,
                &[s.id.clone(), "missing-id".to_string()],
            )
            .await
            .unwrap();

        // Both succeed: missing targets are no-ops by design
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.ok));
    }

    #[tokio::test]
    async fn test_profile_enrichment() {
        let mut profiles = StaticProfileLookup::default();
        profiles.profiles.insert(
            "actor-1".to_string(),
            crate::identity::ActorProfile {
                actor_id: "actor-1".to_string(),
                display_name: Some("Maria Kovac".to_string()),
                email: Some("maria@example.org".to_string()),
            },
        );
        let f = fixture_with_profiles(profiles).await;
        seed(&f, "actor-1", "Anonymous", "A story about the cloister gardens in spring").await;

        let rows = f
            .queue
            .list(&QueueFilter {
                status: StatusFilter::All,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(rows[0].author_display_name.as_deref(), Some("Maria Kovac"));
        assert_eq!(rows[0].author_email.as_deref(), Some("maria@example.org"));
    }

    #[test]
    fn test_action_from_str() {
        assert_eq!(
            ModerationAction::from_str("approve").unwrap(),
            ModerationAction::Approve
        );
        assert_eq!(
            ModerationAction::from_str("MARK_SPAM").unwrap(),
            ModerationAction::MarkSpam
        );
        assert!(ModerationAction::from_str("publish").is_err());
    }
}
