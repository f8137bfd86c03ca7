/// Community voice submissions
///
/// A "voice" is a visitor-contributed story or quote, optionally with a
/// photo and an audio clip, held for moderation before publication.
pub mod moderation;

use crate::{
    error::{EngageError, EngageResult},
    media::{MediaKind, MediaStore},
    metrics,
    rate_limit::{CooldownDecision, SubmissionCooldown},
    spam,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// A community-authored submission
///
/// `approved` is false until a moderator flips it; `suspected_spam` is
/// set by the heuristic at creation and owned by moderators afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: String,
    pub actor_id: String,
    pub display_name: String,
    pub body: String,
    pub image_ref: Option<String>,
    pub audio_ref: Option<String>,
    pub suspected_spam: bool,
    pub approved: bool,
    pub created_at: DateTime<Utc>,
}

/// A media attachment arriving with a new submission
#[derive(Debug, Clone)]
pub struct MediaAttachment {
    pub data: Vec<u8>,
    pub mime_type: String,
}

/// Input to the submission pipeline
#[derive(Debug, Clone, Default)]
pub struct NewVoice {
    pub display_name: Option<String>,
    pub text: String,
    pub image: Option<MediaAttachment>,
    pub audio: Option<MediaAttachment>,
}

/// Voice submission pipeline
///
/// Orders the intake steps so that no partial submission can exist:
/// cooldown reservation, input validation, media storage, spam triage,
/// then a single row insert with `approved = false`.
#[derive(Clone)]
pub struct VoicePipeline {
    db: SqlitePool,
    cooldown: SubmissionCooldown,
    media: MediaStore,
}

impl VoicePipeline {
    pub fn new(db: SqlitePool, cooldown: SubmissionCooldown, media: MediaStore) -> Self {
        Self {
            db,
            cooldown,
            media,
        }
    }

    /// Submit a new voice
    ///
    /// The cooldown is reserved before anything else is written, so a
    /// submission that fails mid-pipeline still burns the window and a
    /// fast double-submit cannot pass the gate twice.
    pub async fn submit(&self, actor_id: &str, new: NewVoice) -> EngageResult<Submission> {
        if actor_id.trim().is_empty() {
            return Err(EngageError::Unauthenticated(
                "A signed-in visitor identity is required".to_string(),
            ));
        }

        match self.cooldown.check_and_reserve(actor_id).await? {
            CooldownDecision::Allowed => {}
            CooldownDecision::Denied { seconds_remaining } => {
                return Err(EngageError::RateLimited { seconds_remaining });
            }
        }

        let body = new.text.trim();
        if body.is_empty() {
            return Err(EngageError::InvalidInput(
                "Submission text is required".to_string(),
            ));
        }

        let display_name = new
            .display_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("Anonymous")
            .to_string();

        // Media first: only durable references end up on the row. A
        // storage failure aborts the whole submission.
        let image_ref = match &new.image {
            Some(attachment) => Some(
                self.media
                    .store(
                        MediaKind::Image,
                        attachment.data.clone(),
                        &attachment.mime_type,
                        actor_id,
                    )
                    .await?
                    .media_ref,
            ),
            None => None,
        };

        let audio_ref = match &new.audio {
            Some(attachment) => Some(
                self.media
                    .store(
                        MediaKind::Audio,
                        attachment.data.clone(),
                        &attachment.mime_type,
                        actor_id,
                    )
                    .await?
                    .media_ref,
            ),
            None => None,
        };

        let suspected_spam = spam::classify(body, &display_name);
        let id = Uuid::new_v4().to_string();
        let created_at = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO submissions
            (id, actor_id, display_name, body, image_ref, audio_ref, suspected_spam, approved, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?)
            "#,
        )
        .bind(&id)
        .bind(actor_id)
        .bind(&display_name)
        .bind(body)
        .bind(&image_ref)
        .bind(&audio_ref)
        .bind(suspected_spam)
        .bind(created_at.to_rfc3339())
        .execute(&self.db)
        .await?;

        metrics::VOICE_SUBMISSIONS_TOTAL
            .with_label_values(&[if suspected_spam { "suspect" } else { "clean" }])
            .inc();

        if suspected_spam {
            tracing::info!("Submission {} flagged as suspected spam", id);
        } else {
            tracing::debug!("Submission {} accepted for moderation", id);
        }

        Ok(Submission {
            id,
            actor_id: actor_id.to_string(),
            display_name,
            body: body.to_string(),
            image_ref,
            audio_ref,
            suspected_spam,
            approved: false,
            created_at,
        })
    }

    /// Fetch a submission by id
    pub async fn get(&self, id: &str) -> EngageResult<Option<Submission>> {
        let row = sqlx::query(
            r#"
            SELECT id, actor_id, display_name, body, image_ref, audio_ref,
                   suspected_spam, approved, created_at
            FROM submissions
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        row.map(parse_submission).transpose()
    }
}

/// Parse a database row into a Submission
pub(crate) fn parse_submission(row: sqlx::sqlite::SqliteRow) -> EngageResult<Submission> {
    let created_at_str: String = row.get("created_at");
    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map_err(|e| EngageError::Internal(format!("Invalid timestamp: {}", e)))?
        .with_timezone(&Utc);

    Ok(Submission {
        id: row.get("id"),
        actor_id: row.get("actor_id"),
        display_name: row.get("display_name"),
        body: row.get("body"),
        image_ref: row.get("image_ref"),
        audio_ref: row.get("audio_ref"),
        suspected_spam: row.get("suspected_spam"),
        approved: row.get("approved"),
        created_at,
    })
}
