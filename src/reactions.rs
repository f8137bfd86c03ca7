/// Reaction ledger for panorama items
///
/// Each actor holds at most one reaction per item. Repeating the same
/// emoji removes it, a different emoji replaces it. Aggregate counts
/// are public; individual rows belong to their actor.
use crate::{
    error::{EngageError, EngageResult},
    metrics,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

/// The three fixed reaction sentiments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reaction {
    Like,
    Neutral,
    Dislike,
}

impl Reaction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reaction::Like => "👍",
            Reaction::Neutral => "😐",
            Reaction::Dislike => "👎",
        }
    }

    pub fn from_str(s: &str) -> EngageResult<Self> {
        match s {
            "👍" | "like" => Ok(Reaction::Like),
            "😐" | "neutral" => Ok(Reaction::Neutral),
            "👎" | "dislike" => Ok(Reaction::Dislike),
            _ => Err(EngageError::InvalidInput(format!(
                "Invalid reaction: {}",
                s
            ))),
        }
    }
}

/// Aggregate reaction counts for one item
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionCounts {
    pub like: i64,
    pub neutral: i64,
    pub dislike: i64,
}

/// Reaction ledger manager
#[derive(Clone)]
pub struct ReactionLedger {
    db: SqlitePool,
}

impl ReactionLedger {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Toggle an actor's reaction on an item and return the new counts
    ///
    /// Delete-then-insert runs inside one transaction over a table with
    /// a UNIQUE(actor_id, item_id) constraint, so even two racing
    /// sessions of the same actor cannot leave two rows.
    pub async fn set_reaction(
        &self,
        actor_id: &str,
        item_id: &str,
        reaction: Reaction,
    ) -> EngageResult<ReactionCounts> {
        if actor_id.trim().is_empty() {
            return Err(EngageError::Unauthenticated(
                "A signed-in visitor identity is required".to_string(),
            ));
        }

        let mut tx = self.db.begin().await?;

        let previous: Option<String> = sqlx::query_scalar(
            "SELECT emoji FROM reactions WHERE actor_id = ? AND item_id = ?",
        )
        .bind(actor_id)
        .bind(item_id)
        .fetch_optional(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM reactions WHERE actor_id = ? AND item_id = ?")
            .bind(actor_id)
            .bind(item_id)
            .execute(&mut *tx)
            .await?;

        // Same emoji twice in a row means "remove my reaction"
        let removed = previous.as_deref() == Some(reaction.as_str());
        if !removed {
            sqlx::query(
                r#"
                INSERT INTO reactions (actor_id, item_id, emoji, submitted_at)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(actor_id)
            .bind(item_id)
            .bind(reaction.as_str())
            .bind(Utc::now().to_rfc3339())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        metrics::REACTIONS_TOTAL
            .with_label_values(&[if removed { "removed" } else { "set" }])
            .inc();

        self.counts(item_id).await
    }

    /// Aggregate counts per emoji for one item
    pub async fn counts(&self, item_id: &str) -> EngageResult<ReactionCounts> {
        let rows = sqlx::query(
            "SELECT emoji, COUNT(*) AS n FROM reactions WHERE item_id = ? GROUP BY emoji",
        )
        .bind(item_id)
        .fetch_all(&self.db)
        .await?;

        let mut counts = ReactionCounts::default();
        for row in rows {
            let emoji: String = row.get("emoji");
            let n: i64 = row.get("n");
            match Reaction::from_str(&emoji)? {
                Reaction::Like => counts.like = n,
                Reaction::Neutral => counts.neutral = n,
                Reaction::Dislike => counts.dislike = n,
            }
        }

        Ok(counts)
    }

    /// The calling actor's own reaction on an item, if any
    pub async fn current_reaction(
        &self,
        actor_id: &str,
        item_id: &str,
    ) -> EngageResult<Option<Reaction>> {
        let emoji: Option<String> = sqlx::query_scalar(
            "SELECT emoji FROM reactions WHERE actor_id = ? AND item_id = ?",
        )
        .bind(actor_id)
        .bind(item_id)
        .fetch_optional(&self.db)
        .await?;

        emoji.as_deref().map(Reaction::from_str).transpose()
    }
}
