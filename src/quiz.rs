/// Quiz and badge system for panorama items
///
/// Each panorama item carries one quiz question. A correct answer earns
/// the actor a permanent badge for that item, at most once. Every
/// attempt, right or wrong, lands in the append-only attempt log.
use crate::{
    error::{EngageError, EngageResult},
    metrics,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

/// A quiz question attached to a panorama item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub item_id: String,
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_index: i64,
}

/// The question as shown to visitors, without the answer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionView {
    pub item_id: String,
    pub prompt: String,
    pub options: Vec<String>,
}

impl From<QuizQuestion> for QuestionView {
    fn from(q: QuizQuestion) -> Self {
        Self {
            item_id: q.item_id,
            prompt: q.prompt,
            options: q.options,
        }
    }
}

/// Outcome of answering a quiz
#[derive(Debug, Clone, Copy, Serialize)]
pub struct AnswerOutcome {
    pub is_correct: bool,
    pub badge_awarded: bool,
}

/// Quiz engine manager
#[derive(Clone)]
pub struct QuizEngine {
    db: SqlitePool,
}

impl QuizEngine {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Store or replace the question for an item
    pub async fn set_question(&self, question: &QuizQuestion) -> EngageResult<()> {
        if question.correct_index < 0 || question.correct_index as usize >= question.options.len()
        {
            return Err(EngageError::InvalidInput(
                "Correct index out of range".to_string(),
            ));
        }

        let options_json = serde_json::to_string(&question.options)
            .map_err(|e| EngageError::Internal(format!("Failed to encode options: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO quiz_questions (item_id, prompt, options, correct_index)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (item_id) DO UPDATE SET
                prompt = excluded.prompt,
                options = excluded.options,
                correct_index = excluded.correct_index
            "#,
        )
        .bind(&question.item_id)
        .bind(&question.prompt)
        .bind(&options_json)
        .bind(question.correct_index)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Fetch the question for an item
    pub async fn question(&self, item_id: &str) -> EngageResult<Option<QuizQuestion>> {
        let row = sqlx::query(
            "SELECT item_id, prompt, options, correct_index FROM quiz_questions WHERE item_id = ?",
        )
        .bind(item_id)
        .fetch_optional(&self.db)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let options_json: String = row.get("options");
        let options: Vec<String> = serde_json::from_str(&options_json)
            .map_err(|e| EngageError::Internal(format!("Invalid options JSON: {}", e)))?;

        Ok(Some(QuizQuestion {
            item_id: row.get("item_id"),
            prompt: row.get("prompt"),
            options,
            correct_index: row.get("correct_index"),
        }))
    }

    /// Answer an item's quiz
    ///
    /// Every attempt is logged, repeats included. A correct answer
    /// awards the badge through an insert-or-ignore over the unique
    /// (actor, item) pair, so there is no prior existence check and no
    /// race window.
    pub async fn answer(
        &self,
        actor_id: &str,
        item_id: &str,
        selected_option: i64,
    ) -> EngageResult<AnswerOutcome> {
        if actor_id.trim().is_empty() {
            // No log entry and no state change for anonymous attempts
            return Err(EngageError::Unauthenticated(
                "A signed-in visitor identity is required".to_string(),
            ));
        }

        let question = self
            .question(item_id)
            .await?
            .ok_or_else(|| EngageError::NotFound(format!("No quiz for item {}", item_id)))?;

        if selected_option < 0 || selected_option as usize >= question.options.len() {
            return Err(EngageError::InvalidInput(format!(
                "Option {} out of range",
                selected_option
            )));
        }

        let is_correct = selected_option == question.correct_index;

        sqlx::query(
            r#"
            INSERT INTO quiz_attempts (item_id, actor_id, selected_option, is_correct, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(item_id)
        .bind(actor_id)
        .bind(selected_option)
        .bind(is_correct)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.db)
        .await?;

        let badge_awarded = if is_correct {
            self.award_badge(actor_id, item_id).await?
        } else {
            false
        };

        metrics::QUIZ_ATTEMPTS_TOTAL
            .with_label_values(&[if is_correct { "correct" } else { "incorrect" }])
            .inc();
        if badge_awarded {
            metrics::BADGES_AWARDED_TOTAL.inc();
            tracing::info!("Badge awarded to {} for item {}", actor_id, item_id);
        }

        Ok(AnswerOutcome {
            is_correct,
            badge_awarded,
        })
    }

    /// Award the badge for (actor, item), at most once
    ///
    /// Returns true only when this call created the badge.
    async fn award_badge(&self, actor_id: &str, item_id: &str) -> EngageResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO badges (actor_id, item_id, earned_at)
            VALUES (?, ?, ?)
            ON CONFLICT (actor_id, item_id) DO NOTHING
            "#,
        )
        .bind(actor_id)
        .bind(item_id)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Whether the actor holds the badge for an item
    pub async fn has_badge(&self, actor_id: &str, item_id: &str) -> EngageResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM badges WHERE actor_id = ? AND item_id = ?",
        )
        .bind(actor_id)
        .bind(item_id)
        .fetch_one(&self.db)
        .await?;

        Ok(count > 0)
    }
}

/// Per-round quiz presentation state
///
/// Tracks one actor's pass through an item's quiz in their session:
/// Idle → Presenting → Answered → Closed. Abandoning a round needs no
/// cleanup; the instance is simply dropped.
#[derive(Debug, Clone, PartialEq)]
pub enum QuizRound {
    Idle,
    Presenting { question: QuestionView },
    Answered { option: i64, is_correct: bool },
    Closed,
}

impl Default for QuizRound {
    fn default() -> Self {
        QuizRound::Idle
    }
}

impl QuizRound {
    /// Enter Presenting when the visitor finishes viewing the item
    pub fn present(&mut self, question: QuestionView) -> EngageResult<()> {
        match self {
            QuizRound::Idle => {
                *self = QuizRound::Presenting { question };
                Ok(())
            }
            _ => Err(EngageError::InvalidInput(
                "Quiz already presented this round".to_string(),
            )),
        }
    }

    /// Record the answer outcome
    pub fn record_answer(&mut self, option: i64, is_correct: bool) -> EngageResult<()> {
        match self {
            QuizRound::Presenting { .. } => {
                *self = QuizRound::Answered { option, is_correct };
                Ok(())
            }
            _ => Err(EngageError::InvalidInput(
                "No question is being presented".to_string(),
            )),
        }
    }

    /// Close the round after the result has been shown
    pub fn close(&mut self) -> EngageResult<()> {
        match self {
            QuizRound::Answered { .. } => {
                *self = QuizRound::Closed;
                Ok(())
            }
            _ => Err(EngageError::InvalidInput(
                "Round has no answer to close".to_string(),
            )),
        }
    }
}
