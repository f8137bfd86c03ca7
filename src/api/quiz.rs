/// Quiz endpoints
use crate::{
    auth::ActorAuth,
    context::AppContext,
    error::{EngageError, EngageResult},
    quiz::QuestionView,
};
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

/// Build quiz routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/items/:item_id/quiz", get(get_question))
        .route("/api/items/:item_id/quiz/answer", post(answer_quiz))
}

/// Fetch the question for an item, without the answer
async fn get_question(
    State(ctx): State<AppContext>,
    Path(item_id): Path<String>,
) -> EngageResult<Json<QuestionView>> {
    let question = ctx
        .quiz_engine
        .question(&item_id)
        .await?
        .ok_or_else(|| EngageError::NotFound(format!("No quiz for item {}", item_id)))?;

    Ok(Json(QuestionView::from(question)))
}

#[derive(Debug, Deserialize)]
struct AnswerRequest {
    option: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnswerResponse {
    is_correct: bool,
    badge_awarded: bool,
}

/// Answer an item's quiz
async fn answer_quiz(
    State(ctx): State<AppContext>,
    auth: ActorAuth,
    Path(item_id): Path<String>,
    Json(req): Json<AnswerRequest>,
) -> EngageResult<Json<AnswerResponse>> {
    let outcome = ctx
        .quiz_engine
        .answer(&auth.actor_id, &item_id, req.option)
        .await?;

    Ok(Json(AnswerResponse {
        is_correct: outcome.is_correct,
        badge_awarded: outcome.badge_awarded,
    }))
}
