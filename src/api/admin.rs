/// Moderator API endpoints
use crate::{
    auth::ModeratorAuth,
    context::AppContext,
    error::EngageResult,
    quiz::QuizQuestion,
    voices::moderation::{
        ActionOutcome, ModerationAction, QueueFilter, SortDirection, SortKey, StatusFilter,
        SubmissionView,
    },
};
use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

/// Build admin routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/admin/submissions", get(list_submissions))
        .route("/api/admin/submissions/action", post(apply_action))
        .route("/api/admin/stats", get(get_stats))
        .route("/api/admin/items/:item_id/quiz", put(set_question))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    #[serde(default)]
    status: StatusFilter,
    search: Option<String>,
    #[serde(default)]
    spam_only: bool,
    sort: Option<String>,
    direction: Option<String>,
    limit: Option<i64>,
    offset: Option<i64>,
}

#[derive(Debug, Serialize)]
struct ListResponse {
    submissions: Vec<SubmissionView>,
}

/// List submissions for the moderation queue
async fn list_submissions(
    State(ctx): State<AppContext>,
    auth: ModeratorAuth,
    Query(query): Query<ListQuery>,
) -> EngageResult<Json<ListResponse>> {
    tracing::debug!("Moderator {} listing submissions", auth.actor_id);

    // Sort parameters are coerced through the whitelist, never passed
    // through to SQL.
    let filter = QueueFilter {
        status: query.status,
        search: query.search,
        spam_only: query.spam_only,
        sort: query.sort.as_deref().map(SortKey::from_str).unwrap_or_default(),
        direction: query
            .direction
            .as_deref()
            .map(SortDirection::from_str)
            .unwrap_or_default(),
        limit: query.limit,
        offset: query.offset,
    };

    let submissions = ctx.moderation_queue.list(&filter).await?;

    Ok(Json(ListResponse { submissions }))
}

#[derive(Debug, Deserialize)]
struct ActionRequest {
    action: String,
    ids: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ActionResponse {
    outcomes: Vec<ActionOutcome>,
}

/// Apply a moderation action to a batch of submissions
async fn apply_action(
    State(ctx): State<AppContext>,
    auth: ModeratorAuth,
    Json(req): Json<ActionRequest>,
) -> EngageResult<Json<ActionResponse>> {
    let action = ModerationAction::from_str(&req.action)?;

    tracing::info!(
        "Moderator {} applying {} to {} submission(s)",
        auth.actor_id,
        action.as_str(),
        req.ids.len()
    );

    let outcomes = ctx.moderation_queue.apply_action(action, &req.ids).await?;

    Ok(Json(ActionResponse { outcomes }))
}

/// Queue statistics for the admin dashboard
async fn get_stats(
    State(ctx): State<AppContext>,
    _auth: ModeratorAuth,
) -> EngageResult<Json<serde_json::Value>> {
    let pending: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM submissions WHERE approved = 0")
            .fetch_one(&ctx.db)
            .await?;
    let approved: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM submissions WHERE approved = 1")
            .fetch_one(&ctx.db)
            .await?;
    let flagged: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM submissions WHERE suspected_spam = 1")
            .fetch_one(&ctx.db)
            .await?;
    let badges: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM badges")
        .fetch_one(&ctx.db)
        .await?;

    Ok(Json(serde_json::json!({
        "pendingSubmissions": pending,
        "approvedSubmissions": approved,
        "flaggedSubmissions": flagged,
        "badgesAwarded": badges,
    })))
}

#[derive(Debug, Deserialize)]
struct SetQuestionRequest {
    prompt: String,
    options: Vec<String>,
    correct_index: i64,
}

/// Create or replace an item's quiz question
async fn set_question(
    State(ctx): State<AppContext>,
    auth: ModeratorAuth,
    Path(item_id): Path<String>,
    Json(req): Json<SetQuestionRequest>,
) -> EngageResult<Json<serde_json::Value>> {
    tracing::info!("Moderator {} updating quiz for item {}", auth.actor_id, item_id);

    ctx.quiz_engine
        .set_question(&QuizQuestion {
            item_id,
            prompt: req.prompt,
            options: req.options,
            correct_index: req.correct_index,
        })
        .await?;

    Ok(Json(serde_json::json!({ "ok": true })))
}
