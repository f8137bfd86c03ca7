/// Reaction endpoints
use crate::{
    auth::{ActorAuth, OptionalActorAuth},
    context::AppContext,
    error::EngageResult,
    reactions::{Reaction, ReactionCounts},
};
use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

/// Build reaction routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/items/:item_id/reactions", get(get_counts))
        .route("/api/items/:item_id/reaction", put(set_reaction))
}

#[derive(Debug, Serialize)]
struct CountsResponse {
    counts: ReactionCounts,
    /// The calling actor's own reaction, when authenticated
    #[serde(skip_serializing_if = "Option::is_none")]
    mine: Option<Reaction>,
}

/// Public aggregate counts; per-actor rows stay private to their owner
async fn get_counts(
    State(ctx): State<AppContext>,
    auth: OptionalActorAuth,
    Path(item_id): Path<String>,
) -> EngageResult<Json<CountsResponse>> {
    let counts = ctx.reaction_ledger.counts(&item_id).await?;

    let mine = match &auth.auth {
        Some(actor) => {
            ctx.reaction_ledger
                .current_reaction(&actor.actor_id, &item_id)
                .await?
        }
        None => None,
    };

    Ok(Json(CountsResponse { counts, mine }))
}

#[derive(Debug, Deserialize)]
struct SetReactionRequest {
    emoji: String,
}

/// Toggle the calling actor's reaction
async fn set_reaction(
    State(ctx): State<AppContext>,
    auth: ActorAuth,
    Path(item_id): Path<String>,
    Json(req): Json<SetReactionRequest>,
) -> EngageResult<Json<CountsResponse>> {
    let reaction = Reaction::from_str(&req.emoji)?;

    let counts = ctx
        .reaction_ledger
        .set_reaction(&auth.actor_id, &item_id, reaction)
        .await?;
    let mine = ctx
        .reaction_ledger
        .current_reaction(&auth.actor_id, &item_id)
        .await?;

    Ok(Json(CountsResponse { counts, mine }))
}
