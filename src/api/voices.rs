/// Voice submission endpoint
use crate::{
    auth::ActorAuth,
    context::AppContext,
    error::{EngageError, EngageResult},
    voices::{MediaAttachment, NewVoice, Submission},
};
use axum::{
    extract::State,
    http::StatusCode,
    routing::post,
    Json, Router,
};
use base64::Engine;
use serde::Deserialize;
use validator::Validate;

/// Build voice routes
pub fn routes() -> Router<AppContext> {
    Router::new().route("/api/voices", post(submit_voice))
}

/// A media attachment on the wire: base64 bytes plus a MIME type
#[derive(Debug, Deserialize)]
struct MediaPayload {
    data: String,
    mime_type: String,
}

#[derive(Debug, Deserialize, Validate)]
struct SubmitVoiceRequest {
    #[validate(length(max = 80, message = "Display name too long"))]
    display_name: Option<String>,
    #[validate(length(max = 4000, message = "Text too long"))]
    text: String,
    image: Option<MediaPayload>,
    audio: Option<MediaPayload>,
}

impl MediaPayload {
    fn decode(&self) -> EngageResult<MediaAttachment> {
        let data = base64::engine::general_purpose::STANDARD
            .decode(&self.data)
            .map_err(|e| EngageError::InvalidInput(format!("Invalid base64 media: {}", e)))?;

        Ok(MediaAttachment {
            data,
            mime_type: self.mime_type.clone(),
        })
    }
}

/// Submit a new community voice
async fn submit_voice(
    State(ctx): State<AppContext>,
    auth: ActorAuth,
    Json(req): Json<SubmitVoiceRequest>,
) -> EngageResult<(StatusCode, Json<Submission>)> {
    req.validate()
        .map_err(|e| EngageError::InvalidInput(e.to_string()))?;

    let new = NewVoice {
        display_name: req.display_name.clone(),
        text: req.text.clone(),
        image: req.image.as_ref().map(MediaPayload::decode).transpose()?,
        audio: req.audio.as_ref().map(MediaPayload::decode).transpose()?,
    };

    let submission = ctx.voice_pipeline.submit(&auth.actor_id, new).await?;

    Ok((StatusCode::CREATED, Json(submission)))
}
