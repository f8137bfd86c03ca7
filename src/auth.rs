/// Authentication extractors
///
/// Tokens are issued by the site's identity provider; this service only
/// verifies the HS256 signature and reads the claims. `sub` carries the
/// actor id, `scope` carries "moderator" for staff tokens.
use crate::{context::AppContext, error::EngageError};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

/// Extract a bearer token from request headers
pub fn extract_bearer_token(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|v| v.to_string())
}

/// Authenticated visitor context
#[derive(Debug, Clone)]
pub struct ActorAuth {
    pub actor_id: String,
}

#[async_trait]
impl FromRequestParts<AppContext> for ActorAuth {
    type Rejection = EngageError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers).ok_or_else(|| {
            EngageError::Unauthenticated("Missing authorization header".to_string())
        })?;

        let claims = verify_jwt_token(&token, &state.config.authentication.jwt_secret)?;
        let actor_id = claims
            .get("sub")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                EngageError::Unauthenticated("Invalid token: missing 'sub' claim".to_string())
            })?
            .to_string();

        Ok(ActorAuth { actor_id })
    }
}

/// Optional visitor context - does not fail if no auth provided
#[derive(Debug, Clone)]
pub struct OptionalActorAuth {
    pub auth: Option<ActorAuth>,
}

#[async_trait]
impl FromRequestParts<AppContext> for OptionalActorAuth {
    type Rejection = EngageError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let auth = match ActorAuth::from_request_parts(parts, state).await {
            Ok(auth) => Some(auth),
            Err(_) => None,
        };

        Ok(OptionalActorAuth { auth })
    }
}

/// Moderator context - requires the moderator scope or a configured id
#[derive(Debug, Clone)]
pub struct ModeratorAuth {
    pub actor_id: String,
}

#[async_trait]
impl FromRequestParts<AppContext> for ModeratorAuth {
    type Rejection = EngageError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers).ok_or_else(|| {
            EngageError::Unauthenticated("Missing authorization header".to_string())
        })?;

        let claims = verify_jwt_token(&token, &state.config.authentication.jwt_secret)?;
        let actor_id = claims
            .get("sub")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                EngageError::Unauthenticated("Invalid token: missing 'sub' claim".to_string())
            })?
            .to_string();

        let scope = claims.get("scope").and_then(|v| v.as_str());
        let is_configured = state
            .config
            .authentication
            .moderator_ids
            .contains(&actor_id);

        if scope != Some("moderator") && !is_configured {
            tracing::warn!("Actor {} attempted a moderator action", actor_id);
            return Err(EngageError::Forbidden("Moderator role required".to_string()));
        }

        Ok(ModeratorAuth { actor_id })
    }
}

/// Verify a JWT token and return its claims
///
/// Performs signature verification, expiration checking with 5 minutes
/// of clock-skew leeway, and claim extraction.
pub fn verify_jwt_token(token: &str, jwt_secret: &str) -> Result<serde_json::Value, EngageError> {
    use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

    let decoding_key = DecodingKey::from_secret(jwt_secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 300;

    decode::<serde_json::Value>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!("JWT verification failed: {}", e);
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    EngageError::Unauthenticated("Token has expired".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    EngageError::Unauthenticated("Invalid token signature".to_string())
                }
                _ => EngageError::Unauthenticated(format!("Invalid token: {}", e)),
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn make_token(claims: serde_json::Value) -> String {
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_valid_token_round_trip() {
        let exp = chrono::Utc::now().timestamp() + 600;
        let token = make_token(json!({"sub": "actor-1", "exp": exp}));

        let claims = verify_jwt_token(&token, SECRET).unwrap();
        assert_eq!(claims.get("sub").unwrap(), "actor-1");
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let exp = chrono::Utc::now().timestamp() + 600;
        let token = make_token(json!({"sub": "actor-1", "exp": exp}));

        assert!(verify_jwt_token(&token, "another-secret-another-secret-xx").is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        // Well past the 5 minute leeway
        let exp = chrono::Utc::now().timestamp() - 3600;
        let token = make_token(json!({"sub": "actor-1", "exp": exp}));

        assert!(verify_jwt_token(&token, SECRET).is_err());
    }

    #[test]
    fn test_bearer_extraction() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert("authorization", "Bearer abc123".parse().unwrap());
        assert_eq!(extract_bearer_token(&headers), Some("abc123".to_string()));

        let empty = axum::http::HeaderMap::new();
        assert_eq!(extract_bearer_token(&empty), None);
    }
}
