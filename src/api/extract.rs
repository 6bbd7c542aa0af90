use crate::api::error::ApiError;
use crate::api::state::AppState;
use crate::auth::OwnerId;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

/// The owner behind a valid `Authorization: Bearer <token>` header
pub struct AuthenticatedOwner(pub OwnerId);

impl FromRequestParts<AppState> for AuthenticatedOwner {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .ok_or_else(|| ApiError::unauthorized("Not authenticated"))?;

        state
            .accounts
            .owner_for_token(token)
            .map(AuthenticatedOwner)
            .ok_or_else(|| ApiError::unauthorized("Could not validate credentials"))
    }
}

/// Extracts the token from a `Bearer` authorization value
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("bearer  abc "), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("abc"), None);
    }
}
