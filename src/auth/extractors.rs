use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::{debug, warn};

use super::{error::AuthError, jwt::JwtKeys};

/// Identity resolved from a valid bearer token. Taking it as a handler
/// argument is what makes a route protected: the handler body never runs
/// unless verification succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser(pub i64);

/// Pulls the token out of `Authorization: Bearer <token>`.
pub(crate) fn bearer_token(parts: &Parts) -> Result<&str, AuthError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AuthError::Unauthenticated)?;

    let (scheme, token) = header
        .split_once(' ')
        .ok_or(AuthError::Unauthenticated)?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::Unauthenticated);
    }
    Ok(token)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let keys = JwtKeys::from_ref(state);

        match keys.verify(token) {
            Ok(user_id) => Ok(AuthUser(user_id)),
            Err(AuthError::ExpiredToken) => {
                debug!("expired token");
                Err(AuthError::ExpiredToken)
            }
            Err(e) => {
                warn!(kind = e.kind(), "invalid token");
                Err(e)
            }
        }
    }
}
