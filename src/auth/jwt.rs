use std::{sync::Arc, time::Duration};

use axum::extract::FromRef;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;

use super::{claims::Claims, error::AuthError};
use crate::{config::JwtConfig, state::AppState};

/// HS256 signing and verification keys, built once at startup.
#[derive(Clone)]
pub struct JwtKeys {
    inner: Arc<KeysInner>,
}

struct KeysInner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    ttl: Duration,
}

impl JwtKeys {
    pub fn new(cfg: &JwtConfig) -> Self {
        let ttl_minutes = cfg.ttl_minutes.max(0) as u64;
        Self {
            inner: Arc::new(KeysInner {
                encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
                decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
                issuer: cfg.issuer.clone(),
                audience: cfg.audience.clone(),
                ttl: Duration::from_secs(ttl_minutes * 60),
            }),
        }
    }

    pub fn issue(&self, user_id: i64) -> Result<String, AuthError> {
        self.issue_at(user_id, OffsetDateTime::now_utc())
    }

    fn issue_at(&self, user_id: i64, now: OffsetDateTime) -> Result<String, AuthError> {
        let exp = now + TimeDuration::seconds(self.inner.ttl.as_secs() as i64);
        let claims = Claims {
            sub: user_id,
            iat: now.unix_timestamp(),
            exp: exp.unix_timestamp(),
            iss: self.inner.issuer.clone(),
            aud: self.inner.audience.clone(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.inner.encoding)
            .map_err(AuthError::internal)?;
        debug!(user_id, "jwt signed");
        Ok(token)
    }

    /// Returns the user id of a token whose signature verifies and whose
    /// expiry is still in the future.
    pub fn verify(&self, token: &str) -> Result<i64, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_audience(std::slice::from_ref(&self.inner.audience));
        validation.set_issuer(std::slice::from_ref(&self.inner.issuer));

        let data = decode::<Claims>(token, &self.inner.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                _ => AuthError::InvalidToken,
            }
        })?;

        // jsonwebtoken accepts exp == now; a token is only valid strictly before expiry.
        if data.claims.exp <= OffsetDateTime::now_utc().unix_timestamp() {
            return Err(AuthError::ExpiredToken);
        }

        debug!(user_id = data.claims.sub, "jwt verified");
        Ok(data.claims.sub)
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        state.keys.clone()
    }
}
