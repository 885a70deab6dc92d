use std::str::FromStr;

use rand::RngCore;
use serde::Deserialize;
use tracing::warn;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://users.db";
pub const DEFAULT_TTL_MINUTES: i64 = 60;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Argon2 work factor. Defaults follow `argon2::Params::DEFAULT_*`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct HashConfig {
    pub m_cost: u32,
    pub t_cost: u32,
    pub p_cost: u32,
}

impl Default for HashConfig {
    fn default() -> Self {
        Self {
            m_cost: argon2::Params::DEFAULT_M_COST,
            t_cost: argon2::Params::DEFAULT_T_COST,
            p_cost: argon2::Params::DEFAULT_P_COST,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub hash: HashConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.into());

        let secret = match std::env::var("JWT_SECRET") {
            Ok(s) if !s.is_empty() => s,
            _ => {
                warn!("JWT_SECRET not set; using a random per-process secret, tokens will not survive a restart");
                random_secret()
            }
        };

        let jwt = JwtConfig {
            secret,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "login-api".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "login-api-users".into()),
            ttl_minutes: env_or("JWT_TTL_MINUTES", DEFAULT_TTL_MINUTES),
        };

        let defaults = HashConfig::default();
        let hash = HashConfig {
            m_cost: env_or("ARGON2_M_COST", defaults.m_cost),
            t_cost: env_or("ARGON2_T_COST", defaults.t_cost),
            p_cost: env_or("ARGON2_P_COST", defaults.p_cost),
        };

        Ok(Self {
            database_url,
            jwt,
            hash,
        })
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

fn random_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_or_falls_back_on_garbage() {
        std::env::set_var("LOGIN_API_TEST_GARBAGE", "not-a-number");
        assert_eq!(env_or("LOGIN_API_TEST_GARBAGE", 7u32), 7);
        std::env::set_var("LOGIN_API_TEST_NUMBER", "42");
        assert_eq!(env_or("LOGIN_API_TEST_NUMBER", 7u32), 42);
    }

    #[test]
    fn random_secrets_differ() {
        let a = random_secret();
        let b = random_secret();
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
    }
}
