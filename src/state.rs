use std::sync::Arc;

use crate::auth::jwt::JwtKeys;
use crate::auth::password::PasswordHasher;
use crate::auth::repo::{SqliteUserStore, UserStore};
use crate::config::AppConfig;
use crate::db;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub hasher: PasswordHasher,
    pub keys: JwtKeys,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let pool = db::connect(&config.database_url, 10).await?;
        let users = Arc::new(SqliteUserStore::new(pool)) as Arc<dyn UserStore>;
        Self::from_parts(config, users)
    }

    pub fn from_parts(config: Arc<AppConfig>, users: Arc<dyn UserStore>) -> anyhow::Result<Self> {
        let hasher = PasswordHasher::new(config.hash)?;
        let keys = JwtKeys::new(&config.jwt);
        Ok(Self {
            config,
            users,
            hasher,
            keys,
        })
    }

    /// State backed by a fresh in-memory database and cheap hashing params.
    #[cfg(test)]
    pub async fn fake() -> Self {
        use crate::config::{HashConfig, JwtConfig};

        let pool = db::connect_in_memory().await.expect("in-memory db");
        let config = Arc::new(AppConfig {
            database_url: "sqlite::memory:".into(),
            jwt: JwtConfig {
                secret: "test".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
            },
            hash: HashConfig {
                m_cost: 1024,
                t_cost: 1,
                p_cost: 1,
            },
        });
        let users = Arc::new(SqliteUserStore::new(pool)) as Arc<dyn UserStore>;
        Self::from_parts(config, users).expect("valid test config")
    }
}
