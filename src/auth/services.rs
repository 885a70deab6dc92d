use tracing::{error, info, warn};

use crate::auth::{
    dto::{LoginRequest, LoginResponse, PublicUser, RegisterRequest},
    error::{AuthError, AuthResult},
    jwt::JwtKeys,
    password::PasswordHasher,
    repo::{StoreError, UserStore},
};

/// Trims the username and rejects empty fields. Passwords are taken verbatim.
pub(crate) fn validate_credentials(username: &str, password: &str) -> AuthResult<String> {
    let username = username.trim();
    if username.is_empty() || password.is_empty() {
        return Err(AuthError::Validation(
            "Username and password cannot be empty".into(),
        ));
    }
    Ok(username.to_string())
}

async fn hash_blocking(hasher: &PasswordHasher, password: String) -> AuthResult<String> {
    let hasher = hasher.clone();
    tokio::task::spawn_blocking(move || hasher.hash(&password))
        .await
        .map_err(AuthError::internal)?
        .map_err(AuthError::internal)
}

async fn verify_blocking(
    hasher: &PasswordHasher,
    password: String,
    hash: String,
) -> AuthResult<bool> {
    let hasher = hasher.clone();
    tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
        .await
        .map_err(AuthError::internal)?
        .map_err(AuthError::internal)
}

/// Hashes the password and inserts the user. A taken username is detected by
/// the store's unique constraint, never by a lookup beforehand.
pub async fn register(
    users: &dyn UserStore,
    hasher: &PasswordHasher,
    req: RegisterRequest,
) -> AuthResult<PublicUser> {
    let username = validate_credentials(&req.username, &req.password)?;
    let hash = hash_blocking(hasher, req.password).await?;

    let user = match users.create(&username, &hash).await {
        Ok(u) => u,
        Err(StoreError::UniqueViolation) => {
            warn!(%username, "username already in use");
            return Err(AuthError::UsernameTaken);
        }
        Err(e) => {
            error!(error = %e, %username, "create user failed");
            return Err(AuthError::internal(e));
        }
    };

    info!(user_id = user.id, username = %user.username, "user registered");
    Ok(PublicUser {
        user_id: user.id,
        username: user.username,
    })
}

/// One store read, zero writes. Unknown username and wrong password yield the
/// same `InvalidCredentials`.
pub async fn login(
    users: &dyn UserStore,
    hasher: &PasswordHasher,
    keys: &JwtKeys,
    req: LoginRequest,
) -> AuthResult<LoginResponse> {
    let username = validate_credentials(&req.username, &req.password)?;

    let user = match users.find_by_username(&username).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!(%username, "login unknown username");
            return Err(AuthError::InvalidCredentials);
        }
        Err(e) => {
            error!(error = %e, "find_by_username failed");
            return Err(AuthError::internal(e));
        }
    };

    if !verify_blocking(hasher, req.password, user.password_hash).await? {
        warn!(%username, user_id = user.id, "login invalid password");
        return Err(AuthError::InvalidCredentials);
    }

    let token = keys.issue(user.id)?;

    info!(user_id = user.id, %username, "user logged in");
    Ok(LoginResponse {
        user: PublicUser {
            user_id: user.id,
            username: user.username,
        },
        token,
    })
}

/// Profile of an authenticated user. A valid token for a user that no longer
/// exists is treated as unauthenticated.
pub async fn current_user(users: &dyn UserStore, user_id: i64) -> AuthResult<PublicUser> {
    match users.find_by_id(user_id).await {
        Ok(Some(u)) => Ok(PublicUser {
            user_id: u.id,
            username: u.username,
        }),
        Ok(None) => {
            warn!(user_id, "token for unknown user");
            Err(AuthError::Unauthenticated)
        }
        Err(e) => {
            error!(error = %e, user_id, "find_by_id failed");
            Err(AuthError::internal(e))
        }
    }
}
