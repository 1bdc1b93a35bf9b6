use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::warn;
use uuid::Uuid;

use super::jwt::{JwtKeys, TokenKind};
use super::repo::UserStore;
use super::repo_types::User;
use crate::error::AppError;

/// Signed-in account, resolved from a bearer access token.
///
/// This is the whole of the per-request session. A valid token whose user is
/// no longer stored is refused.
pub struct CurrentUser(pub User);

/// Id of the signed-in account; handlers pass it down explicitly.
pub struct AuthUser(pub Uuid);

fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let value = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?;
    let (scheme, token) = value
        .split_once(' ')
        .ok_or_else(|| AppError::Unauthorized("Invalid Authorization header".into()))?;
    if !scheme.eq_ignore_ascii_case("bearer") || token.trim().is_empty() {
        return Err(AppError::Unauthorized("Invalid Authorization header".into()));
    }
    Ok(token.trim())
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
    Arc<UserStore>: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = JwtKeys::from_ref(state)
            .verify(token, TokenKind::Access)
            .inspect_err(|e| warn!(error = %e, path = %parts.uri.path(), "request token refused"))?;
        let Some(user) = Arc::<UserStore>::from_ref(state).find_by_id(claims.sub).await else {
            warn!(user_id = %claims.sub, path = %parts.uri.path(), "token for unknown user");
            return Err(AppError::Unauthorized(
                "Logged-in user not found. Please log in again.".into(),
            ));
        };
        Ok(CurrentUser(user))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
    Arc<UserStore>: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        Ok(AuthUser(user.id))
    }
}
