pub mod password;
pub mod session;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::headers::Cookie;
use axum_extra::TypedHeader;
use serde::{Deserialize, Serialize};

use crate::{enums::Role, error::AppError, state::AppState};

use self::session::{find_session_user, SESSION_COOKIE_NAME};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: uuid::Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(cookies) = TypedHeader::<Cookie>::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::unauthorized())?;
        let token = cookies
            .get(SESSION_COOKIE_NAME)
            .filter(|value| !value.is_empty())
            .ok_or_else(AppError::unauthorized)?;

        let mut conn = state.db()?;
        let user = find_session_user(&mut conn, token)?.ok_or_else(AppError::unauthorized)?;
        let role = user.role()?;

        Ok(AuthenticatedUser {
            user_id: user.id,
            name: user.name,
            email: user.email,
            role,
        })
    }
}

/// An authenticated user holding the `ADMIN` role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthenticatedUser);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;
        match user.role {
            Role::Admin => Ok(AdminUser(user)),
            Role::Technician => Err(AppError::forbidden()),
        }
    }
}
