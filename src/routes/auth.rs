use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    Form, Json,
};
use axum_extra::{headers::Cookie, typed_header::TypedHeader};
use diesel::prelude::*;
use serde::Deserialize;
use tracing::{debug, info};

use crate::{
    auth::{
        password,
        session::{self, SESSION_COOKIE_NAME},
        AuthenticatedUser,
    },
    error::{AppError, AppResult},
    models::AppUser,
    schema::app_users,
    state::AppState,
};

#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

fn invalid_credentials() -> AppError {
    AppError::new(StatusCode::UNAUTHORIZED, "Invalid email or password.")
}

pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> AppResult<(HeaderMap, Json<AuthenticatedUser>)> {
    let mut conn = state.db()?;
    let email = form.email.trim().to_lowercase();

    let user: AppUser = app_users::table
        .filter(app_users::email.eq(&email))
        .first(&mut conn)
        .optional()?
        .ok_or_else(invalid_credentials)?;

    let valid = password::verify_password(&form.password, &user.password_hash)
        .map_err(|_| invalid_credentials())?;
    if !valid {
        return Err(invalid_credentials());
    }

    let role = user.role()?;
    let purged = session::purge_expired_sessions(&mut conn)?;
    if purged > 0 {
        debug!(purged, "expired sessions removed");
    }
    let issued = session::create_session(&mut conn, user.id, state.config.session_expiry_days)?;
    info!(user_id = %user.id, role = %role, "user logged in");

    let mut headers = HeaderMap::new();
    headers.insert(
        SET_COOKIE,
        session::build_session_cookie(&state.config, &issued),
    );

    Ok((
        headers,
        Json(AuthenticatedUser {
            user_id: user.id,
            name: user.name,
            email: user.email,
            role,
        }),
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    jar: Option<TypedHeader<Cookie>>,
) -> AppResult<(HeaderMap, StatusCode)> {
    if let Some(token) = jar
        .as_ref()
        .and_then(|TypedHeader(cookies)| cookies.get(SESSION_COOKIE_NAME))
        .filter(|value| !value.is_empty())
    {
        let mut conn = state.db()?;
        session::delete_session(&mut conn, token)?;
    }

    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, session::build_clear_session_cookie(&state.config));
    Ok((headers, StatusCode::NO_CONTENT))
}

pub async fn me(user: AuthenticatedUser) -> Json<AuthenticatedUser> {
    Json(user)
}
