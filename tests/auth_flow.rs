mod common;

use anyhow::Result;
use axum::http::{header, StatusCode};
use common::{acquire_db_lock, read_json, TestApp};
use chrono::{Duration, Utc};
use diesel::prelude::*;
use handover::enums::Role;
use handover::models::NewAppSession;
use handover::schema::app_sessions;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Deserialize)]
struct AuthenticatedUser {
    email: String,
    role: String,
}

#[tokio::test]
async fn login_and_me_roundtrip() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let password = "s3cret";
    app.insert_user("tecnico@example.com", password, Role::Technician)
        .await?;

    let response = app
        .post_form(
            "/login",
            &[("email", "tecnico@example.com"), ("password", password)],
            None,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("session cookie")
        .to_str()?
        .to_string();
    assert!(set_cookie.starts_with("app_session_id="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Lax"));

    let cookie = app.login_cookie("tecnico@example.com", password).await?;
    let response = app.get("/api/auth/me", Some(&cookie)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let user: AuthenticatedUser = read_json(response).await?;
    assert_eq!(user.email, "tecnico@example.com");
    assert_eq!(user.role, "TECNICO");

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn bad_credentials_are_unauthorized() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    app.insert_user("admin@example.com", "correct", Role::Admin)
        .await?;

    let response = app
        .post_form(
            "/login",
            &[("email", "admin@example.com"), ("password", "wrong")],
            None,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .post_form(
            "/login",
            &[("email", "nobody@example.com"), ("password", "correct")],
            None,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn protected_routes_require_a_live_session() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let response = app.get("/dashboard", None).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .get("/dashboard", Some("app_session_id=not-a-session"))
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    app.insert_user("tecnico@example.com", "pw", Role::Technician)
        .await?;
    let cookie = app.login_cookie("tecnico@example.com", "pw").await?;

    let response = app.post_form("/logout", &[], Some(&cookie)).await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let cleared = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("clearing cookie")
        .to_str()?;
    assert!(cleared.contains("Max-Age=0"));

    let response = app.get("/api/auth/me", Some(&cookie)).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn login_removes_expired_sessions() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let user_id = app
        .insert_user("tecnico@example.com", "pw", Role::Technician)
        .await?;
    let stale_id = Uuid::new_v4();
    app.with_conn(move |conn| {
        diesel::insert_into(app_sessions::table)
            .values(&NewAppSession {
                id: stale_id,
                user_id,
                token_hash: "stale".to_string(),
                expires_at: (Utc::now() - Duration::days(1)).naive_utc(),
            })
            .execute(conn)?;
        Ok(())
    })
    .await?;

    app.login_cookie("tecnico@example.com", "pw").await?;

    let (stale, live): (i64, i64) = app
        .with_conn(move |conn| {
            let stale = app_sessions::table
                .filter(app_sessions::id.eq(stale_id))
                .count()
                .get_result(conn)?;
            let live = app_sessions::table.count().get_result(conn)?;
            Ok((stale, live))
        })
        .await?;
    assert_eq!(stale, 0);
    assert_eq!(live, 1);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn technicians_cannot_reach_admin_routes() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    app.insert_user("tecnico@example.com", "pw", Role::Technician)
        .await?;
    let cookie = app.login_cookie("tecnico@example.com", "pw").await?;

    let response = app.get("/admin", Some(&cookie)).await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .post_form("/admin/software", &[("name", "Office")], Some(&cookie))
        .await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn root_redirects_and_health_reports_ok() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let response = app.get("/", None).await?;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers().get(header::LOCATION).map(|v| v.to_str().ok()),
        Some(Some("/dashboard"))
    );

    let response = app.get("/api/health", None).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = read_json(response).await?;
    assert_eq!(body["status"], "ok");

    app.cleanup().await?;
    Ok(())
}
