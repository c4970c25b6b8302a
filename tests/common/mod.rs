use std::env;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, ensure, Context, Result};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::FixedOffset;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::PgConnection;
use handover::auth::password::hash_password;
use handover::config::AppConfig;
use handover::db::{self, PgPool};
use handover::enums::Role;
use handover::mailer::{Mailer, OutgoingEmail};
use handover::models::NewAppUser;
use handover::routes;
use handover::state::AppState;
use http_body_util::BodyExt;
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tower::util::ServiceExt;
use uuid::Uuid;

static DB_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

pub const BASE_URL: &str = "https://actas.test";

#[derive(Default)]
pub struct FakeMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
}

#[async_trait]
impl Mailer for FakeMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<()> {
        self.sent.lock().await.push(email);
        Ok(())
    }
}

impl FakeMailer {
    /// Waits for detached dispatch tasks until `count` emails arrived or a second passed.
    #[allow(dead_code)]
    pub async fn wait_for(&self, count: usize) -> Vec<OutgoingEmail> {
        for _ in 0..50 {
            {
                let sent = self.sent.lock().await;
                if sent.len() >= count {
                    return sent.clone();
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        self.sent.lock().await.clone()
    }
}

pub struct TestApp {
    pub state: AppState,
    router: Router,
    mailer: Arc<FakeMailer>,
}

impl TestApp {
    pub async fn new() -> Result<Self> {
        let database_url = env::var("TEST_DATABASE_URL")
            .context("TEST_DATABASE_URL must be set for integration tests")?;

        let config = AppConfig {
            database_url: database_url.clone(),
            database_max_pool_size: db::DEFAULT_MAX_POOL_SIZE,
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            app_base_url: BASE_URL.to_string(),
            session_expiry_days: 30,
            session_cookie_secure: false,
            cors_allowed_origin: None,
            display_offset: FixedOffset::west_opt(5 * 3600).context("valid offset")?,
            smtp: None,
        };

        let pool = db::init_pool_with_size(&config.database_url, config.database_max_pool_size)?;
        prepare_database(&pool).await?;

        let mailer = Arc::new(FakeMailer::default());
        let mailer_for_state: Arc<dyn Mailer> = mailer.clone();
        let state = AppState::new(pool, config, mailer_for_state);
        let router = routes::create_router(state.clone());

        Ok(Self {
            state,
            router,
            mailer,
        })
    }

    pub async fn cleanup(&self) -> Result<()> {
        self.with_conn(truncate_all).await
    }

    #[allow(dead_code)]
    pub fn mailer(&self) -> Arc<FakeMailer> {
        self.mailer.clone()
    }

    pub async fn insert_user(&self, email: &str, password: &str, role: Role) -> Result<Uuid> {
        let email = email.to_string();
        let password = password.to_string();
        self.with_conn(move |conn| {
            let user = NewAppUser {
                id: Uuid::new_v4(),
                name: format!("Usuario {}", role.as_str()),
                email,
                password_hash: hash_password(&password)?,
                role: role.as_str().to_string(),
                dni: "10000000".to_string(),
            };
            diesel::insert_into(handover::schema::app_users::table)
                .values(&user)
                .execute(conn)
                .context("failed to insert user")?;
            Ok(user.id)
        })
        .await
    }

    /// Logs in and returns the `name=value` pair of the session cookie.
    pub async fn login_cookie(&self, email: &str, password: &str) -> Result<String> {
        let response = self
            .post_form("/login", &[("email", email), ("password", password)], None)
            .await?;
        ensure!(
            response.status() == StatusCode::OK,
            "login failed with status {}",
            response.status()
        );

        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .ok_or_else(|| anyhow!("login response has no session cookie"))?
            .to_str()?;
        let pair = set_cookie
            .split(';')
            .next()
            .ok_or_else(|| anyhow!("malformed session cookie"))?;
        Ok(pair.to_string())
    }

    pub async fn post_form(
        &self,
        path: &str,
        fields: &[(&str, &str)],
        cookie: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = builder.body(Body::from(body))?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    pub async fn get(&self, path: &str, cookie: Option<&str>) -> Result<hyper::Response<Body>> {
        let mut builder = Request::builder().method(Method::GET).uri(path);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = builder.body(Body::empty())?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    #[allow(dead_code)]
    pub async fn upload_csv(
        &self,
        path: &str,
        data: &[u8],
        cookie: &str,
    ) -> Result<hyper::Response<Body>> {
        let boundary = format!("boundary-{}", Uuid::new_v4());
        let mut body = Vec::new();
        body.extend(format!("--{boundary}\r\n").as_bytes());
        body.extend(b"Content-Disposition: form-data; name=\"csvfile\"; filename=\"data.csv\"\r\n");
        body.extend(b"Content-Type: text/csv\r\n\r\n");
        body.extend(data);
        body.extend(b"\r\n");
        body.extend(format!("--{boundary}--\r\n").as_bytes());

        let request = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .header(header::COOKIE, cookie)
            .body(Body::from(body))?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    pub async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut PgConnection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.state.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|err| anyhow!("failed to get database connection: {err}"))?;
            f(&mut conn)
        })
        .await
        .context("connection task panicked")?
    }
}

pub async fn acquire_db_lock() -> tokio::sync::MutexGuard<'static, ()> {
    DB_LOCK.lock().await
}

pub async fn body_to_vec(body: Body) -> Result<Vec<u8>> {
    let collected = body
        .collect()
        .await
        .map_err(|err| anyhow!("failed to read response body: {err}"))?;
    Ok(collected.to_bytes().to_vec())
}

#[allow(dead_code)]
pub async fn read_json<T: DeserializeOwned>(response: hyper::Response<Body>) -> Result<T> {
    let body = body_to_vec(response.into_body()).await?;
    serde_json::from_slice(&body).with_context(|| {
        format!(
            "unexpected response body: {}",
            String::from_utf8_lossy(&body)
        )
    })
}

async fn prepare_database(pool: &PgPool) -> Result<()> {
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || -> Result<()> {
        let mut conn = pool
            .get()
            .map_err(|err| anyhow!("failed to acquire connection: {err}"))?;
        db::run_migrations(&mut conn)?;
        truncate_all(&mut conn)?;
        Ok(())
    })
    .await
    .context("migration task panicked")?
}

fn truncate_all(conn: &mut PgConnection) -> Result<()> {
    conn.batch_execute(
        "TRUNCATE TABLE certificates, device_peripherals, device_configuration, device_software, \
         devices, machines, machine_users, software, peripherals, configuration_items, \
         app_sessions, app_users RESTART IDENTITY CASCADE;",
    )
    .context("failed to truncate tables")?;
    Ok(())
}
