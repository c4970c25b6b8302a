use std::sync::Arc;

use diesel::{
    pg::PgConnection,
    r2d2::{ConnectionManager, PooledConnection},
};

use crate::{
    config::AppConfig,
    db::PgPool,
    email::EmailService,
    error::{AppError, AppResult},
    mailer::Mailer,
};

type PgPooledConnection = PooledConnection<ConnectionManager<PgConnection>>;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<AppConfig>,
    pub email: EmailService,
}

impl AppState {
    pub fn new(pool: PgPool, config: AppConfig, mailer: Arc<dyn Mailer>) -> Self {
        let email = EmailService::new(mailer, config.app_base_url.clone());
        Self {
            pool,
            config: Arc::new(config),
            email,
        }
    }

    pub fn db(&self) -> AppResult<PgPooledConnection> {
        self.pool
            .get()
            .map_err(|err| AppError::internal(format!("database pool error: {err}")))
    }
}
