use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use handover::{
    auth::session,
    config::AppConfig,
    db,
    mailer::{LogMailer, Mailer, SmtpMailer},
    routes,
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    tracing::info!(
        component = "server",
        database_url = %config.redacted_database_url(),
        pool_size = config.database_max_pool_size,
        base_url = %config.app_base_url,
        display_offset = %config.display_offset,
        smtp_enabled = config.smtp.is_some(),
        "loaded configuration"
    );

    let pool = db::init_pool_with_size(&config.database_url, config.database_max_pool_size)?;
    {
        let mut conn = pool.get().context("failed to get database connection")?;
        let applied = db::run_migrations(&mut conn)?;
        let purged = session::purge_expired_sessions(&mut conn)?;
        tracing::info!(applied, purged_sessions = purged, "database ready");
    }

    let mailer: Arc<dyn Mailer> = match config.smtp.as_ref() {
        Some(smtp) => Arc::new(SmtpMailer::from_config(smtp)?),
        None => {
            tracing::warn!("SMTP_HOST not set, notification emails will only be logged");
            Arc::new(LogMailer)
        }
    };

    let addr: SocketAddr = format!("{}:{}", config.server_host, config.server_port)
        .parse()
        .context("invalid SERVER_HOST/SERVER_PORT")?;
    let state = AppState::new(pool, config, mailer);
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
