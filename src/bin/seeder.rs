use std::env;

use anyhow::{Context, Result};
use diesel::prelude::*;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use handover::{
    auth::password, config::AppConfig, db, enums::Role, models::NewAppUser, schema::app_users,
};

const ADMIN_NAME: &str = "Admin User";
const ADMIN_EMAIL: &str = "admin@alc-ti.com";
const ADMIN_DNI: &str = "00000000";

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let admin_password =
        env::var("APP_ADMIN_PASSWORD").context("APP_ADMIN_PASSWORD must be set")?;
    let config = AppConfig::from_env()?;
    tracing::info!(
        component = "seeder",
        database_url = %config.redacted_database_url(),
        "loaded configuration"
    );

    let pool = db::init_pool_with_size(&config.database_url, 1)?;
    let mut conn = pool.get().context("failed to get database connection")?;
    db::run_migrations(&mut conn)?;

    let existing: Option<Uuid> = app_users::table
        .filter(app_users::email.eq(ADMIN_EMAIL))
        .select(app_users::id)
        .first(&mut conn)
        .optional()?;
    if let Some(id) = existing {
        tracing::info!(%id, email = ADMIN_EMAIL, "admin user already exists");
        return Ok(());
    }

    let admin = NewAppUser {
        id: Uuid::new_v4(),
        name: ADMIN_NAME.to_string(),
        email: ADMIN_EMAIL.to_string(),
        password_hash: password::hash_password(&admin_password)?,
        role: Role::Admin.as_str().to_string(),
        dni: ADMIN_DNI.to_string(),
    };
    diesel::insert_into(app_users::table)
        .values(&admin)
        .execute(&mut conn)
        .context("failed to create admin user")?;

    tracing::info!(id = %admin.id, email = ADMIN_EMAIL, "admin user created");
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
