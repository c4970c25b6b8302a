use axum::{
    extract::{Multipart, State},
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        HeaderMap, HeaderValue, StatusCode,
    },
    Form, Json,
};
use chrono::Utc;
use diesel::{prelude::*, result::DatabaseErrorKind};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::auth::{password, AdminUser};
use crate::catalog::{self, CatalogKind, Catalogs};
use crate::enums::Role;
use crate::error::{AppError, AppResult};
use crate::import::{self, ImportSummary};
use crate::models::{AppUser, CatalogEntry, NewAppUser};
use crate::report;
use crate::schema::app_users;
use crate::state::AppState;
use crate::timezone::localize;

#[derive(Serialize)]
pub struct AppUserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub dni: String,
}

impl From<AppUser> for AppUserSummary {
    fn from(user: AppUser) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            dni: user.dni,
        }
    }
}

#[derive(Serialize)]
pub struct AdminOverview {
    pub users: Vec<AppUserSummary>,
    #[serde(flatten)]
    pub catalogs: Catalogs,
}

#[derive(Deserialize)]
pub struct CreateUserForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: String,
    #[serde(default)]
    pub dni: String,
}

#[derive(Deserialize)]
pub struct CatalogForm {
    #[serde(default)]
    pub name: String,
}

pub async fn overview(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> AppResult<Json<AdminOverview>> {
    let mut conn = state.db()?;
    let users: Vec<AppUser> = app_users::table
        .order(app_users::name.asc())
        .load(&mut conn)?;
    let catalogs = catalog::load_all(&mut conn)?;

    Ok(Json(AdminOverview {
        users: users.into_iter().map(AppUserSummary::from).collect(),
        catalogs,
    }))
}

pub async fn create_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Form(form): Form<CreateUserForm>,
) -> AppResult<(StatusCode, Json<AppUserSummary>)> {
    let role: Role = form
        .role
        .trim()
        .parse()
        .map_err(|_| AppError::bad_request("Invalid role specified"))?;
    let name = form.name.trim();
    let email = form.email.trim().to_lowercase();
    if name.is_empty() || email.is_empty() || form.password.is_empty() {
        return Err(AppError::bad_request(
            "name, email and password are required",
        ));
    }

    let password_hash = password::hash_password(&form.password)?;
    let new_user = NewAppUser {
        id: Uuid::new_v4(),
        name: name.to_string(),
        email,
        password_hash,
        role: role.as_str().to_string(),
        dni: form.dni.trim().to_string(),
    };

    let mut conn = state.db()?;
    let user: AppUser = match diesel::insert_into(app_users::table)
        .values(&new_user)
        .get_result(&mut conn)
    {
        Ok(user) => user,
        Err(diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
            return Err(AppError::bad_request("email already registered"));
        }
        Err(err) => return Err(AppError::from(err)),
    };

    info!(admin = %admin.user_id, user_id = %user.id, role = %role, "app user created");
    Ok((StatusCode::CREATED, Json(user.into())))
}

async fn create_catalog_entry(
    state: &AppState,
    kind: CatalogKind,
    name: &str,
) -> AppResult<(StatusCode, Json<CatalogEntry>)> {
    let mut conn = state.db()?;
    let entry = catalog::create(&mut conn, kind, name)?;
    info!(kind = ?kind, id = entry.id, "catalog entry created");
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn create_software(
    State(state): State<AppState>,
    _admin: AdminUser,
    Form(form): Form<CatalogForm>,
) -> AppResult<(StatusCode, Json<CatalogEntry>)> {
    create_catalog_entry(&state, CatalogKind::Software, &form.name).await
}

pub async fn create_peripheral(
    State(state): State<AppState>,
    _admin: AdminUser,
    Form(form): Form<CatalogForm>,
) -> AppResult<(StatusCode, Json<CatalogEntry>)> {
    create_catalog_entry(&state, CatalogKind::Peripheral, &form.name).await
}

pub async fn create_configuration_item(
    State(state): State<AppState>,
    _admin: AdminUser,
    Form(form): Form<CatalogForm>,
) -> AppResult<(StatusCode, Json<CatalogEntry>)> {
    create_catalog_entry(&state, CatalogKind::ConfigurationItem, &form.name).await
}

async fn read_csv_upload(mut multipart: Multipart) -> AppResult<Vec<u8>> {
    let mut file_bytes: Option<Vec<u8>> = None;

    while let Some(field) = multipart.next_field().await.map_err(|err| {
        error!(error = %err, "invalid multipart data");
        AppError::bad_request(format!("invalid multipart data: {err}"))
    })? {
        if field.name() == Some("csvfile") {
            let data = field.bytes().await.map_err(|err| {
                error!(error = %err, "failed to read uploaded file");
                AppError::bad_request(format!("failed to read file bytes: {err}"))
            })?;
            file_bytes = Some(data.to_vec());
        }
    }

    file_bytes.ok_or_else(|| AppError::bad_request("Failed to get the file."))
}

pub async fn upload_machine_users(
    State(state): State<AppState>,
    _admin: AdminUser,
    multipart: Multipart,
) -> AppResult<Json<ImportSummary>> {
    let data = read_csv_upload(multipart).await?;
    let mut conn = state.db()?;
    Ok(Json(import::import_machine_users(&mut conn, &data)?))
}

pub async fn upload_machines(
    State(state): State<AppState>,
    _admin: AdminUser,
    multipart: Multipart,
) -> AppResult<Json<ImportSummary>> {
    let data = read_csv_upload(multipart).await?;
    let mut conn = state.db()?;
    Ok(Json(import::import_machines(&mut conn, &data)?))
}

pub async fn download_report(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> AppResult<(HeaderMap, Vec<u8>)> {
    let offset = state.config.display_offset;
    let mut conn = state.db()?;
    let body = report::build_certificate_report(&mut conn, &offset)?;

    let file_name =
        report::report_file_name(localize(&offset, Utc::now().naive_utc()).date_naive());
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/csv"));
    headers.insert(
        CONTENT_DISPOSITION,
        HeaderValue::from_str(&format!("attachment; filename={file_name}"))
            .map_err(AppError::internal)?,
    );
    Ok((headers, body))
}
