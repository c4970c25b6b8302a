//! Reference catalogs selectable on a certificate: standard software, configuration
//! items and peripherals.

use diesel::{prelude::*, result::DatabaseErrorKind, PgConnection};
use serde::Serialize;
use thiserror::Error;

use crate::error::AppError;
use crate::models::CatalogEntry;
use crate::schema::{configuration_items, peripherals, software};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogKind {
    Software,
    Peripheral,
    ConfigurationItem,
}

impl CatalogKind {
    fn label(self) -> &'static str {
        match self {
            CatalogKind::Software => "software",
            CatalogKind::Peripheral => "peripheral",
            CatalogKind::ConfigurationItem => "configuration item",
        }
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("name cannot be empty")]
    EmptyName,
    #[error("{0} '{1}' already exists")]
    Duplicate(&'static str, String),
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
}

impl From<CatalogError> for AppError {
    fn from(value: CatalogError) -> Self {
        match value {
            CatalogError::EmptyName | CatalogError::Duplicate(..) => {
                AppError::bad_request(value.to_string())
            }
            CatalogError::Database(err) => AppError::from(err),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Catalogs {
    pub software: Vec<CatalogEntry>,
    pub configuration_items: Vec<CatalogEntry>,
    pub peripherals: Vec<CatalogEntry>,
}

pub fn list(conn: &mut PgConnection, kind: CatalogKind) -> QueryResult<Vec<CatalogEntry>> {
    match kind {
        CatalogKind::Software => software::table
            .select((software::id, software::name))
            .order(software::name.asc())
            .load(conn),
        CatalogKind::Peripheral => peripherals::table
            .select((peripherals::id, peripherals::name))
            .order(peripherals::name.asc())
            .load(conn),
        CatalogKind::ConfigurationItem => configuration_items::table
            .select((configuration_items::id, configuration_items::name))
            .order(configuration_items::name.asc())
            .load(conn),
    }
}

pub fn load_all(conn: &mut PgConnection) -> QueryResult<Catalogs> {
    Ok(Catalogs {
        software: list(conn, CatalogKind::Software)?,
        configuration_items: list(conn, CatalogKind::ConfigurationItem)?,
        peripherals: list(conn, CatalogKind::Peripheral)?,
    })
}

pub fn create(
    conn: &mut PgConnection,
    kind: CatalogKind,
    name: &str,
) -> Result<CatalogEntry, CatalogError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CatalogError::EmptyName);
    }

    let inserted = match kind {
        CatalogKind::Software => diesel::insert_into(software::table)
            .values(software::name.eq(name))
            .returning((software::id, software::name))
            .get_result::<CatalogEntry>(conn),
        CatalogKind::Peripheral => diesel::insert_into(peripherals::table)
            .values(peripherals::name.eq(name))
            .returning((peripherals::id, peripherals::name))
            .get_result::<CatalogEntry>(conn),
        CatalogKind::ConfigurationItem => diesel::insert_into(configuration_items::table)
            .values(configuration_items::name.eq(name))
            .returning((configuration_items::id, configuration_items::name))
            .get_result::<CatalogEntry>(conn),
    };

    match inserted {
        Ok(entry) => Ok(entry),
        Err(diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
            Err(CatalogError::Duplicate(kind.label(), name.to_string()))
        }
        Err(err) => Err(CatalogError::from(err)),
    }
}
