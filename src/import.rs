//! Spreadsheet imports of employees and machines.
//!
//! The first row of every file is a header. Rows that cannot be turned into a record are
//! skipped and counted; a database failure aborts the whole batch.

use csv::StringRecord;
use diesel::{prelude::*, PgConnection};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::enums::{MachineProfile, MachineType};
use crate::error::AppError;
use crate::inventory::{self, MachineRecord};
use crate::models::NewMachineUser;

const MIN_COLUMNS: usize = 9;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("CSV file is empty or has only a header.")]
    EmptyFile,
    #[error("failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
}

impl From<ImportError> for AppError {
    fn from(value: ImportError) -> Self {
        match value {
            ImportError::EmptyFile => AppError::bad_request(value.to_string()),
            ImportError::Csv(err) => AppError::bad_request(format!("failed to parse CSV: {err}")),
            ImportError::Database(err) => AppError::internal(err),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub processed: usize,
    pub skipped: usize,
}

fn read_rows(data: &[u8]) -> Result<Vec<StringRecord>, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(data);
    let rows = reader.records().collect::<Result<Vec<_>, _>>()?;
    if rows.len() < 2 {
        return Err(ImportError::EmptyFile);
    }
    Ok(rows)
}

fn field(row: &StringRecord, index: usize) -> String {
    row.get(index).unwrap_or("").trim().to_string()
}

/// Columns: society, personal code, DNI, name, site, email, (unused), area, floor.
pub fn parse_machine_user_row(row: &StringRecord) -> Option<NewMachineUser> {
    if row.len() < MIN_COLUMNS {
        return None;
    }

    let email = field(row, 5).to_lowercase();
    if email.parse::<lettre::Address>().is_err() {
        warn!(%email, "skipping machine user row with invalid email");
        return None;
    }

    let user = NewMachineUser {
        dni: field(row, 2),
        personal_code: field(row, 1),
        name: field(row, 3),
        email,
        society: field(row, 0),
        site: field(row, 4),
        area: field(row, 7),
        floor_name: field(row, 8),
    };
    if user.dni.is_empty() || user.name.is_empty() {
        return None;
    }
    Some(user)
}

/// Columns: serial, type, MTM, model, plate, disk, memory, processor, profile.
pub fn parse_machine_row(row: &StringRecord) -> Option<MachineRecord> {
    if row.len() < MIN_COLUMNS {
        return None;
    }

    let Ok(machine_type) = field(row, 1).to_uppercase().parse::<MachineType>() else {
        warn!(value = %field(row, 1), "skipping machine row with invalid type");
        return None;
    };
    let Ok(profile) = field(row, 8).to_uppercase().parse::<MachineProfile>() else {
        warn!(value = %field(row, 8), "skipping machine row with invalid profile");
        return None;
    };

    let serial_num = field(row, 0).replace(' ', "").to_uppercase();
    if serial_num.is_empty() {
        return None;
    }

    Some(MachineRecord {
        serial_num,
        machine_type,
        mtm: Some(field(row, 2)),
        model: field(row, 3),
        plate_num: field(row, 4),
        disk_size: field(row, 5),
        memory_size: field(row, 6),
        processor: Some(field(row, 7)),
        profile: Some(profile),
    })
}

pub fn import_machine_users(
    conn: &mut PgConnection,
    data: &[u8],
) -> Result<ImportSummary, ImportError> {
    let rows = read_rows(data)?;
    let summary = conn.transaction::<_, ImportError, _>(|conn| {
        let mut summary = ImportSummary::default();
        for row in &rows[1..] {
            match parse_machine_user_row(row) {
                Some(user) => {
                    inventory::upsert_machine_user(conn, &user)?;
                    summary.processed += 1;
                }
                None => summary.skipped += 1,
            }
        }
        Ok(summary)
    })?;

    info!(
        processed = summary.processed,
        skipped = summary.skipped,
        "machine users imported"
    );
    Ok(summary)
}

pub fn import_machines(conn: &mut PgConnection, data: &[u8]) -> Result<ImportSummary, ImportError> {
    let rows = read_rows(data)?;
    let summary = conn.transaction::<_, ImportError, _>(|conn| {
        let mut summary = ImportSummary::default();
        for row in &rows[1..] {
            match parse_machine_row(row) {
                Some(machine) => {
                    inventory::upsert_machine(conn, &machine)?;
                    summary.processed += 1;
                }
                None => summary.skipped += 1,
            }
        }
        Ok(summary)
    })?;

    info!(
        processed = summary.processed,
        skipped = summary.skipped,
        "machines imported"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(fields: &[&str]) -> StringRecord {
        StringRecord::from(fields.to_vec())
    }

    #[test]
    fn machine_user_row_maps_columns() {
        let row = record(&[
            " ALICORP ",
            "P001",
            "12345678",
            "Ana Rojas",
            "LIMA",
            " Ana@Example.com ",
            "ignored",
            "TI",
            "3",
        ]);
        let user = parse_machine_user_row(&row).unwrap();
        assert_eq!(user.society, "ALICORP");
        assert_eq!(user.personal_code, "P001");
        assert_eq!(user.dni, "12345678");
        assert_eq!(user.name, "Ana Rojas");
        assert_eq!(user.site, "LIMA");
        assert_eq!(user.email, "ana@example.com");
        assert_eq!(user.area, "TI");
        assert_eq!(user.floor_name, "3");
    }

    #[test]
    fn machine_user_row_requires_columns_email_and_identity() {
        assert!(parse_machine_user_row(&record(&["a", "b", "c"])).is_none());
        assert!(parse_machine_user_row(&record(&[
            "S", "P", "1", "N", "L", "broken", "", "A", "F"
        ]))
        .is_none());
        assert!(parse_machine_user_row(&record(&[
            "S", "P", " ", "N", "L", "a@b.com", "", "A", "F"
        ]))
        .is_none());
        assert!(parse_machine_user_row(&record(&[
            "S", "P", "1", "", "L", "a@b.com", "", "A", "F"
        ]))
        .is_none());
    }

    #[test]
    fn machine_row_normalizes_serial_and_enums() {
        let row = record(&[
            " pf 3ab 12 ",
            "laptop",
            "20XX",
            "ThinkPad",
            "PLT-9",
            "512GB",
            "16GB",
            "i7",
            "especial 1",
        ]);
        let machine = parse_machine_row(&row).unwrap();
        assert_eq!(machine.serial_num, "PF3AB12");
        assert_eq!(machine.machine_type, MachineType::Laptop);
        assert_eq!(machine.profile, Some(MachineProfile::Especial1));
        assert_eq!(machine.mtm.as_deref(), Some("20XX"));
        assert_eq!(machine.processor.as_deref(), Some("i7"));
    }

    #[test]
    fn machine_row_skips_unknown_values() {
        let base = ["SN", "PC", "", "", "", "", "", "", "REGULAR"];
        assert!(parse_machine_row(&record(&base)).is_some());

        let mut bad_type = base;
        bad_type[1] = "TABLET";
        assert!(parse_machine_row(&record(&bad_type)).is_none());

        let mut bad_profile = base;
        bad_profile[8] = "PREMIUM";
        assert!(parse_machine_row(&record(&bad_profile)).is_none());

        let mut blank_serial = base;
        blank_serial[0] = "   ";
        assert!(parse_machine_row(&record(&blank_serial)).is_none());

        assert!(parse_machine_row(&record(&base[..8])).is_none());
    }

    #[test]
    fn header_only_file_is_empty() {
        assert!(matches!(
            read_rows(b"serial,type\n"),
            Err(ImportError::EmptyFile)
        ));
        assert_eq!(read_rows(b"h1,h2\nv1\n").unwrap().len(), 2);
    }
}
