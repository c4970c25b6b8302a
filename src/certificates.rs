//! Certificate issuance, correction and confirmation.
//!
//! A submission is validated and normalized before any connection is used. The write
//! path then runs as one transaction: employee, both machines, both devices, the NEW
//! device association sets and finally the certificate row.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{FixedOffset, NaiveDateTime, Utc};
use diesel::{prelude::*, PgConnection};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::email::HandoverNotice;
use crate::enums::{CertificateStatus, DeviceType, MachineProfile, MachineType, UnknownVariant};
use crate::error::AppError;
use crate::inventory::{self, MachineRecord, PeripheralDetail, PeripheralSelection};
use crate::models::{CatalogEntry, Certificate, Device, Machine, MachineUser, NewCertificate, NewMachineUser};
use crate::schema::{app_users, certificates, machine_users};
use crate::timezone::{format_local, DATE_TIME_FORMAT};
use crate::utils::form::FormValues;

#[derive(Debug, Error)]
pub enum CertificateError {
    #[error("{0}")]
    Validation(String),
    #[error("certificate not found")]
    NotFound,
    #[error("certificate is {0} and cannot be edited")]
    NotEditable(CertificateStatus),
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
    #[error("stored certificate data is invalid: {0}")]
    Corrupt(#[from] UnknownVariant),
}

impl From<CertificateError> for AppError {
    fn from(value: CertificateError) -> Self {
        match value {
            CertificateError::Validation(message) => AppError::bad_request(message),
            CertificateError::NotFound => AppError::new(
                axum::http::StatusCode::NOT_FOUND,
                "El certificado no fue encontrado.",
            ),
            CertificateError::NotEditable(status) => AppError::bad_request(format!(
                "Solo se pueden editar actas rechazadas. Estado actual: {status}."
            )),
            CertificateError::Database(err) => AppError::internal(err),
            CertificateError::Corrupt(err) => AppError::internal(err),
        }
    }
}

fn invalid(message: impl Into<String>) -> CertificateError {
    CertificateError::Validation(message.into())
}

fn normalize(value: &str, to_upper: bool) -> String {
    let trimmed = value.trim();
    if to_upper {
        trimmed.to_uppercase()
    } else {
        trimmed.to_string()
    }
}

fn required(form: &FormValues, key: &str, message: &str) -> Result<String, CertificateError> {
    let value = normalize(form.get(key), true);
    if value.is_empty() {
        return Err(invalid(message));
    }
    Ok(value)
}

/// One side of the handover: the machine assigned to the employee or the one retrieved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSubmission {
    pub device_code: String,
    pub serial_num: String,
    pub machine_type: MachineType,
    pub model: String,
    pub disk_size: String,
    pub memory_size: String,
    pub hostname: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateSubmission {
    pub machine_user: NewMachineUser,
    pub new_device: DeviceSubmission,
    pub new_profile: MachineProfile,
    pub additional_software: String,
    pub old_device: DeviceSubmission,
    pub software_ids: Vec<i32>,
    pub configuration_ids: Vec<i32>,
    pub peripherals: Vec<PeripheralSelection>,
    pub ticket_name: String,
    pub disk_c_size: String,
    pub disk_d_size: String,
    pub printer_name: String,
    pub printer_ip: String,
    pub printer_test: bool,
    pub comments: String,
}

impl CertificateSubmission {
    pub fn from_form(form: &FormValues) -> Result<Self, CertificateError> {
        let new_device_code = required(
            form,
            "new_device_code",
            "el 'Código Equipo' del equipo asignado no puede estar vacío",
        )?;
        let new_serial = required(
            form,
            "new_device_serial",
            "el 'Número de Serie' del equipo asignado no puede estar vacío",
        )?;
        let old_device_code = required(
            form,
            "old_device_code",
            "el 'Código Equipo' del equipo liberado no puede estar vacío",
        )?;
        let old_serial = required(
            form,
            "old_device_serial",
            "el 'Número de Serie' del equipo liberado no puede estar vacío",
        )?;
        let dni = required(
            form,
            "machine_user_dni",
            "el 'Código de Usuario' (DNI) no puede estar vacío",
        )?;

        if new_serial == old_serial {
            return Err(invalid(
                "el 'Número de Serie' del equipo asignado y liberado deben ser diferentes",
            ));
        }
        if new_device_code == old_device_code {
            return Err(invalid(
                "el 'Código Equipo' del equipo asignado y liberado deben ser diferentes",
            ));
        }

        let email = form.get("machine_user_email").trim().to_lowercase();
        if !email.is_empty() && email.parse::<lettre::Address>().is_err() {
            return Err(invalid(format!(
                "el formato del correo '{email}' no es válido"
            )));
        }

        let new_type = parse_machine_type(form.get("new_device_type"), "asignado")?;
        let old_type = parse_machine_type(form.get("old_device_type"), "liberado")?;
        let new_profile = match normalize(form.get("new_device_profile"), true).as_str() {
            "" => MachineProfile::Regular,
            other => other.parse().map_err(|_| {
                invalid(format!(
                    "el 'Perfil' del equipo asignado no es válido: '{other}'"
                ))
            })?,
        };

        let machine_user = NewMachineUser {
            dni,
            personal_code: normalize(form.get("machine_user_code"), true),
            name: normalize(form.get("machine_user_name"), true),
            email,
            society: normalize(form.get("machine_user_society"), true),
            site: normalize(form.get("machine_user_site"), true),
            area: normalize(form.get("machine_user_area"), true),
            floor_name: normalize(form.get("machine_user_floor"), true),
        };

        let new_device = DeviceSubmission {
            device_code: new_device_code,
            serial_num: new_serial,
            machine_type: new_type,
            model: normalize(form.get("new_device_model"), false),
            disk_size: normalize(form.get("new_device_disk"), false),
            memory_size: normalize(form.get("new_device_memory"), false),
            hostname: normalize(form.get("new_device_hostname"), true),
            status: normalize(form.get("new_device_status"), true),
        };

        let old_device = DeviceSubmission {
            device_code: old_device_code,
            serial_num: old_serial,
            machine_type: old_type,
            model: normalize(form.get("old_device_model"), false),
            disk_size: normalize(form.get("old_device_disk"), false),
            memory_size: normalize(form.get("old_device_memory"), false),
            hostname: normalize(form.get("old_device_hostname"), false),
            status: normalize(form.get("old_device_status"), true),
        };

        Ok(Self {
            machine_user,
            new_device,
            new_profile,
            additional_software: form.get("additional_software").trim().to_string(),
            old_device,
            software_ids: parse_ids(form.get_all("standard_software")),
            configuration_ids: parse_ids(form.get_all("standard_config")),
            peripherals: parse_peripherals(form),
            ticket_name: normalize(form.get("ticket_name"), false),
            disk_c_size: normalize(form.get("disk_c_size"), false),
            disk_d_size: normalize(form.get("disk_d_size"), false),
            printer_name: normalize(form.get("printer_name"), false),
            printer_ip: normalize(form.get("printer_ip"), false),
            printer_test: form.is_checked("printer_test"),
            comments: form.get("comments").trim().to_string(),
        })
    }
}

fn parse_machine_type(value: &str, side: &str) -> Result<MachineType, CertificateError> {
    let value = normalize(value, true);
    value.parse().map_err(|_| {
        invalid(format!(
            "el 'Tipo' del equipo {side} no es válido: '{value}'"
        ))
    })
}

/// Integer ids in ascending order; anything unparsable is ignored.
fn parse_ids<'a>(values: impl Iterator<Item = &'a str>) -> Vec<i32> {
    values
        .filter_map(|value| value.trim().parse::<i32>().ok())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn parse_peripherals(form: &FormValues) -> Vec<PeripheralSelection> {
    let mut selected: BTreeMap<i32, PeripheralSelection> = BTreeMap::new();
    for (suffix, plate) in form.with_prefix("peripheral_plate_") {
        let Ok(peripheral_id) = suffix.parse::<i32>() else {
            continue;
        };
        let plate_num = normalize(plate, true);
        let serial_num = normalize(form.get(&format!("peripheral_sn_{suffix}")), true);
        if plate_num.is_empty() && serial_num.is_empty() {
            continue;
        }
        selected
            .entry(peripheral_id)
            .or_insert(PeripheralSelection {
                peripheral_id,
                plate_num,
                serial_num,
            });
    }
    selected.into_values().collect()
}

/// Writes employee, machines, devices and NEW device links for `submission`.
fn apply_inventory(
    conn: &mut PgConnection,
    submission: &CertificateSubmission,
) -> QueryResult<MachineUser> {
    let machine_user = inventory::upsert_machine_user(conn, &submission.machine_user)?;

    let new = &submission.new_device;
    inventory::upsert_machine(
        conn,
        &MachineRecord {
            serial_num: new.serial_num.clone(),
            machine_type: new.machine_type,
            mtm: None,
            model: new.model.clone(),
            plate_num: new.device_code.clone(),
            disk_size: new.disk_size.clone(),
            memory_size: new.memory_size.clone(),
            processor: None,
            profile: Some(submission.new_profile),
        },
    )?;
    inventory::upsert_device(
        conn,
        &inventory::new_device(
            &new.device_code,
            DeviceType::New,
            &new.serial_num,
            &new.hostname,
            &new.status,
            &submission.additional_software,
        ),
    )?;

    let old = &submission.old_device;
    inventory::upsert_machine(
        conn,
        &MachineRecord {
            serial_num: old.serial_num.clone(),
            machine_type: old.machine_type,
            mtm: None,
            model: old.model.clone(),
            plate_num: old.device_code.clone(),
            disk_size: old.disk_size.clone(),
            memory_size: old.memory_size.clone(),
            processor: None,
            profile: None,
        },
    )?;
    inventory::upsert_device(
        conn,
        &inventory::new_device(
            &old.device_code,
            DeviceType::Old,
            &old.serial_num,
            &old.hostname,
            &old.status,
            "",
        ),
    )?;

    inventory::replace_device_software(conn, &new.device_code, &submission.software_ids)?;
    inventory::replace_device_configuration(
        conn,
        &new.device_code,
        &submission.configuration_ids,
    )?;
    inventory::replace_device_peripherals(conn, &new.device_code, &submission.peripherals)?;

    Ok(machine_user)
}

fn notice_for(
    submission: &CertificateSubmission,
    machine_user: &MachineUser,
    token: Uuid,
) -> HandoverNotice {
    HandoverNotice {
        recipient_name: machine_user.name.clone(),
        recipient_email: machine_user.email.clone(),
        token,
        device_plate: submission.new_device.device_code.clone(),
        device_serial: submission.new_device.serial_num.clone(),
        device_model: submission.new_device.model.clone(),
    }
}

pub fn create_certificate(
    conn: &mut PgConnection,
    technician_id: Uuid,
    submission: &CertificateSubmission,
) -> Result<(Certificate, HandoverNotice), CertificateError> {
    conn.transaction(|conn| {
        let machine_user = apply_inventory(conn, submission)?;

        let new_certificate = NewCertificate {
            ticket_name: submission.ticket_name.clone(),
            app_user_id: technician_id,
            machine_user_dni: machine_user.dni.clone(),
            new_device_code: submission.new_device.device_code.clone(),
            old_device_code: submission.old_device.device_code.clone(),
            disk_c_size: submission.disk_c_size.clone(),
            disk_d_size: submission.disk_d_size.clone(),
            printer_name: submission.printer_name.clone(),
            printer_ip: submission.printer_ip.clone(),
            printer_test: submission.printer_test,
            comments: submission.comments.clone(),
            confirmation_token: Uuid::new_v4(),
            confirmation_status: CertificateStatus::Pending.as_str().to_string(),
        };

        let certificate: Certificate = diesel::insert_into(certificates::table)
            .values(&new_certificate)
            .get_result(conn)?;
        let notice = notice_for(submission, &machine_user, certificate.confirmation_token);
        Ok((certificate, notice))
    })
}

#[derive(AsChangeset)]
#[diesel(table_name = certificates, treat_none_as_null = true)]
struct CertificateChangeset<'a> {
    ticket_name: &'a str,
    machine_user_dni: &'a str,
    new_device_code: &'a str,
    old_device_code: &'a str,
    disk_c_size: &'a str,
    disk_d_size: &'a str,
    printer_name: &'a str,
    printer_ip: &'a str,
    printer_test: bool,
    comments: &'a str,
    confirmation_token: Uuid,
    confirmation_status: &'a str,
    status_changed_at: Option<NaiveDateTime>,
    updated_at: NaiveDateTime,
}

fn find_owned_for_update(
    conn: &mut PgConnection,
    technician_id: Uuid,
    certificate_id: i32,
) -> Result<Certificate, CertificateError> {
    certificates::table
        .filter(certificates::id.eq(certificate_id))
        .filter(certificates::app_user_id.eq(technician_id))
        .for_update()
        .first::<Certificate>(conn)
        .optional()?
        .ok_or(CertificateError::NotFound)
}

/// Rewrites a rejected certificate owned by `technician_id` and puts it back to
/// PENDING under a fresh token.
pub fn update_certificate(
    conn: &mut PgConnection,
    technician_id: Uuid,
    certificate_id: i32,
    submission: &CertificateSubmission,
) -> Result<(Certificate, HandoverNotice), CertificateError> {
    conn.transaction(|conn| {
        let existing = find_owned_for_update(conn, technician_id, certificate_id)?;
        let status = existing.status()?;
        if status != CertificateStatus::Rejected {
            return Err(CertificateError::NotEditable(status));
        }

        let machine_user = apply_inventory(conn, submission)?;
        let token = Uuid::new_v4();
        let changes = CertificateChangeset {
            ticket_name: &submission.ticket_name,
            machine_user_dni: &machine_user.dni,
            new_device_code: &submission.new_device.device_code,
            old_device_code: &submission.old_device.device_code,
            disk_c_size: &submission.disk_c_size,
            disk_d_size: &submission.disk_d_size,
            printer_name: &submission.printer_name,
            printer_ip: &submission.printer_ip,
            printer_test: submission.printer_test,
            comments: &submission.comments,
            confirmation_token: token,
            confirmation_status: CertificateStatus::Pending.as_str(),
            status_changed_at: None,
            updated_at: Utc::now().naive_utc(),
        };

        let certificate: Certificate = diesel::update(certificates::table.find(existing.id))
            .set(&changes)
            .get_result(conn)?;
        let notice = notice_for(submission, &machine_user, token);
        Ok((certificate, notice))
    })
}

/// The employee's answer to a confirmation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Confirm,
    Reject,
}

impl Decision {
    pub fn target_status(self) -> CertificateStatus {
        match self {
            Decision::Confirm => CertificateStatus::Confirmed,
            Decision::Reject => CertificateStatus::Rejected,
        }
    }
}

#[derive(Debug)]
pub enum ConfirmationOutcome {
    Applied(Certificate),
    AlreadyProcessed(CertificateStatus),
}

pub fn find_by_token(conn: &mut PgConnection, token: Uuid) -> QueryResult<Option<Certificate>> {
    certificates::table
        .filter(certificates::confirmation_token.eq(token))
        .first(conn)
        .optional()
}

/// Moves a PENDING certificate to the status implied by `decision`. The update is
/// conditional on the row still being PENDING, so only one caller can apply it.
pub fn transition_status(
    conn: &mut PgConnection,
    token: Uuid,
    decision: Decision,
) -> Result<ConfirmationOutcome, CertificateError> {
    let current = find_by_token(conn, token)?
        .ok_or(CertificateError::NotFound)?
        .status()?;
    if current.is_terminal() {
        return Ok(ConfirmationOutcome::AlreadyProcessed(current));
    }

    let now = Utc::now().naive_utc();
    let updated = diesel::update(
        certificates::table
            .filter(certificates::confirmation_token.eq(token))
            .filter(certificates::confirmation_status.eq(CertificateStatus::Pending.as_str())),
    )
    .set((
        certificates::confirmation_status.eq(decision.target_status().as_str()),
        certificates::status_changed_at.eq(Some(now)),
        certificates::updated_at.eq(now),
    ))
    .get_result::<Certificate>(conn)
    .optional()?;

    match updated {
        Some(certificate) => Ok(ConfirmationOutcome::Applied(certificate)),
        None => {
            let current = find_by_token(conn, token)?
                .ok_or(CertificateError::NotFound)?
                .status()?;
            Ok(ConfirmationOutcome::AlreadyProcessed(current))
        }
    }
}

/// Rebuilds the notification fields for a stored certificate.
pub fn load_notice(
    conn: &mut PgConnection,
    certificate: &Certificate,
) -> QueryResult<HandoverNotice> {
    let machine_user: MachineUser = machine_users::table
        .find(&certificate.machine_user_dni)
        .first(conn)?;
    let (_, machine) = inventory::find_device_with_machine(conn, &certificate.new_device_code)?;
    Ok(HandoverNotice {
        recipient_name: machine_user.name,
        recipient_email: machine_user.email,
        token: certificate.confirmation_token,
        device_plate: certificate.new_device_code.clone(),
        device_serial: machine.serial_num,
        device_model: machine.model,
    })
}

#[derive(Debug, Serialize)]
pub struct Technician {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct DeviceDetails {
    pub device: Device,
    pub machine: Machine,
}

#[derive(Debug, Serialize)]
pub struct CertificateDetails {
    pub id: i32,
    pub ticket_name: String,
    pub status: CertificateStatus,
    pub token: Uuid,
    pub created_at: String,
    pub status_changed_at: Option<String>,
    pub technician: Technician,
    pub machine_user: MachineUser,
    pub new_device: DeviceDetails,
    pub old_device: DeviceDetails,
    pub software: Vec<CatalogEntry>,
    pub configuration: Vec<CatalogEntry>,
    pub peripherals: Vec<PeripheralDetail>,
    pub additional_software: String,
    pub disk_c_size: String,
    pub disk_d_size: String,
    pub printer_name: String,
    pub printer_ip: String,
    pub printer_test: bool,
    pub comments: String,
}

pub fn load_details(
    conn: &mut PgConnection,
    certificate: Certificate,
    offset: &FixedOffset,
) -> Result<CertificateDetails, CertificateError> {
    let status = certificate.status()?;
    let (technician_name, technician_email): (String, String) = app_users::table
        .find(certificate.app_user_id)
        .select((app_users::name, app_users::email))
        .first(conn)?;
    let machine_user: MachineUser = machine_users::table
        .find(&certificate.machine_user_dni)
        .first(conn)?;
    let (new_device, new_machine) =
        inventory::find_device_with_machine(conn, &certificate.new_device_code)?;
    let (old_device, old_machine) =
        inventory::find_device_with_machine(conn, &certificate.old_device_code)?;
    let software = inventory::software_for_device(conn, &certificate.new_device_code)?;
    let configuration = inventory::configuration_for_device(conn, &certificate.new_device_code)?;
    let peripherals = inventory::peripherals_for_device(conn, &certificate.new_device_code)?;

    Ok(CertificateDetails {
        id: certificate.id,
        ticket_name: certificate.ticket_name,
        status,
        token: certificate.confirmation_token,
        created_at: format_local(offset, certificate.created_at, DATE_TIME_FORMAT),
        status_changed_at: certificate
            .status_changed_at
            .map(|changed| format_local(offset, changed, DATE_TIME_FORMAT)),
        technician: Technician {
            name: technician_name,
            email: technician_email,
        },
        machine_user,
        additional_software: new_device.additional_software.clone(),
        new_device: DeviceDetails {
            device: new_device,
            machine: new_machine,
        },
        old_device: DeviceDetails {
            device: old_device,
            machine: old_machine,
        },
        software,
        configuration,
        peripherals,
        disk_c_size: certificate.disk_c_size,
        disk_d_size: certificate.disk_d_size,
        printer_name: certificate.printer_name,
        printer_ip: certificate.printer_ip,
        printer_test: certificate.printer_test,
        comments: certificate.comments,
    })
}

/// Details of a certificate the technician may correct.
pub fn load_for_edit(
    conn: &mut PgConnection,
    technician_id: Uuid,
    certificate_id: i32,
    offset: &FixedOffset,
) -> Result<CertificateDetails, CertificateError> {
    let certificate: Certificate = certificates::table
        .filter(certificates::id.eq(certificate_id))
        .filter(certificates::app_user_id.eq(technician_id))
        .first(conn)
        .optional()?
        .ok_or(CertificateError::NotFound)?;
    let status = certificate.status()?;
    if status != CertificateStatus::Rejected {
        return Err(CertificateError::NotEditable(status));
    }
    load_details(conn, certificate, offset)
}

#[derive(Debug, Serialize)]
pub struct CertificateSummary {
    pub id: i32,
    pub ticket_name: String,
    pub machine_user_name: String,
    pub new_device_code: String,
    pub old_device_code: String,
    pub status: CertificateStatus,
    pub created_at: String,
}

pub fn recent_for_technician(
    conn: &mut PgConnection,
    technician_id: Uuid,
    limit: i64,
    offset: &FixedOffset,
) -> Result<Vec<CertificateSummary>, CertificateError> {
    let rows: Vec<(Certificate, String)> = certificates::table
        .inner_join(machine_users::table)
        .filter(certificates::app_user_id.eq(technician_id))
        .order((certificates::created_at.desc(), certificates::id.desc()))
        .limit(limit)
        .select((certificates::all_columns, machine_users::name))
        .load(conn)?;

    rows.into_iter()
        .map(|(certificate, machine_user_name)| {
            Ok(CertificateSummary {
                status: certificate.status()?,
                created_at: format_local(offset, certificate.created_at, DATE_TIME_FORMAT),
                id: certificate.id,
                ticket_name: certificate.ticket_name,
                machine_user_name,
                new_device_code: certificate.new_device_code,
                old_device_code: certificate.old_device_code,
            })
        })
        .collect()
}
