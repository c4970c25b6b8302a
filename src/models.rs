use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::enums::{CertificateStatus, Role, UnknownVariant};
use crate::schema::*;

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = app_users)]
pub struct AppUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub dni: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl AppUser {
    pub fn role(&self) -> Result<Role, UnknownVariant> {
        self.role.parse()
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = app_users)]
pub struct NewAppUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub dni: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = app_sessions)]
pub struct NewAppSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = machine_users, primary_key(dni))]
pub struct MachineUser {
    pub dni: String,
    pub personal_code: String,
    pub name: String,
    pub email: String,
    pub society: String,
    pub site: String,
    pub area: String,
    pub floor_name: String,
    #[serde(skip)]
    pub created_at: NaiveDateTime,
    #[serde(skip)]
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Insertable)]
#[diesel(table_name = machine_users)]
pub struct NewMachineUser {
    pub dni: String,
    pub personal_code: String,
    pub name: String,
    pub email: String,
    pub society: String,
    pub site: String,
    pub area: String,
    pub floor_name: String,
}

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = machines, primary_key(serial_num))]
pub struct Machine {
    pub serial_num: String,
    pub machine_type: String,
    pub mtm: String,
    pub model: String,
    pub plate_num: String,
    pub disk_size: String,
    pub memory_size: String,
    pub processor: String,
    pub profile: String,
    #[serde(skip)]
    pub created_at: NaiveDateTime,
    #[serde(skip)]
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = devices, primary_key(device_code))]
pub struct Device {
    pub device_code: String,
    pub device_type: String,
    pub machine_serial_num: String,
    pub hostname: String,
    pub status: String,
    pub additional_software: String,
    #[serde(skip)]
    pub created_at: NaiveDateTime,
    #[serde(skip)]
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = devices)]
pub struct NewDevice {
    pub device_code: String,
    pub device_type: String,
    pub machine_serial_num: String,
    pub hostname: String,
    pub status: String,
    pub additional_software: String,
}

/// A row of one of the reference catalogs: software, peripherals or configuration items.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Serialize)]
pub struct CatalogEntry {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = device_software)]
pub struct NewDeviceSoftware<'a> {
    pub device_code: &'a str,
    pub software_id: i32,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = device_configuration)]
pub struct NewDeviceConfiguration<'a> {
    pub device_code: &'a str,
    pub item_id: i32,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = device_peripherals)]
pub struct NewDevicePeripheral<'a> {
    pub device_code: &'a str,
    pub peripheral_id: i32,
    pub plate_num: &'a str,
    pub serial_num: &'a str,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = certificates)]
pub struct Certificate {
    pub id: i32,
    pub ticket_name: String,
    pub app_user_id: Uuid,
    pub machine_user_dni: String,
    pub new_device_code: String,
    pub old_device_code: String,
    pub disk_c_size: String,
    pub disk_d_size: String,
    pub printer_name: String,
    pub printer_ip: String,
    pub printer_test: bool,
    pub comments: String,
    pub confirmation_token: Uuid,
    pub confirmation_status: String,
    pub status_changed_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Certificate {
    pub fn status(&self) -> Result<CertificateStatus, UnknownVariant> {
        self.confirmation_status.parse()
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = certificates)]
pub struct NewCertificate {
    pub ticket_name: String,
    pub app_user_id: Uuid,
    pub machine_user_dni: String,
    pub new_device_code: String,
    pub old_device_code: String,
    pub disk_c_size: String,
    pub disk_d_size: String,
    pub printer_name: String,
    pub printer_ip: String,
    pub printer_test: bool,
    pub comments: String,
    pub confirmation_token: Uuid,
    pub confirmation_status: String,
}
