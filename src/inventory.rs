//! Create-or-update operations for employees, machines and devices, keyed by their
//! natural identifiers, plus the device association sets.

use std::collections::HashMap;

use chrono::{NaiveDateTime, Utc};
use diesel::{prelude::*, upsert::excluded, PgConnection};
use serde::Serialize;

use crate::enums::{DeviceType, MachineProfile, MachineType};
use crate::models::{
    CatalogEntry, Device, Machine, MachineUser, NewDevice, NewDeviceConfiguration,
    NewDevicePeripheral, NewDeviceSoftware, NewMachineUser,
};
use crate::schema::{
    configuration_items, device_configuration, device_peripherals, device_software, devices,
    machine_users, machines, peripherals, software,
};

/// Values for a machine upsert. `None` fields are written on insert with their column
/// default and left untouched when the machine already exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineRecord {
    pub serial_num: String,
    pub machine_type: MachineType,
    pub mtm: Option<String>,
    pub model: String,
    pub plate_num: String,
    pub disk_size: String,
    pub memory_size: String,
    pub processor: Option<String>,
    pub profile: Option<MachineProfile>,
}

#[derive(AsChangeset)]
#[diesel(table_name = machines)]
struct MachineChangeset<'a> {
    machine_type: &'a str,
    mtm: Option<&'a str>,
    model: &'a str,
    plate_num: &'a str,
    disk_size: &'a str,
    memory_size: &'a str,
    processor: Option<&'a str>,
    profile: Option<&'a str>,
    updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeripheralSelection {
    pub peripheral_id: i32,
    pub plate_num: String,
    pub serial_num: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Serialize)]
pub struct PeripheralDetail {
    pub peripheral_id: i32,
    pub name: String,
    pub plate_num: String,
    pub serial_num: String,
}

pub fn upsert_machine_user(
    conn: &mut PgConnection,
    user: &NewMachineUser,
) -> QueryResult<MachineUser> {
    diesel::insert_into(machine_users::table)
        .values(user)
        .on_conflict(machine_users::dni)
        .do_update()
        .set((
            machine_users::personal_code.eq(excluded(machine_users::personal_code)),
            machine_users::name.eq(excluded(machine_users::name)),
            machine_users::email.eq(excluded(machine_users::email)),
            machine_users::society.eq(excluded(machine_users::society)),
            machine_users::site.eq(excluded(machine_users::site)),
            machine_users::area.eq(excluded(machine_users::area)),
            machine_users::floor_name.eq(excluded(machine_users::floor_name)),
            machine_users::updated_at.eq(Utc::now().naive_utc()),
        ))
        .get_result(conn)
}

pub fn upsert_machine(conn: &mut PgConnection, record: &MachineRecord) -> QueryResult<Machine> {
    let profile = record.profile.map(MachineProfile::as_str);
    let changeset = MachineChangeset {
        machine_type: record.machine_type.as_str(),
        mtm: record.mtm.as_deref(),
        model: &record.model,
        plate_num: &record.plate_num,
        disk_size: &record.disk_size,
        memory_size: &record.memory_size,
        processor: record.processor.as_deref(),
        profile,
        updated_at: Utc::now().naive_utc(),
    };

    diesel::insert_into(machines::table)
        .values((
            machines::serial_num.eq(&record.serial_num),
            machines::machine_type.eq(record.machine_type.as_str()),
            machines::mtm.eq(record.mtm.as_deref().unwrap_or("")),
            machines::model.eq(&record.model),
            machines::plate_num.eq(&record.plate_num),
            machines::disk_size.eq(&record.disk_size),
            machines::memory_size.eq(&record.memory_size),
            machines::processor.eq(record.processor.as_deref().unwrap_or("")),
            machines::profile.eq(profile.unwrap_or(MachineProfile::Regular.as_str())),
        ))
        .on_conflict(machines::serial_num)
        .do_update()
        .set(&changeset)
        .get_result(conn)
}

pub fn upsert_device(conn: &mut PgConnection, device: &NewDevice) -> QueryResult<Device> {
    diesel::insert_into(devices::table)
        .values(device)
        .on_conflict(devices::device_code)
        .do_update()
        .set((
            devices::device_type.eq(excluded(devices::device_type)),
            devices::machine_serial_num.eq(excluded(devices::machine_serial_num)),
            devices::hostname.eq(excluded(devices::hostname)),
            devices::status.eq(excluded(devices::status)),
            devices::additional_software.eq(excluded(devices::additional_software)),
            devices::updated_at.eq(Utc::now().naive_utc()),
        ))
        .get_result(conn)
}

pub fn new_device(
    device_code: &str,
    device_type: DeviceType,
    machine_serial_num: &str,
    hostname: &str,
    status: &str,
    additional_software: &str,
) -> NewDevice {
    NewDevice {
        device_code: device_code.to_string(),
        device_type: device_type.as_str().to_string(),
        machine_serial_num: machine_serial_num.to_string(),
        hostname: hostname.to_string(),
        status: status.to_string(),
        additional_software: additional_software.to_string(),
    }
}

/// Clears the software links of `device_code` and inserts `software_ids`.
pub fn replace_device_software(
    conn: &mut PgConnection,
    device_code: &str,
    software_ids: &[i32],
) -> QueryResult<usize> {
    diesel::delete(device_software::table.filter(device_software::device_code.eq(device_code)))
        .execute(conn)?;
    if software_ids.is_empty() {
        return Ok(0);
    }

    let rows: Vec<NewDeviceSoftware<'_>> = software_ids
        .iter()
        .map(|software_id| NewDeviceSoftware {
            device_code,
            software_id: *software_id,
        })
        .collect();
    diesel::insert_into(device_software::table)
        .values(&rows)
        .on_conflict_do_nothing()
        .execute(conn)
}

pub fn replace_device_configuration(
    conn: &mut PgConnection,
    device_code: &str,
    item_ids: &[i32],
) -> QueryResult<usize> {
    diesel::delete(
        device_configuration::table.filter(device_configuration::device_code.eq(device_code)),
    )
    .execute(conn)?;
    if item_ids.is_empty() {
        return Ok(0);
    }

    let rows: Vec<NewDeviceConfiguration<'_>> = item_ids
        .iter()
        .map(|item_id| NewDeviceConfiguration {
            device_code,
            item_id: *item_id,
        })
        .collect();
    diesel::insert_into(device_configuration::table)
        .values(&rows)
        .on_conflict_do_nothing()
        .execute(conn)
}

pub fn replace_device_peripherals(
    conn: &mut PgConnection,
    device_code: &str,
    selections: &[PeripheralSelection],
) -> QueryResult<usize> {
    diesel::delete(device_peripherals::table.filter(device_peripherals::device_code.eq(device_code)))
        .execute(conn)?;
    if selections.is_empty() {
        return Ok(0);
    }

    let rows: Vec<NewDevicePeripheral<'_>> = selections
        .iter()
        .map(|selection| NewDevicePeripheral {
            device_code,
            peripheral_id: selection.peripheral_id,
            plate_num: &selection.plate_num,
            serial_num: &selection.serial_num,
        })
        .collect();
    diesel::insert_into(device_peripherals::table)
        .values(&rows)
        .on_conflict_do_nothing()
        .execute(conn)
}

pub fn find_machine_user(conn: &mut PgConnection, dni: &str) -> QueryResult<Option<MachineUser>> {
    machine_users::table.find(dni).first(conn).optional()
}

pub fn find_machine(conn: &mut PgConnection, serial_num: &str) -> QueryResult<Option<Machine>> {
    machines::table.find(serial_num).first(conn).optional()
}

/// Loads a device together with the machine it points at.
pub fn find_device_with_machine(
    conn: &mut PgConnection,
    device_code: &str,
) -> QueryResult<(Device, Machine)> {
    devices::table
        .inner_join(machines::table)
        .filter(devices::device_code.eq(device_code))
        .select((devices::all_columns, machines::all_columns))
        .first(conn)
}

pub fn software_for_device(
    conn: &mut PgConnection,
    device_code: &str,
) -> QueryResult<Vec<CatalogEntry>> {
    device_software::table
        .inner_join(software::table)
        .filter(device_software::device_code.eq(device_code))
        .select((software::id, software::name))
        .order(software::name.asc())
        .load(conn)
}

pub fn configuration_for_device(
    conn: &mut PgConnection,
    device_code: &str,
) -> QueryResult<Vec<CatalogEntry>> {
    device_configuration::table
        .inner_join(configuration_items::table)
        .filter(device_configuration::device_code.eq(device_code))
        .select((configuration_items::id, configuration_items::name))
        .order(configuration_items::name.asc())
        .load(conn)
}

pub fn peripherals_for_device(
    conn: &mut PgConnection,
    device_code: &str,
) -> QueryResult<Vec<PeripheralDetail>> {
    device_peripherals::table
        .inner_join(peripherals::table)
        .filter(device_peripherals::device_code.eq(device_code))
        .select((
            device_peripherals::peripheral_id,
            peripherals::name,
            device_peripherals::plate_num,
            device_peripherals::serial_num,
        ))
        .order(peripherals::name.asc())
        .load(conn)
}

/// Software names grouped by device code, for every code in `device_codes`.
pub fn software_names_by_device(
    conn: &mut PgConnection,
    device_codes: &[String],
) -> QueryResult<HashMap<String, Vec<String>>> {
    let rows: Vec<(String, String)> = device_software::table
        .inner_join(software::table)
        .filter(device_software::device_code.eq_any(device_codes))
        .select((device_software::device_code, software::name))
        .order((device_software::device_code.asc(), software::name.asc()))
        .load(conn)?;
    Ok(group_pairs(rows))
}

pub fn configuration_names_by_device(
    conn: &mut PgConnection,
    device_codes: &[String],
) -> QueryResult<HashMap<String, Vec<String>>> {
    let rows: Vec<(String, String)> = device_configuration::table
        .inner_join(configuration_items::table)
        .filter(device_configuration::device_code.eq_any(device_codes))
        .select((device_configuration::device_code, configuration_items::name))
        .order((
            device_configuration::device_code.asc(),
            configuration_items::name.asc(),
        ))
        .load(conn)?;
    Ok(group_pairs(rows))
}

pub fn peripherals_by_device(
    conn: &mut PgConnection,
    device_codes: &[String],
) -> QueryResult<HashMap<String, Vec<PeripheralDetail>>> {
    let rows: Vec<(String, i32, String, String, String)> = device_peripherals::table
        .inner_join(peripherals::table)
        .filter(device_peripherals::device_code.eq_any(device_codes))
        .select((
            device_peripherals::device_code,
            device_peripherals::peripheral_id,
            peripherals::name,
            device_peripherals::plate_num,
            device_peripherals::serial_num,
        ))
        .order((device_peripherals::device_code.asc(), peripherals::name.asc()))
        .load(conn)?;

    let mut grouped: HashMap<String, Vec<PeripheralDetail>> = HashMap::new();
    for (device_code, peripheral_id, name, plate_num, serial_num) in rows {
        grouped.entry(device_code).or_default().push(PeripheralDetail {
            peripheral_id,
            name,
            plate_num,
            serial_num,
        });
    }
    Ok(grouped)
}

fn group_pairs(rows: Vec<(String, String)>) -> HashMap<String, Vec<String>> {
    let mut grouped: HashMap<String, Vec<String>> = HashMap::new();
    for (key, value) in rows {
        grouped.entry(key).or_default().push(value);
    }
    grouped
}
