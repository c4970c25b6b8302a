use std::collections::HashMap;

use chrono::{FixedOffset, NaiveDate};
use diesel::{prelude::*, PgConnection};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::inventory::{self, PeripheralDetail};
use crate::models::{Certificate, Device, Machine, MachineUser};
use crate::schema::{app_users, certificates, devices, machine_users, machines};
use crate::timezone::localize;

const HEADER: [&str; 37] = [
    "ID Certificado",
    "Ticket",
    "Estado",
    "Fecha Creación",
    "Técnico",
    "Email Técnico",
    "DNI Usuario",
    "Cod. Personal Usuario",
    "Nombre Usuario",
    "Email Usuario",
    "Sociedad",
    "Sede",
    "Área",
    "Piso",
    "Cod. Equipo Nuevo",
    "Hostname Nuevo",
    "Estado Nuevo",
    "Serial Nuevo",
    "Tipo Nuevo",
    "Modelo Nuevo",
    "Disco Nuevo",
    "RAM Nueva",
    "Perfil Nuevo",
    "Cod. Equipo Antiguo",
    "Hostname Antiguo",
    "Serial Antiguo",
    "Tipo Antiguo",
    "Modelo Antiguo",
    "Software",
    "Configuración",
    "Periféricos",
    "Tamaño Disco C",
    "Tamaño Disco D",
    "Impresora",
    "IP Impresora",
    "Test Impresión OK",
    "Comentarios",
];

pub fn report_file_name(date: NaiveDate) -> String {
    format!("reporte_certificados_{}.csv", date.format("%Y%m%d"))
}

fn or_empty<T>(item: Option<&T>, pick: impl FnOnce(&T) -> &String) -> String {
    item.map(pick).cloned().unwrap_or_default()
}

fn describe_peripherals(peripherals: &[PeripheralDetail]) -> String {
    peripherals
        .iter()
        .map(|peripheral| {
            format!(
                "{} (Placa: {}, S/N: {})",
                peripheral.name, peripheral.plate_num, peripheral.serial_num
            )
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Renders every certificate, oldest first, as CSV with a header row.
pub fn build_certificate_report(
    conn: &mut PgConnection,
    offset: &FixedOffset,
) -> AppResult<Vec<u8>> {
    let certificate_rows: Vec<Certificate> =
        certificates::table.order(certificates::id.asc()).load(conn)?;

    let technicians: HashMap<Uuid, (String, String)> = app_users::table
        .select((app_users::id, app_users::name, app_users::email))
        .load::<(Uuid, String, String)>(conn)?
        .into_iter()
        .map(|(id, name, email)| (id, (name, email)))
        .collect();

    let dnis: Vec<&String> = certificate_rows
        .iter()
        .map(|certificate| &certificate.machine_user_dni)
        .collect();
    let employees: HashMap<String, MachineUser> = machine_users::table
        .filter(machine_users::dni.eq_any(dnis))
        .load::<MachineUser>(conn)?
        .into_iter()
        .map(|user| (user.dni.clone(), user))
        .collect();

    let device_codes: Vec<String> = certificate_rows
        .iter()
        .flat_map(|certificate| {
            [
                certificate.new_device_code.clone(),
                certificate.old_device_code.clone(),
            ]
        })
        .collect();
    let hardware: HashMap<String, (Device, Machine)> = devices::table
        .inner_join(machines::table)
        .filter(devices::device_code.eq_any(&device_codes))
        .select((devices::all_columns, machines::all_columns))
        .load::<(Device, Machine)>(conn)?
        .into_iter()
        .map(|(device, machine)| (device.device_code.clone(), (device, machine)))
        .collect();

    let software = inventory::software_names_by_device(conn, &device_codes)?;
    let configuration = inventory::configuration_names_by_device(conn, &device_codes)?;
    let peripherals = inventory::peripherals_by_device(conn, &device_codes)?;

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(HEADER)?;

    for certificate in &certificate_rows {
        let (technician_name, technician_email) = technicians
            .get(&certificate.app_user_id)
            .map(|(name, email)| (name.as_str(), email.as_str()))
            .unwrap_or(("", ""));
        let employee = employees.get(&certificate.machine_user_dni);
        let new_hw = hardware.get(&certificate.new_device_code);
        let old_hw = hardware.get(&certificate.old_device_code);

        let record: Vec<String> = vec![
            certificate.id.to_string(),
            certificate.ticket_name.clone(),
            certificate.confirmation_status.clone(),
            localize(offset, certificate.created_at).to_rfc3339(),
            technician_name.to_string(),
            technician_email.to_string(),
            certificate.machine_user_dni.clone(),
            or_empty(employee, |user| &user.personal_code),
            or_empty(employee, |user| &user.name),
            or_empty(employee, |user| &user.email),
            or_empty(employee, |user| &user.society),
            or_empty(employee, |user| &user.site),
            or_empty(employee, |user| &user.area),
            or_empty(employee, |user| &user.floor_name),
            certificate.new_device_code.clone(),
            or_empty(new_hw, |(device, _)| &device.hostname),
            or_empty(new_hw, |(device, _)| &device.status),
            or_empty(new_hw, |(_, machine)| &machine.serial_num),
            or_empty(new_hw, |(_, machine)| &machine.machine_type),
            or_empty(new_hw, |(_, machine)| &machine.model),
            or_empty(new_hw, |(_, machine)| &machine.disk_size),
            or_empty(new_hw, |(_, machine)| &machine.memory_size),
            or_empty(new_hw, |(_, machine)| &machine.profile),
            certificate.old_device_code.clone(),
            or_empty(old_hw, |(device, _)| &device.hostname),
            or_empty(old_hw, |(_, machine)| &machine.serial_num),
            or_empty(old_hw, |(_, machine)| &machine.machine_type),
            or_empty(old_hw, |(_, machine)| &machine.model),
            software
                .get(&certificate.new_device_code)
                .map(|names| names.join(", "))
                .unwrap_or_default(),
            configuration
                .get(&certificate.new_device_code)
                .map(|names| names.join(", "))
                .unwrap_or_default(),
            peripherals
                .get(&certificate.new_device_code)
                .map(|list| describe_peripherals(list))
                .unwrap_or_default(),
            certificate.disk_c_size.clone(),
            certificate.disk_d_size.clone(),
            certificate.printer_name.clone(),
            certificate.printer_ip.clone(),
            certificate.printer_test.to_string(),
            certificate.comments.clone(),
        ];
        writer.write_record(&record)?;
    }

    writer
        .into_inner()
        .map_err(|err| AppError::internal(format!("failed to finish report: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_uses_compact_date() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 9).unwrap();
        assert_eq!(report_file_name(date), "reporte_certificados_20250609.csv");
    }

    #[test]
    fn peripherals_are_listed_with_plate_and_serial() {
        let list = vec![
            PeripheralDetail {
                peripheral_id: 1,
                name: "Monitor".to_string(),
                plate_num: "P-1".to_string(),
                serial_num: "".to_string(),
            },
            PeripheralDetail {
                peripheral_id: 2,
                name: "Teclado".to_string(),
                plate_num: "".to_string(),
                serial_num: "KB9".to_string(),
            },
        ];
        assert_eq!(
            describe_peripherals(&list),
            "Monitor (Placa: P-1, S/N: ); Teclado (Placa: , S/N: KB9)"
        );
    }

    #[test]
    fn header_has_one_column_per_field() {
        assert_eq!(HEADER.len(), 37);
        assert_eq!(HEADER[0], "ID Certificado");
        assert_eq!(HEADER[36], "Comentarios");
    }
}
