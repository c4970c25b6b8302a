mod common;

use anyhow::Result;
use axum::http::{header, StatusCode};
use common::{acquire_db_lock, body_to_vec, read_json, TestApp};
use diesel::prelude::*;
use handover::enums::Role;
use handover::schema::{machine_users, machines};
use serde_json::Value;

const ADMIN_EMAIL: &str = "admin@example.com";
const ADMIN_PASSWORD: &str = "admin-pw";

async fn admin_session(app: &TestApp) -> Result<String> {
    app.insert_user(ADMIN_EMAIL, ADMIN_PASSWORD, Role::Admin)
        .await?;
    app.login_cookie(ADMIN_EMAIL, ADMIN_PASSWORD).await
}

#[tokio::test]
async fn catalog_entries_are_unique_and_named() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let cookie = admin_session(&app).await?;

    let response = app
        .post_form("/admin/software", &[("name", "  Office 365 ")], Some(&cookie))
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let entry: Value = read_json(response).await?;
    assert_eq!(entry["name"], "Office 365");

    let response = app
        .post_form("/admin/software", &[("name", "Office 365")], Some(&cookie))
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .post_form("/admin/peripherals", &[("name", "   ")], Some(&cookie))
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .post_form("/admin/peripherals", &[("name", "Monitor")], Some(&cookie))
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .post_form("/admin/config-items", &[("name", "VPN")], Some(&cookie))
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app.get("/admin", Some(&cookie)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let overview: Value = read_json(response).await?;
    assert_eq!(overview["users"][0]["email"], ADMIN_EMAIL);
    assert_eq!(overview["software"][0]["name"], "Office 365");
    assert_eq!(overview["peripherals"][0]["name"], "Monitor");
    assert_eq!(overview["configuration_items"][0]["name"], "VPN");

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn admins_create_technician_accounts() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let cookie = admin_session(&app).await?;

    let fields = [
        ("name", "Luis Paz"),
        ("email", " Luis@Example.com "),
        ("password", "tech-pw"),
        ("role", "TECNICO"),
        ("dni", "70000001"),
    ];
    let response = app.post_form("/admin/users", &fields, Some(&cookie)).await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let user: Value = read_json(response).await?;
    assert_eq!(user["role"], "TECNICO");
    assert_eq!(user["email"], "luis@example.com");
    assert!(user.get("password_hash").is_none());

    let response = app.post_form("/admin/users", &fields, Some(&cookie)).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = read_json(response).await?;
    assert_eq!(body["error"], "email already registered");

    let response = app
        .post_form(
            "/admin/users",
            &[
                ("name", "Otro"),
                ("email", "otro@example.com"),
                ("password", "pw"),
                ("role", "SUPERVISOR"),
            ],
            Some(&cookie),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = read_json(response).await?;
    assert_eq!(body["error"], "Invalid role specified");

    let technician_cookie = app.login_cookie("LUIS@example.com", "tech-pw").await?;
    let response = app.get("/api/auth/me", Some(&technician_cookie)).await?;
    let me: Value = read_json(response).await?;
    assert_eq!(me["name"], "Luis Paz");

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn machine_user_import_counts_skipped_rows() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let cookie = admin_session(&app).await?;

    let csv = "Sociedad,Codigo,DNI,Nombre,Sede,Correo,Extra,Area,Piso\n\
               ALICORP,P001,11111111,Ana Rojas,LIMA,Ana@Example.com,,TI,3\n\
               ALICORP,P002,22222222,Luis Paz,LIMA,no-es-correo,,TI,3\n\
               ALICORP,P003,33333333,Sin Columnas\n\
               ALICORP,P004,44444444,Eva Diaz,AREQUIPA,eva@example.com,,RRHH,1\n";
    let response = app
        .upload_csv("/admin/upload/machine-users", csv.as_bytes(), &cookie)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let summary: Value = read_json(response).await?;
    assert_eq!(summary["processed"], 2);
    assert_eq!(summary["skipped"], 2);

    let email: String = app
        .with_conn(|conn| {
            Ok(machine_users::table
                .find("11111111")
                .select(machine_users::email)
                .first(conn)?)
        })
        .await?;
    assert_eq!(email, "ana@example.com");

    let response = app
        .upload_csv(
            "/admin/upload/machine-users",
            b"Sociedad,Codigo,DNI,Nombre,Sede,Correo,Extra,Area,Piso\n",
            &cookie,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = read_json(response).await?;
    assert_eq!(body["error"], "CSV file is empty or has only a header.");

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn machine_import_normalizes_serials() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let cookie = admin_session(&app).await?;

    let csv = "Serie,Tipo,MTM,Modelo,Placa,Disco,Memoria,Procesador,Perfil\n\
               pf 3a 9x,laptop,20W0,ThinkPad T14,PLT-1,512GB,16GB,i7,especial 2\n\
               PF4B,tablet,20W0,Tab,PLT-2,64GB,4GB,arm,REGULAR\n";
    let response = app
        .upload_csv("/admin/upload/machines", csv.as_bytes(), &cookie)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let summary: Value = read_json(response).await?;
    assert_eq!(summary["processed"], 1);
    assert_eq!(summary["skipped"], 1);

    let (machine_type, profile, processor): (String, String, String) = app
        .with_conn(|conn| {
            Ok(machines::table
                .find("PF3A9X")
                .select((machines::machine_type, machines::profile, machines::processor))
                .first(conn)?)
        })
        .await?;
    assert_eq!(machine_type, "LAPTOP");
    assert_eq!(profile, "ESPECIAL 2");
    assert_eq!(processor, "i7");

    let response = app.get("/dashboard", Some(&cookie)).await?;
    let dashboard: Value = read_json(response).await?;
    assert_eq!(dashboard["stats"]["machines"], 1);
    assert!(dashboard.get("recent_certificates").is_none());

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn report_lists_issued_certificates() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let admin_cookie = admin_session(&app).await?;
    app.insert_user("tecnico@example.com", "pw", Role::Technician)
        .await?;
    let technician_cookie = app.login_cookie("tecnico@example.com", "pw").await?;

    let response = app
        .post_form(
            "/certificates/new",
            &[
                ("ticket_name", "REQ-7"),
                ("machine_user_dni", "55555555"),
                ("machine_user_name", "Rosa Leon"),
                ("machine_user_email", "rosa@example.com"),
                ("new_device_code", "pc-10"),
                ("new_device_serial", "sn-10"),
                ("new_device_type", "PC"),
                ("new_device_model", "OptiPlex 7090"),
                ("old_device_code", "pc-09"),
                ("old_device_serial", "sn-09"),
                ("old_device_type", "PC"),
                ("comments", "entrega, con cargador"),
            ],
            Some(&technician_cookie),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app.get("/admin/report/download", Some(&admin_cookie)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).map(|v| v.to_str().ok()),
        Some(Some("text/csv"))
    );
    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .expect("content disposition")
        .to_str()?
        .to_string();
    assert!(disposition.starts_with("attachment; filename=reporte_certificados_"));
    assert!(disposition.ends_with(".csv"));

    let body = body_to_vec(response.into_body()).await?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(body.as_slice());
    let rows = reader.records().collect::<Result<Vec<_>, _>>()?;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get(0), Some("ID Certificado"));
    assert_eq!(rows[0].len(), 37);
    assert_eq!(rows[1].len(), 37);
    assert!(rows[1].iter().any(|value| value == "REQ-7"));
    assert!(rows[1].iter().any(|value| value == "PC-10"));
    assert!(rows[1].iter().any(|value| value == "entrega, con cargador"));

    let response = app.get("/dashboard", Some(&admin_cookie)).await?;
    let dashboard: Value = read_json(response).await?;
    assert_eq!(dashboard["stats"]["total_certificates"], 1);
    assert_eq!(dashboard["stats"]["pending_certificates"], 1);
    assert_eq!(dashboard["stats"]["technicians"], 1);

    app.cleanup().await?;
    Ok(())
}
