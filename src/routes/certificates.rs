use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::catalog::{self, Catalogs};
use crate::certificates::{
    self, CertificateDetails, CertificateSubmission, ConfirmationOutcome, Decision,
};
use crate::enums::CertificateStatus;
use crate::error::{AppError, AppResult};
use crate::models::Certificate;
use crate::state::AppState;
use crate::timezone::today;
use crate::utils::form::FormValues;

#[derive(Serialize)]
pub struct CertificateFormData {
    pub technician_name: String,
    pub current_date: String,
    pub catalogs: Catalogs,
}

#[derive(Serialize)]
pub struct CertificateSaved {
    pub id: i32,
    pub ticket_name: String,
    pub new_device_code: String,
    pub old_device_code: String,
    pub status: CertificateStatus,
}

impl TryFrom<Certificate> for CertificateSaved {
    type Error = AppError;

    fn try_from(certificate: Certificate) -> Result<Self, Self::Error> {
        Ok(Self {
            status: certificate.status()?,
            id: certificate.id,
            ticket_name: certificate.ticket_name,
            new_device_code: certificate.new_device_code,
            old_device_code: certificate.old_device_code,
        })
    }
}

#[derive(Serialize)]
pub struct EditCertificateData {
    pub certificate: CertificateDetails,
    pub catalogs: Catalogs,
}

#[derive(Serialize)]
pub struct ConfirmationResponse {
    pub title: &'static str,
    pub message: String,
    pub status: CertificateStatus,
}

pub async fn new_certificate_form(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<CertificateFormData>> {
    let mut conn = state.db()?;
    let catalogs = catalog::load_all(&mut conn)?;

    Ok(Json(CertificateFormData {
        technician_name: user.name,
        current_date: today(&state.config.display_offset),
        catalogs,
    }))
}

pub async fn create_certificate(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    form: FormValues,
) -> AppResult<(StatusCode, Json<CertificateSaved>)> {
    let submission = CertificateSubmission::from_form(&form)?;

    let (certificate, notice) = {
        let mut conn = state.db()?;
        certificates::create_certificate(&mut conn, user.user_id, &submission)?
    };
    info!(
        certificate_id = certificate.id,
        technician = %user.user_id,
        new_device = %certificate.new_device_code,
        "certificate created"
    );

    state.email.dispatch_confirmation_request(notice);
    Ok((StatusCode::CREATED, Json(certificate.try_into()?)))
}

pub async fn edit_certificate_form(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(certificate_id): Path<i32>,
) -> AppResult<Json<EditCertificateData>> {
    let mut conn = state.db()?;
    let certificate = certificates::load_for_edit(
        &mut conn,
        user.user_id,
        certificate_id,
        &state.config.display_offset,
    )?;
    let catalogs = catalog::load_all(&mut conn)?;

    Ok(Json(EditCertificateData {
        certificate,
        catalogs,
    }))
}

pub async fn update_certificate(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(certificate_id): Path<i32>,
    form: FormValues,
) -> AppResult<Json<CertificateSaved>> {
    let submission = CertificateSubmission::from_form(&form)?;

    let (certificate, notice) = {
        let mut conn = state.db()?;
        certificates::update_certificate(&mut conn, user.user_id, certificate_id, &submission)?
    };
    info!(
        certificate_id = certificate.id,
        technician = %user.user_id,
        "rejected certificate resubmitted"
    );

    state.email.dispatch_confirmation_request(notice);
    Ok(Json(certificate.try_into()?))
}

fn parse_token(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::bad_request("El enlace utilizado es inválido."))
}

pub async fn confirm_certificate(
    State(state): State<AppState>,
    Path(raw_token): Path<String>,
) -> AppResult<Json<ConfirmationResponse>> {
    answer_request(&state, &raw_token, Decision::Confirm).await
}

pub async fn reject_certificate(
    State(state): State<AppState>,
    Path(raw_token): Path<String>,
) -> AppResult<Json<ConfirmationResponse>> {
    answer_request(&state, &raw_token, Decision::Reject).await
}

async fn answer_request(
    state: &AppState,
    raw_token: &str,
    decision: Decision,
) -> AppResult<Json<ConfirmationResponse>> {
    let token = parse_token(raw_token)?;
    let mut conn = state.db()?;

    let certificate = match certificates::transition_status(&mut conn, token, decision)? {
        ConfirmationOutcome::Applied(certificate) => certificate,
        ConfirmationOutcome::AlreadyProcessed(status) => {
            return Ok(Json(ConfirmationResponse {
                title: "Aviso",
                message: format!("Esta solicitud ya fue marcada como {status}."),
                status,
            }));
        }
    };
    info!(
        certificate_id = certificate.id,
        status = %certificate.confirmation_status,
        "certificate answered by employee"
    );

    match decision {
        Decision::Confirm => {
            match certificates::load_notice(&mut conn, &certificate) {
                Ok(notice) => state.email.dispatch_final_receipt(notice),
                Err(err) => error!(
                    certificate_id = certificate.id,
                    error = %err,
                    "could not load recipient for final receipt"
                ),
            }
            Ok(Json(ConfirmationResponse {
                title: "¡Gracias!",
                message: "Tu conformidad ha sido registrada con éxito.".to_string(),
                status: CertificateStatus::Confirmed,
            }))
        }
        Decision::Reject => Ok(Json(ConfirmationResponse {
            title: "Procesado",
            message: "Tu observación ha sido registrada.".to_string(),
            status: CertificateStatus::Rejected,
        })),
    }
}

pub async fn view_certificate(
    State(state): State<AppState>,
    Path(raw_token): Path<String>,
) -> AppResult<Json<CertificateDetails>> {
    let token = parse_token(&raw_token)?;
    let mut conn = state.db()?;
    let certificate = certificates::find_by_token(&mut conn, token)?.ok_or_else(|| {
        AppError::new(StatusCode::NOT_FOUND, "El certificado no fue encontrado.")
    })?;

    let details = certificates::load_details(&mut conn, certificate, &state.config.display_offset)?;
    Ok(Json(details))
}
