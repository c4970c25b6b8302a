//! Certificate notifications: the confirmation request sent after a certificate is
//! issued, and the receipt sent once the employee confirms it.
//!
//! Delivery is best-effort. Emails are sent on a detached task and failures only
//! reach the logs.

use std::sync::Arc;

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::mailer::{Mailer, OutgoingEmail};
use crate::utils::html::escape;

/// Fields of a handover that appear in both notifications.
#[derive(Debug, Clone)]
pub struct HandoverNotice {
    pub recipient_name: String,
    pub recipient_email: String,
    pub token: Uuid,
    pub device_plate: String,
    pub device_serial: String,
    pub device_model: String,
}

#[derive(Clone)]
pub struct EmailService {
    mailer: Arc<dyn Mailer>,
    base_url: String,
}

impl EmailService {
    pub fn new(mailer: Arc<dyn Mailer>, base_url: impl Into<String>) -> Self {
        Self {
            mailer,
            base_url: base_url.into(),
        }
    }

    pub fn view_url(&self, token: Uuid) -> String {
        format!("{}/certificate/view/{token}", self.base_url)
    }

    pub fn confirm_url(&self, token: Uuid) -> String {
        format!("{}/confirm/{token}", self.base_url)
    }

    pub fn reject_url(&self, token: Uuid) -> String {
        format!("{}/reject/{token}", self.base_url)
    }

    pub fn confirmation_request(&self, notice: &HandoverNotice) -> OutgoingEmail {
        let html_body = format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <title>Confirmación de Asignación de Equipo</title>
</head>
<body style="font-family: Arial, sans-serif;">
    <h2>Confirmación de Asignación de Equipo</h2>
    <p>Hola {name},</p>
    <p>Se ha registrado una nueva asignación de equipo a tu nombre. Por favor, revisa los detalles y confirma o rechaza la conformidad.</p>
    <ul>
        <li><strong>Modelo:</strong> {model}</li>
        <li><strong>N/S:</strong> {serial}</li>
        <li><strong>Placa:</strong> {plate}</li>
    </ul>
    <p><a href="{view_url}" style="padding: 10px 15px; background-color: #007bff; color: white; text-decoration: none; border-radius: 5px;">Ver Acta de Asignación</a></p>
    <p>Para aceptar, por favor haz clic en el siguiente enlace:</p>
    <p><a href="{confirm_url}" style="padding: 10px 15px; background-color: #28a745; color: white; text-decoration: none; border-radius: 5px;">Confirmar Asignación</a></p>
    <p>Si no reconoces esta actividad o deseas rechazarla, haz clic aquí:</p>
    <p><a href="{reject_url}" style="padding: 10px 15px; background-color: #dc3545; color: white; text-decoration: none; border-radius: 5px;">Observar Asignación</a></p>
    <p>Gracias,<br>El equipo de Renovación Tecnológica</p>
</body>
</html>
"#,
            name = escape(&notice.recipient_name),
            model = escape(&notice.device_model),
            serial = escape(&notice.device_serial),
            plate = escape(&notice.device_plate),
            view_url = escape(&self.view_url(notice.token)),
            confirm_url = escape(&self.confirm_url(notice.token)),
            reject_url = escape(&self.reject_url(notice.token)),
        );

        OutgoingEmail {
            to: notice.recipient_email.clone(),
            subject: format!(
                "Por favor, confirma la asignación del equipo (Código: {})",
                notice.device_plate
            ),
            html_body,
        }
    }

    pub fn final_receipt(&self, notice: &HandoverNotice) -> OutgoingEmail {
        let html_body = format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <title>Acta de Asignación Confirmada</title>
</head>
<body style="font-family: Arial, sans-serif;">
    <h2>Acta de Asignación Confirmada</h2>
    <p>Hola {name},</p>
    <p>Tu conformidad para la asignación del siguiente equipo ha sido registrada con éxito:</p>
    <ul>
        <li><strong>Modelo:</strong> {model}</li>
        <li><strong>N/S:</strong> {serial}</li>
        <li><strong>Placa:</strong> {plate}</li>
        <li><strong>Firma digital:</strong> {signature}</li>
    </ul>
    <p>Puedes ver una copia del acta en cualquier momento haciendo clic en el siguiente enlace:</p>
    <p><a href="{view_url}" style="padding: 10px 15px; background-color: #007bff; color: white; text-decoration: none; border-radius: 5px;">Ver Acta de Conformidad</a></p>
    <p>Gracias,<br>El equipo de Renovación Tecnológica</p>
</body>
</html>
"#,
            name = escape(&notice.recipient_name),
            model = escape(&notice.device_model),
            serial = escape(&notice.device_serial),
            plate = escape(&notice.device_plate),
            signature = notice.token,
            view_url = escape(&self.view_url(notice.token)),
        );

        OutgoingEmail {
            to: notice.recipient_email.clone(),
            subject: format!(
                "Acta de conformidad registrada para equipo: {}",
                notice.device_plate
            ),
            html_body,
        }
    }

    pub fn dispatch_confirmation_request(&self, notice: HandoverNotice) {
        let email = self.confirmation_request(&notice);
        self.dispatch("confirmation-request", email);
    }

    pub fn dispatch_final_receipt(&self, notice: HandoverNotice) {
        let email = self.final_receipt(&notice);
        self.dispatch("final-receipt", email);
    }

    fn dispatch(&self, kind: &'static str, email: OutgoingEmail) {
        if email.to.trim().is_empty() {
            warn!(kind, "recipient has no email address, notification skipped");
            return;
        }

        let mailer = self.mailer.clone();
        tokio::spawn(async move {
            let to = email.to.clone();
            match mailer.send(email).await {
                Ok(()) => info!(kind, %to, "notification email sent"),
                Err(err) => error!(kind, %to, error = ?err, "failed to send notification email"),
            }
        });
    }
}
