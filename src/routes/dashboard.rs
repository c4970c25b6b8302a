use axum::{extract::State, Json};
use diesel::{dsl::count_star, prelude::*};
use serde::Serialize;

use crate::auth::AuthenticatedUser;
use crate::certificates::{self, CertificateSummary};
use crate::enums::{CertificateStatus, Role};
use crate::error::AppResult;
use crate::schema::{app_users, certificates as certificates_table, machine_users, machines};
use crate::state::AppState;

const RECENT_LIMIT: i64 = 10;

#[derive(Serialize, Default)]
pub struct DashboardStats {
    pub total_certificates: i64,
    pub pending_certificates: i64,
    pub confirmed_certificates: i64,
    pub rejected_certificates: i64,
    pub machine_users: i64,
    pub machines: i64,
    pub technicians: i64,
}

#[derive(Serialize)]
pub struct DashboardResponse {
    pub user: AuthenticatedUser,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<DashboardStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recent_certificates: Option<Vec<CertificateSummary>>,
}

fn load_stats(conn: &mut PgConnection) -> QueryResult<DashboardStats> {
    let by_status: Vec<(String, i64)> = certificates_table::table
        .group_by(certificates_table::confirmation_status)
        .select((certificates_table::confirmation_status, count_star()))
        .load(conn)?;

    let mut stats = DashboardStats::default();
    for (status, count) in by_status {
        stats.total_certificates += count;
        match status.parse::<CertificateStatus>() {
            Ok(CertificateStatus::Pending) => stats.pending_certificates = count,
            Ok(CertificateStatus::Confirmed) => stats.confirmed_certificates = count,
            Ok(CertificateStatus::Rejected) => stats.rejected_certificates = count,
            Err(_) => {}
        }
    }

    stats.machine_users = machine_users::table.select(count_star()).first(conn)?;
    stats.machines = machines::table.select(count_star()).first(conn)?;
    stats.technicians = app_users::table
        .filter(app_users::role.eq(Role::Technician.as_str()))
        .select(count_star())
        .first(conn)?;
    Ok(stats)
}

pub async fn dashboard(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<DashboardResponse>> {
    let mut conn = state.db()?;

    let response = match user.role {
        Role::Admin => DashboardResponse {
            stats: Some(load_stats(&mut conn)?),
            recent_certificates: None,
            user,
        },
        Role::Technician => DashboardResponse {
            recent_certificates: Some(certificates::recent_for_technician(
                &mut conn,
                user.user_id,
                RECENT_LIMIT,
                &state.config.display_offset,
            )?),
            stats: None,
            user,
        },
    };

    Ok(Json(response))
}
