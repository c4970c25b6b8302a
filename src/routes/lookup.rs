use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::error::AppResult;
use crate::inventory;
use crate::models::{Machine, MachineUser};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct MachineUserQuery {
    #[serde(default)]
    pub machine_user_dni: String,
}

#[derive(Deserialize)]
pub struct MachineQuery {
    #[serde(default)]
    pub new_device_serial: String,
}

fn strip_spaces(value: &str) -> String {
    value.replace(' ', "")
}

pub async fn find_machine_user(
    State(state): State<AppState>,
    Query(query): Query<MachineUserQuery>,
) -> AppResult<Json<Option<MachineUser>>> {
    let dni = strip_spaces(&query.machine_user_dni);
    if dni.is_empty() {
        return Ok(Json(None));
    }

    let mut conn = state.db()?;
    Ok(Json(inventory::find_machine_user(&mut conn, &dni)?))
}

pub async fn find_machine(
    State(state): State<AppState>,
    Query(query): Query<MachineQuery>,
) -> AppResult<Json<Option<Machine>>> {
    let serial = strip_spaces(&query.new_device_serial).to_uppercase();
    if serial.is_empty() {
        return Ok(Json(None));
    }

    let mut conn = state.db()?;
    Ok(Json(inventory::find_machine(&mut conn, &serial)?))
}
