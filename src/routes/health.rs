use axum::{extract::State, Json};
use diesel::connection::SimpleConnection;
use serde_json::{json, Value};

use crate::error::AppResult;
use crate::state::AppState;

/// Reports `ok` once a pooled connection answers a trivial query.
pub async fn health_check(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let mut conn = state.db()?;
    conn.batch_execute("SELECT 1")?;
    Ok(Json(json!({ "status": "ok" })))
}
