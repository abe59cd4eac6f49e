use chrono::Utc;
use rocket::{serde::json::Json, Route};

use crate::model::api::response::{HealthStatus, Success};

pub fn routes() -> Vec<Route> {
    routes![health]
}

/// Liveness check. Does not touch the store.
#[get("/health")]
fn health() -> Json<Success<HealthStatus>> {
    Json(Success::new(HealthStatus {
        status: "OK".to_string(),
        timestamp: Utc::now(),
    }))
}
