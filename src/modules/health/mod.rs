use actix_web::{get, web};
use std::time::Instant;

use crate::api::success;

/// Moment the process started serving, shared with every worker.
#[derive(Debug, Clone, Copy)]
pub struct StartedAt(pub Instant);

impl StartedAt {
    pub fn now() -> Self {
        Self(Instant::now())
    }
}

#[derive(serde::Serialize)]
pub struct HealthResponse {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Seconds since startup
    pub uptime: f64,
}

#[get("/health")]
pub async fn health_check(started_at: web::Data<StartedAt>) -> success::Success<HealthResponse> {
    let response =
        HealthResponse { timestamp: chrono::Utc::now(), uptime: started_at.0.elapsed().as_secs_f64() };
    success::Success::ok(Some(response)).message("API is healthy")
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health_check);
}
