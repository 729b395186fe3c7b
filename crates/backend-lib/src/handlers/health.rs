use axum::Json;
use serde::Serialize;

pub const SERVICE_NAME: &str = "pushrelay";

#[derive(Debug, Serialize)]
pub struct Health {
    pub ok: bool,
    pub name: &'static str,
    pub version: &'static str,
}

/// Liveness check
pub async fn health() -> Json<Health> {
    Json(Health {
        ok: true,
        name: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
    })
}
