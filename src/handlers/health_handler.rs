use actix_web::{get, web, HttpResponse};

use crate::{app_state::AppState, models::dto::response::HealthResponse};

#[get("/health")]
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        store: state.store_name().to_string(),
    })
}

#[get("/health/live")]
pub async fn liveness() -> HttpResponse {
    HttpResponse::Ok().body("OK")
}

#[get("/health/ready")]
pub async fn readiness(state: web::Data<AppState>) -> HttpResponse {
    match state.health_check().await {
        Ok(_) => HttpResponse::Ok().json(HealthResponse {
            status: "ready".to_string(),
            store: state.store_name().to_string(),
        }),
        Err(e) => {
            log::warn!("Readiness check failed: {}", e);
            HttpResponse::ServiceUnavailable().json(HealthResponse {
                status: "unavailable".to_string(),
                store: state.store_name().to_string(),
            })
        }
    }
}
