use actix_web::{get, web, HttpResponse};

use crate::{
    app_state::AppState,
    auth::AuthenticatedUser,
    errors::AppError,
    models::dto::response::{CertificateDto, VerifyCertificateResponse},
};

#[get("/certificates/mine")]
pub async fn my_certificates(
    state: web::Data<AppState>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let certificates: Vec<CertificateDto> = state
        .certificate_service
        .list_mine(&auth.0.sub)
        .await?
        .into_iter()
        .map(CertificateDto::from)
        .collect();
    Ok(HttpResponse::Ok().json(certificates))
}

/// Public lookup by certificate number.
#[get("/certificates/verify/{number}")]
pub async fn verify_certificate(
    state: web::Data<AppState>,
    number: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let certificate = state
        .certificate_service
        .verify(&number)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Certificate '{}' not found", number)))?;
    Ok(HttpResponse::Ok().json(VerifyCertificateResponse::from(certificate)))
}
