use actix_web::{get, post, put, web, HttpResponse};

use crate::{
    app_state::AppState,
    auth::AuthenticatedUser,
    errors::AppError,
    models::dto::{request::UpdateProgressRequest, response::EnrollmentDto},
};

#[post("/courses/{course_id}/enroll")]
pub async fn enroll(
    state: web::Data<AppState>,
    course_id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let enrollment = state.progress_service.enroll(&auth.0.sub, &course_id).await?;
    Ok(HttpResponse::Ok().json(EnrollmentDto::from(enrollment)))
}

#[get("/enrollments/{enrollment_id}/progress")]
pub async fn get_course_progress(
    state: web::Data<AppState>,
    enrollment_id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let progress = state
        .progress_service
        .get_course_progress(&auth.0.sub, &enrollment_id)
        .await?;
    Ok(HttpResponse::Ok().json(progress))
}

#[put("/enrollments/{enrollment_id}/topics/{topic_id}/progress")]
pub async fn update_progress(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
    request: web::Json<UpdateProgressRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let (enrollment_id, topic_id) = path.into_inner();
    let progress = state
        .progress_service
        .update_progress(&auth.0.sub, &enrollment_id, &topic_id, request.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(progress))
}
