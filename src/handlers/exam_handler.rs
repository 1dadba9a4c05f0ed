use actix_web::{get, post, put, web, HttpResponse};
use chrono::Utc;

use crate::{
    app_state::AppState,
    auth::AuthenticatedUser,
    errors::AppError,
    models::dto::{
        request::ExamAnswersRequest,
        response::{CertificateDto, ExamResponse},
    },
};

#[post("/courses/{course_id}/exams")]
pub async fn schedule_exam(
    state: web::Data<AppState>,
    course_id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let exam = state.exam_service.schedule(&auth.0.sub, &course_id).await?;
    Ok(HttpResponse::Created().json(ExamResponse::from(&exam)))
}

#[get("/courses/{course_id}/exams/current")]
pub async fn current_exam(
    state: web::Data<AppState>,
    course_id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let exam = state.exam_service.current(&auth.0.sub, &course_id).await?;
    Ok(HttpResponse::Ok().json(exam.as_ref().map(ExamResponse::from)))
}

#[get("/courses/{course_id}/exams/history")]
pub async fn exam_history(
    state: web::Data<AppState>,
    course_id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let now = Utc::now();
    let exams: Vec<ExamResponse> = state
        .exam_service
        .history(&auth.0.sub, &course_id)
        .await?
        .iter()
        .map(|exam| ExamResponse::at(exam, now))
        .collect();
    Ok(HttpResponse::Ok().json(exams))
}

#[post("/exams/{exam_id}/start")]
pub async fn start_exam(
    state: web::Data<AppState>,
    exam_id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let exam = state.exam_service.start(&auth.0.sub, &exam_id).await?;
    Ok(HttpResponse::Ok().json(ExamResponse::from(&exam)))
}

/// Autosave; answers are merged into the ones already stored.
#[put("/exams/{exam_id}/answers")]
pub async fn save_answers(
    state: web::Data<AppState>,
    exam_id: web::Path<String>,
    request: web::Json<ExamAnswersRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let answers = request.answers()?;
    let exam = state
        .exam_service
        .save_answers(&auth.0.sub, &exam_id, answers)
        .await?;
    Ok(HttpResponse::Ok().json(ExamResponse::from(&exam)))
}

#[get("/exams/{exam_id}/tick")]
pub async fn tick(
    state: web::Data<AppState>,
    exam_id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let tick = state.exam_service.tick(&auth.0.sub, &exam_id).await?;
    Ok(HttpResponse::Ok().json(tick))
}

#[post("/exams/{exam_id}/submit")]
pub async fn submit_exam(
    state: web::Data<AppState>,
    exam_id: web::Path<String>,
    request: web::Json<ExamAnswersRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let answers = request.answers()?;
    let response = state
        .exam_service
        .submit(&auth.0.sub, &exam_id, answers)
        .await?;
    Ok(HttpResponse::Ok().json(response))
}

#[post("/exams/{exam_id}/certificate")]
pub async fn generate_certificate(
    state: web::Data<AppState>,
    exam_id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let certificate = state
        .certificate_service
        .generate(&auth.0.sub, &exam_id)
        .await?;
    Ok(HttpResponse::Ok().json(CertificateDto::from(certificate)))
}
