use actix_web::{get, post, web, HttpResponse};

use crate::{
    app_state::AppState,
    auth::AuthenticatedUser,
    errors::AppError,
    models::dto::request::{CheckAnswerRequest, SubmitQuizRequest},
};

#[get("/topics/{topic_id}/quiz")]
pub async fn get_quiz_for_taking(
    state: web::Data<AppState>,
    topic_id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let quiz = state
        .quiz_service
        .get_quiz_for_taking(&auth.0.sub, &topic_id)
        .await?;
    Ok(HttpResponse::Ok().json(quiz))
}

#[post("/topics/{topic_id}/quiz/check")]
pub async fn check_answer(
    state: web::Data<AppState>,
    topic_id: web::Path<String>,
    request: web::Json<CheckAnswerRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let feedback = state
        .quiz_service
        .check_answer(&auth.0.sub, &topic_id, request.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(feedback))
}

#[post("/topics/{topic_id}/quiz/submit")]
pub async fn submit_quiz(
    state: web::Data<AppState>,
    topic_id: web::Path<String>,
    request: web::Json<SubmitQuizRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let result = state
        .quiz_service
        .submit_quiz(&auth.0.sub, &topic_id, request.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(result))
}

#[get("/topics/{topic_id}/quiz/attempt")]
pub async fn get_quiz_attempt(
    state: web::Data<AppState>,
    topic_id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let lookup = state
        .quiz_service
        .get_quiz_attempt(&auth.0.sub, &topic_id)
        .await?;
    Ok(HttpResponse::Ok().json(lookup))
}
