use actix_web::{get, post, web, HttpResponse};

use crate::{
    app_state::AppState,
    auth::{require_admin, AuthenticatedUser},
    errors::AppError,
    models::dto::request::CourseContentRequest,
    services::content_service,
};

#[post("/admin/courses")]
pub async fn publish_course(
    state: web::Data<AppState>,
    request: web::Json<CourseContentRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    require_admin(&auth.0)?;

    let response = state
        .content_service
        .publish_course(request.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(response))
}

#[get("/content/schema")]
pub async fn get_content_schema(_auth: AuthenticatedUser) -> HttpResponse {
    HttpResponse::Ok().json(content_service::content_schema())
}
