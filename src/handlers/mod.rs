pub mod certificate_handler;
pub mod content_handler;
pub mod exam_handler;
pub mod graphql_handler;
pub mod health_handler;
pub mod progress_handler;
pub mod quiz_handler;

use actix_web::web;

use crate::auth::AuthMiddleware;

/// Public routes at the root, everything learner- or admin-facing under
/// an authenticated `/api` scope.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health_handler::health_check)
        .service(health_handler::liveness)
        .service(health_handler::readiness)
        .service(certificate_handler::verify_certificate)
        .service(graphql_handler::graphql)
        .service(
            web::scope("/api")
                .wrap(AuthMiddleware)
                .service(progress_handler::enroll)
                .service(progress_handler::get_course_progress)
                .service(progress_handler::update_progress)
                .service(quiz_handler::get_quiz_for_taking)
                .service(quiz_handler::check_answer)
                .service(quiz_handler::submit_quiz)
                .service(quiz_handler::get_quiz_attempt)
                .service(exam_handler::schedule_exam)
                .service(exam_handler::current_exam)
                .service(exam_handler::exam_history)
                .service(exam_handler::start_exam)
                .service(exam_handler::save_answers)
                .service(exam_handler::tick)
                .service(exam_handler::submit_exam)
                .service(exam_handler::generate_certificate)
                .service(certificate_handler::my_certificates)
                .service(content_handler::publish_course)
                .service(content_handler::get_content_schema),
        );
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test, web, App};
    use serde_json::{json, Value};

    use super::configure;
    use crate::{
        auth::Role,
        graphql::create_schema,
        test_utils::test_helpers::{assert_error_status, assert_success_status, bearer, seeded_state},
    };

    macro_rules! test_app {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new($state.clone()))
                    .app_data(web::Data::from($state.jwt_service.clone()))
                    .app_data(web::Data::new(create_schema($state.clone())))
                    .configure(configure),
            )
            .await
        };
    }

    #[actix_rt::test]
    async fn test_health_reports_store() {
        let (state, _) = seeded_state(1, 0).await;
        let app = test_app!(state);

        let body: Value =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/health").to_request())
                .await;
        assert_eq!(body["store"], "memory");

        let resp = test::call_service(&app, test::TestRequest::get().uri("/health/ready").to_request()).await;
        assert_success_status(resp.status());
    }

    #[actix_rt::test]
    async fn test_api_requires_bearer_token() {
        let (state, published) = seeded_state(1, 0).await;
        let app = test_app!(state);

        let req = test::TestRequest::post()
            .uri(&format!("/api/courses/{}/enroll", published.course_id))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["kind"], "UNAUTHORIZED");
    }

    #[actix_rt::test]
    async fn test_enroll_and_progress_over_rest() {
        let (state, published) = seeded_state(2, 0).await;
        let token = bearer(&state, "learner-1", Role::Learner);
        let app = test_app!(state);

        let req = test::TestRequest::post()
            .uri(&format!("/api/courses/{}/enroll", published.course_id))
            .insert_header(("Authorization", token.as_str()))
            .to_request();
        let enrollment: Value = test::call_and_read_body_json(&app, req).await;
        let enrollment_id = enrollment["id"].as_str().unwrap().to_string();

        let locked = test::TestRequest::put()
            .uri(&format!(
                "/api/enrollments/{}/topics/{}/progress",
                enrollment_id, published.topics[1].id
            ))
            .insert_header(("Authorization", token.as_str()))
            .set_json(json!({ "video_watched": true }))
            .to_request();
        let resp = test::call_service(&app, locked).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["kind"], "LOCKED");
        assert_eq!(body["retryable"], false);

        let watch = test::TestRequest::put()
            .uri(&format!(
                "/api/enrollments/{}/topics/{}/progress",
                enrollment_id, published.topics[0].id
            ))
            .insert_header(("Authorization", token.as_str()))
            .set_json(json!({ "video_progress": 100 }))
            .to_request();
        let progress: Value = test::call_and_read_body_json(&app, watch).await;
        assert_eq!(progress["topics"][0]["video_watched"], true);
        assert_eq!(progress["topics"][0]["status"], "available");

        let quiz = test::TestRequest::get()
            .uri(&format!("/api/topics/{}/quiz", published.topics[0].id))
            .insert_header(("Authorization", token.as_str()))
            .to_request();
        let quiz: Value = test::call_and_read_body_json(&app, quiz).await;
        assert_eq!(quiz["mode"], "TAKING");
    }

    #[actix_rt::test]
    async fn test_publishing_requires_admin() {
        let (state, _) = seeded_state(1, 0).await;
        let learner = bearer(&state, "learner-1", Role::Learner);
        let admin = bearer(&state, "admin-1", Role::Admin);
        let app = test_app!(state);
        let payload = crate::test_utils::fixtures::course_content(2, 3);

        let req = test::TestRequest::post()
            .uri("/api/admin/courses")
            .insert_header(("Authorization", learner.as_str()))
            .set_json(&payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::post()
            .uri("/api/admin/courses")
            .insert_header(("Authorization", admin.as_str()))
            .set_json(&payload)
            .to_request();
        let published: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(published["exam_question_count"], 3);
        assert_eq!(published["topics"].as_array().map(Vec::len), Some(2));
    }

    #[actix_rt::test]
    async fn test_certificate_verification_is_public() {
        let (state, _) = seeded_state(1, 0).await;
        let app = test_app!(state);

        let req = test::TestRequest::get()
            .uri("/certificates/verify/CERT-20260101-ABCDEF12")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::get()
            .uri("/certificates/verify/not-a-number")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_error_status(resp.status());
    }

    #[actix_rt::test]
    async fn test_graphql_reads_claims_from_bearer_token() {
        let (state, published) = seeded_state(1, 0).await;
        let token = bearer(&state, "learner-1", Role::Learner);
        let app = test_app!(state);
        let mutation = json!({
            "query": format!(
                "mutation {{ enroll(courseId: \"{}\") {{ id userId progress }} }}",
                published.course_id
            )
        });

        let anonymous = test::TestRequest::post()
            .uri("/graphql")
            .set_json(&mutation)
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, anonymous).await;
        assert_eq!(body["errors"][0]["extensions"]["code"], "UNAUTHORIZED");

        let signed_in = test::TestRequest::post()
            .uri("/graphql")
            .insert_header(("Authorization", token.as_str()))
            .set_json(&mutation)
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, signed_in).await;
        assert_eq!(body["data"]["enroll"]["userId"], "learner-1");
        assert_eq!(body["data"]["enroll"]["progress"], 0);
    }
}
