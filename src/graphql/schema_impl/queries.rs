use async_graphql::{Context, Object};
use chrono::Utc;

use crate::{
    graphql::helpers::{app_state, authenticated, GraphQLResultExt},
    models::dto::response::{
        CertificateDto, CourseProgressResponse, ExamResponse, ExamTickResponse,
        QuizAttemptLookup, QuizForTaking, VerifyCertificateResponse,
    },
};

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    async fn course_progress(
        &self,
        ctx: &Context<'_>,
        enrollment_id: String,
    ) -> async_graphql::Result<CourseProgressResponse> {
        let (state, claims) = authenticated(ctx)?;

        state
            .progress_service
            .get_course_progress(&claims.sub, &enrollment_id)
            .await
            .gql()
    }

    async fn quiz_for_taking(
        &self,
        ctx: &Context<'_>,
        topic_id: String,
    ) -> async_graphql::Result<QuizForTaking> {
        let (state, claims) = authenticated(ctx)?;

        state
            .quiz_service
            .get_quiz_for_taking(&claims.sub, &topic_id)
            .await
            .gql()
    }

    async fn quiz_attempt(
        &self,
        ctx: &Context<'_>,
        topic_id: String,
    ) -> async_graphql::Result<QuizAttemptLookup> {
        let (state, claims) = authenticated(ctx)?;

        state
            .quiz_service
            .get_quiz_attempt(&claims.sub, &topic_id)
            .await
            .gql()
    }

    async fn current_exam(
        &self,
        ctx: &Context<'_>,
        course_id: String,
    ) -> async_graphql::Result<Option<ExamResponse>> {
        let (state, claims) = authenticated(ctx)?;

        let exam = state
            .exam_service
            .current(&claims.sub, &course_id)
            .await
            .gql()?;
        Ok(exam.as_ref().map(ExamResponse::from))
    }

    async fn exam_history(
        &self,
        ctx: &Context<'_>,
        course_id: String,
    ) -> async_graphql::Result<Vec<ExamResponse>> {
        let (state, claims) = authenticated(ctx)?;

        let now = Utc::now();
        let exams = state
            .exam_service
            .history(&claims.sub, &course_id)
            .await
            .gql()?;
        Ok(exams.iter().map(|exam| ExamResponse::at(exam, now)).collect())
    }

    async fn exam_tick(
        &self,
        ctx: &Context<'_>,
        exam_id: String,
    ) -> async_graphql::Result<ExamTickResponse> {
        let (state, claims) = authenticated(ctx)?;

        state.exam_service.tick(&claims.sub, &exam_id).await.gql()
    }

    async fn my_certificates(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<CertificateDto>> {
        let (state, claims) = authenticated(ctx)?;

        let certificates = state
            .certificate_service
            .list_mine(&claims.sub)
            .await
            .gql()?;
        Ok(certificates.into_iter().map(CertificateDto::from).collect())
    }

    /// Public; `null` when no certificate carries the number.
    async fn verify_certificate(
        &self,
        ctx: &Context<'_>,
        certificate_number: String,
    ) -> async_graphql::Result<Option<VerifyCertificateResponse>> {
        let state = app_state(ctx)?;

        let certificate = state
            .certificate_service
            .verify(&certificate_number)
            .await
            .gql()?;
        Ok(certificate.map(VerifyCertificateResponse::from))
    }
}
