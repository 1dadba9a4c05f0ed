use async_graphql::{Context, Object};

use crate::{
    auth::require_admin,
    graphql::helpers::{authenticated, GraphQLResultExt},
    models::dto::{
        request::{
            CheckAnswerRequest, CourseContentRequest, ExamAnswersRequest, SubmitQuizRequest,
            UpdateProgressRequest,
        },
        response::{
            CertificateDto, CourseProgressResponse, EnrollmentDto, ExamResponse,
            PublishedCourseResponse, QuestionFeedbackDto, QuizResultResponse, SubmitExamResponse,
        },
    },
};

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    async fn enroll(&self, ctx: &Context<'_>, course_id: String) -> async_graphql::Result<EnrollmentDto> {
        let (state, claims) = authenticated(ctx)?;

        let enrollment = state
            .progress_service
            .enroll(&claims.sub, &course_id)
            .await
            .gql()?;
        Ok(enrollment.into())
    }

    async fn update_progress(
        &self,
        ctx: &Context<'_>,
        enrollment_id: String,
        topic_id: String,
        input: UpdateProgressRequest,
    ) -> async_graphql::Result<CourseProgressResponse> {
        let (state, claims) = authenticated(ctx)?;

        state
            .progress_service
            .update_progress(&claims.sub, &enrollment_id, &topic_id, input)
            .await
            .gql()
    }

    async fn check_answer(
        &self,
        ctx: &Context<'_>,
        topic_id: String,
        input: CheckAnswerRequest,
    ) -> async_graphql::Result<QuestionFeedbackDto> {
        let (state, claims) = authenticated(ctx)?;

        state
            .quiz_service
            .check_answer(&claims.sub, &topic_id, input)
            .await
            .gql()
    }

    async fn submit_quiz(
        &self,
        ctx: &Context<'_>,
        topic_id: String,
        input: SubmitQuizRequest,
    ) -> async_graphql::Result<QuizResultResponse> {
        let (state, claims) = authenticated(ctx)?;

        state
            .quiz_service
            .submit_quiz(&claims.sub, &topic_id, input)
            .await
            .gql()
    }

    async fn schedule_exam(&self, ctx: &Context<'_>, course_id: String) -> async_graphql::Result<ExamResponse> {
        let (state, claims) = authenticated(ctx)?;

        let exam = state
            .exam_service
            .schedule(&claims.sub, &course_id)
            .await
            .gql()?;
        Ok(ExamResponse::from(&exam))
    }

    async fn start_exam(&self, ctx: &Context<'_>, exam_id: String) -> async_graphql::Result<ExamResponse> {
        let (state, claims) = authenticated(ctx)?;

        let exam = state
            .exam_service
            .start(&claims.sub, &exam_id)
            .await
            .gql()?;
        Ok(ExamResponse::from(&exam))
    }

    async fn save_exam_answers(
        &self,
        ctx: &Context<'_>,
        exam_id: String,
        input: ExamAnswersRequest,
    ) -> async_graphql::Result<ExamResponse> {
        let (state, claims) = authenticated(ctx)?;

        let answers = input.answers().gql()?;
        let exam = state
            .exam_service
            .save_answers(&claims.sub, &exam_id, answers)
            .await
            .gql()?;
        Ok(ExamResponse::from(&exam))
    }

    async fn submit_exam(
        &self,
        ctx: &Context<'_>,
        exam_id: String,
        input: Option<ExamAnswersRequest>,
    ) -> async_graphql::Result<SubmitExamResponse> {
        let (state, claims) = authenticated(ctx)?;

        let answers = input.unwrap_or_default().answers().gql()?;
        state
            .exam_service
            .submit(&claims.sub, &exam_id, answers)
            .await
            .gql()
    }

    async fn generate_certificate(
        &self,
        ctx: &Context<'_>,
        exam_id: String,
    ) -> async_graphql::Result<CertificateDto> {
        let (state, claims) = authenticated(ctx)?;

        let certificate = state
            .certificate_service
            .generate(&claims.sub, &exam_id)
            .await
            .gql()?;
        Ok(certificate.into())
    }

    async fn publish_course(
        &self,
        ctx: &Context<'_>,
        input: CourseContentRequest,
    ) -> async_graphql::Result<PublishedCourseResponse> {
        let (state, claims) = authenticated(ctx)?;
        require_admin(&claims).gql()?;

        state.content_service.publish_course(input).await.gql()
    }
}
