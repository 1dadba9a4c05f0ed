use std::sync::Arc;

use validator::Validate;

use crate::{
    engine::scoring,
    errors::{AppError, AppResult},
    models::{
        domain::{Quiz, QuizAttempt},
        dto::{
            request::{CheckAnswerRequest, SubmitQuizRequest},
            response::{QuestionFeedbackDto, QuizAttemptLookup, QuizForTaking, QuizResultResponse},
        },
    },
    repositories::{QuizAttemptRepository, QuizRepository},
    services::progress_service::{ProgressContext, ProgressService},
};

pub struct QuizService {
    quizzes: Arc<dyn QuizRepository>,
    attempts: Arc<dyn QuizAttemptRepository>,
    progress: Arc<ProgressService>,
}

impl QuizService {
    pub fn new(
        quizzes: Arc<dyn QuizRepository>,
        attempts: Arc<dyn QuizAttemptRepository>,
        progress: Arc<ProgressService>,
    ) -> Self {
        Self {
            quizzes,
            attempts,
            progress,
        }
    }

    /// The quiz of an unlocked topic. Once the topic is completed, or an
    /// attempt is on record, the quiz comes back in review mode with the
    /// answer key.
    pub async fn get_quiz_for_taking(&self, user_id: &str, topic_id: &str) -> AppResult<QuizForTaking> {
        let context = self.progress.topic_context(user_id, topic_id).await?;
        let quiz = self.quiz_for_topic(topic_id).await?;

        if let Some(attempt) = self.attempts.find_by_user_and_topic(user_id, topic_id).await? {
            let result = QuizResultResponse::from_attempt(&quiz, &attempt);
            return Ok(QuizForTaking::review(&quiz, Some(result)));
        }
        if is_completed(&context, topic_id) {
            return Ok(QuizForTaking::review(&quiz, None));
        }

        ensure_video_watched(&context, topic_id)?;
        Ok(QuizForTaking::taking(&quiz))
    }

    /// Immediate per-question feedback while taking the quiz.
    pub async fn check_answer(
        &self,
        user_id: &str,
        topic_id: &str,
        request: CheckAnswerRequest,
    ) -> AppResult<QuestionFeedbackDto> {
        request.validate()?;
        let context = self.progress.topic_context(user_id, topic_id).await?;
        let quiz = self.quiz_for_topic(topic_id).await?;

        if is_completed(&context, topic_id)
            || self.attempts.find_by_user_and_topic(user_id, topic_id).await?.is_some()
        {
            return Err(AppError::InvalidState(
                "This quiz has been passed and is in review mode".to_string(),
            ));
        }
        ensure_video_watched(&context, topic_id)?;

        let question = quiz.question(&request.question_id).ok_or_else(|| {
            AppError::ValidationError(format!("Unknown question id '{}'", request.question_id))
        })?;
        if question.options.is_malformed() {
            return Err(malformed_question(&quiz, &question.id));
        }
        if !question.options.contains_index(request.option_index) {
            return Err(AppError::ValidationError(format!(
                "Answer {} is outside the {} options of question '{}'",
                request.option_index,
                question.options.len(),
                question.id
            )));
        }

        Ok(scoring::feedback_for(question, Some(request.option_index)).into())
    }

    /// Grades a full set of answers. Only a passing result is stored, and it
    /// completes the topic; a failing result is returned unrecorded so the
    /// learner can retry.
    pub async fn submit_quiz(
        &self,
        user_id: &str,
        topic_id: &str,
        request: SubmitQuizRequest,
    ) -> AppResult<QuizResultResponse> {
        request.validate()?;
        let answers = request.answers()?;

        let context = self.progress.topic_context(user_id, topic_id).await?;
        let quiz = self.quiz_for_topic(topic_id).await?;

        if request.quiz_id.as_deref().is_some_and(|id| id != quiz.id) {
            return Err(AppError::ValidationError(format!(
                "Quiz '{}' does not belong to topic '{}'",
                request.quiz_id.as_deref().unwrap_or_default(),
                topic_id
            )));
        }
        if request
            .enrollment_id
            .as_deref()
            .is_some_and(|id| id != context.enrollment.id)
        {
            return Err(AppError::Forbidden(
                "Enrollment does not match the learner and course".to_string(),
            ));
        }

        if self.attempts.find_by_user_and_topic(user_id, topic_id).await?.is_some() {
            // the attempt is durable; make sure the completion it implies is too
            if !is_completed(&context, topic_id) {
                self.progress
                    .mark_topic_completed(&context.enrollment, topic_id)
                    .await?;
            }
            log::warn!(
                "Rejected duplicate quiz submission by user {} for topic {}",
                user_id,
                topic_id
            );
            return Err(AppError::InvalidState(
                "This quiz has already been passed".to_string(),
            ));
        }

        ensure_video_watched(&context, topic_id)?;
        ensure_gradable(&quiz)?;
        scoring::validate_complete_answers(&quiz.questions, &answers)?;

        let (card, feedback) = scoring::grade(&quiz.questions, &answers, quiz.passing_score);
        let mut result = QuizResultResponse::graded(&quiz, &card, feedback);

        if !card.passed {
            log::info!(
                "User {} scored {} on quiz {} (needs {}), not recorded",
                user_id,
                card.score,
                quiz.id,
                quiz.passing_score
            );
            return Ok(result);
        }

        let attempt = QuizAttempt::new(
            user_id,
            &context.enrollment.id,
            &quiz.id,
            topic_id,
            answers,
            &card,
        );

        match self.attempts.create(attempt).await {
            Ok(stored) => {
                result.recorded = true;
                result.completed_at = Some(stored.completed_at);
            }
            // a concurrent submit stored first; answer with its result
            Err(AppError::AlreadyExists(_)) => {
                let existing = self
                    .attempts
                    .find_by_user_and_topic(user_id, topic_id)
                    .await?
                    .ok_or_else(|| {
                        AppError::InternalError("Quiz attempt vanished after conflict".to_string())
                    })?;
                result = QuizResultResponse::from_attempt(&quiz, &existing);
            }
            Err(e) => return Err(e),
        }

        self.progress
            .mark_topic_completed(&context.enrollment, topic_id)
            .await?;
        log::info!(
            "User {} passed quiz {} with {}",
            user_id,
            quiz.id,
            result.score
        );
        Ok(result)
    }

    pub async fn get_quiz_attempt(&self, user_id: &str, topic_id: &str) -> AppResult<QuizAttemptLookup> {
        let Some(attempt) = self.attempts.find_by_user_and_topic(user_id, topic_id).await? else {
            return Ok(QuizAttemptLookup {
                found: false,
                attempt: None,
            });
        };

        let quiz = match self.quizzes.find_by_id(&attempt.quiz_id).await? {
            Some(quiz) => quiz,
            None => self.quiz_for_topic(topic_id).await?,
        };

        Ok(QuizAttemptLookup {
            found: true,
            attempt: Some(QuizResultResponse::from_attempt(&quiz, &attempt)),
        })
    }

    async fn quiz_for_topic(&self, topic_id: &str) -> AppResult<Quiz> {
        self.quizzes
            .find_by_topic(topic_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Topic '{}' has no quiz", topic_id)))
    }
}

fn is_completed(context: &ProgressContext, topic_id: &str) -> bool {
    context
        .progress_of(topic_id)
        .map(|p| p.is_completed)
        .unwrap_or(false)
}

/// Stored questions whose options could not be read make the quiz
/// ungradable; that is a data problem, not a learner error.
fn ensure_gradable(quiz: &Quiz) -> AppResult<()> {
    match quiz.questions.iter().find(|q| q.options.is_malformed()) {
        Some(question) => Err(malformed_question(quiz, &question.id)),
        None => Ok(()),
    }
}

fn malformed_question(quiz: &Quiz, question_id: &str) -> AppError {
    log::error!(
        "Quiz {} question {} has malformed stored options",
        quiz.id,
        question_id
    );
    AppError::InternalError(format!(
        "Quiz '{}' cannot be graded: question '{}' has corrupt options",
        quiz.id, question_id
    ))
}

fn ensure_video_watched(context: &ProgressContext, topic_id: &str) -> AppResult<()> {
    let watched = context
        .progress_of(topic_id)
        .map(|p| p.video_watched)
        .unwrap_or(false);

    if watched {
        Ok(())
    } else {
        Err(AppError::Locked(
            "Watch the topic video before taking its quiz".to_string(),
        ))
    }
}
