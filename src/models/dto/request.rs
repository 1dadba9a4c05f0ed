use async_graphql::InputObject;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::engine::scoring::Answers;
use crate::errors::{AppError, AppResult};

#[derive(Debug, Clone, Deserialize, Serialize, Validate, InputObject, JsonSchema)]
pub struct QuizQuestionInput {
    #[validate(length(min = 1, max = 64))]
    pub id: String,

    #[validate(length(min = 1, max = 2000))]
    pub question: String,

    #[validate(length(min = 2, max = 6, message = "A question needs between 2 and 6 options"))]
    pub options: Vec<String>,

    pub correct_answer: i32,

    #[validate(length(max = 4000))]
    pub explanation: Option<String>,

    pub order: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, InputObject, JsonSchema)]
pub struct QuizInput {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,

    #[validate(range(min = 0, max = 100))]
    pub passing_score: i16,

    #[validate(length(min = 1, message = "A quiz needs at least one question"), nested)]
    pub questions: Vec<QuizQuestionInput>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, InputObject, JsonSchema)]
pub struct TopicInput {
    /// Existing topic id when republishing; omitted for new topics.
    pub id: Option<String>,

    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[validate(url)]
    pub video_url: Option<String>,

    pub sequence: i32,

    #[validate(nested)]
    pub quiz: Option<QuizInput>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, InputObject, JsonSchema)]
pub struct ExamQuestionInput {
    #[validate(length(min = 1, max = 2000))]
    pub question: String,

    #[validate(length(min = 2, max = 6, message = "A question needs between 2 and 6 options"))]
    pub options: Vec<String>,

    pub correct_answer: i32,

    #[validate(length(max = 4000))]
    pub explanation: Option<String>,
}

/// Course payload produced by the external content generator or an admin.
#[derive(Debug, Clone, Deserialize, Serialize, Validate, InputObject, JsonSchema)]
pub struct CourseContentRequest {
    /// Present when replacing the content of an already published course.
    pub course_id: Option<String>,

    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[validate(length(max = 4000))]
    pub description: Option<String>,

    #[validate(length(min = 1, message = "A course needs at least one topic"), nested)]
    pub topics: Vec<TopicInput>,

    #[serde(default)]
    #[graphql(default)]
    #[validate(nested)]
    pub exam_questions: Vec<ExamQuestionInput>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate, InputObject, JsonSchema)]
pub struct UpdateProgressRequest {
    pub video_watched: Option<bool>,

    #[validate(range(min = 0, max = 100))]
    pub video_progress: Option<i16>,

    pub is_completed: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Serialize, InputObject, JsonSchema)]
pub struct AnswerInput {
    pub question_id: String,
    pub option_index: i32,
}

/// Folds answer entries into a map; a question answered twice is rejected.
pub fn answers_from_inputs(inputs: &[AnswerInput]) -> AppResult<Answers> {
    let mut answers = Answers::new();
    for input in inputs {
        if answers
            .insert(input.question_id.clone(), input.option_index)
            .is_some()
        {
            return Err(AppError::ValidationError(format!(
                "Question '{}' is answered more than once",
                input.question_id
            )));
        }
    }
    Ok(answers)
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, InputObject, JsonSchema)]
pub struct SubmitQuizRequest {
    pub quiz_id: Option<String>,
    pub enrollment_id: Option<String>,

    #[validate(length(min = 1, message = "At least one answer is required"))]
    pub answers: Vec<AnswerInput>,
}

impl SubmitQuizRequest {
    pub fn answers(&self) -> AppResult<Answers> {
        answers_from_inputs(&self.answers)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, InputObject, JsonSchema)]
pub struct CheckAnswerRequest {
    #[validate(length(min = 1))]
    pub question_id: String,

    #[validate(range(min = 0, max = 5))]
    pub option_index: i32,
}

/// Learner submit and autosave share this payload; missing answers are allowed.
#[derive(Debug, Clone, Default, Deserialize, Serialize, InputObject, JsonSchema)]
pub struct ExamAnswersRequest {
    #[serde(default)]
    #[graphql(default)]
    pub answers: Vec<AnswerInput>,
}

impl ExamAnswersRequest {
    pub fn answers(&self) -> AppResult<Answers> {
        answers_from_inputs(&self.answers)
    }
}
