use std::sync::Arc;

use chrono::Utc;
use schemars::schema_for;
use validator::Validate;

use crate::{
    errors::{AppError, AppResult},
    models::{
        domain::{Course, ExamQuestion, Quiz, QuizOptions, QuizQuestion, Topic},
        dto::{
            request::{CourseContentRequest, ExamQuestionInput, QuizInput, TopicInput},
            response::PublishedCourseResponse,
        },
    },
    repositories::{CourseRepository, ExamQuestionRepository, QuizAttemptRepository, QuizRepository},
};

/// JSON schema of the course content document accepted by `publish_course`.
pub fn content_schema() -> serde_json::Value {
    serde_json::to_value(schema_for!(CourseContentRequest)).unwrap_or_default()
}

/// Admin-side writes of course structure, quizzes and the exam bank.
pub struct ContentService {
    courses: Arc<dyn CourseRepository>,
    quizzes: Arc<dyn QuizRepository>,
    attempts: Arc<dyn QuizAttemptRepository>,
    bank: Arc<dyn ExamQuestionRepository>,
}

impl ContentService {
    pub fn new(
        courses: Arc<dyn CourseRepository>,
        quizzes: Arc<dyn QuizRepository>,
        attempts: Arc<dyn QuizAttemptRepository>,
        bank: Arc<dyn ExamQuestionRepository>,
    ) -> Self {
        Self {
            courses,
            quizzes,
            attempts,
            bank,
        }
    }

    /// Creates or updates a course from one content document. Everything is
    /// validated before the first write. A quiz that already has attempts
    /// cannot change.
    pub async fn publish_course(&self, request: CourseContentRequest) -> AppResult<PublishedCourseResponse> {
        request.validate()?;

        let course = self.upsert_course(&request).await?;

        // build every quiz up front so a malformed one aborts before any write
        let mut planned = Vec::with_capacity(request.topics.len());
        for input in &request.topics {
            let topic = self.resolve_topic(&course, input).await?;
            let quiz = match &input.quiz {
                Some(quiz_input) => Some(self.plan_quiz(&course, &topic, quiz_input).await?),
                None => None,
            };
            planned.push((topic, quiz));
        }

        let exam_questions = request
            .exam_questions
            .iter()
            .map(|input| exam_question_from_input(&course.id, input))
            .collect::<AppResult<Vec<_>>>()?;

        self.courses.save_course(&course).await?;

        let mut topics = Vec::with_capacity(planned.len());
        let mut quizzes = Vec::new();
        for (topic, quiz) in planned {
            self.courses.save_topic(&topic).await?;
            if let Some(quiz) = quiz {
                self.quizzes.save(&quiz).await?;
                quizzes.push(quiz);
            }
            topics.push(topic);
        }

        let exam_question_count = exam_questions.len();
        if exam_question_count > 0 {
            self.bank.replace_bank(&course.id, exam_questions).await?;
        }

        log::info!(
            "Published course {} with {} topics, {} quizzes and {} exam questions",
            course.id,
            topics.len(),
            quizzes.len(),
            exam_question_count
        );

        let bank_size = self.bank.list_by_course(&course.id).await?.len();
        Ok(PublishedCourseResponse::new(&course, &topics, &quizzes, bank_size))
    }

    async fn upsert_course(&self, request: &CourseContentRequest) -> AppResult<Course> {
        let existing = match &request.course_id {
            Some(id) => self.courses.find_course(id).await?,
            None => None,
        };

        let course = match existing {
            Some(mut course) => {
                course.title = request.title.clone();
                course.description = request.description.clone();
                course.modified_at = Some(Utc::now());
                course
            }
            None => {
                let mut course = Course::new(&request.title, request.description.as_deref());
                if let Some(id) = &request.course_id {
                    course.id = id.clone();
                }
                course
            }
        };
        Ok(course)
    }

    async fn resolve_topic(&self, course: &Course, input: &TopicInput) -> AppResult<Topic> {
        let existing = match &input.id {
            Some(id) => self.courses.find_topic(id).await?,
            None => None,
        };

        let mut topic = match existing {
            Some(topic) if topic.course_id != course.id => {
                return Err(AppError::ValidationError(format!(
                    "Topic '{}' belongs to another course",
                    topic.id
                )))
            }
            Some(topic) => topic,
            None => {
                let mut topic = Topic::new(&course.id, &input.title, input.sequence);
                if let Some(id) = &input.id {
                    topic.id = id.clone();
                }
                topic
            }
        };

        topic.title = input.title.clone();
        topic.sequence = input.sequence;
        topic.video_url = input.video_url.clone();
        Ok(topic)
    }

    async fn plan_quiz(&self, course: &Course, topic: &Topic, input: &QuizInput) -> AppResult<Quiz> {
        let questions = input
            .questions
            .iter()
            .enumerate()
            .map(|(i, q)| QuizQuestion {
                id: q.id.clone(),
                question: q.question.clone(),
                options: QuizOptions::new(q.options.clone()),
                correct_answer: q.correct_answer,
                explanation: q.explanation.clone(),
                order: q.order.unwrap_or(i as i32 + 1),
            })
            .collect();

        let mut quiz = Quiz::new(&course.id, &topic.id, input.passing_score, questions);
        quiz.title = input.title.clone();
        quiz.validate()?;

        if let Some(current) = self.quizzes.find_by_topic(&topic.id).await? {
            let unchanged = current.passing_score == quiz.passing_score
                && current.questions == quiz.questions
                && current.title == quiz.title;
            if !unchanged && self.attempts.exists_for_topic(&topic.id).await? {
                return Err(AppError::InvalidState(format!(
                    "Quiz for topic '{}' already has attempts and cannot be changed",
                    topic.id
                )));
            }
            quiz.id = current.id;
            quiz.created_at = current.created_at;
        }
        Ok(quiz)
    }
}

fn exam_question_from_input(course_id: &str, input: &ExamQuestionInput) -> AppResult<ExamQuestion> {
    let mut question = ExamQuestion::new(
        course_id,
        &input.question,
        input.options.clone(),
        input.correct_answer,
    );
    question.explanation = input.explanation.clone();
    question.validate()?;
    Ok(question)
}
