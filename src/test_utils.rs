#[cfg(test)]
pub mod fixtures {
    use crate::models::dto::request::{
        CourseContentRequest, ExamQuestionInput, QuizInput, QuizQuestionInput, TopicInput,
    };

    /// Quiz with two questions whose correct answers are options 0 and 1.
    pub fn quiz_input() -> QuizInput {
        QuizInput {
            title: Some("Checkpoint".to_string()),
            passing_score: 50,
            questions: vec![
                QuizQuestionInput {
                    id: "q1".to_string(),
                    question: "Who owns a moved value?".to_string(),
                    options: vec!["The receiver".into(), "The sender".into()],
                    correct_answer: 0,
                    explanation: Some("Moves transfer ownership".to_string()),
                    order: Some(1),
                },
                QuizQuestionInput {
                    id: "q2".to_string(),
                    question: "How many mutable borrows may coexist?".to_string(),
                    options: vec!["Many".into(), "One".into(), "None".into()],
                    correct_answer: 1,
                    explanation: None,
                    order: Some(2),
                },
            ],
        }
    }

    /// Exam question whose correct answer is option 2.
    pub fn exam_question(n: usize) -> ExamQuestionInput {
        ExamQuestionInput {
            question: format!("Exam question {}", n),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_answer: 2,
            explanation: Some(format!("Explanation {}", n)),
        }
    }

    /// Course of `topic_count` topics; only the first carries a quiz.
    pub fn course_content(topic_count: usize, exam_questions: usize) -> CourseContentRequest {
        CourseContentRequest {
            course_id: None,
            title: "Rust Fundamentals".to_string(),
            description: Some("Ownership, borrowing and lifetimes".to_string()),
            topics: (0..topic_count)
                .map(|i| TopicInput {
                    id: None,
                    title: format!("Topic {}", i + 1),
                    video_url: Some(format!("https://videos.example.com/{}", i + 1)),
                    sequence: i as i32 + 1,
                    quiz: (i == 0).then(quiz_input),
                })
                .collect(),
            exam_questions: (0..exam_questions).map(exam_question).collect(),
        }
    }
}

#[cfg(test)]
pub mod test_helpers {
    use actix_web::http::StatusCode;

    use crate::{
        app_state::AppState,
        auth::Role,
        config::Config,
        models::dto::response::PublishedCourseResponse,
    };

    use super::fixtures;

    /// In-memory state with one published course.
    pub async fn seeded_state(topic_count: usize, exam_questions: usize) -> (AppState, PublishedCourseResponse) {
        let state = AppState::in_memory(Config::test_config());
        let published = state
            .content_service
            .publish_course(fixtures::course_content(topic_count, exam_questions))
            .await
            .expect("fixture course publishes");
        (state, published)
    }

    pub fn bearer(state: &AppState, subject: &str, role: Role) -> String {
        let token = state
            .jwt_service
            .create_token(subject, role)
            .expect("token signs");
        format!("Bearer {}", token)
    }

    /// Asserts that a status code represents an error (4xx or 5xx)
    pub fn assert_error_status(status: StatusCode) {
        assert!(
            status.is_client_error() || status.is_server_error(),
            "Expected error status, got: {}",
            status
        );
    }

    /// Asserts that a status code represents success (2xx)
    pub fn assert_success_status(status: StatusCode) {
        assert!(
            status.is_success(),
            "Expected success status, got: {}",
            status
        );
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use validator::Validate;

    #[test]
    fn test_course_content_fixture_is_valid() {
        let content = course_content(3, 5);

        assert!(content.validate().is_ok());
        assert_eq!(content.topics.len(), 3);
        assert!(content.topics[0].quiz.is_some());
        assert!(content.topics[1].quiz.is_none());
        assert_eq!(content.exam_questions.len(), 5);
    }
}
