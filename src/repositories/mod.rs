pub mod certificate_repository;
pub mod course_repository;
pub mod enrollment_repository;
pub mod exam_question_repository;
pub mod exam_schedule_repository;
pub mod memory;
pub mod quiz_attempt_repository;
pub mod quiz_repository;
pub mod topic_progress_repository;

pub use certificate_repository::{CertificateRepository, MongoCertificateRepository};
pub use course_repository::{CourseRepository, MongoCourseRepository};
pub use enrollment_repository::{EnrollmentRepository, MongoEnrollmentRepository};
pub use exam_question_repository::{ExamQuestionRepository, MongoExamQuestionRepository};
pub use exam_schedule_repository::{ExamScheduleRepository, MongoExamScheduleRepository};
pub use quiz_attempt_repository::{MongoQuizAttemptRepository, QuizAttemptRepository};
pub use quiz_repository::{MongoQuizRepository, QuizRepository};
pub use topic_progress_repository::{MongoTopicProgressRepository, TopicProgressRepository};
