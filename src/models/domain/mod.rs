pub mod certificate;
pub mod course;
pub mod enrollment;
pub mod exam_question;
pub mod exam_schedule;
pub mod quiz;
pub mod quiz_attempt;
pub mod quiz_question;
pub mod topic_progress;
pub use certificate::{Certificate, CertificateLevel};
pub use course::{Course, Topic};
pub use enrollment::{Enrollment, EnrollmentStatus};
pub use exam_question::ExamQuestion;
pub use exam_schedule::{ExamCompletion, ExamSchedule, ExamStatus, SubmissionSource};
pub use quiz::Quiz;
pub use quiz_attempt::QuizAttempt;
pub use quiz_question::{QuizOptions, QuizQuestion};
pub use topic_progress::TopicProgress;
