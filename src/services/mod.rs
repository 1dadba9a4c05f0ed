pub mod certificate_service;
pub mod content_service;
pub mod deadline_scheduler;
pub mod exam_service;
pub mod progress_service;
pub mod quiz_service;

pub use certificate_service::CertificateService;
pub use content_service::ContentService;
pub use deadline_scheduler::DeadlineScheduler;
pub use exam_service::ExamService;
pub use progress_service::ProgressService;
pub use quiz_service::QuizService;
