//! Progression rules that need no I/O: topic unlocking, scoring, the quiz
//! session state machine, exam timing and certificate numbering.

pub mod certification;
pub mod exam_clock;
pub mod quiz_session;
pub mod scoring;
pub mod unlock_policy;
