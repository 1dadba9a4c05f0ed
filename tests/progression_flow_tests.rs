use std::sync::Arc;

use chrono::{Duration, Utc};

use coursecert_server::{
    config::ExamSettings,
    engine::{
        certification,
        quiz_session::{Advance, QuizMode, QuizSession},
        unlock_policy::TopicStatus,
    },
    errors::AppError,
    models::{
        domain::{ExamQuestion, ExamSchedule, ExamStatus, SubmissionSource},
        dto::{
            request::{
                AnswerInput, CourseContentRequest, ExamQuestionInput, QuizInput,
                QuizQuestionInput, SubmitQuizRequest, TopicInput, UpdateProgressRequest,
            },
            response::PublishedCourseResponse,
        },
    },
    repositories::{
        memory::{
            InMemoryCertificateRepository, InMemoryCourseRepository, InMemoryEnrollmentRepository,
            InMemoryExamQuestionRepository, InMemoryExamScheduleRepository,
            InMemoryQuizAttemptRepository, InMemoryQuizRepository, InMemoryTopicProgressRepository,
        },
        ExamScheduleRepository, QuizRepository,
    },
    services::{CertificateService, ContentService, ExamService, ProgressService, QuizService},
};

const LEARNER: &str = "learner-1";

struct World {
    progress: Arc<ProgressService>,
    quizzes: QuizService,
    exams: Arc<ExamService>,
    certificates: Arc<CertificateService>,
    quiz_repo: Arc<InMemoryQuizRepository>,
    schedules: Arc<InMemoryExamScheduleRepository>,
    course: PublishedCourseResponse,
}

fn content() -> CourseContentRequest {
    let quiz = QuizInput {
        title: Some("Ownership check".to_string()),
        passing_score: 50,
        questions: vec![
            QuizQuestionInput {
                id: "q1".to_string(),
                question: "Who owns a moved value?".to_string(),
                options: vec!["The receiver".into(), "The sender".into()],
                correct_answer: 0,
                explanation: None,
                order: Some(1),
            },
            QuizQuestionInput {
                id: "q2".to_string(),
                question: "How many mutable borrows may coexist?".to_string(),
                options: vec!["Many".into(), "One".into()],
                correct_answer: 1,
                explanation: None,
                order: Some(2),
            },
        ],
    };

    CourseContentRequest {
        course_id: None,
        title: "Rust Fundamentals".to_string(),
        description: None,
        topics: vec![
            TopicInput {
                id: None,
                title: "Ownership".to_string(),
                video_url: None,
                sequence: 1,
                quiz: Some(quiz),
            },
            TopicInput {
                id: None,
                title: "Lifetimes".to_string(),
                video_url: None,
                sequence: 2,
                quiz: None,
            },
        ],
        exam_questions: (0..25)
            .map(|i| ExamQuestionInput {
                question: format!("Exam question {}", i),
                options: vec!["a".into(), "b".into(), "c".into()],
                correct_answer: 2,
                explanation: None,
            })
            .collect(),
    }
}

async fn world() -> World {
    let courses = Arc::new(InMemoryCourseRepository::new());
    let quiz_repo = Arc::new(InMemoryQuizRepository::new());
    let attempts = Arc::new(InMemoryQuizAttemptRepository::new());
    let bank = Arc::new(InMemoryExamQuestionRepository::new());
    let schedules = Arc::new(InMemoryExamScheduleRepository::new());

    let progress = Arc::new(ProgressService::new(
        courses.clone(),
        Arc::new(InMemoryEnrollmentRepository::new()),
        Arc::new(InMemoryTopicProgressRepository::new()),
        quiz_repo.clone(),
    ));
    let quizzes = QuizService::new(quiz_repo.clone(), attempts.clone(), progress.clone());
    let certificates = Arc::new(CertificateService::new(
        Arc::new(InMemoryCertificateRepository::new()),
        schedules.clone(),
    ));
    let exams = Arc::new(ExamService::new(
        schedules.clone(),
        bank.clone(),
        progress.clone(),
        certificates.clone(),
        ExamSettings::default(),
    ));
    let publisher = ContentService::new(courses, quiz_repo.clone(), attempts, bank);
    let course = publisher
        .publish_course(content())
        .await
        .expect("course publishes");

    World {
        progress,
        quizzes,
        exams,
        certificates,
        quiz_repo,
        schedules,
        course,
    }
}

fn answers(pairs: &[(&str, i32)]) -> Vec<AnswerInput> {
    pairs
        .iter()
        .map(|(question_id, option_index)| AnswerInput {
            question_id: question_id.to_string(),
            option_index: *option_index,
        })
        .collect()
}

fn submit_request(pairs: &[(&str, i32)]) -> SubmitQuizRequest {
    SubmitQuizRequest {
        quiz_id: None,
        enrollment_id: None,
        answers: answers(pairs),
    }
}

fn watched() -> UpdateProgressRequest {
    UpdateProgressRequest {
        video_watched: Some(true),
        ..Default::default()
    }
}

/// Enrolls the learner and completes every topic of the course.
async fn complete_course(w: &World) -> String {
    let enrollment = w.progress.enroll(LEARNER, &w.course.course_id).await.unwrap();
    let first = &w.course.topics[0].id;
    let second = &w.course.topics[1].id;

    w.progress
        .update_progress(LEARNER, &enrollment.id, first, watched())
        .await
        .unwrap();
    let result = w
        .quizzes
        .submit_quiz(LEARNER, first, submit_request(&[("q1", 0), ("q2", 1)]))
        .await
        .unwrap();
    assert!(result.passed);

    w.progress
        .update_progress(
            LEARNER,
            &enrollment.id,
            second,
            UpdateProgressRequest {
                video_watched: Some(true),
                is_completed: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    enrollment.id
}

#[tokio::test]
async fn learner_progresses_from_enrollment_to_certificate() {
    let w = world().await;
    let enrollment_id = complete_course(&w).await;

    let progress = w
        .progress
        .get_course_progress(LEARNER, &enrollment_id)
        .await
        .unwrap();
    assert_eq!(progress.progress, 100);
    assert!(progress.exam_eligible);

    let exam = w.exams.schedule(LEARNER, &w.course.course_id).await.unwrap();
    let started = w.exams.start(LEARNER, &exam.id).await.unwrap();
    assert_eq!(started.questions.len(), 20);

    let all_right = started.questions.iter().map(|q| (q.id.clone(), 2)).collect();
    let submitted = w.exams.submit(LEARNER, &exam.id, all_right).await.unwrap();

    assert_eq!(submitted.score, 100);
    assert!(submitted.passed);
    let certificate = submitted.certificate.expect("certificate issued on pass");
    assert!(certification::is_well_formed_number(&certificate.certificate_number));

    let verified = w
        .certificates
        .verify(&certificate.certificate_number)
        .await
        .unwrap()
        .expect("certificate is on record");
    assert!(verified.is_untampered());

    let again = w.certificates.generate(LEARNER, &exam.id).await.unwrap();
    assert_eq!(again.certificate_number, certificate.certificate_number);
    assert_eq!(w.certificates.list_mine(LEARNER).await.unwrap().len(), 1);
}

#[tokio::test]
async fn video_gate_and_sequential_unlocking() {
    let w = world().await;
    let enrollment = w.progress.enroll(LEARNER, &w.course.course_id).await.unwrap();
    let first = &w.course.topics[0].id;
    let second = &w.course.topics[1].id;

    let locked_quiz = w.quizzes.get_quiz_for_taking(LEARNER, first).await;
    assert!(matches!(locked_quiz, Err(AppError::Locked(_))));

    let locked_topic = w
        .progress
        .update_progress(LEARNER, &enrollment.id, second, watched())
        .await;
    assert!(matches!(locked_topic, Err(AppError::Locked(_))));

    let progress = w
        .progress
        .update_progress(LEARNER, &enrollment.id, first, watched())
        .await
        .unwrap();
    assert_eq!(progress.topics[0].status, TopicStatus::Available);
    assert_eq!(progress.topics[1].status, TopicStatus::Locked);

    let quiz = w.quizzes.get_quiz_for_taking(LEARNER, first).await.unwrap();
    assert_eq!(quiz.mode, QuizMode::Taking);
    assert!(quiz.questions.iter().all(|q| q.correct_answer.is_none()));
}

#[tokio::test]
async fn failed_quiz_is_not_recorded_and_can_be_retaken() {
    let w = world().await;
    let enrollment = w.progress.enroll(LEARNER, &w.course.course_id).await.unwrap();
    let first = &w.course.topics[0].id;
    w.progress
        .update_progress(LEARNER, &enrollment.id, first, watched())
        .await
        .unwrap();

    let failed = w
        .quizzes
        .submit_quiz(LEARNER, first, submit_request(&[("q1", 1), ("q2", 0)]))
        .await
        .unwrap();
    assert!(!failed.passed);
    assert!(!failed.recorded);
    assert!(!w.quizzes.get_quiz_attempt(LEARNER, first).await.unwrap().found);

    let passed = w
        .quizzes
        .submit_quiz(LEARNER, first, submit_request(&[("q1", 0), ("q2", 0)]))
        .await
        .unwrap();
    assert!(passed.passed);
    assert!(passed.recorded);
    assert_eq!(passed.score, 50);

    let review = w.quizzes.get_quiz_for_taking(LEARNER, first).await.unwrap();
    assert_eq!(review.mode, QuizMode::Review);

    let resubmit = w
        .quizzes
        .submit_quiz(LEARNER, first, submit_request(&[("q1", 0), ("q2", 1)]))
        .await;
    assert!(matches!(resubmit, Err(AppError::InvalidState(_))));
}

#[tokio::test]
async fn quiz_session_drives_a_submission() {
    let w = world().await;
    let enrollment = w.progress.enroll(LEARNER, &w.course.course_id).await.unwrap();
    let first = &w.course.topics[0].id;
    w.progress
        .update_progress(LEARNER, &enrollment.id, first, watched())
        .await
        .unwrap();

    let quiz = w.quiz_repo.find_by_topic(first).await.unwrap().unwrap();
    assert!(QuizSession::begin(quiz.clone(), false).is_err());

    let mut session = QuizSession::begin(quiz, true).unwrap();
    let feedback = session.select_answer("q1", 0).expect("answer accepted");
    assert!(feedback.is_correct);
    assert_eq!(session.advance(), Advance::Next(1));
    session.select_answer("q2", 1).expect("answer accepted");

    let Advance::Submit(local) = session.advance() else {
        panic!("last answered question should hand over the answers");
    };
    let request = submit_request(
        &local
            .iter()
            .map(|(id, option)| (id.as_str(), *option))
            .collect::<Vec<_>>(),
    );
    let result = w.quizzes.submit_quiz(LEARNER, first, request).await.unwrap();
    assert_eq!(result.score, session.preview().score);

    let attempt = w.quizzes.get_quiz_attempt(LEARNER, first).await.unwrap();
    assert!(attempt.found);
    session.apply_result(session.preview());
    assert_eq!(session.mode(), QuizMode::Review);
}

#[tokio::test]
async fn exam_requires_every_topic_completed() {
    let w = world().await;
    w.progress.enroll(LEARNER, &w.course.course_id).await.unwrap();

    let result = w.exams.schedule(LEARNER, &w.course.course_id).await;
    assert!(matches!(result, Err(AppError::Locked(_))));
}

/// Seeds an IN_PROGRESS exam whose deadline passed a minute ago, as left
/// behind by a process that stopped before its timer fired.
async fn overdue_exam(w: &World, enrollment_id: &str, autosaved_correct: usize) -> ExamSchedule {
    let mut exam = ExamSchedule::new(
        LEARNER,
        &w.course.course_id,
        enrollment_id,
        &ExamSettings::default(),
    );
    exam.status = ExamStatus::InProgress;
    exam.started_at = Some(Utc::now() - Duration::minutes(61));
    exam.deadline_at = exam.deadline();
    exam.questions = (0..4)
        .map(|i| {
            ExamQuestion::new(
                &w.course.course_id,
                &format!("Question {}", i),
                vec!["a".into(), "b".into(), "c".into()],
                2,
            )
        })
        .collect();
    exam.answers = exam
        .questions
        .iter()
        .take(autosaved_correct)
        .map(|q| (q.id.clone(), 2))
        .collect();

    w.schedules.create(exam).await.unwrap()
}

#[tokio::test]
async fn sweeper_closes_overdue_exam_with_autosaved_answers() {
    let w = world().await;
    let enrollment_id = complete_course(&w).await;
    let exam = overdue_exam(&w, &enrollment_id, 3).await;

    let swept = w.exams.sweep_expired().await.unwrap();
    assert_eq!(swept, 1);

    let closed = w.schedules.find_by_id(&exam.id).await.unwrap().unwrap();
    assert_eq!(closed.status, ExamStatus::Completed);
    assert_eq!(closed.submitted_by, Some(SubmissionSource::Deadline));
    assert_eq!(closed.score, Some(75));
    assert_eq!(closed.passed, Some(true));
    assert!(w
        .certificates
        .list_mine(LEARNER)
        .await
        .unwrap()
        .iter()
        .any(|c| c.exam_id == exam.id));

    assert_eq!(w.exams.sweep_expired().await.unwrap(), 0);
}

#[tokio::test]
async fn late_submit_scores_only_autosaved_answers() {
    let w = world().await;
    let enrollment_id = complete_course(&w).await;
    let exam = overdue_exam(&w, &enrollment_id, 1).await;

    let all_right = exam.questions.iter().map(|q| (q.id.clone(), 2)).collect();
    let late = w.exams.submit(LEARNER, &exam.id, all_right).await.unwrap();

    assert_eq!(late.score, 25);
    assert!(!late.passed);
    assert_eq!(late.exam.submitted_by, Some(SubmissionSource::Deadline));

    let tick = w.exams.tick(LEARNER, &exam.id).await.unwrap();
    assert_eq!(tick.status, ExamStatus::Completed);
    assert_eq!(tick.time_left_seconds, 0);
    assert!(!tick.auto_submitted);
}

#[tokio::test]
async fn tick_past_deadline_auto_submits() {
    let w = world().await;
    let enrollment_id = complete_course(&w).await;
    let exam = overdue_exam(&w, &enrollment_id, 0).await;

    let tick = w.exams.tick(LEARNER, &exam.id).await.unwrap();
    assert!(tick.auto_submitted);
    assert_eq!(tick.status, ExamStatus::Completed);
    assert_eq!(tick.time_left_seconds, 0);

    let closed = w.schedules.find_by_id(&exam.id).await.unwrap().unwrap();
    assert_eq!(closed.score, Some(0));
    assert_eq!(closed.passed, Some(false));
    assert_eq!(closed.submitted_by, Some(SubmissionSource::Deadline));

    let saved = w
        .exams
        .save_answers(LEARNER, &exam.id, Default::default())
        .await;
    assert!(matches!(saved, Err(AppError::InvalidState(_))));
    assert!(w
        .exams
        .current(LEARNER, &w.course.course_id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn concurrent_submits_complete_the_exam_once() {
    let w = world().await;
    complete_course(&w).await;

    let exam = w.exams.schedule(LEARNER, &w.course.course_id).await.unwrap();
    let started = w.exams.start(LEARNER, &exam.id).await.unwrap();
    let all_right: std::collections::BTreeMap<String, i32> =
        started.questions.iter().map(|q| (q.id.clone(), 2)).collect();

    let (a, b) = tokio::join!(
        w.exams.submit(LEARNER, &exam.id, all_right.clone()),
        w.exams.submit(LEARNER, &exam.id, all_right.clone()),
    );

    let outcomes = [a.is_ok(), b.is_ok()];
    assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1);
    let rejected = if a.is_ok() { b } else { a };
    assert!(matches!(rejected, Err(AppError::InvalidState(_))));

    assert_eq!(w.certificates.list_mine(LEARNER).await.unwrap().len(), 1);
    assert!(!w.exams.scheduler().is_armed(&exam.id));
}

#[tokio::test]
async fn failed_exam_allows_a_retake() {
    let w = world().await;
    complete_course(&w).await;

    let exam = w.exams.schedule(LEARNER, &w.course.course_id).await.unwrap();
    let started = w.exams.start(LEARNER, &exam.id).await.unwrap();
    let five_right = started
        .questions
        .iter()
        .enumerate()
        .map(|(i, q)| (q.id.clone(), if i < 5 { 2 } else { 0 }))
        .collect();
    let failed = w.exams.submit(LEARNER, &exam.id, five_right).await.unwrap();
    assert_eq!(failed.score, 25);
    assert!(!failed.passed);
    assert!(failed.certificate.is_none());
    assert!(w.certificates.list_mine(LEARNER).await.unwrap().is_empty());

    let retake = w.exams.schedule(LEARNER, &w.course.course_id).await.unwrap();
    assert_ne!(retake.id, exam.id);
    assert_eq!(
        w.exams
            .history(LEARNER, &w.course.course_id)
            .await
            .unwrap()
            .len(),
        1
    );

    let uncertified = w.certificates.generate(LEARNER, &exam.id).await;
    assert!(matches!(uncertified, Err(AppError::InvalidState(_))));
}
