use chrono::{Duration, Utc};

use coursecert_server::{
    config::ExamSettings,
    engine::scoring::{Answers, ScoreCard},
    errors::AppError,
    models::domain::{
        Certificate, Course, Enrollment, EnrollmentStatus, ExamCompletion, ExamQuestion,
        ExamSchedule, ExamStatus, Quiz, QuizAttempt, QuizOptions, QuizQuestion, SubmissionSource,
        Topic, TopicProgress,
    },
    repositories::{
        memory::{
            InMemoryCertificateRepository, InMemoryCourseRepository, InMemoryEnrollmentRepository,
            InMemoryExamQuestionRepository, InMemoryExamScheduleRepository,
            InMemoryQuizAttemptRepository, InMemoryQuizRepository, InMemoryTopicProgressRepository,
        },
        CertificateRepository, CourseRepository, EnrollmentRepository, ExamQuestionRepository,
        ExamScheduleRepository, QuizAttemptRepository, QuizRepository, TopicProgressRepository,
    },
};

fn make_quiz(course_id: &str, topic_id: &str) -> Quiz {
    let question = QuizQuestion {
        id: "q1".to_string(),
        question: "Pick b".to_string(),
        options: QuizOptions::new(vec!["a".into(), "b".into()]),
        correct_answer: 1,
        explanation: None,
        order: 1,
    };
    Quiz::new(course_id, topic_id, 60, vec![question])
}

fn make_exam_question(course_id: &str, n: usize) -> ExamQuestion {
    ExamQuestion::new(
        course_id,
        &format!("Question {}", n),
        vec!["a".into(), "b".into()],
        0,
    )
}

#[tokio::test]
async fn course_repository_upserts_courses_and_topics() {
    let repo = InMemoryCourseRepository::new();

    let mut course = Course::new("Rust", Some("Systems programming"));
    repo.save_course(&course).await.expect("save course");
    course.title = "Rust 2024".to_string();
    repo.save_course(&course).await.expect("upsert course");

    let found = repo.find_course(&course.id).await.expect("find course");
    assert_eq!(found.map(|c| c.title), Some("Rust 2024".to_string()));
    assert!(repo.find_course("missing").await.expect("find").is_none());

    let second = Topic::new(&course.id, "Borrowing", 2);
    let first = Topic::new(&course.id, "Ownership", 1);
    let foreign = Topic::new("other-course", "Elsewhere", 1);
    for topic in [&second, &first, &foreign] {
        repo.save_topic(topic).await.expect("save topic");
    }

    let topics = repo.list_topics(&course.id).await.expect("list topics");
    assert_eq!(topics.len(), 2);
    assert!(topics.iter().all(|t| t.course_id == course.id));
    assert_eq!(
        repo.find_topic(&first.id).await.expect("find topic").map(|t| t.sequence),
        Some(1)
    );
}

#[tokio::test]
async fn enrollment_repository_is_unique_and_monotonic() {
    let repo = InMemoryEnrollmentRepository::new();

    let enrollment = repo
        .create(Enrollment::new("learner-1", "course-1"))
        .await
        .expect("create enrollment");
    let duplicate = repo.create(Enrollment::new("learner-1", "course-1")).await;
    assert!(matches!(duplicate, Err(AppError::AlreadyExists(_))));

    let found = repo
        .find_by_user_and_course("learner-1", "course-1")
        .await
        .expect("find enrollment");
    assert_eq!(found.map(|e| e.id), Some(enrollment.id.clone()));

    let raised = repo.record_progress(&enrollment.id, 50).await.expect("raise").unwrap();
    assert_eq!(raised.progress, 50);
    let kept = repo.record_progress(&enrollment.id, 25).await.expect("lower").unwrap();
    assert_eq!(kept.progress, 50);

    let done = repo.record_progress(&enrollment.id, 100).await.expect("finish").unwrap();
    assert_eq!(done.status, EnrollmentStatus::Completed);

    assert!(repo.record_progress("missing", 10).await.expect("missing").is_none());
}

#[tokio::test]
async fn topic_progress_merge_never_regresses() {
    let repo = InMemoryTopicProgressRepository::new();

    let mut report = TopicProgress::new("enrollment-1", "topic-1");
    report.record_video(false, 40);
    let stored = repo.merge(&report).await.expect("merge partial");
    assert_eq!(stored.video_progress, 40);

    let stale = TopicProgress::new("enrollment-1", "topic-1");
    let stored = repo.merge(&stale).await.expect("merge stale");
    assert_eq!(stored.video_progress, 40);
    assert!(!stored.video_watched);

    let mut done = TopicProgress::new("enrollment-1", "topic-1");
    done.mark_completed();
    let stored = repo.merge(&done).await.expect("merge completion");
    assert!(stored.is_completed);
    assert!(stored.video_watched);

    let stored = repo.merge(&stale).await.expect("merge after completion");
    assert!(stored.is_completed);

    let rows = repo.list_by_enrollment("enrollment-1").await.expect("list");
    assert_eq!(rows.len(), 1);
    assert!(repo.find("enrollment-1", "topic-2").await.expect("find").is_none());
}

#[tokio::test]
async fn quiz_repository_keeps_one_quiz_per_topic() {
    let repo = InMemoryQuizRepository::new();

    let original = make_quiz("course-1", "topic-1");
    repo.save(&original).await.expect("save quiz");
    let replacement = make_quiz("course-1", "topic-1");
    repo.save(&replacement).await.expect("replace quiz");
    repo.save(&make_quiz("course-1", "topic-2")).await.expect("save second quiz");

    let by_topic = repo.find_by_topic("topic-1").await.expect("find by topic");
    assert_eq!(by_topic.map(|q| q.id), Some(replacement.id.clone()));
    assert!(repo.find_by_id(&original.id).await.expect("find old").is_none());
    assert_eq!(repo.list_by_course("course-1").await.expect("list").len(), 2);
}

#[tokio::test]
async fn quiz_attempt_repository_allows_one_attempt_per_topic() {
    let repo = InMemoryQuizAttemptRepository::new();
    let card = ScoreCard::from_counts(1, 1, 60);
    let answers: Answers = [("q1".to_string(), 1)].into();

    let attempt = QuizAttempt::new("learner-1", "enrollment-1", "quiz-1", "topic-1", answers.clone(), &card);
    repo.create(attempt.clone()).await.expect("create attempt");

    let again = QuizAttempt::new("learner-1", "enrollment-1", "quiz-1", "topic-1", answers, &card);
    let duplicate = repo.create(again).await;
    assert!(matches!(duplicate, Err(AppError::AlreadyExists(_))));

    let found = repo
        .find_by_user_and_topic("learner-1", "topic-1")
        .await
        .expect("find attempt");
    assert_eq!(found, Some(attempt));
    assert!(repo.exists_for_topic("topic-1").await.expect("exists"));
    assert!(!repo.exists_for_topic("topic-2").await.expect("exists"));
}

#[tokio::test]
async fn exam_question_bank_is_replaced_whole() {
    let repo = InMemoryExamQuestionRepository::new();

    let first: Vec<_> = (0..3).map(|n| make_exam_question("course-1", n)).collect();
    repo.replace_bank("course-1", first).await.expect("seed bank");
    let second: Vec<_> = (0..2).map(|n| make_exam_question("course-1", n)).collect();
    repo.replace_bank("course-1", second).await.expect("replace bank");

    assert_eq!(repo.list_by_course("course-1").await.expect("list").len(), 2);
    assert!(repo.list_by_course("course-2").await.expect("list").is_empty());
}

#[tokio::test]
async fn exam_schedule_transitions_are_compare_and_set() {
    let repo = InMemoryExamScheduleRepository::new();
    let settings = ExamSettings::default();

    let exam = repo
        .create(ExamSchedule::new("learner-1", "course-1", "enrollment-1", &settings))
        .await
        .expect("create exam");
    let second = repo
        .create(ExamSchedule::new("learner-1", "course-1", "enrollment-1", &settings))
        .await;
    assert!(matches!(second, Err(AppError::AlreadyExists(_))));

    let early = repo
        .complete(
            &exam.id,
            &ExamCompletion {
                answers: Answers::new(),
                card: ScoreCard::from_counts(0, 1, 60),
                completed_at: Utc::now(),
                submitted_by: SubmissionSource::Learner,
            },
        )
        .await
        .expect("complete before start");
    assert!(early.is_none());

    let started_at = Utc::now();
    let questions = vec![make_exam_question("course-1", 0)];
    let started = repo
        .mark_in_progress(&exam.id, started_at, started_at + Duration::minutes(60), questions.clone())
        .await
        .expect("start")
        .expect("scheduled exam starts");
    assert_eq!(started.status, ExamStatus::InProgress);
    assert!(repo
        .mark_in_progress(&exam.id, started_at, started_at, questions)
        .await
        .expect("restart")
        .is_none());
    assert_eq!(repo.list_in_progress().await.expect("in progress").len(), 1);

    let answers: Answers = [(started.questions[0].id.clone(), 0)].into();
    let saved = repo.save_answers(&exam.id, &answers).await.expect("autosave");
    assert_eq!(saved.map(|e| e.answers), Some(answers.clone()));
    let later: Answers = [("q-later".to_string(), 1)].into();
    let merged = repo
        .save_answers(&exam.id, &later)
        .await
        .expect("second autosave")
        .expect("in-progress exam accepts answers");
    assert_eq!(merged.answers.len(), 2);
    assert_eq!(merged.answers.get(&started.questions[0].id), Some(&0));

    let completion = ExamCompletion {
        answers,
        card: ScoreCard::from_counts(1, 1, 60),
        completed_at: Utc::now(),
        submitted_by: SubmissionSource::Deadline,
    };
    let completed = repo
        .complete(&exam.id, &completion)
        .await
        .expect("complete")
        .expect("in-progress exam completes");
    assert!(!completed.active);
    assert!(completed.has_passed());
    assert!(repo.complete(&exam.id, &completion).await.expect("again").is_none());

    assert!(repo.find_current("learner-1", "course-1").await.expect("current").is_none());
    assert_eq!(repo.list_completed("learner-1", "course-1").await.expect("history").len(), 1);
    assert!(repo.has_passed("learner-1", "course-1").await.expect("passed"));

    repo.create(ExamSchedule::new("learner-1", "course-1", "enrollment-1", &settings))
        .await
        .expect("new active exam after completion");
}

#[tokio::test]
async fn certificate_repository_allows_one_certificate_per_course() {
    let repo = InMemoryCertificateRepository::new();

    let certificate = repo
        .create(Certificate::issue("learner-1", "course-1", "exam-1", 85))
        .await
        .expect("issue certificate");
    let duplicate = repo
        .create(Certificate::issue("learner-1", "course-1", "exam-2", 95))
        .await;
    assert!(matches!(duplicate, Err(AppError::AlreadyExists(_))));

    let by_number = repo
        .find_by_number(&certificate.certificate_number)
        .await
        .expect("find by number");
    assert_eq!(by_number.as_ref().map(|c| c.exam_score), Some(85));
    assert!(by_number.map(|c| c.is_untampered()).unwrap_or(false));

    repo.create(Certificate::issue("learner-1", "course-2", "exam-3", 70))
        .await
        .expect("second course");
    assert_eq!(repo.list_by_user("learner-1").await.expect("list").len(), 2);
    assert!(repo
        .find_by_user_and_course("learner-2", "course-1")
        .await
        .expect("find")
        .is_none());
}
