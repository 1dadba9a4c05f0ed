use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};
use crate::models::domain::{ExamQuestion, QuizQuestion};

/// Chosen option index keyed by question id.
pub type Answers = BTreeMap<String, i32>;

/// Anything that can be graded as single-choice.
pub trait Gradable {
    fn question_id(&self) -> &str;
    fn correct_answer(&self) -> i32;
    fn option_count(&self) -> usize;
    fn explanation(&self) -> Option<&str>;
}

impl Gradable for QuizQuestion {
    fn question_id(&self) -> &str {
        &self.id
    }
    fn correct_answer(&self) -> i32 {
        self.correct_answer
    }
    fn option_count(&self) -> usize {
        self.options.len()
    }
    fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }
}

impl Gradable for ExamQuestion {
    fn question_id(&self) -> &str {
        &self.id
    }
    fn correct_answer(&self) -> i32 {
        self.correct_answer
    }
    fn option_count(&self) -> usize {
        self.options.len()
    }
    fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreCard {
    pub correct_count: i32,
    pub total_questions: i32,
    pub score: i16,
    pub passing_score: i16,
    pub passed: bool,
}

impl ScoreCard {
    pub fn from_counts(correct_count: i32, total_questions: i32, passing_score: i16) -> Self {
        let score = percentage(correct_count, total_questions);
        ScoreCard {
            correct_count,
            total_questions,
            score,
            passing_score,
            passed: score >= passing_score,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionFeedback {
    pub question_id: String,
    pub selected: Option<i32>,
    pub correct_answer: i32,
    pub is_correct: bool,
    pub explanation: Option<String>,
}

/// `round(100 * part / whole)` with halves rounded up; an empty whole scores 0.
pub fn percentage(part: i32, whole: i32) -> i16 {
    if whole <= 0 {
        return 0;
    }
    let part = part.clamp(0, whole) as i64;
    let whole = whole as i64;
    ((200 * part + whole) / (2 * whole)) as i16
}

pub fn feedback_for<Q: Gradable>(question: &Q, selected: Option<i32>) -> QuestionFeedback {
    let is_correct = selected
        .map(|choice| {
            choice >= 0
                && (choice as usize) < question.option_count()
                && choice == question.correct_answer()
        })
        .unwrap_or(false);

    QuestionFeedback {
        question_id: question.question_id().to_string(),
        selected,
        correct_answer: question.correct_answer(),
        is_correct,
        explanation: question.explanation().map(str::to_string),
    }
}

/// Grades every question; unanswered questions count as incorrect.
pub fn grade<Q: Gradable>(
    questions: &[Q],
    answers: &Answers,
    passing_score: i16,
) -> (ScoreCard, Vec<QuestionFeedback>) {
    let feedback: Vec<QuestionFeedback> = questions
        .iter()
        .map(|q| feedback_for(q, answers.get(q.question_id()).copied()))
        .collect();

    let correct_count = feedback.iter().filter(|f| f.is_correct).count() as i32;
    let card = ScoreCard::from_counts(correct_count, questions.len() as i32, passing_score);
    (card, feedback)
}

/// Rejects answers to unknown questions and option indexes out of range.
pub fn validate_answers<Q: Gradable>(questions: &[Q], answers: &Answers) -> AppResult<()> {
    for (question_id, choice) in answers {
        let question = questions
            .iter()
            .find(|q| q.question_id() == question_id)
            .ok_or_else(|| {
                AppError::ValidationError(format!("Unknown question id '{}'", question_id))
            })?;

        if *choice < 0 || (*choice as usize) >= question.option_count() {
            return Err(AppError::ValidationError(format!(
                "Answer {} for question '{}' is outside its {} options",
                choice,
                question_id,
                question.option_count()
            )));
        }
    }
    Ok(())
}

/// Like [`validate_answers`], and additionally every question must be answered.
pub fn validate_complete_answers<Q: Gradable>(questions: &[Q], answers: &Answers) -> AppResult<()> {
    validate_answers(questions, answers)?;

    let missing: Vec<&str> = questions
        .iter()
        .map(|q| q.question_id())
        .filter(|id| !answers.contains_key(*id))
        .collect();

    if !missing.is_empty() {
        return Err(AppError::ValidationError(format!(
            "Missing answers for questions: {}",
            missing.join(", ")
        )));
    }
    Ok(())
}
