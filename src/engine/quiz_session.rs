use std::collections::BTreeSet;

use async_graphql::Enum;
use serde::{Deserialize, Serialize};

use crate::engine::scoring::{self, Answers, QuestionFeedback, ScoreCard};
use crate::errors::{AppError, AppResult};
use crate::models::domain::{Quiz, QuizAttempt, QuizQuestion};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Enum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuizMode {
    Taking,
    /// Topic completed or attempt on record: answers are fixed.
    Review,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Advance {
    Next(usize),
    /// Last question answered; hand these answers to the submit call.
    Submit(Answers),
    AwaitingAnswer,
    Finished,
}

/// One-question-at-a-time quiz flow with immediate feedback.
///
/// Selecting an option on the current question records it and reveals the
/// verdict at once; a revealed question cannot be answered again.
#[derive(Clone, Debug)]
pub struct QuizSession {
    quiz: Quiz,
    mode: QuizMode,
    current_index: usize,
    answers: Answers,
    revealed: BTreeSet<String>,
    result: Option<ScoreCard>,
}

impl QuizSession {
    /// Opens a fresh session. The topic video must have been watched.
    pub fn begin(quiz: Quiz, video_watched: bool) -> AppResult<Self> {
        if !video_watched {
            return Err(AppError::Locked(
                "Watch the topic video before taking its quiz".to_string(),
            ));
        }
        Ok(Self {
            quiz,
            mode: QuizMode::Taking,
            current_index: 0,
            answers: Answers::new(),
            revealed: BTreeSet::new(),
            result: None,
        })
    }

    /// Rebuilds the read-only results view from a stored attempt.
    pub fn review(quiz: Quiz, attempt: &QuizAttempt) -> Self {
        let revealed = quiz.questions.iter().map(|q| q.id.clone()).collect();
        Self {
            quiz,
            mode: QuizMode::Review,
            current_index: 0,
            answers: attempt.answers.clone(),
            revealed,
            result: Some(attempt.score_card()),
        }
    }

    pub fn mode(&self) -> QuizMode {
        self.mode
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_question(&self) -> Option<&QuizQuestion> {
        self.quiz.questions.get(self.current_index)
    }

    pub fn answers(&self) -> &Answers {
        &self.answers
    }

    pub fn result(&self) -> Option<ScoreCard> {
        self.result
    }

    pub fn is_revealed(&self, question_id: &str) -> bool {
        self.revealed.contains(question_id)
    }

    /// Records an answer for the current question. `None` means the selection
    /// was ignored: review mode, already revealed, not the current question,
    /// or an option that does not exist.
    pub fn select_answer(&mut self, question_id: &str, option_index: i32) -> Option<QuestionFeedback> {
        if self.mode == QuizMode::Review || self.revealed.contains(question_id) {
            return None;
        }
        let question = self.current_question()?;
        if question.id != question_id || !question.options.contains_index(option_index) {
            return None;
        }

        let feedback = scoring::feedback_for(question, Some(option_index));
        self.answers.insert(question_id.to_string(), option_index);
        self.revealed.insert(question_id.to_string());
        Some(feedback)
    }

    pub fn advance(&mut self) -> Advance {
        let last = self.quiz.questions.len().saturating_sub(1);

        if self.mode == QuizMode::Review {
            if self.current_index < last {
                self.current_index += 1;
                return Advance::Next(self.current_index);
            }
            return Advance::Finished;
        }

        let Some(question) = self.current_question() else {
            return Advance::Finished;
        };
        if !self.revealed.contains(&question.id) {
            return Advance::AwaitingAnswer;
        }
        if self.current_index >= last {
            return Advance::Submit(self.answers.clone());
        }
        self.current_index += 1;
        Advance::Next(self.current_index)
    }

    /// Steps back one question. While taking the quiz this is only allowed
    /// before the current question has been answered.
    pub fn back(&mut self) -> bool {
        if self.current_index == 0 {
            return false;
        }
        if self.mode == QuizMode::Taking {
            let answered = self
                .current_question()
                .map(|q| self.revealed.contains(&q.id))
                .unwrap_or(false);
            if answered {
                return false;
            }
        }
        self.current_index -= 1;
        true
    }

    /// Local grade of the answers so far; the server's grade is authoritative.
    pub fn preview(&self) -> ScoreCard {
        scoring::grade(&self.quiz.questions, &self.answers, self.quiz.passing_score).0
    }

    /// Applies the server's verdict. A pass locks the session into review.
    pub fn apply_result(&mut self, card: ScoreCard) {
        self.result = Some(card);
        if card.passed {
            self.mode = QuizMode::Review;
            self.current_index = 0;
        }
    }

    /// Discards local answers after a failed, unrecorded submission.
    pub fn retry(&mut self) -> bool {
        if self.mode == QuizMode::Review {
            return false;
        }
        self.answers.clear();
        self.revealed.clear();
        self.current_index = 0;
        self.result = None;
        true
    }
}
