use serde::{de::IgnoredAny, Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::{AppError, AppResult};

pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 6;

/// Answer choices of a question.
///
/// Writes are validated; reads are tolerant. A stored value that is not an
/// array of strings is loaded as an empty set and flagged as malformed so the
/// caller can surface the data-integrity problem instead of failing the quiz.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QuizOptions {
    items: Vec<String>,
    malformed: bool,
}

impl QuizOptions {
    pub fn new(items: Vec<String>) -> Self {
        Self {
            items,
            malformed: false,
        }
    }

    pub fn as_slice(&self) -> &[String] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_malformed(&self) -> bool {
        self.malformed
    }

    pub fn contains_index(&self, index: i32) -> bool {
        index >= 0 && (index as usize) < self.items.len()
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.malformed {
            return Err(AppError::ValidationError(
                "Options must be an array of strings".to_string(),
            ));
        }
        if !(MIN_OPTIONS..=MAX_OPTIONS).contains(&self.items.len()) {
            return Err(AppError::ValidationError(format!(
                "A question needs between {} and {} options, got {}",
                MIN_OPTIONS,
                MAX_OPTIONS,
                self.items.len()
            )));
        }
        if self.items.iter().any(|o| o.trim().is_empty()) {
            return Err(AppError::ValidationError(
                "Options cannot be blank".to_string(),
            ));
        }
        Ok(())
    }
}

impl Serialize for QuizOptions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.items.serialize(serializer)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredOptions {
    List(Vec<String>),
    Other(IgnoredAny),
}

impl<'de> Deserialize<'de> for QuizOptions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match StoredOptions::deserialize(deserializer)? {
            StoredOptions::List(items) => Ok(QuizOptions::new(items)),
            StoredOptions::Other(_) => {
                log::warn!("Stored question options are not a list of strings; using an empty set");
                Ok(QuizOptions {
                    items: Vec::new(),
                    malformed: true,
                })
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct QuizQuestion {
    pub id: String,
    pub question: String,
    #[serde(default)]
    pub options: QuizOptions,
    pub correct_answer: i32,
    pub explanation: Option<String>,
    pub order: i32,
}

impl QuizQuestion {
    pub fn is_correct(&self, option_index: i32) -> bool {
        self.options.contains_index(option_index) && option_index == self.correct_answer
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.question.trim().is_empty() {
            return Err(AppError::ValidationError(format!(
                "Question '{}' has no text",
                self.id
            )));
        }
        self.options.validate()?;
        if !self.options.contains_index(self.correct_answer) {
            return Err(AppError::ValidationError(format!(
                "Question '{}' has correct answer {} outside its {} options",
                self.id,
                self.correct_answer,
                self.options.len()
            )));
        }
        Ok(())
    }
}
