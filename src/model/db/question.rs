use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::model::{common::QuestionType, mongodb::Id};

/// Core question data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionCore {
    /// The prompt shown to respondents.
    pub label: String,
    pub question_type: QuestionType,
    /// Choice options; present iff the type requires them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    /// Submissions missing an answer to a required question are rejected.
    pub is_required: bool,
    /// Marks answers to this question as personal data: they are stored
    /// verbatim but only ever disclosed under an explicit consent flag.
    pub is_personal_data: bool,
    /// Display position within the survey's form.
    pub position: u32,
}

/// A question without an ID.
pub type NewQuestion = QuestionCore;

/// A question from a survey partition, with its unique ID.
#[derive(Debug, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub question: QuestionCore,
}

impl Deref for Question {
    type Target = QuestionCore;

    fn deref(&self) -> &Self::Target {
        &self.question
    }
}

impl DerefMut for Question {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.question
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl Question {
        pub fn example() -> Self {
            Self {
                id: Id::new(),
                question: QuestionCore {
                    label: "What should we improve first?".to_string(),
                    question_type: QuestionType::Textarea,
                    options: None,
                    is_required: true,
                    is_personal_data: false,
                    position: 0,
                },
            }
        }

        pub fn example_personal() -> Self {
            Self {
                id: Id::new(),
                question: QuestionCore {
                    label: "Your name (optional)".to_string(),
                    question_type: QuestionType::Text,
                    options: None,
                    is_required: false,
                    is_personal_data: true,
                    position: 1,
                },
            }
        }

        pub fn example_select() -> Self {
            Self {
                id: Id::new(),
                question: QuestionCore {
                    label: "Which department are you in?".to_string(),
                    question_type: QuestionType::Select,
                    options: Some(vec![
                        "Engineering".to_string(),
                        "Sales".to_string(),
                        "Operations".to_string(),
                    ]),
                    is_required: true,
                    is_personal_data: false,
                    position: 2,
                },
            }
        }
    }
}
