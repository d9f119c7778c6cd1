use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// One answer inside a raw response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAnswer {
    pub question_id: Id,
    pub answer_text: String,
    /// Whether the respondent agreed to this answer being disclosed. Only
    /// meaningful on answers to personal-data questions; always false
    /// otherwise.
    pub is_disclosure_agreed: bool,
}

/// Core raw response data. Answers are embedded rather than stored in their
/// own collection so a submission lands in a single document insert: it is
/// either fully recorded or not at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawResponseCore {
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub submitted_at: DateTime<Utc>,
    pub answers: Vec<RawAnswer>,
}

/// A raw response without an ID.
pub type NewRawResponse = RawResponseCore;

/// A raw response from a survey partition, with its unique ID.
#[derive(Debug, Serialize, Deserialize)]
pub struct RawResponse {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub response: RawResponseCore,
}

impl RawResponse {
    /// The answer to the given question, if one was submitted.
    pub fn answer_to(&self, question_id: Id) -> Option<&RawAnswer> {
        self.answers
            .iter()
            .find(|answer| answer.question_id == question_id)
    }
}

impl Deref for RawResponse {
    type Target = RawResponseCore;

    fn deref(&self) -> &Self::Target {
        &self.response
    }
}

impl DerefMut for RawResponse {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.response
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl RawResponse {
        pub fn example() -> Self {
            Self {
                id: Id::new(),
                response: RawResponseCore {
                    submitted_at: Utc::now(),
                    answers: vec![
                        RawAnswer {
                            question_id: Id::new(),
                            answer_text: "Better meeting hygiene.".to_string(),
                            is_disclosure_agreed: false,
                        },
                        RawAnswer {
                            question_id: Id::new(),
                            answer_text: "Sam Doe".to_string(),
                            is_disclosure_agreed: true,
                        },
                    ],
                },
            }
        }
    }
}
