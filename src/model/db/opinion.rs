use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::{
    common::{Pii, Scores},
    mongodb::Id,
};

/// Core published opinion data.
///
/// An opinion is the moderated, public form of one raw response. The unique
/// index on `raw_response_id` guarantees at most one opinion per response
/// even under concurrent publishes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpinionCore {
    pub raw_response_id: Id,
    pub title: String,
    pub content: String,
    /// Internal moderator notes, never exposed publicly.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_notes: Option<String>,
    /// The moderator-set scoring inputs.
    #[serde(flatten)]
    pub scores: Scores,
    /// Derived from `scores` and updated on every edit; stored so public
    /// listings can sort without recomputing.
    pub priority_score: u32,
    /// Snapshot of the respondent's consented PII at publish time, or `None`
    /// when nothing was consented to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disclosed_pii: Option<Pii>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl OpinionCore {
    /// Build a fresh opinion from its parts, deriving the priority score.
    pub fn new(
        raw_response_id: Id,
        title: String,
        content: String,
        admin_notes: Option<String>,
        scores: Scores,
        disclosed_pii: Option<Pii>,
        now: DateTime<Utc>,
    ) -> Self {
        let scores = scores.clamped();
        Self {
            raw_response_id,
            title,
            content,
            admin_notes,
            scores,
            priority_score: scores.priority(),
            disclosed_pii,
            updated_at: now,
        }
    }

    /// Re-derive the stored priority score after the inputs changed.
    pub fn rescore(&mut self, now: DateTime<Utc>) {
        self.scores = self.scores.clamped();
        self.priority_score = self.scores.priority();
        self.updated_at = now;
    }
}

/// An opinion without an ID.
pub type NewOpinion = OpinionCore;

/// A published opinion from a survey partition, with its unique ID.
#[derive(Debug, Serialize, Deserialize)]
pub struct PublishedOpinion {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub opinion: OpinionCore,
}

impl Deref for PublishedOpinion {
    type Target = OpinionCore;

    fn deref(&self) -> &Self::Target {
        &self.opinion
    }
}

impl DerefMut for PublishedOpinion {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.opinion
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl PublishedOpinion {
        pub fn example() -> Self {
            Self {
                id: Id::new(),
                opinion: OpinionCore::new(
                    Id::new(),
                    "Meetings overrun constantly".to_string(),
                    "Most meetings have no agenda and overrun their slot.".to_string(),
                    Some("Recurring theme this quarter.".to_string()),
                    Scores {
                        importance: 2,
                        urgency: 1,
                        expected_impact: 1,
                        supporter_points: 0,
                    },
                    None,
                    Utc::now(),
                ),
            }
        }
    }
}
