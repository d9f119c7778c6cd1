use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    auth::Fingerprint,
    common::{Pii, UpvoteStatus},
    mongodb::Id,
};

/// Core upvote data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpvoteCore {
    pub opinion_id: Id,
    /// Anonymous client fingerprint; with `opinion_id` this forms the unique
    /// key that makes supporting idempotent per client.
    pub fingerprint: String,
    /// The supporter's comment exactly as submitted; only ever shown to
    /// moderators and managers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_comment: Option<String>,
    /// The moderator-approved form of the comment shown publicly.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_comment: Option<String>,
    pub status: UpvoteStatus,
    pub is_disclosure_agreed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disclosed_pii: Option<Pii>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl UpvoteCore {
    /// Record a new upvote.
    ///
    /// A bare upvote carries no text and counts immediately; one with a
    /// comment is held for moderation before the comment can appear, though
    /// it still counts towards the supporter total either way.
    pub fn new(
        opinion_id: Id,
        fingerprint: Fingerprint,
        comment: Option<String>,
        disclosed_pii: Option<Pii>,
        now: DateTime<Utc>,
    ) -> Self {
        let raw_comment = comment
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        let status = if raw_comment.is_some() {
            UpvoteStatus::Pending
        } else {
            UpvoteStatus::Published
        };
        Self {
            opinion_id,
            fingerprint: fingerprint.into_string(),
            raw_comment,
            published_comment: None,
            status,
            is_disclosure_agreed: disclosed_pii.is_some(),
            disclosed_pii,
            created_at: now,
        }
    }

    /// The disclosed PII, verified against the stored consent flag. PII
    /// without consent should be impossible to store; finding it is a defect.
    pub fn disclosed_pii(&self) -> Result<Option<&Pii>> {
        match (&self.disclosed_pii, self.is_disclosure_agreed) {
            (Some(_), false) => Err(Error::ConsentViolation(format!(
                "Upvote on opinion {} has PII without recorded consent",
                self.opinion_id
            ))),
            (pii, _) => Ok(pii.as_ref()),
        }
    }
}

/// An upvote without an ID.
pub type NewUpvote = UpvoteCore;

/// An upvote from a survey partition, with its unique ID.
#[derive(Debug, Serialize, Deserialize)]
pub struct Upvote {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub upvote: UpvoteCore,
}

impl Deref for Upvote {
    type Target = UpvoteCore;

    fn deref(&self) -> &Self::Target {
        &self.upvote
    }
}

impl DerefMut for Upvote {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.upvote
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;
    use crate::config::Config;

    impl Upvote {
        pub fn example() -> Self {
            let fingerprint =
                Fingerprint::derive("203.0.113.7", "Mozilla/5.0", &Config::example());
            Self {
                id: Id::new(),
                upvote: UpvoteCore::new(
                    Id::new(),
                    fingerprint,
                    Some("Same in our team.".to_string()),
                    None,
                    Utc::now(),
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn fingerprint() -> Fingerprint {
        Fingerprint::derive("203.0.113.7", "Mozilla/5.0", &Config::example())
    }

    #[test]
    fn bare_upvotes_publish_immediately() {
        let upvote = UpvoteCore::new(Id::new(), fingerprint(), None, None, Utc::now());
        assert_eq!(upvote.status, UpvoteStatus::Published);
        assert_eq!(upvote.raw_comment, None);
    }

    #[test]
    fn blank_comments_count_as_bare() {
        let upvote = UpvoteCore::new(
            Id::new(),
            fingerprint(),
            Some("   ".to_string()),
            None,
            Utc::now(),
        );
        assert_eq!(upvote.status, UpvoteStatus::Published);
        assert_eq!(upvote.raw_comment, None);
    }

    #[test]
    fn commented_upvotes_await_moderation() {
        let upvote = Upvote::example();
        assert_eq!(upvote.status, UpvoteStatus::Pending);
        assert_eq!(upvote.published_comment, None);
    }

    #[test]
    fn consent_flag_follows_the_pii() {
        let pii: Pii = [("name".to_string(), "Alice".to_string())].into();
        let with = UpvoteCore::new(
            Id::new(),
            fingerprint(),
            None,
            Some(pii.clone()),
            Utc::now(),
        );
        assert!(with.is_disclosure_agreed);
        assert_eq!(with.disclosed_pii().unwrap(), Some(&pii));

        let without = UpvoteCore::new(Id::new(), fingerprint(), None, None, Utc::now());
        assert!(!without.is_disclosure_agreed);
        assert_eq!(without.disclosed_pii().unwrap(), None);
    }

    #[test]
    fn pii_without_consent_is_a_defect() {
        let mut upvote = Upvote::example();
        upvote.upvote.disclosed_pii = Some([("name".to_string(), "Bob".to_string())].into());
        upvote.upvote.is_disclosure_agreed = false;
        assert!(matches!(
            upvote.disclosed_pii(),
            Err(Error::ConsentViolation(_))
        ));
    }
}
