use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{
    common::{Pii, UpvoteStatus},
    db::upvote::Upvote,
    mongodb::Id,
};

/// A request to support a published opinion, optionally with a comment and
/// optionally identifying the supporter.
#[derive(Debug, Serialize, Deserialize)]
pub struct SupportRequest {
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub is_disclosure_agreed: bool,
}

impl SupportRequest {
    /// The identifying fields as a labelled map, ready for the consent
    /// envelope.
    pub fn pii(&self) -> Pii {
        [
            ("name", &self.name),
            ("department", &self.department),
            ("email", &self.email),
        ]
        .into_iter()
        .filter_map(|(label, value)| {
            value
                .as_ref()
                .map(|value| (label.to_string(), value.clone()))
        })
        .collect()
    }
}

/// A moderation decision on a commented upvote.
#[derive(Debug, Serialize, Deserialize)]
pub struct ModerateRequest {
    pub status: UpvoteStatus,
    /// The approved comment text; defaults to the raw comment when approving
    /// without edits.
    #[serde(default)]
    pub published_comment: Option<String>,
}

/// An upvote as shown to moderators and managers. The fingerprint is a
/// dedup key, not an identity, so it is never exposed; the only identifying
/// content is the consent-gated PII.
#[derive(Debug, Serialize, Deserialize)]
pub struct UpvoteView {
    pub id: Id,
    pub opinion_id: Id,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_comment: Option<String>,
    pub status: UpvoteStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disclosed_pii: Option<Pii>,
    pub created_at: DateTime<Utc>,
}

impl UpvoteView {
    /// Build the view, enforcing the consent invariant on the way out.
    pub fn from_upvote(upvote: Upvote) -> Result<Self> {
        let disclosed_pii = upvote.disclosed_pii()?.cloned();
        Ok(Self {
            id: upvote.id,
            opinion_id: upvote.upvote.opinion_id,
            raw_comment: upvote.upvote.raw_comment,
            published_comment: upvote.upvote.published_comment,
            status: upvote.upvote.status,
            disclosed_pii,
            created_at: upvote.upvote.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pii_map_only_contains_provided_fields() {
        let request = SupportRequest {
            comment: None,
            name: Some("Alice".to_string()),
            department: None,
            email: Some("alice@example.com".to_string()),
            is_disclosure_agreed: true,
        };
        let pii = request.pii();
        assert_eq!(pii.len(), 2);
        assert_eq!(pii["name"], "Alice");
        assert_eq!(pii["email"], "alice@example.com");
        assert!(!pii.contains_key("department"));
    }

    #[test]
    fn view_never_contains_the_fingerprint() {
        let upvote = Upvote::example();
        let fingerprint = upvote.fingerprint.clone();
        let view = UpvoteView::from_upvote(upvote).unwrap();
        let json = rocket::serde::json::to_string(&view).unwrap();
        assert!(!json.contains(&fingerprint));
    }
}
