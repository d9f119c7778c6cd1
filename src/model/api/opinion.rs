use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    common::{scoring, Pii, Scores},
    db::opinion::PublishedOpinion,
    mongodb::Id,
};

/// A request to publish a raw response as a public opinion.
#[derive(Debug, Serialize, Deserialize)]
pub struct PublishSpec {
    pub raw_response_id: Id,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub admin_notes: Option<String>,
    #[serde(default)]
    pub scores: Scores,
}

/// A partial edit to a published opinion. Absent fields are left unchanged.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct OpinionEdit {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub admin_notes: Option<String>,
    #[serde(default)]
    pub scores: Option<Scores>,
}

impl OpinionEdit {
    /// Apply this edit, re-deriving the priority score.
    pub fn apply(self, opinion: &mut PublishedOpinion, now: DateTime<Utc>) {
        if let Some(title) = self.title {
            opinion.opinion.title = title;
        }
        if let Some(content) = self.content {
            opinion.opinion.content = content;
        }
        if let Some(admin_notes) = self.admin_notes {
            opinion.opinion.admin_notes = Some(admin_notes);
        }
        if let Some(scores) = self.scores {
            opinion.opinion.scores = scores;
        }
        opinion.opinion.rescore(now);
    }
}

/// An opinion as shown on the public board: no notes, no PII, plus the live
/// supporter tally and approved comments.
#[derive(Debug, Serialize, Deserialize)]
pub struct PublicOpinionView {
    pub id: Id,
    pub title: String,
    pub content: String,
    pub priority_score: u32,
    pub tier: u8,
    pub supporters: u64,
    pub additional_comments: Vec<String>,
    /// Whether the requesting client has already supported this opinion.
    pub current_user_has_supported: bool,
}

impl PublicOpinionView {
    pub fn new(
        opinion: PublishedOpinion,
        supporters: u64,
        additional_comments: Vec<String>,
        current_user_has_supported: bool,
    ) -> Self {
        Self {
            id: opinion.id,
            title: opinion.opinion.title,
            content: opinion.opinion.content,
            priority_score: opinion.opinion.priority_score,
            tier: scoring::tier(opinion.opinion.priority_score),
            supporters,
            additional_comments,
            current_user_has_supported,
        }
    }
}

/// An opinion as shown to moderators and managers: the full record including
/// notes, scoring inputs and the consented PII snapshot.
#[derive(Debug, Serialize, Deserialize)]
pub struct ModeratorOpinionView {
    pub id: Id,
    pub raw_response_id: Id,
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_notes: Option<String>,
    pub scores: Scores,
    pub priority_score: u32,
    pub tier: u8,
    pub supporters: u64,
    pub pending_upvotes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disclosed_pii: Option<Pii>,
    pub updated_at: DateTime<Utc>,
}

impl ModeratorOpinionView {
    pub fn new(opinion: PublishedOpinion, supporters: u64, pending_upvotes: u64) -> Self {
        Self {
            id: opinion.id,
            raw_response_id: opinion.opinion.raw_response_id,
            title: opinion.opinion.title,
            content: opinion.opinion.content,
            admin_notes: opinion.opinion.admin_notes,
            scores: opinion.opinion.scores,
            priority_score: opinion.opinion.priority_score,
            tier: scoring::tier(opinion.opinion.priority_score),
            supporters,
            pending_upvotes,
            disclosed_pii: opinion.opinion.disclosed_pii,
            updated_at: opinion.opinion.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edits_rescore_automatically() {
        let mut opinion = PublishedOpinion::example();
        let before = opinion.priority_score;

        let edit = OpinionEdit {
            scores: Some(Scores {
                importance: 2,
                urgency: 2,
                expected_impact: 2,
                supporter_points: 2,
            }),
            ..Default::default()
        };
        edit.apply(&mut opinion, Utc::now());
        assert_eq!(opinion.priority_score, scoring::MAX_SCORE);
        assert_ne!(opinion.priority_score, before);
    }

    #[test]
    fn absent_fields_are_left_unchanged() {
        let mut opinion = PublishedOpinion::example();
        let title = opinion.title.clone();

        let edit = OpinionEdit {
            content: Some("Rewritten for clarity.".to_string()),
            ..Default::default()
        };
        edit.apply(&mut opinion, Utc::now());
        assert_eq!(opinion.title, title);
        assert_eq!(opinion.content, "Rewritten for clarity.");
    }

    #[test]
    fn public_view_carries_no_moderator_fields() {
        let opinion = PublishedOpinion::example();
        let view = PublicOpinionView::new(opinion, 3, vec!["Agreed.".to_string()], false);
        let json = rocket::serde::json::to_string(&view).unwrap();
        assert!(!json.contains("admin_notes"));
        assert!(!json.contains("disclosed_pii"));
        assert!(!json.contains("raw_response_id"));
    }
}
