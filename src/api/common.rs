//! Query helpers shared between the route modules.

use std::collections::HashMap;

use chrono::Utc;
use mongodb::{bson::doc, options::FindOptions};
use rocket::futures::TryStreamExt;

use crate::error::{Error, Result};
use crate::model::{
    common::SurveyState,
    db::{partition::Partition, question::Question, survey::Survey, upvote::Upvote},
    mongodb::Id,
};

/// Reject writes against a survey whose contract has ended.
pub fn require_active(survey: &Survey) -> Result<()> {
    match survey.state_at(Utc::now()) {
        SurveyState::Active => Ok(()),
        _ => Err(Error::SurveyNotActive),
    }
}

/// All of a survey's questions in display order.
pub async fn load_questions(partition: &Partition) -> Result<Vec<Question>> {
    let options = FindOptions::builder().sort(doc! {"position": 1}).build();
    let questions = partition
        .coll::<Question>()
        .find(None, options)
        .await?
        .try_collect()
        .await?;
    Ok(questions)
}

/// Index questions by id for answer validation and labelling.
pub fn question_map(questions: &[Question]) -> HashMap<Id, &Question> {
    questions.iter().map(|q| (q.id, q)).collect()
}

/// The live supporter tally for an opinion: every upvote counts regardless of
/// its comment's moderation status.
pub async fn supporter_count(partition: &Partition, opinion_id: Id) -> Result<u64> {
    let count = partition
        .coll::<Upvote>()
        .count_documents(doc! {"opinion_id": opinion_id}, None)
        .await?;
    Ok(count)
}

/// How many of an opinion's upvotes still await comment moderation.
pub async fn pending_count(partition: &Partition, opinion_id: Id) -> Result<u64> {
    let count = partition
        .coll::<Upvote>()
        .count_documents(
            doc! {
                "opinion_id": opinion_id,
                "status": crate::model::common::UpvoteStatus::Pending,
            },
            None,
        )
        .await?;
    Ok(count)
}

/// The moderator-approved supporter comments for an opinion, oldest first.
pub async fn published_comments(partition: &Partition, opinion_id: Id) -> Result<Vec<String>> {
    let options = FindOptions::builder().sort(doc! {"created_at": 1}).build();
    let upvotes: Vec<Upvote> = partition
        .coll::<Upvote>()
        .find(
            doc! {
                "opinion_id": opinion_id,
                "status": crate::model::common::UpvoteStatus::Published,
                "published_comment": {"$ne": null},
            },
            options,
        )
        .await?
        .try_collect()
        .await?;
    Ok(upvotes
        .into_iter()
        .filter_map(|upvote| upvote.upvote.published_comment)
        .collect())
}
