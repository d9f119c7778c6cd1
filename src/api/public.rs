use chrono::Utc;
use mongodb::bson::doc;
use rocket::{futures::TryStreamExt, serde::json::Json, Route, State};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            opinion::PublicOpinionView,
            question::{QuestionView, QuestionsForSubmission},
            submission::{SubmitReceipt, SubmitRequest},
            upvote::SupportRequest,
        },
        auth::Fingerprint,
        common::{consent, SearchQuery},
        db::{
            opinion::PublishedOpinion,
            partition::PartitionRegistry,
            response::NewRawResponse,
            upvote::{NewUpvote, Upvote, UpvoteCore},
        },
        mongodb::{errors::on_duplicate_key, Id},
    },
};

use super::common::{
    load_questions, published_comments, question_map, require_active, supporter_count,
};

pub fn routes() -> Vec<Route> {
    routes![get_questions, submit_response, get_opinions, support_opinion]
}

/// The survey form. Readable while suspended so respondents can still see
/// what was asked, even though new submissions are refused.
#[get("/surveys/<survey_id>/questions")]
pub async fn get_questions(
    survey_id: Id,
    registry: &State<PartitionRegistry>,
) -> Result<Json<QuestionsForSubmission>> {
    let (survey, partition) = registry.resolve(survey_id).await?;
    let questions = load_questions(&partition).await?;

    Ok(Json(QuestionsForSubmission {
        survey_name: survey.name.clone(),
        status: survey.state_at(Utc::now()),
        questions: questions.into_iter().map(QuestionView::from).collect(),
    }))
}

/// Submit a filled-in survey form. The whole submission lands in one
/// document insert, so it is recorded fully or not at all.
#[post("/surveys/<survey_id>/responses", data = "<request>", format = "json")]
pub async fn submit_response(
    survey_id: Id,
    request: Json<SubmitRequest>,
    registry: &State<PartitionRegistry>,
) -> Result<Json<SubmitReceipt>> {
    let (survey, partition) = registry.resolve(survey_id).await?;
    require_active(&survey)?;

    let questions = load_questions(&partition).await?;
    let now = Utc::now();
    let response = request.into_inner().into_response(&question_map(&questions), now)?;

    let response_id: Id = partition
        .coll::<NewRawResponse>()
        .insert_one(&response, None)
        .await?
        .inserted_id
        .as_object_id()
        .unwrap() // Safe because the ID comes directly from the database.
        .into();

    Ok(Json(SubmitReceipt {
        response_id,
        submitted_at: now,
    }))
}

/// The public opinion board, optionally filtered by a search query.
///
/// An empty query matches everything, so with or without one the ordering is
/// the same: most relevant first, most recently updated first within a rank.
#[get("/surveys/<survey_id>/opinions?<search>")]
pub async fn get_opinions(
    survey_id: Id,
    search: Option<String>,
    fingerprint: Fingerprint,
    registry: &State<PartitionRegistry>,
) -> Result<Json<Vec<PublicOpinionView>>> {
    let (_, partition) = registry.resolve(survey_id).await?;

    let opinions: Vec<PublishedOpinion> = partition
        .coll::<PublishedOpinion>()
        .find(None, None)
        .await?
        .try_collect()
        .await?;

    let query = SearchQuery::parse(search.as_deref().unwrap_or(""));
    let ranked = rank_opinions(&query, opinions);

    let mut views = Vec::with_capacity(ranked.len());
    for opinion in ranked {
        let supporters = supporter_count(&partition, opinion.id).await?;
        let comments = published_comments(&partition, opinion.id).await?;
        let has_supported = partition
            .coll::<Upvote>()
            .count_documents(
                doc! {"opinion_id": opinion.id, "fingerprint": fingerprint.as_str()},
                None,
            )
            .await?
            > 0;
        views.push(PublicOpinionView::new(
            opinion,
            supporters,
            comments,
            has_supported,
        ));
    }

    Ok(Json(views))
}

/// Order opinions for the board. Only matches survive (an empty query
/// matches every opinion with zero relevance), sorted by relevance
/// descending, then `updated_at` descending, then id as a stable tie-break.
fn rank_opinions(
    query: &SearchQuery,
    opinions: Vec<PublishedOpinion>,
) -> Vec<PublishedOpinion> {
    let mut ranked: Vec<(usize, PublishedOpinion)> = opinions
        .into_iter()
        .filter_map(|opinion| {
            if query.is_empty() {
                return Some((0, opinion));
            }
            let relevance = query.relevance(&opinion.title, &opinion.content);
            (relevance > 0).then_some((relevance, opinion))
        })
        .collect();
    ranked.sort_by(|(ra, a), (rb, b)| {
        rb.cmp(ra)
            .then(b.updated_at.cmp(&a.updated_at))
            .then(b.id.cmp(&a.id))
    });
    ranked.into_iter().map(|(_, opinion)| opinion).collect()
}

/// Support a published opinion. At most one upvote per client per opinion;
/// the unique index enforces this atomically, so racing duplicates lose.
#[post(
    "/surveys/<survey_id>/opinions/<opinion_id>/support",
    data = "<request>",
    format = "json"
)]
pub async fn support_opinion(
    survey_id: Id,
    opinion_id: Id,
    request: Json<SupportRequest>,
    fingerprint: Fingerprint,
    registry: &State<PartitionRegistry>,
) -> Result<()> {
    let (survey, partition) = registry.resolve(survey_id).await?;
    require_active(&survey)?;

    partition
        .coll::<PublishedOpinion>()
        .find_one(opinion_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Opinion {opinion_id}")))?;

    let request = request.into_inner();
    let disclosed_pii = consent::disclose(request.pii(), request.is_disclosure_agreed);
    let upvote = UpvoteCore::new(
        opinion_id,
        fingerprint,
        request.comment,
        disclosed_pii,
        Utc::now(),
    );

    partition
        .coll::<NewUpvote>()
        .insert_one(&upvote, None)
        .await
        .map_err(|err| on_duplicate_key(err, Error::AlreadySupported))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn opinion_with(priority_inputs: u32, updated_at: chrono::DateTime<Utc>) -> PublishedOpinion {
        let mut opinion = PublishedOpinion::example();
        opinion.opinion.scores.importance = priority_inputs;
        opinion.opinion.scores.urgency = priority_inputs;
        opinion.opinion.scores.expected_impact = priority_inputs;
        opinion.opinion.scores.supporter_points = priority_inputs;
        opinion.opinion.rescore(updated_at);
        opinion
    }

    #[test]
    fn board_without_a_query_is_most_recent_first() {
        let now = Utc::now();
        let urgent_but_stale = opinion_with(2, now - Duration::hours(2));
        let minor_but_fresh = opinion_with(0, now);
        assert!(urgent_but_stale.priority_score > minor_but_fresh.priority_score);

        let ranked = rank_opinions(
            &SearchQuery::parse(""),
            vec![urgent_but_stale, minor_but_fresh],
        );
        assert_eq!(ranked[0].priority_score, 0);
        assert_eq!(ranked[1].priority_score, 14);
    }

    #[test]
    fn equally_relevant_matches_are_most_recent_first() {
        let now = Utc::now();
        let mut older = opinion_with(2, now - Duration::hours(1));
        older.opinion.title = "Meetings overrun".to_string();
        let mut newer = opinion_with(0, now);
        newer.opinion.title = "Meetings have no agenda".to_string();
        let newer_id = newer.id;

        let ranked = rank_opinions(&SearchQuery::parse("meetings"), vec![older, newer]);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].id, newer_id);
    }

    #[test]
    fn non_matching_opinions_are_filtered_out() {
        let ranked = rank_opinions(
            &SearchQuery::parse("parking"),
            vec![PublishedOpinion::example()],
        );
        assert!(ranked.is_empty());
    }
}
