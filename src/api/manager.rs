use chrono::Utc;
use mongodb::bson::doc;
use rocket::{futures::TryStreamExt, serde::json::Json, Route, State};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            opinion::ModeratorOpinionView,
            report::{ReportFormat, ReportRow, ReportSnapshot},
            survey::SurveyDescription,
            upvote::UpvoteView,
        },
        auth::{
            policy::{self, Action, Actor},
            AuthToken,
        },
        common::scoring,
        db::{
            opinion::PublishedOpinion,
            partition::{Partition, PartitionRegistry},
            survey::Survey,
            upvote::Upvote,
        },
        mongodb::Id,
    },
};

use super::common::{published_comments, supporter_count};

pub fn routes() -> Vec<Route> {
    routes![
        get_managed_survey,
        get_manager_opinions,
        get_manager_upvotes,
        export_report,
    ]
}

/// Resolve the survey and check the manager token actually covers it.
async fn resolve_for(
    token: &AuthToken<Survey>,
    action: Action,
    survey_id: Id,
    registry: &PartitionRegistry,
) -> Result<(Survey, Partition)> {
    let (survey, partition) = registry.resolve(survey_id).await?;
    policy::authorize(
        &Actor::Manager(token),
        action,
        survey_id,
        survey.code_version,
    )
    .map_err(Error::AuthDenied)?;
    Ok((survey, partition))
}

#[get("/manager/surveys/<survey_id>")]
async fn get_managed_survey(
    token: AuthToken<Survey>,
    survey_id: Id,
    registry: &State<PartitionRegistry>,
) -> Result<Json<SurveyDescription>> {
    let (survey, _) =
        resolve_for(&token, Action::ReadDisclosedOpinions, survey_id, registry).await?;
    Ok(Json(SurveyDescription::new(&survey, Utc::now())))
}

/// The full opinion list including disclosed PII, highest priority first.
#[get("/manager/surveys/<survey_id>/opinions")]
async fn get_manager_opinions(
    token: AuthToken<Survey>,
    survey_id: Id,
    registry: &State<PartitionRegistry>,
) -> Result<Json<Vec<ModeratorOpinionView>>> {
    let (_, partition) =
        resolve_for(&token, Action::ReadDisclosedOpinions, survey_id, registry).await?;
    super::admin::moderator_views(&partition).await.map(Json)
}

#[get("/manager/surveys/<survey_id>/opinions/<opinion_id>/upvotes")]
async fn get_manager_upvotes(
    token: AuthToken<Survey>,
    survey_id: Id,
    opinion_id: Id,
    registry: &State<PartitionRegistry>,
) -> Result<Json<Vec<UpvoteView>>> {
    let (_, partition) =
        resolve_for(&token, Action::ReadDisclosedUpvotes, survey_id, registry).await?;
    let upvotes: Vec<Upvote> = partition
        .coll::<Upvote>()
        .find(doc! {"opinion_id": opinion_id}, None)
        .await?
        .try_collect()
        .await?;
    let views = upvotes
        .into_iter()
        .map(UpvoteView::from_upvote)
        .collect::<Result<_>>()?;
    Ok(Json(views))
}

/// The complete survey export as a JSON snapshot. The requested file format
/// is echoed back for the client-side renderer; the server never produces
/// binary documents.
#[get("/manager/surveys/<survey_id>/export?<format>")]
async fn export_report(
    token: AuthToken<Survey>,
    survey_id: Id,
    format: ReportFormat,
    registry: &State<PartitionRegistry>,
) -> Result<Json<ReportSnapshot>> {
    let (survey, partition) =
        resolve_for(&token, Action::ExportReport, survey_id, registry).await?;

    let mut opinions: Vec<PublishedOpinion> = partition
        .coll::<PublishedOpinion>()
        .find(None, None)
        .await?
        .try_collect()
        .await?;
    opinions.sort_by(|a, b| b.priority_score.cmp(&a.priority_score));

    let mut rows = Vec::with_capacity(opinions.len());
    for opinion in opinions {
        let supporters = supporter_count(&partition, opinion.id).await?;
        let comments = published_comments(&partition, opinion.id).await?;
        rows.push(ReportRow {
            title: opinion.opinion.title,
            content: opinion.opinion.content,
            scores: opinion.opinion.scores,
            priority_score: opinion.opinion.priority_score,
            tier: scoring::tier(opinion.opinion.priority_score),
            supporters,
            disclosed_pii: opinion.opinion.disclosed_pii,
            comments,
        });
    }

    let now = Utc::now();
    Ok(Json(ReportSnapshot {
        survey: SurveyDescription::new(&survey, now),
        generated_at: now,
        format,
        rows,
    }))
}
