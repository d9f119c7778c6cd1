use chrono::Utc;
use mongodb::bson::{doc, DateTime as BsonDateTime};
use rocket::{futures::TryStreamExt, serde::json::Json, Route, State};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            opinion::{ModeratorOpinionView, OpinionEdit, PublishSpec},
            question::{QuestionSpec, QuestionView},
            submission::{RawResponseDetail, RawResponseSummary},
            survey::{SurveyDescription, SurveyReceipt, SurveySpec},
            upvote::{ModerateRequest, UpvoteView},
        },
        auth::{AccessCode, AuthToken},
        common::{consent, Pii, UpvoteStatus},
        db::{
            admin::Admin,
            opinion::{NewOpinion, OpinionCore, PublishedOpinion},
            partition::{Partition, PartitionRegistry},
            question::{NewQuestion, Question},
            response::RawResponse,
            survey::{reaper::SurveyReapers, Survey},
            upvote::Upvote,
        },
        mongodb::{errors::on_duplicate_key, Id},
    },
    Config,
};

use super::common::{load_questions, pending_count, question_map, supporter_count};

pub fn routes() -> Vec<Route> {
    routes![
        get_surveys,
        create_survey,
        get_survey,
        renew_survey,
        rotate_access_code,
        delete_survey,
        get_survey_questions,
        create_question,
        delete_question,
        get_responses,
        get_response,
        publish_opinion,
        get_admin_opinions,
        edit_opinion,
        get_opinion_upvotes,
        moderate_upvote,
    ]
}

/// Every survey in the registry, including suspended and purged ones, with
/// the effective state at call time.
#[get("/admin/surveys")]
async fn get_surveys(
    _token: AuthToken<Admin>,
    registry: &State<PartitionRegistry>,
) -> Result<Json<Vec<SurveyDescription>>> {
    let surveys: Vec<Survey> = registry
        .surveys()
        .find(None, None)
        .await?
        .try_collect()
        .await?;
    let now = Utc::now();
    Ok(Json(
        surveys
            .iter()
            .map(|survey| SurveyDescription::new(survey, now))
            .collect(),
    ))
}

/// Create a survey: provision its partition, register it, schedule its
/// reaper, and hand back the plaintext access code (this is the only time it
/// is ever visible).
#[post("/admin/surveys", data = "<spec>", format = "json")]
async fn create_survey(
    _token: AuthToken<Admin>,
    spec: Json<SurveySpec>,
    registry: &State<PartitionRegistry>,
    reapers: &State<SurveyReapers>,
    config: &State<Config>,
) -> Result<Json<SurveyReceipt>> {
    let spec = spec.into_inner();
    spec.validate()?;

    let access_code = AccessCode::generate();
    let access_code_hash = access_code.clone().into_hash()?;

    let now = Utc::now();
    let contract_period = spec
        .contract_days
        .map(|days| chrono::Duration::days(days.into()))
        .unwrap_or_else(|| config.contract_period());
    let survey = Survey::new(
        spec.name,
        spec.notes,
        access_code_hash,
        now,
        contract_period,
        config.grace_period(),
    );

    registry.provision(survey.clone()).await?;
    reapers
        .schedule_survey(registry.inner().clone(), &survey)
        .await;

    Ok(Json(SurveyReceipt {
        survey: SurveyDescription::new(&survey, now),
        access_code,
    }))
}

#[get("/admin/surveys/<survey_id>")]
async fn get_survey(
    _token: AuthToken<Admin>,
    survey_id: Id,
    registry: &State<PartitionRegistry>,
) -> Result<Json<SurveyDescription>> {
    let (survey, _) = registry.resolve(survey_id).await?;
    Ok(Json(SurveyDescription::new(&survey, Utc::now())))
}

/// Re-open a survey's contract window, reviving it if suspended, and push
/// its purge deadline out accordingly.
#[post("/admin/surveys/<survey_id>/renew")]
async fn renew_survey(
    _token: AuthToken<Admin>,
    survey_id: Id,
    registry: &State<PartitionRegistry>,
    reapers: &State<SurveyReapers>,
    config: &State<Config>,
) -> Result<Json<SurveyDescription>> {
    let (mut survey, _) = registry.resolve(survey_id).await?;

    let now = Utc::now();
    survey
        .survey
        .renew(now, config.contract_period(), config.grace_period());
    registry
        .surveys()
        .update_one(
            survey_id.as_doc(),
            doc! {"$set": {
                "contract_end_date": BsonDateTime::from_chrono(survey.contract_end_date),
                "deletion_due_date": BsonDateTime::from_chrono(survey.deletion_due_date),
            }},
            None,
        )
        .await?;

    // The reaper must track the new deadline.
    reapers
        .schedule_survey(registry.inner().clone(), &survey)
        .await;

    Ok(Json(SurveyDescription::new(&survey, now)))
}

/// Rotate a survey's access code. Every manager token issued under the old
/// code stops working immediately, since tokens embed the code version.
#[post("/admin/surveys/<survey_id>/access-code")]
async fn rotate_access_code(
    _token: AuthToken<Admin>,
    survey_id: Id,
    registry: &State<PartitionRegistry>,
) -> Result<Json<SurveyReceipt>> {
    let (mut survey, _) = registry.resolve(survey_id).await?;

    let access_code = AccessCode::generate();
    let access_code_hash = access_code.clone().into_hash()?;
    registry
        .surveys()
        .update_one(
            survey_id.as_doc(),
            doc! {
                "$set": {"access_code_hash": &access_code_hash},
                "$inc": {"code_version": 1},
            },
            None,
        )
        .await?;
    survey.survey.access_code_hash = access_code_hash;
    survey.survey.code_version += 1;

    Ok(Json(SurveyReceipt {
        survey: SurveyDescription::new(&survey, Utc::now()),
        access_code,
    }))
}

/// Purge a survey ahead of its deadline. The registry row survives as an
/// audit record; the partition and everything in it is destroyed.
#[delete("/admin/surveys/<survey_id>")]
async fn delete_survey(
    _token: AuthToken<Admin>,
    survey_id: Id,
    registry: &State<PartitionRegistry>,
    reapers: &State<SurveyReapers>,
) -> Result<()> {
    // Ensure the survey exists before reporting success.
    registry.resolve(survey_id).await?;

    if reapers.has_reaper(survey_id).await {
        reapers.purge_now(survey_id).await
    } else {
        registry.purge(survey_id).await
    }
}

#[get("/admin/surveys/<survey_id>/questions")]
async fn get_survey_questions(
    _token: AuthToken<Admin>,
    survey_id: Id,
    registry: &State<PartitionRegistry>,
) -> Result<Json<Vec<QuestionView>>> {
    let (_, partition) = registry.resolve(survey_id).await?;
    let questions = load_questions(&partition).await?;
    Ok(Json(questions.into_iter().map(QuestionView::from).collect()))
}

#[post("/admin/surveys/<survey_id>/questions", data = "<spec>", format = "json")]
async fn create_question(
    _token: AuthToken<Admin>,
    survey_id: Id,
    spec: Json<QuestionSpec>,
    registry: &State<PartitionRegistry>,
) -> Result<Json<QuestionView>> {
    let (_, partition) = registry.resolve(survey_id).await?;

    let question: NewQuestion = spec.into_inner().try_into()?;
    let new_id: Id = partition
        .coll::<NewQuestion>()
        .insert_one(&question, None)
        .await?
        .inserted_id
        .as_object_id()
        .unwrap() // Safe because the ID comes directly from the database.
        .into();

    Ok(Json(QuestionView::from(Question {
        id: new_id,
        question,
    })))
}

// Questions are add/delete only; there is no in-place edit.
#[delete("/admin/surveys/<survey_id>/questions/<question_id>")]
async fn delete_question(
    _token: AuthToken<Admin>,
    survey_id: Id,
    question_id: Id,
    registry: &State<PartitionRegistry>,
) -> Result<()> {
    let (_, partition) = registry.resolve(survey_id).await?;
    let result = partition
        .coll::<Question>()
        .delete_one(question_id.as_doc(), None)
        .await?;
    if result.deleted_count == 0 {
        Err(Error::not_found(format!("Question {question_id}")))
    } else {
        Ok(())
    }
}

#[get("/admin/surveys/<survey_id>/responses")]
async fn get_responses(
    _token: AuthToken<Admin>,
    survey_id: Id,
    registry: &State<PartitionRegistry>,
) -> Result<Json<Vec<RawResponseSummary>>> {
    let (_, partition) = registry.resolve(survey_id).await?;
    let responses: Vec<RawResponse> = partition
        .coll::<RawResponse>()
        .find(None, None)
        .await?
        .try_collect()
        .await?;
    Ok(Json(responses.iter().map(RawResponseSummary::from).collect()))
}

#[get("/admin/surveys/<survey_id>/responses/<response_id>")]
async fn get_response(
    _token: AuthToken<Admin>,
    survey_id: Id,
    response_id: Id,
    registry: &State<PartitionRegistry>,
) -> Result<Json<RawResponseDetail>> {
    let (_, partition) = registry.resolve(survey_id).await?;
    let response = partition
        .coll::<RawResponse>()
        .find_one(response_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Raw response {response_id}")))?;
    let questions = load_questions(&partition).await?;
    Ok(Json(RawResponseDetail::new(
        response,
        &question_map(&questions),
    )))
}

/// Publish a raw response as a public opinion. The respondent's consented
/// personal data is snapshotted onto the opinion at this moment; consent
/// recorded at submission time is what counts, not later edits.
#[post("/admin/surveys/<survey_id>/opinions", data = "<spec>", format = "json")]
async fn publish_opinion(
    _token: AuthToken<Admin>,
    survey_id: Id,
    spec: Json<PublishSpec>,
    registry: &State<PartitionRegistry>,
) -> Result<Json<ModeratorOpinionView>> {
    let (_, partition) = registry.resolve(survey_id).await?;
    let spec = spec.into_inner();

    let response = partition
        .coll::<RawResponse>()
        .find_one(spec.raw_response_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Raw response {}", spec.raw_response_id)))?;

    let questions = load_questions(&partition).await?;
    let disclosed_pii = snapshot_pii(&response, &questions);

    let opinion = OpinionCore::new(
        spec.raw_response_id,
        spec.title,
        spec.content,
        spec.admin_notes,
        spec.scores,
        disclosed_pii,
        Utc::now(),
    );
    let new_id: Id = partition
        .coll::<NewOpinion>()
        .insert_one(&opinion, None)
        .await
        .map_err(|err| on_duplicate_key(err, Error::DuplicatePublish))?
        .inserted_id
        .as_object_id()
        .unwrap() // Safe because the ID comes directly from the database.
        .into();

    Ok(Json(ModeratorOpinionView::new(
        PublishedOpinion {
            id: new_id,
            opinion,
        },
        0,
        0,
    )))
}

/// The consented personal data from a raw response, labelled by question.
fn snapshot_pii(response: &RawResponse, questions: &[Question]) -> Option<Pii> {
    let consented: Pii = response
        .answers
        .iter()
        .filter(|answer| answer.is_disclosure_agreed)
        .filter_map(|answer| {
            questions
                .iter()
                .find(|q| q.id == answer.question_id && q.is_personal_data)
                .map(|q| (q.label.clone(), answer.answer_text.clone()))
        })
        .collect();
    let agreed = !consented.is_empty();
    consent::disclose(consented, agreed)
}

#[get("/admin/surveys/<survey_id>/opinions")]
async fn get_admin_opinions(
    _token: AuthToken<Admin>,
    survey_id: Id,
    registry: &State<PartitionRegistry>,
) -> Result<Json<Vec<ModeratorOpinionView>>> {
    let (_, partition) = registry.resolve(survey_id).await?;
    moderator_views(&partition).await.map(Json)
}

#[patch(
    "/admin/surveys/<survey_id>/opinions/<opinion_id>",
    data = "<edit>",
    format = "json"
)]
async fn edit_opinion(
    _token: AuthToken<Admin>,
    survey_id: Id,
    opinion_id: Id,
    edit: Json<OpinionEdit>,
    registry: &State<PartitionRegistry>,
) -> Result<Json<ModeratorOpinionView>> {
    let (_, partition) = registry.resolve(survey_id).await?;

    let mut opinion = partition
        .coll::<PublishedOpinion>()
        .find_one(opinion_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Opinion {opinion_id}")))?;
    edit.into_inner().apply(&mut opinion, Utc::now());

    partition
        .coll::<PublishedOpinion>()
        .replace_one(opinion_id.as_doc(), &opinion, None)
        .await?;

    let supporters = supporter_count(&partition, opinion_id).await?;
    let pending = pending_count(&partition, opinion_id).await?;
    Ok(Json(ModeratorOpinionView::new(opinion, supporters, pending)))
}

#[get("/admin/surveys/<survey_id>/opinions/<opinion_id>/upvotes")]
async fn get_opinion_upvotes(
    _token: AuthToken<Admin>,
    survey_id: Id,
    opinion_id: Id,
    registry: &State<PartitionRegistry>,
) -> Result<Json<Vec<UpvoteView>>> {
    let (_, partition) = registry.resolve(survey_id).await?;
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

/// Decide the fate of a commented upvote. Approval publishes the comment
/// (possibly edited); rejection hides it. The upvote keeps counting towards
/// the supporter total either way.
#[patch(
    "/admin/surveys/<survey_id>/upvotes/<upvote_id>",
    data = "<request>",
    format = "json"
)]
async fn moderate_upvote(
    _token: AuthToken<Admin>,
    survey_id: Id,
    upvote_id: Id,
    request: Json<ModerateRequest>,
    registry: &State<PartitionRegistry>,
) -> Result<Json<UpvoteView>> {
    let (_, partition) = registry.resolve(survey_id).await?;
    let request = request.into_inner();

    let mut upvote = partition
        .coll::<Upvote>()
        .find_one(upvote_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Upvote {upvote_id}")))?;

    upvote.upvote.status = request.status;
    upvote.upvote.published_comment = match request.status {
        UpvoteStatus::Published => request
            .published_comment
            .or_else(|| upvote.upvote.raw_comment.clone()),
        UpvoteStatus::Pending | UpvoteStatus::Rejected => None,
    };

    partition
        .coll::<Upvote>()
        .replace_one(upvote_id.as_doc(), &upvote, None)
        .await?;

    UpvoteView::from_upvote(upvote).map(Json)
}

/// Every opinion in a partition as a moderator view, highest priority first.
pub(super) async fn moderator_views(partition: &Partition) -> Result<Vec<ModeratorOpinionView>> {
    let mut opinions: Vec<PublishedOpinion> = partition
        .coll::<PublishedOpinion>()
        .find(None, None)
        .await?
        .try_collect()
        .await?;
    opinions.sort_by(|a, b| {
        b.priority_score
            .cmp(&a.priority_score)
            .then(b.updated_at.cmp(&a.updated_at))
    });

    let mut views = Vec::with_capacity(opinions.len());
    for opinion in opinions {
        let supporters = supporter_count(partition, opinion.id).await?;
        let pending = pending_count(partition, opinion.id).await?;
        views.push(ModeratorOpinionView::new(opinion, supporters, pending));
    }
    Ok(views)
}
