//! The registry of survey partitions.
//!
//! Every survey gets its own MongoDB database, so one survey's data can never
//! appear in another's query results and purging a survey is a single
//! `dropDatabase`. The registry database holds only the survey index and the
//! admin users; everything respondent-facing lives inside a partition.

use chrono::Utc;
use mongodb::{bson::doc, error::Error as DbError, Client, Database};

use crate::error::{Error, Result};
use crate::model::{
    common::SurveyState,
    mongodb::{ensure_tenant_indexes_exist, Coll, Id, MongoCollection, TENANT_COLLECTIONS},
};

use super::survey::Survey;

/// A handle on one survey's dedicated database. Obtained only by resolving a
/// survey through the [`PartitionRegistry`], so holding one proves the survey
/// existed (and was not deleted) at resolution time.
pub struct Partition {
    survey_id: Id,
    db: Database,
}

impl Partition {
    fn new(survey_id: Id, db: Database) -> Self {
        Self { survey_id, db }
    }

    /// The survey this partition belongs to.
    pub fn survey_id(&self) -> Id {
        self.survey_id
    }

    /// The underlying database name.
    pub fn name(&self) -> &str {
        self.db.name()
    }

    /// Get a handle on a tenant collection inside this partition.
    pub fn coll<T: MongoCollection>(&self) -> Coll<T> {
        Coll::from_db(&self.db)
    }
}

/// Access to the survey registry and the per-survey partitions it indexes.
#[derive(Clone)]
pub struct PartitionRegistry {
    client: Client,
    registry: Database,
}

impl PartitionRegistry {
    pub fn new(client: Client, registry: Database) -> Self {
        Self { client, registry }
    }

    /// The registry's survey collection.
    pub fn surveys(&self) -> Coll<Survey> {
        Coll::from_db(&self.registry)
    }

    /// Look up a survey and open its partition.
    ///
    /// Fails with `NotFound` for unknown ids and for surveys whose deletion
    /// deadline has passed, whether or not the purge task has run yet. This
    /// is the only way to obtain a [`Partition`], so no operation can touch
    /// the data of a survey that is past its deadline.
    pub async fn resolve(&self, survey_id: Id) -> Result<(Survey, Partition)> {
        let survey = self
            .surveys()
            .find_one(survey_id.as_doc(), None)
            .await?
            .filter(|survey| survey.state_at(Utc::now()) != SurveyState::Deleted)
            .ok_or_else(|| Error::not_found(format!("Survey {survey_id}")))?;
        let db = self.client.database(&survey.partition_name);
        Ok((survey, Partition::new(survey_id, db)))
    }

    /// Create the partition for a new survey and register it.
    ///
    /// Idempotent on the survey id: provisioning an already-registered survey
    /// returns its existing partition untouched. If container or index
    /// creation fails partway, the half-built partition database is dropped
    /// before the error is returned, so a failed provision leaves no trace.
    pub async fn provision(&self, survey: Survey) -> Result<Partition> {
        if let Some(existing) = self.surveys().find_one(survey.id.as_doc(), None).await? {
            debug!("Survey {} already provisioned", existing.id);
            let db = self.client.database(&existing.partition_name);
            return Ok(Partition::new(existing.id, db));
        }

        let db = self.client.database(&survey.partition_name);
        if let Err(e) = prepare_partition(&db).await {
            let _ = db.drop(None).await;
            return Err(Error::ProvisionFailed(e));
        }
        // Register last: the registry row is what makes the survey visible,
        // so a crash before this point leaves at worst an orphan database
        // that a re-provision or purge can clean up.
        if let Err(e) = self.surveys().insert_one(&survey, None).await {
            let _ = db.drop(None).await;
            return Err(Error::ProvisionFailed(e));
        }

        info!(
            "Provisioned partition '{}' for survey '{}'",
            survey.partition_name, survey.name
        );
        Ok(Partition::new(survey.id, db))
    }

    /// Irreversibly destroy a survey's data.
    ///
    /// The registry row is marked deleted *before* the partition database is
    /// dropped, so resolution starts refusing the survey even if the drop is
    /// interrupted; the row itself is kept as an audit record.
    pub async fn purge(&self, survey_id: Id) -> Result<()> {
        let survey = self
            .surveys()
            .find_one(survey_id.as_doc(), None)
            .await?
            .ok_or_else(|| Error::not_found(format!("Survey {survey_id}")))?;

        self.surveys()
            .update_one(
                survey_id.as_doc(),
                doc! {"$set": {"status": SurveyState::Deleted}},
                None,
            )
            .await?;
        self.client.database(&survey.partition_name).drop(None).await?;

        info!(
            "Purged partition '{}' for survey '{}'",
            survey.partition_name, survey.name
        );
        Ok(())
    }
}

/// Create the tenant collections and their uniqueness indexes.
async fn prepare_partition(db: &Database) -> std::result::Result<(), DbError> {
    for name in TENANT_COLLECTIONS {
        db.create_collection(name, None).await?;
    }
    ensure_tenant_indexes_exist(db).await
}
