use chrono::{Duration, Utc};
use mongodb::bson::doc;
use rocket::futures::TryStreamExt;
use rocket::{
    fairing::{Fairing, Info, Kind},
    futures::future::{BoxFuture, FutureExt},
    tokio::sync::Mutex,
    Build, Rocket,
};
use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    error::Error,
    model::{common::SurveyState, db::partition::PartitionRegistry, mongodb::Id},
    scheduled_task::ScheduledTask,
};

use super::Survey;

/// Map from survey IDs to reaper tasks.
type TaskMap = HashMap<Id, ScheduledTask<Result<(), Error>>>;

/// Survey reapers: scheduled tasks that purge each survey's partition when
/// its deletion deadline arrives.
pub struct SurveyReapers {
    tasks: Arc<Mutex<TaskMap>>,
}

impl SurveyReapers {
    /// Create an empty set of survey reapers.
    pub fn new() -> Self {
        Self {
            tasks: Default::default(),
        }
    }

    /// Does the given survey have a reaper scheduled?
    pub async fn has_reaper(&self, survey: Id) -> bool {
        self.tasks.lock().await.contains_key(&survey)
    }

    /// Schedule a reaper for every survey not yet purged.
    pub async fn schedule_surveys(&self, registry: &PartitionRegistry) -> Result<(), Error> {
        let filter = doc! {
            "status": {"$ne": SurveyState::Deleted},
        };
        let surveys: Vec<_> = registry
            .surveys()
            .find(filter, None)
            .await?
            .try_collect()
            .await?;
        for survey in surveys {
            self.schedule_survey(registry.clone(), &survey).await;
        }

        Ok(())
    }

    /// Schedule a reaper for the given survey, to run at its deletion due
    /// date. If one already exists (e.g. the survey was renewed), it is
    /// rescheduled for the new deadline.
    pub async fn schedule_survey(&self, registry: PartitionRegistry, survey: &Survey) {
        let reaper = Self::reaper(survey.id, registry, self.tasks.clone());
        // Schedule the reaper and keep track of it.
        let mut tasks_locked = self.tasks.lock().await;
        if let Some(task) = tasks_locked.remove(&survey.id) {
            let already_completed = task.cancel().await;
            if already_completed {
                // This should never happen, since a task can only complete by either:
                // * erroring, in which case it is replaced before returning.
                // * succeeding, in which case it is removed before returning.
                warn!(
                    "schedule_survey: unexpected code path. This is not a bug in itself, \
but hints that assumptions made elsewhere might be incorrect"
                );
                return;
            }
        }
        let reaper_task = ScheduledTask::new(reaper, survey.deletion_due_date);
        tasks_locked.insert(survey.id, reaper_task);
    }

    /// Immediately trigger the reaper for the given survey, e.g. on an
    /// explicit admin delete. If no reaper was scheduled (or it already
    /// completed), this has no effect.
    pub async fn purge_now(&self, survey_id: Id) -> Result<(), Error> {
        let mut tasks_locked = self.tasks.lock().await;
        let task = tasks_locked.remove(&survey_id);
        drop(tasks_locked); // Avoid deadlock, as the reaper needs the lock too.
        match task {
            Some(reaper) => {
                reaper.trigger_now();
                reaper.await.unwrap_or_else(|_| {
                    Err(Error::Internal(format!(
                        "Failed to purge survey {survey_id}"
                    )))
                })
            }
            None => Ok(()),
        }
    }

    /// Cancel the reaper for the given survey without running it. Used when
    /// renewal moves the deadline; the caller reschedules afterwards.
    pub async fn cancel(&self, survey_id: Id) {
        let mut tasks_locked = self.tasks.lock().await;
        if let Some(task) = tasks_locked.remove(&survey_id) {
            task.cancel().await;
        }
    }

    /// Purge the given survey's partition via the registry.
    /// Since this is a recursive async function, we must use `BoxFuture` to
    /// avoid an infinitely-recursive state machine.
    fn reaper(
        survey_id: Id,
        registry: PartitionRegistry,
        tasks: Arc<Mutex<TaskMap>>,
    ) -> BoxFuture<'static, Result<(), Error>> {
        async move {
            debug!("Running reaper for survey {survey_id}");
            let result = registry.purge(survey_id).await;
            match result {
                Ok(()) => {
                    tasks.lock().await.remove(&survey_id);
                    trace!("Reaper completed; removed self from list");
                }
                Err(ref e) => {
                    error!("Reaper for survey {survey_id} failed, its partition might be leaked: {e}");
                    // Re-schedule the reaper.
                    let retry = Self::reaper(survey_id, registry.clone(), tasks.clone());
                    const RETRY_INTERVAL_SECONDS: i64 = 300;
                    let retry_time = Utc::now() + Duration::seconds(RETRY_INTERVAL_SECONDS);
                    let mut tasks_locked = tasks.lock().await;
                    let reaper_task = ScheduledTask::new(retry, retry_time);
                    tasks_locked.insert(survey_id, reaper_task);
                    warn!("Failed reaper will be retried in {RETRY_INTERVAL_SECONDS} seconds");
                }
            }
            result
        }
        .boxed()
    }
}

impl Default for SurveyReapers {
    fn default() -> Self {
        Self::new()
    }
}

/// A fairing that schedules reapers for all applicable surveys during Rocket
/// ignition, and places a `SurveyReapers` into managed state.
/// This fairing depends on the partition registry being available in managed
/// state, and so must be attached after the fairing responsible for that.
pub struct ReaperFairing;

#[rocket::async_trait]
impl Fairing for ReaperFairing {
    fn info(&self) -> Info {
        Info {
            name: "Survey Reapers",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        info!("Scheduling survey reapers...");
        let reapers = SurveyReapers::new();
        let registry = match rocket.state::<PartitionRegistry>() {
            Some(registry) => registry,
            None => {
                error!("Partition registry was not available when scheduling reapers");
                return Err(rocket);
            }
        };
        if let Err(e) = reapers.schedule_surveys(registry).await {
            error!("Failed to schedule survey reapers: {e}");
            return Err(rocket);
        }
        info!("...survey reapers scheduled!");

        // Manage the state.
        rocket = rocket.manage(reapers);
        Ok(rocket)
    }
}
