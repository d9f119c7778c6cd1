pub mod reaper;

use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Duration, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::{common::SurveyState, mongodb::Id};

/// The name of the dedicated tenant database for a survey. Derived from the
/// registry id, so it is unique by construction and stable for the lifetime
/// of the survey.
pub fn partition_name(id: Id) -> String {
    format!("survey_{}", id.to_hex())
}

/// Core survey registry data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyCore {
    /// Display name shown to respondents.
    pub name: String,
    /// Tenant database name; see [`partition_name`].
    pub partition_name: String,
    /// Stored status. [`SurveyState::Suspended`] is never stored; it is
    /// derived from the contract end date at read time via [`state_at`].
    ///
    /// [`state_at`]: SurveyCore::state_at
    pub status: SurveyState,
    /// End of the submission window.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub contract_end_date: DateTime<Utc>,
    /// When the partition becomes eligible for purging.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub deletion_due_date: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    /// Free-form admin notes, never shown publicly.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Argon2 hash of the manager access code.
    pub access_code_hash: String,
    /// Bumped on every access-code rotation; manager tokens embed the version
    /// they were issued under and become invalid when it moves on.
    pub code_version: u32,
}

impl SurveyCore {
    /// Create a new survey record with a freshly opened contract window.
    pub fn new(
        id: Id,
        name: String,
        notes: Option<String>,
        access_code_hash: String,
        now: DateTime<Utc>,
        contract_period: Duration,
        grace_period: Duration,
    ) -> Self {
        let contract_end_date = now + contract_period;
        Self {
            name,
            partition_name: partition_name(id),
            status: SurveyState::Active,
            contract_end_date,
            deletion_due_date: contract_end_date + grace_period,
            created_at: now,
            notes,
            access_code_hash,
            code_version: 1,
        }
    }

    /// The effective lifecycle state at the given instant.
    ///
    /// Deadlines are evaluated lazily on read rather than flipped by a
    /// background job, so a survey is suspended or deleted the moment its
    /// deadline passes even if no writer has touched it since.
    pub fn state_at(&self, now: DateTime<Utc>) -> SurveyState {
        if self.status == SurveyState::Deleted || now >= self.deletion_due_date {
            SurveyState::Deleted
        } else if now >= self.contract_end_date {
            SurveyState::Suspended
        } else {
            SurveyState::Active
        }
    }

    /// Re-open the contract window from `now`, reviving a suspended survey.
    /// Has no effect on the stored status; a purged survey cannot be renewed
    /// because its registry row is already marked deleted and resolution
    /// refuses it.
    pub fn renew(&mut self, now: DateTime<Utc>, contract_period: Duration, grace_period: Duration) {
        self.contract_end_date = now + contract_period;
        self.deletion_due_date = self.contract_end_date + grace_period;
    }
}

/// A survey from the registry, with its unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Survey {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub survey: SurveyCore,
}

impl Survey {
    /// Create a new survey, allocating its id (and hence partition name)
    /// client-side so both exist before the registry insert.
    pub fn new(
        name: String,
        notes: Option<String>,
        access_code_hash: String,
        now: DateTime<Utc>,
        contract_period: Duration,
        grace_period: Duration,
    ) -> Self {
        let id = Id::new();
        let survey = SurveyCore::new(
            id,
            name,
            notes,
            access_code_hash,
            now,
            contract_period,
            grace_period,
        );
        Self { id, survey }
    }
}

impl Deref for Survey {
    type Target = SurveyCore;

    fn deref(&self) -> &Self::Target {
        &self.survey
    }
}

impl DerefMut for Survey {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.survey
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl Survey {
        pub fn example() -> Self {
            Self::new(
                "Quarterly Department Feedback".to_string(),
                Some("Pilot run with the engineering department.".to_string()),
                "unused-hash".to_string(),
                Utc::now(),
                Duration::days(30),
                Duration::days(90),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_names_follow_the_id() {
        let survey = Survey::example();
        assert_eq!(
            survey.partition_name,
            format!("survey_{}", survey.id.to_hex())
        );
    }

    #[test]
    fn state_follows_the_deadlines() {
        let survey = Survey::example();
        let now = survey.created_at;

        assert_eq!(survey.state_at(now), SurveyState::Active);
        // The instant the contract ends, submissions close.
        assert_eq!(
            survey.state_at(survey.contract_end_date),
            SurveyState::Suspended
        );
        assert_eq!(
            survey.state_at(survey.contract_end_date - Duration::seconds(1)),
            SurveyState::Active
        );
        // The instant the grace period ends, the survey is gone.
        assert_eq!(
            survey.state_at(survey.deletion_due_date),
            SurveyState::Deleted
        );
        assert_eq!(
            survey.state_at(survey.deletion_due_date - Duration::seconds(1)),
            SurveyState::Suspended
        );
    }

    #[test]
    fn stored_deleted_status_wins_regardless_of_dates() {
        let mut survey = Survey::example();
        survey.survey.status = SurveyState::Deleted;
        assert_eq!(survey.state_at(survey.created_at), SurveyState::Deleted);
    }

    #[test]
    fn renewal_reopens_a_suspended_survey() {
        let mut survey = Survey::example();
        let later = survey.contract_end_date + Duration::days(5);
        assert_eq!(survey.state_at(later), SurveyState::Suspended);

        survey.survey.renew(later, Duration::days(30), Duration::days(90));
        assert_eq!(survey.state_at(later), SurveyState::Active);
        assert_eq!(survey.contract_end_date, later + Duration::days(30));
        assert_eq!(
            survey.deletion_due_date,
            survey.contract_end_date + Duration::days(90)
        );
    }
}
