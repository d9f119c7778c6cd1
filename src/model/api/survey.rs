use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    auth::AccessCode,
    common::SurveyState,
    db::survey::Survey,
    mongodb::Id,
};

/// A survey specification, as submitted by an admin.
#[derive(Debug, Serialize, Deserialize)]
pub struct SurveySpec {
    /// Display name.
    pub name: String,
    /// Internal notes.
    #[serde(default)]
    pub notes: Option<String>,
    /// Override for the configured contract length.
    #[serde(default)]
    pub contract_days: Option<u32>,
}

impl SurveySpec {
    /// Reject blank names before anything is provisioned.
    pub fn validate(&self) -> Result<(), crate::error::Error> {
        if self.name.trim().is_empty() {
            return Err(crate::error::Error::BadRequest(
                "Survey name must not be blank".to_string(),
            ));
        }
        Ok(())
    }
}

/// Manager login request: the survey to manage plus its access code.
#[derive(Debug, Serialize, Deserialize)]
pub struct ManagerCredentials {
    pub survey_id: Id,
    pub access_code: String,
}

/// A survey as presented to admins and managers. The effective state is
/// baked in at construction time so callers never see a stale stored status.
#[derive(Debug, Serialize, Deserialize)]
pub struct SurveyDescription {
    pub id: Id,
    pub name: String,
    pub status: SurveyState,
    pub contract_end_date: DateTime<Utc>,
    pub deletion_due_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub code_version: u32,
}

impl SurveyDescription {
    pub fn new(survey: &Survey, now: DateTime<Utc>) -> Self {
        Self {
            id: survey.id,
            name: survey.name.clone(),
            status: survey.state_at(now),
            contract_end_date: survey.contract_end_date,
            deletion_due_date: survey.deletion_due_date,
            created_at: survey.created_at,
            notes: survey.notes.clone(),
            code_version: survey.code_version,
        }
    }
}

/// The response to survey creation or access-code rotation: the description
/// plus the plaintext access code, returned exactly once.
#[derive(Debug, Serialize, Deserialize)]
pub struct SurveyReceipt {
    #[serde(flatten)]
    pub survey: SurveyDescription,
    pub access_code: AccessCode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_names_are_rejected() {
        let spec = SurveySpec {
            name: "   ".to_string(),
            notes: None,
            contract_days: None,
        };
        assert!(spec.validate().is_err());
    }

    #[test]
    fn description_reports_the_effective_state() {
        let survey = Survey::example();
        let desc = SurveyDescription::new(&survey, survey.contract_end_date);
        assert_eq!(desc.status, SurveyState::Suspended);
    }
}
