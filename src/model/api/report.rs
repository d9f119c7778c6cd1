use chrono::{DateTime, Utc};
use rocket::FromFormField;
use serde::{Deserialize, Serialize};

use crate::model::common::{Pii, Scores};

use super::survey::SurveyDescription;

/// The file format a manager wants the report rendered to. Rendering itself
/// happens client-side; the API always returns the snapshot as JSON and the
/// requested format is echoed back for the renderer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, FromFormField)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Xlsx,
    Pdf,
}

/// One opinion in the export, fully denormalised.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReportRow {
    pub title: String,
    pub content: String,
    pub scores: Scores,
    pub priority_score: u32,
    pub tier: u8,
    pub supporters: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disclosed_pii: Option<Pii>,
    /// Approved supporter comments, in submission order.
    pub comments: Vec<String>,
}

/// The complete export for one survey, ordered by priority score descending.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReportSnapshot {
    pub survey: SurveyDescription,
    pub generated_at: DateTime<Utc>,
    pub format: ReportFormat,
    pub rows: Vec<ReportRow>,
}
