use mongodb::bson::{to_bson, Bson};
use serde::{Deserialize, Serialize};

/// States in the survey lifecycle.
///
/// The progression is linear: `Active → Suspended → Deleted`. The only
/// back-transition is an explicit admin renewal, which extends the contract
/// before the deletion deadline. The effective state is always derived from
/// the survey's dates (see [`Survey::state_at`](crate::model::db::survey::SurveyCore::state_at));
/// the stored status only ever records a completed purge.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurveyState {
    /// Accepting submissions and upvotes.
    Active,
    /// Contract ended: reads still work, public writes are rejected.
    Suspended,
    /// Past the deletion deadline: no longer resolvable; partition purged
    /// (or about to be) by the lifecycle sweep.
    Deleted,
}

impl From<SurveyState> for Bson {
    fn from(state: SurveyState) -> Self {
        to_bson(&state).expect("Serialisation is infallible")
    }
}
