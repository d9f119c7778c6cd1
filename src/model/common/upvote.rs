use mongodb::bson::{to_bson, Bson};
use serde::{Deserialize, Serialize};

/// Moderation state of an upvote's comment.
///
/// The upvote itself always counts towards the supporter total; the status
/// only governs whether its comment appears publicly.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpvoteStatus {
    /// Carries a comment awaiting moderation.
    Pending,
    /// Comment (if any) approved for public display.
    Published,
    /// Comment rejected by the moderator.
    Rejected,
}

impl From<UpvoteStatus> for Bson {
    fn from(status: UpvoteStatus) -> Self {
        to_bson(&status).expect("Serialisation is infallible")
    }
}
