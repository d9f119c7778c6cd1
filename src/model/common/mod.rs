//! Types and pure logic shared between the API layer and the database layer.

pub mod consent;
pub mod question;
pub mod scoring;
pub mod search;
pub mod survey;
pub mod upvote;

pub use consent::Pii;
pub use question::QuestionType;
pub use scoring::Scores;
pub use search::SearchQuery;
pub use survey::SurveyState;
pub use upvote::UpvoteStatus;
