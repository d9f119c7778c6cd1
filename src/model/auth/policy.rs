//! The authorization decision: which tier may invoke which operation against
//! which survey. Token *mechanics* (signing, expiry) live in
//! [`token`](super::token); this module only decides.

use serde::{Deserialize, Serialize};

use crate::model::{
    db::{admin::Admin, survey::Survey},
    mongodb::Id,
};

use super::{token::AuthToken, user::Rights};

/// Why an authorization check failed. Distinguishable for observability, but
/// only ever surfaced to callers as a generic authentication failure.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Denial {
    /// The actor's tier does not cover the operation.
    WrongTier,
    /// The token was valid once, but has expired.
    ExpiredToken,
    /// The submitted access code was wrong, or the token was issued under a
    /// rotated-away access code.
    InvalidCode,
    /// Admin username/password authentication failed.
    BadCredentials,
    /// A manager token was presented against a survey it was not issued for.
    SurveyMismatch,
}

/// Every operation the system exposes, grouped by the tier it requires.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Action {
    // Public: holding the survey id is the capability.
    ReadQuestions,
    SubmitResponse,
    ReadPublishedOpinions,
    SupportOpinion,
    // Manager: requires a token scoped to the target survey.
    ReadDisclosedOpinions,
    ReadDisclosedUpvotes,
    ExportReport,
    // Admin: system-wide credential.
    ManageSurveys,
    ManageQuestions,
    Moderate,
}

impl Action {
    /// The rights level required, or `None` for public operations.
    pub fn required_rights(self) -> Option<Rights> {
        match self {
            Self::ReadQuestions
            | Self::SubmitResponse
            | Self::ReadPublishedOpinions
            | Self::SupportOpinion => None,
            Self::ReadDisclosedOpinions | Self::ReadDisclosedUpvotes | Self::ExportReport => {
                Some(Rights::Manager)
            }
            Self::ManageSurveys | Self::ManageQuestions | Self::Moderate => Some(Rights::Admin),
        }
    }
}

/// The actor attempting an operation.
pub enum Actor<'a> {
    Public,
    Manager(&'a AuthToken<Survey>),
    Admin(&'a AuthToken<Admin>),
}

/// Decide whether `actor` may perform `action` against the survey with the
/// given id and access-code version.
///
/// Manager tokens carry no capability beyond their issuing survey: the token
/// id must equal the target survey id, and the embedded code version must
/// still be current (rotation bumps the stored version, so stale tokens are
/// denied).
pub fn authorize(
    actor: &Actor<'_>,
    action: Action,
    survey_id: Id,
    current_code_version: u32,
) -> Result<(), Denial> {
    match action.required_rights() {
        None => Ok(()),
        Some(Rights::Manager) => match actor {
            Actor::Manager(token) => {
                if token.id != survey_id {
                    return Err(Denial::SurveyMismatch);
                }
                if token.code_version != Some(current_code_version) {
                    return Err(Denial::InvalidCode);
                }
                Ok(())
            }
            _ => Err(Denial::WrongTier),
        },
        Some(Rights::Admin) => match actor {
            Actor::Admin(_) => Ok(()),
            _ => Err(Denial::WrongTier),
        },
    }
}
