use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use mongodb::error::Error as DbError;
use rocket::{http::Status, response::Responder, serde::json::Json};
use serde::Serialize;
use thiserror::Error;

use crate::model::auth::policy::Denial;

pub type Result<T> = std::result::Result<T, Error>;

/// All the ways an operation can fail.
///
/// The first group are expected, user-visible outcomes; they respond with a
/// stable machine-readable `kind` plus a human message. The second group are
/// defects: they are logged with full context and surfaced as a generic
/// internal error.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Survey is not accepting submissions")]
    SurveyNotActive,
    #[error("Raw response already has a published opinion")]
    DuplicatePublish,
    #[error("This opinion was already supported from this client")]
    AlreadySupported,
    #[error("Authentication denied: {0:?}")]
    AuthDenied(Denial),
    #[error("Bad request: {0}")]
    BadRequest(String),
    // Defects from here down.
    #[error("Internal error: {0}")]
    Internal(String),
    #[error("Consent invariant violated: {0}")]
    ConsentViolation(String),
    #[error("Partition provisioning failed (rolled back): {0}")]
    ProvisionFailed(#[source] DbError),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Jwt(JwtError),
    #[error(transparent)]
    Argon2(#[from] argon2::Error),
}

impl Error {
    pub fn not_found(what: impl std::fmt::Display) -> Self {
        Self::NotFound(what.to_string())
    }

    /// Stable machine-readable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not-found",
            Self::SurveyNotActive => "survey-not-active",
            Self::DuplicatePublish => "duplicate-publish",
            Self::AlreadySupported => "already-supported",
            Self::AuthDenied(_) => "auth-denied",
            Self::BadRequest(_) => "bad-request",
            Self::Internal(_)
            | Self::ConsentViolation(_)
            | Self::ProvisionFailed(_)
            | Self::Db(_)
            | Self::Jwt(_)
            | Self::Argon2(_) => "internal",
        }
    }
}

impl From<JwtError> for Error {
    /// Expired or not-yet-valid tokens are an expected authentication
    /// failure; anything else JWT-related is a defect.
    fn from(err: JwtError) -> Self {
        match err.kind() {
            JwtErrorKind::ExpiredSignature | JwtErrorKind::ImmatureSignature => {
                Self::AuthDenied(Denial::ExpiredToken)
            }
            _ => Self::Jwt(err),
        }
    }
}

/// The JSON body attached to every error response.
#[derive(Serialize)]
struct ErrorBody {
    kind: &'static str,
    message: String,
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r rocket::Request<'_>) -> rocket::response::Result<'o> {
        let status = match &self {
            Self::NotFound(_) => Status::NotFound,
            Self::SurveyNotActive => Status::Forbidden,
            Self::DuplicatePublish | Self::AlreadySupported => Status::Conflict,
            Self::AuthDenied(_) => Status::Unauthorized,
            Self::BadRequest(_) => Status::BadRequest,
            Self::Internal(_)
            | Self::ConsentViolation(_)
            | Self::ProvisionFailed(_)
            | Self::Db(_)
            | Self::Jwt(_)
            | Self::Argon2(_) => Status::InternalServerError,
        };

        let message = match &self {
            _ if status == Status::InternalServerError => {
                // Never leak internal detail; the full error goes to the log.
                error!("{self}");
                "Internal error".to_string()
            }
            // The precise denial reason is for observability only.
            Self::AuthDenied(reason) => {
                warn!("Authentication denied: {reason:?}");
                "Authentication denied".to_string()
            }
            _ => self.to_string(),
        };

        (
            status,
            Json(ErrorBody {
                kind: self.kind(),
                message,
            }),
        )
            .respond_to(req)
    }
}
