use serde::{Deserialize, Serialize};

use crate::model::{
    db::{admin::Admin, survey::Survey},
    mongodb::Id,
};

/// The rights levels a signed token can represent. Public/contributor access
/// needs no token at all: the survey id itself is the bearer capability.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rights {
    /// Scoped to a single survey: PII reads and report export.
    Manager,
    /// System-wide: provisioning, lifecycle, and moderation.
    Admin,
}

/// A type of authenticated user that tokens can be issued for.
pub trait User {
    /// The rights this user type holds.
    const RIGHTS: Rights;

    /// The identity baked into the token. For managers this is the survey id
    /// itself, which is what scopes the token to that one survey.
    fn id(&self) -> Id;

    /// The access-code version at issue time, if this user type is
    /// authenticated by access code. Rotating the code bumps the stored
    /// version, invalidating every previously issued token.
    fn code_version(&self) -> Option<u32> {
        None
    }
}

impl User for Admin {
    const RIGHTS: Rights = Rights::Admin;

    fn id(&self) -> Id {
        self.id
    }
}

/// A manager "user" is the survey they authenticated against.
impl User for Survey {
    const RIGHTS: Rights = Rights::Manager;

    fn id(&self) -> Id {
        self.id
    }

    fn code_version(&self) -> Option<u32> {
        Some(self.survey.code_version)
    }
}
