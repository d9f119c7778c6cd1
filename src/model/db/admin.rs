use std::ops::{Deref, DerefMut};

use mongodb::error::Error as DbError;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::model::{api::admin::AdminCredentials, mongodb::Coll, mongodb::Id};

/// Core admin user data.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminCore {
    pub username: String,
    pub password_hash: String,
}

impl AdminCore {
    /// Check whether the given password is correct.
    pub fn verify_password<T: AsRef<[u8]>>(&self, password: T) -> bool {
        argon2::verify_encoded(&self.password_hash, password.as_ref()).unwrap_or(false)
    }
}

/// An admin without an ID.
pub type NewAdmin = AdminCore;

/// An admin user from the database, with its unique ID.
#[derive(Debug, Serialize, Deserialize)]
pub struct Admin {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub admin: AdminCore,
}

impl Deref for Admin {
    type Target = AdminCore;

    fn deref(&self) -> &Self::Target {
        &self.admin
    }
}

impl DerefMut for Admin {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.admin
    }
}

/// Ensure at least one admin user exists, bootstrapping one from the config
/// credentials if the collection is empty.
///
/// This operation is idempotent.
pub async fn ensure_admin_exists(admins: &Coll<NewAdmin>, config: &Config) -> Result<(), DbError> {
    let count = admins.count_documents(None, None).await?;
    if count > 0 {
        return Ok(());
    }
    let credentials = AdminCredentials {
        username: config.admin_username().to_string(),
        password: config.admin_password().to_string(),
    };
    let admin: NewAdmin = credentials.try_into().expect(
        "Bootstrap admin credentials from config must be non-empty and meet the minimum length",
    );
    warn!(
        "No admin users found; bootstrapping '{}' from config",
        admin.username
    );
    admins.insert_one(admin, None).await?;
    Ok(())
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl Admin {
        pub fn example() -> Self {
            Self {
                id: Id::new(),
                admin: AdminCredentials::example().try_into().unwrap(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_verification() {
        let admin = Admin::example();
        assert!(admin.verify_password(&AdminCredentials::example().password));
        assert!(!admin.verify_password("wrong password"));
    }

    #[test]
    fn corrupt_hashes_never_verify() {
        let admin = AdminCore {
            username: "coordinator".to_string(),
            password_hash: "not-a-hash".to_string(),
        };
        assert!(!admin.verify_password("anything"));
    }
}
