use chrono::Duration;
use mongodb::Client as MongoClient;
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::model::{
    db::{admin::ensure_admin_exists, partition::PartitionRegistry},
    mongodb::{ensure_registry_indexes_exist, Coll},
};

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Deserialize)]
pub struct Config {
    // non-secrets
    auth_ttl: u32,
    contract_days: u32,
    grace_days: u32,
    admin_username: String,
    // secrets
    admin_password: String,
    jwt_secret: String,
    hmac_secret: String,
}

impl Config {
    /// Valid lifetime of auth token cookies in seconds.
    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl.into())
    }

    /// How long a freshly created or renewed survey accepts submissions.
    pub fn contract_period(&self) -> Duration {
        Duration::days(self.contract_days.into())
    }

    /// How long after contract end until a survey's partition is purged.
    pub fn grace_period(&self) -> Duration {
        Duration::days(self.grace_days.into())
    }

    /// Bootstrap admin username, used only when no admin exists yet.
    pub fn admin_username(&self) -> &str {
        &self.admin_username
    }

    /// Bootstrap admin password, used only when no admin exists yet.
    pub fn admin_password(&self) -> &str {
        &self.admin_password
    }

    /// Secret key used to encrypt JWTs.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }

    /// Secret key used to derive anonymous upvote fingerprints.
    pub fn hmac_secret(&self) -> &[u8] {
        self.hmac_secret.as_bytes()
    }
}

/// A fairing that loads the application config and puts it in managed state.
/// This could easily be achieved using `AdHoc::config`, but is written out
/// explicitly for symmetry with the other fairings and control over error
/// messages.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        // Manage the state.
        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

/// Configuration for the database.
#[derive(Deserialize)]
struct DbConfig {
    // secrets
    db_uri: String,
}

/// A fairing that loads the MongoDB config, connects to the registry
/// database, performs any setup necessary, and places a [`PartitionRegistry`]
/// plus the raw `Client` and registry `Database` into managed state.
pub struct DatabaseFairing;

#[rocket::async_trait]
impl Fairing for DatabaseFairing {
    fn info(&self) -> Info {
        Info {
            name: "MongoDB",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<DbConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load database config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        info!("Loaded database config, connecting...");
        // Construct the connection.
        let client = match MongoClient::with_uri_str(config.db_uri).await {
            Ok(client) => client,
            Err(e) => {
                error!("Failed to connect to database: {e}");
                return Err(rocket);
            }
        };
        let registry_db = client.database(&get_database_name());

        // Ensure the required registry indexes exist.
        if let Err(e) = ensure_registry_indexes_exist(&registry_db).await {
            error!("Failed to connect to database: {e}");
            return Err(rocket);
        }

        // Ensure there is at least one admin user.
        let app_config = rocket
            .state::<Config>()
            .expect("`ConfigFairing` must be attached before `DatabaseFairing`");
        let admins = Coll::from_db(&registry_db);
        if let Err(e) = ensure_admin_exists(&admins, app_config).await {
            error!("Failed to bootstrap admin user: {e}");
            return Err(rocket);
        }
        info!("...database connection online!");

        // Manage the state.
        let registry = PartitionRegistry::new(client.clone(), registry_db.clone());
        rocket = rocket
            .manage(client)
            .manage(registry_db)
            .manage(registry);
        Ok(rocket)
    }
}

/// Get the name of the registry database to use (production version).
#[cfg(not(test))]
fn get_database_name() -> String {
    "soundboard".to_string()
}

/// Get the name of the registry database to use (test version).
/// Use a random name to avoid collisions between tests.
#[cfg(test)]
fn get_database_name() -> String {
    let random: u32 = rand::random();
    let db = format!("test{random}");
    info!("Using database {db}");
    db
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl Config {
        pub fn example() -> Self {
            Self {
                auth_ttl: 28800,
                contract_days: 30,
                grace_days: 90,
                admin_username: "coordinator".to_string(),
                admin_password: "totallysecurepassword".to_string(),
                jwt_secret: "example-jwt-secret".to_string(),
                hmac_secret: "example-hmac-secret".to_string(),
            }
        }
    }
}
