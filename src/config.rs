use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use mongodb::Client as MongoClient;
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::ledger::{DynLedger, HttpLedger};
use crate::model::mongodb::ensure_indexes_exist;
use crate::notify::{DynNotifier, HttpNotifier};

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Deserialize)]
pub struct Config {
    // non-secrets
    auth_ttl: u32,
    reconcile_interval: u32,
    reconcile_after: u32,
    // secrets
    jwt_secret: String,
}

impl Config {
    /// Valid lifetime of auth token cookies in seconds.
    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl.into())
    }

    /// How often the reconciliation sweep runs.
    pub fn reconcile_interval(&self) -> StdDuration {
        StdDuration::from_secs(self.reconcile_interval.into())
    }

    /// How old a pending vote must be before the sweep will touch it.
    /// Must comfortably exceed the worst-case submission duration, or the
    /// sweep could race a submission that is still in flight.
    pub fn reconcile_after(&self) -> Duration {
        Duration::seconds(self.reconcile_after.into())
    }

    /// Secret key used to verify JWTs.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }
}

#[cfg(test)]
impl Config {
    pub fn example() -> Self {
        Self {
            auth_ttl: 3600,
            reconcile_interval: 60,
            reconcile_after: 300,
            jwt_secret: "P4ssW0rd".to_string(),
        }
    }
}

/// A fairing that loads the application config and puts it in managed state,
/// with control over the error messages on failure.
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

/// A fairing that loads the MongoDB config, connects to the database,
/// ensures the required indexes exist, and places both a `Client` and a
/// `Database` into managed state.
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
        let db = client.database(&get_database_name());

        // The unique vote index enforces one live vote per voter per
        // election; the server must not launch without it.
        if let Err(e) = ensure_indexes_exist(&db).await {
            error!("Failed to create database indexes: {e}");
            return Err(rocket);
        }
        info!("...database connection online!");

        // Manage the state.
        rocket = rocket.manage(client).manage(db);
        Ok(rocket)
    }
}

/// Get the name of the database to use (production version).
#[cfg(not(test))]
pub(crate) fn get_database_name() -> String {
    "chainvote".to_string()
}

/// Get the name of the database to use (test version).
/// Use a random name to avoid collisions between tests.
#[cfg(test)]
pub(crate) fn get_database_name() -> String {
    let random: u32 = rand::random();
    let db = format!("test{random}");
    info!("Using database {db}");
    db
}

/// Configuration for the ledger service connection.
#[derive(Deserialize)]
struct LedgerConfig {
    // non-secrets
    ledger_url: String,
    ledger_timeout: u32,
    // secrets
    ledger_api_key: String,
}

/// A fairing that loads the ledger config and places a shared [`DynLedger`]
/// into managed state.
pub struct LedgerFairing;

#[rocket::async_trait]
impl Fairing for LedgerFairing {
    fn info(&self) -> Info {
        Info {
            name: "Ledger",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<LedgerConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load ledger config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        // Construct the client.
        let timeout = StdDuration::from_secs(config.ledger_timeout.into());
        let ledger =
            match HttpLedger::new(config.ledger_url.clone(), config.ledger_api_key, timeout) {
                Ok(ledger) => ledger,
                Err(e) => {
                    error!("Failed to construct the ledger client: {e}");
                    return Err(rocket);
                }
            };
        info!("Ledger client targeting {}", config.ledger_url);

        // Manage the state.
        let ledger: DynLedger = Arc::new(ledger);
        rocket = rocket.manage(ledger);
        Ok(rocket)
    }
}

/// Configuration for the notification sink.
#[derive(Deserialize)]
struct NotifierConfig {
    // non-secrets
    notifier_url: String,
}

/// A fairing that loads the notifier config and places a shared
/// [`DynNotifier`] into managed state.
pub struct NotifierFairing;

#[rocket::async_trait]
impl Fairing for NotifierFairing {
    fn info(&self) -> Info {
        Info {
            name: "Notifier",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<NotifierConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load notifier config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        // Construct the client.
        let notifier = match HttpNotifier::new(config.notifier_url.clone()) {
            Ok(notifier) => notifier,
            Err(e) => {
                error!("Failed to construct the notifier client: {e}");
                return Err(rocket);
            }
        };
        info!("Notifier targeting {}", config.notifier_url);

        // Manage the state.
        let notifier: DynNotifier = Arc::new(notifier);
        rocket = rocket.manage(notifier);
        Ok(rocket)
    }
}
