#[macro_use]
extern crate rocket;

#[macro_use]
extern crate log;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

use crate::config::{ConfigFairing, DatabaseFairing, LedgerFairing, NotifierFairing};
use crate::logging::LoggerFairing;
use crate::voting::reconcile::ReconcilerFairing;

pub mod api;
pub mod config;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod model;
pub mod notify;
pub mod voting;

/// Construct the server, with all fairings attached and all routes mounted,
/// ready to ignite.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .attach(DatabaseFairing)
        .attach(LedgerFairing)
        .attach(NotifierFairing)
        .attach(ReconcilerFairing)
        .mount("/", api::routes())
}

/// Connect to the database server used by tests.
#[cfg(test)]
async fn db_client() -> mongodb::Client {
    let rocket = rocket::build();
    let db_uri = rocket
        .figment()
        .extract_inner::<String>("db_uri")
        .expect("`db_uri` not set");
    mongodb::Client::with_uri_str(&db_uri).await.expect(&format!(
        "Could not connect to database with `db_uri` \"{}\"",
        db_uri
    ))
}

/// Construct a test instance of the server against the given database and
/// in-process service doubles. The reconciliation fairing is not attached;
/// tests drive the sweep directly.
#[cfg(test)]
async fn rocket_for_test(
    db_client: mongodb::Client,
    db: mongodb::Database,
    ledger: std::sync::Arc<ledger::StubLedger>,
    notifier: std::sync::Arc<notify::RecordingNotifier>,
) -> Rocket<Build> {
    use crate::ledger::DynLedger;
    use crate::notify::DynNotifier;

    // The submission tests exercise the unique vote index, so create it up
    // front just as the database fairing would.
    model::mongodb::ensure_indexes_exist(&db)
        .await
        .expect("Failed to create database indexes");

    let dyn_ledger: DynLedger = ledger.clone();
    let dyn_notifier: DynNotifier = notifier.clone();

    rocket::build()
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .manage(db_client)
        .manage(db)
        .manage(ledger)
        .manage(dyn_ledger)
        .manage(notifier)
        .manage(dyn_notifier)
        .mount("/", api::routes())
}
