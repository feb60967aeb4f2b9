//! The reconciliation sweep.
//!
//! A submission that crashes or is cancelled between inserting its pending
//! vote and confirming or rolling it back leaves the row behind, and the
//! unique index keeps that voter locked out until somebody resolves it. The
//! sweep is that somebody: it periodically asks the ledger about every
//! pending vote older than a threshold and promotes, invalidates, or leaves
//! it accordingly. The threshold is far above the worst-case submission
//! duration, so the sweep never races a live request.

use chrono::{Duration, Utc};
use mongodb::{bson::doc, Database};
use rocket::{
    fairing::{Fairing, Info, Kind},
    futures::TryStreamExt,
    tokio::{self, time::interval},
    Orbit, Rocket,
};

use crate::config::Config;
use crate::error::Result;
use crate::ledger::{CanonicalVote, DynLedger};
use crate::model::{
    common::vote::{Confirmed, Invalid, LedgerRef, Pending},
    db::vote::Vote,
    mongodb::Coll,
};

/// What one pass did.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct SweepStats {
    pub scanned: u64,
    pub promoted: u64,
    pub invalidated: u64,
    pub unresolved: u64,
}

/// Run one reconciliation pass over every pending vote older than
/// `reconcile_after`.
///
/// Votes the ledger anchored are promoted to confirmed, votes it has never
/// seen are invalidated, and votes it acknowledges without a transaction ID
/// stay pending for a later pass. If the ledger is unreachable the pass is
/// abandoned with every remaining row untouched; the next pass will pick
/// them up.
pub async fn sweep_once(
    db: &Database,
    ledger: &DynLedger,
    reconcile_after: Duration,
) -> Result<SweepStats> {
    let pending_votes = Coll::<Vote<Pending>>::from_db(db);
    let confirmed_votes = Coll::<Vote<Confirmed>>::from_db(db);
    let invalid_votes = Coll::<Vote<Invalid>>::from_db(db);

    let cutoff = Utc::now() - reconcile_after;
    let stale: Vec<Vote<Pending>> = pending_votes
        .find(
            doc! {
                "state": Pending,
                "cast_at": {"$lt": mongodb::bson::DateTime::from_chrono(cutoff)},
            },
            None,
        )
        .await?
        .try_collect()
        .await?;

    let mut stats = SweepStats::default();
    for vote in stale {
        stats.scanned += 1;
        let recomputed = CanonicalVote::new(
            vote.election_id,
            vote.voter_id,
            vote.candidate_id,
            vote.cast_at,
        )
        .hash();
        let check = ledger
            .verify_exists(vote.election_id, vote.voter_id, &recomputed)
            .await?;

        let id = vote.id;
        if !check.exists {
            let invalid = vote.invalidate();
            let result = invalid_votes
                .replace_one(doc! {"_id": id, "state": Pending}, &invalid, None)
                .await?;
            if result.modified_count > 0 {
                warn!("Invalidated vote {id}: it never reached the ledger");
                stats.invalidated += 1;
            }
        } else if let Some(transaction_id) = check.transaction_id {
            let confirmed = vote.confirm(LedgerRef {
                vote_hash: recomputed,
                transaction_id,
            });
            let result = confirmed_votes
                .replace_one(doc! {"_id": id, "state": Pending}, &confirmed, None)
                .await?;
            if result.modified_count > 0 {
                warn!(
                    "Recovered vote {id}: anchored as transaction {} but never confirmed locally",
                    confirmed.anchor.transaction_id
                );
                stats.promoted += 1;
            }
        } else {
            warn!("Vote {id} is anchored but its transaction ID is unknown; leaving it pending");
            stats.unresolved += 1;
        }
    }

    Ok(stats)
}

/// A fairing that runs the reconciliation sweep for the lifetime of the
/// server. The first pass runs at liftoff, so votes stranded by a previous
/// run are resolved as soon as the server is back.
pub struct ReconcilerFairing;

#[rocket::async_trait]
impl Fairing for ReconcilerFairing {
    fn info(&self) -> Info {
        Info {
            name: "Reconciler",
            kind: Kind::Liftoff,
        }
    }

    async fn on_liftoff(&self, rocket: &Rocket<Orbit>) {
        let (config, db, ledger) = match (
            rocket.state::<Config>(),
            rocket.state::<Database>(),
            rocket.state::<DynLedger>(),
        ) {
            (Some(config), Some(db), Some(ledger)) => (config, db.clone(), ledger.clone()),
            _ => {
                error!("Cannot start the reconciliation sweep: state is not managed");
                return;
            }
        };
        let period = config.reconcile_interval();
        let reconcile_after = config.reconcile_after();

        tokio::spawn(async move {
            let mut ticker = interval(period);
            loop {
                ticker.tick().await;
                match sweep_once(&db, &ledger, reconcile_after).await {
                    Ok(stats) if stats.scanned > 0 => {
                        info!(
                            "Reconciliation pass: {} stale, {} promoted, {} invalidated, {} unresolved",
                            stats.scanned, stats.promoted, stats.invalidated, stats.unresolved
                        );
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Reconciliation pass abandoned: {e}");
                    }
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rocket::local::asynchronous::Client;

    use crate::error::Error;
    use crate::ledger::{StubLedger, StubMode};
    use crate::model::{
        api::vote::SubmissionMeta,
        db::vote::AnyVote,
        mongodb::Id,
    };

    use super::*;

    /// A pending vote whose submission died an hour ago.
    async fn seed_stale_pending(db: &Database) -> Vote<Pending> {
        let mut vote = Vote::new(Id::new(), Id::new(), Id::new(), None, None);
        vote.cast_at = Utc::now() - Duration::hours(1);
        Coll::<Vote<Pending>>::from_db(db)
            .insert_one(&vote, None)
            .await
            .unwrap();
        vote
    }

    /// Make the stub ledger hold an anchor matching the stored vote.
    async fn anchor_in_ledger(ledger: &DynLedger, vote: &Vote<Pending>) {
        let payload = CanonicalVote::new(
            vote.election_id,
            vote.voter_id,
            vote.candidate_id,
            vote.cast_at,
        );
        let meta = SubmissionMeta {
            origin: None,
            agent: None,
        };
        ledger.submit(&payload, &meta, vote.id).await.unwrap();
    }

    #[backend_test]
    async fn promotes_a_stale_vote_the_ledger_anchored(client: Client, db: Database) {
        let ledger = client.rocket().state::<DynLedger>().unwrap();
        let vote = seed_stale_pending(&db).await;
        anchor_in_ledger(ledger, &vote).await;

        let stats = sweep_once(&db, ledger, Duration::minutes(5)).await.unwrap();

        assert_eq!(stats.scanned, 1);
        assert_eq!(stats.promoted, 1);
        let stored = Coll::<AnyVote>::from_db(&db)
            .find_one(vote.id.as_doc(), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.state_name(), "Confirmed");
        assert_eq!(
            stored.ledger_ref().unwrap().transaction_id,
            StubLedger::transaction_id(vote.id)
        );
    }

    #[backend_test]
    async fn invalidates_a_stale_vote_the_ledger_denies(client: Client, db: Database) {
        let ledger = client.rocket().state::<DynLedger>().unwrap();
        let vote = seed_stale_pending(&db).await;

        let stats = sweep_once(&db, ledger, Duration::minutes(5)).await.unwrap();

        assert_eq!(stats.scanned, 1);
        assert_eq!(stats.invalidated, 1);
        let stored = Coll::<AnyVote>::from_db(&db)
            .find_one(vote.id.as_doc(), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.state_name(), "Invalid");
    }

    #[backend_test]
    async fn leaves_fresh_pending_votes_alone(client: Client, db: Database) {
        let ledger = client.rocket().state::<DynLedger>().unwrap();
        let vote = Vote::new(Id::new(), Id::new(), Id::new(), None, None);
        Coll::<Vote<Pending>>::from_db(&db)
            .insert_one(&vote, None)
            .await
            .unwrap();

        let stats = sweep_once(&db, ledger, Duration::minutes(5)).await.unwrap();

        assert_eq!(stats, SweepStats::default());
        let stored = Coll::<AnyVote>::from_db(&db)
            .find_one(vote.id.as_doc(), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.state_name(), "Pending");
    }

    #[backend_test]
    async fn abandons_the_pass_when_the_ledger_is_unreachable(client: Client, db: Database) {
        let stub = client.rocket().state::<Arc<StubLedger>>().unwrap();
        let ledger = client.rocket().state::<DynLedger>().unwrap();
        let vote = seed_stale_pending(&db).await;
        stub.set_mode(StubMode::Unavailable);

        let result = sweep_once(&db, ledger, Duration::minutes(5)).await;

        assert!(matches!(result, Err(Error::LedgerUnavailable(_))));
        // The row survives for the next pass.
        let stored = Coll::<AnyVote>::from_db(&db)
            .find_one(vote.id.as_doc(), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.state_name(), "Pending");
    }
}
