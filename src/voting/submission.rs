//! The vote submission orchestrator.
//!
//! A submission is a saga across two systems: the local leg inserts a
//! pending vote (arbitrated by the unique index), the external leg anchors
//! it in the ledger, and the closing leg either promotes the row to
//! confirmed or compensates by deleting it. A row abandoned between legs by
//! a crash or cancellation is resolved later by the reconciliation sweep.

use chrono::Utc;
use mongodb::{bson::doc, Database};
use rocket::{
    request::{self, FromRequest, Request},
    State,
};

use crate::error::{Error, Result};
use crate::ledger::{CanonicalVote, DynLedger};
use crate::model::{
    api::{
        receipt::VoteReceipt,
        vote::{SubmissionMeta, VoteSpec},
    },
    common::vote::{Confirmed, LedgerRef, Pending},
    db::{
        candidate::Candidate,
        election::Election,
        vote::{AnyVote, Vote},
        voter::Voter,
    },
    mongodb::{is_duplicate_key_error, Coll, Id},
};
use crate::notify::{emit_vote_confirmed, DynNotifier, VoteConfirmed};

use super::eligibility::check_eligibility;

/// Everything one submission needs. The HTTP handler and the tests build
/// the pipeline the same way.
pub struct SubmissionPipeline {
    pub voters: Coll<Voter>,
    pub elections: Coll<Election>,
    pub candidates: Coll<Candidate>,
    pub votes: Coll<AnyVote>,
    pub pending_votes: Coll<Vote<Pending>>,
    pub confirmed_votes: Coll<Vote<Confirmed>>,
    pub ledger: DynLedger,
    pub notifier: DynNotifier,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for SubmissionPipeline {
    type Error = ();

    /// Assemble the pipeline from managed state.
    ///
    /// Panics iff the database, ledger, or notifier is not managed by
    /// [`rocket::Rocket`].
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let db = req.guard::<&State<Database>>().await.unwrap();
        let ledger = req.guard::<&State<DynLedger>>().await.unwrap();
        let notifier = req.guard::<&State<DynNotifier>>().await.unwrap();
        request::Outcome::Success(Self {
            voters: Coll::from_db(db),
            elections: Coll::from_db(db),
            candidates: Coll::from_db(db),
            votes: Coll::from_db(db),
            pending_votes: Coll::from_db(db),
            confirmed_votes: Coll::from_db(db),
            ledger: ledger.inner().clone(),
            notifier: notifier.inner().clone(),
        })
    }
}

impl SubmissionPipeline {
    /// Accept or reject one vote.
    ///
    /// On success the returned receipt describes a vote that is both
    /// committed locally and anchored in the ledger. On failure no
    /// non-terminal vote row survives for this attempt, so retrying is
    /// always safe.
    pub async fn submit_vote(
        &self,
        voter_id: Id,
        election_id: Id,
        spec: &VoteSpec,
        meta: SubmissionMeta,
    ) -> Result<VoteReceipt> {
        // The candidate must exist and stand in the requested election.
        let candidate = self
            .candidates
            .find_one(spec.candidate_id.as_doc(), None)
            .await?;
        match candidate {
            Some(ref candidate) if candidate.election_id == election_id => {}
            _ => {
                return Err(Error::Validation(format!(
                    "No candidate {} in election {}",
                    spec.candidate_id, election_id
                )));
            }
        }

        // Fast-fail eligibility check. Advisory: the unique index on the
        // insert below is what actually prevents double voting.
        let eligibility = check_eligibility(
            voter_id,
            election_id,
            Utc::now(),
            &self.voters,
            &self.elections,
            &self.votes,
        )
        .await?;
        if eligibility.only_already_voted() {
            return Err(Error::AlreadyVoted);
        }
        if !eligibility.eligible() {
            return Err(Error::NotEligible(eligibility.reasons));
        }

        // Local leg: insert the pending vote. Losing the index race means
        // another submission already holds this voter's slot.
        let vote = Vote::new(
            election_id,
            voter_id,
            spec.candidate_id,
            meta.origin.clone(),
            meta.agent.clone(),
        );
        let insert = self.pending_votes.insert_one(&vote, None).await;
        if is_duplicate_key_error(insert.as_ref()) {
            return Err(Error::AlreadyVoted);
        }
        insert?;

        // External leg: anchor the vote in the ledger. The client retries
        // transport failures internally; anything still failing here rolls
        // the pending row back.
        let payload = CanonicalVote::new(election_id, voter_id, spec.candidate_id, vote.cast_at);
        let receipt = match self.ledger.submit(&payload, &meta, vote.id).await {
            Ok(receipt) => receipt,
            Err(ledger_err) => {
                warn!("Vote {} was not anchored, rolling back: {ledger_err}", vote.id);
                self.roll_back(vote.id).await;
                return Err(ledger_err.into());
            }
        };

        // Closing leg: promote the row to confirmed.
        let confirmed = vote.confirm(LedgerRef {
            vote_hash: receipt.vote_hash,
            transaction_id: receipt.transaction_id,
        });
        let result = self
            .confirmed_votes
            .replace_one(
                doc! {"_id": confirmed.id, "state": Pending},
                &confirmed,
                None,
            )
            .await?;
        if result.modified_count == 0 {
            // Can only happen if this submission outlived the reconciliation
            // threshold and the sweep got to the row first.
            error!(
                "Vote {} was reconciled mid-submission; the ledger holds transaction {}",
                confirmed.id, confirmed.anchor.transaction_id
            );
        }

        info!(
            "Vote {} confirmed in election {} (transaction {})",
            confirmed.id, election_id, confirmed.anchor.transaction_id
        );

        emit_vote_confirmed(
            self.notifier.clone(),
            VoteConfirmed {
                vote_id: confirmed.id.into(),
                election_id: confirmed.election_id.into(),
                candidate_id: confirmed.candidate_id.into(),
                transaction_id: confirmed.anchor.transaction_id.clone(),
                timestamp: confirmed.cast_at,
            },
        );

        Ok(confirmed.into())
    }

    /// Compensate a failed submission by deleting its pending row. If even
    /// that fails the row stays behind for the reconciliation sweep.
    async fn roll_back(&self, vote_id: Id) {
        let result = self
            .pending_votes
            .delete_one(doc! {"_id": vote_id, "state": Pending}, None)
            .await;
        if let Err(db_err) = result {
            error!("Failed to roll back pending vote {vote_id}: {db_err}");
        }
    }
}
