//! Vote verification: proving a stored vote is still the vote the ledger
//! anchored.

use crate::error::{Error, Result};
use crate::ledger::{CanonicalVote, DynLedger};
use crate::model::{
    api::{
        verify::{LedgerState, VoteIntegrity, VoteVerification},
        vote::SubmissionMeta,
    },
    db::vote::AnyVote,
    mongodb::{Coll, Id},
};

/// Who is asking.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Caller {
    /// A voter sees only their own votes, without provenance.
    Voter(Id),
    /// An admin sees any vote, with provenance.
    Admin,
}

impl Caller {
    pub fn privileged(&self) -> bool {
        matches!(self, Self::Admin)
    }

    /// May this caller see the given vote at all?
    pub fn may_view(&self, vote: &AnyVote) -> bool {
        match self {
            Self::Admin => true,
            Self::Voter(id) => vote.voter_id() == *id,
        }
    }
}

/// Load a vote on behalf of the caller. A vote the caller may not see is
/// indistinguishable from a vote that does not exist.
pub async fn vote_for_caller(
    vote_id: Id,
    caller: Caller,
    votes: &Coll<AnyVote>,
) -> Result<AnyVote> {
    votes
        .find_one(vote_id.as_doc(), None)
        .await?
        .filter(|vote| caller.may_view(vote))
        .ok_or_else(|| Error::NotFound(format!("No vote found with ID {vote_id}")))
}

/// Verify one vote against the ledger.
///
/// Recomputes the canonical hash from the stored fields, asks the ledger
/// what it holds, and classifies the result. A store-confirmed vote that the
/// ledger denies, or whose stored hash no longer matches the recomputed one,
/// is an integrity alarm: it is logged at error level and reported as
/// `Mismatch`, never silently swallowed.
pub async fn verify_vote(
    vote_id: Id,
    caller: Caller,
    votes: &Coll<AnyVote>,
    ledger: &DynLedger,
) -> Result<VoteVerification> {
    let vote = vote_for_caller(vote_id, caller, votes).await?;

    let recomputed = CanonicalVote::new(
        vote.election_id(),
        vote.voter_id(),
        vote.candidate_id(),
        vote.cast_at(),
    )
    .hash();

    // Confirmed votes are checked under the hash the ledger actually
    // accepted; anything else under the recomputed one.
    let anchor = vote.ledger_ref();
    let query_hash = anchor.map_or(recomputed.as_str(), |anchor| anchor.vote_hash.as_str());
    let check = ledger
        .verify_exists(vote.election_id(), vote.voter_id(), query_hash)
        .await?;

    let integrity = match anchor {
        Some(anchor) if check.exists && anchor.vote_hash == recomputed => VoteIntegrity::Verified,
        Some(anchor) => {
            error!(
                "Integrity mismatch for vote {}: ledger exists={}, stored hash {}, recomputed {}",
                vote.id(),
                check.exists,
                anchor.vote_hash,
                recomputed
            );
            VoteIntegrity::Mismatch
        }
        None => VoteIntegrity::Unconfirmed,
    };

    Ok(VoteVerification {
        vote_id: vote.id().into(),
        election_id: vote.election_id().into(),
        state: vote.state_name().to_string(),
        vote_hash: anchor.map(|anchor| anchor.vote_hash.clone()),
        transaction_id: anchor.map(|anchor| anchor.transaction_id.clone()),
        ledger: LedgerState {
            exists: check.exists,
            confirmed: check.confirmed,
        },
        integrity,
        provenance: caller.privileged().then(|| SubmissionMeta {
            origin: vote.origin().map(str::to_string),
            agent: vote.agent().map(str::to_string),
        }),
    })
}
