use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::{
    common::vote::{Confirmed, Invalid, LedgerRef, NoAnchor, Pending, VoteState},
    mongodb::Id,
};

/// Core vote data.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct VoteCore<S: VoteState> {
    /// Foreign key election ID.
    pub election_id: Id,
    /// Foreign key voter ID.
    pub voter_id: Id,
    /// Foreign key candidate ID.
    pub candidate_id: Id,
    /// When the vote was cast. Fixed at creation; the canonical payload
    /// committed to the ledger is derived from this exact instant.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub cast_at: DateTime<Utc>,
    /// Origin address of the submission, kept for audit.
    pub origin: Option<String>,
    /// Client agent of the submission, kept for audit.
    pub agent: Option<String>,
    /// The ledger anchor, present iff the state carries one.
    #[serde(flatten)]
    pub anchor: S::Anchor,
    /// The current state of the vote.
    pub state: S,
}

impl VoteCore<Pending> {
    /// Attach the ledger anchor, promoting this vote to confirmed.
    pub fn confirm(self, anchor: LedgerRef) -> VoteCore<Confirmed> {
        VoteCore {
            election_id: self.election_id,
            voter_id: self.voter_id,
            candidate_id: self.candidate_id,
            cast_at: self.cast_at,
            origin: self.origin,
            agent: self.agent,
            anchor,
            state: Confirmed,
        }
    }

    /// Mark this vote invalid: the ledger never accepted it.
    pub fn invalidate(self) -> VoteCore<Invalid> {
        VoteCore {
            election_id: self.election_id,
            voter_id: self.voter_id,
            candidate_id: self.candidate_id,
            cast_at: self.cast_at,
            origin: self.origin,
            agent: self.agent,
            anchor: NoAnchor {},
            state: Invalid,
        }
    }
}
