use chrono::{serde::ts_seconds, DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{api::id::ApiId, common::vote::Confirmed, db::vote::Vote};

/// The confirmation handed back to a voter after a successful submission.
/// Everything needed to later verify the vote against the ledger.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct VoteReceipt {
    /// The vote's stable public identifier.
    pub vote_id: ApiId,
    /// The election voted in.
    pub election_id: ApiId,
    /// The canonical content hash anchored in the ledger.
    pub vote_hash: String,
    /// The ledger's reference for the anchored transaction.
    pub transaction_id: String,
    /// When the vote was cast.
    #[serde(with = "ts_seconds")]
    pub cast_at: DateTime<Utc>,
    /// The vote's state; a receipt only ever exists for a confirmed vote.
    pub state: Confirmed,
}

impl From<Vote<Confirmed>> for VoteReceipt {
    fn from(vote: Vote<Confirmed>) -> Self {
        Self {
            vote_id: vote.id.into(),
            election_id: vote.vote.election_id.into(),
            vote_hash: vote.vote.anchor.vote_hash,
            transaction_id: vote.vote.anchor.transaction_id,
            cast_at: vote.vote.cast_at,
            state: Confirmed,
        }
    }
}
