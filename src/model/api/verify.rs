use serde::{Deserialize, Serialize};

use crate::model::api::{id::ApiId, vote::SubmissionMeta};

/// What the ledger reports for a vote.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct LedgerState {
    /// The ledger holds a transaction for this vote.
    pub exists: bool,
    /// The ledger considers that transaction final.
    pub confirmed: bool,
}

/// The verdict of comparing our store against the ledger.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum VoteIntegrity {
    /// Store and ledger agree the vote is anchored, and the recomputed hash
    /// matches the stored one.
    Verified,
    /// The vote is not (yet) anchored; there is nothing to compare.
    Unconfirmed,
    /// The store says confirmed but the ledger disagrees, or the stored hash
    /// no longer matches the recomputed one.
    Mismatch,
}

/// The composite result of verifying one vote.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct VoteVerification {
    pub vote_id: ApiId,
    pub election_id: ApiId,
    /// Store-side lifecycle state.
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vote_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    /// Ledger-side state.
    pub ledger: LedgerState,
    pub integrity: VoteIntegrity,
    /// Audit provenance; only present for privileged callers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<SubmissionMeta>,
}
