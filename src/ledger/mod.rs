//! The client side of the external append-only ledger service.
//!
//! The ledger is the independent system of record that votes are anchored
//! in. We only ever submit new transactions and query existing ones; its
//! internal consensus is none of our business.

use std::sync::Arc;

use thiserror::Error;

use crate::model::{api::vote::SubmissionMeta, mongodb::Id};

mod canonical;
mod http;
#[cfg(test)]
mod stub;

pub use canonical::CanonicalVote;
pub use http::HttpLedger;
#[cfg(test)]
pub use stub::{RecordedSubmission, StubLedger, StubMode};

/// A shared handle on the ledger client.
pub type DynLedger = Arc<dyn Ledger>;

/// What can go wrong talking to the ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The service could not be reached, or did not answer in time.
    /// Transient; safe to retry.
    #[error("Ledger unavailable: {0}")]
    Unavailable(String),
    /// The service answered and said no. Permanent; never retried.
    #[error("Ledger rejected the transaction: {0}")]
    Rejected(String),
}

/// What the ledger returned for an accepted transaction.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct LedgerReceipt {
    pub transaction_id: String,
    pub vote_hash: String,
}

/// What the ledger reports when queried for an existing vote.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct LedgerCheck {
    /// The ledger holds a transaction for this vote.
    pub exists: bool,
    /// The ledger considers that transaction final.
    pub confirmed: bool,
    /// The transaction id, when the service reports it; lets the
    /// reconciliation sweep anchor votes whose confirmation was lost.
    pub transaction_id: Option<String>,
}

/// The operations this service needs from the ledger.
#[rocket::async_trait]
pub trait Ledger: Send + Sync {
    /// Submit a canonical vote transaction.
    ///
    /// `vote_id` is attached to the transaction metadata as the idempotency
    /// key. Implementations retry transport failures a bounded number of
    /// times; rejections are never retried.
    async fn submit(
        &self,
        payload: &CanonicalVote,
        meta: &SubmissionMeta,
        vote_id: Id,
    ) -> Result<LedgerReceipt, LedgerError>;

    /// Ask whether the ledger holds a transaction for the given vote hash.
    /// Read-only and safe to repeat.
    async fn verify_exists(
        &self,
        election_id: Id,
        voter_id: Id,
        vote_hash: &str,
    ) -> Result<LedgerCheck, LedgerError>;
}
