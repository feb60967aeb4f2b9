//! An in-process ledger for tests.

use std::sync::Mutex;

use crate::model::{api::vote::SubmissionMeta, mongodb::Id};

use super::{CanonicalVote, Ledger, LedgerCheck, LedgerError, LedgerReceipt};

/// How the stub should behave.
#[derive(Debug, Clone)]
pub enum StubMode {
    /// Accept everything, like a healthy service.
    Healthy,
    /// Fail every call at the transport level.
    Unavailable,
    /// Reject every submission with the given reason.
    Rejecting(String),
    /// Accept submissions but subsequently deny all knowledge of them.
    Forgetful,
}

/// A mode-switchable ledger that records every submission it accepts.
pub struct StubLedger {
    mode: Mutex<StubMode>,
    submissions: Mutex<Vec<RecordedSubmission>>,
}

/// One accepted submission, as the stub saw it.
#[derive(Debug, Clone)]
pub struct RecordedSubmission {
    pub vote_id: Id,
    pub payload: CanonicalVote,
    pub meta: SubmissionMeta,
    pub vote_hash: String,
}

impl StubLedger {
    pub fn new() -> Self {
        Self {
            mode: Mutex::new(StubMode::Healthy),
            submissions: Mutex::new(Vec::new()),
        }
    }

    pub fn set_mode(&self, mode: StubMode) {
        *self.mode.lock().unwrap() = mode;
    }

    /// Everything submitted so far.
    pub fn submissions(&self) -> Vec<RecordedSubmission> {
        self.submissions.lock().unwrap().clone()
    }

    /// The transaction id the stub mints for a given vote.
    pub fn transaction_id(vote_id: Id) -> String {
        format!("stub_txn_{vote_id}")
    }

    fn mode(&self) -> StubMode {
        self.mode.lock().unwrap().clone()
    }
}

impl Default for StubLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[rocket::async_trait]
impl Ledger for StubLedger {
    async fn submit(
        &self,
        payload: &CanonicalVote,
        meta: &SubmissionMeta,
        vote_id: Id,
    ) -> Result<LedgerReceipt, LedgerError> {
        match self.mode() {
            StubMode::Unavailable => {
                return Err(LedgerError::Unavailable("stub offline".to_string()))
            }
            StubMode::Rejecting(reason) => return Err(LedgerError::Rejected(reason)),
            StubMode::Healthy | StubMode::Forgetful => {}
        }
        let vote_hash = payload.hash();
        self.submissions.lock().unwrap().push(RecordedSubmission {
            vote_id,
            payload: payload.clone(),
            meta: meta.clone(),
            vote_hash: vote_hash.clone(),
        });
        Ok(LedgerReceipt {
            transaction_id: Self::transaction_id(vote_id),
            vote_hash,
        })
    }

    async fn verify_exists(
        &self,
        _election_id: Id,
        _voter_id: Id,
        vote_hash: &str,
    ) -> Result<LedgerCheck, LedgerError> {
        match self.mode() {
            StubMode::Unavailable => Err(LedgerError::Unavailable("stub offline".to_string())),
            StubMode::Forgetful => Ok(LedgerCheck::default()),
            StubMode::Healthy | StubMode::Rejecting(_) => {
                let transaction_id = self
                    .submissions
                    .lock()
                    .unwrap()
                    .iter()
                    .find(|submission| submission.vote_hash == vote_hash)
                    .map(|submission| Self::transaction_id(submission.vote_id));
                Ok(match transaction_id {
                    Some(transaction_id) => LedgerCheck {
                        exists: true,
                        confirmed: true,
                        transaction_id: Some(transaction_id),
                    },
                    None => LedgerCheck::default(),
                })
            }
        }
    }
}
