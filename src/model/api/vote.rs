use chrono::{serde::ts_seconds, DateTime, Utc};
use rocket::request::{self, FromRequest, Request};
use serde::{Deserialize, Serialize};

use crate::model::{api::id::ApiId, db::vote::AnyVote, mongodb::Id};

/// A vote that a voter wishes to cast. The election comes from the request
/// path; the voter from their session.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct VoteSpec {
    pub candidate_id: Id,
}

/// Request provenance retained on the vote for audit.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct SubmissionMeta {
    /// Origin address of the submission.
    pub origin: Option<String>,
    /// Client agent string.
    pub agent: Option<String>,
}

/// Capture provenance straight off the request.
#[rocket::async_trait]
impl<'r> FromRequest<'r> for SubmissionMeta {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        request::Outcome::Success(Self {
            origin: req.client_ip().map(|addr| addr.to_string()),
            agent: req.headers().get_one("User-Agent").map(str::to_string),
        })
    }
}

/// One entry in a voter's vote history.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct VoteSummary {
    pub vote_id: ApiId,
    pub election_id: ApiId,
    pub candidate_id: ApiId,
    pub state: String,
    #[serde(with = "ts_seconds")]
    pub cast_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
}

impl From<AnyVote> for VoteSummary {
    fn from(vote: AnyVote) -> Self {
        Self {
            vote_id: vote.id().into(),
            election_id: vote.election_id().into(),
            candidate_id: vote.candidate_id().into(),
            state: vote.state_name().to_string(),
            cast_at: vote.cast_at(),
            transaction_id: vote
                .ledger_ref()
                .map(|anchor| anchor.transaction_id.clone()),
        }
    }
}

/// The full details of a single vote.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct VoteDetails {
    pub vote_id: ApiId,
    pub election_id: ApiId,
    pub candidate_id: ApiId,
    pub voter_id: ApiId,
    pub state: String,
    #[serde(with = "ts_seconds")]
    pub cast_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vote_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    /// Audit provenance; only present for privileged callers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<SubmissionMeta>,
}

impl VoteDetails {
    /// Build the details view of a vote, with provenance iff the caller is
    /// privileged.
    pub fn from_vote(vote: AnyVote, include_provenance: bool) -> Self {
        let provenance = include_provenance.then(|| SubmissionMeta {
            origin: vote.origin().map(str::to_string),
            agent: vote.agent().map(str::to_string),
        });
        Self {
            vote_id: vote.id().into(),
            election_id: vote.election_id().into(),
            candidate_id: vote.candidate_id().into(),
            voter_id: vote.voter_id().into(),
            state: vote.state_name().to_string(),
            cast_at: vote.cast_at(),
            vote_hash: vote.ledger_ref().map(|anchor| anchor.vote_hash.clone()),
            transaction_id: vote
                .ledger_ref()
                .map(|anchor| anchor.transaction_id.clone()),
            provenance,
        }
    }
}
