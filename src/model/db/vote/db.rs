use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    common::vote::{Confirmed, Invalid, LedgerRef, NoAnchor, Pending, VoteState},
    mongodb::Id,
};

use super::base::VoteCore;

/// A vote in the database, with its stable public identifier.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Vote<S: VoteState> {
    /// The vote's ID, minted by the application at creation.
    #[serde(rename = "_id")]
    pub id: Id,
    /// The vote itself.
    #[serde(flatten)]
    pub vote: VoteCore<S>,
}

impl Vote<Pending> {
    /// Create a new pending vote. The timestamp is assigned here, once.
    pub fn new(
        election_id: Id,
        voter_id: Id,
        candidate_id: Id,
        origin: Option<String>,
        agent: Option<String>,
    ) -> Self {
        Self {
            id: Id::new(),
            vote: VoteCore {
                election_id,
                voter_id,
                candidate_id,
                cast_at: Utc::now(),
                origin,
                agent,
                anchor: NoAnchor {},
                state: Pending,
            },
        }
    }

    /// Attach the ledger anchor, promoting this vote to confirmed.
    pub fn confirm(self, anchor: LedgerRef) -> Vote<Confirmed> {
        Vote {
            id: self.id,
            vote: self.vote.confirm(anchor),
        }
    }

    /// Mark this vote invalid: the ledger never accepted it.
    pub fn invalidate(self) -> Vote<Invalid> {
        Vote {
            id: self.id,
            vote: self.vote.invalidate(),
        }
    }
}

impl<S: VoteState> Deref for Vote<S> {
    type Target = VoteCore<S>;

    fn deref(&self) -> &Self::Target {
        &self.vote
    }
}

impl<S: VoteState> DerefMut for Vote<S> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.vote
    }
}

/// A vote in any state.
///
/// With the untagged representation, any concrete `Vote<S>` document
/// deserializes straight into the matching variant via its `state` field.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnyVote {
    Pending(Vote<Pending>),
    Confirmed(Vote<Confirmed>),
    Invalid(Vote<Invalid>),
}

impl AnyVote {
    pub fn id(&self) -> Id {
        match self {
            Self::Pending(vote) => vote.id,
            Self::Confirmed(vote) => vote.id,
            Self::Invalid(vote) => vote.id,
        }
    }

    pub fn election_id(&self) -> Id {
        match self {
            Self::Pending(vote) => vote.election_id,
            Self::Confirmed(vote) => vote.election_id,
            Self::Invalid(vote) => vote.election_id,
        }
    }

    pub fn voter_id(&self) -> Id {
        match self {
            Self::Pending(vote) => vote.voter_id,
            Self::Confirmed(vote) => vote.voter_id,
            Self::Invalid(vote) => vote.voter_id,
        }
    }

    pub fn candidate_id(&self) -> Id {
        match self {
            Self::Pending(vote) => vote.candidate_id,
            Self::Confirmed(vote) => vote.candidate_id,
            Self::Invalid(vote) => vote.candidate_id,
        }
    }

    pub fn cast_at(&self) -> DateTime<Utc> {
        match self {
            Self::Pending(vote) => vote.cast_at,
            Self::Confirmed(vote) => vote.cast_at,
            Self::Invalid(vote) => vote.cast_at,
        }
    }

    /// The state name as stored in the `state` field.
    pub fn state_name(&self) -> &'static str {
        match self {
            Self::Pending(_) => Pending::NAME,
            Self::Confirmed(_) => Confirmed::NAME,
            Self::Invalid(_) => Invalid::NAME,
        }
    }

    /// The ledger anchor, if this vote has one.
    pub fn ledger_ref(&self) -> Option<&LedgerRef> {
        match self {
            Self::Confirmed(vote) => Some(&vote.anchor),
            _ => None,
        }
    }

    pub fn origin(&self) -> Option<&str> {
        match self {
            Self::Pending(vote) => vote.origin.as_deref(),
            Self::Confirmed(vote) => vote.origin.as_deref(),
            Self::Invalid(vote) => vote.origin.as_deref(),
        }
    }

    pub fn agent(&self) -> Option<&str> {
        match self {
            Self::Pending(vote) => vote.agent.as_deref(),
            Self::Confirmed(vote) => vote.agent.as_deref(),
            Self::Invalid(vote) => vote.agent.as_deref(),
        }
    }
}
