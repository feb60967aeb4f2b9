//! The rules deciding whether a voter may cast a vote right now.

use std::fmt::{self, Display, Formatter};

use chrono::{DateTime, Utc};
use mongodb::bson::doc;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{
    common::{
        election::ElectionState,
        vote::{Confirmed, Pending},
        voter::RegistrationStatus,
    },
    db::{election::Election, vote::AnyVote, voter::Voter},
    mongodb::{Coll, Id},
};

/// A single reason a vote cannot be accepted.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum Reason {
    VoterNotFound,
    VoterNotVerified,
    VoterInactive,
    ElectionNotFound,
    ElectionNotActive,
    VotingNotStarted,
    VotingEnded,
    AlreadyVoted,
}

impl Display for Reason {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::VoterNotFound => "voter is not registered",
            Self::VoterNotVerified => "voter is not verified",
            Self::VoterInactive => "voter account is inactive",
            Self::ElectionNotFound => "election does not exist",
            Self::ElectionNotActive => "election is not active",
            Self::VotingNotStarted => "voting has not started",
            Self::VotingEnded => "voting has ended",
            Self::AlreadyVoted => "a vote has already been cast in this election",
        };
        write!(f, "{text}")
    }
}

/// The outcome of an eligibility check: eligible iff nothing speaks against.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Eligibility {
    pub reasons: Vec<Reason>,
}

impl Eligibility {
    pub fn eligible(&self) -> bool {
        self.reasons.is_empty()
    }

    /// Is an existing vote the one and only objection?
    pub fn only_already_voted(&self) -> bool {
        self.reasons == [Reason::AlreadyVoted]
    }
}

/// The voting-window rule on its own. The window is half-open: a vote at
/// exactly `start_time` is acceptable, one at exactly `end_time` is not.
pub fn check_window(now: DateTime<Utc>, election: &Election, reasons: &mut Vec<Reason>) {
    if now < election.start_time {
        reasons.push(Reason::VotingNotStarted);
    } else if now >= election.end_time {
        reasons.push(Reason::VotingEnded);
    }
}

/// Decide whether `voter_id` may vote in `election_id` at instant `now`.
///
/// Read-only. Every rule group is evaluated so that all violations are
/// reported together; rules about a missing voter or election are the
/// exception, since their dependent checks have no subject. The result is
/// advisory: the authoritative double-vote guard is the unique index on the
/// votes collection.
pub async fn check_eligibility(
    voter_id: Id,
    election_id: Id,
    now: DateTime<Utc>,
    voters: &Coll<Voter>,
    elections: &Coll<Election>,
    votes: &Coll<AnyVote>,
) -> Result<Eligibility> {
    let mut reasons = Vec::new();

    // Voter rules.
    match voters.find_one(voter_id.as_doc(), None).await? {
        Some(voter) => {
            if voter.registration != RegistrationStatus::Verified {
                reasons.push(Reason::VoterNotVerified);
            }
            if !voter.active {
                reasons.push(Reason::VoterInactive);
            }
        }
        None => reasons.push(Reason::VoterNotFound),
    }

    // Election rules.
    match elections.find_one(election_id.as_doc(), None).await? {
        Some(election) => {
            if election.state != ElectionState::Active {
                reasons.push(Reason::ElectionNotActive);
            }
            check_window(now, &election, &mut reasons);
        }
        None => reasons.push(Reason::ElectionNotFound),
    }

    // Existing-vote rule. Invalid votes do not count against the voter.
    let existing = doc! {
        "election_id": election_id,
        "voter_id": voter_id,
        "state": {"$in": [Pending, Confirmed]},
    };
    if votes.count_documents(existing, None).await? > 0 {
        reasons.push(Reason::AlreadyVoted);
    }

    Ok(Eligibility { reasons })
}
