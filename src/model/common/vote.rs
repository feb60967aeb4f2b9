use std::fmt::Debug;

use mongodb::bson::{to_bson, Bson};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_unit_struct::{Deserialize_unit_struct, Serialize_unit_struct};

/// Trait for the state of a vote, enforcing on the type level that a vote
/// carries a ledger anchor precisely when its state says it should.
pub trait VoteState: Copy {
    /// The state name as stored in the database.
    const NAME: &'static str;

    /// The ledger anchor data carried by votes in this state.
    type Anchor: Serialize
        + DeserializeOwned
        + Debug
        + Clone
        + PartialEq
        + Eq
        + Send
        + Sync
        + Unpin;
}

/// Marker type for a vote that has been accepted locally but not yet
/// anchored in the ledger.
#[derive(Debug, Eq, PartialEq, Copy, Clone, Deserialize_unit_struct, Serialize_unit_struct)]
pub struct Pending;

impl From<Pending> for Bson {
    fn from(state: Pending) -> Self {
        to_bson(&state).expect("Serialisation is infallible")
    }
}

impl VoteState for Pending {
    const NAME: &'static str = "Pending";

    type Anchor = NoAnchor;
}

/// Marker type for a vote that the ledger has accepted.
#[derive(Debug, Eq, PartialEq, Copy, Clone, Deserialize_unit_struct, Serialize_unit_struct)]
pub struct Confirmed;

impl From<Confirmed> for Bson {
    fn from(state: Confirmed) -> Self {
        to_bson(&state).expect("Serialisation is infallible")
    }
}

impl VoteState for Confirmed {
    const NAME: &'static str = "Confirmed";

    type Anchor = LedgerRef;
}

/// Marker type for a vote the ledger never accepted. Terminal: it no longer
/// occupies the voter's slot for the election.
#[derive(Debug, Eq, PartialEq, Copy, Clone, Deserialize_unit_struct, Serialize_unit_struct)]
pub struct Invalid;

impl From<Invalid> for Bson {
    fn from(state: Invalid) -> Self {
        to_bson(&state).expect("Serialisation is infallible")
    }
}

impl VoteState for Invalid {
    const NAME: &'static str = "Invalid";

    type Anchor = NoAnchor;
}

/// The absence of a ledger anchor.
///
/// An empty braced struct rather than a unit struct so it can be flattened
/// into the containing vote.
#[derive(Debug, Eq, PartialEq, Copy, Clone, Serialize, Deserialize)]
pub struct NoAnchor {}

/// A confirmed vote's anchor in the ledger.
#[derive(Debug, Eq, PartialEq, Clone, Serialize, Deserialize)]
pub struct LedgerRef {
    /// The canonical content hash the ledger accepted.
    pub vote_hash: String,
    /// The ledger's reference for the accepted transaction.
    pub transaction_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn states_serialize_as_their_names() {
        assert_eq!(Bson::from(Pending), Bson::String("Pending".to_string()));
        assert_eq!(Bson::from(Confirmed), Bson::String(Confirmed::NAME.to_string()));
        assert_eq!(Bson::from(Invalid), Bson::String(Invalid::NAME.to_string()));
    }
}
