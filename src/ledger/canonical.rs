use chrono::{DateTime, Utc};
use data_encoding::HEXLOWER;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::model::mongodb::Id;

/// The canonical form of a vote: the exact field set committed to the
/// ledger.
///
/// Field declaration order is the serialization order and must never change:
/// the ledger service derives byte-identical payloads independently, and the
/// hashes only match if both sides serialize identically.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct CanonicalVote {
    pub candidate_id: String,
    pub election_id: String,
    pub timestamp: i64,
    pub voter_id: String,
}

impl CanonicalVote {
    /// Canonicalize the given vote fields. The timestamp is truncated to
    /// whole seconds on both sides of the contract.
    pub fn new(election_id: Id, voter_id: Id, candidate_id: Id, cast_at: DateTime<Utc>) -> Self {
        Self {
            candidate_id: candidate_id.to_string(),
            election_id: election_id.to_string(),
            timestamp: cast_at.timestamp(),
            voter_id: voter_id.to_string(),
        }
    }

    /// The canonical byte serialization: compact UTF-8 JSON, fixed key
    /// order, no insignificant whitespace.
    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("Serialisation is infallible")
    }

    /// The canonical content hash: lowercase hex SHA-256 of [`to_bytes`](Self::to_bytes).
    pub fn hash(&self) -> String {
        HEXLOWER.encode(&Sha256::digest(self.to_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    /// Fixture agreed with the ledger service team.
    #[test]
    fn pinned_fixture() {
        let canonical = CanonicalVote {
            candidate_id: "C1".to_string(),
            election_id: "E1".to_string(),
            timestamp: 1_700_000_000,
            voter_id: "V1".to_string(),
        };
        assert_eq!(
            String::from_utf8(canonical.to_bytes()).unwrap(),
            r#"{"candidate_id":"C1","election_id":"E1","timestamp":1700000000,"voter_id":"V1"}"#
        );
        assert_eq!(
            canonical.hash(),
            "b8a05c6928c0e5d200855563718e0b4b31ac695a4b60d84d3b2160e982fdd96f"
        );
    }

    #[test]
    fn equal_votes_hash_equal() {
        let cast_at = Utc::now();
        let (election, voter, candidate) = (Id::new(), Id::new(), Id::new());
        assert_eq!(
            CanonicalVote::new(election, voter, candidate, cast_at).hash(),
            CanonicalVote::new(election, voter, candidate, cast_at).hash()
        );
    }

    #[test]
    fn different_votes_hash_different() {
        let cast_at = Utc::now();
        let (election, voter) = (Id::new(), Id::new());
        assert_ne!(
            CanonicalVote::new(election, voter, Id::new(), cast_at).hash(),
            CanonicalVote::new(election, voter, Id::new(), cast_at).hash()
        );
    }

    #[test]
    fn sub_second_precision_does_not_affect_the_hash() {
        // Datetimes only round-trip the database at millisecond precision,
        // so anything finer than seconds must not reach the hash.
        let base = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let skewed = base + Duration::milliseconds(777);
        let (election, voter, candidate) = (Id::new(), Id::new(), Id::new());
        assert_eq!(
            CanonicalVote::new(election, voter, candidate, base).hash(),
            CanonicalVote::new(election, voter, candidate, skewed).hash()
        );
    }
}
