use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// A candidate standing in a specific election.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(rename = "_id")]
    pub id: Id,
    /// The election this candidate stands in.
    pub election_id: Id,
    /// Candidate name.
    pub name: String,
}
