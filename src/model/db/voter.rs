use serde::{Deserialize, Serialize};

use crate::model::{common::voter::RegistrationStatus, mongodb::Id};

/// A voter, as owned by the external registration subsystem. Read-only
/// here: this service only ever decides whether a voter may cast a vote.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Voter {
    #[serde(rename = "_id")]
    pub id: Id,
    /// Progress through identity verification.
    pub registration: RegistrationStatus,
    /// Deactivated voters may not vote regardless of registration.
    pub active: bool,
}
