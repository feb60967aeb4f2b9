use mongodb::bson::{to_bson, Bson};
use serde::{Deserialize, Serialize};

/// Progress of a voter through identity verification, owned by the external
/// registration subsystem.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum RegistrationStatus {
    /// Registered but not yet verified.
    Pending,
    /// Identity verified; may vote.
    Verified,
    /// Verification failed.
    Rejected,
}

impl From<RegistrationStatus> for Bson {
    fn from(status: RegistrationStatus) -> Self {
        to_bson(&status).expect("Serialisation is infallible")
    }
}
