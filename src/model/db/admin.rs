use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// An administrator account, owned by the external admin-management
/// subsystem. Present here only so privileged sessions can be checked
/// against an existing account.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Admin {
    #[serde(rename = "_id")]
    pub id: Id,
    pub username: String,
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl Admin {
        pub fn example() -> Self {
            Self {
                id: Id::new(),
                username: "coordinator".to_string(),
            }
        }
    }
}
