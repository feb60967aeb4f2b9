use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::{common::election::ElectionState, mongodb::Id};

/// An election, as owned by the external election-management subsystem.
/// Read-only here: this service only ever decides whether it currently
/// accepts votes.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Election {
    #[serde(rename = "_id")]
    pub id: Id,
    /// Election name.
    pub name: String,
    /// Election state.
    pub state: ElectionState,
    /// Start of the voting window, inclusive.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub start_time: DateTime<Utc>,
    /// End of the voting window, exclusive.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub end_time: DateTime<Utc>,
}
