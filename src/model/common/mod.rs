//! Types common to the API and DB representations.

pub mod election;
pub mod vote;
pub mod voter;
