//! The vote pipeline: eligibility, submission, verification, and repair.

pub mod eligibility;
pub mod reconcile;
pub mod submission;
pub mod verification;
