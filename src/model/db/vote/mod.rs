mod base;
mod db;

pub use base::VoteCore;
pub use db::{AnyVote, Vote};
