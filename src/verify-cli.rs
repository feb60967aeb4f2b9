//! A simple CLI tool for recomputing canonical vote hashes.
//! This uses the internal server canonicalization, and is by definition
//! compatible with the hashes our API anchors in the ledger.

use std::str::FromStr;

use chrono::{TimeZone, Utc};
use clap::{Arg, ArgAction, ArgMatches, Command};

use chainvote_backend::ledger::CanonicalVote;
use chainvote_backend::model::mongodb::Id;

const PROGRAM_NAME: &str = "verify-vote";

const ABOUT_TEXT: &str = "Recompute the canonical hash of a vote.

EXIT CODES:
     0: Ran successfully; if an expected hash was given, it matched.
   255: Ran successfully, but the expected hash did not match.
 Other: Error.";

const ELECTION_ID: &str = "ELECTION_ID";
const VOTER_ID: &str = "VOTER_ID";
const CANDIDATE_ID: &str = "CANDIDATE_ID";
const TIMESTAMP: &str = "TIMESTAMP";
const EXPECTED_HASH: &str = "EXPECTED_HASH";

const ELECTION_ID_HELP: &str = "The election's hex object id";
const VOTER_ID_HELP: &str = "The voter's hex object id";
const CANDIDATE_ID_HELP: &str = "The candidate's hex object id";
const TIMESTAMP_HELP: &str = "When the vote was cast, as a unix timestamp in seconds";
const EXPECTED_HASH_HELP: &str = "Compare the recomputed hash against this value,\n\
e.g. the `vote_hash` from a receipt or from a ledger transaction";

/// Construct the CLI configuration.
fn cli() -> Command {
    // Make the build dirty when the toml changes.
    include_str!("../Cargo.toml");

    clap::command!(PROGRAM_NAME)
        .about(ABOUT_TEXT)
        .arg(
            Arg::new(ELECTION_ID)
                .help(ELECTION_ID_HELP)
                .action(ArgAction::Set)
                .required(true),
        )
        .arg(
            Arg::new(VOTER_ID)
                .help(VOTER_ID_HELP)
                .action(ArgAction::Set)
                .required(true),
        )
        .arg(
            Arg::new(CANDIDATE_ID)
                .help(CANDIDATE_ID_HELP)
                .action(ArgAction::Set)
                .required(true),
        )
        .arg(
            Arg::new(TIMESTAMP)
                .help(TIMESTAMP_HELP)
                .action(ArgAction::Set)
                .required(true),
        )
        .arg(
            Arg::new(EXPECTED_HASH)
                .help(EXPECTED_HASH_HELP)
                .short('e')
                .long("expected")
                .action(ArgAction::Set),
        )
}

/// Errors that this program may produce.
#[derive(Debug, Eq, PartialEq)]
enum Error {
    /// An argument failed to parse; which one and why.
    Argument(String),
    /// The recomputed hash did not match the expected hash.
    Mismatch { computed: String, expected: String },
}

/// Parse one of the object id arguments.
fn parse_id(args: &ArgMatches, name: &str) -> Result<Id, Error> {
    let raw: &String = args.get_one(name).unwrap(); // Required argument is guaranteed to be present.
    Id::from_str(raw).map_err(|e| Error::Argument(format!("{name}: {e}")))
}

/// Recompute the canonical hash, comparing it against the expected hash if
/// one was given.
fn recompute(args: &ArgMatches) -> Result<String, Error> {
    let election_id = parse_id(args, ELECTION_ID)?;
    let voter_id = parse_id(args, VOTER_ID)?;
    let candidate_id = parse_id(args, CANDIDATE_ID)?;

    let raw_timestamp: &String = args.get_one(TIMESTAMP).unwrap(); // Required argument is guaranteed to be present.
    let seconds =
        i64::from_str(raw_timestamp).map_err(|e| Error::Argument(format!("{TIMESTAMP}: {e}")))?;
    let cast_at = Utc
        .timestamp_opt(seconds, 0)
        .single()
        .ok_or_else(|| Error::Argument(format!("{TIMESTAMP}: {seconds} is out of range")))?;

    let hash = CanonicalVote::new(election_id, voter_id, candidate_id, cast_at).hash();

    if let Some(expected) = args.get_one::<String>(EXPECTED_HASH) {
        if &hash != expected {
            return Err(Error::Mismatch {
                computed: hash,
                expected: expected.clone(),
            });
        }
    }

    Ok(hash)
}

/// Recompute the hash, report the result, and return the exit code.
fn run(args: &ArgMatches) -> u8 {
    match recompute(args) {
        Ok(hash) => {
            println!("{hash}");
            if args.get_one::<String>(EXPECTED_HASH).is_some() {
                println!("Hash matches.");
            }
            0
        }
        Err(Error::Argument(msg)) => {
            println!("Invalid argument: {msg}");
            1
        }
        Err(Error::Mismatch { computed, expected }) => {
            println!("{computed}");
            println!("Hash mismatch: expected {expected}.");
            255
        }
    }
}

fn main() {
    let args = cli().get_matches();
    let exit_code = run(&args);
    std::process::exit(exit_code.into())
}
