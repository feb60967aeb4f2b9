use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use mongodb::error::Error as DbError;
use rocket::{http::Status, response::Responder, serde::json::Json};
use serde::Serialize;
use thiserror::Error;

use crate::ledger::LedgerError;
use crate::voting::eligibility::Reason;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error("Bad request: {0}")]
    Validation(String),
    #[error("Voter is not eligible: {0:?}")]
    NotEligible(Vec<Reason>),
    #[error("A vote has already been cast in this election")]
    AlreadyVoted,
    #[error("Ledger unavailable: {0}")]
    LedgerUnavailable(String),
    #[error("Ledger rejected the transaction: {0}")]
    LedgerRejected(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<LedgerError> for Error {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Unavailable(reason) => Self::LedgerUnavailable(reason),
            LedgerError::Rejected(reason) => Self::LedgerRejected(reason),
        }
    }
}

/// The wire form of an error. `error` is a stable machine-readable code;
/// `detail` and `reasons` are for humans. Internal errors never leak their
/// underlying detail across the service boundary.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasons: Option<Vec<String>>,
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r rocket::Request<'_>) -> rocket::response::Result<'o> {
        let (status, body) = match self {
            Self::Validation(detail) => (
                Status::BadRequest,
                ErrorBody {
                    error: "validation_error",
                    detail: Some(detail),
                    reasons: None,
                },
            ),
            Self::NotEligible(reasons) => (
                Status::Forbidden,
                ErrorBody {
                    error: "not_eligible",
                    detail: None,
                    reasons: Some(reasons.iter().map(Reason::to_string).collect()),
                },
            ),
            Self::AlreadyVoted => (
                Status::Conflict,
                ErrorBody {
                    error: "already_voted",
                    detail: Some(Reason::AlreadyVoted.to_string()),
                    reasons: None,
                },
            ),
            Self::LedgerUnavailable(_) => (
                Status::ServiceUnavailable,
                ErrorBody {
                    error: "ledger_unavailable",
                    detail: Some("The vote could not be recorded; please retry".to_string()),
                    reasons: None,
                },
            ),
            Self::LedgerRejected(detail) => (
                Status::BadGateway,
                ErrorBody {
                    error: "ledger_rejected",
                    detail: Some(detail),
                    reasons: None,
                },
            ),
            Self::Unauthorized(detail) => (
                Status::Unauthorized,
                ErrorBody {
                    error: "unauthorized",
                    detail: Some(detail),
                    reasons: None,
                },
            ),
            Self::NotFound(detail) => (
                Status::NotFound,
                ErrorBody {
                    error: "not_found",
                    detail: Some(detail),
                    reasons: None,
                },
            ),
            Self::Jwt(err) => {
                let status = match err.into_kind() {
                    JwtErrorKind::ExpiredSignature | JwtErrorKind::ImmatureSignature => {
                        Status::Unauthorized
                    }
                    _ => Status::BadRequest,
                };
                (
                    status,
                    ErrorBody {
                        error: "invalid_token",
                        detail: None,
                        reasons: None,
                    },
                )
            }
            Self::Db(err) => {
                error!("Database error: {err}");
                (
                    Status::InternalServerError,
                    ErrorBody {
                        error: "internal",
                        detail: None,
                        reasons: None,
                    },
                )
            }
        };
        (status, Json(body)).respond_to(req)
    }
}
