use std::time::Duration;

use rocket::tokio::time::sleep;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::model::{api::vote::SubmissionMeta, mongodb::Id};

use super::{CanonicalVote, Ledger, LedgerCheck, LedgerError, LedgerReceipt};

/// Total attempts per submission. Only transport failures are retried.
const SUBMIT_ATTEMPTS: u32 = 3;
/// Backoff before the second attempt; doubles each attempt after that.
const RETRY_BACKOFF: Duration = Duration::from_millis(200);

/// The production ledger client: JSON over HTTP, authenticated by a service
/// API key.
pub struct HttpLedger {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpLedger {
    /// Create a new client. The timeout bounds every request, including
    /// connection establishment.
    pub fn new(
        base_url: String,
        api_key: String,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    /// POST a JSON request and parse the JSON response.
    ///
    /// Transport failures and server errors map to `Unavailable`; anything
    /// the service actually answered is parsed, with the `success` flag left
    /// to the caller.
    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, LedgerError>
    where
        B: Serialize,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(format!("{}/{}", self.base_url, path))
            .header("X-API-Key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| LedgerError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(LedgerError::Unavailable(format!("status {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| LedgerError::Unavailable(e.to_string()))?;
        serde_json::from_str(&body)
            .map_err(|_| LedgerError::Rejected(format!("unexpected response (status {status})")))
    }
}

#[rocket::async_trait]
impl Ledger for HttpLedger {
    async fn submit(
        &self,
        payload: &CanonicalVote,
        meta: &SubmissionMeta,
        vote_id: Id,
    ) -> Result<LedgerReceipt, LedgerError> {
        let vote_hash = payload.hash();
        let request = SubmitRequest {
            election_id: &payload.election_id,
            voter_id: &payload.voter_id,
            candidate_id: &payload.candidate_id,
            vote_hash: &vote_hash,
            metadata: SubmitMetadata {
                vote_id: vote_id.to_string(),
                origin: meta.origin.as_deref(),
                agent: meta.agent.as_deref(),
            },
        };

        let mut attempt = 0;
        let response: SubmitResponse = loop {
            attempt += 1;
            match self.post("transactions/submit", &request).await {
                Ok(response) => break response,
                Err(LedgerError::Unavailable(reason)) if attempt < SUBMIT_ATTEMPTS => {
                    warn!("Ledger submit attempt {attempt} failed, retrying: {reason}");
                    sleep(RETRY_BACKOFF * attempt).await;
                }
                Err(e) => return Err(e),
            }
        };

        if !response.success {
            return Err(LedgerError::Rejected(
                response
                    .error
                    .unwrap_or_else(|| "no reason given".to_string()),
            ));
        }
        let transaction_id = response.transaction_id.ok_or_else(|| {
            LedgerError::Rejected("accepted without a transaction id".to_string())
        })?;
        Ok(LedgerReceipt {
            transaction_id,
            vote_hash: response.vote_hash.unwrap_or(vote_hash),
        })
    }

    async fn verify_exists(
        &self,
        election_id: Id,
        voter_id: Id,
        vote_hash: &str,
    ) -> Result<LedgerCheck, LedgerError> {
        let election_id = election_id.to_string();
        let voter_id = voter_id.to_string();
        let request = VerifyRequest {
            election_id: &election_id,
            voter_id: &voter_id,
            vote_hash,
        };

        let response: VerifyResponse = self.post("verify", &request).await?;
        if !response.success {
            return Err(LedgerError::Rejected(
                response
                    .error
                    .unwrap_or_else(|| "no reason given".to_string()),
            ));
        }
        Ok(LedgerCheck {
            exists: response.exists,
            confirmed: response.confirmed,
            transaction_id: response.transaction_id,
        })
    }
}

/// Wire format of a submission.
#[derive(Debug, Serialize)]
struct SubmitRequest<'a> {
    election_id: &'a str,
    voter_id: &'a str,
    candidate_id: &'a str,
    vote_hash: &'a str,
    metadata: SubmitMetadata<'a>,
}

/// Opaque transaction metadata; the ledger stores it without interpreting it.
#[derive(Debug, Serialize)]
struct SubmitMetadata<'a> {
    vote_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    origin: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    agent: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    success: bool,
    #[serde(default)]
    transaction_id: Option<String>,
    #[serde(default)]
    vote_hash: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Wire format of an existence query.
#[derive(Debug, Serialize)]
struct VerifyRequest<'a> {
    election_id: &'a str,
    voter_id: &'a str,
    vote_hash: &'a str,
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    success: bool,
    #[serde(default)]
    exists: bool,
    #[serde(default)]
    confirmed: bool,
    #[serde(default)]
    transaction_id: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    /// The request shapes are part of the contract with the ledger service.
    #[test]
    fn submit_wire_shape() {
        let request = SubmitRequest {
            election_id: "E1",
            voter_id: "V1",
            candidate_id: "C1",
            vote_hash: "abc123",
            metadata: SubmitMetadata {
                vote_id: "64f000000000000000000000".to_string(),
                origin: Some("203.0.113.7"),
                agent: None,
            },
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "election_id": "E1",
                "voter_id": "V1",
                "candidate_id": "C1",
                "vote_hash": "abc123",
                "metadata": {
                    "vote_id": "64f000000000000000000000",
                    "origin": "203.0.113.7",
                },
            })
        );
    }

    #[test]
    fn verify_wire_shape() {
        let request = VerifyRequest {
            election_id: "E1",
            voter_id: "V1",
            vote_hash: "abc123",
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "election_id": "E1",
                "voter_id": "V1",
                "vote_hash": "abc123",
            })
        );
    }

    #[test]
    fn verify_response_parses_without_optional_fields() {
        let minimal: VerifyResponse =
            serde_json::from_str(r#"{"success": true, "exists": false}"#).unwrap();
        assert!(minimal.success);
        assert!(!minimal.exists);
        assert!(!minimal.confirmed);
        assert_eq!(minimal.transaction_id, None);
    }
}
