//! The outbound notification sink: events for downstream real-time
//! consumers, emitted after a vote commits. Strictly best-effort; a vote is
//! never un-committed because nobody heard about it.

use std::sync::Arc;
use std::time::Duration;

use chrono::{serde::ts_seconds, DateTime, Utc};
use rocket::tokio::{self, time::sleep};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::api::id::ApiId;

/// A shared handle on the notification sink.
pub type DynNotifier = Arc<dyn Notifier>;

/// Total delivery attempts per event.
const EMIT_ATTEMPTS: u32 = 3;
/// Backoff before the second attempt; doubles each attempt after that.
const EMIT_BACKOFF: Duration = Duration::from_millis(500);

/// The channel vote events are published on.
const VOTES_CHANNEL: &str = "votes";

#[derive(Debug, Error)]
#[error("Failed to deliver notification: {0}")]
pub struct NotifyError(pub String);

/// A vote was committed and anchored in the ledger.
///
/// Deliberately excludes the voter: subscribers see that a vote happened,
/// never who cast it.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteConfirmed {
    pub vote_id: ApiId,
    pub election_id: ApiId,
    pub candidate_id: ApiId,
    pub transaction_id: String,
    #[serde(with = "ts_seconds")]
    pub timestamp: DateTime<Utc>,
}

/// The sink events are emitted to.
#[rocket::async_trait]
pub trait Notifier: Send + Sync {
    async fn vote_confirmed(&self, event: &VoteConfirmed) -> Result<(), NotifyError>;
}

/// The production sink: HTTP POST to the push-notification relay.
pub struct HttpNotifier {
    client: reqwest::Client,
    url: String,
}

impl HttpNotifier {
    pub fn new(url: String) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self { client, url })
    }
}

#[rocket::async_trait]
impl Notifier for HttpNotifier {
    async fn vote_confirmed(&self, event: &VoteConfirmed) -> Result<(), NotifyError> {
        let notification = Notification {
            channel: VOTES_CHANNEL,
            message: "New vote cast",
            data: event,
        };
        let response = self
            .client
            .post(format!("{}/api/notify", self.url))
            .json(&notification)
            .send()
            .await
            .map_err(|e| NotifyError(e.to_string()))?;
        if !response.status().is_success() {
            return Err(NotifyError(format!("status {}", response.status())));
        }
        Ok(())
    }
}

/// Wire envelope understood by the relay.
#[derive(Debug, Serialize)]
struct Notification<'a> {
    channel: &'static str,
    message: &'static str,
    data: &'a VoteConfirmed,
}

/// Emit a confirmation event in the background, with bounded retries.
/// Failures are logged and dropped.
pub fn emit_vote_confirmed(notifier: DynNotifier, event: VoteConfirmed) {
    tokio::spawn(async move {
        for attempt in 1..=EMIT_ATTEMPTS {
            match notifier.vote_confirmed(&event).await {
                Ok(()) => return,
                Err(e) if attempt < EMIT_ATTEMPTS => {
                    warn!("Notification attempt {attempt} failed, retrying: {e}");
                    sleep(EMIT_BACKOFF * attempt).await;
                }
                Err(e) => {
                    warn!(
                        "Dropping notification for vote {} after {EMIT_ATTEMPTS} attempts: {e}",
                        event.vote_id
                    );
                }
            }
        }
    });
}

#[cfg(test)]
pub use recording::RecordingNotifier;
