//! Notification listener.
//!
//! Reads one JSON object per line from an async reader (stdin in the app).
//! Posted notifications are classified; trading alerts are forwarded to the
//! coordinator, everything else is dropped. Stop requests carry the alert
//! identity shown on the notification's stop action.

use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::core::alerts::model::{AlertEvent, AlertIdentity, AlertSource};
use crate::core::alerts::triggers::AlertClassifier;
use crate::core::coordinator::CoordinatorHandle;
use crate::core::error::SourceError;

/// A notification as posted by some app.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PostedNotification {
    pub package: String,
    /// Provider-side notification key, used for redelivery dedup
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedMessage {
    Posted(PostedNotification),
    Stop { identity: String },
    StopAll,
    Test,
}

pub struct NotificationListener {
    classifier: AlertClassifier,
    handle: CoordinatorHandle,
    enabled: bool,
}

impl NotificationListener {
    /// `enabled` mirrors the monitoring switch; when off, posted
    /// notifications are ignored but stop requests still work.
    pub fn new(classifier: AlertClassifier, handle: CoordinatorHandle, enabled: bool) -> Self {
        Self {
            classifier,
            handle,
            enabled,
        }
    }

    /// Consume the feed until EOF. Malformed lines are logged and skipped.
    pub async fn run<R>(&self, reader: R) -> Result<(), SourceError>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<FeedMessage>(line) {
                Ok(message) => self.dispatch(message).await?,
                Err(e) => log::warn!("Ignoring malformed feed line: {}", e),
            }
        }
        log::info!("Notification feed closed");
        Ok(())
    }

    pub async fn dispatch(&self, message: FeedMessage) -> Result<(), SourceError> {
        match message {
            FeedMessage::Posted(posted) => {
                if let Some(event) = self.classify(posted) {
                    self.handle.ingest(event).await?;
                }
            }
            FeedMessage::Stop { identity } => {
                self.handle.cancel(AlertIdentity::new(identity)).await?;
            }
            FeedMessage::StopAll => self.handle.cancel_all().await?,
            FeedMessage::Test => self.handle.test_alert().await?,
        }
        Ok(())
    }

    /// Build an alert event for a posted notification, or None if it is
    /// not a trading alert (or monitoring is off).
    pub fn classify(&self, posted: PostedNotification) -> Option<AlertEvent> {
        if !self.enabled {
            return None;
        }
        let verdict = self
            .classifier
            .evaluate(&posted.package, &posted.title, &posted.text)?;
        log::debug!("{} accepted ({:?})", posted.package, verdict);

        Some(
            AlertEvent::new(
                AlertSource::Notification {
                    package: posted.package,
                },
                posted.title,
                posted.text,
            )
            .with_key(posted.key),
        )
    }
}
