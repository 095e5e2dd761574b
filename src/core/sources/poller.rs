//! HTTP alert poller.
//!
//! Polls a remote endpoint that reports pending alerts (for example a mail
//! bridge). Each reported alert becomes an event; subject is the title and
//! sender is the message.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::MissedTickBehavior;

use crate::core::alerts::model::{AlertEvent, AlertSource};
use crate::core::coordinator::CoordinatorHandle;
use crate::core::error::SourceError;

/// Poll configuration - persisted in settings.json
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollSettings {
    pub url: String,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_interval_secs() -> u64 {
    5
}

fn default_timeout_secs() -> u64 {
    5
}

impl PollSettings {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            interval_secs: default_interval_secs(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PolledAlert {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub from: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PollResponse {
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub alerts: Vec<PolledAlert>,
}

impl PollResponse {
    pub fn into_events(self) -> Vec<AlertEvent> {
        if self.count == 0 {
            return Vec::new();
        }
        self.alerts
            .into_iter()
            .map(|alert| AlertEvent::new(AlertSource::Poll, alert.subject, alert.from))
            .collect()
    }
}

pub struct AlertPoller {
    client: reqwest::Client,
    settings: PollSettings,
    handle: CoordinatorHandle,
}

impl AlertPoller {
    pub fn new(settings: PollSettings, handle: CoordinatorHandle) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs.max(1)))
            .build()?;
        Ok(Self {
            client,
            settings,
            handle,
        })
    }

    /// Poll until the coordinator goes away. Request failures are logged and
    /// retried on the next tick.
    pub async fn run(&self) -> Result<(), SourceError> {
        let mut ticker = tokio::time::interval(Duration::from_secs(self.settings.interval_secs.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        log::info!("Polling {} every {}s", self.settings.url, self.settings.interval_secs);

        loop {
            ticker.tick().await;
            let events = match self.poll_once().await {
                Ok(events) => events,
                Err(e) => {
                    log::warn!("Alert poll failed: {}", e);
                    continue;
                }
            };
            for event in events {
                self.handle.ingest(event).await?;
            }
        }
    }

    pub async fn poll_once(&self) -> Result<Vec<AlertEvent>, SourceError> {
        let response: PollResponse = self
            .client
            .get(&self.settings.url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        if response.count > 0 {
            log::debug!("Poll reported {} alerts", response.count);
        }
        Ok(response.into_events())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_to_events() {
        let response: PollResponse = serde_json::from_str(
            r#"{"count":2,"alerts":[{"subject":"BTC crossing 50000","from":"noreply@tradingview.com"},{"subject":"ETH","from":"x"}]}"#,
        )
        .unwrap();
        let events = response.into_events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].title, "BTC crossing 50000");
        assert_eq!(events[0].message, "noreply@tradingview.com");
        assert_eq!(events[0].source, AlertSource::Poll);
        assert_eq!(events[0].dedup_key(), "poll:BTC crossing 50000:noreply@tradingview.com");
    }

    #[test]
    fn test_zero_count_yields_nothing() {
        let response: PollResponse =
            serde_json::from_str(r#"{"count":0,"alerts":[{"subject":"stale","from":"x"}]}"#).unwrap();
        assert!(response.into_events().is_empty());

        let empty: PollResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.into_events().is_empty());
    }

    #[test]
    fn test_settings_defaults() {
        let settings: PollSettings = serde_json::from_str(r#"{"url":"http://localhost:8080/alerts"}"#).unwrap();
        assert_eq!(settings, PollSettings::new("http://localhost:8080/alerts"));
        assert_eq!(settings.interval_secs, 5);
        assert_eq!(settings.timeout_secs, 5);
    }
}
