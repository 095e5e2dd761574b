// Alert model types: identities, inbound events and the escalation policy.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How long one escalation step keeps sound and vibration running.
pub const ALERT_DURATION: Duration = Duration::from_secs(180);
/// Time between the start of two consecutive escalation steps.
pub const REPEAT_INTERVAL: Duration = Duration::from_secs(600);
/// Hard cap on escalation steps per alert identity.
pub const MAX_ESCALATIONS: u32 = 6;
/// Window during which a redelivered raw event is dropped before reaching the engine.
pub const DEDUP_COOLDOWN: Duration = Duration::from_secs(60);

/// Stable key naming one logical alarm session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertIdentity(String);

impl AlertIdentity {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Derive the identity from the display payload (`title:message`).
    pub fn from_content(title: &str, message: &str) -> Self {
        Self(format!("{}:{}", title, message))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AlertIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where an alert event came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlertSource {
    /// A system notification posted by `package`
    Notification { package: String },
    /// The HTTP polling endpoint
    Poll,
    /// A manually requested test alert
    Test,
}

impl AlertSource {
    /// Short tag used when the provider has no native event id.
    pub fn tag(&self) -> &str {
        match self {
            Self::Notification { package } => package,
            Self::Poll => "poll",
            Self::Test => "test",
        }
    }
}

/// A classified alert handed to the dedup filter and then the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertEvent {
    pub source: AlertSource,
    /// Provider-native unique id, preferred over content for dedup
    pub key: Option<String>,
    pub title: String,
    pub message: String,
    pub received_at: DateTime<Utc>,
}

impl AlertEvent {
    pub fn new(source: AlertSource, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source,
            key: None,
            title: title.into(),
            message: message.into(),
            received_at: Utc::now(),
        }
    }

    pub fn with_key(mut self, key: Option<String>) -> Self {
        self.key = key.filter(|k| !k.is_empty());
        self
    }

    /// Key used by the cooldown filter: the provider id when present,
    /// otherwise `source:title:message`.
    pub fn dedup_key(&self) -> String {
        match &self.key {
            Some(key) => key.clone(),
            None => format!("{}:{}:{}", self.source.tag(), self.title, self.message),
        }
    }

    pub fn identity(&self) -> AlertIdentity {
        AlertIdentity::from_content(&self.title, &self.message)
    }
}

/// Escalation policy - persisted in settings.json
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationPolicy {
    #[serde(default = "default_alert_duration")]
    pub alert_duration_secs: u64,
    #[serde(default = "default_repeat_interval")]
    pub repeat_interval_secs: u64,
    #[serde(default = "default_max_escalations")]
    pub max_escalations: u32,
    #[serde(default = "default_dedup_cooldown")]
    pub dedup_cooldown_secs: u64,
}

fn default_alert_duration() -> u64 {
    ALERT_DURATION.as_secs()
}

fn default_repeat_interval() -> u64 {
    REPEAT_INTERVAL.as_secs()
}

fn default_max_escalations() -> u32 {
    MAX_ESCALATIONS
}

fn default_dedup_cooldown() -> u64 {
    DEDUP_COOLDOWN.as_secs()
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self {
            alert_duration_secs: default_alert_duration(),
            repeat_interval_secs: default_repeat_interval(),
            max_escalations: default_max_escalations(),
            dedup_cooldown_secs: default_dedup_cooldown(),
        }
    }
}

impl EscalationPolicy {
    pub fn alert_duration(&self) -> Duration {
        Duration::from_secs(self.alert_duration_secs)
    }

    pub fn repeat_interval(&self) -> Duration {
        Duration::from_secs(self.repeat_interval_secs)
    }

    /// At least one step always fires for a new alert.
    pub fn max_escalations(&self) -> u32 {
        self.max_escalations.max(1)
    }

    pub fn dedup_cooldown(&self) -> Duration {
        Duration::from_secs(self.dedup_cooldown_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_from_content() {
        let id = AlertIdentity::from_content("BTC Alert", "Price > 50000");
        assert_eq!(id.as_str(), "BTC Alert:Price > 50000");
        assert_eq!(id.to_string(), "BTC Alert:Price > 50000");
    }

    #[test]
    fn test_dedup_key_prefers_provider_id() {
        let source = AlertSource::Notification {
            package: "com.tradingview.tradingviewapp".to_string(),
        };
        let event = AlertEvent::new(source.clone(), "BTC", "up")
            .with_key(Some("0|com.tradingview|42".to_string()));
        assert_eq!(event.dedup_key(), "0|com.tradingview|42");

        let fallback = AlertEvent::new(source, "BTC", "up").with_key(Some(String::new()));
        assert_eq!(fallback.dedup_key(), "com.tradingview.tradingviewapp:BTC:up");
    }

    #[test]
    fn test_event_json_keeps_timestamp() {
        let event = AlertEvent::new(AlertSource::Poll, "BTC", "up").with_key(Some("k".to_string()));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["source"]["kind"], "poll");
        assert!(json["received_at"].is_string());

        let back: AlertEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back.received_at, event.received_at);
        assert_eq!(back.dedup_key(), "k");
    }

    #[test]
    fn test_policy_defaults_and_partial_json() {
        let policy = EscalationPolicy::default();
        assert_eq!(policy.alert_duration(), ALERT_DURATION);
        assert_eq!(policy.repeat_interval(), REPEAT_INTERVAL);
        assert_eq!(policy.max_escalations(), 6);
        assert_eq!(policy.dedup_cooldown(), DEDUP_COOLDOWN);

        let parsed: EscalationPolicy = serde_json::from_str(r#"{"max_escalations": 0}"#).unwrap();
        assert_eq!(parsed.max_escalations(), 1);
        assert_eq!(parsed.repeat_interval_secs, 600);
    }
}
