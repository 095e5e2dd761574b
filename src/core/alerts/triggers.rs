// Trigger evaluation for posted notifications.
//
// A notification is a trading alert when it comes from a trading-alert app,
// or from a known email app and mentions one of the keywords.

use std::collections::HashSet;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// Classifier configuration - persisted in settings.json
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Any package whose name contains one of these is an alert sender
    #[serde(default = "default_alert_packages")]
    pub alert_packages: Vec<String>,
    /// Email apps whose notifications are checked for keywords
    #[serde(default = "default_email_apps")]
    pub email_apps: Vec<String>,
    /// Case-insensitive keywords looked for in title and text
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,
}

fn default_alert_packages() -> Vec<String> {
    vec!["tradingview".to_string()]
}

fn default_email_apps() -> Vec<String> {
    [
        "com.google.android.gm",
        "com.microsoft.office.outlook",
        "com.yahoo.mobile.client",
        "com.samsung.android.email",
        "com.tencent.androidqqmail",
        "com.tencent.qqlite",
        "com.tencent.mobileqq",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_keywords() -> Vec<String> {
    ["tradingview", "alert", "警报", "提醒", "btc", "eth", "usdt"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            alert_packages: default_alert_packages(),
            email_apps: default_email_apps(),
            keywords: default_keywords(),
        }
    }
}

/// Why a notification was accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Posted by a trading-alert app
    AlertApp,
    /// Posted by an email app and matched a keyword
    EmailKeyword,
}

pub struct AlertClassifier {
    alert_packages: Vec<String>,
    email_apps: HashSet<String>,
    /// None when no keywords are configured
    keywords: Option<Regex>,
}

impl AlertClassifier {
    pub fn new(config: &ClassifierConfig) -> Result<Self, regex::Error> {
        let keywords = if config.keywords.is_empty() {
            None
        } else {
            let pattern = config
                .keywords
                .iter()
                .map(|k| regex::escape(k))
                .collect::<Vec<_>>()
                .join("|");
            Some(RegexBuilder::new(&pattern).case_insensitive(true).build()?)
        };

        Ok(Self {
            alert_packages: config
                .alert_packages
                .iter()
                .map(|p| p.to_lowercase())
                .collect(),
            email_apps: config.email_apps.iter().cloned().collect(),
            keywords,
        })
    }

    /// Evaluate one posted notification. Returns the reason it matched, if any.
    pub fn evaluate(&self, package: &str, title: &str, text: &str) -> Option<Verdict> {
        let package_lower = package.to_lowercase();
        if self
            .alert_packages
            .iter()
            .any(|p| !p.is_empty() && package_lower.contains(p.as_str()))
        {
            return Some(Verdict::AlertApp);
        }

        if self.email_apps.contains(package) {
            let content = format!("{} {}", title, text);
            if self.keywords.as_ref().is_some_and(|k| k.is_match(&content)) {
                return Some(Verdict::EmailKeyword);
            }
        }
        None
    }

    pub fn is_trading_alert(&self, package: &str, title: &str, text: &str) -> bool {
        self.evaluate(package, title, text).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> AlertClassifier {
        AlertClassifier::new(&ClassifierConfig::default()).unwrap()
    }

    #[test]
    fn test_alert_app_always_matches() {
        let c = classifier();
        assert_eq!(
            c.evaluate("com.tradingview.tradingviewapp", "Anything", ""),
            Some(Verdict::AlertApp)
        );
        assert_eq!(c.evaluate("com.TradingView.beta", "", ""), Some(Verdict::AlertApp));
    }

    #[test]
    fn test_email_app_needs_keyword() {
        let c = classifier();
        assert_eq!(
            c.evaluate("com.google.android.gm", "Weekly newsletter", "Hello there"),
            None
        );
        assert_eq!(
            c.evaluate("com.google.android.gm", "TradingView", "BTCUSDT crossing 50000"),
            Some(Verdict::EmailKeyword)
        );
        assert_eq!(
            c.evaluate("com.tencent.androidqqmail", "价格警报", ""),
            Some(Verdict::EmailKeyword)
        );
        assert!(c.is_trading_alert("com.microsoft.office.outlook", "", "ETH ALERT"));
    }

    #[test]
    fn test_other_apps_ignored() {
        let c = classifier();
        assert!(!c.is_trading_alert("com.whatsapp", "BTC alert", "to the moon"));
        // Email app match is exact, not substring
        assert!(!c.is_trading_alert("com.google.android.gm.lite", "BTC alert", ""));
    }

    #[test]
    fn test_keywords_are_literal() {
        let config = ClassifierConfig {
            alert_packages: vec![],
            email_apps: vec!["mail".to_string()],
            keywords: vec!["a.b".to_string()],
        };
        let c = AlertClassifier::new(&config).unwrap();
        assert!(c.is_trading_alert("mail", "A.B", ""));
        assert!(!c.is_trading_alert("mail", "axb", ""));
    }

    #[test]
    fn test_no_keywords_never_matches_email() {
        let config = ClassifierConfig {
            keywords: vec![],
            ..ClassifierConfig::default()
        };
        let c = AlertClassifier::new(&config).unwrap();
        assert!(!c.is_trading_alert("com.google.android.gm", "BTC alert", ""));
        assert!(c.is_trading_alert("com.tradingview", "", ""));
    }
}
