//! Persistent alert notifications.
//!
//! Each alert identity keeps one notification id for its whole life, so a
//! later escalation step replaces the text instead of stacking a new entry.

use std::collections::HashMap;

use chrono::{DateTime, Local};
use serde::Serialize;

use super::Presentation;
use crate::core::alerts::model::AlertIdentity;
use crate::core::error::SinkError;

pub const NOTIFICATION_TITLE: &str = "TradingView Alert!";
pub const STOP_LABEL: &str = "Stop";

/// First id handed out; ids only grow.
const FIRST_NOTIFICATION_ID: u32 = 1001;

#[derive(Debug, Clone, Serialize)]
pub struct AlertNotification {
    pub id: u32,
    pub title: String,
    pub text: String,
    pub step: u32,
    pub total: u32,
    /// Ongoing notifications cannot be swiped away
    pub ongoing: bool,
    /// Identity carried by the stop action
    pub stop_action: AlertIdentity,
    pub posted_at: DateTime<Local>,
}

impl AlertNotification {
    fn from_presentation(id: u32, presentation: &Presentation<'_>) -> Self {
        Self {
            id,
            title: NOTIFICATION_TITLE.to_string(),
            text: format!(
                "Alert {}/{}: {} - {}",
                presentation.step, presentation.total, presentation.title, presentation.message
            ),
            step: presentation.step,
            total: presentation.total,
            ongoing: true,
            stop_action: presentation.identity.clone(),
            posted_at: Local::now(),
        }
    }
}

/// Where notifications are actually shown.
pub trait NotificationRenderer: Send {
    fn render(&mut self, notification: &AlertNotification) -> Result<(), SinkError>;
    fn withdraw(&mut self, id: u32);
}

/// Prints notifications to the terminal, including the stop command.
pub struct ConsoleRenderer;

impl NotificationRenderer for ConsoleRenderer {
    fn render(&mut self, notification: &AlertNotification) -> Result<(), SinkError> {
        let stop = serde_json::json!({ "type": "stop", "identity": notification.stop_action });
        println!(
            "[{}] 🔔 {} {}\n    [{}] {}",
            notification.posted_at.format("%H:%M:%S"),
            notification.title,
            notification.text,
            STOP_LABEL,
            stop
        );
        Ok(())
    }

    fn withdraw(&mut self, id: u32) {
        println!("Notification {} cleared", id);
    }
}

pub struct NotificationBoard {
    renderer: Box<dyn NotificationRenderer>,
    next_id: u32,
    ids: HashMap<AlertIdentity, u32>,
    shown: HashMap<u32, AlertNotification>,
}

impl NotificationBoard {
    pub fn new(renderer: Box<dyn NotificationRenderer>) -> Self {
        Self {
            renderer,
            next_id: FIRST_NOTIFICATION_ID,
            ids: HashMap::new(),
            shown: HashMap::new(),
        }
    }

    /// Post or replace the notification for this identity. Returns its id.
    pub fn post(&mut self, presentation: &Presentation<'_>) -> Result<u32, SinkError> {
        let id = match self.ids.get(presentation.identity) {
            Some(id) => *id,
            None => {
                let id = self.next_id;
                self.next_id += 1;
                id
            }
        };

        let notification = AlertNotification::from_presentation(id, presentation);
        self.renderer.render(&notification)?;
        self.ids.insert(presentation.identity.clone(), id);
        self.shown.insert(id, notification);
        Ok(id)
    }

    /// Remove a notification. Returns false if it was already gone.
    pub fn withdraw(&mut self, id: u32) -> bool {
        match self.shown.remove(&id) {
            Some(notification) => {
                self.ids.remove(&notification.stop_action);
                self.renderer.withdraw(id);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: u32) -> Option<&AlertNotification> {
        self.shown.get(&id)
    }

    pub fn len(&self) -> usize {
        self.shown.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shown.is_empty()
    }
}
