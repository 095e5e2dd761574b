//! Alert coordinator: the single task that owns the cooldown filter and the
//! escalation engine.
//!
//! Source events, user stop requests and the engine's own timers all go
//! through one loop, so session state is only ever touched from one place.

use std::future;
use std::time::Instant;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::alerts::cooldown::CooldownFilter;
use super::alerts::engine::{EscalationEngine, SessionStatus, TriggerOutcome};
use super::alerts::model::{AlertEvent, AlertIdentity};
use super::error::EngineError;
use super::sink::PresentationSink;

const COMMAND_BUFFER: usize = 64;

pub const TEST_ALERT_TITLE: &str = "Test Alert";
pub const TEST_ALERT_MESSAGE: &str = "This is a test notification";

enum Command {
    /// Classified event from a source; goes through the cooldown filter
    Ingest(AlertEvent),
    /// Direct trigger, bypassing the filter
    Trigger { title: String, message: String },
    Cancel(AlertIdentity),
    CancelAll,
    Status(oneshot::Sender<Vec<SessionStatus>>),
    Shutdown(oneshot::Sender<()>),
}

/// Cloneable handle used by sources and the app shell.
#[derive(Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::Sender<Command>,
}

impl CoordinatorHandle {
    pub async fn ingest(&self, event: AlertEvent) -> Result<(), EngineError> {
        self.send(Command::Ingest(event)).await
    }

    pub async fn trigger(
        &self,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Result<(), EngineError> {
        self.send(Command::Trigger {
            title: title.into(),
            message: message.into(),
        })
        .await
    }

    pub async fn test_alert(&self) -> Result<(), EngineError> {
        self.trigger(TEST_ALERT_TITLE, TEST_ALERT_MESSAGE).await
    }

    pub async fn cancel(&self, identity: AlertIdentity) -> Result<(), EngineError> {
        self.send(Command::Cancel(identity)).await
    }

    pub async fn cancel_all(&self) -> Result<(), EngineError> {
        self.send(Command::CancelAll).await
    }

    pub async fn active_alerts(&self) -> Result<Vec<SessionStatus>, EngineError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Status(reply)).await?;
        rx.await.map_err(|_| EngineError::CoordinatorStopped)
    }

    /// Silence everything and stop the coordinator. Waits until it is done.
    pub async fn shutdown(&self) -> Result<(), EngineError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Shutdown(reply)).await?;
        rx.await.map_err(|_| EngineError::CoordinatorStopped)
    }

    async fn send(&self, command: Command) -> Result<(), EngineError> {
        self.tx
            .send(command)
            .await
            .map_err(|_| EngineError::CoordinatorStopped)
    }
}

pub struct Coordinator<S> {
    engine: EscalationEngine<S>,
    filter: CooldownFilter,
    rx: mpsc::Receiver<Command>,
}

/// Spawn the coordinator task on the current tokio runtime.
pub fn spawn<S>(engine: EscalationEngine<S>, filter: CooldownFilter) -> (CoordinatorHandle, JoinHandle<()>)
where
    S: PresentationSink + 'static,
{
    let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
    let coordinator = Coordinator { engine, filter, rx };
    let task = tokio::spawn(coordinator.run());
    (CoordinatorHandle { tx }, task)
}

/// Current time on tokio's clock, so paused-time tests drive the engine too.
fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => future::pending().await,
    }
}

impl<S: PresentationSink> Coordinator<S> {
    pub async fn run(mut self) {
        log::info!("Alert coordinator started");
        loop {
            let deadline = self.engine.next_deadline();
            tokio::select! {
                command = self.rx.recv() => match command {
                    Some(command) => {
                        if !self.handle(command) {
                            break;
                        }
                    }
                    None => {
                        // Every handle is gone; nobody could cancel anymore.
                        self.engine.shutdown();
                        break;
                    }
                },
                _ = sleep_until(deadline) => {
                    self.engine.advance_to(now());
                }
            }
        }
        log::info!("Alert coordinator stopped");
    }

    /// Returns false once the coordinator should stop.
    fn handle(&mut self, command: Command) -> bool {
        let now = now();
        match command {
            Command::Ingest(event) => {
                self.filter.purge_expired(now);
                let key = event.dedup_key();
                if !self.filter.observe(&key, now) {
                    log::debug!("Notification already processed, skipping: {}", key);
                    return true;
                }
                log::info!("Trading alert detected from {}", event.source.tag());
                self.trigger(&event.title, &event.message, now);
            }
            Command::Trigger { title, message } => self.trigger(&title, &message, now),
            Command::Cancel(identity) => {
                log::info!("Stop alarm requested for: {}", identity);
                self.engine.cancel(&identity);
            }
            Command::CancelAll => {
                let stopped = self.engine.cancel_all();
                log::info!("Stopped {} active alerts", stopped);
            }
            Command::Status(reply) => {
                let _ = reply.send(self.engine.snapshot());
            }
            Command::Shutdown(reply) => {
                self.engine.shutdown();
                let _ = reply.send(());
                return false;
            }
        }
        true
    }

    fn trigger(&mut self, title: &str, message: &str, now: Instant) {
        match self.engine.trigger(title, message, now) {
            Ok(TriggerOutcome::Started(identity)) => log::debug!("Alert started: {}", identity),
            Ok(TriggerOutcome::AlreadyActive(_)) => {}
            Err(e) => log::error!("Alert could not be started: {}", e),
        }
    }
}
