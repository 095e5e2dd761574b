// Alert engine - owns every escalating alarm session and its timers.
//
// The engine is a synchronous state machine driven by an explicit clock:
// callers pass `now` into every operation and call `advance_to` when the
// next deadline is reached. The coordinator serializes all calls.

use std::collections::HashMap;
use std::time::Instant;

use serde::Serialize;

use super::model::{AlertIdentity, EscalationPolicy};
use super::timers::{TimerId, TimerQueue};
use crate::core::error::EngineError;
use crate::core::sink::{Presentation, PresentationHandle, PresentationSink};

/// Delayed work owned by the engine.
#[derive(Debug, Clone)]
enum TimerAction {
    /// Start the next step of the session with this generation
    Escalate {
        identity: AlertIdentity,
        generation: u64,
    },
    /// Stop sound and vibration of one step, leaving its notification
    SelfSilence { handle: PresentationHandle },
}

struct AlertSession {
    title: String,
    message: String,
    escalation_count: u32,
    presentation: Option<PresentationHandle>,
    next_escalation: Option<TimerId>,
    pending_silence: Option<TimerId>,
    generation: u64,
}

/// Result of a trigger call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// A new session started and step 1 was performed
    Started(AlertIdentity),
    /// The identity is already escalating; nothing changed
    AlreadyActive(AlertIdentity),
}

/// Read-only view of one active session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub identity: AlertIdentity,
    pub title: String,
    pub message: String,
    pub escalation_count: u32,
    pub max_escalations: u32,
}

pub struct EscalationEngine<S> {
    sink: S,
    policy: EscalationPolicy,
    sessions: HashMap<AlertIdentity, AlertSession>,
    /// Last handle of sessions that used up their budget; its notification
    /// stays up until the user stops it
    finished: HashMap<AlertIdentity, (PresentationHandle, Option<TimerId>)>,
    timers: TimerQueue<TimerAction>,
    next_generation: u64,
}

impl<S: PresentationSink> EscalationEngine<S> {
    pub fn new(sink: S, policy: EscalationPolicy) -> Self {
        Self {
            sink,
            policy,
            sessions: HashMap::new(),
            finished: HashMap::new(),
            timers: TimerQueue::new(),
            next_generation: 0,
        }
    }

    /// Start escalating `title:message` unless it is already active.
    pub fn trigger(
        &mut self,
        title: &str,
        message: &str,
        now: Instant,
    ) -> Result<TriggerOutcome, EngineError> {
        let identity = AlertIdentity::from_content(title, message);

        if self.sessions.contains_key(&identity) {
            log::debug!("Alert already active, ignoring: {}", identity);
            return Ok(TriggerOutcome::AlreadyActive(identity));
        }
        if self.timers.is_closed() {
            log::warn!("Engine is shut down, ignoring alert: {}", identity);
            return Err(EngineError::SchedulerClosed);
        }

        // The new step 1 replaces the finished alert's notification.
        self.finished.remove(&identity);
        self.next_generation += 1;
        self.sessions.insert(
            identity.clone(),
            AlertSession {
                title: title.to_string(),
                message: message.to_string(),
                escalation_count: 0,
                presentation: None,
                next_escalation: None,
                pending_silence: None,
                generation: self.next_generation,
            },
        );

        if let Err(e) = self.escalate(&identity, now) {
            self.abandon(&identity, &e);
            return Err(e);
        }
        Ok(TriggerOutcome::Started(identity))
    }

    /// Stop an alert on user request. Unknown identities are a no-op.
    pub fn cancel(&mut self, identity: &AlertIdentity) -> bool {
        if let Some((handle, pending_silence)) = self.finished.remove(identity) {
            if let Some(id) = pending_silence {
                self.timers.cancel(id);
            }
            self.sink.silence(handle);
            self.sink.dismiss(handle);
            log::info!("Finished alert dismissed: {}", identity);
            return true;
        }
        match self.sessions.remove(identity) {
            Some(session) => {
                self.retire(session);
                log::info!("Alert stopped manually: {}", identity);
                true
            }
            None => {
                log::debug!("Stop requested for inactive alert: {}", identity);
                false
            }
        }
    }

    /// Cancel every active session but keep accepting new alerts.
    pub fn cancel_all(&mut self) -> usize {
        let identities: Vec<AlertIdentity> = self
            .sessions
            .keys()
            .chain(self.finished.keys())
            .cloned()
            .collect();
        identities.iter().filter(|id| self.cancel(id)).count()
    }

    /// Tear down: silence and dismiss everything and close the scheduler.
    pub fn shutdown(&mut self) {
        let sessions: Vec<AlertSession> = self.sessions.drain().map(|(_, s)| s).collect();
        let count = sessions.len();
        for session in sessions {
            self.retire(session);
        }
        for (_, (handle, _)) in self.finished.drain() {
            self.sink.silence(handle);
            self.sink.dismiss(handle);
        }
        // Completed sessions may still have a self-silence pending.
        for action in self.timers.close() {
            if let TimerAction::SelfSilence { handle } = action {
                self.sink.silence(handle);
            }
        }
        log::info!("Alert engine shut down ({} active alerts cleared)", count);
    }

    /// Fire every timer due at or before `now`. Returns how many fired.
    pub fn advance_to(&mut self, now: Instant) -> usize {
        let mut fired = 0;
        while let Some((deadline, action)) = self.timers.pop_due(now) {
            fired += 1;
            self.fire(action, deadline);
        }
        fired
    }

    pub fn next_deadline(&mut self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    pub fn is_active(&self, identity: &AlertIdentity) -> bool {
        self.sessions.contains_key(identity)
    }

    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn escalation_count(&self, identity: &AlertIdentity) -> Option<u32> {
        self.sessions.get(identity).map(|s| s.escalation_count)
    }

    pub fn has_pending_escalation(&self, identity: &AlertIdentity) -> bool {
        self.sessions
            .get(identity)
            .map(|s| s.next_escalation.is_some())
            .unwrap_or(false)
    }

    pub fn snapshot(&self) -> Vec<SessionStatus> {
        let mut statuses: Vec<SessionStatus> = self
            .sessions
            .iter()
            .map(|(identity, s)| SessionStatus {
                identity: identity.clone(),
                title: s.title.clone(),
                message: s.message.clone(),
                escalation_count: s.escalation_count,
                max_escalations: self.policy.max_escalations(),
            })
            .collect();
        statuses.sort_by(|a, b| a.identity.cmp(&b.identity));
        statuses
    }

    pub fn policy(&self) -> &EscalationPolicy {
        &self.policy
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    fn fire(&mut self, action: TimerAction, deadline: Instant) {
        match action {
            TimerAction::SelfSilence { handle } => {
                log::debug!("Alert duration elapsed, silencing {}", handle);
                self.sink.silence(handle);
            }
            TimerAction::Escalate {
                identity,
                generation,
            } => {
                let current = self.sessions.get_mut(&identity);
                match current {
                    Some(session) if session.generation == generation => {
                        session.next_escalation = None;
                    }
                    _ => {
                        log::debug!("Dropping stale escalation for {}", identity);
                        return;
                    }
                }
                // Steps are anchored to their deadline so a late wakeup does not drift.
                if let Err(e) = self.escalate(&identity, deadline) {
                    self.abandon(&identity, &e);
                }
            }
        }
    }

    /// One escalation step: present, arm self-silence, count, schedule or finish.
    fn escalate(&mut self, identity: &AlertIdentity, started: Instant) -> Result<(), EngineError> {
        let max = self.policy.max_escalations();
        let alert_duration = self.policy.alert_duration();
        let repeat_interval = self.policy.repeat_interval();

        let Some(session) = self.sessions.get_mut(identity) else {
            return Ok(());
        };
        let step = session.escalation_count + 1;
        log::info!("Performing alert {}/{}: {}", step, max, identity);

        let presentation = Presentation {
            identity,
            step,
            total: max,
            title: &session.title,
            message: &session.message,
        };
        match self.sink.present(&presentation) {
            Ok(handle) => {
                session.presentation = Some(handle);
                let silence = self
                    .timers
                    .schedule(started + alert_duration, TimerAction::SelfSilence { handle })?;
                session.pending_silence = Some(silence);
            }
            Err(e) => {
                // The alarm keeps its schedule even if this step rendered nothing.
                log::warn!("Failed to present alert {}/{} for {}: {}", step, max, identity, e);
            }
        }

        session.escalation_count = step;

        if session.escalation_count < max {
            let next = self.timers.schedule(
                started + repeat_interval,
                TimerAction::Escalate {
                    identity: identity.clone(),
                    generation: session.generation,
                },
            )?;
            session.next_escalation = Some(next);
            log::debug!("Scheduled next alert for {} in {:?}", identity, repeat_interval);
        } else {
            log::info!("Reached maximum repeats, stopping alert: {}", identity);
            if let Some(handle) = session.presentation {
                self.finished
                    .insert(identity.clone(), (handle, session.pending_silence));
            }
            self.sessions.remove(identity);
        }
        Ok(())
    }

    /// Drop a session whose timers could not be scheduled. Nothing could ever
    /// silence or cancel it, so it is torn down right away.
    fn abandon(&mut self, identity: &AlertIdentity, error: &EngineError) {
        log::error!("Dropping alert {}: {}", identity, error);
        if let Some(session) = self.sessions.remove(identity) {
            self.retire(session);
        }
    }

    fn retire(&mut self, session: AlertSession) {
        if let Some(id) = session.next_escalation {
            self.timers.cancel(id);
        }
        if let Some(id) = session.pending_silence {
            self.timers.cancel(id);
        }
        if let Some(handle) = session.presentation {
            self.sink.silence(handle);
            self.sink.dismiss(handle);
        }
    }
}
