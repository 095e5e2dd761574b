//! Presentation sink: the boundary that turns an escalation step into sound,
//! vibration and a persistent notification.
//!
//! - alarm.rs: `AlarmSink`, the composite sink used by the app
//! - sound.rs: looping alarm tone on a dedicated audio thread
//! - vibration.rs: vibration waveform and actuator seam
//! - notification.rs: persistent notifications with a stop action
//! - wake.rs: wake resource held while a step is sounding

use std::fmt;

use super::alerts::model::AlertIdentity;
use super::error::SinkError;

pub mod alarm;
pub mod notification;
pub mod sound;
pub mod vibration;
pub mod wake;

#[cfg(test)]
pub(crate) mod recording;

/// Opaque reference to one rendered interruption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PresentationHandle(u64);

impl PresentationHandle {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for PresentationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One escalation step as handed to the sink.
#[derive(Debug, Clone, Copy)]
pub struct Presentation<'a> {
    /// Bound to the stop action so the user can cancel this alert
    pub identity: &'a AlertIdentity,
    /// 1-based step number
    pub step: u32,
    pub total: u32,
    pub title: &'a str,
    pub message: &'a str,
}

pub trait PresentationSink: Send {
    /// Start a loud, persistent interruption. Returns Ok when any part of it rendered.
    fn present(&mut self, presentation: &Presentation<'_>) -> Result<PresentationHandle, SinkError>;

    /// Stop sound and vibration for `handle`. Idempotent; leaves the notification.
    fn silence(&mut self, handle: PresentationHandle);

    /// Remove the notification for `handle`. Idempotent.
    fn dismiss(&mut self, handle: PresentationHandle);
}
