// Wake resource seam: keeps the device awake while an alarm step is sounding.

use std::time::Duration;

use crate::core::error::SinkError;

/// Held past the alert duration so the self-silence can still run.
pub const WAKE_GRACE: Duration = Duration::from_secs(5);

pub trait WakeGuard: Send {
    /// Acquire (or re-arm) the wake resource. It lapses on its own after `timeout`.
    fn acquire(&mut self, timeout: Duration) -> Result<(), SinkError>;
    /// Release it if held. Idempotent.
    fn release(&mut self);
}

/// Desktop hosts do not sleep under a running process; nothing to hold.
pub struct NoWakeGuard;

impl WakeGuard for NoWakeGuard {
    fn acquire(&mut self, _timeout: Duration) -> Result<(), SinkError> {
        Ok(())
    }

    fn release(&mut self) {}
}
