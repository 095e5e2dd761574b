// Composite sink: sound, vibration and notification, each attempted on its own.

use std::collections::HashMap;
use std::time::Duration;

use super::notification::NotificationBoard;
use super::sound::AlarmSound;
use super::vibration::{VibrationPattern, Vibrator};
use super::wake::{WakeGuard, WAKE_GRACE};
use super::{Presentation, PresentationHandle, PresentationSink};
use crate::core::error::SinkError;

/// What one handle rendered.
struct LiveInterruption {
    notification_id: Option<u32>,
    audible: bool,
}

pub struct AlarmSink {
    sound: Option<AlarmSound>,
    vibrator: Box<dyn Vibrator>,
    wake: Box<dyn WakeGuard>,
    board: NotificationBoard,
    pattern: VibrationPattern,
    wake_timeout: Duration,
    next_handle: u64,
    live: HashMap<PresentationHandle, LiveInterruption>,
    /// Handle currently driving the vibration motor
    vibrating: Option<PresentationHandle>,
    /// Handle currently holding the wake resource
    awake: Option<PresentationHandle>,
}

impl AlarmSink {
    /// `sound` is None when no audio output could be opened.
    pub fn new(
        sound: Option<AlarmSound>,
        vibrator: Box<dyn Vibrator>,
        wake: Box<dyn WakeGuard>,
        board: NotificationBoard,
        alert_duration: Duration,
    ) -> Self {
        Self {
            sound,
            vibrator,
            wake,
            board,
            pattern: VibrationPattern::alarm(alert_duration),
            wake_timeout: alert_duration + WAKE_GRACE,
            next_handle: 0,
            live: HashMap::new(),
            vibrating: None,
            awake: None,
        }
    }

    pub fn board(&self) -> &NotificationBoard {
        &self.board
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    fn start_sound(&self, handle: PresentationHandle) -> Result<(), SinkError> {
        match &self.sound {
            Some(sound) => sound.play(handle),
            None => Err(SinkError::Unavailable("audio output")),
        }
    }

    fn start_vibration(&mut self, handle: PresentationHandle) -> Result<(), SinkError> {
        self.vibrator.vibrate(&self.pattern)?;
        self.vibrating = Some(handle);
        Ok(())
    }

    fn hold_wake(&mut self, handle: PresentationHandle) -> Result<(), SinkError> {
        self.wake.acquire(self.wake_timeout)?;
        self.awake = Some(handle);
        Ok(())
    }

    fn release_wake(&mut self, handle: PresentationHandle) {
        if self.awake == Some(handle) {
            self.wake.release();
            self.awake = None;
        }
    }
}

impl PresentationSink for AlarmSink {
    fn present(&mut self, presentation: &Presentation<'_>) -> Result<PresentationHandle, SinkError> {
        self.next_handle += 1;
        let handle = PresentationHandle::new(self.next_handle);
        let mut audible = false;

        if let Err(e) = self.hold_wake(handle) {
            log::warn!("Could not hold wake resource for {}: {}", presentation.identity, e);
        }

        match self.start_sound(handle) {
            Ok(()) => audible = true,
            Err(e) => log::warn!("Alarm sound unavailable for {}: {}", presentation.identity, e),
        }

        match self.start_vibration(handle) {
            Ok(()) => audible = true,
            Err(e) => log::debug!("Vibration unavailable for {}: {}", presentation.identity, e),
        }

        let notification_id = match self.board.post(presentation) {
            Ok(id) => Some(id),
            Err(e) => {
                log::warn!("Failed to show notification for {}: {}", presentation.identity, e);
                None
            }
        };

        if !audible && notification_id.is_none() {
            self.release_wake(handle);
            return Err(SinkError::NothingRendered);
        }

        // An earlier step of the same alert shared this notification; it is superseded.
        if let Some(id) = notification_id {
            self.live.retain(|_, live| live.notification_id != Some(id));
        }
        self.live.insert(
            handle,
            LiveInterruption {
                notification_id,
                audible,
            },
        );
        Ok(handle)
    }

    fn silence(&mut self, handle: PresentationHandle) {
        self.release_wake(handle);
        let Some(live) = self.live.get_mut(&handle) else {
            return;
        };
        if !live.audible {
            return;
        }
        live.audible = false;

        if let Some(sound) = &self.sound {
            sound.stop(handle);
        }
        if self.vibrating == Some(handle) {
            self.vibrator.cancel();
            self.vibrating = None;
        }
        log::debug!("Silenced {}", handle);
    }

    fn dismiss(&mut self, handle: PresentationHandle) {
        self.silence(handle);
        if let Some(live) = self.live.remove(&handle) {
            if let Some(id) = live.notification_id {
                self.board.withdraw(id);
            }
        }
    }
}

impl Drop for AlarmSink {
    fn drop(&mut self) {
        if let Some(sound) = &self.sound {
            sound.stop_all();
        }
        if self.vibrating.take().is_some() {
            self.vibrator.cancel();
        }
        if self.awake.take().is_some() {
            self.wake.release();
        }
    }
}
