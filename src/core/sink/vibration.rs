// Vibration waveform and the actuator seam.

use std::time::Duration;

use crate::core::error::SinkError;

const PULSE_ON: Duration = Duration::from_millis(1000);
const PULSE_OFF: Duration = Duration::from_millis(500);

/// Alternating off/on timings, starting with the initial delay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VibrationPattern {
    timings: Vec<Duration>,
}

impl VibrationPattern {
    /// Pulses of `on` followed by `off`, enough to fill `total`, played once.
    pub fn sustained(total: Duration, on: Duration, off: Duration) -> Self {
        let cycle = on + off;
        let cycles = if cycle.is_zero() {
            0
        } else {
            (total.as_millis() / cycle.as_millis()) as usize
        };

        let mut timings = Vec::with_capacity(1 + cycles * 2);
        timings.push(Duration::ZERO);
        for _ in 0..cycles {
            timings.push(on);
            timings.push(off);
        }
        Self { timings }
    }

    /// The alarm waveform: 1s on, 0.5s off for the whole alert duration.
    pub fn alarm(alert_duration: Duration) -> Self {
        Self::sustained(alert_duration, PULSE_ON, PULSE_OFF)
    }

    pub fn timings(&self) -> &[Duration] {
        &self.timings
    }

    pub fn total(&self) -> Duration {
        self.timings.iter().sum()
    }
}

pub trait Vibrator: Send {
    fn vibrate(&mut self, pattern: &VibrationPattern) -> Result<(), SinkError>;
    fn cancel(&mut self);
}

/// Stand-in for hosts without a vibration motor.
pub struct NoVibrator;

impl Vibrator for NoVibrator {
    fn vibrate(&mut self, _pattern: &VibrationPattern) -> Result<(), SinkError> {
        Err(SinkError::Unavailable("vibrator"))
    }

    fn cancel(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alarm_pattern_covers_alert_duration() {
        let pattern = VibrationPattern::alarm(Duration::from_secs(180));
        assert_eq!(pattern.timings().len(), 241);
        assert_eq!(pattern.timings()[0], Duration::ZERO);
        assert_eq!(pattern.timings()[1], Duration::from_millis(1000));
        assert_eq!(pattern.timings()[2], Duration::from_millis(500));
        assert_eq!(pattern.total(), Duration::from_secs(180));
    }

    #[test]
    fn test_short_duration_has_only_delay() {
        let pattern = VibrationPattern::alarm(Duration::from_millis(1200));
        assert_eq!(pattern.timings(), &[Duration::ZERO]);
    }

    #[test]
    fn test_no_vibrator_reports_unavailable() {
        let mut vibrator = NoVibrator;
        let result = vibrator.vibrate(&VibrationPattern::alarm(Duration::from_secs(3)));
        assert!(matches!(result, Err(SinkError::Unavailable("vibrator"))));
    }
}
