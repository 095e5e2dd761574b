// Timer queue for delayed engine work (self-silence, next escalation).
//
// Cancellation is explicit: a cancelled timer stays in the heap but is
// skipped when it reaches the front.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::time::Instant;

use crate::core::error::EngineError;

/// Cancellation token for a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

pub struct TimerQueue<T> {
    /// (deadline, id) ordered earliest first; ties fire in scheduling order
    heap: BinaryHeap<Reverse<(Instant, u64)>>,
    pending: HashMap<u64, T>,
    next_id: u64,
    closed: bool,
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            pending: HashMap::new(),
            next_id: 0,
            closed: false,
        }
    }

    pub fn schedule(&mut self, deadline: Instant, payload: T) -> Result<TimerId, EngineError> {
        if self.closed {
            return Err(EngineError::SchedulerClosed);
        }
        let id = self.next_id;
        self.next_id += 1;
        self.heap.push(Reverse((deadline, id)));
        self.pending.insert(id, payload);
        Ok(TimerId(id))
    }

    /// Returns true if the timer was still pending.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        self.pending.remove(&id.0).is_some()
    }

    /// Earliest deadline among live timers.
    pub fn next_deadline(&mut self) -> Option<Instant> {
        self.discard_cancelled_head();
        self.heap.peek().map(|Reverse((deadline, _))| *deadline)
    }

    /// Pop the earliest live timer whose deadline is at or before `now`.
    pub fn pop_due(&mut self, now: Instant) -> Option<(Instant, T)> {
        self.discard_cancelled_head();
        let Reverse((deadline, id)) = *self.heap.peek()?;
        if deadline > now {
            return None;
        }
        self.heap.pop();
        self.pending.remove(&id).map(|payload| (deadline, payload))
    }

    /// Refuse further scheduling and hand back every live payload.
    pub fn close(&mut self) -> Vec<T> {
        self.closed = true;
        let mut live = Vec::with_capacity(self.pending.len());
        while let Some(Reverse((_, id))) = self.heap.pop() {
            if let Some(payload) = self.pending.remove(&id) {
                live.push(payload);
            }
        }
        live
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn discard_cancelled_head(&mut self) {
        while let Some(Reverse((_, id))) = self.heap.peek() {
            if self.pending.contains_key(id) {
                break;
            }
            self.heap.pop();
        }
    }
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_fires_in_deadline_order() {
        let mut queue = TimerQueue::new();
        let t0 = Instant::now();
        queue.schedule(t0 + Duration::from_secs(600), "escalate").unwrap();
        queue.schedule(t0 + Duration::from_secs(180), "silence").unwrap();

        assert_eq!(queue.next_deadline(), Some(t0 + Duration::from_secs(180)));
        assert!(queue.pop_due(t0 + Duration::from_secs(179)).is_none());

        let (deadline, payload) = queue.pop_due(t0 + Duration::from_secs(700)).unwrap();
        assert_eq!(payload, "silence");
        assert_eq!(deadline, t0 + Duration::from_secs(180));
        assert_eq!(queue.pop_due(t0 + Duration::from_secs(700)).unwrap().1, "escalate");
        assert!(queue.is_empty());
    }

    #[test]
    fn test_cancelled_timer_never_fires() {
        let mut queue = TimerQueue::new();
        let t0 = Instant::now();
        let first = queue.schedule(t0 + Duration::from_secs(1), 1).unwrap();
        queue.schedule(t0 + Duration::from_secs(2), 2).unwrap();

        assert!(queue.cancel(first));
        assert!(!queue.cancel(first), "second cancel is a no-op");
        assert_eq!(queue.next_deadline(), Some(t0 + Duration::from_secs(2)));
        assert_eq!(queue.pop_due(t0 + Duration::from_secs(5)).map(|(_, p)| p), Some(2));
        assert!(queue.pop_due(t0 + Duration::from_secs(5)).is_none());
    }

    #[test]
    fn test_ties_keep_scheduling_order() {
        let mut queue = TimerQueue::new();
        let t0 = Instant::now();
        queue.schedule(t0, "a").unwrap();
        queue.schedule(t0, "b").unwrap();
        assert_eq!(queue.pop_due(t0).unwrap().1, "a");
        assert_eq!(queue.pop_due(t0).unwrap().1, "b");
    }

    #[test]
    fn test_closed_queue_rejects_and_drains() {
        let mut queue = TimerQueue::new();
        let t0 = Instant::now();
        let cancelled = queue.schedule(t0, 1).unwrap();
        queue.schedule(t0, 2).unwrap();
        queue.cancel(cancelled);

        assert_eq!(queue.close(), vec![2]);
        assert!(queue.is_closed());
        assert_eq!(queue.schedule(t0, 3), Err(EngineError::SchedulerClosed));
        assert!(queue.next_deadline().is_none());
    }
}
