// In-memory sink used by engine and coordinator tests.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use super::{Presentation, PresentationHandle, PresentationSink};
use crate::core::alerts::model::AlertIdentity;
use crate::core::error::SinkError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkCall {
    Present {
        handle: PresentationHandle,
        identity: AlertIdentity,
        step: u32,
        total: u32,
        title: String,
        message: String,
    },
    Silence(PresentationHandle),
    Dismiss(PresentationHandle),
}

#[derive(Default)]
struct Inner {
    calls: Vec<SinkCall>,
    next_handle: u64,
    fail_present: bool,
    audible: Option<PresentationHandle>,
    shown: HashSet<PresentationHandle>,
}

/// Cloneable so a test can keep a view while the engine owns the sink.
#[derive(Clone, Default)]
pub struct RecordingSink {
    inner: Arc<Mutex<Inner>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.inner.lock().unwrap().fail_present = failing;
    }

    pub fn calls(&self) -> Vec<SinkCall> {
        self.inner.lock().unwrap().calls.clone()
    }

    /// (step, total) of every present call, in order
    pub fn presents(&self) -> Vec<(u32, u32)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                SinkCall::Present { step, total, .. } => Some((step, total)),
                _ => None,
            })
            .collect()
    }

    pub fn presents_for(&self, identity: &AlertIdentity) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, SinkCall::Present { identity: id, .. } if id == identity))
            .count()
    }

    pub fn last_handle(&self) -> Option<PresentationHandle> {
        self.calls().into_iter().rev().find_map(|call| match call {
            SinkCall::Present { handle, .. } => Some(handle),
            _ => None,
        })
    }

    pub fn silences(&self, handle: PresentationHandle) -> usize {
        self.calls()
            .iter()
            .filter(|call| **call == SinkCall::Silence(handle))
            .count()
    }

    pub fn dismisses(&self, handle: PresentationHandle) -> usize {
        self.calls()
            .iter()
            .filter(|call| **call == SinkCall::Dismiss(handle))
            .count()
    }

    pub fn audible(&self) -> Option<PresentationHandle> {
        self.inner.lock().unwrap().audible
    }

    pub fn is_shown(&self, handle: PresentationHandle) -> bool {
        self.inner.lock().unwrap().shown.contains(&handle)
    }
}

impl PresentationSink for RecordingSink {
    fn present(&mut self, presentation: &Presentation<'_>) -> Result<PresentationHandle, SinkError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_present {
            return Err(SinkError::NothingRendered);
        }
        inner.next_handle += 1;
        let handle = PresentationHandle::new(inner.next_handle);
        inner.calls.push(SinkCall::Present {
            handle,
            identity: presentation.identity.clone(),
            step: presentation.step,
            total: presentation.total,
            title: presentation.title.to_string(),
            message: presentation.message.to_string(),
        });
        inner.audible = Some(handle);
        inner.shown.insert(handle);
        Ok(handle)
    }

    fn silence(&mut self, handle: PresentationHandle) {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(SinkCall::Silence(handle));
        if inner.audible == Some(handle) {
            inner.audible = None;
        }
    }

    fn dismiss(&mut self, handle: PresentationHandle) {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(SinkCall::Dismiss(handle));
        inner.shown.remove(&handle);
    }
}
