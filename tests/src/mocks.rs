//! Mock implementations for testing.

use async_trait::async_trait;
use guard_core::{Error, MessageKey, Result};
use monitor::{NotificationPort, TerminationPort};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Notifier that captures every notice in memory.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    notices: Arc<Mutex<Vec<(MessageKey, String)>>>,
    /// Panic when this kind is notified.
    panic_on: Arc<Mutex<Option<MessageKey>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kinds in the order they were notified.
    pub fn kinds(&self) -> Vec<MessageKey> {
        self.notices.lock().iter().map(|(kind, _)| *kind).collect()
    }

    /// Number of notices of one kind.
    pub fn count(&self, kind: MessageKey) -> usize {
        self.notices.lock().iter().filter(|(k, _)| *k == kind).count()
    }

    /// Text of the last notice of one kind.
    pub fn last_text(&self, kind: MessageKey) -> Option<String> {
        self.notices
            .lock()
            .iter()
            .rev()
            .find(|(k, _)| *k == kind)
            .map(|(_, text)| text.clone())
    }

    pub fn clear(&self) {
        self.notices.lock().clear();
    }

    /// Make the notifier blow up on `kind` to exercise tick isolation.
    pub fn set_panic_on(&self, kind: Option<MessageKey>) {
        *self.panic_on.lock() = kind;
    }
}

impl NotificationPort for RecordingNotifier {
    fn notify(&self, kind: MessageKey, text: &str) {
        if *self.panic_on.lock() == Some(kind) {
            panic!("notifier failure on {kind}");
        }
        self.notices.lock().push((kind, text.to_string()));
    }
}

/// Terminator that records calls instead of logging anyone out.
#[derive(Clone, Default)]
pub struct MockTerminator {
    calls: Arc<Mutex<Vec<&'static str>>>,
    /// Simulate `secure_data` failures if set.
    should_fail: Arc<AtomicBool>,
    /// Panic inside `secure_data` if set.
    should_panic: Arc<AtomicBool>,
}

impl MockTerminator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls in order: "secure_data" and "force_reauth".
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().clone()
    }

    pub fn secure_count(&self) -> usize {
        self.calls.lock().iter().filter(|c| **c == "secure_data").count()
    }

    pub fn reauth_count(&self) -> usize {
        self.calls.lock().iter().filter(|c| **c == "force_reauth").count()
    }

    /// Set failure mode for testing error handling.
    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::SeqCst);
    }

    /// Make `secure_data` panic after recording the call.
    pub fn set_should_panic(&self, panic: bool) {
        self.should_panic.store(panic, Ordering::SeqCst);
    }
}

#[async_trait]
impl TerminationPort for MockTerminator {
    async fn secure_data(&self) -> Result<()> {
        self.calls.lock().push("secure_data");
        tokio::task::yield_now().await;

        if self.should_panic.load(Ordering::SeqCst) {
            panic!("mock flush panicked");
        }
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(Error::termination("Mock flush failure"));
        }
        Ok(())
    }

    fn force_reauth(&self) {
        self.calls.lock().push("force_reauth");
    }
}
