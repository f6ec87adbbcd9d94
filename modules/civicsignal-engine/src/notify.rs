//! Notification boundary.
//!
//! Status-change delivery (email, SMS) is owned by an external
//! collaborator. The engine fires and forgets: a failed delivery is logged
//! and swallowed, never failing the mutation that triggered it.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;

use civicsignal_common::StatusChanged;

#[async_trait]
pub trait StatusNotifier: Send + Sync + 'static {
    async fn status_changed(&self, event: StatusChanged) -> Result<()>;
}

// Lets tests share the recording notifier for assertions.
#[async_trait]
impl<N: StatusNotifier + ?Sized> StatusNotifier for Arc<N> {
    async fn status_changed(&self, event: StatusChanged) -> Result<()> {
        (**self).status_changed(event).await
    }
}

/// In-memory notifier for tests. Records every event; can be built failing
/// to exercise the swallow path.
pub struct RecordingNotifier {
    events: Mutex<Vec<StatusChanged>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    /// A notifier whose deliveries always fail.
    pub fn failing() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// Events delivered so far (for test assertions).
    pub fn events(&self) -> Vec<StatusChanged> {
        self.events.lock().unwrap().clone()
    }
}

impl Default for RecordingNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StatusNotifier for RecordingNotifier {
    async fn status_changed(&self, event: StatusChanged) -> Result<()> {
        if self.fail {
            anyhow::bail!("delivery refused");
        }
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}
