//! In-memory publishers for tests and development.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{LogBatchMessage, NotificationEvent};
use crate::{LogBatchPublisher, NotificationPublisher};

/// Records published log batches instead of sending them anywhere.
#[derive(Debug, Default, Clone)]
pub struct InMemoryLogBus {
    batches: Arc<Mutex<Vec<LogBatchMessage>>>,
}

impl InMemoryLogBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches(&self) -> Vec<LogBatchMessage> {
        self.batches.lock().expect("bus lock").clone()
    }
}

#[async_trait]
impl LogBatchPublisher for InMemoryLogBus {
    async fn publish(&self, batch: &LogBatchMessage) -> Result<()> {
        self.batches.lock().expect("bus lock").push(batch.clone());
        Ok(())
    }
}

/// Records published notification events.
#[derive(Debug, Default, Clone)]
pub struct InMemoryNotificationBus {
    events: Arc<Mutex<Vec<NotificationEvent>>>,
    fail_publishes: Arc<Mutex<bool>>,
}

impl InMemoryNotificationBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<NotificationEvent> {
        self.events.lock().expect("bus lock").clone()
    }

    /// Make subsequent publishes fail, to exercise bus-outage paths.
    pub fn set_failing(&self, failing: bool) {
        *self.fail_publishes.lock().expect("bus lock") = failing;
    }
}

#[async_trait]
impl NotificationPublisher for InMemoryNotificationBus {
    async fn publish(&self, event: &NotificationEvent) -> Result<()> {
        if *self.fail_publishes.lock().expect("bus lock") {
            return Err(crate::error::BusError::Config {
                message: "in-memory bus set to fail".to_string(),
            });
        }

        self.events.lock().expect("bus lock").push(event.clone());
        Ok(())
    }
}
