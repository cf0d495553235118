use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::events::ChatMessage;

#[derive(Debug, Clone, Serialize)]
pub struct LoggedMessage {
    pub message: ChatMessage,
    pub received_at: DateTime<Utc>,
}

/// Append-only audit trail of routed chat messages. Nothing reads it back for routing.
#[derive(Debug, Default)]
pub struct MessageLog {
    entries: Mutex<Vec<LoggedMessage>>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, message: ChatMessage) {
        self.lock().push(LoggedMessage {
            message,
            received_at: Utc::now(),
        });
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    #[cfg(test)]
    fn snapshot(&self) -> Vec<LoggedMessage> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<LoggedMessage>> {
        // A panicked appender cannot leave a Vec half-written
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
