use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::info;

use crate::MessagingError;

/// Outbound notification seam. The dispatcher and resolvers only ever talk
/// to this trait; the concrete transport (Twilio, mock) is injected.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Send one message and return the provider-assigned identifier.
    async fn send(&self, to: &str, body: &str) -> Result<String, MessagingError>;
}

#[derive(Debug, Clone)]
pub struct SentMessage {
    pub to: String,
    pub body: String,
    pub sid: String,
}

/// In-process channel that records every send. Used in tests and when
/// running without Twilio credentials.
#[derive(Default)]
pub struct MockSmsChannel {
    sent: Mutex<Vec<SentMessage>>,
    failing: Mutex<HashSet<String>>,
    counter: AtomicU64,
}

impl MockSmsChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every send to `phone` fail with a delivery error.
    pub fn fail_number(&self, phone: &str) {
        self.failing
            .lock()
            .expect("mock channel lock poisoned")
            .insert(phone.to_string());
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().expect("mock channel lock poisoned").clone()
    }

    pub fn sent_to(&self, phone: &str) -> Vec<SentMessage> {
        self.sent()
            .into_iter()
            .filter(|m| m.to == phone)
            .collect()
    }
}

#[async_trait]
impl NotificationChannel for MockSmsChannel {
    async fn send(&self, to: &str, body: &str) -> Result<String, MessagingError> {
        let failing = self
            .failing
            .lock()
            .expect("mock channel lock poisoned")
            .contains(to);
        if failing {
            return Err(MessagingError::Delivery(format!(
                "mock channel configured to fail for {}",
                to
            )));
        }

        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let sid = format!("SM{:010}mock", n);
        info!("[mock] SMS to {}: {}", to, body);
        self.sent
            .lock()
            .expect("mock channel lock poisoned")
            .push(SentMessage {
                to: to.to_string(),
                body: body.to_string(),
                sid: sid.clone(),
            });
        Ok(sid)
    }
}
