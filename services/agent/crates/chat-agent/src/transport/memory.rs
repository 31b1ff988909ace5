//! In-process transport used by dispatcher and engine tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{InboundEvent, Inbox, OutboundMessage, Outbox, TransportError};

/// Inbox fed from an mpsc channel; yields one event per batch.
pub struct MemoryInbox {
    rx: mpsc::UnboundedReceiver<Result<InboundEvent, TransportError>>,
}

/// Feeds a [`MemoryInbox`]. Dropping it makes the inbox report `Closed`.
#[derive(Clone)]
pub struct MemoryFeed {
    tx: mpsc::UnboundedSender<Result<InboundEvent, TransportError>>,
}

#[must_use]
pub fn channel() -> (MemoryFeed, MemoryInbox) {
    let (tx, rx) = mpsc::unbounded_channel();
    (MemoryFeed { tx }, MemoryInbox { rx })
}

impl MemoryFeed {
    pub fn push(&self, event: InboundEvent) {
        let _ = self.tx.send(Ok(event));
    }

    pub fn fail(&self, error: TransportError) {
        let _ = self.tx.send(Err(error));
    }
}

#[async_trait]
impl Inbox for MemoryInbox {
    async fn next_batch(&mut self) -> Result<Vec<InboundEvent>, TransportError> {
        match self.rx.recv().await {
            Some(Ok(event)) => Ok(vec![event]),
            Some(Err(error)) => Err(error),
            None => Err(TransportError::Closed),
        }
    }
}

/// Outbox that records every delivered message.
///
/// `fail_next(n)` makes the next `n` sends fail without recording them.
#[derive(Default)]
pub struct RecordingOutbox {
    sent: Mutex<Vec<OutboundMessage>>,
    failures: AtomicUsize,
}

impl RecordingOutbox {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_next(&self, n: usize) {
        self.failures.store(n, Ordering::SeqCst);
    }

    #[must_use]
    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    #[must_use]
    pub fn sent_to(&self, chat_id: i64) -> Vec<OutboundMessage> {
        self.sent()
            .into_iter()
            .filter(|m| m.chat_id == chat_id)
            .collect()
    }
}

#[async_trait]
impl Outbox for RecordingOutbox {
    async fn send(&self, message: &OutboundMessage) -> Result<(), TransportError> {
        let pending = self.failures.load(Ordering::SeqCst);
        if pending > 0 {
            self.failures.store(pending - 1, Ordering::SeqCst);
            return Err(TransportError::Network("injected failure".into()));
        }
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.clone());
        Ok(())
    }
}
