//! Chat transport boundary.
//!
//! The conversation engine only sees [`InboundEvent`]s and produces
//! [`OutboundMessage`]s. Adapters implement [`Inbox`] (receiving side,
//! owned by the dispatcher) and [`Outbox`] (sending side, shared by every
//! session worker).

pub mod telegram;

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

pub type ChatId = i64;
pub type UserId = i64;

/// Kind of conversation an event arrived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    Private,
    Group,
}

/// The transport identity that sent an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub first_name: String,
    pub username: Option<String>,
}

/// Structured contact card shared through the transport's contact button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub phone_number: String,
    /// Transport identity the contact belongs to, when the transport knows it.
    pub user_id: Option<UserId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Contact(Contact),
    /// Anything the engine has no handler for (stickers, photos, ...).
    Other,
}

impl Payload {
    /// Returns the bot command name for `/name` or `/name@bot args` texts.
    #[must_use]
    pub fn command(&self) -> Option<&str> {
        let Payload::Text(text) = self else {
            return None;
        };
        let rest = text.trim().strip_prefix('/')?;
        let word = rest.split_whitespace().next()?;
        let name = word.split('@').next().unwrap_or(word);
        (!name.is_empty()).then_some(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub chat_id: ChatId,
    pub chat_kind: ChatKind,
    pub from: User,
    pub payload: Payload,
}

/// Reply keyboard attached to an outbound message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Keyboard {
    /// Leave whatever keyboard the client currently shows.
    #[default]
    Keep,
    /// Fixed choices, one inner `Vec` per row.
    Choices(Vec<Vec<String>>),
    /// Single button asking the client to share the user's own contact.
    RequestContact(String),
    /// Hide the reply keyboard.
    Remove,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub chat_id: ChatId,
    pub text: String,
    pub keyboard: Keyboard,
}

impl OutboundMessage {
    #[must_use]
    pub fn text(chat_id: ChatId, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            keyboard: Keyboard::Keep,
        }
    }

    #[must_use]
    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = keyboard;
        self
    }
}

/// Failures at the transport boundary.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport rejected the credential")]
    Unauthorized,

    #[error("network error: {0}")]
    Network(String),

    #[error("transport API error {code}: {description}")]
    Api { code: u16, description: String },

    #[error("malformed transport response: {0}")]
    Decode(String),

    #[error("transport channel closed")]
    Closed,
}

impl TransportError {
    /// Whether restarting the connection loop can help.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(self, TransportError::Unauthorized)
    }
}

/// Receiving half of a transport.
#[async_trait]
pub trait Inbox: Send {
    /// Waits for the next batch of inbound events.
    ///
    /// An empty batch is a normal outcome of a long-poll timeout.
    async fn next_batch(&mut self) -> Result<Vec<InboundEvent>, TransportError>;

    /// Confirms the last batch with the server so it is not redelivered
    /// after a restart.
    async fn acknowledge(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Sending half of a transport, shared across session workers.
#[async_trait]
pub trait Outbox: Send + Sync {
    async fn send(&self, message: &OutboundMessage) -> Result<(), TransportError>;
}
