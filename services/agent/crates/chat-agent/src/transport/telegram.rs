//! Telegram Bot API adapter (long polling).
//!
//! The bot token is part of every request URL, so reqwest errors are
//! stripped of their URL before they are logged or returned.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{
    ChatKind, Contact, InboundEvent, Inbox, Keyboard, OutboundMessage, Outbox, Payload,
    TransportError, User,
};

/// Extra time granted on top of the long-poll timeout before the HTTP
/// request itself is abandoned.
const HTTP_SLACK: Duration = Duration::from_secs(10);

/// Minimal Bot API client shared by the inbox and outbox halves.
pub struct TelegramClient {
    http: reqwest::Client,
    base_url: String,
}

/// Identity returned by `getMe`.
#[derive(Debug, Clone, Deserialize)]
pub struct BotIdentity {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error_code: Option<u16>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Update {
    update_id: i64,
    #[serde(default)]
    message: Option<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    chat: Chat,
    #[serde(default)]
    from: Option<ApiUser>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    contact: Option<ApiContact>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct ApiUser {
    id: i64,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiContact {
    #[serde(default)]
    phone_number: String,
    #[serde(default)]
    user_id: Option<i64>,
}

#[derive(Debug, Serialize)]
struct GetUpdates {
    offset: i64,
    timeout: u64,
    allowed_updates: [&'static str; 1],
}

impl TelegramClient {
    /// Builds a client for `{api_base}/bot{token}/`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(api_base: &str, token: &str, poll_timeout: Duration) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(poll_timeout + HTTP_SLACK)
            .build()
            .map_err(|e| TransportError::Network(e.without_url().to_string()))?;
        Ok(Self {
            http,
            base_url: format!("{}/bot{token}", api_base.trim_end_matches('/')),
        })
    }

    /// Verifies the credential; the first call of every connection loop.
    pub async fn get_me(&self) -> Result<BotIdentity, TransportError> {
        self.call("getMe", &json!({})).await
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &impl Serialize,
    ) -> Result<T, TransportError> {
        let response = self
            .http
            .post(format!("{}/{method}", self.base_url))
            .json(body)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.without_url().to_string()))?;

        let status = response.status();
        let parsed: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| TransportError::Decode(e.without_url().to_string()))?;

        if status == reqwest::StatusCode::UNAUTHORIZED || parsed.error_code == Some(401) {
            return Err(TransportError::Unauthorized);
        }
        if !parsed.ok {
            return Err(TransportError::Api {
                code: parsed.error_code.unwrap_or(status.as_u16()),
                description: parsed.description.unwrap_or_default(),
            });
        }
        parsed
            .result
            .ok_or_else(|| TransportError::Decode(format!("{method}: missing result")))
    }
}

/// Long-polling receiver.
pub struct TelegramInbox {
    client: Arc<TelegramClient>,
    offset: i64,
    poll_timeout: Duration,
}

impl TelegramInbox {
    #[must_use]
    pub fn new(client: Arc<TelegramClient>, poll_timeout: Duration) -> Self {
        Self {
            client,
            offset: 0,
            poll_timeout,
        }
    }

    /// Non-blocking poll that moves the server-side offset past everything
    /// consumed so far. `None` when nothing was consumed yet.
    fn acknowledge_request(&self) -> Option<GetUpdates> {
        (self.offset > 0).then_some(GetUpdates {
            offset: self.offset,
            timeout: 0,
            allowed_updates: ["message"],
        })
    }
}

#[async_trait]
impl Inbox for TelegramInbox {
    async fn next_batch(&mut self) -> Result<Vec<InboundEvent>, TransportError> {
        let request = GetUpdates {
            offset: self.offset,
            timeout: self.poll_timeout.as_secs(),
            allowed_updates: ["message"],
        };
        let updates: Vec<Update> = self.client.call("getUpdates", &request).await?;
        if let Some(last) = updates.iter().map(|u| u.update_id).max() {
            self.offset = last + 1;
        }
        Ok(updates.into_iter().filter_map(into_event).collect())
    }

    async fn acknowledge(&mut self) -> Result<(), TransportError> {
        let Some(request) = self.acknowledge_request() else {
            return Ok(());
        };
        // Updates returned here arrived after shutdown; the next run gets them.
        let _: Vec<Value> = self.client.call("getUpdates", &request).await?;
        tracing::debug!(offset = self.offset, "acknowledged consumed updates");
        Ok(())
    }
}

/// Sender half; cheap to share behind an `Arc`.
pub struct TelegramOutbox {
    client: Arc<TelegramClient>,
}

impl TelegramOutbox {
    #[must_use]
    pub fn new(client: Arc<TelegramClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Outbox for TelegramOutbox {
    async fn send(&self, message: &OutboundMessage) -> Result<(), TransportError> {
        let _: Value = self.client.call("sendMessage", &send_message_body(message)).await?;
        Ok(())
    }
}

pub(crate) fn into_event(update: Update) -> Option<InboundEvent> {
    let message = update.message?;
    let from = message.from?;
    let chat_kind = if message.chat.kind == "private" {
        ChatKind::Private
    } else {
        ChatKind::Group
    };
    let payload = if let Some(contact) = message.contact {
        Payload::Contact(Contact {
            phone_number: contact.phone_number,
            user_id: contact.user_id,
        })
    } else if let Some(text) = message.text {
        Payload::Text(text)
    } else {
        Payload::Other
    };
    Some(InboundEvent {
        chat_id: message.chat.id,
        chat_kind,
        from: User {
            id: from.id,
            first_name: from.first_name,
            username: from.username,
        },
        payload,
    })
}

pub(crate) fn send_message_body(message: &OutboundMessage) -> Value {
    let mut body = json!({
        "chat_id": message.chat_id,
        "text": message.text,
    });
    let markup = match &message.keyboard {
        Keyboard::Keep => None,
        Keyboard::Choices(rows) => Some(json!({
            "keyboard": rows
                .iter()
                .map(|row| row.iter().map(|label| json!({ "text": label })).collect::<Vec<_>>())
                .collect::<Vec<_>>(),
            "one_time_keyboard": true,
            "resize_keyboard": true,
        })),
        Keyboard::RequestContact(label) => Some(json!({
            "keyboard": [[{ "text": label, "request_contact": true }]],
            "one_time_keyboard": true,
            "resize_keyboard": true,
        })),
        Keyboard::Remove => Some(json!({ "remove_keyboard": true })),
    };
    if let (Some(markup), Some(map)) = (markup, body.as_object_mut()) {
        map.insert("reply_markup".to_string(), markup);
    }
    body
}
