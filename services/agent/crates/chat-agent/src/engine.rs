//! Conversation engine.
//!
//! A pure transition function over `(Session, InboundEvent)`: the engine
//! never touches the transport. It returns the next session together with
//! the replies to deliver, and the dispatcher commits the new session only
//! once those replies went out.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use chrono::{Local, NaiveDate};
use thiserror::Error;

use crate::flow::{Flow, Step, StepKind, DEFAULT_DATE_FORMAT};
use crate::rate_limit::RateLimiter;
use crate::transport::{
    ChatId, ChatKind, Contact, InboundEvent, Keyboard, OutboundMessage, Payload, User, UserId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DialogueState {
    Idle,
    AwaitingChoice,
    AwaitingCurrency,
    AwaitingDate,
    AwaitingContact,
    Done,
    Cancelled,
}

impl DialogueState {
    /// `Done` and `Cancelled` accept no further input except `/start`.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, DialogueState::Done | DialogueState::Cancelled)
    }
}

impl fmt::Display for DialogueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DialogueState::Idle => "idle",
            DialogueState::AwaitingChoice => "awaiting_choice",
            DialogueState::AwaitingCurrency => "awaiting_currency",
            DialogueState::AwaitingDate => "awaiting_date",
            DialogueState::AwaitingContact => "awaiting_contact",
            DialogueState::Done => "done",
            DialogueState::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Per-chat dialogue state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub state: DialogueState,
    /// Index of the step being collected; meaningless outside `Awaiting*`.
    pub step: usize,
    pub fields: BTreeMap<String, String>,
}

impl Session {
    #[must_use]
    pub fn new(chat_id: ChatId, user_id: UserId) -> Self {
        Self {
            chat_id,
            user_id,
            state: DialogueState::Idle,
            step: 0,
            fields: BTreeMap::new(),
        }
    }

    fn awaiting(&self) -> bool {
        !matches!(self.state, DialogueState::Idle) && !self.state.is_terminal()
    }
}

/// Why an input was rejected. Turned into a reply, never propagated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("'{input}' is not one of the offered options")]
    NotAnOption { input: String },

    #[error("'{input}' is not a valid date in format {format}")]
    InvalidDate { input: String, format: String },

    #[error("expected a shared contact")]
    ContactMissing,

    #[error("shared contact has no phone number or owner")]
    ContactIncomplete,

    #[error("shared contact belongs to someone else")]
    IdentityMismatch,

    #[error("flow is only available in private chats")]
    GroupChat,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Started,
    Advanced,
    Completed,
    Cancelled,
    Rejected(EngineError),
    RateLimited,
    /// Input the current step has no use for; instructions repeated.
    Fallback,
    /// Nothing to do and nothing to say.
    Ignored,
}

/// Data gathered by a finished dialogue, destined for the audit log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedRecord {
    pub flow: String,
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub username: Option<String>,
    pub fields: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub session: Session,
    pub replies: Vec<OutboundMessage>,
    pub outcome: Outcome,
    pub record: Option<CompletedRecord>,
}

impl Transition {
    fn stay(session: &Session, replies: Vec<OutboundMessage>, outcome: Outcome) -> Self {
        Self {
            session: session.clone(),
            replies,
            outcome,
            record: None,
        }
    }
}

pub struct Engine {
    flow: Flow,
    limiter: Arc<RateLimiter>,
}

impl Engine {
    #[must_use]
    pub fn new(flow: Flow, limiter: Arc<RateLimiter>) -> Self {
        Self { flow, limiter }
    }

    #[must_use]
    pub fn flow(&self) -> &Flow {
        &self.flow
    }

    #[must_use]
    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Handles one event using today's local date for `{date}`.
    #[must_use]
    pub fn handle(&self, session: &Session, event: &InboundEvent, now: Instant) -> Transition {
        self.handle_at(session, event, now, Local::now().date_naive())
    }

    #[must_use]
    pub fn handle_at(
        &self,
        session: &Session,
        event: &InboundEvent,
        now: Instant,
        today: NaiveDate,
    ) -> Transition {
        let chat = event.chat_id;
        if event.from.id != session.user_id {
            // Sessions belong to one user; group members each get their own.
            return Transition::stay(session, Vec::new(), Outcome::Ignored);
        }
        if !self.limiter.admit(event.from.id, now) {
            return Transition::stay(
                session,
                vec![OutboundMessage::text(chat, &self.flow.texts.rate_limited)],
                Outcome::RateLimited,
            );
        }

        match event.payload.command() {
            Some("start") => return self.start(session, event, today),
            Some("cancel") if session.awaiting() => {
                let mut next = session.clone();
                next.state = DialogueState::Cancelled;
                return Transition {
                    session: next,
                    replies: vec![OutboundMessage::text(chat, &self.flow.texts.cancelled)
                        .with_keyboard(Keyboard::Remove)],
                    outcome: Outcome::Cancelled,
                    record: None,
                };
            }
            _ => {}
        }

        if self.flow.private_only && event.chat_kind == ChatKind::Group {
            return Transition::stay(session, Vec::new(), Outcome::Ignored);
        }

        if !session.awaiting() {
            return Transition::stay(
                session,
                vec![OutboundMessage::text(chat, &self.flow.texts.idle)],
                Outcome::Fallback,
            );
        }

        let Some(step) = self.flow.steps.get(session.step) else {
            // Session from a different flow layout; start over.
            return Transition::stay(
                &Session::new(session.chat_id, session.user_id),
                vec![OutboundMessage::text(chat, &self.flow.texts.idle)],
                Outcome::Fallback,
            );
        };

        if event.payload.command().is_some() {
            return self.fallback(session, step, &event.from, today);
        }

        match self.accept(session, step, &event.payload) {
            Ok(Some(value)) => self.advance(session, step, value, &event.from, today),
            Ok(None) => self.fallback(session, step, &event.from, today),
            Err(error) => {
                tracing::debug!(chat, step = %step.field, %error, "input rejected");
                let reply = OutboundMessage::text(chat, &step.reminder).with_keyboard(step.keyboard());
                Transition::stay(session, vec![reply], Outcome::Rejected(error))
            }
        }
    }

    fn start(&self, session: &Session, event: &InboundEvent, today: NaiveDate) -> Transition {
        let chat = event.chat_id;
        if self.flow.private_only && event.chat_kind == ChatKind::Group {
            return Transition::stay(
                session,
                vec![OutboundMessage::text(chat, &self.flow.texts.private_only)],
                Outcome::Rejected(EngineError::GroupChat),
            );
        }

        let mut next = Session::new(session.chat_id, event.from.id);
        let mut replies = Vec::with_capacity(2);
        if !self.flow.greeting.is_empty() {
            replies.push(OutboundMessage::text(
                chat,
                render(&self.flow.greeting, &event.from, &next.fields, today),
            ));
        }
        match self.flow.steps.first() {
            Some(first) => {
                next.state = first.state();
                replies.push(self.prompt(chat, first, &event.from, &next.fields, today));
            }
            None => next.state = DialogueState::Done,
        }
        Transition {
            session: next,
            replies,
            outcome: Outcome::Started,
            record: None,
        }
    }

    /// Validates the payload against the awaited step.
    ///
    /// `Ok(None)` means the payload kind has no meaning for this step.
    fn accept(
        &self,
        session: &Session,
        step: &Step,
        payload: &Payload,
    ) -> Result<Option<String>, EngineError> {
        match (&step.kind, payload) {
            (
                StepKind::Choice { options, .. } | StepKind::Currency { options, .. },
                Payload::Text(text),
            ) => {
                let input = text.trim();
                options
                    .iter()
                    .find(|o| o.as_str() == input)
                    .map(|o| Some(o.clone()))
                    .ok_or_else(|| EngineError::NotAnOption {
                        input: input.to_string(),
                    })
            }
            (StepKind::Date { format }, Payload::Text(text)) => {
                let input = text.trim();
                NaiveDate::parse_from_str(input, format)
                    .map(|_| Some(input.to_string()))
                    .map_err(|_| EngineError::InvalidDate {
                        input: input.to_string(),
                        format: format.clone(),
                    })
            }
            (StepKind::Contact { .. }, Payload::Contact(contact)) => {
                verify_contact(contact, session.user_id).map(Some)
            }
            (StepKind::Contact { .. }, Payload::Text(_)) => Err(EngineError::ContactMissing),
            _ => Ok(None),
        }
    }

    fn advance(
        &self,
        session: &Session,
        step: &Step,
        value: String,
        user: &User,
        today: NaiveDate,
    ) -> Transition {
        let chat = session.chat_id;
        let mut next = session.clone();
        next.fields.insert(step.field.clone(), value);
        next.step += 1;

        if let Some(following) = self.flow.steps.get(next.step) {
            next.state = following.state();
            let reply = self.prompt(chat, following, user, &next.fields, today);
            return Transition {
                session: next,
                replies: vec![reply],
                outcome: Outcome::Advanced,
                record: None,
            };
        }

        next.state = DialogueState::Done;
        let confirmation = OutboundMessage::text(
            chat,
            render(&self.flow.completion, user, &next.fields, today),
        )
        .with_keyboard(Keyboard::Remove);
        let record = CompletedRecord {
            flow: self.flow.id.clone(),
            chat_id: chat,
            user_id: next.user_id,
            username: user.username.clone(),
            fields: next.fields.clone(),
        };
        Transition {
            session: next,
            replies: vec![confirmation],
            outcome: Outcome::Completed,
            record: Some(record),
        }
    }

    fn fallback(&self, session: &Session, step: &Step, user: &User, today: NaiveDate) -> Transition {
        let chat = session.chat_id;
        let replies = vec![
            OutboundMessage::text(chat, &self.flow.texts.fallback),
            self.prompt(chat, step, user, &session.fields, today),
        ];
        Transition::stay(session, replies, Outcome::Fallback)
    }

    fn prompt(
        &self,
        chat: ChatId,
        step: &Step,
        user: &User,
        fields: &BTreeMap<String, String>,
        today: NaiveDate,
    ) -> OutboundMessage {
        OutboundMessage::text(chat, render(&step.prompt, user, fields, today))
            .with_keyboard(step.keyboard())
    }
}

fn verify_contact(contact: &Contact, user: UserId) -> Result<String, EngineError> {
    let phone = contact.phone_number.trim();
    let Some(owner) = contact.user_id else {
        return Err(EngineError::ContactIncomplete);
    };
    if phone.is_empty() {
        return Err(EngineError::ContactIncomplete);
    }
    if owner != user {
        return Err(EngineError::IdentityMismatch);
    }
    Ok(phone.to_string())
}

/// Fills a message template.
///
/// Known placeholders: `{name}` (first name), `{username}`, `{date}` (today,
/// `DD.MM.YYYY`) and `{<field>}` for every collected field. Unknown
/// placeholders are left as they are.
#[must_use]
pub fn render(
    template: &str,
    user: &User,
    fields: &BTreeMap<String, String>,
    today: NaiveDate,
) -> String {
    let mut out = template
        .replace("{name}", &user.first_name)
        .replace("{username}", user.username.as_deref().unwrap_or(""))
        .replace("{date}", &today.format(DEFAULT_DATE_FORMAT).to_string());
    for (key, value) in fields {
        out = out.replace(&format!("{{{key}}}"), value);
    }
    out
}
