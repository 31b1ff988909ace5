//! Dialogue flows as data.
//!
//! Every agent runs the same engine; what differs between them is a
//! [`Flow`]: the ordered steps to collect, their prompts and option sets,
//! and the completion text. Flows are built in or loaded from YAML.

use std::path::Path;

use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::DialogueState;
use crate::transport::Keyboard;

/// Date format used by the built-in flows (`31.12.1990`).
pub const DEFAULT_DATE_FORMAT: &str = "%d.%m.%Y";

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("unknown flow '{id}' (available: {available})")]
    Unknown { id: String, available: String },

    #[error("flow '{0}' has no steps")]
    NoSteps(String),

    #[error("flow '{flow}': step '{field}' offers no options")]
    EmptyOptions { flow: String, field: String },

    #[error("flow '{flow}': step '{field}' has an invalid date format '{format}'")]
    BadDateFormat {
        flow: String,
        field: String,
        format: String,
    },

    #[error("flow '{flow}': field '{field}' is collected twice")]
    DuplicateField { flow: String, field: String },

    #[error("failed to read flow file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse flow file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// What a step waits for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepKind {
    /// Constrained choice from a fixed option set (e.g. buy/sell).
    Choice {
        options: Vec<String>,
        #[serde(default = "default_columns")]
        columns: usize,
    },
    /// Choice of an instrument from a fixed list.
    Currency {
        options: Vec<String>,
        #[serde(default = "default_columns")]
        columns: usize,
    },
    /// Calendar date in a fixed textual format.
    Date {
        #[serde(default = "default_date_format")]
        format: String,
    },
    /// The user's own contact card.
    Contact { button: String },
}

/// One collection step of a flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Name under which the collected value is stored.
    pub field: String,
    /// Message shown when the step is entered.
    pub prompt: String,
    /// Message shown when input for this step is rejected.
    pub reminder: String,
    #[serde(flatten)]
    pub kind: StepKind,
}

impl Step {
    /// Dialogue state a session is in while waiting on this step.
    #[must_use]
    pub fn state(&self) -> DialogueState {
        match self.kind {
            StepKind::Choice { .. } => DialogueState::AwaitingChoice,
            StepKind::Currency { .. } => DialogueState::AwaitingCurrency,
            StepKind::Date { .. } => DialogueState::AwaitingDate,
            StepKind::Contact { .. } => DialogueState::AwaitingContact,
        }
    }

    #[must_use]
    pub fn keyboard(&self) -> Keyboard {
        match &self.kind {
            StepKind::Choice { options, columns } | StepKind::Currency { options, columns } => {
                Keyboard::Choices(
                    options
                        .chunks((*columns).max(1))
                        .map(<[String]>::to_vec)
                        .collect(),
                )
            }
            StepKind::Date { .. } => Keyboard::Remove,
            StepKind::Contact { button } => Keyboard::RequestContact(button.clone()),
        }
    }
}

/// Fixed replies shared by every step of a flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowTexts {
    /// Prefix for the fallback reply on unexpected input.
    pub fallback: String,
    /// Reply to `/cancel`.
    pub cancelled: String,
    /// Reply to a rate-limited event.
    pub rate_limited: String,
    /// Reply when a private-only flow is opened from a group.
    pub private_only: String,
    /// Reply to anything but `/start` before the dialogue began.
    pub idle: String,
    /// Reply after an internal failure while handling an event.
    pub apology: String,
}

impl Default for FlowTexts {
    fn default() -> Self {
        Self {
            fallback: "Please use the buttons to talk to the bot.".to_string(),
            cancelled: "Cancelled. Send /start to begin again.".to_string(),
            rate_limited: "⚠️ Too many requests. Please wait a minute and try again.".to_string(),
            private_only: "This bot only works in private messages.".to_string(),
            idle: "Send /start to begin.".to_string(),
            apology: "Sorry, something went wrong. Please try again.".to_string(),
        }
    }
}

/// A complete dialogue description.
///
/// `greeting`, prompts and `completion` are templates; see
/// [`crate::engine::render`] for the placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flow {
    pub id: String,
    #[serde(default)]
    pub private_only: bool,
    #[serde(default)]
    pub greeting: String,
    pub steps: Vec<Step>,
    pub completion: String,
    #[serde(default)]
    pub texts: FlowTexts,
}

impl Flow {
    /// Checks the flow is usable by the engine.
    ///
    /// # Errors
    ///
    /// Returns the first structural problem found.
    pub fn validate(&self) -> Result<(), FlowError> {
        if self.steps.is_empty() {
            return Err(FlowError::NoSteps(self.id.clone()));
        }
        let mut fields = std::collections::HashSet::new();
        for step in &self.steps {
            if !fields.insert(step.field.as_str()) {
                return Err(FlowError::DuplicateField {
                    flow: self.id.clone(),
                    field: step.field.clone(),
                });
            }
            match &step.kind {
                StepKind::Choice { options, .. } | StepKind::Currency { options, .. }
                    if options.is_empty() =>
                {
                    return Err(FlowError::EmptyOptions {
                        flow: self.id.clone(),
                        field: step.field.clone(),
                    });
                }
                StepKind::Date { format }
                    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) =>
                {
                    return Err(FlowError::BadDateFormat {
                        flow: self.id.clone(),
                        field: step.field.clone(),
                        format: format.clone(),
                    });
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// On-disk flow file: a list of flows.
#[derive(Debug, Deserialize)]
struct FlowFile {
    flows: Vec<Flow>,
}

/// Loads and validates every flow in a YAML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed or validated.
pub fn load_flows(path: &Path) -> Result<Vec<Flow>, FlowError> {
    let display = path.display().to_string();
    let content = std::fs::read_to_string(path).map_err(|source| FlowError::Read {
        path: display.clone(),
        source,
    })?;
    let file: FlowFile = serde_yaml::from_str(&content).map_err(|source| FlowError::Parse {
        path: display,
        source,
    })?;
    for flow in &file.flows {
        flow.validate()?;
    }
    Ok(file.flows)
}

/// Picks `id` out of `flows`.
///
/// # Errors
///
/// Returns [`FlowError::Unknown`] listing the available ids.
pub fn select(flows: Vec<Flow>, id: &str) -> Result<Flow, FlowError> {
    let available = flows
        .iter()
        .map(|f| f.id.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    flows
        .into_iter()
        .find(|f| f.id == id)
        .ok_or_else(|| FlowError::Unknown {
            id: id.to_string(),
            available,
        })
}

fn default_columns() -> usize {
    2
}

fn default_date_format() -> String {
    DEFAULT_DATE_FORMAT.to_string()
}

fn contact_step(button: &str, prompt: &str) -> Step {
    Step {
        field: "phone".to_string(),
        prompt: prompt.to_string(),
        reminder: format!("❌ Please use the “{button}” button to share your own contact."),
        kind: StepKind::Contact {
            button: button.to_string(),
        },
    }
}

/// The flows shipped with the agent.
#[must_use]
pub fn builtin_flows() -> Vec<Flow> {
    vec![iq_test(), registration(), crypto(), giveaway()]
}

fn iq_test() -> Flow {
    Flow {
        id: "iq-test".to_string(),
        private_only: false,
        greeting: "Welcome to the IQ test!".to_string(),
        steps: vec![
            Step {
                field: "dob".to_string(),
                prompt: "Hi {name}! To prepare your test, tell me your date of birth.\n\
                         Format: DD.MM.YYYY"
                    .to_string(),
                reminder: "Wrong format. Please send the date as DD.MM.YYYY".to_string(),
                kind: StepKind::Date {
                    format: default_date_format(),
                },
            },
            contact_step(
                "☎️ Send number",
                "Thanks! One last step before the test.\n\
                 Tap the button 👇 to share your phone number securely.",
            ),
        ],
        completion: "Thanks! Your details were received.".to_string(),
        texts: FlowTexts::default(),
    }
}

fn registration() -> Flow {
    Flow {
        id: "registration".to_string(),
        private_only: false,
        greeting: "👋 Hi, {name}!\n\nWelcome to SocialIng.\n\
                   To continue, please complete a quick registration."
            .to_string(),
        steps: vec![contact_step(
            "📞 Send my phone number",
            "Tap the button below to share your phone number securely.",
        )],
        completion: "✅ Thanks, {name}! Registration is complete, you can use the service now."
            .to_string(),
        texts: FlowTexts::default(),
    }
}

fn crypto() -> Flow {
    Flow {
        id: "crypto".to_string(),
        private_only: true,
        greeting: "👋 Hi, {name}!\n\nWelcome to our CryptoBot.".to_string(),
        steps: vec![
            Step {
                field: "action".to_string(),
                prompt: "Please choose what you want to do:".to_string(),
                reminder: "Please choose one of the buttons.".to_string(),
                kind: StepKind::Choice {
                    options: vec!["Buy".to_string(), "Sell".to_string()],
                    columns: 2,
                },
            },
            Step {
                field: "currency".to_string(),
                prompt: "📊 Example trades:\n- 0.005 BTC for 100 USD\n- 1 ETH for 2000 USD\n\n\
                         You chose: {action}.\nNow choose a cryptocurrency:"
                    .to_string(),
                reminder: "Please choose a cryptocurrency with the buttons.".to_string(),
                kind: StepKind::Currency {
                    options: [
                        "Bitcoin (BTC)",
                        "Ethereum (ETH)",
                        "Ripple (XRP)",
                        "Litecoin (LTC)",
                        "Dogecoin (DOGE)",
                    ]
                    .into_iter()
                    .map(String::from)
                    .collect(),
                    columns: 2,
                },
            },
            contact_step(
                "📞 Send my phone number",
                "You chose: {currency}\nThe USD rate will be available after authorization.\n\n\
                 To continue, please share your own phone number.",
            ),
        ],
        completion: "✅ You are authorized! Thank you.".to_string(),
        texts: FlowTexts::default(),
    }
}

fn giveaway() -> Flow {
    Flow {
        id: "giveaway".to_string(),
        private_only: false,
        greeting: "🎉 Welcome to the giveaway!\n\n\
                   To take part, share your phone number once."
            .to_string(),
        steps: vec![contact_step(
            "📲 Send my number",
            "Tap the button below and your client will offer to share your number securely.",
        )],
        completion: "✅ Thanks, {name}!\n\nYour number {phone} was received. \
                     You registered on {date}.\nGood luck!"
            .to_string(),
        texts: FlowTexts::default(),
    }
}
