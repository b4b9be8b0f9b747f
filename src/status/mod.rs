use std::time::Duration;

use colored::{ColoredString, Colorize};
use tokio::time::Instant;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Danger,
}

impl Severity {
    pub fn label(self) -> &'static str {
        match self {
            Severity::Info => "INF",
            Severity::Success => "OK",
            Severity::Warning => "WRN",
            Severity::Danger => "ERR",
        }
    }

    pub fn paint(self, text: &str) -> ColoredString {
        match self {
            Severity::Info => text.bold().blue(),
            Severity::Success => text.bold().green(),
            Severity::Warning => text.bold().yellow(),
            Severity::Danger => text.bold().red(),
        }
    }
}

/// User-facing failure kinds. Every transport or decoding problem collapses
/// into one of these.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageKind {
    SearchFailed,
    AuthFailed,
    InvalidCredentials,
    Deaccessioned,
    ForbiddenCharacters,
}

impl MessageKind {
    pub fn from_status(status: Option<u16>, fallback: MessageKind) -> MessageKind {
        match status {
            Some(401) => MessageKind::InvalidCredentials,
            Some(406) => MessageKind::ForbiddenCharacters,
            Some(410) => MessageKind::Deaccessioned,
            _ => fallback,
        }
    }

    pub fn text(self) -> &'static str {
        match self {
            MessageKind::SearchFailed => "There was a problem with your search. Please try again.",
            MessageKind::AuthFailed => "Could not authorize this action. Please try again later.",
            MessageKind::InvalidCredentials => {
                "Your credentials were rejected. Please check them and try again."
            }
            MessageKind::Deaccessioned => {
                "This resource has been deaccessioned and can no longer be linked."
            }
            MessageKind::ForbiddenCharacters => {
                "This resource cannot be linked due to forbidden characters in one or more of its names."
            }
        }
    }

    pub fn message(self) -> StatusMessage {
        StatusMessage::new(self.text(), Severity::Danger)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub severity: Severity,
    pub clear_after: Option<Duration>,
}

impl StatusMessage {
    pub fn new(text: impl Into<String>, severity: Severity) -> Self {
        Self {
            text: text.into(),
            severity,
            clear_after: None,
        }
    }

    pub fn clear_after(mut self, delay: Duration) -> Self {
        self.clear_after = Some(delay);
        self
    }

    pub fn render(&self) -> String {
        format!(
            "{}{}{} {}",
            "[".bold().white(),
            self.severity.paint(self.severity.label()),
            "]".bold().white(),
            self.text
        )
    }
}

/// The single flashed message slot. A message with a delay disappears once
/// the delay has elapsed; otherwise it stays until replaced.
#[derive(Clone, Debug, Default)]
pub struct StatusBoard {
    current: Option<(StatusMessage, Instant)>,
}

impl StatusBoard {
    pub fn set(&mut self, message: StatusMessage) {
        self.set_at(message, Instant::now());
    }

    pub fn set_at(&mut self, message: StatusMessage, now: Instant) {
        self.current = Some((message, now));
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    pub fn current(&self) -> Option<&StatusMessage> {
        self.current_at(Instant::now())
    }

    pub fn current_at(&self, now: Instant) -> Option<&StatusMessage> {
        let (message, set_at) = self.current.as_ref()?;
        match message.clear_after {
            Some(delay) if now.saturating_duration_since(*set_at) >= delay => None,
            _ => Some(message),
        }
    }
}
