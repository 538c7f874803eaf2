//! Turns the outcome of a panel action into something to show the user.
//!
//! The reporter only decides the text and the severity. Presenting it (a modal
//! in the egui front-end) is the caller's business.

use std::fmt;

use tracing::{error, info};

use crate::mqtt::error::ProtocolError;

/// Result code of the action being reported.
#[derive(Debug, Clone, Copy)]
pub enum Status<'a> {
    Success,
    /// Failure reported by the broker client layer
    Protocol(&'a ProtocolError),
    /// Failure detected before the broker client was involved
    Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Error,
}

/// A message ready for presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub severity: Severity,
    pub text: String,
}

impl Notification {
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ErrorReporter;

impl ErrorReporter {
    /// Builds the notification for `message` and logs it.
    ///
    /// Protocol failures get the decoded diagnostic on a second line; local
    /// failures and successes show the message alone.
    pub fn report(&self, message: impl Into<String>, status: Status<'_>) -> Notification {
        let message = message.into();
        let notification = match status {
            Status::Success => Notification {
                severity: Severity::Info,
                text: message,
            },
            Status::Protocol(cause) => Notification {
                severity: Severity::Error,
                text: format!("{}\n{}", message, cause),
            },
            Status::Local => Notification {
                severity: Severity::Error,
                text: message,
            },
        };

        match notification.severity {
            Severity::Info => info!("{}", notification.text),
            Severity::Error => error!("{}", notification.text),
        }
        notification
    }
}
