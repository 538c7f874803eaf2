//! Error types for the broker link.
//!
//! Two layers:
//! - [`ProtocolError`]: whatever the broker client layer reports (rumqttc
//!   failures, missing session, loop misuse). Its `Display` is the diagnostic
//!   text shown to the user.
//! - [`BridgeError`]: what a panel action failed at, with the address it was
//!   aimed at and the protocol cause.

use std::time::Duration;

use thiserror::Error;

use crate::report::Status;

/// Failures reported by the broker client layer.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Network or protocol failure on the connection itself
    #[error("connection error: {0}")]
    Connection(#[from] rumqttc::ConnectionError),

    /// The request could not be queued for the event loop
    #[error("client request failed: {0}")]
    Request(#[from] rumqttc::ClientError),

    /// No session is open on the client handle
    #[error("the client is not connected to a broker")]
    NoConnection,

    /// The broker did not acknowledge the connection within the keep-alive interval
    #[error("no answer from the broker within {0:?}")]
    Timeout(Duration),

    /// The first packet after connecting was not a CONNACK
    #[error("unexpected first packet from the broker: {0}")]
    UnexpectedPacket(String),

    /// `start` was called while the loop is already running
    #[error("the message loop is already running")]
    LoopRunning,

    /// `stop` was called while the loop is not running
    #[error("the message loop is not running")]
    LoopNotRunning,

    /// The loop thread could not be spawned
    #[error("unable to spawn the message loop: {0}")]
    Spawn(#[source] std::io::Error),

    /// The loop thread panicked before it could be joined
    #[error("the message loop thread panicked")]
    LoopPanicked,
}

/// Failure of a panel action.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The address text is not a numeric host address
    #[error("invalid ip address \"{0}\"")]
    InvalidAddress(String),

    #[error("unable to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: ProtocolError,
    },

    #[error("unable to disconnect from {address}: {source}")]
    Disconnect {
        address: String,
        #[source]
        source: ProtocolError,
    },

    #[error("unable to publish to {topic}: {source}")]
    Publish {
        topic: String,
        #[source]
        source: ProtocolError,
    },
}

impl BridgeError {
    /// Classifies the failure for the error reporter.
    ///
    /// Validation failures are local and carry no protocol diagnostic; every
    /// other variant carries the protocol error that caused it.
    pub fn status(&self) -> Status<'_> {
        match self {
            BridgeError::InvalidAddress(_) => Status::Local,
            BridgeError::Connect { source, .. }
            | BridgeError::Disconnect { source, .. }
            | BridgeError::Publish { source, .. } => Status::Protocol(source),
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_address_is_local() {
        let err = BridgeError::InvalidAddress("robot".into());
        assert!(matches!(err.status(), Status::Local));
        assert_eq!(err.to_string(), "invalid ip address \"robot\"");
    }

    #[test]
    fn test_publish_failure_carries_protocol_error() {
        let err = BridgeError::Publish {
            topic: "robot/dance".into(),
            source: ProtocolError::NoConnection,
        };
        assert!(matches!(
            err.status(),
            Status::Protocol(ProtocolError::NoConnection)
        ));
        assert_eq!(
            err.to_string(),
            "unable to publish to robot/dance: the client is not connected to a broker"
        );
    }

    #[test]
    fn test_timeout_display() {
        let err = ProtocolError::Timeout(Duration::from_secs(10));
        assert_eq!(err.to_string(), "no answer from the broker within 10s");
    }
}
