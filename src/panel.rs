//! The control panel as seen by the front-end.
//!
//! Each method is one user action (address submitted, slider moved, button
//! pressed, quit). It runs synchronously on the UI thread and returns the
//! notification to show, if any. Whatever draws the window never touches the
//! client or the connection state directly.

use chrono::{DateTime, Local};
use tokio::sync::watch;

use crate::mqtt::address::{validate, BrokerAddress};
use crate::mqtt::client::BrokerClient;
use crate::mqtt::command::{Actuator, CommandPublisher};
use crate::mqtt::connection::{ConnectOutcome, ConnectionManager, ConnectionState};
use crate::mqtt::error::BridgeError;
use crate::report::{ErrorReporter, Notification, Status};

pub struct ControlPanel<C: BrokerClient> {
    link: ConnectionManager<C>,
    publisher: CommandPublisher,
    reporter: ErrorReporter,
    /// Last non-empty text submitted in the address field
    entered: String,
}

impl<C: BrokerClient> ControlPanel<C> {
    pub fn initialize(client: C) -> Self {
        Self {
            link: ConnectionManager::initialize(client),
            publisher: CommandPublisher::new(),
            reporter: ErrorReporter,
            entered: String::new(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.link.state()
    }

    pub fn address(&self) -> Option<BrokerAddress> {
        self.link.address()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.link.subscribe()
    }

    pub fn commands_sent(&self) -> usize {
        self.publisher.sent()
    }

    pub fn last_sent(&self) -> Option<DateTime<Local>> {
        self.publisher.last_sent()
    }

    /// The address field was submitted.
    ///
    /// Empty text is ignored. Re-submitting the address of the live session
    /// does nothing and shows nothing.
    pub fn submit_address(&mut self, text: &str) -> Option<Notification> {
        if text.trim().is_empty() {
            return None;
        }
        self.entered = text.trim().to_string();

        let address = match validate(text) {
            Ok(address) => address,
            Err(e) => return Some(self.report_failure(&e)),
        };

        match self.link.request_connect(address) {
            Ok(ConnectOutcome::Connected) => Some(self.reporter.report(
                format!(
                    "successfully connected to robot at ip address \"{}\".",
                    address
                ),
                Status::Success,
            )),
            Ok(ConnectOutcome::AlreadyConnected) => None,
            Err(e) => Some(self.report_failure(&e)),
        }
    }

    /// A slider moved to `raw`.
    pub fn move_actuator(&mut self, actuator: Actuator, raw: i32) -> Option<Notification> {
        self.publisher
            .publish_actuator(&mut self.link, actuator, raw)
            .err()
            .map(|e| self.report_failure(&e))
    }

    /// The gamepad moved an actuator to a normalized `position`.
    pub fn move_to(&mut self, actuator: Actuator, position: f64) -> Option<Notification> {
        self.publisher
            .publish_position(&mut self.link, actuator, position)
            .err()
            .map(|e| self.report_failure(&e))
    }

    /// Asks the robot itself to shut down.
    pub fn quit_robot(&mut self) -> Option<Notification> {
        self.publisher
            .publish_quit(&mut self.link)
            .err()
            .map(|e| self.report_failure(&e))
    }

    /// The dance button was pressed.
    pub fn dance(&mut self) -> Option<Notification> {
        self.publisher
            .publish_dance(&mut self.link)
            .err()
            .map(|e| self.report_failure(&e))
    }

    /// Quit: tears the link down and releases the client.
    pub fn shutdown(self) {
        self.link.shutdown();
    }

    fn report_failure(&self, error: &BridgeError) -> Notification {
        let message = match error {
            BridgeError::InvalidAddress(text) => format!("invalid ip address \"{}\".", text),
            BridgeError::Connect { address, .. } => {
                format!("unable to connect to robot at ip address \"{}\".", address)
            }
            BridgeError::Disconnect { address, .. } => {
                format!("unable to disconnect from robot at ip address \"{}\".", address)
            }
            BridgeError::Publish { .. } => format!(
                "unable to publish message to the robot at ip address \"{}\".",
                self.target()
            ),
        };
        self.reporter.report(message, error.status())
    }

    /// Address of the live session, or whatever was typed last.
    fn target(&self) -> String {
        self.link
            .address()
            .map(|address| address.to_string())
            .unwrap_or_else(|| self.entered.clone())
    }
}
