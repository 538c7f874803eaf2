//! Connection lifecycle towards the robot's broker.
//!
//! The [`ConnectionManager`] is the only owner of the client handle. It keeps
//! the two-state machine (disconnected / connected), sequences address changes
//! as disconnect-then-connect and starts/stops background processing at the
//! transitions. All calls come from the UI thread.
//!
//! ```text
//!                 request_connect(a) ok
//!  Disconnected ─────────────────────────► Connected(a)
//!       ▲                                    │  │
//!       │        disconnect() ok             │  │ request_connect(b != a)
//!       └────────────────────────────────────┘  │ = disconnect() then connect(b)
//!                                               ▼
//! ```

use std::time::Duration;

use rumqttc::QoS;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::address::BrokerAddress;
use super::client::BrokerClient;
use super::command::{Command, Publish};
use super::error::{BridgeError, ProtocolError};

pub const BROKER_PORT: u16 = 1883;
pub const KEEP_ALIVE: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
}

/// What a successful [`ConnectionManager::request_connect`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// A new session was opened
    Connected,
    /// Already connected to that address, nothing happened
    AlreadyConnected,
}

pub struct ConnectionManager<C: BrokerClient> {
    client: C,
    /// Set iff connected; always the address of the live session
    address: Option<BrokerAddress>,
    state_tx: watch::Sender<ConnectionState>,
}

impl<C: BrokerClient> ConnectionManager<C> {
    /// Takes ownership of the client handle for the rest of the process.
    pub fn initialize(client: C) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        info!("Connection manager initialized");
        Self {
            client,
            address: None,
            state_tx,
        }
    }

    pub fn state(&self) -> ConnectionState {
        if self.address.is_some() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    /// Address of the current session, `None` while disconnected.
    pub fn address(&self) -> Option<BrokerAddress> {
        self.address
    }

    /// Receiver that follows every state transition.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    fn set_address(&mut self, address: Option<BrokerAddress>) {
        self.address = address;
        self.state_tx.send_replace(self.state());
    }

    /// Connects to `address`, replacing the current session if it points elsewhere.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::Disconnect`] when the old session could not be closed;
    ///   no connect is attempted and the old session stays.
    /// - [`BridgeError::Connect`] when the broker could not be reached or
    ///   refused the session; the manager is left disconnected.
    pub fn request_connect(
        &mut self,
        address: BrokerAddress,
    ) -> Result<ConnectOutcome, BridgeError> {
        if let Some(current) = self.address {
            if current == address {
                debug!("Already connected to {}, ignoring request", address);
                return Ok(ConnectOutcome::AlreadyConnected);
            }
            info!("Robot address changed from {} to {}", current, address);
            self.disconnect()?;
        }

        let connect_error = |source: ProtocolError| BridgeError::Connect {
            address: address.to_string(),
            source,
        };

        info!("Connecting to broker at {}:{}", address, BROKER_PORT);
        self.client
            .connect(&address.host(), BROKER_PORT, KEEP_ALIVE)
            .map_err(connect_error)?;

        if let Err(source) = self.client.start_loop() {
            error!("Connected to {} but the message loop did not start", address);
            if let Err(e) = self.client.disconnect() {
                warn!("Closing the session without a loop failed: {}", e);
            }
            return Err(connect_error(source));
        }

        self.set_address(Some(address));
        info!("Connected to broker at {}", address);
        Ok(ConnectOutcome::Connected)
    }

    /// Ends the current session.
    ///
    /// A no-op while disconnected: no client call is made. If the client
    /// refuses the disconnect the manager stays connected, since the session
    /// may well still be alive.
    pub fn disconnect(&mut self) -> Result<(), BridgeError> {
        let Some(current) = self.address else {
            debug!("Disconnect requested while disconnected, nothing to do");
            return Ok(());
        };

        self.client
            .disconnect()
            .map_err(|source| BridgeError::Disconnect {
                address: current.to_string(),
                source,
            })?;

        if let Err(e) = self.client.stop_loop(false) {
            warn!("Message loop did not stop cleanly: {}", e);
        }

        self.set_address(None);
        info!("Disconnected from broker at {}", current);
        Ok(())
    }

    /// Tears everything down and releases the client handle.
    ///
    /// Errors on the way are logged and otherwise ignored.
    pub fn shutdown(mut self) {
        if let Some(current) = self.address {
            if let Err(e) = self.client.disconnect() {
                warn!("Ignoring disconnect failure from {} at shutdown: {}", current, e);
            }
            if let Err(e) = self.client.stop_loop(true) {
                warn!("Ignoring message loop failure at shutdown: {}", e);
            }
            self.set_address(None);
        }
        info!("Broker client released");
    }
}

impl<C: BrokerClient> Publish for ConnectionManager<C> {
    /// Forwards to the client whatever the state; a disconnected client
    /// reports the failure itself.
    fn publish(&mut self, command: &Command) -> Result<(), ProtocolError> {
        self.client.publish(
            command.topic,
            command.payload.as_bytes(),
            QoS::AtMostOnce,
            false,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mqtt::address::validate;
    use crate::mqtt::client::MockBrokerClient;
    use mockall::Sequence;

    fn addr(text: &str) -> BrokerAddress {
        validate(text).unwrap()
    }

    fn expect_connect(mock: &mut MockBrokerClient, seq: &mut Sequence, host: &'static str) {
        mock.expect_connect()
            .withf(move |h, port, keep_alive| {
                h == host && *port == BROKER_PORT && *keep_alive == KEEP_ALIVE
            })
            .times(1)
            .in_sequence(seq)
            .returning(|_, _, _| Ok(()));
        mock.expect_start_loop()
            .times(1)
            .in_sequence(seq)
            .returning(|| Ok(()));
    }

    #[test]
    fn test_connect_from_disconnected() {
        let mut mock = MockBrokerClient::new();
        let mut seq = Sequence::new();
        expect_connect(&mut mock, &mut seq, "10.0.0.5");

        let mut manager = ConnectionManager::initialize(mock);
        let state_rx = manager.subscribe();
        assert_eq!(manager.state(), ConnectionState::Disconnected);

        let outcome = manager.request_connect(addr("10.0.0.5")).unwrap();
        assert_eq!(outcome, ConnectOutcome::Connected);
        assert_eq!(manager.state(), ConnectionState::Connected);
        assert_eq!(manager.address(), Some(addr("10.0.0.5")));
        assert_eq!(*state_rx.borrow(), ConnectionState::Connected);
    }

    #[test]
    fn test_failed_connect_stays_disconnected() {
        let mut mock = MockBrokerClient::new();
        mock.expect_connect()
            .times(1)
            .returning(|_, _, keep_alive| Err(ProtocolError::Timeout(keep_alive)));
        mock.expect_start_loop().never();

        let mut manager = ConnectionManager::initialize(mock);
        let err = manager.request_connect(addr("10.0.0.9")).unwrap_err();

        assert!(matches!(
            err,
            BridgeError::Connect { ref address, source: ProtocolError::Timeout(_) } if address == "10.0.0.9"
        ));
        assert_eq!(manager.state(), ConnectionState::Disconnected);
        assert_eq!(manager.address(), None);
    }

    #[test]
    fn test_same_address_is_a_no_op() {
        let mut mock = MockBrokerClient::new();
        let mut seq = Sequence::new();
        expect_connect(&mut mock, &mut seq, "10.0.0.5");
        mock.expect_disconnect().never();

        let mut manager = ConnectionManager::initialize(mock);
        manager.request_connect(addr("10.0.0.5")).unwrap();
        let outcome = manager.request_connect(addr("10.0.0.5")).unwrap();

        assert_eq!(outcome, ConnectOutcome::AlreadyConnected);
        assert_eq!(manager.address(), Some(addr("10.0.0.5")));
    }

    #[test]
    fn test_address_change_disconnects_first() {
        let mut mock = MockBrokerClient::new();
        let mut seq = Sequence::new();
        expect_connect(&mut mock, &mut seq, "10.0.0.5");
        mock.expect_disconnect()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(()));
        mock.expect_stop_loop()
            .withf(|force| !*force)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        expect_connect(&mut mock, &mut seq, "10.0.0.6");

        let mut manager = ConnectionManager::initialize(mock);
        manager.request_connect(addr("10.0.0.5")).unwrap();
        let outcome = manager.request_connect(addr("10.0.0.6")).unwrap();

        assert_eq!(outcome, ConnectOutcome::Connected);
        assert_eq!(manager.address(), Some(addr("10.0.0.6")));
    }

    #[test]
    fn test_failed_disconnect_aborts_address_change() {
        let mut mock = MockBrokerClient::new();
        let mut seq = Sequence::new();
        expect_connect(&mut mock, &mut seq, "10.0.0.5");
        mock.expect_disconnect()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Err(ProtocolError::NoConnection));
        mock.expect_stop_loop().never();

        let mut manager = ConnectionManager::initialize(mock);
        manager.request_connect(addr("10.0.0.5")).unwrap();
        let err = manager.request_connect(addr("10.0.0.6")).unwrap_err();

        assert!(matches!(
            err,
            BridgeError::Disconnect { ref address, .. } if address == "10.0.0.5"
        ));
        assert_eq!(manager.state(), ConnectionState::Connected);
        assert_eq!(manager.address(), Some(addr("10.0.0.5")));
    }

    #[test]
    fn test_loop_start_failure_counts_as_failed_connect() {
        let mut mock = MockBrokerClient::new();
        mock.expect_connect().returning(|_, _, _| Ok(()));
        mock.expect_start_loop()
            .returning(|| Err(ProtocolError::LoopRunning));
        mock.expect_disconnect().times(1).returning(|| Ok(()));

        let mut manager = ConnectionManager::initialize(mock);
        let err = manager.request_connect(addr("10.0.0.5")).unwrap_err();

        assert!(matches!(err, BridgeError::Connect { .. }));
        assert_eq!(manager.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_disconnect_while_disconnected_makes_no_call() {
        let mut mock = MockBrokerClient::new();
        mock.expect_disconnect().never();
        mock.expect_stop_loop().never();

        let mut manager = ConnectionManager::initialize(mock);
        manager.disconnect().unwrap();
        assert_eq!(manager.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_failed_disconnect_stays_connected() {
        let mut mock = MockBrokerClient::new();
        let mut seq = Sequence::new();
        expect_connect(&mut mock, &mut seq, "10.0.0.5");
        mock.expect_disconnect()
            .returning(|| Err(ProtocolError::NoConnection));

        let mut manager = ConnectionManager::initialize(mock);
        manager.request_connect(addr("10.0.0.5")).unwrap();
        assert!(manager.disconnect().is_err());
        assert_eq!(manager.state(), ConnectionState::Connected);
    }

    #[test]
    fn test_disconnect_stops_loop_and_notifies() {
        let mut mock = MockBrokerClient::new();
        let mut seq = Sequence::new();
        expect_connect(&mut mock, &mut seq, "10.0.0.5");
        mock.expect_disconnect()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(()));
        mock.expect_stop_loop()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let mut manager = ConnectionManager::initialize(mock);
        let mut state_rx = manager.subscribe();
        manager.request_connect(addr("10.0.0.5")).unwrap();
        manager.disconnect().unwrap();

        assert!(state_rx.has_changed().unwrap());
        assert_eq!(*state_rx.borrow_and_update(), ConnectionState::Disconnected);
        assert_eq!(manager.address(), None);
    }

    #[test]
    fn test_shutdown_swallows_teardown_errors() {
        let mut mock = MockBrokerClient::new();
        let mut seq = Sequence::new();
        expect_connect(&mut mock, &mut seq, "10.0.0.5");
        mock.expect_disconnect()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Err(ProtocolError::NoConnection));
        mock.expect_stop_loop()
            .withf(|force| *force)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(ProtocolError::LoopPanicked));

        let mut manager = ConnectionManager::initialize(mock);
        manager.request_connect(addr("10.0.0.5")).unwrap();
        manager.shutdown();
    }

    #[test]
    fn test_shutdown_while_disconnected_touches_nothing() {
        let mut mock = MockBrokerClient::new();
        mock.expect_disconnect().never();
        mock.expect_stop_loop().never();

        ConnectionManager::initialize(mock).shutdown();
    }

    #[test]
    fn test_publish_is_forwarded_even_when_disconnected() {
        let mut mock = MockBrokerClient::new();
        mock.expect_publish()
            .withf(|topic, payload, qos, retain| {
                topic == "robot/body/neck/move"
                    && payload == b"0.500000"
                    && *qos == QoS::AtMostOnce
                    && !*retain
            })
            .times(1)
            .returning(|_, _, _, _| Err(ProtocolError::NoConnection));

        let mut manager = ConnectionManager::initialize(mock);
        let command = Command::actuator(crate::mqtt::command::Actuator::Neck, 50);
        assert!(matches!(
            manager.publish(&command),
            Err(ProtocolError::NoConnection)
        ));
        assert_eq!(manager.state(), ConnectionState::Disconnected);
    }
}
