//! The broker client handle.
//!
//! [`BrokerClient`] is the narrow set of primitives the connection manager
//! drives: a blocking connect that resolves to success or failure, disconnect,
//! publish and the start/stop of background processing. [`MqttClient`] is the
//! rumqttc implementation used by the panel.

use std::time::Duration;

use rumqttc::{Client, Connection, Event, MqttOptions, Packet, QoS, RecvTimeoutError};
use tracing::{debug, info};

use super::error::ProtocolError;
use super::message_loop::{LoopSettings, MessageLoop};

/// Primitives of a publish-only MQTT client.
#[cfg_attr(test, mockall::automock)]
pub trait BrokerClient {
    /// Opens a session and waits for the broker to accept it.
    fn connect(&mut self, host: &str, port: u16, keep_alive: Duration)
        -> Result<(), ProtocolError>;

    /// Requests an orderly end of the current session.
    fn disconnect(&mut self) -> Result<(), ProtocolError>;

    /// Queues one message on the current session.
    fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retain: bool,
    ) -> Result<(), ProtocolError>;

    /// Starts background network processing for the current session.
    fn start_loop(&mut self) -> Result<(), ProtocolError>;

    /// Stops background network processing and ends the current session.
    fn stop_loop(&mut self, force: bool) -> Result<(), ProtocolError>;
}

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub client_id: String,
    /// Capacity of the rumqttc request channel
    pub request_capacity: usize,
    pub loop_settings: LoopSettings,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            client_id: "WallE".to_string(),
            request_capacity: 10,
            loop_settings: LoopSettings::default(),
        }
    }
}

struct Session {
    client: Client,
    /// Taken by the message loop once it starts
    connection: Option<Connection>,
}

/// rumqttc-backed client handle.
///
/// A session (rumqttc `Client` + `Connection` pair) is created per connect and
/// released when the loop is stopped; the handle itself lives for the whole
/// panel lifetime.
pub struct MqttClient {
    settings: ClientSettings,
    session: Option<Session>,
    message_loop: MessageLoop,
}

impl MqttClient {
    pub fn new(settings: ClientSettings) -> Self {
        let message_loop = MessageLoop::new(settings.loop_settings);
        Self {
            settings,
            session: None,
            message_loop,
        }
    }

    fn session(&self) -> Result<&Session, ProtocolError> {
        self.session.as_ref().ok_or(ProtocolError::NoConnection)
    }
}

impl BrokerClient for MqttClient {
    fn connect(
        &mut self,
        host: &str,
        port: u16,
        keep_alive: Duration,
    ) -> Result<(), ProtocolError> {
        if self.message_loop.is_running() {
            return Err(ProtocolError::LoopRunning);
        }
        // a session whose loop never started is stale
        self.session = None;

        let mut options = MqttOptions::new(self.settings.client_id.clone(), host, port);
        options.set_keep_alive(keep_alive).set_clean_session(true);

        debug!("Connecting to {}:{} as {}", host, port, self.settings.client_id);
        let (client, mut connection) = Client::new(options, self.settings.request_capacity);

        // the first poll performs the TCP connect and the CONNECT/CONNACK exchange
        match connection.recv_timeout(keep_alive) {
            Ok(Ok(Event::Incoming(Packet::ConnAck(ack)))) => {
                info!("Broker at {}:{} accepted the session ({:?})", host, port, ack.code);
                self.session = Some(Session {
                    client,
                    connection: Some(connection),
                });
                Ok(())
            }
            Ok(Ok(other)) => Err(ProtocolError::UnexpectedPacket(format!("{:?}", other))),
            Ok(Err(e)) => Err(e.into()),
            Err(RecvTimeoutError::Timeout) => Err(ProtocolError::Timeout(keep_alive)),
            Err(RecvTimeoutError::Disconnected) => Err(ProtocolError::NoConnection),
        }
    }

    // The request channel only drains while the broker is reachable, so a
    // full channel fails the call instead of blocking the UI thread.
    fn disconnect(&mut self) -> Result<(), ProtocolError> {
        self.session()?.client.try_disconnect()?;
        Ok(())
    }

    fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retain: bool,
    ) -> Result<(), ProtocolError> {
        self.session()?
            .client
            .try_publish(topic, qos, retain, payload.to_vec())?;
        Ok(())
    }

    fn start_loop(&mut self) -> Result<(), ProtocolError> {
        let session = self.session.as_mut().ok_or(ProtocolError::NoConnection)?;
        let connection = session
            .connection
            .take()
            .ok_or(ProtocolError::LoopRunning)?;
        self.message_loop.start(connection)
    }

    fn stop_loop(&mut self, force: bool) -> Result<(), ProtocolError> {
        self.message_loop.stop(force)?;
        self.session = None;
        Ok(())
    }
}
