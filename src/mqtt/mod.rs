//! # MQTT Link Module
//!
//! Everything between a panel action and the robot's broker. The panel only
//! publishes; nothing here subscribes.
//!
//! ## Module Architecture
//!
//! ```text
//! mqtt/
//! ├── address.rs       - syntactic validation of the robot address
//! ├── command.rs       - actuator table, command payloads, publisher
//! ├── connection.rs    - connection state machine (owns the client)
//! ├── client.rs        - client primitives and the rumqttc handle
//! ├── message_loop.rs  - background polling thread
//! └── error.rs         - protocol and action errors
//! ```
//!
//! ## Threading
//!
//! Every call here is made from the UI thread and returns synchronously. The
//! only other thread is the message loop, which polls the rumqttc connection
//! between a successful connect and the matching disconnect/shutdown. It never
//! calls back into the UI; failures come back through the return values of
//! connect, disconnect and publish.
//!
//! ## Wire Format
//!
//! - port 1883, keep-alive 10 s, plain TCP
//! - QoS 0, never retained
//! - `robot/<body|head>/<actuator>/move` carries `raw / 100` with six decimals
//! - `robot/dance` carries an empty payload

pub mod address;
pub mod client;
pub mod command;
pub mod connection;
pub mod error;
pub mod message_loop;

pub use address::{validate, BrokerAddress};
pub use client::{BrokerClient, ClientSettings, MqttClient};
pub use command::{Actuator, Command, CommandPublisher, Publish};
pub use connection::{ConnectOutcome, ConnectionManager, ConnectionState};
pub use error::{BridgeError, ProtocolError};
