//! WallE control panel.
//!
//! Sliders and buttons on a desktop panel drive the actuators of a remote
//! robot by publishing MQTT commands to a broker at a user-supplied address.
//!
//! - [`mqtt`]: address validation, connection lifecycle, message loop, commands
//! - [`report`]: turns action outcomes into user notifications
//! - [`panel`]: the UI-facing facade over both
//! - [`gamepad`]: stick and button input feeding the same panel
//! - [`config`]: persisted settings
//! - [`ui`]: the egui window

pub mod config;
pub mod gamepad;
pub mod mqtt;
pub mod panel;
pub mod report;
pub mod ui;
