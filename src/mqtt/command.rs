//! Actuator commands and the publisher that sends them.
//!
//! Every slider on the panel drives one [`Actuator`]. The actuator enum is
//! also the dispatch table: it knows its wire name and its topic, so the UI
//! needs no handler per control.

use std::fmt;
use std::ops::RangeInclusive;

use chrono::{DateTime, Local};
use tracing::debug;

use super::error::{BridgeError, ProtocolError};

/// Raw slider positions produced by the UI.
pub const RAW_RANGE: RangeInclusive<i32> = 0..=100;

/// Divisor mapping [`RAW_RANGE`] onto 0.0..=1.0.
pub const SCALE: f64 = 100.0;

pub const DANCE_TOPIC: &str = "robot/dance";

/// Tells the robot to shut down; sent from the gamepad.
pub const QUIT_TOPIC: &str = "robot/quit";

/// The robot's movable parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Actuator {
    RightArm,
    LeftArm,
    RightEye,
    LeftEye,
    NeckLR,
    NeckUD,
    Neck,
}

impl Actuator {
    pub const ALL: [Actuator; 7] = [
        Actuator::RightArm,
        Actuator::LeftArm,
        Actuator::RightEye,
        Actuator::LeftEye,
        Actuator::NeckLR,
        Actuator::NeckUD,
        Actuator::Neck,
    ];

    /// Position in [`Actuator::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Wire name, as used in the topic.
    pub fn name(self) -> &'static str {
        match self {
            Actuator::RightArm => "right_arm",
            Actuator::LeftArm => "left_arm",
            Actuator::RightEye => "right_eye",
            Actuator::LeftEye => "left_eye",
            Actuator::NeckLR => "neck_LR",
            Actuator::NeckUD => "neck_UD",
            Actuator::Neck => "neck",
        }
    }

    pub fn topic(self) -> &'static str {
        match self {
            Actuator::RightArm => "robot/body/right_arm/move",
            Actuator::LeftArm => "robot/body/left_arm/move",
            Actuator::RightEye => "robot/head/right_eye/move",
            Actuator::LeftEye => "robot/head/left_eye/move",
            Actuator::NeckLR => "robot/head/neck_LR/move",
            Actuator::NeckUD => "robot/head/neck_UD/move",
            Actuator::Neck => "robot/body/neck/move",
        }
    }

    /// Slider caption.
    pub fn label(self) -> &'static str {
        match self {
            Actuator::RightArm => "Right arm",
            Actuator::LeftArm => "Left arm",
            Actuator::RightEye => "Right eye",
            Actuator::LeftEye => "Left eye",
            Actuator::NeckLR => "Neck left/right",
            Actuator::NeckUD => "Neck up/down",
            Actuator::Neck => "Neck",
        }
    }
}

impl fmt::Display for Actuator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Maps a raw slider position onto the command magnitude.
pub fn normalize(raw: i32) -> f64 {
    f64::from(raw) / SCALE
}

/// One message to publish. Built per publish call and then dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub topic: &'static str,
    /// ASCII payload; empty for actions
    pub payload: String,
}

impl Command {
    /// Move command: the normalized value rendered with six decimals, e.g. `"0.500000"`.
    pub fn actuator(actuator: Actuator, raw: i32) -> Self {
        Self::position(actuator, normalize(raw))
    }

    /// Move command for an already normalized position in 0.0..=1.0.
    pub fn position(actuator: Actuator, position: f64) -> Self {
        Self {
            topic: actuator.topic(),
            payload: format!("{:.6}", position),
        }
    }

    pub fn dance() -> Self {
        Self {
            topic: DANCE_TOPIC,
            payload: String::new(),
        }
    }

    pub fn quit() -> Self {
        Self {
            topic: QUIT_TOPIC,
            payload: String::new(),
        }
    }
}

/// Anything that can put a [`Command`] on the wire.
///
/// Implementations publish with QoS "at most once" and without the retain
/// flag.
pub trait Publish {
    fn publish(&mut self, command: &Command) -> Result<(), ProtocolError>;
}

/// Publishes commands and keeps count of what went out.
#[derive(Debug, Default)]
pub struct CommandPublisher {
    sent: usize,
    last_sent: Option<DateTime<Local>>,
}

impl CommandPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes the position of one actuator.
    ///
    /// A failure is returned as is: no retry, and the link state is left alone.
    pub fn publish_actuator<P: Publish>(
        &mut self,
        link: &mut P,
        actuator: Actuator,
        raw: i32,
    ) -> Result<(), BridgeError> {
        self.send(link, Command::actuator(actuator, raw))
    }

    /// Publishes a normalized position, as produced by the gamepad.
    pub fn publish_position<P: Publish>(
        &mut self,
        link: &mut P,
        actuator: Actuator,
        position: f64,
    ) -> Result<(), BridgeError> {
        self.send(link, Command::position(actuator, position))
    }

    /// Publishes the dance action (empty payload).
    pub fn publish_dance<P: Publish>(&mut self, link: &mut P) -> Result<(), BridgeError> {
        self.send(link, Command::dance())
    }

    /// Publishes the robot quit action (empty payload).
    pub fn publish_quit<P: Publish>(&mut self, link: &mut P) -> Result<(), BridgeError> {
        self.send(link, Command::quit())
    }

    fn send<P: Publish>(&mut self, link: &mut P, command: Command) -> Result<(), BridgeError> {
        debug!("Publishing {:?} to {}", command.payload, command.topic);
        link.publish(&command)
            .map_err(|source| BridgeError::Publish {
                topic: command.topic.to_string(),
                source,
            })?;
        self.sent += 1;
        self.last_sent = Some(Local::now());
        Ok(())
    }

    /// Number of commands handed to the client successfully.
    pub fn sent(&self) -> usize {
        self.sent
    }

    pub fn last_sent(&self) -> Option<DateTime<Local>> {
        self.last_sent
    }
}
