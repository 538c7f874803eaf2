//! Turns gamepad input into actuator moves.
//!
//! | Held   | Stick axis | Actuator        | Position                  |
//! |--------|------------|-----------------|---------------------------|
//! | Circle | X          | neck left/right | `(x + 1) / 2`             |
//! | L2     | Y          | left arm        | `1 - (y + 1) / 2`         |
//! | R2     | Y          | right arm       | `1 - (y + 1) / 2`         |
//!
//! L2 wins over R2 when both are held. Positions are clamped to 0.0..=1.0 and
//! a position equal to the last one sent for that actuator is dropped.
//! Releasing Cross asks the robot to quit and ends gamepad control; releasing
//! Share only ends gamepad control.

use tracing::debug;

use crate::mqtt::command::Actuator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PadButton {
    Cross,
    Circle,
    L2,
    R2,
    Share,
}

/// Gamepad input, detached from the backend that produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PadEvent {
    /// Left stick X, -1.0 (left) to 1.0 (right)
    StickX(f32),
    /// Left stick Y, -1.0 (up) to 1.0 (down)
    StickY(f32),
    Pressed(PadButton),
    Released(PadButton),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PadAction {
    Move { actuator: Actuator, position: f64 },
    /// Publish the robot quit command, then stop listening
    QuitRobot,
    /// Stop listening
    Release,
}

/// Maps a stick deflection in -1.0..=1.0 onto 0.0..=1.0.
pub fn to_position(value: f32) -> f64 {
    ((f64::from(value) + 1.0) / 2.0).clamp(0.0, 1.0)
}

#[derive(Debug, Default)]
pub struct StickMapper {
    neck: bool,
    left_arm: bool,
    right_arm: bool,
    /// Last position handed out per actuator, in `Actuator::ALL` order
    last: [Option<f64>; Actuator::ALL.len()],
}

impl StickMapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&mut self, event: PadEvent) -> Option<PadAction> {
        match event {
            PadEvent::StickX(x) if self.neck => self.moved(Actuator::NeckLR, to_position(x)),
            PadEvent::StickY(y) if self.left_arm => {
                self.moved(Actuator::LeftArm, 1.0 - to_position(y))
            }
            PadEvent::StickY(y) if self.right_arm => {
                self.moved(Actuator::RightArm, 1.0 - to_position(y))
            }
            PadEvent::StickX(_) | PadEvent::StickY(_) => None,
            PadEvent::Pressed(button) => {
                self.hold(button, true);
                None
            }
            PadEvent::Released(PadButton::Cross) => Some(PadAction::QuitRobot),
            PadEvent::Released(PadButton::Share) => Some(PadAction::Release),
            PadEvent::Released(button) => {
                self.hold(button, false);
                None
            }
        }
    }

    /// Forgets what was sent, so the next move of every actuator goes out again.
    pub fn forget_positions(&mut self) {
        self.last = Default::default();
    }

    fn hold(&mut self, button: PadButton, held: bool) {
        match button {
            PadButton::Circle => self.neck = held,
            PadButton::L2 => self.left_arm = held,
            PadButton::R2 => self.right_arm = held,
            PadButton::Cross | PadButton::Share => {}
        }
    }

    fn moved(&mut self, actuator: Actuator, position: f64) -> Option<PadAction> {
        let last = &mut self.last[actuator.index()];
        if *last == Some(position) {
            debug!("{} already at {:.6}", actuator, position);
            return None;
        }
        *last = Some(position);
        Some(PadAction::Move { actuator, position })
    }
}
