//! gilrs-backed gamepad input on a dedicated thread.
//!
//! The first gamepad seen becomes the active one; events from others are
//! skipped until it disconnects. Relevant events are converted to
//! [`PadEvent`]s and queued for the UI thread, which drains them with
//! [`GamepadListener::try_next`].

use std::thread::{self, JoinHandle};
use std::time::Duration;

use gilrs::{Axis, Button, Event, EventType, GamepadId, Gilrs};
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::mapper::{PadButton, PadEvent};

const POLL_INTERVAL: Duration = Duration::from_millis(5);
const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Error)]
pub enum GamepadError {
    #[error("unable to spawn the gamepad thread: {0}")]
    Spawn(#[source] std::io::Error),
}

pub struct GamepadListener {
    events: mpsc::Receiver<PadEvent>,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl GamepadListener {
    /// Starts listening. `wake` runs after every queued event.
    pub fn spawn<F>(wake: F) -> Result<Self, GamepadError>
    where
        F: Fn() + Send + 'static,
    {
        let (sender, events) = mpsc::channel(EVENT_CAPACITY);
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handle = thread::Builder::new()
            .name("gamepad".into())
            .spawn(move || collect(sender, token, wake))
            .map_err(GamepadError::Spawn)?;

        Ok(Self {
            events,
            cancel,
            handle: Some(handle),
        })
    }

    /// Next queued event, without waiting.
    pub fn try_next(&mut self) -> Option<PadEvent> {
        self.events.try_recv().ok()
    }

    /// False once the thread gave up, e.g. because no gamepad backend exists.
    pub fn is_active(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for GamepadListener {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Gamepad thread panicked");
            }
        }
    }
}

fn collect<F: Fn()>(sender: mpsc::Sender<PadEvent>, cancel: CancellationToken, wake: F) {
    let mut gilrs = match Gilrs::new() {
        Ok(gilrs) => gilrs,
        Err(e) => {
            error!("Failed to initialize gilrs: {}", e);
            return;
        }
    };

    let mut active: Option<GamepadId> = gilrs.gamepads().next().map(|(id, gamepad)| {
        info!("Using gamepad {} ({})", gamepad.name(), id);
        id
    });
    if active.is_none() {
        warn!("No gamepad connected, waiting for one");
    }

    while !cancel.is_cancelled() {
        while let Some(Event { id, event, .. }) = gilrs.next_event() {
            if matches!(event, EventType::Disconnected) {
                if active == Some(id) {
                    info!("Gamepad {} disconnected", id);
                    active = None;
                }
                continue;
            }
            if *active.get_or_insert(id) != id {
                debug!("Skipping event from inactive gamepad {}", id);
                continue;
            }
            let Some(pad_event) = convert(event) else {
                continue;
            };

            match sender.try_send(pad_event) {
                Ok(()) => wake(),
                Err(TrySendError::Full(dropped)) => {
                    warn!("Gamepad queue full, dropping {:?}", dropped)
                }
                Err(TrySendError::Closed(_)) => {
                    debug!("Gamepad receiver gone");
                    return;
                }
            }
        }
        thread::sleep(POLL_INTERVAL);
    }

    debug!("Gamepad thread exiting");
}

fn convert(event: EventType) -> Option<PadEvent> {
    match event {
        EventType::AxisChanged(axis, value, _) => stick_event(axis, value),
        EventType::ButtonPressed(button, _) => pad_button(button).map(PadEvent::Pressed),
        EventType::ButtonReleased(button, _) => pad_button(button).map(PadEvent::Released),
        _ => None,
    }
}

fn stick_event(axis: Axis, value: f32) -> Option<PadEvent> {
    match axis {
        Axis::LeftStickX => Some(PadEvent::StickX(value)),
        // gilrs reports up as positive
        Axis::LeftStickY => Some(PadEvent::StickY(-value)),
        _ => None,
    }
}

fn pad_button(button: Button) -> Option<PadButton> {
    match button {
        Button::South => Some(PadButton::Cross),
        Button::East => Some(PadButton::Circle),
        Button::LeftTrigger2 => Some(PadButton::L2),
        Button::RightTrigger2 => Some(PadButton::R2),
        Button::Select => Some(PadButton::Share),
        _ => None,
    }
}
