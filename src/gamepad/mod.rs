//! # Gamepad Control
//!
//! A second input source next to the sliders. The left stick steers the part
//! selected by a held button, and the result goes through the same command
//! publisher as the panel controls.
//!
//! ```text
//! gilrs ─► listener thread ─► mpsc ─► StickMapper ─► ControlPanel ─► broker
//! ```
//!
//! - [`listener`]: owns gilrs on its own thread, forwards [`PadEvent`]s
//! - [`mapper`]: button holds, stick to position mapping, change-only output

pub mod listener;
pub mod mapper;

pub use listener::{GamepadError, GamepadListener};
pub use mapper::{to_position, PadAction, PadButton, PadEvent, StickMapper};
