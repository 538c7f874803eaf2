//! Shared styling for the panel window.

use egui::{Color32, Frame, Stroke};

/// Dark theme palette.
pub struct UiColors;

impl UiColors {
    /// Background of grouped controls (RGB: 25, 25, 25)
    pub const INNER_BG: Color32 = Color32::from_rgb(25, 25, 25);

    /// Border color for component separation (RGB: 60, 60, 60)
    pub const BORDER: Color32 = Color32::from_rgb(60, 60, 60);

    /// Connected indicator (RGB: 50, 200, 20) - Green
    pub const ACTIVE: Color32 = Color32::from_rgb(50, 200, 20);

    /// Disconnected indicator (RGB: 200, 50, 20) - Red
    pub const INACTIVE: Color32 = Color32::from_rgb(200, 50, 20);

    /// Error text in notifications
    pub const ERROR: Color32 = Color32::from_rgb(230, 80, 60);
}

/// Frame around a group of controls.
pub fn group_frame() -> Frame {
    Frame::new()
        .stroke(Stroke::new(1.0, UiColors::BORDER))
        .fill(UiColors::INNER_BG)
        .inner_margin(8.0)
        .outer_margin(2.0)
}
