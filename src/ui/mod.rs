//! # Panel Window
//!
//! egui front-end for the [`ControlPanel`]. It owns widget state only (the
//! address text, slider positions, the notification on screen) and forwards
//! every user action to the panel.
//!
//! ## Layout
//! - **Top**: address field; Enter submits it
//! - **Center**: one slider per actuator and the dance button, enabled only
//!   while connected
//! - **Bottom**: connection indicator, commands sent, time of the last one,
//!   quit button
//!
//! Notifications returned by the panel are shown in a modal until dismissed.
//!
//! Gamepad events are drained once per frame and applied like slider moves,
//! moving the matching slider along. They are dropped while disconnected.

pub mod common;

use std::path::PathBuf;
use std::time::Duration;

use eframe::egui::{self, Button, Key, Modal, RichText, Slider, TextEdit};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::config::Config;
use crate::gamepad::{GamepadListener, PadAction, StickMapper};
use crate::mqtt::client::MqttClient;
use crate::mqtt::command::{Actuator, RAW_RANGE, SCALE};
use crate::mqtt::connection::ConnectionState;
use crate::panel::ControlPanel;
use crate::report::Notification;

use self::common::{group_frame, UiColors};

pub struct PanelUI {
    /// `None` once the panel has been shut down
    panel: Option<ControlPanel<MqttClient>>,
    state_rx: watch::Receiver<ConnectionState>,
    config: Config,
    config_path: PathBuf,
    address_text: String,
    /// Slider positions, in `Actuator::ALL` order
    positions: [i32; Actuator::ALL.len()],
    notification: Option<Notification>,
    /// `None` when disabled, unavailable or released from the pad
    gamepad: Option<GamepadListener>,
    sticks: StickMapper,
}

impl PanelUI {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        panel: ControlPanel<MqttClient>,
        config: Config,
        config_path: PathBuf,
    ) -> Self {
        cc.egui_ctx.set_theme(egui::Theme::Dark);
        let state_rx = panel.subscribe();
        let address_text = config.last_address.clone().unwrap_or_default();
        let gamepad = if config.gamepad {
            let ctx = cc.egui_ctx.clone();
            match GamepadListener::spawn(move || ctx.request_repaint()) {
                Ok(listener) => Some(listener),
                Err(e) => {
                    warn!("Gamepad control unavailable: {}", e);
                    None
                }
            }
        } else {
            None
        };
        Self {
            panel: Some(panel),
            state_rx,
            config,
            config_path,
            address_text,
            positions: [*RAW_RANGE.start(); Actuator::ALL.len()],
            notification: None,
            gamepad,
            sticks: StickMapper::new(),
        }
    }

    fn connected(&self) -> bool {
        *self.state_rx.borrow() == ConnectionState::Connected
    }

    fn show(&mut self, notification: Option<Notification>) {
        if notification.is_some() {
            self.notification = notification;
        }
    }

    fn submit_address(&mut self) {
        let Some(panel) = self.panel.as_mut() else {
            return;
        };
        let notification = panel.submit_address(&self.address_text);
        if let Some(address) = panel.address() {
            self.config.last_address = Some(address.to_string());
        }
        self.show(notification);
    }

    fn poll_gamepad(&mut self) {
        let Some(listener) = self.gamepad.as_mut() else {
            return;
        };
        let mut actions = Vec::new();
        while let Some(event) = listener.try_next() {
            actions.extend(self.sticks.handle(event));
        }
        if actions.is_empty() {
            return;
        }

        let connected = self.connected();
        let Some(panel) = self.panel.as_mut() else {
            return;
        };
        let mut notification = None;
        let mut release = false;
        for action in actions {
            match action {
                PadAction::Move { actuator, position } if connected => {
                    self.positions[actuator.index()] = (position * SCALE).round() as i32;
                    notification = panel.move_to(actuator, position).or(notification);
                }
                PadAction::Move { .. } => {}
                PadAction::QuitRobot => {
                    if connected {
                        notification = panel.quit_robot().or(notification);
                    }
                    release = true;
                    break;
                }
                PadAction::Release => {
                    release = true;
                    break;
                }
            }
        }

        if !connected {
            self.sticks.forget_positions();
        }
        if release {
            info!("Gamepad control ended");
            self.gamepad = None;
        }
        self.show(notification);
    }

    /// Shuts the panel down and persists the configuration. Safe to call twice.
    fn quit(&mut self) {
        self.gamepad = None;
        if let Some(panel) = self.panel.take() {
            info!("Shutting down control panel");
            panel.shutdown();
            if let Err(e) = self.config.save(&self.config_path) {
                warn!("Configuration not saved: {}", e);
            }
        }
    }

    fn address_row(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label("Robot address:");
            let response = ui.add(
                TextEdit::singleline(&mut self.address_text)
                    .hint_text("192.168.1.5")
                    .desired_width(200.0),
            );
            if response.lost_focus() && ui.input(|i| i.key_pressed(Key::Enter)) {
                self.submit_address();
            }
        });
    }

    fn controls(&mut self, ui: &mut egui::Ui) {
        let enabled = self.connected();
        let mut moved = Vec::new();

        group_frame().show(ui, |ui| {
            for (actuator, position) in Actuator::ALL.iter().zip(self.positions.iter_mut()) {
                let slider = Slider::new(position, RAW_RANGE).text(actuator.label());
                if ui.add_enabled(enabled, slider).changed() {
                    moved.push((*actuator, *position));
                }
            }
        });

        let Some(panel) = self.panel.as_mut() else {
            return;
        };
        let mut notification = None;
        for (actuator, raw) in moved {
            notification = panel.move_actuator(actuator, raw).or(notification);
        }

        ui.add_space(8.0);
        let dance = Button::new("Dance").min_size(egui::vec2(120.0, 28.0));
        if ui.add_enabled(enabled, dance).clicked() {
            notification = panel.dance().or(notification);
        }
        self.show(notification);
    }

    fn status_bar(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        let color = if self.connected() {
            UiColors::ACTIVE
        } else {
            UiColors::INACTIVE
        };
        ui.horizontal(|ui| {
            ui.colored_label(color, "\u{2B24}");
            if let Some(panel) = self.panel.as_ref() {
                match panel.address() {
                    Some(address) => ui.label(address.to_string()),
                    None => ui.label("not connected"),
                };
                ui.label(format!("Sent: {}", panel.commands_sent()));
                if self.gamepad.as_ref().is_some_and(|g| g.is_active()) {
                    ui.colored_label(UiColors::ACTIVE, "Gamepad");
                }
                if let Some(last) = panel.last_sent() {
                    ui.label(format!("Last: {}", last.format("%H:%M:%S")));
                }
            }
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("Quit").clicked() {
                    self.quit();
                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                }
            });
        });
    }

    fn notification_modal(&mut self, ctx: &egui::Context) {
        let Some(notification) = self.notification.as_ref() else {
            return;
        };
        let title = self.config.client_id.clone();
        let mut dismissed = false;

        let response = Modal::new(egui::Id::new("notification")).show(ctx, |ui| {
            ui.set_width(320.0);
            ui.heading(title);
            ui.add_space(6.0);
            let text = RichText::new(&notification.text);
            if notification.is_error() {
                ui.label(text.color(UiColors::ERROR));
            } else {
                ui.label(text);
            }
            ui.add_space(6.0);
            if ui.button("OK").clicked() {
                dismissed = true;
            }
        });

        if dismissed || response.should_close() {
            self.notification = None;
        }
    }
}

impl eframe::App for PanelUI {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.request_repaint_after(Duration::from_millis(100));

        if ctx.input(|i| i.viewport().close_requested()) {
            self.quit();
        }

        self.poll_gamepad();

        egui::TopBottomPanel::top("address_panel").show(ctx, |ui| {
            ui.add_space(4.0);
            self.address_row(ui);
            ui.add_space(4.0);
        });

        egui::TopBottomPanel::bottom("status_panel").show(ctx, |ui| {
            self.status_bar(ui, ctx);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.controls(ui);
        });

        self.notification_modal(ctx);
    }
}

impl Drop for PanelUI {
    fn drop(&mut self) {
        self.quit();
    }
}
