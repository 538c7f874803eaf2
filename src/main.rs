use color_eyre::{eyre::eyre, Result};
use eframe::egui;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use walle_panel::config::Config;
use walle_panel::mqtt::MqttClient;
use walle_panel::panel::ControlPanel;
use walle_panel::ui::PanelUI;

fn main() -> Result<()> {
    setup()?;

    let config_path = Config::default_path();
    let loaded = Config::load_or_create(&config_path);
    let config = loaded.as_ref().cloned().unwrap_or_default();
    setup_logging(config.log_level());
    if let Err(e) = &loaded {
        warn!("Using default configuration: {}", e);
    }

    info!("Initializing broker client as {}", config.client_id);
    let client = MqttClient::new(config.client_settings());
    let panel = ControlPanel::initialize(client);

    let title = config.client_id.clone();
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(title.clone())
            .with_inner_size([460.0, 420.0]),
        ..Default::default()
    };

    info!("Starting control panel UI");
    eframe::run_native(
        &title,
        native_options,
        Box::new(move |cc| Ok(Box::new(PanelUI::new(cc, panel, config, config_path)))),
    )
    .map_err(|e| eyre!("Control panel window failed: {}", e))?;

    info!("Control panel closed");
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    Ok(())
}

fn setup_logging(level: Level) {
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
