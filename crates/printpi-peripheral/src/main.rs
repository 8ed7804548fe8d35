//! printpi - fingerprint sensor as a Bluetooth LE peripheral
//!
//! Subcommands:
//! - `printpi ble` - serve the GATT service (requires the `bluez` feature)
//! - `printpi console` - drive the sensor from stdin
//! - `printpi check-config` - print the effective configuration

use anyhow::Result;
use clap::{Parser, Subcommand};
use printpi_capture::{
    CaptureTimings, ControllerHandle, SessionContext, SessionController, TemplateTransport,
};
use printpi_core::PrintpiConfig;
use printpi_hardware::{
    AnySensorDriver, ErrorCatalog, ProcessDriver, ProcessDriverConfig, SensorDriver,
};
use std::path::PathBuf;

#[cfg(feature = "bluez")]
mod ble;
mod console;
mod logging;

#[derive(Parser)]
#[command(name = "printpi")]
#[command(about = "Fingerprint sensor exposed as a Bluetooth LE peripheral")]
#[command(version)]
struct Cli {
    /// Configuration file (default: ./printpi.toml, then /etc/printpi/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log filter, overrides the configured level
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Advertise and serve the fingerprint GATT service
    Ble,

    /// Read commands from stdin and print notifications
    Console,

    /// Print the effective configuration and exit
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut config, sources) = PrintpiConfig::load(cli.config.as_deref())?;
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    logging::init(&config.logging)?;

    match &sources.file {
        Some(path) => tracing::info!(path = %path.display(), "Loaded configuration"),
        None => tracing::info!("No configuration file found, using defaults"),
    }
    if !sources.env_overrides.is_empty() {
        tracing::info!(variables = ?sources.env_overrides, "Applied environment overrides");
    }

    match cli.command {
        Commands::CheckConfig => {
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        Commands::Console => {
            let controller = start_controller(&config).await?;
            console::run(controller).await
        }
        Commands::Ble => run_ble(&config).await,
    }
}

#[cfg(feature = "bluez")]
async fn run_ble(config: &PrintpiConfig) -> Result<()> {
    let controller = start_controller(config).await?;
    ble::run(&config.ble, controller).await
}

#[cfg(not(feature = "bluez"))]
async fn run_ble(_config: &PrintpiConfig) -> Result<()> {
    anyhow::bail!("printpi was built without BLE support, rebuild with `--features bluez`")
}

async fn start_controller(config: &PrintpiConfig) -> Result<ControllerHandle> {
    let driver = ProcessDriver::new(ProcessDriverConfig::from(&config.driver));
    let info = driver.get_device_info().await?;
    tracing::info!(
        name = %info.name,
        model = %info.model,
        executable = ?info.executable,
        "Sensor driver ready"
    );

    let catalog = ErrorCatalog::builtin().with_overrides(&config.catalog);
    let context = SessionContext::new(
        CaptureTimings::from(&config.capture),
        catalog,
        TemplateTransport::from(&config.transport),
    );

    Ok(
        SessionController::new(AnySensorDriver::from(driver), context)
            .with_default_action(config.capture.default_action)
            .start(),
    )
}
