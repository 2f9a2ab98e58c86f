//! Card validation terminal on simulated devices.
//!
//! Boots the terminal against the mock modem, card reader and display. Each
//! line typed on stdin is a card scan: a 6-character line is presented as a
//! well-formed frame, anything else is fed to the reader as raw bytes.

use anyhow::Context;
use cardlink_core::{CardId, TerminalConfig};
use cardlink_hardware::mock::{MockCardReader, MockCardReaderHandle, MockDisplay};
use cardlink_hardware::{AnyCardReader, AnyDisplay};
use cardlink_modem::AnyModem;
use cardlink_modem::mock::MockModem;
use cardlink_terminal::{TerminalDevices, boot};
use clap::Parser;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cardlink")]
#[command(about = "GPRS card validation terminal on simulated devices")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "cardlink.toml")]
    config: PathBuf,

    /// Operator name the simulated modem reports
    #[arg(long, default_value = "AIRTEL INDIA")]
    operator: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = TerminalConfig::load(&cli.config).unwrap_or_else(|e| {
        eprintln!("Warning: Failed to load config from {:?}: {}", cli.config, e);
        eprintln!("Using default configuration");
        TerminalConfig::default()
    });

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    info!("cardlink v{}", cardlink_core::VERSION);

    let (modem, modem_handle) = MockModem::new();
    modem_handle.set_operator(Some(&cli.operator));
    let (reader, reader_handle) = MockCardReader::new();
    let (display, _display_handle) = MockDisplay::new();

    let devices = TerminalDevices {
        modem: AnyModem::Mock(modem),
        reader: AnyCardReader::Mock(reader),
        display: AnyDisplay::Mock(display),
    };
    let terminal = boot(&config, devices).await.context("boot failed")?;

    tokio::spawn(async move {
        if let Err(e) = feed_scans(reader_handle).await {
            error!("Scan input failed: {}", e);
        }
    });

    info!("Terminal running. Type card ids, Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;
    info!("Shutting down...");

    terminal.shutdown().await?;
    Ok(())
}

/// Forward stdin lines to the simulated card reader.
async fn feed_scans(reader: MockCardReaderHandle) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match line.parse::<CardId>() {
            Ok(card) => reader.present_card(&card).await?,
            Err(e) => {
                warn!(input = line, error = %e, "Not a card id, feeding raw bytes");
                reader.feed(line.as_bytes().to_vec()).await?;
            }
        }
    }

    info!("Scan input closed");
    Ok(())
}
