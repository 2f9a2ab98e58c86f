//! Boot orchestrator and the running-terminal handle.
//!
//! [`boot`] runs exactly once. It blanks the display, allocates the shared
//! locks, probes the modem, reads the operator, reconciles the APN, creates the card channel
//! and spawns the three long-running units:
//!
//! 1. the connectivity machine, on a periodic timer
//! 2. the card-read producer
//! 3. the HTTP request consumer
//!
//! Nothing in the sequence is fatal except an invalid configuration; a
//! display that cannot be blanked, a silent modem or an unknown operator only
//! produce warnings.
//!
//! # Examples
//!
//! ```no_run
//! use cardlink_core::TerminalConfig;
//! use cardlink_hardware::{AnyCardReader, AnyDisplay};
//! use cardlink_hardware::mock::{MockCardReader, MockDisplay};
//! use cardlink_modem::AnyModem;
//! use cardlink_modem::mock::MockModem;
//! use cardlink_terminal::{TerminalDevices, boot};
//!
//! #[tokio::main]
//! async fn main() -> cardlink_terminal::Result<()> {
//!     let (modem, _modem_handle) = MockModem::new();
//!     let (reader, _reader_handle) = MockCardReader::new();
//!     let (display, _display_handle) = MockDisplay::new();
//!
//!     let devices = TerminalDevices {
//!         modem: AnyModem::Mock(modem),
//!         reader: AnyCardReader::Mock(reader),
//!         display: AnyDisplay::Mock(display),
//!     };
//!
//!     let terminal = boot(&TerminalConfig::default(), devices).await?;
//!     terminal.shutdown().await?;
//!     Ok(())
//! }
//! ```

use crate::consumer::{ConsumerSettings, HttpConsumer};
use crate::error::Result;
use crate::producer::CardProducer;
use cardlink_core::TerminalConfig;
use cardlink_hardware::{AnyCardReader, AnyDisplay, CardReaderDevice, DisplayDevice, SharedDevice};
use cardlink_modem::{
    AnyModem, ApnReconciler, ApnReconciliation, ConnectivityMachine, ModemClient, ModemOp,
    OperatorApnTable, SharedModem, SharedSession, acquire_modem, lock_wait, with_timeout,
};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Concrete devices the terminal runs on.
#[derive(Debug)]
pub struct TerminalDevices {
    pub modem: AnyModem,
    pub reader: AnyCardReader,
    pub display: AnyDisplay,
}

/// What the boot sequence found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootReport {
    pub probe_attempts: u8,

    /// Probes the modem answered.
    pub probes_answered: u8,

    /// Operator name, lowercased; `None` if it could not be read.
    pub operator: Option<String>,

    pub apn: ApnReconciliation,
}

/// Probe the modem `attempts` times, returning how many probes it answered.
///
/// Every probe runs regardless of earlier results, without backoff.
pub async fn probe_modem<M: ModemClient>(modem: &mut M, attempts: u8, timeout: Duration) -> u8 {
    let mut answered = 0;
    for attempt in 1..=attempts {
        match with_timeout(ModemOp::Ping, timeout, modem.ping()).await {
            Ok(()) => {
                answered += 1;
                debug!(attempt, "Modem answered ping");
            }
            Err(e) => warn!(attempt, error = %e, "Modem ping failed"),
        }
    }

    if answered == 0 {
        warn!(attempts, "Modem answered no ping, continuing best-effort");
    } else {
        info!(answered, attempts, "Modem probed");
    }
    answered
}

/// Read the registered operator name, lowercased.
pub async fn read_operator<M: ModemClient>(modem: &mut M, timeout: Duration) -> Option<String> {
    match with_timeout(ModemOp::GetOperatorName, timeout, modem.operator_name()).await {
        Ok(name) => {
            let name = name.trim().to_lowercase();
            info!(operator = %name, "Operator name read");
            Some(name)
        }
        Err(e) => {
            warn!(error = %e, "Reading operator name failed");
            None
        }
    }
}

/// Run the boot sequence and start the terminal.
///
/// Must be called from within a Tokio runtime.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the modem channel
/// cannot be acquired.
pub async fn boot(config: &TerminalConfig, mut devices: TerminalDevices) -> Result<TerminalHandle> {
    config.validate()?;

    for (role, info) in [
        ("card reader", devices.reader.get_info().await),
        ("display", devices.display.get_info().await),
    ] {
        match info {
            Ok(info) => info!(
                role,
                name = %info.name,
                model = %info.model,
                firmware = info.firmware_version.as_deref().unwrap_or("unknown"),
                "Device attached"
            ),
            Err(e) => warn!(role, error = %e, "Device info unavailable"),
        }
    }

    if let Err(e) = devices.display.clear().await {
        warn!(error = %e, "Blanking display failed");
    }

    let command_timeout = config.modem.command_timeout();
    let session = SharedSession::default();
    let modem = SharedModem::new(devices.modem);
    let reader = SharedDevice::new("card reader", devices.reader);
    let display = SharedDevice::new("display", devices.display);
    debug!("Session, modem, card reader and display locks allocated");

    let report = {
        let mut guard = acquire_modem(&modem, lock_wait(command_timeout)).await?;
        let attempts = config.modem.probe_attempts;
        let probes_answered = probe_modem(&mut *guard, attempts, command_timeout).await;

        let operator = read_operator(&mut *guard, command_timeout).await;
        if let Some(name) = &operator {
            let name = name.clone();
            session.update(|s| s.record_operator(name)).await;
        }

        let reconciler = ApnReconciler::new(
            OperatorApnTable::from_entries(&config.apn.table),
            command_timeout,
        );
        let apn = reconciler
            .reconcile(&mut *guard, &session, operator.as_deref())
            .await;

        BootReport {
            probe_attempts: attempts,
            probes_answered,
            operator,
            apn,
        }
    };

    if report.apn.is_warning() {
        warn!(outcome = ?report.apn, "APN not confirmed, continuing with best-effort connectivity");
    }

    let (tx, rx) = mpsc::channel(config.reader.channel_capacity);
    let mut tasks: JoinSet<Result<()>> = JoinSet::new();

    let mut machine = ConnectivityMachine::new(modem.clone(), session.clone(), command_timeout);
    let poll_interval = config.modem.poll_interval();
    tasks.spawn(async move {
        machine.run(poll_interval).await;
        Ok(())
    });

    let read_timeout = config.reader.read_timeout();
    tasks.spawn(CardProducer::new(reader.clone(), tx, read_timeout).run());

    let settings = ConsumerSettings {
        url: config.http.url.clone(),
        base_path: config.http.base_path.clone(),
        receive_timeout: config.http.receive_timeout(),
        command_timeout,
        device_lock_wait: read_timeout,
    };
    tasks.spawn(HttpConsumer::new(modem, reader, display, session.clone(), rx, settings).run());

    info!(
        capacity = config.reader.channel_capacity,
        "Boot complete, all units running"
    );

    Ok(TerminalHandle {
        session,
        report,
        tasks,
    })
}

/// Running terminal.
pub struct TerminalHandle {
    session: SharedSession,
    report: BootReport,
    tasks: JoinSet<Result<()>>,
}

impl TerminalHandle {
    /// Shared session record, for inspection.
    pub fn session(&self) -> SharedSession {
        self.session.clone()
    }

    pub fn boot_report(&self) -> &BootReport {
        &self.report
    }

    /// Stop all units and wait for them to terminate.
    ///
    /// Unit errors and panics are logged; shutdown itself does not fail on
    /// them.
    pub async fn shutdown(mut self) -> Result<()> {
        self.tasks.abort_all();

        let mut error_count = 0;
        let mut panic_count = 0;

        while let Some(result) = self.tasks.join_next().await {
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error_count += 1;
                    warn!(error = %e, "Unit ended with an error");
                }
                Err(e) if e.is_cancelled() => {}
                Err(e) => {
                    panic_count += 1;
                    error!(error = %e, "Unit panicked");
                }
            }
        }

        info!(error_count, panic_count, "Terminal stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardlink_modem::mock::MockModem;

    #[tokio::test]
    async fn test_probe_runs_every_attempt() {
        let (mut modem, handle) = MockModem::new();
        handle.fail_next(ModemOp::Ping, 3);

        let answered = probe_modem(&mut modem, 8, Duration::from_millis(100)).await;
        assert_eq!(answered, 5);
        assert_eq!(handle.count(ModemOp::Ping), 8);
    }

    #[tokio::test]
    async fn test_probe_silent_modem_is_not_fatal() {
        let (mut modem, handle) = MockModem::new();
        handle.fail_always(ModemOp::Ping);

        assert_eq!(probe_modem(&mut modem, 8, Duration::from_millis(100)).await, 0);
        assert_eq!(handle.count(ModemOp::Ping), 8);
    }

    #[tokio::test]
    async fn test_read_operator_lowercases() {
        let (mut modem, handle) = MockModem::new();
        handle.set_operator(Some("  Vodafone IN "));

        let operator = read_operator(&mut modem, Duration::from_millis(100)).await;
        assert_eq!(operator.as_deref(), Some("vodafone in"));
    }

    #[tokio::test]
    async fn test_read_operator_failure() {
        let (mut modem, handle) = MockModem::new();
        handle.set_operator(None);

        assert!(read_operator(&mut modem, Duration::from_millis(100)).await.is_none());
    }
}
