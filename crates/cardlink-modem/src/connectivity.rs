//! Connectivity state machine.
//!
//! Each cycle polls the modem's packet-data status, classifies it, and runs
//! the recovery action for that state (see [`crate::status`]). The modem
//! channel is held for the whole poll-classify-act cycle so HTTP exchanges
//! never interleave with recovery commands.
//!
//! Cycles are driven by a periodic timer in [`ConnectivityMachine::run`]; the
//! machine never loops on its own between ticks.
//!
//! # Examples
//!
//! ```
//! use cardlink_modem::connectivity::ConnectivityMachine;
//! use cardlink_modem::devices::SharedModem;
//! use cardlink_modem::mock::MockModem;
//! use cardlink_modem::session::SharedSession;
//! use cardlink_modem::status::RecoveryAction;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> cardlink_modem::Result<()> {
//!     let (modem, handle) = MockModem::new();
//!     handle.script_statuses(["STATE: IP INITIAL"]);
//!
//!     let session = SharedSession::default();
//!     let mut machine = ConnectivityMachine::new(
//!         SharedModem::new(modem),
//!         session.clone(),
//!         Duration::from_secs(1),
//!     );
//!
//!     let report = machine.run_cycle().await?;
//!     assert_eq!(report.action, RecoveryAction::ActivateSession);
//!     assert!(session.snapshot().await.has_ip());
//!     Ok(())
//! }
//! ```

use crate::devices::{AnyModem, SharedModem, acquire_modem, lock_wait};
use crate::error::{ModemError, Result};
use crate::session::SharedSession;
use crate::status::{ConnectivityStatus, RecoveryAction};
use crate::traits::{ModemClient, ModemOp, with_timeout};
use cardlink_core::constants::MAX_CYCLE_HISTORY;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Outcome of one modem command issued by a recovery action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Succeeded,
    Failed(String),
}

/// Record of one poll-classify-act cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// Classified status that drove the cycle.
    pub status: ConnectivityStatus,

    /// Recovery action chosen for the status.
    pub action: RecoveryAction,

    /// Commands issued by the action, in order.
    pub steps: Vec<(ModemOp, StepOutcome)>,

    /// IP address fetched during the cycle, if any.
    pub ip_address: Option<String>,

    pub completed_at: DateTime<Utc>,
}

impl CycleReport {
    fn new(status: ConnectivityStatus, action: RecoveryAction) -> Self {
        Self {
            status,
            action,
            steps: Vec::new(),
            ip_address: None,
            completed_at: Utc::now(),
        }
    }

    /// Commands issued by the action, without outcomes.
    pub fn ops(&self) -> Vec<ModemOp> {
        self.steps.iter().map(|(op, _)| *op).collect()
    }

    /// Whether every issued command succeeded.
    pub fn succeeded(&self) -> bool {
        self.steps
            .iter()
            .all(|(_, outcome)| *outcome == StepOutcome::Succeeded)
    }

    fn record<T>(&mut self, op: ModemOp, result: &Result<T>) -> bool {
        match result {
            Ok(_) => {
                self.steps.push((op, StepOutcome::Succeeded));
                true
            }
            Err(e) => {
                warn!(%op, error = %e, "Recovery step failed");
                self.steps.push((op, StepOutcome::Failed(e.to_string())));
                false
            }
        }
    }
}

/// Poll-classify-act state machine for the packet-data session.
pub struct ConnectivityMachine<M = AnyModem> {
    modem: SharedModem<M>,
    session: SharedSession,
    command_timeout: Duration,
    history: VecDeque<CycleReport>,
}

impl<M: ModemClient> ConnectivityMachine<M> {
    pub fn new(modem: SharedModem<M>, session: SharedSession, command_timeout: Duration) -> Self {
        Self {
            modem,
            session,
            command_timeout,
            history: VecDeque::with_capacity(MAX_CYCLE_HISTORY),
        }
    }

    /// Recent cycle reports, oldest first.
    pub fn history(&self) -> &VecDeque<CycleReport> {
        &self.history
    }

    pub fn last_report(&self) -> Option<&CycleReport> {
        self.history.back()
    }

    /// Run one poll-classify-act cycle.
    ///
    /// A failed poll issues no action. Failed recovery steps are recorded in
    /// the report and do not fail the cycle.
    ///
    /// # Errors
    ///
    /// - [`ModemError::Busy`] if the modem channel could not be acquired
    /// - the poll's own error if the status could not be read
    /// - [`ModemError::SessionDeactivated`] when the session is deactivated;
    ///   the report is still kept in the history
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        let shared = self.modem.clone();
        let mut modem = acquire_modem(&shared, lock_wait(self.command_timeout)).await?;

        let status = with_timeout(
            ModemOp::GetConnectivityStatus,
            self.command_timeout,
            modem.connectivity_status(),
        )
        .await?;

        let recorded = status.clone();
        self.session.update(|s| s.record_status(recorded)).await;

        let action = status.recovery_action();
        debug!(%status, %action, "Connectivity status polled");
        if let ConnectivityStatus::Unrecognized(text) = &status {
            warn!(status = %text, "Unrecognized connectivity status, fetching IP");
        }

        let mut report = CycleReport::new(status, action);
        match action {
            RecoveryAction::ActivateSession => {
                let result = with_timeout(
                    ModemOp::StartSession,
                    self.command_timeout,
                    modem.start_session(),
                )
                .await;
                if report.record(ModemOp::StartSession, &result) {
                    self.fetch_ip(&mut *modem, &mut report).await;
                }
            }
            RecoveryAction::FetchIp => self.fetch_ip(&mut *modem, &mut report).await,
            RecoveryAction::DisconnectThenFetchIp => {
                let result = with_timeout(
                    ModemOp::TcpDisconnect,
                    self.command_timeout,
                    modem.tcp_disconnect(),
                )
                .await;
                if report.record(ModemOp::TcpDisconnect, &result) {
                    self.fetch_ip(&mut *modem, &mut report).await;
                }
            }
            RecoveryAction::Wait | RecoveryAction::Unresolved => {}
        }
        drop(modem);

        report.completed_at = Utc::now();
        self.add_to_history(report.clone());

        if action == RecoveryAction::Unresolved {
            return Err(ModemError::SessionDeactivated);
        }
        Ok(report)
    }

    async fn fetch_ip(&self, modem: &mut M, report: &mut CycleReport) {
        let result = with_timeout(ModemOp::GetIpAddress, self.command_timeout, modem.ip_address()).await;
        if report.record(ModemOp::GetIpAddress, &result)
            && let Ok(ip) = result
        {
            debug!(%ip, "IP address recorded");
            let recorded = ip.clone();
            self.session.update(|s| s.record_ip_address(recorded)).await;
            report.ip_address = Some(ip);
        }
    }

    fn add_to_history(&mut self, report: CycleReport) {
        self.history.push_back(report);
        if self.history.len() > MAX_CYCLE_HISTORY {
            self.history.pop_front();
        }
    }

    /// Run a cycle on every tick of `poll_interval`, forever.
    ///
    /// Cycle errors are logged once each; none of them stop the loop.
    pub async fn run(&mut self, poll_interval: Duration) {
        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_ms = poll_interval.as_millis() as u64, "Connectivity machine started");

        loop {
            ticker.tick().await;
            match self.run_cycle().await {
                Ok(report) => debug!(
                    status = %report.status,
                    action = %report.action,
                    succeeded = report.succeeded(),
                    "Connectivity cycle complete"
                ),
                Err(ModemError::SessionDeactivated) => {
                    error!("Packet-data session deactivated, no recovery defined; intervention required")
                }
                Err(e) => warn!(error = %e, "Connectivity cycle failed"),
            }
        }
    }
}
