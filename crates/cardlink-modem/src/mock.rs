//! Mock modem implementation for testing and simulation.
//!
//! [`MockModem`] answers every [`ModemClient`] operation from in-memory state
//! that tests (or the simulated terminal) control through a
//! [`MockModemHandle`]. Operations are recorded so tests can assert the
//! exact command sequence a component issued. The log keeps the most recent
//! [`MAX_RECORDED_CALLS`] entries.
//!
//! Without scripting, the mock behaves like a well-mannered SIM800-class
//! modem: activating the session moves it to `IP GPRSACT`, reading the IP
//! moves it to `IP STATUS`, an HTTP GET leaves it in `CONNECT OK` and a
//! disconnect leaves it in `TCP CLOSED`.
//!
//! # Examples
//!
//! ```
//! use cardlink_modem::mock::MockModem;
//! use cardlink_modem::status::ConnectivityStatus;
//! use cardlink_modem::traits::{ModemClient, ModemOp};
//!
//! #[tokio::main]
//! async fn main() -> cardlink_modem::Result<()> {
//!     let (mut modem, handle) = MockModem::new();
//!     handle.script_statuses(["STATE: CONNECT OK"]);
//!
//!     let status = modem.connectivity_status().await?;
//!     assert_eq!(status, ConnectivityStatus::ConnectionEstablished);
//!     assert_eq!(handle.ops(), vec![ModemOp::GetConnectivityStatus]);
//!     Ok(())
//! }
//! ```

use crate::error::{ModemError, Result};
use crate::status::ConnectivityStatus;
use crate::traits::{ModemClient, ModemOp};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Number of calls kept in the mock's call log.
pub const MAX_RECORDED_CALLS: usize = 1024;

/// Default payload returned by `http_read_response`.
pub const DEFAULT_HTTP_RESPONSE: &str = r#"{"id":18,"created_at":"2015-04-27T12:55:06.337Z","updated_at":"2015-04-28T02:45:33.063Z","amount":1000,"card":"1A2643","name":"person2"}"#;

/// One recorded modem operation with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModemCall {
    Ping,
    GetOperatorName,
    GetAccessPoint,
    SetAccessPoint(String),
    GetConnectivityStatus,
    StartSession,
    GetIpAddress,
    TcpDisconnect,
    HttpGet { url: String, path: String },
    HttpReadResponse,
}

impl ModemCall {
    pub fn op(&self) -> ModemOp {
        match self {
            Self::Ping => ModemOp::Ping,
            Self::GetOperatorName => ModemOp::GetOperatorName,
            Self::GetAccessPoint => ModemOp::GetAccessPoint,
            Self::SetAccessPoint(_) => ModemOp::SetAccessPoint,
            Self::GetConnectivityStatus => ModemOp::GetConnectivityStatus,
            Self::StartSession => ModemOp::StartSession,
            Self::GetIpAddress => ModemOp::GetIpAddress,
            Self::TcpDisconnect => ModemOp::TcpDisconnect,
            Self::HttpGet { .. } => ModemOp::HttpGet,
            Self::HttpReadResponse => ModemOp::HttpReadResponse,
        }
    }
}

#[derive(Debug)]
struct MockModemState {
    calls: VecDeque<ModemCall>,
    operator: Option<String>,
    access_point: String,
    ignore_apn_writes: bool,
    scripted_statuses: VecDeque<String>,
    status_text: String,
    ip_address: String,
    http_response: String,
    failures: HashMap<ModemOp, u32>,
    latency: Duration,
}

impl Default for MockModemState {
    fn default() -> Self {
        Self {
            calls: VecDeque::with_capacity(MAX_RECORDED_CALLS),
            operator: Some("AIRTEL INDIA".to_string()),
            access_point: String::new(),
            ignore_apn_writes: false,
            scripted_statuses: VecDeque::new(),
            status_text: "STATE: IP INITIAL".to_string(),
            ip_address: "10.170.4.21".to_string(),
            http_response: DEFAULT_HTTP_RESPONSE.to_string(),
            failures: HashMap::new(),
            latency: Duration::ZERO,
        }
    }
}

fn lock(state: &Mutex<MockModemState>) -> MutexGuard<'_, MockModemState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Mock modem for testing and simulation.
#[derive(Debug)]
pub struct MockModem {
    state: Arc<Mutex<MockModemState>>,
}

impl MockModem {
    /// Create a new mock modem and the handle controlling it.
    pub fn new() -> (Self, MockModemHandle) {
        let state = Arc::new(Mutex::new(MockModemState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            MockModemHandle { state },
        )
    }

    /// Record the call, apply latency, and consume an injected failure.
    async fn begin(&self, call: ModemCall) -> Result<()> {
        let op = call.op();
        let latency = {
            let mut state = lock(&self.state);
            state.calls.push_back(call);
            if state.calls.len() > MAX_RECORDED_CALLS {
                state.calls.pop_front();
            }
            state.latency
        };

        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let mut state = lock(&self.state);
        if let Some(remaining) = state.failures.get_mut(&op)
            && *remaining > 0
        {
            if *remaining != u32::MAX {
                *remaining -= 1;
            }
            return Err(ModemError::command_failed(op, "ERROR"));
        }
        Ok(())
    }
}

impl Default for MockModem {
    fn default() -> Self {
        Self::new().0
    }
}

impl ModemClient for MockModem {
    async fn ping(&mut self) -> Result<()> {
        self.begin(ModemCall::Ping).await
    }

    async fn operator_name(&mut self) -> Result<String> {
        self.begin(ModemCall::GetOperatorName).await?;
        lock(&self.state)
            .operator
            .clone()
            .ok_or_else(|| ModemError::invalid_response(ModemOp::GetOperatorName, "not registered"))
    }

    async fn access_point(&mut self) -> Result<String> {
        self.begin(ModemCall::GetAccessPoint).await?;
        Ok(lock(&self.state).access_point.clone())
    }

    async fn set_access_point(&mut self, apn: &str) -> Result<()> {
        self.begin(ModemCall::SetAccessPoint(apn.to_string())).await?;
        let mut state = lock(&self.state);
        if !state.ignore_apn_writes {
            state.access_point = apn.to_string();
        }
        Ok(())
    }

    async fn connectivity_status(&mut self) -> Result<ConnectivityStatus> {
        self.begin(ModemCall::GetConnectivityStatus).await?;
        let mut state = lock(&self.state);
        let text = match state.scripted_statuses.pop_front() {
            Some(text) => text,
            None => state.status_text.clone(),
        };
        Ok(ConnectivityStatus::classify(&text))
    }

    async fn start_session(&mut self) -> Result<()> {
        self.begin(ModemCall::StartSession).await?;
        lock(&self.state).status_text = "STATE: IP GPRSACT".to_string();
        Ok(())
    }

    async fn ip_address(&mut self) -> Result<String> {
        self.begin(ModemCall::GetIpAddress).await?;
        let mut state = lock(&self.state);
        if state.status_text.ends_with("IP GPRSACT") {
            state.status_text = "STATE: IP STATUS".to_string();
        }
        Ok(state.ip_address.clone())
    }

    async fn tcp_disconnect(&mut self) -> Result<()> {
        self.begin(ModemCall::TcpDisconnect).await?;
        lock(&self.state).status_text = "STATE: TCP CLOSED".to_string();
        Ok(())
    }

    async fn http_get(&mut self, url: &str, path: &str) -> Result<()> {
        self.begin(ModemCall::HttpGet {
            url: url.to_string(),
            path: path.to_string(),
        })
        .await?;
        lock(&self.state).status_text = "STATE: CONNECT OK".to_string();
        Ok(())
    }

    async fn http_read_response(&mut self) -> Result<String> {
        self.begin(ModemCall::HttpReadResponse).await?;
        Ok(lock(&self.state).http_response.clone())
    }
}

/// Handle for controlling a mock modem and inspecting its call log.
///
/// Clones share the same modem state.
#[derive(Debug, Clone)]
pub struct MockModemHandle {
    state: Arc<Mutex<MockModemState>>,
}

impl MockModemHandle {
    /// Operator name reported by the modem; `None` simulates no registration.
    pub fn set_operator(&self, operator: Option<&str>) {
        lock(&self.state).operator = operator.map(str::to_string);
    }

    /// APN currently configured on the modem.
    pub fn set_access_point(&self, apn: &str) {
        lock(&self.state).access_point = apn.to_string();
    }

    /// Accept APN writes without applying them.
    pub fn ignore_apn_writes(&self, ignore: bool) {
        lock(&self.state).ignore_apn_writes = ignore;
    }

    /// Queue raw status reports returned by the next status polls, in order.
    pub fn script_statuses<S: Into<String>>(&self, statuses: impl IntoIterator<Item = S>) {
        lock(&self.state)
            .scripted_statuses
            .extend(statuses.into_iter().map(Into::into));
    }

    /// Raw status report returned once the script is exhausted.
    pub fn set_status(&self, status: &str) {
        lock(&self.state).status_text = status.to_string();
    }

    pub fn set_ip_address(&self, ip: &str) {
        lock(&self.state).ip_address = ip.to_string();
    }

    pub fn set_http_response(&self, payload: &str) {
        lock(&self.state).http_response = payload.to_string();
    }

    /// Make the next `times` calls of `op` fail.
    pub fn fail_next(&self, op: ModemOp, times: u32) {
        lock(&self.state).failures.insert(op, times);
    }

    /// Make every call of `op` fail until cleared.
    pub fn fail_always(&self, op: ModemOp) {
        self.fail_next(op, u32::MAX);
    }

    pub fn clear_failures(&self) {
        lock(&self.state).failures.clear();
    }

    /// Delay applied to every operation before it answers.
    pub fn set_latency(&self, latency: Duration) {
        lock(&self.state).latency = latency;
    }

    /// Recorded calls, oldest first.
    pub fn calls(&self) -> Vec<ModemCall> {
        lock(&self.state).calls.iter().cloned().collect()
    }

    /// Recorded operations without arguments, oldest first.
    pub fn ops(&self) -> Vec<ModemOp> {
        lock(&self.state).calls.iter().map(ModemCall::op).collect()
    }

    /// Number of recorded calls of `op`.
    pub fn count(&self, op: ModemOp) -> usize {
        lock(&self.state)
            .calls
            .iter()
            .filter(|call| call.op() == op)
            .count()
    }
}
