//! Modem command collaborator interface.
//!
//! The terminal never touches modem bytes. It talks to the modem through
//! [`ModemClient`], where each method sends one AT operation and parses one
//! structured reply. How commands are framed and escaped on the UART is the
//! implementor's concern.
//!
//! All methods use native `async fn` (Edition 2024 RPITIT). As with the other
//! device traits in this workspace, the trait is not object-safe; tasks hold
//! the concrete [`AnyModem`](crate::devices::AnyModem) wrapper instead.

#![allow(async_fn_in_trait)]

use crate::error::{ModemError, Result};
use crate::status::ConnectivityStatus;
use std::fmt;
use std::future::Future;
use std::time::Duration;

/// Identifies one AT operation, for logs, errors and call recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModemOp {
    Ping,
    GetOperatorName,
    GetAccessPoint,
    SetAccessPoint,
    GetConnectivityStatus,
    StartSession,
    GetIpAddress,
    TcpDisconnect,
    HttpGet,
    HttpReadResponse,
}

impl fmt::Display for ModemOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ping => "ping",
            Self::GetOperatorName => "get-operator-name",
            Self::GetAccessPoint => "get-access-point",
            Self::SetAccessPoint => "set-access-point",
            Self::GetConnectivityStatus => "get-connectivity-status",
            Self::StartSession => "start-session",
            Self::GetIpAddress => "get-ip-address",
            Self::TcpDisconnect => "tcp-disconnect",
            Self::HttpGet => "http-get",
            Self::HttpReadResponse => "http-read-response",
        };
        f.write_str(name)
    }
}

/// AT-command level modem operations.
///
/// Implementations execute one operation at a time; callers serialize access
/// through [`SharedModem`](crate::devices::SharedModem).
pub trait ModemClient: Send + Sync {
    /// Check that the modem answers at all.
    async fn ping(&mut self) -> Result<()>;

    /// Read the registered network operator name.
    async fn operator_name(&mut self) -> Result<String>;

    /// Read the access point name currently configured on the modem.
    async fn access_point(&mut self) -> Result<String>;

    /// Configure the access point name.
    async fn set_access_point(&mut self, apn: &str) -> Result<()>;

    /// Read and classify the packet-data session status.
    async fn connectivity_status(&mut self) -> Result<ConnectivityStatus>;

    /// Activate the packet-data session.
    async fn start_session(&mut self) -> Result<()>;

    /// Read the local IP address assigned to the session.
    async fn ip_address(&mut self) -> Result<String>;

    /// Close the transport-level connection.
    async fn tcp_disconnect(&mut self) -> Result<()>;

    /// Issue an HTTP GET for `path` on `url`.
    async fn http_get(&mut self, url: &str, path: &str) -> Result<()>;

    /// Read the payload of the last HTTP response.
    async fn http_read_response(&mut self) -> Result<String>;
}

/// Run one modem operation with an upper bound on its duration.
///
/// # Errors
///
/// Returns the operation's own error, or [`ModemError::Timeout`] if it does
/// not complete within `timeout`.
pub async fn with_timeout<T>(
    op: ModemOp,
    timeout: Duration,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(ModemError::timeout(op, timeout.as_millis() as u64)),
    }
}
