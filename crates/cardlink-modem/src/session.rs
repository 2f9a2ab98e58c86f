//! Shared cellular session record.
//!
//! [`ModemSession`] holds everything the terminal knows about the cellular
//! session: operator, APNs, the last classified status, the IP address and
//! the last HTTP payload. It lives behind a single lock in [`SharedSession`].
//!
//! Writers go through [`SharedSession::update`], which takes a synchronous
//! closure. The lock therefore can never be held across an `.await`, and in
//! particular never across a modem command. Readers take a
//! [`snapshot`](SharedSession::snapshot): an owned copy that is consistent as
//! a whole and never observes a half-applied update.

use crate::apn::ApnResolution;
use crate::status::ConnectivityStatus;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Cellular session state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModemSession {
    operator_name: Option<String>,
    resolved_apn: ApnResolution,
    modem_apn: Option<String>,
    status: Option<ConnectivityStatus>,
    status_polled_at: Option<DateTime<Utc>>,
    poll_count: u64,
    ip_address: Option<String>,
    last_response: Option<String>,
    last_response_at: Option<DateTime<Utc>>,
}

impl ModemSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Operator name as reported by the modem (lowercased).
    pub fn operator_name(&self) -> Option<&str> {
        self.operator_name.as_deref()
    }

    /// APN resolved from the operator table.
    pub fn resolved_apn(&self) -> &ApnResolution {
        &self.resolved_apn
    }

    /// APN last read back from the modem.
    pub fn modem_apn(&self) -> Option<&str> {
        self.modem_apn.as_deref()
    }

    /// Status from the most recent successful poll, `None` before the first.
    pub fn status(&self) -> Option<&ConnectivityStatus> {
        self.status.as_ref()
    }

    pub fn status_polled_at(&self) -> Option<DateTime<Utc>> {
        self.status_polled_at
    }

    /// Number of successful status polls so far.
    pub fn poll_count(&self) -> u64 {
        self.poll_count
    }

    pub fn ip_address(&self) -> Option<&str> {
        self.ip_address.as_deref()
    }

    /// Whether the session has an IP address to send requests from.
    pub fn has_ip(&self) -> bool {
        self.ip_address.is_some()
    }

    pub fn last_response(&self) -> Option<&str> {
        self.last_response.as_deref()
    }

    pub fn last_response_at(&self) -> Option<DateTime<Utc>> {
        self.last_response_at
    }

    pub fn record_operator(&mut self, name: impl Into<String>) {
        self.operator_name = Some(name.into());
    }

    pub fn record_resolved_apn(&mut self, resolution: ApnResolution) {
        self.resolved_apn = resolution;
    }

    pub fn record_modem_apn(&mut self, apn: impl Into<String>) {
        self.modem_apn = Some(apn.into());
    }

    /// Record a freshly polled status.
    pub fn record_status(&mut self, status: ConnectivityStatus) {
        self.status = Some(status);
        self.status_polled_at = Some(Utc::now());
        self.poll_count += 1;
    }

    pub fn record_ip_address(&mut self, ip: impl Into<String>) {
        self.ip_address = Some(ip.into());
    }

    pub fn record_response(&mut self, payload: impl Into<String>) {
        self.last_response = Some(payload.into());
        self.last_response_at = Some(Utc::now());
    }
}

/// Lock-protected handle to the session, cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct SharedSession {
    inner: Arc<Mutex<ModemSession>>,
}

impl SharedSession {
    /// Apply a read-modify-write under the session lock.
    pub async fn update<R>(&self, f: impl FnOnce(&mut ModemSession) -> R) -> R {
        let mut session = self.inner.lock().await;
        f(&mut session)
    }

    /// Consistent owned copy of the current session.
    pub async fn snapshot(&self) -> ModemSession {
        self.inner.lock().await.clone()
    }
}
