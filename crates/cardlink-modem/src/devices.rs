//! Concrete modem dispatch and the shared modem channel.
//!
//! [`ModemClient`] uses native `async fn`, so it cannot be boxed as a trait
//! object. Spawned tasks hold [`AnyModem`] instead, which forwards every
//! operation to the concrete driver it wraps.
//!
//! The modem is a single serial channel. Every unit that talks to it goes
//! through a [`SharedModem`] and holds the lock for one logical operation:
//! one connectivity cycle, or one request/response exchange.
//!
//! # Examples
//!
//! ```
//! use cardlink_modem::devices::{AnyModem, SharedModem, acquire_modem};
//! use cardlink_modem::mock::MockModem;
//! use cardlink_modem::traits::ModemClient;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> cardlink_modem::Result<()> {
//!     let (modem, _handle) = MockModem::new();
//!     let shared = SharedModem::new(AnyModem::Mock(modem));
//!
//!     let mut guard = acquire_modem(&shared, Duration::from_secs(1)).await?;
//!     guard.ping().await?;
//!     Ok(())
//! }
//! ```

use crate::error::{ModemError, Result};
use crate::mock::MockModem;
use crate::status::ConnectivityStatus;
use crate::traits::ModemClient;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};

/// Enum wrapper for modem dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyModem {
    /// Mock modem for development and testing.
    Mock(MockModem),
}

impl ModemClient for AnyModem {
    async fn ping(&mut self) -> Result<()> {
        match self {
            Self::Mock(modem) => modem.ping().await,
        }
    }

    async fn operator_name(&mut self) -> Result<String> {
        match self {
            Self::Mock(modem) => modem.operator_name().await,
        }
    }

    async fn access_point(&mut self) -> Result<String> {
        match self {
            Self::Mock(modem) => modem.access_point().await,
        }
    }

    async fn set_access_point(&mut self, apn: &str) -> Result<()> {
        match self {
            Self::Mock(modem) => modem.set_access_point(apn).await,
        }
    }

    async fn connectivity_status(&mut self) -> Result<ConnectivityStatus> {
        match self {
            Self::Mock(modem) => modem.connectivity_status().await,
        }
    }

    async fn start_session(&mut self) -> Result<()> {
        match self {
            Self::Mock(modem) => modem.start_session().await,
        }
    }

    async fn ip_address(&mut self) -> Result<String> {
        match self {
            Self::Mock(modem) => modem.ip_address().await,
        }
    }

    async fn tcp_disconnect(&mut self) -> Result<()> {
        match self {
            Self::Mock(modem) => modem.tcp_disconnect().await,
        }
    }

    async fn http_get(&mut self, url: &str, path: &str) -> Result<()> {
        match self {
            Self::Mock(modem) => modem.http_get(url, path).await,
        }
    }

    async fn http_read_response(&mut self) -> Result<String> {
        match self {
            Self::Mock(modem) => modem.http_read_response().await,
        }
    }
}

/// Exclusive-access handle to the modem channel, cheap to clone.
#[derive(Debug)]
pub struct SharedModem<M = AnyModem> {
    inner: Arc<Mutex<M>>,
}

impl<M> SharedModem<M> {
    pub fn new(modem: M) -> Self {
        Self {
            inner: Arc::new(Mutex::new(modem)),
        }
    }
}

impl<M> Clone for SharedModem<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// How long a unit waits for the modem channel, given the per-command bound.
///
/// The longest holder is a request/response exchange of three commands.
pub fn lock_wait(command_timeout: Duration) -> Duration {
    command_timeout * 4
}

/// Acquire the modem channel, waiting at most `timeout`.
///
/// # Errors
///
/// Returns [`ModemError::Busy`] if another unit holds the channel for longer
/// than `timeout`.
pub async fn acquire_modem<M>(
    modem: &SharedModem<M>,
    timeout: Duration,
) -> Result<MutexGuard<'_, M>> {
    tokio::time::timeout(timeout, modem.inner.lock())
        .await
        .map_err(|_| ModemError::Busy {
            duration_ms: timeout.as_millis() as u64,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::ModemOp;

    #[tokio::test]
    async fn test_any_modem_forwards_to_mock() {
        let (modem, handle) = MockModem::new();
        let mut any = AnyModem::Mock(modem);

        any.ping().await.unwrap();
        any.set_access_point("airtelgprs.com").await.unwrap();
        assert_eq!(any.access_point().await.unwrap(), "airtelgprs.com");
        assert_eq!(
            handle.ops(),
            vec![ModemOp::Ping, ModemOp::SetAccessPoint, ModemOp::GetAccessPoint]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_modem_times_out_while_held() {
        let (modem, _handle) = MockModem::new();
        let shared = SharedModem::new(AnyModem::Mock(modem));

        let _held = acquire_modem(&shared, Duration::from_millis(10))
            .await
            .unwrap();
        let result = acquire_modem(&shared, Duration::from_millis(50)).await;
        assert!(matches!(result, Err(ModemError::Busy { duration_ms: 50 })));
    }

    #[test]
    fn test_lock_wait_covers_an_exchange() {
        assert_eq!(lock_wait(Duration::from_secs(5)), Duration::from_secs(20));
    }

    #[tokio::test]
    async fn test_acquire_modem_after_release() {
        let (modem, _handle) = MockModem::new();
        let shared = SharedModem::new(modem);
        let other = shared.clone();

        drop(acquire_modem(&shared, Duration::from_millis(10)).await.unwrap());
        assert!(acquire_modem(&other, Duration::from_millis(10)).await.is_ok());
    }
}
