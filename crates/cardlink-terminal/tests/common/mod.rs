//! Shared fixtures for terminal integration tests.

#![allow(dead_code)]

use cardlink_core::{CardId, TerminalConfig};
use cardlink_hardware::mock::{MockCardReader, MockCardReaderHandle, MockDisplay, MockDisplayHandle};
use cardlink_hardware::{AnyCardReader, AnyDisplay};
use cardlink_modem::mock::{MockModem, MockModemHandle, ModemCall};
use cardlink_modem::{AnyModem, ModemSession, SharedSession};
use cardlink_terminal::TerminalDevices;
use std::time::Duration;

/// Upper bound on any wait in these tests, in (paused) runtime time.
pub const WAIT_LIMIT: Duration = Duration::from_secs(120);

/// Mock devices plus the handles controlling them.
pub struct MockRig {
    pub devices: TerminalDevices,
    pub modem: MockModemHandle,
    pub reader: MockCardReaderHandle,
    pub display: MockDisplayHandle,
}

pub fn mock_rig() -> MockRig {
    let (modem, modem_handle) = MockModem::new();
    let (reader, reader_handle) = MockCardReader::new();
    let (display, display_handle) = MockDisplay::new();

    MockRig {
        devices: TerminalDevices {
            modem: AnyModem::Mock(modem),
            reader: AnyCardReader::Mock(reader),
            display: AnyDisplay::Mock(display),
        },
        modem: modem_handle,
        reader: reader_handle,
        display: display_handle,
    }
}

pub fn test_config() -> TerminalConfig {
    let mut config = TerminalConfig::default();
    config.modem.command_timeout_ms = 1_000;
    config.http.url = "validation.test".to_string();
    config.http.base_path = "/api/cards/".to_string();
    // Keeps the idle reader flush from racing scans fed by the tests.
    config.http.receive_timeout_ms = 60_000;
    config
}

/// Request paths of every HTTP GET issued so far, in order.
pub fn http_paths(modem: &MockModemHandle) -> Vec<String> {
    modem
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            ModemCall::HttpGet { path, .. } => Some(path),
            _ => None,
        })
        .collect()
}

/// Feed raw bytes and wait until the reader has picked them up.
pub async fn feed_raw(reader: &MockCardReaderHandle, bytes: &[u8]) {
    reader.feed(bytes.to_vec()).await.expect("reader gone");
    wait_until(|| reader.queued() == 0).await;
}

/// Present a card and wait until the reader has picked the frame up.
pub async fn scan(reader: &MockCardReaderHandle, id: &str) {
    let card: CardId = id.parse().expect("valid card id");
    reader.present_card(&card).await.expect("reader gone");
    wait_until(|| reader.queued() == 0).await;
}

/// Poll `condition` until it holds, failing the test after [`WAIT_LIMIT`].
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(WAIT_LIMIT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not met in time");
}

/// Poll the session until `condition` holds on a snapshot.
pub async fn wait_for_session(
    session: &SharedSession,
    condition: impl Fn(&ModemSession) -> bool,
) -> ModemSession {
    tokio::time::timeout(WAIT_LIMIT, async {
        loop {
            let snapshot = session.snapshot().await;
            if condition(&snapshot) {
                return snapshot;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("session condition not met in time")
}
