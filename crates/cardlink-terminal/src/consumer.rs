//! HTTP request consumer.
//!
//! Takes one [`CardEvent`] at a time off the channel and validates the card
//! with the server through the modem: GET `<base path><card id>`, read the
//! response, disconnect. The modem channel is held for the whole exchange, so
//! at most one exchange is ever in flight and connectivity recovery commands
//! never interleave with it.
//!
//! A failed GET is reported and not retried. When no event arrives within
//! the receive timeout the consumer drains stray card-reader input instead.

use crate::error::Result;
use crate::producer::CardEvent;
use cardlink_core::{CardId, HttpPath};
use cardlink_hardware::{
    AnyCardReader, AnyDisplay, CardReaderDevice, DisplayDevice, SharedDisplay, SharedReader,
};
use cardlink_modem::{
    AnyModem, ModemClient, ModemOp, SharedModem, SharedSession, acquire_modem, lock_wait,
    with_timeout,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Server reply to a card validation request.
///
/// All fields are optional; the server omits what it does not know.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResponse {
    pub id: Option<u64>,
    pub card: Option<String>,
    pub name: Option<String>,
    pub amount: Option<i64>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ValidationResponse {
    /// Parse a response payload.
    ///
    /// # Errors
    ///
    /// Returns `TerminalError::Response` if the payload is not a JSON object
    /// of the expected shape.
    pub fn parse(payload: &str) -> Result<Self> {
        Ok(serde_json::from_str(payload.trim())?)
    }
}

/// Result of one card validation exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeOutcome {
    /// The server answered; `response` is `None` if the payload did not parse.
    Completed {
        card: CardId,
        payload: String,
        response: Option<ValidationResponse>,
    },

    /// The exchange failed before a payload was read.
    Failed { card: CardId, reason: String },
}

impl ExchangeOutcome {
    pub fn card(&self) -> &CardId {
        match self {
            Self::Completed { card, .. } | Self::Failed { card, .. } => card,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    /// Two display lines summarizing the exchange.
    pub fn summary(&self) -> (String, String) {
        let top = format!("CARD {}", self.card());
        let bottom = match self {
            Self::Completed {
                response: Some(response),
                ..
            } => {
                let mut line = String::from("OK");
                if let Some(name) = &response.name {
                    line.push(' ');
                    line.push_str(name);
                }
                if let Some(amount) = response.amount {
                    line.push_str(&format!(" {amount}"));
                }
                line
            }
            Self::Completed { response: None, .. } => "OK".to_string(),
            Self::Failed { .. } => "HTTP FAIL".to_string(),
        };
        (top, bottom)
    }
}

/// Consumer settings taken from the configuration.
#[derive(Debug, Clone)]
pub struct ConsumerSettings {
    /// Server host passed to the modem's HTTP GET.
    pub url: String,

    /// Fixed prefix of every request path.
    pub base_path: String,

    /// How long to wait for a card event before draining the reader.
    pub receive_timeout: Duration,

    /// Bound on each modem command.
    pub command_timeout: Duration,

    /// Bound on acquiring the card-scan and display locks.
    pub device_lock_wait: Duration,
}

/// Single-stage HTTP pipeline consuming card events.
pub struct HttpConsumer<M = AnyModem, R = AnyCardReader, D = AnyDisplay> {
    modem: SharedModem<M>,
    reader: SharedReader<R>,
    display: SharedDisplay<D>,
    session: SharedSession,
    events: mpsc::Receiver<CardEvent>,
    settings: ConsumerSettings,
}

impl<M, R, D> HttpConsumer<M, R, D>
where
    M: ModemClient,
    R: CardReaderDevice,
    D: DisplayDevice,
{
    pub fn new(
        modem: SharedModem<M>,
        reader: SharedReader<R>,
        display: SharedDisplay<D>,
        session: SharedSession,
        events: mpsc::Receiver<CardEvent>,
        settings: ConsumerSettings,
    ) -> Self {
        Self {
            modem,
            reader,
            display,
            session,
            events,
            settings,
        }
    }

    /// Validate one card with the server.
    ///
    /// Never fails: problems are logged and folded into the outcome. After a
    /// successful GET the connection is always disconnected, whatever the
    /// read or the disconnect itself returns.
    pub async fn exchange(&self, card: &CardId) -> ExchangeOutcome {
        let failed = |reason: String| ExchangeOutcome::Failed {
            card: *card,
            reason,
        };

        let path = match HttpPath::new(&self.settings.base_path, card) {
            Ok(path) => path,
            Err(e) => {
                warn!(card = %card, error = %e, "Cannot build request path");
                return failed(e.to_string());
            }
        };

        let timeout = self.settings.command_timeout;
        let mut modem = match acquire_modem(&self.modem, lock_wait(timeout)).await {
            Ok(modem) => modem,
            Err(e) => {
                warn!(card = %card, error = %e, "HTTP FAIL");
                return failed(e.to_string());
            }
        };

        debug!(card = %card, url = %self.settings.url, path = %path, "Sending HTTP GET");
        let get = with_timeout(
            ModemOp::HttpGet,
            timeout,
            modem.http_get(&self.settings.url, path.as_str()),
        )
        .await;

        if let Err(e) = get {
            warn!(card = %card, error = %e, "HTTP FAIL");
            return failed(e.to_string());
        }
        info!(card = %card, "HTTP OK");

        let read = with_timeout(ModemOp::HttpReadResponse, timeout, modem.http_read_response()).await;

        match with_timeout(ModemOp::TcpDisconnect, timeout, modem.tcp_disconnect()).await {
            Ok(()) => debug!("Disconnect OK"),
            Err(e) => warn!(error = %e, "Disconnect failed"),
        }
        drop(modem);

        let payload = match read {
            Ok(payload) => payload,
            Err(e) => {
                warn!(card = %card, error = %e, "Reading HTTP response failed");
                return failed(e.to_string());
            }
        };
        info!(card = %card, payload = %payload, "HTTP response received");

        let recorded = payload.clone();
        self.session.update(|s| s.record_response(recorded)).await;

        let response = match ValidationResponse::parse(&payload) {
            Ok(response) => Some(response),
            Err(e) => {
                warn!(card = %card, error = %e, "Response payload is not a validation document");
                None
            }
        };

        ExchangeOutcome::Completed {
            card: *card,
            payload,
            response,
        }
    }

    /// Show the outcome on the display, under the display lock.
    pub async fn show(&self, outcome: &ExchangeOutcome) {
        let (top, bottom) = outcome.summary();
        let result = match self.display.acquire(self.settings.device_lock_wait).await {
            Ok(mut display) => display.show(&top, &bottom).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            warn!(error = %e, "Display update failed");
        }
    }

    /// Drain stray card-reader input, under the card-scan lock.
    pub async fn flush_reader(&self) {
        let result = match self.reader.acquire(self.settings.device_lock_wait).await {
            Ok(mut reader) => reader.flush_input().await,
            Err(e) => Err(e),
        };
        match result {
            Ok(0) => {}
            Ok(flushed) => debug!(flushed, "Flushed stray reader input"),
            Err(e) => debug!(error = %e, "Reader flush skipped"),
        }
    }

    /// Process events one at a time until every producer is gone.
    pub async fn run(mut self) -> Result<()> {
        info!(url = %self.settings.url, base_path = %self.settings.base_path, "HTTP consumer started");

        loop {
            match tokio::time::timeout(self.settings.receive_timeout, self.events.recv()).await {
                Ok(Some(event)) => {
                    let outcome = self.exchange(&event.card).await;
                    self.show(&outcome).await;
                }
                Ok(None) => {
                    info!("Card event channel closed, consumer stopping");
                    return Ok(());
                }
                Err(_) => self.flush_reader().await,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardlink_hardware::SharedDevice;
    use cardlink_hardware::mock::{
        MockCardReader, MockCardReaderHandle, MockDisplay, MockDisplayHandle,
    };
    use cardlink_modem::mock::{DEFAULT_HTTP_RESPONSE, MockModem, MockModemHandle, ModemCall};
    use rstest::rstest;

    struct Fixture {
        consumer: HttpConsumer<MockModem, MockCardReader, MockDisplay>,
        modem: MockModemHandle,
        reader: MockCardReaderHandle,
        display: MockDisplayHandle,
        session: SharedSession,
        events: mpsc::Sender<CardEvent>,
    }

    fn fixture() -> Fixture {
        let (modem, modem_handle) = MockModem::new();
        let (reader, reader_handle) = MockCardReader::new();
        let (display, display_handle) = MockDisplay::new();
        let session = SharedSession::default();
        let (tx, rx) = mpsc::channel(10);

        let consumer = HttpConsumer::new(
            SharedModem::new(modem),
            SharedDevice::new("card reader", reader),
            SharedDevice::new("display", display),
            session.clone(),
            rx,
            ConsumerSettings {
                url: "cardlink.example.com".into(),
                base_path: "/cards/".into(),
                receive_timeout: Duration::from_millis(100),
                command_timeout: Duration::from_millis(500),
                device_lock_wait: Duration::from_millis(500),
            },
        );

        Fixture {
            consumer,
            modem: modem_handle,
            reader: reader_handle,
            display: display_handle,
            session,
            events: tx,
        }
    }

    fn card(id: &str) -> CardId {
        id.parse().unwrap()
    }

    #[test]
    fn test_parse_sample_response() {
        let response = ValidationResponse::parse(DEFAULT_HTTP_RESPONSE).unwrap();
        assert_eq!(response.id, Some(18));
        assert_eq!(response.card.as_deref(), Some("1A2643"));
        assert_eq!(response.name.as_deref(), Some("person2"));
        assert_eq!(response.amount, Some(1000));
        assert!(response.created_at.unwrap() < response.updated_at.unwrap());
    }

    #[test]
    fn test_parse_partial_response() {
        let response = ValidationResponse::parse(r#"{"card":"ABCDEF"}"#).unwrap();
        assert_eq!(response.card.as_deref(), Some("ABCDEF"));
        assert!(response.name.is_none());
    }

    #[test]
    fn test_parse_rejects_non_json() {
        assert!(ValidationResponse::parse("404 Not Found").is_err());
    }

    #[rstest]
    #[case(Some("person2"), Some(1000), "OK person2 1000")]
    #[case(Some("person2"), None, "OK person2")]
    #[case(None, Some(-5), "OK -5")]
    #[case(None, None, "OK")]
    fn test_summary_of_completed(
        #[case] name: Option<&str>,
        #[case] amount: Option<i64>,
        #[case] expected: &str,
    ) {
        let outcome = ExchangeOutcome::Completed {
            card: card("1A2643"),
            payload: String::new(),
            response: Some(ValidationResponse {
                name: name.map(str::to_string),
                amount,
                ..Default::default()
            }),
        };
        assert_eq!(outcome.summary(), ("CARD 1A2643".to_string(), expected.to_string()));
    }

    #[test]
    fn test_summary_of_failure() {
        let outcome = ExchangeOutcome::Failed {
            card: card("ABCDEF"),
            reason: "x".into(),
        };
        assert_eq!(outcome.summary().1, "HTTP FAIL");
    }

    #[tokio::test]
    async fn test_exchange_get_read_disconnect() {
        let f = fixture();

        let outcome = f.consumer.exchange(&card("1A2643")).await;
        assert!(outcome.is_completed());

        assert_eq!(
            f.modem.calls(),
            vec![
                ModemCall::HttpGet {
                    url: "cardlink.example.com".into(),
                    path: "/cards/1A2643".into()
                },
                ModemCall::HttpReadResponse,
                ModemCall::TcpDisconnect,
            ]
        );
        assert_eq!(
            f.session.snapshot().await.last_response(),
            Some(DEFAULT_HTTP_RESPONSE)
        );
    }

    #[tokio::test]
    async fn test_failed_get_is_not_retried() {
        let f = fixture();
        f.modem.fail_next(ModemOp::HttpGet, 1);

        let outcome = f.consumer.exchange(&card("ABCDEF")).await;
        assert!(matches!(outcome, ExchangeOutcome::Failed { .. }));
        assert_eq!(f.modem.ops(), vec![ModemOp::HttpGet]);
        assert!(f.session.snapshot().await.last_response().is_none());
    }

    #[tokio::test]
    async fn test_disconnects_even_when_read_fails() {
        let f = fixture();
        f.modem.fail_next(ModemOp::HttpReadResponse, 1);

        let outcome = f.consumer.exchange(&card("ABCDEF")).await;
        assert!(!outcome.is_completed());
        assert_eq!(f.modem.count(ModemOp::TcpDisconnect), 1);
    }

    #[tokio::test]
    async fn test_disconnect_failure_does_not_fail_exchange() {
        let f = fixture();
        f.modem.fail_next(ModemOp::TcpDisconnect, 1);

        let outcome = f.consumer.exchange(&card("ABCDEF")).await;
        assert!(outcome.is_completed());
    }

    #[tokio::test]
    async fn test_unparsable_payload_is_kept_raw() {
        let f = fixture();
        f.modem.set_http_response("<html>oops</html>");

        match f.consumer.exchange(&card("ABCDEF")).await {
            ExchangeOutcome::Completed {
                payload, response, ..
            } => {
                assert_eq!(payload, "<html>oops</html>");
                assert!(response.is_none());
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_show_writes_summary() {
        let f = fixture();
        let outcome = f.consumer.exchange(&card("1A2643")).await;
        f.consumer.show(&outcome).await;

        let screen = f.display.current().unwrap();
        assert_eq!(screen.top, "CARD 1A2643");
        assert_eq!(screen.bottom, "OK person2 1000");
    }

    #[tokio::test]
    async fn test_display_failure_is_tolerated() {
        let f = fixture();
        f.display.fail_writes(true);

        let outcome = f.consumer.exchange(&card("1A2643")).await;
        f.consumer.show(&outcome).await;
        assert!(f.display.shown().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_processes_events_in_order_then_stops() {
        let f = fixture();
        for id in ["AAAAAA", "BBBBBB", "CCCCCC"] {
            f.events.send(CardEvent::new(card(id))).await.unwrap();
        }
        drop(f.events);

        f.consumer.run().await.unwrap();

        let paths: Vec<String> = f
            .modem
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                ModemCall::HttpGet { path, .. } => Some(path),
                _ => None,
            })
            .collect();
        assert_eq!(paths, vec!["/cards/AAAAAA", "/cards/BBBBBB", "/cards/CCCCCC"]);
        assert_eq!(f.display.shown().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_consumer_flushes_reader() {
        let f = fixture();
        f.reader.feed(b"stray".to_vec()).await.unwrap();
        f.reader.feed(b"XXXXAB".to_vec()).await.unwrap();
        assert_eq!(f.reader.queued(), 2);

        let shared_reader = f.consumer.reader.clone();
        let task = tokio::spawn(f.consumer.run());
        tokio::time::sleep(Duration::from_millis(250)).await;

        assert_eq!(f.reader.queued(), 0);
        assert_eq!(shared_reader.acquire(Duration::from_millis(10)).await.unwrap().pending(), 0);
        assert!(f.modem.calls().is_empty());
        task.abort();
        drop(f.events);
    }
}
