//! Operator to access point name resolution and reconciliation.
//!
//! At boot the terminal reads the registered operator name, looks it up in an
//! ordered [`OperatorApnTable`] and makes sure the modem is configured with
//! the matching APN. A mismatch is corrected once; a correction that cannot
//! be confirmed is reported and the boot continues.
//!
//! # Examples
//!
//! ```
//! use cardlink_modem::apn::{ApnResolution, OperatorApnTable};
//!
//! let table = OperatorApnTable::default();
//! assert_eq!(
//!     table.resolve("AIRTEL INDIA"),
//!     ApnResolution::Resolved("airtelgprs.com".to_string())
//! );
//! assert_eq!(table.resolve("unknownnet"), ApnResolution::Unresolved);
//! ```

use crate::session::SharedSession;
use crate::traits::{ModemClient, ModemOp, with_timeout};
use cardlink_core::ApnEntry;
use cardlink_core::constants::DEFAULT_APN_TABLE;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Outcome of looking an operator up in the table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ApnResolution {
    /// First matching entry's APN.
    Resolved(String),

    /// No entry matched the operator name.
    #[default]
    Unresolved,
}

impl ApnResolution {
    pub fn apn(&self) -> Option<&str> {
        match self {
            Self::Resolved(apn) => Some(apn),
            Self::Unresolved => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

impl fmt::Display for ApnResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolved(apn) => f.write_str(apn),
            Self::Unresolved => f.write_str("<unresolved>"),
        }
    }
}

/// Immutable ordered list of (operator substring, APN) pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorApnTable {
    entries: Vec<(String, String)>,
}

impl OperatorApnTable {
    /// Build a table, keeping declaration order.
    ///
    /// Operator substrings are lowercased. Entries with an empty operator
    /// substring are dropped, since they would match every operator.
    pub fn new<O, A>(entries: impl IntoIterator<Item = (O, A)>) -> Self
    where
        O: AsRef<str>,
        A: Into<String>,
    {
        let entries = entries
            .into_iter()
            .filter_map(|(operator, apn)| {
                let operator = operator.as_ref().trim().to_lowercase();
                if operator.is_empty() {
                    warn!("Ignoring APN table entry with empty operator");
                    return None;
                }
                Some((operator, apn.into()))
            })
            .collect();

        Self { entries }
    }

    /// Build the table from configuration entries.
    pub fn from_entries(entries: &[ApnEntry]) -> Self {
        Self::new(entries.iter().map(|e| (e.operator.as_str(), e.apn.clone())))
    }

    /// Resolve an operator name; the first entry contained in it wins.
    pub fn resolve(&self, operator_name: &str) -> ApnResolution {
        let operator = operator_name.to_lowercase();
        self.entries
            .iter()
            .find(|(substring, _)| operator.contains(substring.as_str()))
            .map(|(_, apn)| ApnResolution::Resolved(apn.clone()))
            .unwrap_or(ApnResolution::Unresolved)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for OperatorApnTable {
    fn default() -> Self {
        Self::new(DEFAULT_APN_TABLE)
    }
}

/// Result of comparing the resolved APN with the modem's configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApnReconciliation {
    /// No APN resolved; the modem's configuration was left alone.
    Skipped,

    /// The modem already carried the resolved APN.
    AlreadyConfigured { apn: String },

    /// The APN was written and confirmed by reading it back.
    Updated { apn: String },

    /// The APN was written but the read-back did not confirm it.
    Unconfirmed {
        expected: String,
        read_back: Option<String>,
    },

    /// Writing the APN failed.
    Failed { expected: String, reason: String },
}

impl ApnReconciliation {
    /// Whether the outcome warrants a boot warning.
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            Self::Skipped | Self::Unconfirmed { .. } | Self::Failed { .. }
        )
    }
}

/// Resolves the operator's APN and reconciles it with the modem.
#[derive(Debug, Clone)]
pub struct ApnReconciler {
    table: OperatorApnTable,
    command_timeout: Duration,
}

impl ApnReconciler {
    pub fn new(table: OperatorApnTable, command_timeout: Duration) -> Self {
        Self {
            table,
            command_timeout,
        }
    }

    pub fn table(&self) -> &OperatorApnTable {
        &self.table
    }

    /// Resolve the APN for `operator`, record it in the session and make the
    /// modem agree with it.
    ///
    /// Never fails: every problem is folded into the returned
    /// [`ApnReconciliation`] and logged.
    pub async fn reconcile<M: ModemClient>(
        &self,
        modem: &mut M,
        session: &SharedSession,
        operator: Option<&str>,
    ) -> ApnReconciliation {
        let resolution = operator
            .map(|name| self.table.resolve(name))
            .unwrap_or_default();

        info!(
            operator = operator.unwrap_or("<unknown>"),
            apn = %resolution,
            "APN search completed"
        );
        session
            .update(|s| s.record_resolved_apn(resolution.clone()))
            .await;

        let current = self.read_modem_apn(modem, session).await;

        let expected = match resolution {
            ApnResolution::Resolved(apn) => apn,
            ApnResolution::Unresolved => {
                warn!("No APN known for operator, leaving modem configuration unchanged");
                return ApnReconciliation::Skipped;
            }
        };

        if current.as_deref().is_some_and(|apn| apn.contains(&expected)) {
            info!(apn = %expected, "Modem already has the expected APN");
            return ApnReconciliation::AlreadyConfigured { apn: expected };
        }

        info!(
            expected = %expected,
            current = current.as_deref().unwrap_or("<unread>"),
            "Modem APN differs, setting it"
        );

        let set = with_timeout(
            ModemOp::SetAccessPoint,
            self.command_timeout,
            modem.set_access_point(&expected),
        )
        .await;

        if let Err(e) = set {
            warn!(error = %e, "Setting APN failed");
            return ApnReconciliation::Failed {
                expected,
                reason: e.to_string(),
            };
        }

        let read_back = self.read_modem_apn(modem, session).await;
        match read_back {
            Some(apn) if apn.contains(&expected) => {
                info!(apn = %expected, "APN set and confirmed");
                ApnReconciliation::Updated { apn: expected }
            }
            read_back => {
                warn!(
                    expected = %expected,
                    read_back = read_back.as_deref().unwrap_or("<unread>"),
                    "APN change not confirmed by modem"
                );
                ApnReconciliation::Unconfirmed {
                    expected,
                    read_back,
                }
            }
        }
    }

    async fn read_modem_apn<M: ModemClient>(
        &self,
        modem: &mut M,
        session: &SharedSession,
    ) -> Option<String> {
        match with_timeout(
            ModemOp::GetAccessPoint,
            self.command_timeout,
            modem.access_point(),
        )
        .await
        {
            Ok(apn) => {
                debug!(apn = %apn, "Read APN from modem");
                session.update(|s| s.record_modem_apn(apn.clone())).await;
                Some(apn)
            }
            Err(e) => {
                warn!(error = %e, "Reading APN from modem failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockModem;
    use proptest::prelude::*;
    use rstest::rstest;

    fn reconciler() -> ApnReconciler {
        ApnReconciler::new(OperatorApnTable::default(), Duration::from_millis(500))
    }

    #[rstest]
    #[case("AIRTEL INDIA", "airtelgprs.com")]
    #[case("CellOne", "bsnlnet")]
    #[case("IDEA", "internet")]
    #[case("TATA DOCOMO", "TATA.DOCOMO.INTERNET")]
    #[case("T24 Mobile", "TATA.DOCOMO.INTERNET")]
    #[case("Vodafone IN", "www")]
    fn test_resolve_known_operators(#[case] operator: &str, #[case] apn: &str) {
        let table = OperatorApnTable::default();
        assert_eq!(table.resolve(operator), ApnResolution::Resolved(apn.into()));
    }

    #[test]
    fn test_resolve_unknown_operator() {
        let table = OperatorApnTable::default();
        assert_eq!(table.resolve("unknownnet"), ApnResolution::Unresolved);
        assert_eq!(table.resolve(""), ApnResolution::Unresolved);
    }

    #[test]
    fn test_first_entry_wins_on_multiple_matches() {
        let table = OperatorApnTable::default();
        assert_eq!(
            table.resolve("airtel aircel roaming"),
            ApnResolution::Resolved("airtelgprs.com".into())
        );

        let reordered =
            OperatorApnTable::new([("aircel", "aircelgprs.pr"), ("airtel", "airtelgprs.com")]);
        assert_eq!(
            reordered.resolve("airtel aircel roaming"),
            ApnResolution::Resolved("aircelgprs.pr".into())
        );
    }

    #[test]
    fn test_empty_operator_entries_dropped() {
        let table = OperatorApnTable::new([("", "catchall"), ("Jio", "jionet")]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.resolve("unknown"), ApnResolution::Unresolved);
        assert_eq!(table.resolve("JIO 4G"), ApnResolution::Resolved("jionet".into()));
    }

    #[test]
    fn test_from_config_entries() {
        let entries = vec![ApnEntry {
            operator: "Jio".into(),
            apn: "jionet".into(),
        }];
        let table = OperatorApnTable::from_entries(&entries);
        assert_eq!(table.resolve("jio"), ApnResolution::Resolved("jionet".into()));
    }

    #[tokio::test]
    async fn test_reconcile_already_configured() {
        let (mut modem, handle) = MockModem::new();
        handle.set_access_point("airtelgprs.com");
        let session = SharedSession::default();

        let outcome = reconciler()
            .reconcile(&mut modem, &session, Some("airtel india"))
            .await;

        assert_eq!(
            outcome,
            ApnReconciliation::AlreadyConfigured {
                apn: "airtelgprs.com".into()
            }
        );
        assert_eq!(handle.count(ModemOp::SetAccessPoint), 0);

        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.resolved_apn().apn(), Some("airtelgprs.com"));
        assert_eq!(snapshot.modem_apn(), Some("airtelgprs.com"));
    }

    #[tokio::test]
    async fn test_reconcile_updates_mismatched_apn() {
        let (mut modem, handle) = MockModem::new();
        handle.set_access_point("CMNET");
        let session = SharedSession::default();

        let outcome = reconciler()
            .reconcile(&mut modem, &session, Some("vodafone"))
            .await;

        assert_eq!(outcome, ApnReconciliation::Updated { apn: "www".into() });
        assert_eq!(handle.count(ModemOp::SetAccessPoint), 1);
        assert_eq!(handle.count(ModemOp::GetAccessPoint), 2);
        assert_eq!(session.snapshot().await.modem_apn(), Some("www"));
    }

    #[tokio::test]
    async fn test_reconcile_unconfirmed_is_reported_not_retried() {
        let (mut modem, handle) = MockModem::new();
        handle.set_access_point("CMNET");
        handle.ignore_apn_writes(true);
        let session = SharedSession::default();

        let outcome = reconciler()
            .reconcile(&mut modem, &session, Some("idea cellular"))
            .await;

        assert_eq!(
            outcome,
            ApnReconciliation::Unconfirmed {
                expected: "internet".into(),
                read_back: Some("CMNET".into())
            }
        );
        assert!(outcome.is_warning());
        assert_eq!(handle.count(ModemOp::SetAccessPoint), 1);
    }

    #[tokio::test]
    async fn test_reconcile_set_failure() {
        let (mut modem, handle) = MockModem::new();
        handle.set_access_point("");
        handle.fail_next(ModemOp::SetAccessPoint, 1);
        let session = SharedSession::default();

        let outcome = reconciler()
            .reconcile(&mut modem, &session, Some("reliance"))
            .await;

        assert!(matches!(outcome, ApnReconciliation::Failed { ref expected, .. } if expected == "rcomnet"));
        // No confirmation read after a failed write.
        assert_eq!(handle.count(ModemOp::GetAccessPoint), 1);
    }

    #[tokio::test]
    async fn test_reconcile_unresolved_leaves_modem_alone() {
        let (mut modem, handle) = MockModem::new();
        handle.set_access_point("whatever");
        let session = SharedSession::default();

        let outcome = reconciler()
            .reconcile(&mut modem, &session, Some("unknownnet"))
            .await;

        assert_eq!(outcome, ApnReconciliation::Skipped);
        assert_eq!(handle.count(ModemOp::SetAccessPoint), 0);
        assert_eq!(
            session.snapshot().await.resolved_apn(),
            &ApnResolution::Unresolved
        );
    }

    #[tokio::test]
    async fn test_reconcile_without_operator_name() {
        let (mut modem, _handle) = MockModem::new();
        let session = SharedSession::default();

        let outcome = reconciler().reconcile(&mut modem, &session, None).await;
        assert_eq!(outcome, ApnReconciliation::Skipped);
    }

    proptest! {
        #[test]
        fn prop_single_known_substring_resolves(
            idx in 0usize..DEFAULT_APN_TABLE.len(),
            prefix in "[0-9]{0,5}",
            suffix in "[0-9]{0,5}",
            upper in any::<bool>(),
        ) {
            let (operator, apn) = DEFAULT_APN_TABLE[idx];
            let mut name = format!("{prefix}{operator}{suffix}");
            if upper {
                name = name.to_uppercase();
            }

            let table = OperatorApnTable::default();
            prop_assert_eq!(table.resolve(&name), ApnResolution::Resolved(apn.to_string()));
        }

        #[test]
        fn prop_digits_only_never_resolve(name in "[0-9 ]{0,20}") {
            let table = OperatorApnTable::default();
            prop_assert_eq!(table.resolve(&name), ApnResolution::Unresolved);
        }
    }
}
