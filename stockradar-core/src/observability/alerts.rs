//! Alert bus — append-only history plus best-effort fan-out to notifiers.
//!
//! Every triggered alert lands in the history before any delivery is
//! attempted. Notifiers are called in registration order; a failing notifier
//! is logged and skipped, the remaining ones still run.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Retention;

/// Free-form alert metadata.
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// Alert urgency. Ordered `Info < Warning < Error < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub title: String,
    pub message: String,
    pub severity: Severity,
    pub timestamp: NaiveDateTime,
    pub source: String,
    pub metadata: Metadata,
}

#[derive(Debug, Error)]
pub enum NotifierError {
    #[error("notifier '{notifier}' failed: {message}")]
    Delivery { notifier: String, message: String },
    #[error("notifier I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Delivery sink for alerts.
///
/// `Ok(false)` means the notifier declined the alert (e.g. filtered by
/// severity); `Err` means delivery was attempted and failed.
pub trait AlertNotifier: Send {
    fn name(&self) -> &str;

    fn send(&self, alert: &Alert) -> Result<bool, NotifierError>;
}

/// Outcome of fanning one alert out to the registered notifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub declined: usize,
    pub failed: usize,
}

#[derive(Default)]
pub struct AlertManager {
    notifiers: Vec<Box<dyn AlertNotifier>>,
    history: VecDeque<Alert>,
    retention: Retention,
    evicted: u64,
}

impl fmt::Debug for AlertManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.notifiers.iter().map(|n| n.name()).collect();
        f.debug_struct("AlertManager")
            .field("notifiers", &names)
            .field("history", &self.history.len())
            .field("retention", &self.retention)
            .field("evicted", &self.evicted)
            .finish()
    }
}

impl AlertManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retention(retention: Retention) -> Self {
        Self {
            retention,
            ..Self::default()
        }
    }

    pub fn add_notifier(&mut self, notifier: Box<dyn AlertNotifier>) {
        self.notifiers.push(notifier);
    }

    pub fn notifier_count(&self) -> usize {
        self.notifiers.len()
    }

    /// Record an alert and deliver it to every notifier.
    pub fn trigger_alert(
        &mut self,
        title: impl Into<String>,
        message: impl Into<String>,
        severity: Severity,
        source: impl Into<String>,
        metadata: Metadata,
    ) -> DeliveryReport {
        self.history.push_back(Alert {
            title: title.into(),
            message: message.into(),
            severity,
            timestamp: chrono::Local::now().naive_local(),
            source: source.into(),
            metadata,
        });
        let Some(alert) = self.history.back() else {
            return DeliveryReport::default();
        };

        let mut report = DeliveryReport::default();
        for notifier in &self.notifiers {
            match notifier.send(alert) {
                Ok(true) => report.delivered += 1,
                Ok(false) => report.declined += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(
                        notifier = notifier.name(),
                        alert = %alert.title,
                        error = %e,
                        "alert delivery failed"
                    );
                }
            }
        }

        while self.retention.excess(self.history.len()) > 0 {
            self.history.pop_front();
            self.evicted += 1;
        }
        report
    }

    /// History filtered by exact severity and/or source; `None` matches all.
    pub fn get_alerts(&self, severity: Option<Severity>, source: Option<&str>) -> Vec<&Alert> {
        self.history
            .iter()
            .filter(|a| severity.map_or(true, |s| a.severity == s))
            .filter(|a| source.map_or(true, |s| a.source == s))
            .collect()
    }

    /// History entries at or above `min`.
    pub fn alerts_at_least(&self, min: Severity) -> Vec<&Alert> {
        self.history.iter().filter(|a| a.severity >= min).collect()
    }

    /// Every retained alert, oldest first.
    pub fn history(&self) -> &VecDeque<Alert> {
        &self.history
    }

    /// Alerts dropped by the retention policy so far.
    pub fn evicted(&self) -> u64 {
        self.evicted
    }
}

/// Prints alerts to stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier;

impl AlertNotifier for ConsoleNotifier {
    fn name(&self) -> &str {
        "console"
    }

    fn send(&self, alert: &Alert) -> Result<bool, NotifierError> {
        use std::io::Write;

        let metadata = serde_json::to_string(&alert.metadata).unwrap_or_default();
        let mut out = std::io::stdout().lock();
        writeln!(out, "[{}] {}: {}", alert.timestamp, alert.severity, alert.title)?;
        writeln!(out, "Source: {}", alert.source)?;
        writeln!(out, "Message: {}", alert.message)?;
        writeln!(out, "Metadata: {metadata}")?;
        Ok(true)
    }
}

/// Emits alerts as `tracing` events, declining anything below `min_severity`.
#[derive(Debug, Clone, Copy)]
pub struct LogNotifier {
    pub min_severity: Severity,
}

impl Default for LogNotifier {
    fn default() -> Self {
        Self {
            min_severity: Severity::Info,
        }
    }
}

impl AlertNotifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    fn send(&self, alert: &Alert) -> Result<bool, NotifierError> {
        if alert.severity < self.min_severity {
            return Ok(false);
        }
        match alert.severity {
            Severity::Info => {
                tracing::info!(source = %alert.source, message = %alert.message, "{}", alert.title)
            }
            Severity::Warning => {
                tracing::warn!(source = %alert.source, message = %alert.message, "{}", alert.title)
            }
            Severity::Error | Severity::Critical => tracing::error!(
                source = %alert.source,
                severity = %alert.severity,
                message = %alert.message,
                "{}",
                alert.title
            ),
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Records the titles it receives into a shared log.
    struct Recording {
        name: String,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl AlertNotifier for Recording {
        fn name(&self) -> &str {
            &self.name
        }

        fn send(&self, alert: &Alert) -> Result<bool, NotifierError> {
            self.log
                .lock()
                .unwrap()
                .push(format!("{}:{}", self.name, alert.title));
            Ok(true)
        }
    }

    struct Failing;

    impl AlertNotifier for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn send(&self, _alert: &Alert) -> Result<bool, NotifierError> {
            Err(NotifierError::Delivery {
                notifier: "failing".into(),
                message: "smtp unreachable".into(),
            })
        }
    }

    fn trigger(manager: &mut AlertManager, title: &str, severity: Severity, source: &str) {
        manager.trigger_alert(title, "msg", severity, source, Metadata::new());
    }

    #[test]
    fn severity_total_order() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
        assert!(Severity::Error < Severity::Critical);
    }

    #[test]
    fn failing_notifier_does_not_stop_later_notifiers_or_history() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut manager = AlertManager::new();
        manager.add_notifier(Box::new(Recording {
            name: "first".into(),
            log: log.clone(),
        }));
        manager.add_notifier(Box::new(Failing));
        manager.add_notifier(Box::new(Recording {
            name: "third".into(),
            log: log.clone(),
        }));

        let report = manager.trigger_alert(
            "Data Fetch Failed: csv",
            "boom",
            Severity::Error,
            "csv",
            Metadata::new(),
        );

        assert_eq!(
            report,
            DeliveryReport {
                delivered: 2,
                declined: 0,
                failed: 1
            }
        );
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "first:Data Fetch Failed: csv".to_string(),
                "third:Data Fetch Failed: csv".to_string()
            ]
        );
        assert_eq!(manager.history().len(), 1);
    }

    #[test]
    fn history_is_kept_without_notifiers() {
        let mut manager = AlertManager::new();
        trigger(&mut manager, "a", Severity::Info, "x");
        assert_eq!(manager.history().len(), 1);
        assert_eq!(manager.history()[0].metadata, Metadata::new());
    }

    #[test]
    fn get_alerts_filters_by_and_of_predicates() {
        let mut manager = AlertManager::new();
        trigger(&mut manager, "a", Severity::Error, "fetcher");
        trigger(&mut manager, "b", Severity::Error, "processor");
        trigger(&mut manager, "c", Severity::Warning, "fetcher");

        assert_eq!(manager.get_alerts(None, None).len(), 3);
        assert_eq!(manager.get_alerts(Some(Severity::Error), None).len(), 2);
        assert_eq!(manager.get_alerts(None, Some("fetcher")).len(), 2);

        let both = manager.get_alerts(Some(Severity::Error), Some("fetcher"));
        assert_eq!(both.len(), 1);
        assert_eq!(both[0].title, "a");
    }

    #[test]
    fn alerts_at_least_uses_severity_order() {
        let mut manager = AlertManager::new();
        trigger(&mut manager, "i", Severity::Info, "s");
        trigger(&mut manager, "c", Severity::Critical, "s");
        trigger(&mut manager, "w", Severity::Warning, "s");

        let titles: Vec<&str> = manager
            .alerts_at_least(Severity::Warning)
            .iter()
            .map(|a| a.title.as_str())
            .collect();
        assert_eq!(titles, vec!["c", "w"]);
    }

    #[test]
    fn log_notifier_declines_below_threshold() {
        let notifier = LogNotifier {
            min_severity: Severity::Error,
        };
        let mut manager = AlertManager::new();
        manager.add_notifier(Box::new(notifier));
        let report = manager.trigger_alert("x", "y", Severity::Info, "s", Metadata::new());
        assert_eq!(report.declined, 1);
        let report = manager.trigger_alert("x", "y", Severity::Critical, "s", Metadata::new());
        assert_eq!(report.delivered, 1);
    }

    #[test]
    fn keep_last_bounds_history() {
        let mut manager = AlertManager::with_retention(Retention::KeepLast(1));
        trigger(&mut manager, "old", Severity::Info, "s");
        trigger(&mut manager, "new", Severity::Info, "s");
        assert_eq!(manager.history().len(), 1);
        assert_eq!(manager.history()[0].title, "new");
        assert_eq!(manager.evicted(), 1);
    }

    #[test]
    fn full_history_still_delivers_newest_alert() {
        let mut manager = AlertManager::with_retention(Retention::KeepLast(2));
        manager.add_notifier(Box::new(LogNotifier {
            min_severity: Severity::Info,
        }));
        for i in 0..50 {
            let report = manager.trigger_alert(
                format!("a{i}"),
                "m",
                Severity::Warning,
                "s",
                Metadata::new(),
            );
            assert_eq!(report.delivered, 1);
        }
        let titles: Vec<&str> = manager.history().iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["a48", "a49"]);
        assert_eq!(manager.evicted(), 48);
    }
}
