//! Alert dispatch policy
//!
//! Maps finding severity to a set of notification actions:
//! critical findings get a real-time notification and a tracking
//! ticket, high findings a notification only, medium findings surface
//! only through the query API. Actions are attempted independently and
//! never retried here; retry policy belongs to the transport.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::NotificationError;
use crate::models::{Finding, Severity};
use crate::observability::SentinelMetrics;

/// Real-time notification channel
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_notification(&self, finding: &Finding) -> Result<(), NotificationError>;
}

/// Tracking-ticket channel, used for critical findings only
#[async_trait]
pub trait TicketTracker: Send + Sync {
    async fn create_tracking_ticket(&self, finding: &Finding) -> Result<(), NotificationError>;
}

/// Routes persisted findings to notification channels by severity
pub struct AlertDispatcher {
    notifier: Option<Arc<dyn Notifier>>,
    tickets: Option<Arc<dyn TicketTracker>>,
    metrics: SentinelMetrics,
}

impl AlertDispatcher {
    pub fn new(notifier: Option<Arc<dyn Notifier>>, tickets: Option<Arc<dyn TicketTracker>>) -> Self {
        Self {
            notifier,
            tickets,
            metrics: SentinelMetrics::new(),
        }
    }

    /// Dispatch one finding; a failed channel never blocks the other
    pub async fn dispatch(&self, finding: &Finding) {
        match finding.severity {
            Severity::Critical => {
                self.notify(finding).await;
                self.open_ticket(finding).await;
            }
            Severity::High => {
                self.notify(finding).await;
            }
            Severity::Medium => {}
        }
    }

    async fn notify(&self, finding: &Finding) {
        let Some(notifier) = &self.notifier else {
            debug!(
                resource_id = %finding.resource_id,
                "No notifier configured, skipping real-time alert"
            );
            return;
        };

        if let Err(e) = notifier.send_notification(finding).await {
            self.metrics.inc_notification_errors();
            warn!(
                provider = %finding.provider,
                resource_id = %finding.resource_id,
                severity = %finding.severity,
                error = %e,
                "Failed to send notification"
            );
        }
    }

    async fn open_ticket(&self, finding: &Finding) {
        let Some(tickets) = &self.tickets else {
            debug!(
                resource_id = %finding.resource_id,
                "No ticket tracker configured, skipping ticket"
            );
            return;
        };

        if let Err(e) = tickets.create_tracking_ticket(finding).await {
            self.metrics.inc_notification_errors();
            warn!(
                provider = %finding.provider,
                resource_id = %finding.resource_id,
                error = %e,
                "Failed to create tracking ticket"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnomalyKind, CloudProvider};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingChannel {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingChannel {
        fn failing() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: true,
            }
        }

        fn count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn record(&self) -> Result<(), NotificationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(NotificationError::Rejected { status: 500 })
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl Notifier for CountingChannel {
        async fn send_notification(&self, _finding: &Finding) -> Result<(), NotificationError> {
            self.record()
        }
    }

    #[async_trait]
    impl TicketTracker for CountingChannel {
        async fn create_tracking_ticket(&self, _finding: &Finding) -> Result<(), NotificationError> {
            self.record()
        }
    }

    fn finding(severity: Severity) -> Finding {
        Finding::new(
            CloudProvider::Aws,
            "i-1",
            "ec2",
            AnomalyKind::IdleResource,
            severity,
            10.0,
            json!({}),
        )
    }

    #[tokio::test]
    async fn test_critical_hits_both_channels() {
        let notifier = Arc::new(CountingChannel::default());
        let tickets = Arc::new(CountingChannel::default());
        let dispatcher = AlertDispatcher::new(Some(notifier.clone()), Some(tickets.clone()));

        dispatcher.dispatch(&finding(Severity::Critical)).await;

        assert_eq!(notifier.count(), 1);
        assert_eq!(tickets.count(), 1);
    }

    #[tokio::test]
    async fn test_high_notifies_without_ticket() {
        let notifier = Arc::new(CountingChannel::default());
        let tickets = Arc::new(CountingChannel::default());
        let dispatcher = AlertDispatcher::new(Some(notifier.clone()), Some(tickets.clone()));

        dispatcher.dispatch(&finding(Severity::High)).await;

        assert_eq!(notifier.count(), 1);
        assert_eq!(tickets.count(), 0);
    }

    #[tokio::test]
    async fn test_medium_is_silent() {
        let notifier = Arc::new(CountingChannel::default());
        let tickets = Arc::new(CountingChannel::default());
        let dispatcher = AlertDispatcher::new(Some(notifier.clone()), Some(tickets.clone()));

        dispatcher.dispatch(&finding(Severity::Medium)).await;

        assert_eq!(notifier.count(), 0);
        assert_eq!(tickets.count(), 0);
    }

    #[tokio::test]
    async fn test_notification_failure_does_not_suppress_ticket() {
        let notifier = Arc::new(CountingChannel::failing());
        let tickets = Arc::new(CountingChannel::default());
        let dispatcher = AlertDispatcher::new(Some(notifier.clone()), Some(tickets.clone()));

        dispatcher.dispatch(&finding(Severity::Critical)).await;

        assert_eq!(notifier.count(), 1);
        assert_eq!(tickets.count(), 1);
    }

    #[tokio::test]
    async fn test_ticket_failure_does_not_suppress_notification() {
        let notifier = Arc::new(CountingChannel::default());
        let tickets = Arc::new(CountingChannel::failing());
        let dispatcher = AlertDispatcher::new(Some(notifier.clone()), Some(tickets.clone()));

        dispatcher.dispatch(&finding(Severity::Critical)).await;

        assert_eq!(notifier.count(), 1);
        assert_eq!(tickets.count(), 1);
    }

    #[tokio::test]
    async fn test_unconfigured_channels_are_skipped() {
        let dispatcher = AlertDispatcher::new(None, None);
        // Must not panic or error
        dispatcher.dispatch(&finding(Severity::Critical)).await;
    }
}
