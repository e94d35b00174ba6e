use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

pub struct Metrics {
    pub webhooks_received: AtomicU64,
    pub test_events: AtomicU64,
    pub duplicate_events: AtomicU64,
    pub unknown_events: AtomicU64,
    pub payments_started: AtomicU64,
    pub payments_completed: AtomicU64,
    pub payments_bounced: AtomicU64,
    pub payments_refunded: AtomicU64,
    pub activations: AtomicU64,
    pub activation_failures: AtomicU64,
    pub deferred_activations: AtomicU64,
    pub aborted_activations: AtomicU64,
    pub notifications_sent: AtomicU64,
    pub notification_failures: AtomicU64,
    pub memberships_expired: AtomicU64,
    pub checkouts_created: AtomicU64,
    pub errors: AtomicU64,
    pub start_time: Instant,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub webhooks_received: u64,
    pub test_events: u64,
    pub duplicate_events: u64,
    pub unknown_events: u64,
    pub payments_started: u64,
    pub payments_completed: u64,
    pub payments_bounced: u64,
    pub payments_refunded: u64,
    pub activations: u64,
    pub activation_failures: u64,
    pub deferred_activations: u64,
    pub aborted_activations: u64,
    pub notifications_sent: u64,
    pub notification_failures: u64,
    pub memberships_expired: u64,
    pub checkouts_created: u64,
    pub errors: u64,
    pub uptime_secs: u64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            webhooks_received: AtomicU64::new(0),
            test_events: AtomicU64::new(0),
            duplicate_events: AtomicU64::new(0),
            unknown_events: AtomicU64::new(0),
            payments_started: AtomicU64::new(0),
            payments_completed: AtomicU64::new(0),
            payments_bounced: AtomicU64::new(0),
            payments_refunded: AtomicU64::new(0),
            activations: AtomicU64::new(0),
            activation_failures: AtomicU64::new(0),
            deferred_activations: AtomicU64::new(0),
            aborted_activations: AtomicU64::new(0),
            notifications_sent: AtomicU64::new(0),
            notification_failures: AtomicU64::new(0),
            memberships_expired: AtomicU64::new(0),
            checkouts_created: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn increment_webhooks(&self, event_status: &str) {
        self.webhooks_received.fetch_add(1, Ordering::Relaxed);
        match event_status {
            "payment_started" => self.payments_started.fetch_add(1, Ordering::Relaxed),
            "payment_completed" => self.payments_completed.fetch_add(1, Ordering::Relaxed),
            "payment_bounced" => self.payments_bounced.fetch_add(1, Ordering::Relaxed),
            "payment_refunded" => self.payments_refunded.fetch_add(1, Ordering::Relaxed),
            _ => self.unknown_events.fetch_add(1, Ordering::Relaxed),
        };
    }

    pub fn increment_test_events(&self) {
        self.test_events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_duplicate_events(&self) {
        self.duplicate_events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_activations(&self) {
        self.activations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_activation_failures(&self) {
        self.activation_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_deferred_activations(&self) {
        self.deferred_activations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_aborted_activations(&self) {
        self.aborted_activations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_notifications_sent(&self) {
        self.notifications_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_notification_failures(&self) {
        self.notification_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_memberships_expired(&self) {
        self.memberships_expired.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_checkouts_created(&self) {
        self.checkouts_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_errors(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            webhooks_received: self.webhooks_received.load(Ordering::Relaxed),
            test_events: self.test_events.load(Ordering::Relaxed),
            duplicate_events: self.duplicate_events.load(Ordering::Relaxed),
            unknown_events: self.unknown_events.load(Ordering::Relaxed),
            payments_started: self.payments_started.load(Ordering::Relaxed),
            payments_completed: self.payments_completed.load(Ordering::Relaxed),
            payments_bounced: self.payments_bounced.load(Ordering::Relaxed),
            payments_refunded: self.payments_refunded.load(Ordering::Relaxed),
            activations: self.activations.load(Ordering::Relaxed),
            activation_failures: self.activation_failures.load(Ordering::Relaxed),
            deferred_activations: self.deferred_activations.load(Ordering::Relaxed),
            aborted_activations: self.aborted_activations.load(Ordering::Relaxed),
            notifications_sent: self.notifications_sent.load(Ordering::Relaxed),
            notification_failures: self.notification_failures.load(Ordering::Relaxed),
            memberships_expired: self.memberships_expired.load(Ordering::Relaxed),
            checkouts_created: self.checkouts_created.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            uptime_secs: self.start_time.elapsed().as_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_increment_webhooks_by_status() {
        let metrics = Metrics::new();
        metrics.increment_webhooks("payment_started");
        metrics.increment_webhooks("payment_completed");
        metrics.increment_webhooks("payment_completed");
        metrics.increment_webhooks("something_else");

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.webhooks_received, 4);
        assert_eq!(snapshot.payments_started, 1);
        assert_eq!(snapshot.payments_completed, 2);
        assert_eq!(snapshot.unknown_events, 1);
    }

    #[test]
    fn test_increment_activations() {
        let metrics = Metrics::new();
        metrics.increment_activations();
        metrics.increment_activations();
        metrics.increment_activation_failures();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.activations, 2);
        assert_eq!(snapshot.activation_failures, 1);
    }

    #[test]
    fn test_duplicate_and_test_events_tracked_separately() {
        let metrics = Metrics::new();
        metrics.increment_duplicate_events();
        metrics.increment_test_events();
        metrics.increment_test_events();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.duplicate_events, 1);
        assert_eq!(snapshot.test_events, 2);
        assert_eq!(snapshot.webhooks_received, 0);
    }
}
