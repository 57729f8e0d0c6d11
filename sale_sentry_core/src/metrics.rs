// Sale watcher outcome counters
use crate::classifier::SkipReason;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Running totals of what the poller has seen
#[derive(Debug, Default)]
pub struct SaleMetrics {
    /// Signature pages fetched successfully (including empty ones)
    pub pages_fetched: AtomicU64,
    /// Signature page requests that failed at the transport
    pub page_failures: AtomicU64,
    pub empty_polls: AtomicU64,
    pub signatures_processed: AtomicU64,
    pub failed_transactions: AtomicU64,
    pub unknown_marketplaces: AtomicU64,
    /// Missing mint or unresolvable metadata
    pub metadata_misses: AtomicU64,
    pub trait_mismatches: AtomicU64,
    pub fetch_errors: AtomicU64,
    pub sales_notified: AtomicU64,
    pub notify_failures: AtomicU64,
}

impl SaleMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_page(&self, len: usize) {
        self.pages_fetched.fetch_add(1, Ordering::Relaxed);
        if len == 0 {
            self.empty_polls.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_page_failure(&self) {
        self.page_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_notified(&self) {
        self.signatures_processed.fetch_add(1, Ordering::Relaxed);
        self.sales_notified.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_notify_failure(&self) {
        self.signatures_processed.fetch_add(1, Ordering::Relaxed);
        self.notify_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skip(&self, reason: &SkipReason) {
        self.signatures_processed.fetch_add(1, Ordering::Relaxed);
        let counter = match reason {
            SkipReason::TransactionFailed(_) => &self.failed_transactions,
            SkipReason::UnknownMarketplace(_) => &self.unknown_marketplaces,
            SkipReason::MissingMint | SkipReason::MetadataUnavailable(_) => &self.metadata_misses,
            SkipReason::TraitMismatch { .. } => &self.trait_mismatches,
            SkipReason::TransactionNotFound | SkipReason::Fetch(_) => &self.fetch_errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            pages_fetched: self.pages_fetched.load(Ordering::Relaxed),
            page_failures: self.page_failures.load(Ordering::Relaxed),
            empty_polls: self.empty_polls.load(Ordering::Relaxed),
            signatures_processed: self.signatures_processed.load(Ordering::Relaxed),
            failed_transactions: self.failed_transactions.load(Ordering::Relaxed),
            unknown_marketplaces: self.unknown_marketplaces.load(Ordering::Relaxed),
            metadata_misses: self.metadata_misses.load(Ordering::Relaxed),
            trait_mismatches: self.trait_mismatches.load(Ordering::Relaxed),
            fetch_errors: self.fetch_errors.load(Ordering::Relaxed),
            sales_notified: self.sales_notified.load(Ordering::Relaxed),
            notify_failures: self.notify_failures.load(Ordering::Relaxed),
        }
    }
}

/// Immutable snapshot of sale metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub pages_fetched: u64,
    pub page_failures: u64,
    pub empty_polls: u64,
    pub signatures_processed: u64,
    pub failed_transactions: u64,
    pub unknown_marketplaces: u64,
    pub metadata_misses: u64,
    pub trait_mismatches: u64,
    pub fetch_errors: u64,
    pub sales_notified: u64,
    pub notify_failures: u64,
}

impl MetricsSnapshot {
    /// Share of processed signatures that ended in a notification attempt
    pub fn sale_rate_percent(&self) -> f64 {
        if self.signatures_processed == 0 {
            return 0.0;
        }
        ((self.sales_notified + self.notify_failures) as f64 / self.signatures_processed as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_tracking() {
        let metrics = SaleMetrics::new();
        metrics.record_page(0);
        metrics.record_page(3);
        metrics.record_page_failure();
        metrics.record_skip(&SkipReason::TransactionFailed("{}".to_string()));
        metrics.record_skip(&SkipReason::TraitMismatch { found: None });
        metrics.record_notified();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.pages_fetched, 2);
        assert_eq!(snapshot.empty_polls, 1);
        assert_eq!(snapshot.page_failures, 1);
        assert_eq!(snapshot.signatures_processed, 3);
        assert_eq!(snapshot.failed_transactions, 1);
        assert_eq!(snapshot.trait_mismatches, 1);
        assert_eq!(snapshot.sales_notified, 1);
    }

    #[test]
    fn test_sale_rate() {
        let metrics = SaleMetrics::new();
        assert_eq!(metrics.snapshot().sale_rate_percent(), 0.0);
        for _ in 0..3 {
            metrics.record_skip(&SkipReason::UnknownMarketplace("x".to_string()));
        }
        metrics.record_notify_failure();
        assert!((metrics.snapshot().sale_rate_percent() - 25.0).abs() < 0.01);
    }
}
