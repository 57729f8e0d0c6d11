// Cursor-driven signature polling loop
use crate::classifier::{SkipReason, TraitFilter};
use crate::marketplaces::MarketplaceRegistry;
use crate::metadata::MetadataSource;
use crate::metrics::SaleMetrics;
use crate::notifier::SaleNotifier;
use crate::pipeline::{log_skip, process_signature, Classification, SaleOutcome};
use crate::models::SignatureInfo;
use crate::rpc_client::{RpcClient, RpcResult};
use crate::settings::Settings;
use crate::waiter::Waiter;
use log::{debug, info, warn};
use std::sync::Arc;

/// Server-side cap on `getSignaturesForAddress` results.
pub const RPC_PAGE_LIMIT: usize = 1000;

/// Loop pacing and the account being watched
#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub watched_account: String,
    /// Wait after an empty page or a failed page request
    pub poll_interval_ms: u64,
    /// Wait before every transaction fetch
    pub rpc_call_interval_ms: u64,
    /// Batch size of signature requests; `None` uses the RPC maximum
    pub page_limit: Option<usize>,
}

impl PollerConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            watched_account: settings.watched_account.clone(),
            poll_interval_ms: settings.poll_interval_ms,
            rpc_call_interval_ms: settings.rpc_call_interval_ms,
            page_limit: settings.page_limit,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CycleStatus {
    /// Every entry of a non-empty page was visited
    Completed,
    Empty,
    /// The page request failed; cursor untouched
    PageError(String),
    /// The stop signal fired mid-page
    Stopped,
}

/// Result of one poll cycle. `cursor` is what the next cycle should use.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub cursor: String,
    pub status: CycleStatus,
    /// Signatures in the order they were processed
    pub outcomes: Vec<(String, Result<SaleOutcome, SkipReason>)>,
}

impl CycleReport {
    fn unchanged(cursor: String, status: CycleStatus) -> Self {
        Self {
            cursor,
            status,
            outcomes: Vec::new(),
        }
    }

    pub fn notified(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, Ok(SaleOutcome::Notified(_))))
            .count()
    }
}

/// Walks the watched account's history page by page.
///
/// The cursor is threaded through `run_cycle` rather than stored here, so
/// the only mutation point is the loop in [`SalePoller::run`].
pub struct SalePoller<'a, R, M, N>
where
    R: RpcClient + ?Sized,
    M: MetadataSource + ?Sized,
    N: SaleNotifier + ?Sized,
{
    rpc_client: &'a R,
    metadata_source: &'a M,
    notifier: &'a N,
    registry: MarketplaceRegistry,
    trait_filter: TraitFilter,
    config: PollerConfig,
    waiter: Waiter,
    metrics: Arc<SaleMetrics>,
}

impl<'a, R, M, N> SalePoller<'a, R, M, N>
where
    R: RpcClient + ?Sized,
    M: MetadataSource + ?Sized,
    N: SaleNotifier + ?Sized,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        rpc_client: &'a R,
        metadata_source: &'a M,
        notifier: &'a N,
        registry: MarketplaceRegistry,
        trait_filter: TraitFilter,
        config: PollerConfig,
        waiter: Waiter,
    ) -> Self {
        Self {
            rpc_client,
            metadata_source,
            notifier,
            registry,
            trait_filter,
            config,
            waiter,
            metrics: Arc::new(SaleMetrics::new()),
        }
    }

    pub fn metrics(&self) -> &Arc<SaleMetrics> {
        &self.metrics
    }

    /// Poll until the stop signal fires. Returns the last cursor.
    pub async fn run(&mut self, seed_signature: String) -> String {
        info!(
            "Watching {} starting after {}",
            self.config.watched_account, seed_signature
        );
        let mut cursor = seed_signature;

        while !self.waiter.is_stopped() {
            let report = self.run_cycle(cursor).await;
            cursor = report.cursor;
            if !report.outcomes.is_empty() {
                self.log_metrics();
            }
        }

        info!("Exiting main program loop (stop requested), cursor at {}", cursor);
        cursor
    }

    /// One poll: fetch the page after `cursor`, process it oldest first,
    /// and report the cursor for the next cycle.
    pub async fn run_cycle(&mut self, cursor: String) -> CycleReport {
        let page = match self.fetch_new_signatures(&cursor).await {
            Ok(page) => page,
            Err(e) => {
                warn!("Something went wrong fetching signatures: {}", e);
                self.metrics.record_page_failure();
                self.waiter.wait(self.config.poll_interval_ms).await;
                return CycleReport::unchanged(cursor, CycleStatus::PageError(e.to_string()));
            }
        };
        self.metrics.record_page(page.len());

        let Some(newest) = page.first().map(|s| s.signature.clone()) else {
            debug!("No new signatures after {}", cursor);
            self.waiter.wait(self.config.poll_interval_ms).await;
            return CycleReport::unchanged(cursor, CycleStatus::Empty);
        };

        info!("Fetched {} new signatures after {}", page.len(), cursor);
        let rules = Classification {
            registry: &self.registry,
            trait_filter: &self.trait_filter,
        };
        let mut outcomes: Vec<(String, Result<SaleOutcome, SkipReason>)> = Vec::with_capacity(page.len());

        for entry in page.iter().rev() {
            if !self.waiter.wait(self.config.rpc_call_interval_ms).await {
                // Never move the cursor past an entry that was not visited.
                let cursor = outcomes
                    .last()
                    .map(|(sig, _)| sig.clone())
                    .unwrap_or(cursor);
                return CycleReport {
                    cursor,
                    status: CycleStatus::Stopped,
                    outcomes,
                };
            }

            let result = process_signature(
                &entry.signature,
                self.rpc_client,
                self.metadata_source,
                self.notifier,
                &rules,
            )
            .await;

            match &result {
                Ok(SaleOutcome::Notified(_)) => self.metrics.record_notified(),
                // The notifier logs its own failures.
                Ok(SaleOutcome::NotifyFailed { .. }) => self.metrics.record_notify_failure(),
                Err(reason) => {
                    log_skip(&entry.signature, reason);
                    self.metrics.record_skip(reason);
                }
            }
            outcomes.push((entry.signature.clone(), result));
        }

        CycleReport {
            cursor: newest,
            status: CycleStatus::Completed,
            outcomes,
        }
    }

    /// Every signature newer than `cursor`, newest first.
    ///
    /// A batch that comes back full may have more signatures behind it, so
    /// the walk continues with `before` set to the oldest one seen until a
    /// short batch shows the cursor has been reached.
    async fn fetch_new_signatures(&mut self, cursor: &str) -> RpcResult<Vec<SignatureInfo>> {
        let limit = self.config.page_limit.unwrap_or(RPC_PAGE_LIMIT);
        let mut page: Vec<SignatureInfo> = Vec::new();

        loop {
            let before = page.last().map(|s| s.signature.clone());
            if before.is_some() && !self.waiter.wait(self.config.rpc_call_interval_ms).await {
                break;
            }
            let batch = self
                .rpc_client
                .get_signatures_for_address(&self.config.watched_account, before.as_deref(), Some(cursor), Some(limit))
                .await?;
            let full = batch.len() >= limit;
            page.extend(batch);
            if !full {
                break;
            }
            debug!("Batch of {} full, fetching older signatures before {:?}", limit, page.last().map(|s| &s.signature));
        }
        Ok(page)
    }

    pub fn log_metrics(&self) {
        let s = self.metrics.snapshot();
        info!(
            "Sale metrics: pages={} page_failures={} empty={} processed={} failed_tx={} unknown_market={} metadata_miss={} trait_miss={} fetch_err={} notified={} notify_failed={}",
            s.pages_fetched,
            s.page_failures,
            s.empty_polls,
            s.signatures_processed,
            s.failed_transactions,
            s.unknown_marketplaces,
            s.metadata_misses,
            s.trait_mismatches,
            s.fetch_errors,
            s.sales_notified,
            s.notify_failures
        );
    }
}
