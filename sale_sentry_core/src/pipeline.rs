use crate::classifier::{classify_marketplace, SkipReason, TraitFilter};
use crate::marketplaces::MarketplaceRegistry;
use crate::metadata::MetadataSource;
use crate::models::SaleEvent;
use crate::notifier::SaleNotifier;
use crate::rpc_client::RpcClient;
use crate::tx_parser::{format_local_sale_time, normalize_transaction, transaction_error};
use log::{debug, error, info, warn};
use serde_json::Value;

/// What happened to a signature that made it through every gate.
#[derive(Debug, Clone, PartialEq)]
pub enum SaleOutcome {
    Notified(SaleEvent),
    /// The sale qualified but the notifier returned an error
    NotifyFailed { sale: SaleEvent, error: String },
}

/// Static inputs of classification.
#[derive(Debug, Clone)]
pub struct Classification<'a> {
    pub registry: &'a MarketplaceRegistry,
    pub trait_filter: &'a TraitFilter,
}

/// Run a fetched transaction through every gate and build the sale.
///
/// Order matters: a failed transaction is rejected before any field is
/// extracted, and an unknown marketplace is rejected before metadata is
/// requested.
pub async fn evaluate_transaction<M: MetadataSource + ?Sized>(
    signature: &str,
    tx: &Value,
    metadata_source: &M,
    rules: &Classification<'_>,
) -> Result<SaleEvent, SkipReason> {
    if let Some(err) = transaction_error(tx) {
        return Err(SkipReason::TransactionFailed(err.to_string()));
    }

    let sale_tx = normalize_transaction(tx);
    let marketplace = classify_marketplace(&sale_tx, rules.registry)?;

    if sale_tx.mint.is_empty() {
        return Err(SkipReason::MissingMint);
    }

    let metadata = metadata_source
        .resolve(&sale_tx.mint)
        .await
        .ok_or_else(|| SkipReason::MetadataUnavailable(sale_tx.mint.clone()))?;

    rules.trait_filter.check(&metadata)?;

    Ok(SaleEvent {
        metadata,
        sale_time: format_local_sale_time(sale_tx.block_time),
        price_sol: sale_tx.price_sol(),
        signature: signature.to_string(),
        marketplace,
    })
}

/// Fetch, classify, enrich and notify a single signature.
pub async fn process_signature<R, M, N>(
    signature: &str,
    rpc_client: &R,
    metadata_source: &M,
    notifier: &N,
    rules: &Classification<'_>,
) -> Result<SaleOutcome, SkipReason>
where
    R: RpcClient + ?Sized,
    M: MetadataSource + ?Sized,
    N: SaleNotifier + ?Sized,
{
    debug!("Processing signature: {}", signature);

    let tx = match rpc_client.get_transaction(signature).await {
        Ok(Some(tx)) => tx,
        Ok(None) => return Err(SkipReason::TransactionNotFound),
        Err(e) => return Err(SkipReason::Fetch(e.to_string())),
    };

    let sale = evaluate_transaction(signature, &tx, metadata_source, rules).await?;

    match notifier.notify(&sale).await {
        Ok(()) => Ok(SaleOutcome::Notified(sale)),
        Err(e) => Ok(SaleOutcome::NotifyFailed {
            sale,
            error: e.to_string(),
        }),
    }
}

/// Log a skipped signature at the level its reason deserves.
pub fn log_skip(signature: &str, reason: &SkipReason) {
    match reason {
        SkipReason::TransactionFailed(err) => {
            warn!("Transaction {} errored with: {}", signature, err)
        }
        SkipReason::UnknownMarketplace(account) => {
            warn!("Marketplace not found for {}: {}", signature, account)
        }
        SkipReason::MetadataUnavailable(mint) => {
            warn!("No metadata for mint value: {} ({})", mint, signature)
        }
        SkipReason::MissingMint => info!("No token balance mint in {}", signature),
        SkipReason::TraitMismatch { .. } => info!("Skipping {}: {}", signature, reason),
        SkipReason::TransactionNotFound | SkipReason::Fetch(_) => {
            error!("error going through transaction {}: {}", signature, reason)
        }
    }
}
