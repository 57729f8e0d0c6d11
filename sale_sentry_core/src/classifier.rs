// Sale classification gates
use crate::marketplaces::MarketplaceRegistry;
use crate::models::AssetMetadata;
use crate::settings::Settings;
use crate::tx_parser::SaleTransaction;

/// Why a signature did not produce a notification.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// Ledger returned no transaction for the signature
    TransactionNotFound,
    /// `meta.err` was set
    TransactionFailed(String),
    UnknownMarketplace(String),
    /// No post-transaction token balance to read a mint from
    MissingMint,
    MetadataUnavailable(String),
    TraitMismatch { found: Option<String> },
    /// Transport or decoding failure while fetching the transaction
    Fetch(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::TransactionNotFound => write!(f, "transaction not found"),
            SkipReason::TransactionFailed(err) => write!(f, "transaction failed: {}", err),
            SkipReason::UnknownMarketplace(account) => write!(f, "marketplace not found: {}", account),
            SkipReason::MissingMint => write!(f, "no mint in post token balances"),
            SkipReason::MetadataUnavailable(mint) => write!(f, "no metadata for mint {}", mint),
            SkipReason::TraitMismatch { found } => {
                write!(f, "trait value {}", found.as_deref().unwrap_or("<absent>"))
            }
            SkipReason::Fetch(e) => write!(f, "fetch failed: {}", e),
        }
    }
}

/// Marketplace gate: the display name for the transaction's marketplace
/// account, or the skip reason when the account is not registered.
pub fn classify_marketplace(
    tx: &SaleTransaction,
    registry: &MarketplaceRegistry,
) -> Result<String, SkipReason> {
    registry
        .name_of(&tx.marketplace_account)
        .map(str::to_string)
        .ok_or_else(|| SkipReason::UnknownMarketplace(tx.marketplace_account.clone()))
}

/// The qualifying `(trait_type, value)` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct TraitFilter {
    pub trait_type: String,
    pub value: String,
}

impl TraitFilter {
    pub fn new(trait_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            trait_type: trait_type.into(),
            value: value.into(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.trait_type.clone(), settings.trait_value.clone())
    }

    /// Trait gate. Only the first attribute with the filter's trait type
    /// is considered.
    pub fn check(&self, metadata: &AssetMetadata) -> Result<(), SkipReason> {
        match metadata.trait_value(&self.trait_type) {
            Some(v) if v == self.value => Ok(()),
            found => Err(SkipReason::TraitMismatch {
                found: found.map(str::to_string),
            }),
        }
    }
}

impl Default for TraitFilter {
    fn default() -> Self {
        Self::new("Fur", "Green")
    }
}
