use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use solana_program::pubkey::Pubkey;
use std::str::FromStr;

/// Metaplex Token Metadata program
pub const DEFAULT_METADATA_PROGRAM: &str = "metaqbxxUerdq28cj1RbAWkYQm3ybzJb6a8bt518x1s";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    #[serde(default = "default_solana_rpc_url")]
    pub solana_rpc_url: String,
    #[serde(default = "default_metadata_program")]
    pub metadata_program: String,
    /// Collection account whose transaction history is walked
    #[serde(default)]
    pub watched_account: String,
    /// Signature the history walk starts after
    #[serde(default)]
    pub seed_signature: String,
    #[serde(default)]
    pub twitter_api_key: String,
    #[serde(default)]
    pub twitter_api_secret: String,
    #[serde(default)]
    pub twitter_access_token: String,
    #[serde(default)]
    pub twitter_access_token_secret: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_rpc_call_interval_ms")]
    pub rpc_call_interval_ms: u64,
    #[serde(default)]
    pub page_limit: Option<usize>,
    #[serde(default = "default_trait_type")]
    pub trait_type: String,
    #[serde(default = "default_trait_value")]
    pub trait_value: String,
    #[serde(default = "default_attach_image")]
    pub attach_image: bool,
    #[serde(default = "default_post_enabled")]
    pub post_enabled: bool,
    #[serde(default = "default_explorer_base_url")]
    pub explorer_base_url: String,
    /// Extra marketplace accounts merged over the built-in registry
    #[serde(default)]
    pub marketplaces: Vec<MarketplaceEntry>,
}

/// `[[marketplaces]]` table in the config file. An array of tables keeps
/// the case-sensitive base58 account out of key position.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct MarketplaceEntry {
    pub account: String,
    pub name: String,
}

impl Settings {
    /// Load settings from an optional TOML file, overridden by
    /// `SALE_SENTRY_*` environment variables.
    #[cfg(feature = "native")]
    pub fn from_file(path: &str) -> Result<Self, CoreError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("SALE_SENTRY"));
        let cfg = builder.build()?;
        Ok(cfg.try_deserialize()?)
    }

    /// Validate required fields and value ranges.
    ///
    /// Missing required settings are reported one at a time, in the order
    /// they are checked, so the startup log names the first gap.
    pub fn validate(&self) -> Result<(), CoreError> {
        let required = [
            ("watched_account", &self.watched_account),
            ("seed_signature", &self.seed_signature),
            ("twitter_api_key", &self.twitter_api_key),
            ("twitter_api_secret", &self.twitter_api_secret),
            ("twitter_access_token", &self.twitter_access_token),
            ("twitter_access_token_secret", &self.twitter_access_token_secret),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(CoreError::Validation(format!("{} is required", name)));
            }
        }

        Pubkey::from_str(&self.watched_account).map_err(|e| {
            CoreError::Validation(format!("watched_account is not a valid address: {}", e))
        })?;
        Pubkey::from_str(&self.metadata_program).map_err(|e| {
            CoreError::Validation(format!("metadata_program is not a valid address: {}", e))
        })?;

        let seed = bs58::decode(self.seed_signature.trim())
            .into_vec()
            .map_err(|e| CoreError::Validation(format!("seed_signature is not base58: {}", e)))?;
        if seed.len() != 64 {
            return Err(CoreError::Validation(format!(
                "seed_signature must decode to 64 bytes, got {}",
                seed.len()
            )));
        }

        if self.poll_interval_ms == 0 {
            return Err(CoreError::Validation("poll_interval_ms must be > 0".to_string()));
        }
        if self.page_limit == Some(0) {
            return Err(CoreError::Validation("page_limit must be > 0 when set".to_string()));
        }
        for entry in &self.marketplaces {
            Pubkey::from_str(&entry.account).map_err(|e| {
                CoreError::Validation(format!("marketplace account {} is invalid: {}", entry.account, e))
            })?;
        }
        if self.trait_type.trim().is_empty() || self.trait_value.trim().is_empty() {
            return Err(CoreError::Validation(
                "trait_type and trait_value must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_solana_rpc_url() -> String { "https://api.mainnet-beta.solana.com".to_string() }
fn default_metadata_program() -> String { DEFAULT_METADATA_PROGRAM.to_string() }
fn default_poll_interval_ms() -> u64 { 10_000 }
fn default_rpc_call_interval_ms() -> u64 { 5_000 }
fn default_trait_type() -> String { "Fur".to_string() }
fn default_trait_value() -> String { "Green".to_string() }
fn default_attach_image() -> bool { true }
fn default_post_enabled() -> bool { true }
fn default_explorer_base_url() -> String { "https://solscan.io/tx/".to_string() }
