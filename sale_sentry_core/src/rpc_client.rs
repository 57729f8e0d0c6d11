// Ledger RPC abstraction - lets the poller run against solana_client or a test double

use crate::error::CoreError;
use crate::models::SignatureInfo;
use async_trait::async_trait;
use serde_json::Value;

/// Result type for RPC operations
pub type RpcResult<T> = Result<T, CoreError>;

/// The subset of the Solana JSON-RPC surface the sale watcher needs.
#[async_trait(?Send)]
pub trait RpcClient {
    /// Signatures touching `address`, newest first. Starts after `before`
    /// (or at the tip) and stops before `until`; at most `limit` entries.
    async fn get_signatures_for_address(
        &self,
        address: &str,
        before: Option<&str>,
        until: Option<&str>,
        limit: Option<usize>,
    ) -> RpcResult<Vec<SignatureInfo>>;

    /// Full transaction as RPC JSON (`blockTime`, `meta`, `transaction`).
    async fn get_transaction(&self, signature: &str) -> RpcResult<Option<Value>>;

    /// Account info in the `{"data": [<base64>, "base64"], ...}` shape.
    async fn get_account_info(&self, pubkey: &str) -> RpcResult<Option<Value>>;
}
