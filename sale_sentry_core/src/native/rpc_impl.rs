// Native RPC client implementation wrapping solana_client::RpcClient

use crate::error::CoreError;
use crate::models::SignatureInfo;
use crate::rpc_client::{RpcClient as RpcClientTrait, RpcResult};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as Base64Engine, Engine as _};
use log::debug;
use serde_json::{json, Value};
use solana_client::client_error::ClientErrorKind;
use solana_client::rpc_client::{GetConfirmedSignaturesForAddress2Config, RpcClient as SolanaRpcClient};
use solana_client::rpc_config::RpcTransactionConfig;
use solana_client::rpc_response::RpcConfirmedTransactionStatusWithSignature;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_transaction_status::UiTransactionEncoding;
use std::str::FromStr;
use std::sync::Arc;

/// Native RPC client wrapping solana_client::RpcClient
pub struct NativeRpcClient {
    client: Arc<SolanaRpcClient>,
}

impl NativeRpcClient {
    pub fn new(endpoint: String) -> Self {
        Self {
            client: Arc::new(SolanaRpcClient::new_with_commitment(
                endpoint,
                CommitmentConfig::confirmed(),
            )),
        }
    }

    pub fn from_arc(client: Arc<SolanaRpcClient>) -> Self {
        Self { client }
    }
}

fn parse_pubkey(pubkey: &str) -> RpcResult<Pubkey> {
    Pubkey::from_str(pubkey).map_err(|e| CoreError::ParseError(format!("Invalid pubkey: {}", e)))
}

fn parse_signature(signature: &str) -> RpcResult<Signature> {
    Signature::from_str(signature).map_err(|e| CoreError::ParseError(format!("Invalid signature: {}", e)))
}

fn to_signature_info(status: RpcConfirmedTransactionStatusWithSignature) -> SignatureInfo {
    SignatureInfo {
        signature: status.signature,
        slot: status.slot,
        err: status.err.and_then(|e| serde_json::to_value(e).ok()),
        block_time: status.block_time,
    }
}

#[async_trait(?Send)]
impl RpcClientTrait for NativeRpcClient {
    async fn get_signatures_for_address(
        &self,
        address: &str,
        before: Option<&str>,
        until: Option<&str>,
        limit: Option<usize>,
    ) -> RpcResult<Vec<SignatureInfo>> {
        debug!(
            "Native RPC: get_signatures_for_address {} before {:?} until {:?}",
            address, before, until
        );

        let address = parse_pubkey(address)?;
        let before = before.map(parse_signature).transpose()?;
        let until = until.map(parse_signature).transpose()?;
        let config = GetConfirmedSignaturesForAddress2Config {
            before,
            until,
            limit,
            commitment: Some(CommitmentConfig::confirmed()),
        };

        let client = self.client.clone();
        let statuses = tokio::task::spawn_blocking(move || {
            client.get_signatures_for_address_with_config(&address, config)
        })
        .await
        .map_err(|e| CoreError::Rpc(format!("Task join error: {}", e)))?
        .map_err(|e| CoreError::Rpc(format!("get_signatures_for_address failed: {}", e)))?;

        Ok(statuses.into_iter().map(to_signature_info).collect())
    }

    async fn get_transaction(&self, signature: &str) -> RpcResult<Option<Value>> {
        debug!("Native RPC: get_transaction for {}", signature);

        let signature = parse_signature(signature)?;
        let config = RpcTransactionConfig {
            encoding: Some(UiTransactionEncoding::JsonParsed),
            commitment: Some(CommitmentConfig::confirmed()),
            max_supported_transaction_version: Some(0),
        };

        let client = self.client.clone();
        let tx = tokio::task::spawn_blocking(move || {
            client.get_transaction_with_config(&signature, config)
        })
        .await
        .map_err(|e| CoreError::Rpc(format!("Task join error: {}", e)))?;

        match tx {
            Ok(tx_with_status) => Ok(Some(serde_json::to_value(tx_with_status)?)),
            // A null result fails to deserialize; that is the "not found" case.
            Err(e) if matches!(e.kind(), ClientErrorKind::SerdeJson(_)) => Ok(None),
            Err(e) => Err(CoreError::Rpc(format!("get_transaction failed: {}", e))),
        }
    }

    async fn get_account_info(&self, pubkey: &str) -> RpcResult<Option<Value>> {
        debug!("Native RPC: get_account_info for {}", pubkey);

        let pubkey = parse_pubkey(pubkey)?;
        let client = self.client.clone();
        let response = tokio::task::spawn_blocking(move || {
            client.get_account_with_commitment(&pubkey, CommitmentConfig::confirmed())
        })
        .await
        .map_err(|e| CoreError::Rpc(format!("Task join error: {}", e)))?
        .map_err(|e| CoreError::Rpc(format!("get_account_info failed: {}", e)))?;

        Ok(response.value.map(|acc| {
            json!({
                "data": [Base64Engine.encode(&acc.data), "base64"],
                "executable": acc.executable,
                "lamports": acc.lamports,
                "owner": acc.owner.to_string(),
                "rentEpoch": acc.rent_epoch,
            })
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::transaction::TransactionError;

    #[test]
    fn test_signature_status_conversion() {
        let status = RpcConfirmedTransactionStatusWithSignature {
            signature: "5sig".to_string(),
            slot: 42,
            err: Some(TransactionError::AccountInUse),
            memo: None,
            block_time: Some(1_651_234_567),
            confirmation_status: None,
        };
        let info = to_signature_info(status);
        assert_eq!(info.signature, "5sig");
        assert_eq!(info.slot, 42);
        assert_eq!(info.err, Some(json!("AccountInUse")));
        assert_eq!(info.block_time, Some(1_651_234_567));
    }

    #[test]
    fn test_rejects_malformed_inputs() {
        assert!(parse_pubkey("not-a-key").is_err());
        assert!(parse_signature("not-a-signature").is_err());
        assert!(parse_pubkey("G1GP13EJK23nr7YL69SJWn7CWtm8hQBQCiebssinU1Jc").is_ok());
    }
}
