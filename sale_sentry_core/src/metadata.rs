// Token metadata resolution - platform agnostic interface
// mint -> metadata PDA -> on-chain Metadata account -> off-chain JSON document

use crate::error::CoreError;
use crate::models::AssetMetadata;
use crate::rpc_client::RpcClient;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as Base64Engine, Engine as _};
use log::{debug, error};
use mpl_token_metadata::accounts::Metadata;
use solana_program::pubkey::Pubkey;
use std::str::FromStr;

/// Result type for metadata operations
pub type MetadataResult<T> = Result<T, CoreError>;

/// Abstract HTTP client for off-chain documents and images
#[async_trait(?Send)]
pub trait HttpClient {
    /// Fetch text content from a URL
    async fn fetch_text(&self, url: &str) -> MetadataResult<String>;

    /// Fetch raw bytes from a URL
    async fn fetch_bytes(&self, url: &str) -> MetadataResult<Vec<u8>>;
}

/// Anything that can turn a mint into its off-chain metadata document.
///
/// `None` covers every failure; implementations log the cause.
#[async_trait(?Send)]
pub trait MetadataSource {
    async fn resolve(&self, mint: &str) -> Option<AssetMetadata>;
}

/// Compute metadata PDA for a mint
pub fn compute_metadata_pda(mint: &str, metadata_program: &str) -> MetadataResult<String> {
    let metadata_program_pk = Pubkey::from_str(metadata_program)
        .map_err(|e| CoreError::ParseError(format!("Invalid metadata program: {}", e)))?;
    let mint_pk = Pubkey::from_str(mint)
        .map_err(|e| CoreError::ParseError(format!("Invalid mint: {}", e)))?;

    let (metadata_pda, _) = Pubkey::find_program_address(
        &[b"metadata", metadata_program_pk.as_ref(), mint_pk.as_ref()],
        &metadata_program_pk,
    );

    Ok(metadata_pda.to_string())
}

/// Parse on-chain metadata from account data
pub fn parse_onchain_metadata(account_data: &[u8]) -> MetadataResult<Metadata> {
    Metadata::safe_deserialize(account_data)
        .map_err(|e| CoreError::ParseError(format!("Failed to deserialize metadata: {}", e)))
}

/// Decode account data from RPC response
pub fn decode_account_data(account_info: &serde_json::Value) -> MetadataResult<Vec<u8>> {
    // Some RPC implementations put the account under result.value
    let account_obj = account_info.get("value").unwrap_or(account_info);

    let base64_str = account_obj
        .get("data")
        .and_then(|d| d.as_array())
        .and_then(|arr| arr.first())
        .and_then(|v| v.as_str())
        .ok_or_else(|| CoreError::ParseError("No data field in account info".to_string()))?;

    Base64Engine
        .decode(base64_str)
        .map_err(|e| CoreError::ParseError(format!("Failed to decode base64 account data: {}", e)))
}

/// Parse the off-chain metadata document
pub fn parse_asset_metadata(json_str: &str) -> MetadataResult<AssetMetadata> {
    serde_json::from_str(json_str)
        .map_err(|e| CoreError::ParseError(format!("Failed to parse metadata JSON: {}", e)))
}

/// Only absolute http(s) URIs are fetched.
pub fn validate_uri(uri: &str) -> MetadataResult<url::Url> {
    let parsed = url::Url::parse(uri)
        .map_err(|e| CoreError::InvalidInput(format!("Invalid metadata URI {}: {}", uri, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(CoreError::InvalidInput(format!(
            "Unsupported metadata URI scheme {}: {}",
            other, uri
        ))),
    }
}

/// Fetch and parse the off-chain document at `uri`
pub async fn fetch_asset_metadata<H: HttpClient + ?Sized>(
    uri: &str,
    http_client: &H,
) -> MetadataResult<AssetMetadata> {
    let url = validate_uri(uri)?;
    debug!("Fetching off-chain metadata from: {}", url);
    let body = http_client.fetch_text(url.as_str()).await?;
    parse_asset_metadata(&body)
}

/// Resolves metadata through the ledger and an HTTP client.
pub struct MetadataResolver<'a, R: RpcClient + ?Sized, H: HttpClient + ?Sized> {
    rpc_client: &'a R,
    http_client: &'a H,
    metadata_program: String,
}

impl<'a, R: RpcClient + ?Sized, H: HttpClient + ?Sized> MetadataResolver<'a, R, H> {
    pub fn new(rpc_client: &'a R, http_client: &'a H, metadata_program: impl Into<String>) -> Self {
        Self {
            rpc_client,
            http_client,
            metadata_program: metadata_program.into(),
        }
    }

    /// URI stored in the mint's on-chain metadata account
    pub async fn resolve_uri(&self, mint: &str) -> MetadataResult<String> {
        let metadata_pda = compute_metadata_pda(mint, &self.metadata_program)?;
        debug!("Metadata PDA for {}: {}", mint, metadata_pda);

        let account_info = self
            .rpc_client
            .get_account_info(&metadata_pda)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Metadata account {} for mint {}", metadata_pda, mint)))?;
        let data = decode_account_data(&account_info)?;
        let onchain = parse_onchain_metadata(&data)?;

        let uri = onchain.uri.trim_end_matches('\u{0}').trim().to_string();
        if uri.is_empty() {
            return Err(CoreError::NotFound(format!("Empty metadata URI for mint {}", mint)));
        }
        Ok(uri)
    }

    /// Full resolution, surfacing the error instead of logging it
    pub async fn try_resolve(&self, mint: &str) -> MetadataResult<AssetMetadata> {
        let uri = self.resolve_uri(mint).await?;
        fetch_asset_metadata(&uri, self.http_client).await
    }
}

#[async_trait(?Send)]
impl<'a, R: RpcClient + ?Sized, H: HttpClient + ?Sized> MetadataSource for MetadataResolver<'a, R, H> {
    async fn resolve(&self, mint: &str) -> Option<AssetMetadata> {
        match self.try_resolve(mint).await {
            Ok(meta) => {
                debug!("Fetched metadata for {}: {}", mint, meta.name);
                Some(meta)
            }
            Err(e) => {
                error!("fetching metadata for {}: {}", mint, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SignatureInfo;
    use crate::rpc_client::RpcResult;
    use crate::settings::DEFAULT_METADATA_PROGRAM;
    use serde_json::{json, Value};
    use std::cell::RefCell;

    const MINT: &str = "FqUwnBMN1shpeqKVm7W5fN73tvrjVr19TQFFgkoFFzhq";

    struct AccountRpc {
        account: Option<Value>,
        requested: RefCell<Vec<String>>,
    }

    #[async_trait(?Send)]
    impl RpcClient for AccountRpc {
        async fn get_signatures_for_address(
            &self,
            _address: &str,
            _before: Option<&str>,
            _until: Option<&str>,
            _limit: Option<usize>,
        ) -> RpcResult<Vec<SignatureInfo>> {
            Ok(Vec::new())
        }

        async fn get_transaction(&self, _signature: &str) -> RpcResult<Option<Value>> {
            Ok(None)
        }

        async fn get_account_info(&self, pubkey: &str) -> RpcResult<Option<Value>> {
            self.requested.borrow_mut().push(pubkey.to_string());
            Ok(self.account.clone())
        }
    }

    struct StaticHttp {
        body: Result<String, String>,
        urls: RefCell<Vec<String>>,
    }

    #[async_trait(?Send)]
    impl HttpClient for StaticHttp {
        async fn fetch_text(&self, url: &str) -> MetadataResult<String> {
            self.urls.borrow_mut().push(url.to_string());
            self.body.clone().map_err(CoreError::Http)
        }

        async fn fetch_bytes(&self, url: &str) -> MetadataResult<Vec<u8>> {
            self.fetch_text(url).await.map(String::into_bytes)
        }
    }

    fn borsh_string(out: &mut Vec<u8>, s: &str, padded_len: usize) {
        let mut bytes = s.as_bytes().to_vec();
        bytes.resize(padded_len.max(bytes.len()), 0);
        out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
        out.extend_from_slice(&bytes);
    }

    // MetadataV1 account with all optional trailing fields unset. Strings
    // are NUL padded the way the program stores them.
    fn metadata_account(uri: &str) -> Vec<u8> {
        let mut data = vec![4u8];
        data.extend_from_slice(&[1u8; 32]);
        data.extend_from_slice(Pubkey::from_str(MINT).unwrap().as_ref());
        borsh_string(&mut data, "Okay Bear #42", 32);
        borsh_string(&mut data, "okay_bears", 10);
        borsh_string(&mut data, uri, 200);
        data.extend_from_slice(&750u16.to_le_bytes());
        data.push(0); // creators
        data.push(1); // primary_sale_happened
        data.push(1); // is_mutable
        data.extend_from_slice(&[0u8; 6]); // edition_nonce .. programmable_config
        data
    }

    fn account_json(data: &[u8]) -> Value {
        json!({"data": [Base64Engine.encode(data), "base64"], "lamports": 5616720u64})
    }

    #[test]
    fn test_compute_metadata_pda_is_deterministic() {
        let a = compute_metadata_pda(MINT, DEFAULT_METADATA_PROGRAM).unwrap();
        let b = compute_metadata_pda(MINT, DEFAULT_METADATA_PROGRAM).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, MINT);
        assert!(compute_metadata_pda("", DEFAULT_METADATA_PROGRAM).is_err());
        assert!(compute_metadata_pda("not a key", DEFAULT_METADATA_PROGRAM).is_err());
    }

    #[test]
    fn test_decode_account_data_shapes() {
        let direct = account_json(b"abc");
        assert_eq!(decode_account_data(&direct).unwrap(), b"abc");
        let wrapped = json!({"context": {"slot": 1}, "value": account_json(b"xyz")});
        assert_eq!(decode_account_data(&wrapped).unwrap(), b"xyz");
        assert!(decode_account_data(&json!({"lamports": 1})).is_err());
    }

    #[test]
    fn test_validate_uri() {
        assert!(validate_uri("https://arweave.net/abc").is_ok());
        assert!(validate_uri("ipfs://bafy").is_err());
        assert!(validate_uri("").is_err());
    }

    #[tokio::test]
    async fn test_resolver_full_path() {
        let rpc = AccountRpc {
            account: Some(account_json(&metadata_account("https://arweave.net/bear42"))),
            requested: RefCell::new(Vec::new()),
        };
        let http = StaticHttp {
            body: Ok(r#"{"name": "Okay Bear #42", "attributes": [{"trait_type": "Fur", "value": "Green"}]}"#.to_string()),
            urls: RefCell::new(Vec::new()),
        };
        let resolver = MetadataResolver::new(&rpc, &http, DEFAULT_METADATA_PROGRAM);

        let meta = resolver.resolve(MINT).await.unwrap();
        assert_eq!(meta.name, "Okay Bear #42");
        assert_eq!(meta.trait_value("Fur"), Some("Green"));

        let expected_pda = compute_metadata_pda(MINT, DEFAULT_METADATA_PROGRAM).unwrap();
        assert_eq!(*rpc.requested.borrow(), vec![expected_pda]);
        // NUL padding is stripped before fetching
        assert_eq!(*http.urls.borrow(), vec!["https://arweave.net/bear42".to_string()]);
    }

    #[tokio::test]
    async fn test_resolver_missing_account_is_none() {
        let rpc = AccountRpc { account: None, requested: RefCell::new(Vec::new()) };
        let http = StaticHttp { body: Ok("{}".to_string()), urls: RefCell::new(Vec::new()) };
        let resolver = MetadataResolver::new(&rpc, &http, DEFAULT_METADATA_PROGRAM);

        assert!(resolver.resolve(MINT).await.is_none());
        assert!(http.urls.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_resolver_garbage_account_is_none() {
        let rpc = AccountRpc {
            account: Some(account_json(&[9, 9, 9])),
            requested: RefCell::new(Vec::new()),
        };
        let http = StaticHttp { body: Ok("{}".to_string()), urls: RefCell::new(Vec::new()) };
        let resolver = MetadataResolver::new(&rpc, &http, DEFAULT_METADATA_PROGRAM);
        assert!(resolver.resolve(MINT).await.is_none());
    }

    #[tokio::test]
    async fn test_resolver_document_failure_is_none() {
        let rpc = AccountRpc {
            account: Some(account_json(&metadata_account("https://arweave.net/bear42"))),
            requested: RefCell::new(Vec::new()),
        };
        let http = StaticHttp { body: Err("connection reset".to_string()), urls: RefCell::new(Vec::new()) };
        let resolver = MetadataResolver::new(&rpc, &http, DEFAULT_METADATA_PROGRAM);
        assert!(resolver.resolve(MINT).await.is_none());

        let http = StaticHttp { body: Ok("<html>".to_string()), urls: RefCell::new(Vec::new()) };
        let resolver = MetadataResolver::new(&rpc, &http, DEFAULT_METADATA_PROGRAM);
        assert!(resolver.try_resolve(MINT).await.is_err());
    }
}
