// Transaction field extraction - platform agnostic
// Turns raw getTransaction JSON into a fully populated, zero-defaulted record

use chrono::{DateTime, TimeZone};
use log::debug;
use serde_json::Value;
use solana_program::native_token::LAMPORTS_PER_SOL;

/// Sale-relevant fields of a successful transaction.
///
/// Every field is populated: anything the ledger omitted is its zero value,
/// so nothing downstream re-checks for absence.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SaleTransaction {
    pub block_time: i64,
    pub pre_balance: u64,
    pub post_balance: u64,
    pub account_keys: Vec<String>,
    /// Last entry of `account_keys`. This assumes the marketplace program
    /// sits at the end of the account list; it is not checked against the
    /// instruction data and misattributes programs with other layouts.
    pub marketplace_account: String,
    pub mint: String,
}

impl SaleTransaction {
    /// Absolute lamport movement of account slot 0, in SOL.
    pub fn price_sol(&self) -> f64 {
        sale_price_sol(self.pre_balance, self.post_balance)
    }
}

/// The transaction's `meta.err`, if it carries a non-null one.
pub fn transaction_error(tx: &Value) -> Option<&Value> {
    tx.get("meta")
        .and_then(|m| m.get("err"))
        .filter(|e| !e.is_null())
}

/// Extract sale fields from a getTransaction result.
pub fn normalize_transaction(tx: &Value) -> SaleTransaction {
    let meta = tx.get("meta");

    let block_time = tx.get("blockTime").and_then(|t| t.as_i64()).unwrap_or(0);
    let pre_balance = first_balance(meta, "preBalances");
    let post_balance = first_balance(meta, "postBalances");
    let account_keys = normalize_account_keys(tx);
    let marketplace_account = account_keys.last().cloned().unwrap_or_default();

    let mint = meta
        .and_then(|m| m.get("postTokenBalances"))
        .and_then(|b| b.as_array())
        .and_then(|arr| arr.first())
        .and_then(|b| b.get("mint"))
        .and_then(|m| m.as_str())
        .unwrap_or_default()
        .to_string();

    debug!(
        "Normalized tx: block_time={} pre={} post={} accounts={} marketplace={} mint={}",
        block_time,
        pre_balance,
        post_balance,
        account_keys.len(),
        marketplace_account,
        mint
    );

    SaleTransaction {
        block_time,
        pre_balance,
        post_balance,
        account_keys,
        marketplace_account,
        mint,
    }
}

fn first_balance(meta: Option<&Value>, field: &str) -> u64 {
    meta.and_then(|m| m.get(field))
        .and_then(|b| b.as_array())
        .and_then(|arr| arr.first())
        .and_then(|v| v.as_u64())
        .unwrap_or(0)
}

/// Account keys as plain strings. `json` encoding gives strings,
/// `jsonParsed` gives `{"pubkey": ..., "signer": ..., ...}` objects.
fn normalize_account_keys(tx: &Value) -> Vec<String> {
    let Some(keys) = tx
        .get("transaction")
        .and_then(|t| t.get("message"))
        .and_then(|m| m.get("accountKeys"))
        .and_then(|v| v.as_array())
    else {
        return Vec::new();
    };

    keys.iter()
        .filter_map(|key| match key {
            Value::String(s) => Some(s.clone()),
            Value::Object(obj) => obj.get("pubkey").and_then(|p| p.as_str()).map(str::to_string),
            _ => None,
        })
        .collect()
}

/// |pre - post| in SOL. Direction is discarded.
pub fn sale_price_sol(pre_balance: u64, post_balance: u64) -> f64 {
    pre_balance.abs_diff(post_balance) as f64 / LAMPORTS_PER_SOL as f64
}

/// Render a block time as `M/D/YYYY h:mm:ss AM` in the given zone.
pub fn format_sale_time<Tz: TimeZone>(block_time: i64, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let utc = DateTime::from_timestamp(block_time, 0).unwrap_or(DateTime::UNIX_EPOCH);
    utc.with_timezone(tz).format("%-m/%-d/%Y %-I:%M:%S %p").to_string()
}

/// [`format_sale_time`] in the host's local zone.
pub fn format_local_sale_time(block_time: i64) -> String {
    format_sale_time(block_time, &chrono::Local)
}
