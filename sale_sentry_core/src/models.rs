use serde::{Deserialize, Serialize};

/// One entry of a `getSignaturesForAddress` page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureInfo {
    pub signature: String,
    #[serde(default)]
    pub slot: u64,
    /// Transaction error status as reported by the ledger, `None` on success.
    #[serde(default)]
    pub err: Option<serde_json::Value>,
    #[serde(default)]
    pub block_time: Option<i64>,
}

impl SignatureInfo {
    pub fn new(signature: impl Into<String>) -> Self {
        Self {
            signature: signature.into(),
            slot: 0,
            err: None,
            block_time: None,
        }
    }
}

/// A single `(trait_type, value)` pair from an NFT metadata document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    #[serde(default, deserialize_with = "null_as_default")]
    pub trait_type: String,
    #[serde(default, deserialize_with = "value_as_string")]
    pub value: String,
}

/// Off-chain metadata document pointed at by the on-chain metadata account.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AssetMetadata {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub symbol: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, rename = "seller_fee_basis_points", deserialize_with = "null_as_default")]
    pub royalty_basis_points: u16,
    #[serde(default, rename = "image", deserialize_with = "null_as_default")]
    pub image_uri: String,
    #[serde(default, rename = "external_url", deserialize_with = "null_as_default")]
    pub external_url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub attributes: Vec<Attribute>,
}

impl AssetMetadata {
    /// Value of the first attribute whose trait type matches `trait_type`.
    pub fn trait_value(&self, trait_type: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.trait_type == trait_type)
            .map(|a| a.value.as_str())
    }
}

/// A qualifying marketplace sale, ready to be handed to the notifier.
#[derive(Debug, Clone, PartialEq)]
pub struct SaleEvent {
    pub metadata: AssetMetadata,
    pub sale_time: String,
    pub price_sol: f64,
    pub signature: String,
    pub marketplace: String,
}

// Documents in the wild write `null` for fields they leave empty.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// Some collections publish numeric or boolean trait values.
fn value_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let v = serde_json::Value::deserialize(deserializer)?;
    Ok(match v {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_metadata_from_document() {
        let json = r#"{
            "name": "Okay Bear #1234",
            "symbol": "okay_bears",
            "description": "Okay Bears is a culture shift.",
            "seller_fee_basis_points": 750,
            "image": "https://arweave.net/abc.png",
            "external_url": "https://www.okaybears.com/",
            "attributes": [
                {"trait_type": "Background", "value": "Mint"},
                {"trait_type": "Fur", "value": "Green"},
                {"trait_type": "Level", "value": 3}
            ],
            "properties": {"category": "image"}
        }"#;
        let meta: AssetMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(meta.name, "Okay Bear #1234");
        assert_eq!(meta.royalty_basis_points, 750);
        assert_eq!(meta.image_uri, "https://arweave.net/abc.png");
        assert_eq!(meta.trait_value("Fur"), Some("Green"));
        assert_eq!(meta.trait_value("Level"), Some("3"));
        assert_eq!(meta.trait_value("Hat"), None);
    }

    #[test]
    fn test_asset_metadata_missing_fields_default() {
        let meta: AssetMetadata = serde_json::from_str(r#"{"name": "Bare"}"#).unwrap();
        assert_eq!(meta.name, "Bare");
        assert!(meta.attributes.is_empty());
        assert_eq!(meta.royalty_basis_points, 0);
    }

    #[test]
    fn test_asset_metadata_null_fields_default() {
        let json = r#"{
            "name": "Okay Bear #1",
            "symbol": null,
            "description": null,
            "seller_fee_basis_points": null,
            "image": null,
            "external_url": null,
            "attributes": [{"trait_type": "Fur", "value": "Green"}]
        }"#;
        let meta: AssetMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(meta.name, "Okay Bear #1");
        assert_eq!(meta.external_url, "");
        assert_eq!(meta.royalty_basis_points, 0);
        assert_eq!(meta.trait_value("Fur"), Some("Green"));

        let meta: AssetMetadata = serde_json::from_str(r#"{"name": null, "attributes": null}"#).unwrap();
        assert!(meta.name.is_empty());
        assert!(meta.attributes.is_empty());
    }

    #[test]
    fn test_incomplete_attributes_keep_document() {
        let json = r#"{"attributes": [
            {"trait_type": "Hat"},
            {"value": "Crown"},
            {"trait_type": null, "value": null},
            {"trait_type": "Fur", "value": "Green"}
        ]}"#;
        let meta: AssetMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(meta.attributes.len(), 4);
        assert_eq!(meta.trait_value("Hat"), Some(""));
        assert_eq!(meta.trait_value("Fur"), Some("Green"));
    }
}
