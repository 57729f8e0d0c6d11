// Known marketplace program accounts
use crate::settings::MarketplaceEntry;
use log::debug;
use std::collections::HashMap;

/// Marketplace programs recognised out of the box, keyed by the account that
/// appears last in a sale transaction's account list.
pub const KNOWN_MARKETPLACES: &[(&str, &str)] = &[
    ("MEisE1HzehtrDpAAT8PnLHjpSSkRYakotTuJRPjTpo8", "Magic Eden"),
    ("M2mx93ekt1fmXSVkTrUL9xVFHkmME8HTUi5Cyc5aF7K", "Magic Eden"),
    ("CJsLwbP1iu5DuUikHEJnLfANgKy6stB2uFgvBBHoyxwz", "Solanart"),
    ("A7p8451ktDCHq5yYaHczeLMYsjRsAkzc3hCXcSrwYHU7", "Digital Eyes"),
    ("AmK5g2XcyptVLCFESBCJqoSfwV3znGoVYQnqEnaAZKWn", "Exchange Art"),
    ("HZaWndaNWHFDd9Dhk5pqUUtsmoBCqzb1MLu3NAh1VX6B", "Alpha Art"),
    ("617jbWo616ggkDxvW1Le8pV38XLbVSyWY8ae6QUmGBAU", "Solsea"),
    ("hausS13jsjafwWwGqZTUQRmWyvyxn9EQpqMwV1PBBmk", "OpenSea"),
    ("HYPERfwdTjyJ2SCaKHmpF2MtrXqWxrsotYDsTrshHWq8", "Hyperspace"),
    ("TSWAPaqyCSx2KABk68Shruf4rp7CxcNi8hAsbdwmHbN", "Tensor"),
    ("TCMPhJdwDryooaGtiocG1u3xcYbRpiJzb283XfCZsDp", "Tensor"),
];

/// Read-only lookup from marketplace account to display name.
#[derive(Debug, Clone, Default)]
pub struct MarketplaceRegistry {
    names: HashMap<String, String>,
}

impl MarketplaceRegistry {
    pub fn new() -> Self {
        Self::with_entries(KNOWN_MARKETPLACES.iter().map(|(a, n)| (a.to_string(), n.to_string())))
    }

    pub fn with_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Self {
            names: entries.into_iter().collect(),
        }
    }

    /// Built-in registry with configured entries layered on top. A configured
    /// account that is already known replaces the built-in name.
    pub fn from_config(extra: &[MarketplaceEntry]) -> Self {
        let mut registry = Self::new();
        for entry in extra {
            debug!("Registering marketplace {} as {}", entry.account, entry.name);
            registry.names.insert(entry.account.clone(), entry.name.clone());
        }
        registry
    }

    pub fn name_of(&self, account: &str) -> Option<&str> {
        self.names.get(account).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        let registry = MarketplaceRegistry::new();
        assert_eq!(
            registry.name_of("M2mx93ekt1fmXSVkTrUL9xVFHkmME8HTUi5Cyc5aF7K"),
            Some("Magic Eden")
        );
        assert_eq!(registry.name_of("11111111111111111111111111111111"), None);
        assert_eq!(registry.len(), KNOWN_MARKETPLACES.len());
    }

    #[test]
    fn test_config_entries_override_and_extend() {
        let extra = vec![
            MarketplaceEntry {
                account: "hausS13jsjafwWwGqZTUQRmWyvyxn9EQpqMwV1PBBmk".to_string(),
                name: "Auction House".to_string(),
            },
            MarketplaceEntry {
                account: "G1GP13EJK23nr7YL69SJWn7CWtm8hQBQCiebssinU1Jc".to_string(),
                name: "Local Market".to_string(),
            },
        ];
        let registry = MarketplaceRegistry::from_config(&extra);
        assert_eq!(
            registry.name_of("hausS13jsjafwWwGqZTUQRmWyvyxn9EQpqMwV1PBBmk"),
            Some("Auction House")
        );
        assert_eq!(
            registry.name_of("G1GP13EJK23nr7YL69SJWn7CWtm8hQBQCiebssinU1Jc"),
            Some("Local Market")
        );
        assert_eq!(registry.len(), KNOWN_MARKETPLACES.len() + 1);
    }
}
