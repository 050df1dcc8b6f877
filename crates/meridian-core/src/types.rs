//! Core domain types shared across the gateway and the sync engine.

use serde::{Deserialize, Serialize};

/// The API capability a request needs, and the partition of the endpoint
/// directory it is served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiCategory {
    /// Core chain API (account, block, table, and transaction queries).
    Chain,
    /// Legacy v1 history API.
    History,
    /// v2 analytics API (history deltas, state queries, health).
    Analytics,
    /// Wallet-oriented API (authorizer and producer statistics lookups).
    Wallet,
}

impl ApiCategory {
    /// All categories, in directory-storage order.
    pub const ALL: [Self; 4] = [Self::Chain, Self::History, Self::Analytics, Self::Wallet];

    /// The category selector used on the validation-service wire.
    #[must_use]
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::Chain => "chain",
            Self::History => "history",
            Self::Analytics => "analytics",
            Self::Wallet => "wallet",
        }
    }

    /// Single-character code used in the serialized directory payload.
    #[must_use]
    pub fn storage_code(&self) -> char {
        match self {
            Self::Chain => 'a',
            Self::History => 'b',
            Self::Analytics => 'c',
            Self::Wallet => 'd',
        }
    }

    /// Parses a directory-payload category code.
    #[must_use]
    pub fn from_storage_code(code: char) -> Option<Self> {
        match code {
            'a' => Some(Self::Chain),
            'b' => Some(Self::History),
            'c' => Some(Self::Analytics),
            'd' => Some(Self::Wallet),
            _ => None,
        }
    }
}

impl std::fmt::Display for ApiCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Geographic load-balancing zone.
///
/// Europe is the baseline region: requests from unmapped or unknown
/// countries, and endpoints hosted in unmapped countries, land here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    Europe,
    Americas,
    Asia,
}

impl Region {
    /// All regions in fixed failover order. A request's search order is its
    /// preferred region followed by the remaining entries of this list.
    pub const ALL: [Self; 3] = [Self::Europe, Self::Americas, Self::Asia];

    /// Single-digit code used in the serialized directory payload.
    #[must_use]
    pub fn storage_digit(&self) -> char {
        match self {
            Self::Europe => '0',
            Self::Americas => '1',
            Self::Asia => '2',
        }
    }

    /// Parses a directory-payload region digit.
    #[must_use]
    pub fn from_storage_digit(digit: char) -> Option<Self> {
        match digit {
            '0' => Some(Self::Europe),
            '1' => Some(Self::Americas),
            '2' => Some(Self::Asia),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Europe => "europe",
            Self::Americas => "americas",
            Self::Asia => "asia",
        }
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Composite key identifying one bucket of candidate endpoints.
///
/// Always a value-equal (category, region) pair in memory; the concatenated
/// form exists only in the serialized payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DirectoryKey {
    pub category: ApiCategory,
    pub region: Region,
}

impl DirectoryKey {
    #[must_use]
    pub fn new(category: ApiCategory, region: Region) -> Self {
        Self { category, region }
    }

    /// Encodes the key for the directory payload, e.g. `a0` for
    /// (chain, europe).
    #[must_use]
    pub fn storage_key(&self) -> String {
        let mut key = String::with_capacity(2);
        key.push(self.category.storage_code());
        key.push(self.region.storage_digit());
        key
    }

    /// Decodes a directory-payload key. Returns `None` for anything that is
    /// not exactly one category code followed by one region digit.
    #[must_use]
    pub fn from_storage_key(raw: &str) -> Option<Self> {
        let mut chars = raw.chars();
        let category = ApiCategory::from_storage_code(chars.next()?)?;
        let region = Region::from_storage_digit(chars.next()?)?;
        if chars.next().is_some() {
            return None;
        }
        Some(Self { category, region })
    }
}

impl std::fmt::Display for DirectoryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.category, self.region)
    }
}
