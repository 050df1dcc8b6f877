//! Country-code to load-balancing-region resolution.
//!
//! The table is hardcoded to avoid a lookup service on the hot path. Only
//! the Americas and Asia zones are listed; every other country code, and any
//! absent or unrecognized value, resolves to the Europe baseline.

use std::collections::HashMap;

use crate::types::Region;

const AMERICAS: &[&str] = &[
    "AI", "AG", "AR", "AW", "BS", "BB", "BZ", "BM", "BO", "BQ", "BV", "BR", "CA", "KY", "CL",
    "CO", "CR", "CU", "CW", "DM", "DO", "EC", "SV", "FK", "GF", "GL", "GD", "GP", "GT", "GY",
    "HT", "HN", "JM", "MQ", "MX", "MS", "NI", "PA", "PY", "PE", "PR", "BL", "KN", "LC", "MF",
    "PM", "VC", "SX", "GS", "SR", "TT", "TC", "US", "UY", "VE", "VG", "VI",
];

const ASIA: &[&str] = &[
    "AF", "AS", "AM", "AU", "AZ", "BH", "BD", "BT", "BN", "KH", "CN", "CX", "CC", "CK", "CY",
    "FJ", "PF", "GE", "GU", "HM", "HK", "IN", "ID", "IR", "IQ", "IL", "JP", "JO", "KZ", "KI",
    "KP", "KR", "KW", "KG", "LA", "LB", "MO", "MY", "MV", "MH", "FM", "MN", "MM", "NR", "NP",
    "NC", "NZ", "NU", "NF", "MP", "OM", "PK", "PW", "PS", "PG", "PH", "PN", "QA", "WS", "SA",
    "SG", "SB", "LK", "SY", "TW", "TJ", "TH", "TL", "TK", "TO", "TR", "TM", "TV", "AE", "UM",
    "UZ", "VU", "VN", "WF", "YE",
];

/// ISO country code → [`Region`] lookup table.
///
/// Total function: `resolve` never fails, it defaults to [`Region::Europe`].
#[derive(Debug)]
pub struct CountryRegionTable {
    map: HashMap<&'static str, Region>,
}

impl CountryRegionTable {
    /// Builds the standard table.
    #[must_use]
    pub fn standard() -> Self {
        let mut map = HashMap::with_capacity(AMERICAS.len() + ASIA.len());
        for code in AMERICAS {
            map.insert(*code, Region::Americas);
        }
        for code in ASIA {
            map.insert(*code, Region::Asia);
        }
        Self { map }
    }

    /// Resolves a country code to its load-balancing region.
    ///
    /// Empty, absent, and unmapped codes all resolve to the Europe baseline.
    #[must_use]
    pub fn resolve(&self, country_code: &str) -> Region {
        self.map.get(country_code).copied().unwrap_or(Region::Europe)
    }
}

impl Default for CountryRegionTable {
    fn default() -> Self {
        Self::standard()
    }
}
