//! Request path classification.
//!
//! Every inbound path resolves to exactly one [`RouteClass`]: forwardable
//! with a known [`ApiCategory`], explicitly disabled, or unknown. The table
//! is immutable data built once at startup and shared by reference.

use std::collections::HashMap;

use crate::types::ApiCategory;

/// Classification result for a request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Path is a known API route; forward it to an endpoint serving the
    /// category.
    Forward(ApiCategory),
    /// Path sits under a disabled prefix and must never be forwarded.
    Disabled,
    /// Path is not part of the API surface.
    Unknown,
}

/// Prefixes that are never forwarded, regardless of upstream support.
/// Producer, database-introspection, and net-plugin routes expose node
/// internals and are rejected with 403.
const DISABLED_PREFIXES: &[&str] = &["/v1/producer", "/v1/db_size", "/v1/net"];

const CHAIN_ROUTES: &[&str] = &[
    "/v1/chain/abi_bin_to_json",
    "/v1/chain/abi_json_to_bin",
    "/v1/chain/get_abi",
    "/v1/chain/get_account",
    "/v1/chain/get_activated_protocol_features",
    "/v1/chain/get_block",
    "/v1/chain/get_block_header_state",
    "/v1/chain/get_code",
    "/v1/chain/get_currency_balance",
    "/v1/chain/get_currency_stats",
    "/v1/chain/get_info",
    "/v1/chain/get_producers",
    "/v1/chain/get_raw_abi",
    "/v1/chain/get_raw_code_and_abi",
    "/v1/chain/get_required_keys",
    "/v1/chain/get_scheduled_transaction",
    "/v1/chain/get_table_by_scope",
    "/v1/chain/get_table_rows",
    "/v1/chain/push_transaction",
    "/v1/chain/push_transactions",
    "/v1/chain/send_transaction",
];

const HISTORY_ROUTES: &[&str] = &[
    "/v1/history/get_actions",
    "/v1/history/get_transaction",
    "/v1/history/get_controlled_accounts",
    "/v1/history/get_key_accounts",
];

const ANALYTICS_ROUTES: &[&str] = &[
    "/v2/history/get_abi_snapshot",
    "/v2/history/get_actions",
    "/v2/history/get_deltas",
    "/v2/history/get_schedule",
    "/v2/history/get_transaction",
    "/v2/history/get_created_accounts",
    "/v2/history/get_creator",
    "/v2/state/get_account",
    "/v2/state/get_key_accounts",
    "/v2/state/get_links",
    "/v2/state/get_tokens",
    "/v2/state/get_proposals",
    "/v2/state/get_voters",
    "/v2/health",
];

const WALLET_ROUTES: &[&str] = &[
    "/v1/chain/get_accounts_by_authorizers",
    "/v2/stats/get_missed_blocks",
];

/// Exact-match route table with a disabled-prefix fallback.
///
/// Classification is a total function over strings: exact table match wins,
/// then the disabled-prefix check, then `Unknown`.
#[derive(Debug)]
pub struct RouteTable {
    routes: HashMap<&'static str, ApiCategory>,
    disabled_prefixes: &'static [&'static str],
}

impl RouteTable {
    /// Builds the standard route table covering the full v1/v2 API surface.
    #[must_use]
    pub fn standard() -> Self {
        let groups: [(&[&str], ApiCategory); 4] = [
            (CHAIN_ROUTES, ApiCategory::Chain),
            (HISTORY_ROUTES, ApiCategory::History),
            (ANALYTICS_ROUTES, ApiCategory::Analytics),
            (WALLET_ROUTES, ApiCategory::Wallet),
        ];

        let mut routes = HashMap::new();
        for (paths, category) in groups {
            for path in paths {
                routes.insert(*path, category);
            }
        }

        Self { routes, disabled_prefixes: DISABLED_PREFIXES }
    }

    /// Classifies a request path.
    ///
    /// An exact route-table match always wins over a disabled-prefix match,
    /// so a valid route can never be shadowed by a later-added prefix.
    #[must_use]
    pub fn classify(&self, path: &str) -> RouteClass {
        if let Some(category) = self.routes.get(path) {
            return RouteClass::Forward(*category);
        }

        if self.disabled_prefixes.iter().any(|prefix| path.starts_with(prefix)) {
            return RouteClass::Disabled;
        }

        RouteClass::Unknown
    }

    /// Number of exact routes in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::standard()
    }
}
