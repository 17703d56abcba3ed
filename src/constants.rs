//! Policy constants for pNode Radar
//!
//! Defaults for everything the configuration layer can override, plus the
//! handful of values that are fixed for compatibility with the seed network.

/// Service name shown in the banner and API responses
pub const SERVICE_NAME: &str = "pNode Radar";

/// Service version
pub const VERSION: &str = "0.1.0-alpha";

/// Project tagline
pub const TAGLINE: &str = "Seed aggregation and ranking for the pNode storage network";

// ═══════════════════════════════════════════════════════════════
// Seed RPC
// ═══════════════════════════════════════════════════════════════

/// Seeds queried when `PNODE_SEEDS` is not set
pub const DEFAULT_SEED_IPS: [&str; 8] = [
    "173.212.220.65",
    "161.97.97.41",
    "192.190.136.36",
    "192.190.136.38",
    "207.244.255.1",
    "192.190.136.28",
    "192.190.136.29",
    "173.212.203.145",
];

/// pRPC port appended to seed addresses given without one
pub const DEFAULT_RPC_PORT: u16 = 6000;

/// Timeout for `get-pods`
pub const GET_PODS_TIMEOUT_MS: u64 = 5_000;

/// Timeout for `get-pods-with-stats` (slower, heavier payload)
pub const GET_PODS_WITH_STATS_TIMEOUT_MS: u64 = 8_000;

/// Upper bound on configured seeds
pub const MAX_SEEDS: usize = 32;

// ═══════════════════════════════════════════════════════════════
// Derivation policy
// ═══════════════════════════════════════════════════════════════

/// Raw timestamps above this are taken as milliseconds, at or below as seconds.
/// Roughly the year 2286 in seconds. Must not change.
pub const MILLIS_THRESHOLD: u64 = 10_000_000_000;

/// A node is online if it was seen within this window
pub const LIVENESS_WINDOW_SECS: u64 = 300;

/// Version label for pods that don't report one
pub const FALLBACK_VERSION: &str = "0.8.0";

/// Region for addresses no prefix rule matches
pub const DEFAULT_REGION: &str = "Global Node";

/// Shown instead of an absent or zero address
pub const UNKNOWN_ADDRESS: &str = "unknown";

// ═══════════════════════════════════════════════════════════════
// Store / HTTP
// ═══════════════════════════════════════════════════════════════

/// Seconds between scheduled refreshes
pub const REFRESH_INTERVAL_SECS: u64 = 15;

/// Listen address of the HTTP API
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";

/// Default leaderboard size (podium + hall of fame)
pub const LEADERBOARD_SIZE: usize = 15;

/// Number of nodes in the "top storage" list
pub const TOP_STORAGE_SIZE: usize = 10;

// ═══════════════════════════════════════════════════════════════
// Display functions
// ═══════════════════════════════════════════════════════════════

/// Print the banner
pub fn print_banner() {
    println!("╔════════════════════════════════════════════════════════════╗");
    println!("║                    pNODE RADAR                             ║");
    println!("║                                                            ║");
    println!("║  Seeds • Merge • Rank • Risk                               ║");
    println!("╚════════════════════════════════════════════════════════════╝");
    println!();
    println!("  {} v{}", TAGLINE, VERSION);
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_seeds_are_bare_ips() {
        for ip in DEFAULT_SEED_IPS {
            assert!(!ip.contains(':'));
            assert_eq!(ip.split('.').count(), 4);
        }
    }

    #[test]
    fn test_threshold_is_ten_billion() {
        assert_eq!(MILLIS_THRESHOLD, 10_000_000_000);
        assert_eq!(LIVENESS_WINDOW_SECS * 1000, 300_000);
    }
}
