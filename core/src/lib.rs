pub mod distribution;
pub mod error;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single token account holding some balance of the watched mint.
/// Amounts are decimal-normalized (ui units), immutable once produced
/// by the holder enumerator.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HolderRecord {
    pub address: String,
    pub amount: f64,
}

/// A holder extended with its share of the observed supply.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WeightedHolder {
    pub address: String,
    pub amount: f64,
    pub percentage: f64,
}

/// One immutable view of who holds the token.
///
/// `total_supply` is the sum of observed balances, not the ledger's
/// mint supply field; percentages are only computed once the whole
/// enumeration has been summed.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DistributionSnapshot {
    pub total_supply: f64,
    pub holders: Vec<WeightedHolder>,
}

impl DistributionSnapshot {
    /// Zero supply means "no concentration can be computed", which is
    /// a distinct reportable state, not an error and not 0%.
    pub fn is_undetermined(&self) -> bool {
        self.total_supply == 0.0 || self.holders.is_empty()
    }
}

/// Share of supply held by the top N accounts.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
pub struct ConcentrationResult {
    pub top_n_percentage: f64,
}

/// Cluster of holders each above the significance threshold, ranked
/// by absolute exposure (raw amount, not relative share).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct BundledHoldingsResult {
    pub total_bundled_amount: f64,
    pub bundled_percentage: f64,
    pub bundled_wallets: Vec<WeightedHolder>,
}

/// A detected liquidity-pool creation, extracted from the parsed
/// launch transaction. Read-only input to the analysis pipeline.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LaunchEvent {
    pub signature: String,
    pub creator: String,
    pub base_mint: String,
    pub base_decimals: u8,
    pub base_lp_amount: f64,
    pub detected_at: DateTime<Utc>,
}

/// Distribution-side portion of the final record.
///
/// `holders_known == false` means the enumeration branch failed and
/// the zeros below are substituted defaults; `undetermined` means the
/// enumeration succeeded but found no eligible supply.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct DistributionReport {
    pub holders_known: bool,
    pub undetermined: bool,
    pub holder_count: usize,
    pub concentration: ConcentrationResult,
    pub bundled: BundledHoldingsResult,
}

/// The merged per-launch output, assembled exactly once after all
/// enrichment branches settle, then handed to the persistence sink.
///
/// Each enrichment value carries a `*_known` flag so a branch failure
/// stays distinguishable from a genuine zero/false result.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AnalysisRecord {
    pub lp_signature: String,
    pub creator: String,
    pub timestamp: DateTime<Utc>,
    pub base_mint: String,
    pub base_decimals: u8,
    pub base_lp_amount: f64,
    pub risk_flagged: bool,
    pub risk_known: bool,
    pub dev_holding_percentage: f64,
    pub dev_holding_known: bool,
    pub dev_has_sold: bool,
    pub dev_sold_known: bool,
    pub distribution: DistributionReport,
}

pub mod constants {
    use solana_sdk::pubkey;
    use solana_sdk::pubkey::Pubkey;

    pub const TOKEN_PROGRAM: Pubkey = pubkey!("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA");
    pub const SOL_MINT: Pubkey = pubkey!("So11111111111111111111111111111111111111112");

    /// Raydium fee collector mentioned by every pool-creation
    /// transaction; the watcher subscribes to its logs.
    pub const RAYDIUM_FEE_COLLECTOR: Pubkey = pubkey!("7YttLkHDoNj9wyDur5pM1ejNaAvT9X4eqaYcHQqtj2G5");

    /// Raydium V4 AMM authority that ends up owning the pool vaults;
    /// the post-balance it owns identifies the launched base mint.
    pub const RAYDIUM_AMM_AUTHORITY: Pubkey = pubkey!("5Q544fKrFoe6tsEbD7S8EmxGTJYAKtTVhAW5Q5pge4j1");

    /// SPL token-account record size, used as the dataSize filter to
    /// exclude non-token accounts from holder enumeration.
    pub const TOKEN_ACCOUNT_SIZE: u64 = 165;
}
