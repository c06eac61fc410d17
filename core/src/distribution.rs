//! Pure holder-distribution pipeline.
//!
//! Everything here is deterministic and allocation-only: the engine
//! feeds one enumeration in, and the orchestrator applies these three
//! steps sequentially to the single immutable snapshot they share.

use crate::{
    BundledHoldingsResult, ConcentrationResult, DistributionSnapshot, HolderRecord, WeightedHolder,
};

/// Number of top holders summed into the concentration signal unless
/// configured otherwise.
pub const DEFAULT_TOP_HOLDER_COUNT: usize = 10;

/// Significance threshold (percent of supply) above which a holder
/// counts toward the bundled-wallet cluster.
pub const DEFAULT_BUNDLE_THRESHOLD_PCT: f64 = 1.0;

/// Fold raw balances into a snapshot with per-holder percentages.
///
/// Total supply is the sum of the observed balances, so percentages
/// are only assigned after the whole input has been folded. Zero
/// total yields an empty snapshot the callers must report as
/// undetermined, not as 0% concentration.
pub fn distribute(records: Vec<HolderRecord>) -> DistributionSnapshot {
    let total_supply: f64 = records.iter().map(|r| r.amount).sum();

    if total_supply == 0.0 {
        return DistributionSnapshot {
            total_supply: 0.0,
            holders: Vec::new(),
        };
    }

    let holders = records
        .into_iter()
        .map(|r| WeightedHolder {
            percentage: r.amount / total_supply * 100.0,
            address: r.address,
            amount: r.amount,
        })
        .collect();

    DistributionSnapshot {
        total_supply,
        holders,
    }
}

/// Sum of the top `n` holder percentages, descending.
///
/// Non-finite percentages are excluded defensively; ties keep the
/// original enumeration order (the sort is stable). An empty or
/// zero-supply snapshot yields 0, which callers distinguish from a
/// genuine 0% via `DistributionSnapshot::is_undetermined`.
pub fn top_n_concentration(snapshot: &DistributionSnapshot, n: usize) -> ConcentrationResult {
    let mut valid: Vec<&WeightedHolder> = snapshot
        .holders
        .iter()
        .filter(|h| h.percentage.is_finite())
        .collect();

    valid.sort_by(|a, b| {
        b.percentage
            .partial_cmp(&a.percentage)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    ConcentrationResult {
        top_n_percentage: valid.iter().take(n).map(|h| h.percentage).sum(),
    }
}

/// Aggregate the holders whose share meets `threshold_pct` into one
/// cluster, ranked by raw amount descending. Amount ordering is used
/// here because bundled-wallet ranking is about absolute exposure,
/// not relative share.
pub fn bundled_holdings(snapshot: &DistributionSnapshot, threshold_pct: f64) -> BundledHoldingsResult {
    let mut significant: Vec<WeightedHolder> = snapshot
        .holders
        .iter()
        .filter(|h| h.percentage.is_finite() && h.percentage >= threshold_pct)
        .cloned()
        .collect();

    significant.sort_by(|a, b| {
        b.amount
            .partial_cmp(&a.amount)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let total_bundled_amount: f64 = significant.iter().map(|h| h.amount).sum();

    // Guard the division: zero supply must yield 0, not NaN.
    let bundled_percentage = if snapshot.total_supply > 0.0 {
        total_bundled_amount / snapshot.total_supply * 100.0
    } else {
        0.0
    };

    BundledHoldingsResult {
        total_bundled_amount,
        bundled_percentage,
        bundled_wallets: significant,
    }
}
