// Port Definitions for Hexagonal Architecture
// These traits define the boundaries between the orchestrator and the
// external collaborators it fans out to.

use launch_core::error::EnrichError;
use launch_core::{AnalysisRecord, HolderRecord, LaunchEvent};

/// Port for resolving a launch signature into a LaunchEvent.
/// Decouples the orchestrator from the transaction-detail RPC.
#[async_trait::async_trait]
pub trait LaunchResolver: Send + Sync {
    /// `Ok(None)` means "real transaction, but not a usable launch"
    /// (failed on-chain, no base balance, unsupported shape).
    async fn resolve(&self, signature: &str) -> Result<Option<LaunchEvent>, EnrichError>;
}

/// Port for enumerating every account holding a mint.
#[async_trait::async_trait]
pub trait HolderSource: Send + Sync {
    async fn enumerate(&self, mint: &str, decimals: u8) -> Result<Vec<HolderRecord>, EnrichError>;
}

/// Port for the external risk-score lookup service.
#[async_trait::async_trait]
pub trait RiskOracle: Send + Sync {
    async fn risk_score(&self, mint: &str) -> Result<f64, EnrichError>;
}

/// Port for the two developer-behavior checks on the launching wallet.
#[async_trait::async_trait]
pub trait DevScreen: Send + Sync {
    /// Percentage of the mint's supply the wallet still holds.
    async fn holding_percentage(&self, wallet: &str, mint: &str) -> Result<f64, EnrichError>;

    /// Whether any recent transaction shows the wallet's balance of
    /// the mint decreasing.
    async fn has_sold(&self, wallet: &str, mint: &str) -> Result<bool, EnrichError>;
}

/// Port for the append-only persistence sink.
#[async_trait::async_trait]
pub trait RecordSink: Send + Sync {
    async fn append(&self, record: &AnalysisRecord) -> Result<(), EnrichError>;
}
