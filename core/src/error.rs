use std::time::Duration;

/// Failure taxonomy for enrichment branches.
///
/// None of these are fatal to an event: the orchestrator substitutes
/// a documented default and keeps the record. Zero supply is not an
/// error at all; see `DistributionSnapshot::is_undetermined`.
#[derive(Debug, thiserror::Error)]
pub enum EnrichError {
    /// The ledger or API query could not be completed (network
    /// failure, RPC error, non-2xx response).
    #[error("upstream query failed: {0}")]
    UpstreamQuery(String),

    /// Upstream returned a record we could not decode. The offending
    /// record is excluded from aggregation, never propagated.
    #[error("malformed upstream data: {0}")]
    MalformedData(String),

    /// The branch exceeded its deadline.
    #[error("upstream call timed out after {0:?}")]
    Timeout(Duration),
}
