use reqwest::Client;
use serde::Deserialize;

use launch_core::error::EnrichError;

use crate::ports::RiskOracle;

/// Typed slice of the RugCheck report summary. The service returns a
/// larger payload; only the score participates in the risk signal.
#[derive(Debug, Deserialize)]
pub struct RiskReportSummary {
    pub score: f64,
}

/// HTTP client for the external risk-score lookup service.
pub struct RugCheckClient {
    base_url: String,
    client: Client,
}

impl RugCheckClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl RiskOracle for RugCheckClient {
    async fn risk_score(&self, mint: &str) -> Result<f64, EnrichError> {
        let url = format!("{}/tokens/{}/report/summary", self.base_url, mint);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| EnrichError::UpstreamQuery(format!("risk lookup for {}: {}", mint, e)))?;

        if !response.status().is_success() {
            return Err(EnrichError::UpstreamQuery(format!(
                "risk lookup for {} returned {}",
                mint,
                response.status()
            )));
        }

        let summary: RiskReportSummary = response
            .json()
            .await
            .map_err(|e| EnrichError::MalformedData(format!("risk report for {}: {}", mint, e)))?;

        Ok(summary.score)
    }
}
