use launch_core::distribution::{DEFAULT_BUNDLE_THRESHOLD_PCT, DEFAULT_TOP_HOLDER_COUNT};

#[derive(Debug, serde::Deserialize, Clone)]
pub struct MonitorConfig {
    #[serde(alias = "RPC_URL")]
    pub rpc_url: String,
    #[serde(alias = "WS_URL")]
    pub ws_url: String,
    #[serde(alias = "RUGCHECK_URL", default = "default_rugcheck_url")]
    pub rugcheck_url: String,
    #[serde(alias = "DATA_DIR", default = "default_data_dir")]
    pub data_dir: String,
    #[serde(alias = "METRICS_ADDR")]
    pub metrics_addr: Option<String>,
    #[serde(alias = "TOP_HOLDER_COUNT", default = "default_top_holder_count")]
    pub top_holder_count: usize,
    #[serde(alias = "BUNDLE_THRESHOLD_PCT", default = "default_bundle_threshold_pct")]
    pub bundle_threshold_pct: f64,
    #[serde(alias = "RISK_SCORE_THRESHOLD", default = "default_risk_score_threshold")]
    pub risk_score_threshold: f64,
    #[serde(alias = "BRANCH_TIMEOUT_SECS", default = "default_branch_timeout_secs")]
    pub branch_timeout_secs: u64,
    #[serde(alias = "MAX_CONCURRENT_EVENTS", default = "default_max_concurrent_events")]
    pub max_concurrent_events: usize,
    #[serde(alias = "DEV_TX_SCAN_LIMIT", default = "default_dev_tx_scan_limit")]
    pub dev_tx_scan_limit: usize,
}

fn default_rugcheck_url() -> String { "https://api.rugcheck.xyz/v1".to_string() }
fn default_data_dir() -> String { "data".to_string() }
fn default_top_holder_count() -> usize { DEFAULT_TOP_HOLDER_COUNT }
fn default_bundle_threshold_pct() -> f64 { DEFAULT_BUNDLE_THRESHOLD_PCT }
// Empirical RugCheck cutoff carried over as a tunable default.
fn default_risk_score_threshold() -> f64 { 10_000.0 }
fn default_branch_timeout_secs() -> u64 { 20 }
fn default_max_concurrent_events() -> usize { 4 }
fn default_dev_tx_scan_limit() -> usize { 50 }

impl MonitorConfig {
    pub fn new() -> Result<Self, String> {
        let s = ::config::Config::builder()
            .add_source(::config::Environment::default())
            .build()
            .map_err(|e| format!("Config Build Error: {}", e))?;

        let config: MonitorConfig = s
            .try_deserialize()
            .map_err(|e| format!("Config Deserialize Error: {}", e))?;

        config.validate()?;
        Ok(config)
    }

    /// Validates configuration values at startup (Fail Fast)
    pub fn validate(&self) -> Result<(), String> {
        if !self.rpc_url.starts_with("http") {
            return Err(format!(
                "Invalid RPC_URL: must start with http/https. Got: {}",
                self.rpc_url
            ));
        }
        if !self.ws_url.starts_with("ws") {
            return Err(format!(
                "Invalid WS_URL: must start with ws/wss. Got: {}",
                self.ws_url
            ));
        }
        if !self.rugcheck_url.starts_with("http") {
            return Err(format!(
                "Invalid RUGCHECK_URL: must start with http/https. Got: {}",
                self.rugcheck_url
            ));
        }

        if self.top_holder_count == 0 {
            return Err("TOP_HOLDER_COUNT cannot be 0".into());
        }
        if !(0.0..=100.0).contains(&self.bundle_threshold_pct) {
            return Err(format!(
                "BUNDLE_THRESHOLD_PCT must be within 0..=100. Got: {}",
                self.bundle_threshold_pct
            ));
        }
        if self.risk_score_threshold <= 0.0 {
            return Err("RISK_SCORE_THRESHOLD must be positive".into());
        }
        if self.branch_timeout_secs == 0 {
            return Err("BRANCH_TIMEOUT_SECS cannot be 0 (branches would never run)".into());
        }
        if self.max_concurrent_events == 0 {
            return Err("MAX_CONCURRENT_EVENTS cannot be 0 (no event would ever be analyzed)".into());
        }
        if self.dev_tx_scan_limit == 0 {
            tracing::warn!(
                "DEV_TX_SCAN_LIMIT is 0; developer-sold checks will always report false"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn base_config() -> MonitorConfig {
        MonitorConfig {
            rpc_url: "https://test.rpc".to_string(),
            ws_url: "wss://test.ws".to_string(),
            rugcheck_url: default_rugcheck_url(),
            data_dir: default_data_dir(),
            metrics_addr: None,
            top_holder_count: default_top_holder_count(),
            bundle_threshold_pct: default_bundle_threshold_pct(),
            risk_score_threshold: default_risk_score_threshold(),
            branch_timeout_secs: default_branch_timeout_secs(),
            max_concurrent_events: default_max_concurrent_events(),
            dev_tx_scan_limit: default_dev_tx_scan_limit(),
        }
    }

    #[test]
    fn test_config_from_env() {
        env::set_var("RPC_URL", "https://test.rpc");
        env::set_var("WS_URL", "wss://test.ws");

        let config = MonitorConfig::new().expect("Failed to load config");

        assert_eq!(config.rpc_url, "https://test.rpc");
        assert_eq!(config.ws_url, "wss://test.ws");
        assert_eq!(config.top_holder_count, 10);
        assert_eq!(config.bundle_threshold_pct, 1.0);
        assert_eq!(config.risk_score_threshold, 10_000.0);
    }

    #[test]
    fn test_defaults_pass_validation() {
        assert!(base_config().validate().is_ok());
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
