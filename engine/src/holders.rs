use std::str::FromStr;
use std::sync::Arc;

use solana_account_decoder::UiAccountEncoding;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::{RpcAccountInfoConfig, RpcProgramAccountsConfig};
use solana_client::rpc_filter::{Memcmp, RpcFilterType};
use solana_sdk::program_pack::Pack;
use solana_sdk::pubkey::Pubkey;
use tracing::debug;

use launch_core::constants::{TOKEN_ACCOUNT_SIZE, TOKEN_PROGRAM};
use launch_core::error::EnrichError;
use launch_core::HolderRecord;

use crate::ports::HolderSource;

/// Enumerates every token account holding a mint via a filtered
/// program-account scan.
///
/// No retries here: retry and timeout policy belongs to the
/// orchestrator, which wraps this call per branch.
pub struct RpcHolderSource {
    rpc: Arc<RpcClient>,
}

impl RpcHolderSource {
    pub fn new(rpc: Arc<RpcClient>) -> Self {
        Self { rpc }
    }
}

#[async_trait::async_trait]
impl HolderSource for RpcHolderSource {
    async fn enumerate(&self, mint: &str, decimals: u8) -> Result<Vec<HolderRecord>, EnrichError> {
        let mint_key = Pubkey::from_str(mint)
            .map_err(|e| EnrichError::MalformedData(format!("invalid mint {}: {}", mint, e)))?;

        // dataSize pins SPL token-account records, memcmp at offset 0
        // pins this mint; everything else never leaves the node.
        let config = RpcProgramAccountsConfig {
            filters: Some(vec![
                RpcFilterType::DataSize(TOKEN_ACCOUNT_SIZE),
                RpcFilterType::Memcmp(Memcmp::new_base58_encoded(0, mint_key.as_ref())),
            ]),
            account_config: RpcAccountInfoConfig {
                encoding: Some(UiAccountEncoding::Base64),
                ..RpcAccountInfoConfig::default()
            },
            with_context: None,
        };

        let accounts = self
            .rpc
            .get_program_accounts_with_config(&TOKEN_PROGRAM, config)
            .await
            .map_err(|e| {
                crate::telemetry::RPC_ERRORS_TOTAL.inc();
                EnrichError::UpstreamQuery(format!("holder scan for {} failed: {}", mint, e))
            })?;

        let scale = 10f64.powi(decimals as i32);
        let mut holders = Vec::with_capacity(accounts.len());

        for (pubkey, account) in accounts {
            let token_account = match spl_token::state::Account::unpack(&account.data) {
                Ok(acc) => acc,
                Err(e) => {
                    // Excluded from aggregation, never fatal.
                    tracing::warn!("Malformed token account {}: {}", pubkey, e);
                    continue;
                }
            };

            let amount = token_account.amount as f64 / scale;
            // Zero balances contribute nothing to supply or share and
            // would distort sort stability.
            if amount > 0.0 {
                holders.push(HolderRecord {
                    address: pubkey.to_string(),
                    amount,
                });
            }
        }

        debug!("Enumerated {} holders for mint {}", holders.len(), mint);
        Ok(holders)
    }
}
