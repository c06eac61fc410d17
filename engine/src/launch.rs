use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::signature::Signature;
use solana_transaction_status::option_serializer::OptionSerializer;
use solana_transaction_status::{
    EncodedConfirmedTransactionWithStatusMeta, EncodedTransaction, UiMessage,
    UiTransactionEncoding, UiTransactionTokenBalance,
};

use launch_core::constants::{RAYDIUM_AMM_AUTHORITY, SOL_MINT};
use launch_core::error::EnrichError;
use launch_core::LaunchEvent;

use crate::ports::LaunchResolver;

/// Resolves a launch signature into a `LaunchEvent` by fetching the
/// parsed transaction and reading the pool's post token balances.
pub struct RpcLaunchResolver {
    rpc: Arc<RpcClient>,
}

impl RpcLaunchResolver {
    pub fn new(rpc: Arc<RpcClient>) -> Self {
        Self { rpc }
    }

    async fn fetch_parsed(
        &self,
        sig: &Signature,
    ) -> Result<EncodedConfirmedTransactionWithStatusMeta, EnrichError> {
        // Newly confirmed transactions can lag behind the log
        // notification; try a few times before giving up.
        let mut last_err = String::new();
        for attempt in 1..=3u64 {
            match self
                .rpc
                .get_transaction_with_config(
                    sig,
                    solana_client::rpc_config::RpcTransactionConfig {
                        encoding: Some(UiTransactionEncoding::JsonParsed),
                        commitment: Some(
                            solana_sdk::commitment_config::CommitmentConfig::confirmed(),
                        ),
                        max_supported_transaction_version: Some(0),
                    },
                )
                .await
            {
                Ok(info) => return Ok(info),
                Err(e) => {
                    tracing::warn!("⏳ Tx fetch attempt {} failed for {}: {}", attempt, sig, e);
                    last_err = e.to_string();
                }
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(500 * attempt)).await;
        }

        crate::telemetry::RPC_ERRORS_TOTAL.inc();
        Err(EnrichError::UpstreamQuery(format!(
            "transaction {} unavailable after 3 attempts: {}",
            sig, last_err
        )))
    }
}

#[async_trait::async_trait]
impl LaunchResolver for RpcLaunchResolver {
    async fn resolve(&self, signature: &str) -> Result<Option<LaunchEvent>, EnrichError> {
        let sig = Signature::from_str(signature)
            .map_err(|e| EnrichError::MalformedData(format!("invalid signature {}: {}", signature, e)))?;

        let tx = self.fetch_parsed(&sig).await?;

        let meta = match tx.transaction.meta {
            Some(meta) => meta,
            None => return Ok(None),
        };
        // The log subscription already filters errored transactions,
        // but the fetched view is authoritative.
        if meta.err.is_some() {
            return Ok(None);
        }

        let message = match tx.transaction.transaction {
            EncodedTransaction::Json(ui_tx) => ui_tx.message,
            _ => {
                return Err(EnrichError::MalformedData(
                    "expected jsonParsed transaction encoding".to_string(),
                ))
            }
        };
        let parsed = match message {
            UiMessage::Parsed(parsed) => parsed,
            UiMessage::Raw(_) => {
                return Err(EnrichError::MalformedData(
                    "expected parsed message".to_string(),
                ))
            }
        };

        let creator = match parsed.account_keys.first() {
            Some(key) => key.pubkey.clone(),
            None => {
                return Err(EnrichError::MalformedData(
                    "transaction has no account keys".to_string(),
                ))
            }
        };

        let post_balances: Option<Vec<UiTransactionTokenBalance>> = meta.post_token_balances.into();
        let base = post_balances
            .as_deref()
            .and_then(pick_base_balance);

        let (base_mint, base_decimals, base_lp_amount) = match base {
            Some(info) => info,
            // Real transaction, but no pool base balance: not a launch.
            None => return Ok(None),
        };

        Ok(Some(LaunchEvent {
            signature: signature.to_string(),
            creator,
            base_mint,
            base_decimals,
            base_lp_amount,
            detected_at: Utc::now(),
        }))
    }
}

/// The launched base token is the non-SOL post balance custodied by
/// the Raydium AMM authority.
pub(crate) fn pick_base_balance(
    balances: &[UiTransactionTokenBalance],
) -> Option<(String, u8, f64)> {
    balances.iter().find_map(|balance| {
        let owner = match &balance.owner {
            OptionSerializer::Some(owner) => owner,
            _ => return None,
        };
        if owner != &RAYDIUM_AMM_AUTHORITY.to_string() || balance.mint == SOL_MINT.to_string() {
            return None;
        }
        Some((
            balance.mint.clone(),
            balance.ui_token_amount.decimals,
            balance.ui_token_amount.ui_amount.unwrap_or(0.0),
        ))
    })
}
