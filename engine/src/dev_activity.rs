use std::str::FromStr;
use std::sync::Arc;

use solana_account_decoder::UiAccountData;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_client::GetConfirmedSignaturesForAddress2Config;
use solana_client::rpc_request::TokenAccountsFilter;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_transaction_status::option_serializer::OptionSerializer;
use solana_transaction_status::{UiTransactionEncoding, UiTransactionTokenBalance};
use tracing::{debug, warn};

use launch_core::error::EnrichError;

use crate::ports::DevScreen;

/// Inspects the launching wallet: how much of the mint it still
/// holds, and whether its recent transactions show it selling.
pub struct RpcDevScreen {
    rpc: Arc<RpcClient>,
    scan_limit: usize,
}

impl RpcDevScreen {
    pub fn new(rpc: Arc<RpcClient>, scan_limit: usize) -> Self {
        Self { rpc, scan_limit }
    }

    fn parse_key(value: &str, what: &str) -> Result<Pubkey, EnrichError> {
        Pubkey::from_str(value)
            .map_err(|e| EnrichError::MalformedData(format!("invalid {} {}: {}", what, value, e)))
    }
}

#[async_trait::async_trait]
impl DevScreen for RpcDevScreen {
    async fn holding_percentage(&self, wallet: &str, mint: &str) -> Result<f64, EnrichError> {
        let owner = Self::parse_key(wallet, "wallet")?;
        let mint_key = Self::parse_key(mint, "mint")?;

        let accounts = self
            .rpc
            .get_token_accounts_by_owner(&owner, TokenAccountsFilter::Mint(mint_key))
            .await
            .map_err(|e| {
                crate::telemetry::RPC_ERRORS_TOTAL.inc();
                EnrichError::UpstreamQuery(format!("token accounts for {}: {}", wallet, e))
            })?;

        let mut wallet_balance = 0.0;
        for keyed in accounts {
            match keyed.account.data {
                UiAccountData::Json(parsed) => {
                    if let Some(amount) = parsed.parsed["info"]["tokenAmount"]["uiAmount"].as_f64()
                    {
                        wallet_balance += amount;
                    }
                }
                _ => {
                    warn!("Unparsed token account {} for wallet {}", keyed.pubkey, wallet);
                }
            }
        }

        let supply = self
            .rpc
            .get_token_supply(&mint_key)
            .await
            .map_err(|e| {
                crate::telemetry::RPC_ERRORS_TOTAL.inc();
                EnrichError::UpstreamQuery(format!("token supply for {}: {}", mint, e))
            })?;
        let total_supply = supply.ui_amount.unwrap_or(0.0);

        if total_supply == 0.0 {
            return Ok(0.0);
        }

        let percentage = wallet_balance / total_supply * 100.0;
        debug!("Wallet {} holds {:.4}% of {}", wallet, percentage, mint);
        Ok(percentage)
    }

    async fn has_sold(&self, wallet: &str, mint: &str) -> Result<bool, EnrichError> {
        let owner = Self::parse_key(wallet, "wallet")?;

        let signatures = self
            .rpc
            .get_signatures_for_address_with_config(
                &owner,
                GetConfirmedSignaturesForAddress2Config {
                    limit: Some(self.scan_limit),
                    commitment: Some(CommitmentConfig::confirmed()),
                    ..GetConfirmedSignaturesForAddress2Config::default()
                },
            )
            .await
            .map_err(|e| {
                crate::telemetry::RPC_ERRORS_TOTAL.inc();
                EnrichError::UpstreamQuery(format!("signature scan for {}: {}", wallet, e))
            })?;

        for info in signatures {
            let sig = match Signature::from_str(&info.signature) {
                Ok(sig) => sig,
                Err(e) => {
                    warn!("Skipping malformed signature {}: {}", info.signature, e);
                    continue;
                }
            };

            let tx = match self
                .rpc
                .get_transaction_with_config(
                    &sig,
                    solana_client::rpc_config::RpcTransactionConfig {
                        encoding: Some(UiTransactionEncoding::JsonParsed),
                        commitment: Some(CommitmentConfig::confirmed()),
                        max_supported_transaction_version: Some(0),
                    },
                )
                .await
            {
                Ok(tx) => tx,
                // A single unfetchable transaction is excluded from
                // the scan, not an error for the whole check.
                Err(e) => {
                    debug!("Skipping unfetchable tx {}: {}", info.signature, e);
                    continue;
                }
            };

            let meta = match tx.transaction.meta {
                Some(meta) if meta.err.is_none() => meta,
                _ => continue,
            };

            let pre: Option<Vec<UiTransactionTokenBalance>> = meta.pre_token_balances.into();
            let post: Option<Vec<UiTransactionTokenBalance>> = meta.post_token_balances.into();

            if sold_between(
                pre.as_deref().unwrap_or(&[]),
                post.as_deref().unwrap_or(&[]),
                wallet,
                mint,
            ) {
                debug!("Wallet {} reduced its {} balance in {}", wallet, mint, info.signature);
                return Ok(true);
            }
        }

        Ok(false)
    }
}

fn balance_for(balances: &[UiTransactionTokenBalance], wallet: &str, mint: &str) -> f64 {
    balances
        .iter()
        .find(|b| {
            b.mint == mint
                && matches!(&b.owner, OptionSerializer::Some(owner) if owner == wallet)
        })
        .and_then(|b| b.ui_token_amount.ui_amount)
        .unwrap_or(0.0)
}

/// A pre-balance strictly above the post-balance means the wallet let
/// go of some of the mint in this transaction.
pub(crate) fn sold_between(
    pre: &[UiTransactionTokenBalance],
    post: &[UiTransactionTokenBalance],
    wallet: &str,
    mint: &str,
) -> bool {
    balance_for(pre, wallet, mint) > balance_for(post, wallet, mint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_account_decoder::parse_token::UiTokenAmount;

    fn balance(owner: &str, mint: &str, amount: f64) -> UiTransactionTokenBalance {
        UiTransactionTokenBalance {
            account_index: 1,
            mint: mint.to_string(),
            ui_token_amount: UiTokenAmount {
                ui_amount: Some(amount),
                decimals: 6,
                amount: format!("{}", (amount * 1e6) as u64),
                ui_amount_string: amount.to_string(),
            },
            owner: OptionSerializer::Some(owner.to_string()),
            program_id: OptionSerializer::Skip,
        }
    }

    #[test]
    fn test_balance_decrease_is_a_sale() {
        let pre = vec![balance("dev", "mintA", 100.0)];
        let post = vec![balance("dev", "mintA", 40.0)];
        assert!(sold_between(&pre, &post, "dev", "mintA"));
    }

    #[test]
    fn test_balance_increase_is_not_a_sale() {
        let pre = vec![balance("dev", "mintA", 100.0)];
        let post = vec![balance("dev", "mintA", 150.0)];
        assert!(!sold_between(&pre, &post, "dev", "mintA"));
    }

    #[test]
    fn test_other_wallet_activity_is_ignored() {
        let pre = vec![balance("whale", "mintA", 100.0)];
        let post = vec![balance("whale", "mintA", 10.0)];
        assert!(!sold_between(&pre, &post, "dev", "mintA"));
    }

    #[test]
    fn test_other_mint_activity_is_ignored() {
        let pre = vec![balance("dev", "mintB", 100.0)];
        let post = vec![balance("dev", "mintB", 10.0)];
        assert!(!sold_between(&pre, &post, "dev", "mintA"));
    }

    #[test]
    fn test_missing_post_balance_counts_as_full_exit() {
        let pre = vec![balance("dev", "mintA", 100.0)];
        assert!(sold_between(&pre, &[], "dev", "mintA"));
    }
}
