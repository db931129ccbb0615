use crate::adapters::TxHistorySource;
use crate::config::ClaimSettings;
use crate::error::Result;
use ethers::types::U256;
use ethers::utils::format_ether;
use std::sync::Arc;
use tracing::{info, warn};

/// Discovers the claim value to replay this cycle by scanning recent
/// contract traffic, newest first. One resolved value is reused for every
/// account in the batch.
pub struct ClaimResolver {
    source: Arc<dyn TxHistorySource>,
    default_amount: U256,
}

impl ClaimResolver {
    pub fn new(source: Arc<dyn TxHistorySource>, settings: &ClaimSettings) -> Result<Self> {
        Ok(Self {
            source,
            default_amount: settings.default_amount_wei()?,
        })
    }

    /// Resolve the claim amount in wei. Never fails: any lookup problem
    /// falls back to the configured default.
    pub async fn resolve(&self) -> U256 {
        match self.try_resolve().await {
            Ok(Some(value)) => value,
            Ok(None) => {
                warn!("No claim transaction found in recent history, using default amount");
                self.default_amount
            }
            Err(e) => {
                warn!("Claim lookup failed ({}), using default amount", e);
                self.default_amount
            }
        }
    }

    async fn try_resolve(&self) -> Result<Option<U256>> {
        let txs = self.source.recent_txs().await?;
        for tx in &txs {
            if !tx.is_claim() {
                continue;
            }
            if let Some(value) = tx.value_wei() {
                if value > U256::zero() {
                    info!(
                        "Found claim transaction: {} BNB, hash: {}",
                        format_ether(value),
                        tx.hash
                    );
                    return Ok(Some(value));
                }
            }
        }
        Ok(None)
    }
}
