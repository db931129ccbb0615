//! Etherscan v2 multi-chain client used to discover the current claim
//! payout by scanning recent transactions sent to the contract.

use crate::config::ExplorerSettings;
use crate::domain::CLAIM_SELECTOR;
use crate::error::{PunchcardError, Result};
use async_trait::async_trait;
use ethers::types::U256;
use serde::Deserialize;
use tracing::debug;

/// One row of explorer transaction history
#[derive(Debug, Clone, Deserialize)]
pub struct ExplorerTx {
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub input: String,
    /// Transferred value as a decimal wei string
    #[serde(default)]
    pub value: String,
}

impl ExplorerTx {
    /// Whether this row is a claim call (input starts with the selector)
    pub fn is_claim(&self) -> bool {
        self.input.starts_with(CLAIM_SELECTOR)
    }

    pub fn value_wei(&self) -> Option<U256> {
        U256::from_dec_str(&self.value).ok()
    }
}

// Etherscan wraps errors in the same envelope with `result` switched to a
// plain string, so `result` stays untyped until the status is checked.
#[derive(Debug, Deserialize)]
struct TxListEnvelope {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    result: serde_json::Value,
}

fn parse_txlist(body: &str) -> Result<Vec<ExplorerTx>> {
    let envelope: TxListEnvelope = serde_json::from_str(body)?;
    if envelope.status != "1" {
        return Err(PunchcardError::Explorer(format!(
            "API error: {}",
            envelope.message
        )));
    }
    Ok(serde_json::from_value(envelope.result)?)
}

/// Transaction history lookup consumed by the claim resolver
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TxHistorySource: Send + Sync {
    /// Most recent transactions sent to the contract, newest first.
    async fn recent_txs(&self) -> Result<Vec<ExplorerTx>>;
}

pub struct EtherscanClient {
    http: reqwest::Client,
    settings: ExplorerSettings,
    chain_id: u64,
    contract: String,
}

impl EtherscanClient {
    pub fn new(settings: ExplorerSettings, chain_id: u64, contract: String) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("punchcard/0.1")
            .timeout(settings.timeout())
            .build()?;
        Ok(Self {
            http,
            settings,
            chain_id,
            contract,
        })
    }
}

#[async_trait]
impl TxHistorySource for EtherscanClient {
    async fn recent_txs(&self) -> Result<Vec<ExplorerTx>> {
        let api_key = self
            .settings
            .api_key
            .as_deref()
            .ok_or_else(|| PunchcardError::Explorer("no explorer API key configured".to_string()))?;

        let chain_id = self.chain_id.to_string();
        let page_size = self.settings.page_size.to_string();
        let query = [
            ("chainid", chain_id.as_str()),
            ("module", "account"),
            ("action", "txlist"),
            ("address", self.contract.as_str()),
            ("startblock", "0"),
            ("endblock", "99999999"),
            ("page", "1"),
            ("offset", page_size.as_str()),
            ("sort", "desc"),
            ("apikey", api_key),
        ];

        let response = self.http.get(&self.settings.api_url).query(&query).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PunchcardError::Explorer(format!("HTTP {}: {}", status, body)));
        }

        let body = response.text().await?;
        let txs = parse_txlist(&body)?;
        debug!("Explorer returned {} transaction(s)", txs.len());
        Ok(txs)
    }
}
