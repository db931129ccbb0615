use crate::error::{PunchcardError, Result};
use async_trait::async_trait;
use ethers::providers::{Http, Middleware, Provider};
use ethers::types::{Address, BlockNumber, Bytes, TransactionReceipt, TxHash, U256};

/// Read/submit surface of the chain node consumed by the engine.
///
/// Everything the submitter and batch runner need from the network goes
/// through this trait so tests can stand in a scripted node.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn native_balance(&self, address: Address) -> Result<U256>;

    /// Pending-inclusive transaction count. Used directly as the next
    /// nonce; re-queried on every submission, never cached.
    async fn pending_tx_count(&self, address: Address) -> Result<U256>;

    async fn gas_price(&self) -> Result<U256>;

    async fn broadcast_raw(&self, raw_tx: Bytes) -> Result<TxHash>;

    async fn receipt(&self, tx_hash: TxHash) -> Result<Option<TransactionReceipt>>;
}

/// JSON-RPC implementation over an HTTP provider
pub struct RpcChainClient {
    provider: Provider<Http>,
}

impl RpcChainClient {
    pub fn connect(rpc_url: &str) -> Result<Self> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| PunchcardError::Validation(format!("invalid RPC url {}: {}", rpc_url, e)))?;
        Ok(Self { provider })
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn native_balance(&self, address: Address) -> Result<U256> {
        Ok(self.provider.get_balance(address, None).await?)
    }

    async fn pending_tx_count(&self, address: Address) -> Result<U256> {
        Ok(self
            .provider
            .get_transaction_count(address, Some(BlockNumber::Pending.into()))
            .await?)
    }

    async fn gas_price(&self) -> Result<U256> {
        Ok(self.provider.get_gas_price().await?)
    }

    async fn broadcast_raw(&self, raw_tx: Bytes) -> Result<TxHash> {
        let pending = self.provider.send_raw_transaction(raw_tx).await?;
        Ok(*pending)
    }

    async fn receipt(&self, tx_hash: TxHash) -> Result<Option<TransactionReceipt>> {
        Ok(self.provider.get_transaction_receipt(tx_hash).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_validates_url() {
        assert!(RpcChainClient::connect("https://bsc-dataseed1.binance.org/").is_ok());
        assert!(RpcChainClient::connect("not a url").is_err());
    }
}
