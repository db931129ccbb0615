//! Single-transaction pipeline: nonce, gas, sign, broadcast, confirm.

use crate::adapters::ChainClient;
use crate::config::SubmitSettings;
use crate::domain::{ActionKind, TxOutcome};
use crate::error::{PunchcardError, Result};
use crate::signing::Wallet;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, TransactionReceipt, TransactionRequest, TxHash, U256};
use ethers::utils::format_units;
use std::sync::Arc;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info};

/// Builds, signs, submits, and confirms one transaction per call
pub struct TxSubmitter {
    client: Arc<dyn ChainClient>,
    contract: Address,
    chain_id: u64,
    settings: SubmitSettings,
}

impl TxSubmitter {
    pub fn new(
        client: Arc<dyn ChainClient>,
        contract: Address,
        chain_id: u64,
        settings: SubmitSettings,
    ) -> Self {
        Self {
            client,
            contract,
            chain_id,
            settings,
        }
    }

    /// Submit one action transaction for one account.
    ///
    /// Every failure mode (RPC unreachable, signing error, broadcast
    /// rejection, receipt timeout) is folded into the returned outcome so
    /// the batch loop never has to unwind.
    pub async fn submit(
        &self,
        wallet: &Wallet,
        calldata: Bytes,
        value: U256,
        action: ActionKind,
    ) -> TxOutcome {
        let address = wallet.address();
        match self.try_submit(wallet, calldata, value, action).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Error executing {} for {:?}: {}", action, address, e);
                TxOutcome::failed(action, address, e.to_string())
            }
        }
    }

    async fn try_submit(
        &self,
        wallet: &Wallet,
        calldata: Bytes,
        value: U256,
        action: ActionKind,
    ) -> Result<TxOutcome> {
        let address = wallet.address();

        // Fresh pending-inclusive count every call; a stale nonce is
        // rejected by the node rather than silently replacing anything
        let nonce = self.client.pending_tx_count(address).await?;

        let base_gas_price = self.client.gas_price().await?;
        let gas_price = scale_gas_price(base_gas_price, self.settings.gas_price_multiplier);
        let gas_limit = self.settings.gas_limit_for(action);

        let gwei = format_units(gas_price, "gwei").unwrap_or_else(|_| gas_price.to_string());
        info!("Gas price: {} gwei, gas limit: {}", gwei, gas_limit);

        let tx: TypedTransaction = TransactionRequest::new()
            .from(address)
            .to(self.contract)
            .value(value)
            .gas(gas_limit)
            .gas_price(gas_price)
            .nonce(nonce)
            .data(calldata)
            .chain_id(self.chain_id)
            .into();

        let raw = wallet.sign_transaction(&tx).await?;
        let tx_hash = self.client.broadcast_raw(raw).await?;
        debug!(
            "Broadcast {} tx {:?} for {:?} (nonce {})",
            action, tx_hash, address, nonce
        );

        let receipt = self.wait_for_receipt(tx_hash).await?;
        Ok(self.classify(receipt, action, address, gas_limit))
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<TransactionReceipt> {
        let deadline = self.settings.receipt_timeout();
        match timeout(deadline, self.poll_receipt(tx_hash)).await {
            Ok(receipt) => receipt,
            Err(_) => Err(PunchcardError::ReceiptTimeout {
                tx_hash: format!("{:?}", tx_hash),
                elapsed_secs: deadline.as_secs(),
            }),
        }
    }

    async fn poll_receipt(&self, tx_hash: TxHash) -> Result<TransactionReceipt> {
        loop {
            if let Some(receipt) = self.client.receipt(tx_hash).await? {
                return Ok(receipt);
            }
            sleep(self.settings.receipt_poll()).await;
        }
    }

    fn classify(
        &self,
        receipt: TransactionReceipt,
        action: ActionKind,
        address: Address,
        gas_limit: u64,
    ) -> TxOutcome {
        let tx_hash = receipt.transaction_hash;
        let gas_used = receipt.gas_used;

        if receipt.status == Some(1u64.into()) {
            info!("{} successful for {:?}", action, address);
            if let Some(used) = gas_used {
                let pct = used.low_u64() as f64 / gas_limit as f64 * 100.0;
                info!("Gas used: {} ({:.1}%), tx hash: {:?}", used, pct, tx_hash);
            }
            TxOutcome::confirmed(action, address, tx_hash, gas_used)
        } else {
            error!("{} failed for {:?}, tx hash: {:?}", action, address, tx_hash);
            TxOutcome::reverted(action, address, tx_hash, gas_used)
        }
    }
}

// Fixed-point through parts-per-thousand; the multiplier is a small
// tunable, validated positive at config load.
fn scale_gas_price(base: U256, multiplier: f64) -> U256 {
    let ppt = (multiplier * 1000.0).round() as u64;
    base * U256::from(ppt) / U256::from(1000u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ChainClient;
    use crate::error::PunchcardError;
    use async_trait::async_trait;
    use ethers::utils::rlp::Rlp;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;

    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn test_settings() -> SubmitSettings {
        SubmitSettings {
            gas_price_multiplier: 1.0,
            sign_gas_limit: 872_541,
            register_gas_limit: 571_060,
            receipt_timeout_secs: 300,
            receipt_poll_secs: 2,
        }
    }

    fn contract() -> Address {
        "0x5B4082965B95a122ca74560868BD085f31B71E0c"
            .parse()
            .unwrap()
    }

    struct StubChain {
        pending_count: AtomicU64,
        gas_price_wei: u64,
        receipt_status: Option<u64>,
        nonce_error: bool,
        broadcasts: Mutex<Vec<Bytes>>,
    }

    impl StubChain {
        fn new(pending_count: u64, gas_price_wei: u64, receipt_status: Option<u64>) -> Self {
            Self {
                pending_count: AtomicU64::new(pending_count),
                gas_price_wei,
                receipt_status,
                nonce_error: false,
                broadcasts: Mutex::new(Vec::new()),
            }
        }

        fn failing_nonce() -> Self {
            let mut stub = Self::new(0, 1, Some(1));
            stub.nonce_error = true;
            stub
        }
    }

    #[async_trait]
    impl ChainClient for StubChain {
        async fn native_balance(&self, _address: Address) -> crate::error::Result<U256> {
            Ok(U256::zero())
        }

        async fn pending_tx_count(&self, _address: Address) -> crate::error::Result<U256> {
            if self.nonce_error {
                return Err(PunchcardError::Internal("node down".to_string()));
            }
            Ok(U256::from(self.pending_count.load(Ordering::SeqCst)))
        }

        async fn gas_price(&self) -> crate::error::Result<U256> {
            Ok(U256::from(self.gas_price_wei))
        }

        async fn broadcast_raw(&self, raw_tx: Bytes) -> crate::error::Result<TxHash> {
            self.broadcasts.lock().unwrap().push(raw_tx);
            Ok(TxHash::from_low_u64_be(1))
        }

        async fn receipt(&self, tx_hash: TxHash) -> crate::error::Result<Option<TransactionReceipt>> {
            Ok(self.receipt_status.map(|status| TransactionReceipt {
                transaction_hash: tx_hash,
                status: Some(status.into()),
                gas_used: Some(U256::from(400_000u64)),
                ..Default::default()
            }))
        }
    }

    fn submitter(stub: Arc<StubChain>) -> TxSubmitter {
        TxSubmitter::new(stub, contract(), 56, test_settings())
    }

    fn decode_broadcast(stub: &StubChain) -> TypedTransaction {
        let raw = stub.broadcasts.lock().unwrap()[0].clone();
        let (tx, _sig) = TypedTransaction::decode_signed(&Rlp::new(&raw)).unwrap();
        tx
    }

    #[tokio::test]
    async fn test_submit_builds_tx_from_stub_state() {
        let stub = Arc::new(StubChain::new(7, 5_000_000_000, Some(1)));
        let wallet = Wallet::from_private_key(TEST_KEY, 56).unwrap();

        let outcome = submitter(Arc::clone(&stub))
            .submit(
                &wallet,
                ActionKind::Sign.calldata().unwrap(),
                U256::from(400_000_000_000_000u64),
                ActionKind::Sign,
            )
            .await;

        assert!(outcome.success);
        assert_eq!(outcome.gas_used, Some(U256::from(400_000u64)));

        let tx = decode_broadcast(&stub);
        assert_eq!(tx.nonce(), Some(&U256::from(7u64)));
        assert_eq!(tx.gas(), Some(&U256::from(872_541u64)));
        assert_eq!(tx.gas_price(), Some(U256::from(5_000_000_000u64)));
        assert_eq!(tx.value(), Some(&U256::from(400_000_000_000_000u64)));
    }

    #[tokio::test]
    async fn test_register_uses_register_gas_limit() {
        let stub = Arc::new(StubChain::new(0, 1_000_000_000, Some(1)));
        let wallet = Wallet::from_private_key(TEST_KEY, 56).unwrap();

        submitter(Arc::clone(&stub))
            .submit(
                &wallet,
                ActionKind::Register.calldata().unwrap(),
                U256::zero(),
                ActionKind::Register,
            )
            .await;

        let tx = decode_broadcast(&stub);
        assert_eq!(tx.gas(), Some(&U256::from(571_060u64)));
    }

    #[tokio::test]
    async fn test_nonce_requeried_per_submission() {
        let stub = Arc::new(StubChain::new(3, 1_000_000_000, Some(1)));
        let wallet = Wallet::from_private_key(TEST_KEY, 56).unwrap();
        let submitter = submitter(Arc::clone(&stub));

        submitter
            .submit(&wallet, ActionKind::Sign.calldata().unwrap(), U256::zero(), ActionKind::Sign)
            .await;
        stub.pending_count.store(9, Ordering::SeqCst);
        submitter
            .submit(&wallet, ActionKind::Sign.calldata().unwrap(), U256::zero(), ActionKind::Sign)
            .await;

        let broadcasts = stub.broadcasts.lock().unwrap();
        let (first, _) = TypedTransaction::decode_signed(&Rlp::new(&broadcasts[0])).unwrap();
        let (second, _) = TypedTransaction::decode_signed(&Rlp::new(&broadcasts[1])).unwrap();
        assert_eq!(first.nonce(), Some(&U256::from(3u64)));
        assert_eq!(second.nonce(), Some(&U256::from(9u64)));
    }

    #[tokio::test]
    async fn test_gas_price_multiplier_scales_suggestion() {
        let stub = Arc::new(StubChain::new(0, 1_000, Some(1)));
        let wallet = Wallet::from_private_key(TEST_KEY, 56).unwrap();
        let mut settings = test_settings();
        settings.gas_price_multiplier = 1.5;
        let submitter = TxSubmitter::new(Arc::clone(&stub) as Arc<dyn ChainClient>, contract(), 56, settings);

        submitter
            .submit(&wallet, ActionKind::Sign.calldata().unwrap(), U256::zero(), ActionKind::Sign)
            .await;

        let tx = decode_broadcast(&stub);
        assert_eq!(tx.gas_price(), Some(U256::from(1_500u64)));
    }

    #[tokio::test]
    async fn test_reverted_receipt_reports_failure() {
        let stub = Arc::new(StubChain::new(0, 1_000_000_000, Some(0)));
        let wallet = Wallet::from_private_key(TEST_KEY, 56).unwrap();

        let outcome = submitter(stub)
            .submit(&wallet, ActionKind::Sign.calldata().unwrap(), U256::zero(), ActionKind::Sign)
            .await;

        assert!(!outcome.success);
        assert!(outcome.tx_hash.is_some());
        assert_eq!(outcome.error.as_deref(), Some("receipt status 0"));
    }

    #[tokio::test]
    async fn test_rpc_error_is_contained() {
        let stub = Arc::new(StubChain::failing_nonce());
        let wallet = Wallet::from_private_key(TEST_KEY, 56).unwrap();

        let outcome = submitter(Arc::clone(&stub))
            .submit(&wallet, ActionKind::Sign.calldata().unwrap(), U256::zero(), ActionKind::Sign)
            .await;

        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("node down"));
        assert!(stub.broadcasts.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_receipt_timeout_is_a_contained_failure() {
        // Receipt never appears; virtual time runs down the 300s ceiling
        let stub = Arc::new(StubChain::new(0, 1_000_000_000, None));
        let wallet = Wallet::from_private_key(TEST_KEY, 56).unwrap();

        let outcome = submitter(stub)
            .submit(&wallet, ActionKind::Sign.calldata().unwrap(), U256::zero(), ActionKind::Sign)
            .await;

        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("Receipt timeout after 300s"));
    }

    #[test]
    fn test_scale_gas_price_passthrough() {
        let base = U256::from(7_000_000_000u64);
        assert_eq!(scale_gas_price(base, 1.0), base);
        assert_eq!(scale_gas_price(base, 1.2), U256::from(8_400_000_000u64));
    }
}
