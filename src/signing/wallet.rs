use crate::error::{PunchcardError, Result};
use ethers::signers::{LocalWallet, Signer as EthersSigner};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes};
use tracing::debug;
use zeroize::Zeroize;

/// Wallet for signing check-in and register transactions
///
/// # Security
/// The private key hex is only used during wallet creation and then
/// immediately zeroized. It is never stored in the Wallet struct, so
/// memory dumps of long-running batches do not expose key material.
#[derive(Clone)]
pub struct Wallet {
    inner: LocalWallet,
    chain_id: u64,
}

impl Wallet {
    /// Create a wallet from a private key hex string
    ///
    /// # Security
    /// The private key is zeroized from memory after wallet creation.
    pub fn from_private_key(private_key: &str, chain_id: u64) -> Result<Self> {
        // Remove 0x prefix if present
        let key_hex = private_key.trim_start_matches("0x");

        let mut secure_key = key_hex.to_string();

        let wallet = secure_key
            .parse::<LocalWallet>()
            .map_err(|e| PunchcardError::Wallet(format!("Invalid private key: {}", e)))?
            .with_chain_id(chain_id);

        // Zeroize the key from memory
        secure_key.zeroize();

        debug!("Wallet initialized: {:?}", wallet.address());

        Ok(Self {
            inner: wallet,
            chain_id,
        })
    }

    /// Get the wallet address
    pub fn address(&self) -> Address {
        self.inner.address()
    }

    /// Get the chain ID
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Sign a transaction and return the raw RLP bytes ready for broadcast
    pub async fn sign_transaction(&self, tx: &TypedTransaction) -> Result<Bytes> {
        let signature = self
            .inner
            .sign_transaction(tx)
            .await
            .map_err(|e| PunchcardError::Signature(format!("Failed to sign transaction: {}", e)))?;
        Ok(tx.rlp_signed(&signature))
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address())
            .field("chain_id", &self.chain_id)
            .finish()
    }
}
