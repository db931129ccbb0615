//! Account-set orchestration for one action: load keys, gate on balance,
//! submit per account, keep going when individual accounts fail.

use crate::adapters::ChainClient;
use crate::config::AppConfig;
use crate::domain::{AccountOutcome, ActionKind, BatchSummary, TxOutcome};
use crate::error::Result;
use crate::services::resolver::ClaimResolver;
use crate::services::submitter::TxSubmitter;
use crate::signing::{load_wallets, Wallet};
use ethers::types::{Bytes, U256};
use ethers::utils::format_ether;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

pub struct BatchRunner {
    client: Arc<dyn ChainClient>,
    submitter: TxSubmitter,
    resolver: ClaimResolver,
    keys_file: String,
    chain_id: u64,
    min_balance: U256,
    account_delay: Duration,
}

impl BatchRunner {
    pub fn new(
        client: Arc<dyn ChainClient>,
        submitter: TxSubmitter,
        resolver: ClaimResolver,
        config: &AppConfig,
    ) -> Result<Self> {
        Ok(Self {
            client,
            submitter,
            resolver,
            keys_file: config.accounts.keys_file.clone(),
            chain_id: config.chain.chain_id,
            min_balance: config.accounts.min_balance_wei()?,
            account_delay: config.batch.account_delay(),
        })
    }

    /// Run one batch of the given action over every account in the keys
    /// file. Always completes; per-account problems are captured in the
    /// returned outcomes.
    pub async fn run(&self, action: ActionKind) -> Vec<AccountOutcome> {
        let wallets = match load_wallets(&self.keys_file, self.chain_id) {
            Ok(wallets) => wallets,
            Err(e) => {
                error!("Error reading private keys: {}", e);
                Vec::new()
            }
        };

        info!("Starting {} for {} accounts", action, wallets.len());

        let calldata = match action.calldata() {
            Ok(data) => data,
            Err(e) => {
                error!("Cannot build {} calldata: {}", action, e);
                return Vec::new();
            }
        };

        // One resolved amount for the whole batch, replayed on every
        // account's transaction
        let value = match action {
            ActionKind::Register => U256::zero(),
            ActionKind::Sign => {
                let amount = self.resolver.resolve().await;
                info!("Using sign amount: {} BNB", format_ether(amount));
                amount
            }
        };

        let total = wallets.len();
        let mut outcomes = Vec::with_capacity(total);

        for (idx, wallet) in wallets.iter().enumerate() {
            let outcome = self
                .process_account(wallet, idx + 1, total, &calldata, value, action)
                .await;
            let attempted = !outcome.is_skipped();
            outcomes.push(outcome);

            // Rate limiting against the node; skipped accounts cost nothing
            if attempted {
                sleep(self.account_delay).await;
            }
        }

        let summary = BatchSummary::tally(action, &outcomes);
        info!("{}", summary);
        outcomes
    }

    async fn process_account(
        &self,
        wallet: &Wallet,
        index: usize,
        total: usize,
        calldata: &Bytes,
        value: U256,
        action: ActionKind,
    ) -> AccountOutcome {
        let address = wallet.address();

        let balance = match self.client.native_balance(address).await {
            Ok(balance) => balance,
            Err(e) => {
                error!("Error processing account {}/{}: {}", index, total, e);
                return AccountOutcome::Submitted(TxOutcome::failed(
                    action,
                    address,
                    format!("balance query: {}", e),
                ));
            }
        };

        info!(
            "Account {}/{}: {:?}, balance {} BNB",
            index,
            total,
            address,
            format_ether(balance)
        );

        if balance < self.min_balance {
            warn!("Insufficient balance for {:?}, skipping", address);
            return AccountOutcome::Skipped { address, balance };
        }

        AccountOutcome::Submitted(
            self.submitter
                .submit(wallet, calldata.clone(), value, action)
                .await,
        )
    }
}
