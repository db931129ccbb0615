//! Recurring sign batches: one immediately on start, then one per interval.

use crate::config::ScheduleSettings;
use crate::domain::ActionKind;
use crate::services::batch::BatchRunner;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::info;

pub struct SignScheduler {
    runner: Arc<BatchRunner>,
    period: Duration,
}

/// Control handle for a running scheduler task
pub struct SchedulerHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stop the schedule. A batch already in flight runs to completion
    /// before the task exits.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        let _ = self.task.await;
    }
}

impl SignScheduler {
    pub fn new(runner: Arc<BatchRunner>, settings: &ScheduleSettings) -> Self {
        Self {
            runner,
            period: settings.interval(),
        }
    }

    /// Spawn the schedule loop: a sign batch right away, then one every
    /// period until the handle stops it.
    pub fn start(self) -> SchedulerHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let runner = self.runner;
        let period = self.period;

        let task = tokio::spawn(async move {
            info!(
                "Sign scheduler started (every {} minutes)",
                period.as_secs() / 60
            );

            // First tick fires immediately; Delay keeps a batch that
            // overruns the period from triggering catch-up bursts
            let mut ticker = interval_at(Instant::now(), period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    // Err means the handle is gone; stop either way
                    _ = stop_rx.changed() => {
                        info!("Sign scheduler stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        runner.run(ActionKind::Sign).await;
                        let next = Utc::now() + chrono::Duration::seconds(period.as_secs() as i64);
                        info!("Next sign run at {}", next.format("%Y-%m-%d %H:%M:%S UTC"));
                    }
                }
            }
        });

        SchedulerHandle { stop_tx, task }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{ChainClient, ExplorerTx, TxHistorySource};
    use crate::config::AppConfig;
    use crate::services::resolver::ClaimResolver;
    use crate::services::submitter::TxSubmitter;
    use async_trait::async_trait;
    use ethers::types::{Address, Bytes, TransactionReceipt, TxHash, U256};
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct NullChain;

    #[async_trait]
    impl ChainClient for NullChain {
        async fn native_balance(&self, _address: Address) -> crate::error::Result<U256> {
            Ok(U256::zero())
        }

        async fn pending_tx_count(&self, _address: Address) -> crate::error::Result<U256> {
            Ok(U256::zero())
        }

        async fn gas_price(&self) -> crate::error::Result<U256> {
            Ok(U256::one())
        }

        async fn broadcast_raw(&self, _raw_tx: Bytes) -> crate::error::Result<TxHash> {
            Ok(TxHash::zero())
        }

        async fn receipt(&self, _tx_hash: TxHash) -> crate::error::Result<Option<TransactionReceipt>> {
            Ok(Some(TransactionReceipt::default()))
        }
    }

    // Sign batches resolve the claim amount exactly once, so counting
    // lookups counts batches
    struct CountingSource {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl TxHistorySource for CountingSource {
        async fn recent_txs(&self) -> crate::error::Result<Vec<ExplorerTx>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![])
        }
    }

    fn empty_keys_file(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "punchcard-scheduler-{}-{}.txt",
            name,
            std::process::id()
        ));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "# no accounts").unwrap();
        path
    }

    fn runner(keys_file: &PathBuf, calls: Arc<AtomicUsize>) -> Arc<BatchRunner> {
        let mut config = AppConfig::load_from("nonexistent-config-dir").unwrap();
        config.accounts.keys_file = keys_file.display().to_string();
        config.batch.account_delay_secs = 0;

        let chain: Arc<dyn ChainClient> = Arc::new(NullChain);
        let submitter = TxSubmitter::new(
            Arc::clone(&chain),
            config.chain.contract_address().unwrap(),
            config.chain.chain_id,
            config.submit.clone(),
        );
        let resolver =
            ClaimResolver::new(Arc::new(CountingSource { calls }), &config.claim).unwrap();
        Arc::new(BatchRunner::new(chain, submitter, resolver, &config).unwrap())
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_batch_runs_immediately_then_per_interval() {
        let calls = Arc::new(AtomicUsize::new(0));
        let path = empty_keys_file("interval");
        let settings = ScheduleSettings {
            interval_minutes: 730,
        };

        let handle = SignScheduler::new(runner(&path, Arc::clone(&calls)), &settings).start();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(730 * 60)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        // Short of the next period boundary, nothing new fires
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        handle.stop().await;
        std::fs::remove_file(path).unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_prevents_further_batches() {
        let calls = Arc::new(AtomicUsize::new(0));
        let path = empty_keys_file("stop");
        let settings = ScheduleSettings {
            interval_minutes: 730,
        };

        let handle = SignScheduler::new(runner(&path, Arc::clone(&calls)), &settings).start();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        handle.stop().await;

        tokio::time::sleep(Duration::from_secs(3 * 730 * 60)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        std::fs::remove_file(path).unwrap();
    }
}
