pub mod adapters;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod services;
pub mod signing;

pub use adapters::{ChainClient, EtherscanClient, RpcChainClient, TxHistorySource};
pub use config::AppConfig;
pub use domain::{AccountOutcome, ActionKind, BatchSummary, TxOutcome};
pub use error::{PunchcardError, Result};
pub use services::{BatchRunner, ClaimResolver, SignScheduler, TxSubmitter};
pub use signing::Wallet;
