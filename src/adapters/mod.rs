pub mod chain;
pub mod explorer;

pub use chain::{ChainClient, RpcChainClient};
pub use explorer::{EtherscanClient, ExplorerTx, TxHistorySource};
