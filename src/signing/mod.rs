pub mod keystore;
pub mod wallet;

pub use keystore::load_wallets;
pub use wallet::Wallet;
