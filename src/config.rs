use crate::domain::{bnb_to_wei, ActionKind};
use crate::error::{PunchcardError, Result as CrateResult};
use config::{Config, ConfigError, Environment, File};
use ethers::types::{Address, U256};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_RPC_URL: &str = "https://bsc-dataseed1.binance.org/";
pub const DEFAULT_CONTRACT: &str = "0x5B4082965B95a122ca74560868BD085f31B71E0c";
pub const DEFAULT_EXPLORER_URL: &str = "https://api.etherscan.io/v2/api";
pub const DEFAULT_KEYS_FILE: &str = "bnb_accounts.txt";

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub chain: ChainSettings,
    pub accounts: AccountsSettings,
    pub submit: SubmitSettings,
    pub claim: ClaimSettings,
    pub explorer: ExplorerSettings,
    pub batch: BatchSettings,
    pub schedule: ScheduleSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainSettings {
    /// JSON-RPC endpoint of the BSC node
    pub rpc_url: String,
    /// EIP-155 chain id (56 = BNB Smart Chain mainnet)
    pub chain_id: u64,
    /// Check-in contract address
    pub contract: String,
}

impl ChainSettings {
    pub fn contract_address(&self) -> CrateResult<Address> {
        self.contract
            .parse::<Address>()
            .map_err(|e| PunchcardError::AddressParsing(format!("contract: {}", e)))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountsSettings {
    /// Path to the secrets file, one private key per line
    pub keys_file: String,
    /// Accounts below this balance are skipped, in BNB
    pub min_balance_bnb: Decimal,
}

impl AccountsSettings {
    pub fn min_balance_wei(&self) -> CrateResult<U256> {
        bnb_to_wei(self.min_balance_bnb)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitSettings {
    /// Multiplier applied to the node's suggested gas price
    pub gas_price_multiplier: f64,
    /// Gas limit for check-in transactions. Fixed ceiling measured from
    /// real usage, not an estimate; usage drift past it means out-of-gas
    /// failures until the value is raised by hand.
    pub sign_gas_limit: u64,
    /// Gas limit for register transactions, same caveat as above
    pub register_gas_limit: u64,
    /// How long to wait for a receipt before declaring the submission dead
    pub receipt_timeout_secs: u64,
    /// Pause between receipt polls
    pub receipt_poll_secs: u64,
}

impl SubmitSettings {
    pub fn gas_limit_for(&self, action: ActionKind) -> u64 {
        match action {
            ActionKind::Sign => self.sign_gas_limit,
            ActionKind::Register => self.register_gas_limit,
        }
    }

    pub fn receipt_timeout(&self) -> Duration {
        Duration::from_secs(self.receipt_timeout_secs)
    }

    pub fn receipt_poll(&self) -> Duration {
        Duration::from_secs(self.receipt_poll_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClaimSettings {
    /// Fallback claim value when the explorer lookup yields nothing, in BNB
    pub default_amount_bnb: Decimal,
}

impl ClaimSettings {
    pub fn default_amount_wei(&self) -> CrateResult<U256> {
        bnb_to_wei(self.default_amount_bnb)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExplorerSettings {
    /// Etherscan v2 multi-chain API endpoint
    pub api_url: String,
    /// API key; without one the resolver falls back to the default amount
    #[serde(default)]
    pub api_key: Option<String>,
    /// Transactions fetched per lookup, newest first
    pub page_size: u32,
    /// HTTP request timeout
    pub timeout_secs: u64,
}

impl ExplorerSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchSettings {
    /// Pause between accounts, rate limiting against the RPC node
    pub account_delay_secs: u64,
}

impl BatchSettings {
    pub fn account_delay(&self) -> Duration {
        Duration::from_secs(self.account_delay_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleSettings {
    /// Minutes between recurring sign batches
    pub interval_minutes: u64,
}

impl ScheduleSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes * 60)
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Directory for the rolling log file
    #[serde(default = "default_log_dir")]
    pub dir: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Start with default values
            .set_default("chain.rpc_url", DEFAULT_RPC_URL)?
            .set_default("chain.chain_id", 56)?
            .set_default("chain.contract", DEFAULT_CONTRACT)?
            .set_default("accounts.keys_file", DEFAULT_KEYS_FILE)?
            .set_default("accounts.min_balance_bnb", "0.001")?
            .set_default("submit.gas_price_multiplier", 1.0)?
            .set_default("submit.sign_gas_limit", 872_541)?
            .set_default("submit.register_gas_limit", 571_060)?
            .set_default("submit.receipt_timeout_secs", 300)?
            .set_default("submit.receipt_poll_secs", 2)?
            .set_default("claim.default_amount_bnb", "0.0004")?
            .set_default("explorer.api_url", DEFAULT_EXPLORER_URL)?
            .set_default("explorer.page_size", 20)?
            .set_default("explorer.timeout_secs", 15)?
            .set_default("batch.account_delay_secs", 3)?
            .set_default("schedule.interval_minutes", 730)?
            .set_default("logging.level", "info")?
            .set_default("logging.dir", "logs")?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("PUNCHCARD_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (PUNCHCARD_CHAIN__RPC_URL, etc.)
            .add_source(
                Environment::with_prefix("PUNCHCARD")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if !self.chain.rpc_url.starts_with("http") {
            errors.push(format!("chain.rpc_url is not an HTTP endpoint: {}", self.chain.rpc_url));
        }

        if self.chain.chain_id == 0 {
            errors.push("chain.chain_id must be non-zero".to_string());
        }

        if self.chain.contract_address().is_err() {
            errors.push(format!("chain.contract is not a valid address: {}", self.chain.contract));
        }

        if self.submit.gas_price_multiplier <= 0.0 || !self.submit.gas_price_multiplier.is_finite() {
            errors.push("submit.gas_price_multiplier must be a positive number".to_string());
        }

        // 21000 is the intrinsic cost of any transaction
        if self.submit.sign_gas_limit < 21_000 || self.submit.register_gas_limit < 21_000 {
            errors.push("gas limits must cover at least the intrinsic transaction cost".to_string());
        }

        if self.submit.receipt_poll_secs == 0
            || self.submit.receipt_poll_secs >= self.submit.receipt_timeout_secs
        {
            errors.push("submit.receipt_poll_secs must be positive and below the receipt timeout".to_string());
        }

        if self.accounts.min_balance_bnb < Decimal::ZERO {
            errors.push("accounts.min_balance_bnb must not be negative".to_string());
        }

        if self.claim.default_amount_bnb <= Decimal::ZERO {
            errors.push("claim.default_amount_bnb must be positive".to_string());
        }

        if self.explorer.page_size == 0 {
            errors.push("explorer.page_size must be positive".to_string());
        }

        if self.schedule.interval_minutes == 0 {
            errors.push("schedule.interval_minutes must be positive".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
