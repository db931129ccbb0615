use thiserror::Error;

/// Main error type for the automation bot
#[derive(Error, Debug)]
pub enum PunchcardError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    Validation(String),

    // Network errors
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("RPC provider error: {0}")]
    Provider(#[from] ethers::providers::ProviderError),

    #[error("Explorer API error: {0}")]
    Explorer(String),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Transaction errors
    #[error("Receipt timeout after {elapsed_secs}s for {tx_hash}")]
    ReceiptTimeout { tx_hash: String, elapsed_secs: u64 },

    // Crypto/signing errors
    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Signature error: {0}")]
    Signature(String),

    #[error("Address parsing error: {0}")]
    AddressParsing(String),

    #[error("Unit conversion error: {0}")]
    Conversion(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for PunchcardError
pub type Result<T> = std::result::Result<T, PunchcardError>;
