//! Core types shared across the batch engine: action kinds, calldata
//! constants, and per-account outcome reporting.

use crate::error::{PunchcardError, Result};
use ethers::types::{Address, Bytes, TxHash, U256};
use ethers::utils::parse_ether;
use rust_decimal::Decimal;
use std::fmt;

/// Calldata for the one-time register call. Offset/length words plus the
/// fixed enrollment payload, as emitted by the contract frontend.
pub const REGISTER_CALLDATA: &str = "0xf2c298be00000000000000000000000000000000000000000000000000000000000000200000000000000000000000000000000000000000000000000000000000000008345747465a565a30000000000000000000000000000000000000000000000000";

/// 4-byte selector of the daily check-in call. Also used to recognize
/// claim transactions in explorer history.
pub const CLAIM_SELECTOR: &str = "0x5b88349d";

/// The two contract actions the bot automates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// One-time account enrollment
    Register,
    /// Daily check-in that pays out the claim amount
    Sign,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Register => "register",
            ActionKind::Sign => "sign",
        }
    }

    /// Fixed calldata attached to transactions of this kind.
    pub fn calldata(&self) -> Result<Bytes> {
        let hex_str = match self {
            ActionKind::Register => REGISTER_CALLDATA,
            ActionKind::Sign => CLAIM_SELECTOR,
        };
        decode_hex_payload(hex_str)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn decode_hex_payload(s: &str) -> Result<Bytes> {
    let stripped = s.trim_start_matches("0x");
    let raw = hex::decode(stripped)
        .map_err(|e| PunchcardError::Conversion(format!("invalid calldata hex: {}", e)))?;
    Ok(Bytes::from(raw))
}

/// Convert a human-denominated BNB amount into wei.
pub fn bnb_to_wei(amount: Decimal) -> Result<U256> {
    parse_ether(amount).map_err(|e| PunchcardError::Conversion(e.to_string()))
}

/// Result of a single transaction submission
#[derive(Debug, Clone)]
pub struct TxOutcome {
    pub action: ActionKind,
    pub address: Address,
    pub success: bool,
    pub tx_hash: Option<TxHash>,
    pub gas_used: Option<U256>,
    pub error: Option<String>,
}

impl TxOutcome {
    pub fn confirmed(action: ActionKind, address: Address, tx_hash: TxHash, gas_used: Option<U256>) -> Self {
        Self {
            action,
            address,
            success: true,
            tx_hash: Some(tx_hash),
            gas_used,
            error: None,
        }
    }

    /// Mined but reverted: the receipt came back with a non-success status.
    pub fn reverted(action: ActionKind, address: Address, tx_hash: TxHash, gas_used: Option<U256>) -> Self {
        Self {
            action,
            address,
            success: false,
            tx_hash: Some(tx_hash),
            gas_used,
            error: Some("receipt status 0".to_string()),
        }
    }

    pub fn failed(action: ActionKind, address: Address, error: impl Into<String>) -> Self {
        Self {
            action,
            address,
            success: false,
            tx_hash: None,
            gas_used: None,
            error: Some(error.into()),
        }
    }
}

/// Per-account result of one batch iteration
#[derive(Debug, Clone)]
pub enum AccountOutcome {
    /// Balance below the configured minimum; no submission attempted
    Skipped { address: Address, balance: U256 },
    /// Submission attempted; see the inner outcome for success/failure
    Submitted(TxOutcome),
}

impl AccountOutcome {
    pub fn address(&self) -> Address {
        match self {
            AccountOutcome::Skipped { address, .. } => *address,
            AccountOutcome::Submitted(outcome) => outcome.address,
        }
    }

    pub fn submitted(&self) -> Option<&TxOutcome> {
        match self {
            AccountOutcome::Submitted(outcome) => Some(outcome),
            AccountOutcome::Skipped { .. } => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, AccountOutcome::Skipped { .. })
    }
}

/// Terminal per-batch tally, logged once after the account loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub action: ActionKind,
    pub total: usize,
    pub confirmed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl BatchSummary {
    pub fn tally(action: ActionKind, outcomes: &[AccountOutcome]) -> Self {
        let mut summary = Self {
            action,
            total: outcomes.len(),
            confirmed: 0,
            failed: 0,
            skipped: 0,
        };
        for outcome in outcomes {
            match outcome.submitted() {
                Some(tx) if tx.success => summary.confirmed += 1,
                Some(_) => summary.failed += 1,
                None => summary.skipped += 1,
            }
        }
        summary
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} completed: {} accounts, {} confirmed, {} failed, {} skipped",
            self.action, self.total, self.confirmed, self.failed, self.skipped
        )
    }
}
