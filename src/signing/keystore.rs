//! Line-oriented secrets file loader. One private key per line; blank
//! lines and `#` comments are ignored.

use crate::error::Result;
use crate::signing::Wallet;
use std::path::Path;
use tracing::{debug, warn};
use zeroize::Zeroize;

/// Load wallets from the secrets file, in file order.
///
/// Malformed key lines are logged and skipped so one bad entry does not
/// take out the rest of the file. An unreadable file is an error the
/// caller turns into an empty batch.
pub fn load_wallets<P: AsRef<Path>>(path: P, chain_id: u64) -> Result<Vec<Wallet>> {
    let mut raw = std::fs::read_to_string(path.as_ref())?;

    let mut wallets = Vec::new();
    for (idx, line) in raw.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        match Wallet::from_private_key(trimmed, chain_id) {
            Ok(wallet) => wallets.push(wallet),
            Err(e) => warn!("Skipping malformed key on line {}: {}", idx + 1, e),
        }
    }

    // The buffer held every private key in plaintext
    raw.zeroize();

    debug!(
        "Loaded {} account(s) from {}",
        wallets.len(),
        path.as_ref().display()
    );
    Ok(wallets)
}
