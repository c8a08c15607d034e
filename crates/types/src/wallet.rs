//! Wallet identity carried on the execution context.

use serde::{Deserialize, Serialize};

/// EVM chain identifier (1 = mainnet, 10 = optimism, and so on).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(pub u64);

impl std::fmt::Display for ChainId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ChainId {
    fn from(value: u64) -> Self {
        ChainId(value)
    }
}

/// Connection state of the user's wallet as reported by the UI layer.
///
/// The shell never connects or signs anything itself; it only threads this
/// snapshot through command invocations so handlers can inspect it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletState {
    /// Checksummed account address, when a wallet is connected.
    pub address: Option<String>,
    /// Chain the wallet is currently on.
    pub chain_id: Option<ChainId>,
    /// Whether a wallet session is established.
    pub is_connected: bool,
    /// A connect flow is in progress.
    pub is_connecting: bool,
    /// A disconnect flow is in progress.
    pub is_disconnecting: bool,
}

impl WalletState {
    /// Snapshot for a connected wallet.
    pub fn connected(address: impl Into<String>, chain_id: ChainId) -> Self {
        Self {
            address: Some(address.into()),
            chain_id: Some(chain_id),
            is_connected: true,
            is_connecting: false,
            is_disconnecting: false,
        }
    }

    /// Short display form of the address (`0x1234…abcd`), or a placeholder
    /// when no wallet is connected. Counted in chars, so a UI-supplied
    /// string with multibyte characters cannot split a boundary.
    pub fn short_address(&self) -> String {
        match self.address.as_deref() {
            Some(addr) => {
                let count = addr.chars().count();
                if count > 10 {
                    let head: String = addr.chars().take(6).collect();
                    let tail: String = addr.chars().skip(count - 4).collect();
                    format!("{head}…{tail}")
                } else {
                    addr.to_string()
                }
            }
            None => "(not connected)".to_string(),
        }
    }
}
