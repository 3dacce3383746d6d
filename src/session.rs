//! Wallet session state
//!
//! The connected address is the identifier most queries key on. `Session`
//! keeps it in a watch channel so hooks can follow connects, disconnects and
//! account switches.

use crate::errors::DefiQueriesError;
use query_key::KeyPart;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// Account address as reported by the wallet
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Parse an address. Hex (`0x`) addresses are lowercased so that the same
    /// account always produces the same cache key.
    pub fn parse(raw: &str) -> Result<Self, DefiQueriesError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
            return Err(DefiQueriesError::InvalidAddress(raw.to_string()));
        }

        if let Some(hex) = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
        {
            if hex.is_empty() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(DefiQueriesError::InvalidAddress(raw.to_string()));
            }
            return Ok(Self(format!("0x{}", hex.to_ascii_lowercase())));
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Address {
    type Error = DefiQueriesError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl From<Address> for KeyPart {
    fn from(address: Address) -> Self {
        KeyPart::Text(address.0)
    }
}

impl From<&Address> for KeyPart {
    fn from(address: &Address) -> Self {
        KeyPart::Text(address.0.clone())
    }
}

/// Source of the currently connected address
pub trait WalletProvider: Send + Sync {
    fn current_address(&self) -> Option<Address>;
}

/// In-memory wallet session
#[derive(Debug, Clone)]
pub struct Session {
    address: Arc<watch::Sender<Option<Address>>>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            address: Arc::new(watch::Sender::new(None)),
        }
    }

    pub fn connect(&self, address: Address) {
        tracing::info!("Wallet connected: {}", address);
        self.address.send_replace(Some(address));
    }

    pub fn disconnect(&self) {
        if self.address.send_replace(None).is_some() {
            tracing::info!("Wallet disconnected");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.address.borrow().is_some()
    }

    /// Receiver notified on every connect, disconnect or account switch
    pub fn subscribe(&self) -> watch::Receiver<Option<Address>> {
        self.address.subscribe()
    }
}

impl WalletProvider for Session {
    fn current_address(&self) -> Option<Address> {
        self.address.borrow().clone()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes_hex() {
        let address = Address::parse(" 0xABCdef ").unwrap();
        assert_eq!(address.as_str(), "0xabcdef");
        assert_eq!(Address::parse("0XAB").unwrap().as_str(), "0xab");
    }

    #[test]
    fn test_parse_keeps_bech32() {
        let address = Address::parse("kujira1qwerty").unwrap();
        assert_eq!(address.to_string(), "kujira1qwerty");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for raw in ["", "   ", "0x", "0xZZ", "two words"] {
            assert!(
                matches!(Address::parse(raw), Err(DefiQueriesError::InvalidAddress(_))),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_serde_validates() {
        let address: Address = serde_json::from_str("\"0xABC\"").unwrap();
        assert_eq!(address.as_str(), "0xabc");
        assert!(serde_json::from_str::<Address>("\"0xnothex\"").is_err());
    }

    #[test]
    fn test_session_lifecycle() {
        let session = Session::new();
        let receiver = session.subscribe();
        assert_eq!(session.current_address(), None);

        session.connect(Address::parse("0xabc").unwrap());
        assert!(session.is_connected());
        assert!(receiver.has_changed().unwrap());
        assert_eq!(session.current_address().unwrap().as_str(), "0xabc");

        session.disconnect();
        assert!(!session.is_connected());
    }
}
