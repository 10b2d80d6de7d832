use alloy::primitives::Address;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use super::AuditError;

/// A validated 20-byte contract address.
///
/// Equality is on the raw bytes, so two spellings that differ only in letter
/// case compare equal. `Display` renders the EIP-55 checksummed form, which is
/// also the cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContractAddress(Address);

impl ContractAddress {
    /// Parse user input.
    ///
    /// Accepts an optional `0x` prefix followed by 40 hex digits. All-lowercase
    /// and all-uppercase input is taken as is; mixed case must carry a valid
    /// checksum.
    pub fn parse(input: &str) -> Result<Self, AuditError> {
        let trimmed = input.trim();
        let hex_part = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        if hex_part.len() != 40 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(AuditError::InvalidAddress(input.to_string()));
        }

        let has_lower = hex_part.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = hex_part.chars().any(|c| c.is_ascii_uppercase());

        let address = if has_lower && has_upper {
            Address::parse_checksummed(format!("0x{}", hex_part), None)
                .map_err(|_| AuditError::InvalidAddress(input.to_string()))?
        } else {
            Address::from_str(hex_part)
                .map_err(|_| AuditError::InvalidAddress(input.to_string()))?
        };

        Ok(Self(address))
    }

    pub fn address(&self) -> Address {
        self.0
    }

    /// Checksummed textual form
    pub fn checksummed(&self) -> String {
        self.0.to_checksum(None)
    }
}

impl From<Address> for ContractAddress {
    fn from(address: Address) -> Self {
        Self(address)
    }
}

impl fmt::Display for ContractAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.checksummed())
    }
}

impl FromStr for ContractAddress {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for ContractAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.checksummed())
    }
}

impl<'de> Deserialize<'de> for ContractAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
