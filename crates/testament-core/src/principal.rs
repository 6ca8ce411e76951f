//! Principal identities.
//!
//! A principal is an opaque 32-byte identity (an account, a key hash, or an
//! external co-owner contract). Only equality matters to the estate.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum PrincipalError {
    #[error("Invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("Principal must be 32 bytes, got {0}")]
    Length(usize),
}

/// An identity capable of calling operations and holding roles.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Principal([u8; 32]);

impl Principal {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Short form for log lines: first four bytes in hex.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Principal({})", self.short())
    }
}

impl FromStr for Principal {
    type Err = PrincipalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s.trim())?;
        let array: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| PrincipalError::Length(bytes.len()))?;
        Ok(Self(array))
    }
}

impl Serialize for Principal {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Principal {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Principal::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_roundtrip() {
        let p = Principal::from_bytes([0xAB; 32]);
        let s = p.to_string();
        assert_eq!(s.len(), 64);
        assert_eq!(Principal::from_str(&s).unwrap(), p);
    }

    #[test]
    fn test_rejects_wrong_length() {
        assert_eq!(
            Principal::from_str("abcd"),
            Err(PrincipalError::Length(2))
        );
        assert!(matches!(
            Principal::from_str("zz"),
            Err(PrincipalError::Hex(_))
        ));
    }

    #[test]
    fn test_serde_as_hex_string() {
        let p = Principal::from_bytes([1; 32]);
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, format!("\"{}\"", "01".repeat(32)));
        let restored: Principal = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, p);
    }

    #[test]
    fn test_short_form() {
        let p = Principal::from_bytes([0x0F; 32]);
        assert_eq!(p.short(), "0f0f0f0f");
    }
}
