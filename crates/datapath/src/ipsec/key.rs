//! IPSec key records and the key file line format
//!
//! # Format
//!
//! Each line of a key file has the format:
//!
//! ```text
//! <auth-algo> <auth-key-hex> <enc-algo> <enc-key-hex> [identifier]
//! ```
//!
//! A line without an identifier provides the wildcard key, used for every
//! address that has no key of its own.
//!
//! # Example
//!
//! ```rust
//! use podsec_datapath::ipsec::key::{KeyIdentity, KeyRecord};
//!
//! let line = "hmac(sha256) 0123456789abcdef0123456789abcdef cbc(aes) 0123456789abcdef0123456789abcdef";
//! let (identity, record) = KeyRecord::parse_line(line).unwrap();
//! assert_eq!(identity, KeyIdentity::Wildcard);
//! assert_eq!(record.crypt.name, "cbc(aes)");
//! assert_eq!(record.crypt.key.len(), 16);
//! ```

use podsec_platform::XfrmAlgo;
use std::fmt;

use super::{Error, Result};

/// SPI assigned to records loaded from a key file
pub const DEFAULT_KEY_SPI: u32 = 1;

/// Request id assigned to records loaded from a key file
pub const DEFAULT_REQID: u32 = 1;

/// Which addresses a key applies to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyIdentity {
    /// Key for one specific address (or other identifier)
    Address(String),
    /// Fallback key for addresses without a specific entry
    Wildcard,
}

impl KeyIdentity {
    /// Identity for an address, taken verbatim
    pub fn address(addr: impl ToString) -> Self {
        KeyIdentity::Address(addr.to_string())
    }
}

impl fmt::Display for KeyIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyIdentity::Address(addr) => write!(f, "{}", addr),
            KeyIdentity::Wildcard => write!(f, "*"),
        }
    }
}

/// Key material and parameters for one tunnel peer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRecord {
    /// SPI the key was provisioned with
    pub spi: u32,
    /// Request id used in states and policy templates
    pub reqid: u32,
    /// Integrity algorithm and key
    pub auth: XfrmAlgo,
    /// Encryption algorithm and key
    pub crypt: XfrmAlgo,
}

impl KeyRecord {
    /// Create a record with the default SPI and request id
    pub fn new(auth: XfrmAlgo, crypt: XfrmAlgo) -> Self {
        Self {
            spi: DEFAULT_KEY_SPI,
            reqid: DEFAULT_REQID,
            auth,
            crypt,
        }
    }

    /// Parse one line of a key file
    ///
    /// Returns the identity the record applies to together with the record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the field count is wrong, an algorithm
    /// name is malformed, or a key is not valid hex.
    pub fn parse_line(line: &str) -> Result<(KeyIdentity, KeyRecord)> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 4 {
            return Err(Error::parse(format!(
                "expected at least 4 fields, found {}",
                parts.len()
            )));
        }
        if parts.len() > 5 {
            return Err(Error::parse(format!(
                "expected at most 5 fields, found {}",
                parts.len()
            )));
        }

        let auth = parse_algo(parts[0], parts[1], "authentication")?;
        let crypt = parse_algo(parts[2], parts[3], "encryption")?;

        let identity = match parts.get(4) {
            Some(id) => KeyIdentity::Address((*id).to_string()),
            None => KeyIdentity::Wildcard,
        };

        Ok((identity, KeyRecord::new(auth, crypt)))
    }

    /// Render the record back into key file format
    pub fn to_line(&self, identity: &KeyIdentity) -> String {
        let mut line = format!(
            "{} {} {} {}",
            self.auth.name,
            hex::encode(self.auth.key.as_slice()),
            self.crypt.name,
            hex::encode(self.crypt.key.as_slice())
        );
        if let KeyIdentity::Address(addr) = identity {
            line.push(' ');
            line.push_str(addr);
        }
        line
    }
}

fn parse_algo(name: &str, key_hex: &str, what: &str) -> Result<XfrmAlgo> {
    if name.chars().any(char::is_control) {
        return Err(Error::parse(format!(
            "{} algorithm name contains control characters",
            what
        )));
    }

    let key = hex::decode(key_hex)
        .map_err(|e| Error::parse(format!("invalid {} key: {}", what, e)))?;

    Ok(XfrmAlgo::new(name, key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipsec::ErrorKind;

    const WILDCARD_LINE: &str = "hmac(sha256) 0123456789abcdef0123456789abcdef cbc(aes) 0123456789abcdef0123456789abcdef";

    #[test]
    fn test_parse_wildcard_line() {
        let (identity, record) = KeyRecord::parse_line(WILDCARD_LINE).unwrap();

        assert_eq!(identity, KeyIdentity::Wildcard);
        assert_eq!(record.spi, DEFAULT_KEY_SPI);
        assert_eq!(record.reqid, DEFAULT_REQID);
        assert_eq!(record.auth.name, "hmac(sha256)");
        assert_eq!(
            record.auth.key.as_slice(),
            &[0x01, 0x23, 0x45, 0x67, 0x89, 0xab, 0xcd, 0xef, 0x01, 0x23, 0x45, 0x67, 0x89, 0xab, 0xcd, 0xef]
        );
        assert_eq!(record.crypt.name, "cbc(aes)");
        assert_eq!(record.crypt.key_bits(), 128);
    }

    #[test]
    fn test_parse_with_identifier() {
        let line = format!("{} 10.0.0.7", WILDCARD_LINE);
        let (identity, _) = KeyRecord::parse_line(&line).unwrap();
        assert_eq!(identity, KeyIdentity::Address("10.0.0.7".to_string()));

        // Identifiers are opaque
        let line = format!("{} foobar", WILDCARD_LINE);
        let (identity, _) = KeyRecord::parse_line(&line).unwrap();
        assert_eq!(identity, KeyIdentity::address("foobar"));
    }

    #[test]
    fn test_parse_extra_whitespace() {
        let line = "  hmac(sha256)\t00ff   cbc(aes) FF00  ";
        let (identity, record) = KeyRecord::parse_line(line).unwrap();
        assert_eq!(identity, KeyIdentity::Wildcard);
        assert_eq!(record.auth.key.as_slice(), &[0x00, 0xff]);
        assert_eq!(record.crypt.key.as_slice(), &[0xff, 0x00]);
    }

    #[test]
    fn test_parse_invalid_hex() {
        let line = "test abcdefghijklmnopqrstuvwzyzABCDEF test abcdefghijklmnopqrstuvwzyzABCDEF";
        let err = KeyRecord::parse_line(line).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
        assert!(err.to_string().contains("authentication"));
    }

    #[test]
    fn test_parse_odd_length_hex() {
        let line = "hmac(sha256) 012 cbc(aes) 0123";
        assert!(KeyRecord::parse_line(line).is_err());
    }

    #[test]
    fn test_parse_bad_encryption_key_only() {
        let line = "hmac(sha256) 0123 cbc(aes) xyz0";
        let err = KeyRecord::parse_line(line).unwrap_err();
        assert!(err.to_string().contains("encryption"));
    }

    #[test]
    fn test_parse_single_byte_keys() {
        let (_, record) = KeyRecord::parse_line("hmac(sha256) 00 cbc(aes) ff").unwrap();
        assert_eq!(record.auth.key.as_slice(), &[0x00]);
        assert_eq!(record.crypt.key.as_slice(), &[0xff]);
        assert_eq!(record.auth.key_bits(), 8);
    }

    #[test]
    fn test_parse_field_count() {
        assert!(KeyRecord::parse_line("").is_err());
        assert!(KeyRecord::parse_line("hmac(sha256) 0123 cbc(aes)").is_err());

        let line = format!("{} 10.0.0.1 trailing", WILDCARD_LINE);
        assert!(KeyRecord::parse_line(&line).is_err());
    }

    #[test]
    fn test_to_line() {
        let (identity, record) = KeyRecord::parse_line(WILDCARD_LINE).unwrap();
        assert_eq!(record.to_line(&identity), WILDCARD_LINE);

        let line = record.to_line(&KeyIdentity::address("10.0.0.1"));
        assert!(line.ends_with(" 10.0.0.1"));
    }

    #[test]
    fn test_identity_display() {
        assert_eq!(KeyIdentity::Wildcard.to_string(), "*");
        assert_eq!(KeyIdentity::address("1.2.3.4").to_string(), "1.2.3.4");
    }
}
