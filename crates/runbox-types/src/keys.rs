use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Public identifier of a sandbox record.
///
/// Exactly 16 lowercase hex characters (64 bits). Read keys are embedded in
/// shareable URLs and are sufficient for read access. They are produced either
/// at random or as the prefix of a content fingerprint.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReadKey(String);

impl ReadKey {
    /// Length in hex characters.
    pub const LEN: usize = 16;

    /// Parse and validate a read key.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        validate_hex(s, Self::LEN)?;
        Ok(Self(s.to_owned()))
    }

    /// Hex-encode 8 raw bytes into a read key.
    pub fn from_bytes(bytes: [u8; 8]) -> Self {
        Self(hex::encode(bytes))
    }

    /// Take the first [`Self::LEN`] characters of a longer hex digest.
    pub fn from_digest_hex(digest: &str) -> Result<Self, TypeError> {
        let prefix = digest.get(..Self::LEN).ok_or(TypeError::InvalidLength {
            expected: Self::LEN,
            actual: digest.len(),
        })?;
        Self::parse(prefix)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Bearer capability that authorizes mutation of one sandbox record.
///
/// Exactly 32 lowercase hex characters (128 bits). A write key is disclosed
/// once, when the record is created, and is never returned by reads.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WriteKey(String);

impl WriteKey {
    /// Length in hex characters.
    pub const LEN: usize = 32;

    /// Hex-encode 16 raw bytes into a write key.
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(hex::encode(bytes))
    }

    /// Parse and validate a write key.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        validate_hex(s, Self::LEN)?;
        Ok(Self(s.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Exact comparison against a caller-supplied value.
    pub fn matches(&self, candidate: &str) -> bool {
        self.0 == candidate
    }
}

fn validate_hex(s: &str, expected: usize) -> Result<(), TypeError> {
    if s.len() != expected {
        return Err(TypeError::InvalidLength {
            expected,
            actual: s.len(),
        });
    }
    if !s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
        return Err(TypeError::InvalidHex(s.to_owned()));
    }
    Ok(())
}

impl fmt::Display for ReadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ReadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ReadKey({})", self.0)
    }
}

// Write keys are capabilities; keep them out of logs.
impl fmt::Debug for WriteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WriteKey({}…)", &self.0[..4])
    }
}

impl TryFrom<String> for ReadKey {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        validate_hex(&value, Self::LEN)?;
        Ok(Self(value))
    }
}

impl From<ReadKey> for String {
    fn from(key: ReadKey) -> Self {
        key.0
    }
}

impl TryFrom<String> for WriteKey {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        validate_hex(&value, Self::LEN)?;
        Ok(Self(value))
    }
}

impl From<WriteKey> for String {
    fn from(key: WriteKey) -> Self {
        key.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parse_valid_read_key() {
        let key = ReadKey::parse("0123456789abcdef").unwrap();
        assert_eq!(key.as_str(), "0123456789abcdef");
        assert_eq!(key.to_string(), "0123456789abcdef");
    }

    #[test]
    fn read_key_wrong_length() {
        assert_eq!(
            ReadKey::parse("abc"),
            Err(TypeError::InvalidLength { expected: 16, actual: 3 })
        );
    }

    #[test]
    fn read_key_rejects_uppercase_and_path_text() {
        assert!(matches!(ReadKey::parse("0123456789ABCDEF"), Err(TypeError::InvalidHex(_))));
        assert!(ReadKey::parse("../../etc/passwd").is_err());
        assert!(ReadKey::parse("new").is_err());
    }

    #[test]
    fn read_key_from_digest_prefix() {
        let digest = "a".repeat(64);
        let key = ReadKey::from_digest_hex(&digest).unwrap();
        assert_eq!(key.as_str(), "a".repeat(16));
        assert!(ReadKey::from_digest_hex("abcd").is_err());
    }

    #[test]
    fn keys_from_raw_bytes() {
        let read = ReadKey::from_bytes([0xab; 8]);
        assert_eq!(read.as_str(), "abababababababab");
        let write = WriteKey::from_bytes([0x01; 16]);
        assert_eq!(write.as_str().len(), WriteKey::LEN);
        assert!(WriteKey::parse(write.as_str()).is_ok());
    }

    #[test]
    fn write_key_matches_exactly() {
        let key = WriteKey::parse(&"f".repeat(32)).unwrap();
        assert!(key.matches(&"f".repeat(32)));
        assert!(!key.matches(&"f".repeat(31)));
        assert!(!key.matches(&"e".repeat(32)));
    }

    #[test]
    fn write_key_debug_is_redacted() {
        let key = WriteKey::parse("0123456789abcdef0123456789abcdef").unwrap();
        let debug = format!("{key:?}");
        assert!(!debug.contains("0123456789abcdef0123456789abcdef"));
    }

    #[test]
    fn serde_rejects_malformed_keys() {
        let parsed: Result<ReadKey, _> = serde_json::from_str("\"zz\"");
        assert!(parsed.is_err());
        let ok: ReadKey = serde_json::from_str("\"0011223344556677\"").unwrap();
        assert_eq!(ok.as_str(), "0011223344556677");
    }

    proptest! {
        #[test]
        fn any_lower_hex_of_right_length_parses(s in "[0-9a-f]{16}") {
            prop_assert!(ReadKey::parse(&s).is_ok());
        }

        #[test]
        fn other_lengths_never_parse(s in "[0-9a-f]{0,40}") {
            prop_assume!(s.len() != 16);
            prop_assert!(ReadKey::parse(&s).is_err());
        }
    }
}
