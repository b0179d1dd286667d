use std::fmt;

use runbox_types::ReadKey;
use sha2::{Digest, Sha256};

/// SHA-256 fingerprint of an exact byte sequence.
///
/// No normalization is applied: two payloads fingerprint identically only if
/// they are byte-identical. Any client holding the payload can recompute the
/// fingerprint (and so the derived read key) with a stock SHA-256.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Fingerprint raw bytes.
    pub fn of(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Read key derived from the first 16 hex characters of the digest.
    pub fn read_key(&self) -> ReadKey {
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&self.0[..8]);
        ReadKey::from_bytes(prefix)
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn known_sha256_vector() {
        let fp = Fingerprint::of(b"abc");
        assert_eq!(
            fp.to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(fp.read_key().as_str(), "ba7816bf8f01cfea");
    }

    #[test]
    fn whitespace_is_significant() {
        let a = Fingerprint::of(br#"[{"name":"a","content":""}]"#);
        let b = Fingerprint::of(br#"[{"name": "a","content":""}]"#);
        assert_ne!(a, b);
        assert_ne!(a.read_key(), b.read_key());
    }

    #[test]
    fn read_key_is_digest_prefix() {
        let fp = Fingerprint::of(b"payload");
        assert_eq!(fp.read_key().as_str(), &fp.to_hex()[..ReadKey::LEN]);
    }

    proptest! {
        #[test]
        fn identical_bytes_identical_keys(data in proptest::collection::vec(any::<u8>(), 0..256)) {
            prop_assert_eq!(Fingerprint::of(&data).read_key(), Fingerprint::of(&data.clone()).read_key());
        }
    }
}
