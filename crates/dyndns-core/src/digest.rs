//! Request digest verification
//!
//! A client proves knowledge of the shared secret by sending
//! `hex(SHA-256(source_ip || hostname || secret))`. The three parts are
//! concatenated as text with no separator.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;

/// Length of a hex-encoded SHA-256 digest
pub const DIGEST_HEX_LEN: usize = 64;

/// Why a supplied digest was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DigestError {
    /// Not exactly 64 hexadecimal characters
    #[error("malformed hash")]
    Malformed,

    /// Well-formed but does not match the expected digest
    #[error("hash mismatch")]
    Mismatch,
}

/// Compute the lowercase hex digest a client is expected to send
pub fn compute_digest(source_ip: &str, hostname: &str, shared_secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_ip.as_bytes());
    hasher.update(hostname.as_bytes());
    hasher.update(shared_secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Check the shape of a supplied digest (`^[0-9a-fA-F]{64}$`)
pub fn is_well_formed(digest: &str) -> bool {
    digest.len() == DIGEST_HEX_LEN && digest.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Verify a client-supplied digest
///
/// The format check runs before any hashing. The comparison itself is
/// constant-time; upper-case hex is accepted.
pub fn verify(
    source_ip: &str,
    hostname: &str,
    shared_secret: &str,
    supplied: &str,
) -> Result<(), DigestError> {
    if !is_well_formed(supplied) {
        return Err(DigestError::Malformed);
    }

    let expected = compute_digest(source_ip, hostname, shared_secret);
    let supplied = supplied.to_ascii_lowercase();

    if bool::from(expected.as_bytes().ct_eq(supplied.as_bytes())) {
        Ok(())
    } else {
        Err(DigestError::Mismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IP: &str = "203.0.113.5";
    const HOST: &str = "home.example.com.";
    const SECRET: &str = "correct horse battery staple";

    #[test]
    fn digest_is_sha256_of_concatenation() {
        // sha256("abc")
        assert_eq!(
            compute_digest("a", "b", "c"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn correct_digest_verifies() {
        let digest = compute_digest(IP, HOST, SECRET);
        assert_eq!(digest.len(), DIGEST_HEX_LEN);
        assert_eq!(verify(IP, HOST, SECRET, &digest), Ok(()));
    }

    #[test]
    fn uppercase_digest_verifies() {
        let digest = compute_digest(IP, HOST, SECRET).to_ascii_uppercase();
        assert_eq!(verify(IP, HOST, SECRET, &digest), Ok(()));
    }

    #[test]
    fn every_single_character_mutation_fails() {
        let digest = compute_digest(IP, HOST, SECRET);

        for i in 0..digest.len() {
            let mut bytes = digest.clone().into_bytes();
            bytes[i] = if bytes[i] == b'0' { b'1' } else { b'0' };
            let mutated = String::from_utf8(bytes).unwrap();

            assert_eq!(
                verify(IP, HOST, SECRET, &mutated),
                Err(DigestError::Mismatch),
                "mutation at position {} verified",
                i
            );
        }
    }

    #[test]
    fn digest_binds_every_input() {
        let digest = compute_digest(IP, HOST, SECRET);
        assert_eq!(
            verify("198.51.100.1", HOST, SECRET, &digest),
            Err(DigestError::Mismatch)
        );
        assert_eq!(
            verify(IP, "other.example.com.", SECRET, &digest),
            Err(DigestError::Mismatch)
        );
        assert_eq!(
            verify(IP, HOST, "wrong secret", &digest),
            Err(DigestError::Mismatch)
        );
    }

    #[test]
    fn malformed_digests_are_rejected_before_hashing() {
        let cases = [
            String::new(),
            "z".repeat(64),
            "a".repeat(63),
            "a".repeat(65),
            format!("{} ", "a".repeat(63)),
            format!("0x{}", "a".repeat(62)),
            "é".repeat(32),
        ];

        for case in &cases {
            assert_eq!(
                verify(IP, HOST, SECRET, case),
                Err(DigestError::Malformed),
                "accepted {:?}",
                case
            );
        }
    }

    #[test]
    fn error_messages() {
        assert_eq!(DigestError::Malformed.to_string(), "malformed hash");
        assert_eq!(DigestError::Mismatch.to_string(), "hash mismatch");
    }
}
