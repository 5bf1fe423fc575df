//! Content addressing primitives.
//!
//! Every stored file is addressed by its SHA-256 digest in two encodings the
//! Expo client expects to agree: a 32-char hex truncation used as the asset
//! `key`, and the full digest as URL-safe base64 without padding used as the
//! asset `hash`. Update identifiers are UUID-shaped hex with no RFC 4122
//! version or variant bits.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest, Sha256};

/// SHA-256 of `bytes` as 64 lowercase hex chars.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// SHA-256 of `bytes` as URL-safe base64 without padding.
#[must_use]
pub fn sha256_b64url(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(bytes))
}

/// Lowercase hex encoding of arbitrary bytes.
#[must_use]
pub fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}

/// Format the first 32 chars of a hex string as 8-4-4-4-12.
///
/// The result is merely UUID-shaped: no version or variant nibbles are set,
/// so it is not an RFC 4122 UUID. `hex` must carry at least 32 hex chars.
#[must_use]
pub fn uuid_from_hex(hex: &str) -> String {
    let hex = &hex[..32];
    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}

/// A fresh UUID-shaped update identifier for publishers that omit one.
#[must_use]
pub fn random_update_id() -> String {
    uuid_from_hex(&uuid::Uuid::new_v4().simple().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    #[test]
    fn hex_and_b64url_encode_the_same_digest() {
        for input in [&b""[..], b"x", b"hello world", &[0u8; 300]] {
            let hex = sha256_hex(input);
            let b64 = sha256_b64url(input);

            assert_eq!(hex.len(), 64);
            let digest = URL_SAFE_NO_PAD.decode(&b64).unwrap();
            assert_eq!(digest.len(), 32);
            assert_eq!(hex_encode(&digest), hex);
            // The truncated key covers the first 16 digest bytes.
            assert_eq!(hex_encode(&digest[..16]), &hex[..32]);
        }
    }

    #[test]
    fn known_digest_of_x() {
        assert_eq!(&sha256_hex(b"x")[..32], "2d711642b726b04401627ca9fbac32f5");
        assert_eq!(
            sha256_b64url(b"x"),
            "LXEWQrcmsEQBYnyp-6wy9chTD7GQPMTbAiWHF5IaSIE"
        );
    }

    #[test]
    fn uuid_from_hex_shapes_without_rfc_bits() {
        let id = uuid_from_hex("2d711642b726b04401627ca9fbac32f5c8530fb1903cc4db02258717921a4881");
        assert_eq!(id, "2d711642-b726-b044-0162-7ca9fbac32f5");
    }

    #[test]
    fn random_update_ids_are_uuid_shaped_and_distinct() {
        let a = random_update_id();
        let b = random_update_id();
        assert_ne!(a, b);
        for id in [&a, &b] {
            assert_eq!(id.len(), 36);
            let dash_positions: Vec<usize> = id
                .char_indices()
                .filter(|(_, c)| *c == '-')
                .map(|(i, _)| i)
                .collect();
            assert_eq!(dash_positions, vec![8, 13, 18, 23]);
        }
    }
}
