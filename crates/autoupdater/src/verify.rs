//! Signature verification of downloaded artifacts.
//!
//! Artifacts are OpenPGP signed messages (binary or ASCII armored, optionally
//! compressed) with the signature inline. This module is the only producer of
//! [`VerifiedPayload`], so nothing downstream ever sees unverified bytes.

use crate::{
    artifact::SignedArtifact,
    error::{Result, UpdaterError},
    keys::TrustedKey,
};
use pgp::{types::PublicKeyTrait, Deserializable, Message};
use sha2::{Digest, Sha256};
use std::fmt;
use std::io::Cursor;

const ARMOR_HEADER: &[u8] = b"-----BEGIN PGP MESSAGE-----";

/// Artifact content whose signature was validated against a trusted key.
pub struct VerifiedPayload {
    version: i64,
    signer: String,
    bytes: Vec<u8>,
}

impl VerifiedPayload {
    /// Version the payload was published as.
    pub fn version(&self) -> i64 {
        self.version
    }

    /// Hex-encoded id of the key (or subkey) that produced the signature.
    pub fn signer(&self) -> &str {
        &self.signer
    }

    /// The verified executable content.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Lowercase hex SHA-256 digest of the content.
    pub fn sha256_hex(&self) -> String {
        hex::encode(Sha256::digest(&self.bytes))
    }
}

impl fmt::Debug for VerifiedPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifiedPayload")
            .field("version", &self.version)
            .field("signer", &self.signer)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Verify `artifact` against `key` and extract its content.
///
/// The whole signed body is hashed before the signature is checked. Succeeds
/// only when the message is signed, the signature was made by a key or
/// subkey in the trusted ring, and the signature validates over the full
/// body. On any failure the parsed body is dropped.
pub fn verify(artifact: &SignedArtifact, key: &TrustedKey) -> Result<VerifiedPayload> {
    let message = parse_message(artifact.as_bytes())?
        .decompress()
        .map_err(|err| failed(format!("cannot decompress message: {err}")))?;

    if !matches!(message, Message::Signed { .. }) {
        return Err(failed("artifact is not a signed message"));
    }

    let signer = find_signer(&message, key)
        .ok_or_else(|| failed("no trusted key produced a valid signature"))?;

    let bytes = message
        .get_content()
        .map_err(|err| failed(format!("cannot read signed body: {err}")))?
        .ok_or_else(|| failed("signed message carries no body"))?;

    tracing::debug!(
        version = artifact.version(),
        signer = %signer,
        len = bytes.len(),
        "artifact signature verified"
    );

    Ok(VerifiedPayload {
        version: artifact.version(),
        signer,
        bytes,
    })
}

fn parse_message(bytes: &[u8]) -> Result<Message> {
    let start = bytes
        .iter()
        .position(|byte| !byte.is_ascii_whitespace())
        .unwrap_or(bytes.len());

    if bytes[start..].starts_with(ARMOR_HEADER) {
        Message::from_armor_single(Cursor::new(bytes))
            .map(|(message, _headers)| message)
            .map_err(|err| failed(format!("malformed armored message: {err}")))
    } else {
        Message::from_bytes(Cursor::new(bytes))
            .map_err(|err| failed(format!("malformed signed message: {err}")))
    }
}

fn find_signer(message: &Message, key: &TrustedKey) -> Option<String> {
    key.keys().iter().find_map(|public| {
        if message.verify(public).is_ok() {
            return Some(hex::encode(public.key_id()));
        }
        public
            .public_subkeys
            .iter()
            .find(|subkey| message.verify(*subkey).is_ok())
            .map(|subkey| hex::encode(subkey.key_id()))
    })
}

fn failed(reason: impl Into<String>) -> UpdaterError {
    UpdaterError::VerificationFailed(reason.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::Platform;
    use crate::testing::{
        KEYRING, PAYLOAD, ROGUE_KEY, SIGNED, SIGNED_ARMORED, SIGNED_BY_ROGUE, SIGNED_PLAIN,
        TRUSTED_KEY, UNSIGNED,
    };

    fn artifact(bytes: &[u8]) -> SignedArtifact {
        SignedArtifact::new(5, Platform::from_target("linux", "x86_64"), bytes.to_vec())
    }

    fn trusted() -> TrustedKey {
        TrustedKey::from_armored(TRUSTED_KEY).unwrap()
    }

    fn assert_rejected(result: Result<VerifiedPayload>) {
        match result {
            Err(UpdaterError::VerificationFailed(_)) => {}
            Err(other) => panic!("expected verification failure, got {other:?}"),
            Ok(payload) => panic!("unexpectedly verified {payload:?}"),
        }
    }

    #[test]
    fn accepts_compressed_signed_message() {
        let payload = verify(&artifact(SIGNED), &trusted()).expect("fixture verifies");
        assert_eq!(payload.as_bytes(), PAYLOAD);
        assert_eq!(payload.version(), 5);
        assert_eq!(payload.signer(), "4c0d0ca9d5e7cdf6");
        assert_eq!(payload.sha256_hex(), hex::encode(Sha256::digest(PAYLOAD)));
    }

    #[test]
    fn accepts_uncompressed_and_armored_messages() {
        for bytes in [SIGNED_PLAIN, SIGNED_ARMORED] {
            let payload = verify(&artifact(bytes), &trusted()).expect("fixture verifies");
            assert_eq!(payload.as_bytes(), PAYLOAD);
        }
    }

    #[test]
    fn accepts_signer_anywhere_in_keyring() {
        let ring = TrustedKey::from_armored(KEYRING).unwrap();
        let payload = verify(&artifact(SIGNED_BY_ROGUE), &ring).expect("ring holds signer");
        assert_eq!(payload.signer(), "b715e1fad9700d3f");
    }

    #[test]
    fn rejects_corrupted_body() {
        let offset = SIGNED_PLAIN
            .windows(4)
            .position(|window| window == b"exit")
            .expect("literal body is stored uncompressed");
        let mut corrupted = SIGNED_PLAIN.to_vec();
        corrupted[offset] ^= 0x01;

        assert_rejected(verify(&artifact(&corrupted), &trusted()));
    }

    #[test]
    fn rejects_truncated_message() {
        let truncated = &SIGNED[..SIGNED.len() - 10];
        assert_rejected(verify(&artifact(truncated), &trusted()));
    }

    #[test]
    fn rejects_untrusted_signer() {
        assert_rejected(verify(&artifact(SIGNED_BY_ROGUE), &trusted()));

        let rogue = TrustedKey::from_armored(ROGUE_KEY).unwrap();
        assert_rejected(verify(&artifact(SIGNED), &rogue));
    }

    #[test]
    fn rejects_unsigned_and_garbage_input() {
        assert_rejected(verify(&artifact(UNSIGNED), &trusted()));
        assert_rejected(verify(&artifact(PAYLOAD), &trusted()));
        assert_rejected(verify(&artifact(b""), &trusted()));
    }
}
