//! Opaque ID/refresh tokens.
//!
//! The real Identity Toolkit issues signed JWTs; an emulator only ever
//! talks to the Admin SDK / client SDKs pointed at a local host, which
//! never verify the signature, so a token here is just the `localId`
//! base64-wrapped with a random nonce to keep each sign-in's token
//! distinct.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

const PREFIX: &str = "emulator";

/// Mint an opaque token embedding `local_id`.
pub fn issue(local_id: &str) -> String {
    let nonce = crate::id::generate_doc_id();
    URL_SAFE_NO_PAD.encode(format!("{PREFIX}:{local_id}:{nonce}"))
}

/// Recover the `localId` a token was issued for, if it is well-formed.
pub fn local_id_of(token: &str) -> Option<String> {
    let decoded = URL_SAFE_NO_PAD.decode(token).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let mut parts = decoded.splitn(3, ':');
    if parts.next()? != PREFIX {
        return None;
    }
    parts.next().map(|s| s.to_string())
}
