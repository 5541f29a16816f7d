//! Base64 helpers for obfuscating on-disk secrets (tokens, credentials).

use crate::error::Result;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

/// Base64-encode `data`.
pub fn base64_encode(data: impl AsRef<[u8]>) -> String {
    STANDARD.encode(data)
}

/// Base64-decode `data`, returning the raw bytes.
pub fn base64_decode(data: impl AsRef<str>) -> Result<Vec<u8>> {
    Ok(STANDARD.decode(data.as_ref())?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let encoded = base64_encode("hello world");
        assert_eq!(base64_decode(&encoded).unwrap(), b"hello world");
    }
}
