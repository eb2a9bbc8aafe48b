//! Ledger service authentication.
//!
//! Every request to the ledger carries the configured credential pair as
//! an HTTP basic `Authorization` header. The encoded value is kept in a
//! [`Zeroizing`] buffer so it is wiped when the client is dropped.

use base64::prelude::*;
use zeroize::Zeroizing;

/// Builds the `Authorization` header value for the given credential pair.
///
/// Format: `Basic Base64(username:password)`
pub fn basic_authorization(username: &str, password: &str) -> Zeroizing<String> {
    let credentials = Zeroizing::new(format!("{username}:{password}"));
    Zeroizing::new(format!("Basic {}", BASE64_STANDARD.encode(credentials.as_bytes())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_credential_pair() {
        let header = basic_authorization("root", "secret123");
        assert_eq!(header.as_str(), "Basic cm9vdDpzZWNyZXQxMjM=");
    }

    #[test]
    fn header_decodes_back_to_pair() {
        let header = basic_authorization("user", "p:ss");
        let encoded = header.strip_prefix("Basic ").unwrap();
        let decoded = BASE64_STANDARD.decode(encoded).unwrap();
        assert_eq!(decoded, b"user:p:ss");
    }
}
