//! ACS3-HMAC-SHA256 request signing
//!
//! Implements the V3 signature scheme used by Alibaba Cloud RPC-style
//! OpenAPI endpoints. Signing is pure: the caller prepares the query
//! parameters and the `x-acs-*` headers, this module derives the
//! `Authorization` value from them.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_ALGORITHM: &str = "ACS3-HMAC-SHA256";

/// Hex-encoded SHA-256 of a payload, as carried in `x-acs-content-sha256`.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// RFC 3986 encoding with the unreserved set the signature scheme expects.
fn encode_component(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Query parameters sorted by name and percent-encoded.
///
/// The same string is used for the request URL and the canonical request,
/// so both always agree byte for byte.
pub fn canonical_query_string(query: &[(String, String)]) -> String {
    let mut pairs: Vec<&(String, String)> = query.iter().collect();
    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", encode_component(k), encode_component(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Derives `Authorization` header values for API requests.
#[derive(Debug, Clone)]
pub struct Signer {
    access_key_id: String,
    access_key_secret: String,
}

impl Signer {
    pub fn new(access_key_id: impl Into<String>, access_key_secret: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            access_key_secret: access_key_secret.into(),
        }
    }

    /// Sign one request.
    ///
    /// `headers` must hold the headers to be signed with lowercase names;
    /// every entry is included in `SignedHeaders`. `payload_hash` is the
    /// hex SHA-256 of the request body.
    pub fn authorization(
        &self,
        method: &str,
        path: &str,
        query: &[(String, String)],
        headers: &[(String, String)],
        payload_hash: &str,
    ) -> String {
        let mut sorted: Vec<(String, String)> = headers
            .iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v.trim().to_string()))
            .collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));

        let signed_headers = sorted
            .iter()
            .map(|(k, _)| k.as_str())
            .collect::<Vec<_>>()
            .join(";");
        let canonical_headers = sorted
            .iter()
            .map(|(k, v)| format!("{k}:{v}\n"))
            .collect::<String>();

        let canonical_request = format!(
            "{method}\n{path}\n{}\n{canonical_headers}\n{signed_headers}\n{payload_hash}",
            canonical_query_string(query)
        );

        let string_to_sign = format!(
            "{SIGNATURE_ALGORITHM}\n{}",
            sha256_hex(canonical_request.as_bytes())
        );
        let signature = self.hmac_hex(string_to_sign.as_bytes());

        format!(
            "{SIGNATURE_ALGORITHM} Credential={},SignedHeaders={signed_headers},Signature={signature}",
            self.access_key_id
        )
    }

    fn hmac_hex(&self, data: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(self.access_key_secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(data);
        hex::encode(mac.finalize().into_bytes())
    }
}
