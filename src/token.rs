// src/token.rs
use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const SEP: char = ':';

/// Why a presented link was rejected. Internal only: the HTTP layer
/// collapses every variant into the same "not found" response so a
/// requester cannot tell which check failed.
#[derive(Debug, PartialEq, Eq)]
pub enum VerifyError {
    Malformed,
    BadSignature,
    Expired,
}

/// Signs and verifies gear-checklist links.
///
/// Token layout: url-safe base64 (no padding) of
/// `"<payload>:<issued_at_ms>:<hex_sig>"`, where `hex_sig` is the
/// lowercase hex HMAC-SHA256 of `"<payload>:<issued_at_ms>"`.
///
/// The signature and timestamp fields never contain `:`, so decoding
/// splits from the right and a payload may itself contain the separator
/// (e.g. `"lead:ada@example.com"`). Payloads must be non-empty.
#[derive(Clone)]
pub struct LinkSigner {
    secret: Vec<u8>,
    max_age_ms: i64,
}

impl LinkSigner {
    pub fn new(secret: Vec<u8>, max_age_ms: i64) -> Self {
        Self { secret, max_age_ms }
    }

    /// Token for `payload`, stamped with the current wall clock.
    pub fn encode(&self, payload: &str) -> String {
        self.encode_at(payload, Utc::now().timestamp_millis())
    }

    pub fn encode_at(&self, payload: &str, issued_at_ms: i64) -> String {
        let msg = format!("{payload}{SEP}{issued_at_ms}");
        let sig_hex = self.sign(&msg);
        Base64UrlUnpadded::encode_string(format!("{msg}{SEP}{sig_hex}").as_bytes())
    }

    /// Verify `token` against the current wall clock. Returns the payload
    /// when the signature checks out and the token is not older than the
    /// configured maximum age.
    pub fn verify(&self, token: &str) -> Result<String, VerifyError> {
        self.verify_at(token, Utc::now().timestamp_millis())
    }

    /// `token` is attacker-controlled; every failure path lands on a
    /// `VerifyError` and this function never panics.
    pub fn verify_at(&self, token: &str, now_ms: i64) -> Result<String, VerifyError> {
        let raw = Base64UrlUnpadded::decode_vec(token).map_err(|_| VerifyError::Malformed)?;
        let raw = String::from_utf8(raw).map_err(|_| VerifyError::Malformed)?;

        // sig and timestamp are sep-free, so anchor the split on the right
        let mut fields = raw.rsplitn(3, SEP);
        let sig_hex = fields.next().ok_or(VerifyError::Malformed)?;
        let ts_str = fields.next().ok_or(VerifyError::Malformed)?;
        let payload = fields.next().ok_or(VerifyError::Malformed)?;
        if payload.is_empty() {
            return Err(VerifyError::Malformed);
        }

        let issued_at_ms: i64 = ts_str.parse().map_err(|_| VerifyError::Malformed)?;
        let provided = hex::decode(sig_hex).map_err(|_| VerifyError::Malformed)?;

        // verify_slice is constant-time; a length mismatch fails without
        // a bytewise comparison
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).map_err(|_| VerifyError::BadSignature)?;
        mac.update(payload.as_bytes());
        mac.update(&[SEP as u8]);
        mac.update(ts_str.as_bytes());
        mac.verify_slice(&provided)
            .map_err(|_| VerifyError::BadSignature)?;

        if now_ms.saturating_sub(issued_at_ms) > self.max_age_ms {
            return Err(VerifyError::Expired);
        }
        Ok(payload.to_string())
    }

    fn sign(&self, msg: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(&self.secret).expect("HMAC key must be valid");
        mac.update(msg.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX_AGE_MS: i64 = 30 * 24 * 3600 * 1000;
    const T0: i64 = 1_700_000_000_000;

    fn signer() -> LinkSigner {
        LinkSigner::new(b"test-secret".to_vec(), MAX_AGE_MS)
    }

    #[test]
    fn round_trip_recovers_payload() {
        let s = signer();
        let tok = s.encode_at("lead-0042", T0);
        assert_eq!(s.verify_at(&tok, T0 + 1).unwrap(), "lead-0042");
    }

    #[test]
    fn payload_may_contain_the_separator() {
        let s = signer();
        let tok = s.encode_at("lead:ada@example.com", T0);
        assert_eq!(s.verify_at(&tok, T0 + 1).unwrap(), "lead:ada@example.com");
    }

    #[test]
    fn tampered_token_is_rejected() {
        let s = signer();
        let tok = s.encode_at("lead:ada@example.com", T0);
        let mid = tok.len() / 2;
        let flipped = if tok.as_bytes()[mid] == b'A' { "B" } else { "A" };
        let mut bad = tok.clone();
        bad.replace_range(mid..mid + 1, flipped);
        assert!(s.verify_at(&bad, T0 + 1).is_err());
    }

    #[test]
    fn truncated_token_is_rejected() {
        let s = signer();
        let tok = s.encode_at("lead-0042", T0);
        assert!(s.verify_at(&tok[..tok.len() - 4], T0 + 1).is_err());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let a = signer();
        let b = LinkSigner::new(b"a-different-secret".to_vec(), MAX_AGE_MS);
        let tok = a.encode_at("lead-0042", T0);
        assert_eq!(b.verify_at(&tok, T0 + 1), Err(VerifyError::BadSignature));
    }

    #[test]
    fn expiry_boundaries() {
        let s = signer();
        let tok = s.encode_at("lead-0042", T0);
        assert!(s.verify_at(&tok, T0 + MAX_AGE_MS - 1).is_ok());
        assert!(s.verify_at(&tok, T0 + MAX_AGE_MS).is_ok());
        assert_eq!(
            s.verify_at(&tok, T0 + MAX_AGE_MS + 1),
            Err(VerifyError::Expired)
        );
    }

    #[test]
    fn future_issued_at_tolerates_clock_skew() {
        let s = signer();
        let tok = s.encode_at("lead-0042", T0);
        assert!(s.verify_at(&tok, T0 - 5_000).is_ok());
    }

    #[test]
    fn malformed_inputs_never_panic() {
        let s = signer();
        let b64 = |v: &str| Base64UrlUnpadded::encode_string(v.as_bytes());
        let cases = [
            String::new(),
            "%%%not-base64%%%".to_string(),
            "AAAA====".to_string(),
            b64("no-separators-here"),
            b64("two:fields"),
            b64(&format!(":{}:{}", T0, "ab".repeat(32))), // empty payload
            b64("lead-0042:notanumber:abcd"),
            b64(&format!("lead-0042:{}:zz-not-hex", T0)),
            b64(&format!("lead-0042:{}:abc", T0)), // odd-length hex
        ];
        for c in &cases {
            assert_eq!(s.verify_at(c, T0), Err(VerifyError::Malformed), "case {c:?}");
        }
    }

    #[test]
    fn huge_timestamp_does_not_overflow() {
        let s = signer();
        let tok = s.encode_at("lead-0042", i64::MIN);
        assert_eq!(s.verify_at(&tok, i64::MAX), Err(VerifyError::Expired));
    }
}
