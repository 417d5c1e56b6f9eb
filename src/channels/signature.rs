//! Slack request signing (`X-Slack-Signature`).

use hmac::{Hmac, Mac};
use sha2::Sha256;

/// Requests older (or newer) than this are rejected as replays.
pub const MAX_CLOCK_SKEW_SECS: i64 = 60 * 5;

/// Verify a Slack request signature.
///
/// Slack signs `v0:{timestamp}:{body}` with the app's signing secret and
/// sends `v0=<hex>`. `now` is the current unix time in seconds.
pub fn verify_slack_signature(
    signing_secret: &str,
    timestamp: &str,
    body: &[u8],
    signature_header: &str,
    now: i64,
) -> bool {
    let Ok(ts) = timestamp.trim().parse::<i64>() else {
        return false;
    };
    if (now - ts).abs() > MAX_CLOCK_SKEW_SECS {
        return false;
    }

    let Some(hex_sig) = signature_header.strip_prefix("v0=") else {
        return false;
    };
    let Ok(expected) = hex::decode(hex_sig) else {
        return false;
    };

    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(signing_secret.as_bytes()) else {
        return false;
    };
    mac.update(b"v0:");
    mac.update(timestamp.trim().as_bytes());
    mac.update(b":");
    mac.update(body);

    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "8f742231b10e8888abcd99yyyzzz85a5";
    const NOW: i64 = 1_531_420_618;

    fn sign(signing_secret: &str, timestamp: &str, body: &[u8]) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(signing_secret.as_bytes()).unwrap();
        mac.update(format!("v0:{timestamp}:").as_bytes());
        mac.update(body);
        format!("v0={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn valid_signature_accepted() {
        let body = br#"{"type":"event_callback"}"#;
        let sig = sign(SECRET, "1531420618", body);
        assert!(verify_slack_signature(SECRET, "1531420618", body, &sig, NOW));
    }

    #[test]
    fn tampered_body_rejected() {
        let sig = sign(SECRET, "1531420618", b"original");
        assert!(!verify_slack_signature(SECRET, "1531420618", b"tampered", &sig, NOW));
    }

    #[test]
    fn wrong_secret_rejected() {
        let sig = sign("other-secret", "1531420618", b"body");
        assert!(!verify_slack_signature(SECRET, "1531420618", b"body", &sig, NOW));
    }

    #[test]
    fn stale_timestamp_rejected() {
        let sig = sign(SECRET, "1531420618", b"body");
        let later = NOW + MAX_CLOCK_SKEW_SECS + 1;
        assert!(!verify_slack_signature(SECRET, "1531420618", b"body", &sig, later));
    }

    #[test]
    fn malformed_headers_rejected() {
        assert!(!verify_slack_signature(SECRET, "not-a-number", b"body", "v0=00", NOW));
        assert!(!verify_slack_signature(SECRET, "1531420618", b"body", "sha256=00", NOW));
        assert!(!verify_slack_signature(SECRET, "1531420618", b"body", "v0=zz", NOW));
    }
}
