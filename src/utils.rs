use std::time::Duration;

use hmac::{Hmac, Mac};
use sha2::Sha256;

pub fn verify_signature(signature: &str, body: &[u8], secret: &str) -> bool {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(body);
    let expected = format!("sha256={:x}", mac.finalize().into_bytes());
    signature == expected
}

const MAX_ATTEMPTS: u32 = 3;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const BACKOFF_BASE: Duration = Duration::from_millis(250);

/// Sends a request with a bounded timeout, retrying transport errors and
/// non-2xx responses with doubling backoff, up to `MAX_ATTEMPTS`.
pub async fn send_with_retry<F>(
    what: &'static str,
    build: F,
) -> Result<reqwest::Response, reqwest::Error>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut delay = BACKOFF_BASE;
    for attempt in 1..=MAX_ATTEMPTS {
        let result = build()
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .and_then(|res| res.error_for_status());

        match result {
            Ok(res) => return Ok(res),
            Err(e) if attempt < MAX_ATTEMPTS => {
                tracing::warn!(what, attempt, error = %e, "request failed, retrying");
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
            Err(e) => return Err(e),
        }
    }
    unreachable!("loop returns on the last attempt")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_matching_signature() {
        let secret = "s3cret";
        let body = b"{\"action\":\"created\"}";

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        let sig = format!("sha256={:x}", mac.finalize().into_bytes());

        assert!(verify_signature(&sig, body, secret));
    }

    #[test]
    fn rejects_tampered_body() {
        let secret = "s3cret";
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(b"original");
        let sig = format!("sha256={:x}", mac.finalize().into_bytes());

        assert!(!verify_signature(&sig, b"tampered", secret));
        assert!(!verify_signature("sha256=deadbeef", b"original", secret));
    }
}
