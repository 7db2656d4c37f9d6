use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use tokio::sync::RwLock;

use crate::error::ProvisionError;
use crate::github::models::Claims;

/// App JWTs are valid for 10 minutes, per GitHub's App auth rules.
pub const APP_TOKEN_TTL_SECS: u64 = 600;

/// Re-sign once the cached token has less than this long left to live.
const REFRESH_MARGIN_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct SignedAppToken {
    pub token: String,
    pub issued_at: u64,
    pub expires_at: u64,
}

pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_secs()
}

pub fn sign_app_jwt(
    app_id: &str,
    key: &EncodingKey,
    now: u64,
) -> Result<SignedAppToken, ProvisionError> {
    let claims = Claims {
        iat: now,
        exp: now + APP_TOKEN_TTL_SECS,
        iss: app_id.to_string(),
    };
    let token = encode(&Header::new(Algorithm::RS256), &claims, key)?;
    Ok(SignedAppToken {
        token,
        issued_at: claims.iat,
        expires_at: claims.exp,
    })
}

/// Process-wide App JWT, re-signed on demand rather than minted once at
/// startup, so a long-lived process never presents an expired credential.
pub struct AppTokenCache {
    app_id: String,
    key: EncodingKey,
    cached: RwLock<Option<SignedAppToken>>,
}

impl AppTokenCache {
    pub fn new(app_id: String, key: EncodingKey) -> Self {
        Self {
            app_id,
            key,
            cached: RwLock::new(None),
        }
    }

    /// Returns a token valid for at least `REFRESH_MARGIN_SECS` past `now`.
    pub async fn token_for(&self, now: u64) -> Result<String, ProvisionError> {
        if let Some(cached) = self.cached.read().await.as_ref() {
            if now + REFRESH_MARGIN_SECS < cached.expires_at {
                return Ok(cached.token.clone());
            }
        }

        let mut slot = self.cached.write().await;
        // Another request may have refreshed while we waited for the lock.
        if let Some(cached) = slot.as_ref() {
            if now + REFRESH_MARGIN_SECS < cached.expires_at {
                return Ok(cached.token.clone());
            }
        }

        let fresh = sign_app_jwt(&self.app_id, &self.key, now)?;
        let token = fresh.token.clone();
        *slot = Some(fresh);
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use jsonwebtoken::{decode, DecodingKey, Validation};

    use super::*;

    const TEST_KEY: &str = include_str!("../../tests/fixtures/test-key.pem");
    const TEST_PUB_KEY: &str = include_str!("../../tests/fixtures/test-key.pub.pem");

    fn encoding_key() -> EncodingKey {
        EncodingKey::from_rsa_pem(TEST_KEY.as_bytes()).unwrap()
    }

    fn decode_claims(token: &str) -> Claims {
        let key = DecodingKey::from_rsa_pem(TEST_PUB_KEY.as_bytes()).unwrap();
        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();
        decode::<Claims>(token, &key, &validation).unwrap().claims
    }

    #[test]
    fn signed_token_claims_hold_ttl_and_issuer() {
        let now = 1_700_000_000;
        let signed = sign_app_jwt("890630", &encoding_key(), now).unwrap();

        assert_eq!(signed.expires_at - signed.issued_at, 600);

        let claims = decode_claims(&signed.token);
        assert_eq!(claims.iat, now);
        assert_eq!(claims.exp, now + 600);
        assert_eq!(claims.iss, "890630");
    }

    #[tokio::test]
    async fn cache_reuses_fresh_token() {
        let cache = AppTokenCache::new("890630".into(), encoding_key());

        let first = cache.token_for(1_700_000_000).await.unwrap();
        let second = cache.token_for(1_700_000_100).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn cache_resigns_near_expiry() {
        let now = 1_700_000_000;
        let cache = AppTokenCache::new("890630".into(), encoding_key());

        let first = cache.token_for(now).await.unwrap();
        // 560s in: only 40s of validity left, inside the refresh margin.
        let second = cache.token_for(now + 560).await.unwrap();
        assert_ne!(first, second);

        let claims = decode_claims(&second);
        assert_eq!(claims.iat, now + 560);
    }
}
