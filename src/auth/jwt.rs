use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;

use crate::auth::dto::TokenResponse;
use crate::config::JwtConfig;
use crate::state::AppState;

/// JWT payload: subject is the user id, expiry is always `iat` plus the
/// configured fixed offset.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: usize,
    pub exp: usize,
}

/// Signs short-lived bearer tokens with the server secret. Stateless.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    algorithm: Algorithm,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(config: &JwtConfig) -> Self {
        // The algorithm string is validated during startup; HS256 only
        // covers a config constructed without that check.
        let algorithm = config.algorithm.parse().unwrap_or(Algorithm::HS256);
        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            algorithm,
            ttl: Duration::from_secs(config.token_ttl_seconds),
        }
    }

    pub fn issue(&self, user_id: i64) -> anyhow::Result<TokenResponse> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
        };
        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding)?;
        if token.is_empty() {
            anyhow::bail!("token encoding produced no output");
        }
        debug!(user_id, "jwt signed");
        Ok(TokenResponse {
            token,
            token_type: "bearer".into(),
            user_id,
        })
    }

    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let validation = Validation::new(self.algorithm);
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }
}

impl FromRef<AppState> for TokenIssuer {
    fn from_ref(state: &AppState) -> Self {
        Self::new(&state.config.jwt)
    }
}
