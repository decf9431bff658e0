use std::sync::Arc;
use std::time::Duration;

use axum::extract::FromRef;
use rand::Rng;
use tracing::{debug, warn};

use crate::error::AppError;
use crate::secrets::SecretStore;
use crate::state::AppState;

const OTP_LENGTH: usize = 6;

/// Issues and checks one-time codes against the secret store. A number has
/// at most one live code; a code survives failed verifies and is deleted
/// only through [`OtpManager::invalidate`] once login succeeds.
pub struct OtpManager {
    store: Arc<dyn SecretStore>,
    ttl: Duration,
}

fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    (0..OTP_LENGTH)
        .map(|_| char::from(b'0' + rng.gen_range(0..10)))
        .collect()
}

// Mismatch timing must not depend on how many leading digits agree.
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

impl OtpManager {
    pub fn new(store: Arc<dyn SecretStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Generate and store a fresh code for `phone_number`. Rejected while a
    /// previous code is still live; the set-if-absent write keeps two
    /// concurrent sends from both succeeding.
    pub async fn send(&self, phone_number: &str) -> Result<String, AppError> {
        let code = generate_code();
        let stored = self
            .store
            .set_if_absent(phone_number, &code, self.ttl)
            .await
            .map_err(AppError::Unavailable)?;
        if !stored {
            warn!(%phone_number, "otp requested while previous code still live");
            return Err(AppError::OtpRateLimited(self.ttl.as_secs()));
        }
        debug!(%phone_number, "otp stored");
        Ok(code)
    }

    /// Check `candidate` against the stored code. Missing entry and wrong
    /// code are indistinguishable to the caller; neither deletes the entry.
    pub async fn verify(&self, phone_number: &str, candidate: &str) -> Result<(), AppError> {
        let stored = self
            .store
            .get(phone_number)
            .await
            .map_err(AppError::Unavailable)?;
        match stored {
            Some(code) if constant_time_eq(&code, candidate) => Ok(()),
            _ => {
                warn!(%phone_number, "invalid otp");
                Err(AppError::InvalidOtp)
            }
        }
    }

    /// Consume the entry after a successful login (single use).
    pub async fn invalidate(&self, phone_number: &str) -> Result<(), AppError> {
        self.store
            .delete(phone_number)
            .await
            .map_err(AppError::Unavailable)
    }
}

impl FromRef<AppState> for OtpManager {
    fn from_ref(state: &AppState) -> Self {
        Self::new(
            state.secrets.clone(),
            Duration::from_secs(state.config.otp_ttl_seconds),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::{BrokenSecretStore, MemorySecretStore};

    fn manager(ttl: Duration) -> OtpManager {
        OtpManager::new(Arc::new(MemorySecretStore::new()), ttl)
    }

    #[test]
    fn generated_codes_are_six_digits() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[tokio::test]
    async fn second_send_is_rate_limited_until_expiry() {
        let otp = manager(Duration::from_millis(30));
        otp.send("15551234567").await.expect("first send");
        let err = otp.send("15551234567").await.unwrap_err();
        assert!(matches!(err, AppError::OtpRateLimited(_)));

        tokio::time::sleep(Duration::from_millis(60)).await;
        otp.send("15551234567").await.expect("send after expiry");
    }

    #[tokio::test]
    async fn rate_limit_error_carries_configured_window() {
        let otp = manager(Duration::from_secs(45));
        otp.send("15551234567").await.expect("first send");
        let err = otp.send("15551234567").await.unwrap_err();
        assert!(matches!(err, AppError::OtpRateLimited(45)));
        assert!(err.to_string().contains("45 seconds"));
    }

    #[tokio::test]
    async fn sends_for_different_numbers_are_independent() {
        let otp = manager(Duration::from_secs(90));
        otp.send("15551234567").await.expect("first number");
        otp.send("15557654321").await.expect("second number");
    }

    #[tokio::test]
    async fn wrong_code_fails_and_leaves_entry() {
        let otp = manager(Duration::from_secs(90));
        let code = otp.send("15551234567").await.unwrap();
        let wrong = if code == "000000" { "000001" } else { "000000" };

        let err = otp.verify("15551234567", wrong).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidOtp));
        // Entry is still live: the right code must verify afterwards.
        otp.verify("15551234567", &code).await.expect("correct code");
    }

    #[tokio::test]
    async fn code_is_single_use_after_invalidate() {
        let otp = manager(Duration::from_secs(90));
        let code = otp.send("15551234567").await.unwrap();
        otp.verify("15551234567", &code).await.expect("first verify");
        otp.invalidate("15551234567").await.expect("consume");

        let err = otp.verify("15551234567", &code).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidOtp));
    }

    #[tokio::test]
    async fn verify_without_send_is_invalid() {
        let otp = manager(Duration::from_secs(90));
        let err = otp.verify("15551234567", "123456").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidOtp));
    }

    #[tokio::test]
    async fn store_failure_fails_closed() {
        let otp = OtpManager::new(Arc::new(BrokenSecretStore), Duration::from_secs(90));
        assert!(matches!(
            otp.send("15551234567").await.unwrap_err(),
            AppError::Unavailable(_)
        ));
        assert!(matches!(
            otp.verify("15551234567", "123456").await.unwrap_err(),
            AppError::Unavailable(_)
        ));
    }

    #[test]
    fn constant_time_eq_matches_semantics() {
        assert!(constant_time_eq("123456", "123456"));
        assert!(!constant_time_eq("123456", "123457"));
        assert!(!constant_time_eq("123456", "12345"));
    }
}
