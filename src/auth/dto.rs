use serde::{Deserialize, Serialize};

/// Request body for POST /login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Request body for POST /login/email.
#[derive(Debug, Deserialize)]
pub struct EmailLoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for POST /login/otp.
#[derive(Debug, Deserialize)]
pub struct SendOtpRequest {
    pub phone_number: String,
}

/// Request body for POST /login/phone.
#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    pub phone_number: String,
    pub otp: String,
}

/// Response returned by every successful token-issuing login.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub token_type: String,
    pub user_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_response_shape() {
        let response = TokenResponse {
            token: "abc.def.ghi".into(),
            token_type: "bearer".into(),
            user_id: 42,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["token_type"], "bearer");
        assert_eq!(json["user_id"], 42);
    }
}
