use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

/// User record in the database.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 hash, never exposed in JSON
    pub email: Option<String>,
    pub phone_number: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub active_status: bool,
}

/// Unique text columns a user can be looked up by. Lookups go through this
/// enum so no caller-supplied string ever reaches the column position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserField {
    Username,
    Email,
    Phone,
}

impl UserField {
    pub fn column(self) -> &'static str {
        match self {
            UserField::Username => "username",
            UserField::Email => "email",
            UserField::Phone => "phone_number",
        }
    }
}

/// Fields stored on registration; the password is already hashed.
#[derive(Debug)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub password_hash: String,
}

/// Partial profile update. `None` leaves the column untouched; the password
/// is deliberately not representable here.
#[derive(Debug, Default)]
pub struct UserChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub active_status: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn serialized_user_never_contains_password_hash() {
        let user = User {
            id: 7,
            first_name: "Alice".into(),
            last_name: "A".into(),
            username: "alice01".into(),
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$secret".into(),
            email: Some("a@x.com".into()),
            phone_number: Some("15551234567".into()),
            created_at: datetime!(2024-01-01 00:00 UTC),
            updated_at: datetime!(2024-01-01 00:00 UTC),
            active_status: true,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("password"));
        assert!(!json.contains("argon2"));
        assert!(json.contains("alice01"));
    }
}
