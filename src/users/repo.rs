use sqlx::PgPool;

use crate::users::repo_types::{NewUser, User, UserChanges, UserField};

const USER_COLUMNS: &str = "id, first_name, last_name, username, password_hash, \
     email, phone_number, created_at, updated_at, active_status";

impl User {
    pub async fn all(db: &PgPool) -> sqlx::Result<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY id");
        sqlx::query_as::<_, User>(&sql).fetch_all(db).await
    }

    pub async fn find_by_id(db: &PgPool, id: i64) -> sqlx::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// Find a user by one of the unique text columns.
    pub async fn find_by_field(
        db: &PgPool,
        field: UserField,
        value: &str,
    ) -> sqlx::Result<Option<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE {} = $1",
            field.column()
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(value)
            .fetch_optional(db)
            .await
    }

    /// Insert a new user. A unique violation on username, email or phone
    /// number comes back as `sqlx::Error::Database` and leaves no row.
    pub async fn create(db: &PgPool, new: &NewUser) -> sqlx::Result<User> {
        let sql = format!(
            r#"
            INSERT INTO users (first_name, last_name, username, password_hash, email, phone_number)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&new.first_name)
            .bind(&new.last_name)
            .bind(&new.username)
            .bind(&new.password_hash)
            .bind(&new.email)
            .bind(&new.phone_number)
            .fetch_one(db)
            .await
    }

    /// Apply a partial update in one statement; absent fields keep their
    /// current value and `updated_at` is always refreshed.
    pub async fn update(
        db: &PgPool,
        id: i64,
        changes: &UserChanges,
    ) -> sqlx::Result<Option<User>> {
        let sql = format!(
            r#"
            UPDATE users SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                username = COALESCE($4, username),
                email = COALESCE($5, email),
                phone_number = COALESCE($6, phone_number),
                active_status = COALESCE($7, active_status),
                updated_at = now()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(&changes.first_name)
            .bind(&changes.last_name)
            .bind(&changes.username)
            .bind(&changes.email)
            .bind(&changes.phone_number)
            .bind(changes.active_status)
            .fetch_optional(db)
            .await
    }

    pub async fn update_password(db: &PgPool, id: i64, password_hash: &str) -> sqlx::Result<bool> {
        let row: Option<(i64,)> = sqlx::query_as(
            r#"
            UPDATE users SET password_hash = $2, updated_at = now()
            WHERE id = $1
            RETURNING id
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .fetch_optional(db)
        .await?;
        Ok(row.is_some())
    }
}
