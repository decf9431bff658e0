use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub algorithm: String,
    pub token_ttl_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub db: i64,
}

impl RedisConfig {
    pub fn url(&self) -> String {
        format!("redis://{}:{}/{}", self.host, self.port, self.db)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    pub ttl_seconds: u64,
    pub capacity: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub redis: RedisConfig,
    pub user_cache: CacheConfig,
    pub otp_ttl_seconds: u64,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        // DATABASE_URL wins; otherwise assemble it from the POSTGRES_* parts.
        let database_url = match std::env::var("DATABASE_URL") {
            Ok(url) => url,
            Err(_) => {
                let user = std::env::var("POSTGRES_USER")?;
                let password = std::env::var("POSTGRES_PASSWORD")?;
                let host = env_or("POSTGRES_HOST", "localhost".to_string());
                let port = env_or("POSTGRES_PORT", 5432u16);
                let db = std::env::var("POSTGRES_DB")?;
                format!("postgres://{user}:{password}@{host}:{port}/{db}")
            }
        };

        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            algorithm: std::env::var("JWT_ALGORITHM").unwrap_or_else(|_| "HS256".into()),
            token_ttl_seconds: env_or("TOKEN_TTL_SECONDS", 90),
        };

        let redis = RedisConfig {
            host: std::env::var("REDIS_HOST").unwrap_or_else(|_| "localhost".into()),
            port: env_or("REDIS_PORT", 6379),
            db: env_or("REDIS_DB", 0),
        };

        let user_cache = CacheConfig {
            ttl_seconds: env_or("USER_CACHE_TTL_SECONDS", 60),
            capacity: env_or("USER_CACHE_CAPACITY", 120),
        };

        Ok(Self {
            database_url,
            jwt,
            redis,
            user_cache,
            otp_ttl_seconds: env_or("OTP_TTL_SECONDS", 90),
        })
    }
}
