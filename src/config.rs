use secrecy::SecretString;
use std::env;

const DEFAULT_JWT_SECRET: &str = "dev_secret_key_change_in_production";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Mongo,
    Memory,
}

impl StoreBackend {
    fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "memory" | "in-memory" | "inmemory" => StoreBackend::Memory,
            _ => StoreBackend::Mongo,
        }
    }
}

/// Fixed parameters of the final certification exam.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExamSettings {
    pub question_count: i32,
    pub duration_minutes: i64,
    pub passing_score: i16,
    pub sweep_interval_secs: u64,
}

impl Default for ExamSettings {
    fn default() -> Self {
        Self {
            question_count: 20,
            duration_minutes: 60,
            passing_score: 60,
            sweep_interval_secs: 30,
        }
    }
}

/// Connection pool of the Mongo store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MongoSettings {
    pub max_pool_size: u32,
    pub min_pool_size: u32,
    pub connect_timeout_secs: u64,
}

impl Default for MongoSettings {
    fn default() -> Self {
        Self {
            max_pool_size: 10,
            min_pool_size: 2,
            connect_timeout_secs: 5,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub mongo_conn_string: String,
    pub mongo_db_name: String,
    pub store_backend: StoreBackend,
    pub mongo: MongoSettings,
    pub web_server_host: String,
    pub web_server_port: u16,
    pub cors_allowed_origin: Option<String>,
    pub jwt_secret: SecretString,
    pub exam: ExamSettings,
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = ExamSettings::default();
        let pool = MongoSettings::default();

        Self {
            mongo_conn_string: env::var("MONGO_CONN_STRING")
                .unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
            mongo_db_name: env::var("MONGO_DB_NAME")
                .unwrap_or_else(|_| "coursecert-local".to_string()),
            store_backend: env::var("STORE_BACKEND")
                .map(|v| StoreBackend::parse(&v))
                .unwrap_or(StoreBackend::Mongo),
            mongo: MongoSettings {
                max_pool_size: parse_env("MONGO_MAX_POOL_SIZE").unwrap_or(pool.max_pool_size),
                min_pool_size: parse_env("MONGO_MIN_POOL_SIZE").unwrap_or(pool.min_pool_size),
                connect_timeout_secs: parse_env("MONGO_CONNECT_TIMEOUT_SECS")
                    .unwrap_or(pool.connect_timeout_secs),
            },
            web_server_host: env::var("WEB_SERVER_HOST")
                .unwrap_or_else(|_| "localhost".to_string()),
            web_server_port: parse_env("WEB_SERVER_PORT").unwrap_or(8080),
            cors_allowed_origin: env::var("CORS_ALLOWED_ORIGIN").ok(),
            jwt_secret: SecretString::from(
                env::var("JWT_SECRET").unwrap_or_else(|_| DEFAULT_JWT_SECRET.to_string()),
            ),
            exam: ExamSettings {
                question_count: parse_env("EXAM_QUESTION_COUNT")
                    .unwrap_or(defaults.question_count),
                duration_minutes: parse_env("EXAM_DURATION_MINUTES")
                    .unwrap_or(defaults.duration_minutes),
                passing_score: parse_env("EXAM_PASSING_SCORE").unwrap_or(defaults.passing_score),
                sweep_interval_secs: parse_env("EXAM_SWEEP_INTERVAL_SECS")
                    .unwrap_or(defaults.sweep_interval_secs),
            },
        }
    }

    /// Validate that production-critical configuration is set
    /// Panics if required secrets are using default values
    pub fn validate_for_production(&self) {
        use secrecy::ExposeSecret;

        let jwt_secret = self.jwt_secret.expose_secret();

        if jwt_secret == DEFAULT_JWT_SECRET {
            panic!(
                "FATAL: JWT_SECRET is using default value! Set JWT_SECRET environment variable to a secure random string."
            );
        }

        if jwt_secret.len() < 32 {
            panic!(
                "FATAL: JWT_SECRET is too short ({}). Must be at least 32 characters for security.",
                jwt_secret.len()
            );
        }

        if self.store_backend == StoreBackend::Memory {
            panic!("FATAL: STORE_BACKEND=memory keeps no durable records. Use mongo in production.");
        }

        if !(0..=100).contains(&self.exam.passing_score) {
            panic!(
                "FATAL: EXAM_PASSING_SCORE must be a percentage, got {}",
                self.exam.passing_score
            );
        }
    }

    #[cfg(test)]
    pub fn test_config() -> Self {
        Self {
            mongo_conn_string: "mongodb://localhost:27017".to_string(),
            mongo_db_name: "coursecert-test".to_string(),
            store_backend: StoreBackend::Memory,
            mongo: MongoSettings::default(),
            web_server_host: "127.0.0.1".to_string(),
            web_server_port: 8080,
            cors_allowed_origin: None,
            jwt_secret: SecretString::from("test_jwt_secret_key".to_string()),
            exam: ExamSettings::default(),
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
