use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    /// Base URL of the user service; the directory client resolves
    /// participant summaries against it.
    pub user_directory_url: String,
    pub max_inbox_entries: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, crate::error::AppError> {
        dotenv().ok();
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| crate::error::AppError::Config("DATABASE_URL missing".into()))?;
        let redis_url = env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into());
        let user_directory_url =
            env::var("USER_DIRECTORY_URL").unwrap_or_else(|_| "http://127.0.0.1:3001".into());
        let max_inbox_entries = env::var("MAX_INBOX_ENTRIES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(100);

        Ok(Self {
            database_url,
            redis_url,
            user_directory_url,
            max_inbox_entries,
        })
    }

    #[cfg(test)]
    pub fn test_defaults() -> Self {
        Self {
            database_url: "postgres://localhost/test".into(),
            redis_url: "redis://127.0.0.1:6379/0".into(),
            user_directory_url: "http://127.0.0.1:3001".into(),
            max_inbox_entries: 100,
        }
    }
}
