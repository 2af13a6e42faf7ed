//! User directory collaborator.
//!
//! The user service owns the canonical users table; this crate never keeps a
//! shadow copy. Participant validation and inbox summaries go through this
//! trait.

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::UserSummary;

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// `None` when the user does not exist; transport failures are errors.
    async fn summarize(&self, user_id: Uuid) -> AppResult<Option<UserSummary>>;

    async fn exists(&self, user_id: Uuid) -> AppResult<bool> {
        Ok(self.summarize(user_id).await?.is_some())
    }
}

/// HTTP client against the user service.
#[derive(Clone)]
pub struct HttpUserDirectory {
    base_url: String,
    client: reqwest::Client,
}

impl HttpUserDirectory {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl UserDirectory for HttpUserDirectory {
    async fn summarize(&self, user_id: Uuid) -> AppResult<Option<UserSummary>> {
        let url = format!("{}/internal/users/{}", self.base_url, user_id);
        let response = self.client.get(&url).send().await.map_err(|e| {
            tracing::error!(user_id = %user_id, error = %e, "user directory request failed");
            AppError::Config(format!("user directory unreachable: {e}"))
        })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let summary = response
            .error_for_status()
            .map_err(|e| AppError::Config(format!("user directory error: {e}")))?
            .json::<UserSummary>()
            .await
            .map_err(|e| AppError::Config(format!("user directory payload: {e}")))?;
        Ok(Some(summary))
    }
}

/// Fixed set of known users; test suites and embedders register users up
/// front instead of standing up a user service.
#[derive(Default)]
pub struct StaticDirectory {
    users: DashMap<Uuid, UserSummary>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, summary: UserSummary) {
        self.users.insert(summary.id, summary);
    }

    pub fn remove(&self, user_id: Uuid) {
        self.users.remove(&user_id);
    }

    /// Register a user with a generated summary and return its id.
    pub fn add_user(&self, display_name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.insert(UserSummary {
            id,
            display_name: display_name.to_string(),
            avatar_url: None,
        });
        id
    }
}

#[async_trait]
impl UserDirectory for StaticDirectory {
    async fn summarize(&self, user_id: Uuid) -> AppResult<Option<UserSummary>> {
        Ok(self.users.get(&user_id).map(|u| u.value().clone()))
    }
}
