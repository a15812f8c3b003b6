//! Remote persistence of the whole event collection as a single JSON document
//! in a GitHub repository, read and written through the contents API.

use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::{header::ACCEPT, Client, StatusCode};
use serde::{Deserialize, Serialize};
use serenity::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{config::StoreConfig, event::EventRecord};

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
const COMMIT_MESSAGE: &str = "Update events";
const MAX_COMMIT_ATTEMPTS: usize = 3;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("GITHUB_TOKEN not set")]
    MissingToken,

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("unexpected response {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("failed to decode file content: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("failed to parse events document: {0}")]
    Json(#[from] serde_json::Error),
}

/// Whole-document storage for event records.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn fetch(&self) -> Result<Vec<EventRecord>, StoreError>;

    async fn commit(&self, events: &[EventRecord]) -> Result<(), StoreError>;
}

/// File metadata returned by `GET /repos/{repo}/contents/{path}`.
#[derive(Deserialize)]
struct ContentFile {
    content: String,
    sha: String,
}

#[derive(Serialize)]
struct UpdateFile<'a> {
    message: &'a str,
    content: &'a str,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<String>,
}

pub struct GithubStore {
    http: Client,
    config: StoreConfig,
}

impl GithubStore {
    pub fn new(config: StoreConfig) -> Result<Self, StoreError> {
        let http = Client::builder().user_agent(USER_AGENT).build()?;

        Ok(Self { http, config })
    }

    fn url(&self) -> String {
        format!(
            "{}/repos/{}/contents/{}",
            self.config.api_url.trim_end_matches('/'),
            self.config.repo,
            self.config.path
        )
    }

    fn token(&self) -> Result<&str, StoreError> {
        self.config
            .token
            .as_deref()
            .ok_or(StoreError::MissingToken)
    }

    /// Fetches the current file, or `None` if it does not exist yet.
    async fn get_file(&self) -> Result<Option<ContentFile>, StoreError> {
        let response = self
            .http
            .get(self.url())
            .query(&[("ref", &self.config.branch)])
            .bearer_auth(self.token()?)
            .header(ACCEPT, "application/vnd.github+json")
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.json().await?)),
            status => Err(StoreError::Status {
                status,
                body: response.text().await.unwrap_or_default(),
            }),
        }
    }
}

#[async_trait]
impl EventStore for GithubStore {
    async fn fetch(&self) -> Result<Vec<EventRecord>, StoreError> {
        let Some(file) = self.get_file().await? else {
            debug!("{} does not exist yet", self.config.path);
            return Ok(Vec::new());
        };

        // The API wraps base64 content at 60 columns
        let content: String = file.content.split_whitespace().collect();
        let document = STANDARD.decode(content)?;

        Ok(serde_json::from_slice(&document)?)
    }

    async fn commit(&self, events: &[EventRecord]) -> Result<(), StoreError> {
        let content = STANDARD.encode(serde_json::to_vec_pretty(events)?);

        let mut attempt = 1;
        loop {
            // The revision token guards against overwriting a concurrent write
            let sha = self.get_file().await?.map(|f| f.sha);
            let response = self
                .http
                .put(self.url())
                .bearer_auth(self.token()?)
                .header(ACCEPT, "application/vnd.github+json")
                .json(&UpdateFile {
                    message: COMMIT_MESSAGE,
                    content: &content,
                    branch: &self.config.branch,
                    sha,
                })
                .send()
                .await?;

            match response.status() {
                status if status.is_success() => {
                    info!("{} updated ({} events)", self.config.path, events.len());
                    return Ok(());
                }
                StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY
                    if attempt < MAX_COMMIT_ATTEMPTS =>
                {
                    warn!(
                        "Stale revision for {} (attempt {}), retrying",
                        self.config.path, attempt
                    );
                    attempt += 1;
                }
                status => {
                    return Err(StoreError::Status {
                        status,
                        body: response.text().await.unwrap_or_default(),
                    })
                }
            }
        }
    }
}
