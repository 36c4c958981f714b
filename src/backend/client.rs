use color_eyre::{eyre::eyre, Result};
use reqwest::Response;
use tracing::debug;
use url::Url;

use crate::config::Config;
use crate::error::BackendError;
use crate::retry::{with_rate_limit_retry, RetryConfig};

use super::api_types::{ApiErrorBody, ApiEventDocument, ApiListResponse};
use super::types::{CoordinatePatch, EventInput, PublishedEvent};

/// Row cap for the published-events listing.
const MAX_ROWS: u32 = 200;

/// Client for the hosted document backend.
#[derive(Clone)]
pub struct BackendClient {
  http: reqwest::Client,
  /// Base URL without trailing slash, validated at construction
  base: String,
  collection: String,
  api_key: String,
  retry: RetryConfig,
}

impl BackendClient {
  pub fn new(config: &Config) -> Result<Self> {
    let api_key = Config::get_api_token()?;

    // Validate early so later request failures are real network errors
    let base: Url = config
      .backend
      .url
      .parse()
      .map_err(|e| eyre!("Invalid backend URL {}: {}", config.backend.url, e))?;

    Ok(Self {
      http: reqwest::Client::new(),
      base: base.as_str().trim_end_matches('/').to_string(),
      collection: config.backend.collection.clone(),
      api_key,
      retry: RetryConfig::default(),
    })
  }

  fn documents_url(&self) -> String {
    format!("{}/collections/{}/documents", self.base, self.collection)
  }

  /// List the public (non-draft) events, ordered by event date ascending.
  ///
  /// Rate-limited responses are retried with backoff before surfacing as
  /// [`BackendError::RateLimited`].
  pub async fn list_published(&self) -> Result<Vec<PublishedEvent>, BackendError> {
    with_rate_limit_retry(self.retry, || self.list_published_once()).await
  }

  async fn list_published_once(&self) -> Result<Vec<PublishedEvent>, BackendError> {
    let limit = MAX_ROWS.to_string();
    let response = self
      .http
      .get(self.documents_url())
      .header("X-Api-Key", &self.api_key)
      .query(&[
        ("status_ne", "draft"),
        ("order_by", "eventDate"),
        ("order", "asc"),
        ("limit", limit.as_str()),
      ])
      .send()
      .await?;

    let body: ApiListResponse = Self::checked(response).await?.json().await?;
    debug!(rows = body.documents.len(), total = body.total, "listed events");

    Ok(
      body
        .documents
        .into_iter()
        .map(ApiEventDocument::into_event)
        .collect(),
    )
  }

  /// Create a new event document.
  pub async fn create_event(&self, input: &EventInput) -> Result<PublishedEvent, BackendError> {
    let response = self
      .http
      .post(self.documents_url())
      .header("X-Api-Key", &self.api_key)
      .json(input)
      .send()
      .await?;

    let doc: ApiEventDocument = Self::checked(response).await?.json().await?;
    Ok(doc.into_event())
  }

  /// Update an existing event document.
  pub async fn update_event(
    &self,
    id: &str,
    input: &EventInput,
  ) -> Result<PublishedEvent, BackendError> {
    let response = self
      .http
      .patch(format!("{}/{}", self.documents_url(), id))
      .header("X-Api-Key", &self.api_key)
      .json(input)
      .send()
      .await?;

    let doc: ApiEventDocument = Self::checked(response).await?.json().await?;
    Ok(doc.into_event())
  }

  /// Persist coordinate corrections in one round trip.
  pub async fn upsert_coordinates(
    &self,
    patches: &[CoordinatePatch],
  ) -> Result<(), BackendError> {
    let response = self
      .http
      .post(format!("{}/upsert", self.documents_url()))
      .header("X-Api-Key", &self.api_key)
      .json(&serde_json::json!({ "documents": patches }))
      .send()
      .await?;

    Self::checked(response).await?;
    Ok(())
  }

  /// Pass a successful response through; turn anything else into the typed
  /// error taxonomy via the backend's error body.
  async fn checked(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
      return Ok(response);
    }

    let body = response
      .json::<ApiErrorBody>()
      .await
      .unwrap_or_default();
    Err(body.into_error(status.as_u16()))
  }
}
