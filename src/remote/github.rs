//! Collection document stored as a file in a GitHub repository.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Local};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, StatusCode};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use super::api_types::{ApiContentFile, ApiPutContent, ApiPutResponse};
use super::{error_for_response, RemoteStore, WriteReceipt, USER_AGENT};
use crate::config::RemoteConfig;
use crate::error::{Error, Result};
use crate::snapshot::CollectionSnapshot;

const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";

/// GitHub contents API client for one file.
#[derive(Clone)]
pub struct GitHubStore {
  client: Client,
  contents_url: Url,
  branch: Option<String>,
}

impl GitHubStore {
  pub fn new(config: &RemoteConfig) -> Result<Self> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_ACCEPT));

    let client = Client::builder()
      .user_agent(USER_AGENT)
      .default_headers(headers)
      .timeout(Duration::from_secs(30))
      .build()?;

    Ok(Self {
      client,
      contents_url: contents_url(config)?,
      branch: config.branch.clone(),
    })
  }

  fn get(&self) -> RequestBuilder {
    let request = self.client.get(self.contents_url.clone());
    match &self.branch {
      Some(branch) => request.query(&[("ref", branch)]),
      None => request,
    }
  }

  /// Blob sha of the current file, if it exists and is readable with
  /// `credential`. Any failure just means the write goes out without one.
  async fn current_sha(&self, credential: &str) -> Option<String> {
    let response = self
      .get()
      .header(AUTHORIZATION, format!("token {}", credential))
      .send()
      .await
      .ok()?;

    if !response.status().is_success() {
      debug!("No existing collection file ({})", response.status());
      return None;
    }

    response
      .json::<ApiContentFile>()
      .await
      .ok()
      .map(|file| file.sha)
  }
}

#[async_trait]
impl RemoteStore for GitHubStore {
  async fn fetch_snapshot(&self) -> Result<CollectionSnapshot> {
    debug!("Fetching collection from {}", self.contents_url);
    let response = self.get().send().await?;

    if response.status() == StatusCode::NOT_FOUND {
      info!("No collection file in repository yet");
      return Ok(CollectionSnapshot::empty());
    }
    if !response.status().is_success() {
      return Err(error_for_response(response).await);
    }

    let body = response.text().await?;
    let file: ApiContentFile = serde_json::from_str(&body)?;
    let snapshot = decode_content(&file)?;
    info!("Loaded {} cards from repository", snapshot.cards.len());
    Ok(snapshot)
  }

  async fn write_snapshot(
    &self,
    snapshot: &CollectionSnapshot,
    credential: &str,
  ) -> Result<WriteReceipt> {
    if credential.is_empty() {
      return Err(Error::MissingCredential);
    }

    let sha = self.current_sha(credential).await;
    let body = ApiPutContent {
      message: commit_message(snapshot.cards.len(), Local::now()),
      content: encode_content(snapshot)?,
      sha,
      branch: self.branch.as_deref(),
    };

    let response = self
      .client
      .put(self.contents_url.clone())
      .header(AUTHORIZATION, format!("token {}", credential))
      .json(&body)
      .send()
      .await?;

    if !response.status().is_success() {
      return Err(error_for_response(response).await);
    }

    let text = response.text().await?;
    let result: ApiPutResponse = serde_json::from_str(&text)?;
    info!(
      commit = %result.commit.sha,
      "Saved {} cards to repository",
      snapshot.cards.len()
    );

    Ok(WriteReceipt {
      commit_sha: result.commit.sha,
      url: result.content.and_then(|c| c.html_url),
    })
  }
}

/// `{api_base}/repos/{owner}/{repo}/contents/{path}`
fn contents_url(config: &RemoteConfig) -> Result<Url> {
  let mut url = Url::parse(&config.api_base)
    .map_err(|e| Error::Malformed(format!("api_base '{}': {}", config.api_base, e)))?;

  url
    .path_segments_mut()
    .map_err(|_| Error::Malformed(format!("api_base '{}' cannot be a base", config.api_base)))?
    .pop_if_empty()
    .extend(["repos", config.owner.as_str(), config.repo.as_str(), "contents"])
    .extend(config.path.split('/').filter(|segment| !segment.is_empty()));

  Ok(url)
}

/// The API wraps base64 content across lines.
fn decode_content(file: &ApiContentFile) -> Result<CollectionSnapshot> {
  if let Some(encoding) = file.encoding.as_deref() {
    if encoding != "base64" {
      return Err(Error::Malformed(format!("unsupported content encoding '{}'", encoding)));
    }
  }

  let compact: String = file.content.split_whitespace().collect();
  let bytes = STANDARD
    .decode(compact)
    .map_err(|e| Error::Malformed(format!("collection file is not valid base64: {}", e)))?;
  Ok(serde_json::from_slice(&bytes)?)
}

fn encode_content(snapshot: &CollectionSnapshot) -> Result<String> {
  let json = serde_json::to_string_pretty(snapshot)?;
  Ok(STANDARD.encode(json))
}

fn commit_message(cards: usize, now: DateTime<Local>) -> String {
  format!(
    "Update collection - {} cards ({})",
    cards,
    now.format("%Y-%m-%d %H:%M:%S")
  )
}
