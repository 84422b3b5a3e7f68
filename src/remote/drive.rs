//! Manual JSON backups into a Google Drive folder.

use chrono::{DateTime, Local, Utc};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

use super::api_types::{ApiDriveFile, ApiDriveFileList, ApiDriveMetadata};
use super::{error_for_response, USER_AGENT};
use crate::collection::Item;
use crate::config::DriveConfig;
use crate::error::{Error, Result};
use crate::snapshot::{total_value, SNAPSHOT_VERSION};

const FOLDER_MIME: &str = "application/vnd.google-apps.folder";
const BOUNDARY: &str = "cardkeep-backup-boundary";

/// Where a backup ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupReceipt {
  pub file_id: String,
  pub filename: String,
  pub url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BackupDocument<'a> {
  export_date: DateTime<Utc>,
  version: &'static str,
  total_cards: usize,
  total_value: f64,
  cards: &'a [Item],
}

/// Drive v3 client authenticated with an OAuth access token.
#[derive(Clone)]
pub struct DriveBackup {
  client: Client,
  api_base: Url,
  access_token: String,
  folder_name: String,
}

impl DriveBackup {
  pub fn new(config: &DriveConfig, access_token: String) -> Result<Self> {
    if access_token.is_empty() {
      return Err(Error::MissingCredential);
    }

    let api_base = Url::parse(&config.api_base)
      .map_err(|e| Error::Malformed(format!("drive api_base '{}': {}", config.api_base, e)))?;

    let client = Client::builder()
      .user_agent(USER_AGENT)
      .timeout(Duration::from_secs(60))
      .build()?;

    Ok(Self {
      client,
      api_base,
      access_token,
      folder_name: config.folder_name.clone(),
    })
  }

  fn endpoint(&self, path: &str) -> Result<Url> {
    self
      .api_base
      .join(path)
      .map_err(|e| Error::Malformed(format!("drive endpoint '{}': {}", path, e)))
  }

  /// Upload the whole collection as a dated JSON file.
  pub async fn upload(&self, cards: &[Item]) -> Result<BackupReceipt> {
    let parents = match self.find_or_create_folder().await {
      Ok(folder_id) => vec![folder_id],
      Err(e) => {
        warn!("Backup folder unavailable, uploading to drive root: {}", e);
        Vec::new()
      }
    };

    let filename = backup_filename(Local::now());
    let document = BackupDocument {
      export_date: Utc::now(),
      version: SNAPSHOT_VERSION,
      total_cards: cards.len(),
      total_value: total_value(cards),
      cards,
    };
    let metadata = ApiDriveMetadata {
      name: &filename,
      mime_type: None,
      parents,
    };

    let body = multipart_body(
      &serde_json::to_string(&metadata)?,
      &serde_json::to_string_pretty(&document)?,
    );

    let mut url = self.endpoint("upload/drive/v3/files")?;
    url.query_pairs_mut().append_pair("uploadType", "multipart");

    let response = self
      .client
      .post(url)
      .bearer_auth(&self.access_token)
      .header(
        CONTENT_TYPE,
        format!("multipart/related; boundary={}", BOUNDARY),
      )
      .body(body)
      .send()
      .await?;

    if !response.status().is_success() {
      return Err(error_for_response(response).await);
    }

    let file: ApiDriveFile = serde_json::from_str(&response.text().await?)?;
    info!("Backed up {} cards to Drive as {}", cards.len(), filename);

    Ok(BackupReceipt {
      url: format!("https://drive.google.com/file/d/{}/view", file.id),
      file_id: file.id,
      filename,
    })
  }

  async fn find_or_create_folder(&self) -> Result<String> {
    let mut url = self.endpoint("drive/v3/files")?;
    url
      .query_pairs_mut()
      .append_pair("q", &folder_query(&self.folder_name))
      .append_pair("fields", "files(id, name)");

    let response = self
      .client
      .get(url)
      .bearer_auth(&self.access_token)
      .send()
      .await?;
    if !response.status().is_success() {
      return Err(error_for_response(response).await);
    }

    let list: ApiDriveFileList = serde_json::from_str(&response.text().await?)?;
    if let Some(folder) = list.files.into_iter().next() {
      info!("Using existing backup folder {}", folder.id);
      return Ok(folder.id);
    }

    let metadata = ApiDriveMetadata {
      name: &self.folder_name,
      mime_type: Some(FOLDER_MIME),
      parents: Vec::new(),
    };
    let response = self
      .client
      .post(self.endpoint("drive/v3/files")?)
      .bearer_auth(&self.access_token)
      .json(&metadata)
      .send()
      .await?;
    if !response.status().is_success() {
      return Err(error_for_response(response).await);
    }

    let folder: ApiDriveFile = serde_json::from_str(&response.text().await?)?;
    info!("Created backup folder {}", folder.id);
    Ok(folder.id)
  }
}

/// `collection-backup-YYYY-MM-DD-HHMM.json` in local time
fn backup_filename(now: DateTime<Local>) -> String {
  format!("collection-backup-{}.json", now.format("%Y-%m-%d-%H%M"))
}

fn folder_query(name: &str) -> String {
  let escaped = name.replace('\\', "\\\\").replace('\'', "\\'");
  format!(
    "name='{}' and mimeType='{}' and trashed=false",
    escaped, FOLDER_MIME
  )
}

/// Two-part `multipart/related` body: metadata, then the file itself.
fn multipart_body(metadata: &str, content: &str) -> String {
  format!(
    "--{b}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata}\r\n\
     --{b}\r\nContent-Type: application/json\r\n\r\n{content}\r\n\
     --{b}--\r\n",
    b = BOUNDARY,
  )
}
