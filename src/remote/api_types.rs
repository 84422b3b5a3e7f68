//! Serde types matching the GitHub, Drive and PSA API payloads.
//!
//! Kept apart from the domain types so the wire shapes can follow each
//! vendor's naming without leaking into the rest of the crate.

use serde::{Deserialize, Serialize};

// ============================================================================
// GitHub contents API
// ============================================================================

/// `GET /repos/{owner}/{repo}/contents/{path}` for a file.
#[derive(Debug, Deserialize)]
pub struct ApiContentFile {
  pub sha: String,
  /// Base64, wrapped at 60 columns
  #[serde(default)]
  pub content: String,
  #[serde(default)]
  pub encoding: Option<String>,
}

/// Body of `PUT /repos/{owner}/{repo}/contents/{path}`.
#[derive(Debug, Serialize)]
pub struct ApiPutContent<'a> {
  pub message: String,
  pub content: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub sha: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub branch: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
pub struct ApiPutResponse {
  pub commit: ApiCommit,
  pub content: Option<ApiContentRef>,
}

#[derive(Debug, Deserialize)]
pub struct ApiCommit {
  pub sha: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiContentRef {
  pub html_url: Option<String>,
}

// ============================================================================
// Google Drive v3
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiDriveFileList {
  #[serde(default)]
  pub files: Vec<ApiDriveFile>,
}

#[derive(Debug, Deserialize)]
pub struct ApiDriveFile {
  pub id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiDriveMetadata<'a> {
  pub name: &'a str,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub mime_type: Option<&'a str>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub parents: Vec<String>,
}

// ============================================================================
// PSA public API
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiCertResponse {
  #[serde(rename = "PSACert")]
  pub psa_cert: Option<ApiPsaCert>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiPsaCert {
  pub cert_number: Option<String>,
  pub spec_number: Option<String>,
  pub year: Option<String>,
  pub brand: Option<String>,
  pub subject: Option<String>,
  pub card_number: Option<String>,
  pub variety: Option<String>,
  pub card_grade: Option<String>,
  pub grade_description: Option<String>,
  pub total_population: Option<u64>,
  pub population_higher: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiPsaImage {
  #[serde(default)]
  pub is_front_image: bool,
  #[serde(rename = "ImageURL")]
  pub image_url: Option<String>,
}
