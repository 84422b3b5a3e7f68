//! Remote tiers: the repository-hosted collection document, plus the
//! manual-only Drive backup and PSA lookup clients.

mod api_types;
mod drive;
mod github;
mod grading;

#[cfg(test)]
pub(crate) mod testing;

pub use drive::{BackupReceipt, DriveBackup};
pub use github::GitHubStore;
pub use grading::{parse_psa_brand, GradedCard, PsaClient};

use async_trait::async_trait;
use reqwest::{Response, StatusCode};

use crate::error::{Error, Result};
use crate::snapshot::CollectionSnapshot;

/// Sent with every outgoing request; GitHub rejects requests without one.
pub(crate) const USER_AGENT: &str = concat!("cardkeep/", env!("CARGO_PKG_VERSION"));

/// Outcome of a successful remote write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteReceipt {
  pub commit_sha: String,
  pub url: Option<String>,
}

/// A remote home for the collection document.
#[async_trait]
pub trait RemoteStore: Send + Sync {
  /// Read the current document. A document that does not exist yet is an
  /// empty snapshot, not an error.
  async fn fetch_snapshot(&self) -> Result<CollectionSnapshot>;

  /// Replace the document with `snapshot`.
  async fn write_snapshot(
    &self,
    snapshot: &CollectionSnapshot,
    credential: &str,
  ) -> Result<WriteReceipt>;
}

/// Turn a non-success response into the matching error.
pub(crate) async fn error_for_response(response: Response) -> Error {
  let status = response.status();
  let body = response.text().await.unwrap_or_default();
  classify(status, &body)
}

pub(crate) fn classify(status: StatusCode, body: &str) -> Error {
  let message = api_message(body).unwrap_or_else(|| {
    status
      .canonical_reason()
      .unwrap_or("request failed")
      .to_string()
  });

  match status {
    StatusCode::NOT_FOUND => Error::NotFound,
    StatusCode::UNAUTHORIZED => Error::Unauthorized(message),
    StatusCode::FORBIDDEN => Error::Forbidden(message),
    other => Error::Remote {
      status: other.as_u16(),
      message,
    },
  }
}

/// GitHub, Drive and PSA all put a human readable reason somewhere in the
/// error body.
fn api_message(body: &str) -> Option<String> {
  let value: serde_json::Value = serde_json::from_str(body).ok()?;
  let message = value
    .get("message")
    .or_else(|| value.get("error").and_then(|e| e.get("message")))
    .or_else(|| value.get("Message"))?;
  message.as_str().map(str::to_string)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_classify_status() {
    assert!(matches!(classify(StatusCode::NOT_FOUND, ""), Error::NotFound));
    assert!(matches!(
      classify(StatusCode::UNAUTHORIZED, r#"{"message":"Bad credentials"}"#),
      Error::Unauthorized(m) if m == "Bad credentials"
    ));
    assert!(matches!(
      classify(StatusCode::FORBIDDEN, "rate limited"),
      Error::Forbidden(m) if m == "Forbidden"
    ));
  }

  #[test]
  fn test_classify_other_keeps_status_and_message() {
    let err = classify(
      StatusCode::UNPROCESSABLE_ENTITY,
      r#"{"message":"sha wasn't supplied"}"#,
    );
    match err {
      Error::Remote { status, message } => {
        assert_eq!(status, 422);
        assert_eq!(message, "sha wasn't supplied");
      }
      other => panic!("unexpected error: {other:?}"),
    }
  }

  #[test]
  fn test_drive_error_shape() {
    let body = r#"{"error":{"code":401,"message":"Invalid Credentials"}}"#;
    assert_eq!(api_message(body).as_deref(), Some("Invalid Credentials"));
  }
}
