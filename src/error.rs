//! Error types shared by the collection core, the stores and the remote adapters.
//!
//! Background paths (startup load, debounced push) swallow these and log them;
//! explicit actions hand them back to the CLI which prints them.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
  /// Remote document absent. Treated as an empty snapshot by the fetch path.
  #[error("remote document not found")]
  NotFound,

  #[error("credential rejected: {0}")]
  Unauthorized(String),

  #[error("credential lacks permission: {0}")]
  Forbidden(String),

  #[error("remote responded with status {status}: {message}")]
  Remote { status: u16, message: String },

  #[error("network error: {0}")]
  Network(#[from] reqwest::Error),

  #[error("malformed JSON: {0}")]
  Parse(#[from] serde_json::Error),

  #[error("malformed data: {0}")]
  Malformed(String),

  #[error("line {line}: {message}")]
  Validation { line: usize, message: String },

  #[error("no write credential configured")]
  MissingCredential,

  #[error("no remote repository configured")]
  NoRemote,

  #[error("item not found: {0}")]
  ItemNotFound(String),

  #[error("item {0} is already sold")]
  AlreadySold(String),

  #[error("local store error: {0}")]
  Storage(String),

  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
