//! Recording in-memory remote for reconciler and debounce tests.

use async_trait::async_trait;
use std::sync::Mutex;

use super::{RemoteStore, WriteReceipt};
use crate::error::{Error, Result};
use crate::snapshot::CollectionSnapshot;

#[derive(Default)]
pub struct FakeRemote {
  document: Mutex<Option<CollectionSnapshot>>,
  offline: Mutex<bool>,
  writes: Mutex<Vec<CollectionSnapshot>>,
}

impl FakeRemote {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_document(snapshot: CollectionSnapshot) -> Self {
    let remote = Self::new();
    *remote.document.lock().unwrap() = Some(snapshot);
    remote
  }

  /// Make every request fail as if the network were down.
  pub fn go_offline(&self) {
    *self.offline.lock().unwrap() = true;
  }

  pub fn writes(&self) -> Vec<CollectionSnapshot> {
    self.writes.lock().unwrap().clone()
  }

  pub fn document(&self) -> Option<CollectionSnapshot> {
    self.document.lock().unwrap().clone()
  }

  fn check_online(&self) -> Result<()> {
    if *self.offline.lock().unwrap() {
      return Err(Error::Remote {
        status: 503,
        message: "connection refused".to_string(),
      });
    }
    Ok(())
  }
}

#[async_trait]
impl RemoteStore for FakeRemote {
  async fn fetch_snapshot(&self) -> Result<CollectionSnapshot> {
    self.check_online()?;
    Ok(self.document().unwrap_or_else(CollectionSnapshot::empty))
  }

  async fn write_snapshot(
    &self,
    snapshot: &CollectionSnapshot,
    credential: &str,
  ) -> Result<WriteReceipt> {
    self.check_online()?;
    if credential.is_empty() {
      return Err(Error::MissingCredential);
    }

    let mut writes = self.writes.lock().unwrap();
    writes.push(snapshot.clone());
    *self.document.lock().unwrap() = Some(snapshot.clone());

    Ok(WriteReceipt {
      commit_sha: format!("commit-{}", writes.len()),
      url: None,
    })
  }
}
