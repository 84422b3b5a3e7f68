//! Which tier wins, and where writes go.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::debounce::DebouncedPush;
use crate::collection::{seed, Item};
use crate::error::{Error, Result};
use crate::remote::{RemoteStore, WriteReceipt};
use crate::snapshot::CollectionSnapshot;
use crate::store::LocalCache;

/// Tier that supplied the collection at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
  Remote,
  LocalCache,
  Seed,
}

impl LoadSource {
  pub fn describe(&self) -> &'static str {
    match self {
      LoadSource::Remote => "repository",
      LoadSource::LocalCache => "local cache",
      LoadSource::Seed => "sample data",
    }
  }
}

#[derive(Debug, Clone)]
pub struct Loaded {
  pub cards: Vec<Item>,
  pub last_updated: Option<DateTime<Utc>>,
  pub source: LoadSource,
}

#[derive(Debug, Clone)]
pub enum SyncOutcome {
  /// The remote document was newer and replaced the local one.
  Pulled {
    cards: Vec<Item>,
    last_updated: Option<DateTime<Utc>>,
  },
  /// Local was newer or equal and was written to the remote.
  Pushed(WriteReceipt),
}

/// Document-level last-writer-wins. Ties go to local.
pub fn remote_wins(local: Option<DateTime<Utc>>, remote: Option<DateTime<Utc>>) -> bool {
  match (local, remote) {
    (None, _) => true,
    (Some(local), Some(remote)) => remote > local,
    (Some(_), None) => false,
  }
}

/// Owns both tiers and the debounced push between them.
pub struct Reconciler {
  local: LocalCache,
  remote: Option<Arc<dyn RemoteStore>>,
  credential: Option<String>,
  debounce: DebouncedPush,
  last_stamp: Option<DateTime<Utc>>,
}

impl Reconciler {
  pub fn new(
    local: LocalCache,
    remote: Option<Arc<dyn RemoteStore>>,
    credential: Option<String>,
    quiet: Duration,
  ) -> Self {
    let last_stamp = local.last_updated().unwrap_or_else(|e| {
      warn!("Ignoring unreadable local timestamp: {}", e);
      None
    });

    Self {
      local,
      remote,
      credential: credential.filter(|c| !c.is_empty()),
      debounce: DebouncedPush::new(quiet),
      last_stamp,
    }
  }

  pub fn has_remote(&self) -> bool {
    self.remote.is_some()
  }

  pub fn has_credential(&self) -> bool {
    self.credential.is_some()
  }

  pub fn set_credential(&mut self, credential: Option<String>) {
    self.credential = credential.filter(|c| !c.is_empty());
    if self.credential.is_none() {
      self.debounce.cancel();
    }
  }

  /// Whether a debounced push has not completed yet.
  pub fn push_pending(&self) -> bool {
    self.debounce.is_pending()
  }

  /// Startup load. Never fails: remote, then local cache, then seed data.
  pub async fn load(&mut self) -> Loaded {
    if let Some(remote) = self.remote.clone() {
      match remote.fetch_snapshot().await {
        Ok(snapshot) if snapshot.has_cards() => {
          let stamp = snapshot.last_updated.unwrap_or_else(Utc::now);
          let mirror = CollectionSnapshot::new(snapshot.cards, stamp);
          if let Err(e) = self.local.write_snapshot(&mirror) {
            warn!("Could not mirror repository collection locally: {}", e);
          }
          self.observe(stamp);
          info!("Loaded {} cards from repository", mirror.cards.len());
          return Loaded {
            cards: mirror.cards,
            last_updated: Some(stamp),
            source: LoadSource::Remote,
          };
        }
        Ok(_) => info!("Repository collection is empty, using local cache"),
        Err(e) => warn!("Repository unavailable, using local cache: {}", e),
      }
    }

    match self.local.read_snapshot() {
      Ok(Some(snapshot)) => {
        if let Some(stamp) = snapshot.last_updated {
          self.observe(stamp);
        }
        info!("Loaded {} cards from local cache", snapshot.cards.len());
        return Loaded {
          cards: snapshot.cards,
          last_updated: snapshot.last_updated,
          source: LoadSource::LocalCache,
        };
      }
      Ok(None) => info!("No saved collection, starting from sample data"),
      Err(e) => warn!("Local collection unreadable, starting from sample data: {}", e),
    }

    Loaded {
      cards: seed(),
      last_updated: None,
      source: LoadSource::Seed,
    }
  }

  /// Persist locally with a fresh stamp, then queue a remote push.
  ///
  /// Only the local write can fail the call.
  pub fn save(&mut self, cards: &[Item]) -> Result<DateTime<Utc>> {
    let stamp = self.next_stamp();
    let snapshot = CollectionSnapshot::new(cards.to_vec(), stamp);
    self.local.write_snapshot(&snapshot)?;
    debug!("Saved {} cards locally at {}", cards.len(), stamp);

    self.schedule_push(snapshot);
    Ok(stamp)
  }

  fn schedule_push(&mut self, snapshot: CollectionSnapshot) {
    let (Some(remote), Some(credential)) = (self.remote.clone(), self.credential.clone()) else {
      debug!("No remote write credential, keeping changes local");
      return;
    };

    self.debounce.schedule(async move {
      match remote.write_snapshot(&snapshot, &credential).await {
        Ok(receipt) => info!(
          commit = %receipt.commit_sha,
          "Auto-synced {} cards to repository",
          snapshot.cards.len()
        ),
        Err(e) => warn!("Auto-sync to repository failed: {}", e),
      }
    });
  }

  /// Write `cards` to the remote now, skipping the quiet period.
  pub async fn push(&mut self, cards: &[Item]) -> Result<WriteReceipt> {
    let (remote, credential) = self.remote_and_credential()?;

    let stamp = self.next_stamp();
    let snapshot = CollectionSnapshot::new(cards.to_vec(), stamp);
    self.local.write_snapshot(&snapshot)?;
    // Supersedes whatever the countdown would have sent
    self.debounce.cancel();

    remote.write_snapshot(&snapshot, &credential).await
  }

  /// Compare stamps and let the later document win in full.
  pub async fn sync(&mut self, cards: &[Item]) -> Result<SyncOutcome> {
    let (remote, _) = self.remote_and_credential()?;

    let remote_snapshot = remote.fetch_snapshot().await?;
    let local_stamp = self.local.last_updated().unwrap_or_else(|e| {
      warn!("Treating unreadable local timestamp as absent: {}", e);
      None
    });

    if !remote_wins(local_stamp, remote_snapshot.last_updated) {
      info!("Local collection is current, pushing to repository");
      let receipt = self.push(cards).await?;
      return Ok(SyncOutcome::Pushed(receipt));
    }

    info!(
      "Repository collection is newer, replacing {} local cards with {}",
      cards.len(),
      remote_snapshot.cards.len()
    );
    self.debounce.cancel();

    let stamp = match remote_snapshot.last_updated {
      Some(stamp) => stamp,
      None => self.next_stamp(),
    };
    let mirror = CollectionSnapshot::new(remote_snapshot.cards, stamp);
    self.local.write_snapshot(&mirror)?;
    self.observe(stamp);

    Ok(SyncOutcome::Pulled {
      cards: mirror.cards,
      last_updated: Some(stamp),
    })
  }

  /// Wait for any pending push to go out.
  pub async fn settle(&mut self) {
    self.debounce.settle().await;
  }

  /// Cancel any pending push without sending it.
  pub fn teardown(&mut self) {
    self.debounce.teardown();
  }

  fn remote_and_credential(&self) -> Result<(Arc<dyn RemoteStore>, String)> {
    let remote = self.remote.clone().ok_or(Error::NoRemote)?;
    let credential = self.credential.clone().ok_or(Error::MissingCredential)?;
    Ok((remote, credential))
  }

  /// Now, or one millisecond past the last stamp if the clock has not moved on.
  fn next_stamp(&mut self) -> DateTime<Utc> {
    let now = Utc::now();
    let stamp = match self.last_stamp {
      Some(last) if now <= last => last + ChronoDuration::milliseconds(1),
      _ => now,
    };
    self.last_stamp = Some(stamp);
    stamp
  }

  fn observe(&mut self, stamp: DateTime<Utc>) {
    if self.last_stamp.map_or(true, |last| stamp > last) {
      self.last_stamp = Some(stamp);
    }
  }
}
