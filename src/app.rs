use chrono::{DateTime, Local, Utc};
use color_eyre::{eyre::eyre, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::collection::{Category, Collection, Item, ItemId};
use crate::config::Config;
use crate::csv;
use crate::error::Error;
use crate::remote::{BackupReceipt, DriveBackup, GitHubStore, GradedCard, PsaClient, RemoteStore, WriteReceipt};
use crate::store::{KeyValueStore, LocalCache};
use crate::sync::{LoadSource, Reconciler, SyncOutcome};

/// How an import combines with what is already there
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportMode {
  Replace,
  Merge,
}

#[derive(Debug)]
pub struct ImportSummary {
  pub imported: usize,
  pub rejected: Vec<Error>,
  pub total: usize,
}

#[derive(Debug)]
pub struct ExportSummary {
  pub path: PathBuf,
  pub count: usize,
}

/// Application state. Built once per process and passed to the CLI and shell.
pub struct App {
  /// Application configuration
  config: Config,

  /// Local tier, also holds the stored repository token
  local: LocalCache,

  reconciler: Reconciler,

  collection: Collection,

  /// Stamp of the last local or pulled write
  last_updated: Option<DateTime<Utc>>,

  /// Tier the collection came from at startup
  source: LoadSource,
}

impl App {
  /// Build the stores and clients, then run the startup load.
  pub async fn open(config: Config, store: Arc<dyn KeyValueStore>) -> Result<Self> {
    let remote: Option<Arc<dyn RemoteStore>> = match &config.remote {
      Some(remote) => Some(Arc::new(GitHubStore::new(remote)?)),
      None => None,
    };
    Ok(Self::with_remote(config, store, remote).await)
  }

  pub(crate) async fn with_remote(
    config: Config,
    store: Arc<dyn KeyValueStore>,
    remote: Option<Arc<dyn RemoteStore>>,
  ) -> Self {
    let local = LocalCache::new(store);

    let credential = match Config::github_token() {
      Some(token) => Some(token),
      None => local.credential().unwrap_or_else(|e| {
        warn!("Stored repository token unreadable: {}", e);
        None
      }),
    };

    let mut reconciler = Reconciler::new(local.clone(), remote, credential, config.sync.debounce());
    let loaded = reconciler.load().await;
    info!(
      "Collection ready: {} items from {}",
      loaded.cards.len(),
      loaded.source.describe()
    );

    Self {
      config,
      local,
      reconciler,
      collection: Collection::new(loaded.cards),
      last_updated: loaded.last_updated,
      source: loaded.source,
    }
  }

  pub fn collection(&self) -> &Collection {
    &self.collection
  }

  pub fn source(&self) -> LoadSource {
    self.source
  }

  pub fn last_updated(&self) -> Option<DateTime<Utc>> {
    self.last_updated
  }

  pub fn has_remote(&self) -> bool {
    self.reconciler.has_remote()
  }

  pub fn has_credential(&self) -> bool {
    self.reconciler.has_credential()
  }

  /// Every mutation ends here: local write now, remote push later.
  fn commit(&mut self) -> Result<()> {
    let stamp = self
      .reconciler
      .save(self.collection.items())
      .map_err(|e| eyre!("Failed to save collection: {}", e))?;
    self.last_updated = Some(stamp);
    Ok(())
  }

  pub fn add(&mut self, item: Item) -> Result<ItemId> {
    let id = self.collection.add(item);
    self.commit()?;
    Ok(id)
  }

  pub fn update(&mut self, item: Item) -> Result<()> {
    self.collection.update(item)?;
    self.commit()
  }

  pub fn remove(&mut self, id: &str) -> Result<Item> {
    let removed = self.collection.remove(id)?;
    self.commit()?;
    Ok(removed)
  }

  pub fn duplicate(&mut self, id: &str) -> Result<ItemId> {
    let new_id = self.collection.duplicate(id)?;
    self.commit()?;
    Ok(new_id)
  }

  pub fn mark_sold(&mut self, id: &str, sale_price: f64, sale_date: Option<String>) -> Result<()> {
    self.collection.mark_sold(id, sale_price, sale_date)?;
    self.commit()
  }

  /// Read a `.csv` file and replace or extend the collection with its rows.
  pub async fn import_csv(&mut self, path: &Path, mode: ImportMode) -> Result<ImportSummary> {
    let is_csv = path
      .extension()
      .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if !is_csv {
      return Err(eyre!("Only .csv files can be imported: {}", path.display()));
    }

    let text = tokio::fs::read_to_string(path)
      .await
      .map_err(|e| eyre!("Failed to read {}: {}", path.display(), e))?;

    let report = csv::import(&text);
    for error in &report.errors {
      warn!("Skipping CSV row: {}", error);
    }
    if report.items.is_empty() {
      return Err(eyre!(
        "No valid items found in {} ({} rows rejected)",
        path.display(),
        report.errors.len()
      ));
    }

    let imported = report.items.len();
    match mode {
      ImportMode::Replace => self.collection.replace(report.items),
      ImportMode::Merge => self.collection.append(report.items),
    }
    self.commit()?;
    info!("Imported {} items from {}", imported, path.display());

    Ok(ImportSummary {
      imported,
      rejected: report.errors,
      total: self.collection.len(),
    })
  }

  /// Write the collection, or one category of it, as CSV.
  ///
  /// `output` may be a file or a directory; the dated file name is used
  /// for directories and when no path is given.
  pub async fn export_csv(&self, category: Option<Category>, output: Option<&Path>) -> Result<ExportSummary> {
    let items: Vec<&Item> = self
      .collection
      .items()
      .iter()
      .filter(|item| category.map_or(true, |c| item.category == c))
      .collect();

    let filename = csv::export_filename(category, Local::now().date_naive());
    let path = match output {
      Some(p) if p.is_dir() => p.join(filename),
      Some(p) => p.to_path_buf(),
      None => PathBuf::from(filename),
    };

    tokio::fs::write(&path, csv::export(items.iter().copied()))
      .await
      .map_err(|e| eyre!("Failed to write {}: {}", path.display(), e))?;
    info!("Exported {} items to {}", items.len(), path.display());

    Ok(ExportSummary {
      path,
      count: items.len(),
    })
  }

  /// Reconcile with the repository; the later document wins in full.
  pub async fn sync(&mut self) -> Result<SyncOutcome> {
    let outcome = self
      .reconciler
      .sync(self.collection.items())
      .await
      .map_err(|e| eyre!("Sync failed: {}", e))?;

    match &outcome {
      SyncOutcome::Pulled { cards, last_updated } => {
        // Pulled items keep their ids
        self.collection = Collection::new(cards.clone());
        self.last_updated = *last_updated;
      }
      SyncOutcome::Pushed(_) => {
        self.last_updated = self.local.last_updated().unwrap_or(self.last_updated);
      }
    }
    Ok(outcome)
  }

  /// Push to the repository now, skipping the quiet period.
  pub async fn push(&mut self) -> Result<WriteReceipt> {
    let receipt = self
      .reconciler
      .push(self.collection.items())
      .await
      .map_err(|e| eyre!("Push failed: {}", e))?;
    self.last_updated = self.local.last_updated().unwrap_or(self.last_updated);
    Ok(receipt)
  }

  pub async fn backup(&self) -> Result<BackupReceipt> {
    let drive = DriveBackup::new(&self.config.drive, Config::drive_token()?)?;
    let receipt = drive
      .upload(self.collection.items())
      .await
      .map_err(|e| eyre!("Backup failed: {}", e))?;
    Ok(receipt)
  }

  pub async fn lookup(&self, cert_number: &str) -> Result<GradedCard> {
    let client = PsaClient::new(&self.config.grading, Config::psa_token()?)?;
    client.lookup(cert_number).await.map_err(|e| match e {
      Error::NotFound => eyre!("Certification number {} not found in PSA database", cert_number),
      other => eyre!("Lookup failed: {}", other),
    })
  }

  /// Store the repository token and start using it.
  pub fn set_credential(&mut self, token: &str) -> Result<()> {
    let token = token.trim();
    if token.is_empty() {
      return Err(eyre!("Token is empty"));
    }
    self.local.set_credential(token)?;
    self.reconciler.set_credential(Some(token.to_string()));
    Ok(())
  }

  /// Forget the stored token. An environment token still applies.
  pub fn clear_credential(&mut self) -> Result<()> {
    self.local.clear_credential()?;
    self.reconciler.set_credential(Config::github_token());
    Ok(())
  }

  pub fn push_pending(&self) -> bool {
    self.reconciler.push_pending()
  }

  /// Let a pending push go out before the process exits.
  pub async fn settle(&mut self) {
    self.reconciler.settle().await;
  }

  /// Drop any pending push.
  pub fn teardown(&mut self) {
    self.reconciler.teardown();
  }
}
