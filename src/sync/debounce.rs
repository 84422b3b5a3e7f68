//! Cancellable deferred push.

use std::future::Future;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(3000);

struct Pending {
  cancel: oneshot::Sender<()>,
  handle: JoinHandle<()>,
}

/// At most one countdown is pending. Scheduling again cancels it and
/// starts over; the push runs only once the quiet period passes untouched.
pub struct DebouncedPush {
  quiet: Duration,
  pending: Option<Pending>,
}

impl DebouncedPush {
  pub fn new(quiet: Duration) -> Self {
    Self {
      quiet,
      pending: None,
    }
  }

  /// Restart the countdown with `push` as the work to run when it elapses.
  pub fn schedule<F>(&mut self, push: F)
  where
    F: Future<Output = ()> + Send + 'static,
  {
    self.cancel();

    let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
    let quiet = self.quiet;
    let handle = tokio::spawn(async move {
      tokio::select! {
        biased;
        // Fires on an explicit cancel and when the sender is dropped
        _ = cancel_rx => {
          debug!("Pending push cancelled");
          return;
        }
        _ = tokio::time::sleep(quiet) => {}
      }
      push.await;
    });

    self.pending = Some(Pending {
      cancel: cancel_tx,
      handle,
    });
  }

  /// Stop the countdown. Returns true if one was still waiting.
  ///
  /// A push already under way is left to finish.
  pub fn cancel(&mut self) -> bool {
    match self.pending.take() {
      Some(pending) => pending.cancel.send(()).is_ok() && !pending.handle.is_finished(),
      None => false,
    }
  }

  /// Whether a countdown or its push has not finished yet.
  pub fn is_pending(&self) -> bool {
    self
      .pending
      .as_ref()
      .is_some_and(|pending| !pending.handle.is_finished())
  }

  /// Wait for the pending countdown to elapse and its push to complete.
  pub async fn settle(&mut self) {
    if let Some(Pending { cancel, handle }) = self.pending.take() {
      if let Err(e) = handle.await {
        warn!("Pending push task failed: {}", e);
      }
      // Held until here so the countdown is not cancelled early
      drop(cancel);
    }
  }

  /// Drop any pending countdown. Nothing is pushed afterwards.
  pub fn teardown(&mut self) {
    if self.cancel() {
      debug!("Cancelled pending push on teardown");
    }
  }
}

impl Drop for DebouncedPush {
  fn drop(&mut self) {
    self.cancel();
  }
}
