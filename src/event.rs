use std::io::BufRead;
use tokio::sync::mpsc;

/// Shell input events
#[derive(Debug)]
pub enum Event {
  /// One line typed at the prompt, without its terminator
  Line(String),
  /// Ctrl-C
  Interrupt,
  /// Input closed (Ctrl-D or end of piped input)
  Eof,
}

/// Event handler that produces events from stdin and the interrupt signal
pub struct EventHandler {
  rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
  pub fn new() -> Self {
    let (tx, rx) = mpsc::unbounded_channel();

    // Blocking reads live on their own thread so the runtime can shut down
    // while a read is still waiting.
    let line_tx = tx.clone();
    std::thread::spawn(move || {
      let stdin = std::io::stdin();
      for line in stdin.lock().lines() {
        match line {
          Ok(line) => {
            if line_tx.send(Event::Line(line)).is_err() {
              return;
            }
          }
          Err(_) => break,
        }
      }
      let _ = line_tx.send(Event::Eof);
    });

    // Spawn interrupt listener
    tokio::spawn(async move {
      while tokio::signal::ctrl_c().await.is_ok() {
        if tx.send(Event::Interrupt).is_err() {
          break;
        }
      }
    });

    Self { rx }
  }

  /// Receive the next event
  pub async fn next(&mut self) -> Option<Event> {
    self.rx.recv().await
  }
}
