//! Interactive shell: one subcommand per line against a single loaded `App`.

use clap::Parser;
use color_eyre::Result;
use std::io::Write;
use tracing::debug;

use crate::app::App;
use crate::cli::{self, Cmd};
use crate::commands::{self, COMMANDS};
use crate::event::{Event, EventHandler};
use crate::format::timestamp;

#[derive(Parser, Debug)]
#[command(no_binary_name = true, disable_version_flag = true)]
struct ShellLine {
  #[command(subcommand)]
  cmd: Cmd,
}

enum Flow {
  Continue,
  Quit,
}

pub async fn run(app: &mut App) -> Result<()> {
  println!(
    "cardkeep: {} items from {}, last saved {}",
    app.collection().len(),
    app.source().describe(),
    timestamp(app.last_updated())
  );
  if !app.has_remote() {
    println!("No repository configured; changes stay on this machine");
  } else if !app.has_credential() {
    println!("No repository token; run `token set <token>` to enable sync");
  }
  println!("Type `help` for commands, `quit` to exit");

  let mut events = EventHandler::new();
  prompt();

  while let Some(event) = events.next().await {
    match event {
      Event::Line(line) => match handle_line(app, &line).await {
        Flow::Continue => prompt(),
        Flow::Quit => {
          finish(app).await;
          return Ok(());
        }
      },
      event => {
        debug!("Shell closed by {:?}", event);
        println!();
        close(app, event).await;
        return Ok(());
      }
    }
  }

  finish(app).await;
  Ok(())
}

/// End the session on Ctrl-C or end of input.
///
/// Piped input ends in EOF, so EOF leaves like `quit` does. Only Ctrl-C
/// drops the pending push.
async fn close(app: &mut App, event: Event) {
  match event {
    Event::Interrupt => abandon(app),
    _ => finish(app).await,
  }
}

/// Let the pending push go out before leaving.
async fn finish(app: &mut App) {
  if app.push_pending() {
    println!("Waiting for pending push...");
  }
  app.settle().await;
}

fn abandon(app: &mut App) {
  if app.push_pending() {
    eprintln!(
      "warning: pending push dropped; the repository copy will replace unpushed changes on the next start"
    );
  }
  app.teardown();
}

fn prompt() {
  print!("cardkeep> ");
  let _ = std::io::stdout().flush();
}

async fn handle_line(app: &mut App, line: &str) -> Flow {
  let mut words = match split_args(line) {
    Ok(words) => words,
    Err(e) => {
      eprintln!("{}", e);
      return Flow::Continue;
    }
  };

  let Some(first) = words.first() else {
    return Flow::Continue;
  };

  let command = match commands::resolve(first) {
    Some(command) => command,
    None => {
      suggest(first);
      return Flow::Continue;
    }
  };

  match command.name {
    "quit" => return Flow::Quit,
    "help" => {
      print_help();
      return Flow::Continue;
    }
    name => words[0] = name.to_string(),
  }

  match ShellLine::try_parse_from(&words) {
    Ok(ShellLine { cmd: Cmd::Shell }) => println!("Already in the shell"),
    Ok(ShellLine { cmd }) => {
      if let Err(e) = cli::run(app, cmd).await {
        eprintln!("error: {}", e);
      }
    }
    Err(e) => {
      let _ = e.print();
    }
  }
  Flow::Continue
}

fn suggest(input: &str) {
  let suggestions = commands::get_suggestions(input);
  if suggestions.is_empty() {
    eprintln!("Unknown command '{}'. Type `help` for commands.", input);
  } else {
    let names: Vec<&str> = suggestions.iter().take(3).map(|c| c.name).collect();
    eprintln!("Unknown command '{}'. Did you mean: {}?", input, names.join(", "));
  }
}

fn print_help() {
  for command in COMMANDS {
    let aliases = if command.aliases.is_empty() {
      String::new()
    } else {
      format!(" ({})", command.aliases.join(", "))
    };
    println!("  {:<24} {}", format!("{}{}", command.name, aliases), command.description);
  }
  println!("Run `<command> --help` for options.");
}

/// Split a line into words. Single and double quotes group words;
/// a backslash escapes the next character outside single quotes.
pub fn split_args(line: &str) -> Result<Vec<String>, String> {
  let mut words = Vec::new();
  let mut current = String::new();
  let mut in_word = false;
  let mut quote: Option<char> = None;
  let mut chars = line.chars();

  while let Some(c) = chars.next() {
    match (quote, c) {
      (Some(q), c) if c == q => quote = None,
      (Some('"'), '\\') | (None, '\\') => match chars.next() {
        Some(next) => {
          current.push(next);
          in_word = true;
        }
        None => return Err("trailing backslash".to_string()),
      },
      (Some(_), c) => current.push(c),
      (None, '"') | (None, '\'') => {
        quote = Some(c);
        in_word = true;
      }
      (None, c) if c.is_whitespace() => {
        if in_word {
          words.push(std::mem::take(&mut current));
          in_word = false;
        }
      }
      (None, c) => {
        current.push(c);
        in_word = true;
      }
    }
  }

  if let Some(q) = quote {
    return Err(format!("unterminated {} quote", q));
  }
  if in_word {
    words.push(current);
  }
  Ok(words)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::collection::{Category, Item};
  use crate::config::Config;
  use crate::remote::testing::FakeRemote;
  use crate::remote::RemoteStore;
  use crate::snapshot::CollectionSnapshot;
  use crate::store::{KeyValueStore, LocalCache, MemoryStore};
  use std::sync::Arc;
  use std::time::Duration;

  fn split(line: &str) -> Vec<String> {
    split_args(line).unwrap()
  }

  #[test]
  fn test_split_plain_words() {
    assert_eq!(split("  list   --view sold "), vec!["list", "--view", "sold"]);
    assert!(split("   ").is_empty());
  }

  #[test]
  fn test_split_quotes() {
    assert_eq!(
      split(r#"add --name "Dark Charizard" --set 'Team Rocket'"#),
      vec!["add", "--name", "Dark Charizard", "--set", "Team Rocket"]
    );
    assert_eq!(split(r#"edit 1 --notes """#), vec!["edit", "1", "--notes", ""]);
    assert_eq!(split(r#"--notes "say \"hi\"""#), vec!["--notes", r#"say "hi""#]);
    assert_eq!(split(r"--notes 'C:\cards'"), vec!["--notes", r"C:\cards"]);
  }

  #[test]
  fn test_split_errors() {
    assert!(split_args("add --name \"Mew").is_err());
    assert!(split_args("list \\").is_err());
  }

  /// A repository holding one older card and a store holding a token.
  fn setup() -> (Arc<dyn KeyValueStore>, Arc<FakeRemote>) {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    LocalCache::new(store.clone()).set_credential("token").unwrap();
    let remote = Arc::new(FakeRemote::with_document(CollectionSnapshot::new(
      vec![Item::new("Mew", "Promo", Category::Ungraded)],
      "2024-01-01T00:00:00Z".parse().unwrap(),
    )));
    (store, remote)
  }

  async fn open(store: &Arc<dyn KeyValueStore>, remote: &Arc<FakeRemote>) -> App {
    let remote: Arc<dyn RemoteStore> = remote.clone();
    App::with_remote(Config::default(), store.clone(), Some(remote)).await
  }

  fn names(app: &App) -> Vec<String> {
    app.collection().items().iter().map(|i| i.name.clone()).collect()
  }

  #[tokio::test(start_paused = true)]
  async fn test_end_of_input_pushes_pending_edit() {
    let (store, remote) = setup();
    let mut app = open(&store, &remote).await;
    app.add(Item::new("Lugia", "Neo Genesis", Category::Ungraded)).unwrap();
    assert!(app.push_pending());

    close(&mut app, Event::Eof).await;
    assert_eq!(remote.writes().len(), 1);

    let reopened = open(&store, &remote).await;
    assert_eq!(names(&reopened), vec!["Mew", "Lugia"]);
  }

  #[tokio::test(start_paused = true)]
  async fn test_interrupt_drops_pending_push() {
    let (store, remote) = setup();
    let mut app = open(&store, &remote).await;
    app.add(Item::new("Lugia", "Neo Genesis", Category::Ungraded)).unwrap();

    close(&mut app, Event::Interrupt).await;
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(remote.writes().is_empty());
    assert!(!app.push_pending());
  }

  #[test]
  fn test_shell_line_parses_subcommands() {
    let line = ShellLine::try_parse_from(split("sell 42 --price 19.99")).unwrap();
    match line.cmd {
      Cmd::Sell { id, price, date } => {
        assert_eq!(id, "42");
        assert_eq!(price, 19.99);
        assert!(date.is_none());
      }
      other => panic!("unexpected {other:?}"),
    }
  }
}
