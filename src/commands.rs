/// Shell commands and suggestion logic

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
}

/// All commands the shell understands. Names match the CLI subcommands.
pub const COMMANDS: &[Command] = &[
  Command {
    name: "list",
    aliases: &["ls", "l"],
    description: "List items (--view, --search, --set)",
  },
  Command {
    name: "show",
    aliases: &["s", "info"],
    description: "Show one item in full",
  },
  Command {
    name: "add",
    aliases: &["a", "new"],
    description: "Add an item",
  },
  Command {
    name: "edit",
    aliases: &["e", "update"],
    description: "Change fields of an item",
  },
  Command {
    name: "remove",
    aliases: &["rm", "delete", "del"],
    description: "Remove an item",
  },
  Command {
    name: "duplicate",
    aliases: &["dup", "copy"],
    description: "Add a copy of an item",
  },
  Command {
    name: "sell",
    aliases: &["sold"],
    description: "Mark an item sold",
  },
  Command {
    name: "stats",
    aliases: &["st", "summary"],
    description: "Collection value and sales totals",
  },
  Command {
    name: "sets",
    aliases: &[],
    description: "List the sets in the collection",
  },
  Command {
    name: "export",
    aliases: &["x", "csv"],
    description: "Export to CSV",
  },
  Command {
    name: "import",
    aliases: &["i"],
    description: "Import from CSV",
  },
  Command {
    name: "sync",
    aliases: &["pull"],
    description: "Reconcile with the repository",
  },
  Command {
    name: "push",
    aliases: &["p", "upload"],
    description: "Write the collection to the repository now",
  },
  Command {
    name: "backup",
    aliases: &["b", "drive"],
    description: "Upload a JSON backup to Google Drive",
  },
  Command {
    name: "lookup",
    aliases: &["cert", "psa"],
    description: "Look up a PSA certification number",
  },
  Command {
    name: "token",
    aliases: &["auth"],
    description: "Set or clear the repository token",
  },
  Command {
    name: "help",
    aliases: &["h", "?"],
    description: "Show this list",
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Wait for pending pushes and exit",
  },
];

/// Command whose name or alias is exactly `input`
pub fn resolve(input: &str) -> Option<&'static Command> {
  let input_lower = input.to_lowercase();
  COMMANDS
    .iter()
    .find(|cmd| cmd.name == input_lower || cmd.aliases.contains(&input_lower.as_str()))
}

/// How a command matched the typed input, best first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Rank {
  Name,
  Alias,
  NamePrefix,
  AliasPrefix,
  NameContains,
  AliasContains,
  /// A word of the description starts with the input
  Description,
}

fn rank(cmd: &Command, input: &str) -> Option<Rank> {
  let aliases = cmd.aliases;

  if cmd.name == input {
    Some(Rank::Name)
  } else if aliases.contains(&input) {
    Some(Rank::Alias)
  } else if cmd.name.starts_with(input) {
    Some(Rank::NamePrefix)
  } else if aliases.iter().any(|a| a.starts_with(input)) {
    Some(Rank::AliasPrefix)
  } else if cmd.name.contains(input) {
    Some(Rank::NameContains)
  } else if aliases.iter().any(|a| a.contains(input)) {
    Some(Rank::AliasContains)
  } else if input.chars().count() >= 3
    && cmd
      .description
      .to_lowercase()
      .split(|c: char| !c.is_alphanumeric())
      .any(|word| word.starts_with(input))
  {
    Some(Rank::Description)
  } else {
    None
  }
}

/// Commands matching `input`, best match first. Empty input lists them all.
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input = input.to_lowercase();
  if input.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut ranked: Vec<(Rank, &'static Command)> = COMMANDS
    .iter()
    .filter_map(|cmd| rank(cmd, &input).map(|r| (r, cmd)))
    .collect();
  // Stable sort: equal ranks keep table order
  ranked.sort_by_key(|(r, _)| *r);

  ranked.into_iter().map(|(_, cmd)| cmd).collect()
}
