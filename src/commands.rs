/// Available commands and autocomplete logic

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "users",
    aliases: &["u", "user", "table"],
    description: "Browse the user table",
  },
  Command {
    name: "log",
    aliases: &["l", "activity", "history"],
    description: "View the activity log",
  },
  Command {
    name: "theme",
    aliases: &["t", "dark", "light"],
    description: "Toggle light/dark theme",
  },
  Command {
    name: "clear-logs",
    aliases: &["clear"],
    description: "Empty the activity log",
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit udash",
  },
];

/// Get autocomplete suggestions for a given input, best match first.
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input = input.trim().to_lowercase();

  if input.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&Command, u32)> = COMMANDS
    .iter()
    .filter_map(|cmd| rank(cmd, &input).map(|r| (cmd, r)))
    .collect();

  matches.sort_by_key(|(_, rank)| *rank);
  matches.into_iter().map(|(cmd, _)| cmd).collect()
}

/// Rank a command against the input: lower is better, `None` is no match.
fn rank(cmd: &Command, input: &str) -> Option<u32> {
  if cmd.name == input {
    return Some(0);
  }
  if cmd.aliases.contains(&input) {
    return Some(1);
  }
  if cmd.name.starts_with(input) {
    return Some(2);
  }
  if cmd.aliases.iter().any(|a| a.starts_with(input)) {
    return Some(3);
  }
  if cmd.name.contains(input) {
    return Some(4);
  }
  None
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_input_returns_all() {
    let suggestions = get_suggestions("");
    assert_eq!(suggestions.len(), COMMANDS.len());
  }

  #[test]
  fn test_exact_match_ranks_first() {
    let suggestions = get_suggestions("log");
    assert_eq!(suggestions[0].name, "log");
  }

  #[test]
  fn test_alias_match() {
    let suggestions = get_suggestions("dark");
    assert_eq!(suggestions[0].name, "theme");
  }

  #[test]
  fn test_prefix_match() {
    let suggestions = get_suggestions("us");
    assert_eq!(suggestions[0].name, "users");
  }

  #[test]
  fn test_fuzzy_match() {
    let suggestions = get_suggestions("ear");
    assert!(suggestions.iter().any(|c| c.name == "clear-logs"));
  }

  #[test]
  fn test_no_match() {
    assert!(get_suggestions("zzz").is_empty());
  }
}
