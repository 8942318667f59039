//! Subcommand metadata.
//!
//! The orchestration core does not implement engine subcommands, but it needs
//! to know two things about them: which ones mutate state (for read-only
//! policy and per-file write locking) and what their argument grammar looks
//! like (for agent prompt assembly).

/// Subcommands that mutate workspace or process state.  Everything else is
/// treated as read-only.
pub const WRITE_COMMANDS: &[&str] = &["write", "patch", "exec", "test", "rollback", "clean"];

/// Whether a subcommand is classified as a write command.
pub fn is_write_command(subcommand: &str) -> bool {
    WRITE_COMMANDS.contains(&subcommand)
}

/// Every subcommand the engine exposes, with its usage hint.
const SUBCOMMAND_HINTS: &[(&str, &str)] = &[
    ("read", "read --file <path> [--start N] [--end N]"),
    ("write", "write --file <path> --content <text> [--encoding base64]"),
    ("patch", "patch --file <path> --content <unified-diff> [--encoding base64]"),
    ("search", "search --term <pattern> [--dir <path>]"),
    ("tree", "tree [--dir <path>] [--max-depth N]"),
    ("exec", "exec --cmd <shell-command> [--dir <path>]"),
    ("test", "test [--dir <path>]"),
    ("git-status", "git-status"),
    ("git-diff", "git-diff [--file <path>]"),
    ("git-log", "git-log [--limit N]"),
    ("git-changed", "git-changed"),
    ("git-branch", "git-branch"),
    ("rollback", "rollback --file <path>"),
    ("clean", "clean"),
];

/// The full list of known engine subcommands.
pub fn known_subcommands() -> Vec<&'static str> {
    SUBCOMMAND_HINTS.iter().map(|(name, _)| *name).collect()
}

/// The usage hint for a subcommand, if known.
pub fn arg_hint(subcommand: &str) -> Option<&'static str> {
    SUBCOMMAND_HINTS
        .iter()
        .find(|(name, _)| *name == subcommand)
        .map(|(_, hint)| *hint)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_classification() {
        for cmd in ["write", "patch", "exec", "test", "rollback", "clean"] {
            assert!(is_write_command(cmd), "{cmd} should be a write command");
        }
        for cmd in ["read", "search", "tree", "git-status", "git-diff"] {
            assert!(!is_write_command(cmd), "{cmd} should be read-only");
        }
    }

    #[test]
    fn every_write_command_is_known() {
        let known = known_subcommands();
        for cmd in WRITE_COMMANDS {
            assert!(known.contains(cmd));
        }
    }

    #[test]
    fn hints_exist_for_core_commands() {
        assert!(arg_hint("read").unwrap().contains("--file"));
        assert!(arg_hint("search").unwrap().contains("--term"));
        assert!(arg_hint("nonexistent").is_none());
    }
}
