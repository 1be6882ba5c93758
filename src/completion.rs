//! # Shell Completion Module
//!
//! Shell completion support for Moodmix:
//! - Generation of completion scripts through clap_complete
//! - Dynamic completion of blocked track ids for `unblock`
//!
//! ## Usage
//!
//! ```bash
//! # Generate bash completions
//! moodmix completion bash > ~/.local/share/bash-completion/completions/moodmix
//!
//! # Generate zsh completions
//! moodmix completion zsh > ~/.config/zsh/completions/_moodmix
//! ```

use crate::config;
use crate::db::SqliteLibrary;
use crate::store::BlockStore;
use anyhow::Result;
use clap::Command;
use clap_complete::{generate, Generator, Shell as CompletionShell};
use std::io;
use std::path::Path;

/// Generate shell completions for the given shell
pub fn generate_completions<G: Generator>(gen: G, cmd: &mut Command) {
    generate(gen, cmd, cmd.get_name().to_string(), &mut io::stdout());
}

/// Convert our Shell enum to clap_complete's Shell enum
#[must_use]
pub fn shell_to_completion_shell(shell: crate::cli::Shell) -> CompletionShell {
    match shell {
        crate::cli::Shell::Bash => CompletionShell::Bash,
        crate::cli::Shell::Zsh => CompletionShell::Zsh,
        crate::cli::Shell::Fish => CompletionShell::Fish,
        crate::cli::Shell::PowerShell => CompletionShell::PowerShell,
        crate::cli::Shell::Elvish => CompletionShell::Elvish,
    }
}

/// Blocked track ids in the library at `db_path`.
///
/// A missing or unreadable database yields no completions rather than an
/// error, so a broken library never breaks the shell.
#[must_use]
pub fn blocked_completions(db_path: &Path) -> Vec<String> {
    if !db_path.exists() {
        return Vec::new();
    }
    SqliteLibrary::open(db_path)
        .and_then(|library| library.blocked())
        .unwrap_or_default()
}

/// Print blocked track ids, one per line.
///
/// Used by shell completion systems for `moodmix unblock`.
///
/// # Errors
///
/// Never fails in practice; kept fallible to match the other commands.
pub fn print_blocked_completions() -> Result<()> {
    let Ok(db_path) = config::get_db_path() else {
        return Ok(());
    };
    for id in blocked_completions(&db_path) {
        println!("{id}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_shell_conversion() {
        assert_eq!(
            shell_to_completion_shell(crate::cli::Shell::Bash),
            CompletionShell::Bash
        );
        assert_eq!(
            shell_to_completion_shell(crate::cli::Shell::Zsh),
            CompletionShell::Zsh
        );
    }

    #[test]
    fn test_blocked_completions_missing_db() {
        let dir = TempDir::new().unwrap();
        assert!(blocked_completions(&dir.path().join("missing.db")).is_empty());
    }

    #[test]
    fn test_blocked_completions_lists_ids() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("library.db");
        let library = SqliteLibrary::open(&path).unwrap();
        library.block("b").unwrap();
        library.block("a").unwrap();
        drop(library);

        assert_eq!(blocked_completions(&path), ["a", "b"]);
    }
}
