//! I/O boundary traits for testability
//!
//! These traits abstract external I/O operations, allowing services
//! to be tested with mock implementations.

use std::fmt;
use std::io::{self, BufRead, Write};
use std::path::Path;

use tempfile::NamedTempFile;

/// Filesystem abstraction for testability.
pub trait FileSystem: Send + Sync {
    /// Read file contents to string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Replace the file content; readers never observe a partial write.
    fn write(&self, path: &Path, content: &str) -> io::Result<()>;

    /// Check if path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Create parent directories if needed.
    fn ensure_parent(&self, path: &Path) -> io::Result<()>;
}

/// Answer to a save/delete confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Yes,
    No,
    Cancel,
}

impl fmt::Display for Confirmation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Confirmation::Yes => f.write_str("yes"),
            Confirmation::No => f.write_str("no"),
            Confirmation::Cancel => f.write_str("cancel"),
        }
    }
}

/// Synchronous yes/no/cancel question; the caller blocks until answered.
pub trait Prompter: Send + Sync {
    fn confirm(&self, question: &str) -> Confirmation;
}

// ============================================================
// REAL IMPLEMENTATIONS
// ============================================================

/// Real filesystem implementation.
#[derive(Debug, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    /// Writes into a sibling temp file and renames it over `path`.
    fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        self.ensure_parent(path)?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn ensure_parent(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}

/// Asks on stderr, reads the answer from stdin. EOF or garbage cancels.
#[derive(Debug, Default)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn confirm(&self, question: &str) -> Confirmation {
        eprint!("{question} [y]es/[n]o/[c]ancel: ");
        io::stderr().flush().ok();
        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(0) | Err(_) => Confirmation::Cancel,
            Ok(_) => parse_answer(&answer),
        }
    }
}

/// Always gives the same answer (`--yes`, scripted use).
#[derive(Debug, Clone, Copy)]
pub struct FixedPrompter(pub Confirmation);

impl Prompter for FixedPrompter {
    fn confirm(&self, _question: &str) -> Confirmation {
        self.0
    }
}

fn parse_answer(answer: &str) -> Confirmation {
    match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" | "s" | "save" => Confirmation::Yes,
        "n" | "no" => Confirmation::No,
        _ => Confirmation::Cancel,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_answers_when_parsing_then_unknown_cancels() {
        assert_eq!(parse_answer("Y\n"), Confirmation::Yes);
        assert_eq!(parse_answer(" no "), Confirmation::No);
        assert_eq!(parse_answer("maybe"), Confirmation::Cancel);
        assert_eq!(parse_answer(""), Confirmation::Cancel);
    }
}
