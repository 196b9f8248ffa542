use std::fmt;

use thiserror::Error;

/// Classification of a diagnostic event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// A program file could not be located or read.
    Load,
    /// Remote-activator linking failed while building the tile graph.
    Link,
    /// A fault raised while cycling tiles.
    Runtime,
}

/// Rich diagnostic information surfaced to end users.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub tile: Option<usize>,
    pub notes: Vec<String>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            tile: None,
            notes: Vec::new(),
        }
    }

    pub fn with_tile(mut self, tile: usize) -> Self {
        self.tile = Some(tile);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)?;
        if let Some(tile) = self.tile {
            write!(f, " (tile {tile})")?;
        }
        for note in &self.notes {
            write!(f, "\n  note: {note}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostic {}

/// Unified error type for the Tessella toolchain.
#[derive(Debug, Error)]
pub enum TessellaError {
    #[error("{0}")]
    Diagnostic(#[from] Diagnostic),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TessellaError>;
