//! Core library for the Tessella tile-activation language: graph
//! construction, the activation-queue engine, the variable manager, the
//! source preprocessor, and REPL utilities.

pub mod diagnostics;
pub mod engine;
pub mod graph;
pub mod prepper;
pub mod queue;
pub mod repl;
pub mod tile;
pub mod trace;
pub mod variables;

pub use diagnostics::{Diagnostic, DiagnosticKind, Result, TessellaError};
pub use engine::{Io, Program, PROGRAM_EXTENSION, SOURCE_EXTENSION, STDLIB_DIR};
pub use graph::TileGraph;
pub use queue::ActivationQueue;
pub use repl::Repl;
pub use tile::{Name, Symbol, Tile};
pub use variables::VariableManager;
