use rustyline::{error::ReadlineError, DefaultEditor};

use crate::{
    diagnostics::{Result, TessellaError},
    engine::Program,
    prepper,
};

/// Interactive line-at-a-time execution. Every line is preprocessed and
/// run as a fresh program instance; nothing carries over between lines.
pub struct Repl;

impl Repl {
    pub fn new() -> Self {
        Self
    }

    pub fn run(&mut self) -> Result<()> {
        let mut editor = DefaultEditor::new().map_err(|err| {
            TessellaError::from(std::io::Error::new(std::io::ErrorKind::Other, err))
        })?;
        loop {
            match editor.readline("~> ") {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed == ":quit" || trimmed == ":exit" {
                        break;
                    }
                    if trimmed.is_empty() {
                        continue;
                    }
                    editor.add_history_entry(trimmed).ok();
                    let prepared = prepper::prepare(trimmed, false);
                    match Program::from_source(&prepared) {
                        Ok(mut program) => {
                            if let Err(err) = program.run_stdio() {
                                eprintln!("error: {err}");
                            } else {
                                println!();
                            }
                        }
                        Err(TessellaError::Diagnostic(diag)) => {
                            eprintln!("{:?}: {}", diag.kind, diag.message);
                        }
                        Err(other) => eprintln!("error: {other}"),
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(err) => {
                    return Err(TessellaError::from(std::io::Error::new(
                        std::io::ErrorKind::Other,
                        err,
                    )));
                }
            }
        }
        Ok(())
    }
}

impl Default for Repl {
    fn default() -> Self {
        Self::new()
    }
}
