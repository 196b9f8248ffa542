use std::path::PathBuf;

use clap::{Parser, Subcommand};

use tessella::{prepper, Program, Repl, TessellaError};

#[derive(Parser)]
#[command(author, version, about = "Tessella tile language interpreter")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a preprocessed tile program
    Run {
        program: PathBuf,
        /// Dump the tile array to stderr after every cycle
        #[arg(short = 's', long)]
        trace: bool,
    },
    /// Preprocess raw source files into runnable tile text
    Prep {
        sources: Vec<PathBuf>,
        /// Replace variable names with short ids
        #[arg(short, long)]
        minify: bool,
    },
    /// Preprocess and run a snippet of raw tile source
    Eval { source: String },
    /// Start an interactive session
    Repl,
}

fn main() -> Result<(), TessellaError> {
    env_logger::Builder::from_default_env().init();
    let args = Args::parse();
    match args.command.unwrap_or(Command::Repl) {
        Command::Run { program, trace } => {
            let mut instance = Program::load(&program)?.with_trace(trace);
            instance.run_stdio()
        }
        Command::Prep { sources, minify } => {
            for source in sources {
                let target = prepper::prepare_file(&source, minify)?;
                println!("{}", target.display());
            }
            Ok(())
        }
        Command::Eval { source } => {
            let prepared = prepper::prepare(&source, false);
            let mut instance = Program::from_source(&prepared)?;
            instance.run_stdio()
        }
        Command::Repl => {
            let mut repl = Repl::new();
            repl.run()
        }
    }
}
