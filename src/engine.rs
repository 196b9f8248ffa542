use std::{
    collections::VecDeque,
    fs,
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
};

use crate::{
    diagnostics::{Diagnostic, DiagnosticKind, Result},
    graph::TileGraph,
    queue::ActivationQueue,
    tile::{Name, Symbol},
    trace,
    variables::VariableManager,
};

/// Extension of preprocessed program files.
pub const PROGRAM_EXTENSION: &str = "ptes";
/// Extension of raw source files.
pub const SOURCE_EXTENSION: &str = "tes";
/// Subdirectory searched for callee files after the base directory.
pub const STDLIB_DIR: &str = "stdlib";

/// The streams a program reads from and writes to. Integration tests pass
/// in-memory buffers; the CLI passes locked stdin/stdout.
pub struct Io<'a> {
    pub input: &'a mut dyn BufRead,
    pub output: &'a mut dyn Write,
}

#[derive(Debug, Clone)]
struct ReturnHolder {
    name: Name,
    value: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Left,
    Right,
}

impl Direction {
    /// One step along the array, `None` past either edge.
    fn step(self, from: usize, len: usize) -> Option<usize> {
        match self {
            Direction::Left => from.checked_sub(1),
            Direction::Right => Some(from + 1).filter(|&next| next < len),
        }
    }
}

/// One program instance: a tile graph, its variables, and its activation
/// queue. Nested function calls build fresh instances; nothing is shared
/// with the caller beyond the parameter/return copies made at the call
/// boundary.
#[derive(Debug)]
pub struct Program {
    graph: TileGraph,
    variables: VariableManager,
    queue: ActivationQueue,
    parameters: VecDeque<i64>,
    returns: Vec<ReturnHolder>,
    next_return: usize,
    base: PathBuf,
    depth: usize,
    trace: bool,
}

impl Program {
    /// Builds a top-level instance from preprocessed source text.
    pub fn from_source(source: &str) -> Result<Self> {
        Self::build(source, PathBuf::from("."), VecDeque::new(), Vec::new(), 0)
    }

    /// Builds a top-level instance from a preprocessed program file.
    pub fn load(path: &Path) -> Result<Self> {
        let source = read_program(path)?;
        Self::build(&source, PathBuf::from("."), VecDeque::new(), Vec::new(), 0)
    }

    fn build(
        source: &str,
        base: PathBuf,
        parameters: VecDeque<i64>,
        returns: Vec<ReturnHolder>,
        depth: usize,
    ) -> Result<Self> {
        let graph = TileGraph::parse(source)?;
        let mut queue = ActivationQueue::new(graph.len());
        for &index in graph.initial_activations() {
            queue.push(index);
        }
        Ok(Self {
            graph,
            variables: VariableManager::new(),
            queue,
            parameters,
            returns,
            next_return: 0,
            base,
            depth,
            trace: false,
        })
    }

    /// Directory callee files resolve against. Callees inherit it.
    pub fn with_base(mut self, base: impl Into<PathBuf>) -> Self {
        self.base = base.into();
        self
    }

    /// Dumps the tile array to stderr after every cycle of this instance.
    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    pub fn graph(&self) -> &TileGraph {
        &self.graph
    }

    pub fn variables(&self) -> &VariableManager {
        &self.variables
    }

    pub fn queue(&self) -> &ActivationQueue {
        &self.queue
    }

    /// Nesting depth: 0 for the top-level program, +1 per function call.
    pub fn instance(&self) -> usize {
        self.depth
    }

    /// Drives the instance until its activation queue is empty. That is
    /// the sole terminal state; a program that keeps re-activating tiles
    /// runs forever.
    pub fn run(&mut self, io: &mut Io<'_>) -> Result<()> {
        while let Some(index) = self.queue.pop() {
            self.cycle(index, io)?;
            if self.trace {
                let stderr = io::stderr();
                let mut handle = stderr.lock();
                trace::dump(self, &mut handle)?;
            }
        }
        Ok(())
    }

    /// Runs against the process's stdin/stdout.
    pub fn run_stdio(&mut self) -> Result<()> {
        let stdin = io::stdin();
        let stdout = io::stdout();
        let mut input = stdin.lock();
        let mut output = stdout.lock();
        let mut io = Io {
            input: &mut input,
            output: &mut output,
        };
        self.run(&mut io)?;
        output.flush()?;
        Ok(())
    }

    /// Executes one tile's semantics.
    fn cycle(&mut self, index: usize, io: &mut Io<'_>) -> Result<()> {
        match self.graph.tile(index).symbol {
            Symbol::ActivateRight => self.propagate(index, Direction::Right),
            Symbol::ActivateLeft => self.propagate(index, Direction::Left),
            Symbol::PokeRight => {
                if let Some(next) = Direction::Right.step(index, self.graph.len()) {
                    self.queue.push(next);
                }
            }
            Symbol::PokeLeft => {
                if let Some(next) = Direction::Left.step(index, self.graph.len()) {
                    self.queue.push(next);
                }
            }
            Symbol::DeactivateLeft => self.withdraw(index, Direction::Left),
            Symbol::DeactivateRight => self.withdraw(index, Direction::Right),
            Symbol::RemoteActivator => {
                if let Some(target) = self.graph.tile(index).target {
                    self.queue.push(target);
                }
            }
            Symbol::Comparator => {
                let left = self.side_value(index, Direction::Left);
                let right = self.side_value(index, Direction::Right);
                // Ties fall left.
                if right > left {
                    self.propagate(index, Direction::Right);
                } else {
                    self.propagate(index, Direction::Left);
                }
            }
            Symbol::Assignment => {
                let left = self.reference_value(index, Direction::Left);
                let right = self.reference_value(index, Direction::Right);
                self.variables
                    .set(&self.graph.tile(index).name, left + right);
            }
            Symbol::Successor => self.variables.increment(&self.graph.tile(index).name, true),
            Symbol::Predecessor => self.variables.increment(&self.graph.tile(index).name, false),
            Symbol::IntegerInput => {
                let input = match read_integer(io.input)? {
                    Some(value) => value,
                    None => {
                        log::warn!("no integer available on input; using 0");
                        0
                    }
                };
                // Walked in unit steps rather than overwritten; each step
                // re-resolves the name.
                let current = self.variables.get(&self.graph.tile(index).name);
                let difference = input - current;
                for _ in 0..difference.unsigned_abs() {
                    self.variables
                        .increment(&self.graph.tile(index).name, difference > 0);
                }
            }
            Symbol::ParameterInput => match self.parameters.pop_front() {
                Some(value) => self.variables.set(&self.graph.tile(index).name, value),
                None => {
                    log::warn!(
                        "no parameters remain; setting `{}` to 0",
                        self.graph.tile(index).name
                    );
                    self.variables.set(&self.graph.tile(index).name, 0);
                }
            },
            Symbol::Destructor => self.variables.remove(&self.graph.tile(index).name),
            Symbol::Call => self.invoke(index, io)?,
            Symbol::IntegerOutput => {
                let value = self.variables.get(&self.graph.tile(index).name);
                write!(io.output, "{value}")?;
            }
            Symbol::CharOutput => {
                let value = self.variables.get(&self.graph.tile(index).name);
                let ch = u32::try_from(value)
                    .ok()
                    .and_then(char::from_u32)
                    .unwrap_or(char::REPLACEMENT_CHARACTER);
                write!(io.output, "{ch}")?;
            }
            Symbol::NewlineOutput => writeln!(io.output)?,
            Symbol::ReturnValue => {
                if self.next_return < self.returns.len() {
                    let value = self.variables.get(&self.graph.tile(index).name);
                    self.returns[self.next_return].value = value;
                    self.next_return += 1;
                }
            }
            Symbol::Blocker | Symbol::Unit | Symbol::Reference | Symbol::Other(_) => {}
        }
        Ok(())
    }

    /// Activates successive tiles away from `from`. A blocker stops the
    /// scan before being queued; a poke tile is queued and then stops it.
    fn propagate(&mut self, from: usize, direction: Direction) {
        let mut cursor = from;
        while let Some(next) = direction.step(cursor, self.graph.len()) {
            match self.graph.tile(next).symbol {
                Symbol::Blocker => break,
                Symbol::PokeRight | Symbol::PokeLeft => {
                    self.queue.push(next);
                    break;
                }
                _ => self.queue.push(next),
            }
            cursor = next;
        }
    }

    /// Removes successive tiles from the queue until a blocker (exclusive)
    /// or the edge.
    fn withdraw(&mut self, from: usize, direction: Direction) {
        let mut cursor = from;
        while let Some(next) = direction.step(cursor, self.graph.len()) {
            if self.graph.tile(next).symbol == Symbol::Blocker {
                break;
            }
            self.queue.remove(next);
            cursor = next;
        }
    }

    /// Value of one comparator side: a reference reads its variable, a
    /// unit starts a consecutive-unit count, anything else (or the edge)
    /// is 0.
    fn side_value(&self, index: usize, direction: Direction) -> i64 {
        let Some(neighbor) = direction.step(index, self.graph.len()) else {
            return 0;
        };
        match self.graph.tile(neighbor).symbol {
            Symbol::Reference => self.variables.get(&self.graph.tile(neighbor).name),
            Symbol::Unit => {
                let mut count = 0;
                let mut cursor = Some(neighbor);
                while let Some(at) = cursor {
                    if self.graph.tile(at).symbol != Symbol::Unit {
                        break;
                    }
                    count += 1;
                    cursor = direction.step(at, self.graph.len());
                }
                count
            }
            _ => 0,
        }
    }

    /// The adjacent tile's variable value if it is a reference, else 0.
    fn reference_value(&self, index: usize, direction: Direction) -> i64 {
        match direction.step(index, self.graph.len()) {
            Some(neighbor) if self.graph.tile(neighbor).symbol == Symbol::Reference => {
                self.variables.get(&self.graph.tile(neighbor).name)
            }
            _ => 0,
        }
    }

    /// Runs another program file to completion: references left of the
    /// call tile supply value snapshots (nearest first), references right
    /// of it name the variables filled from the callee's return tiles.
    fn invoke(&mut self, index: usize, io: &mut Io<'_>) -> Result<()> {
        let mut parameters = VecDeque::new();
        let mut cursor = index;
        while let Some(previous) = cursor.checked_sub(1) {
            let tile = self.graph.tile(previous);
            if tile.symbol != Symbol::Reference {
                break;
            }
            parameters.push_back(self.variables.get(&tile.name));
            cursor = previous;
        }

        let mut returns = Vec::new();
        let mut cursor = index + 1;
        while cursor < self.graph.len() {
            let tile = self.graph.tile(cursor);
            if tile.symbol != Symbol::Reference {
                break;
            }
            returns.push(ReturnHolder {
                name: tile.name.clone(),
                value: 0,
            });
            cursor += 1;
        }

        let path = self.resolve_callee(self.graph.tile(index).name.raw())?;
        let source = read_program(&path)?;
        let mut callee = Program::build(
            &source,
            self.base.clone(),
            parameters,
            returns,
            self.depth + 1,
        )?;
        callee.run(io)?;

        // Every declared holder copies back, filled or not.
        for holder in callee.returns {
            self.variables.set(&holder.name, holder.value);
        }
        Ok(())
    }

    /// `<name>.ptes` in the base directory, then in its stdlib/ fallback.
    fn resolve_callee(&self, name: &str) -> Result<PathBuf> {
        let filename = format!("{name}.{PROGRAM_EXTENSION}");
        let direct = self.base.join(&filename);
        if direct.is_file() {
            return Ok(direct);
        }
        let fallback = self.base.join(STDLIB_DIR).join(&filename);
        if fallback.is_file() {
            return Ok(fallback);
        }
        Err(Diagnostic::new(
            DiagnosticKind::Load,
            format!("file `{filename}` does not exist"),
        )
        .with_note(format!("also tried `{}`", fallback.display()))
        .into())
    }
}

fn read_program(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|err| {
        Diagnostic::new(
            DiagnosticKind::Load,
            format!("could not read program file `{}`: {err}", path.display()),
        )
        .into()
    })
}

/// Reads one whitespace-delimited token and parses it as an integer.
/// Returns `None` at end of input or for a token that does not parse.
fn read_integer(input: &mut dyn BufRead) -> io::Result<Option<i64>> {
    let mut token = Vec::new();
    loop {
        let available = input.fill_buf()?;
        if available.is_empty() {
            break;
        }
        let mut used = 0;
        let mut finished = false;
        for &byte in available {
            used += 1;
            if byte.is_ascii_whitespace() {
                if token.is_empty() {
                    continue;
                }
                finished = true;
                break;
            }
            token.push(byte);
        }
        input.consume(used);
        if finished {
            break;
        }
    }
    if token.is_empty() {
        return Ok(None);
    }
    let text = String::from_utf8_lossy(&token);
    match text.parse::<i64>() {
        Ok(value) => Ok(Some(value)),
        Err(_) => {
            log::warn!("input token `{text}` is not an integer");
            Ok(None)
        }
    }
}
