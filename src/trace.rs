use std::io::{self, Write};

use crate::engine::Program;

/// Writes one row per tile: index, symbol, 1-based queue position (0 when
/// not queued), raw attached name, and the name's current value. Purely
/// observational; execution never depends on it.
pub fn dump(program: &Program, out: &mut dyn Write) -> io::Result<()> {
    writeln!(
        out,
        "instance {} ({} tiles, {} queued)",
        program.instance(),
        program.graph().len(),
        program.queue().len()
    )?;
    writeln!(
        out,
        "{:>4} | {:>2} | {:>5} | {:>10} | {:>6}",
        "Loc", "T", "Act", "Point", "Value"
    )?;
    writeln!(out, "--------------------------------------------")?;
    for tile in program.graph().tiles() {
        let position = program.queue().position(tile.index).unwrap_or(0);
        writeln!(
            out,
            "{:>4} | {:>2} | {:>5} | {:>10} | {:>6}",
            tile.index,
            tile.symbol.as_char(),
            position,
            tile.name.raw(),
            program.variables().get(&tile.name)
        )?;
    }
    writeln!(out)
}
