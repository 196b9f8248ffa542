use crate::{
    diagnostics::{Diagnostic, DiagnosticKind, Result},
    tile::{Name, Symbol, Tile},
};

/// The ordered, fixed-length sequence of tiles built from preprocessed
/// source text. Immutable once `parse` returns; the activation queue works
/// with indices into it.
#[derive(Debug)]
pub struct TileGraph {
    tiles: Vec<Tile>,
    initial: Vec<usize>,
}

impl TileGraph {
    /// Scans one line of preprocessed text into tiles.
    ///
    /// Every character that is not alphanumeric, `:`, or `.` starts a tile;
    /// the alphanumeric/`:` run after it is the tile's attached name
    /// (defaulting to `"0"`). A `.` marks the next tile for initial
    /// activation. Scanning stops at the first newline; name characters
    /// attached to no tile are skipped.
    pub fn parse(source: &str) -> Result<Self> {
        let chars: Vec<char> = source.chars().collect();
        let mut tiles = Vec::new();
        let mut initial = Vec::new();
        let mut activate_next = false;
        let mut cursor = 0;
        while cursor < chars.len() {
            let ch = chars[cursor];
            if ch == '\n' {
                break;
            }
            if ch == '\r' || is_name_char(ch) {
                cursor += 1;
                continue;
            }
            if ch == '.' {
                activate_next = true;
                cursor += 1;
                continue;
            }
            let name_start = cursor + 1;
            let mut name_end = name_start;
            while name_end < chars.len() && is_name_char(chars[name_end]) {
                name_end += 1;
            }
            let name_text: String = if name_end > name_start {
                chars[name_start..name_end].iter().collect()
            } else {
                String::from("0")
            };
            let index = tiles.len();
            tiles.push(Tile::new(
                index,
                Symbol::from_char(ch),
                Name::parse(&name_text),
            ));
            if activate_next {
                activate_next = false;
                initial.push(index);
            }
            cursor = name_end;
        }
        let mut graph = Self { tiles, initial };
        graph.link_remote_activators()?;
        Ok(graph)
    }

    pub fn tile(&self, index: usize) -> &Tile {
        &self.tiles[index]
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Indices of the tiles marked by `.` initializers, in source order.
    pub fn initial_activations(&self) -> &[usize] {
        &self.initial
    }

    /// Binds every remote activator to the nearest tile sharing its raw
    /// name, searching one step left and one step right per round. The
    /// left side is checked first, so an equidistant pair resolves left.
    fn link_remote_activators(&mut self) -> Result<()> {
        let len = self.tiles.len();
        for index in 0..len {
            if self.tiles[index].symbol != Symbol::RemoteActivator {
                continue;
            }
            let wanted = self.tiles[index].name.raw().to_string();
            let mut target = None;
            let mut distance = 1;
            loop {
                let left = index.checked_sub(distance);
                let right = Some(index + distance).filter(|&r| r < len);
                if left.is_none() && right.is_none() {
                    break;
                }
                if let Some(candidate) = left.filter(|&l| self.is_link_target(l, &wanted)) {
                    target = Some(candidate);
                    break;
                }
                if let Some(candidate) = right.filter(|&r| self.is_link_target(r, &wanted)) {
                    target = Some(candidate);
                    break;
                }
                distance += 1;
            }
            match target {
                Some(resolved) => self.tiles[index].target = Some(resolved),
                None => {
                    return Err(Diagnostic::new(
                        DiagnosticKind::Link,
                        format!("remote activator `{wanted}` has no matching tile"),
                    )
                    .with_tile(index)
                    .into());
                }
            }
        }
        Ok(())
    }

    fn is_link_target(&self, index: usize, wanted: &str) -> bool {
        let tile = &self.tiles[index];
        tile.symbol != Symbol::RemoteActivator && tile.name.raw() == wanted
    }
}

fn is_name_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == ':'
}
