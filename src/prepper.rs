use std::{
    fs,
    path::{Path, PathBuf},
};

use indexmap::IndexMap;

use crate::{
    diagnostics::Result,
    engine::{PROGRAM_EXTENSION, SOURCE_EXTENSION},
};

const BASE62: &[u8; 62] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Insertion-ordered table assigning each long name a short base-62 id.
/// Ids start at 1; `0` stays reserved for the unnamed-tile default.
struct NameTable {
    assigned: IndexMap<String, usize>,
}

impl NameTable {
    fn new() -> Self {
        Self {
            assigned: IndexMap::new(),
        }
    }

    fn short(&mut self, name: &str) -> String {
        if let Some(&id) = self.assigned.get(name) {
            return base62(id);
        }
        let id = self.assigned.len() + 1;
        self.assigned.insert(name.to_string(), id);
        base62(id)
    }
}

fn base62(mut value: usize) -> String {
    if value == 0 {
        return String::from("0");
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE62[value % 62] as char);
        value /= 62;
    }
    digits.into_iter().rev().collect()
}

/// Translates raw source into the flat format the engine consumes:
/// `#` comments run to end of line, newlines become blockers (consecutive
/// blockers collapse), spaces/tabs are dropped. With `minify`, each
/// alphanumeric name run is replaced by a short id — except the name
/// attached to a function-call tile, which names a file on disk.
pub fn prepare(source: &str, minify: bool) -> String {
    let mut out = String::new();
    let mut names = NameTable::new();
    let mut in_comment = false;
    let mut name = String::new();
    let mut last_emitted = '\0';
    let mut last_symbol = '\0';
    for raw in source.chars() {
        let mut ch = raw;
        if ch == '#' {
            in_comment = true;
            continue;
        }
        if ch == '\n' {
            in_comment = false;
            ch = '_';
        }
        if in_comment || ch == ' ' || ch == '\t' || ch == '\r' {
            continue;
        }
        if minify && ch.is_alphanumeric() && last_symbol != '&' {
            name.push(ch);
            continue;
        }
        if !name.is_empty() {
            out.push_str(&names.short(&name));
            name.clear();
        }
        if ch == '_' && last_emitted == '_' {
            continue;
        }
        out.push(ch);
        last_emitted = ch;
        if !ch.is_alphanumeric() {
            last_symbol = ch;
        }
    }
    if !name.is_empty() {
        out.push_str(&names.short(&name));
    }
    out
}

/// Preprocesses `path` and writes the result next to it as `<stem>.ptes`.
pub fn prepare_file(path: &Path, minify: bool) -> Result<PathBuf> {
    if path.extension().and_then(|ext| ext.to_str()) != Some(SOURCE_EXTENSION) {
        log::warn!(
            "`{}` does not have a .{SOURCE_EXTENSION} extension",
            path.display()
        );
    }
    let source = fs::read_to_string(path)?;
    let prepared = prepare(&source, minify);
    let target = path.with_extension(PROGRAM_EXTENSION);
    fs::write(&target, prepared)?;
    Ok(target)
}
