use crate::tile::{Name, Segment};

#[derive(Debug, Clone)]
struct Slot {
    name: String,
    value: i64,
}

enum Probe {
    /// The name occupies this slot.
    Found(usize),
    /// The name is absent; this is the first free slot on its probe path.
    Free(usize),
    /// Every slot was probed without a match or a free slot.
    Full,
}

/// Holds every named integer variable for one program instance.
///
/// The backing store is an open-addressing table with linear probing. It
/// starts at capacity 1 and doubles (with a full rehash) whenever a
/// mutation cannot find a free slot. Pure reads never resize: a full-table
/// miss reads as the absent value 0.
#[derive(Debug)]
pub struct VariableManager {
    slots: Vec<Option<Slot>>,
    occupied: usize,
}

impl VariableManager {
    pub fn new() -> Self {
        Self {
            slots: vec![None],
            occupied: 0,
        }
    }

    /// Expands indirection spans in `name` into a flat variable name: each
    /// `:inner:` span is replaced by the current value of `inner`, written
    /// in decimal. With `i` holding 3, `arr:i:` resolves to `arr3`.
    pub fn resolve(&self, name: &Name) -> String {
        let mut resolved = String::new();
        for segment in name.segments() {
            match segment {
                Segment::Literal(text) => resolved.push_str(text),
                Segment::Indirect(inner) => {
                    let inner_name = self.resolve(&Name::parse(inner));
                    let value = self.lookup(&inner_name);
                    resolved.push_str(&value.to_string());
                }
            }
        }
        resolved
    }

    /// Returns the stored value, or 0 if the variable is absent.
    pub fn get(&self, name: &Name) -> i64 {
        let resolved = self.resolve(name);
        self.lookup(&resolved)
    }

    /// Creates the variable if absent, otherwise overwrites its value.
    pub fn set(&mut self, name: &Name, value: i64) {
        let resolved = self.resolve(name);
        let index = self.slot_for(&resolved);
        match &mut self.slots[index] {
            Some(slot) => slot.value = value,
            empty => {
                *empty = Some(Slot {
                    name: resolved,
                    value,
                });
                self.occupied += 1;
            }
        }
    }

    /// Adds or subtracts 1, creating the variable at 0 first if absent.
    pub fn increment(&mut self, name: &Name, up: bool) {
        let resolved = self.resolve(name);
        let index = self.slot_for(&resolved);
        let delta = if up { 1 } else { -1 };
        match &mut self.slots[index] {
            Some(slot) => slot.value += delta,
            empty => {
                *empty = Some(Slot {
                    name: resolved,
                    value: delta,
                });
                self.occupied += 1;
            }
        }
    }

    /// Deletes the variable; absent names are a no-op.
    pub fn remove(&mut self, name: &Name) {
        let resolved = self.resolve(name);
        if let Probe::Found(index) = self.probe(&resolved) {
            self.slots[index] = None;
            self.occupied -= 1;
        }
    }

    /// Number of live variables.
    pub fn len(&self) -> usize {
        self.occupied
    }

    pub fn is_empty(&self) -> bool {
        self.occupied == 0
    }

    /// Current table capacity, including free slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Read-only lookup of an already-resolved name.
    fn lookup(&self, resolved: &str) -> i64 {
        match self.probe(resolved) {
            Probe::Found(index) => match &self.slots[index] {
                Some(slot) => slot.value,
                None => 0,
            },
            Probe::Free(_) | Probe::Full => 0,
        }
    }

    /// Finds the slot a mutation should use, expanding the table until the
    /// probe path yields a match or a free slot.
    fn slot_for(&mut self, resolved: &str) -> usize {
        loop {
            match self.probe(resolved) {
                Probe::Found(index) | Probe::Free(index) => return index,
                Probe::Full => self.expand(),
            }
        }
    }

    fn probe(&self, resolved: &str) -> Probe {
        let capacity = self.slots.len();
        let mut index = hash(resolved, capacity);
        for _ in 0..capacity {
            match &self.slots[index] {
                None => return Probe::Free(index),
                Some(slot) if slot.name == resolved => return Probe::Found(index),
                Some(_) => index = (index + 1) % capacity,
            }
        }
        Probe::Full
    }

    /// Doubles the capacity and rehashes every occupied slot. Colliding
    /// entries may land in a different relative order than before.
    fn expand(&mut self) {
        let capacity = self.slots.len() * 2;
        let old_slots = std::mem::replace(&mut self.slots, vec![None; capacity]);
        for slot in old_slots.into_iter().flatten() {
            let mut index = hash(&slot.name, capacity);
            while self.slots[index].is_some() {
                index = (index + 1) % capacity;
            }
            self.slots[index] = Some(slot);
        }
    }
}

impl Default for VariableManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Polynomial string hash reduced mod `capacity` at every step, so the
/// probe start is deterministic for a given (name, capacity) pair.
fn hash(name: &str, capacity: usize) -> usize {
    name.bytes().fold(0usize, |acc, byte| {
        (acc.wrapping_mul(31).wrapping_add(byte as usize)) % capacity
    })
}
