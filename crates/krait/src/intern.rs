//! String interning for identifiers and string literals.
//!
//! The interner stores unique strings in a vector and hands out `StringId`
//! indices for cheap storage and comparison. It is populated during lexing and
//! parsing, then grows on demand at runtime (property keys, concatenation
//! results are *not* interned; only names that are compared frequently are).
//!
//! Ids 0..128 are reserved for the single-character ASCII strings so that
//! one-character lookups never allocate.

use ahash::AHashMap;

/// Index into the interner's storage.
///
/// Uses `u32` to keep AST nodes small. ~4 billion unique names is far more
/// than any script produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StringId(u32);

impl StringId {
    /// The interned empty string.
    pub const EMPTY: Self = Self(128);

    /// Returns the raw index value.
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Returns the StringId for a single ASCII byte.
    #[inline]
    #[must_use]
    pub fn from_ascii(byte: u8) -> Self {
        debug_assert!(byte < 128);
        Self(u32::from(byte))
    }
}

/// Interned string storage shared by the parser and the runtime.
///
/// Lookup by content is backed by an `AHashMap` reverse index; lookup by id is
/// a direct vector index.
#[derive(Debug)]
pub struct Interns {
    strings: Vec<String>,
    by_content: AHashMap<String, StringId>,
}

impl Default for Interns {
    fn default() -> Self {
        Self::new()
    }
}

impl Interns {
    /// Creates an interner pre-seeded with the 128 ASCII single-character
    /// strings and the empty string.
    #[must_use]
    pub fn new() -> Self {
        let mut strings: Vec<String> = (0u8..128).map(|b| char::from(b).to_string()).collect();
        strings.push(String::new());
        let mut by_content = AHashMap::with_capacity(strings.len());
        for (i, s) in strings.iter().enumerate() {
            by_content.insert(s.clone(), StringId(u32::try_from(i).expect("seed table fits u32")));
        }
        Self { strings, by_content }
    }

    /// Interns a string, returning its id. Re-interning returns the same id.
    pub fn intern(&mut self, s: &str) -> StringId {
        if s.len() == 1 && s.as_bytes()[0] < 128 {
            return StringId::from_ascii(s.as_bytes()[0]);
        }
        if let Some(&id) = self.by_content.get(s) {
            return id;
        }
        let id = StringId(u32::try_from(self.strings.len()).expect("interner overflow"));
        self.strings.push(s.to_owned());
        self.by_content.insert(s.to_owned(), id);
        id
    }

    /// Interns an owned string without copying when it is new.
    pub fn intern_owned(&mut self, s: String) -> StringId {
        if let Some(&id) = self.by_content.get(s.as_str()) {
            return id;
        }
        let id = StringId(u32::try_from(self.strings.len()).expect("interner overflow"));
        self.by_content.insert(s.clone(), id);
        self.strings.push(s);
        id
    }

    /// Returns the string for an id.
    #[inline]
    #[must_use]
    pub fn get(&self, id: StringId) -> &str {
        &self.strings[id.index()]
    }

    /// Returns the id for a string if it has been interned.
    #[must_use]
    pub fn lookup(&self, s: &str) -> Option<StringId> {
        if s.len() == 1 && s.as_bytes()[0] < 128 {
            return Some(StringId::from_ascii(s.as_bytes()[0]));
        }
        self.by_content.get(s).copied()
    }

    /// Number of interned strings (including the ASCII seed table).
    #[must_use]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Always false: the ASCII seed table is present from construction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Identifier for a parsed function definition.
///
/// Function bodies are stored once in the engine's function table; closures
/// and generator instances reference them by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FunctionId(u32);

impl FunctionId {
    pub(crate) fn new(index: usize) -> Self {
        Self(u32::try_from(index).expect("function table overflow"))
    }

    /// Returns the raw index value.
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Identifier for a host-registered function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HostFnId(pub(crate) u32);

impl HostFnId {
    /// Returns the raw index value.
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_fast_path() {
        let mut interns = Interns::new();
        assert_eq!(interns.intern("a"), StringId::from_ascii(b'a'));
        assert_eq!(interns.get(StringId::from_ascii(b'a')), "a");
        assert_eq!(interns.intern(""), StringId::EMPTY);
    }

    #[test]
    fn dedup() {
        let mut interns = Interns::new();
        let hello = interns.intern("hello");
        assert_eq!(interns.intern("hello"), hello);
        assert_eq!(interns.intern_owned("hello".to_owned()), hello);
        assert_eq!(interns.get(hello), "hello");
        assert_ne!(interns.intern("world"), hello);
    }
}
