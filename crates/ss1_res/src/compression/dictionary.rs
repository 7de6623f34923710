//! Phrase dictionary shared by the compressor and the decompressor.

use std::collections::HashMap;

use tracing::trace;

use super::{LITERAL_LIMIT, RESET_CODE};

/// Code of the root node. It stands for the empty phrase.
pub(crate) const ROOT: u16 = RESET_CODE;

#[derive(Debug, Clone, Copy)]
struct DictEntry {
    parent: u16,
    depth: u16,
    value: u8,
    first: u8,
}

/// Trie of phrases addressed by their code.
///
/// Nodes live in an arena indexed by code; the first [`LITERAL_LIMIT`] codes are the single
/// byte phrases and always present.
#[derive(Debug, Clone)]
pub(crate) struct Dictionary {
    entries: Vec<DictEntry>,
    children: HashMap<(u16, u8), u16>,
}

impl Dictionary {
    pub fn new() -> Self {
        let entries = (0..LITERAL_LIMIT)
            .map(|code| DictEntry {
                parent: ROOT,
                depth: 1,
                value: code as u8,
                first: code as u8,
            })
            .collect();

        Self {
            entries,
            children: HashMap::new(),
        }
    }

    /// Drops all phrases longer than a single byte
    pub fn reset(&mut self) {
        trace!(codes = self.entries.len(), "resetting dictionary");
        self.entries.truncate(LITERAL_LIMIT as usize);
        self.children.clear();
    }

    /// The code the next added phrase will receive
    pub fn next_code(&self) -> u16 {
        self.entries.len() as u16
    }

    /// Whether `code` names a phrase
    pub fn contains(&self, code: u16) -> bool {
        code < self.next_code()
    }

    /// The phrase extending `code` by `value`, if known
    pub fn child(&self, code: u16, value: u8) -> Option<u16> {
        if code == ROOT {
            return Some(value as u16);
        }
        self.children.get(&(code, value)).copied()
    }

    /// Adds the phrase `parent` + `value`, returning its code.
    ///
    /// Returns `None` without changes once all codes below [`RESET_CODE`] are in use.
    pub fn add(&mut self, parent: u16, value: u8) -> Option<u16> {
        let code = self.next_code();
        if code >= RESET_CODE {
            return None;
        }

        let parent_entry = self.entries[parent as usize];
        self.entries.push(DictEntry {
            parent,
            depth: parent_entry.depth + 1,
            value,
            first: parent_entry.first,
        });
        self.children.insert((parent, value), code);

        Some(code)
    }

    /// First byte of the phrase of `code`
    pub fn first_byte(&self, code: u16) -> u8 {
        self.entries[code as usize].first
    }

    /// Appends the phrase of `code` to `out`
    pub fn write_phrase(&self, code: u16, out: &mut Vec<u8>) {
        let start = out.len();
        let depth = self.entries[code as usize].depth as usize;
        out.resize(start + depth, 0);

        let mut index = start + depth;
        let mut current = code;
        while current != ROOT {
            let entry = self.entries[current as usize];
            index -= 1;
            out[index] = entry.value;
            current = entry.parent;
        }
    }
}
