use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

pub mod bibliography;
pub mod parser;

// Commonly used regex patterns compiled once

// \citation{...} (bibtex), \abx@aux@cite{...} (biber) and \abx@aux@cite{0}{...} (biblatex 3.x)
static AUX_CITATION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\\(?:citation|abx@aux@cite(?:\{\d+\})?)\{(?P<keys>[^}]+)\}$")
        .expect("Invalid aux citation regex pattern")
});
// Warning--I didn't find a database entry for "..." (bibtex)
// WARN - I didn't find a database entry for '...' (biber)
static BLG_MISSING_ENTRY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"I didn't find a database entry for (?:"(?P<dq>[^"]+)"|'(?P<sq>[^']+)')"#)
        .expect("Invalid blg warning regex pattern")
});
static BLG_DATABASE_FILE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^Database file #1: (?P<file>.*)$").expect("Invalid blg database file regex pattern")
});

/// Control keys written into the aux file by revtex styles.
pub const DEFAULT_BLACKLISTED_KEYS: [&str; 4] = [
    // revtex-4.1
    "REVTEX41Control",
    "apsrev41Control",
    // revtex-4.2
    "REVTEX42Control",
    "apsrev42Control",
];

/// Set of citation keys that are never looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blacklist {
    keys: HashSet<String>,
}

impl Default for Blacklist {
    fn default() -> Self {
        Self::new(DEFAULT_BLACKLISTED_KEYS)
    }
}

impl Blacklist {
    pub fn new<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    /// A blacklist that lets every key through.
    pub fn empty() -> Self {
        Self {
            keys: HashSet::new(),
        }
    }

    /// Return a copy with the given keys added.
    pub fn with_keys<I, K>(&self, extra: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let mut keys = self.keys.clone();
        keys.extend(extra.into_iter().map(Into::into));
        Self { keys }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Flatten comma separated key payloads into a deduplicated list.
///
/// Keys keep the order of their first appearance. Whitespace around each key
/// is trimmed, empty fragments are dropped and blacklisted keys are removed.
fn collect_keys<'a, I>(payloads: I, blacklist: &Blacklist) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    payloads
        .into_iter()
        .flat_map(|payload| payload.split(','))
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .filter(|key| !blacklist.contains(key))
        .filter(|key| seen.insert(key.to_string()))
        .map(str::to_string)
        .collect()
}
