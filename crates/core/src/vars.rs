// SPDX-License-Identifier: MIT

//! Variable environments threaded through hub interpretation

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Variable holding the directory of the owning hub.
pub const CUR_DIR: &str = "cur-dir";

/// A name→value environment for `{name}` substitutions.
///
/// The mapping is insertion-agnostic: two environments are equal iff they
/// bind the same names to the same values. Equality matters: it is half of
/// a hub's structural identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Variables {
    map: HashMap<String, String>,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Environment with `cur-dir` bound to the given directory.
    pub fn with_cur_dir(dir: &Path) -> Self {
        let mut vars = Self::new();
        vars.set(CUR_DIR, dir.to_string_lossy());
        vars
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.map.get(name).map(String::as_str)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.map.insert(name.into(), value.into());
    }

    /// The bound `cur-dir`, or the empty string if unset.
    pub fn cur_dir(&self) -> &str {
        self.get(CUR_DIR).unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for Variables {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self { map: iter.into_iter().collect() }
    }
}

#[cfg(test)]
#[path = "vars_tests.rs"]
mod tests;
