// SPDX-License-Identifier: MIT

//! Path wildcards with capture segments.
//!
//! A pattern is an ordinary path whose components may contain `*` (match
//! anything within the component) and `~name~` capture segments (match
//! anything within the component and bind it to `name`). Neither crosses a
//! directory separator.

use crate::probe::FileProbe;
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Does this path text use wildcard syntax anywhere?
pub fn contains_wildcards(s: &str) -> bool {
    s.contains('*') || s.contains('~')
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("unterminated '~' capture in {0:?}")]
    UnterminatedCapture(String),
    #[error("empty '~~' capture in {0:?}")]
    EmptyCapture(String),
    #[error("no binding for capture {0:?}")]
    UnboundCapture(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Literal(String),
    Star,
    Capture(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Pattern(Vec<Piece>),
}

/// One file matched during enumeration, with its capture bindings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WildcardMatch {
    pub path: PathBuf,
    /// `(capture name, matched substring)` in pattern order.
    pub bindings: Vec<(String, String)>,
}

/// A parsed wildcard path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WildcardPattern {
    raw: String,
    /// Leading components with no wildcards, including any root.
    prefix: PathBuf,
    /// Remaining components, matched one directory level at a time.
    tail: Vec<Segment>,
}

impl WildcardPattern {
    pub fn parse(raw: &str) -> Result<Self, PatternError> {
        let mut prefix = PathBuf::new();
        let mut tail: Vec<Segment> = Vec::new();

        for comp in Path::new(raw).components() {
            let text = match comp {
                Component::Normal(os) => os.to_string_lossy().into_owned(),
                // Roots and dots can never hold wildcards.
                other => {
                    if tail.is_empty() {
                        prefix.push(other.as_os_str());
                        continue;
                    }
                    tail.push(Segment::Literal(other.as_os_str().to_string_lossy().into_owned()));
                    continue;
                }
            };
            if contains_wildcards(&text) {
                tail.push(Segment::Pattern(parse_pieces(&text, raw)?));
            } else if tail.is_empty() {
                prefix.push(&text);
            } else {
                tail.push(Segment::Literal(text));
            }
        }

        Ok(Self { raw: raw.to_string(), prefix, tail })
    }

    /// The pattern as written.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Match a concrete path against the pattern, yielding capture bindings.
    pub fn matches(&self, path: &Path) -> Option<Vec<(String, String)>> {
        let rest = path.strip_prefix(&self.prefix).ok()?;
        let comps: Vec<String> =
            rest.components().map(|c| c.as_os_str().to_string_lossy().into_owned()).collect();
        if comps.len() != self.tail.len() {
            return None;
        }
        let mut bindings = Vec::new();
        for (segment, text) in self.tail.iter().zip(&comps) {
            match segment {
                Segment::Literal(lit) => {
                    if lit != text {
                        return None;
                    }
                }
                Segment::Pattern(pieces) => {
                    if !match_pieces(pieces, text, &mut bindings) {
                        return None;
                    }
                }
            }
        }
        Some(bindings)
    }

    /// Enumerate all files currently matching the pattern.
    ///
    /// Filesystem errors along the walk (missing directories, races) yield
    /// no matches rather than failing the enumeration.
    pub fn enumerate(&self, probe: &dyn FileProbe) -> Vec<WildcardMatch> {
        let mut out = Vec::new();
        let start = if self.prefix.as_os_str().is_empty() {
            PathBuf::from(".")
        } else {
            self.prefix.clone()
        };
        self.walk(probe, &start, 0, &mut Vec::new(), &mut out);
        out.sort_by(|a, b| a.path.cmp(&b.path));
        out
    }

    fn walk(
        &self,
        probe: &dyn FileProbe,
        cur: &Path,
        idx: usize,
        bindings: &mut Vec<(String, String)>,
        out: &mut Vec<WildcardMatch>,
    ) {
        if idx == self.tail.len() {
            if probe.exists(cur) && !probe.is_dir(cur) {
                // Report the path as written in the pattern, not via "." .
                let path = if self.prefix.as_os_str().is_empty() {
                    cur.strip_prefix(".").map(Path::to_path_buf).unwrap_or_else(|_| cur.to_path_buf())
                } else {
                    cur.to_path_buf()
                };
                out.push(WildcardMatch { path, bindings: bindings.clone() });
            }
            return;
        }
        match &self.tail[idx] {
            Segment::Literal(lit) => {
                self.walk(probe, &cur.join(lit), idx + 1, bindings, out);
            }
            Segment::Pattern(pieces) => {
                let entries = match probe.read_dir(cur) {
                    Ok(entries) => entries,
                    Err(_) => return,
                };
                for entry in entries {
                    let Some(name) = entry.file_name().map(|n| n.to_string_lossy().into_owned())
                    else {
                        continue;
                    };
                    let depth = bindings.len();
                    if match_pieces(pieces, &name, bindings) {
                        self.walk(probe, &entry, idx + 1, bindings, out);
                    }
                    bindings.truncate(depth);
                }
            }
        }
    }
}

fn parse_pieces(text: &str, raw: &str) -> Result<Vec<Piece>, PatternError> {
    let mut pieces = Vec::new();
    let mut literal = String::new();
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        match c {
            '*' => {
                if !literal.is_empty() {
                    pieces.push(Piece::Literal(std::mem::take(&mut literal)));
                }
                pieces.push(Piece::Star);
            }
            '~' => {
                if !literal.is_empty() {
                    pieces.push(Piece::Literal(std::mem::take(&mut literal)));
                }
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('~') => break,
                        Some(c) => name.push(c),
                        None => return Err(PatternError::UnterminatedCapture(raw.to_string())),
                    }
                }
                if name.is_empty() {
                    return Err(PatternError::EmptyCapture(raw.to_string()));
                }
                pieces.push(Piece::Capture(name));
            }
            c => literal.push(c),
        }
    }
    if !literal.is_empty() {
        pieces.push(Piece::Literal(literal));
    }
    Ok(pieces)
}

/// Backtracking match of one component. Stars and captures are greedy.
fn match_pieces(pieces: &[Piece], text: &str, bindings: &mut Vec<(String, String)>) -> bool {
    let Some((first, rest)) = pieces.split_first() else {
        return text.is_empty();
    };
    match first {
        Piece::Literal(lit) => match text.strip_prefix(lit.as_str()) {
            Some(remainder) => match_pieces(rest, remainder, bindings),
            None => false,
        },
        Piece::Star => {
            for split in split_points(text).into_iter().rev() {
                if match_pieces(rest, &text[split..], bindings) {
                    return true;
                }
            }
            false
        }
        Piece::Capture(name) => {
            for split in split_points(text).into_iter().rev() {
                bindings.push((name.clone(), text[..split].to_string()));
                if match_pieces(rest, &text[split..], bindings) {
                    return true;
                }
                bindings.pop();
            }
            false
        }
    }
}

fn split_points(text: &str) -> Vec<usize> {
    let mut points: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    points.push(text.len());
    points
}

/// Fill `~name~` holes in a template with capture bindings.
///
/// Used to turn a wildcard pipe's output template into a concrete path.
pub fn substitute(template: &str, bindings: &[(String, String)]) -> Result<String, PatternError> {
    let mut out = String::new();
    let mut chars = template.chars();
    while let Some(c) = chars.next() {
        if c != '~' {
            out.push(c);
            continue;
        }
        let mut name = String::new();
        loop {
            match chars.next() {
                Some('~') => break,
                Some(c) => name.push(c),
                None => return Err(PatternError::UnterminatedCapture(template.to_string())),
            }
        }
        let value = bindings
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
            .ok_or_else(|| PatternError::UnboundCapture(name.clone()))?;
        out.push_str(value);
    }
    Ok(out)
}

/// Tracks the matched set of a wildcard between polls.
#[derive(Debug, Clone)]
pub struct WildcardWatch {
    pattern: WildcardPattern,
    last: Option<BTreeSet<PathBuf>>,
}

impl WildcardWatch {
    pub fn new(pattern: WildcardPattern) -> Self {
        Self { pattern, last: None }
    }

    pub fn pattern(&self) -> &WildcardPattern {
        &self.pattern
    }

    /// Re-enumerate and report whether the matched set changed since the
    /// previous check. The first check always reports a change.
    pub fn check(&mut self, probe: &dyn FileProbe) -> bool {
        let set: BTreeSet<PathBuf> =
            self.pattern.enumerate(probe).into_iter().map(|m| m.path).collect();
        let changed = self.last.as_ref() != Some(&set);
        self.last = Some(set);
        changed
    }
}

#[cfg(test)]
#[path = "wildcard_tests.rs"]
mod tests;
