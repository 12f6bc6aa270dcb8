// SPDX-License-Identifier: MIT

//! `{name}` variable substitution.
//!
//! Substitution is innermost-first: each pass takes the *last* `{` in the
//! text (which can contain no further `{`) and its matching `}`, so
//! `{a{b}c}` resolves `{b}` before the outer name is looked up. There is no
//! escape syntax; a literal `{` cannot appear in a processed string.

use forge_core::Variables;
use serde_json::Value;
use thiserror::Error;

/// Hard cap on substitution passes, bounding runaway cycles such as a
/// variable expanding to a reference to itself.
pub const MAX_PASSES: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterpError {
    #[error("unknown variable {name:?} in {input:?}")]
    UnknownVariable { name: String, input: String },
    #[error("unbalanced braces in {0:?}")]
    UnbalancedBrace(String),
    #[error("substitution did not settle after {MAX_PASSES} passes in {0:?}")]
    IterationCap(String),
    #[error("variable definitions must be an array of single-entry objects with string values, got {0}")]
    InvalidVarDef(String),
}

/// Expand every `{name}` in `input` against `vars`.
pub fn process(input: &str, vars: &Variables) -> Result<String, InterpError> {
    let mut text = input.to_string();
    let mut passes = 0;
    while let Some(open) = text.rfind('{') {
        passes += 1;
        if passes > MAX_PASSES {
            return Err(InterpError::IterationCap(input.to_string()));
        }
        let close = match text[open..].find('}') {
            Some(offset) => open + offset,
            None => return Err(InterpError::UnbalancedBrace(input.to_string())),
        };
        let name = &text[open + 1..close];
        let value = vars.get(name).ok_or_else(|| InterpError::UnknownVariable {
            name: name.to_string(),
            input: input.to_string(),
        })?;
        text.replace_range(open..=close, value);
    }
    Ok(text)
}

/// Recursively expand every string leaf of a JSON value. Non-string leaves
/// and object keys are untouched.
pub fn process_json(value: &mut Value, vars: &Variables) -> Result<(), InterpError> {
    match value {
        Value::String(s) => {
            *s = process(s, vars)?;
        }
        Value::Array(items) => {
            for item in items {
                process_json(item, vars)?;
            }
        }
        Value::Object(map) => {
            for (_key, item) in map.iter_mut() {
                process_json(item, vars)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Apply a `[{name: value}, …]` definition list to `vars`.
///
/// Both the name and the value are interpolated against the current
/// environment before insertion, so later entries see earlier ones and
/// shadow them on collision.
pub fn adapt(vars: &mut Variables, defs: &Value) -> Result<(), InterpError> {
    let entries = defs
        .as_array()
        .ok_or_else(|| InterpError::InvalidVarDef(defs.to_string()))?;
    for entry in entries {
        let object = entry
            .as_object()
            .filter(|o| o.len() == 1)
            .ok_or_else(|| InterpError::InvalidVarDef(entry.to_string()))?;
        for (key, value) in object {
            let value = value
                .as_str()
                .ok_or_else(|| InterpError::InvalidVarDef(entry.to_string()))?;
            let key = process(key, vars)?;
            let value = process(value, vars)?;
            vars.set(key, value);
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "interp_tests.rs"]
mod tests;
