//! Structural diff between two versions of a collection.
//!
//! [`compute`] produces an RFC 6902 style patch set (add / remove / replace
//! with JSON Pointer paths). Objects are compared key by key, arrays index by
//! index; trailing array removals are emitted from the highest index down so
//! the operations can be applied in order. [`render_unified`] is the
//! human-readable counterpart used by `mirror diff`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use similar::TextDiff;

/// One patch operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOp {
    Add { path: String, value: Value },
    Remove { path: String },
    Replace { path: String, value: Value },
}

impl PatchOp {
    pub fn path(&self) -> &str {
        match self {
            PatchOp::Add { path, .. }
            | PatchOp::Remove { path }
            | PatchOp::Replace { path, .. } => path,
        }
    }
}

/// Ordered list of operations turning the old document into the new one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatchSet(pub Vec<PatchOp>);

impl PatchSet {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PatchOp> {
        self.0.iter()
    }
}

/// Diff `old` (absent on first sight) against `new`.
pub fn compute(old: Option<&Value>, new: &Value) -> PatchSet {
    let mut ops = Vec::new();
    match old {
        None => ops.push(PatchOp::Add {
            path: String::new(),
            value: new.clone(),
        }),
        Some(old) => diff_value("", old, new, &mut ops),
    }
    PatchSet(ops)
}

fn diff_value(path: &str, old: &Value, new: &Value, ops: &mut Vec<PatchOp>) {
    if old == new {
        return;
    }
    match (old, new) {
        (Value::Object(old_map), Value::Object(new_map)) => {
            for (key, old_value) in old_map {
                let child = push_token(path, key);
                match new_map.get(key) {
                    Some(new_value) => diff_value(&child, old_value, new_value, ops),
                    None => ops.push(PatchOp::Remove { path: child }),
                }
            }
            for (key, new_value) in new_map {
                if !old_map.contains_key(key) {
                    ops.push(PatchOp::Add {
                        path: push_token(path, key),
                        value: new_value.clone(),
                    });
                }
            }
        }
        (Value::Array(old_items), Value::Array(new_items)) => {
            let shared = old_items.len().min(new_items.len());
            for index in 0..shared {
                let child = push_token(path, &index.to_string());
                diff_value(&child, &old_items[index], &new_items[index], ops);
            }
            for (index, value) in new_items.iter().enumerate().skip(shared) {
                ops.push(PatchOp::Add {
                    path: push_token(path, &index.to_string()),
                    value: value.clone(),
                });
            }
            for index in (shared..old_items.len()).rev() {
                ops.push(PatchOp::Remove {
                    path: push_token(path, &index.to_string()),
                });
            }
        }
        _ => ops.push(PatchOp::Replace {
            path: path.to_string(),
            value: new.clone(),
        }),
    }
}

/// Append one reference token, escaping `~` and `/` per RFC 6901.
fn push_token(path: &str, token: &str) -> String {
    let escaped = token.replace('~', "~0").replace('/', "~1");
    format!("{path}/{escaped}")
}

/// Line-based unified diff of the pretty-printed documents.
///
/// Returns an empty string when both render identically.
pub fn render_unified(
    old: Option<&Value>,
    new: &Value,
    old_label: &str,
    new_label: &str,
) -> String {
    let old_text = old.map(pretty).unwrap_or_default();
    let new_text = pretty(new);
    if old_text == new_text {
        return String::new();
    }
    TextDiff::from_lines(&old_text, &new_text)
        .unified_diff()
        .header(old_label, new_label)
        .context_radius(3)
        .to_string()
}

fn pretty(value: &Value) -> String {
    let mut text = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    text.push('\n');
    text
}
