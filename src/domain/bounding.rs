//! Input bounding: byte, depth and element caps.
//!
//! Oversized inputs are not rejected; they are reduced to a bounded prefix a
//! guard can still act on. Over-limit substructure is replaced with an
//! explicit truncation marker rather than silently dropped.

use serde_json::Value;

/// Marker inserted wherever content was removed by bounding.
pub const TRUNCATION_MARKER: &str = "[truncated]";

/// Limits applied to an input payload before inspection.
#[derive(Debug, Clone, Copy)]
pub struct InputBounds {
    /// Maximum length of any single string, in bytes
    pub max_string_bytes: usize,
    /// Maximum nesting depth of arrays/objects
    pub max_depth: usize,
    /// Maximum total number of array elements and object members
    pub max_elements: usize,
}

impl Default for InputBounds {
    fn default() -> Self {
        Self {
            max_string_bytes: 8 * 1024,
            max_depth: 16,
            max_elements: 1024,
        }
    }
}

impl InputBounds {
    /// Apply the bounds to a payload.
    ///
    /// Returns the bounded copy and whether any truncation occurred. The
    /// operation is pure; the original value is never modified.
    pub fn apply(&self, value: &Value) -> (Value, bool) {
        let mut budget = self.max_elements;
        let mut truncated = false;
        let bounded = self.bound(value, 0, &mut budget, &mut truncated);
        (bounded, truncated)
    }

    fn bound(&self, value: &Value, depth: usize, budget: &mut usize, truncated: &mut bool) -> Value {
        match value {
            Value::String(s) => Value::String(self.bound_string(s, truncated)),
            Value::Array(items) => {
                if depth >= self.max_depth {
                    *truncated = true;
                    return Value::String(TRUNCATION_MARKER.to_string());
                }
                let mut out = Vec::new();
                for item in items {
                    if *budget == 0 {
                        *truncated = true;
                        out.push(Value::String(TRUNCATION_MARKER.to_string()));
                        break;
                    }
                    *budget -= 1;
                    out.push(self.bound(item, depth + 1, budget, truncated));
                }
                Value::Array(out)
            }
            Value::Object(map) => {
                if depth >= self.max_depth {
                    *truncated = true;
                    return Value::String(TRUNCATION_MARKER.to_string());
                }
                let mut out = serde_json::Map::new();
                for (key, item) in map {
                    if *budget == 0 {
                        *truncated = true;
                        out.insert(TRUNCATION_MARKER.to_string(), Value::Bool(true));
                        break;
                    }
                    *budget -= 1;
                    out.insert(
                        self.bound_string(key, truncated),
                        self.bound(item, depth + 1, budget, truncated),
                    );
                }
                Value::Object(out)
            }
            other => other.clone(),
        }
    }

    fn bound_string(&self, s: &str, truncated: &mut bool) -> String {
        if s.len() <= self.max_string_bytes {
            return s.to_string();
        }
        *truncated = true;
        // Walk back to a char boundary so the prefix stays valid UTF-8.
        let mut end = self.max_string_bytes;
        while end > 0 && !s.is_char_boundary(end) {
            end -= 1;
        }
        let mut out = s[..end].to_string();
        out.push_str(TRUNCATION_MARKER);
        out
    }
}
