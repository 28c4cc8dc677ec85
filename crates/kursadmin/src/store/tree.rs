//! JSON tree helpers shared by the store backends.
//!
//! The store is a single JSON tree addressed by `/`-separated paths. Writing
//! `null` deletes a node, and objects left empty by a write disappear, so a
//! path either holds data or does not exist.

use rand::Rng;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Characters that may not appear in a path segment.
const FORBIDDEN: &[char] = &['.', '#', '$', '[', ']'];

/// Key of the placeholder object that the store replaces on write.
pub const SERVER_VALUE_KEY: &str = ".sv";

/// Split a path into its segments, ignoring empty ones.
#[must_use]
pub fn segments(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

/// Join segments back into a path.
#[must_use]
pub fn join(segments: &[String]) -> String {
    segments.join("/")
}

/// Split and validate a path.
///
/// # Errors
///
/// Returns a write error if a segment contains a forbidden character.
pub fn parse_path(path: &str) -> Result<Vec<String>> {
    let parsed = segments(path);
    if let Some(bad) = parsed.iter().find(|s| s.contains(FORBIDDEN)) {
        return Err(Error::remote_write(
            path,
            format!("path segment '{bad}' contains one of . # $ [ ]"),
        ));
    }
    Ok(parsed)
}

/// Check whether one path is an ancestor of (or equal to) the other.
#[must_use]
pub fn overlaps(a: &[String], b: &[String]) -> bool {
    let len = a.len().min(b.len());
    a[..len] == b[..len]
}

/// Value at `path`, or `None` if nothing is stored there.
#[must_use]
pub fn get<'a>(root: &'a Value, path: &[String]) -> Option<&'a Value> {
    let mut node = root;
    for segment in path {
        node = node.as_object()?.get(segment)?;
    }
    (!is_empty(node)).then_some(node)
}

/// Store `value` at `path`, creating intermediate objects.
///
/// `null` deletes. Empty objects are pruned on the way back up.
pub fn set(root: &mut Value, path: &[String], value: Value) {
    let Some((head, rest)) = path.split_first() else {
        *root = prune(value);
        return;
    };
    if !root.is_object() {
        if value.is_null() {
            return;
        }
        *root = Value::Object(Map::new());
    }
    if let Value::Object(map) = root {
        let child = map.entry(head.clone()).or_insert(Value::Null);
        set(child, rest, value);
        if is_empty(child) {
            map.remove(head);
        }
    }
}

/// Replace server-value placeholders with their resolved values.
///
/// Only `{".sv": "timestamp"}` is understood; it becomes `now_ms`.
pub fn resolve_server_values(value: &mut Value, now_ms: i64) {
    if let Value::Object(map) = value {
        if map.len() == 1 && map.get(SERVER_VALUE_KEY).and_then(Value::as_str) == Some("timestamp") {
            *value = Value::from(now_ms);
            return;
        }
        for child in map.values_mut() {
            resolve_server_values(child, now_ms);
        }
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn prune(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let pruned: Map<String, Value> = map
                .into_iter()
                .map(|(key, child)| (key, prune(child)))
                .filter(|(_, child)| !is_empty(child))
                .collect();
            if pruned.is_empty() {
                Value::Null
            } else {
                Value::Object(pruned)
            }
        }
        other => other,
    }
}

const PUSH_CHARS: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

/// Generator for chronologically ordered 20-character keys.
///
/// The first eight characters encode the millisecond timestamp; the other
/// twelve are random, and are incremented instead of re-drawn when two keys
/// are generated in the same millisecond, so keys sort in creation order.
#[derive(Debug, Default)]
pub struct PushIdGenerator {
    last_ms: i64,
    last_random: [u8; 12],
}

impl PushIdGenerator {
    /// Create a new generator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a key for the given time.
    pub fn next_id(&mut self, now_ms: i64) -> String {
        if now_ms == self.last_ms {
            for digit in self.last_random.iter_mut().rev() {
                if *digit == 63 {
                    *digit = 0;
                } else {
                    *digit += 1;
                    break;
                }
            }
        } else {
            self.last_ms = now_ms;
            let mut rng = rand::thread_rng();
            for digit in &mut self.last_random {
                *digit = rng.gen_range(0..64);
            }
        }

        let mut id = String::with_capacity(20);
        let mut time = now_ms.max(0);
        let mut time_chars = [0u8; 8];
        for slot in time_chars.iter_mut().rev() {
            // `time % 64` is always in 0..64.
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let index = (time % 64) as usize;
            *slot = PUSH_CHARS[index];
            time /= 64;
        }
        id.extend(time_chars.iter().map(|&c| char::from(c)));
        id.extend(
            self.last_random
                .iter()
                .map(|&d| char::from(PUSH_CHARS[usize::from(d)])),
        );
        id
    }
}
