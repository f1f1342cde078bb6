use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Which occurrence of the end marker closes a fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BoundaryStrategy {
    /// First occurrence after the start marker
    First,

    /// Last occurrence in the text
    #[default]
    Last,
}

/// Errors locating or decoding an embedded fragment
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("start marker {0:?} not found")]
    StartMarkerNotFound(String),

    #[error("end marker {0:?} not found after the start marker")]
    EndMarkerNotFound(String),

    #[error("fragment is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

/// One step of a lookup path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        Self::Key(key.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        Self::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.write_str(key),
            Self::Index(index) => write!(f, "[{}]", index),
        }
    }
}

/// A lookup stopped at `segment`, the `depth`-th step of the path
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("missing path segment {segment} at depth {depth}")]
pub struct MissingPath {
    pub depth: usize,
    pub segment: PathSegment,
}

/// Finds the fragment between `start` and `end` in `text`
///
/// The fragment begins after the first occurrence of `start`, skipping any
/// whitespace and a single `:` separator. It ends before the first or last
/// (per `strategy`) occurrence of `end` that lies after the start marker,
/// dropping trailing whitespace and a single `,` separator.
///
/// # Example
///
/// ```
/// use earnings_ripple::extract::{locate_fragment, BoundaryStrategy};
///
/// let text = r#"root.App.main = {"context":{"a":1},"plugins":{}};"#;
/// let fragment = locate_fragment(text, "\"context\"", "\"plugins\"", BoundaryStrategy::Last).unwrap();
/// assert_eq!(fragment, r#"{"a":1}"#);
/// ```
pub fn locate_fragment<'a>(
    text: &'a str,
    start: &str,
    end: &str,
    strategy: BoundaryStrategy,
) -> Result<&'a str, ExtractError> {
    let begin = text
        .find(start)
        .map(|idx| idx + start.len())
        .ok_or_else(|| ExtractError::StartMarkerNotFound(start.to_string()))?;

    let rest = &text[begin..];
    let finish = match strategy {
        BoundaryStrategy::First => rest.find(end),
        BoundaryStrategy::Last => rest.rfind(end),
    }
    .ok_or_else(|| ExtractError::EndMarkerNotFound(end.to_string()))?;

    let fragment = rest[..finish].trim_start();
    let fragment = fragment.strip_prefix(':').unwrap_or(fragment).trim_start();
    let fragment = fragment.trim_end();
    let fragment = fragment.strip_suffix(',').unwrap_or(fragment).trim_end();

    Ok(fragment)
}

/// Decodes a located fragment into a generic JSON tree
pub fn decode(fragment: &str) -> Result<Value, ExtractError> {
    Ok(serde_json::from_str(fragment)?)
}

/// Walks `path` from `tree`
///
/// Keys step into objects and indices into arrays. The first absent or
/// mistyped step ends the walk with a [`MissingPath`] naming that step.
pub fn lookup<'a>(tree: &'a Value, path: &[PathSegment]) -> Result<&'a Value, MissingPath> {
    let mut node = tree;

    for (depth, segment) in path.iter().enumerate() {
        let next = match (segment, node) {
            (PathSegment::Key(key), Value::Object(map)) => map.get(key),
            (PathSegment::Index(index), Value::Array(items)) => items.get(*index),
            _ => None,
        };

        node = next.ok_or_else(|| MissingPath {
            depth,
            segment: segment.clone(),
        })?;
    }

    Ok(node)
}

/// Like [`lookup`], but the node must be a string
pub fn lookup_str<'a>(tree: &'a Value, path: &[PathSegment]) -> Result<&'a str, MissingPath> {
    match lookup(tree, path)? {
        Value::String(s) => Ok(s.as_str()),
        _ => Err(MissingPath {
            depth: path.len().saturating_sub(1),
            segment: path.last().cloned().unwrap_or(PathSegment::Index(0)),
        }),
    }
}

/// Returns the text between the first `prefix` and the next `suffix` after it
pub fn extract_between<'a>(text: &'a str, prefix: &str, suffix: &str) -> Option<&'a str> {
    let begin = text.find(prefix)? + prefix.len();
    let len = text[begin..].find(suffix)?;
    Some(&text[begin..begin + len])
}
