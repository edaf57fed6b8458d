//! Provider locators.
//!
//! A [`LocatorPath`] is the addressing primitive of the library: an ordered
//! list of [`LocatorSegment`]s that can cross provider boundaries.
//!
//! # Positional Convention
//!
//! - Segment 0 identifies the composite that owns the path (its provider key)
//! - Segment 1, if present, identifies the child provider owning the rest
//! - Segments 2.. are the child's own sub-path, recursively
//!
//! A path with fewer than two segments carries no routing information.
//!
//! # Text Encoding
//!
//! Locators are persisted as `key0,name0|key1,name1|...|keyN,nameN`.
//! Backslash escapes `\`, `,` and `|` inside keys and names so every
//! path round-trips exactly:
//!
//! ```
//! use printlib::locator::{LocatorPath, LocatorSegment};
//!
//! let path = LocatorPath::from(vec![
//!     LocatorSegment::new("ProviderSelectorKey", ".."),
//!     LocatorSegment::new("directory:/home/me/Downloads", "Downloads, old|new"),
//! ]);
//!
//! let encoded = path.to_string();
//! assert_eq!(encoded.parse::<LocatorPath>().unwrap(), path);
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const SEGMENT_SEPARATOR: char = '|';
const FIELD_SEPARATOR: char = ',';
const ESCAPE: char = '\\';

/// A single `(key, display name)` step of a locator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocatorSegment {
    /// Opaque key, unique only within one provider's namespace.
    pub key: String,
    /// Human readable name for the step.
    pub display_name: String,
}

impl LocatorSegment {
    /// Create a new segment.
    pub fn new(key: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            display_name: display_name.into(),
        }
    }
}

impl fmt::Display for LocatorSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_escaped(f, &self.key)?;
        write!(f, "{}", FIELD_SEPARATOR)?;
        write_escaped(f, &self.display_name)
    }
}

/// Ordered path of segments identifying a collection or item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocatorPath {
    segments: Vec<LocatorSegment>,
}

impl LocatorPath {
    /// The empty path.
    pub fn new() -> Self {
        Self::default()
    }

    /// A path containing only `segment`.
    pub fn root(segment: LocatorSegment) -> Self {
        Self {
            segments: vec![segment],
        }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Segment at `index`, if present.
    pub fn segment(&self, index: usize) -> Option<&LocatorSegment> {
        self.segments.get(index)
    }

    pub fn first(&self) -> Option<&LocatorSegment> {
        self.segments.first()
    }

    pub fn last(&self) -> Option<&LocatorSegment> {
        self.segments.last()
    }

    pub fn segments(&self) -> &[LocatorSegment] {
        &self.segments
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LocatorSegment> {
        self.segments.iter()
    }

    /// Returns this path with its first segment removed.
    ///
    /// Segment 1 becomes the new segment 0, i.e. the child's own root marker.
    pub fn without_first(&self) -> Self {
        Self {
            segments: self.segments.iter().skip(1).cloned().collect(),
        }
    }

    /// Returns a copy of this path extended by `segment`.
    pub fn child(&self, segment: LocatorSegment) -> Self {
        let mut path = self.clone();
        path.push(segment);
        path
    }

    pub fn push(&mut self, segment: LocatorSegment) {
        self.segments.push(segment);
    }

    /// Whether segment 0 carries `key`.
    pub fn starts_with_key(&self, key: &str) -> bool {
        self.first().is_some_and(|s| s.key == key)
    }
}

impl From<Vec<LocatorSegment>> for LocatorPath {
    fn from(segments: Vec<LocatorSegment>) -> Self {
        Self { segments }
    }
}

impl FromIterator<LocatorSegment> for LocatorPath {
    fn from_iter<I: IntoIterator<Item = LocatorSegment>>(iter: I) -> Self {
        Self {
            segments: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for LocatorPath {
    type Item = LocatorSegment;
    type IntoIter = std::vec::IntoIter<LocatorSegment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.into_iter()
    }
}

impl<'a> IntoIterator for &'a LocatorPath {
    type Item = &'a LocatorSegment;
    type IntoIter = std::slice::Iter<'a, LocatorSegment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.iter()
    }
}

impl fmt::Display for LocatorPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", SEGMENT_SEPARATOR)?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

/// Errors produced when decoding a locator string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocatorParseError {
    /// A segment had no unescaped `,` between key and name.
    #[error("segment {index} is missing the ',' between key and display name")]
    MissingField { index: usize },

    /// The input ended in the middle of an escape sequence.
    #[error("dangling escape at end of locator")]
    DanglingEscape,
}

impl FromStr for LocatorPath {
    type Err = LocatorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::new());
        }

        let mut segments = Vec::new();
        let mut key: Option<String> = None;
        let mut current = String::new();
        let mut chars = s.chars();

        while let Some(c) = chars.next() {
            match c {
                ESCAPE => match chars.next() {
                    Some(escaped) => current.push(escaped),
                    None => return Err(LocatorParseError::DanglingEscape),
                },
                FIELD_SEPARATOR if key.is_none() => {
                    key = Some(std::mem::take(&mut current));
                }
                SEGMENT_SEPARATOR => {
                    let index = segments.len();
                    let k = key
                        .take()
                        .ok_or(LocatorParseError::MissingField { index })?;
                    segments.push(LocatorSegment::new(k, std::mem::take(&mut current)));
                }
                other => current.push(other),
            }
        }

        let index = segments.len();
        let k = key.ok_or(LocatorParseError::MissingField { index })?;
        segments.push(LocatorSegment::new(k, current));

        Ok(Self { segments })
    }
}

fn write_escaped(f: &mut fmt::Formatter<'_>, value: &str) -> fmt::Result {
    for c in value.chars() {
        if matches!(c, ESCAPE | FIELD_SEPARATOR | SEGMENT_SEPARATOR) {
            write!(f, "{}", ESCAPE)?;
        }
        write!(f, "{}", c)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(pairs: &[(&str, &str)]) -> LocatorPath {
        pairs
            .iter()
            .map(|(k, n)| LocatorSegment::new(*k, *n))
            .collect()
    }

    #[test]
    fn test_encode_uses_historical_format() {
        let p = path(&[("sel", ".."), ("db", "Library"), ("7", "Gears")]);
        assert_eq!(p.to_string(), "sel,..|db,Library|7,Gears");
    }

    #[test]
    fn test_decode_historical_format() {
        let p: LocatorPath = "sel,..|db,Library".parse().unwrap();
        assert_eq!(p.len(), 2);
        assert_eq!(p.segment(1).unwrap().key, "db");
        assert_eq!(p.segment(1).unwrap().display_name, "Library");
    }

    #[test]
    fn test_empty_string_is_empty_path() {
        let p: LocatorPath = "".parse().unwrap();
        assert!(p.is_empty());
        assert_eq!(LocatorPath::new().to_string(), "");
    }

    #[test]
    fn test_escaped_separators_survive() {
        let p = path(&[("a|b", "c,d"), ("back\\slash", "")]);
        let encoded = p.to_string();
        assert_eq!(encoded, "a\\|b,c\\,d|back\\\\slash,");
        assert_eq!(encoded.parse::<LocatorPath>().unwrap(), p);
    }

    #[test]
    fn test_display_name_may_contain_unescaped_comma_after_key() {
        // Only the first unescaped comma splits key from name.
        let p: LocatorPath = "k,name, with comma".parse().unwrap();
        assert_eq!(p.first().unwrap().display_name, "name, with comma");
    }

    #[test]
    fn test_missing_field_is_rejected() {
        let err = "ok,1|broken".parse::<LocatorPath>().unwrap_err();
        assert_eq!(err, LocatorParseError::MissingField { index: 1 });
    }

    #[test]
    fn test_dangling_escape_is_rejected() {
        let err = "k,n\\".parse::<LocatorPath>().unwrap_err();
        assert_eq!(err, LocatorParseError::DanglingEscape);
    }

    #[test]
    fn test_without_first_shifts_segments() {
        let p = path(&[("sel", ".."), ("db", "Library"), ("7", "Gears")]);
        let rest = p.without_first();
        assert_eq!(rest, path(&[("db", "Library"), ("7", "Gears")]));
        assert!(rest.starts_with_key("db"));
        assert!(LocatorPath::new().without_first().is_empty());
    }

    #[test]
    fn test_child_does_not_mutate_parent() {
        let parent = LocatorPath::root(LocatorSegment::new("sel", ".."));
        let child = parent.child(LocatorSegment::new("db", "Library"));
        assert_eq!(parent.len(), 1);
        assert_eq!(child.len(), 2);
        assert_eq!(child.last().unwrap().key, "db");
    }

    #[test]
    fn test_json_is_plain_segment_array() {
        let p = path(&[("sel", "..")]);
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, r#"[{"key":"sel","display_name":".."}]"#);
        let back: LocatorPath = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_text_encoding_preserves_order_and_boundaries(
                pairs in proptest::collection::vec((".{0,12}", ".{0,12}"), 1..6)
            ) {
                let p: LocatorPath = pairs
                    .iter()
                    .map(|(k, n)| LocatorSegment::new(k.clone(), n.clone()))
                    .collect();
                let decoded: LocatorPath = p.to_string().parse().unwrap();
                prop_assert_eq!(decoded, p);
            }
        }
    }
}
