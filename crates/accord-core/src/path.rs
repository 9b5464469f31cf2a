//! # Path Templates
//!
//! Route paths are templates: `/posts/:id/comments/:commentId`. Segments
//! beginning with [`PARAM_MARKER`] are parameters and match any single
//! segment; all others must match verbatim.
//!
//! Empty segments are ignored, so `/posts/` and `/posts` have the same shape.

use std::collections::BTreeMap;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde_json::{Map, Value};

use crate::error::PathError;

/// Prefix marking a parameter segment.
pub const PARAM_MARKER: char = ':';

/// Characters escaped when a parameter value is written into a path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// One segment of a parsed template.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Literal(String),
    Param(String),
}

/// A parsed path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    pub fn parse(template: &str) -> Self {
        let segments = split_path(template)
            .into_iter()
            .map(|segment| match segment.strip_prefix(PARAM_MARKER) {
                Some(name) => Segment::Param(name.to_string()),
                None => Segment::Literal(segment.to_string()),
            })
            .collect();
        Self {
            raw: template.to_string(),
            segments,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of non-parameter segments.
    pub fn literal_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Literal(_)))
            .count()
    }

    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Same segment count and every literal segment equal.
    pub fn matches(&self, actual: &[&str]) -> bool {
        self.segments.len() == actual.len()
            && self
                .segments
                .iter()
                .zip(actual)
                .all(|(segment, value)| match segment {
                    Segment::Literal(literal) => literal == value,
                    Segment::Param(_) => true,
                })
    }

    /// Parameter bindings if `actual` structurally matches this template.
    pub fn match_segments(&self, actual: &[&str]) -> Option<BTreeMap<String, String>> {
        if self.matches(actual) {
            Some(self.extract(actual))
        } else {
            None
        }
    }

    /// Bind every parameter segment to the actual segment at its position.
    pub fn extract(&self, actual: &[&str]) -> BTreeMap<String, String> {
        self.segments
            .iter()
            .zip(actual)
            .filter_map(|(segment, value)| match segment {
                Segment::Param(name) => Some((name.clone(), (*value).to_string())),
                Segment::Literal(_) => None,
            })
            .collect()
    }

    /// Whether both templates accept exactly the same paths.
    pub fn same_shape(&self, other: &PathTemplate) -> bool {
        self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|(a, b)| match (a, b) {
                    (Segment::Literal(x), Segment::Literal(y)) => x == y,
                    (Segment::Param(_), Segment::Param(_)) => true,
                    _ => false,
                })
    }

    /// Write `params` into the template, percent-encoding each value.
    ///
    /// # Errors
    ///
    /// [`PathError::MissingParam`] when a parameter has no value,
    /// [`PathError::NonScalar`] when a value is an array, object or null.
    pub fn insert_params(&self, params: &Map<String, Value>) -> Result<String, PathError> {
        let mut pieces = Vec::new();
        for piece in self.raw.split('/') {
            match piece.strip_prefix(PARAM_MARKER) {
                Some(name) => {
                    let value = params
                        .get(name)
                        .ok_or_else(|| PathError::MissingParam(name.to_string()))?;
                    let text = match value {
                        Value::String(s) => s.clone(),
                        Value::Number(n) => n.to_string(),
                        Value::Bool(b) => b.to_string(),
                        _ => return Err(PathError::NonScalar(name.to_string())),
                    };
                    pieces.push(utf8_percent_encode(&text, SEGMENT).to_string());
                }
                None => pieces.push(piece.to_string()),
            }
        }
        Ok(pieces.join("/"))
    }
}

/// Non-empty `/`-separated segments of a path.
pub fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Bind the parameter segments of `template` to `actual_segments`, pairwise.
///
/// Values are returned as raw strings; non-parameter segments are skipped.
pub fn extract_params(template: &str, actual_segments: &[&str]) -> BTreeMap<String, String> {
    PathTemplate::parse(template).extract(actual_segments)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Every parameter binds the actual segment at its own position.
        #[test]
        fn extract_binds_positionally(
            segments in prop::collection::vec(("[a-z]{1,8}", any::<bool>()), 1..8),
            values in prop::collection::vec("[A-Za-z0-9_-]{1,10}", 8),
        ) {
            let template: Vec<String> = segments
                .iter()
                .enumerate()
                .map(|(i, (name, is_param))| if *is_param { format!(":p{i}{name}") } else { name.clone() })
                .collect();
            let actual: Vec<&str> = segments
                .iter()
                .enumerate()
                .map(|(i, (name, is_param))| if *is_param { values[i].as_str() } else { name.as_str() })
                .collect();

            let parsed = PathTemplate::parse(&format!("/{}", template.join("/")));
            let bound = parsed.match_segments(&actual).expect("template must match its own instance");

            let expected = segments.iter().filter(|(_, p)| *p).count();
            prop_assert_eq!(bound.len(), expected);
            for (i, (name, is_param)) in segments.iter().enumerate() {
                if *is_param {
                    prop_assert_eq!(bound.get(&format!("p{i}{name}")).map(String::as_str), Some(values[i].as_str()));
                }
            }
        }
    }
}
