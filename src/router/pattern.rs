//! Path templates such as `/api/repo/{name}/issues/{id}`.
//!
//! Patterns and paths are both split on `/` and compared segment by segment.
//! A `{name}` segment matches any non-empty path segment and captures it;
//! every other segment must match literally. Segment counts must be equal:
//! there are no wildcard tails.

use std::collections::HashMap;

use super::RouteError;

/// Captured `{name}` segments, raw (not percent-decoded).
pub type PathParams = HashMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Param(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Compiles a pattern. It must start with `/`, and a brace may only wrap
    /// a whole segment with a non-empty name that is unique in the pattern.
    pub fn parse(pattern: &str) -> Result<Self, RouteError> {
        let invalid = |reason: &str| RouteError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        };

        if !pattern.starts_with('/') {
            return Err(invalid("must start with '/'"));
        }

        let mut segments = Vec::new();
        for segment in pattern.split('/') {
            let parsed = match segment
                .strip_prefix('{')
                .and_then(|s| s.strip_suffix('}'))
            {
                Some(name) => {
                    if name.is_empty() || name.contains(['{', '}']) {
                        return Err(invalid("bad parameter name"));
                    }
                    if segments
                        .iter()
                        .any(|s| matches!(s, Segment::Param(existing) if existing == name))
                    {
                        return Err(invalid("duplicate parameter name"));
                    }
                    Segment::Param(name.to_string())
                }
                None => {
                    if segment.contains(['{', '}']) {
                        return Err(invalid("braces must wrap a whole segment"));
                    }
                    Segment::Literal(segment.to_string())
                }
            };
            segments.push(parsed);
        }

        Ok(Self {
            raw: pattern.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Matches `path` and returns the captured parameters.
    pub fn matches(&self, path: &str) -> Option<PathParams> {
        let mut params = PathParams::new();
        let mut parts = path.split('/');

        for segment in &self.segments {
            let part = parts.next()?;
            match segment {
                Segment::Literal(expected) => {
                    if expected != part {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    if part.is_empty() {
                        return None;
                    }
                    params.insert(name.clone(), part.to_string());
                }
            }
        }

        // Path has more segments than the pattern.
        if parts.next().is_some() {
            return None;
        }

        Some(params)
    }

    /// True when both patterns accept exactly the same paths (parameter
    /// names are ignored).
    pub fn same_shape(&self, other: &PathPattern) -> bool {
        self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|pair| match pair {
                    (Segment::Literal(a), Segment::Literal(b)) => a == b,
                    (Segment::Param(_), Segment::Param(_)) => true,
                    _ => false,
                })
    }

    /// True when at least one path is accepted by both patterns.
    pub fn overlaps(&self, other: &PathPattern) -> bool {
        self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|pair| match pair {
                    (Segment::Literal(a), Segment::Literal(b)) => a == b,
                    (Segment::Param(_), Segment::Literal(l))
                    | (Segment::Literal(l), Segment::Param(_)) => !l.is_empty(),
                    (Segment::Param(_), Segment::Param(_)) => true,
                })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_pattern_matches_exactly() {
        let pattern = PathPattern::parse("/api/repos").unwrap();
        assert_eq!(pattern.matches("/api/repos"), Some(PathParams::new()));
        assert_eq!(pattern.matches("/api/repos/"), None);
        assert_eq!(pattern.matches("/api/repo"), None);
    }

    #[test]
    fn param_rejects_empty_segment() {
        let pattern = PathPattern::parse("/api/repo/{name}").unwrap();
        assert!(pattern.matches("/api/repo/").is_none());
        assert_eq!(
            pattern.matches("/api/repo/forge").unwrap().get("name").map(String::as_str),
            Some("forge")
        );
    }

    #[test]
    fn malformed_patterns_are_rejected() {
        assert!(PathPattern::parse("api/repos").is_err());
        assert!(PathPattern::parse("/api/{}").is_err());
        assert!(PathPattern::parse("/api/x{name}").is_err());
        assert!(PathPattern::parse("/api/{a}/{a}").is_err());
    }

    #[test]
    fn overlap_and_shape() {
        let a = PathPattern::parse("/api/repo/{name}").unwrap();
        let b = PathPattern::parse("/api/repo/{other}").unwrap();
        let c = PathPattern::parse("/api/repo/special").unwrap();
        let d = PathPattern::parse("/api/repos/{name}").unwrap();

        assert!(a.same_shape(&b));
        assert!(!a.same_shape(&c));
        assert!(a.overlaps(&c));
        assert!(!a.overlaps(&d));
    }
}
