//! Paths split into typed segments.

/// One `/`-delimited piece of a path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Text matched (or captured) verbatim.
    Literal(String),
    /// `#name` in a route pattern: captures exactly one segment.
    Named(String),
    /// `*name` in a route pattern: captures every remaining segment.
    Wildcard(String),
}

impl PathSegment {
    fn parse(raw: &str, is_pattern: bool) -> Self {
        if is_pattern {
            if let Some(name) = raw.strip_prefix('*') {
                return PathSegment::Wildcard(name.to_string());
            }
            if let Some(name) = raw.strip_prefix('#') {
                return PathSegment::Named(name.to_string());
            }
        }
        PathSegment::Literal(raw.to_string())
    }

    /// The parameter this segment captures into, if any.
    pub fn param_name(&self) -> Option<&str> {
        match self {
            PathSegment::Literal(_) => None,
            PathSegment::Named(name) | PathSegment::Wildcard(name) => Some(name),
        }
    }

    /// The raw text of the segment as it appeared in the path.
    pub fn text(&self) -> &str {
        match self {
            PathSegment::Literal(text) | PathSegment::Named(text) | PathSegment::Wildcard(text) => text,
        }
    }
}

/// A parsed path. Never empty: `""` and `"/"` both become the root segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSpec {
    segments: Vec<PathSegment>,
}

impl PathSpec {
    /// Text of the single segment standing in for an empty path.
    pub const ROOT: &'static str = "/";

    /// Split `path` on `/`, dropping empty segments.
    ///
    /// Sigils (`#`, `*`) are only interpreted when `is_pattern` is set, i.e.
    /// when registering a route. Request paths are always all-literal.
    pub fn parse(path: &str, is_pattern: bool) -> Self {
        let segments: Vec<PathSegment> = path
            .split('/')
            .filter(|part| !part.is_empty())
            .map(|part| PathSegment::parse(part, is_pattern))
            .collect();

        if segments.is_empty() {
            return Self::root();
        }

        Self { segments }
    }

    /// The single-segment root path.
    pub fn root() -> Self {
        Self {
            segments: vec![PathSegment::Literal(Self::ROOT.to_string())],
        }
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always false for a parsed path.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}
