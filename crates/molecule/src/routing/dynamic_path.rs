//! Path patterns with named segments, such as `/products/:id/reviews`.

/// Matches request paths and extracts the parameters they bind.
pub trait PathMatcher: Send + Sync {
    fn matches(&self, path: &str) -> bool;

    /// The `(name, value)` pairs the path binds. Only meaningful for a matching path.
    fn bound_parameters(&self, _path: &str) -> Vec<(String, String)> {
        Vec::new()
    }
}

impl<F> PathMatcher for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn matches(&self, path: &str) -> bool {
        self(path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Static(String),
    Dynamic(String),
}

impl Segment {
    fn parse(segment: &str) -> Self {
        match segment.strip_prefix(':') {
            Some(name) => Segment::Dynamic(name.to_string()),
            None => Segment::Static(segment.to_string()),
        }
    }

    fn matches(&self, actual: &str) -> bool {
        match self {
            Segment::Static(expected) => expected == actual,
            Segment::Dynamic(_) => true,
        }
    }
}

/// A path pattern where segments starting with `:` match any value and bind it under their name.
///
/// Patterns and paths are split on `/`, and empty segments are ignored, so `/products/` and
/// `products` are the same pattern.
///
/// # Example
/// ```
/// use molecule::routing::{DynamicPath, PathMatcher};
///
/// let path = DynamicPath::equal_to("/products/:id");
/// assert!(path.matches("/products/42"));
/// assert_eq!(path.bound_parameters("/products/42"), vec![("id".to_string(), "42".to_string())]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicPath {
    segments: Vec<Segment>,
    prefix: bool,
}

impl DynamicPath {
    /// Matches paths with exactly as many segments as the pattern.
    pub fn equal_to(pattern: &str) -> Self {
        Self { segments: split(pattern).map(Segment::parse).collect(), prefix: false }
    }

    /// Matches paths that start with the segments of the pattern.
    pub fn starting_with(pattern: &str) -> Self {
        Self { segments: split(pattern).map(Segment::parse).collect(), prefix: true }
    }

    /// Whether the pattern has any named segment.
    pub fn is_dynamic(&self) -> bool {
        self.segments.iter().any(|segment| matches!(segment, Segment::Dynamic(_)))
    }
}

impl PathMatcher for DynamicPath {
    fn matches(&self, path: &str) -> bool {
        let actual: Vec<&str> = split(path).collect();
        let count_fits = if self.prefix { actual.len() >= self.segments.len() } else { actual.len() == self.segments.len() };

        count_fits && self.segments.iter().zip(actual).all(|(segment, actual)| segment.matches(actual))
    }

    fn bound_parameters(&self, path: &str) -> Vec<(String, String)> {
        self.segments
            .iter()
            .zip(split(path))
            .filter_map(|(segment, actual)| match segment {
                Segment::Dynamic(name) => Some((name.clone(), actual.to_string())),
                Segment::Static(_) => None,
            })
            .collect()
    }
}

fn split(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

#[cfg(test)]
mod tests {
    use super::{DynamicPath, PathMatcher};

    fn pairs(values: &[(&str, &str)]) -> Vec<(String, String)> {
        values.iter().map(|(n, v)| (n.to_string(), v.to_string())).collect()
    }

    #[test]
    fn matches_static_paths_exactly() {
        let path = DynamicPath::equal_to("/products/new");

        assert!(path.matches("/products/new"));
        assert!(path.matches("/products/new/"));
        assert!(!path.matches("/products"));
        assert!(!path.matches("/products/new/edit"));
        assert!(!path.matches("/products/old"));
        assert!(!path.is_dynamic());
    }

    #[test]
    fn matches_dynamic_segments() {
        let path = DynamicPath::equal_to("/products/:id/reviews/:review");

        assert!(path.is_dynamic());
        assert!(path.matches("/products/42/reviews/7"));
        assert!(!path.matches("/products/42/comments/7"));
        assert!(!path.matches("/products/42/reviews"));
    }

    #[test]
    fn binds_dynamic_segments_by_name() {
        let path = DynamicPath::equal_to("/products/:id/reviews/:review");

        assert_eq!(path.bound_parameters("/products/42/reviews/7"), pairs(&[("id", "42"), ("review", "7")]));
    }

    #[test]
    fn matches_by_prefix() {
        let path = DynamicPath::starting_with("/products/:id");

        assert!(path.matches("/products/42"));
        assert!(path.matches("/products/42/reviews"));
        assert!(!path.matches("/products"));
        assert_eq!(path.bound_parameters("/products/42/reviews"), pairs(&[("id", "42")]));
    }

    #[test]
    fn root_pattern_matches_root_only() {
        let root = DynamicPath::equal_to("/");

        assert!(root.matches("/"));
        assert!(!root.matches("/index.html"));
        assert!(DynamicPath::starting_with("/").matches("/index.html"));
    }
}
