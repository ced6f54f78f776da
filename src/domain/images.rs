//! Trusted remote-image patterns and the image render contract.
//!
//! The allow-list is plain data: an ordered set of
//! `(protocol, hostname, path pattern)` triples evaluated by a pure matcher.
//! Render requests and results are ephemeral values with no identity beyond
//! the call that produced them.

use serde::Deserialize;
use url::Url;

/// The open path pattern used by the seeded deployment entries.
pub const OPEN_PATH_PATTERN: &str = "/**";

/// Transport accepted for remote image sources.
///
/// Only secured transport is representable; a wildcard or plaintext protocol
/// cannot be configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Https,
}

impl Protocol {
    pub fn scheme(self) -> &'static str {
        match self {
            Self::Https => "https",
        }
    }
}

/// One trusted `(protocol, hostname, path pattern)` triple.
#[derive(Debug, Clone, Deserialize)]
pub struct RemotePattern {
    pub protocol: Protocol,
    pub hostname: String,
    #[serde(default = "default_pathname")]
    pub pathname: String,
}

fn default_pathname() -> String {
    OPEN_PATH_PATTERN.to_string()
}

impl RemotePattern {
    /// An https entry for `hostname` with the open path pattern.
    pub fn open(hostname: &str) -> Self {
        Self {
            protocol: Protocol::Https,
            hostname: hostname.to_string(),
            pathname: default_pathname(),
        }
    }

    /// Whether `url` matches this triple: protocol and hostname exactly,
    /// path by segment glob.
    pub fn matches(&self, url: &Url) -> bool {
        url.scheme() == self.protocol.scheme()
            && url.host_str() == Some(self.hostname.as_str())
            && path_glob_matches(&self.pathname, url.path())
    }
}

/// Ordered set of trusted remote patterns, consulted read-only per render.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct RemotePatternSet {
    patterns: Vec<RemotePattern>,
}

impl RemotePatternSet {
    pub fn new(patterns: Vec<RemotePattern>) -> Self {
        Self { patterns }
    }

    /// The seeded deployment default: the placeholder-image, stock-photo and
    /// lorem-picture hosts, https only, open paths.
    pub fn seeded() -> Self {
        Self::new(vec![
            RemotePattern::open("placehold.co"),
            RemotePattern::open("images.unsplash.com"),
            RemotePattern::open("picsum.photos"),
        ])
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// A URL is permitted iff at least one triple matches it.
    pub fn permits(&self, url: &Url) -> bool {
        self.patterns.iter().any(|pattern| pattern.matches(url))
    }
}

/// Segment-wise glob match for URL paths.
///
/// `**` matches any run of segments (including none), `*` matches exactly
/// one segment, anything else matches literally.
pub fn path_glob_matches(pattern: &str, path: &str) -> bool {
    let pattern: Vec<&str> = pattern.trim_start_matches('/').split('/').collect();
    let path: Vec<&str> = path.trim_start_matches('/').split('/').collect();
    glob_segments(&pattern, &path)
}

fn glob_segments(pattern: &[&str], path: &[&str]) -> bool {
    match pattern.split_first() {
        None => path.is_empty(),
        Some((&"**", rest)) => (0..=path.len()).any(|skip| glob_segments(rest, &path[skip..])),
        Some((segment, rest)) => match path.split_first() {
            Some((head, tail)) => (*segment == "*" || segment == head) && glob_segments(rest, tail),
            None => false,
        },
    }
}

/// Classification of a raw image source reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Served by the application itself; exempt from the trust check.
    Local(String),
    /// Absolute remote URL; must be permitted by the pattern set.
    Remote(Url),
}

impl ImageSource {
    /// Classify a raw source reference.
    ///
    /// Anything that does not parse as an absolute URL is treated as a local
    /// reference; well-formedness beyond that is the image transport's
    /// concern, not this layer's.
    pub fn classify(raw: &str) -> Self {
        match Url::parse(raw) {
            Ok(url) => Self::Remote(url),
            Err(_) => Self::Local(raw.to_string()),
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Local(path) => path,
            Self::Remote(url) => url.as_str(),
        }
    }
}

/// A logical image render request. Optional fields are resolved to the
/// documented defaults at the top of
/// [`resolve`](crate::application::images::resolve).
#[derive(Debug, Clone, Default)]
pub struct ImageRenderRequest {
    pub source: String,
    pub display_class: Option<String>,
    pub alt: Option<String>,
    pub high_priority: Option<bool>,
}

impl ImageRenderRequest {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Default::default()
        }
    }
}

/// Two-tier breakpoint table backing the rendered `sizes` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizingRule {
    /// Viewport-width threshold in CSS pixels.
    pub breakpoint_px: u32,
    /// Rendered size below the threshold.
    pub below_px: u32,
    /// Rendered size at or above the threshold.
    pub default_px: u32,
}

impl SizingRule {
    /// The media-query form consumed by the markup, e.g.
    /// `(max-width: 768px) 48px, 96px`.
    pub fn to_sizes_attr(&self) -> String {
        format!(
            "(max-width: {}px) {}px, {}px",
            self.breakpoint_px, self.below_px, self.default_px
        )
    }
}

/// Intrinsic-size handling for the rendered image.
///
/// The resolver never computes explicit dimensions; the image fills its
/// enclosing box and the sizing rule drives source selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutMode {
    Fill,
}

/// Fetch-priority hint forwarded to the image transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorityHint {
    High,
    Auto,
}

impl PriorityHint {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Auto => "auto",
        }
    }
}

/// Concrete attributes needed to request and lay out one image.
#[derive(Debug, Clone)]
pub struct ImageRenderResult {
    pub source: ImageSource,
    pub alt: String,
    pub display_class: String,
    pub sizing: SizingRule,
    pub layout: LayoutMode,
    pub priority: PriorityHint,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(raw: &str) -> Url {
        Url::parse(raw).expect("test url should parse")
    }

    #[test]
    fn open_glob_matches_any_path() {
        assert!(path_glob_matches("/**", "/"));
        assert!(path_glob_matches("/**", "/photo123"));
        assert!(path_glob_matches("/**", "/a/b/c"));
    }

    #[test]
    fn single_star_matches_exactly_one_segment() {
        assert!(path_glob_matches("/a/*", "/a/b"));
        assert!(!path_glob_matches("/a/*", "/a"));
        assert!(!path_glob_matches("/a/*", "/a/b/c"));
    }

    #[test]
    fn literal_segments_match_exactly() {
        assert!(path_glob_matches("/photos/summer", "/photos/summer"));
        assert!(!path_glob_matches("/photos/summer", "/photos/winter"));
        assert!(!path_glob_matches("/photos", "/photos/summer"));
    }

    #[test]
    fn double_star_matches_interior_runs() {
        assert!(path_glob_matches("/a/**/z", "/a/z"));
        assert!(path_glob_matches("/a/**/z", "/a/b/c/z"));
        assert!(!path_glob_matches("/a/**/z", "/a/b/c"));
    }

    #[test]
    fn pattern_requires_exact_protocol_and_host() {
        let pattern = RemotePattern::open("images.unsplash.com");
        assert!(pattern.matches(&url("https://images.unsplash.com/photo123")));
        assert!(!pattern.matches(&url("http://images.unsplash.com/photo123")));
        assert!(!pattern.matches(&url("https://evil.example.com/photo123")));
        assert!(!pattern.matches(&url("https://sub.images.unsplash.com/photo123")));
    }

    #[test]
    fn seeded_set_permits_all_three_hosts() {
        let set = RemotePatternSet::seeded();
        assert_eq!(set.len(), 3);
        assert!(set.permits(&url("https://placehold.co/64x64")));
        assert!(set.permits(&url("https://images.unsplash.com/photo123")));
        assert!(set.permits(&url("https://picsum.photos/200/300")));
        assert!(!set.permits(&url("https://evil.example.com/x")));
    }

    #[test]
    fn empty_set_permits_nothing() {
        let set = RemotePatternSet::new(Vec::new());
        assert!(set.is_empty());
        assert!(!set.permits(&url("https://images.unsplash.com/photo123")));
    }

    #[test]
    fn classify_splits_local_and_remote() {
        assert_eq!(
            ImageSource::classify("/logo.svg"),
            ImageSource::Local("/logo.svg".to_string())
        );
        assert_eq!(
            ImageSource::classify("assets/logo.svg"),
            ImageSource::Local("assets/logo.svg".to_string())
        );
        assert!(ImageSource::classify("https://picsum.photos/96").is_remote());
    }

    #[test]
    fn remote_source_round_trips_verbatim() {
        let source = ImageSource::classify("https://images.unsplash.com/photo123");
        assert_eq!(source.as_str(), "https://images.unsplash.com/photo123");
    }

    #[test]
    fn sizes_attribute_renders_two_tiers() {
        let rule = SizingRule {
            breakpoint_px: 768,
            below_px: 48,
            default_px: 96,
        };
        assert_eq!(rule.to_sizes_attr(), "(max-width: 768px) 48px, 96px");
    }
}
