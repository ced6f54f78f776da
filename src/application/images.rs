//! Responsive image resolution.
//!
//! [`resolve`] is a pure function of the request and the allow-list
//! snapshot: it applies the documented defaults, attaches the constant
//! sizing rule and fill layout, and refuses remote sources no trusted
//! pattern permits. It never substitutes a different image on failure; the
//! caller decides whether to fall back or omit the render.

use crate::domain::{
    error::DomainError,
    images::{
        ImageRenderRequest, ImageRenderResult, ImageSource, LayoutMode, PriorityHint,
        RemotePatternSet, SizingRule,
    },
};

/// Compact square box applied when the request names no display class.
pub const DEFAULT_DISPLAY_CLASS: &str = "h-8 w-8";

/// Descriptive text applied when the request names no alternative text.
pub const DEFAULT_ALT_TEXT: &str = "Company logo";

/// Fixed two-tier breakpoint table: 48px below a 768px viewport, 96px at or
/// above it. A constant of the resolver, never derived from the request.
pub const SIZING_RULE: SizingRule = SizingRule {
    breakpoint_px: 768,
    below_px: 48,
    default_px: 96,
};

/// Resolve one render request against the trusted pattern set.
///
/// Remote sources are checked before anything is returned; local references
/// are exempt regardless of the allow-list contents.
pub fn resolve(
    request: ImageRenderRequest,
    allow_list: &RemotePatternSet,
) -> Result<ImageRenderResult, DomainError> {
    let ImageRenderRequest {
        source,
        display_class,
        alt,
        high_priority,
    } = request;

    let source = ImageSource::classify(&source);
    if let ImageSource::Remote(url) = &source {
        if !allow_list.permits(url) {
            return Err(DomainError::untrusted_source(url.as_str()));
        }
    }

    // An empty alt would defeat the point of the attribute; treat it the
    // same as an omitted one.
    let alt = match alt {
        Some(text) if !text.trim().is_empty() => text,
        _ => DEFAULT_ALT_TEXT.to_string(),
    };
    let display_class = display_class.unwrap_or_else(|| DEFAULT_DISPLAY_CLASS.to_string());
    let priority = if high_priority.unwrap_or(false) {
        PriorityHint::High
    } else {
        PriorityHint::Auto
    };

    Ok(ImageRenderResult {
        source,
        alt,
        display_class,
        sizing: SIZING_RULE,
        layout: LayoutMode::Fill,
        priority,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(source: &str) -> ImageRenderRequest {
        ImageRenderRequest::new(source)
    }

    #[test]
    fn trusted_remote_source_is_echoed_back() {
        let result = resolve(
            request("https://images.unsplash.com/photo123"),
            &RemotePatternSet::seeded(),
        )
        .expect("seeded host should resolve");
        assert_eq!(result.source.as_str(), "https://images.unsplash.com/photo123");
    }

    #[test]
    fn insecure_transport_is_rejected_despite_matching_host() {
        let err = resolve(
            request("http://images.unsplash.com/photo123"),
            &RemotePatternSet::seeded(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::UntrustedSource { .. }));
    }

    #[test]
    fn unlisted_host_is_rejected() {
        let err = resolve(
            request("https://evil.example.com/x"),
            &RemotePatternSet::seeded(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::UntrustedSource { .. }));
    }

    #[test]
    fn local_source_resolves_regardless_of_allow_list() {
        let result = resolve(request("/logo.png"), &RemotePatternSet::new(Vec::new()))
            .expect("local reference is exempt from the trust check");
        assert_eq!(result.source, ImageSource::Local("/logo.png".to_string()));
    }

    #[test]
    fn omitted_fields_take_documented_defaults() {
        let result = resolve(request("/logo.png"), &RemotePatternSet::seeded())
            .expect("local reference should resolve");
        assert_eq!(result.alt, DEFAULT_ALT_TEXT);
        assert_eq!(result.display_class, DEFAULT_DISPLAY_CLASS);
        assert_eq!(result.layout, LayoutMode::Fill);
        assert_eq!(result.priority, PriorityHint::Auto);
        assert_eq!(result.sizing, SIZING_RULE);
    }

    #[test]
    fn blank_alt_falls_back_to_default() {
        let result = resolve(
            ImageRenderRequest {
                alt: Some("   ".to_string()),
                ..request("/logo.png")
            },
            &RemotePatternSet::seeded(),
        )
        .expect("local reference should resolve");
        assert_eq!(result.alt, DEFAULT_ALT_TEXT);
        assert!(!result.alt.is_empty());
    }

    #[test]
    fn supplied_fields_are_preserved() {
        let result = resolve(
            ImageRenderRequest {
                display_class: Some("h-12 w-12".to_string()),
                alt: Some("Acme wordmark".to_string()),
                high_priority: Some(true),
                ..request("https://picsum.photos/96")
            },
            &RemotePatternSet::seeded(),
        )
        .expect("seeded host should resolve");
        assert_eq!(result.display_class, "h-12 w-12");
        assert_eq!(result.alt, "Acme wordmark");
        assert_eq!(result.priority, PriorityHint::High);
    }

    #[test]
    fn resolution_is_referentially_transparent() {
        let allow_list = RemotePatternSet::seeded();
        let first = resolve(request("https://picsum.photos/200/300"), &allow_list)
            .expect("seeded host should resolve");
        let second = resolve(request("https://picsum.photos/200/300"), &allow_list)
            .expect("seeded host should resolve");
        assert_eq!(first.source, second.source);
        assert_eq!(first.alt, second.alt);
        assert_eq!(first.sizing, second.sizing);
        assert_eq!(first.priority, second.priority);
    }
}
