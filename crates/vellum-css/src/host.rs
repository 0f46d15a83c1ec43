//! Host capabilities needed while parsing and resolving styles

use url::Url;

use crate::{Color, MediaFeatures};

/// Style-side host interface. Every method has a usable default.
pub trait StyleHost {
    /// Text of an imported stylesheet; `None` when it cannot be fetched
    fn fetch_stylesheet(&self, _url: &str) -> Option<String> {
        None
    }

    /// Join a possibly relative URL onto a base
    fn resolve_url(&self, base: &str, url: &str) -> String {
        join_url(base, url)
    }

    /// System color keywords the host knows about
    fn resolve_color_name(&self, _name: &str) -> Option<Color> {
        None
    }

    /// Convert points to device pixels
    fn pt_to_px(&self, pt: f32) -> f32 {
        pt * 96.0 / 72.0
    }

    /// Snapshot for media query evaluation
    fn media_features(&self) -> MediaFeatures {
        MediaFeatures::default()
    }

    /// Default language for `:lang()`
    fn language(&self) -> String {
        "en".to_string()
    }
}

/// Host with every default
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultStyleHost;

impl StyleHost for DefaultStyleHost {}

/// Resolve `url` against `base`; when `base` is not absolute the relative
/// text is returned unchanged
pub fn join_url(base: &str, url: &str) -> String {
    let url = url.trim();
    if let Ok(absolute) = Url::parse(url) {
        return absolute.to_string();
    }
    match Url::parse(base).and_then(|b| b.join(url)) {
        Ok(joined) => joined.to_string(),
        Err(_) => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_relative() {
        assert_eq!(
            join_url("http://example.com/a/b.html", "c.css"),
            "http://example.com/a/c.css"
        );
        assert_eq!(join_url("http://example.com/a/", "/root.css"), "http://example.com/root.css");
    }

    #[test]
    fn test_join_without_base() {
        assert_eq!(join_url("", "img/x.png"), "img/x.png");
        assert_eq!(join_url("", "http://x.org/y"), "http://x.org/y");
    }
}
