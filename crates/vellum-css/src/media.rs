//! Media queries
//!
//! `[not|only] type and (feature[: value]) and ...`, comma separated.
//! Queries are stored parsed and evaluated against a [`MediaFeatures`]
//! snapshot whenever styles are resolved.

use crate::tokenizer::{split_number, split_top_level};
use crate::CssError;

/// Media type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaType {
    All,
    Screen,
    Print,
    Other(String),
}

impl MediaType {
    pub fn parse(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "all" => Self::All,
            "screen" => Self::Screen,
            "print" => Self::Print,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Device description supplied by the host
#[derive(Debug, Clone, PartialEq)]
pub struct MediaFeatures {
    pub media_type: MediaType,
    pub width: f32,
    pub height: f32,
    pub device_width: f32,
    pub device_height: f32,
    /// Bits per colour component, 0 for monochrome devices
    pub color: u32,
    pub color_index: u32,
    /// Bits per pixel on monochrome devices
    pub monochrome: u32,
    /// Dots per inch
    pub resolution: f32,
}

impl Default for MediaFeatures {
    fn default() -> Self {
        Self {
            media_type: MediaType::Screen,
            width: 800.0,
            height: 600.0,
            device_width: 800.0,
            device_height: 600.0,
            color: 8,
            color_index: 0,
            monochrome: 0,
            resolution: 96.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    Min,
    Max,
    Exact,
}

#[derive(Debug, Clone, PartialEq)]
struct FeatureExpr {
    name: String,
    bound: Bound,
    /// Raw value text, `None` for `(feature)` tests
    value: Option<String>,
}

/// One query of a list
#[derive(Debug, Clone, PartialEq)]
pub struct MediaQuery {
    negated: bool,
    media_type: MediaType,
    features: Vec<FeatureExpr>,
}

/// Comma-separated query list; matches when any query matches
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MediaQueryList {
    queries: Vec<MediaQuery>,
}

impl MediaQueryList {
    /// Parse a list. An empty list matches everything.
    pub fn parse(text: &str) -> Result<Self, CssError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Self::default());
        }
        let queries = split_top_level(text, ',')
            .into_iter()
            .map(MediaQuery::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { queries })
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    /// Evaluate against the host's snapshot
    pub fn matches(&self, features: &MediaFeatures) -> bool {
        self.queries.is_empty() || self.queries.iter().any(|q| q.matches(features))
    }
}

impl MediaQuery {
    fn parse(text: &str) -> Result<Self, CssError> {
        let invalid = || CssError::InvalidMediaQuery { query: text.trim().to_string() };
        let mut negated = false;
        let mut media_type = MediaType::All;
        let mut features = Vec::new();

        let mut rest = text.trim();
        let mut expect_type = true;
        while !rest.is_empty() {
            if let Some(inner) = rest.strip_prefix('(') {
                let close = inner.find(')').ok_or_else(invalid)?;
                features.push(FeatureExpr::parse(&inner[..close]).ok_or_else(invalid)?);
                rest = inner[close + 1..].trim_start();
                expect_type = false;
                continue;
            }

            let end = rest.find(|c: char| c.is_whitespace() || c == '(').unwrap_or(rest.len());
            let word = rest[..end].to_ascii_lowercase();
            rest = rest[end..].trim_start();

            match word.as_str() {
                "and" => {}
                "not" if expect_type => negated = true,
                "only" if expect_type => {}
                _ if expect_type => {
                    media_type = MediaType::parse(&word);
                    expect_type = false;
                }
                _ => return Err(invalid()),
            }
        }

        Ok(Self { negated, media_type, features })
    }

    fn matches(&self, features: &MediaFeatures) -> bool {
        let type_ok = match &self.media_type {
            MediaType::All => true,
            t => *t == features.media_type,
        };
        let result = type_ok && self.features.iter().all(|f| f.matches(features));
        result != self.negated
    }
}

impl FeatureExpr {
    fn parse(text: &str) -> Option<Self> {
        let (name, value) = match text.split_once(':') {
            Some((n, v)) => (n.trim().to_ascii_lowercase(), Some(v.trim().to_ascii_lowercase())),
            None => (text.trim().to_ascii_lowercase(), None),
        };
        let (bound, name) = if let Some(n) = name.strip_prefix("min-") {
            (Bound::Min, n.to_string())
        } else if let Some(n) = name.strip_prefix("max-") {
            (Bound::Max, n.to_string())
        } else {
            (Bound::Exact, name)
        };
        if name.is_empty() || (bound != Bound::Exact && value.is_none()) {
            return None;
        }
        Some(Self { name, bound, value })
    }

    fn matches(&self, f: &MediaFeatures) -> bool {
        let actual = match self.name.as_str() {
            "width" => f.width,
            "height" => f.height,
            "device-width" => f.device_width,
            "device-height" => f.device_height,
            "color" => f.color as f32,
            "color-index" => f.color_index as f32,
            "monochrome" => f.monochrome as f32,
            "resolution" => f.resolution,
            "aspect-ratio" => ratio(f.width, f.height),
            "device-aspect-ratio" => ratio(f.device_width, f.device_height),
            "orientation" => {
                let portrait = f.height >= f.width;
                return match self.value.as_deref() {
                    Some("portrait") => portrait,
                    Some("landscape") => !portrait,
                    _ => false,
                };
            }
            _ => return false,
        };

        let Some(value) = &self.value else {
            return actual != 0.0;
        };
        let Some(expected) = parse_feature_value(&self.name, value) else {
            return false;
        };
        match self.bound {
            Bound::Min => actual >= expected,
            Bound::Max => actual <= expected,
            Bound::Exact => (actual - expected).abs() < 0.01,
        }
    }
}

fn ratio(w: f32, h: f32) -> f32 {
    if h == 0.0 { 0.0 } else { w / h }
}

fn parse_feature_value(name: &str, value: &str) -> Option<f32> {
    if name.ends_with("aspect-ratio") {
        let (w, h) = value.split_once('/')?;
        let h: f32 = h.trim().parse().ok()?;
        return Some(ratio(w.trim().parse().ok()?, h));
    }
    let (num, unit) = split_number(value)?;
    Some(match unit {
        "" | "px" | "dpi" => num,
        "em" | "rem" => num * 16.0,
        "pt" => num * 96.0 / 72.0,
        "pc" => num * 16.0,
        "in" => num * 96.0,
        "cm" => num * 96.0 / 2.54,
        "mm" => num * 96.0 / 25.4,
        "dpcm" => num * 2.54,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(width: f32) -> MediaFeatures {
        MediaFeatures { width, ..MediaFeatures::default() }
    }

    #[test]
    fn test_media_type() {
        let screen = MediaQueryList::parse("screen").unwrap();
        let print = MediaQueryList::parse("print").unwrap();
        assert!(screen.matches(&features(800.0)));
        assert!(!print.matches(&features(800.0)));
        assert!(MediaQueryList::parse("not print").unwrap().matches(&features(800.0)));
    }

    #[test]
    fn test_width_ranges() {
        let list = MediaQueryList::parse("screen and (min-width: 600px) and (max-width: 900px)").unwrap();
        assert!(list.matches(&features(800.0)));
        assert!(!list.matches(&features(500.0)));
        assert!(!list.matches(&features(1000.0)));
    }

    #[test]
    fn test_any_query_in_list() {
        let list = MediaQueryList::parse("print, (max-width: 40em)").unwrap();
        assert!(list.matches(&features(600.0)));
        assert!(!list.matches(&features(700.0)));
    }

    #[test]
    fn test_orientation_and_color() {
        let f = MediaFeatures { width: 300.0, height: 500.0, ..MediaFeatures::default() };
        assert!(MediaQueryList::parse("(orientation: portrait)").unwrap().matches(&f));
        assert!(MediaQueryList::parse("(color)").unwrap().matches(&f));
        assert!(!MediaQueryList::parse("(monochrome)").unwrap().matches(&f));
    }

    #[test]
    fn test_invalid_query() {
        assert!(MediaQueryList::parse("screen print").is_err());
        assert!(MediaQueryList::parse("(min-width)").is_err());
    }
}
