//! Font requests and text measurement
//!
//! Fonts are requested from the host once per distinct description and
//! kept for the lifetime of the document. When the host cannot supply a
//! font, approximate metrics are used so layout can still proceed.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use vellum_css::{ComputedStyle, FontStyle};

use crate::LayoutHost;

/// Opaque host font identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FontHandle(pub u64);

impl FontHandle {
    /// Stands in for fonts the host could not create
    pub const FALLBACK: FontHandle = FontHandle(u64::MAX);
}

/// Vertical font metrics in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FontMetrics {
    pub ascent: f32,
    pub descent: f32,
    /// Default line height (`line-height: normal`)
    pub height: f32,
    pub x_height: f32,
}

impl FontMetrics {
    /// Metrics derived from the size alone
    pub fn approximate(size: f32) -> Self {
        Self { ascent: size * 0.8, descent: size * 0.2, height: size, x_height: size * 0.5 }
    }
}

/// What layout asks the host for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontDescription {
    /// Family names in preference order
    pub families: Vec<String>,
    pub size: f32,
    pub weight: u16,
    pub italic: bool,
    pub small_caps: bool,
}

impl FontDescription {
    pub fn from_style(style: &ComputedStyle) -> Self {
        Self {
            families: style.font_family.clone(),
            size: style.font_size,
            weight: style.font_weight,
            italic: style.font_style != FontStyle::Normal,
            small_caps: style.small_caps,
        }
    }
}

impl Eq for FontDescription {}

impl Hash for FontDescription {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.families.hash(state);
        self.size.to_bits().hash(state);
        self.weight.hash(state);
        self.italic.hash(state);
        self.small_caps.hash(state);
    }
}

/// A resolved font
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Font {
    pub handle: FontHandle,
    pub metrics: FontMetrics,
    pub size: f32,
}

impl Font {
    pub fn is_fallback(&self) -> bool {
        self.handle == FontHandle::FALLBACK
    }

    /// Underline thickness
    pub fn decoration_thickness(&self) -> f32 {
        (self.size / 14.0).max(1.0)
    }
}

/// Per-document font and word-width cache
#[derive(Debug, Default)]
pub struct FontCache {
    fonts: HashMap<FontDescription, Font>,
    widths: HashMap<(FontHandle, u32, String), f32>,
}

impl FontCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Font for an element's computed style
    pub fn font(&mut self, host: &dyn LayoutHost, style: &ComputedStyle) -> Font {
        self.font_for(host, FontDescription::from_style(style))
    }

    pub fn font_for(&mut self, host: &dyn LayoutHost, desc: FontDescription) -> Font {
        if let Some(font) = self.fonts.get(&desc) {
            return *font;
        }
        let size = desc.size;
        let font = match host.create_font(&desc) {
            Some((handle, metrics)) => Font { handle, metrics, size },
            None => {
                tracing::warn!(families = ?desc.families, size, "host has no font, using fallback metrics");
                Font { handle: FontHandle::FALLBACK, metrics: FontMetrics::approximate(size), size }
            }
        };
        self.fonts.insert(desc, font);
        font
    }

    /// Advance width of `text`
    pub fn text_width(&mut self, host: &dyn LayoutHost, font: &Font, text: &str) -> f32 {
        if text.is_empty() {
            return 0.0;
        }
        if font.is_fallback() {
            return text.chars().count() as f32 * font.size * 0.5;
        }
        let key = (font.handle, font.size.to_bits(), text.to_string());
        if let Some(w) = self.widths.get(&key) {
            return *w;
        }
        let w = host.text_width(text, font.handle);
        self.widths.insert(key, w);
        w
    }

    /// Number of distinct fonts requested so far
    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }
}
