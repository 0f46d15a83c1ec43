//! Vellum CSS - Stylesheet engine & style resolution
//!
//! Hand-rolled stylesheet parser, right-to-left selector matching, media
//! queries, the cascade and computed values.

mod cache;
mod cascade;
mod color;
mod computed;
mod host;
mod media;
mod parser;
mod presentational;
mod properties;
mod selectors;
mod shorthand;
mod tokenizer;
mod values;

use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;

pub use cache::{CacheStats, StyleCache};
pub use cascade::{CascadeKey, NodeStyles, StyleMap, StyleResolver};
pub use computed::{
    Background, BorderSide, ComputedStyle, DEFAULT_FONT_FAMILY, LengthEdges, LineHeight,
    TextDecoration,
};
pub use host::{DefaultStyleHost, StyleHost, join_url};
pub use media::{MediaFeatures, MediaQuery, MediaQueryList, MediaType};
pub use parser::{CssParser, parse_declarations};
pub use properties::{
    BackgroundRepeat, BorderCollapse, BorderStyle, BoxSizing, Clear, DecorationStyle, Display,
    Float, FontStyle, ListStylePosition, ListStyleType, Overflow, Position, TextAlign,
    TextTransform, VerticalAlign, Visibility, WhiteSpace,
};
pub use selectors::{
    AttrOp, Combinator, Compound, Nth, PseudoClass, PseudoElement, Selector, SimpleSelector,
};
pub use values::{Color, Length, LengthContext, LengthUnit};

/// Default user-agent stylesheet
pub const MASTER_CSS: &str = include_str!("master.css");

/// Parse a stylesheet with no host (imports are not followed)
pub fn parse_stylesheet(css: &str) -> Stylesheet {
    CssParser::new().parse(css)
}

/// Parsed stylesheet, immutable once built
#[derive(Debug, Default)]
pub struct Stylesheet {
    pub rules: Vec<StyleRule>,
    pub imports: Vec<ImportRecord>,
    pub errors: Vec<CssError>,
    pub base_url: String,
}

impl Stylesheet {
    /// Number of style rules (one per selector)
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// One selector with its declarations
#[derive(Debug, Clone)]
pub struct StyleRule {
    pub selector: Selector,
    /// Shared by every selector of the same source rule
    pub block: Arc<DeclarationBlock>,
    /// Enclosing `@media` lists; all must match
    pub media: Vec<Arc<MediaQueryList>>,
    /// Source order within the sheet, imports included
    pub order: usize,
}

/// `@import` seen while parsing
#[derive(Debug, Clone)]
pub struct ImportRecord {
    pub url: String,
    pub media: Option<Arc<MediaQueryList>>,
    pub loaded: bool,
}

/// CSS declaration (property: value)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Declaration {
    /// Lowercase longhand name
    pub name: String,
    pub value: String,
    pub important: bool,
}

impl Declaration {
    pub fn new(name: &str, value: &str, important: bool) -> Self {
        Self { name: name.to_string(), value: value.to_string(), important }
    }
}

/// Ordered longhand declarations of one rule
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclarationBlock {
    pub declarations: Vec<Declaration>,
}

impl DeclarationBlock {
    /// Content hash, used by the style cache
    pub fn content_hash(&self) -> u64 {
        let mut h = DefaultHasher::new();
        self.declarations.hash(&mut h);
        h.finish()
    }

    /// Last declaration for `name`
    pub fn get(&self, name: &str) -> Option<&Declaration> {
        self.declarations.iter().rev().find(|d| d.name == name)
    }
}

/// Selector specificity (ids, classes+attributes+pseudo-classes, types)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Specificity(pub u32, pub u32, pub u32);

impl std::ops::Add for Specificity {
    type Output = Specificity;

    fn add(self, rhs: Specificity) -> Specificity {
        Specificity(self.0 + rhs.0, self.1 + rhs.1, self.2 + rhs.2)
    }
}

/// Where a declaration came from, weakest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Origin {
    UserAgent,
    Presentational,
    Author,
    Inline,
}

/// Stylesheet diagnostic; the offending item is dropped
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CssError {
    #[error("Invalid selector `{selector}`: {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Invalid declaration `{text}`")]
    InvalidDeclaration { text: String },

    #[error("Unbalanced block near `{context}`")]
    UnbalancedBlock { context: String },

    #[error("Failed to import {url}")]
    ImportFailed { url: String },

    #[error("Invalid media query `{query}`")]
    InvalidMediaQuery { query: String },
}

/// Unusable property value; the property falls back to inherited/initial
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValueError {
    #[error("Invalid length `{0}`")]
    Length(String),

    #[error("Invalid color `{0}`")]
    Color(String),

    #[error("Unknown keyword `{value}` for {property}")]
    Keyword { property: String, value: String },

    #[error("Invalid number `{0}`")]
    Number(String),
}
