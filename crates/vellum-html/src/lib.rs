//! Vellum HTML
//!
//! Hand-rolled markup scanner plus a tolerant tree builder. Malformed input
//! never fails: problems are collected as [`ParseError`] diagnostics next to
//! the best-effort tree.

mod builder;
mod entities;
mod source;
mod tokenizer;

pub use builder::DocumentBuilder;
pub use entities::resolve as resolve_entity;
pub use source::{CharSource, StrSource, Utf8Source};
pub use tokenizer::{Token, Tokenizer};

use vellum_dom::{DomTree, NodeId};

/// Parse a string into a document tree
pub fn parse(html: &str) -> ParseOutput {
    parse_source(StrSource::new(html))
}

/// Parse UTF-8 bytes into a document tree
pub fn parse_bytes(bytes: &[u8]) -> ParseOutput {
    parse_source(Utf8Source::new(bytes))
}

/// Parse from any character source
pub fn parse_source<S: CharSource>(source: S) -> ParseOutput {
    let mut tokenizer = Tokenizer::new(source);
    let mut builder = DocumentBuilder::new();

    loop {
        let token = tokenizer.next_token();
        if token == Token::End {
            break;
        }
        builder.process(token, tokenizer.line());
    }

    let (tree, root, mut errors) = builder.finish();
    let mut lexical = tokenizer.take_errors();
    lexical.append(&mut errors);

    tracing::debug!(nodes = tree.len(), errors = lexical.len(), "parsed document");
    ParseOutput { tree, root, errors: lexical }
}

/// Result of parsing markup
#[derive(Debug)]
pub struct ParseOutput {
    pub tree: DomTree,
    /// The `html` element
    pub root: NodeId,
    pub errors: Vec<ParseError>,
}

/// Recoverable parse diagnostic
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Unterminated {construct} at line {line}")]
    Unterminated { construct: &'static str, line: u32 },

    #[error("Stray end tag </{tag}> at line {line}")]
    StrayEndTag { tag: String, line: u32 },

    #[error("Unclosed element: <{tag}>")]
    UnclosedElement { tag: String },
}
