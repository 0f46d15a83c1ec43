//! CSS Parser
//!
//! Turns stylesheet text into [`Stylesheet`] rules. Errors never abort the
//! sheet: the offending selector, declaration or block is dropped and a
//! [`CssError`] is recorded.

use std::sync::Arc;

use crate::host::join_url;
use crate::tokenizer::{components, find_top_level, function_args, matching_brace, split_top_level, strip_comments, unquote};
use crate::{
    CssError, Declaration, DeclarationBlock, ImportRecord, MediaQueryList, Selector, StyleHost,
    StyleRule, Stylesheet, shorthand,
};

/// Nested `@import` limit
const MAX_IMPORT_DEPTH: usize = 8;

/// CSS parser
#[derive(Default)]
pub struct CssParser<'a> {
    host: Option<&'a dyn StyleHost>,
    base_url: String,
    depth: usize,
}

impl<'a> CssParser<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Host used for `@import` fetches and URL resolution
    pub fn with_host(mut self, host: &'a dyn StyleHost) -> Self {
        self.host = Some(host);
        self
    }

    /// Base for relative `url()` and `@import` references
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    fn child(&self, base_url: &str) -> CssParser<'a> {
        CssParser { host: self.host, base_url: base_url.to_string(), depth: self.depth + 1 }
    }

    /// Parse a stylesheet
    pub fn parse(&self, css: &str) -> Stylesheet {
        let mut sheet = Stylesheet { base_url: self.base_url.clone(), ..Stylesheet::default() };
        let mut order = 0;
        self.parse_into(css, &[], &mut sheet, &mut order);
        tracing::debug!(
            rules = sheet.rules.len(),
            imports = sheet.imports.len(),
            errors = sheet.errors.len(),
            "stylesheet parsed"
        );
        sheet
    }

    fn parse_into(
        &self,
        css: &str,
        media: &[Arc<MediaQueryList>],
        sheet: &mut Stylesheet,
        order: &mut usize,
    ) {
        let css = strip_comments(css);
        self.parse_rules(&css, media, sheet, order);
    }

    fn parse_rules(
        &self,
        text: &str,
        media: &[Arc<MediaQueryList>],
        sheet: &mut Stylesheet,
        order: &mut usize,
    ) {
        let mut rest = text;
        loop {
            rest = rest.trim_start();
            if rest.is_empty() {
                break;
            }

            if rest.starts_with('@') {
                rest = self.parse_at_rule(rest, media, sheet, order);
                continue;
            }

            let Some(open) = find_top_level(rest, &['{', '}']) else {
                sheet.errors.push(CssError::UnbalancedBlock { context: snippet(rest) });
                tracing::warn!(context = %snippet(rest), "Dropping trailing text without a block");
                break;
            };
            if rest[open..].starts_with('}') {
                sheet.errors.push(CssError::UnbalancedBlock { context: snippet(rest) });
                tracing::warn!(context = %snippet(rest), "Skipping stray `}}`");
                rest = &rest[open + 1..];
                continue;
            }

            let prelude = &rest[..open];
            let body_start = open + 1;
            let (body, next) = match matching_brace(&rest[body_start..]) {
                Some(close) => (&rest[body_start..body_start + close], &rest[body_start + close + 1..]),
                None => {
                    // Unclosed blocks end at end of input
                    sheet.errors.push(CssError::UnbalancedBlock { context: snippet(prelude) });
                    (&rest[body_start..], "")
                }
            };
            self.add_rule(prelude, body, media, sheet, order);
            rest = next;
        }
    }

    /// Handle one at-rule starting at `text`; returns the remaining input
    fn parse_at_rule<'t>(
        &self,
        text: &'t str,
        media: &[Arc<MediaQueryList>],
        sheet: &mut Stylesheet,
        order: &mut usize,
    ) -> &'t str {
        let name_end = text[1..]
            .find(|c: char| !(c.is_alphanumeric() || c == '-' || c == '_'))
            .map_or(text.len(), |i| i + 1);
        let name = text[1..name_end].to_ascii_lowercase();

        let Some(end) = find_top_level(text, &[';', '{']) else {
            // Statement running to end of input
            if name == "import" {
                self.import(&text[name_end..], media, sheet, order);
            }
            return "";
        };
        let prelude = &text[name_end..end];

        if text[end..].starts_with(';') {
            match name.as_str() {
                "import" => self.import(prelude, media, sheet, order),
                _ => tracing::trace!(rule = %name, "Skipping at-rule statement"),
            }
            return &text[end + 1..];
        }

        let body_start = end + 1;
        let (body, next) = match matching_brace(&text[body_start..]) {
            Some(close) => (&text[body_start..body_start + close], &text[body_start + close + 1..]),
            None => {
                sheet.errors.push(CssError::UnbalancedBlock { context: snippet(text) });
                (&text[body_start..], "")
            }
        };

        if name == "media" {
            match MediaQueryList::parse(prelude) {
                Ok(list) => {
                    let mut nested = media.to_vec();
                    nested.push(Arc::new(list));
                    self.parse_rules(body, &nested, sheet, order);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Dropping @media block");
                    sheet.errors.push(e);
                }
            }
        } else {
            tracing::trace!(rule = %name, "Skipping at-rule block");
        }
        next
    }

    fn import(
        &self,
        prelude: &str,
        media: &[Arc<MediaQueryList>],
        sheet: &mut Stylesheet,
        order: &mut usize,
    ) {
        let parts = components(prelude.trim());
        let Some(first) = parts.first() else {
            sheet.errors.push(CssError::InvalidDeclaration { text: "@import".into() });
            return;
        };
        let href = match function_args(first, "url") {
            Some(inner) => unquote(inner),
            None => unquote(first),
        };
        let url = self.resolve(&href);

        let media_text = prelude.trim()[first.len()..].trim();
        let import_media = match MediaQueryList::parse(media_text) {
            Ok(list) if list.is_empty() => None,
            Ok(list) => Some(Arc::new(list)),
            Err(e) => {
                sheet.errors.push(e);
                return;
            }
        };

        let fetched = match self.host {
            _ if self.depth >= MAX_IMPORT_DEPTH => {
                tracing::warn!(url = %url, "Import nesting too deep");
                None
            }
            Some(host) => host.fetch_stylesheet(&url),
            None => None,
        };

        let loaded = fetched.is_some();
        sheet.imports.push(ImportRecord { url: url.clone(), media: import_media.clone(), loaded });

        match fetched {
            Some(css) => {
                let mut nested = media.to_vec();
                nested.extend(import_media);
                self.child(&url).parse_into(&css, &nested, sheet, order);
            }
            None => {
                tracing::warn!(url = %url, "Failed to import stylesheet");
                sheet.errors.push(CssError::ImportFailed { url });
            }
        }
    }

    fn resolve(&self, url: &str) -> String {
        match self.host {
            Some(host) => host.resolve_url(&self.base_url, url),
            None => join_url(&self.base_url, url),
        }
    }

    fn add_rule(
        &self,
        prelude: &str,
        body: &str,
        media: &[Arc<MediaQueryList>],
        sheet: &mut Stylesheet,
        order: &mut usize,
    ) {
        let block = Arc::new(self.declarations(body, &mut sheet.errors));
        let rule_order = *order;
        *order += 1;

        for text in split_top_level(prelude, ',') {
            match Selector::parse(text) {
                Ok(selector) => sheet.rules.push(StyleRule {
                    selector,
                    block: Arc::clone(&block),
                    media: media.to_vec(),
                    order: rule_order,
                }),
                Err(e) => {
                    tracing::warn!(error = %e, "Dropping selector");
                    sheet.errors.push(e);
                }
            }
        }
    }

    fn declarations(&self, text: &str, errors: &mut Vec<CssError>) -> DeclarationBlock {
        let mut block = DeclarationBlock::default();
        for item in split_top_level(text, ';') {
            let item = item.trim();
            if item.is_empty() {
                continue;
            }
            match self.declaration(item) {
                Some(decls) => block.declarations.extend(decls),
                None => {
                    tracing::warn!(declaration = %item, "Dropping invalid declaration");
                    errors.push(CssError::InvalidDeclaration { text: item.to_string() });
                }
            }
        }
        block
    }

    fn declaration(&self, item: &str) -> Option<Vec<Declaration>> {
        let (name, value) = item.split_once(':')?;
        let name = name.trim().to_ascii_lowercase();
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return None;
        }

        let mut value = value.trim();
        let mut important = false;
        if let Some(bang) = find_top_level(value, &['!']) {
            if !value[bang + 1..].trim().eq_ignore_ascii_case("important") {
                return None;
            }
            important = true;
            value = value[..bang].trim_end();
        }
        if value.is_empty() {
            return None;
        }

        let value = self.resolve_urls(value);
        shorthand::expand(&name, &value, important)
    }

    /// Rewrite every `url(...)` in a value to an absolute reference
    fn resolve_urls(&self, value: &str) -> String {
        let mut out = String::with_capacity(value.len());
        let mut rest = value;
        while let Some(start) = rest.to_ascii_lowercase().find("url(") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 4..];
            let Some(close) = after.find(')') else {
                out.push_str(&rest[start..]);
                return out;
            };
            let target = unquote(&after[..close]);
            out.push_str("url(");
            out.push_str(&self.resolve(&target));
            out.push(')');
            rest = &after[close + 1..];
        }
        out.push_str(rest);
        out
    }
}

/// Parse the body of a `style` attribute
pub fn parse_declarations(
    text: &str,
    base_url: &str,
    host: &dyn StyleHost,
) -> (DeclarationBlock, Vec<CssError>) {
    let parser = CssParser::new().with_host(host).with_base_url(base_url);
    let mut errors = Vec::new();
    let block = parser.declarations(&strip_comments(text), &mut errors);
    (block, errors)
}

fn snippet(text: &str) -> String {
    text.trim().chars().take(40).collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::{DefaultStyleHost, Specificity};

    struct SheetHost(HashMap<&'static str, &'static str>);

    impl StyleHost for SheetHost {
        fn fetch_stylesheet(&self, url: &str) -> Option<String> {
            self.0.get(url).map(|s| s.to_string())
        }
    }

    #[test]
    fn test_parse_rules() {
        let sheet = CssParser::new().parse("h1, .title { color: red; margin: 0 } p { color: blue !important; }");
        assert_eq!(sheet.len(), 3);
        assert_eq!(sheet.rules[0].order, sheet.rules[1].order);
        assert_eq!(sheet.rules[1].selector.specificity, Specificity(0, 1, 0));
        assert_eq!(sheet.rules[0].block.declarations.len(), 5);
        let p = &sheet.rules[2].block.declarations[0];
        assert!(p.important);
        assert_eq!(p.value, "blue");
        assert!(sheet.errors.is_empty());
    }

    #[test]
    fn test_bad_selector_drops_only_itself() {
        let sheet = CssParser::new().parse("p, div >, span { color: red }");
        assert_eq!(sheet.len(), 2);
        assert_eq!(sheet.errors.len(), 1);
        assert!(matches!(sheet.errors[0], CssError::InvalidSelector { .. }));
    }

    #[test]
    fn test_bad_declaration_dropped() {
        let sheet = CssParser::new().parse("p { color red; width: 10px; margin: 1px 2px 3px 4px 5px }");
        let decls = &sheet.rules[0].block.declarations;
        assert_eq!(decls.len(), 1);
        assert_eq!(decls[0].name, "width");
        assert_eq!(sheet.errors.len(), 2);
    }

    #[test]
    fn test_media_and_skipped_at_rules() {
        let css = "@charset \"utf-8\"; @font-face { src: url(x) } @media print { p { color: red } } div { color: blue }";
        let sheet = CssParser::new().parse(css);
        assert_eq!(sheet.len(), 2);
        assert_eq!(sheet.rules[0].media.len(), 1);
        assert!(sheet.rules[1].media.is_empty());
        assert!(sheet.rules[0].order < sheet.rules[1].order);
    }

    #[test]
    fn test_unbalanced_block_recovers() {
        let sheet = CssParser::new().parse("} p { color: red }");
        assert_eq!(sheet.len(), 1);
        assert_eq!(sheet.errors.len(), 1);

        let sheet = CssParser::new().parse("p { color: red");
        assert_eq!(sheet.len(), 1);
        assert_eq!(sheet.rules[0].block.declarations.len(), 1);
    }

    #[test]
    fn test_import_inlined_before_rules() {
        let host = SheetHost(HashMap::from([(
            "http://x.org/css/base.css",
            "p { color: green } span { background: url(dot.png) }",
        )]));
        let css = "@import url(\"base.css\"); @import \"missing.css\"; p { color: red }";
        let sheet = CssParser::new().with_host(&host).with_base_url("http://x.org/css/main.css").parse(css);

        assert_eq!(sheet.imports.len(), 2);
        assert!(sheet.imports[0].loaded);
        assert!(!sheet.imports[1].loaded);
        assert_eq!(sheet.errors, vec![CssError::ImportFailed { url: "http://x.org/css/missing.css".into() }]);
        assert_eq!(sheet.len(), 3);
        assert_eq!(sheet.rules[0].block.declarations[0].value, "green");
        assert!(sheet.rules[0].order < sheet.rules[2].order);
        let bg = sheet.rules[1].block.get("background-image").unwrap();
        assert_eq!(bg.value, "url(http://x.org/css/dot.png)");
    }

    #[test]
    fn test_import_cycle_is_bounded() {
        let host = SheetHost(HashMap::from([("http://x.org/a.css", "@import \"a.css\"; p { color: red }")]));
        let sheet = CssParser::new().with_host(&host).with_base_url("http://x.org/").parse("@import \"a.css\";");
        assert_eq!(sheet.len(), MAX_IMPORT_DEPTH);
        assert!(matches!(sheet.errors.last(), Some(CssError::ImportFailed { .. })));
    }

    #[test]
    fn test_parse_style_attribute() {
        let (block, errors) = parse_declarations("color: red; padding: 1px 2px; bogus", "", &DefaultStyleHost);
        assert_eq!(block.declarations.len(), 5);
        assert_eq!(errors.len(), 1);
    }
}
