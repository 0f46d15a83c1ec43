//! Style Cascade & Resolver
//!
//! Computes the final styles for DOM elements by:
//! 1. Matching selectors from the master and author sheets
//! 2. Adding presentational hints and the inline `style` attribute
//! 3. Sorting by importance, origin, specificity and source order
//! 4. Applying the sorted declarations on top of the parent style

use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;

use vellum_dom::{DomTree, NodeId};

use crate::computed::ComputeContext;
use crate::{
    ComputedStyle, Declaration, MediaFeatures, Origin, PseudoElement, Specificity, StyleCache,
    StyleHost, Stylesheet, parse_declarations, presentational,
};

/// Cascade position of one declaration; ascending order is weakest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CascadeKey {
    pub important: bool,
    pub origin: Origin,
    pub specificity: Specificity,
    /// Index of the sheet within its origin
    pub sheet: usize,
    /// Rule order within the sheet
    pub order: usize,
}

impl CascadeKey {
    fn hint(origin: Origin, important: bool) -> Self {
        Self { important, origin, specificity: Specificity::default(), sheet: 0, order: 0 }
    }
}

/// Styles of one element and its generated boxes
#[derive(Debug, Clone)]
pub struct NodeStyles {
    pub style: Arc<ComputedStyle>,
    /// Cache key, used as the parent key of the children
    pub key: u64,
    pub before: Option<Arc<ComputedStyle>>,
    pub after: Option<Arc<ComputedStyle>>,
}

/// Element styles indexed by node
#[derive(Debug, Clone, Default)]
pub struct StyleMap {
    styles: Vec<Option<NodeStyles>>,
}

impl StyleMap {
    pub fn get(&self, node: NodeId) -> Option<&NodeStyles> {
        self.styles.get(node.index()).and_then(Option::as_ref)
    }

    /// Computed style of an element
    pub fn style(&self, node: NodeId) -> Option<&Arc<ComputedStyle>> {
        self.get(node).map(|s| &s.style)
    }

    /// Number of styled elements
    pub fn len(&self) -> usize {
        self.styles.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert(&mut self, node: NodeId, styles: NodeStyles) {
        let idx = node.index();
        if self.styles.len() <= idx {
            self.styles.resize(idx + 1, None);
        }
        self.styles[idx] = Some(styles);
    }
}

struct MatchContext {
    features: MediaFeatures,
    lang: String,
}

/// Style resolver - computes styles for DOM elements
pub struct StyleResolver {
    /// User agent stylesheet
    master: Arc<Stylesheet>,
    /// Author stylesheets in document order
    authors: Vec<Arc<Stylesheet>>,
    initial: ComputedStyle,
    base_url: String,
    cache: StyleCache,
}

impl StyleResolver {
    pub fn new(master: Arc<Stylesheet>) -> Self {
        Self {
            master,
            authors: Vec::new(),
            initial: ComputedStyle::default(),
            base_url: String::new(),
            cache: StyleCache::new(),
        }
    }

    /// Default font for the root element
    pub fn with_default_font(mut self, family: &str, size: f32) -> Self {
        self.initial = ComputedStyle::initial(family, size);
        self.cache.clear();
        self
    }

    /// Base URL for `url()` in inline styles
    pub fn set_base_url(&mut self, base_url: &str) {
        self.base_url = base_url.to_string();
    }

    /// Add an author stylesheet; later sheets win ties
    pub fn add_author_sheet(&mut self, sheet: Arc<Stylesheet>) {
        self.authors.push(sheet);
    }

    pub fn author_sheets(&self) -> &[Arc<Stylesheet>] {
        &self.authors
    }

    /// Initial style, carrying the default font
    pub fn initial_style(&self) -> &ComputedStyle {
        &self.initial
    }

    pub fn cache(&self) -> &StyleCache {
        &self.cache
    }

    /// Declarations that apply to `node` (or one of its pseudo-elements),
    /// sorted weakest first
    pub fn collect(
        &self,
        tree: &DomTree,
        node: NodeId,
        pseudo: Option<PseudoElement>,
        host: &dyn StyleHost,
    ) -> Vec<(CascadeKey, Declaration)> {
        let ctx = MatchContext { features: host.media_features(), lang: host.language() };
        self.collect_with(tree, node, pseudo, &ctx, host)
    }

    fn collect_with(
        &self,
        tree: &DomTree,
        node: NodeId,
        pseudo: Option<PseudoElement>,
        ctx: &MatchContext,
        host: &dyn StyleHost,
    ) -> Vec<(CascadeKey, Declaration)> {
        let mut out = Vec::new();
        let Some(elem) = tree.element(node) else {
            return out;
        };

        let sheets = std::iter::once((Origin::UserAgent, 0, &self.master))
            .chain(self.authors.iter().enumerate().map(|(i, s)| (Origin::Author, i, s)));
        for (origin, sheet, stylesheet) in sheets {
            for rule in &stylesheet.rules {
                if rule.selector.pseudo_element != pseudo
                    || !rule.media.iter().all(|m| m.matches(&ctx.features))
                    || !rule.selector.matches(tree, node, &ctx.lang)
                {
                    continue;
                }
                let specificity = rule.selector.specificity;
                out.extend(rule.block.declarations.iter().map(|d| {
                    let key = CascadeKey { important: d.important, origin, specificity, sheet, order: rule.order };
                    (key, d.clone())
                }));
            }
        }

        if pseudo.is_none() {
            out.extend(
                presentational::hints(tree, node)
                    .into_iter()
                    .map(|d| (CascadeKey::hint(Origin::Presentational, false), d)),
            );
            if let Some(inline) = elem.get_attr("style") {
                let (block, _errors) = parse_declarations(inline, &self.base_url, host);
                out.extend(
                    block
                        .declarations
                        .into_iter()
                        .map(|d| (CascadeKey::hint(Origin::Inline, d.important), d)),
                );
            }
        }

        out.sort_by_key(|(key, _)| *key);
        out
    }

    /// Resolve every element of `tree`, parents before children
    pub fn compute_tree(&mut self, tree: &DomTree, host: &dyn StyleHost) -> StyleMap {
        let ctx = MatchContext { features: host.media_features(), lang: host.language() };
        let mut map = StyleMap { styles: Vec::with_capacity(tree.len()) };

        for node in tree.descendants(tree.root()) {
            let Some(elem) = tree.element(node) else {
                continue;
            };
            let parent = tree
                .parent(node)
                .and_then(|p| map.get(p))
                .map(|p| (p.key, Arc::clone(&p.style)));
            let is_root = parent.is_none();

            let decls = self.collect_with(tree, node, None, &ctx, host);
            let hash = declaration_hash(&decls, is_root);
            let parent_key = parent.as_ref().map_or(0, |(key, _)| *key);

            let (key, style) = match self.cache.get(hash, parent_key) {
                Some(hit) => hit,
                None => {
                    let refs: Vec<&Declaration> = decls.iter().map(|(_, d)| d).collect();
                    let compute = ComputeContext { host, initial: &self.initial, element: Some(elem), is_root };
                    let style = Arc::new(ComputedStyle::compute(&refs, parent.as_ref().map(|(_, s)| &**s), &compute));
                    let key = self.cache.insert(hash, parent_key, Arc::clone(&style));
                    (key, style)
                }
            };

            let before = self.pseudo_style(tree, node, PseudoElement::Before, &style, &ctx, host);
            let after = self.pseudo_style(tree, node, PseudoElement::After, &style, &ctx, host);
            tracing::trace!(tag = %elem.tag, display = ?style.display, "style resolved");
            map.insert(node, NodeStyles { style, key, before, after });
        }

        let stats = self.cache.stats();
        tracing::debug!(
            elements = map.len(),
            cache_hits = stats.hits,
            cache_misses = stats.misses,
            "styles resolved"
        );
        map
    }

    /// Style of a generated box; `None` unless it has content and is displayed
    fn pseudo_style(
        &self,
        tree: &DomTree,
        node: NodeId,
        pseudo: PseudoElement,
        element_style: &ComputedStyle,
        ctx: &MatchContext,
        host: &dyn StyleHost,
    ) -> Option<Arc<ComputedStyle>> {
        let decls = self.collect_with(tree, node, Some(pseudo), ctx, host);
        if decls.is_empty() {
            return None;
        }
        let refs: Vec<&Declaration> = decls.iter().map(|(_, d)| d).collect();
        let compute = ComputeContext { host, initial: &self.initial, element: tree.element(node), is_root: false };
        let style = ComputedStyle::compute(&refs, Some(element_style), &compute);
        (style.content.is_some() && style.display != crate::Display::None).then(|| Arc::new(style))
    }
}

fn declaration_hash(decls: &[(CascadeKey, Declaration)], is_root: bool) -> u64 {
    let mut h = DefaultHasher::new();
    is_root.hash(&mut h);
    for (_, decl) in decls {
        decl.hash(&mut h);
    }
    h.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Color, DefaultStyleHost, Display, Length, parse_stylesheet};

    fn tree_with_paragraph(attrs: &[(&str, &str)]) -> (DomTree, NodeId, NodeId) {
        let mut tree = DomTree::new();
        let root = tree.root();
        let html = tree.create_element("html");
        let p = tree.create_element("p");
        if let Some(elem) = tree.element_mut(p) {
            for (n, v) in attrs {
                elem.set_attr(n, v);
            }
        }
        tree.append_child(root, html);
        tree.append_child(html, p);
        (tree, html, p)
    }

    fn resolver(master: &str, author: &str) -> StyleResolver {
        let mut r = StyleResolver::new(Arc::new(parse_stylesheet(master)));
        r.add_author_sheet(Arc::new(parse_stylesheet(author)));
        r
    }

    #[test]
    fn test_origin_order() {
        let (tree, _, p) = tree_with_paragraph(&[("style", "color: blue")]);
        let mut r = resolver("p { color: red; display: block }", "p { color: green }");
        let styles = r.compute_tree(&tree, &DefaultStyleHost);
        let style = styles.style(p).unwrap();
        assert_eq!(style.color, Color::rgb(0, 0, 255));
        assert_eq!(style.display, Display::Block);
    }

    #[test]
    fn test_important_beats_inline() {
        let (tree, _, p) = tree_with_paragraph(&[("style", "color: blue")]);
        let mut r = resolver("", "p { color: green !important }");
        let styles = r.compute_tree(&tree, &DefaultStyleHost);
        assert_eq!(styles.style(p).unwrap().color, Color::rgb(0, 128, 0));
    }

    #[test]
    fn test_specificity_then_order() {
        let (tree, _, p) = tree_with_paragraph(&[("id", "x"), ("class", "c")]);
        let mut r = resolver("", "#x { width: 1px } p.c { width: 2px } p { width: 3px } .c { width: 4px }");
        let styles = r.compute_tree(&tree, &DefaultStyleHost);
        assert_eq!(styles.style(p).unwrap().width, Length::px(1.0));

        let mut r = resolver("", "p.c { width: 2px } .c.c { width: 5px }");
        let styles = r.compute_tree(&tree, &DefaultStyleHost);
        assert_eq!(styles.style(p).unwrap().width, Length::px(5.0));
    }

    #[test]
    fn test_root_is_blockified_and_children_inherit() {
        let (tree, html, p) = tree_with_paragraph(&[]);
        let mut r = resolver("", "html { display: inline; color: red }");
        let styles = r.compute_tree(&tree, &DefaultStyleHost);
        assert_eq!(styles.style(html).unwrap().display, Display::Block);
        assert_eq!(styles.style(p).unwrap().color, Color::rgb(255, 0, 0));
        assert_eq!(styles.style(p).unwrap().display, Display::Inline);
    }

    #[test]
    fn test_pseudo_elements() {
        let (tree, _, p) = tree_with_paragraph(&[("title", "T")]);
        let mut r = resolver("", "p::before { content: \"<\" attr(title) } p:after { color: red }");
        let styles = r.compute_tree(&tree, &DefaultStyleHost);
        let entry = styles.get(p).unwrap();
        assert_eq!(entry.before.as_ref().unwrap().content.as_deref(), Some("<T"));
        assert!(entry.after.is_none());
    }

    #[test]
    fn test_cache_shares_identical_styles() {
        let mut tree = DomTree::new();
        let root = tree.root();
        let html = tree.create_element("html");
        tree.append_child(root, html);
        for _ in 0..5 {
            let li = tree.create_element("li");
            tree.append_child(html, li);
        }
        let mut r = resolver("li { display: list-item }", "");
        let styles = r.compute_tree(&tree, &DefaultStyleHost);
        assert_eq!(styles.len(), 6);
        assert_eq!(r.cache().len(), 2);
        assert_eq!(r.cache().stats().hits, 4);
    }
}
