//! Document builder
//!
//! Feeds scanner tokens into a [`DomTree`], recovering from sloppy markup the
//! way browsers traditionally do: implicit `body`, implicit table sections
//! and rows, end-tag omission, and unwinding to the nearest matching open
//! element.

use vellum_dom::{DomTree, ElementKind, NodeId};

use crate::tokenizer::Token;
use crate::ParseError;

/// Tree construction state
pub struct DocumentBuilder {
    tree: DomTree,
    /// Open elements; `stack[0]` is always the `html` root
    stack: Vec<NodeId>,
    html: NodeId,
    head: Option<NodeId>,
    body: Option<NodeId>,
    /// Element receiving `Attribute` tokens
    attr_target: Option<NodeId>,
    errors: Vec<ParseError>,
}

impl Default for DocumentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentBuilder {
    pub fn new() -> Self {
        let mut tree = DomTree::new();
        let html = tree.create_element("html");
        tree.append_child(tree.root(), html);
        Self {
            tree,
            stack: vec![html],
            html,
            head: None,
            body: None,
            attr_target: None,
            errors: Vec::new(),
        }
    }

    /// Apply one token; `line` is used for diagnostics only
    pub fn process(&mut self, token: Token, line: u32) {
        match token {
            Token::TagStart(name) => self.start_tag(&name),
            Token::Attribute(name, value) => {
                if let Some(elem) = self.attr_target.and_then(|id| self.tree.element_mut(id)) {
                    elem.set_attr(&name, &value);
                }
            }
            Token::TagEnd(name) => self.end_tag(&name, line),
            Token::Text(text) => self.text(&text, false),
            Token::Whitespace(text) => self.text(&text, true),
            Token::CData(text) => self.text(&text, false),
            Token::Comment(text) => {
                let comment = self.tree.create_comment(&text);
                self.tree.append_child(self.top(), comment);
            }
            Token::Doctype(_) | Token::EntityDecl(_) | Token::ProcessingInstruction(_) => {
                tracing::trace!("ignoring declaration");
            }
            Token::End => {}
        }
    }

    /// Finish the document, reporting elements left open
    pub fn finish(mut self) -> (DomTree, NodeId, Vec<ParseError>) {
        for &id in self.stack.iter().skip(1) {
            let Some(elem) = self.tree.element(id) else { continue };
            if end_tag_optional(elem.kind) {
                continue;
            }
            tracing::warn!(tag = %elem.tag, "element not closed at end of input");
            self.errors.push(ParseError::UnclosedElement { tag: elem.tag.clone() });
        }
        (self.tree, self.html, self.errors)
    }

    #[inline]
    fn top(&self) -> NodeId {
        self.stack.last().copied().unwrap_or(self.html)
    }

    fn top_kind(&self) -> Option<ElementKind> {
        self.tree.kind(self.top())
    }

    fn close_void_top(&mut self) {
        if self.stack.len() > 1 && self.top_kind().is_some_and(ElementKind::is_void) {
            self.stack.pop();
        }
    }

    /// Create an element under the stack top and make it current
    fn open(&mut self, tag: &str) -> NodeId {
        let id = self.tree.create_element(tag);
        self.tree.append_child(self.top(), id);
        self.stack.push(id);
        id
    }

    fn ensure_body(&mut self) -> NodeId {
        if let Some(body) = self.body {
            if !self.stack.contains(&body) {
                self.stack.truncate(1);
                self.stack.push(body);
            }
            return body;
        }
        self.stack.truncate(1);
        let body = self.open("body");
        self.body = Some(body);
        body
    }

    /// Pop elements closed by omission of their end tag
    fn close_implied(&mut self, next: ElementKind) {
        let mut i = self.stack.len();
        while i > 1 {
            i -= 1;
            let Some(kind) = self.tree.kind(self.stack[i]) else { break };
            if kind.closed_by(next) {
                self.stack.truncate(i);
                continue;
            }
            if kind.is_scope_boundary() {
                break;
            }
        }
    }

    fn start_tag(&mut self, name: &str) {
        self.close_void_top();
        let kind = ElementKind::from_tag(name);

        match kind {
            ElementKind::Html => {
                self.attr_target = Some(self.html);
                return;
            }
            ElementKind::Body => {
                let body = self.ensure_body();
                self.attr_target = Some(body);
                return;
            }
            ElementKind::Head => {
                if self.stack.len() == 1 && self.head.is_none() && self.body.is_none() {
                    let head = self.open("head");
                    self.head = Some(head);
                    self.attr_target = Some(head);
                } else {
                    self.attr_target = None;
                }
                return;
            }
            _ => {}
        }

        if self.top_kind() == Some(ElementKind::Head) && !belongs_in_head(kind) {
            self.stack.pop();
        }

        self.close_implied(kind);

        if self.stack.len() == 1 {
            self.ensure_body();
        }

        if kind == ElementKind::Tr && !self.top_kind().is_some_and(ElementKind::is_row_group) {
            tracing::trace!("opening implicit tbody");
            self.open("tbody");
        }
        if kind.is_cell() && self.top_kind() != Some(ElementKind::Tr) {
            if !self.top_kind().is_some_and(ElementKind::is_row_group) {
                self.open("tbody");
            }
            tracing::trace!("opening implicit tr");
            self.open("tr");
        }

        let id = self.open(name);
        self.attr_target = Some(id);
    }

    fn end_tag(&mut self, name: &str, line: u32) {
        if self.stack.len() > 1 && self.top_kind().is_some_and(ElementKind::is_void) {
            let matches = self.tree.tag(self.top()) == Some(name);
            self.stack.pop();
            if matches {
                return;
            }
        }

        if matches!(name, "html" | "body") {
            return;
        }

        let found = (1..self.stack.len())
            .rev()
            .find(|&i| self.tree.tag(self.stack[i]) == Some(name));

        match found {
            Some(i) => self.stack.truncate(i),
            None => {
                tracing::warn!(tag = name, line, "ignoring stray end tag");
                self.errors.push(ParseError::StrayEndTag { tag: name.to_string(), line });
            }
        }
    }

    fn text(&mut self, text: &str, whitespace: bool) {
        self.close_void_top();
        if !whitespace && self.top_kind() == Some(ElementKind::Head) {
            self.stack.pop();
        }
        if self.stack.len() == 1 {
            if whitespace {
                return;
            }
            self.ensure_body();
        }
        let node = self.tree.create_text(text);
        self.tree.append_child(self.top(), node);
    }
}

fn belongs_in_head(kind: ElementKind) -> bool {
    matches!(
        kind,
        ElementKind::Title
            | ElementKind::Base
            | ElementKind::Meta
            | ElementKind::Link
            | ElementKind::Style
            | ElementKind::Script
    )
}

/// Elements whose end tag may legitimately be omitted
fn end_tag_optional(kind: ElementKind) -> bool {
    matches!(
        kind,
        ElementKind::Html
            | ElementKind::Head
            | ElementKind::Body
            | ElementKind::Para
            | ElementKind::Li
            | ElementKind::Dt
            | ElementKind::Dd
            | ElementKind::Option
            | ElementKind::Td
            | ElementKind::Th
            | ElementKind::Tr
            | ElementKind::Thead
            | ElementKind::Tbody
            | ElementKind::Tfoot
            | ElementKind::Colgroup
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(tokens: Vec<Token>) -> (DomTree, NodeId, Vec<ParseError>) {
        let mut builder = DocumentBuilder::new();
        for token in tokens {
            builder.process(token, 1);
        }
        builder.finish()
    }

    fn tags(tree: &DomTree, parent: NodeId) -> Vec<String> {
        tree.children(parent)
            .filter_map(|(_, n)| n.as_element().map(|e| e.tag.clone()))
            .collect()
    }

    #[test]
    fn test_text_at_root_opens_body() {
        let (tree, html, _) = build(vec![Token::Whitespace(" ".into()), Token::Text("hi".into())]);
        assert_eq!(tags(&tree, html), vec!["body"]);
        let body = tree.find_first("body").unwrap();
        assert_eq!(tree.text_content(body), "hi");
    }

    #[test]
    fn test_void_closed_by_following_content() {
        let (tree, _, _) = build(vec![
            Token::TagStart("p".into()),
            Token::TagStart("br".into()),
            Token::Text("after".into()),
        ]);
        let p = tree.find_first("p").unwrap();
        let br = tree.find_first("br").unwrap();
        assert_eq!(tree.get(br).unwrap().first_child, None);
        assert_eq!(tree.children(p).count(), 2);
    }

    #[test]
    fn test_stray_end_tag_reported() {
        let (_, _, errors) = build(vec![Token::TagStart("div".into()), Token::TagEnd("span".into())]);
        assert!(errors.iter().any(|e| matches!(e, ParseError::StrayEndTag { .. })));
        assert!(errors.iter().any(|e| matches!(e, ParseError::UnclosedElement { .. })));
    }

    #[test]
    fn test_html_attributes_merge_into_root() {
        let (tree, html, _) = build(vec![
            Token::TagStart("html".into()),
            Token::Attribute("lang".into(), "en".into()),
        ]);
        assert_eq!(tree.element(html).unwrap().get_attr("lang"), Some("en"));
    }
}
