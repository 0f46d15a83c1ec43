//! Box generation
//!
//! Turns the element tree and its computed styles into a box tree:
//! `display: none` generates nothing, list items get a marker, `::before`
//! and `::after` become child boxes, and anonymous boxes are inserted so
//! every block container holds either only block-level or only inline-level
//! children and every table part sits in a complete table structure.

use std::sync::Arc;

use vellum_css::{ComputedStyle, Display, ListStyleType, PseudoElement, StyleHost, StyleMap};
use vellum_dom::{DomTree, ElementKind, NodeData, NodeId};

use crate::markers;
use crate::{BoxContent, BoxType, LayoutBox, LayoutBoxId, LayoutTree, ListMarker};

pub(crate) fn build(dom: &DomTree, styles: &StyleMap, host: &dyn StyleHost, base_url: &str) -> LayoutTree {
    let mut builder = BoxBuilder { dom, styles, host, base_url, tree: LayoutTree::new() };
    let root_element = dom.children(NodeId::ROOT).find(|(_, n)| n.is_element()).map(|(id, _)| id);
    if let Some(root) = root_element.and_then(|node| builder.element_box(node)) {
        builder.tree.set_root(root);
    }
    tracing::trace!(boxes = builder.tree.len(), "boxes generated");
    builder.tree
}

fn box_type_for(display: Display) -> BoxType {
    match display {
        Display::Inline => BoxType::Inline,
        Display::InlineBlock => BoxType::InlineBlock,
        Display::Table | Display::InlineTable => BoxType::Table,
        Display::TableRowGroup | Display::TableHeaderGroup | Display::TableFooterGroup => BoxType::TableRowGroup,
        Display::TableRow => BoxType::TableRow,
        Display::TableCell => BoxType::TableCell,
        Display::TableCaption => BoxType::TableCaption,
        Display::TableColumn | Display::TableColumnGroup => BoxType::TableColumn,
        Display::Block | Display::ListItem | Display::None => BoxType::Block,
    }
}

fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0c')
}

struct BoxBuilder<'a> {
    dom: &'a DomTree,
    styles: &'a StyleMap,
    host: &'a dyn StyleHost,
    base_url: &'a str,
    tree: LayoutTree,
}

impl BoxBuilder<'_> {
    fn element_box(&mut self, node: NodeId) -> Option<LayoutBoxId> {
        let styles = self.styles;
        let dom = self.dom;
        let node_styles = styles.get(node)?;
        let style = Arc::clone(&node_styles.style);
        if style.display == Display::None {
            return None;
        }
        let element = dom.element(node)?;

        match element.kind {
            ElementKind::Br => {
                return Some(self.tree.create_box(LayoutBox::new(BoxType::LineBreak, style, Some(node))));
            }
            ElementKind::Img => {
                let src = element.get_attr("src").unwrap_or_default();
                let url = if src.is_empty() { String::new() } else { self.host.resolve_url(self.base_url, src) };
                let mut image = LayoutBox::new(BoxType::Image, style, Some(node));
                image.content = BoxContent::Image { url };
                return Some(self.tree.create_box(image));
            }
            _ => {}
        }

        let id = self.tree.create_box(LayoutBox::new(box_type_for(style.display), Arc::clone(&style), Some(node)));
        if style.display == Display::ListItem {
            self.add_marker(id, node, &style);
        }
        if let Some(before) = &node_styles.before {
            self.pseudo_box(id, node, Arc::clone(before), PseudoElement::Before);
        }
        for (child, _) in dom.children(node) {
            self.child_box(id, child, &style);
        }
        if let Some(after) = &node_styles.after {
            self.pseudo_box(id, node, Arc::clone(after), PseudoElement::After);
        }
        self.normalize(id);
        Some(id)
    }

    fn child_box(&mut self, parent: LayoutBoxId, child: NodeId, parent_style: &Arc<ComputedStyle>) {
        let dom = self.dom;
        let Some(node) = dom.get(child) else { return };
        match &node.data {
            NodeData::Element(_) => {
                if let Some(id) = self.element_box(child) {
                    self.tree.append_child(parent, id);
                }
            }
            NodeData::Text(text) => {
                let mut b = LayoutBox::new(BoxType::Text, Arc::clone(parent_style), Some(child));
                b.content = BoxContent::Text(text.content.clone());
                let id = self.tree.create_box(b);
                self.tree.append_child(parent, id);
            }
            NodeData::Document | NodeData::Comment(_) => {}
        }
    }

    fn pseudo_box(&mut self, parent: LayoutBoxId, node: NodeId, style: Arc<ComputedStyle>, pseudo: PseudoElement) {
        let text = style.content.clone().unwrap_or_default();
        let mut b = LayoutBox::new(box_type_for(style.display), Arc::clone(&style), Some(node));
        b.pseudo = Some(pseudo);
        let id = self.tree.create_box(b);
        if !text.is_empty() {
            let mut t = LayoutBox::new(BoxType::Text, style, Some(node));
            t.pseudo = Some(pseudo);
            t.content = BoxContent::Text(text);
            let text_id = self.tree.create_box(t);
            self.tree.append_child(id, text_id);
        }
        self.normalize(id);
        self.tree.append_child(parent, id);
    }

    fn add_marker(&mut self, item: LayoutBoxId, node: NodeId, style: &Arc<ComputedStyle>) {
        if style.list_style_type == ListStyleType::None && style.list_style_image.is_none() {
            return;
        }
        let ordinal = markers::ordinal(self.dom, self.styles, node);
        let marker = ListMarker {
            kind: style.list_style_type,
            position: style.list_style_position,
            ordinal,
            text: markers::marker_text(style.list_style_type, ordinal),
            image: style.list_style_image.clone(),
        };
        let mut b = LayoutBox::new(BoxType::Marker, Arc::clone(style), Some(node));
        b.content = BoxContent::Marker(marker);
        let id = self.tree.create_box(b);
        self.tree.append_child(item, id);
    }

    fn normalize(&mut self, id: LayoutBoxId) {
        let box_type = self.tree[id].box_type;
        match box_type {
            BoxType::Table => {
                let rows = self.group_children(
                    id,
                    |t| {
                        matches!(
                            t,
                            BoxType::TableCaption | BoxType::TableColumn | BoxType::TableRowGroup | BoxType::TableRow
                        )
                    },
                    BoxType::TableRow,
                    Display::TableRow,
                );
                for row in rows {
                    self.normalize(row);
                }
                self.group_children(
                    id,
                    |t| matches!(t, BoxType::TableCaption | BoxType::TableColumn | BoxType::TableRowGroup),
                    BoxType::TableRowGroup,
                    Display::TableRowGroup,
                );
            }
            BoxType::TableRowGroup => {
                let rows = self.group_children(id, |t| t == BoxType::TableRow, BoxType::TableRow, Display::TableRow);
                for row in rows {
                    self.normalize(row);
                }
            }
            BoxType::TableRow => {
                let cells = self.group_children(id, |t| t == BoxType::TableCell, BoxType::TableCell, Display::TableCell);
                for cell in cells {
                    self.normalize(cell);
                }
            }
            BoxType::Inline => {
                if self.has_block_child(id) {
                    tracing::trace!(box_id = id.index(), "inline box with block content laid out as a block");
                    self.tree[id].box_type = BoxType::Block;
                    self.wrap_inline_runs(id);
                }
            }
            BoxType::Block | BoxType::InlineBlock | BoxType::TableCell | BoxType::TableCaption => {
                if self.has_block_child(id) {
                    self.wrap_inline_runs(id);
                }
            }
            _ => {}
        }
    }

    fn anonymous(&mut self, parent: LayoutBoxId, box_type: BoxType, display: Display) -> LayoutBoxId {
        let mut style = ComputedStyle::inherit_from(&self.tree[parent].style);
        style.display = display;
        self.tree.create_box(LayoutBox::new(box_type, Arc::new(style), None))
    }

    fn is_whitespace_text(&self, id: LayoutBoxId) -> bool {
        let b = &self.tree[id];
        match &b.content {
            BoxContent::Text(text) if b.box_type == BoxType::Text => text.chars().all(is_space),
            _ => false,
        }
    }

    /// Whitespace that disappears when it ends up between blocks
    fn is_collapsible_whitespace(&self, id: LayoutBoxId) -> bool {
        self.is_whitespace_text(id) && self.tree[id].style.white_space.collapses_spaces()
    }

    fn has_block_child(&self, id: LayoutBoxId) -> bool {
        self.tree.children(id).iter().any(|c| {
            let b = &self.tree[*c];
            !b.is_inline_level() && !b.is_out_of_flow() && b.box_type != BoxType::Marker
        })
    }

    /// Wrap every child not accepted by `keep` into anonymous boxes of
    /// `box_type`; whitespace-only runs are dropped. Returns the new boxes.
    fn group_children(
        &mut self,
        parent: LayoutBoxId,
        keep: impl Fn(BoxType) -> bool,
        box_type: BoxType,
        display: Display,
    ) -> Vec<LayoutBoxId> {
        let children = std::mem::take(&mut self.tree[parent].children);
        let mut out = Vec::with_capacity(children.len());
        let mut run = Vec::new();
        let mut created = Vec::new();
        for child in children {
            if keep(self.tree[child].box_type) {
                self.flush_group(parent, &mut run, box_type, display, &mut out, &mut created);
                out.push(child);
            } else {
                run.push(child);
            }
        }
        self.flush_group(parent, &mut run, box_type, display, &mut out, &mut created);
        self.tree.set_children(parent, out);
        created
    }

    fn flush_group(
        &mut self,
        parent: LayoutBoxId,
        run: &mut Vec<LayoutBoxId>,
        box_type: BoxType,
        display: Display,
        out: &mut Vec<LayoutBoxId>,
        created: &mut Vec<LayoutBoxId>,
    ) {
        if run.iter().all(|c| self.is_whitespace_text(*c)) {
            run.clear();
            return;
        }
        let wrapper = self.anonymous(parent, box_type, display);
        self.tree.set_children(wrapper, std::mem::take(run));
        out.push(wrapper);
        created.push(wrapper);
    }

    /// Put runs of inline-level children into anonymous blocks
    fn wrap_inline_runs(&mut self, id: LayoutBoxId) {
        let children = std::mem::take(&mut self.tree[id].children);
        let mut out = Vec::with_capacity(children.len());
        let mut run = Vec::new();
        for child in children {
            let b = &self.tree[child];
            let neutral = b.is_out_of_flow() || (b.box_type == BoxType::Marker && !b.is_inline_level());
            if neutral {
                if run.is_empty() {
                    out.push(child);
                } else {
                    run.push(child);
                }
            } else if b.is_inline_level() {
                run.push(child);
            } else {
                self.flush_inline_run(id, &mut run, &mut out);
                out.push(child);
            }
        }
        self.flush_inline_run(id, &mut run, &mut out);
        self.tree.set_children(id, out);
    }

    fn flush_inline_run(&mut self, parent: LayoutBoxId, run: &mut Vec<LayoutBoxId>, out: &mut Vec<LayoutBoxId>) {
        let has_content = run.iter().any(|c| self.tree[*c].is_inline_level() && !self.is_collapsible_whitespace(*c));
        if has_content {
            let wrapper = self.anonymous(parent, BoxType::Block, Display::Block);
            self.tree.set_children(wrapper, std::mem::take(run));
            out.push(wrapper);
        } else {
            out.extend(run.drain(..).filter(|c| self.tree[*c].is_out_of_flow()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vellum_css::{DefaultStyleHost, MASTER_CSS, StyleResolver, parse_stylesheet};

    fn boxes(markup: &str, css: &str) -> (vellum_html::ParseOutput, LayoutTree) {
        let doc = vellum_html::parse(markup);
        let mut resolver = StyleResolver::new(Arc::new(parse_stylesheet(MASTER_CSS)));
        resolver.add_author_sheet(Arc::new(parse_stylesheet(css)));
        let styles = resolver.compute_tree(&doc.tree, &DefaultStyleHost);
        let tree = build(&doc.tree, &styles, &DefaultStyleHost, "");
        (doc, tree)
    }

    fn types(tree: &LayoutTree, id: LayoutBoxId) -> Vec<BoxType> {
        tree.children(id).iter().map(|c| tree[*c].box_type).collect()
    }

    #[test]
    fn test_display_none_generates_nothing() {
        let (doc, tree) = boxes("<p>a</p><div style='display:none'><p>b</p></div>", "");
        let hidden = doc.tree.find_all("p")[1];
        assert!(tree.boxes_for_node(hidden).is_empty());
        let texts = tree.iter().filter(|(_, b)| b.box_type == BoxType::Text).count();
        assert_eq!(texts, 1);
    }

    #[test]
    fn test_anonymous_blocks_wrap_inline_runs() {
        let (doc, tree) = boxes("<div>text <p>para</p> more</div>", "");
        let div = tree.boxes_for_node(doc.tree.find_first("div").unwrap())[0];
        assert_eq!(types(&tree, div), vec![BoxType::Block, BoxType::Block, BoxType::Block]);
        let anon = tree.children(div)[0];
        assert!(tree[anon].dom_node.is_none());
        assert_eq!(types(&tree, anon), vec![BoxType::Text]);
    }

    #[test]
    fn test_whitespace_between_blocks_dropped() {
        let (doc, tree) = boxes("<div>\n  <p>a</p>\n  <p>b</p>\n</div>", "");
        let div = tree.boxes_for_node(doc.tree.find_first("div").unwrap())[0];
        assert_eq!(types(&tree, div), vec![BoxType::Block, BoxType::Block]);
    }

    #[test]
    fn test_list_markers() {
        let (doc, tree) = boxes("<ol start=3><li>a<li value=10>b<li>c</ol>", "");
        let items = doc.tree.find_all("li");
        let marker = |i: usize| {
            let li = tree.boxes_for_node(items[i]).into_iter().find(|b| tree[*b].box_type == BoxType::Marker).unwrap();
            match &tree[li].content {
                BoxContent::Marker(m) => m.clone(),
                other => panic!("unexpected content {other:?}"),
            }
        };
        assert_eq!(marker(0).ordinal, 3);
        assert_eq!(marker(1).text.as_deref(), Some("10."));
        assert_eq!(marker(2).ordinal, 11);
    }

    #[test]
    fn test_pseudo_elements_generate_boxes() {
        let (doc, tree) = boxes("<p>x</p>", "p::before { content: '>' } p::after { content: '<'; display: block }");
        let p = tree.boxes_for_node(doc.tree.find_first("p").unwrap())[0];
        assert!(tree.iter().any(|(_, b)| b.pseudo == Some(PseudoElement::Before) && b.box_type == BoxType::Text));
        // block ::after forces the inline content into an anonymous block
        assert_eq!(types(&tree, p), vec![BoxType::Block, BoxType::Block]);
    }

    #[test]
    fn test_table_fixup() {
        let (doc, tree) = boxes(
            "<div style='display:table'><span style='display:table-cell'>a</span>b</div>",
            "",
        );
        let table = tree.boxes_for_node(doc.tree.find_first("div").unwrap())[0];
        assert_eq!(types(&tree, table), vec![BoxType::TableRowGroup]);
        let group = tree.children(table)[0];
        assert_eq!(types(&tree, group), vec![BoxType::TableRow]);
        let row = tree.children(group)[0];
        assert_eq!(types(&tree, row), vec![BoxType::TableCell, BoxType::TableCell]);
    }

    #[test]
    fn test_inline_with_block_child_becomes_block() {
        let (doc, tree) = boxes("<div><span>a<div>b</div></span></div>", "");
        let span = tree.boxes_for_node(doc.tree.find_first("span").unwrap())[0];
        assert_eq!(tree[span].box_type, BoxType::Block);
        assert_eq!(types(&tree, span), vec![BoxType::Block, BoxType::Block]);
    }

    #[test]
    fn test_images_and_breaks() {
        let (_, tree) = boxes("<p>a<br><img src='x.png'></p>", "");
        let image = tree.iter().find(|(_, b)| b.box_type == BoxType::Image).map(|(_, b)| b.content.clone());
        assert_eq!(image, Some(BoxContent::Image { url: "x.png".to_string() }));
        assert!(tree.iter().any(|(_, b)| b.box_type == BoxType::LineBreak));
    }
}
