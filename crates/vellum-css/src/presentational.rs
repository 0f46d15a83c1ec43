//! Presentational attribute hints
//!
//! Legacy attributes such as `bgcolor`, `align` or `<font size>` become
//! declarations that sit between the user-agent sheet and author rules.

use vellum_dom::{DomTree, ElementData, ElementKind, NodeId};

use crate::{Declaration, shorthand};

struct Hints(Vec<Declaration>);

impl Hints {
    fn push(&mut self, name: &str, value: &str) {
        self.0.push(Declaration::new(name, value, false));
    }

    fn shorthand(&mut self, name: &str, value: &str) {
        if let Some(decls) = shorthand::expand(name, value, false) {
            self.0.extend(decls);
        }
    }

    fn length_attr(&mut self, elem: &ElementData, attr: &str, property: &str) {
        if let Some(len) = elem.get_attr(attr).and_then(html_length) {
            self.push(property, &len);
        }
    }

    fn color_attr(&mut self, elem: &ElementData, attr: &str, property: &str) {
        if let Some(color) = elem.get_attr(attr).map(str::trim).filter(|c| !c.is_empty()) {
            self.push(property, color);
        }
    }
}

/// HTML length attribute: `120`, `120px` or `50%`
fn html_length(text: &str) -> Option<String> {
    let text = text.trim();
    let end = text
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(text.len());
    let number: f32 = text[..end].parse().ok()?;
    if text[end..].trim_start().starts_with('%') {
        Some(format!("{number}%"))
    } else {
        Some(format!("{number}px"))
    }
}

fn html_pixels(text: &str) -> Option<f32> {
    let text = text.trim();
    let end = text.find(|c: char| !c.is_ascii_digit()).unwrap_or(text.len());
    text[..end].parse().ok()
}

fn align_keyword(value: &str) -> Option<&'static str> {
    match value.trim().to_ascii_lowercase().as_str() {
        "left" => Some("left"),
        "right" => Some("right"),
        "center" | "middle" => Some("center"),
        "justify" => Some("justify"),
        _ => None,
    }
}

fn valign_keyword(value: &str) -> Option<&'static str> {
    match value.trim().to_ascii_lowercase().as_str() {
        "top" => Some("top"),
        "middle" | "center" => Some("middle"),
        "bottom" => Some("bottom"),
        "baseline" => Some("baseline"),
        _ => None,
    }
}

/// `<font size>`: 1-7, or relative to 3
fn font_size_keyword(value: &str) -> Option<&'static str> {
    let value = value.trim();
    let n: i32 = match value.strip_prefix('+') {
        Some(rel) => 3 + rel.trim().parse::<i32>().ok()?,
        None if value.starts_with('-') => 3 + value.parse::<i32>().ok()?,
        None => value.parse().ok()?,
    };
    Some(match n.clamp(1, 7) {
        1 => "x-small",
        2 => "small",
        3 => "medium",
        4 => "large",
        5 => "x-large",
        6 => "xx-large",
        _ => "xxx-large",
    })
}

fn list_type(value: &str) -> Option<&'static str> {
    Some(match value.trim() {
        "1" => "decimal",
        "a" => "lower-alpha",
        "A" => "upper-alpha",
        "i" => "lower-roman",
        "I" => "upper-roman",
        other => match other.to_ascii_lowercase().as_str() {
            "disc" => "disc",
            "circle" => "circle",
            "square" => "square",
            _ => return None,
        },
    })
}

fn enclosing_table(tree: &DomTree, node: NodeId) -> Option<&ElementData> {
    tree.ancestors(node)
        .filter_map(|id| tree.element(id))
        .find(|e| e.kind == ElementKind::Table)
}

/// Declarations implied by the element's attributes
pub(crate) fn hints(tree: &DomTree, node: NodeId) -> Vec<Declaration> {
    let Some(elem) = tree.element(node) else {
        return Vec::new();
    };
    let mut out = Hints(Vec::new());

    match elem.kind {
        ElementKind::Font => {
            out.color_attr(elem, "color", "color");
            if let Some(face) = elem.get_attr("face") {
                out.push("font-family", face);
            }
            if let Some(size) = elem.get_attr("size").and_then(font_size_keyword) {
                out.push("font-size", size);
            }
        }
        ElementKind::Body => {
            out.color_attr(elem, "bgcolor", "background-color");
            out.color_attr(elem, "text", "color");
            out.length_attr(elem, "leftmargin", "margin-left");
            out.length_attr(elem, "leftmargin", "margin-right");
            out.length_attr(elem, "topmargin", "margin-top");
            out.length_attr(elem, "topmargin", "margin-bottom");
        }
        ElementKind::Table => {
            out.length_attr(elem, "width", "width");
            out.length_attr(elem, "height", "height");
            out.color_attr(elem, "bgcolor", "background-color");
            if let Some(border) = elem.get_attr("border").map(|b| html_pixels(b).unwrap_or(1.0)) {
                if border > 0.0 {
                    out.shorthand("border", &format!("{border}px outset"));
                }
            }
            if let Some(spacing) = elem.get_attr("cellspacing").and_then(html_pixels) {
                out.push("border-spacing", &format!("{spacing}px"));
            }
            match elem.get_attr("align").and_then(align_keyword) {
                Some("center") => {
                    out.push("margin-left", "auto");
                    out.push("margin-right", "auto");
                }
                Some(side @ ("left" | "right")) => out.push("float", side),
                _ => {}
            }
        }
        ElementKind::Tr | ElementKind::Thead | ElementKind::Tbody | ElementKind::Tfoot => {
            out.color_attr(elem, "bgcolor", "background-color");
            out.length_attr(elem, "height", "height");
            if let Some(align) = elem.get_attr("align").and_then(align_keyword) {
                out.push("text-align", align);
            }
            if let Some(valign) = elem.get_attr("valign").and_then(valign_keyword) {
                out.push("vertical-align", valign);
            }
        }
        ElementKind::Td | ElementKind::Th => {
            out.length_attr(elem, "width", "width");
            out.length_attr(elem, "height", "height");
            out.color_attr(elem, "bgcolor", "background-color");
            if let Some(align) = elem.get_attr("align").and_then(align_keyword) {
                out.push("text-align", align);
            }
            // Cells inherit the row's valign unless they set their own
            let valign = elem.get_attr("valign").or_else(|| {
                tree.parent(node)
                    .and_then(|p| tree.element(p))
                    .filter(|p| p.kind == ElementKind::Tr)
                    .and_then(|p| p.get_attr("valign"))
            });
            if let Some(valign) = valign.and_then(valign_keyword) {
                out.push("vertical-align", valign);
            }
            if elem.has_attr("nowrap") {
                out.push("white-space", "nowrap");
            }
            if let Some(table) = enclosing_table(tree, node) {
                if let Some(padding) = table.get_attr("cellpadding").and_then(html_pixels) {
                    out.shorthand("padding", &format!("{padding}px"));
                }
                let border = table.get_attr("border").map(|b| html_pixels(b).unwrap_or(1.0));
                if border.is_some_and(|b| b > 0.0) {
                    out.shorthand("border", "1px inset");
                }
            }
        }
        ElementKind::Img => {
            out.length_attr(elem, "width", "width");
            out.length_attr(elem, "height", "height");
            if let Some(border) = elem.get_attr("border").and_then(html_pixels) {
                out.shorthand("border", &format!("{border}px solid"));
            }
            if let Some(h) = elem.get_attr("hspace").and_then(html_pixels) {
                out.push("margin-left", &format!("{h}px"));
                out.push("margin-right", &format!("{h}px"));
            }
            if let Some(v) = elem.get_attr("vspace").and_then(html_pixels) {
                out.push("margin-top", &format!("{v}px"));
                out.push("margin-bottom", &format!("{v}px"));
            }
            match elem.get_attr("align").map(|a| a.trim().to_ascii_lowercase()).as_deref() {
                Some(side @ ("left" | "right")) => out.push("float", side),
                Some(v) => {
                    if let Some(valign) = valign_keyword(v) {
                        out.push("vertical-align", valign);
                    }
                }
                None => {}
            }
        }
        ElementKind::Hr => {
            out.length_attr(elem, "width", "width");
            if let Some(size) = elem.get_attr("size").and_then(html_pixels) {
                out.push("height", &format!("{}px", (size - 2.0).max(0.0)));
            }
            if let Some(color) = elem.get_attr("color") {
                out.shorthand("border-color", color);
                out.push("background-color", color);
            }
            if elem.has_attr("noshade") {
                out.shorthand("border-style", "solid");
            }
            match elem.get_attr("align").and_then(align_keyword) {
                Some("left") => out.push("margin-right", "auto"),
                Some("right") => out.push("margin-left", "auto"),
                _ => {}
            }
        }
        ElementKind::Para | ElementKind::Div | ElementKind::Heading | ElementKind::Caption => {
            if let Some(align) = elem.get_attr("align").and_then(align_keyword) {
                out.push("text-align", align);
            }
        }
        ElementKind::Ol | ElementKind::Ul | ElementKind::Li => {
            if let Some(kind) = elem.get_attr("type").and_then(list_type) {
                out.push("list-style-type", kind);
            }
        }
        ElementKind::Br => {
            let clear = match elem.get_attr("clear").map(|c| c.trim().to_ascii_lowercase()).as_deref() {
                Some("left") => Some("left"),
                Some("right") => Some("right"),
                Some("all" | "both") => Some("both"),
                _ => None,
            };
            if let Some(clear) = clear {
                out.push("clear", clear);
            }
        }
        _ => {}
    }

    if !out.0.is_empty() {
        tracing::trace!(tag = %elem.tag, count = out.0.len(), "presentational hints");
    }
    out.0
}
