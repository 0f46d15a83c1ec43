//! List item numbering and marker text

use vellum_css::{Display, ListStyleType, StyleMap};
use vellum_dom::{DomTree, ElementKind, NodeId, Rect};

use crate::Font;

/// Ordinal of a list item among its siblings, honouring `<ol start>`,
/// `<ol reversed>` and `<li value>`
pub(crate) fn ordinal(dom: &DomTree, styles: &StyleMap, item: NodeId) -> i32 {
    let Some(parent) = dom.parent(item) else { return 1 };
    let is_item = |node: NodeId| styles.style(node).is_some_and(|s| s.display == Display::ListItem);
    let items: Vec<NodeId> = dom.children(parent).map(|(id, _)| id).filter(|id| is_item(*id)).collect();

    let list = dom.element(parent).filter(|el| el.kind == ElementKind::Ol);
    let reversed = list.is_some_and(|el| el.has_attr("reversed"));
    let step = if reversed { -1 } else { 1 };
    let start = list
        .and_then(|el| el.get_attr("start"))
        .and_then(|s| s.trim().parse::<i32>().ok())
        .unwrap_or(if reversed { items.len() as i32 } else { 1 });

    let mut n = start - step;
    for node in items {
        let value = dom.element(node).and_then(|el| el.get_attr("value")).and_then(|v| v.trim().parse().ok());
        n = value.unwrap_or(n + step);
        if node == item {
            return n;
        }
    }
    n + step
}

/// Text of a counting marker (`"4."`); `None` for bullet styles
pub fn marker_text(kind: ListStyleType, ordinal: i32) -> Option<String> {
    let body = match kind {
        ListStyleType::Disc | ListStyleType::Circle | ListStyleType::Square | ListStyleType::None => {
            return None;
        }
        ListStyleType::Decimal => ordinal.to_string(),
        ListStyleType::LowerAlpha => alpha(ordinal).unwrap_or_else(|| ordinal.to_string()),
        ListStyleType::UpperAlpha => alpha(ordinal).map_or_else(|| ordinal.to_string(), |s| s.to_uppercase()),
        ListStyleType::LowerRoman => roman(ordinal).map_or_else(|| ordinal.to_string(), |s| s.to_lowercase()),
        ListStyleType::UpperRoman => roman(ordinal).unwrap_or_else(|| ordinal.to_string()),
    };
    Some(format!("{body}."))
}

/// Square holding a bullet drawn at `x`, centred on the x-height of the
/// line whose baseline is `baseline`
pub(crate) fn bullet_rect(x: f32, baseline: f32, font: &Font) -> Rect {
    let size = (font.size / 3.0).max(1.0);
    let centre = baseline - font.metrics.x_height / 2.0;
    Rect::new(x, centre - size / 2.0, size, size)
}

/// a, b, ... z, aa, ab, ...
fn alpha(n: i32) -> Option<String> {
    if n < 1 {
        return None;
    }
    let mut n = n as u32;
    let mut out = Vec::new();
    while n > 0 {
        n -= 1;
        out.push(char::from(b'a' + (n % 26) as u8));
        n /= 26;
    }
    Some(out.into_iter().rev().collect())
}

fn roman(n: i32) -> Option<String> {
    const TABLE: [(i32, &str); 13] = [
        (1000, "M"),
        (900, "CM"),
        (500, "D"),
        (400, "CD"),
        (100, "C"),
        (90, "XC"),
        (50, "L"),
        (40, "XL"),
        (10, "X"),
        (9, "IX"),
        (5, "V"),
        (4, "IV"),
        (1, "I"),
    ];
    if !(1..4000).contains(&n) {
        return None;
    }
    let mut n = n;
    let mut out = String::new();
    for (value, digits) in TABLE {
        while n >= value {
            out.push_str(digits);
            n -= value;
        }
    }
    Some(out)
}
