//! Shorthand expansion
//!
//! Shorthands are split into longhands at parse time so the cascade only
//! ever sees longhand names. Omitted sub-values reset to their initial value.

use crate::tokenizer::components;
use crate::{BorderStyle, Declaration, Length, ListStylePosition, ListStyleType, BackgroundRepeat};

const SIDES: [&str; 4] = ["top", "right", "bottom", "left"];
const CORNERS: [&str; 4] = ["top-left", "top-right", "bottom-right", "bottom-left"];

/// Expand `name: value` into longhands. Non-shorthands pass through;
/// `None` means the shorthand value could not be understood.
pub(crate) fn expand(name: &str, value: &str, important: bool) -> Option<Vec<Declaration>> {
    let longhands = longhand_names(name);
    if longhands.is_empty() {
        return Some(vec![Declaration::new(name, value, important)]);
    }

    let lower = value.trim().to_ascii_lowercase();
    if lower == "inherit" || lower == "initial" {
        return Some(longhands.iter().map(|n| Declaration::new(n, &lower, important)).collect());
    }

    let pairs = match name {
        "margin" | "padding" => four_sides(value, |side| format!("{name}-{side}"))?,
        "border-width" | "border-style" | "border-color" => {
            let part = &name["border-".len()..];
            four_sides(value, |side| format!("border-{side}-{part}"))?
        }
        "border-radius" => {
            // Elliptical radii keep only the horizontal part
            let horizontal = value.split('/').next().unwrap_or(value);
            let parts = box_values(horizontal)?;
            CORNERS
                .iter()
                .zip(parts)
                .map(|(corner, v)| (format!("border-{corner}-radius"), v))
                .collect()
        }
        "border" => {
            let (width, style, color) = border_side(value)?;
            SIDES
                .iter()
                .flat_map(|side| {
                    [
                        (format!("border-{side}-width"), width.clone()),
                        (format!("border-{side}-style"), style.clone()),
                        (format!("border-{side}-color"), color.clone()),
                    ]
                })
                .collect()
        }
        "border-top" | "border-right" | "border-bottom" | "border-left" => {
            let (width, style, color) = border_side(value)?;
            vec![
                (format!("{name}-width"), width),
                (format!("{name}-style"), style),
                (format!("{name}-color"), color),
            ]
        }
        "background" => background(value)?,
        "font" => font(value)?,
        "list-style" => list_style(value)?,
        _ => return Some(vec![Declaration::new(name, value, important)]),
    };

    Some(
        pairs
            .into_iter()
            .map(|(n, v)| Declaration { name: n, value: v, important })
            .collect(),
    )
}

/// Longhands a shorthand expands to; empty for non-shorthands
fn longhand_names(name: &str) -> Vec<String> {
    let per_side = |fmt: &dyn Fn(&str) -> String| SIDES.iter().map(|s| fmt(s)).collect::<Vec<_>>();
    match name {
        "margin" | "padding" => per_side(&|s| format!("{name}-{s}")),
        "border-width" | "border-style" | "border-color" => {
            let part = &name["border-".len()..];
            per_side(&|s| format!("border-{s}-{part}"))
        }
        "border-top" | "border-right" | "border-bottom" | "border-left" => {
            ["width", "style", "color"].iter().map(|p| format!("{name}-{p}")).collect()
        }
        "border" => SIDES
            .iter()
            .flat_map(|s| ["width", "style", "color"].map(|p| format!("border-{s}-{p}")))
            .collect(),
        "border-radius" => CORNERS.iter().map(|c| format!("border-{c}-radius")).collect(),
        "background" => ["color", "image", "repeat", "position"]
            .iter()
            .map(|p| format!("background-{p}"))
            .collect(),
        "font" => ["style", "variant", "weight", "size", "family"]
            .iter()
            .map(|p| format!("font-{p}"))
            .chain(std::iter::once("line-height".to_string()))
            .collect(),
        "list-style" => ["type", "position", "image"].iter().map(|p| format!("list-style-{p}")).collect(),
        _ => Vec::new(),
    }
}

/// 1-4 values to top, right, bottom, left
fn box_values(value: &str) -> Option<[String; 4]> {
    let parts: Vec<&str> = components(value);
    let [t, r, b, l] = match parts.as_slice() {
        [a] => [*a, *a, *a, *a],
        [v, h] => [*v, *h, *v, *h],
        [t, h, b] => [*t, *h, *b, *h],
        [t, r, b, l] => [*t, *r, *b, *l],
        _ => return None,
    };
    Some([t, r, b, l].map(str::to_string))
}

fn four_sides(value: &str, name: impl Fn(&str) -> String) -> Option<Vec<(String, String)>> {
    let values = box_values(value)?;
    Some(SIDES.iter().zip(values).map(|(side, v)| (name(side), v)).collect())
}

fn is_border_width(part: &str) -> bool {
    Length::parse(part, &["thin", "medium", "thick"]).is_ok()
}

/// `width || style || color`
fn border_side(value: &str) -> Option<(String, String, String)> {
    let mut width = None;
    let mut style = None;
    let mut color = None;
    for part in components(value) {
        if width.is_none() && is_border_width(part) {
            width = Some(part.to_string());
        } else if style.is_none() && BorderStyle::parse(part).is_some() {
            style = Some(part.to_string());
        } else if color.is_none() && part != "," && part != "/" {
            color = Some(part.to_string());
        } else {
            return None;
        }
    }
    Some((
        width.unwrap_or_else(|| "medium".into()),
        style.unwrap_or_else(|| "none".into()),
        color.unwrap_or_else(|| "currentcolor".into()),
    ))
}

fn is_position_part(part: &str) -> bool {
    matches!(part.to_ascii_lowercase().as_str(), "left" | "right" | "top" | "bottom" | "center")
        || Length::parse(part, &[]).is_ok()
}

fn background(value: &str) -> Option<Vec<(String, String)>> {
    let mut color = None;
    let mut image = None;
    let mut repeat = None;
    let mut position: Vec<&str> = Vec::new();

    for part in components(value) {
        let lower = part.to_ascii_lowercase();
        if image.is_none() && (lower == "none" || lower.starts_with("url(")) {
            image = Some(part.to_string());
        } else if repeat.is_none() && BackgroundRepeat::parse(part).is_some() {
            repeat = Some(part.to_string());
        } else if matches!(lower.as_str(), "scroll" | "fixed") {
            // background-attachment is not modelled
        } else if position.len() < 2 && is_position_part(part) {
            position.push(part);
        } else if color.is_none() && part != "," && part != "/" {
            color = Some(part.to_string());
        } else {
            return None;
        }
    }

    Some(vec![
        ("background-color".into(), color.unwrap_or_else(|| "transparent".into())),
        ("background-image".into(), image.unwrap_or_else(|| "none".into())),
        ("background-repeat".into(), repeat.unwrap_or_else(|| "repeat".into())),
        (
            "background-position".into(),
            if position.is_empty() { "0% 0%".into() } else { position.join(" ") },
        ),
    ])
}

/// `[style || variant || weight]? size[/line-height]? family`
fn font(value: &str) -> Option<Vec<(String, String)>> {
    let parts = components(value);
    let mut style = None;
    let mut variant = None;
    let mut weight = None;
    let mut idx = 0;

    while let Some(&part) = parts.get(idx) {
        let lower = part.to_ascii_lowercase();
        match lower.as_str() {
            "normal" => {}
            "italic" | "oblique" if style.is_none() => style = Some(lower),
            "small-caps" if variant.is_none() => variant = Some(lower),
            "bold" | "bolder" | "lighter" | "100" | "200" | "300" | "400" | "500" | "600" | "700"
            | "800" | "900"
                if weight.is_none() =>
            {
                weight = Some(lower)
            }
            _ => break,
        }
        idx += 1;
    }

    let size = parts.get(idx)?.to_string();
    idx += 1;
    let mut line_height = "normal".to_string();
    if parts.get(idx) == Some(&"/") {
        line_height = parts.get(idx + 1)?.to_string();
        idx += 2;
    }
    let family = parts.get(idx..).filter(|rest| !rest.is_empty())?;
    let family = family.iter().fold(String::new(), |mut acc, p| {
        if !acc.is_empty() && *p != "," {
            acc.push(' ');
        }
        acc.push_str(p);
        acc
    });

    Some(vec![
        ("font-style".into(), style.unwrap_or_else(|| "normal".into())),
        ("font-variant".into(), variant.unwrap_or_else(|| "normal".into())),
        ("font-weight".into(), weight.unwrap_or_else(|| "normal".into())),
        ("font-size".into(), size),
        ("line-height".into(), line_height),
        ("font-family".into(), family),
    ])
}

/// `type || position || image`
fn list_style(value: &str) -> Option<Vec<(String, String)>> {
    let mut kind = None;
    let mut position = None;
    let mut image = None;
    let mut nones = 0;

    for part in components(value) {
        let lower = part.to_ascii_lowercase();
        if lower == "none" {
            nones += 1;
        } else if lower.starts_with("url(") && image.is_none() {
            image = Some(part.to_string());
        } else if ListStylePosition::parse(part).is_some() && position.is_none() {
            position = Some(part.to_string());
        } else if ListStyleType::parse(part).is_some() && kind.is_none() {
            kind = Some(part.to_string());
        } else {
            return None;
        }
    }
    // A bare `none` applies to whichever of type/image is still unset
    if nones > 0 && kind.is_none() {
        kind = Some("none".into());
    }

    Some(vec![
        ("list-style-type".into(), kind.unwrap_or_else(|| "disc".into())),
        ("list-style-position".into(), position.unwrap_or_else(|| "outside".into())),
        ("list-style-image".into(), image.unwrap_or_else(|| "none".into())),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expanded(name: &str, value: &str) -> Vec<(String, String)> {
        expand(name, value, false)
            .unwrap()
            .into_iter()
            .map(|d| (d.name, d.value))
            .collect()
    }

    fn pair(n: &str, v: &str) -> (String, String) {
        (n.to_string(), v.to_string())
    }

    #[test]
    fn test_margin_counts() {
        let m = expanded("margin", "1px 2px 3px");
        assert_eq!(
            m,
            vec![
                pair("margin-top", "1px"),
                pair("margin-right", "2px"),
                pair("margin-bottom", "3px"),
                pair("margin-left", "2px"),
            ]
        );
        assert!(expand("padding", "1px 2px 3px 4px 5px", false).is_none());
    }

    #[test]
    fn test_border() {
        let b = expanded("border", "2px dashed red");
        assert_eq!(b.len(), 12);
        assert!(b.contains(&pair("border-left-style", "dashed")));
        assert!(b.contains(&pair("border-top-color", "red")));

        let side = expanded("border-bottom", "solid");
        assert_eq!(
            side,
            vec![
                pair("border-bottom-width", "medium"),
                pair("border-bottom-style", "solid"),
                pair("border-bottom-color", "currentcolor"),
            ]
        );
    }

    #[test]
    fn test_font() {
        let f = expanded("font", "italic bold 12px/1.5 \"Times New Roman\", serif");
        assert!(f.contains(&pair("font-style", "italic")));
        assert!(f.contains(&pair("font-weight", "bold")));
        assert!(f.contains(&pair("font-size", "12px")));
        assert!(f.contains(&pair("line-height", "1.5")));
        assert!(f.contains(&pair("font-family", "\"Times New Roman\", serif")));
        assert!(expand("font", "bold", false).is_none());
    }

    #[test]
    fn test_background_and_list_style() {
        let bg = expanded("background", "#fff url(a.png) no-repeat center");
        assert!(bg.contains(&pair("background-color", "#fff")));
        assert!(bg.contains(&pair("background-image", "url(a.png)")));
        assert!(bg.contains(&pair("background-position", "center")));

        let ls = expanded("list-style", "square inside");
        assert!(ls.contains(&pair("list-style-type", "square")));
        assert!(ls.contains(&pair("list-style-position", "inside")));
    }

    #[test]
    fn test_inherit_and_passthrough() {
        let m = expanded("padding", "inherit");
        assert!(m.iter().all(|(_, v)| v == "inherit"));
        assert_eq!(expanded("color", "red"), vec![pair("color", "red")]);
    }
}
