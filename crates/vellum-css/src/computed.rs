//! Computed Style
//!
//! Keywords, colours and font sizes are resolved here. Box lengths stay
//! as [`Length`] until layout knows the containing block.

use vellum_dom::ElementData;

use crate::tokenizer::{components, function_args, split_top_level, unquote};
use crate::{
    BackgroundRepeat, BorderCollapse, BorderStyle, BoxSizing, Clear, Color, DecorationStyle,
    Declaration, Display, Float, FontStyle, Length, LengthContext, LengthUnit, ListStylePosition,
    ListStyleType, Overflow, Position, StyleHost, TextAlign, TextTransform, ValueError,
    VerticalAlign, Visibility, WhiteSpace,
};

const AUTO: &[&str] = &["auto"];
const NONE: &[&str] = &["none"];
const BORDER_WIDTHS: &[&str] = &["thin", "medium", "thick"];
const BORDER_WIDTH_PX: [f32; 3] = [1.0, 3.0, 5.0];

/// Family used when nothing else is configured
pub const DEFAULT_FONT_FAMILY: &str = "Times New Roman";

/// Four box edges
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LengthEdges {
    pub top: Length,
    pub right: Length,
    pub bottom: Length,
    pub left: Length,
}

impl LengthEdges {
    pub fn all(v: Length) -> Self {
        Self { top: v, right: v, bottom: v, left: v }
    }

    fn side_mut(&mut self, side: &str) -> Option<&mut Length> {
        match side {
            "top" => Some(&mut self.top),
            "right" => Some(&mut self.right),
            "bottom" => Some(&mut self.bottom),
            "left" => Some(&mut self.left),
            _ => None,
        }
    }

    fn side(&self, side: &str) -> Option<Length> {
        let mut copy = *self;
        copy.side_mut(side).map(|l| *l)
    }
}

/// One border edge
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BorderSide {
    /// Pixels; computed styles zero it whenever the style draws nothing
    pub width: f32,
    pub style: BorderStyle,
    pub color: Color,
}

impl Default for BorderSide {
    fn default() -> Self {
        Self { width: 0.0, style: BorderStyle::None, color: Color::BLACK }
    }
}

impl BorderSide {
    /// Width that takes up space
    pub fn used_width(&self) -> f32 {
        if self.style.is_invisible() { 0.0 } else { self.width }
    }

    pub fn is_visible(&self) -> bool {
        self.width > 0.0 && !self.style.is_invisible() && !self.color.is_transparent()
    }
}

/// Background layer
#[derive(Debug, Clone, PartialEq)]
pub struct Background {
    pub color: Color,
    /// Absolute image URL
    pub image: Option<String>,
    pub repeat: BackgroundRepeat,
    pub position: (Length, Length),
}

impl Default for Background {
    fn default() -> Self {
        Self {
            color: Color::TRANSPARENT,
            image: None,
            repeat: BackgroundRepeat::Repeat,
            position: (Length::percent(0.0), Length::percent(0.0)),
        }
    }
}

/// `line-height`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineHeight {
    Normal,
    /// Multiplier, inherited as a number
    Number(f32),
    Px(f32),
}

impl LineHeight {
    /// Used line height; `normal_px` comes from the font metrics
    pub fn resolve(self, font_size: f32, normal_px: f32) -> f32 {
        match self {
            LineHeight::Normal => normal_px,
            LineHeight::Number(n) => n * font_size,
            LineHeight::Px(px) => px,
        }
    }
}

/// Text decoration lines, propagated to descendants
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextDecoration {
    pub underline: bool,
    pub overline: bool,
    pub line_through: bool,
    pub style: DecorationStyle,
    pub color: Color,
}

impl Default for TextDecoration {
    fn default() -> Self {
        Self {
            underline: false,
            overline: false,
            line_through: false,
            style: DecorationStyle::Solid,
            color: Color::BLACK,
        }
    }
}

impl TextDecoration {
    pub fn is_none(&self) -> bool {
        !(self.underline || self.overline || self.line_through)
    }
}

/// Fully cascaded style of one element
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedStyle {
    pub display: Display,
    pub position: Position,
    pub float: Float,
    pub clear: Clear,
    pub overflow: Overflow,
    pub visibility: Visibility,
    pub box_sizing: BoxSizing,
    pub z_index: Option<i32>,

    pub width: Length,
    pub height: Length,
    pub min_width: Length,
    pub min_height: Length,
    /// `Predefined(0)` is `none`
    pub max_width: Length,
    pub max_height: Length,
    pub margin: LengthEdges,
    pub padding: LengthEdges,
    /// Offsets for positioned boxes
    pub inset: LengthEdges,

    pub border_top: BorderSide,
    pub border_right: BorderSide,
    pub border_bottom: BorderSide,
    pub border_left: BorderSide,
    /// Top-left, top-right, bottom-right, bottom-left
    pub border_radius: [f32; 4],

    pub color: Color,
    pub background: Background,

    pub font_family: Vec<String>,
    /// Pixels
    pub font_size: f32,
    pub font_weight: u16,
    pub font_style: FontStyle,
    pub small_caps: bool,
    pub line_height: LineHeight,

    pub text_align: TextAlign,
    pub text_indent: Length,
    pub text_transform: TextTransform,
    pub text_decoration: TextDecoration,
    pub white_space: WhiteSpace,
    pub vertical_align: VerticalAlign,

    pub list_style_type: ListStyleType,
    pub list_style_position: ListStylePosition,
    pub list_style_image: Option<String>,

    pub border_collapse: BorderCollapse,
    /// Horizontal and vertical spacing in pixels
    pub border_spacing: (f32, f32),

    /// Generated content of `::before`/`::after`
    pub content: Option<String>,
    pub cursor: String,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self::initial(DEFAULT_FONT_FAMILY, 16.0)
    }
}

/// Inputs to [`ComputedStyle::compute`] besides the declarations
pub(crate) struct ComputeContext<'a> {
    pub host: &'a dyn StyleHost,
    /// Initial values, carrying the configured default font
    pub initial: &'a ComputedStyle,
    /// Source of `attr()` in generated content
    pub element: Option<&'a ElementData>,
    pub is_root: bool,
}

impl ComputedStyle {
    /// Initial values for every property
    pub fn initial(font_family: &str, font_size: f32) -> Self {
        let medium = BorderSide { width: BORDER_WIDTH_PX[1], ..BorderSide::default() };
        Self {
            display: Display::Inline,
            position: Position::Static,
            float: Float::None,
            clear: Clear::None,
            overflow: Overflow::Visible,
            visibility: Visibility::Visible,
            box_sizing: BoxSizing::ContentBox,
            z_index: None,
            width: Length::AUTO,
            height: Length::AUTO,
            min_width: Length::ZERO,
            min_height: Length::ZERO,
            max_width: Length::Predefined(0),
            max_height: Length::Predefined(0),
            margin: LengthEdges::all(Length::ZERO),
            padding: LengthEdges::all(Length::ZERO),
            inset: LengthEdges::all(Length::AUTO),
            border_top: medium,
            border_right: medium,
            border_bottom: medium,
            border_left: medium,
            border_radius: [0.0; 4],
            color: Color::BLACK,
            background: Background::default(),
            font_family: vec![font_family.to_string()],
            font_size,
            font_weight: 400,
            font_style: FontStyle::Normal,
            small_caps: false,
            line_height: LineHeight::Normal,
            text_align: TextAlign::Left,
            text_indent: Length::ZERO,
            text_transform: TextTransform::None,
            text_decoration: TextDecoration::default(),
            white_space: WhiteSpace::Normal,
            vertical_align: VerticalAlign::Baseline,
            list_style_type: ListStyleType::Disc,
            list_style_position: ListStylePosition::Outside,
            list_style_image: None,
            border_collapse: BorderCollapse::Separate,
            border_spacing: (0.0, 0.0),
            content: None,
            cursor: "auto".to_string(),
        }
    }

    /// Style of an anonymous box: inherited properties from `parent`,
    /// initial values for the rest
    pub fn inherit_from(parent: &ComputedStyle) -> Self {
        let mut style = ComputedStyle::default();
        style.color = parent.color;
        style.font_family = parent.font_family.clone();
        style.font_size = parent.font_size;
        style.font_weight = parent.font_weight;
        style.font_style = parent.font_style;
        style.small_caps = parent.small_caps;
        style.line_height = parent.line_height;
        style.text_align = parent.text_align;
        style.text_indent = parent.text_indent;
        style.text_transform = parent.text_transform;
        style.text_decoration = parent.text_decoration;
        style.white_space = parent.white_space;
        style.list_style_type = parent.list_style_type;
        style.list_style_position = parent.list_style_position;
        style.list_style_image = parent.list_style_image.clone();
        style.visibility = parent.visibility;
        style.cursor = parent.cursor.clone();
        style.border_collapse = parent.border_collapse;
        style.border_spacing = parent.border_spacing;
        for side in style.borders_mut() {
            side.width = 0.0;
        }
        style
    }

    /// Borders in top, right, bottom, left order
    pub fn borders(&self) -> [&BorderSide; 4] {
        [&self.border_top, &self.border_right, &self.border_bottom, &self.border_left]
    }

    /// Length context for this element's own font
    pub fn length_context(&self, percent_base: f32) -> LengthContext {
        LengthContext::new(self.font_size, percent_base)
    }

    pub fn is_floating(&self) -> bool {
        self.float != Float::None
    }

    /// Establishes a new block formatting context for its contents
    pub fn establishes_bfc(&self) -> bool {
        self.is_floating()
            || self.position.is_out_of_flow()
            || self.overflow != Overflow::Visible
            || matches!(
                self.display,
                Display::InlineBlock | Display::TableCell | Display::TableCaption | Display::Table
            )
    }

    /// Apply cascaded declarations (already sorted, weakest first) on top of
    /// the parent's inherited values
    pub(crate) fn compute(
        declarations: &[&Declaration],
        parent: Option<&ComputedStyle>,
        ctx: &ComputeContext<'_>,
    ) -> ComputedStyle {
        let mut style = match parent {
            Some(p) => ComputedStyle::inherit_from(p),
            None => ctx.initial.clone(),
        };
        let parent = parent.unwrap_or(ctx.initial);

        // `em` and `currentColor` need these before anything else
        let early = |d: &&&Declaration| d.name == "font-size" || d.name == "color";
        for decl in declarations.iter().filter(early) {
            style.apply_logged(decl, parent, ctx);
        }
        let current = style.color;
        for side in style.borders_mut() {
            *side = BorderSide { width: BORDER_WIDTH_PX[1], style: BorderStyle::None, color: current };
        }
        for decl in declarations.iter().filter(|d| !early(d)) {
            style.apply_logged(decl, parent, ctx);
        }

        style.fixup(ctx.is_root);
        style
    }

    fn borders_mut(&mut self) -> [&mut BorderSide; 4] {
        [&mut self.border_top, &mut self.border_right, &mut self.border_bottom, &mut self.border_left]
    }

    fn border_mut(&mut self, side: &str) -> Option<&mut BorderSide> {
        match side {
            "top" => Some(&mut self.border_top),
            "right" => Some(&mut self.border_right),
            "bottom" => Some(&mut self.border_bottom),
            "left" => Some(&mut self.border_left),
            _ => None,
        }
    }

    fn fixup(&mut self, is_root: bool) {
        if self.position.is_out_of_flow() {
            self.float = Float::None;
        }
        if self.is_floating() || self.position.is_out_of_flow() || is_root {
            self.display = self.display.blockified();
        }
        for side in self.borders_mut() {
            if side.style.is_invisible() {
                side.width = 0.0;
            }
        }
    }

    fn apply_logged(&mut self, decl: &Declaration, parent: &ComputedStyle, ctx: &ComputeContext<'_>) {
        if let Err(e) = self.apply(decl, parent, ctx) {
            tracing::warn!(property = %decl.name, error = %e, "Ignoring invalid value");
        }
    }

    fn apply(
        &mut self,
        decl: &Declaration,
        parent: &ComputedStyle,
        ctx: &ComputeContext<'_>,
    ) -> Result<(), ValueError> {
        let name = decl.name.as_str();
        let value = decl.value.trim();
        match value.to_ascii_lowercase().as_str() {
            "inherit" => {
                self.copy_property(name, parent);
                return Ok(());
            }
            "initial" => {
                self.copy_property(name, ctx.initial);
                return Ok(());
            }
            _ => {}
        }

        let host = ctx.host;
        let own = LengthContext {
            px_per_pt: host.pt_to_px(1.0),
            ..LengthContext::new(self.font_size, 0.0)
        };

        match name {
            "display" => self.display = keyword(name, value, Display::parse)?,
            "position" => self.position = keyword(name, value, Position::parse)?,
            "float" => self.float = keyword(name, value, Float::parse)?,
            "clear" => self.clear = keyword(name, value, Clear::parse)?,
            "overflow" | "overflow-x" | "overflow-y" => self.overflow = keyword(name, value, Overflow::parse)?,
            "visibility" => self.visibility = keyword(name, value, Visibility::parse)?,
            "box-sizing" => self.box_sizing = keyword(name, value, BoxSizing::parse)?,
            "white-space" => self.white_space = keyword(name, value, WhiteSpace::parse)?,
            "text-align" => self.text_align = keyword(name, value, TextAlign::parse)?,
            "text-transform" => self.text_transform = keyword(name, value, TextTransform::parse)?,
            "vertical-align" => self.vertical_align = keyword(name, value, VerticalAlign::parse)?,
            "font-style" => self.font_style = keyword(name, value, FontStyle::parse)?,
            "border-collapse" => self.border_collapse = keyword(name, value, BorderCollapse::parse)?,
            "list-style-type" => self.list_style_type = keyword(name, value, ListStyleType::parse)?,
            "list-style-position" => {
                self.list_style_position = keyword(name, value, ListStylePosition::parse)?
            }
            "background-repeat" => self.background.repeat = keyword(name, value, BackgroundRepeat::parse)?,
            "text-decoration-style" => {
                self.text_decoration.style = keyword(name, value, DecorationStyle::parse)?
            }

            "z-index" => {
                self.z_index = if value.eq_ignore_ascii_case("auto") {
                    None
                } else {
                    Some(value.parse().map_err(|_| ValueError::Number(value.to_string()))?)
                }
            }

            "width" => self.width = non_negative(Length::parse(value, AUTO)?, value)?,
            "height" => self.height = non_negative(Length::parse(value, AUTO)?, value)?,
            "min-width" => self.min_width = min_length(value)?,
            "min-height" => self.min_height = min_length(value)?,
            "max-width" => self.max_width = non_negative(Length::parse(value, NONE)?, value)?,
            "max-height" => self.max_height = non_negative(Length::parse(value, NONE)?, value)?,
            "text-indent" => self.text_indent = Length::parse(value, &[])?,

            "color" => self.color = Color::parse(value, parent.color, host)?,
            "background-color" => self.background.color = Color::parse(value, self.color, host)?,
            "background-image" => self.background.image = image_url(value)?,
            "background-position" => self.background.position = background_position(value)?,
            "list-style-image" => self.list_style_image = image_url(value)?,

            "font-size" => self.font_size = font_size(value, parent.font_size, ctx)?,
            "font-family" => self.font_family = font_family(value)?,
            "font-weight" => self.font_weight = font_weight(value, parent.font_weight)?,
            "font-variant" => {
                self.small_caps = match value.to_ascii_lowercase().as_str() {
                    "normal" => false,
                    "small-caps" => true,
                    _ => return Err(unknown(name, value)),
                }
            }
            "line-height" => self.line_height = line_height(value, self.font_size, own)?,
            "text-decoration" | "text-decoration-line" => self.text_decoration(value)?,
            "text-decoration-color" => self.text_decoration.color = Color::parse(value, self.color, host)?,

            "border-spacing" => {
                let parts: Vec<f32> = components(value)
                    .into_iter()
                    .map(|p| Length::parse(p, &[]).map(|l| l.to_px(&own)))
                    .collect::<Result<_, _>>()?;
                self.border_spacing = match parts.as_slice() {
                    [both] => (*both, *both),
                    [h, v] => (*h, *v),
                    _ => return Err(ValueError::Length(value.to_string())),
                };
            }

            "content" => self.content = content(value, ctx.element)?,
            "cursor" => {
                // Keep the keyword fallback after any url() entries
                let last = split_top_level(value, ',').last().map(|s| s.trim().to_ascii_lowercase());
                self.cursor = last.filter(|s| !s.is_empty()).unwrap_or_else(|| "auto".into());
            }

            _ => return self.apply_edge_property(name, value, own, host),
        }
        Ok(())
    }

    /// `margin-*`, `padding-*`, offsets, `border-*-*` and corner radii
    fn apply_edge_property(
        &mut self,
        name: &str,
        value: &str,
        own: LengthContext,
        host: &dyn StyleHost,
    ) -> Result<(), ValueError> {
        if let Some(side) = name.strip_prefix("margin-") {
            let slot = self.margin.side_mut(side).ok_or_else(|| unknown(name, value))?;
            *slot = Length::parse(value, AUTO)?;
        } else if let Some(side) = name.strip_prefix("padding-") {
            let slot = self.padding.side_mut(side).ok_or_else(|| unknown(name, value))?;
            *slot = non_negative(Length::parse(value, &[])?, value)?;
        } else if let Some(slot) = self.inset.side_mut(name) {
            *slot = Length::parse(value, AUTO)?;
        } else if let Some(corner) = name.strip_prefix("border-").and_then(|n| n.strip_suffix("-radius")) {
            let idx = ["top-left", "top-right", "bottom-right", "bottom-left"]
                .iter()
                .position(|c| *c == corner)
                .ok_or_else(|| unknown(name, value))?;
            let first = components(value).first().copied().unwrap_or(value);
            self.border_radius[idx] = Length::parse(first, &[])?.to_px(&own).max(0.0);
        } else if let Some((side, part)) = name.strip_prefix("border-").and_then(|n| n.split_once('-')) {
            let current = self.color;
            let border = self.border_mut(side).ok_or_else(|| unknown(name, value))?;
            match part {
                "width" => {
                    let len = Length::parse(value, BORDER_WIDTHS)?;
                    if len.is_percent() {
                        return Err(ValueError::Length(value.to_string()));
                    }
                    border.width = len.to_px_or(&own, |i| BORDER_WIDTH_PX[usize::from(i)]).max(0.0);
                }
                "style" => border.style = keyword(name, value, BorderStyle::parse)?,
                "color" => border.color = Color::parse(value, current, host)?,
                _ => return Err(unknown(name, value)),
            }
        } else {
            tracing::trace!(property = %name, "Unsupported property");
        }
        Ok(())
    }

    fn text_decoration(&mut self, value: &str) -> Result<(), ValueError> {
        let mut decoration = self.text_decoration;
        for word in value.split_whitespace() {
            match word.to_ascii_lowercase().as_str() {
                // Decorations of ancestors cannot be removed by descendants
                "none" => {}
                "underline" => decoration.underline = true,
                "overline" => decoration.overline = true,
                "line-through" => decoration.line_through = true,
                "blink" => {}
                _ => return Err(unknown("text-decoration", value)),
            }
        }
        decoration.color = self.color;
        self.text_decoration = decoration;
        Ok(())
    }

    /// Copy one longhand from `from` (for `inherit` and `initial`)
    fn copy_property(&mut self, name: &str, from: &ComputedStyle) {
        match name {
            "display" => self.display = from.display,
            "position" => self.position = from.position,
            "float" => self.float = from.float,
            "clear" => self.clear = from.clear,
            "overflow" | "overflow-x" | "overflow-y" => self.overflow = from.overflow,
            "visibility" => self.visibility = from.visibility,
            "box-sizing" => self.box_sizing = from.box_sizing,
            "white-space" => self.white_space = from.white_space,
            "text-align" => self.text_align = from.text_align,
            "text-transform" => self.text_transform = from.text_transform,
            "vertical-align" => self.vertical_align = from.vertical_align,
            "font-style" => self.font_style = from.font_style,
            "border-collapse" => self.border_collapse = from.border_collapse,
            "list-style-type" => self.list_style_type = from.list_style_type,
            "list-style-position" => self.list_style_position = from.list_style_position,
            "list-style-image" => self.list_style_image = from.list_style_image.clone(),
            "z-index" => self.z_index = from.z_index,
            "width" => self.width = from.width,
            "height" => self.height = from.height,
            "min-width" => self.min_width = from.min_width,
            "min-height" => self.min_height = from.min_height,
            "max-width" => self.max_width = from.max_width,
            "max-height" => self.max_height = from.max_height,
            "text-indent" => self.text_indent = from.text_indent,
            "color" => self.color = from.color,
            "background-color" => self.background.color = from.background.color,
            "background-image" => self.background.image = from.background.image.clone(),
            "background-repeat" => self.background.repeat = from.background.repeat,
            "background-position" => self.background.position = from.background.position,
            "font-size" => self.font_size = from.font_size,
            "font-family" => self.font_family = from.font_family.clone(),
            "font-weight" => self.font_weight = from.font_weight,
            "font-variant" => self.small_caps = from.small_caps,
            "line-height" => self.line_height = from.line_height,
            "text-decoration" | "text-decoration-line" | "text-decoration-style" | "text-decoration-color" => {
                self.text_decoration = from.text_decoration
            }
            "border-spacing" => self.border_spacing = from.border_spacing,
            "content" => self.content = from.content.clone(),
            "cursor" => self.cursor = from.cursor.clone(),
            _ => {
                if let Some(side) = name.strip_prefix("margin-") {
                    if let (Some(slot), Some(v)) = (self.margin.side_mut(side), from.margin.side(side)) {
                        *slot = v;
                    }
                } else if let Some(side) = name.strip_prefix("padding-") {
                    if let (Some(slot), Some(v)) = (self.padding.side_mut(side), from.padding.side(side)) {
                        *slot = v;
                    }
                } else if let Some(v) = from.inset.side(name) {
                    if let Some(slot) = self.inset.side_mut(name) {
                        *slot = v;
                    }
                } else if let Some(corner) = name.strip_prefix("border-").and_then(|n| n.strip_suffix("-radius")) {
                    let corners = ["top-left", "top-right", "bottom-right", "bottom-left"];
                    if let Some(i) = corners.iter().position(|c| *c == corner) {
                        self.border_radius[i] = from.border_radius[i];
                    }
                } else if let Some((side, part)) = name.strip_prefix("border-").and_then(|n| n.split_once('-')) {
                    let source = match side {
                        "top" => from.border_top,
                        "right" => from.border_right,
                        "bottom" => from.border_bottom,
                        "left" => from.border_left,
                        _ => return,
                    };
                    if let Some(border) = self.border_mut(side) {
                        match part {
                            "width" => border.width = source.width,
                            "style" => border.style = source.style,
                            "color" => border.color = source.color,
                            _ => {}
                        }
                    }
                }
            }
        }
    }
}

fn unknown(property: &str, value: &str) -> ValueError {
    ValueError::Keyword { property: property.to_string(), value: value.to_string() }
}

fn keyword<T>(property: &str, value: &str, parse: fn(&str) -> Option<T>) -> Result<T, ValueError> {
    parse(value).ok_or_else(|| unknown(property, value))
}

fn non_negative(len: Length, text: &str) -> Result<Length, ValueError> {
    match len {
        Length::Value(v, _) if v < 0.0 => Err(ValueError::Length(text.to_string())),
        other => Ok(other),
    }
}

/// `min-*`: `auto` computes to zero
fn min_length(value: &str) -> Result<Length, ValueError> {
    match non_negative(Length::parse(value, AUTO)?, value)? {
        Length::Predefined(_) => Ok(Length::ZERO),
        other => Ok(other),
    }
}

fn image_url(value: &str) -> Result<Option<String>, ValueError> {
    if value.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    function_args(value, "url")
        .map(|inner| Some(unquote(inner)))
        .ok_or_else(|| unknown("image", value))
}

fn background_position(value: &str) -> Result<(Length, Length), ValueError> {
    let parse = |part: &str| -> Result<(Length, Option<bool>), ValueError> {
        // Option<bool>: Some(true) = horizontal-only keyword, Some(false) = vertical-only
        Ok(match part.to_ascii_lowercase().as_str() {
            "left" => (Length::percent(0.0), Some(true)),
            "right" => (Length::percent(100.0), Some(true)),
            "top" => (Length::percent(0.0), Some(false)),
            "bottom" => (Length::percent(100.0), Some(false)),
            "center" => (Length::percent(50.0), None),
            _ => (Length::parse(part, &[])?, None),
        })
    };
    let parts = components(value);
    match parts.as_slice() {
        [one] => {
            let (len, axis) = parse(one)?;
            Ok(if axis == Some(false) { (Length::percent(50.0), len) } else { (len, Length::percent(50.0)) })
        }
        [a, b] => {
            let (first, first_axis) = parse(a)?;
            let (second, second_axis) = parse(b)?;
            Ok(if first_axis == Some(false) || second_axis == Some(true) {
                (second, first)
            } else {
                (first, second)
            })
        }
        _ => Err(unknown("background-position", value)),
    }
}

fn font_size(value: &str, parent_size: f32, ctx: &ComputeContext<'_>) -> Result<f32, ValueError> {
    let base = ctx.initial.font_size;
    let scale = match value.to_ascii_lowercase().as_str() {
        "xx-small" => Some(3.0 / 5.0),
        "x-small" => Some(3.0 / 4.0),
        "small" => Some(8.0 / 9.0),
        "medium" => Some(1.0),
        "large" => Some(6.0 / 5.0),
        "x-large" => Some(3.0 / 2.0),
        "xx-large" => Some(2.0),
        "xxx-large" => Some(3.0),
        "smaller" => return Ok(parent_size / 1.2),
        "larger" => return Ok(parent_size * 1.2),
        _ => None,
    };
    if let Some(scale) = scale {
        return Ok(base * scale);
    }

    let len = non_negative(Length::parse(value, &[])?, value)?;
    let relative_to_parent = LengthContext {
        em: parent_size,
        ex: parent_size * 0.5,
        percent_base: parent_size,
        px_per_pt: ctx.host.pt_to_px(1.0),
    };
    Ok(len.to_px(&relative_to_parent))
}

fn font_family(value: &str) -> Result<Vec<String>, ValueError> {
    let families: Vec<String> = split_top_level(value, ',')
        .into_iter()
        .map(|f| {
            let f = f.trim();
            if f.starts_with('"') || f.starts_with('\'') {
                unquote(f)
            } else {
                f.split_whitespace().collect::<Vec<_>>().join(" ")
            }
        })
        .filter(|f| !f.is_empty())
        .collect();
    if families.is_empty() {
        return Err(unknown("font-family", value));
    }
    Ok(families)
}

fn font_weight(value: &str, parent: u16) -> Result<u16, ValueError> {
    Ok(match value.to_ascii_lowercase().as_str() {
        "normal" => 400,
        "bold" => 700,
        "bolder" => match parent {
            0..=349 => 400,
            350..=549 => 700,
            _ => 900,
        },
        "lighter" => match parent {
            0..=549 => 100,
            550..=749 => 400,
            _ => 700,
        },
        n => match n.parse::<u16>() {
            Ok(w) if (1..=1000).contains(&w) => w,
            _ => return Err(unknown("font-weight", value)),
        },
    })
}

fn line_height(value: &str, font_size: f32, own: LengthContext) -> Result<LineHeight, ValueError> {
    if value.eq_ignore_ascii_case("normal") {
        return Ok(LineHeight::Normal);
    }
    let len = non_negative(Length::parse(value, &[])?, value)?;
    Ok(match len {
        Length::Value(n, LengthUnit::None) => LineHeight::Number(n),
        other => LineHeight::Px(other.to_px(&LengthContext { percent_base: font_size, ..own })),
    })
}

fn content(value: &str, element: Option<&ElementData>) -> Result<Option<String>, ValueError> {
    if matches!(value.to_ascii_lowercase().as_str(), "none" | "normal") {
        return Ok(None);
    }
    let mut out = String::new();
    for part in components(value) {
        let lower = part.to_ascii_lowercase();
        match lower.as_str() {
            "open-quote" => out.push('\u{201C}'),
            "close-quote" => out.push('\u{201D}'),
            "no-open-quote" | "no-close-quote" => {}
            _ if part.starts_with('"') || part.starts_with('\'') => out.push_str(&unquote(part)),
            _ => {
                if let Some(name) = function_args(part, "attr") {
                    if let Some(v) = element.and_then(|e| e.get_attr(name.trim())) {
                        out.push_str(v);
                    }
                } else if function_args(part, "counter").is_none() && function_args(part, "counters").is_none() {
                    return Err(unknown("content", value));
                }
            }
        }
    }
    Ok(Some(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DefaultStyleHost;

    fn compute_with(decls: &[(&str, &str)], parent: Option<&ComputedStyle>) -> ComputedStyle {
        let owned: Vec<Declaration> = decls.iter().map(|(n, v)| Declaration::new(n, v, false)).collect();
        let refs: Vec<&Declaration> = owned.iter().collect();
        let initial = ComputedStyle::default();
        let ctx = ComputeContext { host: &DefaultStyleHost, initial: &initial, element: None, is_root: false };
        ComputedStyle::compute(&refs, parent, &ctx)
    }

    #[test]
    fn test_font_size_resolution() {
        let parent = compute_with(&[("font-size", "20px")], None);
        assert_eq!(compute_with(&[("font-size", "2em")], Some(&parent)).font_size, 40.0);
        assert_eq!(compute_with(&[("font-size", "50%")], Some(&parent)).font_size, 10.0);
        assert_eq!(compute_with(&[("font-size", "12pt")], Some(&parent)).font_size, 16.0);
        assert_eq!(compute_with(&[("font-size", "xx-large")], Some(&parent)).font_size, 32.0);
        let larger = compute_with(&[("font-size", "larger")], Some(&parent)).font_size;
        assert!((larger - 24.0).abs() < 0.01);
    }

    #[test]
    fn test_inheritance() {
        let parent = compute_with(&[("color", "red"), ("margin-left", "10px"), ("text-align", "center")], None);
        let child = compute_with(&[], Some(&parent));
        assert_eq!(child.color, Color::rgb(255, 0, 0));
        assert_eq!(child.text_align, TextAlign::Center);
        assert_eq!(child.margin.left, Length::ZERO);

        let explicit = compute_with(&[("margin-left", "inherit")], Some(&parent));
        assert_eq!(explicit.margin.left, Length::px(10.0));
        let reset = compute_with(&[("color", "initial")], Some(&parent));
        assert_eq!(reset.color, Color::BLACK);
    }

    #[test]
    fn test_invalid_value_keeps_previous() {
        let style = compute_with(&[("width", "100px"), ("width", "wide"), ("display", "flex")], None);
        assert_eq!(style.width, Length::px(100.0));
        assert_eq!(style.display, Display::Inline);
        assert_eq!(compute_with(&[("padding-top", "-4px")], None).padding.top, Length::ZERO);
    }

    #[test]
    fn test_border_defaults_to_current_color() {
        let style = compute_with(
            &[("border-top-style", "solid"), ("border-top-width", "thick"), ("color", "blue")],
            None,
        );
        assert_eq!(style.border_top.color, Color::rgb(0, 0, 255));
        assert_eq!(style.border_top.width, 5.0);
        assert_eq!(style.border_left.width, 0.0);
    }

    #[test]
    fn test_blockification() {
        let floated = compute_with(&[("display", "inline"), ("float", "left")], None);
        assert_eq!(floated.display, Display::Block);
        let abs = compute_with(&[("float", "right"), ("position", "absolute"), ("display", "inline-table")], None);
        assert_eq!(abs.float, Float::None);
        assert_eq!(abs.display, Display::Table);
    }

    #[test]
    fn test_line_height_and_decoration() {
        let style = compute_with(&[("font-size", "10px"), ("line-height", "150%"), ("text-decoration", "underline")], None);
        assert_eq!(style.line_height, LineHeight::Px(15.0));
        assert!(style.text_decoration.underline);
        let child = compute_with(&[("line-height", "1.5"), ("text-decoration", "none")], Some(&style));
        assert_eq!(child.line_height, LineHeight::Number(1.5));
        assert!(child.text_decoration.underline);
    }

    #[test]
    fn test_content_with_attr() {
        let mut elem = ElementData::new("a");
        elem.set_attr("href", "x.html");
        assert_eq!(
            content("\"[\" attr(href) \"]\"", Some(&elem)),
            Ok(Some("[x.html]".to_string()))
        );
        assert_eq!(content("none", Some(&elem)), Ok(None));
    }

    #[test]
    fn test_background_position() {
        assert_eq!(
            background_position("top right"),
            Ok((Length::percent(100.0), Length::percent(0.0)))
        );
        assert_eq!(background_position("center"), Ok((Length::percent(50.0), Length::percent(50.0))));
        assert_eq!(background_position("10px 20%"), Ok((Length::px(10.0), Length::percent(20.0))));
    }
}
