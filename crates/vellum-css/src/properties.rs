//! Keyword-valued CSS properties
//!
//! Each property with a closed set of keywords gets its own enum so layout
//! and paint can match on them directly.

use serde::{Deserialize, Serialize};

macro_rules! keyword_enum {
    (
        $(#[$meta:meta])*
        $name:ident default $default:ident {
            $($variant:ident => $($kw:literal)|+),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl Default for $name {
            fn default() -> Self {
                Self::$default
            }
        }

        impl $name {
            /// Parse a keyword, case-insensitive
            pub fn parse(text: &str) -> Option<Self> {
                match text.trim().to_ascii_lowercase().as_str() {
                    $($($kw)|+ => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

keyword_enum! {
    /// `display`
    Display default Inline {
        None => "none",
        Block => "block",
        Inline => "inline",
        InlineBlock => "inline-block",
        ListItem => "list-item",
        Table => "table",
        InlineTable => "inline-table",
        TableRowGroup => "table-row-group",
        TableHeaderGroup => "table-header-group",
        TableFooterGroup => "table-footer-group",
        TableRow => "table-row",
        TableColumnGroup => "table-column-group",
        TableColumn => "table-column",
        TableCell => "table-cell",
        TableCaption => "table-caption",
    }
}

impl Display {
    /// Generates a block-level box
    pub fn is_block_level(self) -> bool {
        matches!(self, Display::Block | Display::ListItem | Display::Table)
    }

    /// Participates in an inline formatting context
    pub fn is_inline_level(self) -> bool {
        matches!(self, Display::Inline | Display::InlineBlock | Display::InlineTable)
    }

    pub fn is_table_part(self) -> bool {
        matches!(
            self,
            Display::TableRowGroup
                | Display::TableHeaderGroup
                | Display::TableFooterGroup
                | Display::TableRow
                | Display::TableColumnGroup
                | Display::TableColumn
                | Display::TableCell
                | Display::TableCaption
        )
    }

    pub fn is_row_group(self) -> bool {
        matches!(self, Display::TableRowGroup | Display::TableHeaderGroup | Display::TableFooterGroup)
    }

    /// Value used for floats, absolutely positioned boxes and the root
    pub fn blockified(self) -> Display {
        match self {
            Display::InlineTable | Display::Table => Display::Table,
            Display::ListItem => Display::ListItem,
            Display::None => Display::None,
            _ => Display::Block,
        }
    }
}

keyword_enum! {
    /// `position`
    Position default Static {
        Static => "static",
        Relative => "relative",
        Absolute => "absolute",
        Fixed => "fixed",
    }
}

impl Position {
    /// Taken out of normal flow
    pub fn is_out_of_flow(self) -> bool {
        matches!(self, Position::Absolute | Position::Fixed)
    }

    pub fn is_positioned(self) -> bool {
        self != Position::Static
    }
}

keyword_enum! {
    /// `float`
    Float default None {
        None => "none",
        Left => "left",
        Right => "right",
    }
}

keyword_enum! {
    /// `clear`
    Clear default None {
        None => "none",
        Left => "left",
        Right => "right",
        Both => "both",
    }
}

keyword_enum! {
    /// `overflow`
    Overflow default Visible {
        Visible => "visible",
        Hidden => "hidden",
        Scroll => "scroll",
        Auto => "auto",
    }
}

keyword_enum! {
    /// `visibility`
    Visibility default Visible {
        Visible => "visible",
        Hidden => "hidden",
        Collapse => "collapse",
    }
}

keyword_enum! {
    /// `white-space`
    WhiteSpace default Normal {
        Normal => "normal",
        Nowrap => "nowrap",
        Pre => "pre",
        PreWrap => "pre-wrap",
        PreLine => "pre-line",
    }
}

impl WhiteSpace {
    /// Runs of spaces and tabs collapse to one space
    pub fn collapses_spaces(self) -> bool {
        matches!(self, WhiteSpace::Normal | WhiteSpace::Nowrap | WhiteSpace::PreLine)
    }

    /// Newlines in the source force a line break
    pub fn preserves_newlines(self) -> bool {
        matches!(self, WhiteSpace::Pre | WhiteSpace::PreWrap | WhiteSpace::PreLine)
    }

    /// Lines may break at soft wrap opportunities
    pub fn wraps(self) -> bool {
        matches!(self, WhiteSpace::Normal | WhiteSpace::PreWrap | WhiteSpace::PreLine)
    }
}

keyword_enum! {
    /// `text-align`
    TextAlign default Left {
        Left => "left" | "start",
        Right => "right" | "end",
        Center => "center" | "-moz-center" | "-webkit-center",
        Justify => "justify",
    }
}

keyword_enum! {
    /// `text-transform`
    TextTransform default None {
        None => "none",
        Capitalize => "capitalize",
        Uppercase => "uppercase",
        Lowercase => "lowercase",
    }
}

impl TextTransform {
    /// Apply to one word. `first_in_word` is false when the word continues
    /// a word split across inline elements.
    pub fn apply(self, text: &str, first_in_word: bool) -> String {
        match self {
            TextTransform::None => text.to_string(),
            TextTransform::Uppercase => text.to_uppercase(),
            TextTransform::Lowercase => text.to_lowercase(),
            TextTransform::Capitalize => {
                let mut out = String::with_capacity(text.len());
                let mut at_start = first_in_word;
                for c in text.chars() {
                    if at_start && c.is_alphabetic() {
                        out.extend(c.to_uppercase());
                        at_start = false;
                    } else {
                        out.push(c);
                    }
                    if c.is_whitespace() {
                        at_start = true;
                    }
                }
                out
            }
        }
    }
}

keyword_enum! {
    /// `vertical-align`
    VerticalAlign default Baseline {
        Baseline => "baseline",
        Top => "top",
        Bottom => "bottom",
        Middle => "middle",
        TextTop => "text-top",
        TextBottom => "text-bottom",
        Sub => "sub",
        Super => "super",
    }
}

keyword_enum! {
    /// `font-style`
    FontStyle default Normal {
        Normal => "normal",
        Italic => "italic",
        Oblique => "oblique",
    }
}

keyword_enum! {
    /// `border-*-style`
    BorderStyle default None {
        None => "none",
        Hidden => "hidden",
        Solid => "solid",
        Dotted => "dotted",
        Dashed => "dashed",
        Double => "double",
        Groove => "groove",
        Ridge => "ridge",
        Inset => "inset",
        Outset => "outset",
    }
}

impl BorderStyle {
    /// Draws nothing and takes no space
    pub fn is_invisible(self) -> bool {
        matches!(self, BorderStyle::None | BorderStyle::Hidden)
    }
}

keyword_enum! {
    /// `border-collapse`
    BorderCollapse default Separate {
        Separate => "separate",
        Collapse => "collapse",
    }
}

keyword_enum! {
    /// `box-sizing`
    BoxSizing default ContentBox {
        ContentBox => "content-box",
        BorderBox => "border-box",
    }
}

keyword_enum! {
    /// `list-style-type`
    ListStyleType default Disc {
        Disc => "disc",
        Circle => "circle",
        Square => "square",
        Decimal => "decimal",
        LowerAlpha => "lower-alpha" | "lower-latin",
        UpperAlpha => "upper-alpha" | "upper-latin",
        LowerRoman => "lower-roman",
        UpperRoman => "upper-roman",
        None => "none",
    }
}

keyword_enum! {
    /// `list-style-position`
    ListStylePosition default Outside {
        Outside => "outside",
        Inside => "inside",
    }
}

keyword_enum! {
    /// `background-repeat`
    BackgroundRepeat default Repeat {
        Repeat => "repeat",
        RepeatX => "repeat-x",
        RepeatY => "repeat-y",
        NoRepeat => "no-repeat",
    }
}

keyword_enum! {
    /// `text-decoration-style`
    DecorationStyle default Solid {
        Solid => "solid",
        Double => "double",
        Dotted => "dotted",
        Dashed => "dashed",
        Wavy => "wavy",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_parse() {
        assert_eq!(Display::parse("INLINE-BLOCK"), Some(Display::InlineBlock));
        assert_eq!(Display::parse("flex"), None);
        assert_eq!(ListStyleType::parse("lower-latin"), Some(ListStyleType::LowerAlpha));
        assert_eq!(TextAlign::parse("start"), Some(TextAlign::Left));
        assert_eq!(Display::default(), Display::Inline);
    }

    #[test]
    fn test_blockify() {
        assert_eq!(Display::Inline.blockified(), Display::Block);
        assert_eq!(Display::InlineTable.blockified(), Display::Table);
        assert_eq!(Display::TableCell.blockified(), Display::Block);
        assert_eq!(Display::None.blockified(), Display::None);
    }

    #[test]
    fn test_white_space_modes() {
        assert!(WhiteSpace::Normal.wraps() && WhiteSpace::Normal.collapses_spaces());
        assert!(!WhiteSpace::Nowrap.wraps());
        assert!(WhiteSpace::PreLine.preserves_newlines() && WhiteSpace::PreLine.collapses_spaces());
        assert!(!WhiteSpace::Pre.collapses_spaces());
    }

    #[test]
    fn test_text_transform() {
        assert_eq!(TextTransform::Capitalize.apply("hello world", true), "Hello World");
        assert_eq!(TextTransform::Capitalize.apply("llo", false), "llo");
        assert_eq!(TextTransform::Uppercase.apply("straße", true), "STRASSE");
    }
}
