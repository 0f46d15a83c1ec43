//! Element kinds
//!
//! The set of tags with special parsing, styling or layout behaviour is fixed,
//! so it is modelled as a closed enum with a per-kind behaviour table instead
//! of a type hierarchy. Every other tag is [`ElementKind::Other`].

/// Tag classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Html,
    Head,
    Body,
    Title,
    Base,
    Meta,
    Link,
    Style,
    Script,
    Table,
    Caption,
    Thead,
    Tbody,
    Tfoot,
    Tr,
    Td,
    Th,
    Col,
    Colgroup,
    Img,
    Anchor,
    Br,
    Hr,
    Para,
    Div,
    Li,
    Ul,
    Ol,
    Dt,
    Dd,
    Option,
    Font,
    Center,
    Input,
    Button,
    Param,
    Pre,
    Heading,
    Other,
}

impl ElementKind {
    /// Classify a lowercase tag name
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "html" => Self::Html,
            "head" => Self::Head,
            "body" => Self::Body,
            "title" => Self::Title,
            "base" => Self::Base,
            "meta" => Self::Meta,
            "link" => Self::Link,
            "style" => Self::Style,
            "script" => Self::Script,
            "table" => Self::Table,
            "caption" => Self::Caption,
            "thead" => Self::Thead,
            "tbody" => Self::Tbody,
            "tfoot" => Self::Tfoot,
            "tr" => Self::Tr,
            "td" => Self::Td,
            "th" => Self::Th,
            "col" => Self::Col,
            "colgroup" => Self::Colgroup,
            "img" => Self::Img,
            "a" => Self::Anchor,
            "br" => Self::Br,
            "hr" => Self::Hr,
            "p" => Self::Para,
            "div" => Self::Div,
            "li" => Self::Li,
            "ul" => Self::Ul,
            "ol" => Self::Ol,
            "dt" => Self::Dt,
            "dd" => Self::Dd,
            "option" => Self::Option,
            "font" => Self::Font,
            "center" => Self::Center,
            "input" => Self::Input,
            "button" => Self::Button,
            "param" => Self::Param,
            "pre" => Self::Pre,
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => Self::Heading,
            _ => Self::Other,
        }
    }

    /// Elements that never have children; the builder closes them as soon
    /// as content follows.
    pub fn is_void(self) -> bool {
        matches!(
            self,
            Self::Br
                | Self::Img
                | Self::Meta
                | Self::Link
                | Self::Hr
                | Self::Input
                | Self::Button
                | Self::Param
                | Self::Col
                | Self::Base
        )
    }

    /// Elements whose content is scanned as raw text up to the end tag
    pub fn is_raw_text(self) -> bool {
        matches!(self, Self::Script | Self::Style)
    }

    /// Table row groups
    pub fn is_row_group(self) -> bool {
        matches!(self, Self::Thead | Self::Tbody | Self::Tfoot)
    }

    /// Table cells
    pub fn is_cell(self) -> bool {
        matches!(self, Self::Td | Self::Th)
    }

    /// Tags whose start implicitly closes an open paragraph
    pub fn closes_paragraph(self) -> bool {
        matches!(
            self,
            Self::Para
                | Self::Div
                | Self::Ul
                | Self::Ol
                | Self::Table
                | Self::Hr
                | Self::Pre
                | Self::Heading
                | Self::Center
                | Self::Dt
                | Self::Dd
        )
    }

    /// Elements that stop the search for an implicitly closed element
    pub fn is_scope_boundary(self) -> bool {
        matches!(
            self,
            Self::Html
                | Self::Body
                | Self::Table
                | Self::Td
                | Self::Th
                | Self::Ul
                | Self::Ol
                | Self::Div
                | Self::Caption
        )
    }

    /// Does starting an element of kind `next` implicitly close an open
    /// element of this kind?
    pub fn closed_by(self, next: ElementKind) -> bool {
        match self {
            Self::Td | Self::Th => next.is_cell() || next == Self::Tr || next.is_row_group(),
            Self::Tr => next == Self::Tr || next.is_row_group(),
            Self::Thead | Self::Tbody | Self::Tfoot => next.is_row_group(),
            Self::Li => next == Self::Li,
            Self::Para => next.closes_paragraph(),
            Self::Option => next == Self::Option,
            Self::Dt | Self::Dd => matches!(next, Self::Dt | Self::Dd),
            _ => false,
        }
    }
}
