//! Selectors
//!
//! Parsing, specificity and right-to-left matching against a [`DomTree`].

use vellum_dom::{DomTree, ElementData, ElementKind, NodeId};

use crate::{CssError, Specificity};

/// Selector combinators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// Whitespace
    Descendant,
    /// `>`
    Child,
    /// `+`
    Adjacent,
    /// `~`
    General,
}

/// Attribute selector operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrOp {
    /// `[attr]`
    Exists,
    /// `[attr=value]`
    Equals,
    /// `[attr~=value]`
    Includes,
    /// `[attr|=value]`
    DashMatch,
    /// `[attr^=value]`
    Prefix,
    /// `[attr$=value]`
    Suffix,
    /// `[attr*=value]`
    Substring,
}

/// `an+b` argument of the nth-* pseudo-classes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nth {
    pub a: i32,
    pub b: i32,
}

impl Nth {
    pub fn parse(text: &str) -> Option<Self> {
        let t: String = text.chars().filter(|c| !c.is_whitespace()).collect::<String>().to_ascii_lowercase();
        match t.as_str() {
            "odd" => return Some(Nth { a: 2, b: 1 }),
            "even" => return Some(Nth { a: 2, b: 0 }),
            _ => {}
        }
        let Some(n_pos) = t.find('n') else {
            return t.parse().ok().map(|b| Nth { a: 0, b });
        };
        let a = match &t[..n_pos] {
            "" | "+" => 1,
            "-" => -1,
            s => s.parse().ok()?,
        };
        let b = match &t[n_pos + 1..] {
            "" => 0,
            s => s.strip_prefix('+').unwrap_or(s).parse().ok()?,
        };
        Some(Nth { a, b })
    }

    /// Does 1-based `index` satisfy `an+b` for some n >= 0?
    pub fn matches(&self, index: i32) -> bool {
        let (a, b) = (i64::from(self.a), i64::from(self.b));
        let diff = i64::from(index) - b;
        if a == 0 {
            return diff == 0;
        }
        diff % a == 0 && diff / a >= 0
    }
}

/// Pseudo-classes
#[derive(Debug, Clone, PartialEq)]
pub enum PseudoClass {
    Hover,
    Active,
    Focus,
    Link,
    Root,
    Empty,
    FirstChild,
    LastChild,
    OnlyChild,
    FirstOfType,
    LastOfType,
    OnlyOfType,
    NthChild(Nth),
    NthLastChild(Nth),
    NthOfType(Nth),
    NthLastOfType(Nth),
    Not(Box<Compound>),
    Lang(String),
    /// Any other name, matched against the element's custom states
    Custom(String),
}

/// Pseudo-elements that generate boxes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PseudoElement {
    Before,
    After,
}

/// Simple selector
#[derive(Debug, Clone, PartialEq)]
pub enum SimpleSelector {
    Universal,
    Type(String),
    Id(String),
    Class(String),
    Attribute { name: String, op: AttrOp, value: String },
    Pseudo(PseudoClass),
}

/// Sequence of simple selectors with no combinator between them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Compound {
    pub parts: Vec<SimpleSelector>,
}

/// Complex selector
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    /// Left to right
    pub compounds: Vec<Compound>,
    /// `combinators[i]` joins `compounds[i]` and `compounds[i + 1]`
    pub combinators: Vec<Combinator>,
    pub pseudo_element: Option<PseudoElement>,
    pub specificity: Specificity,
    /// Source text, for diagnostics
    pub text: String,
}

impl Selector {
    /// Parse one selector (no commas)
    pub fn parse(text: &str) -> Result<Selector, CssError> {
        let text = text.trim();
        let mut parser = SelectorParser { chars: text.chars().collect(), pos: 0 };
        parser.parse_selector(text)
    }

    /// Match against an element, ignoring any pseudo-element
    pub fn matches(&self, tree: &DomTree, node: NodeId, lang: &str) -> bool {
        match self.compounds.len() {
            0 => false,
            n => self.matches_from(n - 1, tree, node, lang),
        }
    }

    fn matches_from(&self, idx: usize, tree: &DomTree, node: NodeId, lang: &str) -> bool {
        if !self.compounds[idx].matches(tree, node, lang) {
            return false;
        }
        if idx == 0 {
            return true;
        }

        match self.combinators[idx - 1] {
            Combinator::Child => parent_element(tree, node)
                .is_some_and(|p| self.matches_from(idx - 1, tree, p, lang)),
            Combinator::Descendant => {
                let mut cur = parent_element(tree, node);
                while let Some(anc) = cur {
                    if self.matches_from(idx - 1, tree, anc, lang) {
                        return true;
                    }
                    cur = parent_element(tree, anc);
                }
                false
            }
            Combinator::Adjacent => tree
                .prev_element_sibling(node)
                .is_some_and(|s| self.matches_from(idx - 1, tree, s, lang)),
            Combinator::General => {
                let mut cur = tree.prev_element_sibling(node);
                while let Some(sib) = cur {
                    if self.matches_from(idx - 1, tree, sib, lang) {
                        return true;
                    }
                    cur = tree.prev_element_sibling(sib);
                }
                false
            }
        }
    }
}

fn parent_element(tree: &DomTree, node: NodeId) -> Option<NodeId> {
    tree.parent(node).filter(|&p| tree.element(p).is_some())
}

impl Compound {
    fn specificity(&self) -> Specificity {
        self.parts.iter().fold(Specificity::default(), |acc, part| {
            acc + match part {
                SimpleSelector::Universal => Specificity(0, 0, 0),
                SimpleSelector::Type(_) => Specificity(0, 0, 1),
                SimpleSelector::Id(_) => Specificity(1, 0, 0),
                SimpleSelector::Class(_) | SimpleSelector::Attribute { .. } => Specificity(0, 1, 0),
                SimpleSelector::Pseudo(PseudoClass::Not(inner)) => inner.specificity(),
                SimpleSelector::Pseudo(_) => Specificity(0, 1, 0),
            }
        })
    }

    /// Match every simple selector against one element
    pub fn matches(&self, tree: &DomTree, node: NodeId, lang: &str) -> bool {
        let Some(elem) = tree.element(node) else {
            return false;
        };
        self.parts.iter().all(|part| match part {
            SimpleSelector::Universal => true,
            SimpleSelector::Type(tag) => elem.tag == *tag,
            SimpleSelector::Id(id) => elem.id.as_deref() == Some(id.as_str()),
            SimpleSelector::Class(class) => elem.has_class(class),
            SimpleSelector::Attribute { name, op, value } => match_attribute(elem, name, *op, value),
            SimpleSelector::Pseudo(pseudo) => match_pseudo(tree, node, elem, pseudo, lang),
        })
    }
}

fn match_attribute(elem: &ElementData, name: &str, op: AttrOp, value: &str) -> bool {
    let Some(actual) = elem.get_attr(name) else {
        return false;
    };
    match op {
        AttrOp::Exists => true,
        AttrOp::Equals => actual == value,
        AttrOp::Includes => actual.split_whitespace().any(|w| w == value),
        AttrOp::DashMatch => {
            actual == value || actual.strip_prefix(value).is_some_and(|rest| rest.starts_with('-'))
        }
        AttrOp::Prefix => !value.is_empty() && actual.starts_with(value),
        AttrOp::Suffix => !value.is_empty() && actual.ends_with(value),
        AttrOp::Substring => !value.is_empty() && actual.contains(value),
    }
}

/// Element siblings of `node` (itself included), in order
fn element_siblings(tree: &DomTree, node: NodeId) -> Vec<NodeId> {
    match tree.parent(node) {
        Some(parent) => tree
            .children(parent)
            .filter(|(_, n)| n.is_element())
            .map(|(id, _)| id)
            .collect(),
        None => vec![node],
    }
}

/// (1-based index from start, 1-based index from end) among `siblings`
fn position(siblings: &[NodeId], node: NodeId) -> (i32, i32) {
    let idx = siblings.iter().position(|&s| s == node).unwrap_or(0) as i32;
    (idx + 1, siblings.len() as i32 - idx)
}

fn match_pseudo(tree: &DomTree, node: NodeId, elem: &ElementData, pseudo: &PseudoClass, lang: &str) -> bool {
    let same_type = |tree: &DomTree| -> Vec<NodeId> {
        element_siblings(tree, node)
            .into_iter()
            .filter(|&s| tree.tag(s) == Some(elem.tag.as_str()))
            .collect()
    };

    match pseudo {
        PseudoClass::Hover => elem.state.hover,
        PseudoClass::Active => elem.state.active,
        PseudoClass::Focus => elem.state.focus,
        PseudoClass::Link => elem.kind == ElementKind::Anchor && elem.has_attr("href"),
        PseudoClass::Root => parent_element(tree, node).is_none(),
        PseudoClass::Empty => tree.children(node).all(|(_, n)| {
            n.as_text().map(|t| t.content.is_empty()).unwrap_or(!n.is_element())
        }),
        PseudoClass::FirstChild => tree.prev_element_sibling(node).is_none(),
        PseudoClass::LastChild => tree.next_element_sibling(node).is_none(),
        PseudoClass::OnlyChild => {
            tree.prev_element_sibling(node).is_none() && tree.next_element_sibling(node).is_none()
        }
        PseudoClass::FirstOfType => position(&same_type(tree), node).0 == 1,
        PseudoClass::LastOfType => position(&same_type(tree), node).1 == 1,
        PseudoClass::OnlyOfType => same_type(tree).len() == 1,
        PseudoClass::NthChild(nth) => nth.matches(position(&element_siblings(tree, node), node).0),
        PseudoClass::NthLastChild(nth) => nth.matches(position(&element_siblings(tree, node), node).1),
        PseudoClass::NthOfType(nth) => nth.matches(position(&same_type(tree), node).0),
        PseudoClass::NthLastOfType(nth) => nth.matches(position(&same_type(tree), node).1),
        PseudoClass::Not(inner) => !inner.matches(tree, node, lang),
        PseudoClass::Lang(wanted) => {
            let declared = std::iter::once(node)
                .chain(tree.ancestors(node))
                .find_map(|id| tree.element(id).and_then(|e| e.get_attr("lang")))
                .unwrap_or(lang);
            lang_matches(declared, wanted)
        }
        PseudoClass::Custom(name) => elem.state.has_custom(name),
    }
}

fn lang_matches(declared: &str, wanted: &str) -> bool {
    let declared = declared.to_ascii_lowercase();
    let wanted = wanted.to_ascii_lowercase();
    declared == wanted || declared.strip_prefix(&wanted).is_some_and(|r| r.starts_with('-'))
}

struct SelectorParser {
    chars: Vec<char>,
    pos: usize,
}

impl SelectorParser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn ident(&mut self) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            if c == '\\' {
                self.pos += 1;
                if let Some(esc) = self.peek() {
                    out.push(esc);
                    self.pos += 1;
                }
            } else if c.is_alphanumeric() || c == '-' || c == '_' || !c.is_ascii() {
                out.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }
        out
    }

    /// Text up to the matching close paren (consumed)
    fn paren_args(&mut self) -> Option<String> {
        let mut depth = 1;
        let mut out = String::new();
        while let Some(c) = self.peek() {
            self.pos += 1;
            match c {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(out);
                    }
                }
                _ => {}
            }
            out.push(c);
        }
        None
    }

    fn parse_selector(&mut self, text: &str) -> Result<Selector, CssError> {
        let fail = |reason: &str| CssError::InvalidSelector {
            selector: text.to_string(),
            reason: reason.to_string(),
        };

        let mut compounds = Vec::new();
        let mut combinators = Vec::new();
        let mut pseudo_element = None;

        loop {
            let (compound, pe) = self.parse_compound().map_err(|r| fail(&r))?;
            if compound.parts.is_empty() && pe.is_none() {
                return Err(fail("empty compound selector"));
            }
            compounds.push(compound);

            let had_ws = self.skip_ws();
            let combinator = match self.peek() {
                None => {
                    pseudo_element = pe;
                    break;
                }
                Some('>') => Combinator::Child,
                Some('+') => Combinator::Adjacent,
                Some('~') => Combinator::General,
                Some(_) if had_ws => Combinator::Descendant,
                Some(c) => return Err(fail(&format!("unexpected `{c}`"))),
            };
            if pe.is_some() {
                return Err(fail("pseudo-element must be last"));
            }
            if combinator != Combinator::Descendant {
                self.pos += 1;
                self.skip_ws();
            }
            combinators.push(combinator);
        }

        let specificity = compounds.iter().fold(Specificity::default(), |acc, c| acc + c.specificity())
            + if pseudo_element.is_some() { Specificity(0, 0, 1) } else { Specificity::default() };

        Ok(Selector { compounds, combinators, pseudo_element, specificity, text: text.to_string() })
    }

    fn parse_compound(&mut self) -> Result<(Compound, Option<PseudoElement>), String> {
        let mut parts = Vec::new();
        let mut pseudo_element = None;

        match self.peek() {
            Some('*') => {
                self.pos += 1;
                parts.push(SimpleSelector::Universal);
            }
            Some(c) if c.is_alphabetic() || c == '_' || c == '\\' || !c.is_ascii() => {
                parts.push(SimpleSelector::Type(self.ident().to_ascii_lowercase()));
            }
            _ => {}
        }

        while let Some(c) = self.peek() {
            if pseudo_element.is_some() && !c.is_whitespace() && !matches!(c, '>' | '+' | '~') {
                return Err("pseudo-element must be last".into());
            }
            match c {
                '#' => {
                    self.pos += 1;
                    let id = self.ident();
                    if id.is_empty() {
                        return Err("empty id".into());
                    }
                    parts.push(SimpleSelector::Id(id));
                }
                '.' => {
                    self.pos += 1;
                    let class = self.ident();
                    if class.is_empty() {
                        return Err("empty class".into());
                    }
                    parts.push(SimpleSelector::Class(class));
                }
                '[' => {
                    self.pos += 1;
                    parts.push(self.parse_attribute()?);
                }
                ':' => {
                    self.pos += 1;
                    let double = self.peek() == Some(':');
                    if double {
                        self.pos += 1;
                    }
                    let name = self.ident().to_ascii_lowercase();
                    match name.as_str() {
                        "before" => pseudo_element = Some(PseudoElement::Before),
                        "after" => pseudo_element = Some(PseudoElement::After),
                        _ if double => return Err(format!("unsupported pseudo-element ::{name}")),
                        _ => parts.push(SimpleSelector::Pseudo(self.parse_pseudo_class(&name)?)),
                    }
                }
                _ => break,
            }
        }

        Ok((Compound { parts }, pseudo_element))
    }

    fn parse_attribute(&mut self) -> Result<SimpleSelector, String> {
        self.skip_ws();
        let name = self.ident().to_ascii_lowercase();
        if name.is_empty() {
            return Err("empty attribute name".into());
        }
        self.skip_ws();

        let op = match self.peek() {
            Some(']') => {
                self.pos += 1;
                return Ok(SimpleSelector::Attribute { name, op: AttrOp::Exists, value: String::new() });
            }
            Some('=') => AttrOp::Equals,
            Some(c @ ('~' | '|' | '^' | '$' | '*')) if self.chars.get(self.pos + 1) == Some(&'=') => {
                self.pos += 1;
                match c {
                    '~' => AttrOp::Includes,
                    '|' => AttrOp::DashMatch,
                    '^' => AttrOp::Prefix,
                    '$' => AttrOp::Suffix,
                    _ => AttrOp::Substring,
                }
            }
            _ => return Err("bad attribute operator".into()),
        };
        self.pos += 1;
        self.skip_ws();

        let value = match self.peek() {
            Some(q @ ('"' | '\'')) => {
                self.pos += 1;
                let mut v = String::new();
                loop {
                    match self.peek() {
                        None => return Err("unterminated string".into()),
                        Some('\\') => {
                            self.pos += 1;
                            if let Some(esc) = self.peek() {
                                v.push(esc);
                                self.pos += 1;
                            }
                        }
                        Some(c) if c == q => {
                            self.pos += 1;
                            break;
                        }
                        Some(c) => {
                            v.push(c);
                            self.pos += 1;
                        }
                    }
                }
                v
            }
            _ => self.ident(),
        };

        self.skip_ws();
        if self.peek() != Some(']') {
            return Err("unterminated attribute selector".into());
        }
        self.pos += 1;
        Ok(SimpleSelector::Attribute { name, op, value })
    }

    fn parse_pseudo_class(&mut self, name: &str) -> Result<PseudoClass, String> {
        let simple = match name {
            "hover" => Some(PseudoClass::Hover),
            "active" => Some(PseudoClass::Active),
            "focus" => Some(PseudoClass::Focus),
            "link" => Some(PseudoClass::Link),
            "root" => Some(PseudoClass::Root),
            "empty" => Some(PseudoClass::Empty),
            "first-child" => Some(PseudoClass::FirstChild),
            "last-child" => Some(PseudoClass::LastChild),
            "only-child" => Some(PseudoClass::OnlyChild),
            "first-of-type" => Some(PseudoClass::FirstOfType),
            "last-of-type" => Some(PseudoClass::LastOfType),
            "only-of-type" => Some(PseudoClass::OnlyOfType),
            _ => None,
        };
        if let Some(pc) = simple {
            return Ok(pc);
        }

        if self.peek() != Some('(') {
            if name.is_empty() {
                return Err("empty pseudo-class".into());
            }
            return Ok(PseudoClass::Custom(name.to_string()));
        }
        self.pos += 1;
        let args = self.paren_args().ok_or("unterminated pseudo-class arguments")?;

        let nth = || Nth::parse(&args).ok_or(format!("bad argument to :{name}"));
        Ok(match name {
            "nth-child" => PseudoClass::NthChild(nth()?),
            "nth-last-child" => PseudoClass::NthLastChild(nth()?),
            "nth-of-type" => PseudoClass::NthOfType(nth()?),
            "nth-last-of-type" => PseudoClass::NthLastOfType(nth()?),
            "lang" => PseudoClass::Lang(args.trim().to_string()),
            "not" => {
                let mut inner = SelectorParser { chars: args.trim().chars().collect(), pos: 0 };
                let (compound, pe) = inner.parse_compound()?;
                if pe.is_some() || inner.peek().is_some() || compound.parts.is_empty() {
                    return Err(":not() takes a compound selector".into());
                }
                PseudoClass::Not(Box::new(compound))
            }
            _ => return Err(format!("unknown functional pseudo-class :{name}()")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_specificity() {
        assert_eq!(Selector::parse("#id").unwrap().specificity, Specificity(1, 0, 0));
        assert_eq!(Selector::parse(".a.b").unwrap().specificity, Specificity(0, 2, 0));
        assert_eq!(Selector::parse("div").unwrap().specificity, Specificity(0, 0, 1));
        assert_eq!(Selector::parse("ul li:hover > a[href]").unwrap().specificity, Specificity(0, 2, 3));
        assert_eq!(Selector::parse("p::before").unwrap().specificity, Specificity(0, 0, 2));
        assert_eq!(Selector::parse("*:not(#x)").unwrap().specificity, Specificity(1, 0, 0));
    }

    #[test]
    fn test_parse_structure() {
        let sel = Selector::parse("div > p + span ~ em a").unwrap();
        assert_eq!(sel.compounds.len(), 5);
        assert_eq!(
            sel.combinators,
            vec![Combinator::Child, Combinator::Adjacent, Combinator::General, Combinator::Descendant]
        );
        let sel = Selector::parse("a:after").unwrap();
        assert_eq!(sel.pseudo_element, Some(PseudoElement::After));
    }

    #[test]
    fn test_invalid_selectors() {
        for bad in ["", "div >", "a[", "p::first-line", "a::before span", ".", "#", ":nth-child(x)"] {
            assert!(Selector::parse(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_nth() {
        let odd = Nth::parse("odd").unwrap();
        assert!(odd.matches(1) && odd.matches(3) && !odd.matches(2));
        let first3 = Nth::parse("-n+3").unwrap();
        assert!(first3.matches(3) && !first3.matches(4));
        let third = Nth::parse("3").unwrap();
        assert!(third.matches(3) && !third.matches(6));
        let every3 = Nth::parse("3n").unwrap();
        assert!(every3.matches(6) && !every3.matches(4));
    }

    #[test]
    fn test_nth_extreme_offsets() {
        let low = Nth::parse("n-2147483648").unwrap();
        assert!(low.matches(1) && low.matches(i32::MAX));
        let high = Nth::parse("-n+2147483647").unwrap();
        assert!(high.matches(1) && high.matches(i32::MAX));
        let only = Nth::parse("-2147483648").unwrap();
        assert!(!only.matches(1));
        let wide = Nth::parse("-2147483648n+2147483647").unwrap();
        assert!(wide.matches(i32::MAX) && !wide.matches(1));
    }

    #[test]
    fn test_attribute_ops() {
        let mut elem = ElementData::new("a");
        elem.set_attr("lang", "en-US");
        elem.set_attr("rel", "nofollow external");
        assert!(match_attribute(&elem, "lang", AttrOp::DashMatch, "en"));
        assert!(match_attribute(&elem, "rel", AttrOp::Includes, "external"));
        assert!(match_attribute(&elem, "lang", AttrOp::Prefix, "en"));
        assert!(match_attribute(&elem, "lang", AttrOp::Suffix, "US"));
        assert!(match_attribute(&elem, "rel", AttrOp::Substring, "foll"));
        assert!(!match_attribute(&elem, "title", AttrOp::Exists, ""));
    }
}
