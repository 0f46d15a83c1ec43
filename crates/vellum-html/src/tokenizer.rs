//! Markup scanner
//!
//! A pull state machine: every call to [`Tokenizer::next_token`] advances the
//! source just far enough to produce one token. Tag and attribute names come
//! out lowercased, and character references are resolved in text and
//! attribute values.

use std::collections::VecDeque;

use crate::entities;
use crate::source::CharSource;
use crate::ParseError;

/// Markup token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    TagStart(String),
    TagEnd(String),
    Attribute(String, String),
    /// Run of non-whitespace text
    Text(String),
    /// Run of whitespace
    Whitespace(String),
    Comment(String),
    CData(String),
    Doctype(String),
    EntityDecl(String),
    ProcessingInstruction(String),
    End,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum State {
    Body,
    /// Inside a start tag, scanning attributes
    TagHead(String),
    /// Content of script/style up to the matching end tag
    RawText(String),
    Done,
}

/// Longest reference body we try to resolve
const MAX_REFERENCE_LEN: usize = 32;

/// Pull-based markup scanner
pub struct Tokenizer<S: CharSource> {
    source: S,
    lookahead: VecDeque<char>,
    state: State,
    line: u32,
    errors: Vec<ParseError>,
}

impl<S: CharSource> Tokenizer<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            lookahead: VecDeque::new(),
            state: State::Body,
            line: 1,
            errors: Vec::new(),
        }
    }

    /// Current source line (1-based)
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Take the lexical diagnostics gathered so far
    pub fn take_errors(&mut self) -> Vec<ParseError> {
        std::mem::take(&mut self.errors)
    }

    fn peek_at(&mut self, n: usize) -> Option<char> {
        while self.lookahead.len() <= n {
            let c = self.source.next_char()?;
            self.lookahead.push_back(c);
        }
        self.lookahead.get(n).copied()
    }

    #[inline]
    fn peek(&mut self) -> Option<char> {
        self.peek_at(0)
    }

    fn bump(&mut self) -> Option<char> {
        let c = match self.lookahead.pop_front() {
            Some(c) => Some(c),
            None => self.source.next_char(),
        };
        if c == Some('\n') {
            self.line += 1;
        }
        c
    }

    /// Does the input continue with `lexeme` (ASCII case-insensitive)?
    fn at(&mut self, lexeme: &str) -> bool {
        lexeme
            .chars()
            .enumerate()
            .all(|(i, want)| self.peek_at(i).is_some_and(|c| c.eq_ignore_ascii_case(&want)))
    }

    fn skip(&mut self, n: usize) {
        for _ in 0..n {
            self.bump();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_whitespace()) {
            self.bump();
        }
    }

    /// Consume up to and including `terminator`; the flag is false when input
    /// ends first
    fn read_until(&mut self, terminator: &str) -> (String, bool) {
        let mut out = String::new();
        loop {
            if self.at(terminator) {
                self.skip(terminator.chars().count());
                return (out, true);
            }
            match self.bump() {
                Some(c) => out.push(c),
                None => return (out, false),
            }
        }
    }

    /// Scan the next token
    pub fn next_token(&mut self) -> Token {
        match std::mem::replace(&mut self.state, State::Body) {
            State::Done => {
                self.state = State::Done;
                Token::End
            }
            State::TagHead(tag) => self.scan_tag_head(tag),
            State::RawText(tag) => self.scan_raw_text(tag),
            State::Body => self.scan_body(),
        }
    }

    fn scan_body(&mut self) -> Token {
        let Some(c) = self.peek() else {
            self.state = State::Done;
            return Token::End;
        };

        if c == '<' {
            if let Some(token) = self.scan_markup() {
                return token;
            }
            // Stray '<' becomes the start of a word
            self.bump();
            let mut word = String::from('<');
            self.read_word_into(&mut word);
            return Token::Text(word);
        }

        if c.is_ascii_whitespace() {
            let mut run = String::new();
            while let Some(c) = self.peek().filter(char::is_ascii_whitespace) {
                run.push(c);
                self.bump();
            }
            return Token::Whitespace(run);
        }

        let mut word = String::new();
        self.read_word_into(&mut word);
        Token::Text(word)
    }

    fn read_word_into(&mut self, word: &mut String) {
        while let Some(c) = self.peek() {
            if c == '<' || c.is_ascii_whitespace() {
                break;
            }
            self.bump();
            if c == '&' {
                self.read_reference_into(word);
            } else {
                word.push(c);
            }
        }
    }

    /// Called after '&'; unresolvable references stay literal
    fn read_reference_into(&mut self, out: &mut String) {
        let mut body = String::new();
        let mut i = 0;
        loop {
            match self.peek_at(i) {
                Some(';') if !body.is_empty() => break,
                Some(c) if (c.is_ascii_alphanumeric() || (c == '#' && i == 0)) && i < MAX_REFERENCE_LEN => {
                    body.push(c);
                    i += 1;
                }
                _ => {
                    out.push('&');
                    return;
                }
            }
        }

        match entities::resolve(&body) {
            Some(ch) => {
                self.skip(i + 1);
                out.push(ch);
            }
            None => {
                // Unknown name: pass `&name;` through
                self.skip(i + 1);
                out.push('&');
                out.push_str(&body);
                out.push(';');
            }
        }
    }

    /// Scan a construct starting at '<'; `None` if it is not markup
    fn scan_markup(&mut self) -> Option<Token> {
        if self.at("<!--") {
            self.skip(4);
            let (text, closed) = self.read_until("-->");
            if !closed {
                self.unterminated("comment");
            }
            return Some(Token::Comment(text));
        }
        if self.at("<![CDATA[") {
            self.skip(9);
            let (text, closed) = self.read_until("]]>");
            if !closed {
                self.unterminated("CDATA section");
            }
            return Some(Token::CData(text));
        }
        if self.at("<!DOCTYPE") {
            self.skip(9);
            let (text, _) = self.read_until(">");
            return Some(Token::Doctype(text.trim().to_string()));
        }
        if self.at("<!ENTITY") {
            self.skip(8);
            let (text, _) = self.read_until(">");
            return Some(Token::EntityDecl(text.trim().to_string()));
        }
        if self.at("<?") {
            self.skip(2);
            let (text, closed) = self.read_until("?>");
            if !closed {
                self.unterminated("processing instruction");
            }
            return Some(Token::ProcessingInstruction(text));
        }
        if self.at("<!") {
            // Bogus declaration, treated as a comment
            self.skip(2);
            let (text, _) = self.read_until(">");
            return Some(Token::Comment(text));
        }

        if self.peek_at(1) == Some('/') && self.peek_at(2).is_some_and(|c| c.is_ascii_alphabetic()) {
            self.skip(2);
            let name = self.read_name();
            let _ = self.read_until(">");
            return Some(Token::TagEnd(name));
        }

        if self.peek_at(1).is_some_and(|c| c.is_ascii_alphabetic()) {
            self.skip(1);
            let name = self.read_name();
            self.state = State::TagHead(name.clone());
            return Some(Token::TagStart(name));
        }

        None
    }

    fn read_name(&mut self) -> String {
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_whitespace() || matches!(c, '>' | '/' | '=') {
                break;
            }
            name.push(c.to_ascii_lowercase());
            self.bump();
        }
        name
    }

    fn scan_tag_head(&mut self, tag: String) -> Token {
        self.skip_whitespace();

        match self.peek() {
            None => {
                self.unterminated("tag");
                self.state = State::Done;
                Token::End
            }
            Some('>') => {
                self.bump();
                if is_raw_text_tag(&tag) {
                    self.state = State::RawText(tag);
                }
                self.next_token()
            }
            Some('/') if self.peek_at(1) == Some('>') => {
                self.skip(2);
                Token::TagEnd(tag)
            }
            Some('/') => {
                self.bump();
                self.state = State::TagHead(tag);
                self.next_token()
            }
            Some(_) => {
                let name = self.read_name();
                if name.is_empty() {
                    // Lone '=': drop it
                    self.bump();
                    self.state = State::TagHead(tag);
                    return self.next_token();
                }
                self.skip_whitespace();
                let value = if self.peek() == Some('=') {
                    self.bump();
                    self.skip_whitespace();
                    self.read_attribute_value()
                } else {
                    String::new()
                };
                self.state = State::TagHead(tag);
                Token::Attribute(name, value)
            }
        }
    }

    fn read_attribute_value(&mut self) -> String {
        let mut value = String::new();
        match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.bump();
                while let Some(c) = self.bump() {
                    if c == quote {
                        break;
                    }
                    if c == '&' {
                        self.read_reference_into(&mut value);
                    } else {
                        value.push(c);
                    }
                }
            }
            _ => {
                while let Some(c) = self.peek() {
                    if c.is_ascii_whitespace() || c == '>' {
                        break;
                    }
                    if c == '/' && self.peek_at(1) == Some('>') {
                        break;
                    }
                    self.bump();
                    if c == '&' {
                        self.read_reference_into(&mut value);
                    } else {
                        value.push(c);
                    }
                }
            }
        }
        value
    }

    fn scan_raw_text(&mut self, tag: String) -> Token {
        let close = format!("</{tag}");
        let mut text = String::new();
        loop {
            if self.at(&close) {
                if !text.is_empty() {
                    // Emit the body first, the end tag on the next call
                    self.state = State::RawText(tag);
                    return Token::Text(text);
                }
                self.skip(close.chars().count());
                let _ = self.read_until(">");
                return Token::TagEnd(tag);
            }
            match self.bump() {
                Some(c) => text.push(c),
                None => {
                    self.unterminated("raw text");
                    self.state = State::Done;
                    return if text.is_empty() { Token::End } else { Token::Text(text) };
                }
            }
        }
    }

    fn unterminated(&mut self, construct: &'static str) {
        tracing::warn!(construct, line = self.line, "unterminated markup at end of input");
        self.errors.push(ParseError::Unterminated { construct, line: self.line });
    }
}

fn is_raw_text_tag(tag: &str) -> bool {
    matches!(tag, "script" | "style")
}

impl<S: CharSource> Iterator for Tokenizer<S> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        match self.next_token() {
            Token::End => None,
            token => Some(token),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::StrSource;

    fn tokens(input: &str) -> Vec<Token> {
        Tokenizer::new(StrSource::new(input)).collect()
    }

    fn text(s: &str) -> Token {
        Token::Text(s.into())
    }

    #[test]
    fn test_simple_element() {
        assert_eq!(
            tokens(r#"<tag attr="v">text</tag>"#),
            vec![
                Token::TagStart("tag".into()),
                Token::Attribute("attr".into(), "v".into()),
                text("text"),
                Token::TagEnd("tag".into()),
            ]
        );
    }

    #[test]
    fn test_words_and_spaces_are_separate() {
        assert_eq!(
            tokens("a  b\n"),
            vec![text("a"), Token::Whitespace("  ".into()), text("b"), Token::Whitespace("\n".into())]
        );
    }

    #[test]
    fn test_attribute_forms() {
        assert_eq!(
            tokens("<IMG SRC=a.png alt='x &amp; y' hidden>"),
            vec![
                Token::TagStart("img".into()),
                Token::Attribute("src".into(), "a.png".into()),
                Token::Attribute("alt".into(), "x & y".into()),
                Token::Attribute("hidden".into(), String::new()),
            ]
        );
    }

    #[test]
    fn test_self_closing_emits_end() {
        assert_eq!(
            tokens("<br/>"),
            vec![Token::TagStart("br".into()), Token::TagEnd("br".into())]
        );
    }

    #[test]
    fn test_entities_in_text() {
        assert_eq!(tokens("&lt;b&gt;"), vec![text("<b>")]);
        assert_eq!(tokens("&#65;&#x42;"), vec![text("AB")]);
        assert_eq!(tokens("&bogus;"), vec![text("&bogus;")]);
        assert_eq!(tokens("AT&T"), vec![text("AT&T")]);
        assert_eq!(tokens("a&nbsp;b"), vec![text("a\u{A0}b")]);
    }

    #[test]
    fn test_declarations() {
        assert_eq!(
            tokens("<!DOCTYPE html><!-- c --><![CDATA[x<y]]><?xml v?>"),
            vec![
                Token::Doctype("html".into()),
                Token::Comment(" c ".into()),
                Token::CData("x<y".into()),
                Token::ProcessingInstruction("xml v".into()),
            ]
        );
        assert_eq!(
            tokens("<!ENTITY foo \"bar\">"),
            vec![Token::EntityDecl("foo \"bar\"".into())]
        );
    }

    #[test]
    fn test_raw_text_content() {
        assert_eq!(
            tokens("<script>if (a < b) x();</script>"),
            vec![
                Token::TagStart("script".into()),
                text("if (a < b) x();"),
                Token::TagEnd("script".into()),
            ]
        );
    }

    #[test]
    fn test_stray_less_than_is_text() {
        assert_eq!(
            tokens("1 < 2"),
            vec![
                text("1"),
                Token::Whitespace(" ".into()),
                text("<"),
                Token::Whitespace(" ".into()),
                text("2"),
            ]
        );
    }

    #[test]
    fn test_unterminated_comment() {
        let mut tok = Tokenizer::new(StrSource::new("<!-- text with no closing"));
        assert_eq!(tok.next_token(), Token::Comment(" text with no closing".into()));
        assert_eq!(tok.next_token(), Token::End);
        assert_eq!(tok.next_token(), Token::End);
        assert_eq!(tok.take_errors().len(), 1);
    }
}
