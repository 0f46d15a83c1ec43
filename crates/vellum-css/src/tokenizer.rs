//! CSS lexical helpers
//!
//! The parser works on slices of the source rather than a token stream;
//! these helpers find structure in a slice while respecting strings,
//! parentheses and brackets.

/// Remove `/* ... */` comments, leaving string contents untouched
pub fn strip_comments(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut chars = css.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            out.push(c);
            if c == '\\' {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => {
                quote = Some(c);
                out.push(c);
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for c in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
                out.push(' ');
            }
            _ => out.push(c),
        }
    }
    out
}

/// Nesting tracker shared by the scanning helpers
#[derive(Default)]
struct Depth {
    parens: i32,
    brackets: i32,
    quote: Option<char>,
    escaped: bool,
}

impl Depth {
    /// Feed one char; true when it sits at top level outside any string
    fn step(&mut self, c: char) -> bool {
        if self.escaped {
            self.escaped = false;
            return false;
        }
        if c == '\\' {
            self.escaped = true;
            return false;
        }
        if let Some(q) = self.quote {
            if c == q {
                self.quote = None;
            }
            return false;
        }
        match c {
            '"' | '\'' => {
                self.quote = Some(c);
                false
            }
            '(' => {
                self.parens += 1;
                false
            }
            ')' => {
                self.parens = (self.parens - 1).max(0);
                false
            }
            '[' => {
                self.brackets += 1;
                false
            }
            ']' => {
                self.brackets = (self.brackets - 1).max(0);
                false
            }
            _ => self.parens == 0 && self.brackets == 0,
        }
    }
}

/// Split on `sep` outside strings, parentheses and brackets
pub fn split_top_level(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = Depth::default();
    let mut start = 0;
    for (i, c) in text.char_indices() {
        if depth.step(c) && c == sep {
            parts.push(&text[start..i]);
            start = i + c.len_utf8();
        }
    }
    parts.push(&text[start..]);
    parts
}

/// Byte offset of the first top-level occurrence of any of `targets`
pub fn find_top_level(text: &str, targets: &[char]) -> Option<usize> {
    let mut depth = Depth::default();
    text.char_indices()
        .find(|&(_, c)| depth.step(c) && targets.contains(&c))
        .map(|(i, _)| i)
}

/// Given text starting just after an opening `{`, the offset of the
/// matching `}`
pub fn matching_brace(text: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut braces = 1;
    for (i, c) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, c) {
            (_, '\\') => escaped = true,
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '{') => braces += 1,
            (None, '}') => {
                braces -= 1;
                if braces == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split a property value into space-separated components. Commas and
/// slashes become components of their own; functions and strings stay whole.
pub fn components(value: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth = Depth::default();
    let mut start: Option<usize> = None;

    for (i, c) in value.char_indices() {
        let top = depth.step(c);
        if top && (c.is_whitespace() || c == ',' || c == '/') {
            if let Some(s) = start.take() {
                out.push(&value[s..i]);
            }
            if c == ',' || c == '/' {
                out.push(&value[i..i + 1]);
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        out.push(&value[s..]);
    }
    out
}

/// Strip matching quotes and resolve backslash escapes
pub fn unquote(text: &str) -> String {
    let text = text.trim();
    let inner = match text.chars().next() {
        Some(q @ ('"' | '\'')) if text.len() >= 2 && text.ends_with(q) => &text[1..text.len() - 1],
        _ => text,
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Split a numeric literal from its unit suffix: `"-1.5em"` -> `(-1.5, "em")`
pub fn split_number(text: &str) -> Option<(f32, &str)> {
    let bytes = text.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    let digits_start = end;
    let mut seen_dot = false;
    while let Some(&b) = bytes.get(end) {
        if b.is_ascii_digit() {
            end += 1;
        } else if b == b'.' && !seen_dot {
            seen_dot = true;
            end += 1;
        } else {
            break;
        }
    }
    if end == digits_start || (seen_dot && end == digits_start + 1) {
        return None;
    }
    let num = text[..end].parse::<f32>().ok()?;
    Some((num, &text[end..]))
}

/// Argument text of `name(...)`, case-insensitive on the name
pub fn function_args<'a>(text: &'a str, name: &str) -> Option<&'a str> {
    let text = text.trim();
    let head = text.get(..name.len())?;
    if !head.eq_ignore_ascii_case(name) {
        return None;
    }
    text[name.len()..].trim_start().strip_prefix('(')?.strip_suffix(')')
}
