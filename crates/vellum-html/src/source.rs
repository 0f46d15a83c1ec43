//! Character sources
//!
//! The scanner pulls one code point at a time, so it can run over native
//! strings and over raw UTF-8 byte buffers alike.

/// Anything that yields code points until exhausted
pub trait CharSource {
    /// Next code point, `None` at end of input
    fn next_char(&mut self) -> Option<char>;
}

/// Source over a native string
pub struct StrSource<'a> {
    chars: std::str::Chars<'a>,
}

impl<'a> StrSource<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { chars: text.chars() }
    }
}

impl CharSource for StrSource<'_> {
    #[inline]
    fn next_char(&mut self) -> Option<char> {
        self.chars.next()
    }
}

/// Source over UTF-8 bytes; each invalid sequence decodes to U+FFFD
pub struct Utf8Source<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Utf8Source<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        // Skip a byte order mark
        let pos = if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) { 3 } else { 0 };
        Self { bytes, pos }
    }

    fn continuation(&self, offset: usize) -> Option<u32> {
        let b = *self.bytes.get(self.pos + offset)?;
        (b & 0xC0 == 0x80).then_some(u32::from(b & 0x3F))
    }
}

impl CharSource for Utf8Source<'_> {
    fn next_char(&mut self) -> Option<char> {
        let lead = *self.bytes.get(self.pos)?;

        let (len, init) = match lead {
            0x00..=0x7F => {
                self.pos += 1;
                return Some(char::from(lead));
            }
            0xC2..=0xDF => (2, u32::from(lead & 0x1F)),
            0xE0..=0xEF => (3, u32::from(lead & 0x0F)),
            0xF0..=0xF4 => (4, u32::from(lead & 0x07)),
            _ => {
                self.pos += 1;
                return Some(char::REPLACEMENT_CHARACTER);
            }
        };

        let mut code = init;
        for i in 1..len {
            match self.continuation(i) {
                Some(bits) => code = (code << 6) | bits,
                None => {
                    // Consume the valid prefix only
                    self.pos += i;
                    return Some(char::REPLACEMENT_CHARACTER);
                }
            }
        }
        self.pos += len;

        // Overlong forms and surrogates fail here
        let min = match len {
            2 => 0x80,
            3 => 0x800,
            _ => 0x10000,
        };
        if code < min {
            return Some(char::REPLACEMENT_CHARACTER);
        }
        Some(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(mut src: impl CharSource) -> String {
        let mut out = String::new();
        while let Some(c) = src.next_char() {
            out.push(c);
        }
        out
    }

    #[test]
    fn test_str_source() {
        assert_eq!(drain(StrSource::new("héllo")), "héllo");
    }

    #[test]
    fn test_utf8_multibyte() {
        let text = "a€𝄞é";
        assert_eq!(drain(Utf8Source::new(text.as_bytes())), text);
    }

    #[test]
    fn test_utf8_invalid_sequences() {
        let bytes = [b'a', 0xFF, b'b', 0xE2, 0x82, b'c'];
        assert_eq!(drain(Utf8Source::new(&bytes)), "a\u{FFFD}b\u{FFFD}c");
    }

    #[test]
    fn test_utf8_skips_bom() {
        assert_eq!(drain(Utf8Source::new(b"\xEF\xBB\xBFok")), "ok");
    }
}
