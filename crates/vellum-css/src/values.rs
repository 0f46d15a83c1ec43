//! CSS value types
//!
//! Lengths stay symbolic until layout supplies the font metrics and the
//! containing-block size; colours resolve at parse time.

use serde::{Deserialize, Serialize};

use crate::tokenizer::{function_args, split_number};
use crate::{StyleHost, ValueError, color};

/// Length units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LengthUnit {
    /// Bare number (treated as px)
    None,
    Percent,
    In,
    Cm,
    Mm,
    Em,
    Ex,
    Pt,
    Pc,
    Px,
}

impl LengthUnit {
    fn from_suffix(suffix: &str) -> Option<Self> {
        Some(match suffix.to_ascii_lowercase().as_str() {
            "" => Self::None,
            "%" => Self::Percent,
            "in" => Self::In,
            "cm" => Self::Cm,
            "mm" => Self::Mm,
            "em" => Self::Em,
            "ex" => Self::Ex,
            "pt" => Self::Pt,
            "pc" => Self::Pc,
            "px" => Self::Px,
            _ => return None,
        })
    }
}

/// CSS length: a keyword from the property's table, or a number with a unit
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Length {
    /// Index into the keyword table the value was parsed with
    Predefined(u8),
    Value(f32, LengthUnit),
}

impl Default for Length {
    fn default() -> Self {
        Length::ZERO
    }
}

/// Inputs for turning a [`Length`] into pixels
#[derive(Debug, Clone, Copy)]
pub struct LengthContext {
    /// Font size of the element
    pub em: f32,
    /// x-height of the element's font
    pub ex: f32,
    /// Basis for percentages
    pub percent_base: f32,
    /// Pixels per point (host DPI)
    pub px_per_pt: f32,
}

impl LengthContext {
    pub fn new(em: f32, percent_base: f32) -> Self {
        Self { em, ex: em * 0.5, percent_base, px_per_pt: 96.0 / 72.0 }
    }
}

impl Length {
    pub const ZERO: Length = Length::Value(0.0, LengthUnit::Px);
    /// `auto` in every table that has it
    pub const AUTO: Length = Length::Predefined(0);

    pub fn px(v: f32) -> Self {
        Length::Value(v, LengthUnit::Px)
    }

    pub fn percent(v: f32) -> Self {
        Length::Value(v, LengthUnit::Percent)
    }

    /// Parse a length, trying `keywords` first
    pub fn parse(text: &str, keywords: &[&str]) -> Result<Length, ValueError> {
        let text = text.trim();
        if let Some(idx) = keywords.iter().position(|k| k.eq_ignore_ascii_case(text)) {
            return Ok(Length::Predefined(idx as u8));
        }
        let (num, suffix) = split_number(text).ok_or_else(|| ValueError::Length(text.to_string()))?;
        let unit = LengthUnit::from_suffix(suffix).ok_or_else(|| ValueError::Length(text.to_string()))?;
        Ok(Length::Value(num, unit))
    }

    /// Keyword index, if this is a keyword
    pub fn predefined(&self) -> Option<u8> {
        match self {
            Length::Predefined(i) => Some(*i),
            Length::Value(..) => None,
        }
    }

    pub fn is_auto(&self) -> bool {
        *self == Length::AUTO
    }

    pub fn is_percent(&self) -> bool {
        matches!(self, Length::Value(_, LengthUnit::Percent))
    }

    /// Resolve to pixels; keywords resolve to zero
    pub fn to_px(&self, ctx: &LengthContext) -> f32 {
        match *self {
            Length::Predefined(_) => 0.0,
            Length::Value(v, unit) => match unit {
                LengthUnit::None | LengthUnit::Px => v,
                LengthUnit::Percent => ctx.percent_base * v / 100.0,
                LengthUnit::Em => ctx.em * v,
                LengthUnit::Ex => ctx.ex * v,
                LengthUnit::Pt => v * ctx.px_per_pt,
                LengthUnit::Pc => v * 12.0 * ctx.px_per_pt,
                LengthUnit::In => v * 72.0 * ctx.px_per_pt,
                LengthUnit::Cm => v * 72.0 / 2.54 * ctx.px_per_pt,
                LengthUnit::Mm => v * 72.0 / 25.4 * ctx.px_per_pt,
            },
        }
    }

    /// Resolve, mapping keywords through `keyword_px`
    pub fn to_px_or(&self, ctx: &LengthContext, keyword_px: impl Fn(u8) -> f32) -> f32 {
        match self.predefined() {
            Some(i) => keyword_px(i),
            None => self.to_px(ctx),
        }
    }
}

/// RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

impl Color {
    pub const TRANSPARENT: Color = Color { r: 0, g: 0, b: 0, a: 0 };
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0, a: 255 };
    pub const WHITE: Color = Color { r: 255, g: 255, b: 255, a: 255 };

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn is_transparent(&self) -> bool {
        self.a == 0
    }

    /// Parse a hex color (#RGB, #RRGGBB, #RRGGBBAA)
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if !hex.is_ascii() {
            return None;
        }
        let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        match hex.len() {
            3 => {
                let digit = |i: usize| u8::from_str_radix(hex.get(i..i + 1)?, 16).ok().map(|d| d * 17);
                Some(Self::rgb(digit(0)?, digit(1)?, digit(2)?))
            }
            6 => Some(Self::rgb(byte(0)?, byte(2)?, byte(4)?)),
            8 => Some(Self::rgba(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
            _ => None,
        }
    }

    /// Parse a named color from the CSS table
    pub fn from_name(name: &str) -> Option<Self> {
        color::named(&name.to_ascii_lowercase())
    }

    /// Parse any color value. `current` is the value of `currentColor`.
    pub fn parse(text: &str, current: Color, host: &dyn StyleHost) -> Result<Color, ValueError> {
        let text = text.trim();
        let err = || ValueError::Color(text.to_string());
        let lower = text.to_ascii_lowercase();

        if lower == "currentcolor" {
            return Ok(current);
        }
        if lower.starts_with('#') {
            return Self::from_hex(&lower).ok_or_else(err);
        }
        if let Some(args) = function_args(&lower, "rgba").or_else(|| function_args(&lower, "rgb")) {
            return parse_rgb_args(args).ok_or_else(err);
        }
        if let Some(c) = Self::from_name(&lower) {
            return Ok(c);
        }
        if let Some(c) = host.resolve_color_name(&lower) {
            return Ok(c);
        }
        // Legacy attribute colors without '#'
        if lower.len() == 6 && lower.chars().all(|c| c.is_ascii_hexdigit()) {
            return Self::from_hex(&lower).ok_or_else(err);
        }
        Err(err())
    }
}

fn parse_rgb_args(args: &str) -> Option<Color> {
    let parts: Vec<&str> = args.split(',').map(str::trim).collect();
    if parts.len() < 3 || parts.len() > 4 {
        return None;
    }
    let channel = |s: &str| -> Option<u8> {
        match s.strip_suffix('%') {
            Some(p) => p.trim().parse::<f32>().ok().map(|v| (v.clamp(0.0, 100.0) * 2.55).round() as u8),
            None => s.parse::<f32>().ok().map(|v| v.clamp(0.0, 255.0).round() as u8),
        }
    };
    let alpha = match parts.get(3) {
        Some(a) => (a.parse::<f32>().ok()?.clamp(0.0, 1.0) * 255.0).round() as u8,
        None => 255,
    };
    Some(Color::rgba(channel(parts[0])?, channel(parts[1])?, channel(parts[2])?, alpha))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DefaultStyleHost;

    #[test]
    fn test_parse_lengths() {
        assert_eq!(Length::parse("10px", &[]), Ok(Length::px(10.0)));
        assert_eq!(Length::parse("50%", &[]), Ok(Length::percent(50.0)));
        assert_eq!(Length::parse("1.5em", &[]), Ok(Length::Value(1.5, LengthUnit::Em)));
        assert_eq!(Length::parse("-.5EM", &[]), Ok(Length::Value(-0.5, LengthUnit::Em)));
        assert_eq!(Length::parse("auto", &["auto"]), Ok(Length::AUTO));
        assert_eq!(Length::parse("thick", &["thin", "medium", "thick"]), Ok(Length::Predefined(2)));
        assert!(Length::parse("10furlongs", &[]).is_err());
        assert!(Length::parse("auto", &[]).is_err());
    }

    #[test]
    fn test_resolve_lengths() {
        let ctx = LengthContext::new(16.0, 400.0);
        assert_eq!(Length::percent(50.0).to_px(&ctx), 200.0);
        assert_eq!(Length::Value(2.0, LengthUnit::Em).to_px(&ctx), 32.0);
        assert_eq!(Length::Value(12.0, LengthUnit::Pt).to_px(&ctx), 16.0);
        assert_eq!(Length::Value(1.0, LengthUnit::In).to_px(&ctx), 96.0);
        assert_eq!(Length::AUTO.to_px(&ctx), 0.0);
    }

    #[test]
    fn test_parse_colors() {
        let host = DefaultStyleHost;
        let cur = Color::rgb(1, 2, 3);
        assert_eq!(Color::parse("#f00", cur, &host), Ok(Color::rgb(255, 0, 0)));
        assert_eq!(Color::parse("#00ff00", cur, &host), Ok(Color::rgb(0, 255, 0)));
        assert_eq!(Color::parse("rgb(0, 0, 255)", cur, &host), Ok(Color::rgb(0, 0, 255)));
        assert_eq!(Color::parse("rgba(0,0,0,0.5)", cur, &host), Ok(Color::rgba(0, 0, 0, 128)));
        assert_eq!(Color::parse("rgb(100%, 0%, 0%)", cur, &host), Ok(Color::rgb(255, 0, 0)));
        assert_eq!(Color::parse("RebeccaPurple", cur, &host), Ok(Color::rgb(102, 51, 153)));
        assert_eq!(Color::parse("currentColor", cur, &host), Ok(cur));
        assert_eq!(Color::parse("transparent", cur, &host), Ok(Color::TRANSPARENT));
        assert!(Color::parse("nocolor", cur, &host).is_err());
    }
}
