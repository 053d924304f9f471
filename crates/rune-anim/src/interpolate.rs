//! Interpolation for animated values.
//!
//! Numbers interpolate linearly. Text values are split into a template of
//! literal fragments and numeric slots; two templates interpolate slot by
//! slot and the literals of the `from` side are spliced back in. A `#rgb`,
//! `#rgba`, `#rrggbb` or `#rrggbbaa` literal is expanded into `rgb(...)` /
//! `rgba(...)` slots first, so colors blend channel-wise.

use crate::error::{AnimationError, Result};
use crate::types::{AnimatedValue, InterpolationKind};

/// Decimal places kept on numbers written back into text templates.
pub const DEFAULT_PRECISION: u32 = 4;

/// Trait for types that can be interpolated between two values.
///
/// When t = 0.0, returns self. When t = 1.0, returns `to`. Values outside
/// that range extrapolate.
pub trait Interpolate: Sized {
    fn interpolate(&self, to: &Self, t: f64) -> Self;
}

/// Linear interpolation helper.
#[inline]
pub fn lerp(from: f64, to: f64, t: f64) -> f64 {
    from + (to - from) * t
}

impl Interpolate for f64 {
    fn interpolate(&self, to: &Self, t: f64) -> Self {
        lerp(*self, *to, t)
    }
}

/// One piece of a tokenized text value.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Literal(String),
    Number(f64),
}

/// A text value split into alternating literal fragments and numeric slots.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    tokens: Vec<Token>,
}

impl Template {
    /// Tokenize a text value.
    ///
    /// Fails only on a `#` followed by a run of hex digits whose length is
    /// not 3, 4, 6 or 8.
    pub fn parse(input: &str) -> Result<Self> {
        let mut builder = TemplateBuilder::default();
        let chars: Vec<char> = input.chars().collect();
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];

            if c == '#' {
                let hex_len = chars[i + 1..]
                    .iter()
                    .take_while(|c| c.is_ascii_hexdigit())
                    .count();
                if hex_len > 0 {
                    let hex: String = chars[i + 1..i + 1 + hex_len].iter().collect();
                    builder.push_color(&hex)?;
                    i += 1 + hex_len;
                    continue;
                }
            }

            if let Some(len) = number_len(&chars[i..]) {
                let text: String = chars[i..i + len].iter().collect();
                match text.parse::<f64>() {
                    Ok(value) => builder.push_number(value),
                    Err(_) => builder.push_literal(&text),
                }
                i += len;
                continue;
            }

            builder.push_char(c);
            i += 1;
        }

        Ok(builder.finish())
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// The numeric slots in order.
    pub fn numbers(&self) -> impl Iterator<Item = f64> + '_ {
        self.tokens.iter().filter_map(|token| match token {
            Token::Number(value) => Some(*value),
            Token::Literal(_) => None,
        })
    }

    /// Interpolate slot-wise towards `to`.
    ///
    /// Slots are matched by index; both templates are expected to have the
    /// same shape. Literals are taken from `self`.
    pub fn interpolate(&self, to: &Self, t: f64, precision: u32) -> String {
        let mut targets = to.numbers();
        let mut out = String::new();
        for token in &self.tokens {
            match token {
                Token::Literal(text) => out.push_str(text),
                Token::Number(from) => {
                    let target = targets.next().unwrap_or(*from);
                    out.push_str(&format_number(lerp(*from, target, t), precision));
                }
            }
        }
        out
    }

    /// Render the template back to text.
    pub fn render(&self, precision: u32) -> String {
        self.interpolate(self, 0.0, precision)
    }
}

#[derive(Default)]
struct TemplateBuilder {
    tokens: Vec<Token>,
}

impl TemplateBuilder {
    fn push_char(&mut self, c: char) {
        if let Some(Token::Literal(text)) = self.tokens.last_mut() {
            text.push(c);
        } else {
            self.tokens.push(Token::Literal(c.to_string()));
        }
    }

    fn push_literal(&mut self, s: &str) {
        for c in s.chars() {
            self.push_char(c);
        }
    }

    fn push_number(&mut self, value: f64) {
        self.tokens.push(Token::Number(value));
    }

    fn push_color(&mut self, hex: &str) -> Result<()> {
        let channels = expand_hex_color(hex)?;
        let alpha = channels.len() == 4;
        self.push_literal(if alpha { "rgba(" } else { "rgb(" });
        for (index, channel) in channels.iter().enumerate() {
            if index > 0 {
                self.push_literal(", ");
            }
            if index == 3 {
                self.push_number(f64::from(*channel) / 255.0);
            } else {
                self.push_number(f64::from(*channel));
            }
        }
        self.push_literal(")");
        Ok(())
    }

    fn finish(self) -> Template {
        Template {
            tokens: self.tokens,
        }
    }
}

/// Expand a hex color body (without `#`) into 3 or 4 channel bytes.
fn expand_hex_color(hex: &str) -> Result<Vec<u8>> {
    let digits: Vec<u8> = hex
        .chars()
        .map(|c| c.to_digit(16).map(|d| d as u8))
        .collect::<Option<_>>()
        .ok_or_else(|| AnimationError::InvalidColor(format!("#{hex}")))?;

    match digits.len() {
        3 | 4 => Ok(digits.iter().map(|d| d * 16 + d).collect()),
        6 | 8 => Ok(digits.chunks(2).map(|pair| pair[0] * 16 + pair[1]).collect()),
        _ => Err(AnimationError::InvalidColor(format!("#{hex}"))),
    }
}

/// Length of the number starting at `chars[0]`, if one starts there.
///
/// Accepts an optional sign, digits and at most one decimal point; a bare
/// sign or point is not a number.
fn number_len(chars: &[char]) -> Option<usize> {
    let mut i = 0;
    if matches!(chars.first(), Some('-') | Some('+')) {
        i += 1;
    }
    let mut digits = 0;
    let mut seen_point = false;
    while let Some(&c) = chars.get(i) {
        if c.is_ascii_digit() {
            digits += 1;
        } else if c == '.' && !seen_point && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit()) {
            seen_point = true;
        } else {
            break;
        }
        i += 1;
    }
    (digits > 0).then_some(i)
}

/// Round to `precision` decimals and print without trailing noise.
pub fn format_number(value: f64, precision: u32) -> String {
    let scale = 10f64.powi(precision as i32);
    let rounded = (value * scale).round() / scale;
    // Avoid printing "-0".
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{rounded}")
}

/// Interpolate two animated values with the given kind.
///
/// Mixed number/text pairs are interpolated as templates, the number being
/// treated as a one-slot template.
pub fn interpolate_values(
    from: &AnimatedValue,
    to: &AnimatedValue,
    t: f64,
    kind: InterpolationKind,
    precision: u32,
) -> Result<AnimatedValue> {
    match kind {
        InterpolationKind::Discrete => Ok(if t < 0.5 { from.clone() } else { to.clone() }),
        InterpolationKind::Numeric => match (from, to) {
            (AnimatedValue::Number(a), AnimatedValue::Number(b)) => {
                Ok(AnimatedValue::Number(a.interpolate(b, t)))
            }
            _ => interpolate_values(from, to, t, InterpolationKind::Template, precision),
        },
        InterpolationKind::Template => {
            let from = template_of(from)?;
            let to = template_of(to)?;
            Ok(AnimatedValue::Text(from.interpolate(&to, t, precision)))
        }
    }
}

fn template_of(value: &AnimatedValue) -> Result<Template> {
    match value {
        AnimatedValue::Number(n) => Ok(Template {
            tokens: vec![Token::Number(*n)],
        }),
        AnimatedValue::Text(text) => Template::parse(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 0.0001;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn test_f64_interpolation() {
        let from = 0.0_f64;
        let to = 100.0_f64;

        assert!(approx_eq(from.interpolate(&to, 0.0), 0.0));
        assert!(approx_eq(from.interpolate(&to, 0.25), 25.0));
        assert!(approx_eq(from.interpolate(&to, 1.0), 100.0));
    }

    #[test]
    fn test_extrapolation() {
        assert!(approx_eq(0.0_f64.interpolate(&100.0, 1.5), 150.0));
        assert!(approx_eq(0.0_f64.interpolate(&100.0, -0.5), -50.0));
    }

    #[test]
    fn test_tokenize_units_and_signs() {
        let template = Template::parse("translate(-10px, +2.5em)").unwrap();
        assert_eq!(
            template.tokens(),
            &[
                Token::Literal("translate(".into()),
                Token::Number(-10.0),
                Token::Literal("px, ".into()),
                Token::Number(2.5),
                Token::Literal("em)".into()),
            ]
        );
    }

    #[test]
    fn test_tokenize_without_separating_space() {
        let template = Template::parse("a1b22").unwrap();
        assert_eq!(template.numbers().collect::<Vec<_>>(), vec![1.0, 22.0]);
    }

    #[test]
    fn test_bare_point_and_sign_stay_literal() {
        let template = Template::parse("- . x").unwrap();
        assert_eq!(template.tokens(), &[Token::Literal("- . x".into())]);
    }

    #[test]
    fn test_hex_color_expansion() {
        let short = Template::parse("#f00").unwrap();
        assert_eq!(short.render(4), "rgb(255, 0, 0)");

        let long = Template::parse("#00ff0080").unwrap();
        assert_eq!(long.render(4), "rgba(0, 255, 0, 0.502)");

        let with_alpha = Template::parse("solid #000f").unwrap();
        assert_eq!(with_alpha.render(4), "solid rgba(0, 0, 0, 1)");
    }

    #[test]
    fn test_bad_hex_color_is_rejected() {
        assert_eq!(
            Template::parse("#12345"),
            Err(AnimationError::InvalidColor("#12345".into()))
        );
        // A '#' with no hex digits is plain text.
        assert!(Template::parse("#xyz").is_ok());
    }

    #[test]
    fn test_template_interpolation() {
        let from = Template::parse("10px 20px").unwrap();
        let to = Template::parse("20px 40px").unwrap();
        assert_eq!(from.interpolate(&to, 0.5, 4), "15px 30px");
    }

    #[test]
    fn test_color_interpolation() {
        let from = Template::parse("#000").unwrap();
        let to = Template::parse("#fff").unwrap();
        assert_eq!(from.interpolate(&to, 0.5, 4), "rgb(127.5, 127.5, 127.5)");
    }

    #[test]
    fn test_precision_hides_float_noise() {
        let from = Template::parse("0.1").unwrap();
        let to = Template::parse("0.3").unwrap();
        assert_eq!(from.interpolate(&to, 0.5, 4), "0.2");
        assert_eq!(format_number(-0.00001, 4), "0");
        assert_eq!(format_number(1.0 / 3.0, 2), "0.33");
    }

    #[test]
    fn test_interpolate_values_kinds() {
        let a = AnimatedValue::Number(0.0);
        let b = AnimatedValue::Number(10.0);
        assert_eq!(
            interpolate_values(&a, &b, 0.25, InterpolationKind::Numeric, 4).unwrap(),
            AnimatedValue::Number(2.5)
        );

        let on = AnimatedValue::from("on");
        let off = AnimatedValue::from("off");
        assert_eq!(
            interpolate_values(&on, &off, 0.49, InterpolationKind::Discrete, 4).unwrap(),
            on
        );
        assert_eq!(
            interpolate_values(&on, &off, 0.5, InterpolationKind::Discrete, 4).unwrap(),
            off
        );

        let px = AnimatedValue::from("4px");
        assert_eq!(
            interpolate_values(&a, &px, 0.5, InterpolationKind::Template, 4).unwrap(),
            AnimatedValue::from("2")
        );
    }
}
