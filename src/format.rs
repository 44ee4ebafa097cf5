//! Composite formatting of substituted values.
//!
//! A placeholder such as `{{amount,8:F2}}` carries an alignment and a format
//! string, mirroring the composite item `{0,8:F2}`. Numbers understand the
//! standard specifiers (`C`, `D`, `E`, `F`, `G`, `N`, `P`, `R`, `X`) and custom
//! digit patterns (`#,##0.00`); other values ignore the format string.

use std::fmt;
use serde::Deserialize;
use crate::error::FormatError;
use crate::Value;


/// Exclusive upper bound of alignment widths and format precisions.
pub(crate) const MAX_WIDTH: usize = 1_000_000;


/// Symbols used when formatting numbers. Defaults to the invariant culture.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NumberFormat {
    pub decimal_separator: String,
    pub group_separator: String,
    pub negative_sign: String,
    pub currency_symbol: String,
    pub percent_symbol: String,
}

impl Default for NumberFormat {
    fn default() -> Self {
        NumberFormat {
            decimal_separator: ".".to_owned(),
            group_separator: ",".to_owned(),
            negative_sign: "-".to_owned(),
            currency_symbol: "¤".to_owned(),
            percent_symbol: "%".to_owned(),
        }
    }
}


/// Alignment and format string of a substitution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatSpec {
    /// Field width; positive right-aligns, negative left-aligns.
    pub alignment: Option<i32>,
    pub format: Option<String>,
}

impl FormatSpec {
    pub fn new(alignment: Option<i32>, format: Option<String>) -> Self {
        FormatSpec { alignment, format }
    }

    pub fn format(&self, value: &Value, numbers: &NumberFormat) -> Result<String, FormatError> {
        if let Some(alignment) = self.alignment {
            if alignment.unsigned_abs() as usize >= MAX_WIDTH {
                return Err(FormatError::AlignmentOutOfRange(alignment));
            }
        }
        let format = self.format.as_deref().filter(|f| !f.is_empty());
        let text = format_value(value, format, numbers)?;
        Ok(align(text, self.alignment))
    }
}

impl fmt::Display for FormatSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{0")?;
        if let Some(alignment) = self.alignment {
            write!(f, ",{}", alignment)?;
        }
        if let Some(format) = &self.format {
            write!(f, ":{}", format)?;
        }
        write!(f, "}}")
    }
}

fn align(text: String, alignment: Option<i32>) -> String {
    let Some(alignment) = alignment else {
        return text;
    };
    let width = alignment.unsigned_abs() as usize;
    let len = text.chars().count();
    if len >= width {
        return text;
    }
    let padding = " ".repeat(width - len);
    if alignment > 0 {
        padding + &text
    } else {
        text + &padding
    }
}

fn format_value(value: &Value, format: Option<&str>, numbers: &NumberFormat) -> Result<String, FormatError> {
    match value {
        Value::Null => Ok(String::new()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Char(c) => Ok(c.to_string()),
        Value::Text(text) => Ok(text.clone()),
        Value::Int(i) => format_number(Number::Int(*i), format, numbers),
        Value::Float(f) => format_number(Number::Float(*f), format, numbers),
        Value::Sequence(_) | Value::Mapping(_) => Ok(value.to_json().to_string()),
        Value::Object(object) => Ok(object.type_name().to_owned()),
    }
}


#[derive(Clone, Copy, Debug)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }

    fn is_negative(self) -> bool {
        match self {
            Number::Int(i) => i < 0,
            Number::Float(f) => f < 0.0,
        }
    }

    fn kind(self) -> &'static str {
        match self {
            Number::Int(_) => "an integer",
            Number::Float(_) => "a floating point number",
        }
    }
}

fn format_number(n: Number, format: Option<&str>, numbers: &NumberFormat) -> Result<String, FormatError> {
    if let Number::Float(f) = n {
        if f.is_nan() {
            return Ok("NaN".to_owned());
        }
        if f.is_infinite() {
            let sign = if f < 0.0 { numbers.negative_sign.as_str() } else { "" };
            return Ok(format!("{}Infinity", sign));
        }
    }
    let Some(format) = format else {
        return Ok(general(n, None, 'E', numbers));
    };
    match standard_specifier(format) {
        Some((_, Some(precision))) if precision >= MAX_WIDTH =>
            Err(FormatError::PrecisionOutOfRange(format.to_owned())),
        Some((specifier, precision)) => standard(n, specifier, precision, format, numbers),
        None => Ok(custom(n, format, numbers)),
    }
}

// a letter optionally followed by up to nine digits
fn standard_specifier(format: &str) -> Option<(char, Option<usize>)> {
    let mut chars = format.chars();
    let letter = chars.next().filter(char::is_ascii_alphabetic)?;
    let rest = chars.as_str();
    if rest.is_empty() {
        Some((letter, None))
    } else if rest.len() <= 9 && rest.chars().all(|c| c.is_ascii_digit()) {
        rest.parse().ok().map(|precision| (letter, Some(precision)))
    } else {
        None
    }
}

fn standard(
    n: Number, specifier: char, precision: Option<usize>, format: &str, numbers: &NumberFormat
) -> Result<String, FormatError> {
    let upper = specifier.is_ascii_uppercase();
    let unsupported = || FormatError::Unsupported {
        specifier: format.to_owned(),
        kind: n.kind(),
    };
    match specifier.to_ascii_uppercase() {
        'C' => Ok(currency(n, precision.unwrap_or(2), numbers)),
        'D' => match n {
            Number::Int(i) => Ok(decimal(i, precision.unwrap_or(0), numbers)),
            Number::Float(_) => Err(unsupported()),
        },
        'E' => Ok(exponential(n.as_f64(), precision.unwrap_or(6), upper, numbers)),
        'F' => Ok(fixed(n, precision.unwrap_or(2), false, numbers)),
        'G' => Ok(general(n, precision, if upper { 'E' } else { 'e' }, numbers)),
        'N' => Ok(fixed(n, precision.unwrap_or(2), true, numbers)),
        'P' => Ok(percent(n, precision.unwrap_or(2), numbers)),
        'R' => Ok(general(n, None, 'E', numbers)),
        'X' => match n {
            Number::Int(i) => Ok(hexadecimal(i, precision.unwrap_or(0), upper)),
            Number::Float(_) => Err(unsupported()),
        },
        _ => Err(FormatError::InvalidSpecifier(format.to_owned())),
    }
}


/// Digits of a number rounded to `precision` decimals.
struct Digits {
    negative: bool,
    integer: String,
    fraction: String,
}

impl Digits {
    fn fixed(n: Number, precision: usize) -> Self {
        match n {
            Number::Int(i) => Digits {
                negative: i < 0,
                integer: i.unsigned_abs().to_string(),
                fraction: "0".repeat(precision),
            },
            Number::Float(f) => {
                let rounded = round_fixed(f.abs(), precision);
                let (integer, fraction) = rounded.split_once('.').unwrap_or((&rounded, ""));
                Digits {
                    negative: f.is_sign_negative(),
                    integer: integer.to_owned(),
                    fraction: fraction.to_owned(),
                }
            }
        }
    }

    fn is_zero(&self) -> bool {
        self.integer.chars().chain(self.fraction.chars()).all(|c| c == '0')
    }

    fn compose(&self, grouping: bool, numbers: &NumberFormat) -> String {
        let mut out = String::new();
        if grouping {
            out.push_str(&group(&self.integer, &numbers.group_separator));
        } else {
            out.push_str(&self.integer);
        }
        if !self.fraction.is_empty() {
            out.push_str(&numbers.decimal_separator);
            out.push_str(&self.fraction);
        }
        out
    }
}

/// Round half away from zero, like decimal rounding of the exact value.
fn round_fixed(value: f64, precision: usize) -> String {
    // a tie at this precision is exactly an odd multiple of 2^-(precision + 1)
    let scaled = value * 2f64.powi(precision as i32 + 1);
    let is_tie = scaled.is_finite() && scaled.fract() == 0.0 && scaled % 2.0 == 1.0;
    if is_tie {
        let mut exact = format!("{:.*}", precision + 1, value);
        exact.pop();
        if exact.ends_with('.') {
            exact.pop();
        }
        increment_last_digit(&exact)
    } else {
        format!("{:.*}", precision, value)
    }
}

fn increment_last_digit(digits: &str) -> String {
    let mut bytes = digits.as_bytes().to_vec();
    let mut carry = true;
    for byte in bytes.iter_mut().rev() {
        if *byte == b'.' {
            continue;
        }
        if *byte == b'9' {
            *byte = b'0';
        } else {
            *byte += 1;
            carry = false;
            break;
        }
    }
    let mut out = String::from_utf8(bytes).unwrap_or_default();
    if carry {
        out.insert(0, '1');
    }
    out
}

fn group(digits: &str, separator: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3 * separator.len());
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push_str(separator);
        }
        out.push(c);
    }
    out
}

fn signed(negative: bool, body: String, numbers: &NumberFormat) -> String {
    if negative {
        format!("{}{}", numbers.negative_sign, body)
    } else {
        body
    }
}

fn fixed(n: Number, precision: usize, grouping: bool, numbers: &NumberFormat) -> String {
    let digits = Digits::fixed(n, precision);
    signed(digits.negative, digits.compose(grouping, numbers), numbers)
}

fn currency(n: Number, precision: usize, numbers: &NumberFormat) -> String {
    let digits = Digits::fixed(n, precision);
    let body = format!("{}{}", numbers.currency_symbol, digits.compose(true, numbers));
    signed(digits.negative, body, numbers)
}

fn percent(n: Number, precision: usize, numbers: &NumberFormat) -> String {
    let hundredfold = match n {
        Number::Int(i) => i.checked_mul(100).map_or(Number::Float(i as f64 * 100.0), Number::Int),
        Number::Float(f) => Number::Float(f * 100.0),
    };
    format!("{} {}", fixed(hundredfold, precision, true, numbers), numbers.percent_symbol)
}

fn decimal(i: i64, precision: usize, numbers: &NumberFormat) -> String {
    let digits = i.unsigned_abs().to_string();
    let padded = format!("{:0>width$}", digits, width = precision);
    signed(i < 0, padded, numbers)
}

fn hexadecimal(i: i64, precision: usize, upper: bool) -> String {
    let digits = if upper { format!("{:X}", i) } else { format!("{:x}", i) };
    format!("{:0>width$}", digits, width = precision)
}

fn exponential(f: f64, precision: usize, upper: bool, numbers: &NumberFormat) -> String {
    let (mantissa, exponent) = scientific(f.abs(), Some(precision));
    let mantissa = mantissa.replacen('.', &numbers.decimal_separator, 1);
    let body = format!(
        "{}{}{}{:03}",
        mantissa,
        if upper { 'E' } else { 'e' },
        if exponent < 0 { '-' } else { '+' },
        exponent.unsigned_abs()
    );
    signed(f.is_sign_negative(), body, numbers)
}

/// Mantissa and decimal exponent; `None` keeps the shortest round-trip digits.
fn scientific(f: f64, decimals: Option<usize>) -> (String, i32) {
    let text = match decimals {
        Some(decimals) => format!("{:.*e}", decimals, f),
        None => format!("{:e}", f),
    };
    match text.split_once('e') {
        Some((mantissa, exponent)) => (mantissa.to_owned(), exponent.parse().unwrap_or(0)),
        None => (text, 0),
    }
}

fn general(n: Number, precision: Option<usize>, exponent_char: char, numbers: &NumberFormat) -> String {
    let precision = precision.filter(|&p| p > 0);
    if let Number::Int(i) = n {
        let digits = i.unsigned_abs().to_string();
        if precision.map_or(true, |p| digits.len() <= p) {
            return signed(i < 0, digits, numbers);
        }
    }
    let f = n.as_f64();
    let (mantissa, exponent) = scientific(f.abs(), precision.map(|p| p - 1));
    let significant = mantissa.replace('.', "");
    let significant = significant.trim_end_matches('0');
    let significant = if significant.is_empty() { "0" } else { significant };
    let use_scientific = match precision {
        Some(p) => exponent <= -5 || exponent >= p as i32,
        None => exponent <= -5 || exponent >= 15,
    };
    let body = if use_scientific {
        let (first, rest) = significant.split_at(1);
        let mut body = first.to_owned();
        if !rest.is_empty() {
            body.push_str(&numbers.decimal_separator);
            body.push_str(rest);
        }
        format!(
            "{}{}{}{:02}",
            body,
            exponent_char,
            if exponent < 0 { '-' } else { '+' },
            exponent.unsigned_abs()
        )
    } else {
        let (integer, fraction) = positional(significant, exponent);
        if fraction.is_empty() {
            integer
        } else {
            format!("{}{}{}", integer, numbers.decimal_separator, fraction)
        }
    };
    signed(f.is_sign_negative() && f != 0.0, body, numbers)
}

// digits d0 d1 d2 .. stand for d0.d1d2.. x 10^exponent
fn positional(digits: &str, exponent: i32) -> (String, String) {
    if exponent >= 0 {
        let point = exponent as usize + 1;
        if digits.len() <= point {
            (format!("{:0<width$}", digits, width = point), String::new())
        } else {
            (digits[..point].to_owned(), digits[point..].to_owned())
        }
    } else {
        let zeros = "0".repeat(exponent.unsigned_abs() as usize - 1);
        ("0".to_owned(), zeros + digits)
    }
}


#[derive(Debug, PartialEq)]
enum Pattern {
    Digit { zero: bool },
    Point,
    Group,
    Percent,
    Literal(String),
}

fn split_sections(format: &str) -> Vec<String> {
    let mut sections = vec![String::new()];
    let mut quote = None;
    let mut escaped = false;
    for c in format.chars() {
        let Some(section) = sections.last_mut() else { break };
        if escaped {
            section.push(c);
            escaped = false;
            continue;
        }
        match (c, quote) {
            ('\\', None) => {
                escaped = true;
                section.push(c);
            },
            ('\'' | '"', None) => {
                quote = Some(c);
                section.push(c);
            },
            (c, Some(q)) if c == q => {
                quote = None;
                section.push(c);
            },
            (';', None) => sections.push(String::new()),
            _ => section.push(c),
        }
    }
    sections
}

fn parse_pattern(section: &str) -> Vec<Pattern> {
    let mut tokens = Vec::new();
    let mut chars = section.chars();
    let mut seen_point = false;
    while let Some(c) = chars.next() {
        match c {
            '0' => tokens.push(Pattern::Digit { zero: true }),
            '#' => tokens.push(Pattern::Digit { zero: false }),
            '.' if !seen_point => {
                seen_point = true;
                tokens.push(Pattern::Point);
            },
            '.' => {},
            ',' => tokens.push(Pattern::Group),
            '%' => tokens.push(Pattern::Percent),
            '\\' => {
                if let Some(next) = chars.next() {
                    tokens.push(Pattern::Literal(next.to_string()));
                }
            },
            '\'' | '"' => {
                let literal = chars.by_ref().take_while(|&next| next != c).collect::<String>();
                tokens.push(Pattern::Literal(literal));
            },
            other => tokens.push(Pattern::Literal(other.to_string())),
        }
    }
    tokens
}

fn custom(n: Number, format: &str, numbers: &NumberFormat) -> String {
    let sections = split_sections(format);
    let chosen = if sections.len() >= 3 && n.as_f64() == 0.0 {
        Some(&sections[2])
    } else if sections.len() >= 2 && n.is_negative() {
        Some(&sections[1])
    } else {
        None
    };
    match chosen {
        Some(section) if !section.is_empty() => custom_section(n, section, false, numbers),
        _ => custom_section(n, &sections[0], true, numbers),
    }
}

// the sign is written only when `with_sign` is set
fn custom_section(n: Number, section: &str, with_sign: bool, numbers: &NumberFormat) -> String {
    let tokens = parse_pattern(section);
    let point = tokens.iter().position(|t| *t == Pattern::Point).unwrap_or(tokens.len());
    let (integer_part, fraction_part) = tokens.split_at(point);

    let integer_places = integer_part.iter()
        .filter(|t| matches!(t, Pattern::Digit { .. }))
        .count();
    let min_integer = integer_part.iter()
        .filter(|t| matches!(t, Pattern::Digit { .. }))
        .skip_while(|t| **t == Pattern::Digit { zero: false })
        .count();
    let mut grouping = false;
    let mut scale = 0;
    for (i, token) in integer_part.iter().enumerate() {
        if *token == Pattern::Group {
            let digit_after = integer_part[i + 1..].iter().any(|t| matches!(t, Pattern::Digit { .. }));
            let digit_before = integer_part[..i].iter().any(|t| matches!(t, Pattern::Digit { .. }));
            if digit_after && digit_before {
                grouping = true;
            } else if digit_before {
                scale += 1;
            }
        }
    }
    let fraction_digits = fraction_part.iter()
        .filter(|t| matches!(t, Pattern::Digit { .. }))
        .collect::<Vec<_>>();
    let max_fraction = fraction_digits.len();
    let min_fraction = fraction_digits.iter()
        .rposition(|t| **t == Pattern::Digit { zero: true })
        .map_or(0, |p| p + 1);
    let percents = tokens.iter().filter(|t| **t == Pattern::Percent).count();

    // integers keep all their digits unless scaled down
    let exact = match n {
        Number::Int(i) if scale == 0 => u32::try_from(percents).ok()
            .and_then(|percents| 100i64.checked_pow(percents))
            .and_then(|factor| i.checked_mul(factor)),
        _ => None,
    };
    let digits = match exact {
        Some(i) => Digits::fixed(Number::Int(i), max_fraction),
        None => {
            let scaled = n.as_f64().abs() * 100f64.powi(percents as i32) / 1000f64.powi(scale);
            Digits::fixed(Number::Float(scaled), max_fraction)
        }
    };
    let mut fraction = digits.fraction.clone();
    while fraction.len() > min_fraction && fraction.ends_with('0') {
        fraction.pop();
    }
    let integer = if digits.integer == "0" && min_integer == 0 {
        String::new()
    } else {
        format!("{:0>width$}", digits.integer, width = min_integer)
    };
    let integer = integer.chars().collect::<Vec<_>>();
    let fraction = fraction.chars().collect::<Vec<_>>();

    let mut out = String::new();
    if with_sign && n.is_negative() && !digits.is_zero() {
        out.push_str(&numbers.negative_sign);
    }
    let len = integer.len();
    let emit = |out: &mut String, position: usize| {
        if position < len {
            out.push(integer[len - 1 - position]);
            if grouping && position > 0 && position % 3 == 0 {
                out.push_str(&numbers.group_separator);
            }
        }
    };
    let mut integer_index = 0;
    let mut fraction_index = 0;
    let mut in_fraction = false;
    for token in &tokens {
        match token {
            Pattern::Digit { .. } if !in_fraction => {
                if integer_index == 0 {
                    for position in (integer_places - 1..len.max(integer_places)).rev() {
                        emit(&mut out, position);
                    }
                } else {
                    emit(&mut out, integer_places - 1 - integer_index);
                }
                integer_index += 1;
            },
            Pattern::Digit { .. } => {
                if let Some(c) = fraction.get(fraction_index) {
                    out.push(*c);
                }
                fraction_index += 1;
            },
            Pattern::Point => {
                in_fraction = true;
                if integer_places == 0 {
                    out.extend(integer.iter());
                }
                if !fraction.is_empty() {
                    out.push_str(&numbers.decimal_separator);
                }
            },
            Pattern::Group => {},
            Pattern::Percent => out.push_str(&numbers.percent_symbol),
            Pattern::Literal(text) => out.push_str(text),
        }
    }
    out
}
