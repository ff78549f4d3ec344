//! Unit-qualified RAM/storage sizes as written in device files.
//!
//! Accepted text: `"4 GB"`, `"512 MB"`, `"1.5 GB"`, `"3/4 GB"`,
//! `"16 GB, 32 GB"`, `"32 GB (eMMC 5.1)"`. A number without its own unit
//! takes the unit after a `/` or `,` chain (`"3/4 GB"` is 3 GB and 4 GB).
//! Numbers glued to words (`LPDDR4X`) or left without a unit are ignored,
//! as is parenthesized text. Multiples are binary.

use std::fmt;

use serde_yaml::Value;

/// A size in megabytes together with the text it was parsed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capacity {
    text: String,
    megabytes: u64,
}

impl Capacity {
    /// Parse capacity text. The largest listed variant wins.
    pub fn parse(text: &str) -> Result<Self, String> {
        let variants = parse_variants(text)?;
        let megabytes = variants.into_iter().max().unwrap_or(0);
        Ok(Self {
            text: normalize_whitespace(text),
            megabytes,
        })
    }

    /// Parse a YAML value: a string, or a list of strings (one per variant).
    pub fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::String(text) => Self::parse(text),
            Value::Number(n) => Err(format!("'{n}' has no unit (expected e.g. '{n} GB')")),
            Value::Sequence(items) => {
                let mut texts = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::String(text) => texts.push(text.as_str()),
                        other => return Err(format!("unsupported list item {other:?}")),
                    }
                }
                if texts.is_empty() {
                    return Err("empty list".to_string());
                }
                let mut best = 0;
                for text in &texts {
                    best = best.max(Self::parse(text)?.megabytes);
                }
                Ok(Self {
                    text: texts
                        .iter()
                        .map(|t| normalize_whitespace(t))
                        .collect::<Vec<_>>()
                        .join(" / "),
                    megabytes: best,
                })
            }
            other => Err(format!("unsupported value {other:?}")),
        }
    }

    pub fn megabytes(&self) -> u64 {
        self.megabytes
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    #[cfg(test)]
    pub(crate) fn from_megabytes(megabytes: u64) -> Self {
        Self {
            text: format!("{megabytes} MB"),
            megabytes,
        }
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} MB)", self.text, self.megabytes)
    }
}

#[derive(Debug, Clone, Copy)]
enum Unit {
    Kilo,
    Mega,
    Giga,
    Tera,
}

impl Unit {
    fn from_word(word: &str) -> Option<Self> {
        match word.to_ascii_uppercase().as_str() {
            "KB" | "KIB" => Some(Unit::Kilo),
            "MB" | "MIB" => Some(Unit::Mega),
            "GB" | "GIB" => Some(Unit::Giga),
            "TB" | "TIB" => Some(Unit::Tera),
            _ => None,
        }
    }

    fn to_megabytes(self, value: f64) -> u64 {
        let factor = match self {
            Unit::Kilo => 1.0 / 1024.0,
            Unit::Mega => 1.0,
            Unit::Giga => 1024.0,
            Unit::Tera => 1024.0 * 1024.0,
        };
        (value * factor).round() as u64
    }
}

enum Token {
    Number(f64),
    Sized(f64, Unit),
    Unit(Unit),
    Separator,
    Word,
}

fn classify_word(word: &str, text: &str) -> Result<Token, String> {
    let word = word.trim_end_matches('.');
    let split = word
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(word.len());
    let (number, rest) = word.split_at(split);
    if number.is_empty() {
        return Ok(Unit::from_word(rest).map_or(Token::Word, Token::Unit));
    }
    let parse = || {
        number
            .parse::<f64>()
            .map_err(|_| format!("invalid number '{number}' in '{text}'"))
    };
    if rest.is_empty() {
        return Ok(Token::Number(parse()?));
    }
    match Unit::from_word(rest) {
        Some(unit) => Ok(Token::Sized(parse()?, unit)),
        None => Ok(Token::Word),
    }
}

fn tokenize(text: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    let mut depth = 0usize;
    for c in text.chars().chain(std::iter::once(' ')) {
        if depth == 0 && (c.is_alphanumeric() || c == '.') {
            word.push(c);
            continue;
        }
        if !word.is_empty() {
            tokens.push(classify_word(&word, text)?);
            word.clear();
        }
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            '/' | ',' if depth == 0 => tokens.push(Token::Separator),
            _ => {}
        }
    }
    Ok(tokens)
}

/// Sizes in MB. A bare number only counts when a chain of `/` or `,`
/// separators ties it to a following unit; anything else drops it.
fn parse_variants(text: &str) -> Result<Vec<u64>, String> {
    let mut pending: Vec<f64> = Vec::new();
    let mut after_separator = false;
    let mut out = Vec::new();

    for token in tokenize(text)? {
        match token {
            Token::Number(value) => {
                if !after_separator {
                    pending.clear();
                }
                pending.push(value);
                after_separator = false;
            }
            Token::Sized(value, unit) => {
                if after_separator {
                    out.extend(pending.drain(..).map(|v| unit.to_megabytes(v)));
                }
                pending.clear();
                out.push(unit.to_megabytes(value));
                after_separator = false;
            }
            Token::Unit(unit) => {
                if !after_separator {
                    out.extend(pending.drain(..).map(|v| unit.to_megabytes(v)));
                }
                pending.clear();
                after_separator = false;
            }
            Token::Separator => after_separator = !pending.is_empty(),
            Token::Word => {
                pending.clear();
                after_separator = false;
            }
        }
    }

    if out.is_empty() {
        return Err(format!("no size with a unit in '{}'", text.trim()));
    }
    Ok(out)
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mb(text: &str) -> u64 {
        Capacity::parse(text).unwrap().megabytes()
    }

    #[test]
    fn parses_common_units() {
        assert_eq!(mb("4 GB"), 4096);
        assert_eq!(mb("512 MB"), 512);
        assert_eq!(mb("1.5 GB"), 1536);
        assert_eq!(mb("1 TB"), 1024 * 1024);
        assert_eq!(mb("6000MB"), 6000);
        assert_eq!(mb("2 gb"), 2048);
    }

    #[test]
    fn variants_share_trailing_unit_and_max_wins() {
        assert_eq!(mb("3/4 GB"), 4096);
        assert_eq!(mb("16 GB, 32 GB"), 32768);
        assert_eq!(mb("32/64/128 GB"), 128 * 1024);
    }

    #[test]
    fn parenthesized_notes_are_ignored() {
        assert_eq!(mb("32 GB (eMMC 5.1)"), 32768);
        assert_eq!(mb("64 GB (UFS 2.1)"), 65536);
    }

    #[test]
    fn memory_type_digits_are_not_sizes() {
        assert_eq!(mb("2 GB LPDDR4X"), 2048);
        assert_eq!(mb("2 GB LPDDR3"), 2048);
        assert_eq!(mb("32 GB eMMC 5.1"), 32768);
        assert_eq!(mb("3 GB, 4"), 3072);
        assert_eq!(mb("2GB/3GB"), 3072);
        assert_eq!(mb("4 GB."), 4096);
    }

    #[test]
    fn unitless_text_is_rejected() {
        assert!(Capacity::parse("4096").is_err());
        assert!(Capacity::parse("unknown").is_err());
        assert!(Capacity::parse("").is_err());
    }

    #[test]
    fn numbers_from_yaml_need_a_unit() {
        let err = Capacity::from_value(&Value::Number(4.into())).unwrap_err();
        assert!(err.contains("no unit"), "{err}");
    }

    #[test]
    fn yaml_lists_take_largest_variant() {
        let value: Value = serde_yaml::from_str("[\"2 GB\", \"3 GB\"]").unwrap();
        let cap = Capacity::from_value(&value).unwrap();
        assert_eq!(cap.megabytes(), 3072);
        assert_eq!(cap.text(), "2 GB / 3 GB");
    }

    #[test]
    fn display_shows_text_and_megabytes() {
        let cap = Capacity::parse("2  GB").unwrap();
        assert_eq!(cap.to_string(), "2 GB (2048 MB)");
    }
}
