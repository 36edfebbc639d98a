//! BOM Structure Parser
//!
//! Product structures are stored as loosely quoted text: keys may be bare
//! words, strings may use single quotes, and Python literals (`True`,
//! `False`, `None`) and trailing commas appear. The text is first normalized
//! into strict JSON by a small lexer and then deserialized into
//! [`BomStructure`].

use serde::de::{self, Deserializer};
use serde::Deserialize;

use crate::error::BomError;
use crate::report::{parse_quantity, quantity_from_f64};

/// Bill of materials of one product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BomStructure {
    /// Components; empty for a plain (non-kit) product.
    #[serde(
        rename = "componentes",
        alias = "components",
        default,
        deserialize_with = "null_as_empty"
    )]
    pub components: Vec<Component>,
}

impl BomStructure {
    /// Whether the product is a kit.
    pub fn is_kit(&self) -> bool {
        !self.components.is_empty()
    }
}

/// One component line of a kit.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Component {
    /// Component product reference.
    #[serde(rename = "produto", alias = "product")]
    pub product: ComponentProduct,
    /// Units of the component per kit.
    #[serde(
        rename = "quantidade",
        alias = "quantity",
        deserialize_with = "deserialize_quantity"
    )]
    pub quantity: u64,
}

/// Reference to the component's product.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ComponentProduct {
    /// Product id, as text.
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
}

/// Parse a stored product structure.
///
/// Blank text, `None` and `null` mean "no components".
pub fn parse_structure(text: &str) -> Result<BomStructure, BomError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(BomStructure::default());
    }

    let json = normalize(trimmed)?;
    let value: serde_json::Value =
        serde_json::from_str(&json).map_err(|e| BomError::Malformed {
            message: e.to_string(),
        })?;

    if value.is_null() {
        return Ok(BomStructure::default());
    }

    serde_json::from_value(value).map_err(|e| BomError::Malformed {
        message: e.to_string(),
    })
}

/// Rewrite loosely quoted text as strict JSON.
pub fn normalize(text: &str) -> Result<String, BomError> {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 16);
    let mut pos = 0;

    while pos < chars.len() {
        let c = chars[pos];
        match c {
            c if c.is_whitespace() => {
                out.push(c);
                pos += 1;
            }
            '{' | '[' | ':' | ',' => {
                out.push(c);
                pos += 1;
            }
            '}' | ']' => {
                drop_trailing_comma(&mut out);
                out.push(c);
                pos += 1;
            }
            '"' | '\'' => {
                let (content, next) = read_string(&chars, pos)?;
                push_json_string(&mut out, &content);
                pos = next;
            }
            c if is_word_char(c) => {
                let start = pos;
                while pos < chars.len() && is_word_char(chars[pos]) {
                    pos += 1;
                }
                let word: String = chars[start..pos].iter().collect();
                push_word(&mut out, &word);
            }
            other => {
                return Err(BomError::Malformed {
                    message: format!("unexpected character {:?} at offset {}", other, pos),
                })
            }
        }
    }

    Ok(out)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '.' | '-' | '+')
}

fn drop_trailing_comma(out: &mut String) {
    let trimmed_len = out.trim_end().len();
    if out[..trimmed_len].ends_with(',') {
        out.truncate(trimmed_len - 1);
    }
}

/// Read a quoted string starting at `start`; returns its content and the
/// position after the closing quote.
fn read_string(chars: &[char], start: usize) -> Result<(String, usize), BomError> {
    let quote = chars[start];
    let mut content = String::new();
    let mut pos = start + 1;

    while pos < chars.len() {
        let c = chars[pos];
        if c == quote {
            return Ok((content, pos + 1));
        }

        if c == '\\' && pos + 1 < chars.len() {
            let escaped = chars[pos + 1];
            pos += 2;
            match escaped {
                'n' => content.push('\n'),
                't' => content.push('\t'),
                'r' => content.push('\r'),
                'b' => content.push('\u{8}'),
                'f' => content.push('\u{c}'),
                'u' if pos + 4 <= chars.len() => {
                    let hex: String = chars[pos..pos + 4].iter().collect();
                    match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                        Some(decoded) => {
                            content.push(decoded);
                            pos += 4;
                        }
                        None => {
                            content.push('\\');
                            content.push('u');
                        }
                    }
                }
                '\\' | '"' | '\'' | '/' => content.push(escaped),
                other => {
                    content.push('\\');
                    content.push(other);
                }
            }
            continue;
        }

        content.push(c);
        pos += 1;
    }

    Err(BomError::UnterminatedString { offset: start })
}

fn push_json_string(out: &mut String, content: &str) {
    out.push_str(&serde_json::Value::String(content.to_string()).to_string());
}

fn push_word(out: &mut String, word: &str) {
    match word {
        "True" | "true" => out.push_str("true"),
        "False" | "false" => out.push_str("false"),
        "None" | "none" | "null" | "NULL" | "Null" => out.push_str("null"),
        _ => {
            if let Ok(int) = word.parse::<i64>() {
                out.push_str(&int.to_string());
            } else if let Some(number) = word
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
            {
                out.push_str(&number.to_string());
            } else {
                push_json_string(out, word);
            }
        }
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

fn deserialize_quantity<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let quantity = match &value {
        serde_json::Value::Number(n) => n.as_u64().or_else(|| n.as_f64().and_then(quantity_from_f64)),
        serde_json::Value::String(s) => parse_quantity(s),
        _ => None,
    };
    quantity.ok_or_else(|| de::Error::custom(format!("invalid component quantity {}", value)))
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match &value {
        serde_json::Value::Number(n) => Ok(match (n.as_i64(), n.as_f64()) {
            (Some(int), _) => int.to_string(),
            (None, Some(float)) if float.fract() == 0.0 && float.abs() < 9.0e15 => {
                (float as i64).to_string()
            }
            _ => n.to_string(),
        }),
        serde_json::Value::String(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(de::Error::custom(format!("invalid product id {}", value))),
    }
}
