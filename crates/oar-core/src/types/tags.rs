//! Struct-tag parsing.
//!
//! Field metadata is written as a conventional struct tag: space separated
//! `key:"value"` pairs, where the value is a double-quoted string with
//! backslash escapes, e.g. `json:"name,omitempty" required:"true"`.

use indexmap::IndexMap;

use crate::error::{ReflectError, Result};

/// Parsed key/value tags of one field, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tags {
    entries: IndexMap<String, String>,
}

impl Tags {
    /// Parse the raw tag string of `field`. When a key repeats, the first
    /// value wins.
    pub fn parse(field: &str, raw: &str) -> Result<Self> {
        let mut entries = IndexMap::new();
        let mut rest = raw;

        loop {
            rest = rest.trim_start_matches(' ');
            if rest.is_empty() {
                break;
            }

            let key_len = rest
                .find(|c: char| c <= ' ' || c == ':' || c == '"' || c == '\u{7f}')
                .unwrap_or(rest.len());
            if key_len == 0 || !rest[key_len..].starts_with(":\"") {
                return Err(ReflectError::invalid_tag(
                    field,
                    "tag",
                    format!("malformed tag near `{rest}`"),
                ));
            }
            let key = &rest[..key_len];
            let quoted = &rest[key_len + 1..];

            let (value, consumed) = unquote(quoted).ok_or_else(|| {
                ReflectError::invalid_tag(
                    field,
                    key,
                    format!("unterminated or invalid value for key `{key}`"),
                )
            })?;
            entries.entry(key.to_string()).or_insert(value);
            rest = &quoted[consumed..];
        }

        Ok(Self { entries })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Raw value of a tag.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Name part of a tag value, i.e. everything before the first `,`.
    pub fn name(&self, key: &str) -> Option<&str> {
        self.get(key)
            .map(|value| value.split(',').next().unwrap_or_default())
    }

    /// Boolean tag such as `required:"true"`.
    pub fn flag(&self, key: &str, field: &str) -> Result<Option<bool>> {
        match self.get(key) {
            None => Ok(None),
            Some("true") => Ok(Some(true)),
            Some("false") => Ok(Some(false)),
            Some(other) => Err(ReflectError::invalid_tag(
                field,
                key,
                format!("expected `true` or `false`, got `{other}`"),
            )),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Decode a leading double-quoted string. Returns the value and the number
/// of bytes consumed, quotes included.
fn unquote(input: &str) -> Option<(String, usize)> {
    let mut chars = input.char_indices();
    if chars.next()?.1 != '"' {
        return None;
    }

    let mut value = String::new();
    while let Some((i, ch)) = chars.next() {
        match ch {
            '"' => return Some((value, i + 1)),
            '\\' => {
                let (_, escaped) = chars.next()?;
                value.push(match escaped {
                    '\\' => '\\',
                    '"' => '"',
                    '\'' => '\'',
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    _ => return None,
                });
            }
            '\n' => return None,
            other => value.push(other),
        }
    }
    None
}
