//! jq-style path queries over YAML documents
//!
//! Supported forms: `.` (identity), `.key`, `."quoted key"`, `.["quoted key"]`
//! and `[N]` (negative `N` counts from the end), chained freely as in
//! `.spec.containers[0].image`.

use serde_yaml::Value;

use crate::error::UsageError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Index(i64),
}

/// A parsed path query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    raw: String,
    segments: Vec<Segment>,
}

impl Query {
    pub fn parse(raw: &str) -> Result<Self, UsageError> {
        let invalid = |message: &str| UsageError::InvalidQuery {
            query: raw.to_string(),
            message: message.to_string(),
        };

        let chars: Vec<char> = raw.trim().chars().collect();
        if chars.first() != Some(&'.') {
            return Err(invalid("must start with '.'"));
        }

        let mut segments = Vec::new();
        let mut pos = 0;
        while pos < chars.len() {
            match chars[pos] {
                '.' => {
                    pos += 1;
                    match chars.get(pos) {
                        None | Some('[') => {}
                        Some('"') => {
                            let (key, next) = quoted(&chars, pos)
                                .ok_or_else(|| invalid("unterminated string"))?;
                            segments.push(Segment::Key(key));
                            pos = next;
                        }
                        Some(c) if is_ident(*c) => {
                            let start = pos;
                            while pos < chars.len() && is_ident(chars[pos]) {
                                pos += 1;
                            }
                            segments.push(Segment::Key(chars[start..pos].iter().collect()));
                        }
                        Some(c) => {
                            return Err(invalid(&format!("unexpected {c:?} after '.'")));
                        }
                    }
                }
                '[' => {
                    pos += 1;
                    if chars.get(pos) == Some(&'"') {
                        let (key, next) =
                            quoted(&chars, pos).ok_or_else(|| invalid("unterminated string"))?;
                        segments.push(Segment::Key(key));
                        pos = next;
                    } else {
                        let start = pos;
                        while pos < chars.len()
                            && (chars[pos] == '-' || chars[pos].is_ascii_digit())
                        {
                            pos += 1;
                        }
                        let digits: String = chars[start..pos].iter().collect();
                        let index = digits.parse::<i64>().map_err(|_| {
                            invalid("expected an index or a quoted key inside '[]'")
                        })?;
                        segments.push(Segment::Index(index));
                    }
                    if chars.get(pos) != Some(&']') {
                        return Err(invalid("missing ']'"));
                    }
                    pos += 1;
                }
                c => return Err(invalid(&format!("unexpected {c:?}"))),
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The addressed value, `None` when any step is missing
    pub fn select<'a>(&self, document: &'a Value) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(document, |value, segment| step(value, segment))
    }

    /// Evaluate and render the result as text; `None` for null or missing
    pub fn evaluate(&self, document: &Value) -> Result<Option<String>, UsageError> {
        match self.select(document) {
            Some(value) => stringify(value).map_err(|message| UsageError::InvalidQuery {
                query: self.raw.clone(),
                message,
            }),
            None => Ok(None),
        }
    }
}

fn is_ident(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

/// Read a double-quoted string starting at `start`; returns it and the
/// position after the closing quote
fn quoted(chars: &[char], start: usize) -> Option<(String, usize)> {
    let mut out = String::new();
    let mut pos = start + 1;
    while pos < chars.len() {
        match chars[pos] {
            '"' => return Some((out, pos + 1)),
            '\\' => {
                out.push(*chars.get(pos + 1)?);
                pos += 2;
            }
            c => {
                out.push(c);
                pos += 1;
            }
        }
    }
    None
}

fn step<'a>(value: &'a Value, segment: &Segment) -> Option<&'a Value> {
    match (value, segment) {
        (Value::Tagged(tagged), _) => step(&tagged.value, segment),
        (Value::Mapping(map), Segment::Key(key)) => map.get(key.as_str()),
        (Value::Sequence(items), Segment::Index(index)) => {
            let len = items.len() as i64;
            let resolved = if *index < 0 { len + index } else { *index };
            usize::try_from(resolved).ok().and_then(|i| items.get(i))
        }
        _ => None,
    }
}

/// Scalars as their literal text, collections as compact JSON.
///
/// Numbers are rendered from the parsed value, so an unquoted `1.10` comes
/// back as `1.1`. Versions with trailing zeros must be quoted in the file.
fn stringify(value: &Value) -> Result<Option<String>, String> {
    match value {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Tagged(tagged) => stringify(&tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => serde_json::to_string(value)
            .map(Some)
            .map_err(|e| e.to_string()),
    }
}
