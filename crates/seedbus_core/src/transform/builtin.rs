//! Built-in transforms.
//!
//! A transform name that is not registered explicitly is parsed as
//! `kind` or `kind:arg`:
//!
//! | Name | Effect |
//! |------|--------|
//! | `upper`, `lower`, `trim` | Text case and whitespace |
//! | `int`, `float` | Parse numbers |
//! | `null_if_empty` | Blank text becomes NULL |
//! | `append:<s>`, `prepend:<s>` | Add a suffix or prefix |
//! | `lookup:<entity>` | Name to key of another entity, NULL if unknown |
//! | `lookup!:<entity>` | As `lookup`, but unknown names are an error |
//! | `date:<from>=><to>` | Reformat a date; `to` defaults to `%Y-%m-%d %H:%M:%S` |
//! | `map:<k>=<v>,...` | Case-insensitive value mapping, NULL if unmatched |
//! | `registry:<collection>` | Translate through the bus [`crate::Registry`] |
//!
//! NULL passes through every text transform unchanged.

use super::SharedTransform;
use super::Transform;
use crate::bus::Bus;
use crate::error::{SeedError, SeedResult};
use chrono::format::{Item, StrftimeItems};
use chrono::{NaiveDate, NaiveDateTime};
use seedbus_store::Value;
use std::fmt::Write as _;
use std::sync::Arc;

const DEFAULT_DATE_OUTPUT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq)]
enum Builtin {
    Upper,
    Lower,
    Trim,
    Int,
    Float,
    NullIfEmpty,
    Append(String),
    Prepend(String),
    Lookup { entity: String, strict: bool },
    Date { from: String, to: String },
    Map(Vec<(String, Value)>),
    Registry(String),
}

/// Parses a built-in transform name.
pub(crate) fn resolve(name: &str) -> SeedResult<SharedTransform> {
    Ok(Arc::new(parse(name)?))
}

fn parse(name: &str) -> SeedResult<Builtin> {
    let (kind, arg) = match name.split_once(':') {
        Some((kind, arg)) => (kind, Some(arg)),
        None => (name, None),
    };

    let no_arg = |builtin: Builtin| match arg {
        None => Ok(builtin),
        Some(_) => Err(SeedError::invalid_transform(
            name,
            format!("'{kind}' takes no argument"),
        )),
    };
    let required = || {
        arg.filter(|a| !a.is_empty()).ok_or_else(|| {
            SeedError::invalid_transform(name, format!("'{kind}' needs an argument"))
        })
    };

    match kind {
        "upper" => no_arg(Builtin::Upper),
        "lower" => no_arg(Builtin::Lower),
        "trim" => no_arg(Builtin::Trim),
        "int" => no_arg(Builtin::Int),
        "float" => no_arg(Builtin::Float),
        "null_if_empty" => no_arg(Builtin::NullIfEmpty),
        "append" => Ok(Builtin::Append(required()?.to_string())),
        "prepend" => Ok(Builtin::Prepend(required()?.to_string())),
        "lookup" | "lookup!" => Ok(Builtin::Lookup {
            entity: required()?.trim().to_string(),
            strict: kind.ends_with('!'),
        }),
        "date" => parse_date(name, required()?),
        "map" => parse_map(name, required()?),
        "registry" => Ok(Builtin::Registry(required()?.trim().to_string())),
        _ => Err(SeedError::unknown_transformation(name)),
    }
}

fn parse_date(name: &str, arg: &str) -> SeedResult<Builtin> {
    let (from, to) = match arg.split_once("=>") {
        Some((from, to)) => (from, to),
        None => (arg, DEFAULT_DATE_OUTPUT),
    };

    for format in [from, to] {
        if format.is_empty() {
            return Err(SeedError::invalid_transform(name, "empty date format"));
        }
        if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
            return Err(SeedError::invalid_transform(
                name,
                format!("invalid date format '{format}'"),
            ));
        }
    }

    Ok(Builtin::Date {
        from: from.to_string(),
        to: to.to_string(),
    })
}

fn parse_map(name: &str, arg: &str) -> SeedResult<Builtin> {
    let mut pairs = Vec::new();
    for pair in arg.split(',') {
        let (key, value) = pair.split_once('=').ok_or_else(|| {
            SeedError::invalid_transform(name, format!("'{pair}' is not a key=value pair"))
        })?;
        let value = value.trim();
        let value = value
            .parse::<i64>()
            .map_or_else(|_| Value::from(value), Value::Integer);
        pairs.push((key.trim().to_string(), value));
    }
    Ok(Builtin::Map(pairs))
}

fn map_text(value: Value, f: impl FnOnce(String) -> Value) -> Value {
    match value {
        Value::Text(s) => f(s),
        other => other,
    }
}

fn parse_datetime(text: &str, format: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, format)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(text, format)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

impl Transform for Builtin {
    fn apply(&self, value: Value, bus: &Bus) -> SeedResult<Value> {
        match self {
            Self::Upper => Ok(map_text(value, |s| Value::Text(s.to_uppercase()))),
            Self::Lower => Ok(map_text(value, |s| Value::Text(s.to_lowercase()))),
            Self::Trim => Ok(map_text(value, |s| Value::Text(s.trim().to_string()))),
            Self::NullIfEmpty => Ok(map_text(value, |s| {
                if s.trim().is_empty() {
                    Value::Null
                } else {
                    Value::Text(s)
                }
            })),
            Self::Int => match value {
                Value::Text(s) => s
                    .trim()
                    .parse::<i64>()
                    .map(Value::Integer)
                    .map_err(|e| SeedError::invalid_value(&s, e.to_string())),
                Value::Real(r) if r.fract() == 0.0 => Ok(Value::Integer(r as i64)),
                Value::Real(r) => Err(SeedError::invalid_value(r, "not a whole number")),
                other => Ok(other),
            },
            Self::Float => match value {
                Value::Text(s) => s
                    .trim()
                    .parse::<f64>()
                    .map(Value::Real)
                    .map_err(|e| SeedError::invalid_value(&s, e.to_string())),
                Value::Integer(i) => Ok(Value::Real(i as f64)),
                other => Ok(other),
            },
            Self::Append(suffix) => Ok(match value {
                Value::Null => Value::Null,
                other => Value::Text(format!("{other}{suffix}")),
            }),
            Self::Prepend(prefix) => Ok(match value {
                Value::Null => Value::Null,
                other => Value::Text(format!("{prefix}{other}")),
            }),
            Self::Lookup { entity, strict } => {
                let Some(name) = value.to_key() else {
                    return Ok(Value::Null);
                };
                match bus.named_item_id(entity, &name)? {
                    Some(id) => Ok(Value::from(id)),
                    None if *strict => Err(SeedError::unknown_name(entity.as_str(), name)),
                    None => Ok(Value::Null),
                }
            }
            Self::Date { from, to } => {
                let text = match value {
                    Value::Text(text) => text,
                    other => return Ok(other),
                };
                let parsed = parse_datetime(text.trim(), from).ok_or_else(|| {
                    SeedError::invalid_value(&text, format!("does not match '{from}'"))
                })?;
                let mut out = String::new();
                write!(out, "{}", parsed.format(to))
                    .map_err(|_| SeedError::invalid_value(&text, format!("cannot format as '{to}'")))?;
                Ok(Value::Text(out))
            }
            Self::Map(pairs) => {
                let Some(key) = value.to_key() else {
                    return Ok(Value::Null);
                };
                let key = key.trim();
                Ok(pairs
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(key))
                    .map_or(Value::Null, |(_, v)| v.clone()))
            }
            Self::Registry(collection) => {
                let Some(key) = value.to_key() else {
                    return Ok(value);
                };
                Ok(bus
                    .registry()
                    .get(collection, &key)
                    .cloned()
                    .unwrap_or(value))
            }
        }
    }
}
