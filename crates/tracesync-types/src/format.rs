use regex::Regex;
use std::fmt::Write;
use std::sync::LazyLock;
use thiserror::Error;

use crate::{Field, FieldKind, Record};

/// Display template used when no format has been configured
pub const DEFAULT_FORMAT: &str = "[{timestamp}][{module:10}] : {message}";

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{|\}\}|\{([A-Za-z_][A-Za-z0-9_]*)(?::([<>^])?(\d+))?\}|[{}]")
        .expect("valid placeholder regex")
});

/// Errors raised while parsing a display template
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("Unknown field '{name}' at position {position}")]
    UnknownField { name: String, position: usize },

    #[error("Invalid width '{width}' at position {position}")]
    InvalidWidth { width: String, position: usize },

    #[error("Single '{brace}' encountered at position {position}")]
    UnbalancedBrace { brace: char, position: usize },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Align {
    Left,
    Right,
    Center,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field {
        field: Field,
        align: Option<Align>,
        width: u16,
    },
}

/// Compiled display template for records
///
/// Placeholders are `{field}` or `{field:[<>^]width}`; `{{` and `}}` produce literal
/// braces. Without an explicit alignment, strings are left aligned and integers right
/// aligned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordFormat {
    template: String,
    segments: Vec<Segment>,
}

impl RecordFormat {
    /// Parse a template string
    pub fn parse(template: &str) -> Result<Self, FormatError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut last = 0;

        for caps in PLACEHOLDER_RE.captures_iter(template) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            literal.push_str(&template[last..whole.start()]);
            last = whole.end();

            match whole.as_str() {
                "{{" => literal.push('{'),
                "}}" => literal.push('}'),
                "{" | "}" => {
                    return Err(FormatError::UnbalancedBrace {
                        brace: whole.as_str().chars().next().unwrap_or('{'),
                        position: whole.start(),
                    });
                }
                _ => {
                    let name = caps.get(1).map_or("", |m| m.as_str());
                    let field = Field::from_name(name).ok_or_else(|| FormatError::UnknownField {
                        name: name.to_string(),
                        position: whole.start(),
                    })?;
                    let align = caps.get(2).map(|m| match m.as_str() {
                        "<" => Align::Left,
                        ">" => Align::Right,
                        _ => Align::Center,
                    });
                    // Runtime widths above u16::MAX are rejected by std::fmt
                    let width = match caps.get(3) {
                        Some(m) => m.as_str().parse::<u16>().map_err(|_| {
                            FormatError::InvalidWidth {
                                width: m.as_str().to_string(),
                                position: m.start(),
                            }
                        })?,
                        None => 0,
                    };

                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Field {
                        field,
                        align,
                        width,
                    });
                }
            }
        }

        literal.push_str(&template[last..]);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            template: template.to_string(),
            segments,
        })
    }

    /// The template this format was parsed from
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Render a record through this template
    pub fn render(&self, record: &Record) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field {
                    field,
                    align,
                    width,
                } => {
                    let value = record.get(*field).to_string();
                    let align = align.unwrap_or(match field.kind() {
                        FieldKind::String => Align::Left,
                        FieldKind::Integer => Align::Right,
                    });
                    let width = usize::from(*width);
                    // Writing into a String cannot fail
                    let _ = match align {
                        Align::Left => write!(out, "{:<1$}", value, width),
                        Align::Right => write!(out, "{:>1$}", value, width),
                        Align::Center => write!(out, "{:^1$}", value, width),
                    };
                }
            }
        }
        out
    }
}

impl Default for RecordFormat {
    fn default() -> Self {
        Self::parse(DEFAULT_FORMAT).expect("default format is valid")
    }
}
