//! Rename templates.
//!
//! A template is literal text with `{field}` references into a regex match.
//! Fields are either group numbers (`{1}`, `{0}` for the whole match), group
//! names (`{stem}`), or `{}` which numbers itself from group 1 upward. A field
//! may carry a one-letter conversion written `{stem!u}` or `{stem:u}`:
//! `u` uppercases, `l` lowercases and `c` capitalizes. `{{` and `}}` are
//! literal braces.

use regex::Regex;
use thiserror::Error;

use super::PathMatch;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Unbalanced '{brace}' at offset {offset} in template")]
    UnbalancedBrace { brace: char, offset: usize },

    #[error("Unknown conversion '{conversion}' for field '{field}' (expected u, l or c)")]
    UnknownConversion { field: String, conversion: String },

    #[error("Template references missing field '{0}'")]
    MissingField(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    Upper,
    Lower,
    Capitalize,
}

impl Conversion {
    fn parse(field: &str, letter: &str) -> Result<Self, TemplateError> {
        match letter {
            "u" => Ok(Conversion::Upper),
            "l" => Ok(Conversion::Lower),
            "c" => Ok(Conversion::Capitalize),
            _ => Err(TemplateError::UnknownConversion {
                field: field.to_string(),
                conversion: letter.to_string(),
            }),
        }
    }

    pub fn apply(&self, value: &str) -> String {
        match self {
            Conversion::Upper => value.to_uppercase(),
            Conversion::Lower => value.to_lowercase(),
            Conversion::Capitalize => {
                let mut chars = value.chars();
                match chars.next() {
                    Some(first) => first
                        .to_uppercase()
                        .chain(chars.flat_map(char::to_lowercase))
                        .collect(),
                    None => String::new(),
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum FieldRef {
    Index(usize),
    Name(String),
}

impl std::fmt::Display for FieldRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldRef::Index(i) => write!(f, "{}", i),
            FieldRef::Name(n) => write!(f, "{}", n),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Literal(String),
    Field {
        field: FieldRef,
        conversion: Option<Conversion>,
    },
}

/// A parsed rename template
#[derive(Debug, Clone)]
pub struct Template {
    source: String,
    pieces: Vec<Piece>,
}

impl Template {
    pub fn parse(text: &str) -> Result<Self, TemplateError> {
        let mut pieces = Vec::new();
        let mut literal = String::new();
        let mut next_auto = 1;
        let mut chars = text.char_indices().peekable();

        while let Some((offset, c)) = chars.next() {
            match c {
                '{' if matches!(chars.peek(), Some((_, '{'))) => {
                    chars.next();
                    literal.push('{');
                }
                '}' if matches!(chars.peek(), Some((_, '}'))) => {
                    chars.next();
                    literal.push('}');
                }
                '}' => return Err(TemplateError::UnbalancedBrace { brace: '}', offset }),
                '{' => {
                    let mut body = String::new();
                    let mut closed = false;
                    for (_, c) in chars.by_ref() {
                        match c {
                            '}' => {
                                closed = true;
                                break;
                            }
                            '{' => return Err(TemplateError::UnbalancedBrace { brace: '{', offset }),
                            _ => body.push(c),
                        }
                    }
                    if !closed {
                        return Err(TemplateError::UnbalancedBrace { brace: '{', offset });
                    }

                    if !literal.is_empty() {
                        pieces.push(Piece::Literal(std::mem::take(&mut literal)));
                    }
                    pieces.push(parse_field(&body, &mut next_auto)?);
                }
                _ => literal.push(c),
            }
        }

        if !literal.is_empty() {
            pieces.push(Piece::Literal(literal));
        }

        Ok(Self {
            source: text.to_string(),
            pieces,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Expand the template against a match produced by `pattern`.
    ///
    /// Groups that exist in the pattern but did not participate in the match
    /// expand to an empty string.
    pub fn expand(&self, pattern: &Regex, matched: &PathMatch) -> Result<String, TemplateError> {
        let mut out = String::new();

        for piece in &self.pieces {
            match piece {
                Piece::Literal(text) => out.push_str(text),
                Piece::Field { field, conversion } => {
                    let index = match field {
                        FieldRef::Index(i) if *i < pattern.captures_len() => *i,
                        FieldRef::Name(name) => pattern
                            .capture_names()
                            .position(|n| n == Some(name.as_str()))
                            .ok_or_else(|| TemplateError::MissingField(field.to_string()))?,
                        _ => return Err(TemplateError::MissingField(field.to_string())),
                    };

                    let value = matched.group(index).unwrap_or("");
                    match conversion {
                        Some(conv) => out.push_str(&conv.apply(value)),
                        None => out.push_str(value),
                    }
                }
            }
        }

        Ok(out)
    }
}

fn parse_field(body: &str, next_auto: &mut usize) -> Result<Piece, TemplateError> {
    let (name, conversion) = match body.find(['!', ':']) {
        Some(split) => (&body[..split], Some(&body[split + 1..])),
        None => (body, None),
    };

    let field = if name.is_empty() {
        let index = *next_auto;
        *next_auto += 1;
        FieldRef::Index(index)
    } else if let Ok(index) = name.parse::<usize>() {
        FieldRef::Index(index)
    } else {
        FieldRef::Name(name.to_string())
    };

    let conversion = match conversion {
        Some(letter) => Some(Conversion::parse(name, letter)?),
        None => None,
    };

    Ok(Piece::Field { field, conversion })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand(pattern: &str, template: &str, subject: &str) -> Result<String, TemplateError> {
        let regex = Regex::new(pattern).unwrap();
        let matched = PathMatch::search(&regex, subject.to_string()).unwrap();
        Template::parse(template).unwrap().expand(&regex, &matched)
    }

    #[test]
    fn test_named_field_with_upper_conversion() {
        assert_eq!(
            expand(r"(?P<n>.*)\.txt", "{n:u}.md", "notes.txt").unwrap(),
            "NOTES.md"
        );
        assert_eq!(
            expand(r"(?P<n>.*)\.txt", "{n!u}.md", "notes.txt").unwrap(),
            "NOTES.md"
        );
    }

    #[test]
    fn test_positional_fields() {
        assert_eq!(
            expand(r"(\w+)-(\d+)", "{2}_{1}", "track-07").unwrap(),
            "07_track"
        );
        assert_eq!(expand(r"(\w+)-(\d+)", "{0}!", "track-07").unwrap(), "track-07!");
    }

    #[test]
    fn test_auto_numbered_fields() {
        assert_eq!(expand(r"(\w+)-(\d+)", "{}.{}", "track-07").unwrap(), "track.07");
    }

    #[test]
    fn test_lower_and_capitalize() {
        assert_eq!(
            expand(r"(?P<a>\w+) (?P<b>\w+)", "{a:l} {b:c}", "HELLO wORLD").unwrap(),
            "hello World"
        );
    }

    #[test]
    fn test_unmatched_optional_group_is_empty() {
        assert_eq!(
            expand(r"(?P<stem>\w+)(?P<tag>_v\d)?\.txt", "{stem}{tag}.md", "report.txt").unwrap(),
            "report.md"
        );
    }

    #[test]
    fn test_escaped_braces() {
        assert_eq!(expand(r"(\w+)", "{{{1}}}", "x").unwrap(), "{x}");
    }

    #[test]
    fn test_missing_named_field() {
        let result = expand(r"(?P<n>\w+)", "{other}", "abc");
        assert_eq!(result, Err(TemplateError::MissingField("other".to_string())));
    }

    #[test]
    fn test_missing_positional_field() {
        let result = expand(r"(\w+)", "{3}", "abc");
        assert_eq!(result, Err(TemplateError::MissingField("3".to_string())));
    }

    #[test]
    fn test_unbalanced_braces_rejected() {
        assert!(matches!(
            Template::parse("{n"),
            Err(TemplateError::UnbalancedBrace { brace: '{', .. })
        ));
        assert!(matches!(
            Template::parse("n}"),
            Err(TemplateError::UnbalancedBrace { brace: '}', .. })
        ));
    }

    #[test]
    fn test_unknown_conversion_rejected() {
        assert!(matches!(
            Template::parse("{n:x}"),
            Err(TemplateError::UnknownConversion { .. })
        ));
    }

    #[test]
    fn test_expansion_is_repeatable() {
        let regex = Regex::new(r"(?P<n>.*)\.txt").unwrap();
        let matched = PathMatch::search(&regex, "notes.txt".to_string()).unwrap();
        let template = Template::parse("{n:c}.md").unwrap();

        let first = template.expand(&regex, &matched).unwrap();
        let second = template.expand(&regex, &matched).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, "Notes.md");
    }
}
