//! Schema text and its structured form.
//!
//! Producers emit schema text as `{name: type, name: type}`; nested schemas
//! sit in the type position as `{...}` (bag) or `(...)` (tuple), optionally
//! prefixed with `bag` / `tuple`. Dots in names are rewritten to underscores
//! before emission, so consumers never see them.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaElement {
    pub alias: Option<String>,
    #[serde(rename = "type")]
    pub type_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Vec<SchemaElement>>,
}

impl SchemaElement {
    pub fn new(alias: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            alias: Some(alias.into()),
            type_name: Some(type_name.into()),
            schema: None,
        }
    }

    pub fn with_schema(mut self, schema: Vec<SchemaElement>) -> Self {
        self.schema = Some(schema);
        self
    }
}

/// Rewrite dots to underscores, the normalization every emitted schema
/// string goes through.
pub fn normalize_schema_text(text: &str) -> String {
    text.replace('.', "_")
}

/// Parse schema text into structured elements. The text is normalized first.
pub fn parse_schema(text: &str) -> Result<Vec<SchemaElement>> {
    let normalized = normalize_schema_text(text.trim());
    let mut p = Parser {
        chars: normalized.chars().collect(),
        pos: 0,
    };
    let elements = match p.peek() {
        Some('{') => p.nested('{', '}')?,
        Some('(') => p.nested('(', ')')?,
        Some(_) => p.fields(None)?,
        None => Vec::new(),
    };
    p.skip_ws();
    if p.pos != p.chars.len() {
        return Err(Error::Schema(format!(
            "trailing input at offset {} in {:?}",
            p.pos, normalized
        )));
    }
    Ok(elements)
}

/// Render structured elements back to canonical schema text.
pub fn render_schema(elements: &[SchemaElement]) -> String {
    format!("{{{}}}", render_fields(elements))
}

fn render_fields(elements: &[SchemaElement]) -> String {
    elements
        .iter()
        .map(|e| {
            let ty = e.type_name.as_deref().unwrap_or("bytearray");
            let body = match (&e.schema, ty) {
                (Some(inner), "tuple") => format!("tuple({})", render_fields(inner)),
                (Some(inner), _) => format!("{ty}{{{}}}", render_fields(inner)),
                (None, _) => ty.to_string(),
            };
            match &e.alias {
                Some(a) => format!("{a}: {body}"),
                None => body,
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, c: char) -> Result<()> {
        self.skip_ws();
        match self.peek() {
            Some(got) if got == c => {
                self.pos += 1;
                Ok(())
            }
            got => Err(Error::Schema(format!(
                "expected {c:?} at offset {}, found {got:?}",
                self.pos
            ))),
        }
    }

    fn ident(&mut self) -> Option<String> {
        self.skip_ws();
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || matches!(c, '_' | '$' | '#' | '@' | '-'))
        {
            self.pos += 1;
        }
        (self.pos > start).then(|| self.chars[start..self.pos].iter().collect())
    }

    fn nested(&mut self, open: char, close: char) -> Result<Vec<SchemaElement>> {
        self.expect(open)?;
        let fields = self.fields(Some(close))?;
        self.expect(close)?;
        Ok(fields)
    }

    fn fields(&mut self, close: Option<char>) -> Result<Vec<SchemaElement>> {
        let mut out = Vec::new();
        self.skip_ws();
        if self.peek() == close {
            return Ok(out);
        }
        loop {
            out.push(self.field()?);
            self.skip_ws();
            if self.peek() == Some(',') {
                self.pos += 1;
            } else {
                return Ok(out);
            }
        }
    }

    fn field(&mut self) -> Result<SchemaElement> {
        self.skip_ws();
        let mut element = SchemaElement::default();
        let checkpoint = self.pos;
        if let Some(name) = self.ident() {
            self.skip_ws();
            if self.peek() == Some(':') {
                self.pos += 1;
                element.alias = Some(name);
            } else {
                self.pos = checkpoint;
            }
        }
        self.skip_ws();
        match self.peek() {
            Some('{') => {
                element.type_name = Some("bag".into());
                element.schema = Some(self.nested('{', '}')?);
            }
            Some('(') => {
                element.type_name = Some("tuple".into());
                element.schema = Some(self.nested('(', ')')?);
            }
            _ => {
                let ty = self.ident().ok_or_else(|| {
                    Error::Schema(format!("expected a type at offset {}", self.pos))
                })?;
                self.skip_ws();
                match (ty.as_str(), self.peek()) {
                    ("bag", Some('{')) => element.schema = Some(self.nested('{', '}')?),
                    ("tuple", Some('(')) => element.schema = Some(self.nested('(', ')')?),
                    (_, Some('[')) => self.skip_balanced('[', ']')?,
                    (_, Some('(')) => self.skip_balanced('(', ')')?,
                    _ => {}
                }
                element.type_name = Some(ty);
            }
        }
        Ok(element)
    }

    // Type parameters we do not model (`map[int]`, `decimal(10,2)`).
    fn skip_balanced(&mut self, open: char, close: char) -> Result<()> {
        self.expect(open)?;
        let mut depth = 1usize;
        while let Some(c) = self.peek() {
            self.pos += 1;
            if c == open {
                depth += 1;
            } else if c == close {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
        }
        Err(Error::Schema(format!("unbalanced {open:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flat_schema() {
        let s = parse_schema("{id: int, name: chararray}").unwrap();
        assert_eq!(
            s,
            vec![
                SchemaElement::new("id", "int"),
                SchemaElement::new("name", "chararray")
            ]
        );
    }

    #[test]
    fn parses_nested_bag_of_tuples_and_rewrites_dots() {
        let s = parse_schema("{group: chararray, a.b: {(x: int, y: map[])}}").unwrap();
        assert_eq!(s.len(), 2);
        assert_eq!(s[1].alias.as_deref(), Some("a_b"));
        assert_eq!(s[1].type_name.as_deref(), Some("bag"));
        let inner = s[1].schema.as_ref().unwrap();
        assert_eq!(inner[0].type_name.as_deref(), Some("tuple"));
        let tuple_fields = inner[0].schema.as_ref().unwrap();
        assert_eq!(tuple_fields[1], SchemaElement::new("y", "map"));
    }

    #[test]
    fn renders_canonical_text() {
        let s = parse_schema("{a: int,b: bag{t: tuple(c: long)}}").unwrap();
        assert_eq!(render_schema(&s), "{a: int, b: bag{t: tuple(c: long)}}");
    }

    #[test]
    fn rejects_unbalanced_text() {
        assert!(parse_schema("{a: int").is_err());
        assert!(parse_schema("{a: }").is_err());
    }

    #[test]
    fn empty_schema() {
        assert!(parse_schema("{}").unwrap().is_empty());
        assert!(parse_schema("").unwrap().is_empty());
    }
}
