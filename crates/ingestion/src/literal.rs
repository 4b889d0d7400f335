//! Decoder for serialized profile strings.
//!
//! Profiles stored by the web frontend are dict-like literal strings such as
//! `{'00:00': 10, '00:15': (1.5, 2), 'filename': 'load.csv'}`. JSON is a
//! subset of what this decoder accepts.

use ecosim_core::{Error, Result};
use serde_json::{Map, Number, Value};

/// Deepest nesting of dicts and sequences accepted.
const MAX_DEPTH: usize = 128;

/// A decoded literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// List or tuple.
    Seq(Vec<Literal>),
    /// Dict entries in source order.
    Dict(Vec<(Literal, Literal)>),
}

impl Literal {
    /// Convert to a JSON value. Dict keys are stringified.
    pub fn to_json(&self) -> Value {
        match self {
            Literal::None => Value::Null,
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Int(i) => Value::Number((*i).into()),
            Literal::Float(f) => Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
            Literal::Str(s) => Value::String(s.clone()),
            Literal::Seq(items) => Value::Array(items.iter().map(Literal::to_json).collect()),
            Literal::Dict(entries) => {
                let map: Map<String, Value> = entries
                    .iter()
                    .map(|(k, v)| (k.key_string(), v.to_json()))
                    .collect();
                Value::Object(map)
            }
        }
    }

    fn key_string(&self) -> String {
        match self {
            Literal::Str(s) => s.clone(),
            other => other.to_json().to_string(),
        }
    }
}

/// Decode a complete literal string.
pub fn parse_literal(input: &str) -> Result<Literal> {
    let mut parser = Parser {
        src: input,
        pos: 0,
        depth: 0,
    };
    let value = parser.value()?;
    parser.skip_whitespace();
    if parser.pos != input.len() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(value)
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    /// Open dicts and sequences around the current position.
    depth: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    fn error(&self, msg: &str) -> Error {
        Error::profile_format(format!("malformed profile string at offset {}: {msg}", self.pos))
    }

    fn expect(&mut self, expected: char) -> Result<()> {
        self.skip_whitespace();
        match self.bump() {
            Some(c) if c == expected => Ok(()),
            Some(c) => Err(self.error(&format!("expected {expected:?}, found {c:?}"))),
            None => Err(self.error(&format!("expected {expected:?}, found end of input"))),
        }
    }

    fn value(&mut self) -> Result<Literal> {
        self.skip_whitespace();
        match self.peek() {
            Some('{') => self.nested(Self::dict),
            Some('[') => self.nested(|p| p.seq('[', ']')),
            Some('(') => self.nested(|p| p.seq('(', ')')),
            Some(q @ ('\'' | '"')) => self.string(q).map(Literal::Str),
            Some(c) if c.is_ascii_digit() || matches!(c, '-' | '+' | '.') => self.number(),
            Some(c) if c.is_alphabetic() => self.identifier(),
            Some(c) => Err(self.error(&format!("unexpected character {c:?}"))),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn nested(&mut self, parse: impl FnOnce(&mut Self) -> Result<Literal>) -> Result<Literal> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error("nesting too deep"));
        }
        self.depth += 1;
        let value = parse(self);
        self.depth -= 1;
        value
    }

    fn dict(&mut self) -> Result<Literal> {
        self.expect('{')?;
        let mut entries = Vec::new();
        loop {
            self.skip_whitespace();
            if self.peek() == Some('}') {
                self.bump();
                break;
            }
            let key = self.value()?;
            self.expect(':')?;
            let value = self.value()?;
            entries.push((key, value));
            self.skip_whitespace();
            match self.bump() {
                Some(',') => continue,
                Some('}') => break,
                _ => return Err(self.error("expected ',' or '}' in dict")),
            }
        }
        Ok(Literal::Dict(entries))
    }

    fn seq(&mut self, open: char, close: char) -> Result<Literal> {
        self.expect(open)?;
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            if self.peek() == Some(close) {
                self.bump();
                break;
            }
            items.push(self.value()?);
            self.skip_whitespace();
            match self.bump() {
                Some(',') => continue,
                Some(c) if c == close => break,
                _ => return Err(self.error(&format!("expected ',' or {close:?}"))),
            }
        }
        Ok(Literal::Seq(items))
    }

    fn string(&mut self, quote: char) -> Result<String> {
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some(c) => out.push(c),
                    None => return Err(self.error("unterminated escape")),
                },
                Some(c) if c == quote => return Ok(out),
                Some(c) => out.push(c),
                None => return Err(self.error("unterminated string")),
            }
        }
    }

    fn number(&mut self) -> Result<Literal> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E' | '_'))
        {
            self.bump();
        }
        let text: String = self.src[start..self.pos].chars().filter(|&c| c != '_').collect();
        let is_float = text.contains(['.', 'e', 'E']);
        if !is_float {
            if let Ok(i) = text.parse::<i64>() {
                return Ok(Literal::Int(i));
            }
        }
        text.parse::<f64>()
            .map(Literal::Float)
            .map_err(|_| self.error(&format!("invalid number {text:?}")))
    }

    fn identifier(&mut self) -> Result<Literal> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
            self.bump();
        }
        match &self.src[start..self.pos] {
            "None" | "null" => Ok(Literal::None),
            "True" | "true" => Ok(Literal::Bool(true)),
            "False" | "false" => Ok(Literal::Bool(false)),
            other => Err(self.error(&format!("unknown identifier {other:?}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_python_style_dict() {
        let lit = parse_literal("{'00:00': 10, \"00:15\": 2.5, 'filename': 'load.csv'}").unwrap();
        assert_eq!(
            lit,
            Literal::Dict(vec![
                (Literal::Str("00:00".into()), Literal::Int(10)),
                (Literal::Str("00:15".into()), Literal::Float(2.5)),
                (Literal::Str("filename".into()), Literal::Str("load.csv".into())),
            ])
        );
    }

    #[test]
    fn test_tuples_and_trailing_commas() {
        let lit = parse_literal("{0: (1, -2.5e1), 1: (3,),}").unwrap();
        let Literal::Dict(entries) = lit else {
            panic!("expected dict");
        };
        assert_eq!(entries[0].1, Literal::Seq(vec![Literal::Int(1), Literal::Float(-25.0)]));
        assert_eq!(entries[1].1, Literal::Seq(vec![Literal::Int(3)]));
    }

    #[test]
    fn test_bare_number() {
        assert_eq!(parse_literal(" 30.4 ").unwrap(), Literal::Float(30.4));
        assert_eq!(parse_literal("-7").unwrap(), Literal::Int(-7));
    }

    #[test]
    fn test_identifiers() {
        let lit = parse_literal("[None, True, false]").unwrap();
        assert_eq!(
            lit,
            Literal::Seq(vec![Literal::None, Literal::Bool(true), Literal::Bool(false)])
        );
    }

    #[test]
    fn test_to_json() {
        let lit = parse_literal("{'a': (1, 2.5), 'b': None}").unwrap();
        assert_eq!(lit.to_json(), serde_json::json!({"a": [1, 2.5], "b": null}));
    }

    #[test]
    fn test_nesting_depth_limited() {
        let deep = "[".repeat(200_000) + &"]".repeat(200_000);
        let result = parse_literal(&deep);
        assert!(
            matches!(&result, Err(Error::ProfileFormat(msg)) if msg.contains("nesting too deep")),
            "got {result:?}"
        );

        let shallow = "[".repeat(MAX_DEPTH) + &"]".repeat(MAX_DEPTH);
        assert!(parse_literal(&shallow).is_ok());
    }

    #[test]
    fn test_malformed_inputs() {
        for input in ["{'a': 1", "{'a' 1}", "'open", "{1: 2} extra", "nan?", ""] {
            let result = parse_literal(input);
            assert!(
                matches!(result, Err(Error::ProfileFormat(_))),
                "input {input:?} gave {result:?}"
            );
        }
    }
}
