//! Untyped JSON to [`Node`].
//!
//! Classification rules:
//!
//! - scalars, and arrays holding no object at any depth, are literals;
//! - a 3-element array whose first element is an object is the conditional
//!   shorthand `[condition, then, else]`;
//! - an object with exactly one key is an operation (`var` and `if` get their
//!   own variants, unrecognized keys become opaque operations);
//! - objects with zero or several keys are rejected.
//!
//! Operand counts are not checked here; see [`crate::advise`].

use crate::error::{ParseError, ParseErrorKind};
use crate::node::{Conditional, DEFAULT_MAX_DEPTH, Node, OperandForm};
use crate::operator::Operator;
use serde_json::{Map, Value};

/// Parse rule text.
pub fn parse_str(text: &str) -> Result<Node, ParseError> {
    Parser::default().parse_str(text)
}

/// Parse an already-decoded JSON value.
pub fn parse_value(value: &Value) -> Result<Node, ParseError> {
    Parser::default().parse_value(value)
}

#[derive(Debug, Clone, Copy)]
pub struct Parser {
    max_depth: usize,
}

impl Default for Parser {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl Parser {
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self { max_depth }
    }

    pub fn parse_str(&self, text: &str) -> Result<Node, ParseError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|err| ParseError::invalid_json(format!("rule text is not JSON: {err}")))?;
        self.parse_value(&value)
    }

    pub fn parse_value(&self, value: &Value) -> Result<Node, ParseError> {
        let node = self.node(value, 0)?;
        // `if` chains nest deeper than the JSON they came from.
        if node.depth() > self.max_depth {
            return Err(self.too_deep());
        }
        tracing::debug!(nodes = node.size(), "parsed rule expression");
        Ok(node)
    }

    fn too_deep(&self) -> ParseError {
        ParseError::new(
            ParseErrorKind::TooDeep,
            format!("expression nesting exceeds {}", self.max_depth),
        )
    }

    fn node(&self, value: &Value, depth: usize) -> Result<Node, ParseError> {
        if depth > self.max_depth {
            return Err(self.too_deep());
        }
        match value {
            Value::Array(items) => self.array(value, items, depth),
            Value::Object(map) => self.object(value, map, depth),
            scalar => Ok(Node::Literal(scalar.clone())),
        }
    }

    fn array(&self, raw: &Value, items: &[Value], depth: usize) -> Result<Node, ParseError> {
        if items.len() == 3 && items[0].is_object() {
            return Ok(Node::Conditional(Box::new(Conditional {
                condition: self.node(&items[0], depth + 1)?,
                then: self.node(&items[1], depth + 1)?,
                otherwise: Some(self.node(&items[2], depth + 1)?),
            })));
        }
        if !contains_object(raw) {
            return Ok(Node::Literal(raw.clone()));
        }
        let nodes = items
            .iter()
            .map(|item| self.node(item, depth + 1))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Node::List(nodes))
    }

    fn object(&self, raw: &Value, map: &Map<String, Value>, depth: usize) -> Result<Node, ParseError> {
        let mut entries = map.iter();
        let (key, value) = match (entries.next(), map.len()) {
            (Some(entry), 1) => entry,
            (None, _) => {
                return Err(
                    ParseError::new(ParseErrorKind::EmptyObject, "object has no operator key").at(raw),
                );
            }
            (Some(_), n) => {
                let keys: Vec<&str> = map.keys().map(String::as_str).collect();
                return Err(ParseError::new(
                    ParseErrorKind::AmbiguousOperator,
                    format!("object has {n} keys ({}), expected exactly one operator", keys.join(", ")),
                )
                .at(raw));
            }
        };

        let (operands, form) = match value {
            Value::Array(items) => (
                items
                    .iter()
                    .map(|item| self.node(item, depth + 1))
                    .collect::<Result<Vec<_>, _>>()?,
                OperandForm::List,
            ),
            single => (vec![self.node(single, depth + 1)?], OperandForm::Single),
        };

        let op = Operator::from_tag(key);
        if !op.is_known() {
            tracing::debug!(tag = %key, "accepting unknown operator as opaque");
        }
        Ok(Node::operation(op, operands, form))
    }
}

fn contains_object(value: &Value) -> bool {
    match value {
        Value::Object(_) => true,
        Value::Array(items) => items.iter().any(contains_object),
        _ => false,
    }
}
