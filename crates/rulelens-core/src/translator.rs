//! Natural-language rendering.
//!
//! Total by construction: every node renders to some string. Absent operands
//! read as `undefined` and unknown operators fall back to `tag: <json>`.

use crate::node::{Conditional, Node, Operation, VarRef, operands_value};
use crate::operator::Operator;
use crate::value::to_display_string;
use serde_json::Value;

const UNDEFINED: &str = "undefined";

pub fn translate(node: &Node) -> String {
    match node {
        Node::Literal(value) => literal_text(value),
        Node::List(items) => joined(items, ", "),
        Node::Var(var) => var_text(var),
        Node::Conditional(cond) => conditional_text(cond),
        Node::Operation(operation) => operation_text(operation),
    }
}

fn literal_text(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{s}\""),
        Value::Array(items) => items.iter().map(literal_text).collect::<Vec<_>>().join(", "),
        Value::Object(_) => value.to_string(),
        other => to_display_string(other),
    }
}

fn joined(nodes: &[Node], separator: &str) -> String {
    nodes.iter().map(translate).collect::<Vec<_>>().join(separator)
}

fn operand(operation: &Operation, index: usize) -> String {
    operation
        .operand(index)
        .map(translate)
        .unwrap_or_else(|| UNDEFINED.to_string())
}

fn var_text(var: &VarRef) -> String {
    let subject = match var.static_path() {
        Some(path) => format!("the value of \"{path}\""),
        None => format!(
            "the value of ({})",
            var.path().map(translate).unwrap_or_else(|| UNDEFINED.to_string())
        ),
    };
    match var.default() {
        Some(default) => format!("{subject} (default {})", translate(default)),
        None => subject,
    }
}

fn conditional_text(cond: &Conditional) -> String {
    let head = format!("IF {} THEN {}", translate(&cond.condition), translate(&cond.then));
    match &cond.otherwise {
        Some(otherwise) => format!("{head} ELSE {}", translate(otherwise)),
        None => head,
    }
}

fn operation_text(operation: &Operation) -> String {
    let Some(phrase) = operation.op.phrase() else {
        return opaque_text(operation);
    };
    match &operation.op {
        Operator::And | Operator::Or => {
            format!("({})", joined(&operation.operands, &format!(" {phrase} ")))
        }
        Operator::Not => format!("NOT ({})", operand(operation, 0)),
        op if op.is_comparison() => {
            format!("{} {phrase} {}", operand(operation, 0), operand(operation, 1))
        }
        Operator::In | Operator::Nin | Operator::MissingSome => {
            format!("{} {phrase} {}", operand(operation, 0), operand(operation, 1))
        }
        Operator::Missing => format!("{} {phrase}", joined(&operation.operands, ", ")),
        Operator::All | Operator::SomeOf | Operator::NoneOf => format!(
            "{phrase} of {} satisfy {}",
            operand(operation, 0),
            operand(operation, 1)
        ),
        Operator::Merge | Operator::Cat | Operator::Log => {
            format!("{phrase} {}", joined(&operation.operands, ", "))
        }
        Operator::Substr => format!(
            "substring of {} from {} to {}",
            operand(operation, 0),
            operand(operation, 1),
            operand(operation, 2)
        ),
        Operator::Sub if operation.operands.len() == 1 => format!("{phrase} {}", operand(operation, 0)),
        Operator::Add | Operator::Sub | Operator::Mul | Operator::Div | Operator::Mod => {
            joined(&operation.operands, &format!(" {phrase} "))
        }
        Operator::Min | Operator::Max => format!("{phrase} {}", joined(&operation.operands, ", ")),
        _ => opaque_text(operation),
    }
}

fn opaque_text(operation: &Operation) -> String {
    format!(
        "{}: {}",
        operation.op.tag(),
        operands_value(&operation.operands, operation.form)
    )
}
