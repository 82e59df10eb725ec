//! Non-fatal findings about a parsed rule.

use crate::identity::{NodeId, walk};
use crate::node::Node;
use crate::operator::Operator;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdvisoryKind {
    Arity,
    UnknownOperator,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Advisory {
    pub id: NodeId,
    pub kind: AdvisoryKind,
    pub message: String,
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.id, self.message)
    }
}

/// Report operand-count mismatches and unrecognized tags, in pre-order.
pub fn advise(node: &Node, prefix: &str) -> Vec<Advisory> {
    let mut out = Vec::new();
    walk(node, prefix, &mut |id, node| {
        let finding = match node {
            Node::Var(var) => check(id, &Operator::Var, var.operands.len()),
            Node::Operation(operation) => check(id, &operation.op, operation.operands.len()),
            _ => None,
        };
        out.extend(finding);
    });
    for advisory in &out {
        tracing::debug!(id = %advisory.id, kind = ?advisory.kind, "{}", advisory.message);
    }
    out
}

fn check(id: &NodeId, op: &Operator, count: usize) -> Option<Advisory> {
    if !op.is_known() {
        return Some(Advisory {
            id: id.clone(),
            kind: AdvisoryKind::UnknownOperator,
            message: format!("unknown operator \"{}\"; it evaluates to null", op.tag()),
        });
    }
    let arity = op.arity();
    (!arity.accepts(count)).then(|| Advisory {
        id: id.clone(),
        kind: AdvisoryKind::Arity,
        message: format!("\"{}\" expects {arity} operands, got {count}", op.tag()),
    })
}
