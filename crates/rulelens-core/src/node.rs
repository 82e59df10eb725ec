//! Typed expression tree.
//!
//! A parsed tree is immutable: traversals borrow it and keep their results
//! (identifiers, sections, values) in side structures.

use crate::operator::{Operator, Shape};
use serde::Serialize;
use serde_json::{Map, Value};

/// Deepest node position accepted by the parser and the evaluator.
pub const DEFAULT_MAX_DEPTH: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// JSON scalar, or an array containing no objects at any depth.
    Literal(Value),
    /// `{"var": path}` / `{"var": [path, default]}`.
    Var(VarRef),
    /// Any other single-key object, including unrecognized tags.
    Operation(Operation),
    /// Explicit `{"if": [...]}` or the bare `[condition, then, else]` shorthand.
    Conditional(Box<Conditional>),
    /// Array mixing expressions with values; evaluated element-wise.
    List(Vec<Node>),
}

/// Whether the operator's JSON value was an array (`List`) or one bare value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandForm {
    List,
    Single,
}

/// Operator applied to its operands. Never `var` or `if`: those are built as
/// [`Node::Var`] and [`Node::Conditional`] by [`Node::operation`].
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub(crate) op: Operator,
    pub(crate) operands: Vec<Node>,
    pub(crate) form: OperandForm,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarRef {
    pub operands: Vec<Node>,
    pub form: OperandForm,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Conditional {
    pub condition: Node,
    pub then: Node,
    pub otherwise: Option<Node>,
}

/// Edge label between a node and one of its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Branch {
    Condition,
    Then,
    Else,
    /// Operand of `not`.
    Content,
    Index(usize),
    /// The lone operand of a non-array operator value; adds no path segment.
    Direct,
}

impl Branch {
    pub fn segment(self) -> Option<String> {
        match self {
            Branch::Condition => Some("condition".into()),
            Branch::Then => Some("then".into()),
            Branch::Else => Some("else".into()),
            Branch::Content => Some("content".into()),
            Branch::Index(i) => Some(i.to_string()),
            Branch::Direct => None,
        }
    }

    /// Caption shown next to a child in the visualization tree.
    pub fn caption(self) -> Option<&'static str> {
        match self {
            Branch::Condition => Some("IF"),
            Branch::Then => Some("THEN"),
            Branch::Else => Some("ELSE"),
            _ => None,
        }
    }
}

impl VarRef {
    /// Path operand; `None` means the whole data context.
    pub fn path(&self) -> Option<&Node> {
        self.operands.first()
    }

    pub fn default(&self) -> Option<&Node> {
        match self.form {
            OperandForm::List => self.operands.get(1),
            OperandForm::Single => None,
        }
    }

    /// Path as written, when it is a literal rather than a computed expression.
    pub fn static_path(&self) -> Option<String> {
        match self.path() {
            None => Some(String::new()),
            Some(Node::Literal(Value::String(s))) => Some(s.clone()),
            Some(Node::Literal(Value::Number(n))) => Some(n.to_string()),
            Some(Node::Literal(Value::Null)) => Some(String::new()),
            Some(_) => None,
        }
    }
}

impl Operation {
    pub fn op(&self) -> &Operator {
        &self.op
    }

    pub fn operands(&self) -> &[Node] {
        &self.operands
    }

    pub fn form(&self) -> OperandForm {
        self.form
    }

    pub fn operand(&self, index: usize) -> Option<&Node> {
        self.operands.get(index)
    }
}

impl Node {
    pub fn literal(value: impl Into<Value>) -> Self {
        Node::Literal(value.into())
    }

    /// Node for `{tag: operands}`.
    ///
    /// `var` becomes [`Node::Var`]. `if` becomes a [`Node::Conditional`], with
    /// `[c1, t1, c2, t2, ..., else]` chains nested in the else branch.
    pub fn operation(op: Operator, operands: Vec<Node>, form: OperandForm) -> Self {
        match op {
            Operator::Var => Node::Var(VarRef { operands, form }),
            Operator::If => conditional_chain(operands),
            op => Node::Operation(Operation { op, operands, form }),
        }
    }

    /// Operator tag under which this node is identified, if any.
    pub fn tag(&self) -> Option<&str> {
        match self {
            Node::Var(_) => Some(Operator::Var.tag()),
            Node::Operation(op) => Some(op.op.tag()),
            Node::Conditional(_) => Some(Operator::If.tag()),
            Node::Literal(_) | Node::List(_) => None,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Node::Literal(_))
    }

    /// Children in traversal order, each with the branch that reaches it.
    ///
    /// This is the single recursion shape shared by identity assignment and
    /// the visualization builder.
    pub fn children(&self) -> Vec<(Branch, &Node)> {
        match self {
            Node::Literal(_) => Vec::new(),
            Node::Var(var) => operand_children(Shape::Generic, &var.operands, var.form),
            Node::Operation(op) => operand_children(op.op.shape(), &op.operands, op.form),
            Node::Conditional(cond) => {
                let mut out = vec![(Branch::Condition, &cond.condition), (Branch::Then, &cond.then)];
                if let Some(otherwise) = &cond.otherwise {
                    out.push((Branch::Else, otherwise));
                }
                out
            }
            Node::List(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| (Branch::Index(i), item))
                .collect(),
        }
    }

    /// Canonical JSON form. Shorthand conditionals come back as explicit `if`.
    pub fn to_value(&self) -> Value {
        match self {
            Node::Literal(v) => v.clone(),
            Node::Var(var) => single_key(Operator::Var.tag(), operands_value(&var.operands, var.form)),
            Node::Operation(op) => single_key(op.op.tag(), operands_value(&op.operands, op.form)),
            Node::Conditional(cond) => {
                let mut args = vec![cond.condition.to_value(), cond.then.to_value()];
                if let Some(otherwise) = &cond.otherwise {
                    args.push(otherwise.to_value());
                }
                single_key(Operator::If.tag(), Value::Array(args))
            }
            Node::List(items) => Value::Array(items.iter().map(Node::to_value).collect()),
        }
    }

    /// Distance from this node to its deepest descendant; 0 for a leaf.
    pub fn depth(&self) -> usize {
        self.children()
            .into_iter()
            .map(|(_, child)| child.depth() + 1)
            .max()
            .unwrap_or(0)
    }

    /// Number of nodes in the tree, this one included.
    pub fn size(&self) -> usize {
        1 + self
            .children()
            .into_iter()
            .map(|(_, child)| child.size())
            .sum::<usize>()
    }
}

fn conditional_chain(operands: Vec<Node>) -> Node {
    let mut rest = operands.into_iter();
    let condition = rest.next().unwrap_or(Node::Literal(Value::Null));
    let then = rest.next().unwrap_or(Node::Literal(Value::Null));
    let remaining: Vec<Node> = rest.collect();
    let otherwise = match remaining.len() {
        0 => None,
        1 => remaining.into_iter().next(),
        _ => Some(conditional_chain(remaining)),
    };
    Node::Conditional(Box::new(Conditional {
        condition,
        then,
        otherwise,
    }))
}

fn operand_children(shape: Shape, operands: &[Node], form: OperandForm) -> Vec<(Branch, &Node)> {
    operands
        .iter()
        .enumerate()
        .map(|(i, node)| {
            let branch = match (shape, form, i) {
                (Shape::Negation, _, 0) => Branch::Content,
                (Shape::Generic, OperandForm::Single, _) => Branch::Direct,
                _ => Branch::Index(i),
            };
            (branch, node)
        })
        .collect()
}

pub(crate) fn operands_value(operands: &[Node], form: OperandForm) -> Value {
    match form {
        OperandForm::List => Value::Array(operands.iter().map(Node::to_value).collect()),
        OperandForm::Single => operands.first().map(Node::to_value).unwrap_or(Value::Null),
    }
}

fn single_key(key: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    Value::Object(map)
}
