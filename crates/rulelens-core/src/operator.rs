//! Operator table shared by every traversal.
//!
//! Identity assignment, the visualization builder, the evaluator and the
//! translator all consult [`Operator::shape`] to decide how operands are
//! walked, so the four can never disagree about which operands are children.
//!
//! | tag | shape | arity | phrase |
//! |---|---|---|---|
//! | `and` / `or` | logical | 1.. | `AND` / `OR` |
//! | `not` | negation | 1 | `NOT` |
//! | `if` | conditional | 2.. | `IF` |
//! | comparisons, `in`, `nin` | generic | 2 (`<`,`<=`: 2..3) | `is greater than`, ... |
//! | arithmetic, `min`, `max` | generic | 1.. (`/`,`%`: 2) | `plus`, `minimum of`, ... |
//! | `var` | generic | 1..2 | `variable` |
//! | anything else | generic | any | opaque |

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operator {
    And,
    Or,
    Not,
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    Nin,
    Missing,
    MissingSome,
    All,
    SomeOf,
    NoneOf,
    Merge,
    Cat,
    Substr,
    Log,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Min,
    Max,
    If,
    Var,
    /// Unrecognized tag, kept verbatim so rendering can stay total.
    Opaque(String),
}

/// How an operator's operands are walked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Every operand is a child at its index.
    Logical,
    /// The single operand is the child, labelled `content`.
    Negation,
    /// Non-literal operands are children at their index; a single
    /// non-array operand sits directly under the operator.
    Generic,
}

/// Advisory operand count. Violations are reported, never rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    Range(usize, usize),
    AtLeast(usize),
    Any,
}

impl Arity {
    pub fn accepts(self, n: usize) -> bool {
        match self {
            Arity::Exact(k) => n == k,
            Arity::Range(lo, hi) => (lo..=hi).contains(&n),
            Arity::AtLeast(k) => n >= k,
            Arity::Any => true,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(k) => write!(f, "exactly {k}"),
            Arity::Range(lo, hi) => write!(f, "{lo} to {hi}"),
            Arity::AtLeast(k) => write!(f, "at least {k}"),
            Arity::Any => f.write_str("any number of"),
        }
    }
}

impl Operator {
    /// Every recognized operator, in table order.
    pub const KNOWN: [Operator; 29] = [
        Operator::And,
        Operator::Or,
        Operator::Not,
        Operator::Eq,
        Operator::Neq,
        Operator::Gt,
        Operator::Gte,
        Operator::Lt,
        Operator::Lte,
        Operator::In,
        Operator::Nin,
        Operator::Missing,
        Operator::MissingSome,
        Operator::All,
        Operator::SomeOf,
        Operator::NoneOf,
        Operator::Merge,
        Operator::Cat,
        Operator::Substr,
        Operator::Log,
        Operator::Add,
        Operator::Sub,
        Operator::Mul,
        Operator::Div,
        Operator::Mod,
        Operator::Min,
        Operator::Max,
        Operator::If,
        Operator::Var,
    ];

    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "and" => Operator::And,
            "or" => Operator::Or,
            "not" => Operator::Not,
            "==" => Operator::Eq,
            "!=" => Operator::Neq,
            ">" => Operator::Gt,
            ">=" => Operator::Gte,
            "<" => Operator::Lt,
            "<=" => Operator::Lte,
            "in" => Operator::In,
            "nin" => Operator::Nin,
            "missing" => Operator::Missing,
            "missing_some" => Operator::MissingSome,
            "all" => Operator::All,
            "some" => Operator::SomeOf,
            "none" => Operator::NoneOf,
            "merge" => Operator::Merge,
            "cat" => Operator::Cat,
            "substr" => Operator::Substr,
            "log" => Operator::Log,
            "+" => Operator::Add,
            "-" => Operator::Sub,
            "*" => Operator::Mul,
            "/" => Operator::Div,
            "%" => Operator::Mod,
            "min" => Operator::Min,
            "max" => Operator::Max,
            "if" => Operator::If,
            "var" => Operator::Var,
            other => Operator::Opaque(other.to_string()),
        }
    }

    pub fn tag(&self) -> &str {
        match self {
            Operator::And => "and",
            Operator::Or => "or",
            Operator::Not => "not",
            Operator::Eq => "==",
            Operator::Neq => "!=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::In => "in",
            Operator::Nin => "nin",
            Operator::Missing => "missing",
            Operator::MissingSome => "missing_some",
            Operator::All => "all",
            Operator::SomeOf => "some",
            Operator::NoneOf => "none",
            Operator::Merge => "merge",
            Operator::Cat => "cat",
            Operator::Substr => "substr",
            Operator::Log => "log",
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::Mod => "%",
            Operator::Min => "min",
            Operator::Max => "max",
            Operator::If => "if",
            Operator::Var => "var",
            Operator::Opaque(tag) => tag,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Operator::Opaque(_))
    }

    pub fn shape(&self) -> Shape {
        match self {
            Operator::And | Operator::Or => Shape::Logical,
            Operator::Not => Shape::Negation,
            _ => Shape::Generic,
        }
    }

    pub fn arity(&self) -> Arity {
        match self {
            Operator::And | Operator::Or => Arity::AtLeast(1),
            Operator::Not | Operator::Log => Arity::Exact(1),
            Operator::Eq | Operator::Neq | Operator::Gt | Operator::Gte => Arity::Exact(2),
            Operator::Lt | Operator::Lte => Arity::Range(2, 3),
            Operator::In | Operator::Nin => Arity::Exact(2),
            Operator::Missing => Arity::AtLeast(1),
            Operator::MissingSome => Arity::Exact(2),
            Operator::All | Operator::SomeOf | Operator::NoneOf => Arity::Exact(2),
            Operator::Merge | Operator::Cat => Arity::Any,
            Operator::Substr => Arity::Range(2, 3),
            Operator::Add | Operator::Mul | Operator::Min | Operator::Max => Arity::AtLeast(1),
            Operator::Sub => Arity::Range(1, 2),
            Operator::Div | Operator::Mod => Arity::Exact(2),
            Operator::If => Arity::AtLeast(2),
            Operator::Var => Arity::Range(1, 2),
            Operator::Opaque(_) => Arity::Any,
        }
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Operator::Eq
                | Operator::Neq
                | Operator::Gt
                | Operator::Gte
                | Operator::Lt
                | Operator::Lte
        )
    }

    /// English connective used by the translator. `None` for opaque tags.
    pub fn phrase(&self) -> Option<&'static str> {
        let phrase = match self {
            Operator::And => "AND",
            Operator::Or => "OR",
            Operator::Not => "NOT",
            Operator::Eq => "equals",
            Operator::Neq => "does not equal",
            Operator::Gt => "is greater than",
            Operator::Gte => "is greater than or equal to",
            Operator::Lt => "is less than",
            Operator::Lte => "is less than or equal to",
            Operator::In => "is in",
            Operator::Nin => "is not in",
            Operator::Missing => "is missing",
            Operator::MissingSome => "is missing some of",
            Operator::All => "all",
            Operator::SomeOf => "some",
            Operator::NoneOf => "none",
            Operator::Merge => "combine",
            Operator::Cat => "concatenate",
            Operator::Substr => "substring",
            Operator::Log => "log",
            Operator::Add => "plus",
            Operator::Sub => "minus",
            Operator::Mul => "times",
            Operator::Div => "divided by",
            Operator::Mod => "modulo",
            Operator::Min => "minimum of",
            Operator::Max => "maximum of",
            Operator::If => "IF",
            Operator::Var => "variable",
            Operator::Opaque(_) => return None,
        };
        Some(phrase)
    }

    /// Section label for the visualization tree.
    pub fn label(&self) -> String {
        match self {
            Operator::If => "IF-THEN-ELSE".to_string(),
            other => other.tag().to_uppercase(),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_tags_round_trip() {
        for op in Operator::KNOWN.iter() {
            assert_eq!(&Operator::from_tag(op.tag()), op);
            assert!(op.is_known());
        }
    }

    #[test]
    fn unknown_tag_is_opaque() {
        let op = Operator::from_tag("regex_match");
        assert_eq!(op, Operator::Opaque("regex_match".into()));
        assert_eq!(op.tag(), "regex_match");
        assert_eq!(op.shape(), Shape::Generic);
        assert!(op.phrase().is_none());
        assert_eq!(op.label(), "REGEX_MATCH");
    }

    #[test]
    fn shapes_follow_operator_family() {
        assert_eq!(Operator::And.shape(), Shape::Logical);
        assert_eq!(Operator::Or.shape(), Shape::Logical);
        assert_eq!(Operator::Not.shape(), Shape::Negation);
        assert_eq!(Operator::Gt.shape(), Shape::Generic);
    }

    #[test]
    fn arity_is_advisory_range() {
        assert!(Operator::Gt.arity().accepts(2));
        assert!(!Operator::Gt.arity().accepts(1));
        assert!(Operator::Lt.arity().accepts(3));
        assert!(Operator::Merge.arity().accepts(0));
        assert_eq!(Operator::Sub.arity().to_string(), "1 to 2");
    }

    #[test]
    fn labels_are_upper_cased_tags() {
        assert_eq!(Operator::And.label(), "AND");
        assert_eq!(Operator::MissingSome.label(), "MISSING_SOME");
        assert_eq!(Operator::Gte.label(), ">=");
        assert_eq!(Operator::If.label(), "IF-THEN-ELSE");
    }
}
