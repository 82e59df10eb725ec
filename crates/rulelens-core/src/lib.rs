//! RuleLens core crate.
//!
//! Parses JSON rule expressions into a typed tree and walks that tree in
//! several independent ways:
//!
//! - `parser` + `node`: untyped JSON to [`Node`], rejecting only structurally
//!   nonsensical input.
//! - `identity`: deterministic path identifiers (`root/and/0/>`) derived from
//!   tree shape alone.
//! - `evaluator`: the value of a rule against a data context.
//! - `translator`: an English sentence for a rule.
//! - `visual`: a collapsible section tree keyed by the same identifiers.
//! - `advisory`: non-fatal arity and unknown-operator findings.
//! - `generation`: prompt and response handling for an external text
//!   generator.
//! - `session`: the edit/test/generate workflow and its persisted snapshot.
//!
//! All traversals borrow an immutable tree and share one child enumeration
//! ([`Node::children`]), so identifiers, sections and advisories always agree
//! with each other for the same tree.

pub mod advisory;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod generation;
pub mod identity;
pub mod node;
pub mod operator;
pub mod parser;
pub mod session;
pub mod translator;
pub mod value;
pub mod visual;

pub use advisory::{Advisory, AdvisoryKind, advise};
pub use engine::{Engine, EngineConfig};
pub use error::{EvalError, GenerationError, ParseError, ParseErrorKind, SessionError};
pub use evaluator::{EvalResult, Evaluator, evaluate};
pub use generation::{GeneratedRule, Prompt, TextGenerator, build_prompt, extract_candidate, generate_rule};
pub use identity::{DEFAULT_PREFIX, IdentityMap, NodeId, assign};
pub use node::{Branch, Conditional, DEFAULT_MAX_DEPTH, Node, OperandForm, Operation, VarRef};
pub use operator::{Arity, Operator, Shape};
pub use parser::{Parser, parse_str, parse_value};
pub use session::{Session, Snapshot};
pub use translator::translate;
pub use visual::{Display, Expansion, Section};
