//! Failure domains of the core.
//!
//! Permissive edge cases (unknown operator, missing variable, wrong arity) are
//! not represented here: they degrade to `null`, `undefined` or an opaque
//! rendering instead. Only structurally nonsensical input and runtime failures
//! become errors.

use serde_json::Value;
use std::time::Duration;

/// Stable classification of a parse failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// The rule text is not JSON.
    InvalidJson,
    /// An object with more than one key.
    AmbiguousOperator,
    /// An object with no keys.
    EmptyObject,
    /// Nesting deeper than the configured limit.
    TooDeep,
}

impl ParseErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            ParseErrorKind::InvalidJson => "invalid-json",
            ParseErrorKind::AmbiguousOperator => "ambiguous-operator",
            ParseErrorKind::EmptyObject => "empty-object",
            ParseErrorKind::TooDeep => "too-deep",
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("ParseError: {}: {message}", kind.code())]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    /// Compact JSON of the offending fragment, when there is one.
    pub fragment: Option<String>,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            fragment: None,
        }
    }

    pub fn invalid_json(message: impl Into<String>) -> Self {
        Self::new(ParseErrorKind::InvalidJson, message)
    }

    pub(crate) fn at(mut self, fragment: &Value) -> Self {
        self.fragment = Some(fragment.to_string());
        self
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("EvaluationError: invalid-context: data context must be a JSON object, got {0}")]
    InvalidContext(String),

    #[error("EvaluationError: too-deep: expression nesting exceeds {limit}")]
    TooDeep { limit: usize },
}

impl EvalError {
    pub fn code(&self) -> &'static str {
        match self {
            EvalError::InvalidContext(_) => "invalid-context",
            EvalError::TooDeep { .. } => "too-deep",
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GenerationError {
    #[error("GenerationError: collaborator failed: {0}")]
    Collaborator(String),

    #[error("GenerationError: request timed out after {after:?}")]
    Timeout { after: Duration },

    #[error("GenerationError: no JSON object found in response")]
    NoJson,

    #[error("GenerationError: response is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("GenerationError: candidate is not a valid rule: {0}")]
    InvalidRule(#[source] ParseError),
}

impl GenerationError {
    pub fn collaborator(msg: impl Into<String>) -> Self {
        Self::Collaborator(msg.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            GenerationError::Collaborator(_) => "collaborator",
            GenerationError::Timeout { .. } => "timeout",
            GenerationError::NoJson => "no-json",
            GenerationError::InvalidJson(_) => "invalid-json",
            GenerationError::InvalidRule(_) => "invalid-rule",
        }
    }
}

/// Failure of a session action; the session records its message as well.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("invalid test data: {0}")]
    InvalidData(String),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

impl SessionError {
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::Parse(err) => err.code(),
            SessionError::InvalidData(_) => "invalid-data",
            SessionError::Eval(err) => err.code(),
            SessionError::Generation(err) => err.code(),
        }
    }
}
