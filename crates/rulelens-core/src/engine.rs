use crate::advisory::{Advisory, advise};
use crate::error::{EvalError, GenerationError, ParseError};
use crate::evaluator::Evaluator;
use crate::generation::{GeneratedRule, TextGenerator, generate_rule};
use crate::identity::{self, DEFAULT_PREFIX, IdentityMap};
use crate::node::{DEFAULT_MAX_DEPTH, Node};
use crate::parser::Parser;
use crate::translator;
use crate::visual::{self, Display};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Settings shared by every traversal of one engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Root of every node identifier.
    pub id_prefix: String,
    /// Nesting limit for both parsing and evaluation.
    pub max_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            id_prefix: DEFAULT_PREFIX.to_string(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Configured entry point over parse, identify, evaluate, translate and
/// visualize.
///
/// Holds no per-rule state; one engine can serve any number of trees.
#[derive(Debug, Clone)]
pub struct Engine {
    config: EngineConfig,
    parser: Parser,
    evaluator: Evaluator,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            parser: Parser::with_max_depth(config.max_depth),
            evaluator: Evaluator::with_max_depth(config.max_depth),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Parse rule text into a tree.
    #[tracing::instrument(level = "debug", skip_all, fields(bytes = text.len()))]
    pub fn parse(&self, text: &str) -> Result<Node, ParseError> {
        self.parser.parse_str(text)
    }

    pub fn parse_value(&self, value: &Value) -> Result<Node, ParseError> {
        self.parser.parse_value(value)
    }

    /// Evaluate against a data context (an object, or `null`).
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn evaluate(&self, node: &Node, data: &Value) -> Result<Value, EvalError> {
        self.evaluator.evaluate(node, data)
    }

    #[tracing::instrument(level = "debug", skip_all)]
    pub fn translate(&self, node: &Node) -> String {
        translator::translate(node)
    }

    /// Identifiers under the configured prefix.
    pub fn ids(&self, node: &Node) -> IdentityMap {
        identity::assign(node, &self.config.id_prefix)
    }

    #[tracing::instrument(level = "debug", skip_all)]
    pub fn visualize(&self, node: &Node) -> Display {
        visual::build(node, &self.config.id_prefix)
    }

    /// Section tree under another prefix, for a second view of the same rule.
    pub fn visualize_under(&self, node: &Node, prefix: &str) -> Display {
        visual::build(node, prefix)
    }

    pub fn advise(&self, node: &Node) -> Vec<Advisory> {
        advise(node, &self.config.id_prefix)
    }

    /// Ask `generator` for a rule matching `request` and validate the answer.
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn generate<G>(&self, generator: &G, request: &str) -> Result<GeneratedRule, GenerationError>
    where
        G: TextGenerator + Sync,
    {
        generate_rule(generator, &self.parser, request).await
    }
}
